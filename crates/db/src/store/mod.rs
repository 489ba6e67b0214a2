//! Local key-value persistence for the calculator.
//!
//! The whole scenario lives under one key and is rewritten after every edit.
//! A second key carries the unlocked-session flag for the access gate.

use async_trait::async_trait;
use thiserror::Error;

use planshift_core::domain::scenario::Scenario;

pub mod memory;
pub mod sql;

pub use memory::InMemoryKeyValueStore;
pub use sql::SqlKeyValueStore;

pub const SCENARIO_KEY: &str = "calculator.scenario";
pub const SESSION_KEY: &str = "calculator.session";
const SESSION_UNLOCKED: &str = "true";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("encode error: {0}")]
    Encode(String),
}

#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
    async fn remove(&self, key: &str) -> Result<(), StoreError>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScenarioOrigin {
    Stored,
    Fresh,
    /// The stored document could not be read and was replaced by defaults.
    Recovered,
}

pub struct ScenarioStore<S> {
    store: S,
}

impl<S: KeyValueStore> ScenarioStore<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Stored scenario merged over defaults, or `fresh()` when there is none.
    pub async fn load(
        &self,
        fresh: impl FnOnce() -> Scenario + Send,
    ) -> Result<(Scenario, ScenarioOrigin), StoreError> {
        let Some(document) = self.store.get(SCENARIO_KEY).await? else {
            return Ok((fresh(), ScenarioOrigin::Fresh));
        };

        match serde_json::from_str::<Scenario>(&document) {
            Ok(scenario) => Ok((scenario, ScenarioOrigin::Stored)),
            Err(error) => {
                tracing::warn!(
                    event_name = "store.scenario.unreadable",
                    key = SCENARIO_KEY,
                    error = %error,
                    "stored scenario is unreadable; starting from defaults"
                );
                Ok((fresh(), ScenarioOrigin::Recovered))
            }
        }
    }

    pub async fn save(&self, scenario: &Scenario) -> Result<(), StoreError> {
        let document = serde_json::to_string(scenario)
            .map_err(|error| StoreError::Encode(error.to_string()))?;
        self.store.set(SCENARIO_KEY, &document).await?;
        tracing::debug!(
            event_name = "store.scenario.saved",
            bytes = document.len(),
            "scenario saved"
        );
        Ok(())
    }

    pub async fn reset(&self) -> Result<(), StoreError> {
        self.store.remove(SCENARIO_KEY).await
    }

    pub async fn is_unlocked(&self) -> Result<bool, StoreError> {
        Ok(self.store.get(SESSION_KEY).await?.as_deref() == Some(SESSION_UNLOCKED))
    }

    pub async fn unlock(&self) -> Result<(), StoreError> {
        self.store.set(SESSION_KEY, SESSION_UNLOCKED).await
    }

    pub async fn lock(&self) -> Result<(), StoreError> {
        self.store.remove(SESSION_KEY).await
    }
}
