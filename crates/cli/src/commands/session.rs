use std::future::Future;

use chrono::Local;
use planshift_core::config::{AppConfig, LoadOptions};
use planshift_core::errors::ApplicationError;
use planshift_core::{AccessGate, QuoteRuntime, Scenario, StandardQuoteRuntime};
use planshift_db::{
    connect, migrations, ScenarioOrigin, ScenarioStore, SqlKeyValueStore, StoreError,
};

use crate::commands::CommandResult;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Gate {
    /// Refuse to run while a PIN is configured and the session is locked.
    Checked,
    Bypassed,
}

pub(crate) struct Session {
    pub access: AccessGate,
    pub store: ScenarioStore<SqlKeyValueStore>,
    pub pricing: StandardQuoteRuntime,
}

impl Session {
    pub async fn load_scenario(&self) -> Result<(Scenario, ScenarioOrigin), ApplicationError> {
        let today = Local::now().date_naive();
        let card = self.pricing.rate_card();
        self.store.load(|| Scenario::starting_on(today, card)).await.map_err(persistence)
    }

    pub async fn save_scenario(&self, scenario: &Scenario) -> Result<(), ApplicationError> {
        self.store.save(scenario).await.map_err(persistence)
    }
}

pub(crate) fn persistence(error: StoreError) -> ApplicationError {
    ApplicationError::Persistence(error.to_string())
}

pub(crate) fn describe_origin(origin: ScenarioOrigin) -> &'static str {
    match origin {
        ScenarioOrigin::Stored => "stored scenario",
        ScenarioOrigin::Fresh => "new scenario",
        ScenarioOrigin::Recovered => "default scenario (stored scenario was unreadable)",
    }
}

/// Loads config, opens the store and runs `body` on a current-thread runtime.
pub(crate) fn execute<F, Fut>(command: &str, gate: Gate, body: F) -> CommandResult
where
    F: FnOnce(Session) -> Fut,
    Fut: Future<Output = Result<CommandResult, ApplicationError>>,
{
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                command,
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let rate_card = match config.rate_card() {
        Ok(rate_card) => rate_card,
        Err(error) => {
            return CommandResult::failure(
                command,
                "config_validation",
                format!("rate card issue: {error}"),
                2,
            );
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                command,
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            );
        }
    };

    let result = runtime.block_on(async {
        let pool = match connect(&config.database).await {
            Ok(pool) => pool,
            Err(error) => {
                return CommandResult::failure(command, "db_connectivity", error.to_string(), 4);
            }
        };
        if let Err(error) = migrations::run_pending(&pool).await {
            pool.close().await;
            return CommandResult::failure(command, "migration", error.to_string(), 5);
        }

        let session = Session {
            access: config.access_gate(),
            store: ScenarioStore::new(SqlKeyValueStore::new(pool.clone())),
            pricing: StandardQuoteRuntime::new(rate_card),
        };

        let outcome = match authorize(&session, gate).await {
            Ok(()) => body(session).await,
            Err(error) => Err(error),
        };
        pool.close().await;

        outcome.unwrap_or_else(|error| CommandResult::from_application_error(command, error))
    });

    tracing::info!(
        event_name = "cli.command.completed",
        command,
        exit_code = result.exit_code,
        "command completed"
    );
    result
}

async fn authorize(session: &Session, gate: Gate) -> Result<(), ApplicationError> {
    if gate == Gate::Bypassed || !session.access.is_enabled() {
        return Ok(());
    }
    let unlocked = session.store.is_unlocked().await.map_err(persistence)?;
    session.access.authorize(unlocked)
}
