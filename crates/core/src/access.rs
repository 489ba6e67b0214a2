//! Shared-PIN gate in front of the calculator.
//!
//! This is a courtesy lock for a shared workstation, not authentication: the
//! PIN is compared verbatim and the unlocked flag lives in the local store.

use secrecy::{ExposeSecret, SecretString};

use crate::errors::ApplicationError;

#[derive(Clone, Debug, Default)]
pub struct AccessGate {
    pin: Option<SecretString>,
}

impl AccessGate {
    pub fn new(pin: Option<SecretString>) -> Self {
        Self { pin }
    }

    /// No PIN configured: every session is considered unlocked.
    pub fn open() -> Self {
        Self { pin: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.pin.is_some()
    }

    pub fn verify(&self, attempt: &str) -> Result<(), ApplicationError> {
        match &self.pin {
            None => Ok(()),
            Some(pin) if pin.expose_secret() == attempt => Ok(()),
            Some(_) => {
                tracing::warn!(event_name = "access.unlock.rejected", "incorrect access PIN");
                Err(ApplicationError::AccessDenied("incorrect PIN".to_string()))
            }
        }
    }

    pub fn authorize(&self, session_unlocked: bool) -> Result<(), ApplicationError> {
        if !self.is_enabled() || session_unlocked {
            return Ok(());
        }
        Err(ApplicationError::AccessDenied(
            "session is locked; run `planshift unlock` first".to_string(),
        ))
    }
}
