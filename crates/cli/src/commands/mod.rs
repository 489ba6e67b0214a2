pub mod access;
pub mod config;
pub mod credit;
pub mod doctor;
pub mod export;
pub mod migrate;
pub mod quote;
pub mod scenario;
mod session;

use chrono::Utc;
use planshift_core::errors::{ApplicationError, InterfaceError};
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        Self::success_with_data(command, message, None)
    }

    pub fn success_with_data(
        command: &str,
        message: impl Into<String>,
        data: Option<Value>,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
            data,
        };
        Self { exit_code: 0, output: serialize_payload(payload) }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
            data: None,
        };
        Self { exit_code, output: serialize_payload(payload) }
    }

    /// Reports an application error through its user-facing interface form.
    pub fn from_application_error(command: &str, error: ApplicationError) -> Self {
        let detail = error.to_string();
        let correlation_id = format!("{command}-{}", Utc::now().timestamp_millis());
        let interface = error.into_interface(correlation_id);
        let exit_code = match interface {
            InterfaceError::BadRequest { .. } => 6,
            InterfaceError::Locked { .. } => 7,
            InterfaceError::ServiceUnavailable { .. } => 4,
            InterfaceError::Internal { .. } => 2,
        };

        Self::failure(
            command,
            interface.error_class(),
            format!("{} ({detail})", interface.user_message()),
            exit_code,
        )
    }
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}

fn to_data(value: &impl Serialize) -> Result<Value, ApplicationError> {
    serde_json::to_value(value).map_err(|error| {
        ApplicationError::Configuration(format!("result is not serializable: {error}"))
    })
}
