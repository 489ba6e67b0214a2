use planshift_core::errors::ApplicationError;

use crate::commands::session::{execute, Gate, Session};
use crate::commands::CommandResult;

pub fn run() -> CommandResult {
    execute("migrate", Gate::Bypassed, report)
}

/// Opening the session already applied pending migrations.
async fn report(_session: Session) -> Result<CommandResult, ApplicationError> {
    Ok(CommandResult::success("migrate", "store schema is up to date"))
}
