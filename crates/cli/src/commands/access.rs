use planshift_core::errors::ApplicationError;

use crate::commands::session::{execute, persistence, Gate, Session};
use crate::commands::CommandResult;

pub fn unlock(pin: &str) -> CommandResult {
    execute("unlock", Gate::Bypassed, |session| unlock_session(session, pin))
}

pub fn lock() -> CommandResult {
    execute("lock", Gate::Bypassed, lock_session)
}

async fn unlock_session(session: Session, pin: &str) -> Result<CommandResult, ApplicationError> {
    if !session.access.is_enabled() {
        return Ok(CommandResult::success(
            "unlock",
            "no access PIN configured; the calculator is open",
        ));
    }

    session.access.verify(pin)?;
    session.store.unlock().await.map_err(persistence)?;
    tracing::info!(event_name = "access.session.unlocked", "calculator unlocked");
    Ok(CommandResult::success("unlock", "session unlocked"))
}

async fn lock_session(session: Session) -> Result<CommandResult, ApplicationError> {
    session.store.lock().await.map_err(persistence)?;
    tracing::info!(event_name = "access.session.locked", "calculator locked");
    Ok(CommandResult::success("lock", "session locked"))
}
