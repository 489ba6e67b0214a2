use planshift_core::errors::ApplicationError;
use planshift_core::QuoteRuntime;

use crate::commands::session::{describe_origin, execute, persistence, Gate, Session};
use crate::commands::{to_data, CommandResult};

pub fn show() -> CommandResult {
    execute("scenario.show", Gate::Checked, |session| async move {
        let (scenario, origin) = session.load_scenario().await?;
        let data = to_data(&scenario)?;
        Ok::<_, ApplicationError>(CommandResult::success_with_data(
            "scenario.show",
            describe_origin(origin),
            Some(data),
        ))
    })
}

/// Applies one field edit, persists the replacement and returns fresh figures.
pub fn set(path: &str, value: &str) -> CommandResult {
    execute("scenario.set", Gate::Checked, |session| set_field(session, path, value))
}

pub fn reset() -> CommandResult {
    execute("scenario.reset", Gate::Checked, |session| async move {
        session.store.reset().await.map_err(persistence)?;
        Ok::<_, ApplicationError>(CommandResult::success(
            "scenario.reset",
            "stored scenario discarded",
        ))
    })
}

async fn set_field(
    session: Session,
    path: &str,
    value: &str,
) -> Result<CommandResult, ApplicationError> {
    let (scenario, _) = session.load_scenario().await?;
    let next = scenario.set_field(path, value)?;
    let figures = session.pricing.evaluate(&next).figures();
    session.save_scenario(&next).await?;

    Ok(CommandResult::success_with_data(
        "scenario.set",
        format!("updated `{path}`"),
        Some(to_data(&figures)?),
    ))
}
