use planshift_core::errors::ApplicationError;
use planshift_core::{QuoteRuntime, Scenario};

use crate::commands::session::{execute, Gate, Session};
use crate::commands::{to_data, CommandResult};

/// Commits the typed annual manual credit.
pub fn apply() -> CommandResult {
    execute("credit.apply", Gate::Checked, |session| {
        edit(session, "credit.apply", "annual manual credit applied", |scenario| {
            Ok(scenario.apply_annual_manual_credit()?)
        })
    })
}

pub fn remove() -> CommandResult {
    execute("credit.remove", Gate::Checked, |session| {
        edit(session, "credit.remove", "annual manual credit removed", |scenario| {
            Ok(scenario.remove_annual_manual_credit())
        })
    })
}

async fn edit(
    session: Session,
    command: &str,
    message: &str,
    change: impl FnOnce(&Scenario) -> Result<Scenario, ApplicationError>,
) -> Result<CommandResult, ApplicationError> {
    let (scenario, _) = session.load_scenario().await?;
    let next = change(&scenario)?;
    session.save_scenario(&next).await?;

    let credits = session.pricing.evaluate(&next).credits;
    Ok(CommandResult::success_with_data(command, message, Some(to_data(&credits)?)))
}
