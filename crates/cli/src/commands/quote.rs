use planshift_core::errors::ApplicationError;
use planshift_core::QuoteRuntime;
use serde_json::json;

use crate::commands::session::{describe_origin, execute, Gate, Session};
use crate::commands::{to_data, CommandResult};

/// Evaluates the stored scenario and returns every stage's output.
pub fn run() -> CommandResult {
    execute("quote", Gate::Checked, evaluate)
}

async fn evaluate(session: Session) -> Result<CommandResult, ApplicationError> {
    let (scenario, origin) = session.load_scenario().await?;
    let results = session.pricing.evaluate(&scenario);

    let data = json!({
        "figures": to_data(&results.figures())?,
        "results": to_data(&results)?,
    });
    Ok(CommandResult::success_with_data(
        "quote",
        format!("evaluated {}", describe_origin(origin)),
        Some(data),
    ))
}
