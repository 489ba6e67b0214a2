use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{Local, NaiveDate};
use planshift_core::errors::ApplicationError;
use planshift_core::{ProposalExport, QuoteRuntime};

use crate::commands::session::{execute, Gate, Session};
use crate::commands::{to_data, CommandResult};

/// Builds the proposal record; with `output_dir` it is also written to
/// `{file_base}.json` for the renderer to pick up.
pub fn run(generated_on: Option<NaiveDate>, output_dir: Option<&Path>) -> CommandResult {
    let generated_on = generated_on.unwrap_or_else(|| Local::now().date_naive());
    execute("export", Gate::Checked, |session| build(session, generated_on, output_dir))
}

async fn build(
    session: Session,
    generated_on: NaiveDate,
    output_dir: Option<&Path>,
) -> Result<CommandResult, ApplicationError> {
    let (scenario, _) = session.load_scenario().await?;
    let results = session.pricing.evaluate(&scenario);
    let export = ProposalExport::build(&scenario, &results, generated_on);

    let message = match output_dir {
        Some(dir) => {
            let path = write_export(dir, &export)
                .map_err(|error| ApplicationError::Persistence(format!("{error:#}")))?;
            format!("wrote {}", path.display())
        }
        None => format!("built {}", export.file_base),
    };

    Ok(CommandResult::success_with_data("export", message, Some(to_data(&export)?)))
}

fn write_export(dir: &Path, export: &ProposalExport) -> anyhow::Result<PathBuf> {
    let path = dir.join(format!("{}.json", export.file_base));
    let document = serde_json::to_string_pretty(export).context("serialize proposal export")?;
    fs::write(&path, document).with_context(|| format!("write {}", path.display()))?;
    Ok(path)
}
