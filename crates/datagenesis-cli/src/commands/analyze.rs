//! Analyze command - dataset-level analysis of a sample file.

use std::path::PathBuf;

use colored::Colorize;
use datagenesis::Settings;

use super::{CommandResult, orchestrator, print_json, read_records};
use crate::cli::ProviderArgs;

pub async fn run(args: &ProviderArgs, settings: &Settings, file: PathBuf) -> CommandResult {
    let rows = read_records(&file)?;
    let orchestrator = orchestrator(args, settings, "{}")?;

    let analysis = orchestrator.analyze_dataset(&rows).await;

    match &analysis.error {
        Some(error) => eprintln!("{} {}", "Analysis fell back to defaults:".yellow().bold(), error),
        None => eprintln!(
            "{} domain {}, quality {:.0}",
            "Analyzed".green().bold(),
            analysis.domain.cyan(),
            analysis.quality_score
        ),
    }
    print_json(&analysis)
}
