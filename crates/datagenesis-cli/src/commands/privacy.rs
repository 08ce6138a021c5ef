//! Privacy command - privacy risk assessment of a sample file.

use std::path::PathBuf;

use colored::Colorize;
use datagenesis::{RiskLevel, Settings};

use super::{CommandResult, orchestrator, print_json, read_records};
use crate::cli::ProviderArgs;

pub async fn run(args: &ProviderArgs, settings: &Settings, file: PathBuf) -> CommandResult {
    let rows = read_records(&file)?;
    let orchestrator = orchestrator(args, settings, "{}")?;

    let assessment = orchestrator.assess_privacy_risks(&rows).await;

    let risk = match assessment.risk_level {
        RiskLevel::Low => "low".green(),
        RiskLevel::Medium => "medium".yellow(),
        RiskLevel::High => "high".red().bold(),
    };
    eprintln!(
        "Privacy score {:.0}, risk {}, {} PII fields",
        assessment.privacy_score,
        risk,
        assessment.pii_detected.len().to_string().white().bold()
    );
    print_json(&assessment)
}
