//! Health command - check the configured provider.

use datagenesis::{HealthState, HealthStatus, Settings};

use super::{CommandResult, orchestrator, print_json, print_status};
use crate::cli::ProviderArgs;

pub async fn run(args: &ProviderArgs, settings: &Settings) -> CommandResult {
    let status = match orchestrator(args, settings, "{}") {
        Ok(orchestrator) => orchestrator.health_check().await,
        Err(e) => HealthStatus::new(HealthState::Error, e.to_string()),
    };

    print_status(&status);
    print_json(&status)
}
