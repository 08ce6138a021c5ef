//! Gemini commands - quota-preserving health, connection test, model switch.

use colored::Colorize;
use datagenesis::{MeteredHealthMonitor, Settings};

use super::{CommandResult, print_json, print_status};
use crate::cli::ProviderArgs;

fn monitor(args: &ProviderArgs, settings: &Settings) -> MeteredHealthMonitor {
    let monitor = MeteredHealthMonitor::from_settings(settings);
    let monitor = match &args.endpoint {
        Some(endpoint) => monitor.with_endpoint(endpoint.clone()),
        None => monitor,
    };
    monitor.initialize();
    monitor
}

/// Readiness from local state; spends no quota.
pub fn health(args: &ProviderArgs, settings: &Settings) -> CommandResult {
    let status = monitor(args, settings).health_check();
    print_status(&status);
    print_json(&status)
}

/// One real request to Gemini.
pub async fn test(args: &ProviderArgs, settings: &Settings) -> CommandResult {
    eprintln!("{}", "Testing Gemini connection (consumes quota)".yellow());
    let status = monitor(args, settings).test_connection().await;
    print_status(&status);
    print_json(&status)
}

pub fn switch_model(args: &ProviderArgs, settings: &Settings, model: &str) -> CommandResult {
    let monitor = monitor(args, settings);
    let switch = monitor.switch_model(model)?;
    eprintln!(
        "{} {} -> {}",
        "Switched".green().bold(),
        switch.previous_model,
        switch.current_model.white().bold()
    );
    print_status(&monitor.health_check());
    print_json(&switch)
}
