//! DataGenesis CLI - multi-provider AI orchestration for synthetic data.

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use datagenesis::Settings;
use tracing_subscriber::EnvFilter;

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "datagenesis=debug,info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let settings = Settings::from_env();
    let provider = &cli.provider;

    let result = match cli.command {
        Commands::Health => commands::health::run(provider, &settings).await,

        Commands::Schema {
            description,
            domain,
            data_type,
        } => commands::schema::run(provider, &settings, description, domain, data_type, cli.verbose).await,

        Commands::Generate {
            schema,
            rows,
            description,
            source,
        } => commands::generate::run(provider, &settings, schema, rows, description, source).await,

        Commands::Analyze { file } => commands::analyze::run(provider, &settings, file).await,

        Commands::Privacy { file } => commands::privacy::run(provider, &settings, file).await,

        Commands::GeminiHealth => commands::gemini::health(provider, &settings),

        Commands::GeminiTest => commands::gemini::test(provider, &settings).await,

        Commands::SwitchModel { model } => commands::gemini::switch_model(provider, &settings, &model),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
