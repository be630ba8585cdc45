mod categorizer;
mod cli;
mod duplicates;
mod error;
mod export;
mod fmt;
mod importer;
mod models;
mod pipeline;
mod reconciler;
mod reports;
mod settings;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    init_logging();
    let cli = Cli::parse();

    let result = cli.settings().and_then(|settings| match &cli.command {
        Commands::Init => cli::init::run(&cli.settings_path(), &settings),
        Commands::Load => cli::load::run(&settings),
        Commands::Rules => cli::rules::list(&settings),
        Commands::Reconcile { family } => cli::reconcile::run(&settings, family.as_deref()),
        Commands::Duplicates => cli::report::duplicates(&settings),
        Commands::Cashflow => cli::report::cashflow(&settings),
        Commands::Spending { month } => cli::report::spending(&settings, month.clone()),
        Commands::Income => cli::report::income(&settings),
        Commands::Report { output, json } => {
            cli::report::full(&settings, output.clone(), json.clone())
        }
    });

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
