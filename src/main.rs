mod cli;
mod workflow;

use apkup::config::UpdaterConfig;
use clap::Parser;
use cli::{Cli, Commands};
use colored::Colorize;
use std::process;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = build_config(&cli);

    let result = match cli.command {
        Commands::Check => workflow::execute_check(config).await,
        Commands::Update { yes, no_install } => {
            workflow::execute_update(config, yes, no_install).await
        }
        Commands::Compare { candidate, current } => {
            workflow::execute_compare(&candidate, &current)
        }
    };

    if let Err(e) = result {
        eprintln!("{} {}", "Error:".red().bold(), e);
        process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.format_timestamp(None).init();
}

fn build_config(cli: &Cli) -> UpdaterConfig {
    let mut config = UpdaterConfig::default();

    if let Some(dir) = &cli.download_dir {
        config.download_dir = dir.clone();
    }
    if let Some(api_base) = &cli.api_base {
        config.api_base = api_base.clone();
    }
    if let Some(installer) = &cli.installer {
        config.installer_program = installer.clone();
        config.installer_args = cli.installer_args.clone();
    } else if !cli.installer_args.is_empty() {
        config.installer_args = cli.installer_args.clone();
    }

    config
}
