//! CLI entry point.

use anyhow::{Context, Result};
use clap::Parser;

use gepa_forge::cli::commands::{handle_resume, handle_run, handle_show};
use gepa_forge::cli::display::{render, RunOutcomeView, ShowOutcomeView};
use gepa_forge::cli::{Cli, Commands};
use gepa_forge::infrastructure::config::ConfigLoader;
use gepa_forge::infrastructure::logging::LoggerImpl;

fn config_path_for(command: &Commands) -> Option<&std::path::Path> {
    match command {
        Commands::Run { config, .. } | Commands::Resume { config, .. } => {
            config.as_deref()
        }
        Commands::Show { .. } => None,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = ConfigLoader::load(config_path_for(&cli.command)).context("failed to load configuration")?;
    let _logger = LoggerImpl::init(&config.logging).context("failed to initialize logger")?;

    match cli.command {
        Commands::Run {
            input,
            config,
            run_dir,
            force,
            seed,
            seed_file,
        } => {
            let outcome = handle_run(input, config, run_dir, force, seed, seed_file)
                .await
                .context("run failed")?;
            render(&RunOutcomeView::new(&outcome), cli.json);
        }
        Commands::Resume { input, config, run_dir } => {
            let outcome = handle_resume(input, config, run_dir)
                .await
                .context("resume failed")?;
            render(&RunOutcomeView::new(&outcome), cli.json);
        }
        Commands::Show { run_dir } => {
            let outcome = handle_show(run_dir).context("show failed")?;
            render(&ShowOutcomeView::new(&outcome), cli.json);
        }
    }

    Ok(())
}
