use clap::Parser;

use logvm::cli::commands::{check, init, run};
use logvm::cli::{Cli, Commands};
use logvm::config::Settings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let settings = match &cli.config {
        Some(path) => Settings::load_from(path),
        None => Settings::load(),
    }
    .unwrap_or_else(|e| {
        eprintln!("Configuration error: {e}");
        Settings::default()
    });

    logvm::logging::init_with_config(&settings.logging);

    match cli.command {
        Commands::Init { force } => init::run_init(force),
        Commands::Config => init::run_config(&settings),
        Commands::Check { dir } => check::run_check(dir, &settings)?,
        Commands::Dump { dir } => check::run_dump(dir, &settings)?,
        Commands::Run {
            dir,
            dump_bytecode,
            strict,
        } => {
            let args = run::RunArgs {
                dir,
                dump_bytecode,
                strict,
            };
            run::run(args, &settings).await?;
        }
    }

    Ok(())
}
