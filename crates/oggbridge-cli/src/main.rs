//! CLI entry point - the composition root.

use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

use oggbridge_cli::{Cli, CliConfig, CliError, Commands, bootstrap, handlers};

/// `-v` forces debug; otherwise `RUST_LOG` applies, defaulting to info.
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    let ctx = bootstrap(CliConfig {
        settings_path: cli.config,
    })?;

    match command {
        Commands::Info { file, json } => handlers::info::execute(&ctx, &file, json)?,
        Commands::Play { file, seek } => handlers::play::execute(&ctx, &file, seek).await?,
        Commands::Stream { input, threshold } => {
            handlers::play::stream(&ctx, &input, threshold).await?;
        }
        Commands::Record {
            output,
            encode,
            seconds,
        } => handlers::record::execute(&ctx, &output, &encode, seconds).await?,
        Commands::Decode { input, output } => {
            handlers::transcode::decode(&ctx, &input, &output).await?;
        }
        Commands::Encode {
            input,
            output,
            encode,
        } => handlers::transcode::encode(&ctx, &input, &output, &encode).await?,
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    // Load environment variables
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(err) = run(cli).await {
        eprintln!("Error: {err:#}");
        let code = err.downcast_ref::<CliError>().map_or(1, CliError::exit_code);
        std::process::exit(code);
    }
}
