use anyhow::{Context, Result};
use clap::Parser;
use std::fs::File;
use std::sync::Mutex;
use std::time::Duration;
use tokio::io::BufReader;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use lanterm_gomoku::cli::{Cli, Commands, SessionOptions};
use lanterm_gomoku::core::lobby;
use lanterm_gomoku::games::gomoku::{ConsoleRenderer, Outcome};
use lanterm_gomoku::{run_session, SessionOutcome, Shutdown};

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.options)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start the async runtime")?;
    let result = runtime.block_on(run(cli));
    // stdin reads sit on a blocking thread that never returns by itself
    runtime.shutdown_timeout(Duration::from_millis(100));
    result
}

fn init_tracing(options: &SessionOptions) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&options.log_level))?;
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(false);
    match &options.log_file {
        Some(path) => {
            let file = File::create(path).with_context(|| format!("failed to open log file {}", path.display()))?;
            builder.with_ansi(false).with_writer(Mutex::new(file)).init();
        }
        None => builder.with_writer(std::io::stderr).init(),
    }
    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    let config = cli.options.to_config();
    let role = cli.command.role();
    let stream = match &cli.command {
        Commands::Host { addr } => lobby::host(addr).await?,
        Commands::Join { addr } => lobby::join(addr, config.connect_timeout).await?,
    };
    let (reader, writer) = stream.into_split();

    let shutdown = Shutdown::new();
    let on_ctrl_c = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupted");
            on_ctrl_c.trigger();
        }
    });

    let input = BufReader::new(tokio::io::stdin());
    let report = run_session(role, &config, reader, writer, input, ConsoleRenderer::stdout(), shutdown)
        .await
        .inspect_err(|e| error!(error = %e, "session failed"))?;

    println!();
    match report.outcome {
        SessionOutcome::Finished(Outcome::Won(player)) if report.game.local == Some(player) => {
            println!("You won! Thanks for playing.")
        }
        SessionOutcome::Finished(Outcome::Won(player)) => println!("Player {player} won. Better luck next time."),
        SessionOutcome::Finished(Outcome::Draw) => println!("The game ended in a draw."),
        SessionOutcome::Quit => println!("You left the game."),
        SessionOutcome::EndedUnexpectedly => println!("Game ended unexpectedly."),
    }
    Ok(())
}
