use std::error::Error;

use clap::Parser;
use studyboard::board::BoardError;
use studyboard::cli::commands::Cli;
use studyboard::cli::handlers;
use studyboard::io::backend::BackendError;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter (e.g. `SB_LOG=debug`)
const LOG_ENV: &str = "SB_LOG";

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();
    if let Err(e) = handlers::dispatch(cli).await {
        eprintln!("error: {}", e);
        if session_expired(e.as_ref()) {
            eprintln!("hint: sign in again with `sb login --session <cookie>`");
        }
        std::process::exit(1);
    }
}

fn session_expired(e: &(dyn Error + 'static)) -> bool {
    e.downcast_ref::<BoardError>()
        .is_some_and(BoardError::is_unauthorized)
        || e.downcast_ref::<BackendError>()
            .is_some_and(BackendError::is_unauthorized)
}
