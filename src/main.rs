//! sentry-access - command-line access to the Sentry API
//!
//! Prints each command's result as pretty JSON on stdout. Errors go to
//! stderr with a non-zero exit code; logs go to a file.

use std::process::ExitCode;

use clap::Parser;

use sentry_access::cli::{self, Cli};
use sentry_access::logging;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    if let Err(e) = logging::init() {
        eprintln!("warning: logging disabled: {}", e);
    }

    let code = match cli::run(cli).await {
        Ok(value) => {
            println!("{}", serde_json::to_string_pretty(&value)?);
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "Command failed");
            eprintln!("error: {}", e.user_message());
            if let Some(action) = e.suggested_action() {
                eprintln!("hint: {}", action);
            }
            ExitCode::FAILURE
        }
    };

    logging::shutdown();
    Ok(code)
}
