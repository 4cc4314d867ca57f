// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scanwerk: network document scanning over eSCL.
//
// Entry point. Initialises logging, runs the requested command, and turns
// failures into a plain-language message and exit code 1.

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use scanwerk_app::cli::{self, Cli};
use scanwerk_core::human_errors::humanize_error;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!("Scanwerk starting");

    match cli::run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let human = humanize_error(&err);
            tracing::error!(error = %err, "command failed");
            eprintln!("{}", human.message);
            eprintln!("  {}", human.suggestion);
            eprintln!("  ({err})");
            ExitCode::FAILURE
        }
    }
}
