// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// nativebox — show a native message box from the command line.
//
// Entry point. Initialises logging, builds the request from the arguments,
// shows it through the platform host and prints the result as JSON. Exits
// non-zero when the outcome is neither Success nor Cancelled.

mod cli;

use std::process::ExitCode;

use clap::Parser;

use nativebox_client::{CancellationToken, MessageBoxClient, MessageBoxResult, Result};

use cli::Cli;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(result) => {
            match serde_json::to_string_pretty(&result) {
                Ok(json) => println!("{json}"),
                Err(e) => tracing::error!(error = %e, "could not encode result"),
            }
            if result.outcome().is_completed() {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(2)
            }
        }
        Err(e) => {
            let report = serde_json::json!({
                "outcome": e.outcome(),
                "nativeResultCode": e.status_code(),
                "error": e.to_string(),
            });
            println!("{report:#}");
            tracing::error!(error = %e, "message box failed");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<MessageBoxResult> {
    let client = MessageBoxClient::for_current_platform();
    if let Some(path) = &cli.config {
        client.apply_options_file(path)?;
    }
    for dir in &cli.native_path {
        client.register_native_library_path(dir.clone())?;
    }
    client.configure_host(|options| {
        options.runtime_name.get_or_insert_with(|| "nativebox-cli".to_owned());
    })?;

    if !client.verify_abi_compatibility() {
        tracing::warn!("native library missing or built for a different ABI version");
    }

    let request = cli.to_request()?;
    tracing::info!(async_dispatch = cli.run_async, "showing message box");
    if cli.run_async {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()?;
        runtime.block_on(client.show_async(request, CancellationToken::new()))
    } else {
        client.show(&request)
    }
}
