mod cli;

use std::process::ExitCode;
use time::UtcOffset;
use trendsync::sync::{self, SyncOutcome};
use trendsync::types::firestore::DocumentWrite;

fn main() -> ExitCode {
    // Only reliable while the process is still single-threaded.
    let local_offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
    init_tracing();

    let outcome = cli::run(local_offset);
    if let cli::RunOutcome::Exit(code) = outcome {
        return ExitCode::from(code);
    }
    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            eprintln!("failed to start runtime: {err}");
            return ExitCode::FAILURE;
        }
    };

    match outcome {
        cli::RunOutcome::Serve(config) => match runtime.block_on(trendsync::serve(config)) {
            Ok(()) => ExitCode::SUCCESS,
            Err(err) => {
                tracing::error!("server error: {err}");
                ExitCode::FAILURE
            }
        },
        cli::RunOutcome::Sync(config) => match runtime.block_on(sync::execute(&config)) {
            Ok(SyncOutcome::Written(_)) => {
                println!("Stats synced successfully");
                ExitCode::SUCCESS
            }
            Ok(SyncOutcome::Preview(fields)) => {
                match serde_json::to_string_pretty(&DocumentWrite { fields: &fields }) {
                    Ok(json) => {
                        println!("{json}");
                        ExitCode::SUCCESS
                    }
                    Err(err) => {
                        eprintln!("failed to render summary: {err}");
                        ExitCode::FAILURE
                    }
                }
            }
            Err(err) => {
                tracing::error!("{err}");
                ExitCode::FAILURE
            }
        },
        cli::RunOutcome::Exit(code) => ExitCode::from(code),
    }
}

fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .without_time()
        .init();
}
