//! apifuzz driver binary: parse → dispatch → post-run → exit.
//!
//! Exit status is 1 only for argument-validation failures before any tool
//! runs; a completed run exits 0 even when the task itself failed, with
//! the outcome reported through logs and telemetry.

use std::{
    fs::File,
    path::Path,
    process::ExitCode,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use apifuzz::{dispatch, parse, pipeline, ParseOutcome, TelemetryClient, ToolPaths, USAGE};

#[tokio::main]
async fn main() -> ExitCode {
    // The log buffer lives outside the working directory (which may not
    // exist yet); the post-run pipeline collects it at the end.
    let log_path = std::env::temp_dir().join(format!("apifuzz-driver-{}.log", std::process::id()));
    init_tracing(&log_path);

    let args = match parse(std::env::args().skip(1)) {
        Ok(ParseOutcome::Version) => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            return ExitCode::SUCCESS;
        }
        Ok(ParseOutcome::Run(args)) => args,
        Err(err) => {
            eprintln!("error: {err}\n\n{USAGE}");
            return ExitCode::from(1);
        }
    };

    if let Err(err) = std::fs::create_dir_all(&args.working_dir) {
        eprintln!(
            "error: cannot create working directory {:?}: {err}\n\n{USAGE}",
            args.working_dir
        );
        return ExitCode::from(1);
    }

    // An interrupt is acknowledged, not acted on: the running tool has its
    // own exit path, and the post-run pipeline must still execute.
    let interrupted = Arc::new(AtomicBool::new(false));
    {
        let interrupted = Arc::clone(&interrupted);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                interrupted.store(true, Ordering::SeqCst);
                warn!("interrupt received; waiting for the running tool to exit on its own");
            }
        });
    }

    let telemetry = TelemetryClient::from_env();
    let tools = ToolPaths::from_env();

    pipeline::upload_inputs(&args, telemetry.execution_id());
    telemetry.record_start(args.task);

    let outcome = dispatch(&args, &tools).await;

    telemetry.record_finish(args.task, &outcome);
    pipeline::finalize(&args, telemetry.execution_id(), &log_path);

    if interrupted.load(Ordering::SeqCst) {
        info!("run was interrupted by the user");
    }
    info!(
        task = %args.task,
        task_result = outcome.task_result,
        analyzer_result = ?outcome.analyzer_result,
        "driver finished"
    );
    ExitCode::SUCCESS
}

/// Initialize tracing once for the whole process: a compact console layer
/// plus a plain-text file layer the post-run pipeline collects.
fn init_tracing(log_path: &Path) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let console = fmt::layer().with_target(false).compact();
    match File::create(log_path) {
        Ok(file) => {
            let file_layer = fmt::layer().with_ansi(false).with_writer(Arc::new(file));
            tracing_subscriber::registry()
                .with(filter)
                .with(console)
                .with(file_layer)
                .init();
        }
        Err(_) => {
            tracing_subscriber::registry().with(filter).with(console).init();
        }
    }
}
