use std::path::{Path, PathBuf};

use tracing::{error, info, warn};

use crate::{
    compile, process, summary, CompileConfig, DriverArgs, DriverError, EngineConfig, EngineRun,
    Task, TaskOutcome, TaskParameters,
};

/// Locations of the external tools the driver orchestrates.
#[derive(Debug, Clone)]
pub struct ToolPaths {
    pub compiler: PathBuf,
    pub engine: PathBuf,
    pub analyzer: PathBuf,
}

impl ToolPaths {
    /// Resolve each tool: explicit env override first, then the
    /// conventional name on `PATH`.
    pub fn from_env() -> Self {
        Self {
            compiler: resolve_binary("APIFUZZ_COMPILER", "apifuzz-compiler"),
            engine: resolve_binary("APIFUZZ_ENGINE", "apifuzz-engine"),
            analyzer: resolve_binary("APIFUZZ_ANALYZER", "apifuzz-analyzer"),
        }
    }
}

fn resolve_binary(env_key: &str, default: &str) -> PathBuf {
    if let Ok(value) = std::env::var(env_key) {
        if !value.trim().is_empty() {
            return PathBuf::from(value);
        }
    }
    PathBuf::from(default)
}

/// Execute the external-tool sequence for a validated task.
///
/// Failures below this boundary (missing binaries, subprocess errors, a
/// malformed summary) are logged and folded into a failed outcome rather
/// than propagated. A [`Task`]/[`TaskParameters`] mismatch is a defect the
/// parser should have made impossible and panics.
pub async fn dispatch(args: &DriverArgs, tools: &ToolPaths) -> TaskOutcome {
    match dispatch_inner(args, tools).await {
        Ok(outcome) => outcome,
        Err(err) => {
            error!(task = %args.task, error = %err, "task failed");
            TaskOutcome {
                task_result: 1,
                analyzer_result: None,
                summary: None,
            }
        }
    }
}

async fn dispatch_inner(args: &DriverArgs, tools: &ToolPaths) -> Result<TaskOutcome, DriverError> {
    match (args.task, &args.parameters) {
        (Task::Compile, TaskParameters::Compiler(config)) => {
            run_compile(args, config, tools).await
        }
        (Task::Test, TaskParameters::Engine(config))
        | (Task::FuzzLean, TaskParameters::Engine(config)) => {
            run_engine(args, config, tools, EngineRun::SmokeTest).await
        }
        (Task::Fuzz, TaskParameters::Engine(config)) => {
            run_engine(args, config, tools, EngineRun::Fuzz).await
        }
        (Task::Replay, TaskParameters::Engine(config)) => {
            run_engine(args, config, tools, EngineRun::Replay).await
        }
        (task, parameters) => panic!(
            "defect: task {task} dispatched with mismatched parameters {parameters:?}"
        ),
    }
}

async fn run_compile(
    args: &DriverArgs,
    config: &CompileConfig,
    tools: &ToolPaths,
) -> Result<TaskOutcome, DriverError> {
    let config = resolve_compile_config(config, &args.working_dir)?;
    let config_path = config.write_to(&args.working_dir)?;

    let result = process::run_tool(
        "compiler",
        &tools.compiler,
        &[config_path.display().to_string()],
        &args.working_dir,
    )
    .await?;

    Ok(TaskOutcome {
        task_result: result.exit_code,
        analyzer_result: None,
        summary: None,
    })
}

/// Fill the dispatch-time defaults: a generated mutations dictionary when
/// the user supplied none, and the working directory as the grammar output
/// location when the config left it open.
fn resolve_compile_config(
    config: &CompileConfig,
    working_dir: &Path,
) -> Result<CompileConfig, DriverError> {
    let custom_dictionary_file_path = match &config.custom_dictionary_file_path {
        Some(path) => Some(path.clone()),
        None => {
            let path = compile::write_default_dictionary(working_dir)?;
            info!(path = %path.display(), "no custom dictionary supplied; wrote the default");
            Some(path)
        }
    };
    let grammar_output_directory_path = Some(
        config
            .grammar_output_directory_path
            .clone()
            .unwrap_or_else(|| working_dir.to_path_buf()),
    );
    Ok(CompileConfig {
        custom_dictionary_file_path,
        grammar_output_directory_path,
        ..config.clone()
    })
}

async fn run_engine(
    args: &DriverArgs,
    config: &EngineConfig,
    tools: &ToolPaths,
    run: EngineRun,
) -> Result<TaskOutcome, DriverError> {
    let argv = config.argv(run, env!("CARGO_PKG_VERSION"));
    let engine = process::run_tool("engine", &tools.engine, &argv, &args.working_dir).await?;

    if engine.exit_code != 0 {
        warn!(
            exit_code = engine.exit_code,
            "engine failed; skipping results analysis and summary extraction"
        );
        return Ok(TaskOutcome {
            task_result: engine.exit_code,
            analyzer_result: None,
            summary: None,
        });
    }

    // Replay re-executes a fixed sequence: there is no fresh coverage to
    // analyze or summarize.
    if run == EngineRun::Replay {
        return Ok(TaskOutcome {
            task_result: engine.exit_code,
            analyzer_result: None,
            summary: None,
        });
    }

    let analyzer_result = if config.run_results_analyzer {
        Some(run_analyzer(args, config, tools).await?.exit_code)
    } else {
        None
    };
    let summary = summary::read_summary(&args.working_dir)?;

    Ok(TaskOutcome {
        task_result: engine.exit_code,
        analyzer_result,
        summary,
    })
}

async fn run_analyzer(
    args: &DriverArgs,
    config: &EngineConfig,
    tools: &ToolPaths,
) -> Result<crate::ProcessResult, DriverError> {
    let argv = vec![
        "analyze".to_string(),
        args.working_dir.display().to_string(),
        "--output_dir".to_string(),
        args.working_dir.display().to_string(),
        "--dictionary_file".to_string(),
        config.dictionary_file.display().to_string(),
        "--max_instances_per_bucket".to_string(),
        "10".to_string(),
    ];
    process::run_tool("analyzer", &tools.analyzer, &argv, &args.working_dir).await
}
