use std::{
    fs,
    path::{Path, PathBuf},
};

use apifuzz::{
    pipeline, CompileConfig, DriverArgs, EngineConfig, Task, TaskParameters,
};
use tempfile::TempDir;
use uuid::Uuid;

fn driver_args(
    root: &Path,
    task: Task,
    parameters: TaskParameters,
    logs_upload_root: Option<PathBuf>,
) -> DriverArgs {
    let working_dir = root.join(task.dir_name());
    fs::create_dir_all(&working_dir).expect("create working dir");
    DriverArgs {
        output_dir: root.to_path_buf(),
        task,
        parameters,
        working_dir,
        logs_upload_root,
    }
}

#[test]
fn engine_inputs_land_under_the_execution_directory() {
    let dir = TempDir::new().expect("temp dir");
    let share = dir.path().join("share");
    let grammar = dir.path().join("grammar.py");
    let dict = dir.path().join("dict.json");
    fs::write(&grammar, b"grammar").expect("write grammar");
    fs::write(&dict, b"{}").expect("write dict");

    let config = EngineConfig::default()
        .grammar_file(&grammar)
        .dictionary_file(&dict);
    let args = driver_args(
        dir.path(),
        Task::Fuzz,
        TaskParameters::Engine(config),
        Some(share.clone()),
    );

    let execution_id = Uuid::new_v4();
    pipeline::upload_inputs(&args, execution_id);

    let inputs = share
        .join("fuzz")
        .join(execution_id.to_string())
        .join("inputs");
    assert!(inputs.join("grammar.py").is_file());
    assert!(inputs.join("dict.json").is_file());
}

#[test]
fn compiler_inputs_include_specs_and_custom_dictionary() {
    let dir = TempDir::new().expect("temp dir");
    let share = dir.path().join("share");
    let spec = dir.path().join("openapi.json");
    let custom = dir.path().join("mine.json");
    fs::write(&spec, b"{}").expect("write spec");
    fs::write(&custom, b"{}").expect("write dict");

    let config = CompileConfig {
        custom_dictionary_file_path: Some(custom),
        ..CompileConfig::from_spec_file(spec)
    };
    let args = driver_args(
        dir.path(),
        Task::Compile,
        TaskParameters::Compiler(config),
        Some(share.clone()),
    );

    let execution_id = Uuid::new_v4();
    pipeline::upload_inputs(&args, execution_id);

    let inputs = share
        .join("compile")
        .join(execution_id.to_string())
        .join("inputs");
    assert!(inputs.join("openapi.json").is_file());
    assert!(inputs.join("mine.json").is_file());
}

#[test]
fn upload_is_skipped_without_a_configured_root() {
    let dir = TempDir::new().expect("temp dir");
    let args = driver_args(
        dir.path(),
        Task::Test,
        TaskParameters::Engine(EngineConfig::default()),
        None,
    );
    pipeline::upload_inputs(&args, Uuid::new_v4());
    // Nothing beyond the working directory appears under the output root.
    let entries: Vec<_> = fs::read_dir(dir.path())
        .expect("read dir")
        .filter_map(Result::ok)
        .collect();
    assert_eq!(entries.len(), 1);
}

#[test]
fn failing_upload_stage_does_not_panic() {
    let dir = TempDir::new().expect("temp dir");
    let blocker = dir.path().join("blocker");
    fs::write(&blocker, b"not a directory").expect("write blocker");

    let args = driver_args(
        dir.path(),
        Task::Test,
        TaskParameters::Engine(EngineConfig::default()),
        Some(blocker.join("share")),
    );
    pipeline::upload_inputs(&args, Uuid::new_v4());
    pipeline::finalize(&args, Uuid::new_v4(), &dir.path().join("absent.log"));
}

#[test]
fn finalize_collects_the_driver_log_and_mirrors_the_working_tree() {
    let dir = TempDir::new().expect("temp dir");
    let share = dir.path().join("share");
    let args = driver_args(
        dir.path(),
        Task::Test,
        TaskParameters::Engine(EngineConfig::default()),
        Some(share.clone()),
    );

    fs::create_dir_all(args.working_dir.join("results")).expect("create results");
    fs::write(args.working_dir.join("results").join("net.txt"), b"log").expect("write log");
    let driver_log = dir.path().join("buffered.log");
    fs::write(&driver_log, b"driver output").expect("write driver log");

    let execution_id = Uuid::new_v4();
    pipeline::finalize(&args, execution_id, &driver_log);

    assert!(args.working_dir.join(pipeline::DRIVER_LOG_FILE).is_file());

    let logs = share
        .join("test")
        .join(execution_id.to_string())
        .join("logs");
    assert!(logs.join(pipeline::DRIVER_LOG_FILE).is_file());
    assert!(logs.join("results").join("net.txt").is_file());
}
