//! Fault-isolated post-run stages: input upload, log collection, log
//! upload. Each stage is wrapped independently so one failure cannot
//! cascade into the others or override the task's recorded outcome.

use std::{
    fs,
    path::{Path, PathBuf},
};

use tracing::{error, info};
use uuid::Uuid;
use walkdir::WalkDir;

use crate::{DriverArgs, DriverError, TaskParameters};

/// Filename the driver's buffered log is collected under in the working
/// directory.
pub const DRIVER_LOG_FILE: &str = "driver.log";

fn run_stage(stage: &'static str, run: impl FnOnce() -> Result<(), DriverError>) {
    match run() {
        Ok(()) => info!(stage, "post-run stage completed"),
        Err(err) => error!(stage, error = %err, "post-run stage failed; continuing"),
    }
}

/// Copy the task's input files to the log share before the run, when one
/// is configured. Failures are logged and swallowed.
pub fn upload_inputs(args: &DriverArgs, execution_id: Uuid) {
    let Some(root) = args.logs_upload_root.as_ref() else {
        return;
    };
    let destination = upload_dir(root, args, execution_id).join("inputs");
    run_stage("input upload", || {
        fs::create_dir_all(&destination).map_err(|source| DriverError::Write {
            path: destination.clone(),
            source,
        })?;
        for input in input_files(args) {
            let Some(name) = input.file_name() else {
                continue;
            };
            copy_file(&input, &destination.join(name))?;
        }
        Ok(())
    });
}

/// Collect the driver's buffered log into the working directory, then
/// upload the consolidated directory to the log share, when one is
/// configured. Failures are logged and swallowed; the task's recorded
/// outcome is never altered here.
pub fn finalize(args: &DriverArgs, execution_id: Uuid, driver_log: &Path) {
    run_stage("log collection", || {
        copy_file(driver_log, &args.working_dir.join(DRIVER_LOG_FILE))
    });

    if let Some(root) = args.logs_upload_root.as_ref() {
        let destination = upload_dir(root, args, execution_id).join("logs");
        run_stage("log upload", || copy_tree(&args.working_dir, &destination));
    }
}

fn upload_dir(root: &Path, args: &DriverArgs, execution_id: Uuid) -> PathBuf {
    root.join(args.task.as_str()).join(execution_id.to_string())
}

fn input_files(args: &DriverArgs) -> Vec<PathBuf> {
    let mut files = Vec::new();
    match &args.parameters {
        TaskParameters::Compiler(config) => {
            files.extend(config.spec_file_paths.clone().unwrap_or_default());
            files.extend(config.custom_dictionary_file_path.clone());
        }
        TaskParameters::Engine(config) => {
            files.push(config.grammar_file.clone());
            files.push(config.dictionary_file.clone());
            files.extend(config.settings_file.clone());
            files.extend(config.replay_log.clone());
        }
        TaskParameters::Undefined => {}
    }
    files.retain(|p| !p.as_os_str().is_empty());
    files
}

fn copy_file(from: &Path, to: &Path) -> Result<(), DriverError> {
    fs::copy(from, to)
        .map(|_| ())
        .map_err(|source| DriverError::Copy {
            from: from.to_path_buf(),
            to: to.to_path_buf(),
            source,
        })
}

fn copy_tree(src: &Path, dest: &Path) -> Result<(), DriverError> {
    fs::create_dir_all(dest).map_err(|source| DriverError::Write {
        path: dest.to_path_buf(),
        source,
    })?;
    for entry in WalkDir::new(src).into_iter().filter_map(Result::ok) {
        let Ok(relative) = entry.path().strip_prefix(src) else {
            continue;
        };
        if relative.as_os_str().is_empty() {
            continue;
        }
        let target = dest.join(relative);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target).map_err(|source| DriverError::Write {
                path: target.clone(),
                source,
            })?;
        } else if entry.file_type().is_file() {
            copy_file(entry.path(), &target)?;
        }
    }
    Ok(())
}
