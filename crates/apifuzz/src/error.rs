use std::{io, path::PathBuf};

use thiserror::Error;

/// Failures raised while validating command-line arguments.
///
/// These are user-facing: the driver prints the message plus the usage text
/// and exits with status 1 before any external tool runs.
#[derive(Debug, Error)]
pub enum ArgError {
    #[error("no task given; expected one of compile, test, fuzz-lean, fuzz, replay")]
    MissingTask,
    #[error("unrecognized argument: {0}")]
    Unrecognized(String),
    #[error("missing value for {flag}")]
    MissingValue { flag: String },
    #[error("invalid value for {flag}: {value:?}")]
    InvalidNumber { flag: String, value: String },
    #[error("path does not exist: {0:?}")]
    PathNotFound(PathBuf),
    #[error("{task}: missing required argument: {what}")]
    MissingArgument {
        task: &'static str,
        what: &'static str,
    },
    #[error("failed to load compiler configuration {path:?}: {message}")]
    InvalidCompilerConfig { path: PathBuf, message: String },
    #[error("failed to resolve current directory: {0}")]
    CurrentDir(io::Error),
}

/// Failures surfaced while driving external tools and reading their
/// artifacts. Caught at the dispatcher boundary and folded into a failed
/// task result rather than propagated to the caller.
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("{tool} binary not found (looked for {binary:?})")]
    MissingTool {
        tool: &'static str,
        binary: PathBuf,
    },
    #[error("failed to spawn {binary:?}: {source}")]
    Spawn {
        binary: PathBuf,
        source: io::Error,
    },
    #[error("failed waiting for child process: {0}")]
    Wait(io::Error),
    #[error("failed reading stdout: {0}")]
    StdoutRead(io::Error),
    #[error("failed reading stderr: {0}")]
    StderrRead(io::Error),
    #[error("internal error: missing stdout pipe")]
    MissingStdout,
    #[error("internal error: missing stderr pipe")]
    MissingStderr,
    #[error("internal error: join failure: {0}")]
    Join(String),
    #[error("failed writing {path:?}: {source}")]
    Write {
        path: PathBuf,
        source: io::Error,
    },
    #[error("failed reading {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: io::Error,
    },
    #[error("failed copying {from:?} to {to:?}: {source}")]
    Copy {
        from: PathBuf,
        to: PathBuf,
        source: io::Error,
    },
    #[error("malformed testing summary {path:?}: {message}")]
    MalformedSummary { path: PathBuf, message: String },
    #[error("failed to parse JSON output: {0}")]
    Json(#[from] serde_json::Error),
}
