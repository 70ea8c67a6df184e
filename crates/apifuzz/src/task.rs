use std::{fmt, path::PathBuf};

use crate::{CompileConfig, EngineConfig, TestingSummary};

/// The top-level operation requested by the user. Immutable once parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Task {
    Compile,
    Test,
    FuzzLean,
    Fuzz,
    Replay,
}

impl Task {
    pub fn as_str(&self) -> &'static str {
        match self {
            Task::Compile => "compile",
            Task::Test => "test",
            Task::FuzzLean => "fuzz-lean",
            Task::Fuzz => "fuzz",
            Task::Replay => "replay",
        }
    }

    /// Folder under the output directory that a run of this task owns.
    pub fn dir_name(&self) -> &'static str {
        match self {
            Task::Compile => "Compile",
            Task::Test => "Test",
            Task::FuzzLean => "FuzzLean",
            Task::Fuzz => "Fuzz",
            Task::Replay => "Replay",
        }
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parameters for a task. Exactly one variant is valid for a given [`Task`];
/// a mismatch reaching the dispatcher is a defect, not user error.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskParameters {
    Compiler(CompileConfig),
    Engine(EngineConfig),
    Undefined,
}

/// The fully-resolved result of argument parsing. Created once per
/// invocation and never mutated after dispatch begins.
#[derive(Debug, Clone, PartialEq)]
pub struct DriverArgs {
    pub output_dir: PathBuf,
    pub task: Task,
    pub parameters: TaskParameters,
    pub working_dir: PathBuf,
    pub logs_upload_root: Option<PathBuf>,
}

/// Uniform result shape returned by the dispatcher for every task.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskOutcome {
    pub task_result: i32,
    pub analyzer_result: Option<i32>,
    pub summary: Option<TestingSummary>,
}
