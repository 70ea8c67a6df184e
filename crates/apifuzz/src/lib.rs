#![forbid(unsafe_code)]
//! Task orchestration for the apifuzz API-fuzzing toolchain.
//!
//! The driver turns user intent (compile a specification, smoke-test the
//! resulting grammar, fuzz it, or replay a recorded failure) into a
//! validated configuration, shells out to the specification compiler, the
//! fuzzing engine, and the results analyzer through one subprocess
//! contract, and ships logs and telemetry even when parts of that pipeline
//! fail. The task's outcome is communicated through logs and telemetry;
//! the driver process itself exits 0 once dispatch has begun.

mod args;
mod compile;
mod dispatch;
mod engine;
mod error;
pub mod pipeline;
mod process;
mod summary;
mod task;
mod telemetry;

pub use args::{parse, ParseOutcome, LOGS_UPLOAD_ROOT_ENV, USAGE};
pub use compile::{
    write_default_dictionary, CompileConfig, MutationsDictionary, COMPILER_CONFIG_FILE,
    DEFAULT_DICTIONARY_FILE,
};
pub use dispatch::{dispatch, ToolPaths};
pub use engine::{
    CheckerAction, CheckerDirective, EngineConfig, EngineRun, FuzzingMode, TokenRefresh,
    DEFAULT_TIME_BUDGET_HOURS, DEFAULT_TOKEN_REFRESH_INTERVAL_SECONDS, SUPPORTED_CHECKERS,
};
pub use error::{ArgError, DriverError};
pub use process::{run_tool, ProcessResult};
pub use summary::{read_summary, TestingSummary, TESTING_SUMMARY_FILE};
pub use task::{DriverArgs, Task, TaskOutcome, TaskParameters};
pub use telemetry::{TelemetryClient, TELEMETRY_KEY_ENV, TELEMETRY_OPTOUT_ENV};
