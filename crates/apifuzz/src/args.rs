use std::{env, fs, path::PathBuf};

use crate::{
    engine, ArgError, CheckerAction, CheckerDirective, CompileConfig, DriverArgs, EngineConfig,
    Task, TaskParameters,
};

/// Default log-share root, used when `--logsUploadRootDirPath` is absent.
pub const LOGS_UPLOAD_ROOT_ENV: &str = "APIFUZZ_LOGS_UPLOAD_ROOT";

pub const USAGE: &str = "\
Usage: apifuzz [global options] <task> [task options]

Global options:
  --version                        Print the driver version and exit
  --output_dir <dir>               Root for per-task working directories (default: current directory)
  --disable_log_upload             Never upload logs to the remote log share
  --logsUploadRootDirPath <dir>    Root of the remote log share

Tasks:
  compile <config.json>            Compile using an existing compiler configuration
  compile --api_spec <spec>        Compile an API specification with default settings
  test | fuzz-lean | fuzz | replay Run the fuzzing engine

Engine options (test, fuzz-lean, fuzz, replay):
  --grammar_file <path>            Compiled grammar (required except for replay)
  --dictionary_file <path>         Mutations dictionary (required except for replay)
  --target_ip <ip>                 Override the target IP address
  --target_port <port>             Override the target port
  --host <host>                    Override the Host header
  --no_ssl                         Disable SSL
  --token_refresh_interval <secs>  Seconds between token refreshes
  --token_refresh_command <cmd>    Command that prints a fresh token
  --path_regex <regex>             Only exercise request paths matching <regex>
  --producer_timing_delay <secs>   Delay after each producing request
  --time_budget <hours>            Stop after this many hours (fuzz default: 1)
  --settings <path>                Engine settings file
  --enable_checkers <name...>      Enable the named checkers
  --disable_checkers <name...>     Disable the named checkers
  --no_results_analyzer            Skip the results analyzer after the run
  --replay_log <path>              Recorded sequence to replay (replay only, required)
";

/// Result of parsing the full token sequence.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseOutcome {
    Run(DriverArgs),
    /// `--version` was requested; print it and exit 0.
    Version,
}

/// Tokens recognized independently of the selected task. They may appear
/// before the task token or interleaved with task options.
#[derive(Debug, Clone, Default)]
struct Globals {
    output_dir: Option<PathBuf>,
    upload_disabled: bool,
    logs_upload_root: Option<PathBuf>,
}

/// Parse the full command line (without the program name) into a validated
/// [`DriverArgs`].
///
/// The first non-global token selects the task; all further parsing is
/// scoped to that task's grammar. Any invalid token, missing value,
/// nonexistent referenced path, or unparseable number is an error.
pub fn parse<I>(tokens: I) -> Result<ParseOutcome, ArgError>
where
    I: IntoIterator<Item = String>,
{
    let tokens: Vec<String> = tokens.into_iter().collect();
    parse_top(&tokens, Globals::default())
}

fn parse_top(rest: &[String], globals: Globals) -> Result<ParseOutcome, ArgError> {
    let Some((token, rest)) = rest.split_first() else {
        return Err(ArgError::MissingTask);
    };
    match token.as_str() {
        "--version" => Ok(ParseOutcome::Version),
        "--disable_log_upload" => parse_top(
            rest,
            Globals {
                upload_disabled: true,
                ..globals
            },
        ),
        "--logsUploadRootDirPath" => {
            let (value, rest) = take_value(token, rest)?;
            parse_top(
                rest,
                Globals {
                    logs_upload_root: Some(PathBuf::from(value)),
                    ..globals
                },
            )
        }
        "--output_dir" => {
            let (value, rest) = take_value(token, rest)?;
            parse_top(
                rest,
                Globals {
                    output_dir: Some(PathBuf::from(value)),
                    ..globals
                },
            )
        }
        "compile" => parse_compile(rest, globals, None),
        "test" => parse_engine_task(Task::Test, rest, globals),
        "fuzz-lean" => parse_engine_task(Task::FuzzLean, rest, globals),
        "fuzz" => parse_engine_task(Task::Fuzz, rest, globals),
        "replay" => parse_engine_task(Task::Replay, rest, globals),
        other => Err(ArgError::Unrecognized(other.to_string())),
    }
}

/// Compile accepts exactly one of two disjoint forms: a bare path to an
/// existing compiler configuration, or `--api_spec <spec>`.
fn parse_compile(
    rest: &[String],
    globals: Globals,
    config: Option<CompileConfig>,
) -> Result<ParseOutcome, ArgError> {
    let Some((token, rest)) = rest.split_first() else {
        let config = config.ok_or(ArgError::MissingArgument {
            task: "compile",
            what: "an API specification (--api_spec) or a compiler configuration file",
        })?;
        return finish(Task::Compile, TaskParameters::Compiler(config), globals);
    };
    match token.as_str() {
        "--api_spec" if config.is_none() => {
            let (value, rest) = take_value(token, rest)?;
            let spec = existing_path(value)?;
            parse_compile(rest, globals, Some(CompileConfig::from_spec_file(spec)))
        }
        "--disable_log_upload" => parse_compile(
            rest,
            Globals {
                upload_disabled: true,
                ..globals
            },
            config,
        ),
        "--logsUploadRootDirPath" => {
            let (value, rest) = take_value(token, rest)?;
            parse_compile(
                rest,
                Globals {
                    logs_upload_root: Some(PathBuf::from(value)),
                    ..globals
                },
                config,
            )
        }
        "--output_dir" => {
            let (value, rest) = take_value(token, rest)?;
            parse_compile(
                rest,
                Globals {
                    output_dir: Some(PathBuf::from(value)),
                    ..globals
                },
                config,
            )
        }
        path if config.is_none() && !path.starts_with("--") => {
            let file = existing_path(path)?;
            parse_compile(rest, globals, Some(CompileConfig::load(&file)?))
        }
        other => Err(ArgError::Unrecognized(other.to_string())),
    }
}

fn parse_engine_task(task: Task, rest: &[String], globals: Globals) -> Result<ParseOutcome, ArgError> {
    let (config, globals) = parse_engine_args(EngineConfig::default(), globals, rest)?;
    // fuzz-lean is test parsing plus an unconditional checker override:
    // user-supplied checker flags are replaced, not merged.
    let config = if task == Task::FuzzLean {
        config.checkers(engine::fuzz_lean_checkers())
    } else {
        config
    };
    check_engine_postconditions(task, &config)?;
    finish(task, TaskParameters::Engine(config), globals)
}

/// Left-to-right fold over the engine task's tokens; each recognized flag
/// produces a new immutable config.
fn parse_engine_args(
    config: EngineConfig,
    globals: Globals,
    rest: &[String],
) -> Result<(EngineConfig, Globals), ArgError> {
    let Some((token, rest)) = rest.split_first() else {
        return Ok((config, globals));
    };
    match token.as_str() {
        "--grammar_file" => {
            let (value, rest) = take_value(token, rest)?;
            parse_engine_args(config.grammar_file(existing_path(value)?), globals, rest)
        }
        "--dictionary_file" => {
            let (value, rest) = take_value(token, rest)?;
            parse_engine_args(config.dictionary_file(existing_path(value)?), globals, rest)
        }
        "--settings" => {
            let (value, rest) = take_value(token, rest)?;
            parse_engine_args(config.settings_file(existing_path(value)?), globals, rest)
        }
        "--replay_log" => {
            let (value, rest) = take_value(token, rest)?;
            parse_engine_args(config.replay_log(existing_path(value)?), globals, rest)
        }
        "--target_ip" => {
            let (value, rest) = take_value(token, rest)?;
            parse_engine_args(config.target_ip(value), globals, rest)
        }
        "--target_port" => {
            let (value, rest) = take_value(token, rest)?;
            parse_engine_args(config.target_port(numeric(token, value)?), globals, rest)
        }
        "--host" => {
            let (value, rest) = take_value(token, rest)?;
            parse_engine_args(config.host(value), globals, rest)
        }
        "--no_ssl" => parse_engine_args(config.no_ssl(true), globals, rest),
        "--token_refresh_interval" => {
            let (value, rest) = take_value(token, rest)?;
            parse_engine_args(
                config.token_refresh_interval(numeric(token, value)?),
                globals,
                rest,
            )
        }
        "--token_refresh_command" => {
            let (value, rest) = take_value(token, rest)?;
            parse_engine_args(config.token_refresh_command(value), globals, rest)
        }
        "--path_regex" => {
            let (value, rest) = take_value(token, rest)?;
            parse_engine_args(config.path_regex(value), globals, rest)
        }
        "--producer_timing_delay" => {
            let (value, rest) = take_value(token, rest)?;
            parse_engine_args(
                config.producer_timing_delay(numeric(token, value)?),
                globals,
                rest,
            )
        }
        "--time_budget" => {
            let (value, rest) = take_value(token, rest)?;
            parse_engine_args(config.time_budget_hours(numeric(token, value)?), globals, rest)
        }
        "--enable_checkers" | "--disable_checkers" => {
            let action = if token == "--enable_checkers" {
                CheckerAction::Enable
            } else {
                CheckerAction::Disable
            };
            let (checkers, rest) = split_list(rest);
            if checkers.is_empty() {
                return Err(ArgError::MissingValue {
                    flag: token.clone(),
                });
            }
            engine::warn_unknown_checkers(&checkers);
            parse_engine_args(
                config.push_checkers(CheckerDirective { action, checkers }),
                globals,
                rest,
            )
        }
        "--no_results_analyzer" => {
            parse_engine_args(config.run_results_analyzer(false), globals, rest)
        }
        "--disable_log_upload" => parse_engine_args(
            config,
            Globals {
                upload_disabled: true,
                ..globals
            },
            rest,
        ),
        "--logsUploadRootDirPath" => {
            let (value, rest) = take_value(token, rest)?;
            parse_engine_args(
                config,
                Globals {
                    logs_upload_root: Some(PathBuf::from(value)),
                    ..globals
                },
                rest,
            )
        }
        "--output_dir" => {
            let (value, rest) = take_value(token, rest)?;
            parse_engine_args(
                config,
                Globals {
                    output_dir: Some(PathBuf::from(value)),
                    ..globals
                },
                rest,
            )
        }
        other => Err(ArgError::Unrecognized(other.to_string())),
    }
}

fn check_engine_postconditions(task: Task, config: &EngineConfig) -> Result<(), ArgError> {
    match task {
        Task::Test | Task::FuzzLean | Task::Fuzz => {
            if config.grammar_file.as_os_str().is_empty() {
                return Err(ArgError::MissingArgument {
                    task: task.as_str(),
                    what: "--grammar_file",
                });
            }
            if config.dictionary_file.as_os_str().is_empty() {
                return Err(ArgError::MissingArgument {
                    task: task.as_str(),
                    what: "--dictionary_file",
                });
            }
        }
        Task::Replay => {
            if config.replay_log.is_none() {
                return Err(ArgError::MissingArgument {
                    task: task.as_str(),
                    what: "--replay_log",
                });
            }
        }
        Task::Compile => {}
    }
    // A refresh interval alone cannot mint tokens.
    if let Some(refresh) = config.token_refresh.as_ref() {
        if refresh.command.is_empty() {
            return Err(ArgError::MissingArgument {
                task: task.as_str(),
                what: "--token_refresh_command",
            });
        }
    }
    Ok(())
}

fn finish(task: Task, parameters: TaskParameters, globals: Globals) -> Result<ParseOutcome, ArgError> {
    let cwd = env::current_dir().map_err(ArgError::CurrentDir)?;
    let output_dir = match globals.output_dir {
        Some(dir) if dir.is_absolute() => dir,
        Some(dir) => cwd.join(dir),
        None => cwd,
    };
    let working_dir = output_dir.join(task.dir_name());
    let logs_upload_root = if globals.upload_disabled {
        None
    } else {
        globals
            .logs_upload_root
            .or_else(|| env::var_os(LOGS_UPLOAD_ROOT_ENV).map(PathBuf::from))
    };
    Ok(ParseOutcome::Run(DriverArgs {
        output_dir,
        task,
        parameters,
        working_dir,
        logs_upload_root,
    }))
}

fn take_value<'a>(flag: &str, rest: &'a [String]) -> Result<(&'a str, &'a [String]), ArgError> {
    match rest.split_first() {
        Some((value, rest)) => Ok((value.as_str(), rest)),
        None => Err(ArgError::MissingValue {
            flag: flag.to_string(),
        }),
    }
}

fn numeric<T: std::str::FromStr>(flag: &str, value: &str) -> Result<T, ArgError> {
    value.parse().map_err(|_| ArgError::InvalidNumber {
        flag: flag.to_string(),
        value: value.to_string(),
    })
}

/// Consume list items up to the next flag token.
fn split_list(rest: &[String]) -> (Vec<String>, &[String]) {
    let end = rest
        .iter()
        .position(|t| t.starts_with("--"))
        .unwrap_or(rest.len());
    (rest[..end].to_vec(), &rest[end..])
}

/// Canonicalize a user-supplied path, verifying it exists. Every path that
/// reaches the process runner is absolute as a consequence.
fn existing_path(value: &str) -> Result<PathBuf, ArgError> {
    fs::canonicalize(value).map_err(|_| ArgError::PathNotFound(PathBuf::from(value)))
}
