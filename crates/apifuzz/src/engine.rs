use std::path::PathBuf;

use tracing::warn;

/// Checkers the engine ships with. Names outside this set are tolerated
/// with a warning so externally-added custom checkers keep working.
pub const SUPPORTED_CHECKERS: &[&str] = &[
    "leakagerule",
    "resourcehierarchy",
    "useafterfree",
    "namespacerule",
    "invaliddynamicobject",
    "payloadbody",
    "examples",
];

/// Time budget, in hours, applied to `fuzz` when the user supplied zero.
pub const DEFAULT_TIME_BUDGET_HOURS: f64 = 1.0;

/// Interval assumed when a token refresh command is given without one.
pub const DEFAULT_TOKEN_REFRESH_INTERVAL_SECONDS: u64 = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckerAction {
    Enable,
    Disable,
}

impl CheckerAction {
    pub(crate) fn as_flag(&self) -> &'static str {
        match self {
            CheckerAction::Enable => "--enable_checkers",
            CheckerAction::Disable => "--disable_checkers",
        }
    }
}

/// One user-supplied checker directive, in the order it was given.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckerDirective {
    pub action: CheckerAction,
    pub checkers: Vec<String>,
}

impl CheckerDirective {
    pub fn enable(checkers: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            action: CheckerAction::Enable,
            checkers: checkers.into_iter().map(Into::into).collect(),
        }
    }

    pub fn disable(checkers: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            action: CheckerAction::Disable,
            checkers: checkers.into_iter().map(Into::into).collect(),
        }
    }
}

/// Search strategy flag passed to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FuzzingMode {
    DirectedSmokeTest,
    BfsCheap,
}

impl FuzzingMode {
    pub(crate) fn as_arg_value(&self) -> &'static str {
        match self {
            FuzzingMode::DirectedSmokeTest => "directed-smoke-test",
            FuzzingMode::BfsCheap => "bfs-cheap",
        }
    }
}

/// How the engine is launched for a given task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineRun {
    /// Smoke test over every request template; the time budget is passed
    /// only when the user set one.
    SmokeTest,
    /// Full fuzzing; a time budget is always passed.
    Fuzz,
    /// Re-execution of a recorded request sequence; no search mode, no
    /// time budget.
    Replay,
}

/// Token-refresh policy forwarded to the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenRefresh {
    pub interval_seconds: u64,
    pub command: String,
}

/// Fully-resolved parameters for one engine invocation.
///
/// Built up immutably by the argument parser: every setter consumes the
/// config and returns a new one.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub grammar_file: PathBuf,
    pub dictionary_file: PathBuf,
    pub target_ip: Option<String>,
    pub target_port: Option<u16>,
    pub host: Option<String>,
    pub no_ssl: bool,
    pub token_refresh: Option<TokenRefresh>,
    pub path_regex: Option<String>,
    pub producer_timing_delay: Option<u64>,
    pub time_budget_hours: f64,
    pub settings_file: Option<PathBuf>,
    pub checkers: Vec<CheckerDirective>,
    pub run_results_analyzer: bool,
    pub replay_log: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            grammar_file: PathBuf::new(),
            dictionary_file: PathBuf::new(),
            target_ip: None,
            target_port: None,
            host: None,
            no_ssl: false,
            token_refresh: None,
            path_regex: None,
            producer_timing_delay: None,
            time_budget_hours: 0.0,
            settings_file: None,
            checkers: Vec::new(),
            run_results_analyzer: true,
            replay_log: None,
        }
    }
}

impl EngineConfig {
    pub fn grammar_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.grammar_file = path.into();
        self
    }

    pub fn dictionary_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.dictionary_file = path.into();
        self
    }

    pub fn target_ip(mut self, ip: impl Into<String>) -> Self {
        self.target_ip = Some(ip.into());
        self
    }

    pub fn target_port(mut self, port: u16) -> Self {
        self.target_port = Some(port);
        self
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn no_ssl(mut self, enabled: bool) -> Self {
        self.no_ssl = enabled;
        self
    }

    pub fn token_refresh_interval(mut self, interval_seconds: u64) -> Self {
        let refresh = self.token_refresh.get_or_insert(TokenRefresh {
            interval_seconds,
            command: String::new(),
        });
        refresh.interval_seconds = interval_seconds;
        self
    }

    pub fn token_refresh_command(mut self, command: impl Into<String>) -> Self {
        let refresh = self.token_refresh.get_or_insert(TokenRefresh {
            interval_seconds: DEFAULT_TOKEN_REFRESH_INTERVAL_SECONDS,
            command: String::new(),
        });
        refresh.command = command.into();
        self
    }

    pub fn path_regex(mut self, regex: impl Into<String>) -> Self {
        self.path_regex = Some(regex.into());
        self
    }

    pub fn producer_timing_delay(mut self, delay: u64) -> Self {
        self.producer_timing_delay = Some(delay);
        self
    }

    pub fn time_budget_hours(mut self, hours: f64) -> Self {
        self.time_budget_hours = hours;
        self
    }

    pub fn settings_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.settings_file = Some(path.into());
        self
    }

    pub fn push_checkers(mut self, directive: CheckerDirective) -> Self {
        self.checkers.push(directive);
        self
    }

    /// Replace every user-supplied checker directive.
    pub fn checkers(mut self, checkers: Vec<CheckerDirective>) -> Self {
        self.checkers = checkers;
        self
    }

    pub fn run_results_analyzer(mut self, enabled: bool) -> Self {
        self.run_results_analyzer = enabled;
        self
    }

    pub fn replay_log(mut self, path: impl Into<PathBuf>) -> Self {
        self.replay_log = Some(path.into());
        self
    }

    /// The time budget a `fuzz` run actually gets: the fixed default when
    /// the user supplied zero, the user's value otherwise.
    pub fn effective_time_budget(&self) -> f64 {
        if self.time_budget_hours == 0.0 {
            DEFAULT_TIME_BUDGET_HOURS
        } else {
            self.time_budget_hours
        }
    }

    /// Build the engine command line: the flag list shared by every
    /// invocation, then the flags specific to how this run launches.
    pub fn argv(&self, run: EngineRun, version: &str) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();

        out.push("--grammar_file".to_string());
        out.push(self.grammar_file.display().to_string());
        out.push("--dictionary_file".to_string());
        out.push(self.dictionary_file.display().to_string());
        out.push("--set_version".to_string());
        out.push(version.to_string());

        if let Some(refresh) = self.token_refresh.as_ref() {
            out.push("--token_refresh_interval".to_string());
            out.push(refresh.interval_seconds.to_string());
            out.push("--token_refresh_command".to_string());
            out.push(refresh.command.clone());
        }

        if let Some(delay) = self.producer_timing_delay {
            out.push("--producer_timing_delay".to_string());
            out.push(delay.to_string());
        }

        if self.no_ssl {
            out.push("--no_ssl".to_string());
        }

        if let Some(host) = self.host.as_ref() {
            out.push("--host".to_string());
            out.push(host.clone());
        }

        if let Some(ip) = self.target_ip.as_ref() {
            out.push("--target_ip".to_string());
            out.push(ip.clone());
        }

        if let Some(port) = self.target_port {
            out.push("--target_port".to_string());
            out.push(port.to_string());
        }

        if let Some(regex) = self.path_regex.as_ref() {
            out.push("--path_regex".to_string());
            out.push(regex.clone());
        }

        if let Some(settings) = self.settings_file.as_ref() {
            out.push("--settings".to_string());
            out.push(settings.display().to_string());
        }

        for directive in &self.checkers {
            out.push(directive.action.as_flag().to_string());
            out.extend(directive.checkers.iter().cloned());
        }

        // Fixed flags: tag traffic with the driver's user agent and keep
        // auth tokens out of the engine's network logs.
        out.push("--include_user_agent".to_string());
        out.push("--no_tokens_in_logs".to_string());

        match run {
            EngineRun::SmokeTest => {
                out.push("--fuzzing_mode".to_string());
                out.push(FuzzingMode::DirectedSmokeTest.as_arg_value().to_string());
                if self.time_budget_hours > 0.0 {
                    out.push("--time_budget".to_string());
                    out.push(self.time_budget_hours.to_string());
                }
            }
            EngineRun::Fuzz => {
                out.push("--fuzzing_mode".to_string());
                out.push(FuzzingMode::BfsCheap.as_arg_value().to_string());
                out.push("--time_budget".to_string());
                out.push(self.effective_time_budget().to_string());
            }
            EngineRun::Replay => {
                if let Some(log) = self.replay_log.as_ref() {
                    out.push("--replay_log".to_string());
                    out.push(log.display().to_string());
                }
            }
        }

        out
    }
}

/// Checker directives `fuzz-lean` always runs with, overriding whatever the
/// user supplied: everything on except the namespace rule.
pub(crate) fn fuzz_lean_checkers() -> Vec<CheckerDirective> {
    vec![
        CheckerDirective::enable(["*"]),
        CheckerDirective::disable(["namespacerule"]),
    ]
}

/// Warn about checker names outside the supported set. Non-fatal: custom
/// checkers registered with the engine out of band are still forwarded.
pub(crate) fn warn_unknown_checkers(names: &[String]) {
    for name in names {
        if name != "*" && !SUPPORTED_CHECKERS.contains(&name.as_str()) {
            warn!(checker = %name, "unrecognized checker name; passing it through to the engine");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_time_budget_resolves_to_default_for_fuzz() {
        let config = EngineConfig::default();
        assert_eq!(config.effective_time_budget(), DEFAULT_TIME_BUDGET_HOURS);

        let config = config.time_budget_hours(2.5);
        assert_eq!(config.effective_time_budget(), 2.5);
    }

    #[test]
    fn token_refresh_flags_merge_into_one_policy() {
        let config = EngineConfig::default()
            .token_refresh_command("get-token.sh")
            .token_refresh_interval(60);
        assert_eq!(
            config.token_refresh,
            Some(TokenRefresh {
                interval_seconds: 60,
                command: "get-token.sh".to_string(),
            })
        );
    }
}
