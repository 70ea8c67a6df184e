use tracing::info;
use uuid::Uuid;

use crate::{Task, TaskOutcome};

/// Setting this environment variable (to any value) disables telemetry.
pub const TELEMETRY_OPTOUT_ENV: &str = "APIFUZZ_TELEMETRY_OPTOUT";

/// Overrides the telemetry destination key baked into the build.
pub const TELEMETRY_KEY_ENV: &str = "APIFUZZ_TELEMETRY_KEY";

const DEFAULT_TELEMETRY_KEY: &str = "4eec9dfa-a419-4b6a-83c2-9517cda96b31";

/// Emits a start event before dispatch and a finish event after, tied
/// together by a per-invocation execution identifier.
///
/// Events carry only coarse metrics (task name, exit code, coverage and
/// bug-bucket counts), never request payloads or target details.
#[derive(Debug, Clone)]
pub struct TelemetryClient {
    enabled: bool,
    key: String,
    execution_id: Uuid,
}

impl TelemetryClient {
    pub fn from_env() -> Self {
        let enabled = std::env::var_os(TELEMETRY_OPTOUT_ENV).is_none();
        let key = std::env::var(TELEMETRY_KEY_ENV)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_TELEMETRY_KEY.to_string());
        Self {
            enabled,
            key,
            execution_id: Uuid::new_v4(),
        }
    }

    pub fn execution_id(&self) -> Uuid {
        self.execution_id
    }

    pub fn record_start(&self, task: Task) {
        if !self.enabled {
            return;
        }
        info!(
            target: "telemetry",
            key = %self.key,
            execution_id = %self.execution_id,
            task = %task,
            event = "start",
            "task started"
        );
    }

    pub fn record_finish(&self, task: Task, outcome: &TaskOutcome) {
        if !self.enabled {
            return;
        }
        let (covered, total) = outcome
            .summary
            .as_ref()
            .map(|s| s.spec_coverage)
            .unwrap_or((0, 0));
        let bug_buckets = outcome
            .summary
            .as_ref()
            .map(|s| s.bug_buckets.len())
            .unwrap_or(0);
        let requests_sent = outcome
            .summary
            .as_ref()
            .map(|s| s.main_driver_requests)
            .unwrap_or(0);
        info!(
            target: "telemetry",
            key = %self.key,
            execution_id = %self.execution_id,
            task = %task,
            event = "finish",
            exit_code = outcome.task_result,
            covered_requests = covered,
            total_requests = total,
            requests_sent,
            bug_buckets,
            "task finished"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn execution_ids_are_unique_per_client() {
        let a = TelemetryClient::from_env();
        let b = TelemetryClient::from_env();
        assert_ne!(a.execution_id(), b.execution_id());
    }
}
