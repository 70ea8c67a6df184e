use std::{
    collections::BTreeMap,
    ffi::OsStr,
    path::{Path, PathBuf},
};

use serde::Deserialize;
use tracing::info;
use walkdir::WalkDir;

use crate::DriverError;

/// Well-known report filename the engine writes at the end of a run.
pub const TESTING_SUMMARY_FILE: &str = "testing_summary.json";

/// Key under which the engine reports requests issued by the primary
/// request driver (as opposed to e.g. garbage collection).
const MAIN_DRIVER: &str = "main_driver";

/// Read-only view over the engine-produced testing summary. Constructed
/// only from a report file; never written back.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TestingSummary {
    /// Covered and total request templates.
    pub spec_coverage: (u64, u64),
    pub main_driver_requests: u64,
    pub requests_sent: BTreeMap<String, u64>,
    pub bug_buckets: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct RawSummary {
    final_spec_coverage: String,
    #[serde(default)]
    total_requests_sent: BTreeMap<String, u64>,
    #[serde(default)]
    bug_buckets: BTreeMap<String, serde_json::Value>,
}

/// Search `working_dir` recursively for the testing summary and parse it.
///
/// Absence is not an error: the engine produces no summary when it fails
/// early. A found but malformed report is a hard failure.
pub fn read_summary(working_dir: &Path) -> Result<Option<TestingSummary>, DriverError> {
    let Some(path) = find_summary_file(working_dir) else {
        info!(dir = %working_dir.display(), "no testing summary found");
        return Ok(None);
    };

    let text = std::fs::read_to_string(&path).map_err(|source| DriverError::Read {
        path: path.clone(),
        source,
    })?;
    let raw: RawSummary = serde_json::from_str(&text)?;

    let spec_coverage =
        parse_coverage(&raw.final_spec_coverage).map_err(|message| DriverError::MalformedSummary {
            path: path.clone(),
            message,
        })?;
    let main_driver_requests = raw.total_requests_sent.get(MAIN_DRIVER).copied().unwrap_or(0);

    Ok(Some(TestingSummary {
        spec_coverage,
        main_driver_requests,
        requests_sent: raw.total_requests_sent,
        bug_buckets: raw.bug_buckets,
    }))
}

fn find_summary_file(dir: &Path) -> Option<PathBuf> {
    WalkDir::new(dir)
        .into_iter()
        .filter_map(Result::ok)
        .find(|e| e.file_type().is_file() && e.file_name() == OsStr::new(TESTING_SUMMARY_FILE))
        .map(|e| e.into_path())
}

/// Parse a `"<covered> / <total>"` coverage string.
fn parse_coverage(value: &str) -> Result<(u64, u64), String> {
    let Some((covered, total)) = value.split_once('/') else {
        return Err(format!("expected \"covered / total\", got {value:?}"));
    };
    let covered = covered
        .trim()
        .parse()
        .map_err(|_| format!("invalid covered count {:?}", covered.trim()))?;
    let total = total
        .trim()
        .parse()
        .map_err(|_| format!("invalid total count {:?}", total.trim()))?;
    Ok((covered, total))
}
