use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::{ArgError, DriverError};

/// Filename of the resolved compiler configuration, written into the task
/// working directory before every compilation.
pub const COMPILER_CONFIG_FILE: &str = "config.json";

/// Filename of the mutations dictionary generated when the user supplies
/// none of their own.
pub const DEFAULT_DICTIONARY_FILE: &str = "defaultDict.json";

/// Self-contained configuration handed to the specification compiler as a
/// single JSON file. All embedded paths are absolute by the time this
/// reaches the process runner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompileConfig {
    pub spec_file_paths: Option<Vec<PathBuf>>,
    pub grammar_output_directory_path: Option<PathBuf>,
    pub custom_dictionary_file_path: Option<PathBuf>,
    pub include_optional_parameters: bool,
    pub data_fuzzing: bool,
    pub use_query_examples: Option<bool>,
    pub use_body_examples: Option<bool>,
}

impl Default for CompileConfig {
    fn default() -> Self {
        Self {
            spec_file_paths: None,
            grammar_output_directory_path: None,
            custom_dictionary_file_path: None,
            include_optional_parameters: true,
            data_fuzzing: false,
            use_query_examples: None,
            use_body_examples: None,
        }
    }
}

impl CompileConfig {
    /// Configuration synthesized from a bare specification path. Optional
    /// parameters and data fuzzing are always on for this form, independent
    /// of the defaults.
    pub fn from_spec_file(spec: PathBuf) -> Self {
        Self {
            spec_file_paths: Some(vec![spec]),
            include_optional_parameters: true,
            data_fuzzing: true,
            ..Self::default()
        }
    }

    /// Load a pre-existing compiler configuration.
    ///
    /// Relative paths embedded in the file become absolute relative to the
    /// file's own directory. Optional-parameter inclusion is forced on and
    /// the example-usage policy is reset to its defaults regardless of the
    /// stored values: the compiler, not the stored file, owns those knobs.
    pub fn load(path: &Path) -> Result<Self, ArgError> {
        let text = fs::read_to_string(path).map_err(|e| ArgError::InvalidCompilerConfig {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let config: CompileConfig =
            serde_json::from_str(&text).map_err(|e| ArgError::InvalidCompilerConfig {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;

        let base = path.parent().unwrap_or_else(|| Path::new("")).to_path_buf();
        Ok(Self {
            spec_file_paths: config
                .spec_file_paths
                .map(|specs| specs.into_iter().map(|p| absolutize(p, &base)).collect()),
            grammar_output_directory_path: config
                .grammar_output_directory_path
                .map(|p| absolutize(p, &base)),
            custom_dictionary_file_path: config
                .custom_dictionary_file_path
                .map(|p| absolutize(p, &base)),
            include_optional_parameters: true,
            data_fuzzing: config.data_fuzzing,
            use_query_examples: None,
            use_body_examples: None,
        })
    }

    /// Serialize this configuration to `config.json` in `dir` and return the
    /// written path.
    pub fn write_to(&self, dir: &Path) -> Result<PathBuf, DriverError> {
        let path = dir.join(COMPILER_CONFIG_FILE);
        let text = serde_json::to_string_pretty(self)?;
        fs::write(&path, text).map_err(|source| DriverError::Write {
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }
}

fn absolutize(path: PathBuf, base: &Path) -> PathBuf {
    if path.is_absolute() {
        path
    } else {
        base.join(path)
    }
}

/// Mutation values the engine substitutes for fuzzable primitives, plus
/// user-supplied custom payloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MutationsDictionary {
    pub fuzzable_string: Vec<String>,
    pub fuzzable_int: Vec<String>,
    pub fuzzable_number: Vec<String>,
    pub fuzzable_bool: Vec<String>,
    pub fuzzable_datetime: Vec<String>,
    pub fuzzable_object: Vec<String>,
    pub fuzzable_uuid4: Vec<String>,
    pub custom_payload: BTreeMap<String, Vec<String>>,
    pub custom_payload_header: BTreeMap<String, Vec<String>>,
}

impl Default for MutationsDictionary {
    fn default() -> Self {
        Self {
            fuzzable_string: vec!["fuzzstring".to_string()],
            fuzzable_int: vec!["0".to_string(), "1".to_string()],
            fuzzable_number: vec!["0.1".to_string(), "1.2".to_string()],
            fuzzable_bool: vec!["true".to_string()],
            fuzzable_datetime: vec!["2019-06-26T20:20:39+00:00".to_string()],
            fuzzable_object: vec!["{}".to_string()],
            fuzzable_uuid4: vec!["903bcc44-30cf-4d89-946d-12521f34c2b4".to_string()],
            custom_payload: BTreeMap::new(),
            custom_payload_header: BTreeMap::new(),
        }
    }
}

/// Persist the default mutations dictionary into `dir` and return its path.
pub fn write_default_dictionary(dir: &Path) -> Result<PathBuf, DriverError> {
    let path = dir.join(DEFAULT_DICTIONARY_FILE);
    let text = serde_json::to_string_pretty(&MutationsDictionary::default())?;
    fs::write(&path, text).map_err(|source| DriverError::Write {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}
