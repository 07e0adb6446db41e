//! Test identity: stable, human-readable names and filesystem paths derived
//! from raw test-runner identity strings.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A test name without a `[parameters]` suffix.
///
/// Every fixture-producing test case is parameterized; an unparameterized
/// name is a caller contract violation and aborts collection for that case.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("test name '{0}' has no parameter suffix")]
pub struct MalformedTestName(pub String);

/// Granularity at which debug-dump directories are scoped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DumpGranularity {
    TestModule,
    TestFunction,
    TestParameter,
}

impl DumpGranularity {
    /// Parse granularity with loose casing.
    #[must_use]
    pub fn from_str_loose(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "test_module" | "module" => Some(Self::TestModule),
            "test_function" | "function" => Some(Self::TestFunction),
            "test_parameter" | "parameter" => Some(Self::TestParameter),
            _ => None,
        }
    }

    /// Stable label used in diagnostics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TestModule => "test_module",
            Self::TestFunction => "test_function",
            Self::TestParameter => "test_parameter",
        }
    }
}

/// Remove the literal `test_` prefix from a test case name, if present.
/// Idempotent.
#[must_use]
pub fn strip_test_prefix(name: &str) -> &str {
    name.strip_prefix("test_").unwrap_or(name)
}

/// Directory name for `test_module` relative to the base test-definitions
/// directory, usable inside the fixture output tree or the debug dump tree.
///
/// Example: `/tests/shanghai/eip3855_push0/test_push0.py` under `/tests`
/// becomes `shanghai/eip3855_push0/test_push0`.
#[must_use]
pub fn module_relative_output_dir(test_module: &Path, filler_path: &Path) -> PathBuf {
    let stemmed = test_module.with_extension("");
    let relative = strip_common_ancestor(&stemmed, filler_path);
    match (relative.parent(), relative.file_stem()) {
        (Some(parent), Some(stem)) => parent.join(stem),
        _ => relative,
    }
}

fn strip_common_ancestor(path: &Path, other: &Path) -> PathBuf {
    let shared = path
        .components()
        .zip(other.components())
        .take_while(|(a, b)| a == b)
        .count();
    path.components().skip(shared).collect()
}

fn flatten_path(path: &Path) -> String {
    let components: Vec<_> = path
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect();
    components.join("__")
}

/// Identity of one test case instance, as reported by the test runner.
/// Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestInfo {
    /// Runner-assigned display name, including the bracketed parameter suffix.
    pub name: String,
    /// Fully qualified unique identifier of this test case instance.
    pub id: String,
    /// Test function name without parameterization.
    pub original_name: String,
    /// Filesystem path of the source test definition.
    pub path: PathBuf,
}

impl TestInfo {
    /// Split the runner name into the bare test name and the parameter token.
    ///
    /// Example: `test_push0[fork_Shanghai]` -> `("test_push0", "fork_Shanghai")`.
    /// Inside the parameter portion, each `[` and `-` becomes `_` and every
    /// `]` is dropped.
    pub fn name_and_parameters(&self) -> Result<(String, String), MalformedTestName> {
        let Some((test_name, raw_parameters)) = self.name.split_once('[') else {
            return Err(MalformedTestName(self.name.clone()));
        };
        let parameters: String = raw_parameters
            .chars()
            .filter_map(|c| match c {
                '[' | '-' => Some('_'),
                ']' => None,
                other => Some(other),
            })
            .collect();
        Ok((test_name.to_string(), parameters))
    }

    /// Flattened `name__parameters` form of this test case.
    pub fn single_test_name(&self) -> Result<String, MalformedTestName> {
        let (test_name, parameters) = self.name_and_parameters()?;
        Ok(format!("{test_name}__{parameters}"))
    }

    /// Debug-dump directory for this test case at the requested granularity.
    ///
    /// Returns `Ok(None)` when `base_dump_dir` is unset: dumping is disabled,
    /// not an error. The module component is flattened with a `__` join so
    /// the debug tree stays one level deep.
    pub fn dump_dir_path(
        &self,
        base_dump_dir: Option<&Path>,
        filler_path: &Path,
        granularity: DumpGranularity,
    ) -> Result<Option<PathBuf>, MalformedTestName> {
        let Some(base) = base_dump_dir else {
            return Ok(None);
        };
        let flat_module = flatten_path(&module_relative_output_dir(&self.path, filler_path));
        match granularity {
            DumpGranularity::TestModule => Ok(Some(base.join(flat_module))),
            DumpGranularity::TestFunction => {
                let (test_name, _) = self.name_and_parameters()?;
                Ok(Some(base.join(format!("{flat_module}__{test_name}"))))
            }
            DumpGranularity::TestParameter => {
                let (test_name, parameters) = self.name_and_parameters()?;
                Ok(Some(
                    base.join(format!("{flat_module}__{test_name}"))
                        .join(parameters),
                ))
            }
        }
    }
}
