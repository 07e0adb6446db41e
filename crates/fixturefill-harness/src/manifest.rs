//! Collection manifests: captured fixtures plus the test identity that
//! produced them, as JSONL (one entry per line).
//!
//! The manifest carries pre-serialized fixture bodies, so the harness can
//! drive the collector without owning any concrete wire format.

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use fixturefill_core::{Fixture, FixtureFormat, TestInfo};

/// Error loading or parsing a collection manifest.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("line {line}: {source}")]
    Parse {
        line: usize,
        source: serde_json::Error,
    },
}

/// One captured fixture awaiting collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub test: TestInfo,
    pub format: FixtureFormat,
    pub body: Value,
}

impl ManifestEntry {
    /// Split into the identity and a boxed fixture ready for the collector.
    #[must_use]
    pub fn into_parts(self) -> (TestInfo, Box<dyn Fixture>) {
        (
            self.test,
            Box::new(RawFixture {
                format: self.format,
                body: self.body,
            }),
        )
    }
}

/// Generic fixture carrier for an already-serialized payload.
#[derive(Debug, Clone)]
pub struct RawFixture {
    pub format: FixtureFormat,
    pub body: Value,
}

impl Fixture for RawFixture {
    fn format(&self) -> &FixtureFormat {
        &self.format
    }

    fn to_json(&self) -> Result<Value, serde_json::Error> {
        Ok(self.body.clone())
    }
}

/// A full collection manifest. Blank lines are ignored.
#[derive(Debug, Clone, Default)]
pub struct CollectionManifest {
    pub entries: Vec<ManifestEntry>,
}

impl CollectionManifest {
    /// Parse a manifest from JSONL content.
    pub fn from_jsonl(content: &str) -> Result<Self, ManifestError> {
        let mut entries = Vec::new();
        for (index, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let entry = serde_json::from_str(line).map_err(|source| ManifestError::Parse {
                line: index + 1,
                source,
            })?;
            entries.push(entry);
        }
        Ok(Self { entries })
    }

    /// Load a manifest from a file path.
    pub fn from_file(path: &Path) -> Result<Self, ManifestError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_jsonl(&content)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry_line(parameters: &str, n: u64) -> String {
        serde_json::to_string(&json!({
            "test": {
                "name": format!("test_push0[{parameters}]"),
                "id": format!("tests/shanghai/eip3855_push0/test_push0.py::test_push0[{parameters}]"),
                "original_name": "test_push0",
                "path": "/tests/shanghai/eip3855_push0/test_push0.py"
            },
            "format": {
                "name": "state_test",
                "output_base_dir": "state_tests",
                "output_file_extension": "json"
            },
            "body": {"n": n}
        }))
        .unwrap()
    }

    #[test]
    fn parses_one_entry_per_line() {
        let content = format!(
            "{}\n\n{}\n",
            entry_line("fork_Shanghai", 1),
            entry_line("fork_Paris", 2)
        );
        let manifest = CollectionManifest::from_jsonl(&content).unwrap();
        assert_eq!(manifest.len(), 2);
        assert_eq!(manifest.entries[0].test.original_name, "test_push0");
        assert_eq!(manifest.entries[1].body, json!({"n": 2}));
    }

    #[test]
    fn reports_the_offending_line_number() {
        let content = format!("{}\nnot-json\n", entry_line("fork_Shanghai", 1));
        let err = CollectionManifest::from_jsonl(&content).unwrap_err();
        match err {
            ManifestError::Parse { line, .. } => assert_eq!(line, 2),
            other => panic!("expected Parse error, got {other}"),
        }
    }

    #[test]
    fn raw_fixture_round_trips_body() {
        let manifest =
            CollectionManifest::from_jsonl(&entry_line("fork_Shanghai", 7)).unwrap();
        let (info, fixture) = manifest.entries[0].clone().into_parts();
        assert_eq!(info.name, "test_push0[fork_Shanghai]");
        assert_eq!(fixture.format().name, "state_test");
        assert_eq!(fixture.to_json().unwrap(), json!({"n": 7}));
    }
}
