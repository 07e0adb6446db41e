//! Fixture collection: accumulate fixtures keyed by computed output path
//! across one test-generation run, then flush everything in a single pass
//! and optionally verify each fixture file with an external consumer.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::consume::{ConsumeError, FixtureConsumer};
use crate::fixture::{Fixture, FixtureFormat};
use crate::test_info::{
    DumpGranularity, MalformedTestName, TestInfo, module_relative_output_dir, strip_test_prefix,
};

/// Two distinct concrete formats found while checking the one-format-per-file
/// invariant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{first} vs {second}")]
pub struct FormatMismatch {
    pub first: String,
    pub second: String,
}

/// Error raised while flushing collected fixtures to disk or stdout.
#[derive(Debug, Error)]
pub enum DumpError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialize: {0}")]
    Serialize(#[from] serde_json::Error),
    /// Writing a file with inconsistent schema would silently corrupt
    /// downstream consumers, so this surfaces before any byte is written.
    #[error("mixed fixture formats in {}: {mismatch}", .path.display())]
    MixedFormats {
        path: PathBuf,
        mismatch: FormatMismatch,
    },
}

/// Error raised during post-hoc verification. Distinct from [`DumpError`] so
/// callers can tell a failed verification from a failed flush.
#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("verification of {} failed: {source}", .path.display())]
    Consume {
        path: PathBuf,
        source: ConsumeError,
    },
    #[error(transparent)]
    Identity(#[from] MalformedTestName),
}

/// Everything destined for one physical fixture file: an insertion-ordered
/// mapping from test case id to fixture.
#[derive(Default)]
pub struct FixtureFileGroup {
    entries: Vec<(String, Box<dyn Fixture>)>,
}

impl FixtureFileGroup {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert under `id`, overwriting an existing entry with the same id.
    ///
    /// Duplicate ids only occur for re-runs of the exact same test case;
    /// distinct parameterizations always carry distinct ids.
    pub fn insert(&mut self, id: String, fixture: Box<dyn Fixture>) {
        if let Some(entry) = self.entries.iter_mut().find(|(existing, _)| *existing == id) {
            entry.1 = fixture;
        } else {
            self.entries.push((id, fixture));
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &dyn Fixture)> {
        self.entries
            .iter()
            .map(|(id, fixture)| (id.as_str(), fixture.as_ref()))
    }

    /// The single format shared by every fixture in this group, or the
    /// mismatching pair when the invariant is violated. `Ok(None)` for an
    /// empty group.
    pub fn uniform_format(&self) -> Result<Option<&FixtureFormat>, FormatMismatch> {
        let mut formats = self.entries.iter().map(|(_, fixture)| fixture.format());
        let Some(first) = formats.next() else {
            return Ok(None);
        };
        for format in formats {
            if format != first {
                return Err(FormatMismatch {
                    first: first.name.clone(),
                    second: format.name.clone(),
                });
            }
        }
        Ok(Some(first))
    }

    /// Serialize to a JSON object keyed by fixture id.
    pub fn to_json_object(&self) -> Result<Map<String, Value>, serde_json::Error> {
        let mut object = Map::new();
        for (id, fixture) in &self.entries {
            object.insert(id.clone(), fixture.to_json()?);
        }
        Ok(object)
    }
}

/// Resolved configuration for one fixture-generation run.
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    /// Root of the fixture output tree. A final component of literally
    /// `stdout` selects combined-stream mode instead of per-file output.
    pub output_dir: PathBuf,
    /// Flatten module, function, and parameters into one path component.
    pub flat_output: bool,
    /// One file per test case instead of one file per test function.
    pub single_fixture_per_file: bool,
    /// Root directory containing all test definitions.
    pub filler_path: PathBuf,
    /// Debug-dump root; `None` disables debug dumping.
    pub base_dump_dir: Option<PathBuf>,
}

#[derive(Default)]
struct CollectorState {
    all_fixtures: BTreeMap<PathBuf, FixtureFileGroup>,
    path_to_test_info: BTreeMap<PathBuf, TestInfo>,
}

/// Collects every fixture generated during one test run.
///
/// Explicitly constructed and explicitly scoped: one collector per run, never
/// a process-wide global, so runs can coexist. `add_fixture` may be called
/// from concurrently executing test cases; both internal maps sit behind one
/// mutex and insertion is a short non-blocking map write. Accumulation is
/// monotonic: nothing is ever removed before the flush.
pub struct FixtureCollector {
    config: CollectorConfig,
    state: Mutex<CollectorState>,
}

impl FixtureCollector {
    #[must_use]
    pub fn new(config: CollectorConfig) -> Self {
        Self {
            config,
            state: Mutex::new(CollectorState::default()),
        }
    }

    #[must_use]
    pub fn config(&self) -> &CollectorConfig {
        &self.config
    }

    /// Basename (no type subdirectory, no extension) of the fixture file for
    /// a test case, per the `(flat_output, single_fixture_per_file)` policy
    /// matrix.
    ///
    /// With `single_fixture_per_file` off, every parameterization of one test
    /// function maps to the same basename; that collision is what groups
    /// multiple fixtures into a single file.
    pub fn fixture_basename(&self, info: &TestInfo) -> Result<PathBuf, MalformedTestName> {
        let file_name = if self.config.single_fixture_per_file {
            let single = info.single_test_name()?;
            strip_test_prefix(&single).to_string()
        } else {
            strip_test_prefix(&info.original_name).to_string()
        };
        if self.config.flat_output {
            Ok(PathBuf::from(file_name))
        } else {
            let module_dir = module_relative_output_dir(&info.path, &self.config.filler_path);
            Ok(module_dir.join(file_name))
        }
    }

    /// Record `fixture` for `info`, returning the output path it will land
    /// at. Callers display the path for diagnostics.
    ///
    /// In-memory only; cheap enough to call once per test case. The first
    /// test case to touch a path is remembered so verification can later pick
    /// a debug-dump directory for the whole file.
    pub fn add_fixture(
        &self,
        info: &TestInfo,
        fixture: Box<dyn Fixture>,
    ) -> Result<PathBuf, MalformedTestName> {
        let basename = self.fixture_basename(info)?;
        let format = fixture.format();
        let fixture_path = self
            .config
            .output_dir
            .join(&format.output_base_dir)
            .join(basename.with_extension(&format.output_file_extension));

        let mut state = self.state.lock();
        state
            .path_to_test_info
            .entry(fixture_path.clone())
            .or_insert_with(|| info.clone());
        state
            .all_fixtures
            .entry(fixture_path.clone())
            .or_default()
            .insert(info.id.clone(), fixture);
        Ok(fixture_path)
    }

    fn stdout_mode(&self) -> bool {
        self.config
            .output_dir
            .file_name()
            .is_some_and(|name| name == "stdout")
    }

    /// Merge every fixture from every group into one JSON object keyed by
    /// fixture id and write it to `writer` as a single document.
    ///
    /// This bypasses per-file grouping entirely; it exists for quick
    /// inspection and piping, not for the on-disk fixture-file format.
    pub fn write_combined<W: Write>(&self, mut writer: W) -> Result<(), DumpError> {
        let state = self.state.lock();
        let mut combined = Map::new();
        for group in state.all_fixtures.values() {
            for (id, fixture) in group.iter() {
                combined.insert(id.to_string(), fixture.to_json()?);
            }
        }
        let body = serde_json::to_string_pretty(&Value::Object(combined))?;
        writer.write_all(body.as_bytes())?;
        Ok(())
    }

    /// Flush every collected group to its fixture file, or to one combined
    /// stdout document when the output directory is the `stdout` sentinel.
    ///
    /// Directory creation is idempotent. Each file is a JSON object mapping
    /// fixture id to serialized fixture. Calling twice re-serializes
    /// everything; there is no incremental mode.
    pub fn dump_fixtures(&self) -> Result<(), DumpError> {
        if self.stdout_mode() {
            let stdout = std::io::stdout();
            return self.write_combined(stdout.lock());
        }
        std::fs::create_dir_all(&self.config.output_dir)?;
        let state = self.state.lock();
        for (fixture_path, group) in &state.all_fixtures {
            if let Some(parent) = fixture_path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            if let Err(mismatch) = group.uniform_format() {
                return Err(DumpError::MixedFormats {
                    path: fixture_path.clone(),
                    mismatch,
                });
            }
            let body = serde_json::to_string_pretty(&Value::Object(group.to_json_object()?))?;
            std::fs::write(fixture_path, body)?;
        }
        Ok(())
    }

    /// Invoke `consumer` once per fixture file whose format it can consume,
    /// with `fixture_name = None` ("validate the entire file").
    ///
    /// The uniform-format invariant makes one capability check per file
    /// sufficient. The debug-dump directory comes from the first test case
    /// recorded for each path: parameter-level when each file holds a single
    /// test case, function-level when parameterizations share a file.
    pub fn verify_fixture_files(&self, consumer: &dyn FixtureConsumer) -> Result<(), VerifyError> {
        let state = self.state.lock();
        for (fixture_path, group) in &state.all_fixtures {
            let Some(format) = group.iter().next().map(|(_, fixture)| fixture.format()) else {
                continue;
            };
            if !consumer.can_consume(format) {
                continue;
            }
            let debug_output_path = match state.path_to_test_info.get(fixture_path) {
                Some(info) => self.consume_dump_dir(info)?,
                None => None,
            };
            consumer
                .consume_fixture(format, fixture_path, None, debug_output_path.as_deref())
                .map_err(|source| VerifyError::Consume {
                    path: fixture_path.clone(),
                    source,
                })?;
        }
        Ok(())
    }

    fn consume_dump_dir(&self, info: &TestInfo) -> Result<Option<PathBuf>, MalformedTestName> {
        let granularity = if self.config.single_fixture_per_file {
            DumpGranularity::TestParameter
        } else {
            DumpGranularity::TestFunction
        };
        info.dump_dir_path(
            self.config.base_dump_dir.as_deref(),
            &self.config.filler_path,
            granularity,
        )
    }

    /// Output paths with at least one collected fixture, in sorted order.
    #[must_use]
    pub fn fixture_paths(&self) -> Vec<PathBuf> {
        self.state.lock().all_fixtures.keys().cloned().collect()
    }

    /// Number of fixtures collected under `path`.
    #[must_use]
    pub fn group_len(&self, path: &Path) -> Option<usize> {
        self.state
            .lock()
            .all_fixtures
            .get(path)
            .map(FixtureFileGroup::len)
    }

    /// Total fixtures across all groups.
    #[must_use]
    pub fn total_fixtures(&self) -> usize {
        self.state
            .lock()
            .all_fixtures
            .values()
            .map(FixtureFileGroup::len)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct JsonFixture {
        format: FixtureFormat,
        body: Value,
    }

    impl Fixture for JsonFixture {
        fn format(&self) -> &FixtureFormat {
            &self.format
        }

        fn to_json(&self) -> Result<Value, serde_json::Error> {
            Ok(self.body.clone())
        }
    }

    fn state_test_format() -> FixtureFormat {
        FixtureFormat {
            name: "state_test".to_string(),
            output_base_dir: "state_tests".to_string(),
            output_file_extension: "json".to_string(),
        }
    }

    fn state_fixture(body: Value) -> Box<dyn Fixture> {
        Box::new(JsonFixture {
            format: state_test_format(),
            body,
        })
    }

    fn push0_info(parameters: &str) -> TestInfo {
        let name = format!("test_push0[{parameters}]");
        TestInfo {
            id: format!("tests/shanghai/eip3855_push0/test_push0.py::{name}"),
            name,
            original_name: "test_push0".to_string(),
            path: PathBuf::from("/tests/shanghai/eip3855_push0/test_push0.py"),
        }
    }

    fn collector(flat_output: bool, single_fixture_per_file: bool) -> FixtureCollector {
        FixtureCollector::new(CollectorConfig {
            output_dir: PathBuf::from("/out"),
            flat_output,
            single_fixture_per_file,
            filler_path: PathBuf::from("/tests"),
            base_dump_dir: None,
        })
    }

    #[test]
    fn basename_flat_single() {
        let collector = collector(true, true);
        let basename = collector
            .fixture_basename(&push0_info("fork_Shanghai"))
            .unwrap();
        assert_eq!(basename, PathBuf::from("push0__fork_Shanghai"));
    }

    #[test]
    fn basename_flat_grouped() {
        let collector = collector(true, false);
        let basename = collector
            .fixture_basename(&push0_info("fork_Shanghai"))
            .unwrap();
        assert_eq!(basename, PathBuf::from("push0"));
    }

    #[test]
    fn basename_nested_single() {
        let collector = collector(false, true);
        let basename = collector
            .fixture_basename(&push0_info("fork_Shanghai"))
            .unwrap();
        assert_eq!(
            basename,
            PathBuf::from("shanghai/eip3855_push0/test_push0/push0__fork_Shanghai")
        );
    }

    #[test]
    fn basename_nested_grouped() {
        let collector = collector(false, false);
        let basename = collector
            .fixture_basename(&push0_info("fork_Shanghai"))
            .unwrap();
        assert_eq!(
            basename,
            PathBuf::from("shanghai/eip3855_push0/test_push0/push0")
        );
    }

    #[test]
    fn grouped_parameterizations_share_one_file() {
        let collector = collector(false, false);
        let shanghai = collector
            .add_fixture(&push0_info("fork_Shanghai"), state_fixture(json!({"x": 1})))
            .unwrap();
        let paris = collector
            .add_fixture(&push0_info("fork_Paris"), state_fixture(json!({"x": 2})))
            .unwrap();

        assert_eq!(shanghai, paris);
        assert_eq!(
            shanghai,
            PathBuf::from("/out/state_tests/shanghai/eip3855_push0/test_push0/push0.json")
        );
        assert_eq!(collector.fixture_paths().len(), 1);
        assert_eq!(collector.group_len(&shanghai), Some(2));
    }

    #[test]
    fn single_fixture_per_file_separates_parameterizations() {
        let collector = collector(false, true);
        let shanghai = collector
            .add_fixture(&push0_info("fork_Shanghai"), state_fixture(json!({})))
            .unwrap();
        let paris = collector
            .add_fixture(&push0_info("fork_Paris"), state_fixture(json!({})))
            .unwrap();

        assert_ne!(shanghai, paris);
        assert!(shanghai.ends_with("push0__fork_Shanghai.json"));
        assert!(paris.ends_with("push0__fork_Paris.json"));
        assert_eq!(collector.total_fixtures(), 2);
    }

    #[test]
    fn distinct_ids_accumulate_in_one_group() {
        let collector = collector(true, false);
        let mut last = PathBuf::new();
        for fork in ["A", "B", "C", "D", "E"] {
            last = collector
                .add_fixture(
                    &push0_info(&format!("fork_{fork}")),
                    state_fixture(json!({"fork": fork})),
                )
                .unwrap();
        }
        assert_eq!(collector.fixture_paths().len(), 1);
        assert_eq!(collector.group_len(&last), Some(5));
    }

    #[test]
    fn same_id_overwrites_in_place() {
        let mut group = FixtureFileGroup::new();
        group.insert("case".to_string(), state_fixture(json!({"run": 1})));
        group.insert("case".to_string(), state_fixture(json!({"run": 2})));
        assert_eq!(group.len(), 1);
        let (_, fixture) = group.iter().next().unwrap();
        assert_eq!(fixture.to_json().unwrap(), json!({"run": 2}));
    }

    #[test]
    fn distinct_formats_never_collide_on_disk() {
        let collector = collector(true, false);
        let state_path = collector
            .add_fixture(&push0_info("fork_Shanghai"), state_fixture(json!({})))
            .unwrap();
        let blockchain_path = collector
            .add_fixture(
                &push0_info("fork_Paris"),
                Box::new(JsonFixture {
                    format: FixtureFormat {
                        name: "blockchain_test".to_string(),
                        output_base_dir: "blockchain_tests".to_string(),
                        output_file_extension: "json".to_string(),
                    },
                    body: json!({}),
                }),
            )
            .unwrap();
        assert_ne!(state_path, blockchain_path);
        assert_eq!(collector.fixture_paths().len(), 2);
    }

    #[test]
    fn malformed_name_aborts_collection_for_the_case() {
        let collector = collector(true, true);
        let mut info = push0_info("fork_Shanghai");
        info.name = "test_push0".to_string();
        let err = collector
            .add_fixture(&info, state_fixture(json!({})))
            .unwrap_err();
        assert_eq!(err, MalformedTestName("test_push0".to_string()));
        assert_eq!(collector.total_fixtures(), 0);
    }

    #[test]
    fn uniform_format_reports_mismatch_pair() {
        let mut group = FixtureFileGroup::new();
        group.insert("a".to_string(), state_fixture(json!({})));
        group.insert(
            "b".to_string(),
            Box::new(JsonFixture {
                format: FixtureFormat {
                    name: "blockchain_test".to_string(),
                    output_base_dir: "blockchain_tests".to_string(),
                    output_file_extension: "json".to_string(),
                },
                body: json!({}),
            }),
        );
        let mismatch = group.uniform_format().unwrap_err();
        assert_eq!(mismatch.first, "state_test");
        assert_eq!(mismatch.second, "blockchain_test");
    }

    #[test]
    fn combined_stream_merges_all_groups() {
        let collector = FixtureCollector::new(CollectorConfig {
            output_dir: PathBuf::from("stdout"),
            flat_output: true,
            single_fixture_per_file: true,
            filler_path: PathBuf::from("/tests"),
            base_dump_dir: None,
        });
        collector
            .add_fixture(&push0_info("fork_Shanghai"), state_fixture(json!({"n": 1})))
            .unwrap();
        collector
            .add_fixture(&push0_info("fork_Paris"), state_fixture(json!({"n": 2})))
            .unwrap();

        let mut buffer = Vec::new();
        collector.write_combined(&mut buffer).unwrap();
        let document: Value = serde_json::from_slice(&buffer).unwrap();
        let object = document.as_object().unwrap();
        assert_eq!(object.len(), 2);
        assert!(object.contains_key(&push0_info("fork_Shanghai").id));
        assert!(object.contains_key(&push0_info("fork_Paris").id));
    }
}
