//! External consumer contract for post-hoc fixture verification.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::fixture::FixtureFormat;

/// Failure modes of an external fixture consumer invocation.
#[derive(Debug, Error)]
pub enum ConsumeError {
    /// The consumer tool could not be spawned at all.
    #[error("failed to launch consumer: {0}")]
    Launch(#[from] std::io::Error),
    /// The consumer ran and rejected the fixture file.
    #[error("consumer rejected {}: {}", .path.display(), .detail)]
    Rejected { path: PathBuf, detail: String },
}

/// An external tool capable of validating fixture files against the engine
/// they target.
pub trait FixtureConsumer {
    /// Whether this consumer understands the given fixture format.
    fn can_consume(&self, format: &FixtureFormat) -> bool;

    /// Validate `fixture_path`. A `None` `fixture_name` means "validate the
    /// entire file". Failures must propagate, never be swallowed.
    fn consume_fixture(
        &self,
        format: &FixtureFormat,
        fixture_path: &Path,
        fixture_name: Option<&str>,
        debug_output_path: Option<&Path>,
    ) -> Result<(), ConsumeError>;
}
