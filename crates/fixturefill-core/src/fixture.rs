//! Fixture capability contract.

use serde::{Deserialize, Serialize};

/// Variant tag identifying a concrete fixture format.
///
/// One physical fixture file has exactly one serialization schema, so this
/// tag doubles as the uniform-type key for a file group and as the capability
/// key for consumer queries.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FixtureFormat {
    /// Stable format name (e.g. `state_test`).
    pub name: String,
    /// Subdirectory under the output root holding files of this format.
    pub output_base_dir: String,
    /// Output file extension, without the leading dot.
    pub output_file_extension: String,
}

/// Capability interface implemented by every concrete fixture type.
///
/// The wire formats themselves live outside this crate; the collector only
/// needs each fixture's output geometry and a JSON rendering.
pub trait Fixture: Send {
    /// Format tag of this fixture.
    fn format(&self) -> &FixtureFormat;

    /// JSON rendering of this fixture. The collector keys it by the owning
    /// test case id when building the file document.
    fn to_json(&self) -> Result<serde_json::Value, serde_json::Error>;
}
