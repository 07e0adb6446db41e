//! Tooling around the fixture collector:
//! - Collection manifests: captured fixtures as JSONL, drivable end to end
//! - External consumer: subprocess adapter for the verification tool
//! - Structured logging: JSONL records per pipeline phase
//!
//! The `fixturefill` binary wires these together.

#![forbid(unsafe_code)]

pub mod external;
pub mod manifest;
pub mod structured_log;

pub use external::ExternalConsumer;
pub use manifest::{CollectionManifest, ManifestEntry, ManifestError, RawFixture};
pub use structured_log::{LogEmitter, LogEntry, LogLevel, Outcome, Phase, validate_log_line};
