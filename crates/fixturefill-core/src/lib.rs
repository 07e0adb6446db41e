//! Fixture collection and naming for compliance test generation against a
//! deterministic execution engine.
//!
//! This crate provides:
//! - Test identity: stable, collision-free names and paths derived from raw
//!   test-runner identity strings
//! - Fixture collector: in-memory accumulation of fixtures keyed by computed
//!   output path, with a single end-of-run flush
//! - Fixture file groups: ordered id -> fixture mappings, one per physical
//!   file, with a one-format-per-file invariant
//! - Consumer contract: post-hoc verification of fixture files through an
//!   external tool
//!
//! Fixture wire formats, fork metadata, and the test runner itself are
//! external collaborators.

#![forbid(unsafe_code)]

pub mod collector;
pub mod consume;
pub mod fixture;
pub mod test_info;

pub use collector::{
    CollectorConfig, DumpError, FixtureCollector, FixtureFileGroup, FormatMismatch, VerifyError,
};
pub use consume::{ConsumeError, FixtureConsumer};
pub use fixture::{Fixture, FixtureFormat};
pub use test_info::{
    DumpGranularity, MalformedTestName, TestInfo, module_relative_output_dir, strip_test_prefix,
};
