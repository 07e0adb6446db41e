//! Subprocess adapter implementing the consumer contract with an external
//! verification tool.

use std::path::{Path, PathBuf};
use std::process::Command;

use fixturefill_core::{ConsumeError, FixtureConsumer, FixtureFormat};

/// External fixture-consuming tool, invoked once per fixture file.
///
/// Invocation shape:
/// `<program> [leading args..] <format-name> <fixture-path>
/// [--fixture-name <name>] [--debug-output-path <dir>]`
#[derive(Debug, Clone)]
pub struct ExternalConsumer {
    program: PathBuf,
    leading_args: Vec<String>,
    consumable: Vec<String>,
}

impl ExternalConsumer {
    /// Wrap `program`, declaring the fixture format names it understands.
    #[must_use]
    pub fn new(program: impl Into<PathBuf>, consumable: Vec<String>) -> Self {
        Self {
            program: program.into(),
            leading_args: Vec::new(),
            consumable,
        }
    }

    /// Fixed arguments inserted before the format name (e.g. a subcommand).
    #[must_use]
    pub fn with_leading_args(mut self, args: Vec<String>) -> Self {
        self.leading_args = args;
        self
    }

    #[must_use]
    pub fn program(&self) -> &Path {
        &self.program
    }
}

impl FixtureConsumer for ExternalConsumer {
    fn can_consume(&self, format: &FixtureFormat) -> bool {
        self.consumable.iter().any(|name| name == &format.name)
    }

    fn consume_fixture(
        &self,
        format: &FixtureFormat,
        fixture_path: &Path,
        fixture_name: Option<&str>,
        debug_output_path: Option<&Path>,
    ) -> Result<(), ConsumeError> {
        let mut command = Command::new(&self.program);
        command
            .args(&self.leading_args)
            .arg(&format.name)
            .arg(fixture_path);
        if let Some(name) = fixture_name {
            command.arg("--fixture-name").arg(name);
        }
        if let Some(dir) = debug_output_path {
            command.arg("--debug-output-path").arg(dir);
        }

        let output = command.output()?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ConsumeError::Rejected {
                path: fixture_path.to_path_buf(),
                detail: format!("{}: {}", output.status, stderr.trim()),
            });
        }
        Ok(())
    }
}
