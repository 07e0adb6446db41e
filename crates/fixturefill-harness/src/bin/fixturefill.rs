//! CLI entrypoint: drive collect -> dump -> verify from a collection manifest.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use fixturefill_core::{CollectorConfig, FixtureCollector};
use fixturefill_harness::structured_log::{LogEmitter, LogEntry, LogLevel, Outcome, Phase};
use fixturefill_harness::{CollectionManifest, ExternalConsumer};

/// Fixture collection tooling for deterministic-engine compliance tests.
#[derive(Debug, Parser)]
#[command(name = "fixturefill")]
#[command(about = "Collect, write, and verify compliance test fixtures")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Collect every manifest entry, write the fixture tree, optionally verify.
    Fill {
        /// Collection manifest (JSONL).
        #[arg(long)]
        manifest: PathBuf,
        /// Fixture output directory, or `stdout` for one combined document.
        #[arg(long)]
        output: PathBuf,
        /// Flatten module/function/parameters into a single path component.
        #[arg(long)]
        flat_output: bool,
        /// One fixture file per test case instead of per test function.
        #[arg(long)]
        single_fixture_per_file: bool,
        /// Root directory containing all test definitions.
        #[arg(long, default_value = "tests")]
        filler_path: PathBuf,
        /// Debug-dump root directory (disabled when omitted).
        #[arg(long)]
        base_dump_dir: Option<PathBuf>,
        /// Structured JSONL log output path.
        #[arg(long)]
        log: Option<PathBuf>,
        /// External verification tool; verification is skipped when omitted.
        #[arg(long)]
        consumer: Option<PathBuf>,
        /// Fixture format names the consumer understands (repeatable).
        #[arg(long = "consumable")]
        consumable: Vec<String>,
        /// Fixed leading arguments passed to the consumer (repeatable).
        #[arg(long = "consumer-arg")]
        consumer_args: Vec<String>,
    },
    /// Print the computed output path for each manifest entry, writing nothing.
    ShowPaths {
        /// Collection manifest (JSONL).
        #[arg(long)]
        manifest: PathBuf,
        /// Fixture output directory used for path computation.
        #[arg(long)]
        output: PathBuf,
        /// Flatten module/function/parameters into a single path component.
        #[arg(long)]
        flat_output: bool,
        /// One fixture file per test case instead of per test function.
        #[arg(long)]
        single_fixture_per_file: bool,
        /// Root directory containing all test definitions.
        #[arg(long, default_value = "tests")]
        filler_path: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Command::Fill {
            manifest,
            output,
            flat_output,
            single_fixture_per_file,
            filler_path,
            base_dump_dir,
            log,
            consumer,
            consumable,
            consumer_args,
        } => {
            let manifest = CollectionManifest::from_file(&manifest)?;
            if manifest.is_empty() {
                return Err("manifest contains no entries".into());
            }
            let mut emitter = match log {
                Some(path) => Some(LogEmitter::to_file(&path, "fixturefill")?),
                None => None,
            };

            let collector = FixtureCollector::new(CollectorConfig {
                output_dir: output,
                flat_output,
                single_fixture_per_file,
                filler_path,
                base_dump_dir,
            });

            for entry in manifest.entries {
                let (info, fixture) = entry.into_parts();
                let path = collector.add_fixture(&info, fixture)?;
                eprintln!("collected {} -> {}", info.id, path.display());
            }
            let total = collector.total_fixtures() as u64;
            if let Some(emitter) = emitter.as_mut() {
                emitter.emit_entry(
                    LogEntry::new("", LogLevel::Info, "collect_done")
                        .with_phase(Phase::Collect)
                        .with_outcome(Outcome::Pass)
                        .with_fixture_count(total),
                )?;
            }

            collector.dump_fixtures()?;
            if let Some(emitter) = emitter.as_mut() {
                emitter.emit_entry(
                    LogEntry::new("", LogLevel::Info, "dump_done")
                        .with_phase(Phase::Dump)
                        .with_outcome(Outcome::Pass)
                        .with_fixture_count(total),
                )?;
            }
            eprintln!(
                "wrote {} fixture(s) across {} file(s)",
                total,
                collector.fixture_paths().len()
            );

            if let Some(program) = consumer {
                if consumable.is_empty() {
                    return Err("--consumer requires at least one --consumable format".into());
                }
                let tool = ExternalConsumer::new(program, consumable)
                    .with_leading_args(consumer_args);
                let verification = collector.verify_fixture_files(&tool);
                if let Some(emitter) = emitter.as_mut() {
                    let outcome = if verification.is_ok() {
                        Outcome::Pass
                    } else {
                        Outcome::Fail
                    };
                    emitter.emit_entry(
                        LogEntry::new("", LogLevel::Info, "verify_done")
                            .with_phase(Phase::Verify)
                            .with_outcome(outcome),
                    )?;
                }
                verification?;
                eprintln!("verification passed for all fixture files");
            }

            if let Some(emitter) = emitter.as_mut() {
                emitter.flush()?;
            }
        }
        Command::ShowPaths {
            manifest,
            output,
            flat_output,
            single_fixture_per_file,
            filler_path,
        } => {
            let manifest = CollectionManifest::from_file(&manifest)?;
            let collector = FixtureCollector::new(CollectorConfig {
                output_dir: output,
                flat_output,
                single_fixture_per_file,
                filler_path,
                base_dump_dir: None,
            });
            for entry in manifest.entries {
                let (info, fixture) = entry.into_parts();
                let path = collector.add_fixture(&info, fixture)?;
                println!("{}\t{}", info.id, path.display());
            }
        }
    }

    Ok(())
}
