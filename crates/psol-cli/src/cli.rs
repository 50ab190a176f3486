//! Command-line surface of the sequencer binary.

use std::path::PathBuf;

use clap::Parser;

/// Batch-settlement sequencer for the pSOL shielded pool.
///
/// With no mode flags the sequencer polls continuously until stopped or a
/// fatal condition halts it (non-zero exit).
#[derive(Debug, Parser)]
#[command(name = "psol-sequencer")]
#[command(about = "Batch-settlement sequencer for the pSOL shielded pool")]
pub struct Cli {
    /// Path to the sequencer configuration file.
    #[arg(long, env = "PSOL_SEQUENCER_CONFIG", default_value = "sequencer.json")]
    pub config: PathBuf,

    /// Run a single polling cycle, then exit. Exit code 0 when there was
    /// nothing to do or the batch settled.
    #[arg(long)]
    pub once: bool,

    /// Reset local state and rebuild it from on-chain events before
    /// entering the configured mode.
    #[arg(long)]
    pub rebuild: bool,

    /// Bypass the root-mismatch halt. Operator override only; never the
    /// default.
    #[arg(long)]
    pub force: bool,

    /// Run against an in-memory pool instead of a live deployment
    /// (pipeline shakeout).
    #[arg(long)]
    pub dry_run: bool,

    /// With --dry-run: substitute the deterministic mock prover for the
    /// circuit toolchain.
    #[arg(long, requires = "dry_run")]
    pub mock_prover: bool,
}
