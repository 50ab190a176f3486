//! pSOL sequencer binary.

mod cli;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser as _;
use cli::Cli;
use psol_chain::{ChainClient, MockChain};
use psol_merkle::MerkleTree;
use psol_prover::{
    BatchProver, LocalVerifier, MockProver, SnarkjsProver, VerifyingKey,
};
use psol_sequencer::{
    CycleOutcome, Sequencer, SequencerConfig, ValidatedSequencerConfig,
};

fn init_tracing() -> eyre::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_timer(tracing_subscriber::fmt::time::uptime())
        .with_target(false)
        .try_init()
        .map_err(|e| eyre::eyre!("Failed to initialize tracing: {:?}", e))?;
    Ok(())
}

fn main() -> eyre::Result<()> {
    // Load .env file (fails silently if not found)
    let _ = dotenvy::dotenv();

    init_tracing()?;

    let cli = Cli::parse();
    let config = SequencerConfig::from_file(&cli.config)?.validate()?;

    if !cli.dry_run {
        // The chain transport is an integration point, not part of this
        // binary: deployments embed the sequencer library with their
        // ChainClient implementation.
        eyre::bail!(
            "no chain transport is wired into this binary; embed \
             psol_sequencer::Sequencer with a ChainClient for your RPC \
             stack, or pass --dry-run to exercise the pipeline in memory"
        );
    }

    let empty_root = MerkleTree::new(config.merkle_depth, config.root_history_size)?
        .root()
        .to_be32();
    let chain = MockChain::new(config.merkle_depth, empty_root);

    if cli.mock_prover {
        run_sequencer(&cli, config, chain, MockProver::new(), None)
    } else {
        let prover =
            SnarkjsProver::new(config.witness_wasm.clone(), config.proving_key.clone());
        let verifier = match config.verifying_key_json.as_deref() {
            Some(path) => {
                let vk = VerifyingKey::from_json_file(path)?;
                Some(LocalVerifier::from_key(&vk)?)
            }
            None => None,
        };
        run_sequencer(&cli, config, chain, prover, verifier)
    }
}

fn run_sequencer<C, P>(
    cli: &Cli,
    config: ValidatedSequencerConfig,
    chain: C,
    prover: P,
    verifier: Option<LocalVerifier>,
) -> eyre::Result<()>
where
    C: ChainClient,
    P: BatchProver,
{
    let mut sequencer = Sequencer::new(config, chain, prover)?.with_force(cli.force);
    if let Some(verifier) = verifier {
        sequencer = sequencer.with_verifier(verifier);
    }

    if cli.rebuild {
        sequencer.rebuild()?;
    }

    if cli.once {
        match sequencer.run_once()? {
            CycleOutcome::Idle => tracing::info!("nothing to settle"),
            CycleOutcome::Settled { summary, signature } => {
                tracing::info!(%summary, %signature, "settled one batch");
            }
            CycleOutcome::Raced => {
                tracing::warn!("chain advanced past the built batch; rerun to reconcile");
            }
        }
        return Ok(());
    }

    let stop = Arc::new(AtomicBool::new(false));
    let handler_flag = Arc::clone(&stop);
    ctrlc::set_handler(move || {
        handler_flag.store(true, Ordering::SeqCst);
    })?;

    sequencer.run(&stop)?;
    Ok(())
}
