//! Operator CLI for the AccountabilityMe ledger.
//!
//! Usage:
//!   ledger-cli verify-chain
//!   ledger-cli rebuild-projections
//!   ledger-cli export-events [--claim-id UUID] [--out PATH]
//!   ledger-cli create-genesis-editor --username NAME --display-name NAME
//!   ledger-cli run-demo [--scenario happy-path|tamper]

mod config;
mod signer;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use uuid::Uuid;

use ledger_contracts::command::LedgerCommand;
use ledger_contracts::error::{LedgerError, LedgerResult};
use ledger_contracts::payload::{
    ClaimDeclaredPayload, ClaimOperationalizedPayload, ClaimResolvedPayload, DirectionOfChange,
    EditorRegisteredPayload, EvidenceAddedPayload, Resolution, ScopeTriple,
};
use ledger_core::service::LedgerService;
use ledger_core::traits::{ChainVerification, EventStore, Projector};
use ledger_crypto::{Keypair, SystemKeypair};
use ledger_projector::InMemoryProjector;
use ledger_store::{InMemoryEventStore, SqliteEventStore};

use config::{LedgerConfig, StoreKind};
use signer::KeyRegistrySigner;

/// Identity used for events not attributable to a human editor: the
/// genesis editor registration in `run-demo`, and any bootstrap commands
/// an operator issues before onboarding their first human editor.
const SYSTEM_EDITOR_ID: Uuid = Uuid::nil();

#[derive(Parser)]
#[command(
    name = "ledger-cli",
    about = "Operator CLI for the AccountabilityMe ledger",
    long_about = "Inspects, verifies, and exports an AccountabilityMe ledger: chain \
                  integrity checks, projection rebuilds, claim bundle export, editor \
                  bootstrapping, and an end-to-end demo of the ledger's lifecycle."
)]
struct Cli {
    /// Path to a TOML configuration file. Falls back to defaults (in-memory
    /// store, ephemeral system key) if the file does not exist.
    #[arg(long, default_value = "ledger.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Re-derive the hash chain from storage and report whether it's intact.
    VerifyChain,
    /// Replay every stored event into a fresh projection and report progress.
    RebuildProjections,
    /// Export a claim's events as a self-contained, independently verifiable bundle.
    ExportEvents {
        #[arg(long = "claim-id")]
        claim_id: Option<Uuid>,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Register the first editor of a fresh ledger, signed by the system key.
    CreateGenesisEditor {
        #[arg(long)]
        username: String,
        #[arg(long = "display-name")]
        display_name: String,
    },
    /// Run an end-to-end demonstration of the ledger's lifecycle.
    RunDemo {
        #[arg(long, value_enum, default_value_t = Scenario::HappyPath)]
        scenario: Scenario,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Scenario {
    HappyPath,
    Tamper,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    let result = run(&cli);

    if let Err(e) = result {
        eprintln!("ledger-cli error: {e}");
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> LedgerResult<()> {
    let config = LedgerConfig::load(&cli.config)?;

    match &cli.command {
        Command::VerifyChain => verify_chain(&config),
        Command::RebuildProjections => rebuild_projections(&config),
        Command::ExportEvents { claim_id, out } => export_events(&config, *claim_id, out.as_deref()),
        Command::CreateGenesisEditor { username, display_name } => {
            create_genesis_editor(&config, username, display_name)
        }
        Command::RunDemo { scenario } => run_demo(*scenario),
    }
}

/// Open the `EventStore` named by `config.store`.
fn open_store(config: &LedgerConfig) -> LedgerResult<Arc<dyn EventStore>> {
    match config.store {
        StoreKind::Memory => Ok(Arc::new(InMemoryEventStore::new())),
        StoreKind::Sqlite => {
            let path = config.sqlite_path.as_deref().ok_or_else(|| LedgerError::ConfigError {
                reason: "store = \"sqlite\" requires sqlite_path".to_string(),
            })?;
            Ok(Arc::new(SqliteEventStore::open(path)?))
        }
    }
}

/// Replay every event in `store` into a fresh `InMemoryProjector`.
fn rebuild_projector(store: &dyn EventStore) -> LedgerResult<InMemoryProjector> {
    let projector = InMemoryProjector::new();
    let total = store.count()?;
    let mut applied = 0u64;
    for event in store.range(0, total)? {
        projector.apply(&event)?;
        applied += 1;
    }
    tracing::info!(applied, "rebuilt projections from storage");
    Ok(projector)
}

fn verify_chain(config: &LedgerConfig) -> LedgerResult<()> {
    let store = open_store(config)?;
    match store.verify_chain()? {
        ChainVerification::Intact { checked } => {
            println!("chain intact: {checked} event(s) verified");
        }
        ChainVerification::Broken { sequence, reason } => {
            println!("chain BROKEN at sequence {sequence}: {reason}");
            std::process::exit(2);
        }
    }
    Ok(())
}

fn rebuild_projections(config: &LedgerConfig) -> LedgerResult<()> {
    let store = open_store(config)?;
    let projector = rebuild_projector(store.as_ref())?;
    let claims = projector.list_claim_views()?;
    println!("rebuilt {} claim view(s) from {} event(s)", claims.len(), store.count()?);
    Ok(())
}

fn export_events(config: &LedgerConfig, claim_id: Option<Uuid>, out: Option<&std::path::Path>) -> LedgerResult<()> {
    let store = open_store(config)?;
    let projector = rebuild_projector(store.as_ref())?;

    let claim_id = match claim_id {
        Some(id) => id,
        None => {
            let claims = projector.list_claim_views()?;
            let first = claims.first().ok_or_else(|| LedgerError::UnknownEntity {
                kind: "claim".to_string(),
                id: "<none>".to_string(),
            })?;
            first.claim_id
        }
    };

    let bundle = ledger_bundle::export_bundle(store.as_ref(), &projector, claim_id)?;
    let json = serde_json::to_string_pretty(&bundle).map_err(|e| LedgerError::CanonicalizationError {
        reason: format!("failed to serialize bundle: {e}"),
    })?;

    match out {
        Some(path) => {
            std::fs::write(path, &json).map_err(|e| LedgerError::StorageUnavailable {
                reason: format!("failed to write bundle to '{}': {e}", path.display()),
            })?;
            println!("wrote bundle for claim {claim_id} to {}", path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn create_genesis_editor(config: &LedgerConfig, username: &str, display_name: &str) -> LedgerResult<()> {
    let store = open_store(config)?;
    let projector: Arc<dyn Projector> = Arc::new(InMemoryProjector::new());
    let system = SystemKeypair::load_or_generate(config.system_key_path.as_deref().map(std::path::Path::new))?;

    let signer = Arc::new(KeyRegistrySigner::new());
    signer.register(SYSTEM_EDITOR_ID, system.keypair);

    let service = LedgerService::new(store, projector, signer, SYSTEM_EDITOR_ID);

    let editor_keypair = Keypair::generate();
    let editor_id = Uuid::new_v4();
    let receipt = service.submit(LedgerCommand::RegisterEditor {
        editor_id: SYSTEM_EDITOR_ID,
        payload: EditorRegisteredPayload {
            editor_id,
            username: username.to_string(),
            display_name: display_name.to_string(),
            role: "editor".to_string(),
            public_key: editor_keypair.public_key_base64(),
        },
    })?;

    println!("registered editor {editor_id} at sequence {}", receipt.sequence_number);
    println!("editor signing seed (save this, it is never persisted): {}", editor_keypair.seed_base64());
    Ok(())
}

/// Wires an in-memory ledger with a genesis editor and runs it through the
/// declare → operationalize → add-evidence → resolve lifecycle, or,
/// under `--scenario tamper`, additionally corrupts a stored event's payload
/// post-hoc to show `verify-chain` and a bundle verdict both catching it.
fn run_demo(scenario: Scenario) -> LedgerResult<()> {
    print_banner();

    let store = Arc::new(InMemoryEventStore::new());
    let projector = Arc::new(InMemoryProjector::new());
    let system = SystemKeypair::load_or_generate(None)?;
    let signer = Arc::new(KeyRegistrySigner::new());
    signer.register(SYSTEM_EDITOR_ID, system.keypair);

    let service = LedgerService::new(store.clone(), projector.clone(), signer.clone(), SYSTEM_EDITOR_ID);

    let editor_keypair = Keypair::generate();
    let editor_id = Uuid::new_v4();
    service.submit(LedgerCommand::RegisterEditor {
        editor_id: SYSTEM_EDITOR_ID,
        payload: EditorRegisteredPayload {
            editor_id,
            username: "demo_editor".to_string(),
            display_name: "Demo Editor".to_string(),
            role: "editor".to_string(),
            public_key: editor_keypair.public_key_base64(),
        },
    })?;
    signer.register(editor_id, editor_keypair);
    println!("[1] registered editor {editor_id}");

    let claim_id = Uuid::new_v4();
    service.submit(LedgerCommand::DeclareClaim {
        claim_id,
        editor_id,
        payload: ClaimDeclaredPayload {
            statement: "Lowering the speed limit will reduce pedestrian injuries.".to_string(),
            statement_context: Some("City council transcript, 2026-05-01".to_string()),
            source_url: None,
            claim_type: ledger_contracts::payload::ClaimType::Causal,
            scope: ScopeTriple {
                subject: "pedestrian injury rate".to_string(),
                jurisdiction: "Riverside District".to_string(),
                made_at: "2026-05-01".to_string(),
            },
        },
    })?;
    println!("[2] declared claim {claim_id}");

    service.submit(LedgerCommand::OperationalizeClaim {
        claim_id,
        editor_id,
        payload: ClaimOperationalizedPayload {
            outcome_description: "Pedestrian injuries per 10,000 residents".to_string(),
            metrics: vec!["pedestrian_injuries_per_10k".to_string()],
            direction_of_change: DirectionOfChange::Decrease,
            start_date: "2026-05-01".to_string(),
            evaluation_date: "2026-11-01".to_string(),
            tolerance_window_days: 14,
            success_conditions: vec!["injury rate drops by at least 10%".to_string()],
            partial_conditions: vec![],
            failure_conditions: vec![],
        },
    })?;
    println!("[3] operationalized claim");

    let evidence_receipt = service.submit(LedgerCommand::AddEvidence {
        claim_id,
        editor_id,
        payload: EvidenceAddedPayload {
            source_url: "https://example.gov/traffic-report".to_string(),
            source_title: "Riverside District Traffic Safety Report".to_string(),
            publisher: Some("Riverside District Transportation Office".to_string()),
            published_date: Some("2026-11-02".to_string()),
            source_type: "government_report".to_string(),
            evidence_type: "official_statistics".to_string(),
            summary: "Pedestrian injuries fell 14% after the speed limit change.".to_string(),
            supports_claim: true,
            confidence_score: Some("0.8".to_string()),
        },
    })?;
    println!("[4] added evidence at sequence {}", evidence_receipt.sequence_number);

    service.submit(LedgerCommand::ResolveClaim {
        claim_id,
        editor_id,
        payload: ClaimResolvedPayload {
            resolution: Resolution::Met,
            resolution_summary: "Pedestrian injuries fell 14%, exceeding the 10% target.".to_string(),
            supporting_evidence_ids: vec![evidence_receipt.event_id],
            resolution_details: None,
        },
    })?;
    println!("[5] resolved claim");

    match scenario {
        Scenario::HappyPath => {
            let verification = service.verify_and_latch()?;
            println!("[6] chain verification: {verification:?}");

            let bundle = ledger_bundle::export_bundle(store.as_ref(), projector.as_ref(), claim_id)?;
            let verdict = ledger_bundle::verify_bundle(&bundle);
            println!("[7] bundle verdict: {verdict:?}");
        }
        Scenario::Tamper => {
            tamper_with_stored_event(&store, claim_id)?;

            let verification = service.verify_and_latch()?;
            println!("[6] chain verification after tampering: {verification:?}");

            let bundle = ledger_bundle::export_bundle(store.as_ref(), projector.as_ref(), claim_id)?;
            let verdict = ledger_bundle::verify_bundle(&bundle);
            println!("[7] bundle verdict after tampering: {verdict:?}");
        }
    }

    Ok(())
}

/// Mutates a claim's first event's payload directly in storage, bypassing
/// `LedgerService::submit` entirely, to simulate the kind of out-of-band
/// tampering the hash chain and bundle verification are meant to detect.
fn tamper_with_stored_event(store: &InMemoryEventStore, claim_id: Uuid) -> LedgerResult<()> {
    let mut events = store.events_for_claim(claim_id)?;
    events.sort_by_key(|e| e.sequence_number);
    let target = events.first().ok_or_else(|| LedgerError::UnknownEntity {
        kind: "claim".to_string(),
        id: claim_id.to_string(),
    })?;
    store.tamper_payload_for_test(target.sequence_number, serde_json::json!({"tampered": true}))
}

fn print_banner() {
    println!();
    println!("AccountabilityMe Ledger — Demo");
    println!("==============================");
    println!();
    println!("Lifecycle: declare -> operationalize -> add evidence -> resolve");
    println!();
}
