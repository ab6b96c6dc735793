//! Command implementations. Each returns the rendered output.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use goldblock::core::{canonical, signed_message_hash};
use goldblock::{Harness, HarnessConfig, HarnessError, Signer, SqliteLedger};
use tracing::debug;

use crate::cli::{RecordArgs, SubmitArgs};
use crate::output::{
    AdmissionView, AncestorsView, EntryView, Formatter, RecordView, ReportView, SignedView,
};

/// Ledger file used when neither the flag nor the config names one.
const DEFAULT_LEDGER: &str = "goldblock.db";

/// Load the config file, if any, and apply flag overrides.
pub fn load_config(path: Option<&Path>, ledger: Option<PathBuf>) -> Result<HarnessConfig> {
    let mut config = match path {
        Some(path) => HarnessConfig::load(path)?,
        None => HarnessConfig::default(),
    };
    if ledger.is_some() {
        config.ledger_path = ledger;
    }
    Ok(config)
}

fn parse_key(hex_key: &str) -> Result<Signer> {
    Signer::from_hex(hex_key).context("invalid signing key")
}

async fn open_harness(config: HarnessConfig, rebuild: bool) -> Result<Harness<SqliteLedger>> {
    let path = config
        .ledger_path
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_LEDGER));
    debug!(path = %path.display(), rebuild, "opening ledger");

    let ledger = SqliteLedger::open(&path)
        .with_context(|| format!("opening ledger {}", path.display()))?
        .with_packing(config.array_packing)
        .with_signers(config.signers());

    if rebuild {
        Ok(Harness::open(ledger, config).await?)
    } else {
        Ok(Harness::new(ledger, config))
    }
}

pub fn execute_sign(args: &RecordArgs, config: &HarnessConfig, fmt: &Formatter) -> Result<String> {
    let signer = parse_key(&args.key)?;
    let record = args.build()?;

    let packing = config.array_packing;
    let content_id = record.content_id_with(packing);
    let signature = signer.sign(&content_id)?;

    fmt.render(&SignedView {
        record: RecordView::from(&record),
        encoding: hex::encode(canonical::encode_with(&record, packing)),
        content_id: content_id.to_hex(),
        signed_message_hash: hex::encode(signed_message_hash(&content_id)),
        signature: signature.to_hex(),
        signer: signer.address().to_string(),
    })
}

pub async fn execute_submit(
    args: &SubmitArgs,
    mut config: HarnessConfig,
    fmt: &Formatter,
) -> Result<String> {
    let signer = parse_key(&args.record.key)?;
    let record = args.record.build()?;
    if args.trust_signer {
        config = config.authorize(signer.address());
    }

    let harness = open_harness(config, true).await?;
    let (admission, signature) = harness.sign_and_submit(record, &signer).await?;
    fmt.render(&AdmissionView::new(&admission, &signature))
}

pub async fn execute_fetch(index: u32, config: HarnessConfig, fmt: &Formatter) -> Result<String> {
    let verified = config.verify_on_read;
    let harness = open_harness(config, false).await?;
    let entry = harness.fetch(index).await.map_err(|e| match e {
        HarnessError::NotFound(i) => anyhow::anyhow!("no record at index {}", i),
        other => other.into(),
    })?;
    fmt.render(&EntryView::new(&entry, verified))
}

pub async fn execute_ancestors(
    index: u32,
    config: HarnessConfig,
    fmt: &Formatter,
) -> Result<String> {
    let harness = open_harness(config, true).await?;
    let ancestors = harness.ancestors(index).await?;
    fmt.render(&AncestorsView {
        index,
        ancestors: ancestors.into_iter().collect(),
    })
}

pub async fn execute_verify(config: HarnessConfig, fmt: &Formatter) -> Result<String> {
    let harness = open_harness(config, false).await?;
    let report = harness.verify_all().await?;
    fmt.render(&ReportView::from(&report))
}
