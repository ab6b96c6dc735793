//! Command definitions and argument parsing.

use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use goldblock::{ProvenanceRecord, RecordBuilder, U256};

use crate::output::OutputFormat;

/// goldblock - Debugging utilities for the gold block provenance harness.
#[derive(Debug, Parser)]
#[command(name = "goldblock")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output format
    #[arg(short, long, value_enum, global = true, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Configuration file path (TOML)
    #[arg(short, long, global = true, env = "GOLDBLOCK_CONFIG")]
    pub config: Option<PathBuf>,

    /// SQLite ledger file, overriding `ledger_path` from the config
    #[arg(short, long, global = true, env = "GOLDBLOCK_LEDGER")]
    pub ledger: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Build and sign a record without submitting it
    Sign(RecordArgs),

    /// Sign a record and submit it to the ledger
    Submit(SubmitArgs),

    /// Read a record back from the ledger and verify it
    Fetch {
        /// Sequence index
        index: u32,
    },

    /// Rebuild the graph from the ledger and print a record's ancestors
    Ancestors {
        /// Sequence index
        index: u32,
    },

    /// Re-verify every ledger entry
    Verify,
}

/// Record fields plus the signing key.
#[derive(Debug, Clone, Args)]
pub struct RecordArgs {
    /// Secret key, 32 bytes hex
    #[arg(short, long, env = "GOLDBLOCK_KEY", hide_env_values = true)]
    pub key: String,

    /// Record id
    #[arg(long, default_value = "ABCDEFGH")]
    pub id: String,

    /// Producer code, exactly 2 bytes
    #[arg(long, default_value = "AB")]
    pub producer: String,

    #[arg(long, default_value = "shenzhen")]
    pub location: String,

    #[arg(long, default_value_t = 100)]
    pub weight: u64,

    /// Epoch milliseconds, or `now`
    #[arg(long, default_value = "now")]
    pub timestamp: String,

    /// Parent index; repeat or comma-separate for several
    #[arg(long = "parent", value_delimiter = ',', default_values_t = [0u64])]
    pub parents: Vec<u64>,

    /// Record has no parents (overrides --parent)
    #[arg(long)]
    pub origin: bool,

    /// Record-type tag
    #[arg(long, default_value_t = 0)]
    pub kind: u8,
}

impl RecordArgs {
    /// Build the record these arguments describe.
    pub fn build(&self) -> Result<ProvenanceRecord> {
        let parents = if self.origin {
            Vec::new()
        } else {
            self.parents.clone()
        };

        let builder = RecordBuilder::new(self.id.clone().into_bytes())
            .producer(self.producer.as_bytes())
            .location(self.location.clone().into_bytes())
            .weight(self.weight)
            .parents(parents)
            .kind(self.kind);

        let builder = if self.timestamp == "now" {
            builder.timestamp(now_millis()?)
        } else {
            builder.timestamp_dec(&self.timestamp)
        };

        builder.build().context("invalid record fields")
    }
}

/// Arguments for the submit command.
#[derive(Debug, Clone, Args)]
pub struct SubmitArgs {
    #[command(flatten)]
    pub record: RecordArgs,

    /// Add the key's address to the authorized signers for this run
    #[arg(long)]
    pub trust_signer: bool,
}

fn now_millis() -> Result<U256> {
    let elapsed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .context("system clock is before the Unix epoch")?;
    Ok(U256::from_u128(elapsed.as_millis()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    #[test]
    fn test_sign_defaults() {
        let cli = Cli::parse_from(["goldblock", "sign", "--key", KEY]);
        let args = match cli.command {
            Command::Sign(args) => args,
            other => panic!("expected sign, got {:?}", other),
        };
        assert_eq!(cli.format, OutputFormat::Text);
        assert_eq!(args.id, "ABCDEFGH");
        assert_eq!(args.parents, vec![0]);

        let record = args.build().unwrap();
        assert_eq!(record.weight, 100);
        assert_eq!(record.parent_ids, vec![0]);
        assert!(!record.timestamp.is_zero());
    }

    #[test]
    fn test_explicit_fields() {
        let cli = Cli::parse_from([
            "goldblock",
            "--format",
            "json",
            "sign",
            "--key",
            KEY,
            "--timestamp",
            "1672531200000",
            "--parent",
            "3,1",
            "--kind",
            "2",
        ]);
        assert_eq!(cli.format, OutputFormat::Json);
        let Command::Sign(args) = cli.command else {
            panic!("expected sign");
        };

        let record = args.build().unwrap();
        assert_eq!(record.timestamp, U256::from_u64(1_672_531_200_000));
        assert_eq!(record.parent_ids, vec![3, 1]);
        assert_eq!(record.kind, 2);
    }

    #[test]
    fn test_origin_clears_parents() {
        let cli = Cli::parse_from(["goldblock", "submit", "--key", KEY, "--origin"]);
        let Command::Submit(args) = cli.command else {
            panic!("expected submit");
        };
        assert!(args.record.build().unwrap().is_origin());
        assert!(!args.trust_signer);
    }

    #[test]
    fn test_bad_fields_rejected() {
        let cli = Cli::parse_from(["goldblock", "sign", "--key", KEY, "--producer", "ABC"]);
        let Command::Sign(args) = cli.command else {
            panic!("expected sign");
        };
        assert!(args.build().is_err());

        let cli = Cli::parse_from(["goldblock", "sign", "--key", KEY, "--weight", "4294967296"]);
        let Command::Sign(args) = cli.command else {
            panic!("expected sign");
        };
        assert!(args.build().is_err());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["goldblock", "fetch", "3", "--ledger", "/tmp/l.db"]);
        assert!(matches!(cli.command, Command::Fetch { index: 3 }));
        assert_eq!(cli.ledger, Some(PathBuf::from("/tmp/l.db")));
    }
}
