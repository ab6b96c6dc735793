//! Harness configuration.
//!
//! Loaded from TOML:
//!
//! ```toml
//! authorized_signers = ["0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266"]
//! array_packing = "tight"
//! verify_on_read = true
//! ledger_path = "goldblock.db"
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use goldblock_core::{Address, ArrayPacking, AuthorizedSigners};
use serde::{Deserialize, Serialize};

use crate::error::{HarnessError, Result};

/// Configuration for the Harness.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HarnessConfig {
    /// Addresses allowed to admit records. Empty admits nobody.
    #[serde(default)]
    pub authorized_signers: Vec<Address>,

    /// Layout of `parent_ids` in the canonical encoding.
    #[serde(default)]
    pub array_packing: ArrayPacking,

    /// Re-derive and check content ids and signatures on every fetch.
    #[serde(default = "default_true")]
    pub verify_on_read: bool,

    /// SQLite ledger file. `None` leaves the choice of ledger to the caller.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ledger_path: Option<PathBuf>,
}

fn default_true() -> bool {
    true
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            authorized_signers: Vec::new(),
            array_packing: ArrayPacking::default(),
            verify_on_read: true,
            ledger_path: None,
        }
    }
}

impl HarnessConfig {
    /// Parse from TOML text.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| HarnessError::Config(e.to_string()))
    }

    /// Load from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .map_err(|e| HarnessError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&contents)
    }

    /// Render as TOML text.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| HarnessError::Config(e.to_string()))
    }

    /// The authorized signer set.
    pub fn signers(&self) -> AuthorizedSigners {
        self.authorized_signers.iter().copied().collect()
    }

    /// Add an authorized signer, ignoring duplicates.
    pub fn authorize(mut self, address: Address) -> Self {
        if !self.authorized_signers.contains(&address) {
            self.authorized_signers.push(address);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEV_ADDR: &str = "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266";

    #[test]
    fn test_defaults() {
        let config = HarnessConfig::default();
        assert!(config.authorized_signers.is_empty());
        assert_eq!(config.array_packing, ArrayPacking::Tight);
        assert!(config.verify_on_read);
        assert!(config.ledger_path.is_none());

        assert_eq!(HarnessConfig::from_toml_str("").unwrap(), config);
    }

    #[test]
    fn test_parse_full() {
        let config = HarnessConfig::from_toml_str(&format!(
            r#"
            authorized_signers = ["{}"]
            array_packing = "word_aligned"
            verify_on_read = false
            ledger_path = "/var/lib/goldblock/ledger.db"
            "#,
            DEV_ADDR
        ))
        .unwrap();

        assert_eq!(config.authorized_signers.len(), 1);
        assert_eq!(config.authorized_signers[0].to_string(), DEV_ADDR);
        assert_eq!(config.array_packing, ArrayPacking::WordAligned);
        assert!(!config.verify_on_read);
        assert_eq!(
            config.ledger_path,
            Some(PathBuf::from("/var/lib/goldblock/ledger.db"))
        );
        assert!(config
            .signers()
            .contains(&Address::from_hex(DEV_ADDR).unwrap()));
    }

    #[test]
    fn test_rejects_bad_input() {
        assert!(matches!(
            HarnessConfig::from_toml_str(r#"authorized_signers = ["0x1234"]"#),
            Err(HarnessError::Config(_))
        ));
        assert!(matches!(
            HarnessConfig::from_toml_str(r#"array_packing = "loose""#),
            Err(HarnessError::Config(_))
        ));
        assert!(matches!(
            HarnessConfig::from_toml_str("verify_on_raed = true"),
            Err(HarnessError::Config(_))
        ));
    }

    #[test]
    fn test_toml_roundtrip_and_load() {
        let config = HarnessConfig::default()
            .authorize(Address::from_hex(DEV_ADDR).unwrap())
            .authorize(Address::from_hex(DEV_ADDR).unwrap());
        assert_eq!(config.authorized_signers.len(), 1);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("goldblock.toml");
        fs::write(&path, config.to_toml_string().unwrap()).unwrap();
        assert_eq!(HarnessConfig::load(&path).unwrap(), config);

        assert!(matches!(
            HarnessConfig::load(dir.path().join("missing.toml")),
            Err(HarnessError::Config(_))
        ));
    }
}
