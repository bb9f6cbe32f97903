//! # Node Configuration
//!
//! The deployment a node boots: who owns the vault, which assets exist,
//! which of them start allow-listed, and the devnet balances everybody
//! starts with. Stored as JSON (`custody.json`) in the data directory.
//!
//! Accounts are written either as `0x`-prefixed hex addresses or as plain
//! labels. A label is turned into an address with [`Address::derive`], so
//! `"alice"` means the same account in every config file.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use custody_contracts::ReturnConvention;
use custody_protocol::{Address, Amount};

/// Top-level node configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Network name reported by `/status`.
    #[serde(default = "default_network")]
    pub network: String,
    /// Account the vault is deployed at.
    pub vault: String,
    /// Initial owner of the vault. Also issues every reference token.
    pub owner: String,
    /// Native asset setup.
    #[serde(default)]
    pub native: NativeConfig,
    /// Reference tokens to deploy.
    #[serde(default)]
    pub tokens: Vec<TokenConfig>,
}

/// Native asset setup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeConfig {
    /// Whether the vault accepts the native asset at boot.
    #[serde(default)]
    pub allowed: bool,
    /// Genesis native balances, by account.
    #[serde(default)]
    pub balances: BTreeMap<String, Amount>,
}

/// One reference token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenConfig {
    pub name: String,
    pub symbol: String,
    #[serde(default)]
    pub decimals: u8,
    /// How the token reports transfer results.
    #[serde(default)]
    pub convention: ReturnConvention,
    /// Whether the vault accepts this token at boot.
    #[serde(default)]
    pub allowed: bool,
    /// Genesis token balances, by account. Minted by the owner.
    #[serde(default)]
    pub balances: BTreeMap<String, Amount>,
}

fn default_network() -> String {
    "devnet".to_string()
}

/// Turns a config account string into an address.
///
/// Anything that parses as a hex address is taken literally; everything
/// else is a label.
pub fn resolve_account(account: &str) -> Address {
    account
        .parse::<Address>()
        .unwrap_or_else(|_| Address::derive(account))
}

impl NodeConfig {
    /// The configuration `init` writes: a devnet with the native asset and
    /// one token of each return convention, all allow-listed, and two
    /// funded accounts.
    pub fn devnet() -> Self {
        let funded = |amount: Amount| -> BTreeMap<String, Amount> {
            ["alice", "bob"]
                .into_iter()
                .map(|who| (who.to_string(), amount))
                .collect()
        };
        let token = |name: &str, symbol: &str, decimals: u8, convention| TokenConfig {
            name: name.to_string(),
            symbol: symbol.to_string(),
            decimals,
            convention,
            allowed: true,
            balances: funded(1_000_000 * 10u128.pow(decimals as u32)),
        };

        Self {
            network: default_network(),
            vault: "vault".to_string(),
            owner: "owner".to_string(),
            native: NativeConfig {
                allowed: true,
                balances: funded(1_000 * 10u128.pow(custody_protocol::config::NATIVE_DECIMALS as u32)),
            },
            tokens: vec![
                token("Custody Dollar", "CUSD", 6, ReturnConvention::Standard),
                token("Legacy Tether", "LUSD", 6, ReturnConvention::NoReturn),
                token("Quiet Euro", "QEUR", 2, ReturnConvention::ReturnsFalse),
            ],
        }
    }

    /// Reads a configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let config: Self = serde_json::from_str(&raw)
            .with_context(|| format!("invalid config file: {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Writes the configuration as pretty-printed JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        let raw = serde_json::to_string_pretty(self).context("failed to encode config")?;
        std::fs::write(path, raw)
            .with_context(|| format!("failed to write config file: {}", path.display()))
    }

    /// Rejects configs that would deploy two tokens at one address or put
    /// the vault on top of its owner.
    pub fn validate(&self) -> Result<()> {
        if resolve_account(&self.vault) == resolve_account(&self.owner) {
            anyhow::bail!("vault and owner resolve to the same address");
        }
        let mut seen = std::collections::HashSet::new();
        for token in &self.tokens {
            if token.symbol.trim().is_empty() {
                anyhow::bail!("token {:?} has an empty symbol", token.name);
            }
            if !seen.insert(token.symbol.to_uppercase()) {
                anyhow::bail!("duplicate token symbol: {}", token.symbol);
            }
        }
        Ok(())
    }
}
