//! # Genesis
//!
//! Turns a [`NodeConfig`] into a live deployment: native balances minted,
//! reference tokens deployed and funded, the vault deployed behind a
//! [`Host`], and the configured assets allow-listed by the owner.

use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::sync::Arc;

use custody_contracts::{AssetBook, Host, InMemoryBank, Token, Vault};
use custody_protocol::{AssetId, EventSink};

use crate::config::{resolve_account, NodeConfig};

/// Everything the API needs to serve a deployed vault.
pub struct Deployment {
    pub host: Arc<Host>,
    pub bank: Arc<InMemoryBank>,
    /// Reference tokens by asset id.
    pub tokens: BTreeMap<AssetId, Arc<Token>>,
    pub network: String,
}

impl Deployment {
    pub fn vault(&self) -> &Arc<Vault> {
        self.host.vault()
    }
}

/// Builds the deployment described by `config`. Vault events go to `events`.
pub fn deploy(config: &NodeConfig, events: Arc<dyn EventSink>) -> Result<Deployment> {
    config.validate()?;
    let owner = resolve_account(&config.owner);
    let vault_address = resolve_account(&config.vault);

    let bank = Arc::new(InMemoryBank::new());
    for (account, amount) in &config.native.balances {
        bank.mint(resolve_account(account), *amount)
            .with_context(|| format!("failed to mint native balance for {}", account))?;
    }

    let book = Arc::new(AssetBook::new());
    let mut tokens = BTreeMap::new();
    for token_config in &config.tokens {
        let token = Arc::new(Token::new(
            token_config.name.clone(),
            &token_config.symbol,
            token_config.decimals,
            owner,
            token_config.convention,
        ));
        for (account, amount) in &token_config.balances {
            token
                .mint(owner, resolve_account(account), *amount)
                .with_context(|| format!("failed to mint {} for {}", token_config.symbol, account))?;
        }
        book.bind(token.id(), token.clone());
        tracing::info!(
            symbol = %token.info().symbol,
            asset = %token.id(),
            convention = %token_config.convention,
            "token deployed"
        );
        tokens.insert(token.id(), token);
    }

    let vault = Arc::new(Vault::new(vault_address, owner, book, bank.clone(), events));
    let host = Arc::new(Host::new(vault, bank.clone()));

    let mut allowed: Vec<AssetId> = config
        .tokens
        .iter()
        .filter(|t| t.allowed)
        .map(|t| Token::id_for(&t.symbol))
        .collect();
    if config.native.allowed {
        allowed.insert(0, AssetId::NATIVE);
    }
    for asset in allowed {
        host.set_allowed(owner, asset, true)
            .with_context(|| format!("failed to allow-list {}", asset))?;
    }

    Ok(Deployment {
        host,
        bank,
        tokens,
        network: config.network.clone(),
    })
}
