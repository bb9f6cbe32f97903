//! # Reference Token
//!
//! A plain fungible token: balances, allowances, issuer-gated minting. It is
//! what the node deploys for devnet assets and what the integration tests
//! use when they need real accounting behind an [`Asset`].
//!
//! The token's [`ReturnConvention`] controls how it *reports* results, which
//! is exactly the axis the vault must be robust against:
//!
//! - `Standard`: reverts on failure, returns `true` on success.
//! - `NoReturn`: reverts on failure, returns nothing on success.
//! - `ReturnsFalse`: returns `false` on failure instead of reverting,
//!   `true` on success.
//!
//! Accounting is identical under all three.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

use custody_protocol::{Address, Amount, AssetId};

use crate::asset::{Asset, TransferOutcome};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors from token bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    /// Only the issuer can mint.
    #[error("unauthorized: only the issuer can mint {symbol}")]
    UnauthorizedMint { symbol: String },

    /// Minting would overflow the supply.
    #[error("supply overflow: minting {amount} would exceed u128::MAX")]
    SupplyOverflow { amount: Amount },

    #[error("insufficient balance: account has {balance}, tried to move {amount}")]
    InsufficientBalance { balance: Amount, amount: Amount },

    #[error("insufficient allowance: spender may move {allowance}, tried to move {amount}")]
    InsufficientAllowance { allowance: Amount, amount: Amount },
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// How the token reports the result of `transfer` / `transfer_from`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReturnConvention {
    #[default]
    Standard,
    NoReturn,
    ReturnsFalse,
}

impl std::fmt::Display for ReturnConvention {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReturnConvention::Standard => write!(f, "standard"),
            ReturnConvention::NoReturn => write!(f, "no_return"),
            ReturnConvention::ReturnsFalse => write!(f, "returns_false"),
        }
    }
}

/// Token metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenInfo {
    /// The token's contract address, as an asset id.
    pub id: AssetId,
    /// Human-readable name (e.g., "Custody Dollar").
    pub name: String,
    /// Ticker symbol, upper-cased.
    pub symbol: String,
    /// Decimal places. Display only.
    pub decimals: u8,
    /// Address allowed to mint.
    pub issuer: Address,
    /// Result-reporting convention.
    pub convention: ReturnConvention,
}

#[derive(Debug, Default)]
struct Books {
    balances: HashMap<Address, Amount>,
    allowances: HashMap<(Address, Address), Amount>,
    total_supply: Amount,
}

impl Books {
    fn move_balance(&mut self, from: Address, to: Address, amount: Amount) -> Result<(), TokenError> {
        let balance = self.balances.get(&from).copied().unwrap_or(0);
        if balance < amount {
            return Err(TokenError::InsufficientBalance { balance, amount });
        }
        if from == to {
            return Ok(());
        }
        // Supply bounds every balance, so this cannot overflow.
        let credited = self.balances.get(&to).copied().unwrap_or(0) + amount;
        self.balances.insert(from, balance - amount);
        self.balances.insert(to, credited);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Token
// ---------------------------------------------------------------------------

/// A fungible token contract.
#[derive(Debug)]
pub struct Token {
    info: TokenInfo,
    books: RwLock<Books>,
}

impl Token {
    /// Creates a token with zero supply. The contract address is derived
    /// from the upper-cased symbol, so `"usdx"` and `"USDX"` collide.
    pub fn new(
        name: impl Into<String>,
        symbol: &str,
        decimals: u8,
        issuer: Address,
        convention: ReturnConvention,
    ) -> Self {
        let symbol = symbol.to_uppercase();
        let id = Self::id_for(&symbol);
        Self {
            info: TokenInfo {
                id,
                name: name.into(),
                symbol,
                decimals,
                issuer,
                convention,
            },
            books: RwLock::new(Books::default()),
        }
    }

    /// The asset id a token with `symbol` is deployed at.
    pub fn id_for(symbol: &str) -> AssetId {
        AssetId::new(Address::derive(&format!("token:{}", symbol.to_uppercase())))
    }

    pub fn info(&self) -> &TokenInfo {
        &self.info
    }

    pub fn id(&self) -> AssetId {
        self.info.id
    }

    /// Mints `amount` to `to`. Issuer only.
    pub fn mint(&self, caller: Address, to: Address, amount: Amount) -> Result<(), TokenError> {
        if caller != self.info.issuer {
            return Err(TokenError::UnauthorizedMint {
                symbol: self.info.symbol.clone(),
            });
        }
        let mut books = self.books.write();
        let supply = books
            .total_supply
            .checked_add(amount)
            .ok_or(TokenError::SupplyOverflow { amount })?;
        books.total_supply = supply;
        *books.balances.entry(to).or_insert(0) += amount;
        Ok(())
    }

    /// Sets the allowance `owner` grants `spender` to exactly `amount`.
    pub fn approve(&self, owner: Address, spender: Address, amount: Amount) {
        self.books.write().allowances.insert((owner, spender), amount);
    }

    pub fn allowance(&self, owner: Address, spender: Address) -> Amount {
        self.books
            .read()
            .allowances
            .get(&(owner, spender))
            .copied()
            .unwrap_or(0)
    }

    pub fn balance_of(&self, owner: Address) -> Amount {
        self.books.read().balances.get(&owner).copied().unwrap_or(0)
    }

    pub fn total_supply(&self) -> Amount {
        self.books.read().total_supply
    }

    fn report(&self, result: Result<(), TokenError>) -> TransferOutcome {
        match (result, self.info.convention) {
            (Ok(()), ReturnConvention::NoReturn) => TransferOutcome::NoData,
            (Ok(()), _) => TransferOutcome::Returned(true),
            (Err(_), ReturnConvention::ReturnsFalse) => TransferOutcome::Returned(false),
            (Err(e), _) => TransferOutcome::Reverted(e.to_string()),
        }
    }
}

impl Asset for Token {
    fn transfer(&self, caller: Address, to: Address, amount: Amount) -> TransferOutcome {
        let result = self.books.write().move_balance(caller, to, amount);
        self.report(result)
    }

    fn transfer_from(
        &self,
        caller: Address,
        from: Address,
        to: Address,
        amount: Amount,
    ) -> TransferOutcome {
        let result = {
            let mut books = self.books.write();
            let allowance = books
                .allowances
                .get(&(from, caller))
                .copied()
                .unwrap_or(0);
            if allowance < amount {
                Err(TokenError::InsufficientAllowance { allowance, amount })
            } else {
                books.move_balance(from, to, amount).map(|()| {
                    books.allowances.insert((from, caller), allowance - amount);
                })
            }
        };
        self.report(result)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
