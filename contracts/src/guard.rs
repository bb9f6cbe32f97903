//! # Reentrancy Lock
//!
//! While an asset (or a native recipient) runs, control belongs to
//! untrusted code that may call straight back into the vault. The lock
//! admits one mutating call at a time, including everything that call
//! triggers, and the guard releases it on every exit path.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::VaultError;

/// Per-vault "operation in progress" flag.
#[derive(Debug, Default)]
pub struct ReentrancyLock {
    entered: AtomicBool,
}

impl ReentrancyLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes the lock, or fails with [`VaultError::Reentrancy`] if a call is
    /// already in flight. The lock is released when the guard drops.
    pub fn enter(&self) -> Result<ReentrancyGuard<'_>, VaultError> {
        self.entered
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .map_err(|_| VaultError::Reentrancy)?;
        Ok(ReentrancyGuard { lock: self })
    }

    /// Returns `true` while a guarded call is in flight.
    pub fn is_entered(&self) -> bool {
        self.entered.load(Ordering::Acquire)
    }
}

/// Holds the [`ReentrancyLock`] until dropped.
#[must_use = "the lock is released as soon as the guard is dropped"]
#[derive(Debug)]
pub struct ReentrancyGuard<'a> {
    lock: &'a ReentrancyLock,
}

impl Drop for ReentrancyGuard<'_> {
    fn drop(&mut self) {
        self.lock.entered.store(false, Ordering::Release);
    }
}
