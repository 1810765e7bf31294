//! In-memory custodian for the simulator and tests.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::custody::{TokenGateway, TransferError};
use crate::domain::primitives::{AccountId, AssetId};

/// Tracks external account balances plus one internal vault bucket per
/// asset. `transfer_in` moves funds from an account into the vault and
/// `transfer_out` moves them back out, atomically per call.
///
/// Supports one-shot fault injection, optionally delayed past a number of
/// successful transfers, so tests can verify what the engine commits when
/// a transfer is rejected mid-operation.
#[derive(Debug, Default)]
pub struct SimulatedBank {
    inner: Mutex<BankState>,
}

#[derive(Debug, Default)]
struct BankState {
    accounts: HashMap<(AccountId, AssetId), u64>,
    vault: HashMap<AssetId, u64>,
    fault: Option<(usize, TransferError)>,
}

impl BankState {
    fn take_fault(&mut self) -> Result<(), TransferError> {
        match self.fault.take() {
            Some((0, error)) => Err(error),
            Some((skip, error)) => {
                self.fault = Some((skip - 1, error));
                Ok(())
            }
            None => Ok(()),
        }
    }
}

impl SimulatedBank {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an external account balance (builder style).
    pub fn with_balance(self, account: AccountId, asset: AssetId, amount: u64) -> Self {
        self.credit_account(&account, &asset, amount);
        self
    }

    /// Credit an external account in place.
    pub fn credit_account(&self, account: &AccountId, asset: &AssetId, amount: u64) {
        let mut state = self.lock();
        let balance = state
            .accounts
            .entry((account.clone(), asset.clone()))
            .or_insert(0);
        *balance = balance.saturating_add(amount);
    }

    /// Arrange for the next transfer, in either direction, to fail.
    pub fn fail_next_transfer(&self, error: TransferError) {
        self.fail_transfer_after(0, error);
    }

    /// Arrange for the transfer after `skip` successful ones to fail.
    pub fn fail_transfer_after(&self, skip: usize, error: TransferError) {
        self.lock().fault = Some((skip, error));
    }

    /// External balance held by `account` in `asset`.
    pub fn balance_of(&self, account: &AccountId, asset: &AssetId) -> u64 {
        self.lock()
            .accounts
            .get(&(account.clone(), asset.clone()))
            .copied()
            .unwrap_or(0)
    }

    /// Amount custodied in the internal vault for `asset`.
    pub fn vault_balance(&self, asset: &AssetId) -> u64 {
        self.lock().vault.get(asset).copied().unwrap_or(0)
    }

    // A poisoned bank lock only means a panicking test thread; the state
    // itself is always consistent because every mutation is two writes
    // validated up front.
    fn lock(&self) -> MutexGuard<'_, BankState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl TokenGateway for SimulatedBank {
    fn transfer_in(
        &self,
        from: &AccountId,
        asset: &AssetId,
        amount: u64,
    ) -> Result<(), TransferError> {
        let mut state = self.lock();
        state.take_fault()?;
        let key = (from.clone(), asset.clone());
        let balance = state.accounts.get(&key).copied().unwrap_or(0);
        let remaining = balance
            .checked_sub(amount)
            .ok_or(TransferError::InsufficientFunds)?;
        let held = state
            .vault
            .get(asset)
            .copied()
            .unwrap_or(0)
            .checked_add(amount)
            .ok_or_else(|| TransferError::Rejected("vault balance overflow".to_string()))?;
        state.accounts.insert(key, remaining);
        state.vault.insert(asset.clone(), held);
        Ok(())
    }

    fn transfer_out(
        &self,
        to: &AccountId,
        asset: &AssetId,
        amount: u64,
    ) -> Result<(), TransferError> {
        let mut state = self.lock();
        state.take_fault()?;
        let held = state
            .vault
            .get(asset)
            .copied()
            .unwrap_or(0)
            .checked_sub(amount)
            .ok_or(TransferError::InsufficientFunds)?;
        let key = (to.clone(), asset.clone());
        let credited = state
            .accounts
            .get(&key)
            .copied()
            .unwrap_or(0)
            .checked_add(amount)
            .ok_or_else(|| TransferError::Rejected("account balance overflow".to_string()))?;
        state.vault.insert(asset.clone(), held);
        state.accounts.insert(key, credited);
        Ok(())
    }
}
