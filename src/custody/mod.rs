//! Asset custody abstraction.
//!
//! The engine records entitlements; actual token movement happens behind
//! the [`TokenGateway`] trait. A transfer either completes in full or
//! fails with no effect, and the engine orders its own writes so that a
//! failed transfer commits nothing.

use thiserror::Error;

use crate::domain::primitives::{AccountId, AssetId};

pub mod sim;

pub use sim::SimulatedBank;

/// External transfer rejection. Carries no partial-effect states; a failed
/// transfer moved nothing.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransferError {
    #[error("insufficient funds in source account")]
    InsufficientFunds,
    #[error("transfer rejected by custodian: {0}")]
    Rejected(String),
}

/// Moves tokens between participant accounts and the strategy's custody.
///
/// Implementations must be atomic per call and safe to invoke while the
/// caller holds a strategy lock; the trait is synchronous by design.
pub trait TokenGateway: Send + Sync + std::fmt::Debug {
    /// Pull `amount` of `asset` from `from` into strategy custody.
    fn transfer_in(&self, from: &AccountId, asset: &AssetId, amount: u64)
        -> Result<(), TransferError>;

    /// Push `amount` of `asset` out of strategy custody to `to`.
    fn transfer_out(&self, to: &AccountId, asset: &AssetId, amount: u64)
        -> Result<(), TransferError>;
}
