//! Engine-wide error taxonomy.
//!
//! Every fallible operation on the manager resolves to an [`EngineError`].
//! Any error aborts the whole operation: no ledger field is written, no
//! event is emitted, and previously committed state is untouched.

use thiserror::Error;

use crate::custody::TransferError;
use crate::domain::fixed::ArithmeticError;
use crate::domain::primitives::StrategyId;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// Zero or otherwise unusable amount.
    #[error("amount must be a positive number of base units")]
    InvalidAmount,
    /// Withdrawal larger than the caller's recorded principal.
    #[error("requested amount exceeds recorded principal")]
    InsufficientBalance,
    /// Caller lacks the owner capability required by an admin operation.
    #[error("operation requires the strategy owner")]
    Unauthorized,
    /// The external asset transfer was rejected; nothing was committed.
    #[error("asset transfer failed: {0}")]
    TransferFailed(#[from] TransferError),
    /// A checked accrual computation exceeded the integer range.
    #[error("arithmetic overflow in accrual computation")]
    ArithmeticOverflow,
    /// No strategy registered under this id.
    #[error("unknown strategy '{0}'")]
    StrategyNotFound(StrategyId),
    /// A strategy with this id already exists.
    #[error("strategy '{0}' is already registered")]
    StrategyExists(StrategyId),
    /// The strategy is paused or drained and rejects this operation.
    #[error("strategy '{0}' is not accepting this operation")]
    StrategyInactive(StrategyId),
    /// A previous operation panicked while holding this strategy's lock.
    #[error("strategy lock poisoned")]
    LockPoisoned,
}

impl From<ArithmeticError> for EngineError {
    fn from(_: ArithmeticError) -> Self {
        EngineError::ArithmeticOverflow
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
