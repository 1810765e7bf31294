//! Operation pipeline: locks, capability checks, and the position manager.

pub mod guard;
pub mod manager;

pub use guard::StrategyCell;
pub use manager::{
    ClaimReceipt, DepositReceipt, EmergencyReceipt, PositionManager, WithdrawReceipt,
};
