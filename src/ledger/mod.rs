//! Principal and strategy bookkeeping.
//!
//! [`PrincipalLedger`] holds per-participant positions for one strategy;
//! [`StrategyState`] bundles the ledger with the strategy's accrual model,
//! clock, status, and reward reserve.

pub mod position;
pub mod strategy;

pub use position::{Position, PrincipalLedger, StagedCredit, StagedDebit};
pub use strategy::{StrategyState, StrategySummary};
