//! Domain types for the accrual engine.
//!
//! This module provides:
//! - Integer fixed-point helpers and the PRECISION/SECONDS_PER_YEAR constants
//! - Domain primitives: Timestamp, AccountId, AssetId, StrategyId
//! - Strategy identity: kind, assets, status, and the parsed definition

pub mod fixed;
pub mod primitives;
pub mod strategy;

pub use fixed::{ArithmeticError, PRECISION, SECONDS_PER_YEAR};
pub use primitives::{AccountId, AssetId, StrategyId, Timestamp};
pub use strategy::{Assets, StrategyDef, StrategyKind, StrategyParseError, StrategyStatus};
