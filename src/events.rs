//! Ledger event stream.
//!
//! Every committed mutation emits one event describing state that was
//! actually written. Failed operations emit nothing, so a consumer can
//! replay the stream into an identical ledger.

use serde::{Deserialize, Serialize};
use std::sync::{Mutex, PoisonError};

use crate::domain::primitives::{AccountId, StrategyId, Timestamp};
use crate::domain::strategy::StrategyStatus;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LedgerEvent {
    StrategyCreated {
        strategy: StrategyId,
        owner: AccountId,
        at: Timestamp,
    },
    DepositCompleted {
        strategy: StrategyId,
        owner: AccountId,
        amount: u64,
        position_principal: u64,
        total_principal: u64,
        at: Timestamp,
    },
    WithdrawCompleted {
        strategy: StrategyId,
        owner: AccountId,
        amount: u64,
        position_principal: u64,
        total_principal: u64,
        at: Timestamp,
    },
    /// Pool-level yield settled by an interest strategy. Only emitted for
    /// windows that actually earned something.
    YieldAccrued {
        strategy: StrategyId,
        amount: u64,
        cumulative: u64,
        at: Timestamp,
    },
    RewardClaimed {
        strategy: StrategyId,
        owner: AccountId,
        amount: u64,
        at: Timestamp,
    },
    RateUpdated {
        strategy: StrategyId,
        old_rate: u128,
        new_rate: u128,
        at: Timestamp,
    },
    RewardSupplyAdded {
        strategy: StrategyId,
        amount: u64,
        reserve: u64,
        at: Timestamp,
    },
    EmergencyWithdrawn {
        strategy: StrategyId,
        owner: AccountId,
        amount: u64,
        at: Timestamp,
    },
    StatusChanged {
        strategy: StrategyId,
        status: StrategyStatus,
        at: Timestamp,
    },
}

/// Consumer of committed-state notifications.
pub trait EventSink: Send + Sync + std::fmt::Debug {
    fn publish(&self, event: &LedgerEvent);
}

/// Logs every event through `tracing` at info level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn publish(&self, event: &LedgerEvent) {
        match event {
            LedgerEvent::StrategyCreated {
                strategy,
                owner,
                at,
            } => {
                tracing::info!(%strategy, %owner, %at, "strategy created");
            }
            LedgerEvent::DepositCompleted {
                strategy,
                owner,
                amount,
                position_principal,
                total_principal,
                at,
            } => {
                tracing::info!(
                    %strategy,
                    %owner,
                    amount,
                    position_principal,
                    total_principal,
                    %at,
                    "deposit completed"
                );
            }
            LedgerEvent::WithdrawCompleted {
                strategy,
                owner,
                amount,
                position_principal,
                total_principal,
                at,
            } => {
                tracing::info!(
                    %strategy,
                    %owner,
                    amount,
                    position_principal,
                    total_principal,
                    %at,
                    "withdraw completed"
                );
            }
            LedgerEvent::YieldAccrued {
                strategy,
                amount,
                cumulative,
                at,
            } => {
                tracing::info!(%strategy, amount, cumulative, %at, "yield accrued");
            }
            LedgerEvent::RewardClaimed {
                strategy,
                owner,
                amount,
                at,
            } => {
                tracing::info!(%strategy, %owner, amount, %at, "reward claimed");
            }
            LedgerEvent::RateUpdated {
                strategy,
                old_rate,
                new_rate,
                at,
            } => {
                tracing::info!(%strategy, old_rate, new_rate, %at, "rate updated");
            }
            LedgerEvent::RewardSupplyAdded {
                strategy,
                amount,
                reserve,
                at,
            } => {
                tracing::info!(%strategy, amount, reserve, %at, "reward supply added");
            }
            LedgerEvent::EmergencyWithdrawn {
                strategy,
                owner,
                amount,
                at,
            } => {
                tracing::warn!(%strategy, %owner, amount, %at, "emergency withdrawal");
            }
            LedgerEvent::StatusChanged {
                strategy,
                status,
                at,
            } => {
                tracing::info!(%strategy, %status, %at, "status changed");
            }
        }
    }
}

/// Buffers events in memory so tests can assert on the exact stream.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<LedgerEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything published so far.
    pub fn snapshot(&self) -> Vec<LedgerEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Drain the buffer.
    pub fn take(&self) -> Vec<LedgerEvent> {
        std::mem::take(&mut *self.events.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl EventSink for MemorySink {
    fn publish(&self, event: &LedgerEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());
    }
}
