pub mod config;
pub mod custody;
pub mod domain;
pub mod engine;
pub mod error;
pub mod events;
pub mod ledger;
pub mod orchestration;

pub use config::Config;
pub use custody::{SimulatedBank, TokenGateway, TransferError};
pub use domain::{
    AccountId, Assets, AssetId, StrategyDef, StrategyId, StrategyKind, StrategyStatus, Timestamp,
    PRECISION, SECONDS_PER_YEAR,
};
pub use error::{EngineError, EngineResult};
pub use events::{EventSink, LedgerEvent, MemorySink, TracingSink};
pub use ledger::{Position, StrategySummary};
pub use orchestration::{
    ClaimReceipt, DepositReceipt, EmergencyReceipt, PositionManager, WithdrawReceipt,
};
