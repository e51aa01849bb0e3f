//! # fueleu-ledger
//!
//! Compliance accounting for ships under a GHG-intensity scheme.
//!
//! Given each ship's reported fuel use and achieved GHG intensity, this
//! engine computes the signed compliance balance (CB) per period, banks
//! surplus across periods, draws banked surplus down against a deficit,
//! and pools ships so surplus on some offsets deficit on others.
//!
//! ## Architecture
//!
//! - **core** — Foundational types: ships, periods, fuel data, balances, config, errors
//! - **accounting** — Balance calculator, banking ledger, pool allocator
//! - **engine** — Facade owning one fleet's provider, ledger and pools
//! - **simulation** — Random fleet and pool generation

pub mod accounting;
pub mod core;
pub mod engine;
pub mod simulation;

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::accounting::bank::{BankLedger, BankRecord};
    pub use crate::accounting::calculator::BalanceCalculator;
    pub use crate::accounting::pool::{Pool, PoolAllocation, PoolAllocator, PoolMember};
    pub use crate::core::balance::ComplianceBalance;
    pub use crate::core::config::ComplianceConfig;
    pub use crate::core::error::{EngineError, PoolViolation};
    pub use crate::core::fuel::{FuelDataProvider, FuelRecord, FuelType, RouteTable, ShipRoute};
    pub use crate::core::ship::{PeriodKey, ShipId, VesselType, Year};
    pub use crate::engine::ComplianceEngine;
}
