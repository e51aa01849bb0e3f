use crate::core::ship::{ShipId, Year};
use rust_decimal::Decimal;
use thiserror::Error;

/// Errors returned by the compliance engine.
///
/// Every variant is an ordinary rejected operation: no ledger record is
/// appended and no pool is recorded when one of these is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("no fuel data for ship {ship} in {year}")]
    NotFound { ship: ShipId, year: Year },
    #[error("amount must be positive, got {amount}")]
    InvalidAmount { amount: Decimal },
    #[error("ship {ship} requested {requested} from bank but only {available} is available")]
    InsufficientBankedSurplus {
        ship: ShipId,
        requested: Decimal,
        available: Decimal,
    },
    #[error("invalid pool: {0}")]
    InvalidPool(#[from] PoolViolation),
    #[error("arithmetic overflow in {operation}")]
    Overflow { operation: &'static str },
}

/// Why a pool was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PoolViolation {
    #[error("a pool needs at least two members, got {count}")]
    TooFewMembers { count: usize },
    #[error("aggregate balance {sum} is negative")]
    NegativeAggregate { sum: Decimal },
    #[error("member balances exceed the representable range")]
    AggregateOverflow,
    #[error("ship {ship} appears more than once")]
    DuplicateShip { ship: ShipId },
    #[error("ship {ship} entered with a surplus and would exit negative")]
    SurplusExitedNegative { ship: ShipId },
    #[error("ship {ship} entered with a deficit and would exit worse")]
    DeficitExitedWorse { ship: ShipId },
}
