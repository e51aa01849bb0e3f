use crate::core::error::EngineError;
use crate::core::ship::{PeriodKey, ShipId, Year};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Compliance balance of one ship-period, in gCO2eq.
///
/// Positive `cb_before` is a surplus (the ship beat the target), negative
/// is a deficit. `cb_after` is not stored: it is always `cb_before + applied`.
///
/// Serializes with an explicit `cb_after` field; deserializing rejects a
/// document whose `cb_after` disagrees with its inputs.
///
/// # Examples
///
/// ```
/// use fueleu_ledger::core::balance::ComplianceBalance;
/// use fueleu_ledger::core::ship::ShipId;
/// use rust_decimal_macros::dec;
///
/// let balance = ComplianceBalance::new(ShipId::new("S02"), 2024, dec!(-40000))
///     .with_applied(dec!(25000))
///     .unwrap();
/// assert_eq!(balance.cb_after(), dec!(-15000));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "BalanceView", try_from = "BalanceView")]
pub struct ComplianceBalance {
    ship_id: ShipId,
    year: Year,
    cb_before: Decimal,
    applied: Decimal,
}

impl ComplianceBalance {
    /// A freshly computed balance with nothing applied from the bank.
    pub fn new(ship_id: ShipId, year: Year, cb_before: Decimal) -> Self {
        Self {
            ship_id,
            year,
            cb_before,
            applied: Decimal::ZERO,
        }
    }

    /// Same period and raw balance with a different banked amount applied.
    ///
    /// Fails with [`EngineError::Overflow`] when `cb_before + applied` is not
    /// representable, so `cb_after` is always defined.
    pub fn with_applied(mut self, applied: Decimal) -> Result<Self, EngineError> {
        if self.cb_before.checked_add(applied).is_none() {
            return Err(EngineError::Overflow {
                operation: "applied balance",
            });
        }
        self.applied = applied;
        Ok(self)
    }

    pub fn ship_id(&self) -> &ShipId {
        &self.ship_id
    }

    pub fn year(&self) -> Year {
        self.year
    }

    pub fn period(&self) -> PeriodKey {
        PeriodKey::new(self.ship_id.clone(), self.year)
    }

    pub fn cb_before(&self) -> Decimal {
        self.cb_before
    }

    pub fn applied(&self) -> Decimal {
        self.applied
    }

    pub fn cb_after(&self) -> Decimal {
        self.cb_before + self.applied
    }

    pub fn is_surplus(&self) -> bool {
        self.cb_after() > Decimal::ZERO
    }

    pub fn is_deficit(&self) -> bool {
        self.cb_after() < Decimal::ZERO
    }
}

impl fmt::Display for ComplianceBalance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Compliance Balance {} ===", self.period())?;
        writeln!(f, "CB before: {}", self.cb_before)?;
        writeln!(f, "Applied:   {}", self.applied)?;
        writeln!(f, "CB after:  {}", self.cb_after())?;
        let status = if self.is_surplus() {
            "SURPLUS"
        } else if self.is_deficit() {
            "DEFICIT"
        } else {
            "BALANCED"
        };
        write!(f, "Status:    {}", status)
    }
}

#[derive(Serialize, Deserialize)]
struct BalanceView {
    ship_id: ShipId,
    year: Year,
    cb_before: Decimal,
    applied: Decimal,
    cb_after: Decimal,
}

impl From<ComplianceBalance> for BalanceView {
    fn from(b: ComplianceBalance) -> Self {
        let cb_after = b.cb_after();
        BalanceView {
            ship_id: b.ship_id,
            year: b.year,
            cb_before: b.cb_before,
            applied: b.applied,
            cb_after,
        }
    }
}

impl TryFrom<BalanceView> for ComplianceBalance {
    type Error = String;

    fn try_from(view: BalanceView) -> Result<Self, Self::Error> {
        if view.cb_before.checked_add(view.applied) != Some(view.cb_after) {
            return Err(format!(
                "cb_after {} does not equal cb_before {} + applied {}",
                view.cb_after, view.cb_before, view.applied
            ));
        }
        Ok(ComplianceBalance {
            ship_id: view.ship_id,
            year: view.year,
            cb_before: view.cb_before,
            applied: view.applied,
        })
    }
}
