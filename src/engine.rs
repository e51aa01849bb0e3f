//! The compliance engine facade.
//!
//! Owns one configuration, one fuel data provider, one bank ledger and one
//! pool registry. Several engines can coexist; nothing is process-global.

use crate::accounting::bank::{BankLedger, BankRecord};
use crate::accounting::calculator::BalanceCalculator;
use crate::accounting::pool::{Pool, PoolMember, PoolRegistry};
use crate::core::balance::ComplianceBalance;
use crate::core::config::ComplianceConfig;
use crate::core::error::EngineError;
use crate::core::fuel::{FuelDataProvider, RouteTable};
use crate::core::ship::{ShipId, VesselType, Year};
use rust_decimal::Decimal;
use uuid::Uuid;

/// Source of a ship's vessel category, used when building pool members.
pub trait VesselRegistry {
    fn vessel_type(&self, ship: &ShipId) -> Option<VesselType>;
}

impl VesselRegistry for RouteTable {
    fn vessel_type(&self, ship: &ShipId) -> Option<VesselType> {
        RouteTable::vessel_type(self, ship)
    }
}

/// Balance, banking and pooling operations over one fleet's data.
///
/// # Examples
///
/// ```
/// use fueleu_ledger::prelude::*;
/// use rust_decimal_macros::dec;
///
/// let ship = ShipId::new("S01");
/// let routes: RouteTable =
///     std::iter::once(ShipRoute::new("R001", ship.clone(), 2024, dec!(85), dec!(5000))).collect();
/// let engine = ComplianceEngine::new(ComplianceConfig::default(), routes);
///
/// let balance = engine.compliance_balance(&ship, 2024).unwrap();
/// assert_eq!(balance.cb_before(), dec!(889_700_000));
///
/// engine.bank_surplus(&ship, 2024, dec!(100_000)).unwrap();
/// assert_eq!(engine.available_balance(&ship), dec!(100_000));
/// ```
#[derive(Debug)]
pub struct ComplianceEngine<P = RouteTable> {
    calculator: BalanceCalculator,
    provider: P,
    ledger: BankLedger,
    pools: PoolRegistry,
}

impl<P: FuelDataProvider> ComplianceEngine<P> {
    pub fn new(config: ComplianceConfig, provider: P) -> Self {
        Self::with_ledger(config, provider, BankLedger::new())
    }

    /// Start from an existing ledger, e.g. one rebuilt with
    /// [`BankLedger::from_records`].
    pub fn with_ledger(config: ComplianceConfig, provider: P, ledger: BankLedger) -> Self {
        Self {
            calculator: BalanceCalculator::new(config),
            provider,
            ledger,
            pools: PoolRegistry::new(),
        }
    }

    pub fn config(&self) -> &ComplianceConfig {
        self.calculator.config()
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn ledger(&self) -> &BankLedger {
        &self.ledger
    }

    /// Raw balance of a ship-period with nothing applied.
    pub fn compliance_balance(
        &self,
        ship: &ShipId,
        year: Year,
    ) -> Result<ComplianceBalance, EngineError> {
        self.calculator.compute_balance(&self.provider, ship, year)
    }

    /// Raw balance with `applied` set to everything drawn into the period so far.
    pub fn adjusted_balance(
        &self,
        ship: &ShipId,
        year: Year,
    ) -> Result<ComplianceBalance, EngineError> {
        let balance = self.compliance_balance(ship, year)?;
        let applied = self.ledger.applied_to(ship, year)?;
        balance.with_applied(applied)
    }

    pub fn bank_surplus(
        &self,
        ship: &ShipId,
        year: Year,
        amount: Decimal,
    ) -> Result<BankRecord, EngineError> {
        self.ledger.bank_surplus(ship, year, amount)
    }

    pub fn available_balance(&self, ship: &ShipId) -> Decimal {
        self.ledger.available_balance(ship)
    }

    /// Draw `amount` from the ship's bank into `year`. The returned balance
    /// has `applied == amount`.
    pub fn apply_from_bank(
        &self,
        ship: &ShipId,
        year: Year,
        amount: Decimal,
    ) -> Result<ComplianceBalance, EngineError> {
        self.ledger
            .apply_from_bank(&self.calculator, &self.provider, ship, year, amount)
    }

    /// Allocate and record a pool for compliance period `year`.
    pub fn create_pool(&self, year: Year, members: &[PoolMember]) -> Result<Pool, EngineError> {
        self.pools.create(year, members)
    }

    pub fn pool(&self, id: Uuid) -> Option<Pool> {
        self.pools.pool(id)
    }

    pub fn pools(&self) -> Vec<Pool> {
        self.pools.pools()
    }

    pub fn pools_for(&self, year: Year) -> Vec<Pool> {
        self.pools.pools_for(year)
    }
}

impl<P: FuelDataProvider + VesselRegistry> ComplianceEngine<P> {
    /// Pool entry snapshots for the given ships in one year, using each
    /// period's adjusted balance. Ships without a known vessel type default
    /// to [`VesselType::Container`].
    pub fn pool_members(
        &self,
        year: Year,
        ships: &[ShipId],
    ) -> Result<Vec<PoolMember>, EngineError> {
        ships
            .iter()
            .map(|ship| {
                let balance = self.adjusted_balance(ship, year)?;
                let vessel_type = self
                    .provider
                    .vessel_type(ship)
                    .unwrap_or(VesselType::Container);
                Ok(PoolMember::new(ship.clone(), vessel_type, balance.cb_after()))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fuel::ShipRoute;
    use rust_decimal_macros::dec;

    fn engine() -> ComplianceEngine {
        let mut routes = RouteTable::new();
        routes.add(
            ShipRoute::new("R001", ShipId::new("S01"), 2024, dec!(85), dec!(10))
                .with_vessel_type(VesselType::Container),
        );
        routes.add(
            ShipRoute::new("R002", ShipId::new("S02"), 2024, dec!(91), dec!(10))
                .with_vessel_type(VesselType::Tanker),
        );
        ComplianceEngine::new(ComplianceConfig::default(), routes)
    }

    #[test]
    fn test_balance_and_adjusted_balance() {
        let engine = engine();
        let s02 = ShipId::new("S02");
        // (89.34 - 91) * 10 * 41000 = -680,600
        assert_eq!(
            engine.compliance_balance(&s02, 2024).unwrap().cb_before(),
            dec!(-680_600)
        );

        engine.bank_surplus(&s02, 2023, dec!(500_000)).unwrap();
        engine.apply_from_bank(&s02, 2024, dec!(300_000)).unwrap();
        engine.apply_from_bank(&s02, 2024, dec!(100_000)).unwrap();

        let raw = engine.compliance_balance(&s02, 2024).unwrap();
        assert_eq!(raw.applied(), Decimal::ZERO);
        let adjusted = engine.adjusted_balance(&s02, 2024).unwrap();
        assert_eq!(adjusted.applied(), dec!(400_000));
        assert_eq!(adjusted.cb_after(), dec!(-280_600));
    }

    #[test]
    fn test_pool_members_from_balances() {
        let engine = engine();
        let members = engine
            .pool_members(2024, &[ShipId::new("S01"), ShipId::new("S02")])
            .unwrap();
        // S01: (89.34 - 85) * 10 * 41000 = 1,779,400
        assert_eq!(members[0].adjusted_cb, dec!(1_779_400));
        assert_eq!(members[1].vessel_type, VesselType::Tanker);

        let pool = engine.create_pool(2024, &members).unwrap();
        assert_eq!(pool.year(), 2024);
        assert_eq!(pool.member(&ShipId::new("S02")).unwrap().cb_after, Decimal::ZERO);
        assert_eq!(pool.member(&ShipId::new("S01")).unwrap().cb_after, dec!(1_098_800));
        assert_eq!(engine.pools().len(), 1);
        assert_eq!(engine.pools_for(2024).len(), 1);
        assert!(engine.pools_for(2025).is_empty());
        assert!(engine.pool(pool.id()).is_some());
    }

    #[test]
    fn test_pool_members_missing_period() {
        let engine = engine();
        assert!(matches!(
            engine.pool_members(2025, &[ShipId::new("S01")]),
            Err(EngineError::NotFound { .. })
        ));
    }

    #[test]
    fn test_engine_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ComplianceEngine>();
    }
}
