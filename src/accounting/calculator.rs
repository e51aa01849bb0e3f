use crate::core::balance::ComplianceBalance;
use crate::core::config::ComplianceConfig;
use crate::core::error::EngineError;
use crate::core::fuel::{FuelDataProvider, FuelRecord};
use crate::core::ship::{ShipId, Year};
use rust_decimal::{Decimal, RoundingStrategy};

/// Decimal places kept on a computed compliance balance.
pub const CB_DECIMAL_PLACES: u32 = 2;

/// Turns a ship-period's fuel data into a signed compliance balance.
///
/// Stateless apart from its configuration; every call is a pure read of
/// the provider and can run concurrently with anything else.
#[derive(Debug, Clone, Default)]
pub struct BalanceCalculator {
    config: ComplianceConfig,
}

impl BalanceCalculator {
    pub fn new(config: ComplianceConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ComplianceConfig {
        &self.config
    }

    /// Energy in scope for a fuel record, in MJ.
    pub fn energy_in_scope(&self, record: &FuelRecord) -> Result<Decimal, EngineError> {
        record
            .fuel_consumption_tonnes
            .checked_mul(self.config.energy_density_mj_per_tonne)
            .ok_or(EngineError::Overflow {
                operation: "energy in scope",
            })
    }

    /// Raw compliance balance in gCO2eq for a fuel record.
    ///
    /// `(target - achieved) * energy`, rounded half away from zero to
    /// [`CB_DECIMAL_PLACES`].
    ///
    /// # Errors
    ///
    /// [`EngineError::Overflow`] if the product leaves the `Decimal` range.
    pub fn raw_balance(&self, record: &FuelRecord) -> Result<Decimal, EngineError> {
        let overflow = EngineError::Overflow {
            operation: "compliance balance",
        };
        let gap = self
            .config
            .ghg_intensity_target
            .checked_sub(record.ghg_intensity)
            .ok_or_else(|| overflow.clone())?;
        let cb = gap
            .checked_mul(self.energy_in_scope(record)?)
            .ok_or(overflow)?;
        Ok(cb.round_dp_with_strategy(CB_DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero))
    }

    /// Compute the balance for a ship-period with nothing applied from the bank.
    ///
    /// # Errors
    ///
    /// [`EngineError::NotFound`] if the provider has no data for the period,
    /// [`EngineError::Overflow`] if the fuel figures are too large to price.
    pub fn compute_balance<P: FuelDataProvider + ?Sized>(
        &self,
        provider: &P,
        ship: &ShipId,
        year: Year,
    ) -> Result<ComplianceBalance, EngineError> {
        let record = provider
            .fuel_data(ship, year)
            .ok_or_else(|| EngineError::NotFound {
                ship: ship.clone(),
                year,
            })?;
        let cb_before = self.raw_balance(&record)?;
        log::debug!(
            "computed CB for {}-{}: intensity={} fuel={}t cb={}",
            ship,
            year,
            record.ghg_intensity,
            record.fuel_consumption_tonnes,
            cb_before
        );
        Ok(ComplianceBalance::new(ship.clone(), year, cb_before))
    }
}
