use crate::core::ship::{PeriodKey, ShipId, VesselType, Year};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Marine fuel grade burned on a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FuelType {
    /// Heavy fuel oil.
    #[serde(rename = "HFO")]
    Hfo,
    /// Liquefied natural gas.
    #[serde(rename = "LNG")]
    Lng,
    /// Marine gas oil.
    #[serde(rename = "MGO")]
    Mgo,
}

impl FuelType {
    pub const ALL: [FuelType; 3] = [FuelType::Hfo, FuelType::Lng, FuelType::Mgo];
}

impl fmt::Display for FuelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FuelType::Hfo => "HFO",
            FuelType::Lng => "LNG",
            FuelType::Mgo => "MGO",
        };
        f.write_str(name)
    }
}

/// What the balance calculator needs to know about one ship-period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FuelRecord {
    /// Achieved GHG intensity in gCO2e/MJ.
    pub ghg_intensity: Decimal,
    /// Fuel consumed in tonnes.
    pub fuel_consumption_tonnes: Decimal,
}

/// Source of per-period fuel data. The engine only ever reads from it.
pub trait FuelDataProvider: Send + Sync {
    /// Fuel data for a ship in a given year, or `None` if nothing was reported.
    fn fuel_data(&self, ship: &ShipId, year: Year) -> Option<FuelRecord>;
}

/// One reported voyage leg.
///
/// # Examples
///
/// ```
/// use fueleu_ledger::core::fuel::{FuelType, ShipRoute};
/// use fueleu_ledger::core::ship::{ShipId, VesselType};
/// use rust_decimal_macros::dec;
///
/// let route = ShipRoute::new("R001", ShipId::new("S01"), 2024, dec!(91.0), dec!(5000))
///     .with_vessel_type(VesselType::Container)
///     .with_fuel_type(FuelType::Hfo);
///
/// assert!(!route.is_compliant(dec!(89.34)));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShipRoute {
    pub id: String,
    pub ship_id: ShipId,
    pub year: Year,
    /// Achieved GHG intensity in gCO2e/MJ.
    pub ghg_intensity: Decimal,
    /// Fuel consumed in tonnes.
    pub fuel_consumption: Decimal,
    #[serde(default = "default_vessel_type")]
    pub vessel_type: VesselType,
    #[serde(default = "default_fuel_type")]
    pub fuel_type: FuelType,
    /// Distance in km.
    #[serde(default)]
    pub distance: Decimal,
    /// Total emissions in tonnes CO2e.
    #[serde(default)]
    pub total_emissions: Decimal,
}

fn default_vessel_type() -> VesselType {
    VesselType::Container
}

fn default_fuel_type() -> FuelType {
    FuelType::Hfo
}

impl ShipRoute {
    pub fn new(
        id: impl Into<String>,
        ship_id: ShipId,
        year: Year,
        ghg_intensity: Decimal,
        fuel_consumption: Decimal,
    ) -> Self {
        Self {
            id: id.into(),
            ship_id,
            year,
            ghg_intensity,
            fuel_consumption,
            vessel_type: default_vessel_type(),
            fuel_type: default_fuel_type(),
            distance: Decimal::ZERO,
            total_emissions: Decimal::ZERO,
        }
    }

    pub fn with_vessel_type(mut self, vessel_type: VesselType) -> Self {
        self.vessel_type = vessel_type;
        self
    }

    pub fn with_fuel_type(mut self, fuel_type: FuelType) -> Self {
        self.fuel_type = fuel_type;
        self
    }

    pub fn with_distance(mut self, distance: Decimal) -> Self {
        self.distance = distance;
        self
    }

    pub fn with_total_emissions(mut self, total_emissions: Decimal) -> Self {
        self.total_emissions = total_emissions;
        self
    }

    pub fn period(&self) -> PeriodKey {
        PeriodKey::new(self.ship_id.clone(), self.year)
    }

    /// Whether this route meets the target on its own.
    pub fn is_compliant(&self, target: Decimal) -> bool {
        self.ghg_intensity <= target
    }
}

/// In-memory route store keyed by ship-period.
///
/// Several routes reported for the same ship and year are folded into one
/// [`FuelRecord`]: consumption is summed and intensity is the
/// consumption-weighted mean.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "RouteList", into = "RouteList")]
pub struct RouteTable {
    routes: BTreeMap<PeriodKey, Vec<ShipRoute>>,
}

#[derive(Serialize, Deserialize)]
struct RouteList {
    routes: Vec<ShipRoute>,
}

impl From<RouteList> for RouteTable {
    fn from(list: RouteList) -> Self {
        list.routes.into_iter().collect()
    }
}

impl From<RouteTable> for RouteList {
    fn from(table: RouteTable) -> Self {
        RouteList {
            routes: table.routes.into_values().flatten().collect(),
        }
    }
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, route: ShipRoute) {
        self.routes.entry(route.period()).or_default().push(route);
    }

    /// Routes reported for one ship-period, in insertion order.
    pub fn routes_for(&self, ship: &ShipId, year: Year) -> &[ShipRoute] {
        self.routes
            .get(&PeriodKey::new(ship.clone(), year))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// All routes, ordered by ship then year.
    pub fn routes(&self) -> impl Iterator<Item = &ShipRoute> {
        self.routes.values().flatten()
    }

    pub fn len(&self) -> usize {
        self.routes.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// All unique ships with at least one route.
    pub fn ships(&self) -> Vec<ShipId> {
        let mut ships: Vec<ShipId> = self.routes.keys().map(|k| k.ship_id.clone()).collect();
        ships.dedup();
        ships
    }

    /// Vessel type of the first route reported for a ship, if any.
    pub fn vessel_type(&self, ship: &ShipId) -> Option<VesselType> {
        self.routes
            .iter()
            .find(|(key, _)| &key.ship_id == ship)
            .and_then(|(_, routes)| routes.first())
            .map(|r| r.vessel_type)
    }
}

impl FuelDataProvider for RouteTable {
    fn fuel_data(&self, ship: &ShipId, year: Year) -> Option<FuelRecord> {
        let routes = self.routes_for(ship, year);
        let first = match routes {
            [] => return None,
            [only] => {
                return Some(FuelRecord {
                    ghg_intensity: only.ghg_intensity,
                    fuel_consumption_tonnes: only.fuel_consumption,
                })
            }
            [first, ..] => first,
        };

        let mut total_fuel = Decimal::ZERO;
        let mut weighted = Decimal::ZERO;
        for route in routes {
            let contribution = route.ghg_intensity.checked_mul(route.fuel_consumption);
            match (total_fuel.checked_add(route.fuel_consumption), contribution) {
                (Some(fuel), Some(c)) => match weighted.checked_add(c) {
                    Some(w) => {
                        total_fuel = fuel;
                        weighted = w;
                    }
                    None => return overflowed(ship, year),
                },
                _ => return overflowed(ship, year),
            }
        }

        let ghg_intensity = if total_fuel > Decimal::ZERO {
            weighted / total_fuel
        } else {
            first.ghg_intensity
        };

        Some(FuelRecord {
            ghg_intensity,
            fuel_consumption_tonnes: total_fuel,
        })
    }
}

fn overflowed(ship: &ShipId, year: Year) -> Option<FuelRecord> {
    log::warn!(
        "fuel totals for {}-{} exceed the decimal range; treating period as unreported",
        ship,
        year
    );
    None
}

impl FromIterator<ShipRoute> for RouteTable {
    fn from_iter<T: IntoIterator<Item = ShipRoute>>(iter: T) -> Self {
        let mut table = RouteTable::new();
        for route in iter {
            table.add(route);
        }
        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn s01() -> ShipId {
        ShipId::new("S01")
    }

    #[test]
    fn test_single_route_fuel_data() {
        let table: RouteTable =
            std::iter::once(ShipRoute::new("R001", s01(), 2024, dec!(85), dec!(5000))).collect();
        let record = table.fuel_data(&s01(), 2024).unwrap();
        assert_eq!(record.ghg_intensity, dec!(85));
        assert_eq!(record.fuel_consumption_tonnes, dec!(5000));
    }

    #[test]
    fn test_unrepresentable_totals_are_unreported() {
        let mut table = RouteTable::new();
        table.add(ShipRoute::new("R001", s01(), 2024, dec!(90), Decimal::MAX));
        table.add(ShipRoute::new("R002", s01(), 2024, dec!(80), Decimal::MAX));
        assert!(table.fuel_data(&s01(), 2024).is_none());
    }

    #[test]
    fn test_missing_period() {
        let table: RouteTable =
            std::iter::once(ShipRoute::new("R001", s01(), 2024, dec!(85), dec!(5000))).collect();
        assert!(table.fuel_data(&s01(), 2025).is_none());
        assert!(table.fuel_data(&ShipId::new("S99"), 2024).is_none());
    }

    #[test]
    fn test_multiple_routes_weighted() {
        let mut table = RouteTable::new();
        table.add(ShipRoute::new("R001", s01(), 2024, dec!(90), dec!(3000)));
        table.add(ShipRoute::new("R002", s01(), 2024, dec!(80), dec!(1000)));
        let record = table.fuel_data(&s01(), 2024).unwrap();
        // (90*3000 + 80*1000) / 4000 = 87.5
        assert_eq!(record.ghg_intensity, dec!(87.5));
        assert_eq!(record.fuel_consumption_tonnes, dec!(4000));
    }

    #[test]
    fn test_zero_fuel_keeps_reported_intensity() {
        let table: RouteTable =
            std::iter::once(ShipRoute::new("R001", s01(), 2024, dec!(88), dec!(0))).collect();
        let record = table.fuel_data(&s01(), 2024).unwrap();
        assert_eq!(record.ghg_intensity, dec!(88));
        assert_eq!(record.fuel_consumption_tonnes, Decimal::ZERO);
    }

    #[test]
    fn test_route_table_json_shape() {
        let json = r#"{
            "routes": [
                { "id": "R001", "ship_id": "S01", "year": 2024, "ghg_intensity": "91.0",
                  "fuel_consumption": "5000", "vessel_type": "Container", "fuel_type": "HFO" },
                { "id": "R002", "ship_id": "S02", "year": 2024, "ghg_intensity": "88.0",
                  "fuel_consumption": "4800", "vessel_type": "BulkCarrier", "fuel_type": "LNG" }
            ]
        }"#;
        let table: RouteTable = serde_json::from_str(json).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.ships(), vec![ShipId::new("S01"), ShipId::new("S02")]);
        assert_eq!(
            table.vessel_type(&ShipId::new("S02")),
            Some(VesselType::BulkCarrier)
        );
        assert_eq!(table.routes_for(&s01(), 2024)[0].fuel_type, FuelType::Hfo);
    }

    #[test]
    fn test_compliance_flag() {
        let route = ShipRoute::new("R002", s01(), 2024, dec!(88.0), dec!(4800));
        assert!(route.is_compliant(dec!(89.34)));
        assert!(!route.is_compliant(dec!(87.0)));
    }
}
