//! Random fleet generation for stress tests, the CLI and benchmarks.

use crate::accounting::pool::PoolMember;
use crate::core::fuel::{FuelType, RouteTable, ShipRoute};
use crate::core::ship::{ShipId, VesselType, Year};
use rand::Rng;
use rust_decimal::Decimal;

/// Configuration for generating a random fleet.
#[derive(Debug, Clone)]
pub struct FleetConfig {
    /// Number of ships in the fleet.
    pub ship_count: usize,
    /// Reporting years; every ship gets routes in each.
    pub years: Vec<Year>,
    /// Routes per ship per year.
    pub routes_per_period: usize,
    /// GHG intensity range in gCO2e/MJ.
    pub min_intensity: f64,
    pub max_intensity: f64,
    /// Fuel consumption range per route, in tonnes.
    pub min_fuel_tonnes: u32,
    pub max_fuel_tonnes: u32,
}

impl Default for FleetConfig {
    fn default() -> Self {
        Self {
            ship_count: 10,
            years: vec![2024, 2025],
            routes_per_period: 1,
            min_intensity: 84.0,
            max_intensity: 94.0,
            min_fuel_tonnes: 1_000,
            max_fuel_tonnes: 8_000,
        }
    }
}

pub fn ship_id(index: usize) -> ShipId {
    ShipId::new(format!("S{:03}", index + 1))
}

/// Generate a random route table.
pub fn generate_random_fleet(config: &FleetConfig) -> RouteTable {
    let mut rng = rand::thread_rng();
    let mut table = RouteTable::new();
    let mut route_no = 0;

    for i in 0..config.ship_count {
        let ship = ship_id(i);
        let vessel_type = VesselType::ALL[rng.gen_range(0..VesselType::ALL.len())];

        for &year in &config.years {
            for _ in 0..config.routes_per_period {
                route_no += 1;
                let intensity = rng.gen_range(config.min_intensity..config.max_intensity);
                let ghg_intensity = Decimal::from_f64_retain(intensity)
                    .unwrap_or(Decimal::from(89))
                    .round_dp(2);
                let fuel = Decimal::from(
                    rng.gen_range(config.min_fuel_tonnes..=config.max_fuel_tonnes),
                );
                let fuel_type = FuelType::ALL[rng.gen_range(0..FuelType::ALL.len())];

                table.add(
                    ShipRoute::new(format!("R{:04}", route_no), ship.clone(), year, ghg_intensity, fuel)
                        .with_vessel_type(vessel_type)
                        .with_fuel_type(fuel_type)
                        .with_distance(Decimal::from(rng.gen_range(2_000u32..15_000))),
                );
            }
        }
    }

    table
}

/// Generate `count` pool members with balances in `[-max_abs, max_abs]`.
///
/// The aggregate may be negative; callers wanting a valid pool can lift the
/// first member with [`make_pool_viable`].
pub fn generate_pool_members(count: usize, max_abs: i64) -> Vec<PoolMember> {
    let mut rng = rand::thread_rng();
    (0..count)
        .map(|i| {
            PoolMember::new(
                ship_id(i),
                VesselType::ALL[i % VesselType::ALL.len()],
                Decimal::from(rng.gen_range(-max_abs..=max_abs)),
            )
        })
        .collect()
}

/// Raise the first member's balance just enough for a non-negative aggregate.
pub fn make_pool_viable(members: &mut [PoolMember]) {
    let sum: Decimal = members.iter().map(|m| m.adjusted_cb).sum();
    if sum < Decimal::ZERO {
        if let Some(first) = members.first_mut() {
            first.adjusted_cb -= sum;
        }
    }
}
