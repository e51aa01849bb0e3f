//! Banking walkthrough.
//!
//! Computes balances for a small fleet, banks one ship's surplus and draws
//! it down against the same ship's deficit the following year.

use fueleu_ledger::prelude::*;
use rust_decimal_macros::dec;

fn main() {
    println!("╔══════════════════════════════════════════╗");
    println!("║  fueleu-ledger: Banking Walkthrough      ║");
    println!("╚══════════════════════════════════════════╝\n");

    let s01 = ShipId::new("S01");
    let mut routes = RouteTable::new();
    routes.add(
        ShipRoute::new("R001", s01.clone(), 2024, dec!(85.0), dec!(5000))
            .with_vessel_type(VesselType::Container)
            .with_fuel_type(FuelType::Lng),
    );
    routes.add(
        ShipRoute::new("R002", s01.clone(), 2025, dec!(90.5), dec!(4950))
            .with_vessel_type(VesselType::Container)
            .with_fuel_type(FuelType::Hfo),
    );

    let engine = ComplianceEngine::new(ComplianceConfig::default(), routes);

    // --- 2024: surplus ---
    println!("━━━ 2024: Surplus Year ━━━\n");
    let balance_2024 = match engine.compliance_balance(&s01, 2024) {
        Ok(b) => b,
        Err(e) => {
            eprintln!("{}", e);
            return;
        }
    };
    println!("{}\n", balance_2024);

    let record = match engine.bank_surplus(&s01, 2024, balance_2024.cb_before()) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("{}", e);
            return;
        }
    };
    println!("Banked {} (record {})", record.amount(), record.id());
    println!("Available: {}\n", engine.available_balance(&s01));

    // --- 2025: deficit ---
    println!("━━━ 2025: Deficit Year ━━━\n");
    let balance_2025 = match engine.compliance_balance(&s01, 2025) {
        Ok(b) => b,
        Err(e) => {
            eprintln!("{}", e);
            return;
        }
    };
    println!("{}\n", balance_2025);

    // Overdrawing is refused and leaves the bank untouched.
    let too_much = engine.available_balance(&s01) + dec!(1);
    if let Err(e) = engine.apply_from_bank(&s01, 2025, too_much) {
        println!("Rejected: {}\n", e);
    }

    match engine.apply_from_bank(&s01, 2025, -balance_2025.cb_before()) {
        Ok(b) => println!("{}\n", b),
        Err(e) => eprintln!("{}", e),
    }
    println!("Remaining in bank: {}", engine.available_balance(&s01));

    println!("\n━━━ Ledger ━━━\n");
    for r in engine.ledger().records() {
        println!("  #{:<3} {} {} {:>20}", r.sequence(), r.ship_id(), r.year(), r.amount());
    }
}
