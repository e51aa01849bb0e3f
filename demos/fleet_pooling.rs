//! Fleet pooling example.
//!
//! Shows a pool being rejected for a negative aggregate, then accepted once
//! the largest surplus is raised enough to cover every deficit.

use fueleu_ledger::prelude::*;
use rust_decimal_macros::dec;

fn main() {
    println!("╔══════════════════════════════════════════╗");
    println!("║  fueleu-ledger: Fleet Pooling Example    ║");
    println!("╚══════════════════════════════════════════╝\n");

    let mut members = vec![
        PoolMember::new(ShipId::new("S01"), VesselType::Container, dec!(50000)),
        PoolMember::new(ShipId::new("S02"), VesselType::BulkCarrier, dec!(-25000)),
        PoolMember::new(ShipId::new("S03"), VesselType::Tanker, dec!(-15000)),
        PoolMember::new(ShipId::new("S04"), VesselType::RoRo, dec!(10000)),
        PoolMember::new(ShipId::new("S05"), VesselType::Container, dec!(-30000)),
    ];

    println!("━━━ Attempt 1 ━━━\n");
    match PoolAllocator::create_pool(2024, &members) {
        Ok(pool) => println!("{}", pool),
        Err(e) => println!("Rejected: {}\n", e),
    }

    println!("━━━ Attempt 2: S01 at 60000 ━━━\n");
    members[0].adjusted_cb = dec!(60000);
    match PoolAllocator::create_pool(2024, &members) {
        Ok(pool) => {
            println!("{}", pool);
            for m in pool.members() {
                let status = if m.transfer() > dec!(0) {
                    "RECEIVED"
                } else if m.transfer() < dec!(0) {
                    "DONATED"
                } else {
                    "UNCHANGED"
                };
                println!("  {:<5} {:>10}  [{}]", m.ship_id, m.transfer(), status);
            }
        }
        Err(e) => println!("Rejected: {}", e),
    }
}
