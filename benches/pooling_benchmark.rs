use criterion::{black_box, criterion_group, criterion_main, Criterion};
use fueleu_ledger::accounting::bank::BankLedger;
use fueleu_ledger::accounting::pool::PoolAllocator;
use fueleu_ledger::core::config::ComplianceConfig;
use fueleu_ledger::core::ship::ShipId;
use fueleu_ledger::engine::ComplianceEngine;
use fueleu_ledger::simulation::fleet::{
    generate_pool_members, generate_random_fleet, make_pool_viable, ship_id, FleetConfig,
};
use rust_decimal::Decimal;

fn bench_pool(c: &mut Criterion, name: &str, size: usize) {
    let mut members = generate_pool_members(size, 10_000_000);
    make_pool_viable(&mut members);

    c.bench_function(name, |b| {
        b.iter(|| PoolAllocator::allocate(black_box(&members)))
    });
}

fn bench_pool_10_ships(c: &mut Criterion) {
    bench_pool(c, "pool_10_ships", 10);
}

fn bench_pool_100_ships(c: &mut Criterion) {
    bench_pool(c, "pool_100_ships", 100);
}

fn bench_pool_1000_ships(c: &mut Criterion) {
    bench_pool(c, "pool_1000_ships", 1000);
}

fn bench_fleet_balances(c: &mut Criterion) {
    let config = FleetConfig {
        ship_count: 500,
        years: vec![2024],
        routes_per_period: 3,
        ..Default::default()
    };
    let engine = ComplianceEngine::new(ComplianceConfig::default(), generate_random_fleet(&config));
    let ships: Vec<ShipId> = (0..config.ship_count).map(ship_id).collect();

    c.bench_function("fleet_500_pool_members", |b| {
        b.iter(|| engine.pool_members(2024, black_box(&ships)))
    });
}

fn bench_bank_cycle(c: &mut Criterion) {
    let ledger = BankLedger::new();
    let ship = ShipId::new("S001");

    c.bench_function("bank_deposit_and_draw", |b| {
        b.iter(|| {
            ledger.bank_surplus(&ship, 2024, Decimal::from(100)).ok();
            ledger.withdraw(&ship, 2025, black_box(Decimal::from(100))).ok();
        })
    });
}

criterion_group!(
    benches,
    bench_pool_10_ships,
    bench_pool_100_ships,
    bench_pool_1000_ships,
    bench_fleet_balances,
    bench_bank_cycle
);
criterion_main!(benches);
