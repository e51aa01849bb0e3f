//! fueleu-ledger CLI
//!
//! Compute compliance balances, replay banking scenarios and allocate pools
//! from the command line.
//!
//! # Usage
//!
//! ```bash
//! # Balance of one ship-period
//! fueleu-ledger balance --fleet fleet.json --ship S01 --year 2024
//!
//! # Every ship-period in the fleet, as JSON
//! fueleu-ledger balance --fleet fleet.json --format json
//!
//! # Run a sequence of bank / apply / pool operations
//! fueleu-ledger run --fleet fleet.json --scenario scenario.json
//!
//! # Allocate a pool from explicit member balances
//! fueleu-ledger pool --input members.json
//!
//! # Generate a random fleet for testing
//! fueleu-ledger generate --ships 20 --years 2024,2025
//! ```

use fueleu_ledger::accounting::pool::{Pool, PoolMember};
use fueleu_ledger::core::balance::ComplianceBalance;
use fueleu_ledger::core::config::ComplianceConfig;
use fueleu_ledger::core::fuel::RouteTable;
use fueleu_ledger::core::ship::{ShipId, Year};
use fueleu_ledger::engine::ComplianceEngine;
use fueleu_ledger::simulation::fleet::{generate_random_fleet, FleetConfig};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::fs;
use std::process;

const BALANCE_OPTIONS: &[&str] = &["--fleet", "--ship", "--year", "--format", "--config"];
const RUN_OPTIONS: &[&str] = &["--fleet", "--scenario", "--format", "--config"];
const POOL_OPTIONS: &[&str] = &["--input", "--format"];
const GENERATE_OPTIONS: &[&str] = &["--ships", "--years", "--routes", "--output"];

const USAGE: &str = r#"fueleu-ledger — compliance balance, banking and pooling for ship GHG intensity

USAGE:
    fueleu-ledger <COMMAND> [OPTIONS]

COMMANDS:
    balance     Compute compliance balances from a fleet file
    run         Execute a banking / pooling scenario against a fleet file
    pool        Allocate a pool from a member list
    generate    Generate a random fleet file (for testing)
    help        Show this message

OPTIONS (balance):
    --fleet <FILE>      Path to JSON fleet (routes) file
    --ship <ID>         Ship to report (default: every ship)
    --year <YEAR>       Year to report (default: every year)

OPTIONS (run):
    --fleet <FILE>      Path to JSON fleet (routes) file
    --scenario <FILE>   Path to JSON scenario file

OPTIONS (pool):
    --input <FILE>      Path to JSON pool members file

OPTIONS (balance, run, pool):
    --format <FORMAT>   Output format: text (default) or json

OPTIONS (balance, run):
    --config <FILE>     JSON config file (default: environment, then built-in)

OPTIONS (generate):
    --ships <N>         Number of ships (default: 10)
    --years <LIST>      Comma-separated years (default: 2024,2025)
    --routes <N>        Routes per ship per year (default: 1)
    --output <FILE>     Write to file instead of stdout

ENVIRONMENT:
    FUELEU_GHG_INTENSITY_TARGET          Target intensity in gCO2e/MJ
    FUELEU_ENERGY_DENSITY_MJ_PER_TONNE   Energy density in MJ/t
    RUST_LOG                             Log level (error, warn, info, debug)"#;

fn print_usage() {
    eprintln!("{}", USAGE);
}

fn fail(message: impl std::fmt::Display) -> ! {
    eprintln!("Error: {}", message);
    process::exit(1);
}

/// Collect `--name value` pairs, rejecting options not in `allowed`.
fn parse_options(args: &[String], allowed: &[&str]) -> HashMap<String, String> {
    let mut options = HashMap::new();
    let mut i = 0;
    while i < args.len() {
        let name = args[i].as_str();
        if !allowed.contains(&name) {
            fail(format!("unknown option: {}", name));
        }
        i += 1;
        let value = args
            .get(i)
            .cloned()
            .unwrap_or_else(|| fail(format!("{} requires a value", name)));
        options.insert(name.to_string(), value);
        i += 1;
    }
    options
}

fn parse_or_exit<T: std::str::FromStr>(name: &str, raw: &str) -> T {
    raw.parse()
        .unwrap_or_else(|_| fail(format!("invalid value '{}' for {}", raw, name)))
}

fn is_json(options: &HashMap<String, String>) -> bool {
    match options.get("--format").map(String::as_str) {
        None | Some("text") => false,
        Some("json") => true,
        Some(other) => fail(format!("--format must be 'text' or 'json', got '{}'", other)),
    }
}

fn print_json<T: serde::Serialize>(value: &T) {
    let json = serde_json::to_string_pretty(value)
        .unwrap_or_else(|e| fail(format!("serializing output: {}", e)));
    println!("{}", json);
}

fn load_config(options: &HashMap<String, String>) -> ComplianceConfig {
    let result = match options.get("--config") {
        Some(path) => ComplianceConfig::from_json_file(path),
        None => ComplianceConfig::from_env(),
    };
    result.unwrap_or_else(|e| fail(format!("loading config: {}", e)))
}

fn read_json<T: serde::de::DeserializeOwned>(path: &str) -> T {
    let content = fs::read_to_string(path)
        .unwrap_or_else(|e| fail(format!("reading file '{}': {}", path, e)));
    serde_json::from_str(&content)
        .unwrap_or_else(|e| fail(format!("parsing JSON in '{}': {}", path, e)))
}

fn load_engine(options: &HashMap<String, String>) -> ComplianceEngine {
    let path = options
        .get("--fleet")
        .unwrap_or_else(|| fail("--fleet <FILE> is required"));
    let routes: RouteTable = read_json(path);
    log::info!("loaded {} routes from {}", routes.len(), path);
    ComplianceEngine::new(load_config(options), routes)
}

fn cmd_balance(args: &[String]) {
    let options = parse_options(args, BALANCE_OPTIONS);
    let engine = load_engine(&options);
    let ship = options.get("--ship").map(|s| ShipId::new(s.as_str()));
    let year: Option<Year> = options.get("--year").map(|y| parse_or_exit("--year", y));

    let mut periods: Vec<(ShipId, Year)> = engine
        .provider()
        .routes()
        .map(|r| (r.ship_id.clone(), r.year))
        .filter(|(s, y)| ship.as_ref().map_or(true, |x| x == s) && year.map_or(true, |x| x == *y))
        .collect();
    periods.dedup();

    if periods.is_empty() {
        match (ship, year) {
            (Some(s), Some(y)) => fail(format!("no fuel data for ship {} in {}", s, y)),
            _ => fail("no matching routes in fleet file"),
        }
    }

    let balances: Vec<ComplianceBalance> = periods
        .iter()
        .map(|(s, y)| engine.compliance_balance(s, *y).unwrap_or_else(|e| fail(e)))
        .collect();

    if is_json(&options) {
        print_json(&balances);
    } else {
        for balance in &balances {
            println!("{}\n", balance);
        }
    }
}

/// One step of a scenario file.
#[derive(serde::Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum Operation {
    Balance { ship: ShipId, year: Year },
    Bank { ship: ShipId, year: Year, amount: Decimal },
    Apply { ship: ShipId, year: Year, amount: Decimal },
    Available { ship: ShipId },
    Pool { year: Year, ships: Vec<ShipId> },
}

#[derive(serde::Deserialize)]
struct ScenarioFile {
    operations: Vec<Operation>,
}

#[derive(serde::Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
enum StepOutput {
    Balance { balance: ComplianceBalance },
    Banked { ship: ShipId, year: Year, amount: Decimal, available: Decimal },
    Applied { balance: ComplianceBalance, available: Decimal },
    Available { ship: ShipId, available: Decimal },
    Pooled { pool: Pool },
    Rejected { error: String },
}

fn run_operation(engine: &ComplianceEngine, op: &Operation) -> StepOutput {
    let result = match op {
        Operation::Balance { ship, year } => engine
            .adjusted_balance(ship, *year)
            .map(|balance| StepOutput::Balance { balance }),
        Operation::Bank { ship, year, amount } => {
            engine.bank_surplus(ship, *year, *amount).map(|record| StepOutput::Banked {
                ship: ship.clone(),
                year: *year,
                amount: record.amount(),
                available: engine.available_balance(ship),
            })
        }
        Operation::Apply { ship, year, amount } => engine
            .apply_from_bank(ship, *year, *amount)
            .map(|balance| StepOutput::Applied {
                balance,
                available: engine.available_balance(ship),
            }),
        Operation::Available { ship } => Ok(StepOutput::Available {
            ship: ship.clone(),
            available: engine.available_balance(ship),
        }),
        Operation::Pool { year, ships } => engine
            .pool_members(*year, ships)
            .and_then(|members| engine.create_pool(*year, &members))
            .map(|pool| StepOutput::Pooled { pool }),
    };
    result.unwrap_or_else(|e| StepOutput::Rejected {
        error: e.to_string(),
    })
}

fn print_step(index: usize, step: &StepOutput) {
    match step {
        StepOutput::Balance { balance } => println!("[{}] {}\n", index, balance),
        StepOutput::Banked {
            ship,
            year,
            amount,
            available,
        } => println!(
            "[{}] Banked {} for {}-{} (available {})\n",
            index, amount, ship, year, available
        ),
        StepOutput::Applied { balance, available } => {
            println!("[{}] {}\n    Bank available: {}\n", index, balance, available)
        }
        StepOutput::Available { ship, available } => {
            println!("[{}] {} has {} banked\n", index, ship, available)
        }
        StepOutput::Pooled { pool } => println!("[{}] {}", index, pool),
        StepOutput::Rejected { error } => println!("[{}] REJECTED: {}\n", index, error),
    }
}

fn cmd_run(args: &[String]) {
    let options = parse_options(args, RUN_OPTIONS);
    let engine = load_engine(&options);
    let path = options
        .get("--scenario")
        .unwrap_or_else(|| fail("--scenario <FILE> is required"));
    let scenario: ScenarioFile = read_json(path);

    let steps: Vec<StepOutput> = scenario
        .operations
        .iter()
        .map(|op| run_operation(&engine, op))
        .collect();

    if is_json(&options) {
        print_json(&steps);
    } else {
        for (i, step) in steps.iter().enumerate() {
            print_step(i, step);
        }
    }
}

#[derive(serde::Deserialize)]
struct MembersFile {
    year: Year,
    members: Vec<PoolMember>,
}

fn cmd_pool(args: &[String]) {
    let options = parse_options(args, POOL_OPTIONS);
    let path = options
        .get("--input")
        .unwrap_or_else(|| fail("--input <FILE> is required"));
    let file: MembersFile = read_json(path);

    let engine = ComplianceEngine::new(ComplianceConfig::default(), RouteTable::new());
    let pool = engine.create_pool(file.year, &file.members).unwrap_or_else(|e| fail(e));

    if is_json(&options) {
        print_json(&pool);
    } else {
        println!("{}", pool);
    }
}

fn cmd_generate(args: &[String]) {
    let options = parse_options(args, GENERATE_OPTIONS);
    let mut config = FleetConfig::default();
    if let Some(n) = options.get("--ships") {
        config.ship_count = parse_or_exit("--ships", n);
    }
    if let Some(list) = options.get("--years") {
        config.years = list
            .split(',')
            .map(|y| parse_or_exit("--years", y.trim()))
            .collect();
    }
    if let Some(n) = options.get("--routes") {
        config.routes_per_period = parse_or_exit("--routes", n);
    }

    let fleet = generate_random_fleet(&config);
    let json = serde_json::to_string_pretty(&fleet)
        .unwrap_or_else(|e| fail(format!("serializing fleet: {}", e)));

    if let Some(path) = options.get("--output") {
        fs::write(path, &json).unwrap_or_else(|e| fail(format!("writing to '{}': {}", path, e)));
        eprintln!(
            "Generated {} routes across {} ships → {}",
            fleet.len(),
            config.ship_count,
            path
        );
    } else {
        println!("{}", json);
    }
}

fn main() {
    env_logger::init();
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage();
        process::exit(1);
    }

    let command = args[1].as_str();
    let rest = &args[2..];

    match command {
        "balance" => cmd_balance(rest),
        "run" => cmd_run(rest),
        "pool" => cmd_pool(rest),
        "generate" => cmd_generate(rest),
        "help" | "--help" | "-h" => print_usage(),
        _ => {
            eprintln!("Unknown command: {}", command);
            print_usage();
            process::exit(1);
        }
    }
}
