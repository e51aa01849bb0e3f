//! Banking ledger.
//!
//! An append-only log of signed transactions per ship. Deposits are
//! positive, withdrawals negative, and a ship's available balance is the
//! running sum of its records across all years.
//!
//! Mutations for one ship are serialized by that ship's account lock, so
//! the availability check and the append are a single step. Different
//! ships never contend beyond the brief map lookup.

use crate::accounting::calculator::BalanceCalculator;
use crate::core::balance::ComplianceBalance;
use crate::core::error::EngineError;
use crate::core::fuel::FuelDataProvider;
use crate::core::ship::{ShipId, Year};
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

/// One immutable ledger transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankRecord {
    id: Uuid,
    /// Position in the ledger's global append order.
    sequence: u64,
    ship_id: ShipId,
    /// Year of deposit, or the period a withdrawal is applied to.
    year: Year,
    /// Positive = deposit, negative = withdrawal.
    amount: Decimal,
    recorded_at: DateTime<Utc>,
}

impl BankRecord {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn ship_id(&self) -> &ShipId {
        &self.ship_id
    }

    pub fn year(&self) -> Year {
        self.year
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn recorded_at(&self) -> DateTime<Utc> {
        self.recorded_at
    }

    pub fn is_deposit(&self) -> bool {
        self.amount > Decimal::ZERO
    }

    pub fn is_withdrawal(&self) -> bool {
        self.amount < Decimal::ZERO
    }
}

/// Errors rebuilding a ledger from stored records.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LedgerReplayError {
    #[error("record {id} has a zero amount")]
    ZeroAmount { id: Uuid },
    #[error("record id {id} appears more than once")]
    DuplicateId { id: Uuid },
    #[error("sequence {sequence} is used by more than one record")]
    DuplicateSequence { sequence: u64 },
    #[error("record {id} takes a balance or sequence out of range")]
    Overflow { id: Uuid },
    #[error("record {id} would leave ship {ship} with available balance {available}")]
    Overdrawn {
        id: Uuid,
        ship: ShipId,
        available: Decimal,
    },
}

#[derive(Debug, Default)]
struct ShipAccount {
    records: Vec<BankRecord>,
    /// Cached running sum of `records`, updated under the account lock.
    available: Decimal,
}

impl ShipAccount {
    /// Available balance once `amount` is appended, if representable.
    fn balance_after(&self, amount: Decimal) -> Option<Decimal> {
        self.available.checked_add(amount)
    }

    fn append(&mut self, record: BankRecord, available: Decimal) {
        self.available = available;
        self.records.push(record);
    }
}

/// The banking ledger.
///
/// # Examples
///
/// ```
/// use fueleu_ledger::accounting::bank::BankLedger;
/// use fueleu_ledger::core::ship::ShipId;
/// use rust_decimal_macros::dec;
///
/// let ledger = BankLedger::new();
/// let ship = ShipId::new("S01");
///
/// ledger.bank_surplus(&ship, 2024, dec!(100_000)).unwrap();
/// ledger.withdraw(&ship, 2025, dec!(40_000)).unwrap();
/// assert_eq!(ledger.available_balance(&ship), dec!(60_000));
///
/// assert!(ledger.withdraw(&ship, 2025, dec!(60_001)).is_err());
/// ```
#[derive(Debug, Default)]
pub struct BankLedger {
    accounts: RwLock<HashMap<ShipId, Arc<Mutex<ShipAccount>>>>,
    next_sequence: AtomicU64,
}

impl BankLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a ledger from previously recorded transactions.
    ///
    /// Records are replayed in `sequence` order; the history is rejected if
    /// any prefix of it overdraws a ship, or if two records share an id or
    /// a sequence number.
    pub fn from_records(
        records: impl IntoIterator<Item = BankRecord>,
    ) -> Result<Self, LedgerReplayError> {
        let mut records: Vec<BankRecord> = records.into_iter().collect();
        records.sort_by_key(|r| r.sequence);

        let mut seen = HashSet::new();
        let mut sequences = HashSet::new();
        let mut accounts: HashMap<ShipId, ShipAccount> = HashMap::new();
        let mut next_sequence = 0;

        for record in records {
            if record.amount == Decimal::ZERO {
                return Err(LedgerReplayError::ZeroAmount { id: record.id });
            }
            if !seen.insert(record.id) {
                return Err(LedgerReplayError::DuplicateId { id: record.id });
            }
            if !sequences.insert(record.sequence) {
                return Err(LedgerReplayError::DuplicateSequence {
                    sequence: record.sequence,
                });
            }
            let overflow = LedgerReplayError::Overflow { id: record.id };
            let after_last = record.sequence.checked_add(1).ok_or(overflow.clone())?;
            let account = accounts.entry(record.ship_id.clone()).or_default();
            let available = account.balance_after(record.amount).ok_or(overflow)?;
            if available < Decimal::ZERO {
                return Err(LedgerReplayError::Overdrawn {
                    id: record.id,
                    ship: record.ship_id,
                    available,
                });
            }
            next_sequence = next_sequence.max(after_last);
            account.append(record, available);
        }

        log::info!(
            "replayed bank ledger: {} ships, next sequence {}",
            accounts.len(),
            next_sequence
        );

        Ok(Self {
            accounts: RwLock::new(
                accounts
                    .into_iter()
                    .map(|(ship, account)| (ship, Arc::new(Mutex::new(account))))
                    .collect(),
            ),
            next_sequence: AtomicU64::new(next_sequence),
        })
    }

    fn account(&self, ship: &ShipId) -> Arc<Mutex<ShipAccount>> {
        if let Some(account) = self.accounts.read().get(ship) {
            return Arc::clone(account);
        }
        let mut accounts = self.accounts.write();
        Arc::clone(accounts.entry(ship.clone()).or_default())
    }

    fn existing_account(&self, ship: &ShipId) -> Option<Arc<Mutex<ShipAccount>>> {
        self.accounts.read().get(ship).map(Arc::clone)
    }

    fn new_record(&self, ship: &ShipId, year: Year, amount: Decimal) -> BankRecord {
        BankRecord {
            id: Uuid::new_v4(),
            sequence: self.next_sequence.fetch_add(1, Ordering::Relaxed),
            ship_id: ship.clone(),
            year,
            amount,
            recorded_at: Utc::now(),
        }
    }

    /// Record a deposit of surplus for a ship.
    ///
    /// Whether the ship actually has that much surplus is the caller's
    /// concern; the ledger only guarantees the deposit is recorded once.
    ///
    /// # Errors
    ///
    /// - [`EngineError::InvalidAmount`] if `amount` is not positive.
    /// - [`EngineError::Overflow`] if the deposit would take the available
    ///   balance out of the `Decimal` range. Nothing is appended.
    pub fn bank_surplus(
        &self,
        ship: &ShipId,
        year: Year,
        amount: Decimal,
    ) -> Result<BankRecord, EngineError> {
        if amount <= Decimal::ZERO {
            log::warn!("rejected deposit of {} for {}: not positive", amount, ship);
            return Err(EngineError::InvalidAmount { amount });
        }
        let account = self.account(ship);
        let mut account = account.lock();
        let available = account.balance_after(amount).ok_or_else(|| {
            log::warn!("rejected deposit of {} for {}: balance out of range", amount, ship);
            EngineError::Overflow {
                operation: "bank deposit",
            }
        })?;
        let record = self.new_record(ship, year, amount);
        account.append(record.clone(), available);
        log::info!(
            "banked {} for {}-{} (available {})",
            amount,
            ship,
            year,
            account.available
        );
        Ok(record)
    }

    /// Sum of all of a ship's records across every year. Never negative.
    pub fn available_balance(&self, ship: &ShipId) -> Decimal {
        self.existing_account(ship)
            .map(|account| account.lock().available)
            .unwrap_or(Decimal::ZERO)
    }

    /// Append a withdrawal against the ship's available balance.
    ///
    /// # Errors
    ///
    /// - [`EngineError::InvalidAmount`] if `amount` is not positive.
    /// - [`EngineError::InsufficientBankedSurplus`] if `amount` exceeds the
    ///   available balance at the moment the account lock is held.
    pub fn withdraw(
        &self,
        ship: &ShipId,
        year: Year,
        amount: Decimal,
    ) -> Result<BankRecord, EngineError> {
        if amount <= Decimal::ZERO {
            log::warn!("rejected withdrawal of {} for {}: not positive", amount, ship);
            return Err(EngineError::InvalidAmount { amount });
        }
        let insufficient = |available| EngineError::InsufficientBankedSurplus {
            ship: ship.clone(),
            requested: amount,
            available,
        };

        let account = self
            .existing_account(ship)
            .ok_or_else(|| insufficient(Decimal::ZERO))?;
        let mut account = account.lock();
        if amount > account.available {
            log::warn!(
                "rejected withdrawal of {} for {}: only {} available",
                amount,
                ship,
                account.available
            );
            return Err(insufficient(account.available));
        }
        let available = account.available - amount;
        let record = self.new_record(ship, year, -amount);
        account.append(record.clone(), available);
        log::info!(
            "withdrew {} for {}-{} (available {})",
            amount,
            ship,
            year,
            account.available
        );
        Ok(record)
    }

    /// Draw banked surplus into a period and return that period's balance.
    ///
    /// The period's balance is computed and the draw applied to it before
    /// anything is appended, so a missing period or an unrepresentable
    /// result never leaves a withdrawal behind.
    pub fn apply_from_bank<P: FuelDataProvider + ?Sized>(
        &self,
        calculator: &BalanceCalculator,
        provider: &P,
        ship: &ShipId,
        year: Year,
        amount: Decimal,
    ) -> Result<ComplianceBalance, EngineError> {
        let balance = calculator
            .compute_balance(provider, ship, year)?
            .with_applied(amount)?;
        self.withdraw(ship, year, amount)?;
        Ok(balance)
    }

    /// Total withdrawn from the bank into one period.
    ///
    /// # Errors
    ///
    /// [`EngineError::Overflow`] if the withdrawals sum past the `Decimal` range.
    pub fn applied_to(&self, ship: &ShipId, year: Year) -> Result<Decimal, EngineError> {
        let Some(account) = self.existing_account(ship) else {
            return Ok(Decimal::ZERO);
        };
        let account = account.lock();
        account
            .records
            .iter()
            .filter(|r| r.year == year && r.is_withdrawal())
            .try_fold(Decimal::ZERO, |total, r| total.checked_add(-r.amount))
            .ok_or(EngineError::Overflow {
                operation: "applied total",
            })
    }

    /// A ship's records in append order.
    pub fn records_for(&self, ship: &ShipId) -> Vec<BankRecord> {
        self.existing_account(ship)
            .map(|account| account.lock().records.clone())
            .unwrap_or_default()
    }

    /// Every record in the ledger, in global append order.
    pub fn records(&self) -> Vec<BankRecord> {
        let accounts: Vec<_> = self.accounts.read().values().map(Arc::clone).collect();
        let mut records: Vec<BankRecord> = accounts
            .iter()
            .flat_map(|account| account.lock().records.clone())
            .collect();
        records.sort_by_key(|r| r.sequence);
        records
    }

    pub fn len(&self) -> usize {
        self.accounts
            .read()
            .values()
            .map(|account| account.lock().records.len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
