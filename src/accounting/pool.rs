use crate::core::error::{EngineError, PoolViolation};
use crate::core::ship::{ShipId, VesselType, Year};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

/// A ship's balance as it enters a pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolMember {
    pub ship_id: ShipId,
    /// Passthrough metadata.
    pub vessel_type: VesselType,
    /// Balance at pool entry (the period's `cb_after` including any bank draw).
    pub adjusted_cb: Decimal,
}

impl PoolMember {
    pub fn new(ship_id: ShipId, vessel_type: VesselType, adjusted_cb: Decimal) -> Self {
        Self {
            ship_id,
            vessel_type,
            adjusted_cb,
        }
    }
}

/// Before/after snapshot of one pool member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolAllocation {
    pub ship_id: ShipId,
    pub cb_before: Decimal,
    pub cb_after: Decimal,
}

impl PoolAllocation {
    /// Net amount received (positive) or donated (negative).
    pub fn transfer(&self) -> Decimal {
        self.cb_after - self.cb_before
    }
}

/// A completed, immutable redistribution event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pool {
    id: Uuid,
    /// Compliance period the members' balances belong to.
    year: Year,
    created_at: DateTime<Utc>,
    /// Members in the order they were submitted.
    members: Vec<PoolAllocation>,
}

impl Pool {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn year(&self) -> Year {
        self.year
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn members(&self) -> &[PoolAllocation] {
        &self.members
    }

    pub fn member(&self, ship: &ShipId) -> Option<&PoolAllocation> {
        self.members.iter().find(|m| &m.ship_id == ship)
    }

    pub fn total_before(&self) -> Decimal {
        self.members.iter().map(|m| m.cb_before).sum()
    }

    pub fn total_after(&self) -> Decimal {
        self.members.iter().map(|m| m.cb_after).sum()
    }

    /// Total deficit members brought into the pool.
    pub fn deficit_before(&self) -> Decimal {
        self.members
            .iter()
            .filter(|m| m.cb_before < Decimal::ZERO)
            .map(|m| -m.cb_before)
            .sum()
    }

    /// Total moved from surplus members to deficit members.
    pub fn transferred(&self) -> Decimal {
        self.members
            .iter()
            .map(|m| m.transfer())
            .filter(|t| *t > Decimal::ZERO)
            .sum()
    }

    /// Share of the entering deficit that was covered, as a percentage.
    pub fn coverage_percent(&self) -> f64 {
        let deficit = self.deficit_before();
        if deficit == Decimal::ZERO {
            return 100.0;
        }
        let pct = self.transferred() / deficit * Decimal::from(100);
        pct.to_string().parse::<f64>().unwrap_or(0.0)
    }
}

impl std::fmt::Display for Pool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Pool {} ({}) ===", self.id, self.year)?;
        writeln!(f, "Total before: {}", self.total_before())?;
        writeln!(f, "Total after:  {}", self.total_after())?;
        writeln!(f, "Transferred:  {}", self.transferred())?;
        writeln!(f, "Coverage:     {:.1}%", self.coverage_percent())?;
        writeln!(f, "\nMembers:")?;
        for m in &self.members {
            writeln!(
                f,
                "  {:<10} {:>20} -> {:>20}  ({:+})",
                m.ship_id,
                m.cb_before,
                m.cb_after,
                m.transfer()
            )?;
        }
        Ok(())
    }
}

/// Redistributes surplus to deficit members of a pool.
pub struct PoolAllocator;

impl PoolAllocator {
    /// Check the pool-level preconditions without allocating.
    pub fn validate(members: &[PoolMember]) -> Result<(), PoolViolation> {
        if members.len() < 2 {
            return Err(PoolViolation::TooFewMembers {
                count: members.len(),
            });
        }
        let mut seen = HashSet::with_capacity(members.len());
        for m in members {
            if !seen.insert(&m.ship_id) {
                return Err(PoolViolation::DuplicateShip {
                    ship: m.ship_id.clone(),
                });
            }
        }
        // With both sides in range, every partial sum of the members is too.
        let (mut surplus, mut deficit) = (Decimal::ZERO, Decimal::ZERO);
        for m in members {
            let side = if m.adjusted_cb > Decimal::ZERO {
                &mut surplus
            } else {
                &mut deficit
            };
            *side = side
                .checked_add(m.adjusted_cb)
                .ok_or(PoolViolation::AggregateOverflow)?;
        }
        let sum = surplus + deficit;
        if sum < Decimal::ZERO {
            return Err(PoolViolation::NegativeAggregate { sum });
        }
        Ok(())
    }

    /// Compute each member's balance after pooling.
    ///
    /// # Algorithm
    ///
    /// 1. Split members into deficits (`< 0`) and surpluses (`> 0`); zero
    ///    balances pass through untouched.
    /// 2. Sort deficits ascending (most negative first) and surpluses
    ///    descending (largest first). Sorts are stable, so equal balances
    ///    keep submission order.
    /// 3. Sweep both lists with one cursor each: move
    ///    `min(surplus, |deficit|)` from the current surplus to the current
    ///    deficit and advance whichever cursor reached zero.
    ///
    /// Members that entered with a surplus never exit negative and members
    /// that entered with a deficit never exit worse; both are re-checked
    /// on the result.
    pub fn allocate(members: &[PoolMember]) -> Result<Vec<PoolAllocation>, PoolViolation> {
        Self::validate(members)?;

        let mut remaining: Vec<Decimal> = members.iter().map(|m| m.adjusted_cb).collect();

        let mut deficits: Vec<usize> = (0..members.len())
            .filter(|&i| remaining[i] < Decimal::ZERO)
            .collect();
        let mut surpluses: Vec<usize> = (0..members.len())
            .filter(|&i| remaining[i] > Decimal::ZERO)
            .collect();
        deficits.sort_by(|&a, &b| remaining[a].cmp(&remaining[b]));
        surpluses.sort_by(|&a, &b| remaining[b].cmp(&remaining[a]));

        let (mut s, mut d) = (0, 0);
        while s < surpluses.len() && d < deficits.len() {
            let (donor, receiver) = (surpluses[s], deficits[d]);
            let transfer = remaining[donor].min(-remaining[receiver]);
            remaining[donor] -= transfer;
            remaining[receiver] += transfer;
            log::debug!(
                "pool transfer {} from {} to {}",
                transfer,
                members[donor].ship_id,
                members[receiver].ship_id
            );
            if remaining[donor] == Decimal::ZERO {
                s += 1;
            }
            if remaining[receiver] == Decimal::ZERO {
                d += 1;
            }
        }

        let allocations: Vec<PoolAllocation> = members
            .iter()
            .zip(remaining)
            .map(|(m, cb_after)| PoolAllocation {
                ship_id: m.ship_id.clone(),
                cb_before: m.adjusted_cb,
                cb_after,
            })
            .collect();

        Self::check_member_rules(&allocations)?;
        Ok(allocations)
    }

    fn check_member_rules(allocations: &[PoolAllocation]) -> Result<(), PoolViolation> {
        for a in allocations {
            if a.cb_before > Decimal::ZERO && a.cb_after < Decimal::ZERO {
                return Err(PoolViolation::SurplusExitedNegative {
                    ship: a.ship_id.clone(),
                });
            }
            if a.cb_before < Decimal::ZERO && a.cb_after < a.cb_before {
                return Err(PoolViolation::DeficitExitedWorse {
                    ship: a.ship_id.clone(),
                });
            }
        }
        Ok(())
    }

    /// Allocate and wrap the result as a new pool with a fresh id.
    ///
    /// # Errors
    ///
    /// [`EngineError::InvalidPool`] if there are fewer than two members, a
    /// ship appears twice, the aggregate balance is negative, or the
    /// members' surpluses or deficits sum past the `Decimal` range.
    pub fn create_pool(year: Year, members: &[PoolMember]) -> Result<Pool, EngineError> {
        let allocations = Self::allocate(members).map_err(|violation| {
            log::warn!(
                "rejected {} pool of {} members: {}",
                year,
                members.len(),
                violation
            );
            violation
        })?;
        Ok(Pool {
            id: Uuid::new_v4(),
            year,
            created_at: Utc::now(),
            members: allocations,
        })
    }
}

/// Store of created pools. Pools are only ever added, never changed.
#[derive(Debug, Default)]
pub struct PoolRegistry {
    pools: RwLock<Vec<Pool>>,
}

impl PoolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate and record a pool as one step: on error nothing is stored.
    pub fn create(&self, year: Year, members: &[PoolMember]) -> Result<Pool, EngineError> {
        let pool = PoolAllocator::create_pool(year, members)?;
        self.pools.write().push(pool.clone());
        log::info!(
            "created {} pool {} with {} members (transferred {})",
            year,
            pool.id(),
            pool.members().len(),
            pool.transferred()
        );
        Ok(pool)
    }

    pub fn pool(&self, id: Uuid) -> Option<Pool> {
        self.pools.read().iter().find(|p| p.id == id).cloned()
    }

    /// All pools in creation order.
    pub fn pools(&self) -> Vec<Pool> {
        self.pools.read().clone()
    }

    /// Pools formed for one compliance period, in creation order.
    pub fn pools_for(&self, year: Year) -> Vec<Pool> {
        self.pools
            .read()
            .iter()
            .filter(|p| p.year == year)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.pools.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pools.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn members(values: &[Decimal]) -> Vec<PoolMember> {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| {
                PoolMember::new(
                    ShipId::new(format!("S{:02}", i + 1)),
                    VesselType::ALL[i % VesselType::ALL.len()],
                    *v,
                )
            })
            .collect()
    }

    fn afters(allocations: &[PoolAllocation]) -> Vec<Decimal> {
        allocations.iter().map(|a| a.cb_after).collect()
    }

    #[test]
    fn test_negative_aggregate_rejected() {
        let input = members(&[dec!(50000), dec!(-25000), dec!(-15000), dec!(10000), dec!(-30000)]);
        assert_eq!(
            PoolAllocator::allocate(&input),
            Err(PoolViolation::NegativeAggregate { sum: dec!(-10000) })
        );
    }

    #[test]
    fn test_zero_aggregate_fully_covers_deficits() {
        let input = members(&[dec!(60000), dec!(-25000), dec!(-15000), dec!(10000), dec!(-30000)]);
        let result = PoolAllocator::allocate(&input).unwrap();
        assert_eq!(afters(&result), vec![Decimal::ZERO; 5]);
        assert_eq!(result[0].cb_before, dec!(60000));
        assert_eq!(result[4].cb_before, dec!(-30000));
    }

    #[test]
    fn test_largest_surplus_meets_most_negative_first() {
        // 100 covers -70 first, then 30 of the -50; the 40 covers the rest.
        let input = members(&[dec!(40), dec!(-50), dec!(100), dec!(-70)]);
        let result = PoolAllocator::allocate(&input).unwrap();
        assert_eq!(afters(&result), vec![dec!(20), dec!(0), dec!(0), dec!(0)]);
    }

    #[test]
    fn test_tie_keeps_submission_order() {
        let input = members(&[dec!(10), dec!(10), dec!(-10)]);
        let result = PoolAllocator::allocate(&input).unwrap();
        assert_eq!(afters(&result), vec![dec!(0), dec!(10), dec!(0)]);
    }

    #[test]
    fn test_zero_members_pass_through() {
        let input = members(&[dec!(0), dec!(5), dec!(-5)]);
        let result = PoolAllocator::allocate(&input).unwrap();
        assert_eq!(afters(&result), vec![dec!(0), dec!(0), dec!(0)]);
    }

    #[test]
    fn test_all_surplus_unchanged() {
        let input = members(&[dec!(5), dec!(7)]);
        let result = PoolAllocator::allocate(&input).unwrap();
        assert_eq!(afters(&result), vec![dec!(5), dec!(7)]);
    }

    #[test]
    fn test_too_few_members() {
        assert_eq!(
            PoolAllocator::allocate(&members(&[dec!(100)])),
            Err(PoolViolation::TooFewMembers { count: 1 })
        );
        assert_eq!(
            PoolAllocator::allocate(&[]),
            Err(PoolViolation::TooFewMembers { count: 0 })
        );
    }

    #[test]
    fn test_duplicate_ship_rejected() {
        let mut input = members(&[dec!(100), dec!(-50)]);
        input[1].ship_id = input[0].ship_id.clone();
        assert_eq!(
            PoolAllocator::allocate(&input),
            Err(PoolViolation::DuplicateShip {
                ship: ShipId::new("S01")
            })
        );
    }

    #[test]
    fn test_member_rules_flag_bad_allocations() {
        let bad = vec![
            PoolAllocation {
                ship_id: ShipId::new("S01"),
                cb_before: dec!(10),
                cb_after: dec!(-1),
            },
            PoolAllocation {
                ship_id: ShipId::new("S02"),
                cb_before: dec!(-10),
                cb_after: dec!(11),
            },
        ];
        assert!(matches!(
            PoolAllocator::check_member_rules(&bad),
            Err(PoolViolation::SurplusExitedNegative { .. })
        ));

        let worse = vec![PoolAllocation {
            ship_id: ShipId::new("S02"),
            cb_before: dec!(-10),
            cb_after: dec!(-11),
        }];
        assert!(matches!(
            PoolAllocator::check_member_rules(&worse),
            Err(PoolViolation::DeficitExitedWorse { .. })
        ));
    }

    #[test]
    fn test_pool_summary() {
        let input = members(&[dec!(100), dec!(-30), dec!(-20)]);
        let pool = PoolAllocator::create_pool(2024, &input).unwrap();
        assert_eq!(pool.year(), 2024);
        assert_eq!(pool.total_before(), dec!(50));
        assert_eq!(pool.total_after(), dec!(50));
        assert_eq!(pool.deficit_before(), dec!(50));
        assert_eq!(pool.transferred(), dec!(50));
        assert!((pool.coverage_percent() - 100.0).abs() < 0.01);
        assert_eq!(pool.member(&ShipId::new("S02")).unwrap().transfer(), dec!(30));
    }

    #[test]
    fn test_registry_records_only_valid_pools() {
        let registry = PoolRegistry::new();
        assert!(registry.create(2024, &members(&[dec!(-10), dec!(5)])).is_err());
        assert!(registry.is_empty());

        let pool = registry.create(2024, &members(&[dec!(10), dec!(-5)])).unwrap();
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.pool(pool.id()), Some(pool.clone()));

        let second = registry.create(2024, &members(&[dec!(10), dec!(-5)])).unwrap();
        assert_ne!(pool.id(), second.id());
        assert_eq!(registry.pools(), vec![pool, second]);
    }

    #[test]
    fn test_registry_groups_pools_by_year() {
        let registry = PoolRegistry::new();
        let early = registry.create(2024, &members(&[dec!(10), dec!(-5)])).unwrap();
        let late = registry.create(2025, &members(&[dec!(8), dec!(-8)])).unwrap();
        let again = registry.create(2024, &members(&[dec!(3), dec!(-1)])).unwrap();

        assert_eq!(registry.pools_for(2024), vec![early, again]);
        assert_eq!(registry.pools_for(2025), vec![late.clone()]);
        assert!(registry.pools_for(2026).is_empty());

        let json = serde_json::to_value(&late).unwrap();
        assert_eq!(json["year"], 2025);
    }

    #[test]
    fn test_aggregate_past_decimal_range_rejected() {
        assert_eq!(
            PoolAllocator::allocate(&members(&[Decimal::MAX, Decimal::MAX])),
            Err(PoolViolation::AggregateOverflow)
        );
        assert_eq!(
            PoolAllocator::allocate(&members(&[Decimal::MIN, dec!(-1), Decimal::MAX])),
            Err(PoolViolation::AggregateOverflow)
        );

        let registry = PoolRegistry::new();
        assert_eq!(
            registry.create(2024, &members(&[Decimal::MAX, Decimal::MAX])),
            Err(EngineError::InvalidPool(PoolViolation::AggregateOverflow))
        );
        assert!(registry.is_empty());
    }

    #[test]
    fn test_extreme_balances_that_fit_are_pooled() {
        let input = members(&[Decimal::MAX, dec!(-5), Decimal::MIN + dec!(6)]);
        let pool = PoolAllocator::create_pool(2024, &input).unwrap();
        assert_eq!(afters(pool.members()), vec![dec!(1), dec!(0), dec!(0)]);
        assert_eq!(pool.total_before(), dec!(1));
        assert_eq!(pool.total_after(), dec!(1));
        assert!((pool.coverage_percent() - 100.0).abs() < 0.01);
    }
}
