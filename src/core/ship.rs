use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a ship subject to the compliance scheme.
///
/// # Examples
///
/// ```
/// use fueleu_ledger::core::ship::ShipId;
///
/// let a = ShipId::new("S01");
/// let b = ShipId::new("S02");
/// assert_ne!(a, b);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShipId(String);

impl ShipId {
    /// Create a new ship identifier.
    ///
    /// Convention: IMO number or a short fleet code ("S01", "IMO9321483").
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the string representation of this ship ID.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ShipId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ShipId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Vessel category. Carried through the engine as metadata only;
/// it never influences a balance or an allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VesselType {
    Container,
    BulkCarrier,
    Tanker,
    RoRo,
}

impl VesselType {
    pub const ALL: [VesselType; 4] = [
        VesselType::Container,
        VesselType::BulkCarrier,
        VesselType::Tanker,
        VesselType::RoRo,
    ];
}

impl fmt::Display for VesselType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            VesselType::Container => "Container",
            VesselType::BulkCarrier => "BulkCarrier",
            VesselType::Tanker => "Tanker",
            VesselType::RoRo => "RoRo",
        };
        f.write_str(name)
    }
}

/// Compliance year.
pub type Year = u16;

/// The unit of account for balances and banking: one ship in one year.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PeriodKey {
    pub ship_id: ShipId,
    pub year: Year,
}

impl PeriodKey {
    pub fn new(ship_id: ShipId, year: Year) -> Self {
        Self { ship_id, year }
    }
}

impl fmt::Display for PeriodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.ship_id, self.year)
    }
}
