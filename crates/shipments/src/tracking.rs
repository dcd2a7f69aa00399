//! Shipment status progression and tracking-history generation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use cargohub_core::DomainError;

/// Shipment status.
///
/// The first six variants form the forward progression in declaration order.
/// `Cancelled` and `Returned` are terminal side states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShipmentStatus {
    Pending,
    PickedUp,
    InTransit,
    AtWarehouse,
    OutForDelivery,
    Delivered,
    Cancelled,
    Returned,
}

impl ShipmentStatus {
    pub const PROGRESSION: [ShipmentStatus; 6] = [
        ShipmentStatus::Pending,
        ShipmentStatus::PickedUp,
        ShipmentStatus::InTransit,
        ShipmentStatus::AtWarehouse,
        ShipmentStatus::OutForDelivery,
        ShipmentStatus::Delivered,
    ];

    /// Position in the forward progression, `None` for side states.
    pub fn rank(self) -> Option<usize> {
        Self::PROGRESSION.iter().position(|s| *s == self)
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ShipmentStatus::Delivered | ShipmentStatus::Cancelled | ShipmentStatus::Returned
        )
    }

    pub fn can_cancel(self) -> bool {
        matches!(self, ShipmentStatus::Pending | ShipmentStatus::PickedUp)
    }

    pub fn can_return(self) -> bool {
        matches!(
            self,
            ShipmentStatus::InTransit | ShipmentStatus::AtWarehouse | ShipmentStatus::OutForDelivery
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ShipmentStatus::Pending => "pending",
            ShipmentStatus::PickedUp => "picked_up",
            ShipmentStatus::InTransit => "in_transit",
            ShipmentStatus::AtWarehouse => "at_warehouse",
            ShipmentStatus::OutForDelivery => "out_for_delivery",
            ShipmentStatus::Delivered => "delivered",
            ShipmentStatus::Cancelled => "cancelled",
            ShipmentStatus::Returned => "returned",
        }
    }

    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        let status = match raw.trim() {
            "pending" => ShipmentStatus::Pending,
            "picked_up" => ShipmentStatus::PickedUp,
            "in_transit" => ShipmentStatus::InTransit,
            "at_warehouse" => ShipmentStatus::AtWarehouse,
            "out_for_delivery" => ShipmentStatus::OutForDelivery,
            "delivered" => ShipmentStatus::Delivered,
            "cancelled" => ShipmentStatus::Cancelled,
            "returned" => ShipmentStatus::Returned,
            other => {
                return Err(DomainError::validation(format!(
                    "unknown shipment status: {other}"
                )));
            }
        };
        Ok(status)
    }
}

impl core::fmt::Display for ShipmentStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One line of a shipment's tracking history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackingEntry {
    pub status: ShipmentStatus,
    pub location: String,
    pub note: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

/// Ordered statuses strictly after `from` up to and including `to`.
///
/// Both ends must be on the forward progression and `to` must come later.
pub fn progression_between(
    from: ShipmentStatus,
    to: ShipmentStatus,
) -> Result<Vec<ShipmentStatus>, DomainError> {
    let (Some(start), Some(end)) = (from.rank(), to.rank()) else {
        return Err(DomainError::invariant(format!(
            "no forward progression from {from} to {to}"
        )));
    };
    if end <= start {
        return Err(DomainError::invariant(format!(
            "status cannot move from {from} to {to}"
        )));
    }
    Ok(ShipmentStatus::PROGRESSION[start + 1..=end].to_vec())
}

/// Full history from `pending` up to `status`, every entry at `location`/`at`.
pub fn history_until(
    status: ShipmentStatus,
    location: &str,
    at: DateTime<Utc>,
) -> Result<Vec<TrackingEntry>, DomainError> {
    let Some(end) = status.rank() else {
        return Err(DomainError::validation(format!(
            "{status} is not on the forward progression"
        )));
    };
    Ok(ShipmentStatus::PROGRESSION[..=end]
        .iter()
        .map(|s| TrackingEntry {
            status: *s,
            location: location.to_string(),
            note: None,
            recorded_at: at,
        })
        .collect())
}

/// Entries for a forward transition; the note lands on the final entry only.
pub(crate) fn entries_for_transition(
    from: ShipmentStatus,
    to: ShipmentStatus,
    location: &str,
    note: Option<String>,
    at: DateTime<Utc>,
) -> Result<Vec<TrackingEntry>, DomainError> {
    let steps = progression_between(from, to)?;
    let last = steps.len() - 1;
    Ok(steps
        .into_iter()
        .enumerate()
        .map(|(i, status)| TrackingEntry {
            status,
            location: location.to_string(),
            note: if i == last { note.clone() } else { None },
            recorded_at: at,
        })
        .collect())
}
