//! Stop sequencing.
//!
//! Sequences are 1-based and contiguous after every operation. Validation
//! functions return errors; the `apply_*` helpers assume validated input and
//! are used when replaying events.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use cargohub_core::{Address, DomainError, DomainResult};
use cargohub_shipments::ShipmentId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StopStatus {
    Pending,
    Delivered,
    Failed,
}

/// Stop as requested by the planner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StopInput {
    pub shipment_id: ShipmentId,
    pub address: Address,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteStop {
    pub sequence: u32,
    pub shipment_id: ShipmentId,
    pub address: Address,
    pub status: StopStatus,
    pub note: Option<String>,
    pub visited_at: Option<DateTime<Utc>>,
}

fn pending_stop(sequence: u32, input: &StopInput) -> DomainResult<RouteStop> {
    Ok(RouteStop {
        sequence,
        shipment_id: input.shipment_id,
        address: input.address.normalized()?,
        status: StopStatus::Pending,
        note: None,
        visited_at: None,
    })
}

fn sequence_of(index: usize) -> u32 {
    u32::try_from(index + 1).unwrap_or(u32::MAX)
}

/// Build the initial stop list, numbered 1..n in the given order.
pub fn plan(inputs: &[StopInput]) -> DomainResult<Vec<RouteStop>> {
    let mut seen = HashSet::new();
    inputs
        .iter()
        .enumerate()
        .map(|(i, input)| {
            if !seen.insert(input.shipment_id) {
                return Err(DomainError::validation(format!(
                    "shipment {} appears on the route twice",
                    input.shipment_id
                )));
            }
            pending_stop(sequence_of(i), input)
        })
        .collect()
}

/// Validate a new stop and give it the next sequence number.
pub fn next_stop(stops: &[RouteStop], input: &StopInput) -> DomainResult<RouteStop> {
    if position(stops, input.shipment_id).is_some() {
        return Err(DomainError::conflict(format!(
            "shipment {} is already on the route",
            input.shipment_id
        )));
    }
    pending_stop(sequence_of(stops.len()), input)
}

pub fn position(stops: &[RouteStop], shipment_id: ShipmentId) -> Option<usize> {
    stops.iter().position(|s| s.shipment_id == shipment_id)
}

pub fn ensure_on_route(stops: &[RouteStop], shipment_id: ShipmentId) -> DomainResult<usize> {
    position(stops, shipment_id).ok_or_else(|| {
        DomainError::validation(format!("shipment {shipment_id} is not on the route"))
    })
}

/// The order must name every current stop exactly once.
pub fn validate_order(stops: &[RouteStop], order: &[ShipmentId]) -> DomainResult<()> {
    let current: HashSet<_> = stops.iter().map(|s| s.shipment_id).collect();
    let requested: HashSet<_> = order.iter().copied().collect();
    if order.len() != stops.len() || requested.len() != order.len() || requested != current {
        return Err(DomainError::validation(
            "new order must be a permutation of the current stops",
        ));
    }
    Ok(())
}

pub fn renumber(stops: &mut [RouteStop]) {
    for (i, stop) in stops.iter_mut().enumerate() {
        stop.sequence = sequence_of(i);
    }
}

pub fn apply_removal(stops: &mut Vec<RouteStop>, shipment_id: ShipmentId) {
    stops.retain(|s| s.shipment_id != shipment_id);
    renumber(stops);
}

pub fn apply_order(stops: &mut [RouteStop], order: &[ShipmentId]) {
    stops.sort_by_key(|s| {
        order
            .iter()
            .position(|id| *id == s.shipment_id)
            .unwrap_or(usize::MAX)
    });
    renumber(stops);
}

/// The stop the driver must visit next.
pub fn next_pending(stops: &[RouteStop]) -> Option<&RouteStop> {
    stops
        .iter()
        .filter(|s| s.status == StopStatus::Pending)
        .min_by_key(|s| s.sequence)
}

pub fn is_contiguous(stops: &[RouteStop]) -> bool {
    stops
        .iter()
        .enumerate()
        .all(|(i, s)| s.sequence == sequence_of(i))
}

#[cfg(test)]
mod tests {
    use super::*;
    use cargohub_core::AggregateId;
    use proptest::prelude::*;

    fn input() -> StopInput {
        StopInput {
            shipment_id: ShipmentId::new(AggregateId::new()),
            address: Address {
                line1: "Dam 1".to_string(),
                line2: None,
                city: "Amsterdam".to_string(),
                postal_code: None,
                country: "NL".to_string(),
            },
        }
    }

    #[test]
    fn plan_rejects_duplicate_shipments() {
        let a = input();
        assert!(plan(&[a.clone(), input(), a]).is_err());
    }

    #[test]
    fn removal_keeps_relative_order() {
        let inputs: Vec<_> = (0..4).map(|_| input()).collect();
        let mut stops = plan(&inputs).unwrap();
        apply_removal(&mut stops, inputs[1].shipment_id);

        let ids: Vec<_> = stops.iter().map(|s| s.shipment_id).collect();
        assert_eq!(
            ids,
            vec![inputs[0].shipment_id, inputs[2].shipment_id, inputs[3].shipment_id]
        );
        assert!(is_contiguous(&stops));
    }

    #[test]
    fn reorder_requires_permutation() {
        let inputs: Vec<_> = (0..3).map(|_| input()).collect();
        let stops = plan(&inputs).unwrap();
        let a = inputs[0].shipment_id;
        let b = inputs[1].shipment_id;
        let c = inputs[2].shipment_id;

        assert!(validate_order(&stops, &[c, b, a]).is_ok());
        assert!(validate_order(&stops, &[c, b]).is_err());
        assert!(validate_order(&stops, &[c, c, a]).is_err());
        assert!(validate_order(&stops, &[c, b, input().shipment_id]).is_err());
    }

    #[test]
    fn next_stop_appends_and_rejects_duplicates() {
        let stops = plan(&[input(), input()]).unwrap();
        let extra = input();
        assert_eq!(next_stop(&stops, &extra).unwrap().sequence, 3);
        let dup = StopInput {
            shipment_id: stops[0].shipment_id,
            address: extra.address,
        };
        assert!(matches!(next_stop(&stops, &dup), Err(DomainError::Conflict(_))));
    }

    proptest! {
        #[test]
        fn reorder_and_remove_stay_contiguous(
            n in 1usize..12,
            seed in prop::collection::vec(any::<u32>(), 12),
            remove_at in 0usize..12,
        ) {
            let inputs: Vec<_> = (0..n).map(|_| input()).collect();
            let mut stops = plan(&inputs).unwrap();
            prop_assert!(is_contiguous(&stops));

            let mut order: Vec<_> = inputs.iter().map(|i| i.shipment_id).collect();
            let mut keyed: Vec<_> = order.drain(..).zip(seed.iter().copied()).collect();
            keyed.sort_by_key(|(_, k)| *k);
            let order: Vec<_> = keyed.into_iter().map(|(id, _)| id).collect();

            prop_assert!(validate_order(&stops, &order).is_ok());
            apply_order(&mut stops, &order);
            prop_assert!(is_contiguous(&stops));
            let after: Vec<_> = stops.iter().map(|s| s.shipment_id).collect();
            prop_assert_eq!(&after, &order);

            let victim = order[remove_at % n];
            apply_removal(&mut stops, victim);
            prop_assert_eq!(stops.len(), n - 1);
            prop_assert!(is_contiguous(&stops));
            prop_assert!(position(&stops, victim).is_none());
        }
    }
}
