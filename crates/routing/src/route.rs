use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use cargohub_core::{Aggregate, AggregateId, AggregateRoot, DomainError, TenantId};
use cargohub_events::Event;
use cargohub_shipments::ShipmentId;

use crate::driver::DriverId;
use crate::stops::{self, RouteStop, StopInput, StopStatus};

/// Delivery route identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RouteId(pub AggregateId);

impl RouteId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }

    pub fn route_code(&self) -> String {
        self.0.reference_code("RT-", 8)
    }
}

impl core::fmt::Display for RouteId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteStatus {
    Planned,
    InProgress,
    Completed,
}

/// Aggregate root: DeliveryRoute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryRoute {
    id: RouteId,
    tenant_id: Option<TenantId>,
    route_code: String,
    scheduled_date: Option<NaiveDate>,
    driver_id: Option<DriverId>,
    stops: Vec<RouteStop>,
    status: RouteStatus,
    version: u64,
    created: bool,
}

impl DeliveryRoute {
    pub fn empty(id: RouteId) -> Self {
        Self {
            id,
            tenant_id: None,
            route_code: String::new(),
            scheduled_date: None,
            driver_id: None,
            stops: Vec::new(),
            status: RouteStatus::Planned,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> RouteId {
        self.id
    }

    pub fn tenant_id(&self) -> Option<TenantId> {
        self.tenant_id
    }

    pub fn route_code(&self) -> &str {
        &self.route_code
    }

    pub fn scheduled_date(&self) -> Option<NaiveDate> {
        self.scheduled_date
    }

    pub fn driver_id(&self) -> Option<DriverId> {
        self.driver_id
    }

    pub fn stops(&self) -> &[RouteStop] {
        &self.stops
    }

    pub fn status(&self) -> RouteStatus {
        self.status
    }

    pub fn next_stop(&self) -> Option<&RouteStop> {
        stops::next_pending(&self.stops)
    }
}

impl AggregateRoot for DeliveryRoute {
    type Id = RouteId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: PlanRoute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanRoute {
    pub tenant_id: TenantId,
    pub route_id: RouteId,
    pub scheduled_date: NaiveDate,
    pub driver_id: Option<DriverId>,
    pub stops: Vec<StopInput>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddStop {
    pub tenant_id: TenantId,
    pub route_id: RouteId,
    pub stop: StopInput,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveStop {
    pub tenant_id: TenantId,
    pub route_id: RouteId,
    pub shipment_id: ShipmentId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReorderStops {
    pub tenant_id: TenantId,
    pub route_id: RouteId,
    pub order: Vec<ShipmentId>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignDriver {
    pub tenant_id: TenantId,
    pub route_id: RouteId,
    pub driver_id: DriverId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartRoute {
    pub tenant_id: TenantId,
    pub route_id: RouteId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompleteStop {
    pub tenant_id: TenantId,
    pub route_id: RouteId,
    pub shipment_id: ShipmentId,
    pub note: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailStop {
    pub tenant_id: TenantId,
    pub route_id: RouteId,
    pub shipment_id: ShipmentId,
    pub note: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RouteCommand {
    PlanRoute(PlanRoute),
    AddStop(AddStop),
    RemoveStop(RemoveStop),
    ReorderStops(ReorderStops),
    AssignDriver(AssignDriver),
    StartRoute(StartRoute),
    CompleteStop(CompleteStop),
    FailStop(FailStop),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutePlanned {
    pub tenant_id: TenantId,
    pub route_id: RouteId,
    pub route_code: String,
    pub scheduled_date: NaiveDate,
    pub driver_id: Option<DriverId>,
    pub stops: Vec<RouteStop>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StopAdded {
    pub tenant_id: TenantId,
    pub route_id: RouteId,
    pub stop: RouteStop,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StopRemoved {
    pub tenant_id: TenantId,
    pub route_id: RouteId,
    pub shipment_id: ShipmentId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StopsReordered {
    pub tenant_id: TenantId,
    pub route_id: RouteId,
    pub order: Vec<ShipmentId>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverAssigned {
    pub tenant_id: TenantId,
    pub route_id: RouteId,
    pub driver_id: DriverId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteStarted {
    pub tenant_id: TenantId,
    pub route_id: RouteId,
    pub driver_id: DriverId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StopCompleted {
    pub tenant_id: TenantId,
    pub route_id: RouteId,
    pub shipment_id: ShipmentId,
    pub sequence: u32,
    pub note: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StopFailed {
    pub tenant_id: TenantId,
    pub route_id: RouteId,
    pub shipment_id: ShipmentId,
    pub sequence: u32,
    pub note: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteCompleted {
    pub tenant_id: TenantId,
    pub route_id: RouteId,
    pub delivered: u32,
    pub failed: u32,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RouteEvent {
    RoutePlanned(RoutePlanned),
    StopAdded(StopAdded),
    StopRemoved(StopRemoved),
    StopsReordered(StopsReordered),
    DriverAssigned(DriverAssigned),
    RouteStarted(RouteStarted),
    StopCompleted(StopCompleted),
    StopFailed(StopFailed),
    RouteCompleted(RouteCompleted),
}

impl Event for RouteEvent {
    fn event_type(&self) -> &'static str {
        match self {
            RouteEvent::RoutePlanned(_) => "routing.route.planned",
            RouteEvent::StopAdded(_) => "routing.route.stop_added",
            RouteEvent::StopRemoved(_) => "routing.route.stop_removed",
            RouteEvent::StopsReordered(_) => "routing.route.stops_reordered",
            RouteEvent::DriverAssigned(_) => "routing.route.driver_assigned",
            RouteEvent::RouteStarted(_) => "routing.route.started",
            RouteEvent::StopCompleted(_) => "routing.route.stop_completed",
            RouteEvent::StopFailed(_) => "routing.route.stop_failed",
            RouteEvent::RouteCompleted(_) => "routing.route.completed",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            RouteEvent::RoutePlanned(e) => e.occurred_at,
            RouteEvent::StopAdded(e) => e.occurred_at,
            RouteEvent::StopRemoved(e) => e.occurred_at,
            RouteEvent::StopsReordered(e) => e.occurred_at,
            RouteEvent::DriverAssigned(e) => e.occurred_at,
            RouteEvent::RouteStarted(e) => e.occurred_at,
            RouteEvent::StopCompleted(e) => e.occurred_at,
            RouteEvent::StopFailed(e) => e.occurred_at,
            RouteEvent::RouteCompleted(e) => e.occurred_at,
        }
    }
}

impl Aggregate for DeliveryRoute {
    type Command = RouteCommand;
    type Event = RouteEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            RouteEvent::RoutePlanned(e) => {
                self.id = e.route_id;
                self.tenant_id = Some(e.tenant_id);
                self.route_code = e.route_code.clone();
                self.scheduled_date = Some(e.scheduled_date);
                self.driver_id = e.driver_id;
                self.stops = e.stops.clone();
                self.status = RouteStatus::Planned;
                self.created = true;
            }
            RouteEvent::StopAdded(e) => self.stops.push(e.stop.clone()),
            RouteEvent::StopRemoved(e) => stops::apply_removal(&mut self.stops, e.shipment_id),
            RouteEvent::StopsReordered(e) => stops::apply_order(&mut self.stops, &e.order),
            RouteEvent::DriverAssigned(e) => self.driver_id = Some(e.driver_id),
            RouteEvent::RouteStarted(_) => self.status = RouteStatus::InProgress,
            RouteEvent::StopCompleted(e) => {
                if let Some(stop) = self.stops.iter_mut().find(|s| s.shipment_id == e.shipment_id)
                {
                    stop.status = StopStatus::Delivered;
                    stop.note = e.note.clone();
                    stop.visited_at = Some(e.occurred_at);
                }
            }
            RouteEvent::StopFailed(e) => {
                if let Some(stop) = self.stops.iter_mut().find(|s| s.shipment_id == e.shipment_id)
                {
                    stop.status = StopStatus::Failed;
                    stop.note = Some(e.note.clone());
                    stop.visited_at = Some(e.occurred_at);
                }
            }
            RouteEvent::RouteCompleted(_) => self.status = RouteStatus::Completed,
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            RouteCommand::PlanRoute(cmd) => self.handle_plan(cmd),
            RouteCommand::AddStop(cmd) => self.handle_add_stop(cmd),
            RouteCommand::RemoveStop(cmd) => self.handle_remove_stop(cmd),
            RouteCommand::ReorderStops(cmd) => self.handle_reorder(cmd),
            RouteCommand::AssignDriver(cmd) => self.handle_assign_driver(cmd),
            RouteCommand::StartRoute(cmd) => self.handle_start(cmd),
            RouteCommand::CompleteStop(cmd) => self.handle_visit(
                cmd.tenant_id,
                cmd.route_id,
                cmd.shipment_id,
                Visit::Delivered(cmd.note.clone()),
                cmd.occurred_at,
            ),
            RouteCommand::FailStop(cmd) => self.handle_visit(
                cmd.tenant_id,
                cmd.route_id,
                cmd.shipment_id,
                Visit::Failed(cmd.note.clone()),
                cmd.occurred_at,
            ),
        }
    }
}

enum Visit {
    Delivered(Option<String>),
    Failed(String),
}

impl DeliveryRoute {
    fn ensure_existing(&self, tenant_id: TenantId, route_id: RouteId) -> Result<(), DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        if self.tenant_id != Some(tenant_id) {
            return Err(DomainError::invariant("tenant mismatch"));
        }
        if self.id != route_id {
            return Err(DomainError::invariant("route_id mismatch"));
        }
        Ok(())
    }

    fn ensure_planned(&self, tenant_id: TenantId, route_id: RouteId) -> Result<(), DomainError> {
        self.ensure_existing(tenant_id, route_id)?;
        if self.status != RouteStatus::Planned {
            return Err(DomainError::invariant(
                "route can only be changed while planned",
            ));
        }
        Ok(())
    }

    fn handle_plan(&self, cmd: &PlanRoute) -> Result<Vec<RouteEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("route already exists"));
        }
        Ok(vec![RouteEvent::RoutePlanned(RoutePlanned {
            tenant_id: cmd.tenant_id,
            route_id: cmd.route_id,
            route_code: cmd.route_id.route_code(),
            scheduled_date: cmd.scheduled_date,
            driver_id: cmd.driver_id,
            stops: stops::plan(&cmd.stops)?,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_add_stop(&self, cmd: &AddStop) -> Result<Vec<RouteEvent>, DomainError> {
        self.ensure_planned(cmd.tenant_id, cmd.route_id)?;
        Ok(vec![RouteEvent::StopAdded(StopAdded {
            tenant_id: cmd.tenant_id,
            route_id: cmd.route_id,
            stop: stops::next_stop(&self.stops, &cmd.stop)?,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_remove_stop(&self, cmd: &RemoveStop) -> Result<Vec<RouteEvent>, DomainError> {
        self.ensure_planned(cmd.tenant_id, cmd.route_id)?;
        stops::ensure_on_route(&self.stops, cmd.shipment_id)?;
        Ok(vec![RouteEvent::StopRemoved(StopRemoved {
            tenant_id: cmd.tenant_id,
            route_id: cmd.route_id,
            shipment_id: cmd.shipment_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_reorder(&self, cmd: &ReorderStops) -> Result<Vec<RouteEvent>, DomainError> {
        self.ensure_planned(cmd.tenant_id, cmd.route_id)?;
        stops::validate_order(&self.stops, &cmd.order)?;
        Ok(vec![RouteEvent::StopsReordered(StopsReordered {
            tenant_id: cmd.tenant_id,
            route_id: cmd.route_id,
            order: cmd.order.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_assign_driver(&self, cmd: &AssignDriver) -> Result<Vec<RouteEvent>, DomainError> {
        self.ensure_planned(cmd.tenant_id, cmd.route_id)?;
        if self.driver_id == Some(cmd.driver_id) {
            return Err(DomainError::conflict("driver is already assigned"));
        }
        Ok(vec![RouteEvent::DriverAssigned(DriverAssigned {
            tenant_id: cmd.tenant_id,
            route_id: cmd.route_id,
            driver_id: cmd.driver_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_start(&self, cmd: &StartRoute) -> Result<Vec<RouteEvent>, DomainError> {
        self.ensure_planned(cmd.tenant_id, cmd.route_id)?;
        let Some(driver_id) = self.driver_id else {
            return Err(DomainError::invariant("route needs a driver before it starts"));
        };
        if self.stops.is_empty() {
            return Err(DomainError::invariant("route has no stops"));
        }
        Ok(vec![RouteEvent::RouteStarted(RouteStarted {
            tenant_id: cmd.tenant_id,
            route_id: cmd.route_id,
            driver_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_visit(
        &self,
        tenant_id: TenantId,
        route_id: RouteId,
        shipment_id: ShipmentId,
        visit: Visit,
        occurred_at: DateTime<Utc>,
    ) -> Result<Vec<RouteEvent>, DomainError> {
        self.ensure_existing(tenant_id, route_id)?;
        if self.status != RouteStatus::InProgress {
            return Err(DomainError::invariant("route is not in progress"));
        }
        stops::ensure_on_route(&self.stops, shipment_id)?;
        let next = stops::next_pending(&self.stops)
            .ok_or_else(|| DomainError::invariant("route has no pending stops"))?;
        if next.shipment_id != shipment_id {
            return Err(DomainError::invariant(format!(
                "stops are visited in order; next stop is #{}",
                next.sequence
            )));
        }
        let sequence = next.sequence;

        let (mut delivered, mut failed) = (0u32, 0u32);
        for stop in self.stops.iter().filter(|s| s.shipment_id != shipment_id) {
            match stop.status {
                StopStatus::Delivered => delivered += 1,
                StopStatus::Failed => failed += 1,
                StopStatus::Pending => {}
            }
        }

        let mut events = vec![match visit {
            Visit::Delivered(note) => {
                delivered += 1;
                RouteEvent::StopCompleted(StopCompleted {
                    tenant_id,
                    route_id,
                    shipment_id,
                    sequence,
                    note: note.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()),
                    occurred_at,
                })
            }
            Visit::Failed(note) => {
                let note = note.trim();
                if note.is_empty() {
                    return Err(DomainError::validation("failed stop needs a note"));
                }
                failed += 1;
                RouteEvent::StopFailed(StopFailed {
                    tenant_id,
                    route_id,
                    shipment_id,
                    sequence,
                    note: note.to_string(),
                    occurred_at,
                })
            }
        }];

        let remaining = self
            .stops
            .iter()
            .filter(|s| s.status == StopStatus::Pending && s.shipment_id != shipment_id)
            .count();
        if remaining == 0 {
            events.push(RouteEvent::RouteCompleted(RouteCompleted {
                tenant_id,
                route_id,
                delivered,
                failed,
                occurred_at,
            }));
        }

        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cargohub_core::Address;
    use cargohub_events::execute;

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    fn stop_input() -> StopInput {
        StopInput {
            shipment_id: ShipmentId::new(AggregateId::new()),
            address: Address {
                line1: "Coolsingel 40".to_string(),
                line2: None,
                city: "Rotterdam".to_string(),
                postal_code: None,
                country: "NL".to_string(),
            },
        }
    }

    struct Fixture {
        route: DeliveryRoute,
        tenant_id: TenantId,
        shipments: Vec<ShipmentId>,
    }

    impl Fixture {
        fn planned(stop_count: usize, with_driver: bool) -> Self {
            let tenant_id = TenantId::new();
            let route_id = RouteId::new(AggregateId::new());
            let inputs: Vec<_> = (0..stop_count).map(|_| stop_input()).collect();
            let shipments = inputs.iter().map(|i| i.shipment_id).collect();
            let mut route = DeliveryRoute::empty(route_id);
            execute(
                &mut route,
                &RouteCommand::PlanRoute(PlanRoute {
                    tenant_id,
                    route_id,
                    scheduled_date: NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
                    driver_id: with_driver.then(|| DriverId::new(AggregateId::new())),
                    stops: inputs,
                    occurred_at: test_time(),
                }),
            )
            .unwrap();
            Self {
                route,
                tenant_id,
                shipments,
            }
        }

        fn run(&mut self, cmd: RouteCommand) -> Result<Vec<RouteEvent>, DomainError> {
            execute(&mut self.route, &cmd)
        }

        fn start(&mut self) -> Result<Vec<RouteEvent>, DomainError> {
            self.run(RouteCommand::StartRoute(StartRoute {
                tenant_id: self.tenant_id,
                route_id: self.route.id_typed(),
                occurred_at: test_time(),
            }))
        }

        fn complete(&mut self, shipment_id: ShipmentId) -> Result<Vec<RouteEvent>, DomainError> {
            self.run(RouteCommand::CompleteStop(CompleteStop {
                tenant_id: self.tenant_id,
                route_id: self.route.id_typed(),
                shipment_id,
                note: None,
                occurred_at: test_time(),
            }))
        }
    }

    #[test]
    fn plan_numbers_stops_in_order() {
        let fx = Fixture::planned(3, false);
        let sequences: Vec<_> = fx.route.stops().iter().map(|s| s.sequence).collect();
        assert_eq!(sequences, vec![1, 2, 3]);
        assert!(fx.route.route_code().starts_with("RT-"));
        assert_eq!(fx.route.status(), RouteStatus::Planned);
    }

    #[test]
    fn remove_and_reorder_renumber_stops() {
        let mut fx = Fixture::planned(3, false);
        let route_id = fx.route.id_typed();
        let [a, b, c] = [fx.shipments[0], fx.shipments[1], fx.shipments[2]];

        fx.run(RouteCommand::ReorderStops(ReorderStops {
            tenant_id: fx.tenant_id,
            route_id,
            order: vec![c, a, b],
            occurred_at: test_time(),
        }))
        .unwrap();
        fx.run(RouteCommand::RemoveStop(RemoveStop {
            tenant_id: fx.tenant_id,
            route_id,
            shipment_id: a,
            occurred_at: test_time(),
        }))
        .unwrap();

        let stops: Vec<_> = fx
            .route
            .stops()
            .iter()
            .map(|s| (s.sequence, s.shipment_id))
            .collect();
        assert_eq!(stops, vec![(1, c), (2, b)]);
    }

    #[test]
    fn start_requires_driver_and_stops() {
        let mut fx = Fixture::planned(2, false);
        match fx.start().unwrap_err() {
            DomainError::InvariantViolation(msg) if msg.contains("driver") => {}
            other => panic!("unexpected error: {other:?}"),
        }

        let mut empty = Fixture::planned(0, true);
        match empty.start().unwrap_err() {
            DomainError::InvariantViolation(msg) if msg.contains("no stops") => {}
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn stops_must_be_visited_in_sequence() {
        let mut fx = Fixture::planned(2, true);
        fx.start().unwrap();

        let second = fx.shipments[1];
        assert!(matches!(
            fx.complete(second),
            Err(DomainError::InvariantViolation(_))
        ));
    }

    #[test]
    fn last_visit_completes_the_route() {
        let mut fx = Fixture::planned(2, true);
        fx.start().unwrap();

        let first = fx.shipments[0];
        let events = fx.complete(first).unwrap();
        assert_eq!(events.len(), 1);

        let events = fx
            .run(RouteCommand::FailStop(FailStop {
                tenant_id: fx.tenant_id,
                route_id: fx.route.id_typed(),
                shipment_id: fx.shipments[1],
                note: "nobody home".to_string(),
                occurred_at: test_time(),
            }))
            .unwrap();
        assert_eq!(events.len(), 2);
        match &events[1] {
            RouteEvent::RouteCompleted(e) => {
                assert_eq!(e.delivered, 1);
                assert_eq!(e.failed, 1);
            }
            _ => panic!("Expected RouteCompleted event"),
        }
        assert_eq!(fx.route.status(), RouteStatus::Completed);
        assert!(fx.route.next_stop().is_none());
    }

    #[test]
    fn planned_only_changes_after_start_are_rejected() {
        let mut fx = Fixture::planned(1, true);
        fx.start().unwrap();
        let err = fx
            .run(RouteCommand::AddStop(AddStop {
                tenant_id: fx.tenant_id,
                route_id: fx.route.id_typed(),
                stop: stop_input(),
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
    }
}
