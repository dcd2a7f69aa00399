use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use cargohub_core::{Address, Aggregate, AggregateId, AggregateRoot, DomainError, TenantId};
use cargohub_customers::CustomerId;
use cargohub_events::Event;
use cargohub_warehouses::WarehouseId;

use crate::tracking::{ShipmentStatus, TrackingEntry, entries_for_transition};

/// Shipment identifier (tenant-scoped via `tenant_id` fields in events/commands).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShipmentId(pub AggregateId);

impl ShipmentId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }

    /// Public tracking number, `CH` followed by 10 hex chars.
    pub fn tracking_number(&self) -> String {
        self.0.reference_code("CH", 10)
    }
}

impl core::fmt::Display for ShipmentId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Aggregate root: Shipment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shipment {
    id: ShipmentId,
    tenant_id: Option<TenantId>,
    tracking_number: String,
    customer_id: Option<CustomerId>,
    origin_warehouse_id: Option<WarehouseId>,
    destination_warehouse_id: Option<WarehouseId>,
    recipient_name: String,
    delivery_address: Option<Address>,
    weight_grams: u64,
    declared_value: u64,
    description: String,
    status: ShipmentStatus,
    history: Vec<TrackingEntry>,
    version: u64,
    created: bool,
}

impl Shipment {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: ShipmentId) -> Self {
        Self {
            id,
            tenant_id: None,
            tracking_number: String::new(),
            customer_id: None,
            origin_warehouse_id: None,
            destination_warehouse_id: None,
            recipient_name: String::new(),
            delivery_address: None,
            weight_grams: 0,
            declared_value: 0,
            description: String::new(),
            status: ShipmentStatus::Pending,
            history: Vec::new(),
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> ShipmentId {
        self.id
    }

    pub fn tenant_id(&self) -> Option<TenantId> {
        self.tenant_id
    }

    pub fn tracking_number(&self) -> &str {
        &self.tracking_number
    }

    pub fn customer_id(&self) -> Option<CustomerId> {
        self.customer_id
    }

    pub fn origin_warehouse_id(&self) -> Option<WarehouseId> {
        self.origin_warehouse_id
    }

    pub fn destination_warehouse_id(&self) -> Option<WarehouseId> {
        self.destination_warehouse_id
    }

    pub fn recipient_name(&self) -> &str {
        &self.recipient_name
    }

    pub fn delivery_address(&self) -> Option<&Address> {
        self.delivery_address.as_ref()
    }

    pub fn weight_grams(&self) -> u64 {
        self.weight_grams
    }

    pub fn declared_value(&self) -> u64 {
        self.declared_value
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn status(&self) -> ShipmentStatus {
        self.status
    }

    pub fn history(&self) -> &[TrackingEntry] {
        &self.history
    }

    /// Location of the most recent tracking entry.
    pub fn last_location(&self) -> Option<&str> {
        self.history.last().map(|e| e.location.as_str())
    }
}

impl AggregateRoot for Shipment {
    type Id = ShipmentId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: CreateShipment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateShipment {
    pub tenant_id: TenantId,
    pub shipment_id: ShipmentId,
    pub customer_id: CustomerId,
    pub origin_warehouse_id: WarehouseId,
    pub destination_warehouse_id: WarehouseId,
    /// Label for the first tracking entry; falls back to the origin warehouse id.
    pub origin_location: Option<String>,
    pub recipient_name: String,
    pub delivery_address: Address,
    pub weight_grams: u64,
    pub declared_value: u64,
    pub description: String,
    pub occurred_at: DateTime<Utc>,
}

/// Command: UpdateShipmentStatus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateShipmentStatus {
    pub tenant_id: TenantId,
    pub shipment_id: ShipmentId,
    pub status: ShipmentStatus,
    pub location: String,
    pub note: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: CancelShipment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelShipment {
    pub tenant_id: TenantId,
    pub shipment_id: ShipmentId,
    pub reason: String,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ReturnShipment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnShipment {
    pub tenant_id: TenantId,
    pub shipment_id: ShipmentId,
    pub reason: String,
    pub location: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShipmentCommand {
    CreateShipment(CreateShipment),
    UpdateShipmentStatus(UpdateShipmentStatus),
    CancelShipment(CancelShipment),
    ReturnShipment(ReturnShipment),
}

/// Event: ShipmentCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipmentCreated {
    pub tenant_id: TenantId,
    pub shipment_id: ShipmentId,
    pub tracking_number: String,
    pub customer_id: CustomerId,
    pub origin_warehouse_id: WarehouseId,
    pub destination_warehouse_id: WarehouseId,
    pub recipient_name: String,
    pub delivery_address: Address,
    pub weight_grams: u64,
    pub declared_value: u64,
    pub description: String,
    pub entry: TrackingEntry,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ShipmentStatusUpdated.
///
/// `entries` holds one entry per progression step covered by the update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipmentStatusUpdated {
    pub tenant_id: TenantId,
    pub shipment_id: ShipmentId,
    pub customer_id: CustomerId,
    pub from: ShipmentStatus,
    pub status: ShipmentStatus,
    pub entries: Vec<TrackingEntry>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ShipmentCancelled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipmentCancelled {
    pub tenant_id: TenantId,
    pub shipment_id: ShipmentId,
    pub customer_id: CustomerId,
    pub reason: String,
    pub entry: TrackingEntry,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ShipmentReturned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipmentReturned {
    pub tenant_id: TenantId,
    pub shipment_id: ShipmentId,
    pub customer_id: CustomerId,
    pub reason: String,
    pub entry: TrackingEntry,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShipmentEvent {
    ShipmentCreated(ShipmentCreated),
    ShipmentStatusUpdated(ShipmentStatusUpdated),
    ShipmentCancelled(ShipmentCancelled),
    ShipmentReturned(ShipmentReturned),
}

impl ShipmentEvent {
    pub fn shipment_id(&self) -> ShipmentId {
        match self {
            ShipmentEvent::ShipmentCreated(e) => e.shipment_id,
            ShipmentEvent::ShipmentStatusUpdated(e) => e.shipment_id,
            ShipmentEvent::ShipmentCancelled(e) => e.shipment_id,
            ShipmentEvent::ShipmentReturned(e) => e.shipment_id,
        }
    }

    pub fn customer_id(&self) -> CustomerId {
        match self {
            ShipmentEvent::ShipmentCreated(e) => e.customer_id,
            ShipmentEvent::ShipmentStatusUpdated(e) => e.customer_id,
            ShipmentEvent::ShipmentCancelled(e) => e.customer_id,
            ShipmentEvent::ShipmentReturned(e) => e.customer_id,
        }
    }

    /// Status the shipment is in after this event.
    pub fn resulting_status(&self) -> ShipmentStatus {
        match self {
            ShipmentEvent::ShipmentCreated(_) => ShipmentStatus::Pending,
            ShipmentEvent::ShipmentStatusUpdated(e) => e.status,
            ShipmentEvent::ShipmentCancelled(_) => ShipmentStatus::Cancelled,
            ShipmentEvent::ShipmentReturned(_) => ShipmentStatus::Returned,
        }
    }
}

impl Event for ShipmentEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ShipmentEvent::ShipmentCreated(_) => "shipments.shipment.created",
            ShipmentEvent::ShipmentStatusUpdated(_) => "shipments.shipment.status_updated",
            ShipmentEvent::ShipmentCancelled(_) => "shipments.shipment.cancelled",
            ShipmentEvent::ShipmentReturned(_) => "shipments.shipment.returned",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            ShipmentEvent::ShipmentCreated(e) => e.occurred_at,
            ShipmentEvent::ShipmentStatusUpdated(e) => e.occurred_at,
            ShipmentEvent::ShipmentCancelled(e) => e.occurred_at,
            ShipmentEvent::ShipmentReturned(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Shipment {
    type Command = ShipmentCommand;
    type Event = ShipmentEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            ShipmentEvent::ShipmentCreated(e) => {
                self.id = e.shipment_id;
                self.tenant_id = Some(e.tenant_id);
                self.tracking_number = e.tracking_number.clone();
                self.customer_id = Some(e.customer_id);
                self.origin_warehouse_id = Some(e.origin_warehouse_id);
                self.destination_warehouse_id = Some(e.destination_warehouse_id);
                self.recipient_name = e.recipient_name.clone();
                self.delivery_address = Some(e.delivery_address.clone());
                self.weight_grams = e.weight_grams;
                self.declared_value = e.declared_value;
                self.description = e.description.clone();
                self.status = ShipmentStatus::Pending;
                self.history = vec![e.entry.clone()];
                self.created = true;
            }
            ShipmentEvent::ShipmentStatusUpdated(e) => {
                self.status = e.status;
                self.history.extend(e.entries.iter().cloned());
            }
            ShipmentEvent::ShipmentCancelled(e) => {
                self.status = ShipmentStatus::Cancelled;
                self.history.push(e.entry.clone());
            }
            ShipmentEvent::ShipmentReturned(e) => {
                self.status = ShipmentStatus::Returned;
                self.history.push(e.entry.clone());
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            ShipmentCommand::CreateShipment(cmd) => self.handle_create(cmd),
            ShipmentCommand::UpdateShipmentStatus(cmd) => self.handle_update_status(cmd),
            ShipmentCommand::CancelShipment(cmd) => self.handle_cancel(cmd),
            ShipmentCommand::ReturnShipment(cmd) => self.handle_return(cmd),
        }
    }
}

fn required_text(value: &str, field: &str) -> Result<String, DomainError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(DomainError::validation(format!("{field} cannot be empty")));
    }
    Ok(value.to_string())
}

impl Shipment {
    fn ensure_tenant(&self, tenant_id: TenantId) -> Result<(), DomainError> {
        if !self.created {
            return Ok(());
        }
        if self.tenant_id != Some(tenant_id) {
            return Err(DomainError::invariant("tenant mismatch"));
        }
        Ok(())
    }

    fn ensure_shipment_id(&self, shipment_id: ShipmentId) -> Result<(), DomainError> {
        if self.id != shipment_id {
            return Err(DomainError::invariant("shipment_id mismatch"));
        }
        Ok(())
    }

    fn ensure_existing(
        &self,
        tenant_id: TenantId,
        shipment_id: ShipmentId,
    ) -> Result<CustomerId, DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        self.ensure_tenant(tenant_id)?;
        self.ensure_shipment_id(shipment_id)?;
        self.customer_id
            .ok_or_else(|| DomainError::invariant("shipment has no customer"))
    }

    fn current_location(&self) -> String {
        self.last_location().unwrap_or_default().to_string()
    }

    fn handle_create(&self, cmd: &CreateShipment) -> Result<Vec<ShipmentEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("shipment already exists"));
        }
        if cmd.origin_warehouse_id == cmd.destination_warehouse_id {
            return Err(DomainError::validation(
                "origin and destination warehouses must differ",
            ));
        }
        if cmd.weight_grams == 0 {
            return Err(DomainError::validation("weight must be positive"));
        }

        let recipient_name = required_text(&cmd.recipient_name, "recipient name")?;
        let delivery_address = cmd.delivery_address.normalized()?;
        let location = cmd
            .origin_location
            .as_deref()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| cmd.origin_warehouse_id.to_string());

        Ok(vec![ShipmentEvent::ShipmentCreated(ShipmentCreated {
            tenant_id: cmd.tenant_id,
            shipment_id: cmd.shipment_id,
            tracking_number: cmd.shipment_id.tracking_number(),
            customer_id: cmd.customer_id,
            origin_warehouse_id: cmd.origin_warehouse_id,
            destination_warehouse_id: cmd.destination_warehouse_id,
            recipient_name,
            delivery_address,
            weight_grams: cmd.weight_grams,
            declared_value: cmd.declared_value,
            description: cmd.description.trim().to_string(),
            entry: TrackingEntry {
                status: ShipmentStatus::Pending,
                location,
                note: None,
                recorded_at: cmd.occurred_at,
            },
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_update_status(
        &self,
        cmd: &UpdateShipmentStatus,
    ) -> Result<Vec<ShipmentEvent>, DomainError> {
        let customer_id = self.ensure_existing(cmd.tenant_id, cmd.shipment_id)?;

        if self.status.is_terminal() {
            return Err(DomainError::invariant(format!(
                "shipment is {} and cannot change status",
                self.status
            )));
        }
        let location = required_text(&cmd.location, "location")?;
        let note = cmd
            .note
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string);
        let entries =
            entries_for_transition(self.status, cmd.status, &location, note, cmd.occurred_at)?;

        Ok(vec![ShipmentEvent::ShipmentStatusUpdated(ShipmentStatusUpdated {
            tenant_id: cmd.tenant_id,
            shipment_id: cmd.shipment_id,
            customer_id,
            from: self.status,
            status: cmd.status,
            entries,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_cancel(&self, cmd: &CancelShipment) -> Result<Vec<ShipmentEvent>, DomainError> {
        let customer_id = self.ensure_existing(cmd.tenant_id, cmd.shipment_id)?;

        if !self.status.can_cancel() {
            return Err(DomainError::invariant(format!(
                "shipment cannot be cancelled once {}",
                self.status
            )));
        }
        let reason = required_text(&cmd.reason, "cancellation reason")?;

        Ok(vec![ShipmentEvent::ShipmentCancelled(ShipmentCancelled {
            tenant_id: cmd.tenant_id,
            shipment_id: cmd.shipment_id,
            customer_id,
            entry: TrackingEntry {
                status: ShipmentStatus::Cancelled,
                location: self.current_location(),
                note: Some(reason.clone()),
                recorded_at: cmd.occurred_at,
            },
            reason,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_return(&self, cmd: &ReturnShipment) -> Result<Vec<ShipmentEvent>, DomainError> {
        let customer_id = self.ensure_existing(cmd.tenant_id, cmd.shipment_id)?;

        if !self.status.can_return() {
            return Err(DomainError::invariant(format!(
                "shipment cannot be returned while {}",
                self.status
            )));
        }
        let reason = required_text(&cmd.reason, "return reason")?;
        let location = match cmd.location.as_deref().map(str::trim) {
            Some(l) if !l.is_empty() => l.to_string(),
            _ => self.current_location(),
        };

        Ok(vec![ShipmentEvent::ShipmentReturned(ShipmentReturned {
            tenant_id: cmd.tenant_id,
            shipment_id: cmd.shipment_id,
            customer_id,
            entry: TrackingEntry {
                status: ShipmentStatus::Returned,
                location,
                note: Some(reason.clone()),
                recorded_at: cmd.occurred_at,
            },
            reason,
            occurred_at: cmd.occurred_at,
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cargohub_events::execute;

    fn test_tenant_id() -> TenantId {
        TenantId::new()
    }

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    fn create_cmd(tenant_id: TenantId, shipment_id: ShipmentId) -> CreateShipment {
        CreateShipment {
            tenant_id,
            shipment_id,
            customer_id: CustomerId::new(AggregateId::new()),
            origin_warehouse_id: WarehouseId::new(AggregateId::new()),
            destination_warehouse_id: WarehouseId::new(AggregateId::new()),
            origin_location: Some("RTM-01".to_string()),
            recipient_name: "J. de Vries".to_string(),
            delivery_address: Address {
                line1: "Keizersgracht 1".to_string(),
                line2: None,
                city: "Amsterdam".to_string(),
                postal_code: None,
                country: "NL".to_string(),
            },
            weight_grams: 1_250,
            declared_value: 4_999,
            description: "Books".to_string(),
            occurred_at: test_time(),
        }
    }

    fn created(tenant_id: TenantId) -> Shipment {
        let shipment_id = ShipmentId::new(AggregateId::new());
        let mut shipment = Shipment::empty(shipment_id);
        let events = shipment
            .handle(&ShipmentCommand::CreateShipment(create_cmd(tenant_id, shipment_id)))
            .unwrap();
        shipment.apply(&events[0]);
        shipment
    }

    fn move_to(shipment: &mut Shipment, tenant_id: TenantId, status: ShipmentStatus) {
        let shipment_id = shipment.id_typed();
        execute(
            shipment,
            &ShipmentCommand::UpdateShipmentStatus(UpdateShipmentStatus {
                tenant_id,
                shipment_id,
                status,
                location: "Utrecht DC".to_string(),
                note: None,
                occurred_at: test_time(),
            }),
        )
        .unwrap();
    }

    #[test]
    fn create_records_pending_entry_and_tracking_number() {
        let shipment = created(test_tenant_id());
        assert_eq!(shipment.status(), ShipmentStatus::Pending);
        assert_eq!(shipment.history().len(), 1);
        assert_eq!(shipment.last_location(), Some("RTM-01"));
        assert!(shipment.tracking_number().starts_with("CH"));
        assert_eq!(shipment.tracking_number().len(), 12);
        assert_eq!(shipment.tracking_number(), shipment.id_typed().tracking_number());
    }

    #[test]
    fn create_rejects_same_warehouses_and_zero_weight() {
        let tenant_id = test_tenant_id();
        let shipment_id = ShipmentId::new(AggregateId::new());
        let shipment = Shipment::empty(shipment_id);

        let mut cmd = create_cmd(tenant_id, shipment_id);
        cmd.destination_warehouse_id = cmd.origin_warehouse_id;
        assert!(matches!(
            shipment.handle(&ShipmentCommand::CreateShipment(cmd)),
            Err(DomainError::Validation(_))
        ));

        let mut cmd = create_cmd(tenant_id, shipment_id);
        cmd.weight_grams = 0;
        assert!(matches!(
            shipment.handle(&ShipmentCommand::CreateShipment(cmd)),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn skipping_steps_fills_in_history() {
        let tenant_id = test_tenant_id();
        let mut shipment = created(tenant_id);
        move_to(&mut shipment, tenant_id, ShipmentStatus::AtWarehouse);

        let statuses: Vec<_> = shipment.history().iter().map(|e| e.status).collect();
        assert_eq!(
            statuses,
            vec![
                ShipmentStatus::Pending,
                ShipmentStatus::PickedUp,
                ShipmentStatus::InTransit,
                ShipmentStatus::AtWarehouse,
            ]
        );
        assert_eq!(shipment.version(), 2);
    }

    #[test]
    fn status_cannot_go_backwards_or_repeat() {
        let tenant_id = test_tenant_id();
        let mut shipment = created(tenant_id);
        move_to(&mut shipment, tenant_id, ShipmentStatus::InTransit);

        for status in [ShipmentStatus::InTransit, ShipmentStatus::PickedUp] {
            let err = shipment
                .handle(&ShipmentCommand::UpdateShipmentStatus(UpdateShipmentStatus {
                    tenant_id,
                    shipment_id: shipment.id_typed(),
                    status,
                    location: "Utrecht DC".to_string(),
                    note: None,
                    occurred_at: test_time(),
                }))
                .unwrap_err();
            assert!(matches!(err, DomainError::InvariantViolation(_)));
        }
    }

    #[test]
    fn cancel_only_before_transit() {
        let tenant_id = test_tenant_id();
        let mut shipment = created(tenant_id);
        move_to(&mut shipment, tenant_id, ShipmentStatus::InTransit);

        let err = shipment
            .handle(&ShipmentCommand::CancelShipment(CancelShipment {
                tenant_id,
                shipment_id: shipment.id_typed(),
                reason: "customer request".to_string(),
                occurred_at: test_time(),
            }))
            .unwrap_err();
        match err {
            DomainError::InvariantViolation(msg) if msg.contains("cancelled") => {}
            _ => panic!("Expected cancellation to be rejected"),
        }
    }

    #[test]
    fn returned_shipment_is_terminal() {
        let tenant_id = test_tenant_id();
        let mut shipment = created(tenant_id);
        move_to(&mut shipment, tenant_id, ShipmentStatus::OutForDelivery);
        let shipment_id = shipment.id_typed();

        execute(
            &mut shipment,
            &ShipmentCommand::ReturnShipment(ReturnShipment {
                tenant_id,
                shipment_id,
                reason: "recipient refused".to_string(),
                location: None,
                occurred_at: test_time(),
            }),
        )
        .unwrap();
        assert_eq!(shipment.status(), ShipmentStatus::Returned);
        assert_eq!(shipment.last_location(), Some("Utrecht DC"));

        let err = shipment
            .handle(&ShipmentCommand::UpdateShipmentStatus(UpdateShipmentStatus {
                tenant_id,
                shipment_id,
                status: ShipmentStatus::Delivered,
                location: "Amsterdam".to_string(),
                note: None,
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
    }

    #[test]
    fn pending_shipment_cannot_be_returned() {
        let tenant_id = test_tenant_id();
        let shipment = created(tenant_id);
        let err = shipment
            .handle(&ShipmentCommand::ReturnShipment(ReturnShipment {
                tenant_id,
                shipment_id: shipment.id_typed(),
                reason: "wrong address".to_string(),
                location: None,
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
    }
}
