use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use cargohub_core::{Aggregate, AggregateId, AggregateRoot, DomainError, TenantId};
use cargohub_events::Event;

/// Driver identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DriverId(pub AggregateId);

impl DriverId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for DriverId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriverStatus {
    Available,
    OnRoute,
    OffDuty,
}

/// Aggregate root: Driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Driver {
    id: DriverId,
    tenant_id: Option<TenantId>,
    name: String,
    phone: String,
    license_number: String,
    vehicle_plate: Option<String>,
    status: DriverStatus,
    version: u64,
    created: bool,
}

impl Driver {
    pub fn empty(id: DriverId) -> Self {
        Self {
            id,
            tenant_id: None,
            name: String::new(),
            phone: String::new(),
            license_number: String::new(),
            vehicle_plate: None,
            status: DriverStatus::Available,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> DriverId {
        self.id
    }

    pub fn tenant_id(&self) -> Option<TenantId> {
        self.tenant_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn phone(&self) -> &str {
        &self.phone
    }

    pub fn license_number(&self) -> &str {
        &self.license_number
    }

    pub fn vehicle_plate(&self) -> Option<&str> {
        self.vehicle_plate.as_deref()
    }

    pub fn status(&self) -> DriverStatus {
        self.status
    }
}

impl AggregateRoot for Driver {
    type Id = DriverId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterDriver {
    pub tenant_id: TenantId,
    pub driver_id: DriverId,
    pub name: String,
    pub phone: String,
    pub license_number: String,
    pub vehicle_plate: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateDriver {
    pub tenant_id: TenantId,
    pub driver_id: DriverId,
    pub name: Option<String>,
    pub phone: Option<String>,
    pub vehicle_plate: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetDriverStatus {
    pub tenant_id: TenantId,
    pub driver_id: DriverId,
    pub status: DriverStatus,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DriverCommand {
    RegisterDriver(RegisterDriver),
    UpdateDriver(UpdateDriver),
    SetDriverStatus(SetDriverStatus),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverRegistered {
    pub tenant_id: TenantId,
    pub driver_id: DriverId,
    pub name: String,
    pub phone: String,
    pub license_number: String,
    pub vehicle_plate: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverUpdated {
    pub tenant_id: TenantId,
    pub driver_id: DriverId,
    pub name: String,
    pub phone: String,
    pub vehicle_plate: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverStatusChanged {
    pub tenant_id: TenantId,
    pub driver_id: DriverId,
    pub status: DriverStatus,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DriverEvent {
    DriverRegistered(DriverRegistered),
    DriverUpdated(DriverUpdated),
    DriverStatusChanged(DriverStatusChanged),
}

impl Event for DriverEvent {
    fn event_type(&self) -> &'static str {
        match self {
            DriverEvent::DriverRegistered(_) => "routing.driver.registered",
            DriverEvent::DriverUpdated(_) => "routing.driver.updated",
            DriverEvent::DriverStatusChanged(_) => "routing.driver.status_changed",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            DriverEvent::DriverRegistered(e) => e.occurred_at,
            DriverEvent::DriverUpdated(e) => e.occurred_at,
            DriverEvent::DriverStatusChanged(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Driver {
    type Command = DriverCommand;
    type Event = DriverEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            DriverEvent::DriverRegistered(e) => {
                self.id = e.driver_id;
                self.tenant_id = Some(e.tenant_id);
                self.name = e.name.clone();
                self.phone = e.phone.clone();
                self.license_number = e.license_number.clone();
                self.vehicle_plate = e.vehicle_plate.clone();
                self.status = DriverStatus::Available;
                self.created = true;
            }
            DriverEvent::DriverUpdated(e) => {
                self.name = e.name.clone();
                self.phone = e.phone.clone();
                self.vehicle_plate = e.vehicle_plate.clone();
            }
            DriverEvent::DriverStatusChanged(e) => self.status = e.status,
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            DriverCommand::RegisterDriver(cmd) => self.handle_register(cmd),
            DriverCommand::UpdateDriver(cmd) => self.handle_update(cmd),
            DriverCommand::SetDriverStatus(cmd) => self.handle_set_status(cmd),
        }
    }
}

fn required(value: &str, field: &str) -> Result<String, DomainError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(DomainError::validation(format!("{field} cannot be empty")));
    }
    Ok(value.to_string())
}

fn plate(value: Option<&str>) -> Option<String> {
    value
        .map(|p| p.trim().to_uppercase())
        .filter(|p| !p.is_empty())
}

impl Driver {
    fn ensure_existing(&self, tenant_id: TenantId, driver_id: DriverId) -> Result<(), DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        if self.tenant_id != Some(tenant_id) {
            return Err(DomainError::invariant("tenant mismatch"));
        }
        if self.id != driver_id {
            return Err(DomainError::invariant("driver_id mismatch"));
        }
        Ok(())
    }

    fn handle_register(&self, cmd: &RegisterDriver) -> Result<Vec<DriverEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("driver already exists"));
        }
        Ok(vec![DriverEvent::DriverRegistered(DriverRegistered {
            tenant_id: cmd.tenant_id,
            driver_id: cmd.driver_id,
            name: required(&cmd.name, "driver name")?,
            phone: required(&cmd.phone, "phone")?,
            license_number: required(&cmd.license_number, "license number")?.to_uppercase(),
            vehicle_plate: plate(cmd.vehicle_plate.as_deref()),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_update(&self, cmd: &UpdateDriver) -> Result<Vec<DriverEvent>, DomainError> {
        self.ensure_existing(cmd.tenant_id, cmd.driver_id)?;
        let name = match &cmd.name {
            Some(n) => required(n, "driver name")?,
            None => self.name.clone(),
        };
        let phone = match &cmd.phone {
            Some(p) => required(p, "phone")?,
            None => self.phone.clone(),
        };
        let vehicle_plate = match &cmd.vehicle_plate {
            Some(p) => plate(Some(p)),
            None => self.vehicle_plate.clone(),
        };
        Ok(vec![DriverEvent::DriverUpdated(DriverUpdated {
            tenant_id: cmd.tenant_id,
            driver_id: cmd.driver_id,
            name,
            phone,
            vehicle_plate,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_set_status(&self, cmd: &SetDriverStatus) -> Result<Vec<DriverEvent>, DomainError> {
        self.ensure_existing(cmd.tenant_id, cmd.driver_id)?;
        if cmd.status == self.status {
            return Err(DomainError::conflict(format!(
                "driver is already {:?}",
                self.status
            )));
        }
        Ok(vec![DriverEvent::DriverStatusChanged(DriverStatusChanged {
            tenant_id: cmd.tenant_id,
            driver_id: cmd.driver_id,
            status: cmd.status,
            occurred_at: cmd.occurred_at,
        })])
    }
}
