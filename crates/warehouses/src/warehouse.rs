use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use cargohub_core::{Address, Aggregate, AggregateId, AggregateRoot, DomainError, TenantId};
use cargohub_events::Event;

/// Warehouse identifier (tenant-scoped via `tenant_id` fields in events/commands).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WarehouseId(pub AggregateId);

impl WarehouseId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for WarehouseId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Short uppercase site code, e.g. `RTM-01`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WarehouseCode(String);

impl WarehouseCode {
    pub const MIN_LEN: usize = 2;
    pub const MAX_LEN: usize = 16;

    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        let code = raw.trim().to_uppercase();
        if code.len() < Self::MIN_LEN || code.len() > Self::MAX_LEN {
            return Err(DomainError::validation(format!(
                "warehouse code must be {}-{} characters",
                Self::MIN_LEN,
                Self::MAX_LEN
            )));
        }
        if !code.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err(DomainError::validation(
                "warehouse code may only contain letters, digits and '-'",
            ));
        }
        Ok(Self(code))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for WarehouseCode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WarehouseStatus {
    Active,
    Inactive,
}

/// Aggregate root: Warehouse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warehouse {
    id: WarehouseId,
    tenant_id: Option<TenantId>,
    code: Option<WarehouseCode>,
    name: String,
    address: Option<Address>,
    capacity: u32,
    status: WarehouseStatus,
    version: u64,
    created: bool,
}

impl Warehouse {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: WarehouseId) -> Self {
        Self {
            id,
            tenant_id: None,
            code: None,
            name: String::new(),
            address: None,
            capacity: 0,
            status: WarehouseStatus::Active,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> WarehouseId {
        self.id
    }

    pub fn tenant_id(&self) -> Option<TenantId> {
        self.tenant_id
    }

    pub fn code(&self) -> Option<&WarehouseCode> {
        self.code.as_ref()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn address(&self) -> Option<&Address> {
        self.address.as_ref()
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn status(&self) -> WarehouseStatus {
        self.status
    }

    pub fn is_active(&self) -> bool {
        self.created && self.status == WarehouseStatus::Active
    }
}

impl AggregateRoot for Warehouse {
    type Id = WarehouseId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: RegisterWarehouse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterWarehouse {
    pub tenant_id: TenantId,
    pub warehouse_id: WarehouseId,
    pub code: String,
    pub name: String,
    pub address: Address,
    pub capacity: u32,
    pub occurred_at: DateTime<Utc>,
}

/// Command: UpdateWarehouse. `None` keeps the current value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateWarehouse {
    pub tenant_id: TenantId,
    pub warehouse_id: WarehouseId,
    pub name: Option<String>,
    pub address: Option<Address>,
    pub capacity: Option<u32>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ActivateWarehouse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivateWarehouse {
    pub tenant_id: TenantId,
    pub warehouse_id: WarehouseId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: DeactivateWarehouse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeactivateWarehouse {
    pub tenant_id: TenantId,
    pub warehouse_id: WarehouseId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum WarehouseCommand {
    RegisterWarehouse(RegisterWarehouse),
    UpdateWarehouse(UpdateWarehouse),
    ActivateWarehouse(ActivateWarehouse),
    DeactivateWarehouse(DeactivateWarehouse),
}

/// Event: WarehouseRegistered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarehouseRegistered {
    pub tenant_id: TenantId,
    pub warehouse_id: WarehouseId,
    pub code: WarehouseCode,
    pub name: String,
    pub address: Address,
    pub capacity: u32,
    pub occurred_at: DateTime<Utc>,
}

/// Event: WarehouseUpdated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarehouseUpdated {
    pub tenant_id: TenantId,
    pub warehouse_id: WarehouseId,
    pub name: String,
    pub address: Address,
    pub capacity: u32,
    pub occurred_at: DateTime<Utc>,
}

/// Event: WarehouseActivated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarehouseActivated {
    pub tenant_id: TenantId,
    pub warehouse_id: WarehouseId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: WarehouseDeactivated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarehouseDeactivated {
    pub tenant_id: TenantId,
    pub warehouse_id: WarehouseId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum WarehouseEvent {
    WarehouseRegistered(WarehouseRegistered),
    WarehouseUpdated(WarehouseUpdated),
    WarehouseActivated(WarehouseActivated),
    WarehouseDeactivated(WarehouseDeactivated),
}

impl Event for WarehouseEvent {
    fn event_type(&self) -> &'static str {
        match self {
            WarehouseEvent::WarehouseRegistered(_) => "warehouses.warehouse.registered",
            WarehouseEvent::WarehouseUpdated(_) => "warehouses.warehouse.updated",
            WarehouseEvent::WarehouseActivated(_) => "warehouses.warehouse.activated",
            WarehouseEvent::WarehouseDeactivated(_) => "warehouses.warehouse.deactivated",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            WarehouseEvent::WarehouseRegistered(e) => e.occurred_at,
            WarehouseEvent::WarehouseUpdated(e) => e.occurred_at,
            WarehouseEvent::WarehouseActivated(e) => e.occurred_at,
            WarehouseEvent::WarehouseDeactivated(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Warehouse {
    type Command = WarehouseCommand;
    type Event = WarehouseEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            WarehouseEvent::WarehouseRegistered(e) => {
                self.id = e.warehouse_id;
                self.tenant_id = Some(e.tenant_id);
                self.code = Some(e.code.clone());
                self.name = e.name.clone();
                self.address = Some(e.address.clone());
                self.capacity = e.capacity;
                self.status = WarehouseStatus::Active;
                self.created = true;
            }
            WarehouseEvent::WarehouseUpdated(e) => {
                self.name = e.name.clone();
                self.address = Some(e.address.clone());
                self.capacity = e.capacity;
            }
            WarehouseEvent::WarehouseActivated(_) => self.status = WarehouseStatus::Active,
            WarehouseEvent::WarehouseDeactivated(_) => self.status = WarehouseStatus::Inactive,
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            WarehouseCommand::RegisterWarehouse(cmd) => self.handle_register(cmd),
            WarehouseCommand::UpdateWarehouse(cmd) => self.handle_update(cmd),
            WarehouseCommand::ActivateWarehouse(cmd) => self.handle_activate(cmd),
            WarehouseCommand::DeactivateWarehouse(cmd) => self.handle_deactivate(cmd),
        }
    }
}

impl Warehouse {
    fn ensure_tenant(&self, tenant_id: TenantId) -> Result<(), DomainError> {
        if !self.created {
            return Ok(());
        }
        if self.tenant_id != Some(tenant_id) {
            return Err(DomainError::invariant("tenant mismatch"));
        }
        Ok(())
    }

    fn ensure_warehouse_id(&self, warehouse_id: WarehouseId) -> Result<(), DomainError> {
        if self.id != warehouse_id {
            return Err(DomainError::invariant("warehouse_id mismatch"));
        }
        Ok(())
    }

    fn ensure_existing(&self, tenant_id: TenantId, id: WarehouseId) -> Result<(), DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        self.ensure_tenant(tenant_id)?;
        self.ensure_warehouse_id(id)
    }

    fn handle_register(&self, cmd: &RegisterWarehouse) -> Result<Vec<WarehouseEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("warehouse already exists"));
        }
        let code = WarehouseCode::parse(&cmd.code)?;
        let name = cmd.name.trim();
        if name.is_empty() {
            return Err(DomainError::validation("warehouse name cannot be empty"));
        }
        if cmd.capacity == 0 {
            return Err(DomainError::validation("capacity must be positive"));
        }

        Ok(vec![WarehouseEvent::WarehouseRegistered(WarehouseRegistered {
            tenant_id: cmd.tenant_id,
            warehouse_id: cmd.warehouse_id,
            code,
            name: name.to_string(),
            address: cmd.address.normalized()?,
            capacity: cmd.capacity,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_update(&self, cmd: &UpdateWarehouse) -> Result<Vec<WarehouseEvent>, DomainError> {
        self.ensure_existing(cmd.tenant_id, cmd.warehouse_id)?;

        let name = match cmd.name.as_deref().map(str::trim) {
            Some("") => return Err(DomainError::validation("warehouse name cannot be empty")),
            Some(n) => n.to_string(),
            None => self.name.clone(),
        };
        let address = match (&cmd.address, &self.address) {
            (Some(a), _) => a.normalized()?,
            (None, Some(current)) => current.clone(),
            (None, None) => return Err(DomainError::invariant("warehouse has no address")),
        };
        let capacity = cmd.capacity.unwrap_or(self.capacity);
        if capacity == 0 {
            return Err(DomainError::validation("capacity must be positive"));
        }

        Ok(vec![WarehouseEvent::WarehouseUpdated(WarehouseUpdated {
            tenant_id: cmd.tenant_id,
            warehouse_id: cmd.warehouse_id,
            name,
            address,
            capacity,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_activate(&self, cmd: &ActivateWarehouse) -> Result<Vec<WarehouseEvent>, DomainError> {
        self.ensure_existing(cmd.tenant_id, cmd.warehouse_id)?;
        if self.status == WarehouseStatus::Active {
            return Err(DomainError::conflict("warehouse is already active"));
        }
        Ok(vec![WarehouseEvent::WarehouseActivated(WarehouseActivated {
            tenant_id: cmd.tenant_id,
            warehouse_id: cmd.warehouse_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_deactivate(
        &self,
        cmd: &DeactivateWarehouse,
    ) -> Result<Vec<WarehouseEvent>, DomainError> {
        self.ensure_existing(cmd.tenant_id, cmd.warehouse_id)?;
        if self.status == WarehouseStatus::Inactive {
            return Err(DomainError::conflict("warehouse is already inactive"));
        }
        Ok(vec![WarehouseEvent::WarehouseDeactivated(WarehouseDeactivated {
            tenant_id: cmd.tenant_id,
            warehouse_id: cmd.warehouse_id,
            occurred_at: cmd.occurred_at,
        })])
    }
}
