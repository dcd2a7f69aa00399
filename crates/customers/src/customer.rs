use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use cargohub_core::{Address, Aggregate, AggregateId, AggregateRoot, DomainError, TenantId};
use cargohub_events::Event;

/// Customer identifier (tenant-scoped via `tenant_id` fields in events/commands).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CustomerId(pub AggregateId);

impl CustomerId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for CustomerId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Customer status lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CustomerStatus {
    Active,
    Suspended,
}

/// Aggregate root: Customer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Customer {
    id: CustomerId,
    tenant_id: Option<TenantId>,
    name: String,
    email: String,
    phone: Option<String>,
    company: Option<String>,
    address: Option<Address>,
    status: CustomerStatus,
    version: u64,
    created: bool,
}

impl Customer {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: CustomerId) -> Self {
        Self {
            id,
            tenant_id: None,
            name: String::new(),
            email: String::new(),
            phone: None,
            company: None,
            address: None,
            status: CustomerStatus::Active,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> CustomerId {
        self.id
    }

    pub fn tenant_id(&self) -> Option<TenantId> {
        self.tenant_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn phone(&self) -> Option<&str> {
        self.phone.as_deref()
    }

    pub fn company(&self) -> Option<&str> {
        self.company.as_deref()
    }

    pub fn address(&self) -> Option<&Address> {
        self.address.as_ref()
    }

    pub fn status(&self) -> CustomerStatus {
        self.status
    }

    /// Suspended customers cannot book new shipments.
    pub fn can_ship(&self) -> bool {
        self.created && self.status == CustomerStatus::Active
    }
}

impl AggregateRoot for Customer {
    type Id = CustomerId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: RegisterCustomer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterCustomer {
    pub tenant_id: TenantId,
    pub customer_id: CustomerId,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub address: Option<Address>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: UpdateCustomer. `None` fields keep their current value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateCustomer {
    pub tenant_id: TenantId,
    pub customer_id: CustomerId,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub address: Option<Address>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: SuspendCustomer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuspendCustomer {
    pub tenant_id: TenantId,
    pub customer_id: CustomerId,
    pub reason: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ReactivateCustomer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactivateCustomer {
    pub tenant_id: TenantId,
    pub customer_id: CustomerId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CustomerCommand {
    RegisterCustomer(RegisterCustomer),
    UpdateCustomer(UpdateCustomer),
    SuspendCustomer(SuspendCustomer),
    ReactivateCustomer(ReactivateCustomer),
}

/// Event: CustomerRegistered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerRegistered {
    pub tenant_id: TenantId,
    pub customer_id: CustomerId,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub address: Option<Address>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: CustomerUpdated (full snapshot of the editable details).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerUpdated {
    pub tenant_id: TenantId,
    pub customer_id: CustomerId,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub address: Option<Address>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: CustomerSuspended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerSuspended {
    pub tenant_id: TenantId,
    pub customer_id: CustomerId,
    pub reason: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: CustomerReactivated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerReactivated {
    pub tenant_id: TenantId,
    pub customer_id: CustomerId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CustomerEvent {
    CustomerRegistered(CustomerRegistered),
    CustomerUpdated(CustomerUpdated),
    CustomerSuspended(CustomerSuspended),
    CustomerReactivated(CustomerReactivated),
}

impl CustomerEvent {
    pub fn tenant_id(&self) -> TenantId {
        match self {
            CustomerEvent::CustomerRegistered(e) => e.tenant_id,
            CustomerEvent::CustomerUpdated(e) => e.tenant_id,
            CustomerEvent::CustomerSuspended(e) => e.tenant_id,
            CustomerEvent::CustomerReactivated(e) => e.tenant_id,
        }
    }

    pub fn customer_id(&self) -> CustomerId {
        match self {
            CustomerEvent::CustomerRegistered(e) => e.customer_id,
            CustomerEvent::CustomerUpdated(e) => e.customer_id,
            CustomerEvent::CustomerSuspended(e) => e.customer_id,
            CustomerEvent::CustomerReactivated(e) => e.customer_id,
        }
    }
}

impl Event for CustomerEvent {
    fn event_type(&self) -> &'static str {
        match self {
            CustomerEvent::CustomerRegistered(_) => "customers.customer.registered",
            CustomerEvent::CustomerUpdated(_) => "customers.customer.updated",
            CustomerEvent::CustomerSuspended(_) => "customers.customer.suspended",
            CustomerEvent::CustomerReactivated(_) => "customers.customer.reactivated",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            CustomerEvent::CustomerRegistered(e) => e.occurred_at,
            CustomerEvent::CustomerUpdated(e) => e.occurred_at,
            CustomerEvent::CustomerSuspended(e) => e.occurred_at,
            CustomerEvent::CustomerReactivated(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Customer {
    type Command = CustomerCommand;
    type Event = CustomerEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            CustomerEvent::CustomerRegistered(e) => {
                self.id = e.customer_id;
                self.tenant_id = Some(e.tenant_id);
                self.name = e.name.clone();
                self.email = e.email.clone();
                self.phone = e.phone.clone();
                self.company = e.company.clone();
                self.address = e.address.clone();
                self.status = CustomerStatus::Active;
                self.created = true;
            }
            CustomerEvent::CustomerUpdated(e) => {
                self.name = e.name.clone();
                self.email = e.email.clone();
                self.phone = e.phone.clone();
                self.company = e.company.clone();
                self.address = e.address.clone();
            }
            CustomerEvent::CustomerSuspended(_) => {
                self.status = CustomerStatus::Suspended;
            }
            CustomerEvent::CustomerReactivated(_) => {
                self.status = CustomerStatus::Active;
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            CustomerCommand::RegisterCustomer(cmd) => self.handle_register(cmd),
            CustomerCommand::UpdateCustomer(cmd) => self.handle_update(cmd),
            CustomerCommand::SuspendCustomer(cmd) => self.handle_suspend(cmd),
            CustomerCommand::ReactivateCustomer(cmd) => self.handle_reactivate(cmd),
        }
    }
}

fn validate_name(name: &str) -> Result<String, DomainError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(DomainError::validation("customer name cannot be empty"));
    }
    Ok(name.to_string())
}

fn validate_email(email: &str) -> Result<String, DomainError> {
    let email = email.trim().to_lowercase();
    let valid = match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && !domain.is_empty() && !domain.contains('@'),
        None => false,
    };
    if !valid {
        return Err(DomainError::validation("customer email is not a valid address"));
    }
    Ok(email)
}

fn normalize_address(address: Option<&Address>) -> Result<Option<Address>, DomainError> {
    address.map(Address::normalized).transpose()
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

impl Customer {
    fn ensure_exists(&self, tenant_id: TenantId, customer_id: CustomerId) -> Result<(), DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        if self.tenant_id != Some(tenant_id) {
            return Err(DomainError::invariant("tenant mismatch"));
        }
        if self.id != customer_id {
            return Err(DomainError::invariant("customer_id mismatch"));
        }
        Ok(())
    }

    fn handle_register(&self, cmd: &RegisterCustomer) -> Result<Vec<CustomerEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("customer already exists"));
        }

        Ok(vec![CustomerEvent::CustomerRegistered(CustomerRegistered {
            tenant_id: cmd.tenant_id,
            customer_id: cmd.customer_id,
            name: validate_name(&cmd.name)?,
            email: validate_email(&cmd.email)?,
            phone: non_empty(cmd.phone.as_deref()),
            company: non_empty(cmd.company.as_deref()),
            address: normalize_address(cmd.address.as_ref())?,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_update(&self, cmd: &UpdateCustomer) -> Result<Vec<CustomerEvent>, DomainError> {
        self.ensure_exists(cmd.tenant_id, cmd.customer_id)?;

        let name = match &cmd.name {
            Some(n) => validate_name(n)?,
            None => self.name.clone(),
        };
        let email = match &cmd.email {
            Some(e) => validate_email(e)?,
            None => self.email.clone(),
        };
        let phone = match &cmd.phone {
            Some(p) => non_empty(Some(p)),
            None => self.phone.clone(),
        };
        let company = match &cmd.company {
            Some(c) => non_empty(Some(c)),
            None => self.company.clone(),
        };
        let address = match &cmd.address {
            Some(a) => Some(a.normalized()?),
            None => self.address.clone(),
        };

        Ok(vec![CustomerEvent::CustomerUpdated(CustomerUpdated {
            tenant_id: cmd.tenant_id,
            customer_id: cmd.customer_id,
            name,
            email,
            phone,
            company,
            address,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_suspend(&self, cmd: &SuspendCustomer) -> Result<Vec<CustomerEvent>, DomainError> {
        self.ensure_exists(cmd.tenant_id, cmd.customer_id)?;

        if self.status == CustomerStatus::Suspended {
            return Err(DomainError::conflict("customer is already suspended"));
        }

        Ok(vec![CustomerEvent::CustomerSuspended(CustomerSuspended {
            tenant_id: cmd.tenant_id,
            customer_id: cmd.customer_id,
            reason: non_empty(cmd.reason.as_deref()),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_reactivate(
        &self,
        cmd: &ReactivateCustomer,
    ) -> Result<Vec<CustomerEvent>, DomainError> {
        self.ensure_exists(cmd.tenant_id, cmd.customer_id)?;

        if self.status != CustomerStatus::Suspended {
            return Err(DomainError::conflict("customer is not suspended"));
        }

        Ok(vec![CustomerEvent::CustomerReactivated(CustomerReactivated {
            tenant_id: cmd.tenant_id,
            customer_id: cmd.customer_id,
            occurred_at: cmd.occurred_at,
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cargohub_events::execute;

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    fn register_cmd(tenant_id: TenantId, customer_id: CustomerId) -> RegisterCustomer {
        RegisterCustomer {
            tenant_id,
            customer_id,
            name: "  Acme Freight ".to_string(),
            email: "Ops@Acme.Example".to_string(),
            phone: Some(" ".to_string()),
            company: Some("Acme BV".to_string()),
            address: None,
            occurred_at: test_time(),
        }
    }

    fn registered() -> (Customer, TenantId, CustomerId) {
        let tenant_id = TenantId::new();
        let customer_id = CustomerId::new(AggregateId::new());
        let mut customer = Customer::empty(customer_id);
        execute(
            &mut customer,
            &CustomerCommand::RegisterCustomer(register_cmd(tenant_id, customer_id)),
        )
        .unwrap();
        (customer, tenant_id, customer_id)
    }

    #[test]
    fn register_normalizes_details() {
        let (customer, tenant_id, _) = registered();
        assert_eq!(customer.name(), "Acme Freight");
        assert_eq!(customer.email(), "ops@acme.example");
        assert_eq!(customer.phone(), None);
        assert_eq!(customer.company(), Some("Acme BV"));
        assert_eq!(customer.tenant_id(), Some(tenant_id));
        assert_eq!(customer.version(), 1);
        assert!(customer.can_ship());
    }

    #[test]
    fn register_rejects_bad_email_and_duplicates() {
        let tenant_id = TenantId::new();
        let customer_id = CustomerId::new(AggregateId::new());
        let mut cmd = register_cmd(tenant_id, customer_id);
        cmd.email = "no-at-sign".to_string();
        let err = Customer::empty(customer_id)
            .handle(&CustomerCommand::RegisterCustomer(cmd))
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));

        let (customer, tenant_id, customer_id) = registered();
        let err = customer
            .handle(&CustomerCommand::RegisterCustomer(register_cmd(tenant_id, customer_id)))
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[test]
    fn update_keeps_unspecified_fields() {
        let (mut customer, tenant_id, customer_id) = registered();
        execute(
            &mut customer,
            &CustomerCommand::UpdateCustomer(UpdateCustomer {
                tenant_id,
                customer_id,
                name: None,
                email: None,
                phone: Some("+31 10 000 0000".to_string()),
                company: None,
                address: None,
                occurred_at: test_time(),
            }),
        )
        .unwrap();

        assert_eq!(customer.name(), "Acme Freight");
        assert_eq!(customer.phone(), Some("+31 10 000 0000"));
        assert_eq!(customer.version(), 2);
    }

    #[test]
    fn suspend_and_reactivate_round_trip_the_status() {
        let (mut customer, tenant_id, customer_id) = registered();
        let suspend = CustomerCommand::SuspendCustomer(SuspendCustomer {
            tenant_id,
            customer_id,
            reason: Some("unpaid invoices".to_string()),
            occurred_at: test_time(),
        });
        execute(&mut customer, &suspend).unwrap();
        assert!(!customer.can_ship());

        let err = customer.handle(&suspend).unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));

        execute(
            &mut customer,
            &CustomerCommand::ReactivateCustomer(ReactivateCustomer {
                tenant_id,
                customer_id,
                occurred_at: test_time(),
            }),
        )
        .unwrap();
        assert_eq!(customer.status(), CustomerStatus::Active);
    }

    #[test]
    fn commands_on_missing_customer_are_not_found() {
        let customer_id = CustomerId::new(AggregateId::new());
        let err = Customer::empty(customer_id)
            .handle(&CustomerCommand::ReactivateCustomer(ReactivateCustomer {
                tenant_id: TenantId::new(),
                customer_id,
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert_eq!(err, DomainError::NotFound);
    }

    #[test]
    fn other_tenants_cannot_touch_the_customer() {
        let (customer, _, customer_id) = registered();
        let err = customer
            .handle(&CustomerCommand::SuspendCustomer(SuspendCustomer {
                tenant_id: TenantId::new(),
                customer_id,
                reason: None,
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
    }
}
