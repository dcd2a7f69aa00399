use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use cargohub_core::{Aggregate, AggregateId, AggregateRoot, DomainError, TenantId};
use cargohub_customers::CustomerId;
use cargohub_events::Event;
use cargohub_shipments::ShipmentId;

/// Support ticket identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TicketId(pub AggregateId);

impl TicketId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }

    pub fn reference(&self) -> String {
        self.0.reference_code("TCK-", 8)
    }
}

impl core::fmt::Display for TicketId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TicketPriority {
    Low,
    Medium,
    High,
    Urgent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    Open,
    InProgress,
    Resolved,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageAuthor {
    Customer,
    Staff,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketMessage {
    pub author: MessageAuthor,
    pub author_name: String,
    pub body: String,
    pub at: DateTime<Utc>,
}

/// Aggregate root: SupportTicket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupportTicket {
    id: TicketId,
    tenant_id: Option<TenantId>,
    reference: String,
    customer_id: Option<CustomerId>,
    shipment_id: Option<ShipmentId>,
    subject: String,
    description: String,
    priority: TicketPriority,
    status: TicketStatus,
    assignee: Option<String>,
    resolution: Option<String>,
    messages: Vec<TicketMessage>,
    version: u64,
    created: bool,
}

impl SupportTicket {
    pub fn empty(id: TicketId) -> Self {
        Self {
            id,
            tenant_id: None,
            reference: String::new(),
            customer_id: None,
            shipment_id: None,
            subject: String::new(),
            description: String::new(),
            priority: TicketPriority::Medium,
            status: TicketStatus::Open,
            assignee: None,
            resolution: None,
            messages: Vec::new(),
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> TicketId {
        self.id
    }

    pub fn tenant_id(&self) -> Option<TenantId> {
        self.tenant_id
    }

    pub fn reference(&self) -> &str {
        &self.reference
    }

    pub fn customer_id(&self) -> Option<CustomerId> {
        self.customer_id
    }

    pub fn shipment_id(&self) -> Option<ShipmentId> {
        self.shipment_id
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn priority(&self) -> TicketPriority {
        self.priority
    }

    pub fn status(&self) -> TicketStatus {
        self.status
    }

    pub fn assignee(&self) -> Option<&str> {
        self.assignee.as_deref()
    }

    pub fn resolution(&self) -> Option<&str> {
        self.resolution.as_deref()
    }

    pub fn messages(&self) -> &[TicketMessage] {
        &self.messages
    }
}

impl AggregateRoot for SupportTicket {
    type Id = TicketId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenTicket {
    pub tenant_id: TenantId,
    pub ticket_id: TicketId,
    pub customer_id: CustomerId,
    pub shipment_id: Option<ShipmentId>,
    pub subject: String,
    pub description: String,
    pub priority: TicketPriority,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignTicket {
    pub tenant_id: TenantId,
    pub ticket_id: TicketId,
    pub assignee: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyToTicket {
    pub tenant_id: TenantId,
    pub ticket_id: TicketId,
    pub author: MessageAuthor,
    pub author_name: String,
    pub body: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeTicketPriority {
    pub tenant_id: TenantId,
    pub ticket_id: TicketId,
    pub priority: TicketPriority,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolveTicket {
    pub tenant_id: TenantId,
    pub ticket_id: TicketId,
    pub resolution: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloseTicket {
    pub tenant_id: TenantId,
    pub ticket_id: TicketId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TicketCommand {
    OpenTicket(OpenTicket),
    AssignTicket(AssignTicket),
    ReplyToTicket(ReplyToTicket),
    ChangeTicketPriority(ChangeTicketPriority),
    ResolveTicket(ResolveTicket),
    CloseTicket(CloseTicket),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketOpened {
    pub tenant_id: TenantId,
    pub ticket_id: TicketId,
    pub reference: String,
    pub customer_id: CustomerId,
    pub shipment_id: Option<ShipmentId>,
    pub subject: String,
    pub description: String,
    pub priority: TicketPriority,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketAssigned {
    pub tenant_id: TenantId,
    pub ticket_id: TicketId,
    pub assignee: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketReplied {
    pub tenant_id: TenantId,
    pub ticket_id: TicketId,
    pub message: TicketMessage,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketReopened {
    pub tenant_id: TenantId,
    pub ticket_id: TicketId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketPriorityChanged {
    pub tenant_id: TenantId,
    pub ticket_id: TicketId,
    pub from: TicketPriority,
    pub to: TicketPriority,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketResolved {
    pub tenant_id: TenantId,
    pub ticket_id: TicketId,
    pub resolution: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketClosed {
    pub tenant_id: TenantId,
    pub ticket_id: TicketId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TicketEvent {
    TicketOpened(TicketOpened),
    TicketAssigned(TicketAssigned),
    TicketReplied(TicketReplied),
    TicketReopened(TicketReopened),
    TicketPriorityChanged(TicketPriorityChanged),
    TicketResolved(TicketResolved),
    TicketClosed(TicketClosed),
}

impl Event for TicketEvent {
    fn event_type(&self) -> &'static str {
        match self {
            TicketEvent::TicketOpened(_) => "support.ticket.opened",
            TicketEvent::TicketAssigned(_) => "support.ticket.assigned",
            TicketEvent::TicketReplied(_) => "support.ticket.replied",
            TicketEvent::TicketReopened(_) => "support.ticket.reopened",
            TicketEvent::TicketPriorityChanged(_) => "support.ticket.priority_changed",
            TicketEvent::TicketResolved(_) => "support.ticket.resolved",
            TicketEvent::TicketClosed(_) => "support.ticket.closed",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            TicketEvent::TicketOpened(e) => e.occurred_at,
            TicketEvent::TicketAssigned(e) => e.occurred_at,
            TicketEvent::TicketReplied(e) => e.occurred_at,
            TicketEvent::TicketReopened(e) => e.occurred_at,
            TicketEvent::TicketPriorityChanged(e) => e.occurred_at,
            TicketEvent::TicketResolved(e) => e.occurred_at,
            TicketEvent::TicketClosed(e) => e.occurred_at,
        }
    }
}

impl Aggregate for SupportTicket {
    type Command = TicketCommand;
    type Event = TicketEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            TicketEvent::TicketOpened(e) => {
                self.id = e.ticket_id;
                self.tenant_id = Some(e.tenant_id);
                self.reference = e.reference.clone();
                self.customer_id = Some(e.customer_id);
                self.shipment_id = e.shipment_id;
                self.subject = e.subject.clone();
                self.description = e.description.clone();
                self.priority = e.priority;
                self.status = TicketStatus::Open;
                self.created = true;
            }
            TicketEvent::TicketAssigned(e) => {
                self.assignee = Some(e.assignee.clone());
                if self.status == TicketStatus::Open {
                    self.status = TicketStatus::InProgress;
                }
            }
            TicketEvent::TicketReplied(e) => self.messages.push(e.message.clone()),
            TicketEvent::TicketReopened(_) => {
                self.status = TicketStatus::Open;
                self.resolution = None;
            }
            TicketEvent::TicketPriorityChanged(e) => self.priority = e.to,
            TicketEvent::TicketResolved(e) => {
                self.status = TicketStatus::Resolved;
                self.resolution = Some(e.resolution.clone());
            }
            TicketEvent::TicketClosed(_) => self.status = TicketStatus::Closed,
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            TicketCommand::OpenTicket(cmd) => self.handle_open(cmd),
            TicketCommand::AssignTicket(cmd) => self.handle_assign(cmd),
            TicketCommand::ReplyToTicket(cmd) => self.handle_reply(cmd),
            TicketCommand::ChangeTicketPriority(cmd) => self.handle_change_priority(cmd),
            TicketCommand::ResolveTicket(cmd) => self.handle_resolve(cmd),
            TicketCommand::CloseTicket(cmd) => self.handle_close(cmd),
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

impl SupportTicket {
    fn ensure_existing(&self, tenant_id: TenantId, ticket_id: TicketId) -> Result<(), DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        if self.tenant_id != Some(tenant_id) {
            return Err(DomainError::invariant("tenant mismatch"));
        }
        if self.id != ticket_id {
            return Err(DomainError::invariant("ticket_id mismatch"));
        }
        Ok(())
    }

    fn ensure_not_closed(&self) -> Result<(), DomainError> {
        if self.status == TicketStatus::Closed {
            return Err(DomainError::invariant("ticket is closed"));
        }
        Ok(())
    }

    fn handle_open(&self, cmd: &OpenTicket) -> Result<Vec<TicketEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("ticket already exists"));
        }
        Ok(vec![TicketEvent::TicketOpened(TicketOpened {
            tenant_id: cmd.tenant_id,
            ticket_id: cmd.ticket_id,
            reference: cmd.ticket_id.reference(),
            customer_id: cmd.customer_id,
            shipment_id: cmd.shipment_id,
            subject: required(&cmd.subject, "subject")?,
            description: required(&cmd.description, "description")?,
            priority: cmd.priority,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_assign(&self, cmd: &AssignTicket) -> Result<Vec<TicketEvent>, DomainError> {
        self.ensure_existing(cmd.tenant_id, cmd.ticket_id)?;
        if !matches!(self.status, TicketStatus::Open | TicketStatus::InProgress) {
            return Err(DomainError::invariant(
                "only open or in-progress tickets can be assigned",
            ));
        }
        let assignee = required(&cmd.assignee, "assignee")?;
        if self.assignee.as_deref() == Some(assignee.as_str()) {
            return Err(DomainError::conflict("ticket is already assigned to this person"));
        }
        Ok(vec![TicketEvent::TicketAssigned(TicketAssigned {
            tenant_id: cmd.tenant_id,
            ticket_id: cmd.ticket_id,
            assignee,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_reply(&self, cmd: &ReplyToTicket) -> Result<Vec<TicketEvent>, DomainError> {
        self.ensure_existing(cmd.tenant_id, cmd.ticket_id)?;
        self.ensure_not_closed()?;

        let mut events = vec![TicketEvent::TicketReplied(TicketReplied {
            tenant_id: cmd.tenant_id,
            ticket_id: cmd.ticket_id,
            message: TicketMessage {
                author: cmd.author,
                author_name: required(&cmd.author_name, "author name")?,
                body: required(&cmd.body, "message body")?,
                at: cmd.occurred_at,
            },
            occurred_at: cmd.occurred_at,
        })];

        // A customer answering a resolved ticket means it was not resolved.
        if cmd.author == MessageAuthor::Customer && self.status == TicketStatus::Resolved {
            events.push(TicketEvent::TicketReopened(TicketReopened {
                tenant_id: cmd.tenant_id,
                ticket_id: cmd.ticket_id,
                occurred_at: cmd.occurred_at,
            }));
        }

        Ok(events)
    }

    fn handle_change_priority(
        &self,
        cmd: &ChangeTicketPriority,
    ) -> Result<Vec<TicketEvent>, DomainError> {
        self.ensure_existing(cmd.tenant_id, cmd.ticket_id)?;
        self.ensure_not_closed()?;
        if cmd.priority == self.priority {
            return Err(DomainError::conflict("ticket already has this priority"));
        }
        Ok(vec![TicketEvent::TicketPriorityChanged(TicketPriorityChanged {
            tenant_id: cmd.tenant_id,
            ticket_id: cmd.ticket_id,
            from: self.priority,
            to: cmd.priority,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_resolve(&self, cmd: &ResolveTicket) -> Result<Vec<TicketEvent>, DomainError> {
        self.ensure_existing(cmd.tenant_id, cmd.ticket_id)?;
        if !matches!(self.status, TicketStatus::Open | TicketStatus::InProgress) {
            return Err(DomainError::invariant(
                "only open or in-progress tickets can be resolved",
            ));
        }
        Ok(vec![TicketEvent::TicketResolved(TicketResolved {
            tenant_id: cmd.tenant_id,
            ticket_id: cmd.ticket_id,
            resolution: required(&cmd.resolution, "resolution")?,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_close(&self, cmd: &CloseTicket) -> Result<Vec<TicketEvent>, DomainError> {
        self.ensure_existing(cmd.tenant_id, cmd.ticket_id)?;
        if self.status == TicketStatus::Closed {
            return Err(DomainError::conflict("ticket is already closed"));
        }
        Ok(vec![TicketEvent::TicketClosed(TicketClosed {
            tenant_id: cmd.tenant_id,
            ticket_id: cmd.ticket_id,
            occurred_at: cmd.occurred_at,
        })])
    }
}
