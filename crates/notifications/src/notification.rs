use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use cargohub_core::{Aggregate, AggregateId, AggregateRoot, DomainError, TenantId};
use cargohub_customers::CustomerId;
use cargohub_events::Event;
use cargohub_shipments::ShipmentId;

/// Notification identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NotificationId(pub AggregateId);

impl NotificationId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for NotificationId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationChannel {
    Email,
    Sms,
    InApp,
}

/// Aggregate root: Notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    id: NotificationId,
    tenant_id: Option<TenantId>,
    customer_id: Option<CustomerId>,
    channel: NotificationChannel,
    kind: String,
    title: String,
    message: String,
    shipment_id: Option<ShipmentId>,
    sent_at: Option<DateTime<Utc>>,
    read_at: Option<DateTime<Utc>>,
    version: u64,
    created: bool,
}

impl Notification {
    pub fn empty(id: NotificationId) -> Self {
        Self {
            id,
            tenant_id: None,
            customer_id: None,
            channel: NotificationChannel::InApp,
            kind: String::new(),
            title: String::new(),
            message: String::new(),
            shipment_id: None,
            sent_at: None,
            read_at: None,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> NotificationId {
        self.id
    }

    pub fn tenant_id(&self) -> Option<TenantId> {
        self.tenant_id
    }

    pub fn customer_id(&self) -> Option<CustomerId> {
        self.customer_id
    }

    pub fn channel(&self) -> NotificationChannel {
        self.channel
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn shipment_id(&self) -> Option<ShipmentId> {
        self.shipment_id
    }

    pub fn sent_at(&self) -> Option<DateTime<Utc>> {
        self.sent_at
    }

    pub fn read_at(&self) -> Option<DateTime<Utc>> {
        self.read_at
    }

    pub fn is_read(&self) -> bool {
        self.read_at.is_some()
    }
}

impl AggregateRoot for Notification {
    type Id = NotificationId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: SendNotification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendNotification {
    pub tenant_id: TenantId,
    pub notification_id: NotificationId,
    pub customer_id: CustomerId,
    pub channel: NotificationChannel,
    /// Free-form topic, e.g. `shipment.status_changed`.
    pub kind: String,
    pub title: String,
    pub message: String,
    pub shipment_id: Option<ShipmentId>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: MarkNotificationRead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkNotificationRead {
    pub tenant_id: TenantId,
    pub notification_id: NotificationId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotificationCommand {
    SendNotification(SendNotification),
    MarkNotificationRead(MarkNotificationRead),
}

/// Event: NotificationSent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationSent {
    pub tenant_id: TenantId,
    pub notification_id: NotificationId,
    pub customer_id: CustomerId,
    pub channel: NotificationChannel,
    pub kind: String,
    pub title: String,
    pub message: String,
    pub shipment_id: Option<ShipmentId>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: NotificationRead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationRead {
    pub tenant_id: TenantId,
    pub notification_id: NotificationId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotificationEvent {
    NotificationSent(NotificationSent),
    NotificationRead(NotificationRead),
}

impl Event for NotificationEvent {
    fn event_type(&self) -> &'static str {
        match self {
            NotificationEvent::NotificationSent(_) => "notifications.notification.sent",
            NotificationEvent::NotificationRead(_) => "notifications.notification.read",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            NotificationEvent::NotificationSent(e) => e.occurred_at,
            NotificationEvent::NotificationRead(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Notification {
    type Command = NotificationCommand;
    type Event = NotificationEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            NotificationEvent::NotificationSent(e) => {
                self.id = e.notification_id;
                self.tenant_id = Some(e.tenant_id);
                self.customer_id = Some(e.customer_id);
                self.channel = e.channel;
                self.kind = e.kind.clone();
                self.title = e.title.clone();
                self.message = e.message.clone();
                self.shipment_id = e.shipment_id;
                self.sent_at = Some(e.occurred_at);
                self.created = true;
            }
            NotificationEvent::NotificationRead(e) => {
                self.read_at = Some(e.occurred_at);
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            NotificationCommand::SendNotification(cmd) => self.handle_send(cmd),
            NotificationCommand::MarkNotificationRead(cmd) => self.handle_mark_read(cmd),
        }
    }
}

impl Notification {
    fn handle_send(&self, cmd: &SendNotification) -> Result<Vec<NotificationEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("notification already sent"));
        }
        let title = cmd.title.trim();
        let message = cmd.message.trim();
        if title.is_empty() || message.is_empty() {
            return Err(DomainError::validation(
                "notification title and message cannot be empty",
            ));
        }
        let kind = match cmd.kind.trim() {
            "" => "general".to_string(),
            k => k.to_string(),
        };

        Ok(vec![NotificationEvent::NotificationSent(NotificationSent {
            tenant_id: cmd.tenant_id,
            notification_id: cmd.notification_id,
            customer_id: cmd.customer_id,
            channel: cmd.channel,
            kind,
            title: title.to_string(),
            message: message.to_string(),
            shipment_id: cmd.shipment_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_mark_read(
        &self,
        cmd: &MarkNotificationRead,
    ) -> Result<Vec<NotificationEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        if self.tenant_id != Some(cmd.tenant_id) {
            return Err(DomainError::invariant("tenant mismatch"));
        }
        if self.id != cmd.notification_id {
            return Err(DomainError::invariant("notification_id mismatch"));
        }
        if self.is_read() {
            return Err(DomainError::conflict("notification already read"));
        }

        Ok(vec![NotificationEvent::NotificationRead(NotificationRead {
            tenant_id: cmd.tenant_id,
            notification_id: cmd.notification_id,
            occurred_at: cmd.occurred_at,
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn send_cmd(tenant_id: TenantId, notification_id: NotificationId) -> SendNotification {
        SendNotification {
            tenant_id,
            notification_id,
            customer_id: CustomerId::new(AggregateId::new()),
            channel: NotificationChannel::Email,
            kind: "shipment.status_changed".to_string(),
            title: "Your parcel is on its way".to_string(),
            message: "Shipment CH0000000001 is in transit".to_string(),
            shipment_id: None,
            occurred_at: Utc::now(),
        }
    }

    #[test]
    fn send_then_mark_read_once() {
        let tenant_id = TenantId::new();
        let notification_id = NotificationId::new(AggregateId::new());
        let mut notification = Notification::empty(notification_id);

        let events = notification
            .handle(&NotificationCommand::SendNotification(send_cmd(
                tenant_id,
                notification_id,
            )))
            .unwrap();
        notification.apply(&events[0]);
        assert!(!notification.is_read());

        let read = NotificationCommand::MarkNotificationRead(MarkNotificationRead {
            tenant_id,
            notification_id,
            occurred_at: Utc::now(),
        });
        let events = notification.handle(&read).unwrap();
        notification.apply(&events[0]);
        assert!(notification.read_at().is_some());

        assert!(matches!(notification.handle(&read), Err(DomainError::Conflict(_))));
    }

    #[test]
    fn empty_title_is_rejected() {
        let notification_id = NotificationId::new(AggregateId::new());
        let mut cmd = send_cmd(TenantId::new(), notification_id);
        cmd.title = "   ".to_string();
        let err = Notification::empty(notification_id)
            .handle(&NotificationCommand::SendNotification(cmd))
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn sending_twice_is_a_conflict() {
        let tenant_id = TenantId::new();
        let notification_id = NotificationId::new(AggregateId::new());
        let mut notification = Notification::empty(notification_id);
        let cmd = NotificationCommand::SendNotification(send_cmd(tenant_id, notification_id));
        let events = notification.handle(&cmd).unwrap();
        notification.apply(&events[0]);

        assert!(matches!(notification.handle(&cmd), Err(DomainError::Conflict(_))));
    }
}
