//! Shipment lifecycle → customer notification.
//!
//! Every shipment event produces one in-app notification for the shipment's
//! customer. The notification id is derived from the source stream position,
//! so a redelivered envelope hits an existing stream and is dropped as a
//! conflict instead of notifying twice.

use serde_json::Value as JsonValue;

use cargohub_core::{AggregateId, TenantId};
use cargohub_events::{EventBus, EventEnvelope};
use cargohub_notifications::{
    Notification, NotificationChannel, NotificationCommand, NotificationId, SendNotification,
};
use cargohub_shipments::{Shipment, ShipmentEvent};

use crate::command_dispatcher::{CommandDispatcher, DispatchError};
use crate::event_store::EventStore;
use crate::streams::StreamKind;

/// Build the notification command for one shipment envelope.
///
/// Returns `None` for envelopes of other aggregate types.
pub fn notification_for(
    envelope: &EventEnvelope<JsonValue>,
) -> Result<Option<SendNotification>, DispatchError> {
    if envelope.aggregate_type() != Shipment::AGGREGATE_TYPE {
        return Ok(None);
    }
    let event: ShipmentEvent = serde_json::from_value(envelope.payload().clone())
        .map_err(|e| DispatchError::Deserialize(e.to_string()))?;

    let tracking = event.shipment_id().tracking_number();
    let (kind, title, message, occurred_at) = match &event {
        ShipmentEvent::ShipmentCreated(e) => (
            "shipment.created",
            format!("Shipment {tracking} booked"),
            format!(
                "Your shipment {tracking} to {} has been booked.",
                e.delivery_address.city
            ),
            e.occurred_at,
        ),
        ShipmentEvent::ShipmentStatusUpdated(e) => {
            let location = e
                .entries
                .last()
                .map(|entry| entry.location.as_str())
                .unwrap_or_default();
            (
                "shipment.status_changed",
                format!("Shipment {tracking} is {}", e.status.as_str().replace('_', " ")),
                format!(
                    "Shipment {tracking} moved from {} to {} at {location}.",
                    e.from, e.status
                ),
                e.occurred_at,
            )
        }
        ShipmentEvent::ShipmentCancelled(e) => (
            "shipment.cancelled",
            format!("Shipment {tracking} cancelled"),
            format!("Shipment {tracking} was cancelled: {}", e.reason),
            e.occurred_at,
        ),
        ShipmentEvent::ShipmentReturned(e) => (
            "shipment.returned",
            format!("Shipment {tracking} returned"),
            format!("Shipment {tracking} is being returned: {}", e.reason),
            e.occurred_at,
        ),
    };

    Ok(Some(SendNotification {
        tenant_id: envelope.tenant_id(),
        notification_id: NotificationId::new(AggregateId::derived(
            envelope.aggregate_id(),
            envelope.sequence_number(),
        )),
        customer_id: event.customer_id(),
        channel: NotificationChannel::InApp,
        kind: kind.to_string(),
        title,
        message,
        shipment_id: Some(event.shipment_id()),
        occurred_at,
    }))
}

/// Dispatches shipment notifications through the command pipeline.
#[derive(Debug, Default, Clone, Copy)]
pub struct ShipmentNotifier;

impl ShipmentNotifier {
    /// React to one envelope. Returns the notification id when one was sent.
    pub fn react<S, B>(
        &self,
        dispatcher: &CommandDispatcher<S, B>,
        envelope: &EventEnvelope<JsonValue>,
    ) -> Result<Option<NotificationId>, DispatchError>
    where
        S: EventStore,
        B: EventBus<EventEnvelope<JsonValue>>,
    {
        let Some(cmd) = notification_for(envelope)? else {
            return Ok(None);
        };
        let tenant_id: TenantId = cmd.tenant_id;
        let notification_id = cmd.notification_id;

        match dispatcher.execute::<Notification>(
            tenant_id,
            notification_id.0,
            NotificationCommand::SendNotification(cmd),
        ) {
            Ok(_) => Ok(Some(notification_id)),
            Err(DispatchError::Concurrency(_)) => {
                tracing::debug!(
                    tenant_id = %tenant_id,
                    notification_id = %notification_id,
                    "notification already sent for this shipment event"
                );
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use cargohub_core::AggregateRoot;
    use cargohub_customers::CustomerId;
    use cargohub_shipments::{ShipmentId, ShipmentStatus};

    use super::*;
    use crate::projections::shipments::tests::{create, move_to};
    use crate::projections::test_support::{dispatcher, run};

    #[test]
    fn status_change_notifies_the_customer_once() {
        let d = dispatcher();
        let t = TenantId::new();
        let id = AggregateId::new();
        let customer = CustomerId::new(AggregateId::new());
        run::<Shipment>(&d, t, id, create(t, id, customer));
        let envs = run::<Shipment>(&d, t, id, move_to(t, id, ShipmentStatus::InTransit));

        let sent = ShipmentNotifier.react(&d, &envs[0]).unwrap().unwrap();
        assert_eq!(sent.0, AggregateId::derived(id, 2));
        assert_eq!(ShipmentNotifier.react(&d, &envs[0]).unwrap(), None);

        let notification = d.load::<Notification>(t, sent.0).unwrap();
        assert_eq!(notification.version(), 1);
        assert_eq!(notification.customer_id(), Some(customer));
        assert_eq!(notification.kind(), "shipment.status_changed");
        assert!(notification.title().contains(&ShipmentId::new(id).tracking_number()));
    }

    #[test]
    fn other_aggregates_are_ignored() {
        let env = EventEnvelope::new(
            uuid::Uuid::now_v7(),
            TenantId::new(),
            AggregateId::new(),
            "invoicing.invoice",
            1,
            serde_json::json!({}),
        );
        assert!(notification_for(&env).unwrap().is_none());
    }
}
