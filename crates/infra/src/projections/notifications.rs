use cargohub_core::{AggregateId, TenantId};
use cargohub_customers::CustomerId;
use cargohub_notifications::Notification;

use crate::projections::view::AggregateView;
use crate::read_model::{InMemoryTenantStore, TenantStore};

pub type NotificationsView<S = InMemoryTenantStore<AggregateId, Notification>> =
    AggregateView<Notification, S>;

impl<S> AggregateView<Notification, S>
where
    S: TenantStore<AggregateId, Notification>,
{
    /// Newest first. `unread_only` drops notifications already read.
    pub fn inbox(
        &self,
        tenant_id: TenantId,
        customer_id: Option<CustomerId>,
        unread_only: bool,
    ) -> Vec<Notification> {
        let mut items = self.filter(tenant_id, |n| {
            customer_id.is_none_or(|c| n.customer_id() == Some(c)) && !(unread_only && n.is_read())
        });
        items.sort_by(|a, b| b.sent_at().cmp(&a.sent_at()));
        items
    }

    pub fn unread_count(&self, tenant_id: TenantId, customer_id: CustomerId) -> usize {
        self.inbox(tenant_id, Some(customer_id), true).len()
    }
}
