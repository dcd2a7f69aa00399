use cargohub_core::{AggregateId, TenantId};
use cargohub_support::{SupportTicket, TicketStatus};

use crate::projections::view::AggregateView;
use crate::read_model::{InMemoryTenantStore, TenantStore};

pub type TicketsView<S = InMemoryTenantStore<AggregateId, SupportTicket>> = AggregateView<SupportTicket, S>;

impl<S> AggregateView<SupportTicket, S>
where
    S: TenantStore<AggregateId, SupportTicket>,
{
    /// Tickets by reference, optionally narrowed to one status.
    pub fn queue(&self, tenant_id: TenantId, status: Option<TicketStatus>) -> Vec<SupportTicket> {
        let mut tickets = self.filter(tenant_id, |t| status.is_none_or(|s| t.status() == s));
        tickets.sort_by(|a, b| a.reference().cmp(b.reference()));
        tickets
    }
}
