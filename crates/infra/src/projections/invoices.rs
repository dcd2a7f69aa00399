use chrono::{DateTime, Utc};

use cargohub_core::{AggregateId, TenantId};
use cargohub_customers::CustomerId;
use cargohub_invoicing::{Invoice, InvoiceStatus};

use crate::projections::view::AggregateView;
use crate::read_model::{InMemoryTenantStore, TenantStore};

pub type InvoicesView<S = InMemoryTenantStore<AggregateId, Invoice>> = AggregateView<Invoice, S>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InvoiceFilter {
    pub status: Option<InvoiceStatus>,
    pub customer_id: Option<CustomerId>,
}

impl<S> AggregateView<Invoice, S>
where
    S: TenantStore<AggregateId, Invoice>,
{
    /// Matching invoices ordered by invoice number.
    pub fn search(&self, tenant_id: TenantId, filter: InvoiceFilter) -> Vec<Invoice> {
        let mut invoices = self.filter(tenant_id, |inv| {
            filter.status.is_none_or(|s| inv.status() == s)
                && filter
                    .customer_id
                    .is_none_or(|c| inv.customer_id() == Some(c))
        });
        invoices.sort_by(|a, b| a.invoice_number().cmp(b.invoice_number()));
        invoices
    }

    /// Sum of outstanding amounts over a customer's open invoices.
    pub fn customer_balance(&self, tenant_id: TenantId, customer_id: CustomerId) -> u64 {
        self.filter(tenant_id, |inv| {
            inv.customer_id() == Some(customer_id) && inv.status() == InvoiceStatus::Open
        })
        .iter()
        .map(Invoice::outstanding_amount)
        .sum()
    }

    pub fn overdue(&self, tenant_id: TenantId, now: DateTime<Utc>) -> Vec<Invoice> {
        self.filter(tenant_id, |inv| inv.is_overdue(now))
    }
}
