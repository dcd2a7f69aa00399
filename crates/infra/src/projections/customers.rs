use cargohub_core::{AggregateId, TenantId};
use cargohub_customers::{Customer, CustomerId, CustomerStatus};

use crate::projections::view::AggregateView;
use crate::read_model::{InMemoryTenantStore, TenantStore};

pub type CustomersView<S = InMemoryTenantStore<AggregateId, Customer>> = AggregateView<Customer, S>;

impl<S> AggregateView<Customer, S>
where
    S: TenantStore<AggregateId, Customer>,
{
    /// Customers sorted by name; `status` narrows the result when set.
    pub fn directory(&self, tenant_id: TenantId, status: Option<CustomerStatus>) -> Vec<Customer> {
        let mut customers = self.filter(tenant_id, |c| status.is_none_or(|s| c.status() == s));
        customers.sort_by(|a, b| a.name().cmp(b.name()));
        customers
    }

    /// Whether new shipments may be booked for this customer.
    pub fn can_ship(&self, tenant_id: TenantId, customer_id: CustomerId) -> bool {
        self.get(tenant_id, customer_id.0)
            .is_some_and(|c| c.can_ship())
    }
}
