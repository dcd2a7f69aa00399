use cargohub_core::{AggregateId, TenantId};
use cargohub_warehouses::{Warehouse, WarehouseId};

use crate::projections::view::AggregateView;
use crate::read_model::{InMemoryTenantStore, TenantStore};

pub type WarehousesView<S = InMemoryTenantStore<AggregateId, Warehouse>> = AggregateView<Warehouse, S>;

impl<S> AggregateView<Warehouse, S>
where
    S: TenantStore<AggregateId, Warehouse>,
{
    /// Warehouses ordered by code.
    pub fn by_code(&self, tenant_id: TenantId) -> Vec<Warehouse> {
        let mut warehouses = self.list(tenant_id);
        warehouses.sort_by(|a, b| {
            let code = |w: &Warehouse| w.code().map(|c| c.as_str().to_string()).unwrap_or_default();
            code(a).cmp(&code(b))
        });
        warehouses
    }

    pub fn is_active(&self, tenant_id: TenantId, warehouse_id: WarehouseId) -> bool {
        self.get(tenant_id, warehouse_id.0)
            .is_some_and(|w| w.is_active())
    }

    /// Location label for tracking entries: `CODE name`, if known.
    pub fn location_label(&self, tenant_id: TenantId, warehouse_id: WarehouseId) -> Option<String> {
        let warehouse = self.get(tenant_id, warehouse_id.0)?;
        let code = warehouse.code()?;
        Some(format!("{} {}", code.as_str(), warehouse.name()))
    }
}
