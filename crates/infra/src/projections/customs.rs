use cargohub_core::{AggregateId, TenantId};
use cargohub_customs::{CustomsDeclaration, DeclarationStatus};
use cargohub_shipments::ShipmentId;

use crate::projections::view::AggregateView;
use crate::read_model::{InMemoryTenantStore, TenantStore};

pub type CustomsView<S = InMemoryTenantStore<AggregateId, CustomsDeclaration>> =
    AggregateView<CustomsDeclaration, S>;

impl<S> AggregateView<CustomsDeclaration, S>
where
    S: TenantStore<AggregateId, CustomsDeclaration>,
{
    pub fn declarations(
        &self,
        tenant_id: TenantId,
        status: Option<DeclarationStatus>,
    ) -> Vec<CustomsDeclaration> {
        let mut declarations = self.filter(tenant_id, |d| status.is_none_or(|s| d.status() == s));
        declarations.sort_by(|a, b| a.declaration_number().cmp(b.declaration_number()));
        declarations
    }

    pub fn for_shipment(&self, tenant_id: TenantId, shipment_id: ShipmentId) -> Vec<CustomsDeclaration> {
        self.filter(tenant_id, |d| d.shipment_id() == Some(shipment_id))
    }
}
