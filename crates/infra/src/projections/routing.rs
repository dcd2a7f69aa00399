use cargohub_core::{AggregateId, TenantId};
use cargohub_routing::{DeliveryRoute, Driver, DriverId, DriverStatus, RouteStatus};

use crate::projections::view::AggregateView;
use crate::read_model::{InMemoryTenantStore, TenantStore};

pub type DriversView<S = InMemoryTenantStore<AggregateId, Driver>> = AggregateView<Driver, S>;
pub type RoutesView<S = InMemoryTenantStore<AggregateId, DeliveryRoute>> = AggregateView<DeliveryRoute, S>;

impl<S> AggregateView<Driver, S>
where
    S: TenantStore<AggregateId, Driver>,
{
    pub fn roster(&self, tenant_id: TenantId, status: Option<DriverStatus>) -> Vec<Driver> {
        let mut drivers = self.filter(tenant_id, |d| status.is_none_or(|s| d.status() == s));
        drivers.sort_by(|a, b| a.name().cmp(b.name()));
        drivers
    }

    pub fn is_available(&self, tenant_id: TenantId, driver_id: DriverId) -> bool {
        self.get(tenant_id, driver_id.0)
            .is_some_and(|d| d.status() == DriverStatus::Available)
    }
}

impl<S> AggregateView<DeliveryRoute, S>
where
    S: TenantStore<AggregateId, DeliveryRoute>,
{
    /// Routes ordered by scheduled date, then route code.
    pub fn schedule(&self, tenant_id: TenantId, status: Option<RouteStatus>) -> Vec<DeliveryRoute> {
        let mut routes = self.filter(tenant_id, |r| status.is_none_or(|s| r.status() == s));
        routes.sort_by(|a, b| {
            a.scheduled_date()
                .cmp(&b.scheduled_date())
                .then_with(|| a.route_code().cmp(b.route_code()))
        });
        routes
    }

    pub fn for_driver(&self, tenant_id: TenantId, driver_id: DriverId) -> Vec<DeliveryRoute> {
        self.filter(tenant_id, |r| r.driver_id() == Some(driver_id))
    }
}
