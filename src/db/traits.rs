use crate::catalog::sort::SortOrder;
use crate::db::errors::DBError;
use crate::db::vehicle::{Vehicle, VehicleKind};
use crate::db::vehicle_filter::{FacetField, PriceYearBounds, VehicleFilter};
use async_trait::async_trait;
use uuid::Uuid;

/// Free text typed by visitors.
pub trait ExternalText {
    fn cleaned(&self) -> Self;

    fn clean(&self, value: &str) -> String {
        value.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    fn clean_optional(&self, value: &Option<String>) -> Option<String> {
        value
            .as_deref()
            .map(|value| self.clean(value))
            .filter(|value| !value.is_empty())
    }
}

/// Vehicle inventory operations the catalog and the back-office need.
#[async_trait]
pub trait VehicleStore: Send + Sync {
    async fn find_vehicles(
        &self,
        filter: &VehicleFilter,
        sort: SortOrder,
        skip: u64,
        limit: u64,
    ) -> Result<Vec<Vehicle>, DBError>;

    async fn count_vehicles(&self, filter: &VehicleFilter) -> Result<u64, DBError>;

    /// Sorted, non-empty distinct values of `field` among matching vehicles.
    async fn distinct_values(
        &self,
        field: FacetField,
        filter: &VehicleFilter,
    ) -> Result<Vec<String>, DBError>;

    /// `None` when nothing matches.
    async fn price_year_bounds(
        &self,
        filter: &VehicleFilter,
    ) -> Result<Option<PriceYearBounds>, DBError>;

    /// Increments the view counter and returns the updated vehicle in one step.
    async fn view_vehicle(&self, kind: VehicleKind, id: Uuid) -> Result<Option<Vehicle>, DBError>;

    async fn get_vehicle(&self, kind: VehicleKind, id: Uuid) -> Result<Option<Vehicle>, DBError>;

    async fn insert_vehicle(&self, vehicle: Vehicle) -> Result<Vehicle, DBError>;

    /// `None` when no vehicle of that kind has the id.
    async fn replace_vehicle(&self, vehicle: Vehicle) -> Result<Option<Vehicle>, DBError>;

    async fn delete_vehicle(&self, kind: VehicleKind, id: Uuid) -> Result<bool, DBError>;
}
