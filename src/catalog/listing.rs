use crate::catalog::facets::{self, FacetOptions, ModelsByBrand};
use crate::catalog::filter::FilterQuery;
use crate::catalog::pagination::{PageWindow, PaginationMeta};
use crate::catalog::sort::SortOrder;
use crate::catalog::{Audience, QueryParams};
use crate::db::traits::VehicleStore;
use crate::db::vehicle::{Vehicle, VehicleKind};
use crate::db::vehicle_filter::VehicleFilter;
use crate::db::DatabaseError;
use serde::Serialize;
use tracing::{error, warn};

pub const FALLBACK_WARNING: &str =
    "We couldn't apply your filters right now, so all vehicles are shown instead.";
pub const FACETS_WARNING: &str = "Filter options are temporarily unavailable.";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingPage {
    pub kind: VehicleKind,
    pub vehicles: Vec<Vehicle>,
    pub pagination: PaginationMeta,
    pub facets: FacetOptions,
    pub models_by_brand: ModelsByBrand,
    pub applied_filters: QueryParams,
    pub sort: SortOrder,
    pub result_count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

struct Page {
    vehicles: Vec<Vehicle>,
    pagination: PaginationMeta,
    sort: SortOrder,
}

async fn fetch_page(
    store: &dyn VehicleStore,
    filter: &VehicleFilter,
    sort: SortOrder,
    window: PageWindow,
) -> Result<Page, DatabaseError> {
    let (total, vehicles) = tokio::try_join!(
        store.count_vehicles(filter),
        store.find_vehicles(filter, sort, window.skip(), window.size),
    )?;
    Ok(Page {
        vehicles,
        pagination: window.meta(total),
        sort,
    })
}

/// One catalog page for `kind`. A failing filtered query is retried once
/// without filters; only a failing retry is an error.
pub async fn list_vehicles(
    store: &dyn VehicleStore,
    kind: VehicleKind,
    audience: Audience,
    params: QueryParams,
    current_year: i32,
) -> Result<ListingPage, DatabaseError> {
    let query = FilterQuery::from_params(&params, kind, audience, current_year);
    let sort = SortOrder::resolve(&params, kind, query.implied_sort);
    let window = PageWindow::from_params(&params);

    let (primary, facets) = tokio::join!(
        fetch_page(store, &query.filter, sort, window),
        facets::aggregate(store, kind, current_year),
    );

    let mut warnings = vec![];
    let page = match primary {
        Ok(page) => page,
        Err(err) => {
            warn!("{kind} listing query failed, retrying without filters: {err}");
            let fallback = VehicleFilter::scope(kind, audience.default_status());
            let page = fetch_page(store, &fallback, SortOrder::default(), PageWindow::default())
                .await
                .map_err(|err| {
                    error!("{kind} fallback listing query failed: {err}");
                    err
                })?;
            warnings.push(FALLBACK_WARNING);
            page
        }
    };
    let (facets, models_by_brand) = match facets {
        Ok(facets) => facets,
        Err(err) => {
            warn!("{kind} facet queries failed: {err}");
            warnings.push(FACETS_WARNING);
            (FacetOptions::defaults(current_year), ModelsByBrand::new())
        }
    };

    Ok(ListingPage {
        kind,
        result_count: page.pagination.total_count,
        vehicles: page.vehicles,
        pagination: page.pagination,
        facets,
        models_by_brand,
        applied_filters: params,
        sort: page.sort,
        warning: (!warnings.is_empty()).then(|| warnings.join(" ")),
    })
}


#[cfg(test)]
mod tests {
    use super::test_stores::FlakyStore;
    use super::*;
    use crate::db::in_memory::InMemoryDB;
    use crate::db::vehicle::{fixtures, VehicleStatus};
    use crate::db::Database;
    use chrono::Duration;

    const YEAR: i32 = 2025;

    fn store(vehicles: Vec<Vehicle>) -> Database {
        Database::InMemory(Box::new(InMemoryDB::with_vehicles(vehicles)))
    }

    fn fords() -> Vec<Vehicle> {
        [15000.0, 22000.0, 25000.0, 38000.0, 50000.0]
            .into_iter()
            .map(|price| fixtures::gas("Ford", "F-150", 2020, price))
            .collect()
    }

    fn thirty() -> Vec<Vehicle> {
        let base = fixtures::gas("Honda", "Civic", 2020, 20000.0).created_at;
        (0..30)
            .map(|i| {
                let mut car = fixtures::gas("Honda", &format!("Civic {i}"), 2020, 20000.0 + i as f64);
                car.created_at = base + Duration::hours(i);
                car
            })
            .collect()
    }

    async fn list(store: &dyn VehicleStore, pairs: &[(&str, &str)]) -> ListingPage {
        list_vehicles(
            store,
            VehicleKind::Gas,
            Audience::Public,
            QueryParams::from_pairs(pairs),
            YEAR,
        )
        .await
        .expect("Failed to list vehicles")
    }

    #[tokio::test]
    async fn brand_price_window_sorted_ascending() {
        let db = store(fords());
        let page = list(
            &db,
            &[
                ("brand", "Ford"),
                ("minPrice", "20000"),
                ("maxPrice", "40000"),
                ("sort", "price-asc"),
            ],
        )
        .await;
        let prices: Vec<f64> = page.vehicles.iter().map(|vehicle| vehicle.price).collect();
        assert_eq!(prices, vec![22000.0, 25000.0, 38000.0]);
        assert_eq!(page.result_count, 3);
        assert!(page.warning.is_none());
    }

    #[tokio::test]
    async fn third_page_holds_last_six() {
        let db = store(thirty());
        let page = list(&db, &[("page", "3"), ("limit", "12"), ("sort", "date-asc")]).await;
        assert_eq!(page.vehicles.len(), 6);
        let models: Vec<&str> = page.vehicles.iter().map(|v| v.model.as_str()).collect();
        assert_eq!(models.first(), Some(&"Civic 24"));
        assert_eq!(models.last(), Some(&"Civic 29"));
        assert_eq!(page.pagination.total, 3);
        assert!(!page.pagination.has_next);
        assert!(page.pagination.has_prev);
        assert_eq!(page.pagination.total_count, 30);
    }

    #[tokio::test]
    async fn repeated_requests_are_identical() {
        let db = store(thirty());
        let pairs = [("page", "2"), ("limit", "5"), ("sort", "price-desc")];
        let first = list(&db, &pairs).await;
        let second = list(&db, &pairs).await;
        assert_eq!(first.vehicles, second.vehicles);
        assert_eq!(first.pagination, second.pagination);
    }

    #[tokio::test]
    async fn public_listing_hides_unavailable() {
        let mut sold = fixtures::gas("Ford", "GT", 2022, 90000.0);
        sold.status = VehicleStatus::Sold;
        let db = store(vec![sold, fixtures::gas("Ford", "Focus", 2019, 12000.0)]);
        let page = list(&db, &[]).await;
        assert_eq!(page.result_count, 1);
        assert!(page.vehicles.iter().all(Vehicle::is_available));
    }

    #[tokio::test]
    async fn failing_filtered_query_falls_back_with_warning() {
        let mut db = FlakyStore::new(store(fords()));
        db.fail_filtered = true;
        let page = list(&db, &[("brand", "Ford"), ("page", "2"), ("limit", "2")]).await;
        assert_eq!(page.warning.as_deref(), Some(FALLBACK_WARNING));
        assert_eq!(page.pagination.current, 1);
        assert_eq!(page.result_count, 5);
        assert_eq!(page.sort, SortOrder::default());
    }

    #[tokio::test]
    async fn failing_fallback_is_an_error() {
        let mut db = FlakyStore::new(store(fords()));
        db.fail_all_finds = true;
        let result = list_vehicles(
            &db,
            VehicleKind::Gas,
            Audience::Public,
            QueryParams::default(),
            YEAR,
        )
        .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn failing_facets_use_defaults() {
        let mut db = FlakyStore::new(store(fords()));
        db.fail_facets = true;
        let page = list(&db, &[]).await;
        assert_eq!(page.vehicles.len(), 5);
        assert_eq!(page.facets, FacetOptions::defaults(YEAR));
        assert_eq!(page.warning.as_deref(), Some(FACETS_WARNING));
    }

    #[tokio::test]
    async fn facets_ignore_applied_filters() {
        let db = store(vec![
            fixtures::gas("Ford", "Focus", 2019, 12000.0),
            fixtures::gas("BMW", "X5", 2021, 52000.0),
        ]);
        let page = list(&db, &[("brand", "BMW")]).await;
        assert_eq!(page.result_count, 1);
        assert_eq!(page.facets.brands, vec!["BMW", "Ford"]);
    }
}
