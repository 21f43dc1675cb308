use crate::catalog::sort::SortOrder;
use crate::data_models::{BrandCount, HomeSummary};
use crate::db::traits::VehicleStore;
use crate::db::vehicle::VehicleStatus;
use crate::db::vehicle_filter::{FacetField, VehicleFilter};
use crate::db::DatabaseError;
use futures::future::try_join_all;
use std::collections::{BTreeMap, BTreeSet};

pub const LATEST_LIMIT: u64 = 6;

/// "bMW" -> "Bmw"
pub fn display_brand(raw: &str) -> String {
    let raw = raw.trim();
    let mut chars = raw.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// Brand counts, models and newest arrivals over the available inventory of
/// both kinds.
pub async fn home_summary(store: &dyn VehicleStore) -> Result<HomeSummary, DatabaseError> {
    let scope = VehicleFilter {
        status: Some(VehicleStatus::Available),
        ..Default::default()
    };
    let (brands, latest) = tokio::try_join!(
        store.distinct_values(FacetField::Brand, &scope),
        store.find_vehicles(&scope, SortOrder::default(), 0, LATEST_LIMIT),
    )?;

    let per_brand = try_join_all(brands.iter().map(|brand| {
        let filter = scope.clone().with_brand(brand);
        async move {
            let (count, models) = tokio::try_join!(
                store.count_vehicles(&filter),
                store.distinct_values(FacetField::Model, &filter),
            )?;
            Ok::<_, DatabaseError>((display_brand(brand), count, models))
        }
    }))
    .await?;

    let mut counts: BTreeMap<String, u64> = BTreeMap::new();
    let mut models: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for (brand, count, brand_models) in per_brand.into_iter().filter(|(b, _, _)| !b.is_empty()) {
        *counts.entry(brand.clone()).or_default() += count;
        models.entry(brand).or_default().extend(brand_models);
    }

    Ok(HomeSummary {
        brands: counts
            .into_iter()
            .map(|(name, count)| BrandCount { name, count })
            .collect(),
        models_by_brand: models
            .into_iter()
            .map(|(brand, models)| (brand, models.into_iter().collect()))
            .collect(),
        latest,
    })
}
