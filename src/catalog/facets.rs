use crate::catalog::filter::{canonical_body, MIN_YEAR};
use crate::db::traits::VehicleStore;
use crate::db::vehicle::VehicleKind;
use crate::db::vehicle_filter::{FacetField, VehicleFilter};
use crate::db::DatabaseError;
use futures::future::try_join_all;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

pub const DEFAULT_MIN_PRICE: f64 = 0.0;
pub const DEFAULT_MAX_PRICE: f64 = 1_000_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Range<T> {
    pub min: T,
    pub max: T,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FacetOptions {
    pub brands: Vec<String>,
    pub transmissions: Vec<String>,
    pub body_types: Vec<String>,
    pub colors: Vec<String>,
    pub price_range: Range<f64>,
    pub year_range: Range<i32>,
}

pub type ModelsByBrand = BTreeMap<String, Vec<String>>;

impl FacetOptions {
    pub fn defaults(current_year: i32) -> Self {
        Self {
            brands: vec![],
            transmissions: vec![],
            body_types: vec![],
            colors: vec![],
            price_range: Range {
                min: DEFAULT_MIN_PRICE,
                max: DEFAULT_MAX_PRICE,
            },
            year_range: Range {
                min: MIN_YEAR,
                max: current_year + 1,
            },
        }
    }
}

/// Option sets over the available inventory of `kind`, independent of any
/// filter the visitor applied.
pub async fn aggregate(
    store: &dyn VehicleStore,
    kind: VehicleKind,
    current_year: i32,
) -> Result<(FacetOptions, ModelsByBrand), DatabaseError> {
    let scope = VehicleFilter::available(kind);
    let (brands, transmissions, bodies, colors, bounds) = tokio::try_join!(
        store.distinct_values(FacetField::Brand, &scope),
        store.distinct_values(FacetField::Transmission, &scope),
        store.distinct_values(FacetField::Body, &scope),
        store.distinct_values(FacetField::Colour, &scope),
        store.price_year_bounds(&scope),
    )?;

    let models = try_join_all(brands.iter().map(|brand| {
        let filter = scope.clone().with_brand(brand);
        async move {
            let models = store.distinct_values(FacetField::Model, &filter).await?;
            Ok::<_, DatabaseError>((brand.clone(), models))
        }
    }))
    .await?;

    let body_types: BTreeSet<String> = bodies.iter().map(|body| canonical_body(body)).collect();
    let mut options = FacetOptions {
        brands,
        transmissions,
        body_types: body_types.into_iter().collect(),
        colors,
        ..FacetOptions::defaults(current_year)
    };
    if let Some(bounds) = bounds {
        options.price_range = Range {
            min: bounds.min_price,
            max: bounds.max_price,
        };
        options.year_range = Range {
            min: bounds.min_year,
            max: bounds.max_year,
        };
    }
    Ok((options, models.into_iter().collect()))
}
