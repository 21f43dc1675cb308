use crate::catalog::sort::SortOrder;
use crate::db::traits::VehicleStore;
use crate::db::vehicle::{Vehicle, VehicleKind, VehicleSpecs, VehicleStatus};
use crate::db::vehicle_filter::{Bounds, Similarity, VehicleFilter};
use crate::db::DatabaseError;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::warn;
use uuid::Uuid;

pub const RELATED_LIMIT: u64 = 4;
pub const META_DESCRIPTION_CHARS: usize = 160;
const PRICE_BAND: f64 = 0.2;

#[derive(Debug, Clone, Serialize)]
pub struct PageMeta {
    pub title: String,
    pub description: String,
    pub keywords: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleDetail {
    pub vehicle: Vehicle,
    pub related: Vec<Vehicle>,
    pub structured_data: Value,
    pub meta: PageMeta,
}

impl PageMeta {
    fn of(vehicle: &Vehicle) -> Self {
        let description = vehicle
            .description
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");
        Self {
            title: format!("{} | {}", vehicle.display_name(), vehicle.price_str),
            description: description.chars().take(META_DESCRIPTION_CHARS).collect(),
            keywords: [
                vehicle.brand.as_str(),
                vehicle.model.as_str(),
                &vehicle.year.to_string(),
                vehicle.kind().as_str(),
                "car for sale",
            ]
            .join(", "),
        }
    }
}

/// schema.org `Car` markup for search engines.
fn structured_data(vehicle: &Vehicle) -> Value {
    let availability = match vehicle.status {
        VehicleStatus::Available => "https://schema.org/InStock",
        VehicleStatus::Reserved => "https://schema.org/LimitedAvailability",
        VehicleStatus::Sold => "https://schema.org/SoldOut",
    };
    let mut car = json!({
        "@context": "https://schema.org",
        "@type": "Car",
        "name": vehicle.title,
        "brand": { "@type": "Brand", "name": vehicle.brand },
        "model": vehicle.model,
        "vehicleModelDate": vehicle.year.to_string(),
        "color": vehicle.colour,
        "description": vehicle.description,
        "image": vehicle.images,
        "offers": {
            "@type": "Offer",
            "price": vehicle.price,
            "priceCurrency": "USD",
            "availability": availability,
        },
    });
    if let Some(vin) = &vehicle.vin {
        car["vehicleIdentificationNumber"] = json!(vin);
    }
    match &vehicle.specs {
        VehicleSpecs::Gas(gas) => {
            car["mileageFromOdometer"] = json!({
                "@type": "QuantitativeValue",
                "value": gas.mileage,
                "unitCode": "SMI",
            });
            car["vehicleTransmission"] = json!(gas.transmission);
            car["bodyType"] = json!(gas.body);
            car["driveWheelConfiguration"] = json!(gas.drivetrain);
        }
        VehicleSpecs::Electric(_) => {
            car["fuelType"] = json!("Electric");
        }
    }
    car
}

pub fn related_filter(vehicle: &Vehicle) -> VehicleFilter {
    VehicleFilter {
        exclude_id: Some(vehicle.id),
        similar_to: Some(Similarity {
            brand: vehicle.brand.clone(),
            price: Bounds::between(
                vehicle.price * (1.0 - PRICE_BAND),
                vehicle.price * (1.0 + PRICE_BAND),
            ),
        }),
        ..VehicleFilter::available(vehicle.kind())
    }
}

/// Detail page for one vehicle. Each call counts as a view. A malformed id
/// is treated like a missing vehicle.
pub async fn vehicle_detail(
    store: &dyn VehicleStore,
    kind: VehicleKind,
    raw_id: &str,
) -> Result<Option<VehicleDetail>, DatabaseError> {
    let Ok(id) = Uuid::parse_str(raw_id.trim()) else {
        return Ok(None);
    };
    let Some(vehicle) = store.view_vehicle(kind, id).await? else {
        return Ok(None);
    };

    let related = store
        .find_vehicles(&related_filter(&vehicle), SortOrder::default(), 0, RELATED_LIMIT)
        .await
        .unwrap_or_else(|err| {
            warn!("related vehicles for {id} unavailable: {err}");
            vec![]
        });

    Ok(Some(VehicleDetail {
        structured_data: structured_data(&vehicle),
        meta: PageMeta::of(&vehicle),
        related,
        vehicle,
    }))
}
