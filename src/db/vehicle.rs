use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VehicleKind {
    Gas,
    Electric,
}

impl VehicleKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            VehicleKind::Gas => "gas",
            VehicleKind::Electric => "electric",
        }
    }
}

impl Display for VehicleKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for VehicleKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "gas" => Ok(VehicleKind::Gas),
            "electric" => Ok(VehicleKind::Electric),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VehicleStatus {
    #[default]
    Available,
    Sold,
    Reserved,
}

impl VehicleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VehicleStatus::Available => "available",
            VehicleStatus::Sold => "sold",
            VehicleStatus::Reserved => "reserved",
        }
    }
}

impl Display for VehicleStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for VehicleStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "available" => Ok(VehicleStatus::Available),
            "sold" => Ok(VehicleStatus::Sold),
            "reserved" => Ok(VehicleStatus::Reserved),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GasSpecs {
    pub mileage: f64,
    pub engine: f64,
    pub cylinders: u32,
    pub gearbox: String,
    pub transmission: String,
    pub body: String,
    pub drivetrain: String,
    pub technology: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElectricSpecs {
    pub trim_line: String,
    pub range: f64,
    pub range_description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum VehicleSpecs {
    Gas(GasSpecs),
    Electric(ElectricSpecs),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vehicle {
    pub id: Uuid,
    pub title: String,
    pub brand: String,
    pub model: String,
    pub year: i32,
    pub price: f64,
    pub price_str: String,
    #[serde(default)]
    pub status: VehicleStatus,
    #[serde(default)]
    pub views: u64,
    #[serde(default)]
    pub images: Vec<String>,
    pub colour: String,
    pub interior: String,
    pub wheel: String,
    pub description: String,
    pub safety: String,
    pub top_speed: f64,
    pub time60: f64,
    #[serde(default)]
    pub trim: Option<String>,
    #[serde(default)]
    pub stock_number: Option<String>,
    #[serde(default)]
    pub vin: Option<String>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub specs: VehicleSpecs,
}

impl Vehicle {
    pub fn kind(&self) -> VehicleKind {
        match self.specs {
            VehicleSpecs::Gas(_) => VehicleKind::Gas,
            VehicleSpecs::Electric(_) => VehicleKind::Electric,
        }
    }

    pub fn is_available(&self) -> bool {
        self.status == VehicleStatus::Available
    }

    pub fn mileage(&self) -> Option<f64> {
        match &self.specs {
            VehicleSpecs::Gas(gas) => Some(gas.mileage),
            VehicleSpecs::Electric(_) => None,
        }
    }

    pub fn range(&self) -> Option<f64> {
        match &self.specs {
            VehicleSpecs::Gas(_) => None,
            VehicleSpecs::Electric(electric) => Some(electric.range),
        }
    }

    pub fn transmission(&self) -> Option<&str> {
        match &self.specs {
            VehicleSpecs::Gas(gas) => Some(gas.transmission.as_str()),
            VehicleSpecs::Electric(_) => None,
        }
    }

    pub fn body(&self) -> Option<&str> {
        match &self.specs {
            VehicleSpecs::Gas(gas) => Some(gas.body.as_str()),
            VehicleSpecs::Electric(_) => None,
        }
    }

    /// "2021 Ford Mustang"
    pub fn display_name(&self) -> String {
        format!("{} {} {}", self.year, self.brand, self.model)
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_follows_specs() {
        let car = fixtures::gas("Ford", "Focus", 2020, 15000.0);
        assert_eq!(car.kind(), VehicleKind::Gas);
        assert_eq!(car.mileage(), Some(30000.0));
        assert_eq!(car.range(), None);

        let ev = fixtures::electric("Tesla", "Model 3", 2022, 40000.0, 358.0);
        assert_eq!(ev.kind(), VehicleKind::Electric);
        assert_eq!(ev.range(), Some(358.0));
        assert_eq!(ev.transmission(), None);
    }

    #[test]
    fn serializes_kind_tag_flat() {
        let ev = fixtures::electric("Tesla", "Model Y", 2023, 45000.0, 330.0);
        let value = serde_json::to_value(&ev).expect("Failed to serialize");
        assert_eq!(value["kind"], "electric");
        assert_eq!(value["range"], 330.0);
        assert_eq!(value["priceStr"], "$45000");
        let back: Vehicle = serde_json::from_value(value).expect("Failed to deserialize");
        assert_eq!(back, ev);
    }

    #[test]
    fn status_parsing() {
        assert_eq!("Sold".parse::<VehicleStatus>(), Ok(VehicleStatus::Sold));
        assert!("gone".parse::<VehicleStatus>().is_err());
        assert_eq!(VehicleStatus::default(), VehicleStatus::Available);
    }
}
