use crate::db::vehicle::{ElectricSpecs, GasSpecs};
use crate::db::{Vehicle, VehicleKind, VehicleSpecs, VehicleStatus};
use crate::leads::{FieldChecks, VIN};
use chrono::Utc;
use std::collections::BTreeMap;
use std::str::FromStr;
use uuid::Uuid;
use validator::{Validate, ValidationErrors};

const AMBIGUOUS_NUMBER: &str =
    "Ambiguous number: a single comma before three digits could be a thousands or a decimal separator";

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum NumberError {
    #[error("not a number")]
    Malformed,
    #[error("ambiguous separator")]
    AmbiguousSeparator,
}

/// Reads prices typed with either separator convention. When a value has
/// both `.` and `,`, the last one is the decimal separator. A repeated
/// separator groups thousands. A single comma followed by exactly three
/// digits ("32,500") is rejected as ambiguous. A single dot is a decimal point.
pub fn parse_locale_number(raw: &str) -> Result<f64, NumberError> {
    let compact: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    let (negative, body) = match compact.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, compact.strip_prefix('+').unwrap_or(&compact)),
    };

    let count = |separator: char| body.matches(separator).count();
    let (decimal, thousands) = match (body.rfind('.'), body.rfind(',')) {
        (Some(dot), Some(comma)) if dot > comma => (Some('.'), Some(',')),
        (Some(_), Some(_)) => (Some(','), Some('.')),
        (None, Some(comma)) if count(',') == 1 => {
            if body.len() - comma - 1 == 3 {
                return Err(NumberError::AmbiguousSeparator);
            }
            (Some(','), None)
        }
        (None, Some(_)) => (None, Some(',')),
        (Some(_), None) if count('.') == 1 => (Some('.'), None),
        (Some(_), None) => (None, Some('.')),
        (None, None) => (None, None),
    };

    let (whole, fraction) = match decimal {
        Some(separator) => body
            .rsplit_once(separator)
            .ok_or(NumberError::Malformed)?,
        None => (body, ""),
    };
    let all_digits = |part: &str| part.chars().all(|c| c.is_ascii_digit());
    if decimal.is_some() && (fraction.is_empty() || !all_digits(fraction)) {
        return Err(NumberError::Malformed);
    }
    let whole = match thousands {
        Some(separator) => {
            let mut groups = whole.split(separator);
            let lead = groups.next().unwrap_or_default();
            let lead_ok = (1..=3).contains(&lead.len()) && all_digits(lead);
            let rest: Vec<&str> = groups.collect();
            if !lead_ok || rest.iter().any(|group| group.len() != 3 || !all_digits(group)) {
                return Err(NumberError::Malformed);
            }
            std::iter::once(lead).chain(rest).collect::<String>()
        }
        None if all_digits(whole) => whole.to_string(),
        None => return Err(NumberError::Malformed),
    };
    if whole.is_empty() && fraction.is_empty() {
        return Err(NumberError::Malformed);
    }

    let normalized = format!(
        "{}{}.{}",
        if negative { "-" } else { "" },
        if whole.is_empty() { "0" } else { whole.as_str() },
        if fraction.is_empty() { "0" } else { fraction }
    );
    normalized
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or(NumberError::Malformed)
}

#[derive(Debug, Clone, Default, Validate)]
struct DraftText {
    #[validate(length(min = 1, max = 100, message = "Title is required"))]
    title: String,
    #[validate(length(min = 1, max = 50, message = "Brand is required"))]
    brand: String,
    #[validate(length(min = 1, max = 50, message = "Model is required"))]
    model: String,
    #[validate(length(min = 1, max = 50, message = "Price label is required"))]
    price_str: String,
    #[validate(length(max = 5000, message = "Description is too long"))]
    description: String,
    #[validate(length(max = 50, message = "Trim is too long"))]
    trim: Option<String>,
    #[validate(length(max = 50, message = "Stock number is too long"))]
    stock_number: Option<String>,
}

/// Text fields of an admin vehicle form. Legacy field names are accepted
/// next to the current ones.
#[derive(Debug, Clone, Default)]
pub struct VehicleDraft {
    fields: BTreeMap<String, String>,
}

impl VehicleDraft {
    pub fn new(fields: BTreeMap<String, String>) -> Self {
        Self { fields }
    }

    pub fn insert(&mut self, name: &str, value: String) {
        self.fields.insert(name.to_string(), value);
    }

    fn text(&self, keys: &[&str]) -> String {
        keys.iter()
            .find_map(|key| self.fields.get(*key))
            .map(|value| value.split_whitespace().collect::<Vec<_>>().join(" "))
            .unwrap_or_default()
    }

    fn optional_text(&self, keys: &[&str]) -> Option<String> {
        Some(self.text(keys)).filter(|value| !value.is_empty())
    }

    /// Parses a numeric field, recording one error for it when the value is
    /// malformed, ambiguous or rejected by `accept`.
    fn number(
        &self,
        checks: &mut FieldChecks,
        keys: &[&str],
        field: &'static str,
        message: &'static str,
        accept: impl Fn(f64) -> bool,
    ) -> Option<f64> {
        match parse_locale_number(&self.text(keys)) {
            Ok(value) if accept(value) => Some(value),
            Err(NumberError::AmbiguousSeparator) => {
                checks.require(false, field, AMBIGUOUS_NUMBER);
                None
            }
            Ok(_) | Err(NumberError::Malformed) => {
                checks.require(false, field, message);
                None
            }
        }
    }

    /// Builds the stored vehicle. `existing` keeps its identity, counters and
    /// images; uploaded images are attached by the caller once stored.
    pub fn into_vehicle(
        self,
        kind: VehicleKind,
        existing: Option<&Vehicle>,
    ) -> Result<Vehicle, ValidationErrors> {
        let text = DraftText {
            title: self.text(&["title"]),
            brand: self.text(&["brand"]),
            model: self.text(&["model", "t2"]),
            price_str: self.text(&["priceStr"]),
            description: self.text(&["description"]),
            trim: self.optional_text(&["trim"]),
            stock_number: self.optional_text(&["stockNumber"]),
        };
        let mut checks = FieldChecks::start(text.validate());

        let year = self.number(
            &mut checks,
            &["year"],
            "year",
            "Year must be a whole number between 1900 and 2100",
            |year| year.fract() == 0.0 && (1900.0..=2100.0).contains(&year),
        );
        let price = self.number(
            &mut checks,
            &["price"],
            "price",
            "Price must be a non-negative number",
            |price| price >= 0.0,
        );
        let top_speed = self.number(
            &mut checks,
            &["topSpeed", "topspeed"],
            "top_speed",
            "Top speed must be a number",
            |_| true,
        );
        let time60 = self.number(
            &mut checks,
            &["time60"],
            "time60",
            "0-60 time must be a number",
            |_| true,
        );
        let vin = self.optional_text(&["vin"]).map(|vin| vin.to_uppercase());
        let status = match self.optional_text(&["status"]) {
            Some(raw) => VehicleStatus::from_str(&raw).ok(),
            None => Some(existing.map(|vehicle| vehicle.status).unwrap_or_default()),
        };

        checks.require(
            vin.as_deref().map_or(true, |vin| VIN.is_match(vin)),
            "vin",
            "VIN must be 17 alphanumeric characters (excluding I, O, Q)",
        );
        checks.require(
            status.is_some(),
            "status",
            "Status must be available, sold or reserved",
        );

        let specs = match kind {
            VehicleKind::Gas => {
                let mileage = self.number(
                    &mut checks,
                    &["mileage"],
                    "mileage",
                    "Mileage must be a non-negative number",
                    |mileage| mileage >= 0.0,
                );
                let engine = self.number(
                    &mut checks,
                    &["engine"],
                    "engine",
                    "Engine size must be a number",
                    |_| true,
                );
                let cylinders = self.number(
                    &mut checks,
                    &["cylinders", "cyl"],
                    "cylinders",
                    "Cylinders must be a whole number",
                    |cyl| cyl.fract() == 0.0 && cyl >= 0.0,
                );
                VehicleSpecs::Gas(GasSpecs {
                    mileage: mileage.unwrap_or_default(),
                    engine: engine.unwrap_or_default(),
                    cylinders: cylinders.unwrap_or_default() as u32,
                    gearbox: self.text(&["gearbox"]),
                    transmission: self.text(&["transmission"]),
                    body: self.text(&["body"]),
                    drivetrain: self.text(&["drivetrain"]),
                    technology: self.text(&["technology"]),
                })
            }
            VehicleKind::Electric => {
                let range = self.number(
                    &mut checks,
                    &["range"],
                    "range",
                    "Range must be a non-negative number",
                    |range| range >= 0.0,
                );
                VehicleSpecs::Electric(ElectricSpecs {
                    trim_line: self.text(&["trimLine", "t1"]),
                    range: range.unwrap_or_default(),
                    range_description: self.text(&["rangeDescription", "rangedesc"]),
                })
            }
        };
        checks.finish()?;

        Ok(Vehicle {
            id: existing.map_or_else(Uuid::new_v4, |vehicle| vehicle.id),
            title: text.title,
            brand: text.brand,
            model: text.model,
            year: year.unwrap_or_default() as i32,
            price: price.unwrap_or_default(),
            price_str: text.price_str,
            status: status.unwrap_or_default(),
            views: existing.map_or(0, |vehicle| vehicle.views),
            images: existing.map(|vehicle| vehicle.images.clone()).unwrap_or_default(),
            colour: self.text(&["colour"]),
            interior: self.text(&["interior"]),
            wheel: self.text(&["wheel"]),
            description: text.description,
            safety: self.text(&["safety"]),
            top_speed: top_speed.unwrap_or_default(),
            time60: time60.unwrap_or_default(),
            trim: text.trim,
            stock_number: text.stock_number,
            vin,
            created_at: existing.map_or_else(Utc::now, |vehicle| vehicle.created_at),
            specs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::vehicle::fixtures;

    fn gas_draft() -> VehicleDraft {
        let pairs = [
            ("title", "2021 Ford Mustang GT"),
            ("brand", "Ford"),
            ("t2", "Mustang"),
            ("year", "2021"),
            ("price", "32.500,00"),
            ("priceStr", "$32,500"),
            ("topspeed", "250"),
            ("time60", "4,3"),
            ("mileage", "24000"),
            ("engine", "5,0"),
            ("cyl", "8"),
            ("transmission", "Manual"),
            ("description", "  One   owner. "),
        ];
        VehicleDraft::new(
            pairs
                .iter()
                .map(|(key, value)| (key.to_string(), value.to_string()))
                .collect(),
        )
    }

    fn invalid_fields(result: Result<Vehicle, ValidationErrors>) -> Vec<String> {
        let mut fields: Vec<String> = result
            .unwrap_err()
            .errors()
            .keys()
            .map(|field| field.to_string())
            .collect();
        fields.sort();
        fields
    }

    #[test]
    fn locale_numbers() {
        assert_eq!(parse_locale_number("12.345,67"), Ok(12345.67));
        assert_eq!(parse_locale_number("12,345.67"), Ok(12345.67));
        assert_eq!(parse_locale_number("1.234.567,89"), Ok(1234567.89));
        assert_eq!(parse_locale_number("1,234,567"), Ok(1234567.0));
        assert_eq!(parse_locale_number("1,5"), Ok(1.5));
        assert_eq!(parse_locale_number("12345.67"), Ok(12345.67));
        assert_eq!(parse_locale_number(" 42 "), Ok(42.0));
        assert_eq!(parse_locale_number("-1"), Ok(-1.0));
    }

    #[test]
    fn unreadable_numbers_are_rejected() {
        assert_eq!(parse_locale_number("32,500"), Err(NumberError::AmbiguousSeparator));
        for raw in ["abc", "", "inf", "1,2,3.4.5", "12,34,567", "5.", "1.2.3,4,5"] {
            assert_eq!(parse_locale_number(raw), Err(NumberError::Malformed), "{raw}");
        }
    }

    #[test]
    fn gas_draft_becomes_vehicle() {
        let vehicle = gas_draft()
            .into_vehicle(VehicleKind::Gas, None)
            .expect("Failed to build vehicle");
        assert_eq!(vehicle.model, "Mustang");
        assert_eq!(vehicle.price, 32500.0);
        assert_eq!(vehicle.time60, 4.3);
        assert_eq!(vehicle.description, "One owner.");
        assert_eq!(vehicle.status, VehicleStatus::Available);
        assert_eq!(vehicle.views, 0);
        assert!(vehicle.images.is_empty());
        match vehicle.specs {
            VehicleSpecs::Gas(gas) => {
                assert_eq!(gas.engine, 5.0);
                assert_eq!(gas.cylinders, 8);
            }
            VehicleSpecs::Electric(_) => panic!("expected gas specs"),
        }
    }

    #[test]
    fn missing_and_malformed_fields_are_reported() {
        let mut draft = gas_draft();
        draft.insert("year", "twenty".to_string());
        draft.insert("brand", " ".to_string());
        draft.insert("mileage", "-1".to_string());
        draft.insert("status", "gone".to_string());
        let result = draft.into_vehicle(VehicleKind::Gas, None);
        assert_eq!(
            invalid_fields(result),
            vec!["brand", "mileage", "status", "year"]
        );
    }

    #[test]
    fn ambiguous_price_is_one_field_error() {
        let mut draft = gas_draft();
        draft.insert("price", "32,500".to_string());
        let errors = draft.into_vehicle(VehicleKind::Gas, None).unwrap_err();
        let fields = errors.field_errors();
        let price = fields["price"];
        assert_eq!(price.len(), 1);
        assert!(price[0]
            .message
            .as_deref()
            .is_some_and(|message| message.starts_with("Ambiguous number")));
    }

    #[test]
    fn electric_draft_needs_range() {
        let result = gas_draft().into_vehicle(VehicleKind::Electric, None);
        assert_eq!(invalid_fields(result), vec!["range"]);

        let mut draft = gas_draft();
        draft.insert("range", "358".to_string());
        draft.insert("t1", "Long Range".to_string());
        let vehicle = draft
            .into_vehicle(VehicleKind::Electric, None)
            .unwrap();
        assert_eq!(vehicle.range(), Some(358.0));
        assert_eq!(vehicle.kind(), VehicleKind::Electric);
    }

    #[test]
    fn replacement_keeps_identity_and_images() {
        let mut existing = fixtures::gas("Ford", "Focus", 2019, 12000.0);
        existing.views = 41;
        existing.status = VehicleStatus::Reserved;
        existing.images = vec!["/images/old.jpg".to_string()];

        let vehicle = gas_draft()
            .into_vehicle(VehicleKind::Gas, Some(&existing))
            .unwrap();
        assert_eq!(vehicle.id, existing.id);
        assert_eq!(vehicle.views, 41);
        assert_eq!(vehicle.created_at, existing.created_at);
        assert_eq!(vehicle.status, VehicleStatus::Reserved);
        assert_eq!(vehicle.images, existing.images);
        assert_eq!(vehicle.model, "Mustang");
    }
}
