use crate::db::vehicle::{Vehicle, VehicleKind, VehicleStatus};
use regex::{Regex, RegexBuilder};
use serde::Serialize;
use uuid::Uuid;

/// Case-insensitive substring match against any of a set of needles.
///
/// Needles are escaped before the pattern is compiled, so user input never
/// reaches the regex engine as syntax.
#[derive(Debug, Clone)]
pub struct TextMatch {
    needles: Vec<String>,
    pattern: Regex,
}

impl TextMatch {
    pub fn new(needle: &str) -> Option<Self> {
        Self::any_of(vec![needle.to_string()])
    }

    pub fn any_of(needles: Vec<String>) -> Option<Self> {
        let needles: Vec<String> = needles
            .into_iter()
            .map(|needle| needle.trim().to_string())
            .filter(|needle| !needle.is_empty())
            .collect();
        if needles.is_empty() {
            return None;
        }
        let alternatives = needles
            .iter()
            .map(|needle| regex::escape(needle))
            .collect::<Vec<_>>()
            .join("|");
        let pattern = RegexBuilder::new(&format!("(?:{alternatives})"))
            .case_insensitive(true)
            .build()
            .ok()?;
        Some(Self { needles, pattern })
    }

    pub fn needles(&self) -> &[String] {
        &self.needles
    }

    pub fn is_match(&self, haystack: &str) -> bool {
        self.pattern.is_match(haystack)
    }

    /// SQL `LIKE` patterns (lower-cased, `\` as escape character).
    pub fn like_patterns(&self) -> Vec<String> {
        self.needles
            .iter()
            .map(|needle| {
                let mut escaped = String::with_capacity(needle.len() + 2);
                escaped.push('%');
                for c in needle.to_lowercase().chars() {
                    if matches!(c, '\\' | '%' | '_') {
                        escaped.push('\\');
                    }
                    escaped.push(c);
                }
                escaped.push('%');
                escaped
            })
            .collect()
    }
}

impl PartialEq for TextMatch {
    fn eq(&self, other: &Self) -> bool {
        self.needles == other.needles
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Bounds<T> {
    pub min: Option<T>,
    pub max: Option<T>,
}

impl<T> Default for Bounds<T> {
    fn default() -> Self {
        Self {
            min: None,
            max: None,
        }
    }
}

impl<T: PartialOrd + Copy> Bounds<T> {
    pub fn between(min: T, max: T) -> Self {
        Self {
            min: Some(min),
            max: Some(max),
        }
    }

    pub fn exactly(value: T) -> Self {
        Self::between(value, value)
    }

    pub fn at_most(max: T) -> Self {
        Self {
            min: None,
            max: Some(max),
        }
    }

    pub fn is_unconstrained(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }

    pub fn contains(&self, value: T) -> bool {
        self.min.map_or(true, |min| value >= min) && self.max.map_or(true, |max| value <= max)
    }

    /// A missing value only satisfies an unconstrained bound.
    pub fn contains_optional(&self, value: Option<T>) -> bool {
        match value {
            Some(value) => self.contains(value),
            None => self.is_unconstrained(),
        }
    }
}

/// Same brand OR price inside the band.
#[derive(Debug, Clone, PartialEq)]
pub struct Similarity {
    pub brand: String,
    pub price: Bounds<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FacetField {
    Brand,
    Model,
    Transmission,
    Body,
    Colour,
}

impl FacetField {
    pub fn value_of<'a>(&self, vehicle: &'a Vehicle) -> Option<&'a str> {
        match self {
            FacetField::Brand => Some(vehicle.brand.as_str()),
            FacetField::Model => Some(vehicle.model.as_str()),
            FacetField::Transmission => vehicle.transmission(),
            FacetField::Body => vehicle.body(),
            FacetField::Colour => Some(vehicle.colour.as_str()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PriceYearBounds {
    pub min_price: f64,
    pub max_price: f64,
    pub min_year: i32,
    pub max_year: i32,
}

/// The validated predicate set handed to storage.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VehicleFilter {
    pub kind: Option<VehicleKind>,
    /// `None` means every status.
    pub status: Option<VehicleStatus>,
    pub exclude_id: Option<Uuid>,
    pub brand_is: Option<String>,
    pub brand: Option<TextMatch>,
    pub model: Option<TextMatch>,
    pub transmission: Option<TextMatch>,
    pub body: Option<TextMatch>,
    pub colour: Option<TextMatch>,
    pub price: Bounds<f64>,
    pub year: Bounds<i32>,
    pub mileage: Bounds<f64>,
    pub range: Bounds<f64>,
    pub search: Option<TextMatch>,
    pub similar_to: Option<Similarity>,
}

impl VehicleFilter {
    pub fn scope(kind: VehicleKind, status: Option<VehicleStatus>) -> Self {
        Self {
            kind: Some(kind),
            status,
            ..Default::default()
        }
    }

    pub fn available(kind: VehicleKind) -> Self {
        Self::scope(kind, Some(VehicleStatus::Available))
    }

    pub fn with_brand(mut self, brand: &str) -> Self {
        self.brand_is = Some(brand.to_string());
        self
    }

    pub fn matches(&self, vehicle: &Vehicle) -> bool {
        fn text(matcher: &Option<TextMatch>, value: Option<&str>) -> bool {
            match matcher {
                None => true,
                Some(matcher) => value.map_or(false, |value| matcher.is_match(value)),
            }
        }

        if self.kind.map_or(false, |kind| kind != vehicle.kind()) {
            return false;
        }
        if self.status.map_or(false, |status| status != vehicle.status) {
            return false;
        }
        if self.exclude_id == Some(vehicle.id) {
            return false;
        }
        if self
            .brand_is
            .as_ref()
            .map_or(false, |brand| brand != &vehicle.brand)
        {
            return false;
        }
        if !(text(&self.brand, Some(&vehicle.brand))
            && text(&self.model, Some(&vehicle.model))
            && text(&self.transmission, vehicle.transmission())
            && text(&self.body, vehicle.body())
            && text(&self.colour, Some(&vehicle.colour)))
        {
            return false;
        }
        if !(self.price.contains(vehicle.price)
            && self.year.contains(vehicle.year)
            && self.mileage.contains_optional(vehicle.mileage())
            && self.range.contains_optional(vehicle.range()))
        {
            return false;
        }
        if let Some(search) = &self.search {
            let fields = [
                Some(vehicle.title.as_str()),
                Some(vehicle.brand.as_str()),
                Some(vehicle.model.as_str()),
                Some(vehicle.description.as_str()),
                vehicle.trim.as_deref(),
                vehicle.stock_number.as_deref(),
                vehicle.vin.as_deref(),
            ];
            if !fields.into_iter().flatten().any(|field| search.is_match(field)) {
                return false;
            }
        }
        if let Some(similar) = &self.similar_to {
            if vehicle.brand != similar.brand && !similar.price.contains(vehicle.price) {
                return false;
            }
        }
        true
    }
}
