use crate::catalog::QueryParams;
use crate::db::vehicle::{Vehicle, VehicleKind};
use serde::Serialize;
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SortField {
    Date,
    Price,
    Year,
    Mileage,
    Brand,
    Range,
    TimeTo60,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SortOrder {
    pub field: SortField,
    pub direction: SortDirection,
}

impl Default for SortOrder {
    /// Newest listings first.
    fn default() -> Self {
        Self::desc(SortField::Date)
    }
}

/// Fields accepted by the legacy `sort=<field>&order=<asc|desc>` form.
const LEGACY_SORT_FIELDS: [(&str, SortField); 6] = [
    ("date", SortField::Date),
    ("price", SortField::Price),
    ("year", SortField::Year),
    ("brand", SortField::Brand),
    ("range", SortField::Range),
    ("time60", SortField::TimeTo60),
];

impl SortOrder {
    pub fn asc(field: SortField) -> Self {
        Self {
            field,
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(field: SortField) -> Self {
        Self {
            field,
            direction: SortDirection::Desc,
        }
    }

    /// `sort` keyword such as `price-asc`.
    pub fn from_keyword(keyword: &str, kind: VehicleKind) -> Option<Self> {
        let (field, direction) = keyword.trim().to_lowercase().rsplit_once('-').and_then(
            |(field, direction)| {
                let direction = match direction {
                    "asc" => SortDirection::Asc,
                    "desc" => SortDirection::Desc,
                    _ => return None,
                };
                let field = match field {
                    "price" => SortField::Price,
                    "year" => SortField::Year,
                    "mileage" => SortField::Mileage,
                    "date" => SortField::Date,
                    "range" => SortField::Range,
                    "performance" => SortField::TimeTo60,
                    _ => return None,
                };
                Some((field, direction))
            },
        )?;
        Self { field, direction }.supported_for(kind)
    }

    /// Electric listing `sortBy` keywords.
    pub fn from_sort_by(keyword: &str, kind: VehicleKind) -> Option<Self> {
        let order = match keyword.trim() {
            "latest" => Self::desc(SortField::Year),
            "highprice" => Self::desc(SortField::Price),
            "lowprice" => Self::asc(SortField::Price),
            "highrange" => Self::desc(SortField::Range),
            "lowrange" => Self::asc(SortField::Range),
            "highperf" => Self::asc(SortField::TimeTo60),
            "lowperf" => Self::desc(SortField::TimeTo60),
            _ => return None,
        };
        order.supported_for(kind)
    }

    /// Legacy two-field form; field must be on the allow-list.
    pub fn from_field_and_order(field: &str, order: Option<&str>, kind: VehicleKind) -> Option<Self> {
        let field = LEGACY_SORT_FIELDS
            .iter()
            .find(|(name, _)| *name == field.trim())
            .map(|(_, field)| *field)?;
        let direction = match order.map(str::trim) {
            Some("asc") => SortDirection::Asc,
            _ => SortDirection::Desc,
        };
        Self { field, direction }.supported_for(kind)
    }

    /// Resolution order: `sortBy`, then `sort` as keyword or legacy field, then
    /// the sort implied by a legacy filter, then the default.
    pub fn resolve(params: &QueryParams, kind: VehicleKind, implied: Option<SortOrder>) -> Self {
        if let Some(sort_by) = params.get("sortBy") {
            return Self::from_sort_by(sort_by, kind).unwrap_or_default();
        }
        if let Some(sort) = params.get("sort") {
            return Self::from_keyword(sort, kind)
                .or_else(|| Self::from_field_and_order(sort, params.get("order"), kind))
                .unwrap_or_default();
        }
        implied.unwrap_or_default()
    }

    fn supported_for(self, kind: VehicleKind) -> Option<Self> {
        match (self.field, kind) {
            (SortField::Range, VehicleKind::Gas) => None,
            (SortField::Mileage, VehicleKind::Electric) => None,
            _ => Some(self),
        }
    }

    /// Total order used by in-process storage; ties break on newest first,
    /// then id, the same as the relational backend.
    pub fn compare(&self, a: &Vehicle, b: &Vehicle) -> Ordering {
        fn optional(a: Option<f64>, b: Option<f64>) -> Ordering {
            match (a, b) {
                (Some(a), Some(b)) => a.total_cmp(&b),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            }
        }

        let primary = match self.field {
            SortField::Date => a.created_at.cmp(&b.created_at),
            SortField::Price => a.price.total_cmp(&b.price),
            SortField::Year => a.year.cmp(&b.year),
            SortField::Mileage => optional(a.mileage(), b.mileage()),
            SortField::Brand => a.brand.cmp(&b.brand),
            SortField::Range => optional(a.range(), b.range()),
            SortField::TimeTo60 => a.time60.total_cmp(&b.time60),
        };
        let primary = match self.direction {
            SortDirection::Asc => primary,
            SortDirection::Desc => primary.reverse(),
        };
        primary
            .then_with(|| b.created_at.cmp(&a.created_at))
            .then_with(|| a.id.cmp(&b.id))
    }
}
