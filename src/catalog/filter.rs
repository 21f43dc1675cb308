use crate::catalog::sort::{SortField, SortOrder};
use crate::catalog::{Audience, QueryParams};
use crate::db::vehicle::{VehicleKind, VehicleStatus};
use crate::db::vehicle_filter::{Bounds, TextMatch, VehicleFilter};

pub const MAX_PRICE: f64 = 10_000_000.0;
pub const MAX_MILEAGE: f64 = 10_000_000.0;
pub const MAX_RANGE: f64 = 1000.0;
pub const MIN_YEAR: i32 = 1990;
/// `priceRange` upper side meaning "no upper bound".
pub const OPEN_PRICE_SENTINEL: f64 = 999_999.0;

const BODY_TYPES: [(&str, &[&str]); 8] = [
    ("Sedan", &["sedan", "saloon"]),
    ("Coupe", &["coupe", "coupé"]),
    ("SUV", &["suv", "crossover", "sport utility"]),
    ("Hatchback", &["hatchback", "hatch"]),
    ("Convertible", &["convertible", "cabriolet", "roadster"]),
    ("Wagon", &["wagon", "estate"]),
    ("Truck", &["truck", "pickup", "pick up"]),
    ("Van", &["minivan", "van"]),
];

/// Door counts only decide when no body word is present.
const DOOR_STYLES: [(&str, &str); 3] = [
    ("Sedan", "4 door"),
    ("Coupe", "2 door"),
    ("Hatchback", "5 door"),
];

/// Shorter synonyms never match inside another word ("caravan").
const MIN_SUBSTRING_SYNONYM: usize = 5;

/// Lower-cased words separated by single spaces.
fn words(raw: &str) -> String {
    raw.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn has_words(value: &str, phrase: &str) -> bool {
    format!(" {value} ").contains(&format!(" {phrase} "))
}

fn body_label(value: &str) -> Option<&'static str> {
    let synonym_matches = |test: &dyn Fn(&str) -> bool| {
        BODY_TYPES
            .iter()
            .find(|(_, synonyms)| synonyms.iter().any(|synonym| test(&words(synonym))))
            .map(|(label, _)| *label)
    };
    synonym_matches(&|synonym| value == synonym)
        .or_else(|| synonym_matches(&|synonym| has_words(value, synonym)))
        .or_else(|| {
            DOOR_STYLES
                .iter()
                .find(|(_, doors)| has_words(value, doors))
                .map(|(label, _)| *label)
        })
        .or_else(|| {
            synonym_matches(&|synonym| {
                synonym.len() >= MIN_SUBSTRING_SYNONYM && value.contains(synonym)
            })
        })
}

/// Canonical label for a stored or requested body type. The whole value wins
/// over whole words, which win over door counts and then substrings.
pub fn canonical_body(raw: &str) -> String {
    body_label(&words(raw))
        .map(str::to_string)
        .unwrap_or_else(|| raw.trim().to_string())
}

fn body_match(raw: &str) -> Option<TextMatch> {
    let canonical = canonical_body(raw);
    match BODY_TYPES.iter().find(|(label, _)| *label == canonical) {
        Some((label, synonyms)) => TextMatch::any_of(
            std::iter::once(label.to_string())
                .chain(synonyms.iter().map(|synonym| synonym.to_string()))
                .chain(
                    DOOR_STYLES
                        .iter()
                        .filter(|(door_label, _)| door_label == label)
                        .flat_map(|(_, doors)| [doors.to_string(), doors.replace(' ', "-")]),
                )
                .collect(),
        ),
        None => TextMatch::new(raw),
    }
}

/// Text filter value; `all` means unconstrained.
fn text_value(raw: Option<&str>) -> Option<&str> {
    raw.filter(|value| !value.eq_ignore_ascii_case("all"))
}

fn parse_number(raw: Option<&str>) -> Option<f64> {
    raw?.parse::<f64>().ok().filter(|value| value.is_finite())
}

fn parse_year(raw: Option<&str>) -> Option<i32> {
    raw?.parse::<i32>().ok()
}

/// Legacy tokens such as `under30` or `year2019`: strip the prefix, then read
/// the leading number.
fn legacy_number(raw: Option<&str>, prefix: &str) -> Option<f64> {
    let raw = raw?;
    let rest = match raw.get(..prefix.len()) {
        Some(head) if head.eq_ignore_ascii_case(prefix) => &raw[prefix.len()..],
        _ => raw,
    };
    let digits: String = rest
        .trim_start()
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    digits.parse::<f64>().ok().filter(|value| value.is_finite())
}

fn valid_price(value: f64) -> Option<f64> {
    (value > 0.0 && value < MAX_PRICE).then_some(value)
}

fn valid_mileage(value: f64) -> Option<f64> {
    (value >= 0.0 && value < MAX_MILEAGE).then_some(value)
}

fn valid_range(value: f64) -> Option<f64> {
    (value > 0.0 && value < MAX_RANGE).then_some(value)
}

/// `"min-max"`, either side optional.
fn price_range(raw: Option<&str>) -> Bounds<f64> {
    let Some((min, max)) = raw.and_then(|raw| raw.split_once('-')) else {
        return Bounds::default();
    };
    let side = |value: &str| parse_number(Some(value.trim()).filter(|v| !v.is_empty()));
    Bounds {
        min: side(min).and_then(valid_price),
        max: side(max)
            .filter(|max| *max != OPEN_PRICE_SENTINEL)
            .and_then(valid_price),
    }
}

/// A normalized catalog request.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterQuery {
    pub filter: VehicleFilter,
    /// Sort implied by a legacy filter token.
    pub implied_sort: Option<SortOrder>,
}

impl Audience {
    /// Status scope applied when the request names none.
    pub fn default_status(&self) -> Option<VehicleStatus> {
        match self {
            Audience::Public => Some(VehicleStatus::Available),
            Audience::Admin => None,
        }
    }
}

impl FilterQuery {
    pub fn from_params(
        params: &QueryParams,
        kind: VehicleKind,
        audience: Audience,
        current_year: i32,
    ) -> Self {
        let status = match audience {
            Audience::Public => audience.default_status(),
            Audience::Admin => params
                .get("status")
                .and_then(|status| status.parse().ok())
                .or_else(|| audience.default_status()),
        };
        let mut filter = VehicleFilter::scope(kind, status);
        let mut implied_sort = None;

        filter.brand = text_value(params.first_of(&["brand", "make"])).and_then(TextMatch::new);
        filter.model = text_value(params.get("model")).and_then(TextMatch::new);
        filter.transmission = text_value(params.get("transmission")).and_then(TextMatch::new);
        filter.body = text_value(params.first_of(&["bodyType", "body"])).and_then(body_match);
        filter.colour = text_value(params.first_of(&["colour", "color"])).and_then(TextMatch::new);
        filter.search = params.get("search").and_then(TextMatch::new);

        let mut price = price_range(params.get("priceRange"));
        if let Some(min) = parse_number(params.get("minPrice")).and_then(valid_price) {
            price.min = Some(min);
        }
        if let Some(max) = parse_number(params.get("maxPrice")).and_then(valid_price) {
            price.max = Some(max);
        }
        if let Some(under) = legacy_number(params.get("priceBy"), "under")
            .map(|thousands| thousands * 1000.0)
            .and_then(valid_price)
        {
            price = Bounds::at_most(under);
            implied_sort = Some(SortOrder::desc(SortField::Price));
        }
        filter.price = price;

        let max_year = current_year + 2;
        let valid_year = |year: i32| (MIN_YEAR..=max_year).contains(&year).then_some(year);
        let mut year = Bounds {
            min: parse_year(params.get("minYear")).and_then(valid_year),
            max: parse_year(params.get("maxYear")).and_then(valid_year),
        };
        if year.max.is_none() {
            year.max = legacy_number(params.get("yearLt"), "year")
                .map(|year| year as i32)
                .and_then(valid_year);
        }
        if let Some(exact) = legacy_number(params.get("year"), "year")
            .map(|year| year as i32)
            .and_then(valid_year)
        {
            year = Bounds::exactly(exact);
        }
        filter.year = year;

        match kind {
            VehicleKind::Gas => {
                filter.mileage = Bounds {
                    min: parse_number(params.get("minMileage")).and_then(valid_mileage),
                    max: parse_number(params.get("maxMileage")).and_then(valid_mileage),
                };
            }
            VehicleKind::Electric => {
                if let Some(range) = legacy_number(params.get("rangeLt"), "range").and_then(valid_range)
                {
                    filter.range = Bounds::at_most(range);
                    implied_sort = implied_sort.or(Some(SortOrder::desc(SortField::Range)));
                }
            }
        }

        Self {
            filter,
            implied_sort,
        }
    }
}
