//! Rule-based slot extraction.
//!
//! Pulls filter values and creation data out of free text. Every rule is
//! independent and case-insensitive; a rule that does not match simply
//! leaves its field unset.

use std::sync::LazyLock;

use chrono::Utc;
use regex::Regex;

use lettings_core::filters::{PropertyFilter, ResidentFilter};
use lettings_core::types::{
    Address, AvailabilityInfo, AvailabilityStatus, NewProperty, PropertyDetails, PropertyType,
    RentInfo, TenancyStatus,
};

use crate::intent::Ambiguity;

// =============================================================================
// Compiled patterns (compiled once, reused across calls)
// =============================================================================

static BEDROOMS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(\d+)[-\s]?bedrooms?\b").expect("valid bedrooms regex"));

static UNDER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bunder\s+£?\s*(\d[\d,]*)").expect("valid under regex"));

static OVER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bover\s+£?\s*(\d[\d,]*)").expect("valid over regex"));

static POUNDS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"£\s*(\d[\d,]*)").expect("valid pounds regex"));

// Letters and spaces only, so the capture stops at punctuation, digits or £.
static CITY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bin\s+([a-z][a-z ]*)").expect("valid city regex"));

static PROPERTY_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bPROP-(\d+)\b").expect("valid property id regex"));

static NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bnamed?\s+([a-z][\w'-]*(?:[ \t]+[a-z][\w'-]*)*)").expect("valid name regex")
});

static STREET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bat\s+([^,]+)").expect("valid street regex"));

/// Type keywords in the order they are reported.
const TYPE_KEYWORDS: &[(&str, PropertyType)] = &[
    ("flat", PropertyType::Flat),
    ("house", PropertyType::House),
    ("studio", PropertyType::Studio),
];

const PLACEHOLDER: &str = "Unknown";

/// Words that end a location capture.
const CITY_STOP_WORDS: &[&str] = &["under", "over", "below", "above", "with", "for", "from"];

// =============================================================================
// Individual rules
// =============================================================================

/// First `<n> bedroom(s)` mention, also accepting `<n>-bedroom`.
pub fn bedrooms(text: &str) -> Option<u32> {
    BEDROOMS_RE
        .captures(text)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Inclusive upper rent bound from `under £<n>`.
pub fn max_rent(text: &str) -> Option<f64> {
    amount(&UNDER_RE, text)
}

/// Inclusive lower rent bound from `over £<n>`.
pub fn min_rent(text: &str) -> Option<f64> {
    amount(&OVER_RE, text)
}

/// First `£<n>` mention anywhere in the text.
pub fn pounds(text: &str) -> Option<f64> {
    amount(&POUNDS_RE, text)
}

fn amount(re: &Regex, text: &str) -> Option<f64> {
    let digits: String = re
        .captures(text)?
        .get(1)?
        .as_str()
        .chars()
        .filter(|c| *c != ',')
        .collect();
    digits.parse().ok()
}

/// Every property type mentioned, as plain substrings.
pub fn property_types(text: &str) -> Vec<PropertyType> {
    let lower = text.to_lowercase();
    TYPE_KEYWORDS
        .iter()
        .filter(|(keyword, _)| lower.contains(keyword))
        .map(|(_, property_type)| *property_type)
        .collect()
}

/// A single unambiguous property type, or the ambiguity when several appear.
fn property_type(text: &str) -> (Option<PropertyType>, Option<Ambiguity>) {
    let types = property_types(text);
    match types.as_slice() {
        [] => (None, None),
        [single] => (Some(*single), None),
        _ => (None, Some(Ambiguity::PropertyType(types))),
    }
}

/// Location after `in`, up to punctuation, a digit, `£`, a rent or
/// qualifier word such as `under`, or the end of text.
pub fn city(text: &str) -> Option<String> {
    let captured = CITY_RE.captures(text)?.get(1)?.as_str();
    let words: Vec<&str> = captured
        .split_whitespace()
        .take_while(|word| {
            !CITY_STOP_WORDS
                .iter()
                .any(|stop| word.eq_ignore_ascii_case(stop))
        })
        .collect();
    (!words.is_empty()).then(|| words.join(" "))
}

/// `PROP-<digits>`, digits kept verbatim.
pub fn property_id(text: &str) -> Option<String> {
    PROPERTY_ID_RE
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| format!("PROP-{}", m.as_str()))
}

/// First and last name following `name` or `named`.
pub fn name(text: &str) -> (Option<String>, Option<String>) {
    let Some(captured) = NAME_RE.captures(text).and_then(|c| c.get(1)) else {
        return (None, None);
    };
    let mut tokens = captured.as_str().split_whitespace();
    let first = tokens.next().map(str::to_string);
    let last = tokens.next().map(str::to_string);
    (first, last)
}

/// Street line following `at`, up to the first comma.
pub fn street(text: &str) -> Option<String> {
    let captured = STREET_RE.captures(text)?.get(1)?.as_str().trim();
    (!captured.is_empty()).then(|| captured.to_string())
}

// =============================================================================
// Composite extractors
// =============================================================================

/// Filter for a property search. Status always defaults to available.
pub fn property_filter(text: &str) -> (PropertyFilter, Vec<Ambiguity>) {
    let (property_type, ambiguity) = property_type(text);
    let filter = PropertyFilter {
        bedrooms: bedrooms(text),
        min_rent: min_rent(text),
        max_rent: max_rent(text),
        property_type,
        city: city(text),
        status: Some(AvailabilityStatus::Available),
        ..Default::default()
    };
    (filter, ambiguity.into_iter().collect())
}

/// Filter for a resident search.
pub fn resident_filter(text: &str) -> ResidentFilter {
    let (first_name, last_name) = name(text);
    ResidentFilter {
        property_id: property_id(text),
        first_name,
        last_name,
        ..Default::default()
    }
}

/// Filter for a current-tenant lookup: a resident filter with the tenancy
/// status forced to active.
pub fn tenant_filter(text: &str) -> ResidentFilter {
    ResidentFilter {
        status: Some(TenancyStatus::Active),
        ..resident_filter(text)
    }
}

/// Creation payload for a new property.
///
/// Details are only filled in when a bedroom count was found, and rent only
/// when a `£` amount was found (deposit is one and a half months' rent).
pub fn new_property(text: &str) -> (NewProperty, Vec<Ambiguity>) {
    let (property_type, ambiguity) = property_type(text);

    let details = bedrooms(text).map(|bedrooms| PropertyDetails {
        bedrooms,
        bathrooms: 1,
        reception_rooms: 1,
        square_metres: 0,
        furnished: false,
        pets_allowed: false,
        parking: "none".to_string(),
    });

    let rent = pounds(text).map(|monthly| RentInfo {
        monthly_amount: monthly,
        currency: "GBP".to_string(),
        deposit: monthly * 1.5,
        bills_included: Vec::new(),
    });

    let property = NewProperty {
        property_id: None,
        address: Address {
            street: street(text).unwrap_or_else(|| PLACEHOLDER.to_string()),
            city: city(text).unwrap_or_else(|| PLACEHOLDER.to_string()),
            county: PLACEHOLDER.to_string(),
            postcode: PLACEHOLDER.to_string(),
            country: "UK".to_string(),
        },
        property_type: property_type.unwrap_or(PropertyType::Flat),
        details,
        rent,
        availability: AvailabilityInfo {
            status: AvailabilityStatus::Available,
            available_from: Utc::now(),
            tenancy_terms: vec!["12 months AST".to_string()],
        },
        amenities: Vec::new(),
    };
    (property, ambiguity.into_iter().collect())
}
