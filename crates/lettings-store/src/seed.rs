//! Sample data for demos and fresh installs.
//!
//! Three available properties and one resident renting the first of them.
//! Each collection is only seeded when it is empty, so seeding is safe to run
//! on every start.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use lettings_core::error::LettingsError;
use lettings_core::types::{
    Address, AvailabilityInfo, AvailabilityStatus, EmergencyContact, PersonalInfo, Property,
    PropertyDetails, PropertyType, RentInfo, Resident, ResidentDocument, TenancyInfo,
    TenancyStatus,
};

use crate::documents::{Collection, DocumentStore};

/// How many documents a seeding run inserted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub properties: usize,
    pub residents: usize,
}

/// Insert the sample documents into any empty collection.
pub fn seed_sample_data(store: &DocumentStore) -> Result<SeedReport, LettingsError> {
    let mut report = SeedReport::default();

    if store.count(Collection::Properties)? == 0 {
        for property in sample_properties()? {
            store.insert(Collection::Properties, to_document(&property)?)?;
            report.properties += 1;
        }
    }

    if store.count(Collection::Residents)? == 0 {
        for resident in sample_residents()? {
            store.insert(Collection::Residents, to_document(&resident)?)?;
            report.residents += 1;
        }
    }

    info!(
        properties = report.properties,
        residents = report.residents,
        "Sample data seeded"
    );
    Ok(report)
}

fn to_document<T: Serialize>(value: &T) -> Result<serde_json::Map<String, Value>, LettingsError> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        other => Err(LettingsError::Serialization(format!(
            "expected a JSON object, got {}",
            other
        ))),
    }
}

fn date(s: &str) -> Result<DateTime<Utc>, LettingsError> {
    s.parse()
        .map_err(|e| LettingsError::Serialization(format!("Invalid sample date {}: {}", s, e)))
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

// =============================================================================
// Properties
// =============================================================================

pub fn sample_properties() -> Result<Vec<Property>, LettingsError> {
    let now = Utc::now();
    let uk = "UK".to_string();

    Ok(vec![
        Property {
            property_id: "PROP-001".to_string(),
            address: Address {
                street: "123 High Street".to_string(),
                city: "Manchester".to_string(),
                county: "Greater Manchester".to_string(),
                postcode: "M1 2AB".to_string(),
                country: uk.clone(),
            },
            property_type: PropertyType::Flat,
            details: PropertyDetails {
                bedrooms: 2,
                bathrooms: 1,
                reception_rooms: 1,
                square_metres: 75,
                furnished: false,
                pets_allowed: true,
                parking: "allocated space".to_string(),
            },
            rent: RentInfo {
                monthly_amount: 1800.0,
                currency: "GBP".to_string(),
                deposit: 2700.0,
                bills_included: strings(&["water", "council tax"]),
            },
            availability: AvailabilityInfo {
                status: AvailabilityStatus::Available,
                available_from: date("2025-08-01T00:00:00Z")?,
                tenancy_terms: strings(&["12 months AST", "6 months short let"]),
            },
            amenities: strings(&["communal garden", "gym", "concierge", "balcony"]),
            created_at: now,
            updated_at: now,
        },
        Property {
            property_id: "PROP-002".to_string(),
            address: Address {
                street: "456 Kings Road".to_string(),
                city: "London".to_string(),
                county: "Greater London".to_string(),
                postcode: "SW3 4TZ".to_string(),
                country: uk.clone(),
            },
            property_type: PropertyType::Flat,
            details: PropertyDetails {
                bedrooms: 2,
                bathrooms: 1,
                reception_rooms: 1,
                square_metres: 68,
                furnished: true,
                pets_allowed: false,
                parking: "none".to_string(),
            },
            rent: RentInfo {
                monthly_amount: 1950.0,
                currency: "GBP".to_string(),
                deposit: 2925.0,
                bills_included: strings(&["water"]),
            },
            availability: AvailabilityInfo {
                status: AvailabilityStatus::Available,
                available_from: date("2025-07-15T00:00:00Z")?,
                tenancy_terms: strings(&["12 months AST"]),
            },
            amenities: strings(&["communal garden", "gym", "concierge"]),
            created_at: now,
            updated_at: now,
        },
        Property {
            property_id: "PROP-003".to_string(),
            address: Address {
                street: "789 Castle Street".to_string(),
                city: "Edinburgh".to_string(),
                county: "Edinburgh".to_string(),
                postcode: "EH1 2NG".to_string(),
                country: uk,
            },
            property_type: PropertyType::Flat,
            details: PropertyDetails {
                bedrooms: 2,
                bathrooms: 1,
                reception_rooms: 1,
                square_metres: 82,
                furnished: false,
                pets_allowed: true,
                parking: "street parking".to_string(),
            },
            rent: RentInfo {
                monthly_amount: 1650.0,
                currency: "GBP".to_string(),
                deposit: 2475.0,
                bills_included: strings(&["water", "heating"]),
            },
            availability: AvailabilityInfo {
                status: AvailabilityStatus::Available,
                available_from: date("2025-07-15T00:00:00Z")?,
                tenancy_terms: strings(&["12 months AST", "6 months short let"]),
            },
            amenities: strings(&["washing machine included", "close to transport"]),
            created_at: now,
            updated_at: now,
        },
    ])
}

// =============================================================================
// Residents
// =============================================================================

pub fn sample_residents() -> Result<Vec<Resident>, LettingsError> {
    let now = Utc::now();

    Ok(vec![Resident {
        resident_id: "RES-001".to_string(),
        personal_info: PersonalInfo {
            first_name: "James".to_string(),
            last_name: "Wilson".to_string(),
            email: "james.wilson@email.co.uk".to_string(),
            mobile: "+44 7700 900123".to_string(),
            date_of_birth: date("1990-05-15T00:00:00Z")?,
        },
        current_tenancy: TenancyInfo {
            property_id: "PROP-001".to_string(),
            tenancy_start: date("2025-01-01T00:00:00Z")?,
            tenancy_end: date("2025-12-31T00:00:00Z")?,
            monthly_rent: 1800.0,
            deposit: 2700.0,
            status: TenancyStatus::Active,
            tenancy_type: "AST".to_string(),
        },
        emergency_contact: EmergencyContact {
            name: "Sarah Wilson".to_string(),
            relationship: "partner".to_string(),
            mobile: "+44 7700 900124".to_string(),
        },
        documents: vec![
            ResidentDocument {
                document_type: "tenancy_agreement".to_string(),
                url: "/documents/tenancy_001.pdf".to_string(),
                uploaded_at: date("2024-12-15T00:00:00Z")?,
            },
            ResidentDocument {
                document_type: "right_to_rent".to_string(),
                url: "/documents/rtr_001.pdf".to_string(),
                uploaded_at: date("2024-12-10T00:00:00Z")?,
            },
        ],
        notes: strings(&["Excellent tenant", "Always pays rent on time", "Very tidy"]),
        created_at: now,
        updated_at: now,
    }])
}
