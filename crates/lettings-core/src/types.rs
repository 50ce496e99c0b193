use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Enums
// =============================================================================

/// Kind of residential property.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyType {
    Flat,
    House,
    Maisonette,
    Studio,
}

impl PropertyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PropertyType::Flat => "flat",
            PropertyType::House => "house",
            PropertyType::Maisonette => "maisonette",
            PropertyType::Studio => "studio",
        }
    }
}

/// Letting status of a property.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AvailabilityStatus {
    #[default]
    Available,
    /// Currently let to a tenant.
    Let,
    Maintenance,
}

impl AvailabilityStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AvailabilityStatus::Available => "available",
            AvailabilityStatus::Let => "let",
            AvailabilityStatus::Maintenance => "maintenance",
        }
    }
}

/// Status of a resident's tenancy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TenancyStatus {
    #[default]
    Active,
    Expired,
    Terminated,
}

impl TenancyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TenancyStatus::Active => "active",
            TenancyStatus::Expired => "expired",
            TenancyStatus::Terminated => "terminated",
        }
    }
}

// =============================================================================
// Property documents
// =============================================================================

/// Postal address of a property.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub street: String,
    pub city: String,
    pub county: String,
    pub postcode: String,
    pub country: String,
}

/// Physical details of a property.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyDetails {
    pub bedrooms: u32,
    pub bathrooms: u32,
    pub reception_rooms: u32,
    pub square_metres: u32,
    pub furnished: bool,
    pub pets_allowed: bool,
    pub parking: String,
}

/// Rent terms, amounts in `currency`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RentInfo {
    pub monthly_amount: f64,
    pub currency: String,
    pub deposit: f64,
    pub bills_included: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityInfo {
    pub status: AvailabilityStatus,
    pub available_from: DateTime<Utc>,
    pub tenancy_terms: Vec<String>,
}

/// A property document as stored in the `properties` collection.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Property {
    pub property_id: String,
    pub address: Address,
    #[serde(rename = "type")]
    pub property_type: PropertyType,
    pub details: PropertyDetails,
    pub rent: RentInfo,
    pub availability: AvailabilityInfo,
    pub amenities: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Creation payload for a property.
///
/// The store assigns `propertyId` (unless given) and the timestamps.
/// `details` and `rent` are only present when they could be determined.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProperty {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property_id: Option<String>,
    pub address: Address,
    #[serde(rename = "type")]
    pub property_type: PropertyType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<PropertyDetails>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rent: Option<RentInfo>,
    pub availability: AvailabilityInfo,
    #[serde(default)]
    pub amenities: Vec<String>,
}

// =============================================================================
// Resident documents
// =============================================================================

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonalInfo {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub mobile: String,
    pub date_of_birth: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TenancyInfo {
    pub property_id: String,
    pub tenancy_start: DateTime<Utc>,
    pub tenancy_end: DateTime<Utc>,
    pub monthly_rent: f64,
    pub deposit: f64,
    pub status: TenancyStatus,
    /// Agreement type, e.g. "AST".
    pub tenancy_type: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmergencyContact {
    pub name: String,
    pub relationship: String,
    pub mobile: String,
}

/// A document held on file for a resident.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResidentDocument {
    #[serde(rename = "type")]
    pub document_type: String,
    pub url: String,
    pub uploaded_at: DateTime<Utc>,
}

/// A resident document as stored in the `residents` collection.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resident {
    pub resident_id: String,
    pub personal_info: PersonalInfo,
    pub current_tenancy: TenancyInfo,
    pub emergency_contact: EmergencyContact,
    pub documents: Vec<ResidentDocument>,
    pub notes: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Transport messages
// =============================================================================

/// Inbound chat frame sent by a client.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub message: String,
    /// ISO-8601 timestamp set by the sender.
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

impl ChatMessage {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            timestamp: Utc::now().to_rfc3339(),
            user_id: None,
        }
    }
}

/// Kind of outbound chat frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseKind {
    Ai,
    Error,
}

/// Outbound chat frame sent by the server.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub message: String,
    pub timestamp: String,
    #[serde(rename = "type")]
    pub kind: ResponseKind,
}

impl ChatResponse {
    pub fn ai(message: impl Into<String>) -> Self {
        Self::with_kind(message, ResponseKind::Ai)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::with_kind(message, ResponseKind::Error)
    }

    fn with_kind(message: impl Into<String>, kind: ResponseKind) -> Self {
        Self {
            message: message.into(),
            timestamp: Utc::now().to_rfc3339(),
            kind,
        }
    }
}
