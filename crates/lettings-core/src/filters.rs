//! Query filters for the property and resident collections.
//!
//! Every field is optional: `None` means "no constraint", never "match
//! nothing". Serialized field names match the data-store params.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{AvailabilityStatus, PropertyType, TenancyStatus};

/// Reasons a filter is rejected before it reaches the data store.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FilterError {
    #[error("minRent ({min}) is greater than maxRent ({max})")]
    InvertedRentRange { min: f64, max: f64 },
    #[error("{0} must not be negative")]
    Negative(&'static str),
    #[error("{0} must not be empty")]
    Empty(&'static str),
}

/// Constraints for `properties.search`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bedrooms: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_rent: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_rent: Option<f64>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub property_type: Option<PropertyType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<AvailabilityStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pets_allowed: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub furnished: Option<bool>,
}

impl PropertyFilter {
    pub fn validate(&self) -> Result<(), FilterError> {
        if let Some(min) = self.min_rent {
            if min < 0.0 {
                return Err(FilterError::Negative("minRent"));
            }
        }
        if let Some(max) = self.max_rent {
            if max < 0.0 {
                return Err(FilterError::Negative("maxRent"));
            }
        }
        if let (Some(min), Some(max)) = (self.min_rent, self.max_rent) {
            if min > max {
                return Err(FilterError::InvertedRentRange { min, max });
            }
        }
        if matches!(self.city.as_deref(), Some(c) if c.trim().is_empty()) {
            return Err(FilterError::Empty("city"));
        }
        Ok(())
    }
}

/// Constraints for `residents.search`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResidentFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TenancyStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl ResidentFilter {
    pub fn validate(&self) -> Result<(), FilterError> {
        let fields = [
            ("propertyId", &self.property_id),
            ("firstName", &self.first_name),
            ("lastName", &self.last_name),
            ("email", &self.email),
        ];
        for (name, value) in fields {
            if matches!(value.as_deref(), Some(v) if v.trim().is_empty()) {
                return Err(FilterError::Empty(name));
            }
        }
        Ok(())
    }
}
