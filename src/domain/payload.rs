//! Live Activity Payloads
//!
//! The variant-specific content attached to a live activity card.
//! Stored as a JSON object whose `type` field names the variant.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::entity::{DomainError, DomainResult};

/// Name of the discriminator field in the serialized form
pub const PAYLOAD_TYPE_FIELD: &str = "type";

/// Kind of food waiting at the counter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FoodType {
    Meal,
    Drink,
    Dessert,
    Snack,
    /// Also used for any value this build does not know about
    #[default]
    #[serde(other)]
    Unspecified,
}

impl FoodType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FoodType::Unspecified => "unspecified",
            FoodType::Meal => "meal",
            FoodType::Drink => "drink",
            FoodType::Dessert => "dessert",
            FoodType::Snack => "snack",
        }
    }
}

/// Food ready for pickup at a store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FoodPickupPayload {
    pub store_name: String,
    pub pickup_code: String,
    pub food_name: String,
    #[serde(default)]
    pub food_type: FoodType,
}

/// Parcel waiting at a locker or station
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParcelPickupPayload {
    pub company_name: String,
    pub pickup_code: String,
    pub location: String,
}

/// Content of a live activity card
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActivityPayload {
    FoodPickup(FoodPickupPayload),
    ParcelPickup(ParcelPickupPayload),
}

impl ActivityPayload {
    /// Every discriminator this build can decode
    pub const KINDS: [&'static str; 2] = ["food_pickup", "parcel_pickup"];

    /// Discriminator written into the `type` field
    pub fn kind(&self) -> &'static str {
        match self {
            ActivityPayload::FoodPickup(_) => "food_pickup",
            ActivityPayload::ParcelPickup(_) => "parcel_pickup",
        }
    }

    pub fn pickup_code(&self) -> &str {
        match self {
            ActivityPayload::FoodPickup(p) => &p.pickup_code,
            ActivityPayload::ParcelPickup(p) => &p.pickup_code,
        }
    }

    /// Serialize to the tagged text form stored in the payload column
    pub fn encode(&self) -> DomainResult<String> {
        serde_json::to_string(self).map_err(|e| DomainError::Internal(format!("Failed to encode payload: {}", e)))
    }

    /// Parse the tagged text form.
    ///
    /// Extra fields are ignored. A discriminator outside [`Self::KINDS`]
    /// yields [`DomainError::UnknownVariant`]; anything else that is not a
    /// valid payload yields [`DomainError::Decode`].
    pub fn decode(text: &str) -> DomainResult<Self> {
        let value: Value = serde_json::from_str(text)?;

        let tag = match value.get(PAYLOAD_TYPE_FIELD) {
            Some(Value::String(tag)) => tag.as_str(),
            Some(other) => {
                return Err(DomainError::Decode(format!(
                    "Payload discriminator must be a string, got {}",
                    other
                )))
            }
            None if value.is_object() => {
                return Err(DomainError::Decode("Payload is missing its type field".to_string()))
            }
            None => return Err(DomainError::Decode("Payload is not a JSON object".to_string())),
        };

        if !Self::KINDS.contains(&tag) {
            return Err(DomainError::UnknownVariant(tag.to_string()));
        }

        Ok(serde_json::from_value(value)?)
    }
}
