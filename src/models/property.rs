use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::AgentSummary;

/// Kind of building being listed
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PropertyType {
    House,
    Apartment,
    Condo,
    Townhouse,
    Land,
    Commercial,
}

impl PropertyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::House => "house",
            Self::Apartment => "apartment",
            Self::Condo => "condo",
            Self::Townhouse => "townhouse",
            Self::Land => "land",
            Self::Commercial => "commercial",
        }
    }
}

/// Whether a listing is offered for sale or for rent
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ListingType {
    Sale,
    Rent,
}

impl ListingType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sale => "sale",
            Self::Rent => "rent",
        }
    }
}

/// Listing status. Any authorized writer may move a listing to any status.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PropertyStatus {
    #[default]
    Active,
    Pending,
    Sold,
    Rented,
}

impl PropertyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Pending => "pending",
            Self::Sold => "sold",
            Self::Rented => "rented",
        }
    }
}

/// Image attached to a listing
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PropertyImage {
    pub id: Uuid,
    pub property_id: Uuid,
    pub image_url: String,
    #[serde(default)]
    pub is_primary: bool,
    #[serde(default)]
    pub display_order: i32,
}

/// Name/value feature of a listing ("Parking" / "2 spaces")
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PropertyFeature {
    pub id: Uuid,
    pub property_id: Uuid,
    pub feature_name: String,
    pub feature_value: Option<String>,
}

/// Core listing record, optionally carrying its embedded relations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Property {
    pub id: Uuid,
    pub agent_id: Option<Uuid>,
    pub title: String,
    pub description: Option<String>,
    pub property_type: PropertyType,
    pub listing_type: ListingType,
    pub price: f64,
    #[serde(default)]
    pub bedrooms: i32,
    #[serde(default)]
    pub bathrooms: f64,
    pub area_sqft: Option<f64>,
    pub address: String,
    pub city: String,
    pub state: Option<String>,
    pub zip_code: Option<String>,
    pub country: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub year_built: Option<i32>,
    #[serde(default)]
    pub status: PropertyStatus,
    #[serde(default)]
    pub featured: bool,
    #[serde(default)]
    pub views: i64,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(rename = "property_images", default)]
    pub images: Vec<PropertyImage>,
    #[serde(rename = "property_features", default)]
    pub features: Vec<PropertyFeature>,
    #[serde(rename = "agents", default)]
    pub agent: Option<AgentSummary>,
}

impl Property {
    /// Orders images for display: by `display_order`, primary first on ties.
    pub fn normalize(&mut self) {
        self.images
            .sort_by_key(|image| (image.display_order, !image.is_primary));
    }

    /// URL of the primary image, or the first one when none is flagged.
    pub fn primary_image(&self) -> Option<&str> {
        self.images
            .iter()
            .find(|image| image.is_primary)
            .or_else(|| self.images.first())
            .map(|image| image.image_url.as_str())
    }
}

/// Insert payload for a new listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProperty {
    pub agent_id: Uuid,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub property_type: PropertyType,
    pub listing_type: ListingType,
    pub price: f64,
    pub bedrooms: i32,
    pub bathrooms: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub area_sqft: Option<f64>,
    pub address: String,
    pub city: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zip_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year_built: Option<i32>,
    pub featured: bool,
}

/// Partial update of a listing; unset fields are left untouched
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PropertyUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<PropertyStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub featured: Option<bool>,
}

impl PropertyUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.price.is_none()
            && self.status.is_none()
            && self.featured.is_none()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPropertyImage {
    pub property_id: Uuid,
    pub image_url: String,
    pub is_primary: bool,
    pub display_order: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPropertyFeature {
    pub property_id: Uuid,
    pub feature_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feature_value: Option<String>,
}
