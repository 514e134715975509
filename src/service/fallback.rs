use tracing::error;
use uuid::Uuid;

use super::{ListingService, PropertyFilters};
use crate::backend::Backend;
use crate::error::ServiceError;
use crate::models::{NewInquiry, Property};

/// Presentation-layer facade: never fails, logs instead.
pub struct Listings<B> {
    service: ListingService<B>,
}

impl<B: Backend> Listings<B> {
    pub fn new(backend: B) -> Self {
        Self {
            service: ListingService::new(backend),
        }
    }

    /// The underlying service, for callers that want the error.
    pub fn service(&self) -> &ListingService<B> {
        &self.service
    }

    pub async fn list_properties(&self, filters: &PropertyFilters) -> Vec<Property> {
        or_log("list_properties", self.service.list_properties(filters).await).unwrap_or_default()
    }

    pub async fn get_property(&self, id: Uuid) -> Option<Property> {
        or_log("get_property", self.service.property(id).await).flatten()
    }

    pub async fn get_featured_properties(&self) -> Vec<Property> {
        or_log("get_featured_properties", self.service.featured_properties().await)
            .unwrap_or_default()
    }

    pub async fn search_properties(&self, text: &str) -> Vec<Property> {
        or_log("search_properties", self.service.search_properties(text).await).unwrap_or_default()
    }

    pub async fn create_inquiry(&self, inquiry: &NewInquiry) -> bool {
        or_log("create_inquiry", self.service.create_inquiry(inquiry).await).is_some()
    }

    pub async fn save_property(&self, user_id: Uuid, property_id: Uuid) -> bool {
        or_log(
            "save_property",
            self.service.save_property(user_id, property_id).await,
        )
        .is_some()
    }

    pub async fn remove_saved_property(&self, user_id: Uuid, property_id: Uuid) -> bool {
        or_log(
            "remove_saved_property",
            self.service.remove_saved_property(user_id, property_id).await,
        )
        .is_some()
    }

    pub async fn get_saved_properties(&self, user_id: Uuid) -> Vec<Property> {
        or_log("get_saved_properties", self.service.saved_properties(user_id).await)
            .unwrap_or_default()
    }
}

fn or_log<T>(operation: &'static str, result: Result<T, ServiceError>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(err) => {
            error!(operation, error = %err, "listing request failed");
            None
        }
    }
}
