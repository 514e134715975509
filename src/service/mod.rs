//! Listing operations expressed as filtered requests against a [`Backend`].
//!
//! [`ListingService`] reports every failure as a [`ServiceError`]. The
//! [`Listings`] facade wraps it for presentation code: failures are logged
//! and replaced by an empty collection, `None` or `false`.

mod fallback;
mod filters;

pub use fallback::Listings;
pub use filters::PropertyFilters;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info};
use uuid::Uuid;

use crate::backend::{Backend, Filter, Query, Returning, Select};
use crate::error::ServiceError;
use crate::models::{
    Agent, AgentSummary, Inquiry, InquiryStatus, NewAgent, NewInquiry, NewProperty,
    NewPropertyFeature, NewPropertyImage, Property, PropertyFeature, PropertyImage, PropertyStatus,
    PropertyUpdate,
};
use crate::policy::Row;
use crate::schema::Table;

/// Maximum rows returned by a property listing or search.
pub const LIST_LIMIT: usize = 20;
/// Maximum rows returned by the featured listing.
pub const FEATURED_LIMIT: usize = 6;

/// Columns searched by free-text search.
const SEARCH_COLUMNS: [&str; 3] = ["title", "description", "city"];

/// Property columns plus images, features and an agent summary.
pub fn property_select() -> Select {
    Select::all()
        .embed(Table::PropertyImages, Select::all())
        .embed(Table::PropertyFeatures, Select::all())
        .embed(Table::Agents, Select::columns(AgentSummary::COLUMNS))
}

#[derive(Deserialize)]
struct SavedRow {
    properties: Option<Property>,
}

pub struct ListingService<B> {
    backend: B,
}

impl<B: Backend> ListingService<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Up to [`LIST_LIMIT`] active properties matching `filters`.
    pub async fn list_properties(
        &self,
        filters: &PropertyFilters,
    ) -> Result<Vec<Property>, ServiceError> {
        let query = filters
            .apply(active_properties())
            .limit(LIST_LIMIT);
        debug!(?filters, "listing properties");
        self.fetch_properties(&query).await
    }

    /// A single property with its relations, `None` when it does not exist
    /// or is not visible to the caller.
    pub async fn property(&self, id: Uuid) -> Result<Option<Property>, ServiceError> {
        let query = Query::from(Table::Properties)
            .select(property_select())
            .eq("id", id.to_string())
            .limit(1);
        Ok(self.fetch_properties(&query).await?.into_iter().next())
    }

    /// Up to [`FEATURED_LIMIT`] active, featured properties.
    pub async fn featured_properties(&self) -> Result<Vec<Property>, ServiceError> {
        let query = active_properties()
            .eq("featured", true)
            .limit(FEATURED_LIMIT);
        self.fetch_properties(&query).await
    }

    /// Active properties whose title, description or city contains `text`.
    /// Blank text lists active properties unfiltered.
    pub async fn search_properties(&self, text: &str) -> Result<Vec<Property>, ServiceError> {
        let text = text.trim();
        if text.is_empty() {
            return self.list_properties(&PropertyFilters::default()).await;
        }

        let any_column = SEARCH_COLUMNS
            .iter()
            .map(|column| Filter::ILike(column.to_string(), text.to_string()))
            .collect();
        let query = active_properties().or(any_column).limit(LIST_LIMIT);
        debug!(text, "searching properties");
        self.fetch_properties(&query).await
    }

    /// Records a buyer inquiry. The caller cannot read it back.
    pub async fn create_inquiry(&self, inquiry: &NewInquiry) -> Result<(), ServiceError> {
        let row = to_row(inquiry)?;
        self.backend
            .insert(Table::Inquiries, row, Returning::Minimal)
            .await?;
        info!(property_id = %inquiry.property_id, "inquiry submitted");
        Ok(())
    }

    /// Bookmarks a property for `user_id`. Saving twice is not an error.
    pub async fn save_property(
        &self,
        user_id: Uuid,
        property_id: Uuid,
    ) -> Result<(), ServiceError> {
        let row = to_row(&json!({ "user_id": user_id, "property_id": property_id }))?;
        match self
            .backend
            .insert(Table::SavedProperties, row, Returning::Minimal)
            .await
        {
            Ok(_) => Ok(()),
            Err(err) if err.is_unique_violation() => {
                debug!(%user_id, %property_id, "property already saved");
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Removes a bookmark. Removing one that does not exist is a no-op.
    pub async fn remove_saved_property(
        &self,
        user_id: Uuid,
        property_id: Uuid,
    ) -> Result<(), ServiceError> {
        let query = Query::from(Table::SavedProperties)
            .eq("user_id", user_id.to_string())
            .eq("property_id", property_id.to_string());
        let removed = self.backend.delete(&query).await?;
        debug!(%user_id, %property_id, removed = removed.len(), "saved property removed");
        Ok(())
    }

    /// Properties bookmarked by `user_id`, most recently saved first.
    /// Bookmarks of properties the caller can no longer read are skipped.
    pub async fn saved_properties(&self, user_id: Uuid) -> Result<Vec<Property>, ServiceError> {
        let query = Query::from(Table::SavedProperties)
            .select(Select::columns(&["property_id"]).embed(Table::Properties, property_select()))
            .eq("user_id", user_id.to_string())
            .order("created_at", false);

        let rows = self.backend.select(&query).await?;
        let rows: Vec<SavedRow> = self.decode_rows(Table::SavedProperties, rows)?;
        Ok(rows
            .into_iter()
            .filter_map(|row| row.properties)
            .map(normalized)
            .collect())
    }

    pub async fn is_property_saved(
        &self,
        user_id: Uuid,
        property_id: Uuid,
    ) -> Result<bool, ServiceError> {
        let query = Query::from(Table::SavedProperties)
            .select(Select::columns(&["id"]))
            .eq("user_id", user_id.to_string())
            .eq("property_id", property_id.to_string())
            .limit(1);
        Ok(!self.backend.select(&query).await?.is_empty())
    }

    /// All agents, best rated first.
    pub async fn agents(&self) -> Result<Vec<Agent>, ServiceError> {
        let query = Query::from(Table::Agents).order("rating", false);
        self.decode_rows(Table::Agents, self.backend.select(&query).await?)
    }

    pub async fn agent(&self, id: Uuid) -> Result<Option<Agent>, ServiceError> {
        let query = Query::from(Table::Agents).eq("id", id.to_string()).limit(1);
        let rows = self.backend.select(&query).await?;
        let agents: Vec<Agent> = self.decode_rows(Table::Agents, rows)?;
        Ok(agents.into_iter().next())
    }

    /// Creates the agent profile linked to the signed-in identity.
    pub async fn create_agent(&self, agent: &NewAgent) -> Result<Agent, ServiceError> {
        let row = self
            .insert_returning(Table::Agents, to_row(agent)?)
            .await?;
        decode(Table::Agents, row)
    }

    /// Listings of one agent visible to the caller, newest first. The owning
    /// agent also sees pending, sold and rented listings.
    pub async fn agent_properties(&self, agent_id: Uuid) -> Result<Vec<Property>, ServiceError> {
        let query = Query::from(Table::Properties)
            .select(property_select())
            .eq("agent_id", agent_id.to_string())
            .order("created_at", false);
        self.fetch_properties(&query).await
    }

    pub async fn create_property(&self, property: &NewProperty) -> Result<Property, ServiceError> {
        let row = self
            .insert_returning(Table::Properties, to_row(property)?)
            .await?;
        let created: Property = decode(Table::Properties, row)?;
        info!(property_id = %created.id, "property created");
        Ok(created)
    }

    /// Applies `update`, returning the updated property or `None` when the
    /// caller may not change it.
    pub async fn update_property(
        &self,
        id: Uuid,
        update: &PropertyUpdate,
    ) -> Result<Option<Property>, ServiceError> {
        if update.is_empty() {
            return Err(ServiceError::InvalidInput("property update sets no fields".to_string()));
        }
        let query = Query::from(Table::Properties)
            .select(property_select())
            .eq("id", id.to_string());
        let rows = self.backend.update(&query, to_row(update)?).await?;
        let updated: Vec<Property> = self.decode_rows(Table::Properties, rows)?;
        Ok(updated.into_iter().next().map(normalized))
    }

    /// Deletes a property together with its images, features, inquiries and
    /// bookmarks. Returns whether a row was deleted.
    pub async fn delete_property(&self, id: Uuid) -> Result<bool, ServiceError> {
        let query = Query::from(Table::Properties)
            .select(Select::columns(&["id"]))
            .eq("id", id.to_string());
        let deleted = self.backend.delete(&query).await?;
        info!(property_id = %id, deleted = deleted.len(), "property delete requested");
        Ok(!deleted.is_empty())
    }

    pub async fn add_property_image(
        &self,
        image: &NewPropertyImage,
    ) -> Result<PropertyImage, ServiceError> {
        let row = self
            .insert_returning(Table::PropertyImages, to_row(image)?)
            .await?;
        decode(Table::PropertyImages, row)
    }

    pub async fn add_property_feature(
        &self,
        feature: &NewPropertyFeature,
    ) -> Result<PropertyFeature, ServiceError> {
        let row = self
            .insert_returning(Table::PropertyFeatures, to_row(feature)?)
            .await?;
        decode(Table::PropertyFeatures, row)
    }

    /// Inquiries visible to the caller, newest first. Agents only ever see
    /// inquiries on their own listings.
    pub async fn inquiries(&self, property_id: Option<Uuid>) -> Result<Vec<Inquiry>, ServiceError> {
        let mut query = Query::from(Table::Inquiries).order("created_at", false);
        if let Some(property_id) = property_id {
            query = query.eq("property_id", property_id.to_string());
        }
        self.decode_rows(Table::Inquiries, self.backend.select(&query).await?)
    }

    pub async fn update_inquiry_status(
        &self,
        id: Uuid,
        status: InquiryStatus,
    ) -> Result<Option<Inquiry>, ServiceError> {
        let query = Query::from(Table::Inquiries).eq("id", id.to_string());
        let patch = to_row(&json!({ "status": status.as_str() }))?;
        let rows = self.backend.update(&query, patch).await?;
        let updated: Vec<Inquiry> = self.decode_rows(Table::Inquiries, rows)?;
        Ok(updated.into_iter().next())
    }

    async fn fetch_properties(&self, query: &Query) -> Result<Vec<Property>, ServiceError> {
        let rows = self.backend.select(query).await?;
        let properties: Vec<Property> = self.decode_rows(Table::Properties, rows)?;
        debug!(
            count = properties.len(),
            backend = self.backend.backend_name(),
            "properties fetched"
        );
        Ok(properties.into_iter().map(normalized).collect())
    }

    async fn insert_returning(&self, table: Table, row: Row) -> Result<Row, ServiceError> {
        self.backend
            .insert(table, row, Returning::Representation)
            .await?
            .into_iter()
            .next()
            .ok_or(ServiceError::MissingRow(table))
    }

    fn decode_rows<T: DeserializeOwned>(
        &self,
        table: Table,
        rows: Vec<Row>,
    ) -> Result<Vec<T>, ServiceError> {
        rows.into_iter().map(|row| decode(table, row)).collect()
    }
}

fn active_properties() -> Query {
    Query::from(Table::Properties)
        .select(property_select())
        .eq("status", PropertyStatus::Active.as_str())
}

fn normalized(mut property: Property) -> Property {
    property.normalize();
    property
}

fn decode<T: DeserializeOwned>(table: Table, row: Row) -> Result<T, ServiceError> {
    serde_json::from_value(Value::Object(row)).map_err(ServiceError::decode(table))
}

fn to_row<T: serde::Serialize>(value: &T) -> Result<Row, ServiceError> {
    match serde_json::to_value(value) {
        Ok(Value::Object(row)) => Ok(row),
        Ok(other) => Err(ServiceError::InvalidInput(format!(
            "expected an object payload, got {other}"
        ))),
        Err(err) => Err(ServiceError::InvalidInput(err.to_string())),
    }
}
