use serde::{Deserialize, Serialize};

use crate::backend::Query;
use crate::models::{ListingType, PropertyType};

/// Criteria for listing properties; unset criteria do not filter
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PropertyFilters {
    /// Case-insensitive substring of the city
    pub city: Option<String>,
    pub property_type: Option<PropertyType>,
    pub listing_type: Option<ListingType>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub min_bedrooms: Option<i32>,
    pub featured: Option<bool>,
}

impl PropertyFilters {
    /// Adds one filter per set criterion.
    pub fn apply(&self, mut query: Query) -> Query {
        if let Some(city) = self.city.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
            query = query.ilike("city", city);
        }
        if let Some(property_type) = self.property_type {
            query = query.eq("property_type", property_type.as_str());
        }
        if let Some(listing_type) = self.listing_type {
            query = query.eq("listing_type", listing_type.as_str());
        }
        if let Some(min_price) = self.min_price {
            query = query.gte("price", min_price);
        }
        if let Some(max_price) = self.max_price {
            query = query.lte("price", max_price);
        }
        if let Some(min_bedrooms) = self.min_bedrooms {
            query = query.gte("bedrooms", min_bedrooms);
        }
        if let Some(featured) = self.featured {
            query = query.eq("featured", featured);
        }
        query
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Filter;
    use crate::schema::Table;
    use serde_json::json;

    #[test]
    fn unset_filters_add_nothing() {
        let query = PropertyFilters::default().apply(Query::from(Table::Properties));
        assert!(query.filters.is_empty());

        let blank_city = PropertyFilters {
            city: Some("   ".to_string()),
            ..Default::default()
        };
        assert!(blank_city.apply(Query::from(Table::Properties)).filters.is_empty());
    }

    #[test]
    fn each_criterion_becomes_a_filter() {
        let filters = PropertyFilters {
            city: Some(" Denver ".to_string()),
            property_type: Some(PropertyType::Condo),
            listing_type: Some(ListingType::Sale),
            min_price: Some(200_000.0),
            max_price: Some(450_000.0),
            min_bedrooms: Some(2),
            featured: Some(true),
        };

        let query = filters.apply(Query::from(Table::Properties));
        assert_eq!(
            query.filters,
            vec![
                Filter::ILike("city".into(), "Denver".into()),
                Filter::Eq("property_type".into(), json!("condo")),
                Filter::Eq("listing_type".into(), json!("sale")),
                Filter::Gte("price".into(), json!(200_000.0)),
                Filter::Lte("price".into(), json!(450_000.0)),
                Filter::Gte("bedrooms".into(), json!(2)),
                Filter::Eq("featured".into(), json!(true)),
            ]
        );
    }
}
