#![allow(dead_code)]

use estate_listings::backend::MemoryBackend;
use estate_listings::models::NewInquiry;
use estate_listings::schema::Table;
use serde_json::{json, Value};
use uuid::Uuid;

/// Agent profile seeded into the store, with the identity it is linked to.
pub struct SeededAgent {
    pub id: Uuid,
    pub user_id: Uuid,
}

pub fn id_of(row: &serde_json::Map<String, Value>) -> Uuid {
    row["id"]
        .as_str()
        .and_then(|raw| Uuid::parse_str(raw).ok())
        .expect("seeded row has a uuid id")
}

pub fn seed_agent(backend: &MemoryBackend, name: &str, rating: f64) -> SeededAgent {
    let user_id = Uuid::new_v4();
    let row = backend
        .seed(
            Table::Agents,
            json!({
                "user_id": user_id,
                "full_name": name,
                "email": format!("{}@realty.test", name.to_lowercase().replace(' ', ".")),
                "phone": "555-0100",
                "rating": rating,
            }),
        )
        .expect("agent seeds");
    SeededAgent {
        id: id_of(&row),
        user_id,
    }
}

/// Seeds an active house for sale; `overrides` replaces any column.
pub fn seed_property(backend: &MemoryBackend, agent: &SeededAgent, overrides: Value) -> Uuid {
    let mut row = json!({
        "agent_id": agent.id,
        "title": "Family home",
        "description": "Three bedrooms close to the park",
        "property_type": "house",
        "listing_type": "sale",
        "price": 350000,
        "bedrooms": 3,
        "bathrooms": 2,
        "address": "12 Elm Street",
        "city": "Springfield",
        "state": "IL",
    });
    if let (Value::Object(base), Value::Object(extra)) = (&mut row, overrides) {
        base.extend(extra);
    }
    id_of(&backend.seed(Table::Properties, row).expect("property seeds"))
}

pub fn seed_image(backend: &MemoryBackend, property: Uuid, url: &str, order: i32, primary: bool) {
    backend
        .seed(
            Table::PropertyImages,
            json!({
                "property_id": property,
                "image_url": url,
                "display_order": order,
                "is_primary": primary,
            }),
        )
        .expect("image seeds");
}

pub fn seed_feature(backend: &MemoryBackend, property: Uuid, name: &str, value: &str) {
    backend
        .seed(
            Table::PropertyFeatures,
            json!({ "property_id": property, "feature_name": name, "feature_value": value }),
        )
        .expect("feature seeds");
}

pub fn inquiry(property: Uuid) -> NewInquiry {
    NewInquiry {
        property_id: property,
        name: "Dana Buyer".to_string(),
        email: "dana@example.test".to_string(),
        phone: Some("555-0199".to_string()),
        message: "Is the basement finished?".to_string(),
    }
}
