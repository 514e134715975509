//! Agent-side listing management and the access rules around it.

mod common;

use serde_json::json;
use uuid::Uuid;

use common::{inquiry, seed_agent, seed_feature, seed_image, seed_property};
use estate_listings::backend::{Backend, BackendError, ErrorCode, MemoryBackend, Query};
use estate_listings::models::{
    InquiryStatus, ListingType, NewAgent, NewProperty, NewPropertyFeature, NewPropertyImage,
    PropertyStatus, PropertyType, PropertyUpdate,
};
use estate_listings::schema::Table;
use estate_listings::{ListingService, Listings, PropertyFilters, ServiceError};

fn new_property(agent_id: Uuid) -> NewProperty {
    NewProperty {
        agent_id,
        title: "Craftsman near the river".to_string(),
        description: Some("Original woodwork and a wraparound porch".to_string()),
        property_type: PropertyType::House,
        listing_type: ListingType::Sale,
        price: 515_000.0,
        bedrooms: 4,
        bathrooms: 2.5,
        area_sqft: Some(2350.0),
        address: "88 River Road".to_string(),
        city: "Boise".to_string(),
        state: Some("ID".to_string()),
        zip_code: Some("83702".to_string()),
        country: None,
        latitude: None,
        longitude: None,
        year_built: Some(1924),
        featured: false,
    }
}

fn is_denied(err: &ServiceError) -> bool {
    matches!(
        err,
        ServiceError::Backend(BackendError::Api {
            code: ErrorCode::InsufficientPrivilege,
            ..
        })
    )
}

#[tokio::test]
async fn identity_creates_its_own_agent_profile_only() {
    let backend = MemoryBackend::new();
    let user = Uuid::new_v4();
    let profile = NewAgent {
        user_id: user,
        full_name: "Morgan Reyes".to_string(),
        email: "morgan@realty.test".to_string(),
        phone: None,
        bio: Some("Downtown condos".to_string()),
        license_number: Some("ID-55821".to_string()),
    };

    let err = ListingService::new(backend.as_user(Uuid::new_v4()))
        .create_agent(&profile)
        .await
        .expect_err("cannot create a profile for someone else");
    assert!(is_denied(&err));

    let service = ListingService::new(backend.as_user(user));
    let agent = service.create_agent(&profile).await.expect("own profile");
    assert_eq!(agent.user_id, user);
    assert_eq!(agent.total_sales, 0);

    let err = service.create_agent(&profile).await.expect_err("one profile per identity");
    assert!(matches!(
        err,
        ServiceError::Backend(BackendError::Api { code: ErrorCode::UniqueViolation, .. })
    ));

    let public = ListingService::new(backend);
    let found = public.agent(agent.id).await.expect("lookup").expect("public profile");
    assert_eq!(found.license_number.as_deref(), Some("ID-55821"));
}

#[tokio::test]
async fn agents_are_listed_best_rated_first() {
    let backend = MemoryBackend::new();
    seed_agent(&backend, "Low Rated", 3.1);
    seed_agent(&backend, "Top Rated", 4.9);
    seed_agent(&backend, "Mid Rated", 4.2);

    let names: Vec<String> = ListingService::new(backend)
        .agents()
        .await
        .expect("agents listed")
        .into_iter()
        .map(|a| a.full_name)
        .collect();
    assert_eq!(names, vec!["Top Rated", "Mid Rated", "Low Rated"]);
}

#[tokio::test]
async fn only_the_owning_agent_creates_listings() {
    let backend = MemoryBackend::new();
    let agent = seed_agent(&backend, "Avery Stone", 4.5);
    let rival = seed_agent(&backend, "Rival Agent", 4.0);

    let err = ListingService::new(backend.clone())
        .create_property(&new_property(agent.id))
        .await
        .expect_err("anonymous cannot list");
    assert!(is_denied(&err));

    let err = ListingService::new(backend.as_user(rival.user_id))
        .create_property(&new_property(agent.id))
        .await
        .expect_err("rival cannot list for another agent");
    assert!(is_denied(&err));

    let owner = ListingService::new(backend.as_user(agent.user_id));
    let created = owner
        .create_property(&new_property(agent.id))
        .await
        .expect("owner lists");
    assert_eq!(created.status, PropertyStatus::Active);
    assert_eq!(created.country.as_deref(), Some("USA"));
    assert_eq!(created.views, 0);

    let image = owner
        .add_property_image(&NewPropertyImage {
            property_id: created.id,
            image_url: "porch.jpg".to_string(),
            is_primary: true,
            display_order: 0,
        })
        .await
        .expect("owner adds image");
    assert_eq!(image.property_id, created.id);

    owner
        .add_property_feature(&NewPropertyFeature {
            property_id: created.id,
            feature_name: "Porch".to_string(),
            feature_value: Some("Wraparound".to_string()),
        })
        .await
        .expect("owner adds feature");

    let err = ListingService::new(backend.as_user(rival.user_id))
        .add_property_image(&NewPropertyImage {
            property_id: created.id,
            image_url: "spam.jpg".to_string(),
            is_primary: false,
            display_order: 9,
        })
        .await
        .expect_err("rival cannot add images");
    assert!(is_denied(&err));

    let public = Listings::new(backend).get_property(created.id).await.expect("public listing");
    assert_eq!(public.primary_image(), Some("porch.jpg"));
    assert_eq!(public.features[0].feature_name, "Porch");
}

#[tokio::test]
async fn status_changes_are_free_form_and_hide_non_active_listings() {
    let backend = MemoryBackend::new();
    let agent = seed_agent(&backend, "Avery Stone", 4.5);
    let property = seed_property(&backend, &agent, json!({}));
    let owner = ListingService::new(backend.as_user(agent.user_id));

    for status in [
        PropertyStatus::Sold,
        PropertyStatus::Pending,
        PropertyStatus::Rented,
        PropertyStatus::Active,
        PropertyStatus::Sold,
    ] {
        let updated = owner
            .update_property(
                property,
                &PropertyUpdate {
                    status: Some(status),
                    ..Default::default()
                },
            )
            .await
            .expect("owner updates")
            .expect("owner sees listing");
        assert_eq!(updated.status, status);
    }

    let public = Listings::new(backend.clone());
    assert!(public.get_property(property).await.is_none());
    assert!(public.list_properties(&PropertyFilters::default()).await.is_empty());

    let own = owner.agent_properties(agent.id).await.expect("own listings");
    assert_eq!(own.len(), 1);
    assert_eq!(own[0].status, PropertyStatus::Sold);

    let from_public = ListingService::new(backend)
        .agent_properties(agent.id)
        .await
        .expect("public view");
    assert!(from_public.is_empty());
}

#[tokio::test]
async fn strangers_cannot_update_or_delete_a_listing() {
    let backend = MemoryBackend::new();
    let agent = seed_agent(&backend, "Avery Stone", 4.5);
    let property = seed_property(&backend, &agent, json!({ "price": 400000 }));
    let stranger = ListingService::new(backend.as_user(Uuid::new_v4()));

    let update = PropertyUpdate {
        price: Some(1.0),
        ..Default::default()
    };
    assert!(stranger
        .update_property(property, &update)
        .await
        .expect("no rows matched")
        .is_none());
    assert!(!stranger.delete_property(property).await.expect("no rows matched"));

    let stored = backend.dump(Table::Properties);
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0]["price"], json!(400000));
}

#[tokio::test]
async fn owner_cannot_hand_a_listing_to_another_agent() {
    let backend = MemoryBackend::new();
    let agent = seed_agent(&backend, "Avery Stone", 4.5);
    let rival = seed_agent(&backend, "Rival Agent", 4.0);
    let property = seed_property(&backend, &agent, json!({}));

    let mut patch = serde_json::Map::new();
    patch.insert("agent_id".to_string(), json!(rival.id));
    let query = Query::from(Table::Properties).eq("id", property.to_string());
    let err = backend
        .as_user(agent.user_id)
        .update(&query, patch)
        .await
        .expect_err("new row fails the ownership check");
    assert_eq!(err.code(), Some(&ErrorCode::InsufficientPrivilege));
}

#[tokio::test]
async fn empty_update_is_rejected_before_reaching_the_backend() {
    let backend = MemoryBackend::new();
    let err = ListingService::new(backend)
        .update_property(Uuid::new_v4(), &PropertyUpdate::default())
        .await
        .expect_err("nothing to update");
    assert!(matches!(err, ServiceError::InvalidInput(_)));
}

#[tokio::test]
async fn deleting_a_listing_cascades_to_its_children() {
    let backend = MemoryBackend::new();
    let agent = seed_agent(&backend, "Avery Stone", 4.5);
    let doomed = seed_property(&backend, &agent, json!({ "title": "Doomed" }));
    let kept = seed_property(&backend, &agent, json!({ "title": "Kept" }));
    for property in [doomed, kept] {
        seed_image(&backend, property, "photo.jpg", 0, true);
        seed_feature(&backend, property, "Pool", "Heated");
    }

    let buyer = Uuid::new_v4();
    let buyer_view = Listings::new(backend.as_user(buyer));
    assert!(buyer_view.create_inquiry(&inquiry(doomed)).await);
    assert!(buyer_view.create_inquiry(&inquiry(kept)).await);
    assert!(buyer_view.save_property(buyer, doomed).await);
    assert!(buyer_view.save_property(buyer, kept).await);

    let owner = ListingService::new(backend.as_user(agent.user_id));
    assert!(owner.delete_property(doomed).await.expect("owner deletes"));

    let doomed_ref = json!(doomed.to_string());
    for table in [
        Table::PropertyImages,
        Table::PropertyFeatures,
        Table::Inquiries,
        Table::SavedProperties,
    ] {
        let rows = backend.dump(table);
        assert!(
            rows.iter().all(|row| row["property_id"] != doomed_ref),
            "{table} still references the deleted property"
        );
        assert!(!rows.is_empty(), "{table} lost rows of the kept property");
    }

    let saved = buyer_view.get_saved_properties(buyer).await;
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].id, kept);
}

#[tokio::test]
async fn agents_with_listings_cannot_be_removed() {
    let backend = MemoryBackend::new();
    let agent = seed_agent(&backend, "Avery Stone", 4.5);
    seed_property(&backend, &agent, json!({}));

    let query = Query::from(Table::Agents).eq("id", agent.id.to_string());
    let removed = backend
        .as_user(agent.user_id)
        .delete(&query)
        .await
        .expect("delete is filtered by policy");
    assert!(removed.is_empty());
    assert_eq!(backend.dump(Table::Agents).len(), 1);
}

#[tokio::test]
async fn agent_tracks_inquiry_status() {
    let backend = MemoryBackend::new();
    let agent = seed_agent(&backend, "Avery Stone", 4.5);
    let rival = seed_agent(&backend, "Rival Agent", 4.0);
    let property = seed_property(&backend, &agent, json!({}));
    let other = seed_property(&backend, &rival, json!({}));

    let public = Listings::new(backend.clone());
    assert!(public.create_inquiry(&inquiry(property)).await);
    assert!(public.create_inquiry(&inquiry(other)).await);

    let owner = ListingService::new(backend.as_user(agent.user_id));
    let received = owner.inquiries(None).await.expect("agent inbox");
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].property_id, property);
    assert_eq!(received[0].status, InquiryStatus::New);

    let updated = owner
        .update_inquiry_status(received[0].id, InquiryStatus::Contacted)
        .await
        .expect("agent updates")
        .expect("agent sees inquiry");
    assert_eq!(updated.status, InquiryStatus::Contacted);

    let rival_view = ListingService::new(backend.as_user(rival.user_id));
    assert!(rival_view
        .update_inquiry_status(received[0].id, InquiryStatus::Closed)
        .await
        .expect("no rows matched")
        .is_none());
}
