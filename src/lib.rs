//! Client for a hosted real-estate listings backend.
//!
//! Listings, images, features, agents, saved listings and buyer inquiries
//! live in six tables guarded by row-level access policies. This crate
//! builds the filtered requests, decodes the rows and ships the schema.

pub mod backend;
pub mod config;
pub mod error;
pub mod models;
pub mod policy;
pub mod schema;
pub mod service;
pub mod telemetry;

pub use backend::{Backend, BackendError, MemoryBackend, RestBackend};
pub use error::ServiceError;
pub use policy::Identity;
pub use service::{ListingService, Listings, PropertyFilters, FEATURED_LIMIT, LIST_LIMIT};
