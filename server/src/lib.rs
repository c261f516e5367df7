//! Beacon: backend gateway for an emergency-response application
//!
//! Wires an identity provider, a Postgres store, a Redis cache/pub-sub
//! layer, and a GraphQL endpoint behind CORS and health routes.

pub mod api;
pub mod app;
pub mod core;
pub mod data;
pub mod graphql;
pub mod identity;
pub mod utils;
