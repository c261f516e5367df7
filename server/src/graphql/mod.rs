//! GraphQL layer: schema, per-request context, dispatch, response cache

pub mod context;
pub mod handler;
pub mod locale;
pub mod response_cache;
pub mod schema;

pub use context::RequestContext;
pub use handler::{GraphqlState, dispatch};
pub use schema::{BeaconSchema, EmergencyReportedEvent, build_schema};
