//! GraphQL schema: object types, query and mutation roots
//!
//! Built once at startup with the shared services as schema data. The
//! per-request [`RequestContext`] travels on each `async_graphql::Request`.

use std::sync::Arc;

use async_graphql::{Context, EmptySubscription, ID, InputObject, Object, Result, Schema};
use serde::{Deserialize, Serialize};

use crate::core::constants::TOPIC_EMERGENCY_REPORTED;
use crate::data::files::StorageService;
use crate::data::postgres::repositories::{emergency, user};
use crate::data::types::{EmergencyRow, UserRow};
use crate::graphql::context::RequestContext;

const EMERGENCIES_DEFAULT_LIMIT: i64 = 100;
const EMERGENCIES_MAX_LIMIT: i64 = 500;

pub type BeaconSchema = Schema<QueryRoot, MutationRoot, EmptySubscription>;

/// Build the schema with the shared storage service as schema data
pub fn build_schema(storage: Arc<StorageService>) -> BeaconSchema {
    Schema::build(QueryRoot, MutationRoot, EmptySubscription)
        .data(storage)
        .finish()
}

/// Event published to the `emergency.reported` topic after a report commits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmergencyReportedEvent {
    pub id: String,
    pub category: String,
    pub latitude: f64,
    pub longitude: f64,
    pub reported_at: i64,
}

/// A domain user, as seen by the API
pub struct User(UserRow);

#[Object]
impl User {
    async fn id(&self) -> ID {
        ID(self.0.id.clone())
    }

    async fn email(&self) -> Option<&str> {
        self.0.email.as_deref()
    }

    async fn username(&self) -> Option<&str> {
        self.0.username.as_deref()
    }

    async fn created_at(&self) -> i64 {
        self.0.created_at
    }
}

/// A reported emergency
pub struct Emergency(EmergencyRow);

#[Object]
impl Emergency {
    async fn id(&self) -> ID {
        ID(self.0.id.clone())
    }

    async fn category(&self) -> &str {
        &self.0.category
    }

    async fn description(&self) -> &str {
        &self.0.description
    }

    async fn latitude(&self) -> f64 {
        self.0.latitude
    }

    async fn longitude(&self) -> f64 {
        self.0.longitude
    }

    async fn address(&self) -> Option<&str> {
        self.0.address.as_deref()
    }

    async fn status(&self) -> &str {
        &self.0.status
    }

    async fn created_at(&self) -> i64 {
        self.0.created_at
    }

    /// Short-lived presigned URL for the attached photo, when one exists
    async fn photo_url(&self, ctx: &Context<'_>) -> Option<String> {
        let key = self.0.photo_key.as_deref()?;
        let storage = ctx.data_unchecked::<Arc<StorageService>>();

        match storage.presigned_url(key).await {
            Ok(url) => Some(url),
            Err(e) => {
                tracing::warn!(%key, error = %e, "Presigning photo URL failed");
                None
            }
        }
    }
}

#[derive(InputObject)]
pub struct ReportEmergencyInput {
    pub category: String,
    pub description: String,
    pub latitude: f64,
    pub longitude: f64,
    pub address: Option<String>,
    /// Object storage key of an uploaded photo, if any
    pub photo_key: Option<String>,
}

pub struct QueryRoot;

#[Object]
impl QueryRoot {
    /// The authenticated viewer, or null for anonymous requests
    async fn me(&self, ctx: &Context<'_>) -> Result<Option<User>> {
        let rc = ctx.data_unchecked::<RequestContext>();
        let subject_id = match rc.subject_id() {
            Some(s) => s.to_string(),
            None => return Ok(None),
        };

        let mut conn = rc.db.lock().await;
        let row =
            user::get_user_by_subject_id(conn.as_mut(), Some(rc.cache.as_ref()), &subject_id).await?;

        Ok(row.map(User))
    }

    /// A single emergency by id
    async fn emergency(&self, ctx: &Context<'_>, id: ID) -> Result<Option<Emergency>> {
        let rc = ctx.data_unchecked::<RequestContext>();

        let mut conn = rc.db.lock().await;
        let row = emergency::get_emergency(conn.as_mut(), id.as_str()).await?;

        Ok(row.map(Emergency))
    }

    /// Most recent emergencies, newest first
    async fn emergencies(&self, ctx: &Context<'_>, limit: Option<i64>) -> Result<Vec<Emergency>> {
        let rc = ctx.data_unchecked::<RequestContext>();
        let limit = limit
            .unwrap_or(EMERGENCIES_DEFAULT_LIMIT)
            .clamp(1, EMERGENCIES_MAX_LIMIT);

        let mut conn = rc.db.lock().await;
        let rows = emergency::list_emergencies(conn.as_mut(), limit).await?;

        Ok(rows.into_iter().map(Emergency).collect())
    }
}

pub struct MutationRoot;

#[Object]
impl MutationRoot {
    /// Report a new emergency; requires an authenticated session
    async fn report_emergency(
        &self,
        ctx: &Context<'_>,
        input: ReportEmergencyInput,
    ) -> Result<Emergency> {
        let rc = ctx.data_unchecked::<RequestContext>();
        let subject_id = rc
            .subject_id()
            .ok_or_else(|| async_graphql::Error::new("Authentication required"))?
            .to_string();

        validate_report(&input)?;

        let row = {
            let mut conn = rc.db.lock().await;
            emergency::create_emergency(
                conn.as_mut(),
                &emergency::NewEmergency {
                    reporter_subject_id: &subject_id,
                    category: input.category.trim(),
                    description: input.description.trim(),
                    latitude: input.latitude,
                    longitude: input.longitude,
                    address: input.address.as_deref(),
                    photo_key: input.photo_key.as_deref(),
                },
            )
            .await?
        };

        // Fire-and-forget: a publish failure must not fail the report
        let event = EmergencyReportedEvent {
            id: row.id.clone(),
            category: row.category.clone(),
            latitude: row.latitude,
            longitude: row.longitude,
            reported_at: row.created_at,
        };
        let topic = rc
            .topics
            .broadcast_topic::<EmergencyReportedEvent>(TOPIC_EMERGENCY_REPORTED);
        if let Err(e) = topic.publish(&event).await {
            tracing::warn!(emergency_id = %row.id, error = %e, "Publishing emergency event failed");
        }

        Ok(Emergency(row))
    }
}

fn validate_report(input: &ReportEmergencyInput) -> Result<()> {
    let category = input.category.trim();
    if category.is_empty() || category.len() > 50 {
        return Err(async_graphql::Error::new(
            "Category must be between 1 and 50 characters",
        ));
    }
    if input.description.trim().is_empty() {
        return Err(async_graphql::Error::new("Description must not be empty"));
    }
    if !(-90.0..=90.0).contains(&input.latitude) {
        return Err(async_graphql::Error::new(
            "Latitude must be between -90 and 90",
        ));
    }
    if !(-180.0..=180.0).contains(&input.longitude) {
        return Err(async_graphql::Error::new(
            "Longitude must be between -180 and 180",
        ));
    }
    Ok(())
}
