//! Emergency repository for PostgreSQL operations

use sqlx::PgConnection;

use crate::data::postgres::PostgresError;
use crate::data::types::EmergencyRow;

/// Input for creating an emergency report
#[derive(Debug, Clone)]
pub struct NewEmergency<'a> {
    pub reporter_subject_id: &'a str,
    pub category: &'a str,
    pub description: &'a str,
    pub latitude: f64,
    pub longitude: f64,
    pub address: Option<&'a str>,
    pub photo_key: Option<&'a str>,
}

type EmergencyTuple = (
    String,
    String,
    String,
    String,
    f64,
    f64,
    Option<String>,
    Option<String>,
    String,
    i64,
    i64,
);

fn from_tuple(t: EmergencyTuple) -> EmergencyRow {
    EmergencyRow {
        id: t.0,
        reporter_subject_id: t.1,
        category: t.2,
        description: t.3,
        latitude: t.4,
        longitude: t.5,
        address: t.6,
        photo_key: t.7,
        status: t.8,
        created_at: t.9,
        updated_at: t.10,
    }
}

const COLUMNS: &str = "id, reporter_subject_id, category, description, latitude, longitude, address, photo_key, status, created_at, updated_at";

/// Create a new emergency report
pub async fn create_emergency(
    conn: &mut PgConnection,
    input: &NewEmergency<'_>,
) -> Result<EmergencyRow, PostgresError> {
    let id = uuid::Uuid::new_v4().to_string();
    let now = chrono::Utc::now().timestamp();

    sqlx::query(
        "INSERT INTO emergencies (id, reporter_subject_id, category, description, latitude, longitude, address, photo_key, status, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 'open', $9, $9)",
    )
    .bind(&id)
    .bind(input.reporter_subject_id)
    .bind(input.category)
    .bind(input.description)
    .bind(input.latitude)
    .bind(input.longitude)
    .bind(input.address)
    .bind(input.photo_key)
    .bind(now)
    .execute(conn)
    .await?;

    Ok(EmergencyRow {
        id,
        reporter_subject_id: input.reporter_subject_id.to_string(),
        category: input.category.to_string(),
        description: input.description.to_string(),
        latitude: input.latitude,
        longitude: input.longitude,
        address: input.address.map(String::from),
        photo_key: input.photo_key.map(String::from),
        status: "open".to_string(),
        created_at: now,
        updated_at: now,
    })
}

/// Get an emergency by id
pub async fn get_emergency(
    conn: &mut PgConnection,
    id: &str,
) -> Result<Option<EmergencyRow>, PostgresError> {
    let row = sqlx::query_as::<_, EmergencyTuple>(&format!(
        "SELECT {COLUMNS} FROM emergencies WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(conn)
    .await?;

    Ok(row.map(from_tuple))
}

/// List the most recently reported emergencies
pub async fn list_emergencies(
    conn: &mut PgConnection,
    limit: i64,
) -> Result<Vec<EmergencyRow>, PostgresError> {
    let rows = sqlx::query_as::<_, EmergencyTuple>(&format!(
        "SELECT {COLUMNS} FROM emergencies ORDER BY created_at DESC LIMIT $1"
    ))
    .bind(limit)
    .fetch_all(conn)
    .await?;

    Ok(rows.into_iter().map(from_tuple).collect())
}
