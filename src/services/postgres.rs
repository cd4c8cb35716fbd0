use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, Row};
use std::time::Duration;
use thiserror::Error;

use crate::core::query::{QueryBuilder, ORDER_BY};
use crate::core::BoundingBox;
use crate::models::{CategoryCount, DirectoryStats, Resource, SubmissionRequest};

/// Errors that can occur when interacting with PostgreSQL
#[derive(Debug, Error)]
pub enum PostgresError {
    #[error("SQLx error: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    MigrateError(#[from] sqlx::migrate::MigrateError),

    #[error("Not found: {0}")]
    NotFound(String),
}

const RESOURCE_COLUMNS: &str = "SELECT id, title, description, category, tags, services, audience, hours, \
     phone, email, website, address, city, state, zip, image_url, latitude, longitude, \
     is_featured, is_approved, created_at, updated_at FROM resources";

/// Append a bounding-box window on the coordinate columns
///
/// The longitude window is only pushed down when it does not wrap around
/// the antimeridian; the exact radius check happens in memory afterwards.
fn push_bounding_box(qb: &mut sqlx::QueryBuilder<'_, Postgres>, bbox: &BoundingBox) {
    qb.push(" AND latitude BETWEEN ");
    qb.push_bind(bbox.min_lat);
    qb.push(" AND ");
    qb.push_bind(bbox.max_lat);

    if bbox.spans_all_longitudes() || bbox.wraps() {
        qb.push(" AND longitude IS NOT NULL");
    } else {
        qb.push(" AND longitude BETWEEN ");
        qb.push_bind(bbox.min_lon);
        qb.push(" AND ");
        qb.push_bind(bbox.max_lon);
    }
}

/// PostgreSQL client for the resource directory
///
/// The directory tables are owned by the submission workflow; this client
/// only reads resources, and writes submissions and favorites.
pub struct PostgresClient {
    pool: PgPool,
}

impl PostgresClient {
    /// Create a new PostgreSQL client from a connection string
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
        acquire_timeout: Duration,
        idle_timeout: Duration,
    ) -> Result<Self, PostgresError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(acquire_timeout)
            .idle_timeout(idle_timeout)
            .test_before_acquire(true)
            .connect(database_url)
            .await?;

        // Run migrations on startup
        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self { pool })
    }

    /// Create a new PostgreSQL client from settings
    pub async fn from_settings(
        url: &str,
        max_connections: Option<u32>,
        min_connections: Option<u32>,
        acquire_timeout_secs: Option<u64>,
        idle_timeout_secs: Option<u64>,
    ) -> Result<Self, PostgresError> {
        tracing::info!("Connecting to PostgreSQL");

        Self::new(
            url,
            max_connections.unwrap_or(10),
            min_connections.unwrap_or(1),
            Duration::from_secs(acquire_timeout_secs.unwrap_or(5)),
            Duration::from_secs(idle_timeout_secs.unwrap_or(600)),
        )
        .await
    }

    /// Fetch approved resources matching the query's predicates
    ///
    /// One composed statement covers every filter combination. When a
    /// bounding box is given, only resources with coordinates inside it are
    /// returned.
    pub async fn fetch_resources(
        &self,
        query: &QueryBuilder,
        bbox: Option<&BoundingBox>,
    ) -> Result<Vec<Resource>, PostgresError> {
        let mut qb = sqlx::QueryBuilder::<Postgres>::new(RESOURCE_COLUMNS);
        query.push_where(&mut qb);
        if let Some(bbox) = bbox {
            push_bounding_box(&mut qb, bbox);
        }
        qb.push(ORDER_BY);

        let resources = qb
            .build_query_as::<Resource>()
            .fetch_all(&self.pool)
            .await?;

        tracing::debug!("Fetched {} resources from PostgreSQL", resources.len());

        Ok(resources)
    }

    /// Get a single approved resource
    pub async fn get_resource(&self, id: i32) -> Result<Resource, PostgresError> {
        let mut qb = sqlx::QueryBuilder::<Postgres>::new(RESOURCE_COLUMNS);
        qb.push(" WHERE id = ");
        qb.push_bind(id);
        qb.push(" AND is_approved = true");

        qb.build_query_as::<Resource>()
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| PostgresError::NotFound(format!("Resource {} not found", id)))
    }

    /// Directory totals per category plus the review backlog
    pub async fn get_stats(&self) -> Result<DirectoryStats, PostgresError> {
        let total_resources: i64 = sqlx::query(
            "SELECT COUNT(*) AS count FROM resources WHERE is_approved = true",
        )
        .fetch_one(&self.pool)
        .await?
        .get("count");

        let categories = sqlx::query_as::<_, CategoryCount>(
            r#"
            SELECT category, COUNT(*) AS count
            FROM resources
            WHERE is_approved = true
            GROUP BY category
            ORDER BY category
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let pending_submissions: i64 = sqlx::query(
            "SELECT COUNT(*) AS count FROM resource_submissions WHERE status = 'pending'",
        )
        .fetch_one(&self.pool)
        .await?
        .get("count");

        Ok(DirectoryStats {
            total_resources,
            categories,
            pending_submissions,
        })
    }

    /// Queue a resource suggestion for review, returning its id
    pub async fn create_submission(&self, submission: &SubmissionRequest) -> Result<i32, PostgresError> {
        let query = r#"
            INSERT INTO resource_submissions (
                title, description, category, contact_name, contact_email,
                phone, website, address, city, state, status, submitted_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, 'pending', NOW())
            RETURNING id
        "#;

        let row = sqlx::query(query)
            .bind(&submission.title)
            .bind(&submission.description)
            .bind(&submission.category)
            .bind(&submission.contact_name)
            .bind(&submission.contact_email)
            .bind(&submission.phone)
            .bind(&submission.website)
            .bind(&submission.address)
            .bind(&submission.city)
            .bind(&submission.state)
            .fetch_one(&self.pool)
            .await?;

        let id: i32 = row.get("id");
        tracing::info!("Recorded submission {} ({})", id, submission.category);

        Ok(id)
    }

    /// Resource ids a user has saved
    pub async fn list_favorites(&self, user_id: &str) -> Result<Vec<i32>, PostgresError> {
        let rows = sqlx::query(
            "SELECT resource_id FROM favorites WHERE user_id = $1 ORDER BY created_at DESC, resource_id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(|row| row.get("resource_id")).collect())
    }

    /// Save a favorite
    ///
    /// Uses INSERT ... ON CONFLICT so saving twice is a no-op.
    pub async fn add_favorite(&self, user_id: &str, resource_id: i32) -> Result<(), PostgresError> {
        let query = r#"
            INSERT INTO favorites (user_id, resource_id)
            VALUES ($1, $2)
            ON CONFLICT (user_id, resource_id) DO NOTHING
        "#;

        sqlx::query(query)
            .bind(user_id)
            .bind(resource_id)
            .execute(&self.pool)
            .await?;

        tracing::debug!("Saved favorite: {} -> {}", user_id, resource_id);

        Ok(())
    }

    /// Remove a favorite, returning whether anything was deleted
    pub async fn remove_favorite(&self, user_id: &str, resource_id: i32) -> Result<bool, PostgresError> {
        let result = sqlx::query("DELETE FROM favorites WHERE user_id = $1 AND resource_id = $2")
            .bind(user_id)
            .bind(resource_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Health check for the database connection
    pub async fn health_check(&self) -> Result<bool, PostgresError> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|_| true)
            .map_err(Into::into)
    }
}
