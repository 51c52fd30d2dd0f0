use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;
use thiserror::Error;
use validator::Validate;

use crate::models::{Gender, PetAge, PetProfile, Species};
use crate::services::store::{ProfileStore, StoreError};

/// Errors that can occur when interacting with PostgreSQL
#[derive(Debug, Error)]
pub enum PostgresError {
    #[error("SQLx error: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    MigrateError(#[from] sqlx::migrate::MigrateError),

    #[error("Invalid row for pet {pet_id}: {reason}")]
    InvalidRow { pet_id: String, reason: String },
}

/// Raw `pets` row
#[derive(Debug, Clone, sqlx::FromRow)]
struct PetRow {
    pet_id: String,
    name: String,
    species: String,
    breed: String,
    gender: String,
    age_years: i16,
    age_months: i16,
    activity_level: i16,
    special_needs: Option<String>,
}

impl TryFrom<PetRow> for PetProfile {
    type Error = PostgresError;

    fn try_from(row: PetRow) -> Result<Self, Self::Error> {
        let invalid = |reason: String| PostgresError::InvalidRow {
            pet_id: row.pet_id.clone(),
            reason,
        };

        let gender = row.gender.parse::<Gender>().map_err(invalid)?;
        let years = u8::try_from(row.age_years).map_err(|e| invalid(format!("age_years: {e}")))?;
        let months = u8::try_from(row.age_months).map_err(|e| invalid(format!("age_months: {e}")))?;
        let activity_level = u8::try_from(row.activity_level)
            .map_err(|e| invalid(format!("activity_level: {e}")))?;

        let profile = PetProfile {
            id: row.pet_id.clone(),
            name: row.name.clone(),
            species: Species::from(row.species.as_str()),
            breed: row.breed.clone(),
            age: PetAge { years, months },
            gender,
            activity_level,
            special_needs: row.special_needs.clone().filter(|s| !s.trim().is_empty()),
        };

        profile.validate().map_err(|e| invalid(e.to_string()))?;

        Ok(profile)
    }
}

const SELECT_PETS: &str = r#"
    SELECT pet_id, name, species, breed, gender, age_years, age_months,
           activity_level, special_needs
    FROM pets
"#;

/// PostgreSQL-backed pet store
pub struct PostgresClient {
    pool: PgPool,
}

impl PostgresClient {
    /// Create a new PostgreSQL client from a connection string
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self, PostgresError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(5))
            .idle_timeout(Duration::from_secs(600))
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
    ) -> Result<Self, PostgresError> {
        tracing::info!("Connecting to PostgreSQL");

        Self::new(url, max_connections.unwrap_or(10), min_connections.unwrap_or(1)).await
    }

    /// List all pets in creation order
    pub async fn list_pets(&self) -> Result<Vec<PetProfile>, PostgresError> {
        let query = format!("{SELECT_PETS} ORDER BY created_at, pet_id");

        let rows: Vec<PetRow> = sqlx::query_as(&query).fetch_all(&self.pool).await?;

        tracing::debug!("Listed {} pets", rows.len());

        rows.into_iter().map(PetProfile::try_from).collect()
    }

    /// Get a single pet by id
    pub async fn get_pet(&self, pet_id: &str) -> Result<Option<PetProfile>, PostgresError> {
        let query = format!("{SELECT_PETS} WHERE pet_id = $1");

        let row: Option<PetRow> = sqlx::query_as(&query)
            .bind(pet_id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(PetProfile::try_from).transpose()
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

#[async_trait]
impl ProfileStore for PostgresClient {
    async fn get(&self, id: &str) -> Result<Option<PetProfile>, StoreError> {
        Ok(self.get_pet(id).await?)
    }

    async fn list(&self) -> Result<Vec<PetProfile>, StoreError> {
        Ok(self.list_pets().await?)
    }

    async fn health_check(&self) -> bool {
        PostgresClient::health_check(self).await.unwrap_or(false)
    }
}
