use async_trait::async_trait;
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;

use crate::models::{PetProfile, PetRecord};
use crate::services::appwrite::AppwriteError;
use crate::services::postgres::PostgresError;

/// Errors that can occur when reading pet profiles
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Appwrite error: {0}")]
    Appwrite(#[from] AppwriteError),

    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] PostgresError),

    #[error("Failed to read seed file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid seed data: {0}")]
    InvalidSeed(String),

    #[error("Duplicate pet id: {0}")]
    DuplicateId(String),
}

/// Read access to stored pet profiles
///
/// `list` returns profiles in a stable order; the matchmaker uses that order
/// to break score ties.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn get(&self, id: &str) -> Result<Option<PetProfile>, StoreError>;

    async fn list(&self) -> Result<Vec<PetProfile>, StoreError>;

    async fn health_check(&self) -> bool {
        true
    }
}

/// Fixed, in-process profile store
///
/// Used for local development (seeded from a JSON file of pet records) and
/// in tests.
#[derive(Debug, Clone, Default)]
pub struct InMemoryProfileStore {
    profiles: Vec<PetProfile>,
}

impl InMemoryProfileStore {
    pub fn new(profiles: Vec<PetProfile>) -> Result<Self, StoreError> {
        let mut ids = HashSet::with_capacity(profiles.len());
        for profile in &profiles {
            if !ids.insert(profile.id.as_str()) {
                return Err(StoreError::DuplicateId(profile.id.clone()));
            }
        }
        Ok(Self { profiles })
    }

    /// Load pet records from a JSON file
    ///
    /// Accepts either a bare array of records or an object with a `pets`
    /// array, the layout of the social app's mock data.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&content)
    }

    pub fn from_json_str(content: &str) -> Result<Self, StoreError> {
        let value: serde_json::Value = serde_json::from_str(content)
            .map_err(|e| StoreError::InvalidSeed(e.to_string()))?;

        let records = match value.get("pets") {
            Some(pets) => pets.clone(),
            None => value,
        };

        let records: Vec<PetRecord> = serde_json::from_value(records)
            .map_err(|e| StoreError::InvalidSeed(e.to_string()))?;

        let profiles = records
            .into_iter()
            .map(PetRecord::into_profile)
            .collect::<Result<Vec<_>, _>>()
            .map_err(StoreError::InvalidSeed)?;

        tracing::debug!("Loaded {} pets from seed data", profiles.len());

        Self::new(profiles)
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

#[async_trait]
impl ProfileStore for InMemoryProfileStore {
    async fn get(&self, id: &str) -> Result<Option<PetProfile>, StoreError> {
        Ok(self.profiles.iter().find(|p| p.id == id).cloned())
    }

    async fn list(&self) -> Result<Vec<PetProfile>, StoreError> {
        Ok(self.profiles.clone())
    }
}
