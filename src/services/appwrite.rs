use crate::models::{PetProfile, PetRecord};
use crate::services::store::{ProfileStore, StoreError};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur when interacting with Appwrite
#[derive(Debug, Error)]
pub enum AppwriteError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("API returned error: {0}")]
    ApiError(String),

    #[error("Unauthorized: invalid API key or token")]
    Unauthorized,

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),
}

/// Documents requested per page when listing
const LIST_PAGE_LIMIT: usize = 500;

/// One page of the documents endpoint
struct DocumentPage {
    records: Vec<PetRecord>,
    /// Documents returned, parseable or not
    document_count: usize,
}

/// Appwrite API client for the pets collection
pub struct AppwriteClient {
    base_url: String,
    api_key: String,
    project_id: String,
    database_id: String,
    pets_collection: String,
    page_limit: usize,
    client: Client,
}

impl AppwriteClient {
    /// Create a new Appwrite client
    pub fn new(
        base_url: String,
        api_key: String,
        project_id: String,
        database_id: String,
        pets_collection: String,
    ) -> Result<Self, AppwriteError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            base_url,
            api_key,
            project_id,
            database_id,
            pets_collection,
            page_limit: LIST_PAGE_LIMIT,
            client,
        })
    }

    /// Override the page size used by `list_pets`
    pub fn with_page_limit(mut self, page_limit: usize) -> Self {
        self.page_limit = page_limit.max(1);
        self
    }

    fn documents_url(&self, queries: &[String]) -> Result<String, AppwriteError> {
        let queries_json = serde_json::to_string(queries)
            .map_err(|e| AppwriteError::InvalidResponse(e.to_string()))?;

        Ok(format!(
            "{}/databases/{}/collections/{}/documents?query={}",
            self.base_url.trim_end_matches('/'),
            self.database_id,
            self.pets_collection,
            urlencoding::encode(&queries_json)
        ))
    }

    async fn fetch_documents(&self, queries: &[String]) -> Result<DocumentPage, AppwriteError> {
        let url = self.documents_url(queries)?;

        tracing::debug!("Fetching pets from: {}", url);

        let response = self
            .client
            .get(&url)
            .header("X-Appwrite-Key", &self.api_key)
            .header("X-Appwrite-Project", &self.project_id)
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(AppwriteError::Unauthorized);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_else(|_| "Unable to read body".to_string());
            tracing::error!("Failed to fetch pets: {} - {}", status, body);
            return Err(AppwriteError::ApiError(format!("Failed to fetch pets: {}", status)));
        }

        let json: Value = response.json().await?;

        let documents = json
            .get("documents")
            .and_then(|d| d.as_array())
            .ok_or_else(|| AppwriteError::InvalidResponse("Missing documents array".into()))?;

        // Documents that fail to parse are skipped, not fatal
        let records: Vec<PetRecord> = documents
            .iter()
            .filter_map(|doc| {
                let data = doc.get("data").unwrap_or(doc);
                match serde_json::from_value(data.clone()) {
                    Ok(record) => Some(record),
                    Err(e) => {
                        tracing::warn!("Skipping malformed pet document: {}", e);
                        None
                    }
                }
            })
            .collect();

        Ok(DocumentPage {
            records,
            document_count: documents.len(),
        })
    }

    /// List all pets, oldest first
    ///
    /// Pages through the collection until a short page comes back.
    pub async fn list_pets(&self) -> Result<Vec<PetProfile>, AppwriteError> {
        let mut profiles: Vec<PetProfile> = Vec::new();
        let mut offset = 0usize;

        loop {
            let queries = vec![
                "orderAsc(\"$createdAt\")".to_string(),
                format!("limit({})", self.page_limit),
                format!("offset({})", offset),
            ];

            let page = self.fetch_documents(&queries).await?;

            profiles.extend(page.records.into_iter().filter_map(|record| {
                match record.into_profile() {
                    Ok(profile) => Some(profile),
                    Err(e) => {
                        tracing::warn!("Skipping invalid pet: {}", e);
                        None
                    }
                }
            }));

            if page.document_count < self.page_limit {
                break;
            }
            offset += page.document_count;
        }

        tracing::debug!("Listed {} pets", profiles.len());

        Ok(profiles)
    }

    /// Get a single pet by id
    pub async fn get_pet(&self, pet_id: &str) -> Result<Option<PetProfile>, AppwriteError> {
        let queries = vec![pet_id_query(pet_id)?, "limit(1)".to_string()];

        match self.fetch_documents(&queries).await?.records.into_iter().next() {
            Some(record) => record
                .into_profile()
                .map(Some)
                .map_err(AppwriteError::InvalidResponse),
            None => Ok(None),
        }
    }
}

/// `equal` query on `petId` with the id JSON-escaped
fn pet_id_query(pet_id: &str) -> Result<String, AppwriteError> {
    let value = serde_json::to_string(pet_id)
        .map_err(|e| AppwriteError::InvalidResponse(e.to_string()))?;
    Ok(format!("equal(\"petId\", {})", value))
}

#[async_trait]
impl ProfileStore for AppwriteClient {
    async fn get(&self, id: &str) -> Result<Option<PetProfile>, StoreError> {
        Ok(self.get_pet(id).await?)
    }

    async fn list(&self) -> Result<Vec<PetProfile>, StoreError> {
        Ok(self.list_pets().await?)
    }

    async fn health_check(&self) -> bool {
        let queries = vec!["limit(1)".to_string()];
        self.fetch_documents(&queries).await.is_ok()
    }
}
