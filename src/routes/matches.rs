use actix_web::{web, HttpResponse, Responder};
use validator::Validate;
use crate::core::{Matchmaker, MatchmakingError};
use crate::models::{ErrorResponse, FindMatchesRequest, FindMatchesResponse, HealthResponse};
use crate::services::ProfileStore;
use std::sync::Arc;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ProfileStore>,
    pub matchmaker: Matchmaker,
}

/// Configure all match-related routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/health", web::get().to(health_check))
        .route("/pets", web::get().to(list_pets))
        .route("/pets/{pet_id}", web::get().to(get_pet))
        .route("/playdates/matches", web::post().to(find_matches));
}

/// Health check endpoint
async fn health_check(state: web::Data<AppState>) -> impl Responder {
    let store_healthy = state.store.health_check().await;

    let status = if store_healthy { "healthy" } else { "degraded" };

    HttpResponse::Ok().json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
    })
}

/// List all pets
///
/// GET /api/v1/pets
async fn list_pets(state: web::Data<AppState>) -> impl Responder {
    match state.store.list().await {
        Ok(pets) => HttpResponse::Ok().json(pets),
        Err(e) => {
            tracing::error!("Failed to list pets: {}", e);
            HttpResponse::InternalServerError().json(ErrorResponse::new(
                "Failed to list pets",
                e.to_string(),
                500,
            ))
        }
    }
}

/// Get one pet
///
/// GET /api/v1/pets/{petId}
async fn get_pet(state: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    let pet_id = path.into_inner();

    match state.store.get(&pet_id).await {
        Ok(Some(pet)) => HttpResponse::Ok().json(pet),
        Ok(None) => HttpResponse::NotFound().json(ErrorResponse::new(
            "Pet not found",
            format!("No pet with id {}", pet_id),
            404,
        )),
        Err(e) => {
            tracing::error!("Failed to fetch pet {}: {}", pet_id, e);
            HttpResponse::InternalServerError().json(ErrorResponse::new(
                "Failed to fetch pet",
                e.to_string(),
                500,
            ))
        }
    }
}

/// Find playdate matches endpoint
///
/// POST /api/v1/playdates/matches
///
/// Request body:
/// ```json
/// {
///   "petId": "string"
/// }
/// ```
async fn find_matches(
    state: web::Data<AppState>,
    req: web::Json<FindMatchesRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        tracing::info!("Validation failed for find_matches request: {:?}", errors);
        return HttpResponse::BadRequest().json(ErrorResponse::new(
            "Validation failed",
            errors.to_string(),
            400,
        ));
    }

    let pet_id = &req.pet_id;

    tracing::info!("Finding playdate matches for pet: {}", pet_id);

    // Fresh snapshot of the store for every request; nothing is cached
    let profiles = match state.store.list().await {
        Ok(profiles) => profiles,
        Err(e) => {
            tracing::error!("Failed to load pets for {}: {}", pet_id, e);
            return HttpResponse::InternalServerError().json(ErrorResponse::new(
                "Failed to load pets",
                e.to_string(),
                500,
            ));
        }
    };

    match state.matchmaker.find_matches(pet_id, &profiles).await {
        Ok(outcome) => HttpResponse::Ok().json(FindMatchesResponse {
            subject_id: pet_id.clone(),
            matches: outcome.matches,
            total_candidates: outcome.total_candidates,
        }),
        Err(e) => error_response(&e),
    }
}

/// Map orchestrator errors to HTTP responses
///
/// Schema violations are reported generically; the details stay in the logs.
fn error_response(err: &MatchmakingError) -> HttpResponse {
    match err {
        MatchmakingError::NotFound(id) => HttpResponse::NotFound().json(ErrorResponse::new(
            "Pet not found",
            format!("No pet with id {}", id),
            404,
        )),
        MatchmakingError::SchemaViolation { .. } => HttpResponse::BadGateway().json(
            ErrorResponse::new("Matchmaking failed", "Matchmaking failed, please try again", 502),
        ),
        MatchmakingError::Unavailable(_) => HttpResponse::ServiceUnavailable().json(
            ErrorResponse::new(
                "Matchmaking unavailable",
                "Matchmaking is temporarily unavailable, please try again",
                503,
            )
            .retryable(),
        ),
    }
}
