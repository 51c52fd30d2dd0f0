use actix_cors::Cors;
use actix_web::{web, App, HttpServer, HttpResponse, middleware, error, http::StatusCode};
use playdate_match::config::{Settings, StoreBackend};
use playdate_match::core::Matchmaker;
use playdate_match::models::ErrorResponse;
use playdate_match::routes::{self, matches::AppState};
use playdate_match::services::{
    AppwriteClient, HttpGenerator, InMemoryProfileStore, PostgresClient, ProfileStore, TextGenerator,
};
use std::sync::Arc;
use tracing::{info, error};
use tracing_subscriber::EnvFilter;

/// JSON error for rejected payloads
#[derive(Debug)]
struct JsonError(ErrorResponse);

impl std::fmt::Display for JsonError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.0.error, self.0.message)
    }
}

impl std::error::Error for JsonError {}

impl error::ResponseError for JsonError {
    fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.0.status_code).unwrap_or(StatusCode::BAD_REQUEST)
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(&self.0)
    }
}

/// Handle JSON payload errors
fn handle_json_payload_error(err: error::JsonPayloadError, req: &actix_web::HttpRequest) -> actix_web::Error {
    tracing::info!("JSON payload error on {}: {}", req.path(), err);
    JsonError(ErrorResponse::new("invalid_json", format!("Invalid JSON: {}", err), 400)).into()
}

/// Handle path extraction errors
fn handle_path_error(err: error::PathError, _req: &actix_web::HttpRequest) -> actix_web::Error {
    JsonError(ErrorResponse::new("invalid_path", format!("Invalid path: {}", err), 400)).into()
}

fn init_logging(settings: &Settings) {
    // LOG_LEVEL / LOG_FORMAT win over the config file
    let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| settings.logging.level.clone());
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| settings.logging.format.clone());

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true);

    if log_format == "pretty" {
        subscriber.pretty().init();
    } else {
        subscriber.json().init();
    }
}

async fn build_store(settings: &Settings) -> std::io::Result<Arc<dyn ProfileStore>> {
    let store: Arc<dyn ProfileStore> = match settings.store.backend {
        StoreBackend::Memory => {
            let store = match &settings.store.seed_file {
                Some(path) => InMemoryProfileStore::from_json_file(path).map_err(io_error)?,
                None => InMemoryProfileStore::default(),
            };
            info!("Using in-memory pet store ({} pets)", store.len());
            Arc::new(store)
        }
        StoreBackend::Appwrite => {
            let appwrite = settings
                .appwrite
                .clone()
                .ok_or_else(|| io_error("missing [appwrite] settings"))?;
            let client = AppwriteClient::new(
                appwrite.endpoint,
                appwrite.api_key,
                appwrite.project_id,
                appwrite.database_id,
                appwrite.pets_collection,
            )
            .map_err(io_error)?;
            info!("Appwrite pet store initialized");
            Arc::new(client)
        }
        StoreBackend::Postgres => {
            let database = settings
                .database
                .as_ref()
                .ok_or_else(|| io_error("missing [database] settings"))?;
            let client = PostgresClient::from_settings(
                &database.url,
                database.max_connections,
                database.min_connections,
            )
            .await
            .map_err(io_error)?;
            info!(
                "PostgreSQL pet store initialized (max: {} connections)",
                database.max_connections.unwrap_or(10)
            );
            Arc::new(client)
        }
    };

    Ok(store)
}

fn io_error<E: std::fmt::Display>(e: E) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::Other, e.to_string())
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenv::dotenv().ok();

    let settings = match Settings::load() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            return Err(io_error(e));
        }
    };

    init_logging(&settings);

    info!("Starting Playdate Match service...");

    let store = build_store(&settings).await.map_err(|e| {
        error!("Failed to initialize pet store: {}", e);
        e
    })?;

    let generator: Arc<dyn TextGenerator> = Arc::new(
        HttpGenerator::new(
            settings.generator.endpoint.clone(),
            settings.generator.api_key.clone(),
            settings.generator.model.clone(),
            settings.generator.temperature,
            settings.generator.timeout(),
        )
        .map_err(|e| {
            error!("Failed to create generator client: {}", e);
            io_error(e)
        })?,
    );

    let matchmaker = Matchmaker::new(
        generator,
        settings.generator.timeout(),
        settings.matching.max_results,
    );

    info!(
        "Matchmaker initialized (model: {}, timeout: {:?}, max results: {})",
        settings.generator.model,
        matchmaker.timeout(),
        matchmaker.max_results()
    );

    let app_state = AppState { store, matchmaker };

    // Configure HTTP server
    let host = settings.server.host.clone();
    let port = settings.server.port;
    let workers = settings.server.workers.unwrap_or(4);

    info!("Starting HTTP server on {}:{}", host, port);

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .app_data(web::JsonConfig::default().error_handler(handle_json_payload_error))
            .app_data(web::PathConfig::default().error_handler(handle_path_error))
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .wrap(middleware::Compress::default())
            .configure(routes::configure_routes)
    })
    .workers(workers)
    .bind((host, port))?
    .run()
    .await
}
