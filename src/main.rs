use actix_cors::Cors;
use actix_web::{web, App, HttpServer, HttpResponse, middleware, error, http::StatusCode};
use roommate_match::config::{LoggingSettings, Settings, StorageBackend};
use roommate_match::core::{CompatibilityScorer, MatchCoordinator, MatchStore, ProfileStore};
use roommate_match::models::ScoringWeights;
use roommate_match::routes::{self, matches::AppState};
use roommate_match::services::{CacheManager, InMemoryStore, PostgresStore};
use std::sync::Arc;
use tracing::{info, warn, error};
use tracing_subscriber::EnvFilter;

/// JSON error response for JSON payload errors
#[derive(Debug, serde::Serialize)]
pub struct JsonError {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}

impl std::fmt::Display for JsonError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error, self.message)
    }
}

impl std::error::Error for JsonError {}

impl error::ResponseError for JsonError {
    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::BAD_REQUEST))
            .json(self)
    }
}

/// Handle JSON payload errors
pub fn handle_json_payload_error(err: error::JsonPayloadError, req: &actix_web::HttpRequest) -> actix_web::Error {
    tracing::info!("JSON payload error on {}: {}", req.path(), err);
    JsonError {
        error: "invalid_json".to_string(),
        message: format!("Invalid JSON: {}", err),
        status_code: 400,
    }
    .into()
}

/// Handle query payload errors
pub fn handle_query_payload_error(err: error::QueryPayloadError, _req: &actix_web::HttpRequest) -> actix_web::Error {
    JsonError {
        error: "invalid_query".to_string(),
        message: format!("Invalid query: {}", err),
        status_code: 400,
    }
    .into()
}

/// LOG_LEVEL / LOG_FORMAT override the configured logging settings
fn init_logging(logging: &LoggingSettings) {
    let level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| logging.level.clone());
    let format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| logging.format.clone());

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&level));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true);

    match format.as_str() {
        "pretty" => subscriber.pretty().init(),
        "json" => subscriber.json().init(),
        _ => subscriber.init(),
    }
}

async fn build_cache(settings: &Settings) -> Arc<CacheManager> {
    let ttl = settings.cache.ttl_secs.unwrap_or(300);
    let l1_size = settings.cache.l1_cache_size.unwrap_or(10_000);

    let Some(redis_url) = settings.cache.redis_url.as_deref() else {
        info!("Score cache running in-process only (L1: {} entries, TTL: {}s)", l1_size, ttl);
        return Arc::new(CacheManager::in_memory(l1_size, ttl));
    };

    match CacheManager::new(redis_url, l1_size, ttl).await {
        Ok(cache) => {
            info!("Score cache initialized with Redis (L1: {} entries, TTL: {}s)", l1_size, ttl);
            Arc::new(cache)
        }
        Err(e) => {
            warn!("Failed to connect to Redis ({}), falling back to in-process cache", e);
            Arc::new(CacheManager::in_memory(l1_size, ttl))
        }
    }
}

async fn build_stores(settings: &Settings) -> std::io::Result<(Arc<dyn ProfileStore>, Arc<dyn MatchStore>)> {
    match settings.storage.backend {
        StorageBackend::Memory => {
            warn!("Using in-memory storage; match records are lost on restart");
            let store = Arc::new(InMemoryStore::new());
            let profiles: Arc<dyn ProfileStore> = store.clone();
            let matches: Arc<dyn MatchStore> = store;
            Ok((profiles, matches))
        }
        StorageBackend::Postgres => {
            let db = &settings.database;
            let store = PostgresStore::from_settings(
                &db.url,
                db.max_connections,
                db.min_connections,
                db.acquire_timeout_secs,
                db.idle_timeout_secs,
            )
            .await
            .map_err(|e| {
                error!("Failed to connect to PostgreSQL: {}", e);
                std::io::Error::new(std::io::ErrorKind::Other, e.to_string())
            })?;

            info!("PostgreSQL store initialized (max: {} connections)", db.max_connections.unwrap_or(10));
            let store = Arc::new(store);
            let profiles: Arc<dyn ProfileStore> = store.clone();
            let matches: Arc<dyn MatchStore> = store;
            Ok((profiles, matches))
        }
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenv::dotenv().ok();

    let settings = match Settings::load() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return Err(std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string()));
        }
    };

    init_logging(&settings.logging);
    info!("Starting roommate matching service...");

    let cache = build_cache(&settings).await;
    let (profiles, matches) = build_stores(&settings).await?;

    let weights = ScoringWeights::from(&settings.scoring.weights);
    let scorer = CompatibilityScorer::new(weights);
    info!("Scorer initialized with weights: {:?}", scorer.weights());

    let options = settings.matching.coordinator_options();
    let coordinator = MatchCoordinator::new(profiles, matches, scorer, options).with_cache(cache);
    info!("Match coordinator initialized: {:?}", options);

    let app_state = AppState {
        coordinator: Arc::new(coordinator),
    };

    let host = settings.server.host.clone();
    let port = settings.server.port;
    let workers = settings.server.workers.unwrap_or(4);

    info!("Starting HTTP server on {}:{}", host, port);

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .app_data(web::JsonConfig::default().error_handler(handle_json_payload_error))
            .app_data(web::QueryConfig::default().error_handler(handle_query_payload_error))
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
