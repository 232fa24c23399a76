mod config;
mod error;
mod handlers;
mod models;
mod services;
mod supabase;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderName, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::supabase::SupabaseClient;

/// Application state shared across handlers, read-only after startup
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub supabase: Option<Arc<SupabaseClient>>,
    pub supabase_error: Option<String>,
    pub http: reqwest::Client,
}

impl AppState {
    /// The platform handle, or a configuration error for every operation
    /// that cannot run without it.
    pub fn platform(&self) -> Result<&SupabaseClient> {
        self.supabase.as_deref().ok_or_else(|| {
            AppError::Config(self.supabase_error.clone().unwrap_or_else(|| {
                "Missing SUPABASE_URL or key (SUPABASE_SERVICE_ROLE_KEY/SUPABASE_KEY/SUPABASE_ANON_KEY)"
                    .to_string()
            }))
        })
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "codedrop=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting codedrop...");

    // Load configuration
    let config = Arc::new(Config::load()?);
    tracing::info!("Configuration loaded");

    // Build the platform client once; an unconfigured platform still serves
    // liveness and diagnostics, so this is not fatal.
    let (supabase, supabase_error) = if config.supabase.is_configured() {
        match SupabaseClient::from_config(&config.supabase) {
            Ok(client) => {
                tracing::info!(
                    "Data platform client created (key type: {})",
                    client.key_type().as_str()
                );
                (Some(Arc::new(client)), None)
            }
            Err(e) => {
                tracing::warn!("Failed to create data platform client: {}", e);
                (None, Some(e.to_string()))
            }
        }
    } else {
        tracing::warn!("Data platform not configured; API operations will fail until it is");
        (None, None)
    };

    let state = AppState {
        config: config.clone(),
        supabase,
        supabase_error,
        http: reqwest::Client::builder()
            .user_agent("codedrop/file-fetch")
            .build()?,
    };

    // Build router
    let app = create_router(state);

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config);
    let body_limit = state.config.upload.max_file_size + 1024 * 1024;

    let api_routes = Router::new()
        // Auth proxy
        .route("/api/auth/login", post(handlers::auth::login))
        .route("/api/auth/signup", post(handlers::auth::signup))
        .route("/api/auth/logout", post(handlers::auth::logout))
        .route("/api/auth/user", get(handlers::auth::current_user))
        // Shares
        .route("/api/shares", post(handlers::share::create_share))
        .route("/api/shares/:code", get(handlers::share::get_share))
        // User-scoped views
        .route("/api/me/stats", get(handlers::me::stats))
        .route("/api/me/shares", get(handlers::me::shares))
        .route("/api/me/analytics", get(handlers::me::user_analytics))
        .route("/api/me/activity", get(handlers::me::activity))
        // File delivery proxy
        .route("/api/files/fetch", get(handlers::file::fetch_file));

    Router::new()
        .route("/", get(handlers::health::root))
        .route("/ping", get(handlers::health::ping))
        .route("/health", get(handlers::health::health))
        .route("/supabase/health", get(handlers::health::supabase_health))
        .merge(api_routes)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

fn cors_layer(config: &Config) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors
        .origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-requested-with"),
        ])
        .allow_credentials(true)
        .expose_headers([
            header::CONTENT_TYPE,
            header::CONTENT_LENGTH,
            header::AUTHORIZATION,
        ])
        .max_age(Duration::from_secs(600))
}
