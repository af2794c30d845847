// Capital Repair Import - Query Server
// Read-only REST API over the canonical tables (Axum)

use anyhow::{Context, Result};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use capital_repair::db::{self, PageRequest};
use capital_repair::{AppConfig, ImportError};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Shared application state
#[derive(Clone)]
struct AppState {
    db: Arc<Mutex<Connection>>,
}

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    fn ok(data: T) -> Response {
        let body = Self {
            success: true,
            data: Some(data),
            error: None,
        };
        (StatusCode::OK, Json(body)).into_response()
    }
}

fn failure(status: StatusCode, message: impl Into<String>) -> Response {
    let body = ApiResponse::<()> {
        success: false,
        data: None,
        error: Some(message.into()),
    };
    (status, Json(body)).into_response()
}

fn internal_error(context: &str, err: ImportError) -> Response {
    error!(error = %err, "{}", context);
    failure(StatusCode::INTERNAL_SERVER_ERROR, context)
}

/// `?page=&per_page=&search=&region=`
#[derive(Debug, Default, Deserialize)]
struct ListQuery {
    page: Option<u32>,
    per_page: Option<u32>,
    search: Option<String>,
    region: Option<String>,
}

impl ListQuery {
    fn page_request(&self) -> PageRequest {
        PageRequest::new(self.page, self.per_page)
    }
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> Response {
    ApiResponse::ok("OK")
}

/// GET /api/stats - Row counts of every table
async fn get_stats(State(state): State<AppState>) -> Response {
    let Ok(conn) = state.db.lock() else {
        return failure(StatusCode::INTERNAL_SERVER_ERROR, "database lock poisoned");
    };
    match db::table_counts(&conn) {
        Ok(counts) => ApiResponse::ok(counts),
        Err(e) => internal_error("Error getting stats", e),
    }
}

/// GET /api/regions - Per-region building and company counts
async fn get_regions(State(state): State<AppState>) -> Response {
    let Ok(conn) = state.db.lock() else {
        return failure(StatusCode::INTERNAL_SERVER_ERROR, "database lock poisoned");
    };
    match db::region_summaries(&conn) {
        Ok(regions) => ApiResponse::ok(regions),
        Err(e) => internal_error("Error getting regions", e),
    }
}

/// GET /api/buildings - Paginated buildings, filtered by region and search text
async fn get_buildings(State(state): State<AppState>, Query(query): Query<ListQuery>) -> Response {
    let Ok(conn) = state.db.lock() else {
        return failure(StatusCode::INTERNAL_SERVER_ERROR, "database lock poisoned");
    };
    match db::list_buildings(
        &conn,
        query.region.as_deref(),
        query.search.as_deref(),
        query.page_request(),
    ) {
        Ok(page) => ApiResponse::ok(page),
        Err(e) => internal_error("Error listing buildings", e),
    }
}

/// GET /api/companies - Paginated management companies
async fn get_companies(State(state): State<AppState>, Query(query): Query<ListQuery>) -> Response {
    let Ok(conn) = state.db.lock() else {
        return failure(StatusCode::INTERNAL_SERVER_ERROR, "database lock poisoned");
    };
    match db::list_companies(&conn, query.search.as_deref(), query.page_request()) {
        Ok(page) => ApiResponse::ok(page),
        Err(e) => internal_error("Error listing companies", e),
    }
}

/// GET /api/companies/:id - Company with its managed buildings
async fn get_company(State(state): State<AppState>, Path(id): Path<i64>) -> Response {
    let Ok(conn) = state.db.lock() else {
        return failure(StatusCode::INTERNAL_SERVER_ERROR, "database lock poisoned");
    };
    match db::get_company(&conn, id) {
        Ok(Some(detail)) => ApiResponse::ok(detail),
        Ok(None) => failure(StatusCode::NOT_FOUND, format!("Company {} not found", id)),
        Err(e) => internal_error("Error getting company", e),
    }
}

fn router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/stats", get(get_stats))
        .route("/regions", get(get_regions))
        .route("/buildings", get(get_buildings))
        .route("/companies", get(get_companies))
        .route("/companies/:id", get(get_company))
        .with_state(state);

    Router::new()
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

// ============================================================================
// Main Server
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info,tower_http=debug".into()))
        .with(fmt::layer())
        .init();

    println!("🌐 Capital Repair - Query Server");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let config_path = std::env::var("CAPREPAIR_CONFIG").ok().map(PathBuf::from);
    let config = AppConfig::load(config_path.as_deref()).context("Failed to load configuration")?;

    if !config.db_path.exists() {
        eprintln!("❌ Database not found at {}", config.db_path.display());
        eprintln!("   Run: capital-repair full");
        eprintln!("   to import data first.");
        std::process::exit(1);
    }

    let conn = db::open_database(&config.db_path)
        .with_context(|| format!("Failed to open database {}", config.db_path.display()))?;
    println!("✓ Database opened: {}", config.db_path.display());

    let state = AppState {
        db: Arc::new(Mutex::new(conn)),
    };

    let addr = std::env::var("CAPREPAIR_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!(addr = %addr, "server listening");
    println!("\n🚀 Server running on http://{}", addr);
    println!("   API: http://{}/api/stats", addr);
    println!("\n   Press Ctrl+C to stop\n");

    axum::serve(listener, router(state))
        .await
        .context("Server failed")?;
    Ok(())
}
