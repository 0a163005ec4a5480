// Location Reference Data - Web Server
// Upload endpoint for workbook imports plus simple lookups by code

use axum::{
    body::Bytes,
    extract::{Path as UrlPath, State},
    http::{header::CONTENT_TYPE, HeaderMap, StatusCode},
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use serde::Serialize;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tower_http::cors::CorsLayer;

use location_refdata::{
    City, ImportError, ImportOrchestrator, ImportReport, ReferenceDataStore, SqliteStore,
    State as StateEntity,
};

/// Shared application state
#[derive(Clone)]
struct AppState {
    store: Arc<Mutex<SqliteStore>>,
}

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
            error: None,
        }
    }
}

impl ApiResponse<()> {
    fn err(message: String) -> Self {
        Self {
            success: false,
            data: (),
            error: Some(message),
        }
    }
}

#[derive(Serialize)]
struct StateResponse {
    code: u32,
    name: String,
    abbreviation: String,
}

impl From<StateEntity> for StateResponse {
    fn from(state: StateEntity) -> Self {
        Self {
            code: state.code(),
            name: state.name().to_string(),
            abbreviation: state.abbreviation().to_string(),
        }
    }
}

#[derive(Serialize)]
struct CityResponse {
    code: u32,
    name: String,
    state_code: u32,
}

impl From<City> for CityResponse {
    fn from(city: City) -> Self {
        Self {
            code: city.code(),
            name: city.name().to_string(),
            state_code: city.state_code(),
        }
    }
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /is-alive - Health check
async fn is_alive() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// POST /api/v1/locations/import-data - Upload a workbook and reconcile it
async fn import_data(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("")
        .to_string();

    let result: Result<ImportReport, ImportError> = {
        let mut store = state.store.lock().unwrap();
        ImportOrchestrator::new(&mut *store).import(&content_type, &body)
    };

    match result {
        Ok(report) => (StatusCode::ACCEPTED, Json(ApiResponse::ok(report))).into_response(),
        Err(err @ ImportError::UnsupportedContentType(_)) => (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::err(err.to_string())),
        )
            .into_response(),
        Err(err) => {
            eprintln!("import failed: {}", err);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::err("import failed".to_string())),
            )
                .into_response()
        }
    }
}

/// GET /api/v1/states/{code}
async fn get_state(
    State(state): State<AppState>,
    UrlPath(code): UrlPath<u32>,
) -> impl IntoResponse {
    let store = state.store.lock().unwrap();

    match store.get_state(code) {
        Ok(Some(found)) => {
            (StatusCode::OK, Json(ApiResponse::ok(StateResponse::from(found)))).into_response()
        }
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(ApiResponse::err(format!("no state with code {}", code))),
        )
            .into_response(),
        Err(err) => {
            eprintln!("state lookup failed: {}", err);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// GET /api/v1/cities/{code}
async fn get_city(
    State(state): State<AppState>,
    UrlPath(code): UrlPath<u32>,
) -> impl IntoResponse {
    let store = state.store.lock().unwrap();

    match store.get_city(code) {
        Ok(Some(found)) => {
            (StatusCode::OK, Json(ApiResponse::ok(CityResponse::from(found)))).into_response()
        }
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(ApiResponse::err(format!("no city with code {}", code))),
        )
            .into_response(),
        Err(err) => {
            eprintln!("city lookup failed: {}", err);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

// ============================================================================
// Server setup
// ============================================================================

#[tokio::main]
async fn main() {
    let db_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "locations.db".to_string());

    let store = match SqliteStore::open(Path::new(&db_path)) {
        Ok(store) => store,
        Err(err) => {
            eprintln!("failed to open database {}: {}", db_path, err);
            std::process::exit(1);
        }
    };

    let app_state = AppState {
        store: Arc::new(Mutex::new(store)),
    };

    let app = Router::new()
        .route("/is-alive", get(is_alive))
        .route("/api/v1/locations/import-data", post(import_data))
        .route("/api/v1/states/:code", get(get_state))
        .route("/api/v1/cities/:code", get(get_city))
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    let addr = "0.0.0.0:3000";
    println!("location-refdata server listening on {}", addr);
    println!("  GET  /is-alive");
    println!("  POST /api/v1/locations/import-data");
    println!("  GET  /api/v1/states/:code");
    println!("  GET  /api/v1/cities/:code");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("failed to bind server address");
    axum::serve(listener, app)
        .await
        .expect("server terminated unexpectedly");
}
