use crate::api::types::*;
use crate::config::{Config, HttpServerConfig};
use crate::db::Db;
use crate::error::{PocdeskError, Result};
use crate::ingest::{self, IngestReport, ParserRegistry, Upload};
use crate::model::{non_empty, PocStatus, Role, User};
use crate::store;
use axum::{
    body::Bytes,
    extract::{multipart::MultipartError, DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::de::DeserializeOwned;
use std::path::PathBuf;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    db: Db,
    registry: Arc<ParserRegistry>,
    temp_dir: PathBuf,
}

impl AppState {
    pub fn new(db: Db, temp_dir: impl Into<PathBuf>) -> Self {
        Self {
            db,
            registry: Arc::new(ParserRegistry::new()),
            temp_dir: temp_dir.into(),
        }
    }
}

/// HTTP API server
pub struct HttpServer {
    state: AppState,
    config: HttpServerConfig,
}

impl HttpServer {
    pub fn new(db: Db, config: &Config) -> Self {
        Self {
            state: AppState::new(db, config.temp_dir()),
            config: config.http_server.clone(),
        }
    }

    /// Run the HTTP server until the process is stopped
    pub async fn run(&self) -> Result<()> {
        let app = router(self.state.clone(), &self.config);
        let addr = format!("{}:{}", self.config.bind_address, self.config.port);

        let listener = tokio::net::TcpListener::bind(&addr).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::AddrInUse {
                PocdeskError::Config(format!(
                    "Port {} is already in use. Stop the other process or set http_server.port in config.toml",
                    self.config.port
                ))
            } else {
                PocdeskError::Io(e)
            }
        })?;

        log::info!("Starting pocdesk HTTP server on http://{}", addr);

        axum::serve(listener, app).await?;

        Ok(())
    }
}

/// Build the axum router
pub fn router(state: AppState, config: &HttpServerConfig) -> Router {
    // No configured origins means local development: allow any
    let cors = if config.allowed_origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<axum::http::HeaderValue> = config
            .allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    };

    Router::new()
        .route("/health", get(handle_health))
        .route("/api/add-company-with-file", post(handle_upload))
        .route("/api/add-companies", post(handle_add_companies))
        .route("/api/get-user-role", post(handle_user_role))
        .route("/api/get-all-companies", post(handle_list_companies))
        .route("/api/update-poc-status", post(handle_update_status))
        .route("/api/update-poc-remarks", post(handle_update_remarks))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors)
                .layer(DefaultBodyLimit::max(config.max_upload_bytes)),
        )
        .with_state(state)
}

fn error_response(err: &PocdeskError) -> Response {
    if err.is_client_error() {
        log::debug!("Request rejected: {}", err);
    } else {
        log::error!("Request failed: {}", err);
    }
    (
        err.status_code(),
        Json(serde_json::json!({
            "success": false,
            "message": err.public_message(),
            "error": err.to_string(),
        })),
    )
        .into_response()
}

/// Malformed or oversized multipart body, in the same shape as `error_response`
fn multipart_error_response(err: &MultipartError) -> Response {
    log::debug!("Multipart upload rejected: {}", err.body_text());
    (
        err.status(),
        Json(serde_json::json!({
            "success": false,
            "message": format!("Invalid upload: {}", err.body_text()),
            "error": err.body_text(),
        })),
    )
        .into_response()
}

fn parse_body<T: DeserializeOwned>(body: &Bytes) -> Result<T> {
    serde_json::from_slice(body).map_err(|e| PocdeskError::Validation(format!("Invalid JSON: {}", e)))
}

/// Resolve the caller: missing identity is a validation error, an unknown one unauthorized.
async fn authenticate(state: &AppState, email: Option<&str>) -> Result<User> {
    let email = non_empty(email)
        .ok_or_else(|| PocdeskError::Validation("Email is required".to_string()))?;

    let lookup = email.clone();
    state
        .db
        .with_connection(move |conn| store::resolve_user(conn, &lookup))
        .await?
        .ok_or_else(|| {
            log::warn!("Rejected unknown identity {}", email);
            PocdeskError::Unauthorized("Unauthorized".to_string())
        })
}

fn require_admin(user: &User, action: &str) -> Result<()> {
    if user.role == Role::Admin {
        Ok(())
    } else {
        Err(PocdeskError::Forbidden(format!("Only admins can {}", action)))
    }
}

/// 201 when every candidate landed, 207 on partial failure, 500 when none did
fn ingestion_response(report: IngestReport) -> Response {
    let count = report.affected_count();
    let (status, message) = if report.all_failed() {
        (StatusCode::INTERNAL_SERVER_ERROR, "Failed to save any company".to_string())
    } else if report.has_failures() {
        (
            StatusCode::MULTI_STATUS,
            format!(
                "Added {} companies, {} failed",
                count,
                report.failed_count()
            ),
        )
    } else {
        (StatusCode::CREATED, format!("Successfully added {} companies", count))
    };

    (
        status,
        Json(serde_json::json!({
            "success": !report.has_failures(),
            "message": message,
            "count": count,
            "companies": report.companies,
            "results": report.outcomes,
        })),
    )
        .into_response()
}

/// Handle health check endpoint
async fn handle_health() -> Response {
    (
        StatusCode::OK,
        Json(serde_json::json!({
            "status": "ok",
            "service": "pocdesk",
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
        .into_response()
}

/// Multipart upload with a `file` part and an `email` part
async fn handle_upload(State(state): State<AppState>, mut multipart: Multipart) -> Response {
    let mut email: Option<String> = None;
    let mut upload: Option<Upload> = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return multipart_error_response(&e),
        };

        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "email" => match field.text().await {
                Ok(text) => email = Some(text),
                Err(e) => return multipart_error_response(&e),
            },
            "file" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                match field.bytes().await {
                    Ok(bytes) => {
                        upload = Some(Upload {
                            file_name,
                            bytes: bytes.to_vec(),
                        })
                    }
                    Err(e) => return multipart_error_response(&e),
                }
            }
            other => log::debug!("Ignoring multipart field '{}'", other),
        }
    }

    let user = match authenticate(&state, email.as_deref()).await {
        Ok(user) => user,
        Err(e) => return error_response(&e),
    };

    let upload = match upload {
        Some(upload) if !upload.file_name.trim().is_empty() => upload,
        _ => return error_response(&PocdeskError::Validation("No file uploaded".to_string())),
    };

    match ingest::ingest_upload(
        &state.db,
        state.registry.clone(),
        &state.temp_dir,
        &user.email,
        upload,
    )
    .await
    {
        Ok(report) => ingestion_response(report),
        Err(e) => error_response(&e),
    }
}

/// JSON batch registration through the same fold + reconcile pipeline
async fn handle_add_companies(State(state): State<AppState>, body: Bytes) -> Response {
    let result = async {
        let request: AddCompaniesRequest = parse_body(&body)?;
        let user = authenticate(&state, request.email.as_deref()).await?;
        if request.companies.is_empty() {
            return Err(PocdeskError::Validation("Missing required fields".to_string()));
        }
        ingest::ingest_candidates(&state.db, request.companies, &user.email).await
    }
    .await;

    match result {
        Ok(report) => ingestion_response(report),
        Err(e) => error_response(&e),
    }
}

async fn handle_user_role(State(state): State<AppState>, body: Bytes) -> Response {
    let result = async {
        let request: IdentityRequest = parse_body(&body)?;
        authenticate(&state, request.email.as_deref()).await
    }
    .await;

    match result {
        Ok(user) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "success": true,
                "message": "User role fetched successfully",
                "role": user.role,
            })),
        )
            .into_response(),
        Err(e) => error_response(&e),
    }
}

/// All companies; POC contact details are hidden from `dpr` users
async fn handle_list_companies(State(state): State<AppState>, body: Bytes) -> Response {
    let result = async {
        let request: IdentityRequest = parse_body(&body)?;
        let user = authenticate(&state, request.email.as_deref()).await?;
        let companies = state.db.with_connection(|conn| store::list_companies(conn)).await?;
        Ok::<_, PocdeskError>(
            companies
                .iter()
                .map(|c| c.visible_to(user.role))
                .collect::<Vec<_>>(),
        )
    }
    .await;

    match result {
        Ok(companies) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "success": true,
                "message": "Companies fetched successfully",
                "companies": companies,
            })),
        )
            .into_response(),
        Err(e) => error_response(&e),
    }
}

async fn handle_update_status(State(state): State<AppState>, body: Bytes) -> Response {
    let result = async {
        let request: PocStatusRequest = parse_body(&body)?;
        let user = authenticate(&state, request.email.as_deref()).await?;
        let (company_id, poc_id, status) = match (
            non_empty(request.company_id.as_deref()),
            non_empty(request.poc_id.as_deref()),
            non_empty(request.status.as_deref()),
        ) {
            (Some(c), Some(p), Some(s)) => (c, p, s),
            _ => return Err(PocdeskError::Validation("Missing required fields".to_string())),
        };
        require_admin(&user, "update POC status")?;
        let status: PocStatus = status.parse()?;

        state
            .db
            .with_connection(move |conn| store::update_poc_status(conn, &company_id, &poc_id, status))
            .await?
            .ok_or_else(|| PocdeskError::NotFound("Company or POC not found".to_string()))
    }
    .await;

    match result {
        Ok(company) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "success": true,
                "message": "POC status updated",
                "company": company,
            })),
        )
            .into_response(),
        Err(e) => error_response(&e),
    }
}

async fn handle_update_remarks(State(state): State<AppState>, body: Bytes) -> Response {
    let result = async {
        let request: PocRemarksRequest = parse_body(&body)?;
        let user = authenticate(&state, request.email.as_deref()).await?;
        let (company_id, poc_id, remarks) = match (
            non_empty(request.company_id.as_deref()),
            non_empty(request.poc_id.as_deref()),
            non_empty(request.remarks.as_deref()),
        ) {
            (Some(c), Some(p), Some(r)) => (c, p, r),
            _ => return Err(PocdeskError::Validation("Missing required fields".to_string())),
        };
        require_admin(&user, "update POC remarks")?;

        state
            .db
            .with_connection(move |conn| store::update_poc_remarks(conn, &company_id, &poc_id, &remarks))
            .await?
            .ok_or_else(|| PocdeskError::NotFound("Company or POC not found".to_string()))
    }
    .await;

    match result {
        Ok(company) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "success": true,
                "message": "POC remarks updated",
                "company": company,
            })),
        )
            .into_response(),
        Err(e) => error_response(&e),
    }
}
