pub mod auth;
mod config;
mod pagination;
mod week;

use crate::server::auth::AuthCtx;
use crate::storage::models::Points;
use axum::http::{HeaderMap, HeaderName, HeaderValue};
use axum::middleware;
use axum::response::Response as AxumResponse;
use axum::{
    Json, Router,
    extract::{Extension, Path, Query, State},
    http::{Method, StatusCode, header},
    routing::{delete, get, post, put},
};
use bcrypt::verify;
pub use config::{AppConfig, ConfigError, UserConfig};
use pagination::PageParams;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{Span, info_span};
use uuid::Uuid;
pub use wellpoints_shared::auth::Role;
use wellpoints_shared::api::{self, PointsDto, PointsPerWeekDto};

/// Entity name used in validation alert payloads and headers.
const ENTITY_NAME: &str = "points";
/// Application prefix for entity alert headers.
const ALERT_HEADER: &str = "x-wellpoints-alert";
const ALERT_PARAMS_HEADER: &str = "x-wellpoints-params";

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub store: crate::storage::Store,
    shutdown: CancellationToken,
}

impl AppState {
    pub fn new(config: AppConfig, store: crate::storage::Store) -> Self {
        Self {
            config,
            store,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }
}

#[derive(Clone, Debug)]
struct ReqId(pub String);

pub fn router(state: AppState) -> Router {
    let private = Router::new()
        .route("/api/points", post(api_create_points))
        .route("/api/points", put(api_update_points))
        .route("/api/points", get(api_list_points))
        .route("/api/points/{id}", get(api_get_points))
        .route("/api/points/{id}", delete(api_delete_points))
        .route("/api/points-this-week", get(api_points_this_week))
        .route("/api/auth/logout", post(api_auth_logout))
        .with_state(state.clone())
        .layer(middleware::from_fn(set_auth_span_fields))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_bearer,
        ));

    // Trace with request context (method, path, request_id)
    let trace = TraceLayer::new_for_http().make_span_with(|req: &axum::http::Request<_>| {
        let request_id = req
            .extensions()
            .get::<ReqId>()
            .map(|r| r.0.clone())
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        info_span!(
            "request",
            method = %req.method(),
            path = %req.uri().path(),
            request_id = %request_id,
            username = tracing::field::Empty,
            role = tracing::field::Empty
        )
    });

    let app = Router::new()
        .route("/healthz", get(health))
        .route("/api/auth/login", post(api_auth_login))
        .merge(private)
        .with_state(state.clone())
        .layer(trace)
        .layer(middleware::from_fn(add_security_headers))
        .layer(middleware::from_fn(add_request_id));

    // Optionally add CORS for dev if configured

    if let Some(origin) = &state.config.dev_cors_origin {
        let hv = header::HeaderValue::from_str(origin)
            .unwrap_or(header::HeaderValue::from_static("http://localhost:4200"));
        let cors = CorsLayer::new()
            .allow_origin(hv)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);
        app.layer(cors)
    } else {
        app
    }
}

async fn health() -> &'static str {
    "ok"
}

async fn add_request_id(
    mut req: axum::http::Request<axum::body::Body>,
    next: axum::middleware::Next,
) -> Result<AxumResponse, AppError> {
    let hdr = HeaderName::from_static("x-request-id");
    // Use provided x-request-id if present, else generate
    let rid = req
        .headers()
        .get(&hdr)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    // Put into request extensions for trace layer & handlers
    req.extensions_mut().insert(ReqId(rid.clone()));
    let mut resp = next.run(req).await;
    // Set header on response
    if let Ok(hv) = HeaderValue::from_str(&rid) {
        resp.headers_mut().insert(hdr, hv);
    }
    Ok(resp)
}

async fn add_security_headers(
    req: axum::http::Request<axum::body::Body>,
    next: axum::middleware::Next,
) -> Result<AxumResponse, AppError> {
    let path = req.uri().path().to_string();
    let mut resp = next.run(req).await;

    // General security headers for all responses
    let headers = resp.headers_mut();
    headers.insert(
        HeaderName::from_static("x-content-type-options"),
        HeaderValue::from_static("nosniff"),
    );
    headers.insert(
        HeaderName::from_static("x-frame-options"),
        HeaderValue::from_static("SAMEORIGIN"),
    );
    headers.insert(
        HeaderName::from_static("referrer-policy"),
        HeaderValue::from_static("no-referrer"),
    );
    headers.insert(
        HeaderName::from_static("strict-transport-security"),
        HeaderValue::from_static("max-age=31536000; includeSubDomains"),
    );

    // Disable caching for API and health endpoints
    if path == "/healthz" || path.starts_with("/api/") || path == "/api" {
        headers.insert(
            HeaderName::from_static("cache-control"),
            HeaderValue::from_static("no-store, no-cache, must-revalidate, private"),
        );
        headers.insert(
            HeaderName::from_static("pragma"),
            HeaderValue::from_static("no-cache"),
        );
        headers.insert(
            HeaderName::from_static("expires"),
            HeaderValue::from_static("0"),
        );
    }

    Ok(resp)
}

async fn set_auth_span_fields(
    req: axum::http::Request<axum::body::Body>,
    next: axum::middleware::Next,
) -> Result<AxumResponse, AppError> {
    if let Some(auth) = req.extensions().get::<AuthCtx>() {
        let span = Span::current();
        span.record("username", tracing::field::display(auth.username()));
        span.record("role", tracing::field::debug(&auth.claims.role));
    }
    Ok(next.run(req).await)
}

async fn api_auth_login(
    State(state): State<AppState>,
    Json(body): Json<api::AuthReq>,
) -> Result<Json<api::AuthResp>, AppError> {
    // Find user in config
    let user = state.config.find_user(&body.username).ok_or_else(|| {
        tracing::warn!(username=%body.username, "login: unknown username");
        AppError::unauthorized()
    })?;
    if !verify(&body.password, &user.password_hash).map_err(|e| {
        tracing::error!(username=%body.username, error=%e, "login: bcrypt verify failed");
        AppError::internal(e)
    })? {
        tracing::warn!(username=%body.username, "login: invalid password");
        return Err(AppError::unauthorized());
    }
    let token = auth::issue_jwt_for_user(&state, &user.username, user.role).await?;
    Ok(Json(api::AuthResp { token }))
}

async fn api_auth_logout(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthCtx>,
) -> Result<StatusCode, AppError> {
    // Dropping the session row invalidates the token immediately, before
    // its exp would
    state
        .store
        .delete_session(&auth.claims.jti)
        .await
        .map_err(AppError::internal)?;
    Ok(StatusCode::NO_CONTENT)
}

fn points_dto(p: Points) -> PointsDto {
    PointsDto {
        id: Some(p.id),
        username: Some(p.username),
        date: p.date,
        exercise: p.exercise,
        meals: p.meals,
        alcohol: p.alcohol,
    }
}

/// Counters are small non-negative integers; reject anything negative
/// before it reaches the store.
fn validate_counters(dto: &PointsDto) -> Result<(), AppError> {
    if dto.exercise < 0 || dto.meals < 0 || dto.alcohol < 0 {
        return Err(AppError::bad_request_alert(
            "counters must be non-negative",
            "negative",
        ));
    }
    Ok(())
}

/// Resolve the owner of an incoming payload. Non-admins always own their
/// records regardless of the payload; admins may name any configured user
/// and default to themselves.
fn resolve_owner(state: &AppState, auth: &AuthCtx, dto: &PointsDto) -> Result<String, AppError> {
    if !auth.is_admin() {
        return Ok(auth.username().to_string());
    }
    let owner = dto
        .username
        .clone()
        .unwrap_or_else(|| auth.username().to_string());
    if state.config.find_user(&owner).is_none() {
        return Err(AppError::bad_request_alert(
            format!("unknown user: {owner}"),
            "userinvalid",
        ));
    }
    Ok(owner)
}

fn entity_alert_headers(action: &str, param: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    if let Ok(v) = HeaderValue::from_str(&format!("{ENTITY_NAME}.{action}")) {
        headers.insert(HeaderName::from_static(ALERT_HEADER), v);
    }
    if let Ok(v) = HeaderValue::from_str(param) {
        headers.insert(HeaderName::from_static(ALERT_PARAMS_HEADER), v);
    }
    headers
}

async fn api_create_points(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthCtx>,
    Json(body): Json<PointsDto>,
) -> Result<(StatusCode, HeaderMap, Json<PointsDto>), AppError> {
    if body.id.is_some() {
        return Err(AppError::bad_request_alert(
            "a new points record cannot already have an id",
            "idexists",
        ));
    }
    validate_counters(&body)?;
    let owner = resolve_owner(&state, &auth, &body)?;

    let created = state
        .store
        .create_points(&owner, body.date, body.exercise, body.meals, body.alcohol)
        .await
        .map_err(AppError::internal)?;

    let mut headers = entity_alert_headers("created", &created.id.to_string());
    let location = wellpoints_shared::api::endpoints::points_by_id("", created.id);
    if let Ok(v) = HeaderValue::from_str(&location) {
        headers.insert(header::LOCATION, v);
    }
    Ok((StatusCode::CREATED, headers, Json(points_dto(created))))
}

async fn api_update_points(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthCtx>,
    Json(body): Json<PointsDto>,
) -> Result<(HeaderMap, Json<PointsDto>), AppError> {
    let Some(points_id) = body.id else {
        return Err(AppError::bad_request_alert("invalid id", "idnull"));
    };
    validate_counters(&body)?;
    let owner = resolve_owner(&state, &auth, &body)?;

    let replacement = Points {
        id: points_id,
        username: owner,
        date: body.date,
        exercise: body.exercise,
        meals: body.meals,
        alcohol: body.alcohol,
    };
    let updated = state
        .store
        .update_points(replacement)
        .await
        .map_err(AppError::internal)?
        .ok_or_else(|| AppError::not_found(format!("points not found: {points_id}")))?;

    let headers = entity_alert_headers("updated", &points_id.to_string());
    Ok((headers, Json(points_dto(updated))))
}

async fn api_list_points(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthCtx>,
    Query(params): Query<PageParams>,
) -> Result<(HeaderMap, Json<Vec<PointsDto>>), AppError> {
    let page = params.page();
    let per_page = params.per_page();

    // Single capability check selects the query; never parallel code paths
    let (rows, total) = if auth.is_admin() {
        state.store.list_points(page, per_page).await
    } else {
        state
            .store
            .list_points_for_user(auth.username(), page, per_page)
            .await
    }
    .map_err(AppError::internal)?;

    let path = format!("{}/points", api::API_PREFIX);
    let headers = pagination::pagination_headers(&path, page, per_page, total);
    let items = rows.into_iter().map(points_dto).collect();
    Ok((headers, Json(items)))
}

async fn api_get_points(
    State(state): State<AppState>,
    Extension(_auth): Extension<AuthCtx>,
    Path(points_id): Path<i32>,
) -> Result<Json<PointsDto>, AppError> {
    let found = state
        .store
        .get_points(points_id)
        .await
        .map_err(AppError::internal)?
        .ok_or_else(|| AppError::not_found(format!("points not found: {points_id}")))?;
    Ok(Json(points_dto(found)))
}

async fn api_delete_points(
    State(state): State<AppState>,
    Extension(_auth): Extension<AuthCtx>,
    Path(points_id): Path<i32>,
) -> Result<(StatusCode, HeaderMap), AppError> {
    // Deletion is unconditional given a valid id; a missing row still
    // yields 204 (the end state is the same)
    state
        .store
        .delete_points(points_id)
        .await
        .map_err(AppError::internal)?;
    let headers = entity_alert_headers("deleted", &points_id.to_string());
    Ok((StatusCode::NO_CONTENT, headers))
}

#[derive(Deserialize)]
struct TzParam {
    tz: Option<String>,
}

async fn api_points_this_week(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthCtx>,
    Query(params): Query<TzParam>,
) -> Result<Json<PointsPerWeekDto>, AppError> {
    let today = week::today_in(params.tz.as_deref())
        .map_err(|e| AppError::bad_request_alert(e.to_string(), "tzinvalid"))?;
    let window = week::week_window(today);
    tracing::debug!(start = %window.start, end = %window.end, "weekly summary window");

    let rows = state
        .store
        .points_between(auth.username(), window.start, window.end)
        .await
        .map_err(AppError::internal)?;
    let points = rows.iter().map(Points::total).sum();

    Ok(Json(PointsPerWeekDto {
        week: window.start,
        points,
    }))
}

#[derive(Debug)]
pub enum AppError {
    /// Validation failure carrying the entity name and an error key the
    /// client can map to a field-level alert.
    BadRequestAlert {
        message: String,
        error_key: &'static str,
    },
    Unauthorized,
    Forbidden,
    NotFound(String),
    Internal(String),
}

impl AppError {
    fn bad_request_alert<T: Into<String>>(msg: T, error_key: &'static str) -> Self {
        Self::BadRequestAlert {
            message: msg.into(),
            error_key,
        }
    }
    fn unauthorized() -> Self {
        Self::Unauthorized
    }
    fn forbidden() -> Self {
        Self::Forbidden
    }
    fn not_found<T: Into<String>>(msg: T) -> Self {
        Self::NotFound(msg.into())
    }
    fn internal<E: std::fmt::Display>(e: E) -> Self {
        Self::Internal(e.to_string())
    }
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, msg, kind, error_key, detail) = match self {
            AppError::BadRequestAlert { message, error_key } => (
                StatusCode::BAD_REQUEST,
                message,
                "bad_request",
                Some(error_key),
                None,
            ),
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "unauthorized".into(),
                "unauthorized",
                None,
                None,
            ),
            AppError::Forbidden => (
                StatusCode::FORBIDDEN,
                "forbidden".into(),
                "forbidden",
                None,
                None,
            ),
            AppError::NotFound(m) => (StatusCode::NOT_FOUND, m, "not_found", None, None),
            // Do not leak internal error details to clients, but log them
            AppError::Internal(m) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal server error".into(),
                "internal",
                None,
                Some(m),
            ),
        };
        if let Some(detail) = detail {
            tracing::error!(status = %status, kind = kind, message = %msg, detail = %detail, "request failed");
        } else {
            tracing::error!(status = %status, kind = kind, message = %msg, "request failed");
        }
        let body = axum::Json(api::ErrorDto {
            error: msg,
            entity_name: error_key.map(|_| ENTITY_NAME.to_string()),
            error_key: error_key.map(|k| k.to_string()),
        });
        (status, body).into_response()
    }
}
