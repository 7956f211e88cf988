//! Request/response shapes and route handlers. Every handler takes the single
//! bridge lock for the duration of its core call.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::Mutex;
use zer01ne_core::{
    BondReceipt, Bridge, BridgeError, ChildState, GatewayConfig, RegistrationReceipt,
    SafetyAlert, SystemStats, EQUATION, SAFETY_POINTS, TOTAL_POINTS, ZER01NE_POINTS,
};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) config: Arc<GatewayConfig>,
    /// The one critical section around all core state.
    pub(crate) bridge: Arc<Mutex<Bridge>>,
}

impl AppState {
    pub(crate) fn new(config: GatewayConfig, bridge: Bridge) -> Self {
        Self {
            config: Arc::new(config),
            bridge: Arc::new(Mutex::new(bridge)),
        }
    }
}

/// Caller-facing failure. Always rendered as 400 with `{"error": ...}`.
#[derive(Debug)]
pub(crate) enum ApiError {
    MissingFields,
    Bridge(BridgeError),
}

impl From<BridgeError> for ApiError {
    fn from(e: BridgeError) -> Self {
        ApiError::Bridge(e)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::debug!(error = %rejection, "request body rejected");
        ApiError::MissingFields
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = match self {
            ApiError::MissingFields => json!({ "error": "Missing required fields" }),
            ApiError::Bridge(e) => {
                let mut body = json!({ "error": e.to_string() });
                if let BridgeError::ValidationFailed(earth) = &e {
                    body["earth_result"] = json!(earth);
                }
                body
            }
        };
        (StatusCode::BAD_REQUEST, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

pub(crate) async fn home(State(state): State<AppState>) -> Json<serde_json::Value> {
    let cfg = &state.config;
    Json(json!({
        "system": cfg.system_name,
        "version": cfg.version,
        "zer01ne_points": ZER01NE_POINTS,
        "safety_points": SAFETY_POINTS,
        "total_points": TOTAL_POINTS,
        "equation": EQUATION,
        "genesis": cfg.genesis_timestamp,
        "status": "operational",
    }))
}

pub(crate) async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default(),
    }))
}

#[derive(Serialize)]
pub(crate) struct StatsResponse {
    system: String,
    version: String,
    zer01ne_points: u32,
    safety_points: u32,
    total_points: u32,
    equation: &'static str,
    #[serde(flatten)]
    stats: SystemStats,
    genesis: String,
    hardware_id: String,
}

pub(crate) async fn stats(State(state): State<AppState>) -> Json<StatsResponse> {
    let stats = state.bridge.lock().await.stats();
    let cfg = &state.config;
    Json(StatsResponse {
        system: cfg.system_name.clone(),
        version: cfg.version.clone(),
        zer01ne_points: ZER01NE_POINTS,
        safety_points: SAFETY_POINTS,
        total_points: TOTAL_POINTS,
        equation: EQUATION,
        stats,
        genesis: cfg.genesis_timestamp.clone(),
        hardware_id: cfg.hardware_id.clone(),
    })
}

#[derive(Deserialize)]
pub(crate) struct RegisterPoolRequest {
    owner_id: String,
    lat: f64,
    lon: f64,
    #[serde(default)]
    depth_m: Option<f64>,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Serialize)]
pub(crate) struct RegisterPoolResponse {
    success: bool,
    #[serde(flatten)]
    receipt: RegistrationReceipt,
    total_points: u32,
    zer01ne_points: u32,
    safety_points: u32,
    message: String,
}

/// POST /pool/register: Earth-validate, then open a session for the pool.
pub(crate) async fn register_pool(
    State(state): State<AppState>,
    payload: Result<Json<RegisterPoolRequest>, JsonRejection>,
) -> ApiResult<RegisterPoolResponse> {
    let Json(req) = payload?;
    let depth_m = req.depth_m.unwrap_or(state.config.default_depth_m);
    let name = req
        .name
        .unwrap_or_else(|| state.config.default_pool_name.clone());

    let receipt = state
        .bridge
        .lock()
        .await
        .register_location(&req.owner_id, req.lat, req.lon, depth_m, &name)?;

    Ok(Json(RegisterPoolResponse {
        success: true,
        receipt,
        total_points: TOTAL_POINTS,
        zer01ne_points: ZER01NE_POINTS,
        safety_points: SAFETY_POINTS,
        message: format!("{} - Complete system active", EQUATION),
    }))
}

#[derive(Deserialize)]
pub(crate) struct FamilyRequest {
    session_id: String,
    mother_id: String,
    child_id: String,
}

#[derive(Serialize)]
pub(crate) struct FamilyResponse {
    success: bool,
    #[serde(flatten)]
    receipt: BondReceipt,
}

pub(crate) async fn create_family(
    State(state): State<AppState>,
    payload: Result<Json<FamilyRequest>, JsonRejection>,
) -> ApiResult<FamilyResponse> {
    let Json(req) = payload?;
    let receipt = state.bridge.lock().await.create_family_bond(
        &req.session_id,
        &req.mother_id,
        &req.child_id,
    )?;
    Ok(Json(FamilyResponse {
        success: true,
        receipt,
    }))
}

#[derive(Deserialize)]
pub(crate) struct SafetyRequest {
    bond_id: String,
    child: ChildState,
}

pub(crate) async fn check_safety(
    State(state): State<AppState>,
    payload: Result<Json<SafetyRequest>, JsonRejection>,
) -> ApiResult<zer01ne_core::SafetyReport> {
    let Json(req) = payload?;
    let report = state
        .bridge
        .lock()
        .await
        .safety_check(&req.bond_id, &req.child)?;
    Ok(Json(report))
}

#[derive(Deserialize)]
pub(crate) struct AlertsQuery {
    since: Option<String>,
}

#[derive(Serialize)]
pub(crate) struct AlertsResponse {
    alerts: Vec<SafetyAlert>,
    count: usize,
}

/// GET /alerts?since=<epoch ms>. An unparsable cursor is ignored.
pub(crate) async fn get_alerts(
    State(state): State<AppState>,
    Query(query): Query<AlertsQuery>,
) -> Json<AlertsResponse> {
    let since = query.since.and_then(|s| s.trim().parse::<i64>().ok());
    let bridge = state.bridge.lock().await;
    Json(AlertsResponse {
        alerts: bridge.alerts(since).into_iter().cloned().collect(),
        count: bridge.alert_count(),
    })
}

#[derive(Deserialize)]
pub(crate) struct EarthValidateRequest {
    lat: f64,
    lon: f64,
    #[serde(default)]
    alt: Option<f64>,
}

/// POST /earth/validate: standalone breakdown; does not touch the shared phase.
pub(crate) async fn earth_validate(
    State(state): State<AppState>,
    payload: Result<Json<EarthValidateRequest>, JsonRejection>,
) -> ApiResult<zer01ne_core::ValidationResult> {
    let Json(req) = payload?;
    let alt = req.alt.unwrap_or(state.config.default_altitude_m);
    Ok(Json(Bridge::validate_location_only(req.lat, req.lon, alt)))
}
