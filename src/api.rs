// 🌐 REST API with Axum
//
// One ParkingLot behind one mutex: every handler holds the lock for the
// whole operation, so two gates can never be handed the same slot.
// The AI call is the exception: aggregates are copied under the lock and
// the lock is released before awaiting the remote service.

use async_trait::async_trait;
use axum::{
    extract::{FromRequestParts, Path, Query, State},
    http::{header, request::Parts, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post, put},
    Router,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::access::{AdminCredentials, Role, View};
use crate::analysis::{analyze_or_fallback, AnalysisRequest, AnalysisResult, Analyst};
use crate::billing::Invoice;
use crate::error::LotError;
use crate::export::{transactions_to_csv, transactions_to_json};
use crate::lot::{ParkingLot, ParkingStats};
use crate::ledger::ParkingTransaction;
use crate::slots::{Slot, SlotStatus};
use crate::tasks::{task_sections, TaskSection};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    lot: Arc<Mutex<ParkingLot>>,
    analyst: Arc<dyn Analyst>,
    admin: AdminCredentials,
    /// Bearer token → role, issued by the login routes
    sessions: Arc<Mutex<HashMap<String, Role>>>,
}

impl AppState {
    pub fn new(lot: ParkingLot, analyst: Arc<dyn Analyst>, admin: AdminCredentials) -> Self {
        AppState {
            lot: Arc::new(Mutex::new(lot)),
            analyst,
            admin,
            sessions: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn lot(&self) -> MutexGuard<'_, ParkingLot> {
        // A panicked handler cannot leave the lot half-updated: every
        // mutation is a single method call.
        self.lot.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn sessions(&self) -> MutexGuard<'_, HashMap<String, Role>> {
        self.sessions.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn open_session(&self, role: Role) -> String {
        let token = Uuid::new_v4().simple().to_string();
        self.sessions().insert(token.clone(), role);
        token
    }

    fn session_role(&self, token: &str) -> Option<Role> {
        self.sessions().get(token).copied()
    }
}

// ============================================================================
// SESSIONS
// ============================================================================

/// Caller identified by `Authorization: Bearer <token>`
///
/// Handlers behind a view take this extractor and call `require` first.
/// Kiosk routes (map, entry, exit) stay open to anonymous drivers.
pub struct Session {
    pub role: Role,
}

impl Session {
    fn require(&self, view: View) -> Result<(), ApiError> {
        if self.role.can_access(view) {
            Ok(())
        } else {
            tracing::warn!(role = ?self.role, view = view.title(), "access denied");
            Err(LotError::AccessDenied(view).into())
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for Session {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.strip_prefix("Bearer "))
            .map(str::trim);

        let Some(token) = token else {
            tracing::warn!(uri = %parts.uri, "missing session token");
            return Err(LotError::LoginRequired.into());
        };

        match state.session_role(token) {
            Some(role) => Ok(Session { role }),
            None => {
                tracing::warn!(uri = %parts.uri, "unknown session token");
                Err(LotError::LoginRequired.into())
            }
        }
    }
}

// ============================================================================
// RESPONSE ENVELOPE
// ============================================================================

/// API Response wrapper
#[derive(Serialize)]
pub struct ApiResponse<T> {
    success: bool,
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}

impl ApiResponse<()> {
    fn err(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
        }
    }
}

type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

fn ok<T>(data: T) -> ApiResult<T> {
    Ok(Json(ApiResponse::ok(data)))
}

/// Lot errors mapped onto HTTP status codes
pub struct ApiError(LotError);

impl From<LotError> for ApiError {
    fn from(e: LotError) -> Self {
        ApiError(e)
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self.0 {
            LotError::EmptyPlate
            | LotError::EmptyLabel
            | LotError::InvalidRate
            | LotError::InvalidFloor(_)
            | LotError::InvalidInvoice(_)
            | LotError::InvalidStatusChange(_) => StatusCode::BAD_REQUEST,
            LotError::InvalidCredentials | LotError::LoginRequired => StatusCode::UNAUTHORIZED,
            LotError::AccessDenied(_) => StatusCode::FORBIDDEN,
            LotError::PlateNotFound(_) | LotError::SlotNotFound(_) => StatusCode::NOT_FOUND,
            LotError::DuplicatePlate(_)
            | LotError::LotFull
            | LotError::MissingEntryTime(_)
            | LotError::StaleInvoice { .. }
            | LotError::SlotOccupied(_)
            | LotError::DuplicateLabel(_) => StatusCode::CONFLICT,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        (status, Json(ApiResponse::err(self.0.to_string()))).into_response()
    }
}

// ============================================================================
// REQUEST BODIES
// ============================================================================

#[derive(Deserialize)]
pub struct PlateRequest {
    plate: String,
}

#[derive(Deserialize)]
pub struct NewSlotRequest {
    label: String,
    #[serde(default = "default_floor")]
    floor: i32,
}

fn default_floor() -> i32 {
    1
}

#[derive(Deserialize)]
pub struct StatusRequest {
    status: SlotStatus,
}

#[derive(Deserialize)]
pub struct RateRequest {
    rate: u64,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    username: String,
    password: String,
}

#[derive(Deserialize)]
pub struct RecentQuery {
    #[serde(default = "default_recent_limit")]
    limit: usize,
}

fn default_recent_limit() -> usize {
    8
}

#[derive(Serialize)]
struct LoginResponse {
    token: String,
    role: Role,
    landing: View,
    views: Vec<View>,
}

impl LoginResponse {
    fn new(token: String, role: Role) -> Self {
        LoginResponse {
            token,
            role,
            landing: role.landing_view(),
            views: role.views(),
        }
    }
}

#[derive(Serialize)]
struct SettingsResponse {
    minute_rate: u64,
    suggested_label: String,
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// GET /api/slots - Live map (open)
async fn list_slots(State(state): State<AppState>) -> impl IntoResponse {
    let slots = state.lot().slots().to_vec();
    Json(ApiResponse::ok(slots))
}

/// POST /api/slots - Add a slot
async fn add_slot(
    State(state): State<AppState>,
    session: Session,
    Json(req): Json<NewSlotRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Slot>>), ApiError> {
    session.require(View::Settings)?;
    let slot = state.lot().add_slot(&req.label, req.floor)?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(slot))))
}

/// GET /api/slots/suggested-label
async fn suggested_label(State(state): State<AppState>, session: Session) -> ApiResult<String> {
    session.require(View::Settings)?;
    let label = state.lot().suggested_label();
    ok(label)
}

/// PUT /api/slots/:id/status - Reserve / maintenance / release a slot
async fn set_slot_status(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<u32>,
    Json(req): Json<StatusRequest>,
) -> ApiResult<Slot> {
    session.require(View::Settings)?;
    let slot = state.lot().set_slot_status(id, req.status)?;
    ok(slot)
}

/// GET /api/stats
async fn get_stats(State(state): State<AppState>, session: Session) -> ApiResult<ParkingStats> {
    session.require(View::Dashboard)?;
    let stats = state.lot().stats();
    ok(stats)
}

/// GET /api/transactions
async fn list_transactions(
    State(state): State<AppState>,
    session: Session,
) -> ApiResult<Vec<ParkingTransaction>> {
    session.require(View::Dashboard)?;
    let transactions = state.lot().transactions().to_vec();
    ok(transactions)
}

/// GET /api/transactions/recent?limit=n - Newest first
async fn recent_transactions(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<RecentQuery>,
) -> ApiResult<Vec<ParkingTransaction>> {
    session.require(View::Dashboard)?;
    let recent = state.lot().recent_transactions(query.limit);
    ok(recent)
}

/// POST /api/entry - Vehicle arrives at the gate
async fn vehicle_entry(
    State(state): State<AppState>,
    Json(req): Json<PlateRequest>,
) -> ApiResult<Slot> {
    let slot = state.lot().enter(&req.plate)?;
    ok(slot)
}

/// POST /api/exit/request - Price the stay (no state change)
async fn exit_request(State(state): State<AppState>, Json(req): Json<PlateRequest>) -> ApiResult<Invoice> {
    let invoice = state.lot().request_exit(&req.plate)?;
    ok(invoice)
}

/// POST /api/exit/confirm - Payment done, free the slot
///
/// The invoice is checked against the lot, so an edited or replayed one fails.
async fn exit_confirm(
    State(state): State<AppState>,
    Json(invoice): Json<Invoice>,
) -> ApiResult<Option<ParkingTransaction>> {
    let completed = state.lot().confirm_exit(&invoice)?;
    ok(completed)
}

/// GET /api/settings
async fn get_settings(State(state): State<AppState>, session: Session) -> ApiResult<SettingsResponse> {
    session.require(View::Settings)?;
    let settings = {
        let lot = state.lot();
        SettingsResponse {
            minute_rate: lot.minute_rate(),
            suggested_label: lot.suggested_label(),
        }
    };
    ok(settings)
}

/// PUT /api/settings/rate
async fn set_rate(
    State(state): State<AppState>,
    session: Session,
    Json(req): Json<RateRequest>,
) -> ApiResult<u64> {
    session.require(View::Settings)?;
    let rate = {
        let mut lot = state.lot();
        lot.set_minute_rate(req.rate)?;
        lot.minute_rate()
    };
    ok(rate)
}

/// POST /api/login - Admin login, returns a bearer token
async fn login(State(state): State<AppState>, Json(req): Json<LoginRequest>) -> ApiResult<LoginResponse> {
    let role = state.admin.authenticate(&req.username, &req.password)?;
    let token = state.open_session(role);
    ok(LoginResponse::new(token, role))
}

/// POST /api/login/driver - Driver session, no credentials
async fn driver_login(State(state): State<AppState>) -> ApiResult<LoginResponse> {
    let token = state.open_session(Role::User);
    ok(LoginResponse::new(token, Role::User))
}

/// GET /api/tasks
async fn list_tasks(session: Session) -> ApiResult<&'static [TaskSection]> {
    session.require(View::Tasks)?;
    ok(task_sections())
}

/// POST /api/analysis - AI report (falls back, never fails)
async fn run_analysis(State(state): State<AppState>, session: Session) -> ApiResult<AnalysisResult> {
    session.require(View::Reports)?;
    let request = {
        let lot = state.lot();
        AnalysisRequest::from_lot(&lot)
    };
    let result = analyze_or_fallback(state.analyst.as_ref(), &request).await;
    ok(result)
}

/// GET /api/export/json
async fn export_json(State(state): State<AppState>, session: Session) -> Result<Response, ApiError> {
    session.require(View::Reports)?;
    let body = transactions_to_json(state.lot().transactions());
    Ok(export_response(body, "application/json"))
}

/// GET /api/export/csv
async fn export_csv(State(state): State<AppState>, session: Session) -> Result<Response, ApiError> {
    session.require(View::Reports)?;
    let body = transactions_to_csv(state.lot().transactions());
    Ok(export_response(body, "text/csv; charset=utf-8"))
}

fn export_response(body: anyhow::Result<String>, content_type: &'static str) -> Response {
    match body {
        Ok(body) => ([(header::CONTENT_TYPE, content_type)], body).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "export failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::err(e.to_string())),
            )
                .into_response()
        }
    }
}

// ============================================================================
// ROUTER
// ============================================================================

pub fn router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/slots", get(list_slots).post(add_slot))
        .route("/slots/suggested-label", get(suggested_label))
        .route("/slots/:id/status", put(set_slot_status))
        .route("/stats", get(get_stats))
        .route("/transactions", get(list_transactions))
        .route("/transactions/recent", get(recent_transactions))
        .route("/entry", post(vehicle_entry))
        .route("/exit/request", post(exit_request))
        .route("/exit/confirm", post(exit_confirm))
        .route("/settings", get(get_settings))
        .route("/settings/rate", put(set_rate))
        .route("/login", post(login))
        .route("/login/driver", post(driver_login))
        .route("/tasks", get(list_tasks))
        .route("/analysis", post(run_analysis))
        .route("/export/json", get(export_json))
        .route("/export/csv", get(export_csv))
        .with_state(state);

    Router::new()
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

// ============================================================================
// TESTS
// ============================================================================
