//! Axum router and all HTTP handlers for qra-daemon.
//!
//! `build_router` is the single entry point; `main.rs` calls it and attaches
//! middleware layers. Scenario tests in `tests/` compose the bare router.
//!
//! Token rejections are 4xx (`403` expired, `409` wrong mode). Business
//! outcomes that are not errors (already registered, roll not found) are
//! `200` with their own text. Storage failures are `503`.

use std::{convert::Infallible, sync::Arc};

use axum::{
    extract::{rejection::FormRejection, Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        Html, IntoResponse, Response,
    },
    routing::{get, post},
    Form, Json, Router,
};
use futures_util::{Stream, StreamExt};
use qra_gate::{Mode, Rejection, Token};
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;

use crate::{
    api_types::{
        HealthResponse, RegisterForm, ScanForm, ScanFormQuery, ScanResponse, StatusResponse,
        TokenResponse,
    },
    dispatch::{self, CheckInOutcome, RegisterOutcome},
    state::{uptime_secs, AppState, BusMsg},
    switch, views,
};

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Build the complete application router wired to the given shared state.
///
/// Middleware layers (tracing) are **not** applied here; `main.rs` attaches
/// them after this call so tests can use the bare router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/qr_image", get(qr_image))
        .route("/current_qr_token", get(current_qr_token))
        .route("/generate_register_qr", get(generate_register_qr))
        .route("/scan_form", get(scan_form))
        .route("/register", post(register))
        .route("/scan", post(scan))
        .route("/health", get(health))
        .route("/status", get(status_handler))
        .route("/stream", get(stream))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// GET /   and   GET /generate_register_qr
// ---------------------------------------------------------------------------

/// Back to attendance mode (with an immediately valid token), landing view.
pub(crate) async fn home(State(st): State<Arc<AppState>>) -> Html<String> {
    switch::switch_to_attendance(&st).await;
    Html(views::landing_page())
}

pub(crate) async fn generate_register_qr(State(st): State<Arc<AppState>>) -> Html<String> {
    switch::switch_to_register(&st).await;
    Html(views::landing_page())
}

// ---------------------------------------------------------------------------
// GET /qr_image
// ---------------------------------------------------------------------------

pub(crate) async fn qr_image(State(st): State<Arc<AppState>>) -> Response {
    match st.publisher.current().await {
        Some(qr) => (
            [
                (header::CONTENT_TYPE, "image/png"),
                (header::CACHE_CONTROL, "no-store"),
            ],
            qr.png.to_vec(),
        )
            .into_response(),
        None => (StatusCode::SERVICE_UNAVAILABLE, "QR image not ready.").into_response(),
    }
}

// ---------------------------------------------------------------------------
// GET /current_qr_token
// ---------------------------------------------------------------------------

pub(crate) async fn current_qr_token(State(st): State<Arc<AppState>>) -> Response {
    let snap = st.gate.read().await;
    (
        [(header::CACHE_CONTROL, "no-store")],
        Json(TokenResponse {
            token: snap.token.as_str().to_string(),
        }),
    )
        .into_response()
}

// ---------------------------------------------------------------------------
// GET /scan_form?token=T
// ---------------------------------------------------------------------------

pub(crate) async fn scan_form(
    State(st): State<Arc<AppState>>,
    Query(q): Query<ScanFormQuery>,
) -> Response {
    let token = Token::new(q.token.unwrap_or_default());
    match st.gate.resolve(&token).await {
        Ok(Mode::Register) => Html(views::register_form(token.as_str())).into_response(),
        Ok(Mode::Attendance) => Html(views::scan_form(token.as_str())).into_response(),
        Err(_) => (StatusCode::FORBIDDEN, "Invalid or expired QR code.").into_response(),
    }
}

// ---------------------------------------------------------------------------
// POST /register
// ---------------------------------------------------------------------------

pub(crate) async fn register(
    State(st): State<Arc<AppState>>,
    Form(f): Form<RegisterForm>,
) -> Response {
    let (status, body) = match dispatch::register(&st, &f.token, &f.roll, &f.name).await {
        RegisterOutcome::Registered => (StatusCode::OK, "Registration successful."),
        RegisterOutcome::AlreadyRegistered => (StatusCode::OK, "Student already exists."),
        RegisterOutcome::Rejected(Rejection::Expired) => {
            (StatusCode::FORBIDDEN, "Invalid registration token.")
        }
        RegisterOutcome::Rejected(Rejection::WrongMode) => {
            (StatusCode::CONFLICT, "Registration is not open.")
        }
        RegisterOutcome::Invalid(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
        RegisterOutcome::StorageUnavailable => {
            (StatusCode::SERVICE_UNAVAILABLE, "Storage unavailable.")
        }
    };
    (status, body).into_response()
}

// ---------------------------------------------------------------------------
// POST /scan
// ---------------------------------------------------------------------------

/// Always answers `{success, ...}` JSON, including for bodies the form
/// extractor cannot decode.
pub(crate) async fn scan(
    State(st): State<Arc<AppState>>,
    form: Result<Form<ScanForm>, FormRejection>,
) -> Response {
    let f = match form {
        Ok(Form(f)) => f,
        Err(e) => {
            let body = ScanResponse::failed(format!("bad request: {}", e.body_text()));
            return (StatusCode::UNPROCESSABLE_ENTITY, Json(body)).into_response();
        }
    };
    let (status, body) = match dispatch::check_in(&st, &f.token, &f.roll).await {
        CheckInOutcome::CheckedIn(s) => (StatusCode::OK, ScanResponse::checked_in(s.name, s.roll)),
        CheckInOutcome::RollNotFound => (StatusCode::OK, ScanResponse::failed("roll not found")),
        CheckInOutcome::Rejected(Rejection::Expired) => {
            (StatusCode::FORBIDDEN, ScanResponse::failed("invalid or expired"))
        }
        CheckInOutcome::Rejected(Rejection::WrongMode) => {
            (StatusCode::CONFLICT, ScanResponse::failed("wrong mode"))
        }
        CheckInOutcome::Invalid(msg) => (StatusCode::UNPROCESSABLE_ENTITY, ScanResponse::failed(msg)),
        CheckInOutcome::StorageUnavailable => (
            StatusCode::SERVICE_UNAVAILABLE,
            ScanResponse::failed("storage unavailable"),
        ),
    };
    (status, Json(body)).into_response()
}

// ---------------------------------------------------------------------------
// GET /health   GET /status
// ---------------------------------------------------------------------------

pub(crate) async fn health(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            ok: true,
            service: st.build.service.to_string(),
            version: st.build.version.to_string(),
        }),
    )
}

pub(crate) async fn status_handler(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    let snap = st.gate.read().await;
    let has_image = st.publisher.current().await.is_some();
    (
        StatusCode::OK,
        Json(StatusResponse {
            mode: snap.mode,
            generation: snap.generation,
            has_image,
            uptime_secs: uptime_secs(),
        }),
    )
}

// ---------------------------------------------------------------------------
// GET /stream  (SSE)
// ---------------------------------------------------------------------------

pub(crate) async fn stream(State(st): State<Arc<AppState>>) -> Response {
    let mut headers = HeaderMap::new();
    headers.insert("Cache-Control", HeaderValue::from_static("no-cache"));
    headers.insert("Connection", HeaderValue::from_static("keep-alive"));

    let rx = st.bus.subscribe();
    let events = broadcast_to_sse(rx);

    (headers, Sse::new(events).keep_alive(KeepAlive::new())).into_response()
}

fn broadcast_to_sse(
    rx: broadcast::Receiver<BusMsg>,
) -> impl Stream<Item = Result<Event, Infallible>> {
    BroadcastStream::new(rx).filter_map(|msg| async move {
        match msg {
            Ok(m) => {
                let event_name = match &m {
                    BusMsg::Heartbeat { .. } => "heartbeat",
                    BusMsg::QrRotated { .. } => "qr_rotated",
                    BusMsg::ModeChanged { .. } => "mode_changed",
                };
                let data = serde_json::to_string(&m).ok()?;
                Some(Ok(Event::default().event(event_name).data(data)))
            }
            Err(_) => None, // lagged / closed
        }
    })
}
