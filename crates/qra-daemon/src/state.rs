//! Shared runtime state for qra-daemon.
//!
//! `AppState` is built once at boot and handed to Axum as
//! `State<Arc<AppState>>`. The gate's `{mode, token}` pair lives only inside
//! `AppState::gate`; handlers and background tasks go through it and never
//! keep a copy past one request or one tick.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use qra_config::GateConfig;
use qra_gate::{Mode, ModeState, TokenGenerator};
use qra_store::{
    AttendanceSink, CsvAttendanceLog, CsvStudentRegistry, MemoryAttendanceLog,
    MemoryStudentRegistry, StudentRegistry,
};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::info;

use crate::publisher::{PngQrRenderer, QrPublisher, QrRenderer};

// ---------------------------------------------------------------------------
// BusMsg — SSE event bus payload
// ---------------------------------------------------------------------------

/// Messages broadcast over the internal event bus and surfaced as SSE events.
///
/// Tokens are never put on the bus; listeners refetch `/qr_image` or
/// `/current_qr_token` when they see a new generation.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BusMsg {
    Heartbeat { ts_millis: i64 },
    QrRotated { generation: u64 },
    ModeChanged { mode: Mode, generation: u64 },
}

// ---------------------------------------------------------------------------
// BuildInfo
// ---------------------------------------------------------------------------

/// Static build metadata included in health responses.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BuildInfo {
    pub service: &'static str,
    pub version: &'static str,
}

// ---------------------------------------------------------------------------
// AppState
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct AppState {
    /// Broadcast bus for SSE.
    pub bus: broadcast::Sender<BusMsg>,
    /// Static build metadata.
    pub build: BuildInfo,
    /// The one `{mode, token}` record.
    pub gate: Arc<ModeState>,
    pub tokens: TokenGenerator,
    pub publisher: Arc<QrPublisher>,
    pub students: Arc<dyn StudentRegistry>,
    pub attendance: Arc<dyn AttendanceSink>,
}

impl AppState {
    pub fn new(
        tokens: TokenGenerator,
        publisher: QrPublisher,
        students: Arc<dyn StudentRegistry>,
        attendance: Arc<dyn AttendanceSink>,
    ) -> Self {
        let (bus, _rx) = broadcast::channel::<BusMsg>(1024);
        Self {
            bus,
            build: BuildInfo {
                service: "qra-daemon",
                version: env!("CARGO_PKG_VERSION"),
            },
            gate: Arc::new(ModeState::new()),
            tokens,
            publisher: Arc::new(publisher),
            students,
            attendance,
        }
    }

    /// Production wiring: CSV stores and PNG rendering as configured.
    pub fn from_config(cfg: &GateConfig) -> anyhow::Result<Self> {
        let students = CsvStudentRegistry::open(&cfg.students_csv)
            .with_context(|| format!("open students csv {:?}", cfg.students_csv))?;
        let attendance = CsvAttendanceLog::open(&cfg.attendance_csv)
            .with_context(|| format!("open attendance log {:?}", cfg.attendance_csv))?;

        if let Some(out) = &cfg.qr_output_path {
            if let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("create_dir_all {:?}", parent))?;
            }
        }

        info!(
            students = ?cfg.students_csv,
            attendance = ?cfg.attendance_csv,
            qr_output = ?cfg.qr_output_path,
            "stores opened"
        );

        let publisher = QrPublisher::new(
            cfg.public_base_url.clone(),
            Arc::new(PngQrRenderer::new(cfg.qr_module_px)),
            cfg.qr_output_path.clone(),
        );

        Ok(Self::new(
            TokenGenerator::new(cfg.token_bytes),
            publisher,
            Arc::new(students),
            Arc::new(attendance),
        ))
    }

    /// Everything in memory, rendered with `renderer`. Used by tests and by
    /// throwaway demo runs.
    pub fn in_memory(
        renderer: Arc<dyn QrRenderer>,
        students: Arc<MemoryStudentRegistry>,
        attendance: Arc<MemoryAttendanceLog>,
    ) -> Self {
        let publisher = QrPublisher::new(qra_config::DEFAULT_PUBLIC_BASE_URL, renderer, None);
        Self::new(TokenGenerator::default(), publisher, students, attendance)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Monotonically increasing uptime since first call (process lifetime).
pub fn uptime_secs() -> u64 {
    static START: std::sync::OnceLock<std::time::Instant> = std::sync::OnceLock::new();
    START
        .get_or_init(std::time::Instant::now)
        .elapsed()
        .as_secs()
}

/// Spawn a background task that emits a heartbeat SSE every `interval`.
pub fn spawn_heartbeat(bus: broadcast::Sender<BusMsg>, interval: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            let ts = chrono::Utc::now().timestamp_millis();
            let _ = bus.send(BusMsg::Heartbeat { ts_millis: ts });
        }
    });
}
