//! Scenario: production wiring end to end on a temp directory
//!
//! # Invariants under test
//!
//! 1. `AppState::from_config` opens CSV stores and mirrors the QR PNG to
//!    `qr.output_path` (parent directories created at boot).
//! 2. Register via HTTP writes `name,roll` rows; check-in via HTTP appends
//!    `name,roll,timestamp` rows, one per scan.
//! 3. The mirrored file and `/qr_image` are the same real PNG.

use std::sync::Arc;

use axum::http::{header, Request, StatusCode};
use http_body_util::BodyExt;
use qra_config::{load_layered_yaml_from_strings, GateConfig};
use qra_daemon::{routes, state::AppState, switch};
use tower::ServiceExt; // oneshot

const PNG_MAGIC: &[u8] = b"\x89PNG\r\n\x1a\n";

async fn request(st: &Arc<AppState>, req: Request<axum::body::Body>) -> (StatusCode, bytes::Bytes) {
    let resp = routes::build_router(Arc::clone(st)).oneshot(req).await.unwrap();
    let status = resp.status();
    (status, resp.into_body().collect().await.unwrap().to_bytes())
}

fn post_form(uri: &str, body: String) -> Request<axum::body::Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(axum::body::Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn register_then_check_in_twice_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().display().to_string();
    let yaml = format!(
        r#"
server:
  public_base_url: "https://gate.example"
storage:
  students_csv: "{root}/data/students.csv"
  attendance_csv: "{root}/data/attendance_log.csv"
qr:
  output_path: "{root}/static/qr.png"
  module_px: 2
"#
    );
    let loaded = load_layered_yaml_from_strings(&[yaml.as_str()]).unwrap();
    let cfg = GateConfig::from_config_json(&loaded.config_json).unwrap();
    let st = Arc::new(AppState::from_config(&cfg).unwrap());
    assert!(dir.path().join("static").is_dir());

    // Register Alice.
    let token = switch::switch_to_register(&st).await;
    let (status, body) = request(
        &st,
        post_form("/register", format!("name=Alice&roll=R1&token={}", token.as_str())),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{:?}", body);

    let students = std::fs::read_to_string(dir.path().join("data/students.csv")).unwrap();
    assert_eq!(students, "name,roll\nAlice,R1\n");

    // Check in twice with the attendance token.
    let token = switch::switch_to_attendance(&st).await;
    for _ in 0..2 {
        let (status, body) = request(
            &st,
            post_form("/scan", format!("token={}&roll=R1", token.as_str())),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["name"], "Alice");
    }

    let log = std::fs::read_to_string(dir.path().join("data/attendance_log.csv")).unwrap();
    let lines: Vec<&str> = log.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines.iter().all(|l| l.starts_with("Alice,R1,")));

    // Mirrored PNG matches the served one.
    let on_disk = std::fs::read(dir.path().join("static/qr.png")).unwrap();
    assert!(on_disk.starts_with(PNG_MAGIC));

    let (status, served) = request(
        &st,
        Request::builder()
            .uri("/qr_image")
            .body(axum::body::Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(&served[..], &on_disk[..]);
}
