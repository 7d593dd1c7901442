/// Dashboard server tests: routing, page rendering, upload and chat endpoints.
///
/// Each test runs the dashboard on an ephemeral port, backed by a canned
/// analysis server.
mod common;

use std::thread;
use std::time::Duration;

use abcxyz::analytics::ActivityLog;
use abcxyz::api::ApiClient;
use abcxyz::config::AbcxyzConfig;
use abcxyz::web::{self, Dashboard};
use serde_json::{Value, json};
use tiny_http::Server;

use common::{MockBackend, Route, get, post, rows_body, upload_body};

struct Harness {
    base_url: String,
    backend: MockBackend,
    log: ActivityLog,
    _dir: TempDir,
}

/// Scratch directory removed on drop.
struct TempDir(std::path::PathBuf);

impl TempDir {
    fn new(tag: &str) -> Self {
        let dir = std::env::temp_dir().join(format!(
            "abcxyz_dashboard_{tag}_{}_{}",
            std::process::id(),
            chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        Self(dir)
    }
}

impl Drop for TempDir {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.0);
    }
}

fn start(tag: &str, routes: Vec<Route>) -> Harness {
    let backend = MockBackend::start(routes);
    let dir = TempDir::new(tag);
    let log = ActivityLog::at(dir.0.join("activity.jsonl"));

    let client = ApiClient::new(&backend.base_url, Duration::from_secs(5));
    let mut dashboard =
        Dashboard::new(Box::new(client), AbcxyzConfig::default()).with_log(log.clone());

    let server = Server::http("127.0.0.1:0").unwrap();
    let addr = server.server_addr().to_ip().unwrap();
    thread::spawn(move || web::run(&server, &mut dashboard));

    Harness {
        base_url: format!("http://{addr}"),
        backend,
        log,
        _dir: dir,
    }
}

fn send(req: ureq::Request, body: Option<&[u8]>) -> (u16, String) {
    let result = match body {
        Some(bytes) => req.send_bytes(bytes),
        None => req.call(),
    };
    match result {
        Ok(resp) => (resp.status(), resp.into_string().unwrap()),
        Err(ureq::Error::Status(code, resp)) => (code, resp.into_string().unwrap()),
        Err(e) => panic!("request failed: {e}"),
    }
}

impl Harness {
    fn get(&self, path: &str) -> (u16, String) {
        send(ureq::get(&format!("{}{path}", self.base_url)), None)
    }

    fn post(&self, path: &str, body: &[u8]) -> (u16, String) {
        send(ureq::post(&format!("{}{path}", self.base_url)), Some(body))
    }

    fn post_json(&self, path: &str, body: Value) -> (u16, Value) {
        let (status, text) = self.post(path, body.to_string().as_bytes());
        (status, serde_json::from_str(&text).unwrap())
    }
}

// ---------------------------------------------------------------------------
// Routing and page
// ---------------------------------------------------------------------------

#[test]
fn unknown_route_is_404() {
    let h = start("404", vec![]);
    let (status, body) = h.get("/api/nothing-here");
    assert_eq!(status, 404);
    assert!(body.contains("not found"));
}

#[test]
fn index_without_data_shows_placeholder() {
    let h = start(
        "index_empty",
        vec![get("/api/check-data", json!({ "has_data": false }))],
    );

    let (status, html) = h.get("/");
    assert_eq!(status, 200);
    assert!(html.contains("No data to display"));
    assert!(!html.contains("{{TABLE}}"));
    assert!(
        !h.backend
            .urls()
            .iter()
            .any(|u| u.starts_with("/api/analysis-data"))
    );
}

#[test]
fn index_recovers_existing_results() {
    let h = start(
        "index_recover",
        vec![
            get("/api/check-data", json!({ "has_data": true, "count": 2 })),
            get("/api/analysis-data", rows_body()),
        ],
    );

    let (status, html) = h.get("/index.html");
    assert_eq!(status, 200);
    assert!(html.contains("Bolt M8"));
    // row text is escaped
    assert!(html.contains("Nut &lt;M6&gt;"));
}

#[test]
fn results_endpoint_reports_source_and_regions() {
    let h = start(
        "results",
        vec![get("/api/get-latest-analysis", rows_body())],
    );

    let (status, text) = h.get("/api/results");
    assert_eq!(status, 200);
    let body: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(body["report"]["rows_source"], "latest_analysis");
    assert_eq!(body["rows"].as_array().map(Vec::len), Some(2));
    assert!(body["regions"]["table"].as_str().unwrap().contains("Bolt M8"));
}

#[test]
fn stats_endpoint_maps_backend_failure_to_502() {
    let h = start("stats", vec![]);
    let (status, body) = h.get("/api/stats");
    assert_eq!(status, 502);
    assert!(body.contains("error"));
}

// ---------------------------------------------------------------------------
// Upload
// ---------------------------------------------------------------------------

#[test]
fn upload_with_bad_extension_never_reaches_backend() {
    let h = start("upload_rejected", vec![post("/upload", 200, upload_body())]);

    let (status, text) = h.post("/api/upload?name=stock.csv", b"a,b,c");
    assert_eq!(status, 200);
    let body: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(body["outcome"], "rejected");
    assert_eq!(body["success"], false);
    assert_eq!(body["progress"], json!([0]));
    assert_eq!(
        body["notifications"][0]["message"],
        "Please choose an Excel file (.xls or .xlsx)"
    );
    assert!(h.backend.hits().is_empty());

    let entries = h.log.read_all();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].action, "upload");
    assert!(!entries[0].success);
}

#[test]
fn upload_success_returns_rendered_regions() {
    let h = start(
        "upload_ok",
        vec![
            post("/upload", 200, upload_body()),
            get("/download/latest.json", rows_body()),
        ],
    );

    let (status, text) = h.post("/api/upload?name=stock%20Q1.xlsx", b"PK\x03\x04");
    assert_eq!(status, 200);
    let body: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(body["outcome"], "uploaded");
    assert_eq!(body["progress"], json!([30, 50, 80, 100]));
    assert!(body["regions"]["table"].as_str().unwrap().contains("Bolt M8"));
    assert!(
        body["regions"]["charts"]
            .as_str()
            .unwrap()
            .contains("data:image/png;base64,")
    );

    let upload = &h.backend.hits()[0];
    assert!(
        String::from_utf8_lossy(&upload.body).contains("filename=\"stock Q1.xlsx\"")
    );

    let entries = h.log.read_all();
    assert_eq!(entries[0].target.as_deref(), Some("stock Q1.xlsx"));
    assert_eq!(entries[0].rows, Some(2));
}

// ---------------------------------------------------------------------------
// Chat
// ---------------------------------------------------------------------------

#[test]
fn chat_rejects_blank_and_answers_by_topic() {
    let h = start("chat", vec![]);

    let (status, _) = h.post_json("/api/chat", json!({ "message": "   " }));
    assert_eq!(status, 400);

    let (status, body) = h.post_json("/api/chat", json!({ "message": "Что такое XYZ анализ?" }));
    assert_eq!(status, 200);
    assert_eq!(body["topic"], "xyz анализ");
    let delay = body["delay_ms"].as_u64().unwrap();
    assert!((1000..2000).contains(&delay));

    let (status, body) = h.post_json("/api/chat/clear", json!({}));
    assert_eq!(status, 200);
    assert!(body["notice"].as_str().unwrap().contains("очищена"));
}

#[test]
fn chat_with_invalid_json_is_400() {
    let h = start("chat_bad_json", vec![]);
    let (status, body) = h.post("/api/chat", b"not json");
    assert_eq!(status, 400);
    assert!(body.contains("invalid JSON"));
}

#[test]
fn reloaded_page_does_not_replay_chat_transcript() {
    let h = start(
        "chat_reload",
        vec![get("/api/check-data", json!({ "has_data": false }))],
    );

    let (status, _) = h.post_json("/api/chat", json!({ "message": "secret note" }));
    assert_eq!(status, 200);

    let (status, html) = h.get("/");
    assert_eq!(status, 200);
    assert!(!html.contains("secret note"));
    assert!(html.contains("welcome-message"));
    assert!(html.contains(abcxyz::chat::WELCOME_TEXT));
}

#[test]
fn open_query_starts_page_with_overlay_showing() {
    let h = start(
        "overlay",
        vec![get("/api/check-data", json!({ "has_data": false }))],
    );

    let (_, html) = h.get("/?open=chat");
    assert!(html.contains("<div id=\"chatWindow\" class=\"active\">"));
    assert!(html.contains("const FOCUS_ON_LOAD = true;"));

    let (_, html) = h.get("/?open=info");
    assert!(html.contains("<aside id=\"infoPanel\" class=\"active\">"));
    assert!(html.contains("<div id=\"chatWindow\" class=\"\">"));
    assert!(html.contains("const FOCUS_ON_LOAD = false;"));

    let (_, html) = h.get("/");
    assert!(html.contains("<aside id=\"infoPanel\" class=\"\">"));
}
