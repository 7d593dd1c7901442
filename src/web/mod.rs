//! Embedded web dashboard for abcxyz.
//!
//! Provides a lightweight HTTP server (sync, via `tiny_http`) that serves:
//! - A single page with the results table, summary, charts, info panel and
//!   chat window, rendered server-side from the analysis backend
//! - JSON endpoints the page calls for uploads, deletes, chat and refresh
//!
//! Launched via `abcxyz serve` (default: `http://127.0.0.1:9747`).

mod api;
mod frontend;

use std::io::{Cursor, Read};
use std::time::Duration;

use anyhow::{Context, Result};
use tiny_http::{Header, Method, Response, Server, StatusCode};

use crate::analytics::ActivityLog;
use crate::api::Backend;
use crate::chat::{self, ChatSession};
use crate::config::schema::AbcxyzConfig;
use crate::loader::VisualizationLoader;
use crate::notify::MemoryNotifier;
use crate::render::{HtmlView, ResultsView};
use crate::ui::{ClickTarget, Effect, Overlays};

pub use api::{ActionResponse, ChatResponse, query_param};
pub use frontend::{Page, render_page};

// ---------------------------------------------------------------------------
// Dashboard state
// ---------------------------------------------------------------------------

/// Everything the server needs between requests.
pub struct Dashboard {
    backend: Box<dyn Backend + Send>,
    config: AbcxyzConfig,
    chat: ChatSession,
    log: ActivityLog,
}

impl Dashboard {
    pub fn new(backend: Box<dyn Backend + Send>, config: AbcxyzConfig) -> Self {
        let chat = ChatSession::new(&config.chat);
        let log = ActivityLog::from_config(&config.logging);
        Self {
            backend,
            config,
            chat,
            log,
        }
    }

    /// Use a specific activity log instead of the configured one.
    pub fn with_log(mut self, log: ActivityLog) -> Self {
        self.log = log;
        self
    }

    /// Dispatch an incoming request to the appropriate handler.
    pub fn dispatch(
        &mut self,
        method: &Method,
        url: &str,
        body: Vec<u8>,
    ) -> Result<Response<Cursor<Vec<u8>>>> {
        // Strip query string for path matching
        let path = url.split('?').next().unwrap_or(url);
        let limit = self.config.api.analysis_limit;

        match (method, path) {
            // Frontend
            (&Method::Get, "/") | (&Method::Get, "/index.html") => Ok(self.serve_frontend(url)),

            // Results
            (&Method::Get, "/api/results") => api::get_results(&*self.backend, limit),
            (&Method::Get, "/api/stats") => api::get_stats(&*self.backend),

            // Upload / delete
            (&Method::Post, "/api/upload") => {
                api::post_upload(&*self.backend, &self.config, url, body, &self.log)
            }
            (&Method::Post, "/api/delete") => {
                api::post_delete(&*self.backend, &self.config, url, body, &self.log)
            }

            // Chat
            (&Method::Post, "/api/chat") => api::post_chat(&mut self.chat, &body),
            (&Method::Post, "/api/chat/clear") => api::post_chat_clear(&mut self.chat),

            // 404
            _ => Ok(not_found()),
        }
    }

    /// Overlay state for a page request: `?open=info` or `?open=chat`
    /// starts with that overlay showing.
    pub fn initial_overlays(&self, url: &str) -> (Overlays, Effect) {
        let mut overlays = Overlays::new(Duration::from_millis(self.config.chat.focus_delay_ms));
        let effect = match query_param(url, "open").as_deref() {
            Some("info") => overlays.click(ClickTarget::InfoToggle),
            Some("chat") => overlays.click(ClickTarget::ChatButton),
            _ => Effect::None,
        };
        (overlays, effect)
    }

    /// Render the full page, recovering any results the server already has.
    pub fn render_index(&self, url: &str) -> String {
        let notifier = MemoryNotifier::new();
        let mut view = HtmlView::new();
        let loader =
            VisualizationLoader::new(&*self.backend, &notifier, self.config.api.analysis_limit);
        if loader.recover(&mut view).is_none() {
            view.render_table(&[]);
        }

        // the transcript lives in the page's session storage
        let chat = chat::welcome_html();
        let notifications = notifier.notifications();
        let (overlays, effect) = self.initial_overlays(url);
        render_page(&Page {
            view: &view,
            notifications: &notifications,
            chat: &chat,
            overlays: &overlays,
            effect,
            refresh_ms: self.config.refresh.interval_ms,
            max_upload_bytes: self.config.upload.max_size_bytes,
        })
    }

    /// Serve the server-rendered page.
    fn serve_frontend(&self, url: &str) -> Response<Cursor<Vec<u8>>> {
        let html = self.render_index(url);
        Response::from_data(html.into_bytes())
            .with_header(content_type_html())
            .with_status_code(StatusCode(200))
    }
}

// ---------------------------------------------------------------------------
// Server entry point
// ---------------------------------------------------------------------------

/// Start the dashboard server on the given address.
///
/// Blocks the current thread. Handles requests sequentially (sufficient for
/// a local single-user dashboard).
pub fn serve(addr: &str, mut dashboard: Dashboard) -> Result<()> {
    let server = Server::http(addr)
        .map_err(|e| anyhow::anyhow!("failed to start HTTP server on {addr}: {e}"))?;

    println!("abcxyz dashboard running at http://{addr}");
    println!("Press Ctrl+C to stop.\n");

    // Try to open in default browser (best-effort)
    let url = format!("http://{addr}");
    let _ = open_browser(&url);

    run(&server, &mut dashboard);
    Ok(())
}

/// Answer requests from `server` until it shuts down. Errors are handled
/// per request without stopping the loop.
pub fn run(server: &Server, dashboard: &mut Dashboard) {
    // one byte over the limit so oversized uploads still fail validation
    let body_limit = dashboard.config.upload.max_size_bytes.saturating_add(1);

    for mut request in server.incoming_requests() {
        let method = request.method().clone();
        let url = request.url().to_string();

        // Read body up-front for methods that carry one
        let body = if matches!(method, Method::Put | Method::Post | Method::Patch) {
            match read_body(request.as_reader(), body_limit) {
                Ok(body) => body,
                Err(e) => {
                    let _ = request.respond(bad_request(&e));
                    continue;
                }
            }
        } else {
            Vec::new()
        };

        let result = dashboard.dispatch(&method, &url, body);

        match result {
            Ok(resp) => {
                let _ = request.respond(resp);
            }
            Err(e) => {
                let _ = request.respond(bad_request(&e));
            }
        }

        // Brief access log
        println!(
            "{} {} {}",
            method,
            url.split('?').next().unwrap_or(&url),
            chrono::Local::now().format("%H:%M:%S")
        );
    }
}

// ---------------------------------------------------------------------------
// Response helpers
// ---------------------------------------------------------------------------

/// Read at most `limit` bytes of a request body.
fn read_body(reader: impl Read, limit: u64) -> Result<Vec<u8>> {
    let mut body = Vec::new();
    reader
        .take(limit)
        .read_to_end(&mut body)
        .context("failed to read request body")?;
    Ok(body)
}

/// 400 response carrying the error chain.
fn bad_request(e: &anyhow::Error) -> Response<Cursor<Vec<u8>>> {
    let body = serde_json::json!({ "error": format!("{e:#}") }).to_string();
    Response::from_data(body.into_bytes())
        .with_header(content_type_json())
        .with_status_code(StatusCode(400))
}

/// 404 response.
fn not_found() -> Response<Cursor<Vec<u8>>> {
    let body = r#"{"error": "not found"}"#;
    Response::from_data(body.as_bytes().to_vec())
        .with_header(content_type_json())
        .with_status_code(StatusCode(404))
}

/// JSON content type header.
pub(crate) fn content_type_json() -> Header {
    Header::from_bytes("Content-Type", "application/json; charset=utf-8").unwrap()
}

/// HTML content type header.
fn content_type_html() -> Header {
    Header::from_bytes("Content-Type", "text/html; charset=utf-8").unwrap()
}

/// Attempt to open a URL in the system default browser.
fn open_browser(url: &str) -> Result<()> {
    #[cfg(target_os = "windows")]
    {
        std::process::Command::new("cmd")
            .args(["/C", "start", url])
            .spawn()
            .context("failed to open browser")?;
    }

    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("open")
            .arg(url)
            .spawn()
            .context("failed to open browser")?;
    }

    #[cfg(target_os = "linux")]
    {
        std::process::Command::new("xdg-open")
            .arg(url)
            .spawn()
            .context("failed to open browser")?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Reader that yields a few bytes and then fails.
    struct BrokenPipe(bool);

    impl Read for BrokenPipe {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.0 {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::ConnectionReset,
                    "peer went away",
                ));
            }
            self.0 = true;
            buf[..2].copy_from_slice(b"PK");
            Ok(2)
        }
    }

    #[test]
    fn truncated_body_is_an_error_not_a_short_body() {
        let err = read_body(BrokenPipe(false), 1024).unwrap_err();
        let message = format!("{err:#}");
        assert!(message.starts_with("failed to read request body"));
        assert!(message.contains("peer went away"));
    }

    #[test]
    fn body_is_capped_at_limit() {
        let body = read_body(&b"0123456789"[..], 4).unwrap();
        assert_eq!(body, b"0123");
    }

    #[test]
    fn read_failure_maps_to_400() {
        let err = read_body(BrokenPipe(false), 1024).unwrap_err();
        assert_eq!(bad_request(&err).status_code(), StatusCode(400));
    }
}
