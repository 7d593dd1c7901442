/// HTTP client for the ABC/XYZ analysis backend.
///
/// Talks to the backend with the synchronous `ureq` client. Provides:
///
/// - **Upload gateway**: `POST /upload` and `POST /api/delete-by-file` with a
///   multipart workbook body.
/// - **Result endpoints**: analysis rows, charts, stats and data presence,
///   each with the alternate endpoint the backend exposes for the same data.
///
/// Nothing here retries. Callers decide what a failure means for the user
/// through [`ApiError::user_message`].
use std::time::Duration;

use anyhow::{Context, Result};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde_json::Value;

pub mod multipart;
pub mod types;

use crate::config::schema::{ApiConfig, DEFAULT_FALLBACK_URL};
use crate::model::{AnalysisRecord, ChartSet};
use crate::normalize::{is_truthy, normalize_rows, parse_charts};
use crate::upload::UploadFile;

pub use types::{DataPresence, DeleteResult, ServerStats, UploadResult};

/// Characters left as-is in a query value (RFC 3986 unreserved).
const QUERY_VALUE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Shown whenever the transport fails or the answer cannot be read.
pub const CONNECTION_FAILED: &str = "Could not connect to the analysis server";

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failure talking to the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// Connection refused, DNS failure, timeout.
    Transport(String),
    /// Non-2xx status or `success: false` in the body.
    Server {
        status: Option<u16>,
        message: Option<String>,
    },
    /// The body was not the JSON we expected.
    Malformed(String),
}

impl ApiError {
    /// Text to show the user. Server-provided messages are passed through
    /// verbatim; a server failure without one shows `fallback`.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            Self::Server {
                message: Some(msg), ..
            } => msg.clone(),
            Self::Server { message: None, .. } => fallback.to_string(),
            Self::Transport(_) | Self::Malformed(_) => CONNECTION_FAILED.to_string(),
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transport(detail) => write!(f, "transport error: {detail}"),
            Self::Server { status, message } => {
                write!(f, "server error")?;
                if let Some(code) = status {
                    write!(f, " (HTTP {code})")?;
                }
                if let Some(msg) = message {
                    write!(f, ": {msg}")?;
                }
                Ok(())
            }
            Self::Malformed(detail) => write!(f, "unreadable response: {detail}"),
        }
    }
}

impl std::error::Error for ApiError {}

/// User-facing text for any error returned by a [`Backend`].
pub fn user_message(err: &anyhow::Error, fallback: &str) -> String {
    match err.downcast_ref::<ApiError>() {
        Some(api) => api.user_message(fallback),
        None => format!("{err:#}"),
    }
}

// ---------------------------------------------------------------------------
// Backend seam
// ---------------------------------------------------------------------------

/// Operations the pipeline needs from the analysis service.
///
/// [`ApiClient`] is the HTTP implementation; tests substitute in-memory
/// fakes.
pub trait Backend {
    fn upload(&self, file: &UploadFile) -> Result<UploadResult>;
    fn delete_by_file(&self, file: &UploadFile) -> Result<DeleteResult>;
    /// Rows behind a download link returned by an upload.
    fn fetch_link(&self, link: &str) -> Result<Vec<AnalysisRecord>>;
    fn analysis_data(&self, limit: u32) -> Result<Vec<AnalysisRecord>>;
    fn latest_analysis(&self) -> Result<Vec<AnalysisRecord>>;
    fn charts(&self) -> Result<ChartSet>;
    fn stats(&self) -> Result<ServerStats>;
    fn check_data(&self) -> Result<DataPresence>;
    /// Composite `products` / `category_stats` / `matrix_data` payload.
    fn visualization(&self, session_id: Option<&str>) -> Result<Value>;
}

// ---------------------------------------------------------------------------
// Base URL
// ---------------------------------------------------------------------------

/// Pick the backend base URL.
///
/// Uses `origin` when it is present, non-empty and not the literal `"null"`
/// (what a page opened from the local filesystem reports); otherwise
/// `fallback`, and if that is blank too, the built-in local address.
pub fn resolve_base_url(origin: Option<&str>, fallback: &str) -> String {
    let pick = |s: &str| {
        let s = s.trim();
        (!s.is_empty() && s != "null").then(|| s.trim_end_matches('/').to_string())
    };
    origin
        .and_then(pick)
        .or_else(|| pick(fallback))
        .unwrap_or_else(|| DEFAULT_FALLBACK_URL.to_string())
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Synchronous HTTP client for the analysis backend.
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
    timeout: Duration,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        }
    }

    /// Build a client from the resolved config.
    pub fn from_config(config: &ApiConfig) -> Self {
        Self::new(
            resolve_base_url(Some(&config.origin), &config.fallback_url),
            Duration::from_millis(config.timeout_ms),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for a backend path. Absolute links pass through.
    fn url(&self, path: &str) -> String {
        let url = if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        };
        // On Windows, "localhost" may try IPv6 (::1) first, causing delays
        // when the backend only binds to IPv4.
        url.replace("://localhost", "://127.0.0.1")
    }

    /// `GET` a JSON document. A present-but-falsy `success` is a failure.
    fn get_json(&self, path: &str) -> Result<Value> {
        let result = ureq::get(&self.url(path)).timeout(self.timeout).call();
        let value = read_response(result)?;
        if value.get("success").is_some() && !is_truthy(value.get("success")) {
            return Err(ApiError::Server {
                status: None,
                message: types::error_message(&value),
            }
            .into());
        }
        Ok(value)
    }

    /// `POST` a workbook as multipart form data. The body must report
    /// `success: true`.
    fn post_file(&self, path: &str, file: &UploadFile) -> Result<Value> {
        let data = file.read_bytes()?;
        let form = multipart::encode_file("file", &file.name, &data);

        let result = ureq::post(&self.url(path))
            .timeout(self.timeout)
            .set("Content-Type", &form.content_type)
            .send_bytes(&form.body);

        let value = read_response(result)?;
        if !is_truthy(value.get("success")) {
            return Err(ApiError::Server {
                status: None,
                message: types::error_message(&value),
            }
            .into());
        }
        Ok(value)
    }

    /// Try each path in order and return the first that answers.
    fn get_first(&self, paths: &[&str]) -> Result<Value> {
        let mut last_err = None;
        for path in paths {
            match self.get_json(path) {
                Ok(value) => return Ok(value),
                Err(e) => last_err = Some(e),
            }
        }
        Err(last_err.unwrap_or_else(|| anyhow::anyhow!("no endpoint to query")))
    }
}

fn read_response(result: Result<ureq::Response, ureq::Error>) -> Result<Value, ApiError> {
    match result {
        Ok(resp) => resp
            .into_json::<Value>()
            .map_err(|e| ApiError::Malformed(e.to_string())),
        Err(ureq::Error::Status(code, resp)) => {
            let body = resp.into_json::<Value>().ok();
            Err(ApiError::Server {
                status: Some(code),
                message: body.as_ref().and_then(types::error_message),
            })
        }
        Err(e) => Err(ApiError::Transport(e.to_string())),
    }
}

impl Backend for ApiClient {
    fn upload(&self, file: &UploadFile) -> Result<UploadResult> {
        let value = self.post_file("/upload", file)?;
        Ok(UploadResult::from_value(&value))
    }

    fn delete_by_file(&self, file: &UploadFile) -> Result<DeleteResult> {
        let value = self.post_file("/api/delete-by-file", file)?;
        Ok(DeleteResult::from_value(&value))
    }

    fn fetch_link(&self, link: &str) -> Result<Vec<AnalysisRecord>> {
        let value = self
            .get_json(link)
            .with_context(|| format!("failed to fetch {link}"))?;
        Ok(normalize_rows(&value))
    }

    fn analysis_data(&self, limit: u32) -> Result<Vec<AnalysisRecord>> {
        let value = self.get_json(&format!("/api/analysis-data?limit={limit}"))?;
        Ok(normalize_rows(&value))
    }

    fn latest_analysis(&self) -> Result<Vec<AnalysisRecord>> {
        let value = self.get_json("/api/get-latest-analysis")?;
        Ok(normalize_rows(&value))
    }

    fn charts(&self) -> Result<ChartSet> {
        let mut last_err = None;
        let mut answered = false;
        for path in ["/api/charts", "/api/analysis-charts"] {
            match self.get_json(path) {
                Ok(value) => {
                    answered = true;
                    let charts = parse_charts(value.get("charts"));
                    if !charts.is_empty() {
                        return Ok(charts);
                    }
                }
                Err(e) => last_err = Some(e),
            }
        }
        match last_err {
            Some(e) if !answered => Err(e),
            _ => Ok(ChartSet::new()),
        }
    }

    fn stats(&self) -> Result<ServerStats> {
        let value = self.get_first(&["/api/stats", "/api/analysis-stats"])?;
        Ok(ServerStats::from_value(&value))
    }

    fn check_data(&self) -> Result<DataPresence> {
        let value = self.get_first(&["/api/check-data", "/api/check-analysis-data"])?;
        Ok(DataPresence::from_value(&value))
    }

    fn visualization(&self, session_id: Option<&str>) -> Result<Value> {
        let primary = match session_id {
            Some(id) if !id.is_empty() => format!(
                "/api/visualization/data?session_id={}",
                utf8_percent_encode(id, QUERY_VALUE)
            ),
            _ => "/api/visualization/data".to_string(),
        };
        self.get_first(&[&primary, "/api/matrix-data"])
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_prefers_origin() {
        assert_eq!(
            resolve_base_url(Some("http://analytics.local:8080/"), "http://localhost:5000"),
            "http://analytics.local:8080"
        );
    }

    #[test]
    fn base_url_falls_back_on_null_or_missing_origin() {
        assert_eq!(
            resolve_base_url(Some("null"), "http://localhost:5000"),
            "http://localhost:5000"
        );
        assert_eq!(resolve_base_url(Some("  "), "http://h:1"), "http://h:1");
        assert_eq!(resolve_base_url(None, ""), DEFAULT_FALLBACK_URL);
    }

    #[test]
    fn url_joins_paths_and_keeps_absolute_links() {
        let client = ApiClient::new("http://10.1.1.1:5000/", Duration::from_secs(1));
        assert_eq!(client.base_url(), "http://10.1.1.1:5000");
        assert_eq!(client.url("/upload"), "http://10.1.1.1:5000/upload");
        assert_eq!(client.url("api/stats"), "http://10.1.1.1:5000/api/stats");
        assert_eq!(client.url("https://cdn.example/a.json"), "https://cdn.example/a.json");
    }

    #[test]
    fn url_rewrites_localhost() {
        let client = ApiClient::new("http://localhost:5000", Duration::from_secs(1));
        assert_eq!(client.url("/upload"), "http://127.0.0.1:5000/upload");
    }

    #[test]
    fn user_message_mapping() {
        let server = ApiError::Server {
            status: Some(400),
            message: Some("Only Excel files".to_string()),
        };
        assert_eq!(server.user_message("generic"), "Only Excel files");

        let silent = ApiError::Server {
            status: Some(500),
            message: None,
        };
        assert_eq!(silent.user_message("generic"), "generic");

        let transport = ApiError::Transport("refused".to_string());
        assert_eq!(transport.user_message("generic"), CONNECTION_FAILED);

        let wrapped: anyhow::Error = transport.into();
        assert_eq!(user_message(&wrapped, "generic"), CONNECTION_FAILED);
    }
}
