//! JSON API handlers for the dashboard.
//!
//! Each handler corresponds to an endpoint and returns a
//! `Response<Cursor<Vec<u8>>>` with JSON content. Payloads are built by
//! separate functions so they can be tested without a server.

use std::io::Cursor;

use anyhow::{Context, Result};
use percent_encoding::percent_decode_str;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tiny_http::{Response, StatusCode};

use crate::analytics::{ActivityEntry, ActivityLog};
use crate::api::{self, Backend};
use crate::chat::ChatSession;
use crate::config::schema::AbcxyzConfig;
use crate::loader::{LoadReport, VisualizationLoader};
use crate::model::Summary;
use crate::notify::{MemoryNotifier, Notification};
use crate::render::html::Region;
use crate::render::HtmlView;
use crate::upload::{DeleteOutcome, UploadController, UploadFile, UploadOutcome};

use super::content_type_json;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct ChatRequest {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub reply: String,
    pub topic: Option<String>,
    pub delay_ms: u64,
}

/// Rendered regions returned to the page so it can swap them in place.
#[derive(Debug, Default, Serialize)]
pub struct RegionsResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub charts: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deletion: Option<String>,
}

impl RegionsResponse {
    /// Non-empty regions of `view`.
    pub fn from_view(view: &HtmlView) -> Self {
        let take = |r: Region| {
            view.region(r)
                .filter(|html| !html.is_empty())
                .map(str::to_string)
        };
        Self {
            table: take(Region::Table),
            summary: take(Region::Summary),
            charts: take(Region::Charts),
            deletion: take(Region::Deletion),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ActionResponse {
    /// `"uploaded"`, `"deleted"`, `"rejected"` or `"failed"`.
    pub outcome: &'static str,
    pub success: bool,
    pub notifications: Vec<Notification>,
    pub progress: Vec<u8>,
    pub regions: RegionsResponse,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Build a JSON response with the given status.
fn json_response<T: Serialize>(data: &T, status: u16) -> Result<Response<Cursor<Vec<u8>>>> {
    let body = serde_json::to_string(data).context("failed to serialize JSON response")?;
    Ok(Response::from_data(body.into_bytes())
        .with_header(content_type_json())
        .with_status_code(StatusCode(status)))
}

/// Extract and percent-decode a query parameter.
pub fn query_param(url: &str, key: &str) -> Option<String> {
    url.split_once('?')?.1.split('&').find_map(|pair| {
        let (k, v) = pair.split_once('=').unwrap_or((pair, ""));
        (k == key).then(|| {
            percent_decode_str(&v.replace('+', " "))
                .decode_utf8_lossy()
                .into_owned()
        })
    })
}

// ---------------------------------------------------------------------------
// Payload builders
// ---------------------------------------------------------------------------

/// Load results into a fresh view and describe them.
pub fn results_payload(backend: &dyn Backend, limit: u32) -> (Value, LoadReport) {
    let notifier = MemoryNotifier::new();
    let mut view = HtmlView::new();
    let loaded = VisualizationLoader::new(backend, &notifier, limit).fetch(None, None);
    loaded.render(&mut view);

    let payload = json!({
        "rows": loaded.records,
        "summary": Summary::from_records(&loaded.records),
        "charts": loaded.charts.ordered().into_iter().map(|(k, _)| k).collect::<Vec<_>>(),
        "report": loaded.report,
        "regions": RegionsResponse::from_view(&view),
    });
    (payload, loaded.report)
}

/// Ask the chat session for a reply. `None` for blank input.
pub fn chat_payload<R: rand::Rng>(chat: &mut ChatSession<R>, message: &str) -> Option<ChatResponse> {
    let pending = chat.send_message(message)?;
    let response = ChatResponse {
        reply: pending.text.clone(),
        topic: pending.topic.map(str::to_string),
        delay_ms: u64::try_from(pending.delay.as_millis()).unwrap_or(u64::MAX),
    };
    chat.deliver(pending);
    Some(response)
}

fn action_response(
    outcome: &'static str,
    success: bool,
    notifier: &MemoryNotifier,
    view: &HtmlView,
) -> ActionResponse {
    ActionResponse {
        outcome,
        success,
        notifications: notifier.notifications(),
        progress: notifier.progress_trail(),
        regions: RegionsResponse::from_view(view),
    }
}

/// Run an upload through the controller and report what the user saw.
pub fn upload_payload(
    backend: &dyn Backend,
    config: &AbcxyzConfig,
    file: &UploadFile,
    log: &ActivityLog,
) -> ActionResponse {
    let notifier = MemoryNotifier::new();
    let mut view = HtmlView::new();
    let controller =
        UploadController::new(backend, &notifier, &config.upload, config.api.analysis_limit);

    let mut entry = ActivityEntry::new("upload", false);
    entry.target = Some(file.name.clone());

    let response = match controller.submit_file(file, &mut view) {
        UploadOutcome::Uploaded(result) => {
            entry.success = true;
            entry.detail = Some(result.message);
            entry.rows = Some(result.stats.total_items);
            action_response("uploaded", true, &notifier, &view)
        }
        UploadOutcome::Rejected(e) => {
            entry.detail = Some(e.to_string());
            action_response("rejected", false, &notifier, &view)
        }
        UploadOutcome::Failed(msg) => {
            entry.detail = Some(msg);
            action_response("failed", false, &notifier, &view)
        }
    };
    log.record(&entry);
    response
}

/// Run a delete-by-file through the controller.
pub fn delete_payload(
    backend: &dyn Backend,
    config: &AbcxyzConfig,
    file: &UploadFile,
    log: &ActivityLog,
) -> ActionResponse {
    let notifier = MemoryNotifier::new();
    let mut view = HtmlView::new();
    let controller =
        UploadController::new(backend, &notifier, &config.upload, config.api.analysis_limit);

    let mut entry = ActivityEntry::new("delete", false);
    entry.target = Some(file.name.clone());

    let response = match controller.delete_file(file, &mut view) {
        DeleteOutcome::Deleted(result) => {
            entry.success = true;
            entry.rows = Some(result.deleted_store);
            action_response("deleted", true, &notifier, &view)
        }
        DeleteOutcome::Rejected(e) => {
            entry.detail = Some(e.to_string());
            action_response("rejected", false, &notifier, &view)
        }
        DeleteOutcome::Failed(msg) => {
            entry.detail = Some(msg);
            action_response("failed", false, &notifier, &view)
        }
    };
    log.record(&entry);
    response
}

// ---------------------------------------------------------------------------
// API Handlers
// ---------------------------------------------------------------------------

/// `GET /api/results`: normalized rows, summary and rendered regions.
pub fn get_results(backend: &dyn Backend, limit: u32) -> Result<Response<Cursor<Vec<u8>>>> {
    let (payload, _) = results_payload(backend, limit);
    json_response(&payload, 200)
}

/// `GET /api/stats`: server stats, used by the page's auto-refresh.
pub fn get_stats(backend: &dyn Backend) -> Result<Response<Cursor<Vec<u8>>>> {
    match backend.stats() {
        Ok(stats) => json_response(&stats, 200),
        Err(e) => {
            let body = json!({ "error": api::user_message(&e, api::CONNECTION_FAILED) });
            json_response(&body, 502)
        }
    }
}

/// `POST /api/chat`: `{ "message": "..." }` → reply with typing delay.
pub fn post_chat<R: rand::Rng>(
    chat: &mut ChatSession<R>,
    body: &[u8],
) -> Result<Response<Cursor<Vec<u8>>>> {
    let req: ChatRequest =
        serde_json::from_slice(body).context("invalid JSON in chat request")?;
    match chat_payload(chat, &req.message) {
        Some(resp) => json_response(&resp, 200),
        None => json_response(&json!({ "error": "empty message" }), 400),
    }
}

/// `POST /api/chat/clear`: drop the transcript.
pub fn post_chat_clear<R: rand::Rng>(chat: &mut ChatSession<R>) -> Result<Response<Cursor<Vec<u8>>>> {
    let notice = chat.clear();
    json_response(&json!({ "notice": notice.text }), 200)
}

/// `POST /api/upload?name=...`: raw workbook body.
pub fn post_upload(
    backend: &dyn Backend,
    config: &AbcxyzConfig,
    url: &str,
    body: Vec<u8>,
    log: &ActivityLog,
) -> Result<Response<Cursor<Vec<u8>>>> {
    let name = query_param(url, "name").unwrap_or_default();
    let file = UploadFile::from_bytes(name, body);
    let resp = upload_payload(backend, config, &file, log);
    json_response(&resp, 200)
}

/// `POST /api/delete?name=...`: raw workbook body listing items to delete.
pub fn post_delete(
    backend: &dyn Backend,
    config: &AbcxyzConfig,
    url: &str,
    body: Vec<u8>,
    log: &ActivityLog,
) -> Result<Response<Cursor<Vec<u8>>>> {
    let name = query_param(url, "name").unwrap_or_default();
    let file = UploadFile::from_bytes(name, body);
    let resp = delete_payload(backend, config, &file, log);
    json_response(&resp, 200)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
