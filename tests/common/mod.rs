//! Canned-response HTTP backend for integration tests.

#![allow(dead_code)]

use std::io::Read;
use std::sync::{Arc, Mutex};
use std::thread;

use serde_json::{Value, json};
use tiny_http::{Header, Response, Server, StatusCode};

/// One canned answer. `path` is matched without the query string.
pub struct Route {
    pub method: &'static str,
    pub path: &'static str,
    pub status: u16,
    pub body: Value,
}

pub fn get(path: &'static str, body: Value) -> Route {
    Route {
        method: "GET",
        path,
        status: 200,
        body,
    }
}

pub fn post(path: &'static str, status: u16, body: Value) -> Route {
    Route {
        method: "POST",
        path,
        status,
        body,
    }
}

/// A request the mock received.
#[derive(Debug, Clone)]
pub struct Hit {
    pub method: String,
    pub url: String,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

pub struct MockBackend {
    pub base_url: String,
    hits: Arc<Mutex<Vec<Hit>>>,
}

impl MockBackend {
    /// Serve `routes` on an ephemeral port. Unknown routes answer 404.
    pub fn start(routes: Vec<Route>) -> Self {
        let server = Server::http("127.0.0.1:0").unwrap();
        let addr = server.server_addr().to_ip().unwrap();
        let hits = Arc::new(Mutex::new(Vec::new()));

        let recorded = Arc::clone(&hits);
        thread::spawn(move || {
            for mut request in server.incoming_requests() {
                let method = request.method().to_string();
                let url = request.url().to_string();
                let path = url.split('?').next().unwrap_or(&url).to_string();
                let content_type = request
                    .headers()
                    .iter()
                    .find(|h| h.field.equiv("Content-Type"))
                    .map(|h| h.value.to_string());
                let mut body = Vec::new();
                let _ = request.as_reader().read_to_end(&mut body);

                recorded.lock().unwrap().push(Hit {
                    method: method.clone(),
                    url,
                    content_type,
                    body,
                });

                let (status, payload) = routes
                    .iter()
                    .find(|r| r.method == method && r.path == path)
                    .map(|r| (r.status, r.body.clone()))
                    .unwrap_or((404, json!({ "error": "not found" })));

                let resp = Response::from_string(payload.to_string())
                    .with_header(Header::from_bytes("Content-Type", "application/json").unwrap())
                    .with_status_code(StatusCode(status));
                let _ = request.respond(resp);
            }
        });

        Self {
            base_url: format!("http://{addr}"),
            hits,
        }
    }

    pub fn hits(&self) -> Vec<Hit> {
        self.hits.lock().unwrap().clone()
    }

    /// Paths requested so far, query strings included.
    pub fn urls(&self) -> Vec<String> {
        self.hits().into_iter().map(|h| h.url).collect()
    }
}

/// A base URL nothing is listening on.
pub fn dead_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

pub fn upload_body() -> Value {
    json!({
        "success": true,
        "message": "Analysis complete",
        "original_file": "stock.xlsx",
        "stats": {
            "total_items": 2,
            "abc_distribution": {"A": 1, "B": 1},
            "xyz_distribution": {"X": 1, "Y": 1}
        },
        "download_links": {"analysis": "/download/latest.json"},
        "charts_info": {"generated": true, "charts": {"abc_pie": "iVBORw0KGgo="}, "count": 1}
    })
}

pub fn rows_body() -> Value {
    json!({
        "data": [
            {"product_name": "Bolt M8", "total_revenue": 1200.5, "abc_category": "A", "xyz_category": "X"},
            {"product_name": "Nut <M6>", "total_revenue": 80, "abc_category": "B", "xyz_category": "Y"}
        ]
    })
}
