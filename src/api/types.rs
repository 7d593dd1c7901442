//! Response payloads of the analysis backend.
//!
//! Each type is built from a raw `serde_json::Value` through the lenient
//! helpers in [`crate::normalize`]: the backend's shapes drift between code
//! paths, so strict derive-based deserialization would reject usable data.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::model::{ChartSet, Summary};
use crate::normalize::{
    first_text, is_truthy, normalize_record, parse_charts, parse_count, parse_distribution,
    parse_timestamp, scalar_text, text_list,
};

// ---------------------------------------------------------------------------
// POST /upload
// ---------------------------------------------------------------------------

/// Result of one successful upload.
#[derive(Debug, Clone, Default, Serialize)]
pub struct UploadResult {
    pub success: bool,
    pub message: String,
    pub original_file: Option<String>,
    pub stats: UploadStats,
    pub download_links: DownloadLinks,
    pub charts_info: Option<ChartsInfo>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct UploadStats {
    pub total_items: usize,
    pub abc_distribution: BTreeMap<String, usize>,
    pub xyz_distribution: BTreeMap<String, usize>,
    pub abc_xyz_matrix: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DownloadLinks {
    /// Path (relative to the base URL) of the full analysis JSON.
    pub analysis: Option<String>,
    pub json: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ChartsInfo {
    pub generated: bool,
    pub charts: ChartSet,
    pub count: usize,
}

impl UploadResult {
    pub fn from_value(value: &Value) -> Self {
        let stats = value.get("stats");
        let links = value.get("download_links").and_then(Value::as_object);

        let charts_info = value.get("charts_info").and_then(Value::as_object).map(|ci| {
            let charts = parse_charts(ci.get("charts"));
            ChartsInfo {
                generated: is_truthy(ci.get("generated")),
                count: ci
                    .get("count")
                    .and_then(parse_count)
                    .unwrap_or(charts.len()),
                charts,
            }
        });

        Self {
            success: is_truthy(value.get("success")),
            message: value
                .get("message")
                .and_then(scalar_text)
                .unwrap_or_default(),
            original_file: value.get("original_file").and_then(scalar_text),
            stats: UploadStats {
                total_items: stats
                    .and_then(|s| s.get("total_items"))
                    .and_then(parse_count)
                    .unwrap_or(0),
                abc_distribution: parse_distribution(stats.and_then(|s| s.get("abc_distribution"))),
                xyz_distribution: parse_distribution(stats.and_then(|s| s.get("xyz_distribution"))),
                abc_xyz_matrix: parse_distribution(stats.and_then(|s| s.get("abc_xyz_matrix"))),
            },
            download_links: DownloadLinks {
                analysis: links.and_then(|l| l.get("analysis")).and_then(scalar_text),
                json: links.and_then(|l| l.get("json")).and_then(scalar_text),
            },
            charts_info,
        }
    }

    /// Charts that came back with the upload, if any were generated.
    pub fn charts(&self) -> Option<&ChartSet> {
        self.charts_info
            .as_ref()
            .map(|ci| &ci.charts)
            .filter(|c| !c.is_empty())
    }
}

impl From<&UploadStats> for Summary {
    fn from(stats: &UploadStats) -> Self {
        Self {
            total_items: stats.total_items,
            abc: stats.abc_distribution.clone(),
            xyz: stats.xyz_distribution.clone(),
            abc_xyz: stats.abc_xyz_matrix.clone(),
            ..Default::default()
        }
    }
}

// ---------------------------------------------------------------------------
// POST /api/delete-by-file
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize)]
pub struct DeleteResult {
    pub deleted_analysis: usize,
    pub deleted_store: usize,
    pub requested_ids: usize,
    pub requested_names: usize,
    pub missing_ids: Vec<String>,
    pub missing_names: Vec<String>,
}

impl DeleteResult {
    pub fn from_value(value: &Value) -> Self {
        let count = |section: &str, key: &str| {
            value
                .get(section)
                .and_then(|s| s.get(key))
                .and_then(parse_count)
                .unwrap_or(0)
        };
        let missing = value.get("missing");

        Self {
            deleted_analysis: count("deleted", "analysis"),
            deleted_store: count("deleted", "store"),
            requested_ids: count("requested", "ids"),
            requested_names: count("requested", "names"),
            missing_ids: text_list(missing.and_then(|m| m.get("ids"))),
            missing_names: text_list(missing.and_then(|m| m.get("names"))),
        }
    }

    /// Identifiers and names found in the uploaded file.
    pub fn found_in_file(&self) -> usize {
        self.requested_ids + self.requested_names
    }

    pub fn missing_total(&self) -> usize {
        self.missing_ids.len() + self.missing_names.len()
    }
}

// ---------------------------------------------------------------------------
// GET /api/stats
// ---------------------------------------------------------------------------

/// Server-side statistics used by the auto-refresh loop.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ServerStats {
    pub last_update: Option<DateTime<Utc>>,
    pub summary: Summary,
}

impl ServerStats {
    /// Build from either `{stats: {...}}` or the bare stats object.
    pub fn from_value(value: &Value) -> Self {
        let stats = value.get("stats").filter(|s| s.is_object()).unwrap_or(value);

        let last_update = ["last_update", "lastUpdate", "updated_at", "timestamp"]
            .iter()
            .find_map(|k| stats.get(*k).and_then(parse_timestamp));

        let abc = parse_distribution(stats.get("abc_distribution"));
        let xyz = parse_distribution(stats.get("xyz_distribution"));
        let total_items = ["total_items", "total_products", "count"]
            .iter()
            .find_map(|k| stats.get(*k).and_then(parse_count))
            .unwrap_or_else(|| abc.values().sum());

        let top_products = stats
            .get("top_products")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| {
                        scalar_text(item).or_else(|| {
                            normalize_record(item)
                                .map(|r| r.name)
                                .filter(|n| !n.is_empty())
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self {
            last_update,
            summary: Summary {
                total_items,
                abc,
                xyz,
                abc_xyz: parse_distribution(stats.get("abc_xyz_distribution")),
                top_products,
                bottom_products: Vec::new(),
            },
        }
    }
}

// ---------------------------------------------------------------------------
// GET /api/check-data
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DataPresence {
    pub has_data: bool,
    pub count: Option<usize>,
}

impl DataPresence {
    pub fn from_value(value: &Value) -> Self {
        Self {
            has_data: is_truthy(value.get("has_data")),
            count: value.get("count").and_then(parse_count),
        }
    }
}

/// Server error text carried in a failure body, if any.
pub fn error_message(value: &Value) -> Option<String> {
    value
        .as_object()
        .map(|obj| first_text(obj, &["error", "message"]))
        .filter(|m| !m.is_empty())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
