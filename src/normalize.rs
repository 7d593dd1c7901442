//! Boundary mapping from backend JSON into canonical records.
//!
//! The backend answers from several code paths (fresh upload files, the
//! database, the "latest analysis" file) and each spells its fields
//! differently. This module is the only place that knows those spellings.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use regex::Regex;
use serde_json::{Map, Value};

use crate::model::{AnalysisRecord, ChartSet, MatrixView};

const NAME_KEYS: &[&str] = &["name", "product_name", "productName", "Наименование товара"];
const REVENUE_KEYS: &[&str] = &["revenue", "total_revenue", "totalRevenue", "Выручка (У.Е.)"];
const ABC_KEYS: &[&str] = &["ABC", "abc_category", "abcCategory", "abc"];
const XYZ_KEYS: &[&str] = &["XYZ", "xyz_category", "xyzCategory", "xyz"];
const ABC_XYZ_KEYS: &[&str] = &["ABC_XYZ", "abc_xyz_category", "abcXyzCategory", "abc_xyz"];

/// Object keys that may wrap the row array.
const ROW_CONTAINERS: &[&str] = &["data", "products", "items", "analysis", "results"];

/// Everything except digits, separators and sign.
static NON_NUMERIC_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^0-9,.\-]").expect("valid regex"));

// ---------------------------------------------------------------------------
// Rows
// ---------------------------------------------------------------------------

/// Map one backend row into an [`AnalysisRecord`].
///
/// Returns `None` for anything that is not a JSON object. Missing numeric
/// fields default to 0, missing categorical fields to an empty string.
pub fn normalize_record(value: &Value) -> Option<AnalysisRecord> {
    let obj = value.as_object()?;

    let abc = first_text(obj, ABC_KEYS).to_uppercase();
    let xyz = first_text(obj, XYZ_KEYS).to_uppercase();
    let mut abc_xyz = first_text(obj, ABC_XYZ_KEYS).to_uppercase();
    if abc_xyz.is_empty() && !abc.is_empty() && !xyz.is_empty() {
        abc_xyz = format!("{abc}{xyz}");
    }

    Some(AnalysisRecord {
        id: obj.get("id").and_then(scalar_text),
        rank: obj.get("rank").and_then(parse_number).and_then(|n| {
            if n >= 1.0 { Some(n as u64) } else { None }
        }),
        name: first_text(obj, NAME_KEYS),
        revenue: REVENUE_KEYS
            .iter()
            .find_map(|k| obj.get(*k).and_then(parse_number))
            .unwrap_or(0.0),
        abc,
        xyz,
        abc_xyz,
    })
}

/// Extract every row from a payload, preserving server order.
///
/// Accepts a bare array or an object whose `data` / `products` / `items` /
/// `analysis` / `results` key holds the array. Non-object rows are skipped.
pub fn normalize_rows(payload: &Value) -> Vec<AnalysisRecord> {
    row_array(payload)
        .map(|rows| rows.iter().filter_map(normalize_record).collect())
        .unwrap_or_default()
}

fn row_array(payload: &Value) -> Option<&Vec<Value>> {
    match payload {
        Value::Array(rows) => Some(rows),
        Value::Object(obj) => ROW_CONTAINERS
            .iter()
            .find_map(|k| obj.get(*k).and_then(Value::as_array)),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Scalars
// ---------------------------------------------------------------------------

/// JavaScript-style truthiness, used for the backend's `success` flag.
pub fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_)) | Some(Value::Object(_)) => true,
    }
}

/// First non-empty textual value among `keys`.
pub fn first_text(obj: &Map<String, Value>, keys: &[&str]) -> String {
    keys.iter()
        .find_map(|k| obj.get(*k).and_then(scalar_text))
        .unwrap_or_default()
}

/// Render a string or number as trimmed text; empty strings count as absent.
pub fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Parse a number or a human-formatted numeric string such as
/// `"1 234,50"` or `"12,345.6 у.е."`.
pub fn parse_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let stripped = NON_NUMERIC_RE.replace_all(s, "");
            // Unit suffixes like "у.е." leave stray separators behind.
            let cleaned = stripped.trim_matches(|c| c == '.' || c == ',');
            let cleaned = if cleaned.contains('.') {
                cleaned.replace(',', "")
            } else {
                cleaned.replace(',', ".")
            };
            cleaned.parse::<f64>().ok().filter(|f| f.is_finite())
        }
        _ => None,
    }
}

/// Parse a count, rounding fractional values.
pub fn parse_count(value: &Value) -> Option<usize> {
    parse_number(value)
        .filter(|f| *f >= 0.0)
        .map(|f| f.round() as usize)
}

/// List of strings or numbers as text.
pub fn text_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(scalar_text).collect())
        .unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Distributions, charts, timestamps
// ---------------------------------------------------------------------------

/// Category → count map from either `{"A": 3}` or
/// `[{"category": "A", "count": 3}]`.
pub fn parse_distribution(value: Option<&Value>) -> BTreeMap<String, usize> {
    match value {
        Some(Value::Object(obj)) => obj
            .iter()
            .filter_map(|(k, v)| parse_count(v).map(|n| (k.clone(), n)))
            .collect(),
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| {
                let obj = item.as_object()?;
                let category = first_text(obj, &["category", "name", "key"]);
                let count = obj.get("count").and_then(parse_count)?;
                (!category.is_empty()).then_some((category, count))
            })
            .collect(),
        _ => BTreeMap::new(),
    }
}

/// Chart payloads from a `{key: base64}` object. Empty and non-string values
/// are skipped.
pub fn parse_charts(value: Option<&Value>) -> ChartSet {
    let mut charts = ChartSet::new();
    if let Some(obj) = value.and_then(Value::as_object) {
        for (key, payload) in obj {
            if let Some(data) = payload.as_str().filter(|s| !s.trim().is_empty()) {
                charts.insert(key.clone(), data.trim());
            }
        }
    }
    charts
}

/// Parse the backend's `last_update`.
///
/// Accepts RFC 3339, naive ISO-8601 (taken as UTC), `YYYY-MM-DD HH:MM:SS`,
/// a bare date, and epoch seconds or milliseconds.
pub fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(n) => {
            let raw = n.as_f64()?;
            let millis = if raw.abs() >= 1e12 { raw } else { raw * 1000.0 };
            Utc.timestamp_millis_opt(millis as i64).single()
        }
        Value::String(s) => parse_timestamp_str(s.trim()),
        _ => None,
    }
}

fn parse_timestamp_str(s: &str) -> Option<DateTime<Utc>> {
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.and_utc());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc());
    }
    s.parse::<f64>()
        .ok()
        .and_then(|n| serde_json::Number::from_f64(n).map(Value::Number))
        .and_then(|v| parse_timestamp(&v))
}

/// Build the 3×3 matrix from a composite visualization payload.
///
/// `matrix_data` may be flat (`{"AX": 4}`) or nested (`{"A": {"X": 4}}`).
/// Without it, the matrix is counted from `products`.
pub fn parse_matrix(payload: &Value) -> MatrixView {
    let mut view = MatrixView::default();

    if let Some(obj) = payload.get("matrix_data").and_then(Value::as_object)
        && !obj.is_empty()
    {
        for (key, value) in obj {
            match value {
                Value::Object(inner) => {
                    for (xyz, count) in inner {
                        view.add(key, xyz, parse_count(count).unwrap_or(0));
                    }
                }
                other => {
                    let mut chars = key.chars();
                    if let (Some(abc), Some(xyz), None) = (chars.next(), chars.next(), chars.next())
                    {
                        view.add(
                            &abc.to_string(),
                            &xyz.to_string(),
                            parse_count(other).unwrap_or(0),
                        );
                    }
                }
            }
        }
        return view;
    }

    let products = payload
        .get("products")
        .map(normalize_rows)
        .unwrap_or_else(|| normalize_rows(payload));
    MatrixView::from_records(&products)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn normalizes_canonical_spelling() {
        let rec = normalize_record(&json!({
            "id": 7, "name": "Bolt M8", "revenue": 1200.5,
            "ABC": "A", "XYZ": "X", "ABC_XYZ": "AX"
        }))
        .unwrap();
        assert_eq!(rec.id.as_deref(), Some("7"));
        assert_eq!(rec.name, "Bolt M8");
        assert_eq!(rec.revenue, 1200.5);
        assert_eq!(rec.abc_xyz, "AX");
    }

    #[test]
    fn normalizes_database_spelling() {
        let rec = normalize_record(&json!({
            "product_name": "Nut", "total_revenue": "1 234,50",
            "abc_category": "b", "xyz_category": "z", "rank": 3
        }))
        .unwrap();
        assert_eq!(rec.name, "Nut");
        assert_eq!(rec.revenue, 1234.5);
        assert_eq!(rec.abc, "B");
        assert_eq!(rec.xyz, "Z");
        assert_eq!(rec.abc_xyz, "BZ");
        assert_eq!(rec.rank, Some(3));
    }

    #[test]
    fn normalizes_camel_case_spelling() {
        let rec = normalize_record(&json!({
            "productName": "Washer", "abcCategory": "C", "abcXyzCategory": "CY"
        }))
        .unwrap();
        assert_eq!(rec.name, "Washer");
        assert_eq!(rec.abc_xyz, "CY");
        assert_eq!(rec.xyz, "");
    }

    #[test]
    fn empty_name_falls_through_to_next_spelling() {
        let rec = normalize_record(&json!({"name": "", "product_name": "Glue"})).unwrap();
        assert_eq!(rec.name, "Glue");
    }

    #[test]
    fn missing_fields_default() {
        let rec = normalize_record(&json!({})).unwrap();
        assert_eq!(rec, AnalysisRecord::default());
        assert!(normalize_record(&json!("nope")).is_none());
    }

    #[test]
    fn rows_from_wrapped_payloads() {
        let bare = json!([{"name": "a"}, {"name": "b"}]);
        let wrapped = json!({"success": true, "data": [{"name": "a"}, 5, {"name": "b"}]});
        let products = json!({"products": [{"name": "a"}]});
        assert_eq!(normalize_rows(&bare).len(), 2);
        assert_eq!(normalize_rows(&wrapped).len(), 2);
        assert_eq!(normalize_rows(&wrapped)[1].name, "b");
        assert_eq!(normalize_rows(&products).len(), 1);
        assert!(normalize_rows(&json!({"success": true})).is_empty());
    }

    #[test]
    fn parse_number_handles_formats() {
        assert_eq!(parse_number(&json!(5)), Some(5.0));
        assert_eq!(parse_number(&json!("12,345.6 у.е.")), Some(12345.6));
        assert_eq!(parse_number(&json!("7,5")), Some(7.5));
        assert_eq!(parse_number(&json!("n/a")), None);
        assert_eq!(parse_number(&json!(null)), None);
    }

    #[test]
    fn truthiness_matches_javascript() {
        assert!(is_truthy(Some(&json!(true))));
        assert!(is_truthy(Some(&json!(1))));
        assert!(!is_truthy(Some(&json!(0))));
        assert!(!is_truthy(Some(&json!(""))));
        assert!(!is_truthy(Some(&json!(null))));
        assert!(!is_truthy(None));
    }

    #[test]
    fn distributions_from_both_shapes() {
        let obj = parse_distribution(Some(&json!({"A": 3, "B": "2"})));
        assert_eq!(obj["A"], 3);
        assert_eq!(obj["B"], 2);
        let list = parse_distribution(Some(&json!([{"category": "X", "count": 4}])));
        assert_eq!(list["X"], 4);
        assert!(parse_distribution(None).is_empty());
    }

    #[test]
    fn charts_skip_empty_payloads() {
        let charts = parse_charts(Some(&json!({"abc_pie": "iVBOR", "xyz_bar": "", "n": 1})));
        assert_eq!(charts.len(), 1);
        assert_eq!(charts.get("abc_pie"), Some("iVBOR"));
    }

    #[test]
    fn timestamps_in_many_shapes() {
        let expected = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap();
        assert_eq!(parse_timestamp(&json!("2024-03-01T12:30:00Z")), Some(expected));
        assert_eq!(parse_timestamp(&json!("2024-03-01T12:30:00")), Some(expected));
        assert_eq!(parse_timestamp(&json!("2024-03-01 12:30:00")), Some(expected));
        assert_eq!(parse_timestamp(&json!(1_709_296_200)), Some(expected));
        assert_eq!(parse_timestamp(&json!(1_709_296_200_000_i64)), Some(expected));
        assert_eq!(parse_timestamp(&json!("yesterday")), None);
    }

    #[test]
    fn matrix_from_flat_nested_and_products() {
        let flat = parse_matrix(&json!({"matrix_data": {"AX": 4, "CZ": 1}}));
        assert_eq!(flat.cell("A", "X"), 4);
        assert_eq!(flat.cell("C", "Z"), 1);

        let nested = parse_matrix(&json!({"matrix_data": {"B": {"Y": 2}}}));
        assert_eq!(nested.cell("B", "Y"), 2);

        let counted = parse_matrix(&json!({"products": [
            {"abc_category": "A", "xyz_category": "Y"},
            {"ABC": "A", "XYZ": "Y"}
        ]}));
        assert_eq!(counted.cell("A", "Y"), 2);
    }
}
