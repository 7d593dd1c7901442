//! Canonical in-memory records.
//!
//! Everything the backend returns is mapped into these types by
//! [`crate::normalize`] before any rendering happens, so views never see the
//! backend's varying field spellings.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// ABC tiers, highest revenue contribution first.
pub const ABC_CLASSES: [&str; 3] = ["A", "B", "C"];

/// XYZ tiers, most stable demand first.
pub const XYZ_CLASSES: [&str; 3] = ["X", "Y", "Z"];

/// Chart keys the backend is known to produce, in display order.
pub const KNOWN_CHARTS: [(&str, &str); 4] = [
    ("abc_pie", "ABC distribution"),
    ("xyz_bar", "XYZ distribution"),
    ("abc_xyz_matrix", "ABC-XYZ matrix"),
    ("top_products", "Top products"),
];

// ---------------------------------------------------------------------------
// Analysis rows
// ---------------------------------------------------------------------------

/// One classified product.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub id: Option<String>,
    pub rank: Option<u64>,
    pub name: String,
    pub revenue: f64,
    /// `"A"`, `"B"`, `"C"`, or empty when the backend omitted it.
    pub abc: String,
    /// `"X"`, `"Y"`, `"Z"`, or empty.
    pub xyz: String,
    /// Combined class such as `"AX"`, or empty.
    pub abc_xyz: String,
}

impl AnalysisRecord {
    /// CSS class used to colour the row by its ABC tier.
    pub fn category_class(&self) -> Option<String> {
        if self.abc.is_empty() {
            None
        } else {
            Some(format!("category-{}", self.abc.to_lowercase()))
        }
    }

    /// Rank column value: the server rank, else the 1-based row position.
    pub fn display_rank(&self, index: usize) -> u64 {
        self.rank.unwrap_or(index as u64 + 1)
    }
}

// ---------------------------------------------------------------------------
// Charts
// ---------------------------------------------------------------------------

/// Base64 chart images keyed by chart name. Every entry is optional; a
/// missing key means the chart has not been generated yet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChartSet(BTreeMap<String, String>);

impl ChartSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, payload: impl Into<String>) {
        self.0.insert(key.into(), payload.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Charts in display order: known keys first, then anything else the
    /// backend sent, alphabetically.
    pub fn ordered(&self) -> Vec<(&str, &str)> {
        let mut out: Vec<(&str, &str)> = KNOWN_CHARTS
            .iter()
            .filter_map(|(key, _)| self.get(key).map(|p| (*key, p)))
            .collect();
        out.extend(
            self.0
                .iter()
                .filter(|(k, _)| !KNOWN_CHARTS.iter().any(|(known, _)| known == k))
                .map(|(k, v)| (k.as_str(), v.as_str())),
        );
        out
    }

    /// Human title for a chart key.
    pub fn title(key: &str) -> String {
        KNOWN_CHARTS
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, t)| (*t).to_string())
            .unwrap_or_else(|| key.replace('_', " "))
    }
}

// ---------------------------------------------------------------------------
// Summary statistics
// ---------------------------------------------------------------------------

/// Per-category counts and the best/worst sellers of one result set.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Summary {
    pub total_items: usize,
    pub abc: BTreeMap<String, usize>,
    pub xyz: BTreeMap<String, usize>,
    pub abc_xyz: BTreeMap<String, usize>,
    pub top_products: Vec<String>,
    pub bottom_products: Vec<String>,
}

impl Summary {
    /// Count categories over `records` and pick the three highest and three
    /// lowest products by revenue.
    pub fn from_records(records: &[AnalysisRecord]) -> Self {
        let mut abc: BTreeMap<String, usize> =
            ABC_CLASSES.iter().map(|c| ((*c).to_string(), 0)).collect();
        let mut xyz: BTreeMap<String, usize> =
            XYZ_CLASSES.iter().map(|c| ((*c).to_string(), 0)).collect();
        let mut abc_xyz = BTreeMap::new();

        for record in records {
            if let Some(count) = abc.get_mut(&record.abc) {
                *count += 1;
            }
            if let Some(count) = xyz.get_mut(&record.xyz) {
                *count += 1;
            }
            if !record.abc_xyz.is_empty() {
                *abc_xyz.entry(record.abc_xyz.clone()).or_insert(0) += 1;
            }
        }

        let mut by_revenue: Vec<&AnalysisRecord> = records.iter().collect();
        by_revenue.sort_by(|a, b| b.revenue.total_cmp(&a.revenue));

        let top_products = by_revenue
            .iter()
            .take(3)
            .map(|r| r.name.clone())
            .collect();
        let bottom_products = by_revenue
            .iter()
            .skip(by_revenue.len().saturating_sub(3))
            .map(|r| r.name.clone())
            .collect();

        Self {
            total_items: records.len(),
            abc,
            xyz,
            abc_xyz,
            top_products,
            bottom_products,
        }
    }

    /// Share of `count` in the total, as a percentage.
    pub fn pct(&self, count: usize) -> f64 {
        if self.total_items == 0 {
            0.0
        } else {
            count as f64 / self.total_items as f64 * 100.0
        }
    }
}

// ---------------------------------------------------------------------------
// ABC-XYZ matrix
// ---------------------------------------------------------------------------

/// Cross-tabulation of ABC tiers (rows) against XYZ tiers (columns).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MatrixView {
    pub counts: [[usize; 3]; 3],
}

impl MatrixView {
    pub fn from_records(records: &[AnalysisRecord]) -> Self {
        let mut view = Self::default();
        for record in records {
            view.add(&record.abc, &record.xyz, 1);
        }
        view
    }

    /// Matrix from a visualization payload; see [`crate::normalize::parse_matrix`].
    pub fn from_payload(payload: &serde_json::Value) -> Self {
        crate::normalize::parse_matrix(payload)
    }

    /// Add `n` items to the cell for `abc`/`xyz`. Unknown tiers are ignored.
    pub fn add(&mut self, abc: &str, xyz: &str, n: usize) {
        let row = ABC_CLASSES.iter().position(|c| c.eq_ignore_ascii_case(abc));
        let col = XYZ_CLASSES.iter().position(|c| c.eq_ignore_ascii_case(xyz));
        if let (Some(r), Some(c)) = (row, col) {
            self.counts[r][c] += n;
        }
    }

    pub fn cell(&self, abc: &str, xyz: &str) -> usize {
        let row = ABC_CLASSES.iter().position(|c| *c == abc);
        let col = XYZ_CLASSES.iter().position(|c| *c == xyz);
        match (row, col) {
            (Some(r), Some(c)) => self.counts[r][c],
            _ => 0,
        }
    }

    pub fn row_total(&self, row: usize) -> usize {
        self.counts[row].iter().sum()
    }

    pub fn col_total(&self, col: usize) -> usize {
        self.counts.iter().map(|r| r[col]).sum()
    }

    pub fn total(&self) -> usize {
        self.counts.iter().flatten().sum()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, revenue: f64, abc: &str, xyz: &str) -> AnalysisRecord {
        AnalysisRecord {
            name: name.to_string(),
            revenue,
            abc: abc.to_string(),
            xyz: xyz.to_string(),
            abc_xyz: format!("{abc}{xyz}"),
            ..Default::default()
        }
    }

    #[test]
    fn summary_counts_known_tiers() {
        let records = vec![
            record("bolts", 900.0, "A", "X"),
            record("nuts", 500.0, "A", "Y"),
            record("washers", 100.0, "B", "Z"),
            record("rivets", 10.0, "C", "X"),
            record("glue", 5.0, "?", ""),
        ];
        let summary = Summary::from_records(&records);
        assert_eq!(summary.total_items, 5);
        assert_eq!(summary.abc["A"], 2);
        assert_eq!(summary.abc["B"], 1);
        assert_eq!(summary.abc["C"], 1);
        assert!(!summary.abc.contains_key("?"));
        assert_eq!(summary.xyz["X"], 2);
        assert_eq!(summary.abc_xyz["AX"], 1);
        assert_eq!(summary.top_products, vec!["bolts", "nuts", "washers"]);
        assert_eq!(summary.bottom_products, vec!["washers", "rivets", "glue"]);
        assert!((summary.pct(2) - 40.0).abs() < f64::EPSILON);
    }

    #[test]
    fn summary_of_nothing_has_zero_percentages() {
        let summary = Summary::from_records(&[]);
        assert_eq!(summary.total_items, 0);
        assert_eq!(summary.abc["A"], 0);
        assert_eq!(summary.pct(0), 0.0);
        assert!(summary.top_products.is_empty());
        assert!(summary.bottom_products.is_empty());
    }

    #[test]
    fn category_class_follows_abc() {
        assert_eq!(
            record("x", 1.0, "B", "X").category_class().as_deref(),
            Some("category-b")
        );
        assert_eq!(record("x", 1.0, "", "X").category_class(), None);
    }

    #[test]
    fn chart_set_orders_known_keys_first() {
        let mut charts = ChartSet::new();
        charts.insert("zz_custom", "Zm9v");
        charts.insert("top_products", "YmFy");
        charts.insert("abc_pie", "YmF6");
        let keys: Vec<&str> = charts.ordered().into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["abc_pie", "top_products", "zz_custom"]);
        assert_eq!(ChartSet::title("xyz_bar"), "XYZ distribution");
        assert_eq!(ChartSet::title("zz_custom"), "zz custom");
    }

    #[test]
    fn matrix_totals() {
        let records = vec![
            record("a", 1.0, "A", "X"),
            record("b", 1.0, "A", "X"),
            record("c", 1.0, "B", "Z"),
            record("d", 1.0, "", "Z"),
        ];
        let matrix = MatrixView::from_records(&records);
        assert_eq!(matrix.cell("A", "X"), 2);
        assert_eq!(matrix.cell("B", "Z"), 1);
        assert_eq!(matrix.row_total(0), 2);
        assert_eq!(matrix.col_total(2), 1);
        assert_eq!(matrix.total(), 3);
    }
}
