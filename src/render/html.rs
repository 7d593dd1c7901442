//! HTML fragments for the dashboard page.
//!
//! Each region is held as an optional string. A view built without a region
//! silently ignores renders aimed at it, the way a page without the matching
//! element would.

use std::fmt::Write as _;

use super::{EMPTY_TABLE_TEXT, NOTHING_MISSING_TEXT, ResultsView, TABLE_COLUMNS, format_revenue};
use crate::api::DeleteResult;
use crate::model::{ABC_CLASSES, AnalysisRecord, ChartSet, Summary, XYZ_CLASSES};

/// Display regions of the dashboard page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    Table,
    Summary,
    Charts,
    Deletion,
}

/// Collects rendered HTML per region.
#[derive(Debug, Clone)]
pub struct HtmlView {
    table: Option<String>,
    summary: Option<String>,
    charts: Option<String>,
    deletion: Option<String>,
    updating: bool,
}

impl Default for HtmlView {
    fn default() -> Self {
        Self::new()
    }
}

impl HtmlView {
    /// A view with every region present and empty.
    pub fn new() -> Self {
        Self::with_regions(&[Region::Table, Region::Summary, Region::Charts, Region::Deletion])
    }

    /// A view with only the listed regions.
    pub fn with_regions(regions: &[Region]) -> Self {
        let slot = |r: Region| regions.contains(&r).then(String::new);
        Self {
            table: slot(Region::Table),
            summary: slot(Region::Summary),
            charts: slot(Region::Charts),
            deletion: slot(Region::Deletion),
            updating: false,
        }
    }

    /// Rendered HTML of a region, `None` if the view lacks it.
    pub fn region(&self, region: Region) -> Option<&str> {
        match region {
            Region::Table => self.table.as_deref(),
            Region::Summary => self.summary.as_deref(),
            Region::Charts => self.charts.as_deref(),
            Region::Deletion => self.deletion.as_deref(),
        }
    }

    pub fn is_updating(&self) -> bool {
        self.updating
    }
}

impl ResultsView for HtmlView {
    fn render_table(&mut self, records: &[AnalysisRecord]) {
        let Some(out) = self.table.as_mut() else {
            return;
        };
        out.clear();

        out.push_str("<table class=\"results\"><thead><tr>");
        for col in TABLE_COLUMNS {
            let _ = write!(out, "<th>{}</th>", escape_html(col));
        }
        out.push_str("</tr></thead><tbody>");

        if records.is_empty() {
            let _ = write!(
                out,
                "<tr><td colspan=\"{}\" class=\"empty\">{}</td></tr>",
                TABLE_COLUMNS.len(),
                EMPTY_TABLE_TEXT
            );
        }
        for (i, record) in records.iter().enumerate() {
            match record.category_class() {
                Some(class) => {
                    let _ = write!(out, "<tr class=\"{}\">", escape_html(&class));
                }
                None => out.push_str("<tr>"),
            }
            let _ = write!(
                out,
                "<td>{}</td><td>{}</td><td class=\"num\">{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
                record.display_rank(i),
                escape_html(&record.name),
                format_revenue(record.revenue),
                escape_html(&record.abc),
                escape_html(&record.xyz),
                escape_html(&record.abc_xyz),
            );
        }
        out.push_str("</tbody></table>");
    }

    fn render_summary(&mut self, summary: &Summary) {
        let Some(out) = self.summary.as_mut() else {
            return;
        };
        out.clear();

        let _ = write!(
            out,
            "<div class=\"stat-card\"><span class=\"stat-label\">Total items</span><span class=\"stat-value\">{}</span></div>",
            summary.total_items
        );
        for (label, classes, counts) in [
            ("ABC", &ABC_CLASSES, &summary.abc),
            ("XYZ", &XYZ_CLASSES, &summary.xyz),
        ] {
            let _ = write!(out, "<div class=\"stat-group\"><h4>{label}</h4><ul>");
            for class in classes.iter() {
                let n = counts.get(*class).copied().unwrap_or(0);
                let _ = write!(
                    out,
                    "<li class=\"category-{}\">{class}: {n} <small>({:.1}%)</small></li>",
                    class.to_lowercase(),
                    summary.pct(n)
                );
            }
            out.push_str("</ul></div>");
        }
        if !summary.abc_xyz.is_empty() {
            out.push_str("<div class=\"stat-group\"><h4>ABC-XYZ</h4><ul>");
            for (combo, n) in &summary.abc_xyz {
                let _ = write!(out, "<li>{}: {n}</li>", escape_html(combo));
            }
            out.push_str("</ul></div>");
        }
        for (title, products) in [
            ("Top products", &summary.top_products),
            ("Lowest revenue", &summary.bottom_products),
        ] {
            if products.is_empty() {
                continue;
            }
            let _ = write!(out, "<div class=\"stat-group\"><h4>{title}</h4><ol>");
            for name in products {
                let _ = write!(out, "<li>{}</li>", escape_html(name));
            }
            out.push_str("</ol></div>");
        }
    }

    fn render_charts(&mut self, charts: &ChartSet) {
        let Some(out) = self.charts.as_mut() else {
            return;
        };
        out.clear();

        for (key, payload) in charts.ordered() {
            let src = if payload.starts_with("data:") {
                payload.to_string()
            } else {
                format!("data:image/png;base64,{payload}")
            };
            let title = ChartSet::title(key);
            let _ = write!(
                out,
                "<figure class=\"chart\" id=\"chart-{}\"><img alt=\"{}\" src=\"{}\"><figcaption>{}</figcaption></figure>",
                escape_html(key),
                escape_html(&title),
                escape_html(&src),
                escape_html(&title),
            );
        }
    }

    fn set_updating(&mut self, updating: bool) {
        self.updating = updating;
    }

    fn render_deletion(&mut self, result: &DeleteResult) {
        let Some(out) = self.deletion.as_mut() else {
            return;
        };
        out.clear();

        out.push_str("<div class=\"delete-stats\">");
        for (label, value) in [
            ("Deleted from store", result.deleted_store),
            ("Deleted from analysis", result.deleted_analysis),
            ("Found in file", result.found_in_file()),
            ("Missing", result.missing_total()),
        ] {
            let _ = write!(
                out,
                "<div class=\"stat-card\"><span class=\"stat-label\">{label}</span><span class=\"stat-value\">{value}</span></div>"
            );
        }
        out.push_str("</div><table class=\"missing\"><thead><tr><th>Kind</th><th>Value</th></tr></thead><tbody>");

        if result.missing_total() == 0 {
            let _ = write!(
                out,
                "<tr><td colspan=\"2\" class=\"empty\">{NOTHING_MISSING_TEXT}</td></tr>"
            );
        }
        for id in &result.missing_ids {
            let _ = write!(out, "<tr><td>id</td><td>{}</td></tr>", escape_html(id));
        }
        for name in &result.missing_names {
            let _ = write!(out, "<tr><td>name</td><td>{}</td></tr>", escape_html(name));
        }
        out.push_str("</tbody></table>");
    }
}

/// Escape text for safe inclusion in HTML content and attribute values.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, abc: &str) -> AnalysisRecord {
        AnalysisRecord {
            name: name.to_string(),
            revenue: 1500.0,
            abc: abc.to_string(),
            xyz: "X".to_string(),
            abc_xyz: format!("{abc}X"),
            ..Default::default()
        }
    }

    #[test]
    fn escape_leaves_no_raw_markup() {
        let escaped = escape_html("<script>alert(\"x\" & 'y')</script>");
        assert!(!escaped.contains('<'));
        assert!(!escaped.contains('>'));
        assert!(!escaped.contains('"'));
        assert_eq!(escape_html("plain"), "plain");
    }

    #[test]
    fn table_rows_are_styled_by_abc() {
        let mut view = HtmlView::new();
        view.render_table(&[record("Bolt", "A"), record("Nut", "C")]);
        let html = view.region(Region::Table).unwrap();
        assert_eq!(html.matches("<tr class=\"category-").count(), 2);
        assert!(html.contains("<tr class=\"category-a\"><td>1</td><td>Bolt</td>"));
        assert!(html.contains("<tr class=\"category-c\"><td>2</td><td>Nut</td>"));
        assert!(html.contains("1 500.00"));
    }

    #[test]
    fn empty_table_has_placeholder_row() {
        let mut view = HtmlView::new();
        view.render_table(&[]);
        let html = view.region(Region::Table).unwrap();
        assert!(html.contains("colspan=\"6\""));
        assert!(html.contains(EMPTY_TABLE_TEXT));
    }

    #[test]
    fn product_names_are_escaped() {
        let mut view = HtmlView::new();
        view.render_table(&[record("<img src=x onerror=alert(1)>", "B")]);
        let html = view.region(Region::Table).unwrap();
        assert!(!html.contains("<img"));
        assert!(html.contains("&lt;img"));
    }

    #[test]
    fn missing_region_is_a_no_op() {
        let mut view = HtmlView::with_regions(&[Region::Table]);
        view.render_summary(&Summary::from_records(&[record("Bolt", "A")]));
        let mut charts = ChartSet::new();
        charts.insert("abc_pie", "iVBOR");
        view.render_charts(&charts);
        assert!(view.region(Region::Summary).is_none());
        assert!(view.region(Region::Charts).is_none());
        assert_eq!(view.region(Region::Table), Some(""));
    }

    #[test]
    fn charts_render_as_data_urls() {
        let mut view = HtmlView::new();
        let mut charts = ChartSet::new();
        charts.insert("xyz_bar", "iVBORw0KGgo=");
        view.render_charts(&charts);
        let html = view.region(Region::Charts).unwrap();
        assert!(html.contains("src=\"data:image/png;base64,iVBORw0KGgo=\""));
        assert!(html.contains("XYZ distribution"));
    }

    #[test]
    fn rerender_replaces_region() {
        let mut view = HtmlView::new();
        view.render_table(&[record("Old", "A")]);
        view.render_table(&[record("New", "B")]);
        let html = view.region(Region::Table).unwrap();
        assert!(!html.contains("Old"));
        assert!(html.contains("New"));
    }

    #[test]
    fn clean_delete_shows_placeholder() {
        let mut view = HtmlView::new();
        view.render_deletion(&DeleteResult {
            deleted_store: 3,
            requested_ids: 3,
            ..Default::default()
        });
        let html = view.region(Region::Deletion).unwrap();
        assert!(html.contains(NOTHING_MISSING_TEXT));
        assert!(html.contains("<span class=\"stat-value\">3</span>"));
    }
}
