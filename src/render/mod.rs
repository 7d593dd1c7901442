//! Render targets for analysis results.
//!
//! The pipeline never writes output directly. It hands normalized records,
//! summaries and charts to a [`ResultsView`], which owns one display region
//! per method. Each call fully replaces that region.

use crate::api::DeleteResult;
use crate::model::{AnalysisRecord, ChartSet, Summary};

pub mod html;
pub mod terminal;

pub use html::{HtmlView, escape_html};
pub use terminal::TerminalView;

/// Text of the single row shown when there is nothing to list.
pub const EMPTY_TABLE_TEXT: &str = "No data to display";

/// Text of the missing-items placeholder after a clean delete.
pub const NOTHING_MISSING_TEXT: &str = "All items from the file were found and deleted";

/// Columns of the results table, in display order.
pub const TABLE_COLUMNS: [&str; 6] = ["#", "Product", "Revenue", "ABC", "XYZ", "ABC-XYZ"];

/// A set of display regions the pipeline can fill.
pub trait ResultsView {
    /// Replace every row of the results table. An empty slice shows the
    /// placeholder row.
    fn render_table(&mut self, records: &[AnalysisRecord]);

    fn render_summary(&mut self, summary: &Summary);

    fn render_charts(&mut self, charts: &ChartSet);

    /// Show or hide the "updating" indicator.
    fn set_updating(&mut self, _updating: bool) {}

    fn render_deletion(&mut self, _result: &DeleteResult) {}
}

/// Format a revenue figure with thousands separators and two decimals.
pub fn format_revenue(value: f64) -> String {
    let formatted = format!("{:.2}", value.abs());
    let (int_part, frac_part) = formatted.split_once('.').unwrap_or((&formatted, "00"));

    let grouped = group_digits(int_part, ' ');

    if value < 0.0 {
        format!("-{grouped}.{frac_part}")
    } else {
        format!("{grouped}.{frac_part}")
    }
}

/// Insert `sep` between every group of three digits, counting from the right.
pub fn group_digits(digits: &str, sep: char) -> String {
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(sep);
        }
        grouped.push(ch);
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn revenue_grouping() {
        assert_eq!(format_revenue(0.0), "0.00");
        assert_eq!(format_revenue(999.5), "999.50");
        assert_eq!(format_revenue(1234567.891), "1 234 567.89");
        assert_eq!(format_revenue(-1500.0), "-1 500.00");
    }

    #[test]
    fn digit_grouping_with_any_separator() {
        assert_eq!(group_digits("", ','), "");
        assert_eq!(group_digits("12", ','), "12");
        assert_eq!(group_digits("123", ' '), "123");
        assert_eq!(group_digits("1234", ','), "1,234");
        assert_eq!(group_digits("123456", ' '), "123 456");
        assert_eq!(group_digits("1234567", ','), "1,234,567");
    }
}
