//! Colored terminal rendering of analysis results.

use colored::Colorize;

use super::{EMPTY_TABLE_TEXT, NOTHING_MISSING_TEXT, ResultsView, TABLE_COLUMNS, format_revenue};
use crate::api::DeleteResult;
use crate::model::{ABC_CLASSES, AnalysisRecord, ChartSet, Summary, XYZ_CLASSES};

/// Writes each region to stdout as it is rendered.
#[derive(Debug, Clone)]
pub struct TerminalView {
    /// Rows printed before the table is cut off.
    pub max_rows: usize,
}

impl Default for TerminalView {
    fn default() -> Self {
        Self { max_rows: 50 }
    }
}

impl ResultsView for TerminalView {
    fn render_table(&mut self, records: &[AnalysisRecord]) {
        println!("{}", "Analysis Results".bold().cyan());
        println!("{}", "=".repeat(78));
        println!(
            "  {:>5} {:<34} {:>14} {:>4} {:>4} {:>8}",
            TABLE_COLUMNS[0],
            TABLE_COLUMNS[1],
            TABLE_COLUMNS[2],
            TABLE_COLUMNS[3],
            TABLE_COLUMNS[4],
            TABLE_COLUMNS[5],
        );
        println!("  {}", "-".repeat(76));

        if records.is_empty() {
            println!("  {}", EMPTY_TABLE_TEXT.dimmed());
            return;
        }

        for (i, record) in records.iter().take(self.max_rows).enumerate() {
            let line = format!(
                "  {:>5} {:<34} {:>14} {:>4} {:>4} {:>8}",
                record.display_rank(i),
                truncate(&record.name, 34),
                format_revenue(record.revenue),
                record.abc,
                record.xyz,
                record.abc_xyz,
            );
            println!("{}", colorize_by_abc(&line, &record.abc));
        }

        if records.len() > self.max_rows {
            println!(
                "  {}",
                format!("… {} more rows", records.len() - self.max_rows).dimmed()
            );
        }
    }

    fn render_summary(&mut self, summary: &Summary) {
        println!();
        println!("{}", "Summary".bold().cyan());
        println!("  {} {}", "Total items:".bold(), summary.total_items);

        print_distribution("ABC", &ABC_CLASSES, summary, |c| {
            summary.abc.get(c).copied().unwrap_or(0)
        });
        print_distribution("XYZ", &XYZ_CLASSES, summary, |c| {
            summary.xyz.get(c).copied().unwrap_or(0)
        });

        if !summary.abc_xyz.is_empty() {
            let cells: Vec<String> = summary
                .abc_xyz
                .iter()
                .map(|(k, v)| format!("{k}: {v}"))
                .collect();
            println!("  {} {}", "ABC-XYZ:".bold(), cells.join("  "));
        }
        if !summary.top_products.is_empty() {
            println!(
                "  {} {}",
                "Top products:".bold(),
                summary.top_products.join(", ")
            );
        }
        if !summary.bottom_products.is_empty() {
            println!(
                "  {} {}",
                "Lowest revenue:".bold(),
                summary.bottom_products.join(", ").dimmed()
            );
        }
    }

    fn render_charts(&mut self, charts: &ChartSet) {
        println!();
        println!("{}", "Charts".bold().cyan());
        for (key, payload) in charts.ordered() {
            // base64 carries 3 bytes per 4 characters
            let approx_kb = payload.len() * 3 / 4 / 1024;
            println!(
                "  {} {:<20} {}",
                "✓".green(),
                ChartSet::title(key),
                format!("~{approx_kb} KB png").dimmed()
            );
        }
        println!(
            "  {}",
            "Run `abcxyz serve` to view the charts in a browser.".dimmed()
        );
    }

    fn set_updating(&mut self, updating: bool) {
        if updating {
            println!("{}", "↻ Updating…".yellow());
        }
    }

    fn render_deletion(&mut self, result: &DeleteResult) {
        println!("{}", "Deletion Summary".bold().cyan());
        println!("{}", "=".repeat(40));
        println!("  {} {}", "Deleted from store:   ".bold(), result.deleted_store);
        println!("  {} {}", "Deleted from analysis:".bold(), result.deleted_analysis);
        println!("  {} {}", "Found in file:        ".bold(), result.found_in_file());
        println!("  {} {}", "Missing:              ".bold(), result.missing_total());
        println!();

        if result.missing_total() == 0 {
            println!("  {}", NOTHING_MISSING_TEXT.green());
            return;
        }
        println!("{}", "Missing items".bold().yellow());
        for id in &result.missing_ids {
            println!("  {:<6} {}", "id".dimmed(), id);
        }
        for name in &result.missing_names {
            println!("  {:<6} {}", "name".dimmed(), name);
        }
    }
}

fn print_distribution(
    label: &str,
    classes: &[&str],
    summary: &Summary,
    count: impl Fn(&str) -> usize,
) {
    let cells: Vec<String> = classes
        .iter()
        .map(|c| {
            let n = count(c);
            format!("{c}: {n} ({:.1}%)", summary.pct(n))
        })
        .collect();
    println!("  {} {}", format!("{label}:").bold(), cells.join("  "));
}

fn colorize_by_abc(line: &str, abc: &str) -> colored::ColoredString {
    match abc {
        "A" => line.green(),
        "B" => line.yellow(),
        "C" => line.red(),
        _ => line.normal(),
    }
}

/// Truncate to `max_len` characters, appending "…" if truncated.
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(1)).collect();
        format!("{kept}…")
    }
}
