//! Visualization loader: fetch results from the best available source and
//! hand them to a view.
//!
//! Rows and charts are loaded independently. A failure in one never blocks
//! the other, and nothing here propagates an error: failed steps are logged
//! as diagnostics and the next source is tried.

use serde::Serialize;

use crate::api::Backend;
use crate::model::{AnalysisRecord, ChartSet, Summary};
use crate::notify::Notifier;
use crate::render::ResultsView;

/// Where the rendered rows came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RowsSource {
    DownloadLink,
    AnalysisData,
    LatestAnalysis,
    /// Every source failed or was empty; the placeholder row is shown.
    Nothing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartsSource {
    Upload,
    Server,
    Nothing,
}

/// What one load rendered.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct LoadReport {
    pub rows: usize,
    pub rows_source: RowsSource,
    pub charts: usize,
    pub charts_source: ChartsSource,
}

/// Rows and charts from one load.
#[derive(Debug, Clone)]
pub struct Loaded {
    pub records: Vec<AnalysisRecord>,
    pub charts: ChartSet,
    pub report: LoadReport,
}

impl Loaded {
    /// Table always; summary and charts only when there is something to show.
    pub fn render(&self, view: &mut dyn ResultsView) {
        view.render_table(&self.records);
        if !self.records.is_empty() {
            view.render_summary(&Summary::from_records(&self.records));
        }
        if !self.charts.is_empty() {
            view.render_charts(&self.charts);
        }
    }
}

pub struct VisualizationLoader<'a> {
    backend: &'a dyn Backend,
    notifier: &'a dyn Notifier,
    limit: u32,
}

impl<'a> VisualizationLoader<'a> {
    pub fn new(backend: &'a dyn Backend, notifier: &'a dyn Notifier, limit: u32) -> Self {
        Self {
            backend,
            notifier,
            limit,
        }
    }

    /// Load and render table, summary and charts.
    ///
    /// `link` is the download link returned by an upload; `charts` the
    /// charts that came back with it.
    pub fn load_results(
        &self,
        link: Option<&str>,
        charts: Option<&ChartSet>,
        view: &mut dyn ResultsView,
    ) -> LoadReport {
        let loaded = self.fetch(link, charts);
        loaded.render(view);
        loaded.report
    }

    /// Fetch rows and charts without rendering them.
    pub fn fetch(&self, link: Option<&str>, charts: Option<&ChartSet>) -> Loaded {
        let (records, rows_source) = self.fetch_rows(link);
        let (charts, charts_source) = self.fetch_charts(charts);
        let report = LoadReport {
            rows: records.len(),
            rows_source,
            charts: charts.len(),
            charts_source,
        };
        Loaded {
            records,
            charts,
            report,
        }
    }

    /// Rows by precedence: download link, analysis data, latest analysis.
    /// A source counts only if it yields at least one record.
    pub fn fetch_rows(&self, link: Option<&str>) -> (Vec<AnalysisRecord>, RowsSource) {
        if let Some(link) = link.filter(|l| !l.trim().is_empty()) {
            match self.backend.fetch_link(link) {
                Ok(rows) if !rows.is_empty() => return (rows, RowsSource::DownloadLink),
                Ok(_) => {}
                Err(e) => self.notifier.diagnostic(&format!("download link: {e:#}")),
            }
        }

        match self.backend.analysis_data(self.limit) {
            Ok(rows) if !rows.is_empty() => return (rows, RowsSource::AnalysisData),
            Ok(_) => {}
            Err(e) => self.notifier.diagnostic(&format!("analysis data: {e:#}")),
        }

        match self.backend.latest_analysis() {
            Ok(rows) if !rows.is_empty() => return (rows, RowsSource::LatestAnalysis),
            Ok(_) => {}
            Err(e) => self.notifier.diagnostic(&format!("latest analysis: {e:#}")),
        }

        (Vec::new(), RowsSource::Nothing)
    }

    /// Charts from the upload if it carried any, else from the server.
    pub fn fetch_charts(&self, uploaded: Option<&ChartSet>) -> (ChartSet, ChartsSource) {
        if let Some(charts) = uploaded.filter(|c| !c.is_empty()) {
            return (charts.clone(), ChartsSource::Upload);
        }
        match self.backend.charts() {
            Ok(charts) if !charts.is_empty() => (charts, ChartsSource::Server),
            Ok(_) => (ChartSet::new(), ChartsSource::Nothing),
            Err(e) => {
                self.notifier.diagnostic(&format!("charts: {e:#}"));
                (ChartSet::new(), ChartsSource::Nothing)
            }
        }
    }

    /// Replace the table with the current analysis data. An empty answer is
    /// rendered as the placeholder; a failed one leaves the table alone.
    pub fn reload_table(&self, view: &mut dyn ResultsView) -> Option<usize> {
        match self.backend.analysis_data(self.limit) {
            Ok(rows) => {
                view.render_table(&rows);
                Some(rows.len())
            }
            Err(e) => {
                self.notifier.diagnostic(&format!("analysis data: {e:#}"));
                None
            }
        }
    }

    /// Show previous results on startup if the server already has data.
    pub fn recover(&self, view: &mut dyn ResultsView) -> Option<LoadReport> {
        match self.backend.check_data() {
            Ok(presence) if presence.has_data => Some(self.load_results(None, None, view)),
            Ok(_) => None,
            Err(e) => {
                self.notifier.diagnostic(&format!("check data: {e:#}"));
                None
            }
        }
    }
}
