//! Upload and delete-by-file controllers.
//!
//! Both take a user-selected workbook, validate it locally, send it to the
//! backend and report every step to a [`Notifier`]. Neither returns an
//! error: the outcome enum says what happened and the notifier has already
//! told the user.

use std::borrow::Cow;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::api::{self, Backend, DeleteResult, UploadResult};
use crate::config::schema::UploadConfig;
use crate::loader::VisualizationLoader;
use crate::model::Summary;
use crate::notify::Notifier;
use crate::render::ResultsView;

/// Shown when the upload fails without a server-provided message.
pub const UPLOAD_FAILED: &str = "Error while processing the file";

/// Shown when the delete fails without a server-provided message.
pub const DELETE_FAILED: &str = "Error while deleting data";

// ---------------------------------------------------------------------------
// Selected file
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
enum Source {
    Path(PathBuf),
    Memory(Vec<u8>),
}

/// A workbook chosen for upload. The body is read lazily, only after
/// validation has passed.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub name: String,
    pub size: u64,
    source: Source,
}

impl UploadFile {
    pub fn from_path(path: &Path) -> Result<Self> {
        let meta = std::fs::metadata(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        if !meta.is_file() {
            anyhow::bail!("{} is not a file", path.display());
        }
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self {
            name,
            size: meta.len(),
            source: Source::Path(path.to_path_buf()),
        })
    }

    pub fn from_bytes(name: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            size: data.len() as u64,
            source: Source::Memory(data),
        }
    }

    pub fn read_bytes(&self) -> Result<Cow<'_, [u8]>> {
        match &self.source {
            Source::Memory(data) => Ok(Cow::Borrowed(data)),
            Source::Path(path) => std::fs::read(path)
                .map(Cow::Owned)
                .with_context(|| format!("failed to read {}", path.display())),
        }
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Why a file was rejected before any network call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    UnsupportedExtension { allowed: Vec<String> },
    TooLarge { size: u64, limit: u64 },
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnsupportedExtension { allowed } => {
                write!(f, "Please choose an Excel file ({})", allowed.join(" or "))
            }
            Self::TooLarge { limit, .. } => {
                write!(f, "File size must not exceed {} MB", limit / (1024 * 1024))
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// Check the extension (text after the last `.`, case-insensitive) and size.
pub fn validate(file: &UploadFile, config: &UploadConfig) -> Result<(), ValidationError> {
    let extension = file
        .name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_lowercase());
    let allowed = extension.is_some_and(|ext| {
        config
            .allowed_extensions
            .iter()
            .any(|a| a.trim_start_matches('.').eq_ignore_ascii_case(&ext))
    });
    if !allowed {
        return Err(ValidationError::UnsupportedExtension {
            allowed: config.allowed_extensions.clone(),
        });
    }
    if file.size > config.max_size_bytes {
        return Err(ValidationError::TooLarge {
            size: file.size,
            limit: config.max_size_bytes,
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Controllers
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum UploadOutcome {
    Rejected(ValidationError),
    Failed(String),
    Uploaded(UploadResult),
}

#[derive(Debug)]
pub enum DeleteOutcome {
    Rejected(ValidationError),
    Failed(String),
    Deleted(DeleteResult),
}

/// Drives upload and delete-by-file for one session.
pub struct UploadController<'a> {
    backend: &'a dyn Backend,
    notifier: &'a dyn Notifier,
    config: &'a UploadConfig,
    analysis_limit: u32,
}

impl<'a> UploadController<'a> {
    pub fn new(
        backend: &'a dyn Backend,
        notifier: &'a dyn Notifier,
        config: &'a UploadConfig,
        analysis_limit: u32,
    ) -> Self {
        Self {
            backend,
            notifier,
            config,
            analysis_limit,
        }
    }

    fn loader(&self) -> VisualizationLoader<'a> {
        VisualizationLoader::new(self.backend, self.notifier, self.analysis_limit)
    }

    fn reject(&self, err: ValidationError) -> ValidationError {
        self.notifier.error(&err.to_string());
        self.notifier.progress(0);
        err
    }

    /// Validate, upload, then render the returned stats and load the
    /// full results.
    pub fn submit_file(&self, file: &UploadFile, view: &mut dyn ResultsView) -> UploadOutcome {
        if let Err(e) = validate(file, self.config) {
            return UploadOutcome::Rejected(self.reject(e));
        }

        self.notifier.info(&format!("Uploading file: {}", file.name));
        self.notifier.progress(30);
        self.notifier.progress(50);

        let result = match self.backend.upload(file) {
            Ok(result) => result,
            Err(e) => {
                self.notifier.diagnostic(&format!("upload failed: {e:#}"));
                let message = api::user_message(&e, UPLOAD_FAILED);
                self.notifier.error(&message);
                self.notifier.progress(0);
                return UploadOutcome::Failed(message);
            }
        };

        self.notifier.progress(80);
        self.notifier.progress(100);

        let message = if result.message.is_empty() {
            format!("File {} processed", file.name)
        } else {
            result.message.clone()
        };
        self.notifier.success(&message);

        view.render_summary(&Summary::from(&result.stats));
        self.loader().load_results(
            result.download_links.analysis.as_deref(),
            result.charts(),
            view,
        );

        UploadOutcome::Uploaded(result)
    }

    /// Validate, ask the backend to delete every item listed in the file,
    /// render what was removed, then reload the table.
    pub fn delete_file(&self, file: &UploadFile, view: &mut dyn ResultsView) -> DeleteOutcome {
        if let Err(e) = validate(file, self.config) {
            return DeleteOutcome::Rejected(self.reject(e));
        }

        self.notifier
            .info(&format!("Deleting items listed in: {}", file.name));
        self.notifier.progress(30);
        self.notifier.progress(60);

        let result = match self.backend.delete_by_file(file) {
            Ok(result) => result,
            Err(e) => {
                self.notifier.diagnostic(&format!("delete failed: {e:#}"));
                let message = api::user_message(&e, DELETE_FAILED);
                self.notifier.error(&message);
                self.notifier.progress(0);
                return DeleteOutcome::Failed(message);
            }
        };

        self.notifier.progress(90);
        self.notifier.progress(100);
        self.notifier.success(&format!(
            "Deleted {} items from the store, {} from the analysis",
            result.deleted_store, result.deleted_analysis
        ));

        view.render_deletion(&result);
        self.loader().reload_table(view);

        DeleteOutcome::Deleted(result)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> UploadConfig {
        UploadConfig::default()
    }

    #[test]
    fn accepts_excel_extensions_case_insensitively() {
        for name in ["stock.xlsx", "STOCK.XLS", "q1.report.Xlsx"] {
            let file = UploadFile::from_bytes(name, vec![0; 10]);
            assert!(validate(&file, &config()).is_ok(), "{name}");
        }
    }

    #[test]
    fn rejects_other_extensions() {
        for name in ["stock.csv", "xlsx", "stock.xlsx.pdf", "stock."] {
            let file = UploadFile::from_bytes(name, vec![0; 10]);
            assert!(
                matches!(
                    validate(&file, &config()),
                    Err(ValidationError::UnsupportedExtension { .. })
                ),
                "{name}"
            );
        }
    }

    #[test]
    fn size_limit_is_inclusive() {
        let limit = config().max_size_bytes as usize;
        let at_limit = UploadFile::from_bytes("a.xlsx", vec![0; limit]);
        assert!(validate(&at_limit, &config()).is_ok());

        let over = UploadFile::from_bytes("a.xlsx", vec![0; limit + 1]);
        let err = validate(&over, &config()).unwrap_err();
        assert_eq!(err.to_string(), "File size must not exceed 10 MB");
    }

    #[test]
    fn extension_message_lists_allowed() {
        let file = UploadFile::from_bytes("notes.txt", Vec::new());
        let err = validate(&file, &config()).unwrap_err();
        assert_eq!(err.to_string(), "Please choose an Excel file (.xls or .xlsx)");
    }

    #[test]
    fn from_path_reads_name_and_size() {
        let dir = std::env::temp_dir().join(format!("abcxyz-upload-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("stock.xlsx");
        std::fs::write(&path, b"PK\x03\x04data").unwrap();

        let file = UploadFile::from_path(&path).unwrap();
        assert_eq!(file.name, "stock.xlsx");
        assert_eq!(file.size, 8);
        assert_eq!(file.read_bytes().unwrap().len(), 8);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn from_path_missing_file_is_error() {
        assert!(UploadFile::from_path(Path::new("/nonexistent/abcxyz/stock.xlsx")).is_err());
    }
}
