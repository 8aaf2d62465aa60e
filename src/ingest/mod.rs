pub mod walker;
pub mod parsers;
pub mod normalize;
pub mod reconcile;

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use tempfile::NamedTempFile;

use crate::db::Db;
use crate::error::{PocdeskError, Result};
use crate::model::CandidateRecord;
use crate::store::{self, UploadRecord};

pub use walker::discover_upload_files;
pub use parsers::{Parser, ParserRegistry};
pub use normalize::normalize_candidates;
pub use reconcile::{reconcile_all, reconcile_candidate, Action, CandidateOutcome, IngestReport};

/// File extensions accepted for upload
pub const ALLOWED_EXTENSIONS: &[&str] = &["csv", "xlsx", "xls"];

/// An uploaded file held in memory
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Check the extension against the allow-list, returning it lower-cased.
pub fn validate_file_name(file_name: &str) -> Result<String> {
    let extension = Path::new(file_name)
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or("")
        .to_lowercase();

    if ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
        Ok(extension)
    } else {
        Err(PocdeskError::Validation(format!(
            "Invalid file type. Allowed types: {}",
            ALLOWED_EXTENSIONS
                .iter()
                .map(|e| format!(".{}", e))
                .collect::<Vec<_>>()
                .join(", ")
        )))
    }
}

/// Write the upload to a uniquely named file under `temp_dir`. The file is
/// deleted when the returned handle is closed or dropped.
fn stage_upload(temp_dir: &Path, extension: &str, bytes: &[u8]) -> Result<NamedTempFile> {
    std::fs::create_dir_all(temp_dir)?;
    let mut staged = tempfile::Builder::new()
        .prefix("upload-")
        .suffix(&format!(".{}", extension))
        .tempfile_in(temp_dir)?;
    staged.write_all(bytes)?;
    staged.flush()?;
    Ok(staged)
}

/// Parse a file on disk, fold its rows and reconcile every company.
pub async fn ingest_path(
    db: &Db,
    registry: Arc<ParserRegistry>,
    path: &Path,
    extension: &str,
    owner_email: &str,
) -> Result<IngestReport> {
    let path_buf = path.to_path_buf();
    let ext = extension.to_string();
    let rows = tokio::task::spawn_blocking(move || registry.parse(&path_buf, &ext))
        .await
        .map_err(|e| {
            PocdeskError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("parser task failed: {}", e),
            ))
        })??;

    let row_count = rows.len();
    let candidates = normalize_candidates(rows);
    if candidates.is_empty() {
        return Err(PocdeskError::EmptyResult(
            "No valid company data found in file".to_string(),
        ));
    }
    log::info!(
        "{}: {} row(s) folded into {} company candidate(s)",
        path.display(),
        row_count,
        candidates.len()
    );

    Ok(reconcile_all(db, candidates, owner_email).await)
}

/// Full upload pipeline: validate, stage to a scoped temp file, parse,
/// reconcile. The temp file is removed on every path out of this function.
pub async fn ingest_upload(
    db: &Db,
    registry: Arc<ParserRegistry>,
    temp_dir: &Path,
    owner_email: &str,
    upload: Upload,
) -> Result<IngestReport> {
    let extension = validate_file_name(&upload.file_name)?;
    let staged = stage_upload(temp_dir, &extension, &upload.bytes)?;
    log::debug!("Staged {} as {}", upload.file_name, staged.path().display());

    let result = ingest_path(db, registry, staged.path(), &extension, owner_email).await;

    if let Err(e) = staged.close() {
        log::warn!("Failed to remove staged upload for {}: {}", upload.file_name, e);
    }

    record_attempt(db, owner_email, &upload.file_name, &result).await;
    result
}

/// Ingest a file already on disk (CLI path), no staging copy.
pub async fn ingest_local_file(
    db: &Db,
    registry: Arc<ParserRegistry>,
    path: &Path,
    owner_email: &str,
) -> Result<IngestReport> {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .to_string();
    let extension = validate_file_name(&file_name)?;

    let result = ingest_path(db, registry, path, &extension, owner_email).await;
    record_attempt(db, owner_email, &file_name, &result).await;
    result
}

/// Reconcile candidates supplied directly (JSON batch registration).
pub async fn ingest_candidates(
    db: &Db,
    candidates: Vec<CandidateRecord>,
    owner_email: &str,
) -> Result<IngestReport> {
    let candidates = normalize_candidates(candidates);
    if candidates.is_empty() {
        return Err(PocdeskError::EmptyResult(
            "No valid company data provided".to_string(),
        ));
    }
    Ok(reconcile_all(db, candidates, owner_email).await)
}

async fn record_attempt(db: &Db, owner_email: &str, file_name: &str, result: &Result<IngestReport>) {
    let record = match result {
        Ok(report) => {
            log::info!(
                "Upload {} by {}: {} affected, {} failed",
                file_name,
                owner_email,
                report.affected_count(),
                report.failed_count()
            );
            UploadRecord {
                submitter_email: owner_email.to_string(),
                file_name: file_name.to_string(),
                candidate_count: report.candidate_count(),
                affected_count: report.affected_count(),
                failed_count: report.failed_count(),
                error_message: None,
            }
        }
        Err(e) => {
            log::warn!("Upload {} by {} rejected: {}", file_name, owner_email, e);
            UploadRecord {
                submitter_email: owner_email.to_string(),
                file_name: file_name.to_string(),
                error_message: Some(e.to_string()),
                ..Default::default()
            }
        }
    };

    if let Err(e) = store::log_upload(db, record).await {
        log::warn!("Failed to write upload log for {}: {}", file_name, e);
    }
}
