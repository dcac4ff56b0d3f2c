//! Local CSV export and the upload that follows it.

use std::path::Path;

use tracing::info;

use crate::constants::CSV_COLUMNS;
use crate::error::EtlError;
use crate::s3::ObjectStore;
use crate::transform::PostRecord;

/// Write `records` to `path` as CSV with a header row, replacing any existing file.
///
/// Returns the number of data rows written.
///
/// # Errors
///
/// Returns [`EtlError::Write`] if the file or its parent directory cannot be written.
pub fn write_csv(records: &[PostRecord], path: &Path) -> Result<usize, EtlError> {
    let write_error = |message: String| EtlError::Write {
        path: path.to_path_buf(),
        message,
    };

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .map_err(|e| write_error(format!("create {}: {e}", parent.display())))?;
        }
    }

    // Header is written by hand so an empty batch still gets one.
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .map_err(|e| write_error(e.to_string()))?;
    writer
        .write_record(CSV_COLUMNS)
        .map_err(|e| write_error(e.to_string()))?;
    for record in records {
        writer
            .serialize(record)
            .map_err(|e| write_error(e.to_string()))?;
    }
    writer.flush().map_err(|e| write_error(e.to_string()))?;

    info!(
        path = %path.display(),
        rows = records.len(),
        columns = ?CSV_COLUMNS,
        "Local file created"
    );
    Ok(records.len())
}

/// Upload a previously written file to `bucket/key`.
///
/// # Errors
///
/// Returns [`EtlError::Upload`] if `local_path` does not exist (the store is
/// not contacted) or if the store rejects the transfer.
pub async fn upload_file(
    store: &dyn ObjectStore,
    local_path: &Path,
    bucket: &str,
    key: &str,
) -> Result<(), EtlError> {
    if !local_path.is_file() {
        return Err(EtlError::Upload(format!(
            "local file {} does not exist",
            local_path.display()
        )));
    }

    store
        .upload(local_path, bucket, key)
        .await
        .map_err(|e| EtlError::Upload(format!("{e:#}")))?;

    info!(
        path = %local_path.display(),
        "Uploaded to s3://{bucket}/{key}"
    );
    Ok(())
}
