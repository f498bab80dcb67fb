use std::path::Path;

use tracing::info;

use crate::error::{StoreError, StoreResult};
use crate::repository::new_id;

/// URL prefix uploaded files are served under.
pub const UPLOADS_PREFIX: &str = "/uploads/";

/// Copy `source` into `upload_dir` under a generated name that keeps the
/// original extension, and return its relative URL.
pub async fn store_upload(upload_dir: &Path, source: &Path) -> StoreResult<String> {
    tokio::fs::create_dir_all(upload_dir)
        .await
        .map_err(|source| StoreError::Io {
            path: upload_dir.to_path_buf(),
            source,
        })?;

    let filename = match source.extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("{}.{}", new_id(), ext),
        None => new_id(),
    };
    let dest = upload_dir.join(&filename);

    let bytes = tokio::fs::copy(source, &dest)
        .await
        .map_err(|e| StoreError::Io {
            path: source.to_path_buf(),
            source: e,
        })?;

    info!(from = %source.display(), to = %dest.display(), bytes, "upload stored");
    Ok(format!("{UPLOADS_PREFIX}{filename}"))
}
