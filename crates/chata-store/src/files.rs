//! Filesystem helpers shared by both stores.

use std::path::{Path, PathBuf};

use chata_shared::constants::FILE_MODE;
use tokio::fs;

use crate::error::{Result, StoreError, ValidationError};

/// Path of the record named `key` inside `dir`.
///
/// Keys come from clients, so anything that could escape the directory is
/// rejected before touching the filesystem.
pub(crate) fn record_path(dir: &Path, key: &str) -> Result<PathBuf> {
    if key.is_empty()
        || key.contains("..")
        || key.contains('/')
        || key.contains('\\')
        || key.contains('\0')
    {
        return Err(StoreError::InvalidKey(key.to_string()));
    }
    Ok(dir.join(key))
}

/// A record read from `path` must be stored under its own id.
pub(crate) fn check_record_name(path: &Path, id: &str) -> std::result::Result<(), ValidationError> {
    let file = path.file_name().and_then(|name| name.to_str()).unwrap_or_default();
    if file != id {
        return Err(ValidationError::FileNameMismatch {
            file: file.to_string(),
            id: id.to_string(),
        });
    }
    Ok(())
}

/// Write `data` to `path` and restrict it to owner read/write.
pub(crate) async fn write_private(path: &Path, data: &[u8]) -> Result<()> {
    fs::write(path, data).await?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, std::fs::Permissions::from_mode(FILE_MODE)).await?;
    }

    Ok(())
}
