use crate::error::{Result, UupError};
use std::path::Path;

pub fn ensure_dir_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::PermissionDenied => UupError::PermissionDenied {
                path: path.to_path_buf(),
            },
            _ => UupError::from(e),
        })?;
    }
    Ok(())
}

/// Writes `contents` next to `path` and renames it into place, so readers
/// never observe a half-written file.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        ensure_dir_exists(parent)?;
    }

    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| UupError::config_error(format!("Invalid file path: {}", path.display())))?;
    let temp_path = path.with_file_name(format!(".{file_name}.tmp"));

    std::fs::write(&temp_path, contents)?;
    if let Err(e) = std::fs::rename(&temp_path, path) {
        let _ = std::fs::remove_file(&temp_path);
        return Err(e.into());
    }
    Ok(())
}
