// Whole-file persistence helpers
// Author: kelexine (https://github.com/kelexine)

use std::fs;
use std::io::Write;
use std::path::Path;

/// Replaces the file at `path` with `contents`.
///
/// The data is written to a sibling temporary file, flushed, then renamed
/// over the destination, so readers never observe a half-written file.
/// Missing parent directories are created.
pub fn write_atomic(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    write_replacing(path, contents, false)
}

/// Like [`write_atomic`], but the file is readable only by its owner.
/// Used for records that hold credentials.
pub fn write_private(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    write_replacing(path, contents, true)
}

fn write_replacing(path: &Path, contents: &[u8], private: bool) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "data".to_string());
    let tmp_path = path.with_file_name(format!(".{}.tmp", file_name));

    {
        let mut file = fs::File::create(&tmp_path)?;
        file.write_all(contents)?;
        file.sync_all()?;
    }

    #[cfg(unix)]
    if private {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&tmp_path, fs::Permissions::from_mode(0o600))?;
    }
    #[cfg(not(unix))]
    let _ = private;

    fs::rename(&tmp_path, path)
}
