//! Foundational low-level utilities shared across Reverb crates.
//!
//! Provides unix-timestamp helpers, short content hashes for identifier
//! generation, and atomic text writes used by file-backed stores.

use std::path::Path;

use anyhow::{Context, Result};

/// Returns the current Unix timestamp in milliseconds.
pub fn current_unix_timestamp_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis()
        .try_into()
        .unwrap_or(u64::MAX)
}

/// Returns the current Unix timestamp in seconds.
pub fn current_unix_timestamp() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Milliseconds elapsed between two unix-ms instants, clamped at zero.
pub fn saturating_elapsed_ms(started_unix_ms: u64, now_unix_ms: u64) -> u64 {
    now_unix_ms.saturating_sub(started_unix_ms)
}

/// Returns a 12-hex-character digest prefix of `bytes`, suitable for
/// collision-tolerant identifiers such as log record ids.
pub fn short_hash(bytes: &[u8]) -> String {
    use sha2::{Digest, Sha256};
    let digest = Sha256::digest(bytes);
    digest[..6]
        .iter()
        .map(|value| format!("{:02x}", value))
        .collect::<String>()
}

/// Writes `contents` to `path` via a sibling temp file and rename so readers
/// never observe a partially written document.
pub fn write_text_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = path
        .parent()
        .filter(|value| !value.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| Path::new(".").to_path_buf());
    std::fs::create_dir_all(&parent)
        .with_context(|| format!("failed to create {}", parent.display()))?;

    let file_name = path
        .file_name()
        .and_then(|value| value.to_str())
        .unwrap_or("reverb-temp");
    let temp_path = parent.join(format!(".{}.tmp-{}", file_name, std::process::id()));
    std::fs::write(&temp_path, contents)
        .with_context(|| format!("failed to write {}", temp_path.display()))?;
    std::fs::rename(&temp_path, path).with_context(|| {
        let _ = std::fs::remove_file(&temp_path);
        format!("failed to rename {} to {}", temp_path.display(), path.display())
    })
}
