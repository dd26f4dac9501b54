//! Body blob store: deterministic message-id to path mapping.
//!
//! Large bodies can live outside the metadata database. The layout is a
//! two-level fan-out derived from the first two characters of the
//! message-id local part, hex-encoded so distinct ids can never collide on
//! a case-insensitive file system.

use anyhow::Result;
use std::path::{Path, PathBuf};

fn hex_byte(b: u8) -> String {
    format!("{b:02x}")
}

fn hex_encode(input: &str) -> String {
    input.bytes().map(|b| format!("{b:02x}")).collect()
}

/// Compute the blob path for a message-id under `root`.
///
/// The local part is the text between `<` and `@`; its first two bytes pick
/// the two directory levels. Short local parts fall back to `00`.
pub fn blob_path(root: &Path, message_id: &str) -> PathBuf {
    let local = message_id
        .trim_start_matches('<')
        .split('@')
        .next()
        .unwrap_or("");
    let mut bytes = local.bytes();
    let first = bytes.next().map_or_else(|| "00".to_string(), hex_byte);
    let second = bytes.next().map_or_else(|| "00".to_string(), hex_byte);
    root.join(first).join(second).join(hex_encode(message_id))
}

/// Write a body blob, creating the fan-out directories as needed.
pub async fn write_body(root: &Path, message_id: &str, body: &[u8]) -> Result<()> {
    let path = blob_path(root, message_id);
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(&path, body).await?;
    Ok(())
}

/// Read a body blob; `None` when no blob exists for the id.
pub async fn read_body(root: &Path, message_id: &str) -> Result<Option<Vec<u8>>> {
    let path = blob_path(root, message_id);
    match tokio::fs::read(&path).await {
        Ok(data) => Ok(Some(data)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Remove a body blob if present.
pub async fn remove_body(root: &Path, message_id: &str) -> Result<()> {
    let path = blob_path(root, message_id);
    match tokio::fs::remove_file(&path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}
