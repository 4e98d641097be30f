//! Stat command implementation.

use objstore_services::{ObjectMode, Storager};
use serde::Serialize;
use tracing::info;

/// Object metadata as printed by `stat`.
#[derive(Debug, Serialize)]
pub struct StatResult {
    /// Object path.
    pub path: String,
    /// Backend identifier of the object.
    pub id: String,
    /// Object mode (read, dir, part).
    pub mode: String,
    /// Content length in bytes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_length: Option<u64>,
    /// Content tag.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
}

fn mode_name(mode: ObjectMode) -> &'static str {
    match mode {
        ObjectMode::Read => "read",
        ObjectMode::Dir => "dir",
        ObjectMode::Part => "part",
    }
}

/// Collects the metadata of `path`.
pub fn stat(store: &dyn Storager, path: &str) -> Result<StatResult, Box<dyn std::error::Error>> {
    let object = store.stat(path)?;
    Ok(StatResult {
        path: object.path,
        id: object.id,
        mode: mode_name(object.mode).to_string(),
        content_length: object.content_length,
        etag: object.etag,
    })
}

/// Runs the stat command.
pub fn run(store: &dyn Storager, path: &str, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    info!("Stat {} on {}", path, store.metadata());
    let result = stat(store, path)?;

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&result)?),
        "text" => {
            println!("Path: {}", result.path);
            println!("  ID: {}", result.id);
            println!("  Mode: {}", result.mode);
            if let Some(length) = result.content_length {
                println!("  Size: {} bytes", length);
            }
            if let Some(etag) = &result.etag {
                println!("  ETag: {}", etag);
            }
        }
        other => return Err(format!("unknown format: {other}").into()),
    }

    Ok(())
}
