//! Put command implementation.

use objstore_services::{MultipartUpload, Storager};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Uploads `local` to `path`, `part_size` bytes per part.
pub fn run(
    store: Arc<dyn Storager>,
    local: &Path,
    path: &str,
    part_size: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    if part_size == 0 {
        return Err("part size must be positive".into());
    }

    info!("Uploading {:?} to {}", local, path);
    let data = fs::read(local)?;
    let parts = data.len().div_ceil(part_size);

    let object = MultipartUpload::upload_all(store, path, &data, part_size)?;

    println!("✓ Uploaded {}", object.path);
    println!("  Size: {} bytes", object.content_length.unwrap_or(0));
    println!("  Parts: {}", parts);
    if let Some(etag) = &object.etag {
        println!("  ETag: {}", etag);
    }

    Ok(())
}
