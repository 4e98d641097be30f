//! Rm command implementation.

use objstore_services::Storager;
use tracing::info;

/// Runs the rm command. Deleting a missing object succeeds.
pub fn run(store: &dyn Storager, path: &str) -> Result<(), Box<dyn std::error::Error>> {
    info!("Deleting {} on {}", path, store.metadata());
    store.delete(path)?;
    println!("✓ Deleted {}", path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use objstore_services::MemoryStorage;

    #[test]
    fn rm_deletes_and_is_idempotent() {
        let store = MemoryStorage::with_name("bucket");
        store.write("k", b"v").unwrap();

        run(&store, "k").unwrap();
        assert!(store.stat("k").is_err());
        run(&store, "k").unwrap();
    }
}
