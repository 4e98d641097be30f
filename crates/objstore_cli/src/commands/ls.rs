//! Ls command implementation.

use objstore_services::{ObjectMode, Storager};
use tracing::info;

/// Runs the ls command.
pub fn run(store: &dyn Storager, prefix: &str) -> Result<(), Box<dyn std::error::Error>> {
    info!("Listing {:?} on {}", prefix, store.metadata());

    let objects = store.list(prefix)?;
    for object in &objects {
        match (object.mode, object.content_length) {
            (ObjectMode::Dir, _) => println!("{:>12}  {}/", "-", object.path),
            (_, Some(length)) => println!("{:>12}  {}", length, object.path),
            (_, None) => println!("{:>12}  {}", "?", object.path),
        }
    }
    println!("{} object(s)", objects.len());

    Ok(())
}
