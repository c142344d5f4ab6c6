//! File helpers with the console reporting every command shares

use std::path::Path;

use anyhow::{Context, Result};
use hbsig_store::{read_file, write_secure_file};

pub fn save(path: &Path, data: &[u8]) -> Result<()> {
    write_secure_file(path, data).with_context(|| format!("Failed to write {}", path.display()))?;
    println!("Successfully saved {} ({} bytes)", path.display(), data.len());
    Ok(())
}

pub fn load(path: &Path) -> Result<Vec<u8>> {
    let data = read_file(path).with_context(|| format!("Failed to open {}", path.display()))?;
    println!("Successfully loaded {} ({} bytes)", path.display(), data.len());
    Ok(data)
}

/// Path as a store id; the CLI's `FileStore` is rooted at the current dir
pub fn store_id(path: &Path) -> Result<&str> {
    path.to_str()
        .with_context(|| format!("Path is not valid UTF-8: {}", path.display()))
}
