//! Atomic, owner-only file writes

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

#[cfg(unix)]
use std::os::unix::fs::OpenOptionsExt;

/// Replace `path` with `data`: write a sibling temp file (mode 0600 on
/// Unix), fsync it, rename it over the target, then fsync the directory.
/// A reader sees either the old contents or the new, never a mix.
pub fn write_secure_file(path: &Path, data: &[u8]) -> io::Result<()> {
    if let Some(parent) = parent_dir(path) {
        fs::create_dir_all(parent)?;
    }

    let tmp = temp_path(path);
    let result = write_and_sync(&tmp, data).and_then(|_| fs::rename(&tmp, path));
    if result.is_err() {
        let _ = fs::remove_file(&tmp);
        return result;
    }

    sync_dir(path)
}

pub fn read_file(path: &Path) -> io::Result<Vec<u8>> {
    fs::read(path)
}

fn write_and_sync(tmp: &Path, data: &[u8]) -> io::Result<()> {
    let mut opts = fs::OpenOptions::new();
    opts.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        opts.mode(0o600);
    }
    let mut f = opts.open(tmp)?;
    f.write_all(data)?;
    f.sync_all()
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(format!(".tmp.{}", std::process::id()));
    path.with_file_name(name)
}

fn parent_dir(path: &Path) -> Option<&Path> {
    path.parent().filter(|p| !p.as_os_str().is_empty())
}

#[cfg(unix)]
fn sync_dir(path: &Path) -> io::Result<()> {
    let dir = parent_dir(path).unwrap_or_else(|| Path::new("."));
    fs::File::open(dir)?.sync_all()
}

#[cfg(not(unix))]
fn sync_dir(_path: &Path) -> io::Result<()> {
    Ok(())
}
