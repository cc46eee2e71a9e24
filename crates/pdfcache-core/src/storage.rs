//! Staging file lifecycle.
//!
//! Bytes are streamed into `<final>.part`, then published with a single
//! rename so the final name only ever holds a complete download. The
//! staging file is held under an exclusive advisory lock from acquisition
//! until it is published or discarded, so at most one writer (in this or
//! any other process) streams into a given `.part` at a time.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;

/// Staging file suffix used before atomic rename.
pub const STAGING_SUFFIX: &str = ".part";

/// Attempts to reopen when the locked handle turned out to be stale.
const REOPEN_ATTEMPTS: usize = 4;

/// Path for the staging file: appends `.part` to the final path (e.g. `k.pdf` → `k.pdf.part`).
pub fn staging_path(final_path: &Path) -> PathBuf {
    let mut o = final_path.as_os_str().to_owned();
    o.push(STAGING_SUFFIX);
    PathBuf::from(o)
}

/// Sequential writer for an in-progress download. Owns the lock on its path.
pub struct StagingFile {
    writer: BufWriter<File>,
    path: PathBuf,
    written: u64,
}

impl StagingFile {
    /// Take exclusive ownership of the staging file at `path`.
    ///
    /// Returns `Ok(None)` when another writer holds it. A leftover from a
    /// crashed run is truncated once the lock is held, never before.
    pub fn try_acquire(path: &Path) -> io::Result<Option<Self>> {
        for _ in 0..REOPEN_ATTEMPTS {
            let file = File::options().write(true).create(true).open(path)?;
            match file.try_lock_exclusive() {
                Ok(()) => {}
                Err(e) if e.kind() == fs2::lock_contended_error().kind() => return Ok(None),
                Err(e) => return Err(e),
            }
            // The previous holder may have renamed or removed the file
            // between our open and our lock.
            if !still_at(&file, path)? {
                tracing::debug!(path = %path.display(), "staging file replaced under us, reopening");
                continue;
            }
            if file.metadata()?.len() > 0 {
                file.set_len(0)?;
            }
            return Ok(Some(StagingFile {
                writer: BufWriter::new(file),
                path: path.to_path_buf(),
                written: 0,
            }));
        }
        Ok(None)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn bytes_written(&self) -> u64 {
        self.written
    }

    /// Flush buffered bytes and fsync file data.
    pub fn sync(&mut self) -> io::Result<()> {
        self.writer.flush()?;
        self.writer.get_ref().sync_all()
    }

    /// Rename onto `final_path` while still holding the lock. Drop the
    /// staging file afterwards to release it. Callers flush first so write
    /// errors are not reported as rename errors. Replaces an existing file
    /// at `final_path`.
    pub fn publish(&mut self, final_path: &Path) -> io::Result<()> {
        self.writer.flush()?;
        fs::rename(&self.path, final_path)
    }

    /// Remove the staging file if it is still the one we hold. Errors are
    /// logged and swallowed; returns true if a file was removed.
    pub fn discard(self) -> bool {
        let StagingFile { writer, path, .. } = self;
        // Unflushed bytes are dropped with the buffer.
        let (file, _) = writer.into_parts();
        match still_at(&file, &path).and_then(|ours| {
            if ours {
                fs::remove_file(&path).map(|()| true)
            } else {
                Ok(false)
            }
        }) {
            Ok(removed) => {
                if removed {
                    tracing::debug!(path = %path.display(), "removed staging file");
                }
                removed
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => false,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "failed to remove staging file");
                false
            }
        }
    }
}

impl Write for StagingFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.writer.write(buf)?;
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

/// Whether `path` still names the file behind `file`.
#[cfg(unix)]
fn still_at(file: &File, path: &Path) -> io::Result<bool> {
    use std::os::unix::fs::MetadataExt;

    let held = file.metadata()?;
    match fs::metadata(path) {
        Ok(on_disk) => Ok(held.dev() == on_disk.dev() && held.ino() == on_disk.ino()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

#[cfg(not(unix))]
fn still_at(_file: &File, path: &Path) -> io::Result<bool> {
    Ok(path.is_file())
}
