//! Process-owned artifact directory.
//!
//! Acquired once at startup, used for every artifact write while serving,
//! removed once at exit. The response lines reference artifact paths; the
//! caller must consume or copy the files before the bridge exits.

use std::io;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

const MAX_STEM_LEN: usize = 40;

/// Handle to the artifact directory. Dropping it removes the directory;
/// [`WorkDir::close`] does the same but logs a removal failure.
#[derive(Debug)]
pub struct WorkDir {
    dir: TempDir,
    seq: u64,
}

impl WorkDir {
    /// Create the directory under the system temp root: `prefix` plus a
    /// randomized suffix, so reruns can never collide with a leftover
    /// directory from an earlier process.
    pub fn new(prefix: &str) -> io::Result<Self> {
        let dir = tempfile::Builder::new().prefix(prefix).tempdir()?;
        Ok(Self { dir, seq: 0 })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Reserve a fresh artifact path. Names are `<stem>_<seq>.<extension>`
    /// with the stem sanitized and the sequence per-process monotonic, so
    /// duplicate request ids still get distinct files.
    pub fn next_artifact(&mut self, stem: &str, extension: &str) -> PathBuf {
        self.seq += 1;
        let name = format!("{}_{:04}.{}", sanitize_stem(stem), self.seq, extension);
        self.dir.path().join(name)
    }

    /// Remove the directory and everything in it. Best-effort: a removal
    /// failure is logged and swallowed, never propagated.
    pub fn close(self) {
        log::debug!("Removing artifact directory {}", self.dir.path().display());
        if let Err(err) = self.dir.close() {
            log::warn!("Failed to remove artifact directory: {}", err);
        }
    }
}

/// Keep `[A-Za-z0-9._-]`, replace everything else; cap the length so the
/// stem stays inside filename limits. Request ids feed into this, and those
/// are arbitrary caller strings.
fn sanitize_stem(stem: &str) -> String {
    let mut out: String = stem
        .chars()
        .take(MAX_STEM_LEN)
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if out.is_empty() {
        out.push_str("artifact");
    }
    out
}
