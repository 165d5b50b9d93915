//! Checks for mailboxes stored on the local file system.
//!
//! Nothing is read beyond the first few bytes of a file, and nothing is written.

use std::io::ErrorKind;
use std::path::Path;

use tokio::fs;
use tokio::io::AsyncReadExt;

use crate::error::{ProbeError, Result};

/// On-disk mailbox layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalFormat {
    Maildir,
    Mbox,
    Babyl,
    Mh,
    Mmdf,
}

impl LocalFormat {
    /// Bytes a non-empty single-file mailbox must start with.
    fn magic(self) -> Option<&'static [u8]> {
        match self {
            LocalFormat::Mbox => Some(b"From "),
            LocalFormat::Babyl => Some(b"BABYL OPTIONS:"),
            LocalFormat::Mmdf => Some(b"\x01\x01\x01\x01\n"),
            LocalFormat::Maildir | LocalFormat::Mh => None,
        }
    }

    fn is_directory(self) -> bool {
        matches!(self, LocalFormat::Maildir | LocalFormat::Mh)
    }
}

/// Verify that `path` exists and looks like a mailbox in `format`.
pub async fn check(format: LocalFormat, path: &Path) -> Result<()> {
    let shown = path.display();
    let metadata = fs::metadata(path).await.map_err(|e| match e.kind() {
        ErrorKind::NotFound => ProbeError::LocalPath(format!("{shown} does not exist")),
        _ => ProbeError::io(format!("cannot access {shown}"), e),
    })?;

    if format.is_directory() {
        if !metadata.is_dir() {
            return Err(ProbeError::LocalPath(format!("{shown} is not a directory")));
        }
        // Opening the listing proves we can read it.
        fs::read_dir(path)
            .await
            .map_err(|e| ProbeError::io(format!("cannot read {shown}"), e))?;

        if format == LocalFormat::Maildir {
            for sub in ["cur", "new", "tmp"] {
                let is_dir = fs::metadata(path.join(sub))
                    .await
                    .map(|m| m.is_dir())
                    .unwrap_or(false);
                if !is_dir {
                    return Err(ProbeError::LocalPath(format!(
                        "{shown} is not a maildir: missing {sub}/"
                    )));
                }
            }
        }
        return Ok(());
    }

    if !metadata.is_file() {
        return Err(ProbeError::LocalPath(format!("{shown} is not a file")));
    }

    let mut file = fs::File::open(path)
        .await
        .map_err(|e| ProbeError::io(format!("cannot open {shown}"), e))?;

    if let Some(magic) = format.magic() {
        let mut head = Vec::with_capacity(magic.len());
        (&mut file)
            .take(magic.len() as u64)
            .read_to_end(&mut head)
            .await
            .map_err(|e| ProbeError::io(format!("cannot read {shown}"), e))?;
        // An empty file is a valid, empty mailbox.
        if !head.is_empty() && head != magic {
            return Err(ProbeError::LocalPath(format!(
                "{shown} is not a valid {format:?} file"
            )));
        }
    }
    Ok(())
}
