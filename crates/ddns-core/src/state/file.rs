// # File State Store
//
// File-based implementation of StateStore with crash safety.
//
// ## Purpose
//
// Remembers the last IP applied for one (domain, record name) pair across
// invocations, so a later run can skip listing when nothing moved.
//
// ## Crash Safety
//
// - Atomic writes: a temp file in the same directory is written, synced
//   and renamed over the state file
// - An interrupted write leaves the previous file untouched; the unpersisted
//   temp file is removed when its handle drops
// - Corruption recovery: contents that are not an IPv4 literal read as
//   "nothing cached"
//
// ## File Format
//
// A single line holding the IP literal:
//
// ```text
// 203.0.113.7
// ```

use async_trait::async_trait;
use std::io::Write;
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::Error;
use crate::traits::state_store::StateStore;

/// File-based state store with atomic replace
///
/// # Example
///
/// ```rust,no_run
/// use ddns_core::state::FileStateStore;
/// use ddns_core::traits::state_store::StateStore;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = FileStateStore::new("/var/tmp/do-ddns-example.com-home.last_ip").await?;
///
///     store.set_last_ip("203.0.113.7".parse()?).await?;
///     assert_eq!(store.get_last_ip().await?, Some("203.0.113.7".parse()?));
///
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct FileStateStore {
    path: PathBuf,
}

impl FileStateStore {
    /// Create a file state store, creating the parent directory if needed
    ///
    /// Nothing is read here; a missing state file is a normal first run.
    pub async fn new<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).await.map_err(|e| {
                    Error::config(format!(
                        "Failed to create state directory {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }

        Ok(Self { path })
    }
}

#[async_trait]
impl StateStore for FileStateStore {
    async fn get_last_ip(&self) -> Result<Option<Ipv4Addr>, Error> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("State file does not exist: {}", self.path.display());
                return Ok(None);
            }
            Err(e) => {
                return Err(Error::state_store(format!(
                    "Failed to read state file {}: {}",
                    self.path.display(),
                    e
                )));
            }
        };

        let value = content.trim();
        if value.is_empty() {
            return Ok(None);
        }

        match value.parse::<Ipv4Addr>() {
            Ok(ip) => Ok(Some(ip)),
            Err(_) => {
                tracing::warn!(
                    "State file {} holds {:?}, not an IPv4 address. Treating as empty.",
                    self.path.display(),
                    value
                );
                Ok(None)
            }
        }
    }

    async fn set_last_ip(&self, ip: Ipv4Addr) -> Result<(), Error> {
        let path = self.path.clone();
        let contents = format!("{}\n", ip);

        tokio::task::spawn_blocking(move || write_atomic(&path, contents.as_bytes()))
            .await
            .map_err(|e| Error::state_store(format!("State write task failed: {}", e)))??;

        tracing::trace!("State written to file: {}", self.path.display());
        Ok(())
    }
}

/// Write `contents` to a sibling temp file and rename it over `path`
fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), Error> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    // NamedTempFile is created 0600 and unlinked on drop unless persisted
    let mut temp = tempfile::Builder::new()
        .prefix(".do-ddns-")
        .suffix(".tmp")
        .tempfile_in(dir)
        .map_err(|e| {
            Error::state_store(format!(
                "Failed to create temp file in {}: {}",
                dir.display(),
                e
            ))
        })?;

    temp.write_all(contents)
        .and_then(|_| temp.as_file().sync_all())
        .map_err(|e| {
            Error::state_store(format!(
                "Failed to write temp file {}: {}",
                temp.path().display(),
                e
            ))
        })?;

    temp.persist(path).map_err(|e| {
        Error::state_store(format!(
            "Failed to rename temp file to {}: {}",
            path.display(),
            e.error
        ))
    })?;

    Ok(())
}
