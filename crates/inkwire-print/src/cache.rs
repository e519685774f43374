// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Printer attribute cache: one JSON file per printer URI, expiring by file
// modification time.  Several client processes may share the directory, so
// writes go through a temp file and an atomic rename; readers never see a
// partial entry.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use inkwire_core::PrinterAttributes;

const CACHE_DIR: &str = "ipp-printer-attribute-cache";
const FILE_SUFFIX: &str = ".ipp.attributes";

/// On-disk shape of one cache entry.
#[derive(Debug, Serialize, Deserialize)]
struct CacheElement {
    #[serde(rename = "printer-uri")]
    printer_uri: String,
    #[serde(rename = "ipp-attributes")]
    ipp_attributes: PrinterAttributes,
}

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache element expired")]
    Expired,
    #[error("cache element not found")]
    NotFound,
    #[error("uninitialised cache")]
    Uninitialised,
    #[error("invalid cache parameters: {0}")]
    Invalid(&'static str),
    #[error("corrupt cache element: {0}")]
    Corrupt(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Filesystem-backed cache of printer attributes keyed by printer URI.
#[derive(Debug)]
pub struct PrinterAttributeCache {
    /// `None` models a cache handle that was never initialised; every
    /// operation on it reports `Uninitialised` and callers treat that as a
    /// silent miss.
    dir: Option<PathBuf>,
    expiry: Duration,
}

impl PrinterAttributeCache {
    /// Open (creating if needed) the cache directory under `path`.
    pub fn new(expiry: Duration, path: impl AsRef<Path>) -> Result<Self, CacheError> {
        if expiry.is_zero() {
            return Err(CacheError::Invalid("cache expiry duration must be non-zero"));
        }
        let dir = path.as_ref().join(CACHE_DIR);
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            dir: Some(dir),
            expiry,
        })
    }

    /// A handle with no backing store.
    pub fn uninitialised() -> Self {
        Self {
            dir: None,
            expiry: Duration::from_secs(30),
        }
    }

    /// Fetch the attributes cached for `uri`, rejecting stale entries.
    pub fn get(&self, uri: &str) -> Result<PrinterAttributes, CacheError> {
        let dir = self.dir.as_ref().ok_or(CacheError::Uninitialised)?;
        if uri.is_empty() {
            return Err(CacheError::Invalid("empty printer uri"));
        }

        let path = entry_path(dir, uri);
        self.check_freshness(&path)?;

        let data = std::fs::read(&path)?;
        let element: CacheElement =
            serde_json::from_slice(&data).map_err(|e| CacheError::Corrupt(e.to_string()))?;
        if element.printer_uri != uri {
            return Err(CacheError::Corrupt(format!(
                "cache element uri mismatch: wanted {uri}, found {}",
                element.printer_uri
            )));
        }
        Ok(element.ipp_attributes)
    }

    /// Store `attributes` for `uri`, atomically replacing any entry.
    pub fn set(&self, uri: &str, attributes: &PrinterAttributes) -> Result<(), CacheError> {
        let dir = self.dir.as_ref().ok_or(CacheError::Uninitialised)?;
        if uri.is_empty() {
            return Err(CacheError::Invalid("empty printer uri"));
        }

        let element = CacheElement {
            printer_uri: uri.to_string(),
            ipp_attributes: attributes.clone(),
        };
        let data =
            serde_json::to_vec(&element).map_err(|e| CacheError::Corrupt(e.to_string()))?;

        let mut temp = tempfile::NamedTempFile::new_in(dir)?;
        std::io::Write::write_all(&mut temp, &data)?;
        let path = entry_path(dir, uri);
        temp.persist(&path).map_err(|e| CacheError::Io(e.error))?;
        debug!(uri, path = %path.display(), "cached printer attributes");
        Ok(())
    }

    /// Remove the backing directory.  Used by tests and uninstall paths.
    pub fn cleanup(&self) {
        if let Some(dir) = &self.dir {
            let _ = std::fs::remove_dir_all(dir);
        }
    }

    /// An entry at or past `modtime + expiry` counts as expired; a missing
    /// file reports `NotFound`.
    fn check_freshness(&self, path: &Path) -> Result<(), CacheError> {
        let metadata = match std::fs::metadata(path) {
            Ok(meta) => meta,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(CacheError::NotFound)
            }
            Err(e) => return Err(CacheError::Io(e)),
        };
        let modified = metadata.modified()?;
        let boundary = modified + self.expiry;
        if SystemTime::now() >= boundary {
            return Err(CacheError::Expired);
        }
        Ok(())
    }
}

/// Cache file path for a URI.
///
/// The name is the lowercase hex of the full URI plus a fixed suffix.  Hex
/// is reversible, so URIs that differ only in separators (`ipp://` vs
/// `ipps://`, dots vs slashes) can never collide.
fn entry_path(dir: &Path, uri: &str) -> PathBuf {
    let mut name = String::with_capacity(uri.len() * 2 + FILE_SUFFIX.len());
    for byte in uri.as_bytes() {
        let _ = write!(name, "{byte:02x}");
    }
    name.push_str(FILE_SUFFIX);
    dir.join(name)
}
