// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Rewindable document: makes a one-shot input stream re-readable across
// retry attempts by teeing the first pass into a spool file.
//
// Two states: while streaming, reads come from the upstream and every byte
// is copied into the spool; after the first reset the upstream is drained
// (completing the spool) and all further reads come from the file.  The
// spool is a named temp file that is removed when the document is dropped,
// whichever way the operation ends.

use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};

use tempfile::NamedTempFile;
use tracing::debug;

const SPOOL_PREFIX: &str = "inkwire-spool-";

struct Inner {
    /// Present while still streaming; `None` once drained into the spool.
    upstream: Option<Box<dyn Read + Send>>,
    spool: NamedTempFile,
    /// Whether any bytes were pulled from the upstream yet.
    has_read: bool,
}

impl Inner {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match self.upstream.as_mut() {
            Some(upstream) => {
                self.has_read = true;
                let n = upstream.read(buf)?;
                self.spool.as_file_mut().write_all(&buf[..n])?;
                Ok(n)
            }
            None => self.spool.as_file_mut().read(buf),
        }
    }

    fn reset(&mut self) -> std::io::Result<()> {
        if let Some(upstream) = self.upstream.as_mut() {
            if !self.has_read {
                // Untouched stream; nothing to rewind yet.
                return Ok(());
            }
            // Finish spooling whatever the aborted attempt did not consume,
            // so the file holds the complete document.
            std::io::copy(upstream, self.spool.as_file_mut())?;
            self.upstream = None;
        }
        self.spool.as_file_mut().seek(SeekFrom::Start(0))?;
        Ok(())
    }
}

/// A document stream that can be re-read once per retry attempt.
pub struct RewindableDocument {
    inner: Arc<Mutex<Inner>>,
}

impl RewindableDocument {
    /// Wrap `upstream`, spooling into a uniquely named temp file under
    /// `spool_dir`.
    pub fn new(upstream: Box<dyn Read + Send>, spool_dir: &Path) -> std::io::Result<Self> {
        let spool = tempfile::Builder::new()
            .prefix(SPOOL_PREFIX)
            .tempfile_in(spool_dir)?;
        debug!(path = %spool.path().display(), "spooling document");
        Ok(Self {
            inner: Arc::new(Mutex::new(Inner {
                upstream: Some(upstream),
                spool,
                has_read: false,
            })),
        })
    }

    /// A reader for the current attempt.  The first attempt streams from
    /// the upstream; after `reset` the reader serves the spool file.
    pub fn current_reader(&self) -> DocumentReader {
        DocumentReader {
            inner: Arc::clone(&self.inner),
        }
    }

    /// Rewind to byte zero for the next attempt.  The first reset drains
    /// the upstream, so the caller's stream is consumed at most once.
    pub fn reset(&self) -> std::io::Result<()> {
        self.inner
            .lock()
            .map_err(|_| std::io::Error::other("document spool lock poisoned"))?
            .reset()
    }
}

/// Read handle over the rewindable document.  Owned, so it can be handed to
/// an IPP payload and shipped across threads while the document retains
/// control of the spool for later resets.
pub struct DocumentReader {
    inner: Arc<Mutex<Inner>>,
}

impl Read for DocumentReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.inner
            .lock()
            .map_err(|_| std::io::Error::other("document spool lock poisoned"))?
            .read(buf)
    }
}
