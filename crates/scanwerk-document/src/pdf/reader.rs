// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF reader: open a scanned document and list its pages in order using the
// `lopdf` crate.

use std::path::Path;

use lopdf::{Document, ObjectId};
use scanwerk_core::error::{Result, ScanwerkError};
use tracing::{debug, instrument};

/// A parsed, read-only PDF document.
pub struct PdfReader {
    document: Document,
    /// Source path, if opened from a file (useful for diagnostics).
    source_path: Option<String>,
}

impl PdfReader {
    /// Open a PDF from the filesystem.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let document = Document::load(path).map_err(|err| {
            ScanwerkError::Assembly(format!("cannot read {}: {err}", path.display()))
        })?;

        let reader = Self {
            document,
            source_path: Some(path.display().to_string()),
        };
        reader.require_pages()?;
        debug!(pages = reader.page_count(), "PDF loaded");
        Ok(reader)
    }

    /// Parse a PDF already in memory.
    #[instrument(skip_all, fields(bytes_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let document = Document::load_mem(data).map_err(|err| {
            ScanwerkError::Assembly(format!("cannot parse PDF from memory: {err}"))
        })?;

        let reader = Self {
            document,
            source_path: None,
        };
        reader.require_pages()?;
        debug!(pages = reader.page_count(), "PDF loaded from bytes");
        Ok(reader)
    }

    /// Number of pages in the document.
    pub fn page_count(&self) -> usize {
        self.document.get_pages().len()
    }

    /// Page object ids in page order.
    pub fn page_ids(&self) -> Vec<ObjectId> {
        // `get_pages` is keyed by 1-based page number, so the map is ordered.
        self.document.get_pages().into_values().collect()
    }

    /// The underlying lopdf document.
    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Return the source path if the reader was created via [`PdfReader::open`].
    pub fn source_path(&self) -> Option<&str> {
        self.source_path.as_deref()
    }

    /// A scan that produced no pages has no usable structure.
    fn require_pages(&self) -> Result<()> {
        if self.page_count() == 0 {
            return Err(ScanwerkError::Assembly(format!(
                "{} contains no pages",
                self.source_path.as_deref().unwrap_or("document")
            )));
        }
        Ok(())
    }
}
