// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF assembler: build a new document from pages of existing ones.
//
// Pages are deep-copied together with everything they reference.  Objects
// are copied once per source document and then shared, so a font or image
// used by every page of a scan appears once in the output.  The memo entry is
// written before an object's children are visited, which also terminates
// reference cycles (annotation `/P` back-links, for example).

use std::collections::HashMap;
use std::io::Write;
use std::path::Path;

use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use scanwerk_core::error::{Result, ScanwerkError};
use tracing::{debug, info, instrument, warn};

/// Page attributes a page may inherit from its ancestors in the page tree.
const INHERITABLE: [&[u8]; 4] = [b"MediaBox", b"CropBox", b"Resources", b"Rotate"];

/// Guard against malformed, cyclic `/Parent` chains.
const MAX_TREE_DEPTH: usize = 64;

/// Collects pages from one or more source documents into a new PDF.
pub struct PdfAssembler<'a> {
    sources: Vec<&'a Document>,
    target: Document,
    /// The output's page tree root, filled in by [`PdfAssembler::finish`].
    pages_id: ObjectId,
    kids: Vec<Object>,
    /// (source index, source object id) → copied object id.
    copied: HashMap<(usize, ObjectId), ObjectId>,
}

impl<'a> PdfAssembler<'a> {
    /// Start an empty document drawing pages from `sources`.
    pub fn new(sources: Vec<&'a Document>) -> Self {
        let mut target = Document::with_version("1.5");
        let pages_id = target.new_object_id();
        Self {
            sources,
            target,
            pages_id,
            kids: Vec::new(),
            copied: HashMap::new(),
        }
    }

    /// Number of pages appended so far.
    pub fn page_count(&self) -> usize {
        self.kids.len()
    }

    /// Append page `page_id` of source document `source` as the last page.
    pub fn append_page(&mut self, source: usize, page_id: ObjectId) -> Result<()> {
        let doc: &'a Document = *self.sources.get(source).ok_or_else(|| {
            ScanwerkError::Assembly(format!("no source document #{source}"))
        })?;
        let page = doc.get_dictionary(page_id).map_err(|err| {
            ScanwerkError::Assembly(format!("cannot read page object {page_id:?}: {err}"))
        })?;

        // Reserve the page's id first so references back to the page resolve
        // to this copy.  A page appended twice gets an independent copy.
        let new_id = match self.copied.get(&(source, page_id)) {
            Some(_) => self.target.new_object_id(),
            None => {
                let id = self.target.new_object_id();
                self.copied.insert((source, page_id), id);
                id
            }
        };

        let mut copy = Dictionary::new();
        for (key, value) in page.iter() {
            if key == b"Parent" {
                continue;
            }
            copy.set(key.clone(), self.copy_object(source, value)?);
        }

        for key in INHERITABLE {
            if copy.has(key) {
                continue;
            }
            if let Some(value) = inherited_attribute(doc, page, key) {
                copy.set(key.to_vec(), self.copy_object(source, value)?);
            }
        }

        copy.set("Parent", Object::Reference(self.pages_id));
        self.target.objects.insert(new_id, Object::Dictionary(copy));
        self.kids.push(Object::Reference(new_id));
        Ok(())
    }

    /// Close the page tree and catalog and return the finished document.
    pub fn finish(mut self) -> Result<Document> {
        if self.kids.is_empty() {
            return Err(ScanwerkError::Assembly("no pages to assemble".into()));
        }

        let mut pages = Dictionary::new();
        pages.set("Type", Object::Name(b"Pages".to_vec()));
        pages.set("Count", Object::Integer(self.kids.len() as i64));
        pages.set("Kids", Object::Array(self.kids));
        self.target
            .objects
            .insert(self.pages_id, Object::Dictionary(pages));

        let mut catalog = Dictionary::new();
        catalog.set("Type", Object::Name(b"Catalog".to_vec()));
        catalog.set("Pages", Object::Reference(self.pages_id));
        let catalog_id = self.target.add_object(Object::Dictionary(catalog));
        self.target.trailer.set("Root", Object::Reference(catalog_id));

        Ok(self.target)
    }

    /// Finish and serialise to bytes.
    pub fn to_bytes(self) -> Result<Vec<u8>> {
        let mut document = self.finish()?;
        let mut output = Vec::new();
        document.save_to(&mut output).map_err(|err| {
            ScanwerkError::Assembly(format!("failed to serialise assembled PDF: {err}"))
        })?;
        Ok(output)
    }

    /// Finish and write to `path` atomically; returns the bytes written.
    ///
    /// The document goes to a temporary file next to `path` and is renamed
    /// into place only once fully written, so `path` is never left partial.
    #[instrument(skip_all, fields(path = %path.display(), pages = self.kids.len()))]
    pub fn write_atomic(self, path: &Path) -> Result<u64> {
        let bytes = self.to_bytes()?;
        write_atomic(path, &bytes)?;
        info!(bytes = bytes.len(), "assembled PDF written");
        Ok(bytes.len() as u64)
    }

    fn copy_object(&mut self, source: usize, object: &Object) -> Result<Object> {
        match object {
            Object::Reference(id) => match self.copy_reference(source, *id)? {
                Some(new_id) => Ok(Object::Reference(new_id)),
                None => Ok(Object::Null),
            },
            Object::Dictionary(dict) => Ok(Object::Dictionary(self.copy_dictionary(source, dict)?)),
            Object::Array(items) => {
                let mut copy = Vec::with_capacity(items.len());
                for item in items {
                    copy.push(self.copy_object(source, item)?);
                }
                Ok(Object::Array(copy))
            }
            Object::Stream(stream) => {
                let dict = self.copy_dictionary(source, &stream.dict)?;
                Ok(Object::Stream(Stream::new(dict, stream.content.clone())))
            }
            other => Ok(other.clone()),
        }
    }

    fn copy_dictionary(&mut self, source: usize, dict: &Dictionary) -> Result<Dictionary> {
        let mut copy = Dictionary::new();
        for (key, value) in dict.iter() {
            // Page-tree back-links belong to the source tree.
            if key == b"Parent" {
                continue;
            }
            copy.set(key.clone(), self.copy_object(source, value)?);
        }
        Ok(copy)
    }

    /// Copy an indirect object once; `None` for dangling references.
    fn copy_reference(&mut self, source: usize, id: ObjectId) -> Result<Option<ObjectId>> {
        if let Some(&done) = self.copied.get(&(source, id)) {
            return Ok(Some(done));
        }

        let doc: &'a Document = self.sources[source];
        let object = match doc.get_object(id) {
            Ok(object) => object,
            Err(err) => {
                warn!(?id, %err, "cannot resolve reference, using null");
                return Ok(None);
            }
        };

        let new_id = self.target.new_object_id();
        self.copied.insert((source, id), new_id);
        let copy = self.copy_object(source, object)?;
        self.target.objects.insert(new_id, copy);
        debug!(?id, ?new_id, "object copied");
        Ok(Some(new_id))
    }
}

/// Look an attribute up the `/Parent` chain of a page.
fn inherited_attribute<'d>(doc: &'d Document, page: &'d Dictionary, key: &[u8]) -> Option<&'d Object> {
    let mut node = page;
    for _ in 0..MAX_TREE_DEPTH {
        let parent_id = node.get(b"Parent").ok()?.as_reference().ok()?;
        node = doc.get_dictionary(parent_id).ok()?;
        if let Ok(value) = node.get(key) {
            return Some(value);
        }
    }
    None
}

/// Write `bytes` to `path` through a temporary file in the same directory.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));

    let mut temp = tempfile::NamedTempFile::new_in(dir)?;
    temp.write_all(bytes)?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|err| err.error)?;
    Ok(())
}
