// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Manual duplex: merge a front pass and a back pass into one document.
//
// The operator scans all fronts, flips the stack and scans all backs.  The
// flip reverses the order, so the back pass arrives last sheet first:
//
//   front pass: F1 F2 F3        back pass: B3 B2 B1
//   merged:     F1 B1 F2 B2 F3 B3
//
// Pass lengths may differ (a sheet missed by the feeder); missing
// counterparts are skipped instead of failing the whole job.

use std::path::Path;

use lopdf::ObjectId;
use scanwerk_core::error::Result;
use tracing::{info, instrument, warn};

use crate::pdf::reader::PdfReader;
use crate::pdf::writer::PdfAssembler;

/// Which physical pass a page came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Front,
    Back,
}

impl Side {
    fn source_index(self) -> usize {
        match self {
            Self::Front => 0,
            Self::Back => 1,
        }
    }
}

/// One page of a single-sided pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRef {
    pub side: Side,
    /// 1-based position within its pass, in capture order.
    pub number: usize,
    pub object_id: ObjectId,
}

/// Ordered pages of one document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageSequence {
    pages: Vec<PageRef>,
}

impl PageSequence {
    /// Pages of `reader` in capture order, tagged with `side`.
    pub fn from_reader(reader: &PdfReader, side: Side) -> Self {
        let pages = reader
            .page_ids()
            .into_iter()
            .enumerate()
            .map(|(index, object_id)| PageRef {
                side,
                number: index + 1,
                object_id,
            })
            .collect();
        Self { pages }
    }

    pub fn pages(&self) -> &[PageRef] {
        &self.pages
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Merge a front pass with a back pass given in capture order.
    pub fn interleave(front: &PageSequence, back: &PageSequence) -> PageSequence {
        PageSequence {
            pages: interleave(&front.pages, &back.pages),
        }
    }
}

/// Interleave fronts with reversed backs.
///
/// For equal lengths `n` the result has `2n` items with
/// `out[2k] = front[k]` and `out[2k + 1] = back[n - 1 - k]`.
pub fn interleave<T: Clone>(front: &[T], back: &[T]) -> Vec<T> {
    let mut merged = Vec::with_capacity(front.len() + back.len());
    let mut fronts = front.iter();
    let mut backs = back.iter().rev();

    loop {
        let f = fronts.next();
        let b = backs.next();
        if f.is_none() && b.is_none() {
            break;
        }
        merged.extend(f.cloned());
        merged.extend(b.cloned());
    }

    merged
}

/// Summary of a finished merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeReport {
    pub front_pages: usize,
    pub back_pages: usize,
    /// Pages in the merged document.
    pub pages: usize,
    /// Size of the merged document.
    pub bytes: u64,
}

/// Merges two single-sided scans into one double-sided document.
pub struct DuplexInterleaver;

impl DuplexInterleaver {
    /// Merge two PDFs on disk into `out`.
    ///
    /// Either input failing to parse is an assembly error and `out` is left
    /// untouched.
    #[instrument(skip_all, fields(out = %out.display()))]
    pub fn merge_files(front: &Path, back: &Path, out: &Path) -> Result<MergeReport> {
        let front = PdfReader::open(front)?;
        let back = PdfReader::open(back)?;

        let (assembler, front_pages, back_pages) = Self::assemble(&front, &back)?;
        let pages = assembler.page_count();
        let bytes = assembler.write_atomic(out)?;

        info!(front_pages, back_pages, pages, bytes, "duplex document written");
        Ok(MergeReport {
            front_pages,
            back_pages,
            pages,
            bytes,
        })
    }

    /// Merge two PDFs held in memory.
    pub fn merge_bytes(front: &[u8], back: &[u8]) -> Result<Vec<u8>> {
        let front = PdfReader::from_bytes(front)?;
        let back = PdfReader::from_bytes(back)?;
        let (assembler, _, _) = Self::assemble(&front, &back)?;
        assembler.to_bytes()
    }

    fn assemble<'a>(
        front: &'a PdfReader,
        back: &'a PdfReader,
    ) -> Result<(PdfAssembler<'a>, usize, usize)> {
        let front_seq = PageSequence::from_reader(front, Side::Front);
        let back_seq = PageSequence::from_reader(back, Side::Back);

        if front_seq.len() != back_seq.len() {
            warn!(
                front = front_seq.len(),
                back = back_seq.len(),
                "pass lengths differ, unmatched pages are kept without a counterpart"
            );
        }

        let merged = PageSequence::interleave(&front_seq, &back_seq);
        let mut assembler = PdfAssembler::new(vec![front.document(), back.document()]);
        for page in merged.pages() {
            assembler.append_page(page.side.source_index(), page.object_id)?;
        }

        Ok((assembler, front_seq.len(), back_seq.len()))
    }
}
