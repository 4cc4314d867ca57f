// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// scanwerk-document: PDF handling for scanned documents.
//
// Reads the single-sided PDFs a scanner returns, interleaves the two passes of
// a manual duplex scan, and writes the merged document atomically.

pub mod duplex;
pub mod pdf;

pub use duplex::{DuplexInterleaver, MergeReport, PageRef, PageSequence, Side, interleave};
pub use pdf::reader::PdfReader;
pub use pdf::writer::PdfAssembler;
