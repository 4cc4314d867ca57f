// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF module: reading scanned documents and assembling pages into new ones.

pub mod reader;
pub mod writer;

#[cfg(test)]
pub(crate) mod fixtures;

pub use reader::PdfReader;
pub use writer::PdfAssembler;
