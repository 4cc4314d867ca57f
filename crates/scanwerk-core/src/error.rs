// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Scanwerk.

use thiserror::Error;

/// Top-level error type for all Scanwerk operations.
#[derive(Debug, Error)]
pub enum ScanwerkError {
    // -- Scan job protocol --
    #[error("scanner stayed busy for {attempts} attempts")]
    DeviceBusy { attempts: u32 },

    #[error("malformed job acceptance: {0}")]
    MalformedAcceptance(String),

    #[error("scanner rejected the request with HTTP {status}: {detail}")]
    Rejected { status: u16, detail: String },

    #[error("scanner unreachable: {0}")]
    Transport(String),

    // -- Configuration --
    #[error("invalid scanner endpoint '{0}'")]
    InvalidEndpoint(String),

    #[error("invalid scan settings: {0}")]
    InvalidSettings(String),

    // -- Document assembly --
    #[error("document assembly failed: {0}")]
    Assembly(String),

    #[error("scan aborted before pass {pass}")]
    Aborted { pass: u8 },

    // -- Storage / persistence --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ScanwerkError {
    /// Whether a failed submission against one paper source may be retried
    /// once against the other source.
    ///
    /// Transport failures are surfaced directly: a different source will not
    /// make an unreachable device reachable.
    pub fn allows_source_fallback(&self) -> bool {
        matches!(
            self,
            Self::DeviceBusy { .. } | Self::MalformedAcceptance(_) | Self::Rejected { .. }
        )
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, ScanwerkError>;
