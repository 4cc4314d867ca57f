// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scanwerk eSCL, the HTTP side of network scanning: job submission with
// busy retry and source fallback, document retrieval, status parsing and
// paper source detection.  Domain types live in `scanwerk-core`.

pub mod capabilities;
pub mod client;
pub mod probe;
pub mod request;
pub mod retry;
pub mod source;
pub mod status;

pub use capabilities::{CorrectionNotice, ScannerCapabilities, SourceCapabilities, fit_settings};
pub use client::{EsclClient, JobHandle, RemoteJobInfo, ScanOutcome, Submission};
pub use probe::ProbeReport;
pub use retry::BusyRetryPolicy;
pub use status::StatusReport;
