// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Service layer: bridges the command line to the scanwerk backend crates.
//
// Each service wraps one or more backend crate APIs in a way that is convenient
// for the CLI to call and returns data it can print directly.

pub mod data_dir;
pub mod pass_gate;
pub mod scan_service;

pub use pass_gate::{AutoGate, Pass, PassGate, PromptGate};
pub use scan_service::{ScanRequest, ScanService};
