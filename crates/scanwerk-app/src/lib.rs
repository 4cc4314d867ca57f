// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scanwerk application layer: the scan service (single and manual duplex
// scans to disk), persisted configuration, and the `scanwerk` command line.

pub mod cli;
pub mod services;
