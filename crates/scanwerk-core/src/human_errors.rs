// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable error messages for scan failures.
//
// Every technical error is mapped to plain English with a clear suggestion.
// The technical detail is kept alongside so nothing is silently dropped.

use crate::error::ScanwerkError;

/// Severity of an error from the user's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Network blip or busy scanner; trying again usually works.
    Transient,
    /// User must do something (load paper, fix the address, free disk space).
    ActionRequired,
    /// Cannot be fixed by retrying: the device refuses these settings.
    Permanent,
}

/// A human-readable error with plain English message and actionable suggestion.
#[derive(Debug, Clone)]
pub struct HumanError {
    /// Plain English summary.
    pub message: String,
    /// What the user should try.
    pub suggestion: String,
    /// Whether trying the same scan again is worthwhile.
    pub retriable: bool,
    pub severity: Severity,
}

/// Convert a `ScanwerkError` into a `HumanError`.
pub fn humanize_error(err: &ScanwerkError) -> HumanError {
    match err {
        ScanwerkError::DeviceBusy { .. } => HumanError {
            message: "The scanner is busy.".into(),
            suggestion: "Another scan or copy may still be running. Wait for it to finish, then try again.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        ScanwerkError::MalformedAcceptance(_) => HumanError {
            message: "The scanner accepted the job but didn't say where to collect it.".into(),
            suggestion: "Try again. If this keeps happening, restart the scanner.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        ScanwerkError::Rejected { status, .. } => humanize_rejection(*status),

        ScanwerkError::Transport(detail) => humanize_transport(detail),

        ScanwerkError::InvalidEndpoint(_) => HumanError {
            message: "The scanner address doesn't look right.".into(),
            suggestion: "Check the scanner address. It should look like 192.168.1.6 or http://scanner.local.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        ScanwerkError::InvalidSettings(detail) => HumanError {
            message: "Those scan settings can't be used.".into(),
            suggestion: format!("Adjust the settings and try again. ({detail})"),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        ScanwerkError::Assembly(_) => HumanError {
            message: "The scanned pages couldn't be combined.".into(),
            suggestion: "One of the passes didn't produce a readable document. Scan both sides again.".into(),
            retriable: true,
            severity: Severity::ActionRequired,
        },

        ScanwerkError::Aborted { .. } => HumanError {
            message: "The scan was cancelled.".into(),
            suggestion: "Nothing was saved. Start again when the pages are ready.".into(),
            retriable: true,
            severity: Severity::ActionRequired,
        },

        ScanwerkError::Io(io_err) => match io_err.kind() {
            std::io::ErrorKind::NotFound => HumanError {
                message: "The destination folder couldn't be found.".into(),
                suggestion: "Create the folder or choose a different output location.".into(),
                retriable: false,
                severity: Severity::ActionRequired,
            },
            std::io::ErrorKind::PermissionDenied => HumanError {
                message: "Scanwerk doesn't have permission to write there.".into(),
                suggestion: "Choose a different output location.".into(),
                retriable: false,
                severity: Severity::ActionRequired,
            },
            _ => HumanError {
                message: "There was a problem writing the scanned document.".into(),
                suggestion: "Check there is enough free disk space, then try again.".into(),
                retriable: true,
                severity: Severity::Transient,
            },
        },

        ScanwerkError::Serialization(_) => HumanError {
            message: "The configuration file couldn't be read.".into(),
            suggestion: "Fix or delete the configuration file; defaults will be used.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        },
    }
}

fn humanize_rejection(status: u16) -> HumanError {
    match status {
        400 | 413 | 415 | 422 => HumanError {
            message: "The scanner can't handle those settings.".into(),
            suggestion: "Try a different resolution, colour mode or page size.".into(),
            retriable: false,
            severity: Severity::Permanent,
        },
        404 => HumanError {
            message: "This device doesn't seem to offer network scanning.".into(),
            suggestion: "Check that AirScan/eSCL is enabled on the scanner.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        },
        503 => HumanError {
            message: "The scanner isn't ready.".into(),
            suggestion: "It may be warming up or showing a message on its panel. Check it, then try again.".into(),
            retriable: true,
            severity: Severity::Transient,
        },
        _ => HumanError {
            message: "The scanner refused the scan.".into(),
            suggestion: format!("Check that paper is loaded, then try again. (HTTP {status})"),
            retriable: true,
            severity: Severity::Transient,
        },
    }
}

fn humanize_transport(detail: &str) -> HumanError {
    let lower = detail.to_ascii_lowercase();

    if lower.contains("timed out") || lower.contains("timeout") {
        HumanError {
            message: "The scanner didn't respond in time.".into(),
            suggestion: "It might be asleep or turned off. Wake it up, then try again.".into(),
            retriable: true,
            severity: Severity::Transient,
        }
    } else if lower.contains("connection refused") {
        HumanError {
            message: "The scanner refused our connection.".into(),
            suggestion: "Check network scanning is enabled on the device.".into(),
            retriable: true,
            severity: Severity::Transient,
        }
    } else {
        HumanError {
            message: "We couldn't reach the scanner.".into(),
            suggestion: "Make sure it is turned on and on the same network as this computer.".into(),
            retriable: true,
            severity: Severity::Transient,
        }
    }
}
