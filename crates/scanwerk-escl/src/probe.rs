// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Quick reachability check before a scan.
//
// Cheaper than a failed submission: one short GET of the capabilities
// document.  When a device UUID was remembered from an earlier session the
// answer is also checked against it, so a DHCP reshuffle that put another
// device on the same address is noticed.

use std::time::Duration;

use tracing::{debug, info, instrument, warn};

use scanwerk_core::error::ScanwerkError;

use crate::capabilities::ScannerCapabilities;
use crate::client::EsclClient;

/// Timeout for the reachability GET.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(3);

/// Outcome of [`EsclClient::probe`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeReport {
    /// The device answered HTTP at the eSCL endpoint.
    pub reachable: bool,
    /// Whether the advertised UUID matches the expected one. `None` when no
    /// UUID was expected or the device did not advertise one.
    pub verified: Option<bool>,
    /// Advertised make and model, if any.
    pub make_and_model: Option<String>,
}

impl EsclClient {
    /// Check that a scanner answers at this endpoint.
    #[instrument(skip(self), fields(base = %self.base()))]
    pub async fn probe(&self, expected_uuid: Option<&str>) -> ProbeReport {
        let caps = match self
            .get_text_with_timeout("ScannerCapabilities", PROBE_TIMEOUT)
            .await
        {
            Ok(body) => Some(ScannerCapabilities::from_xml(&body)),
            // An HTTP error status still proves something is listening.
            Err(ScanwerkError::Rejected { status, .. }) => {
                debug!(status, "capabilities refused, device is up");
                Some(None)
            }
            Err(err) => {
                warn!(%err, "scanner unreachable");
                None
            }
        };

        let Some(caps) = caps else {
            return ProbeReport {
                reachable: false,
                verified: None,
                make_and_model: None,
            };
        };

        let advertised = caps.as_ref().and_then(|c| c.uuid.as_deref());
        let verified = match (expected_uuid, advertised) {
            (Some(expected), Some(actual)) => Some(same_uuid(expected, actual)),
            _ => None,
        };

        if verified == Some(false) {
            warn!(
                expected = expected_uuid.unwrap_or_default(),
                actual = advertised.unwrap_or_default(),
                "a different scanner answers at this address"
            );
        }

        let report = ProbeReport {
            reachable: true,
            verified,
            make_and_model: caps.and_then(|c| c.make_and_model),
        };
        info!(verified = ?report.verified, "scanner reachable");
        report
    }
}

/// Compare UUIDs ignoring case and an optional `urn:uuid:` prefix.
fn same_uuid(a: &str, b: &str) -> bool {
    fn bare(uuid: &str) -> String {
        let uuid = uuid.trim().to_ascii_lowercase();
        uuid.strip_prefix("urn:uuid:").unwrap_or(&uuid).to_string()
    }
    bare(a) == bare(b)
}
