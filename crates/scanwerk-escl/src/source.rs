// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Paper source selection.
//
// Many scanners reject `Feeder` jobs when the feeder is empty, and dislike
// "Auto".  We therefore pick the feeder only on positive evidence that paper
// is loaded; the platen is always assumed present.
//
// Evidence comes from two independent channels that are OR-ed together:
//   1. keyword co-occurrence in the raw report text (works on any format);
//   2. element-level checks on parsed XML.

use std::future::Future;

use scanwerk_core::error::Result;
use scanwerk_core::types::{InputSource, SourceOverride};
use tracing::{debug, info, warn};

use crate::status::{StatusElement, StatusReport};

/// Words that name the feeder mechanism.
const MECHANISM_KEYWORDS: &[&str] = &["documentfeeder", "inputtray", "feeder", "adf"];

/// Words that say paper is there.
const LOADED_KEYWORDS: &[&str] = &["haspaper", "loaded", "present", "ready"];

/// One positive signal that the feeder holds paper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeederEvidence {
    /// A mechanism keyword and a loaded keyword both occur in the raw text.
    Keywords {
        mechanism: &'static str,
        state: &'static str,
    },
    /// An input-source element names the feeder.
    InputSourceElement { path: String, value: String },
    /// A media/paper/document element qualified by the feeder reports paper.
    MediaElement { path: String, value: String },
}

/// Collect every feeder-loaded signal in a status report.
pub fn gather_evidence(report: &StatusReport) -> Vec<FeederEvidence> {
    let mut evidence = keyword_evidence(report.raw());
    evidence.extend(report.elements().iter().filter_map(element_evidence));
    evidence
}

/// Pick the paper source from an explicit override or the gathered evidence.
///
/// Pure function: no I/O, no device handle.
pub fn decide(source_override: SourceOverride, evidence: &[FeederEvidence]) -> InputSource {
    if let Some(source) = source_override.explicit() {
        return source;
    }
    if evidence.is_empty() {
        InputSource::Platen
    } else {
        InputSource::Feeder
    }
}

/// Resolve the paper source to request.
///
/// An explicit override is returned without calling `report_fn`.  Otherwise
/// the status report is fetched; a failed fetch or a report without feeder
/// evidence yields the platen.
pub async fn resolve<F, Fut>(source_override: SourceOverride, report_fn: F) -> InputSource
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<StatusReport>>,
{
    if let Some(source) = source_override.explicit() {
        debug!(%source, "paper source forced by user");
        return source;
    }

    let report = match report_fn().await {
        Ok(report) => report,
        Err(err) => {
            warn!(%err, "status unavailable, defaulting to platen");
            return InputSource::Platen;
        }
    };

    let evidence = gather_evidence(&report);
    let source = decide(SourceOverride::Auto, &evidence);
    info!(
        %source,
        signals = evidence.len(),
        structured = report.is_structured(),
        "paper source resolved from scanner status"
    );
    source
}

fn keyword_evidence(raw: &str) -> Vec<FeederEvidence> {
    let text = raw.to_ascii_lowercase();
    let mut evidence = Vec::new();

    for &mechanism in MECHANISM_KEYWORDS.iter().filter(|m| text.contains(*m)) {
        for &state in LOADED_KEYWORDS.iter().filter(|s| text.contains(*s)) {
            evidence.push(FeederEvidence::Keywords { mechanism, state });
        }
    }

    evidence
}

fn element_evidence(element: &StatusElement) -> Option<FeederEvidence> {
    let tag = element.name.to_ascii_lowercase();
    let value = element.text.to_ascii_lowercase();
    let names_feeder = |s: &str| s.contains("feeder") || s.contains("adf");

    if tag.contains("input") && tag.contains("source") && names_feeder(&value) {
        return Some(FeederEvidence::InputSourceElement {
            path: element.path.clone(),
            value: element.text.clone(),
        });
    }

    let media_tag = ["media", "paper", "document"].iter().any(|k| tag.contains(k));
    let qualified = names_feeder(&tag) || names_feeder(&value);
    let loaded = ["loaded", "present", "ready"].iter().any(|k| value.contains(k));

    if media_tag && qualified && loaded {
        return Some(FeederEvidence::MediaElement {
            path: element.path.clone(),
            value: element.text.clone(),
        });
    }

    None
}
