// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scanner status report parsing.
//
// Vendors publish `ScannerStatus` documents with incompatible, undocumented
// schemas.  Parsing never fails: anything that is not well-formed XML becomes
// an unstructured report that still carries the raw text for keyword search.

use quick_xml::events::Event;
use quick_xml::reader::Reader;
use tracing::debug;

/// One text-bearing element of an XML document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusElement {
    /// Slash-separated local names from the root, e.g.
    /// `ScannerStatus/AdfState`.
    pub path: String,
    /// Local name of the element (namespace prefix stripped).
    pub name: String,
    /// Trimmed, unescaped text content (empty for `<Empty/>` elements).
    pub text: String,
}

/// Snapshot of the device status, valid only for the request that produced it.
#[derive(Debug, Clone)]
pub struct StatusReport {
    raw: String,
    elements: Vec<StatusElement>,
    structured: bool,
}

impl StatusReport {
    /// Parse a raw status document. Never fails.
    pub fn parse(raw: impl AsRef<[u8]>) -> Self {
        let raw = String::from_utf8_lossy(raw.as_ref()).into_owned();

        match parse_elements(&raw) {
            Some(elements) => {
                debug!(elements = elements.len(), "status report parsed");
                Self {
                    raw,
                    elements,
                    structured: true,
                }
            }
            None => {
                debug!(bytes = raw.len(), "status report is not well-formed XML");
                Self {
                    raw,
                    elements: Vec::new(),
                    structured: false,
                }
            }
        }
    }

    /// The document exactly as received (lossily decoded as UTF-8).
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Whether the document parsed as well-formed XML.
    pub fn is_structured(&self) -> bool {
        self.structured
    }

    /// Text-bearing elements in document order. Empty when unstructured.
    pub fn elements(&self) -> &[StatusElement] {
        &self.elements
    }

    /// Text of the first element with the given local name (case-insensitive).
    pub fn find(&self, name: &str) -> Option<&str> {
        self.elements
            .iter()
            .find(|e| e.name.eq_ignore_ascii_case(name))
            .map(|e| e.text.as_str())
    }

    /// Overall scanner state (`pwg:State`), e.g. "Idle" or "Processing".
    pub fn scanner_state(&self) -> Option<&str> {
        self.find("State")
    }

    /// Feeder state (`scan:AdfState`), e.g. "ScannerAdfLoaded".
    pub fn adf_state(&self) -> Option<&str> {
        self.find("AdfState")
    }
}

/// Walk an XML document and collect its text-bearing elements.
///
/// Returns `None` for anything that is not a single well-formed element tree.
pub(crate) fn parse_elements(raw: &str) -> Option<Vec<StatusElement>> {
    let mut reader = Reader::from_str(raw);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<String> = Vec::new();
    let mut elements = Vec::new();
    let mut roots = 0usize;

    loop {
        match reader.read_event() {
            Ok(Event::Start(start)) => {
                if stack.is_empty() {
                    roots += 1;
                }
                stack.push(String::from_utf8_lossy(start.local_name().as_ref()).into_owned());
            }
            Ok(Event::Empty(start)) => {
                if stack.is_empty() {
                    roots += 1;
                }
                let name = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();
                elements.push(element_at(&stack, name, String::new()));
            }
            Ok(Event::Text(text)) => {
                let value = text
                    .unescape()
                    .map(|t| t.into_owned())
                    .unwrap_or_else(|_| String::from_utf8_lossy(&text).into_owned());
                push_text(&stack, &mut elements, value)?;
            }
            Ok(Event::CData(data)) => {
                let value = String::from_utf8_lossy(&data.into_inner()).into_owned();
                push_text(&stack, &mut elements, value)?;
            }
            Ok(Event::End(_)) => {
                stack.pop()?;
            }
            Ok(Event::Eof) => break,
            // Declarations, comments, processing instructions, doctypes.
            Ok(_) => {}
            Err(err) => {
                debug!(%err, position = reader.buffer_position(), "XML parse error");
                return None;
            }
        }
    }

    if roots != 1 || !stack.is_empty() {
        return None;
    }

    Some(elements)
}

fn push_text(
    stack: &[String],
    elements: &mut Vec<StatusElement>,
    value: String,
) -> Option<()> {
    let value = value.trim();
    if value.is_empty() {
        return Some(());
    }
    // Text outside the root element: not an XML document.
    let (name, parents) = stack.split_last()?;
    elements.push(element_at(parents, name.clone(), value.to_string()));
    Some(())
}

fn element_at(parents: &[String], name: String, text: String) -> StatusElement {
    let mut path = parents.join("/");
    if !path.is_empty() {
        path.push('/');
    }
    path.push_str(&name);
    StatusElement { path, name, text }
}
