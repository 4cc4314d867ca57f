// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// eSCL `ScanSettings` request document.

use quick_xml::escape::escape;
use scanwerk_core::types::{PDF_MIME, ScanSettings};

/// eSCL schema namespace.
pub const ESCL_NS: &str = "http://schemas.hp.com/imaging/escl/2011/05/03";
/// PWG semantic model namespace.
pub const PWG_NS: &str = "http://www.pwg.org/schemas/2010/12/sm";

/// Schema version announced in every request.
const SETTINGS_VERSION: &str = "2.0";

/// Render the `scan:ScanSettings` document for a job submission.
///
/// The resolution is applied to both axes, the document format is always PDF
/// and the intent is always `Document`.  `Duplex` is only sent for a feeder
/// job that asked for it.
pub fn scan_settings_xml(settings: &ScanSettings) -> String {
    let duplex = if settings.duplex() { "Duplex" } else { "Simplex" };
    let dpi = settings.resolution_dpi();

    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<scan:ScanSettings xmlns:scan="{ESCL_NS}" xmlns:pwg="{PWG_NS}">
  <pwg:Version>{SETTINGS_VERSION}</pwg:Version>
  <pwg:InputSource>{source}</pwg:InputSource>
  <pwg:DocumentFormat>{PDF_MIME}</pwg:DocumentFormat>
  <pwg:ColorMode>{color}</pwg:ColorMode>
  <pwg:Duplex>{duplex}</pwg:Duplex>
  <pwg:MediaSizeName>{media}</pwg:MediaSizeName>
  <scan:Resolution>
    <scan:XResolution>{dpi}</scan:XResolution>
    <scan:YResolution>{dpi}</scan:YResolution>
  </scan:Resolution>
  <scan:Intent>Document</scan:Intent>
</scan:ScanSettings>"#,
        source = settings.input_source().escl_keyword(),
        color = settings.color_mode().escl_keyword(),
        media = escape(settings.page_size()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::StatusReport;
    use scanwerk_core::types::{ColorMode, InputSource};

    fn settings(source: InputSource, duplex: bool) -> ScanSettings {
        ScanSettings::new(300, ColorMode::Grayscale, "A4", source, duplex).expect("valid settings")
    }

    #[test]
    fn request_is_well_formed_and_complete() {
        let xml = scan_settings_xml(&settings(InputSource::Feeder, false));
        let parsed = StatusReport::parse(&xml);
        assert!(parsed.is_structured());
        assert_eq!(parsed.find("InputSource"), Some("Feeder"));
        assert_eq!(parsed.find("DocumentFormat"), Some("application/pdf"));
        assert_eq!(parsed.find("ColorMode"), Some("Grayscale"));
        assert_eq!(parsed.find("MediaSizeName"), Some("A4"));
        assert_eq!(parsed.find("XResolution"), Some("300"));
        assert_eq!(parsed.find("YResolution"), Some("300"));
        assert_eq!(parsed.find("Intent"), Some("Document"));
        assert_eq!(parsed.find("Version"), Some("2.0"));
    }

    #[test]
    fn platen_is_always_simplex() {
        let xml = scan_settings_xml(&settings(InputSource::Platen, true));
        assert!(xml.contains("<pwg:Duplex>Simplex</pwg:Duplex>"));
        assert!(xml.contains("<pwg:InputSource>Platen</pwg:InputSource>"));
    }

    #[test]
    fn feeder_carries_duplex_preference() {
        let xml = scan_settings_xml(&settings(InputSource::Feeder, true));
        assert!(xml.contains("<pwg:Duplex>Duplex</pwg:Duplex>"));
    }

    #[test]
    fn media_name_is_escaped() {
        let s = ScanSettings::new(150, ColorMode::Color, "Letter<&>", InputSource::Platen, false)
            .expect("valid settings");
        let xml = scan_settings_xml(&s);
        assert!(xml.contains("Letter&lt;&amp;&gt;"));
        assert_eq!(StatusReport::parse(&xml).find("MediaSizeName"), Some("Letter<&>"));
    }
}
