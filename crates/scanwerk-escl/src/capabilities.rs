// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scanner capability querying and scan settings correction.
//
// Reads `ScannerCapabilities` to learn what the device actually supports,
// then adjusts user settings that would certainly be refused.

use std::collections::BTreeSet;

use tracing::{debug, info, warn};

use scanwerk_core::types::{
    ColorMode, InputSource, MAX_RESOLUTION_DPI, MIN_RESOLUTION_DPI, PDF_MIME, ScanSettings,
};

use crate::client::EsclClient;
use crate::status::{StatusElement, parse_elements};

/// What one paper source advertises.
///
/// Empty sets mean "not advertised", not "unsupported".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceCapabilities {
    pub color_modes: BTreeSet<ColorMode>,
    /// Discrete resolutions (X axis) in dpi.
    pub resolutions: BTreeSet<u32>,
    /// Document format MIME types.
    pub document_formats: BTreeSet<String>,
}

impl SourceCapabilities {
    fn record(&mut self, element: &StatusElement) {
        match element.name.as_str() {
            "ColorMode" => {
                if let Some(mode) = color_mode_keyword(&element.text) {
                    self.color_modes.insert(mode);
                }
            }
            "XResolution" => {
                if let Ok(dpi) = element.text.trim().parse() {
                    self.resolutions.insert(dpi);
                }
            }
            "DocumentFormat" | "DocumentFormatExt" if !element.text.is_empty() => {
                self.document_formats.insert(element.text.clone());
            }
            _ => {}
        }
    }
}

/// Parsed `scan:ScannerCapabilities` document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScannerCapabilities {
    /// Device UUID (`scan:UUID`), when advertised.
    pub uuid: Option<String>,
    /// `pwg:MakeAndModel`.
    pub make_and_model: Option<String>,
    /// `scan:Platen` section; `None` when the device has no platen.
    pub platen: Option<SourceCapabilities>,
    /// `scan:Adf` section; `None` when the device has no feeder.
    pub feeder: Option<SourceCapabilities>,
    /// Feeder advertises duplex input caps.
    pub feeder_duplex: bool,
}

impl ScannerCapabilities {
    /// Parse a capabilities document. `None` if it is not well-formed XML.
    pub fn from_xml(raw: &str) -> Option<Self> {
        let elements = parse_elements(raw)?;
        let mut caps = Self::default();

        for element in &elements {
            if has_segment(element, "AdfDuplexInputCaps") {
                caps.feeder_duplex = true;
            }

            let section = if has_segment(element, "Platen") {
                Some(caps.platen.get_or_insert_with(SourceCapabilities::default))
            } else if has_segment(element, "Adf") {
                Some(caps.feeder.get_or_insert_with(SourceCapabilities::default))
            } else {
                None
            };
            if let Some(section) = section {
                section.record(element);
                continue;
            }

            match element.name.as_str() {
                "UUID" if !element.text.is_empty() => caps.uuid = Some(element.text.clone()),
                "MakeAndModel" if !element.text.is_empty() => {
                    caps.make_and_model = Some(element.text.clone())
                }
                _ => {}
            }
        }

        Some(caps)
    }

    /// Query a scanner's capabilities. `None` when the device does not
    /// publish them or the request fails.
    pub async fn query(client: &EsclClient) -> Option<Self> {
        let body = match client.get_text("ScannerCapabilities").await {
            Ok(body) => body,
            Err(err) => {
                debug!(%err, "capabilities not supported");
                return None;
            }
        };

        let caps = Self::from_xml(&body);
        if caps.is_none() {
            debug!("capabilities document is not well-formed XML");
        }
        caps
    }

    pub fn has_platen(&self) -> bool {
        self.platen.is_some()
    }

    pub fn has_feeder(&self) -> bool {
        self.feeder.is_some()
    }

    /// Capabilities of one paper source, if that section was advertised.
    pub fn source(&self, source: InputSource) -> Option<&SourceCapabilities> {
        match source {
            InputSource::Platen => self.platen.as_ref(),
            InputSource::Feeder => self.feeder.as_ref(),
        }
    }

    /// Whether the device has the given paper source. Unknown = yes.
    pub fn supports_source(&self, source: InputSource) -> bool {
        (self.platen.is_none() && self.feeder.is_none()) || self.source(source).is_some()
    }

    /// Whether `source` supports a colour mode. Unknown = yes.
    pub fn supports_color(&self, source: InputSource, mode: ColorMode) -> bool {
        self.source(source)
            .is_none_or(|s| s.color_modes.is_empty() || s.color_modes.contains(&mode))
    }

    /// Whether `source` supports a resolution. Unknown = yes.
    pub fn supports_resolution(&self, source: InputSource, dpi: u32) -> bool {
        self.source(source)
            .is_none_or(|s| s.resolutions.is_empty() || s.resolutions.contains(&dpi))
    }

    /// Whether `source` can produce a document format. Unknown = yes.
    pub fn supports_format(&self, source: InputSource, mime_type: &str) -> bool {
        self.source(source).is_none_or(|s| {
            s.document_formats.is_empty()
                || s.document_formats.iter().any(|f| f.eq_ignore_ascii_case(mime_type))
        })
    }
}

/// A setting that was changed to fit the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrectionNotice {
    /// Which setting was changed.
    pub field: String,
    pub original: String,
    pub corrected: String,
    /// Why, in words the operator understands.
    pub reason: String,
}

/// Adjust settings to what the device advertises for the settings' source.
///
/// Only settings that would definitely be refused are changed; when a
/// capability is not advertised the user's choice is kept.
pub fn fit_settings(
    settings: &ScanSettings,
    caps: &ScannerCapabilities,
) -> (ScanSettings, Vec<CorrectionNotice>) {
    let mut corrected = settings.clone();
    let mut notices = Vec::new();

    let requested_source = settings.input_source();
    if !caps.supports_source(requested_source) && caps.supports_source(requested_source.other()) {
        let other = requested_source.other();
        notices.push(CorrectionNotice {
            field: "Source".into(),
            original: requested_source.to_string(),
            corrected: other.to_string(),
            reason: format!("This scanner has no {requested_source}; using the {other}."),
        });
        corrected = corrected.with_input_source(other);
    }
    let source = corrected.input_source();

    let requested = corrected.resolution_dpi();
    if !caps.supports_resolution(source, requested) {
        let nearest = caps
            .source(source)
            .and_then(|s| nearest_resolution(requested, &s.resolutions));
        if let Some(nearest) = nearest {
            if let Ok(adjusted) = corrected.with_resolution(nearest) {
                notices.push(CorrectionNotice {
                    field: "Resolution".into(),
                    original: format!("{requested} dpi"),
                    corrected: format!("{nearest} dpi"),
                    reason: format!("The {source} doesn't offer {requested} dpi; using the closest it does."),
                });
                corrected = adjusted;
            }
        }
    }

    if corrected.color_mode() == ColorMode::Color
        && !caps.supports_color(source, ColorMode::Color)
        && caps.supports_color(source, ColorMode::Grayscale)
    {
        notices.push(CorrectionNotice {
            field: "Colour".into(),
            original: ColorMode::Color.to_string(),
            corrected: ColorMode::Grayscale.to_string(),
            reason: format!("The {source} only scans in grayscale."),
        });
        corrected = corrected.with_color_mode(ColorMode::Grayscale);
    }

    if corrected.duplex() && caps.has_feeder() && !caps.feeder_duplex {
        notices.push(CorrectionNotice {
            field: "Duplex".into(),
            original: "Duplex".into(),
            corrected: "Simplex".into(),
            reason: "This scanner's feeder only scans one side. Use manual duplex instead.".into(),
        });
        corrected = corrected.simplex();
    }

    // PDF is the only format requested; nothing to correct, only worth a note.
    if !caps.supports_format(source, PDF_MIME) {
        warn!(%source, "scanner does not advertise PDF output, the job may be refused");
    }

    if notices.is_empty() {
        debug!("scan settings fit scanner capabilities");
    } else {
        info!(corrections = notices.len(), "adjusted scan settings to scanner capabilities");
    }

    (corrected, notices)
}

/// Closest supported resolution within the accepted range; ties go to the
/// lower value.
fn nearest_resolution(requested: u32, supported: &BTreeSet<u32>) -> Option<u32> {
    supported
        .iter()
        .copied()
        .filter(|dpi| (MIN_RESOLUTION_DPI..=MAX_RESOLUTION_DPI).contains(dpi))
        .min_by_key(|dpi| dpi.abs_diff(requested))
}

/// eSCL colour keywords: `RGB24`/`RGB48` are colour, `Grayscale8`/`16` are
/// grayscale.  `BlackAndWhite1` has no counterpart in [`ColorMode`].
fn color_mode_keyword(keyword: &str) -> Option<ColorMode> {
    let keyword = keyword.trim().to_ascii_lowercase();
    if keyword.starts_with("gray") {
        Some(ColorMode::Grayscale)
    } else if keyword.starts_with("rgb") || keyword.starts_with("color") {
        Some(ColorMode::Color)
    } else {
        None
    }
}

fn has_segment(element: &StatusElement, segment: &str) -> bool {
    element.path.split('/').any(|s| s == segment)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CAPS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<scan:ScannerCapabilities xmlns:scan="http://schemas.hp.com/imaging/escl/2011/05/03" xmlns:pwg="http://www.pwg.org/schemas/2010/12/sm">
  <pwg:Version>2.63</pwg:Version>
  <pwg:MakeAndModel>Brother MFC-L2710DW</pwg:MakeAndModel>
  <scan:UUID>E3248000-80CE-11DB-8000-30055C773BCF</scan:UUID>
  <scan:Platen>
    <scan:PlatenInputCaps>
      <scan:SettingProfiles>
        <scan:SettingProfile>
          <scan:ColorModes>
            <scan:ColorMode>BlackAndWhite1</scan:ColorMode>
            <scan:ColorMode>Grayscale8</scan:ColorMode>
            <scan:ColorMode>RGB24</scan:ColorMode>
          </scan:ColorModes>
          <scan:DocumentFormats>
            <pwg:DocumentFormat>application/pdf</pwg:DocumentFormat>
            <pwg:DocumentFormat>image/jpeg</pwg:DocumentFormat>
          </scan:DocumentFormats>
          <scan:SupportedResolutions>
            <scan:DiscreteResolutions>
              <scan:DiscreteResolution><scan:XResolution>100</scan:XResolution><scan:YResolution>100</scan:YResolution></scan:DiscreteResolution>
              <scan:DiscreteResolution><scan:XResolution>200</scan:XResolution><scan:YResolution>200</scan:YResolution></scan:DiscreteResolution>
              <scan:DiscreteResolution><scan:XResolution>600</scan:XResolution><scan:YResolution>600</scan:YResolution></scan:DiscreteResolution>
            </scan:DiscreteResolutions>
          </scan:SupportedResolutions>
        </scan:SettingProfile>
      </scan:SettingProfiles>
    </scan:PlatenInputCaps>
  </scan:Platen>
  <scan:Adf>
    <scan:AdfSimplexInputCaps>
      <scan:MaxWidth>2550</scan:MaxWidth>
      <scan:SettingProfiles>
        <scan:SettingProfile>
          <scan:ColorModes>
            <scan:ColorMode>Grayscale8</scan:ColorMode>
          </scan:ColorModes>
          <scan:DocumentFormats>
            <pwg:DocumentFormat>application/pdf</pwg:DocumentFormat>
          </scan:DocumentFormats>
          <scan:SupportedResolutions>
            <scan:DiscreteResolutions>
              <scan:DiscreteResolution><scan:XResolution>200</scan:XResolution><scan:YResolution>200</scan:YResolution></scan:DiscreteResolution>
              <scan:DiscreteResolution><scan:XResolution>300</scan:XResolution><scan:YResolution>300</scan:YResolution></scan:DiscreteResolution>
            </scan:DiscreteResolutions>
          </scan:SupportedResolutions>
        </scan:SettingProfile>
      </scan:SettingProfiles>
    </scan:AdfSimplexInputCaps>
  </scan:Adf>
</scan:ScannerCapabilities>"#;

    const PLATEN_ONLY: &str = r#"<scan:ScannerCapabilities xmlns:scan="s" xmlns:pwg="p">
  <scan:Platen><scan:PlatenInputCaps><scan:SettingProfiles><scan:SettingProfile>
    <scan:ColorModes><scan:ColorMode>RGB24</scan:ColorMode></scan:ColorModes>
  </scan:SettingProfile></scan:SettingProfiles></scan:PlatenInputCaps></scan:Platen>
</scan:ScannerCapabilities>"#;

    fn settings(dpi: u32, color: ColorMode, source: InputSource, duplex: bool) -> ScanSettings {
        ScanSettings::new(dpi, color, "A4", source, duplex).expect("valid settings")
    }

    #[test]
    fn parses_capabilities_per_source() {
        let caps = ScannerCapabilities::from_xml(CAPS).expect("well-formed");
        assert_eq!(caps.uuid.as_deref(), Some("E3248000-80CE-11DB-8000-30055C773BCF"));
        assert_eq!(caps.make_and_model.as_deref(), Some("Brother MFC-L2710DW"));
        assert!(caps.has_platen());
        assert!(caps.has_feeder());
        assert!(!caps.feeder_duplex);

        let platen = caps.source(InputSource::Platen).expect("platen section");
        assert_eq!(
            platen.color_modes,
            BTreeSet::from([ColorMode::Color, ColorMode::Grayscale])
        );
        assert_eq!(platen.resolutions, BTreeSet::from([100, 200, 600]));

        let feeder = caps.source(InputSource::Feeder).expect("feeder section");
        assert_eq!(feeder.color_modes, BTreeSet::from([ColorMode::Grayscale]));
        assert_eq!(feeder.resolutions, BTreeSet::from([200, 300]));

        assert!(caps.supports_format(InputSource::Platen, "APPLICATION/PDF"));
        assert!(caps.supports_format(InputSource::Platen, "image/jpeg"));
        assert!(!caps.supports_format(InputSource::Feeder, "image/jpeg"));
    }

    #[test]
    fn garbage_is_not_capabilities() {
        assert!(ScannerCapabilities::from_xml("not xml at all").is_none());
    }

    #[test]
    fn feeder_job_fitted_to_feeder_caps_only() {
        let caps = ScannerCapabilities::from_xml(CAPS).expect("well-formed");
        // 600 dpi and colour exist on the platen but not on the feeder.
        let requested = settings(600, ColorMode::Color, InputSource::Feeder, true);

        let (fitted, notices) = fit_settings(&requested, &caps);
        assert_eq!(fitted.resolution_dpi(), 300);
        assert_eq!(fitted.color_mode(), ColorMode::Grayscale);
        assert!(!fitted.duplex());
        assert_eq!(fitted.input_source(), InputSource::Feeder);

        let fields: Vec<&str> = notices.iter().map(|n| n.field.as_str()).collect();
        assert_eq!(fields, ["Resolution", "Colour", "Duplex"]);
    }

    #[test]
    fn platen_job_fitted_to_platen_caps() {
        let caps = ScannerCapabilities::from_xml(CAPS).expect("well-formed");
        let requested = settings(300, ColorMode::Color, InputSource::Platen, false);

        let (fitted, notices) = fit_settings(&requested, &caps);
        assert_eq!(fitted.resolution_dpi(), 200);
        assert_eq!(fitted.color_mode(), ColorMode::Color);
        assert_eq!(notices.len(), 1);
    }

    #[test]
    fn missing_source_switches_to_the_other() {
        let caps = ScannerCapabilities::from_xml(PLATEN_ONLY).expect("well-formed");
        assert!(!caps.supports_source(InputSource::Feeder));

        let requested = settings(300, ColorMode::Color, InputSource::Feeder, true);
        let (fitted, notices) = fit_settings(&requested, &caps);
        assert_eq!(fitted.input_source(), InputSource::Platen);
        assert!(!fitted.duplex());
        assert_eq!(notices[0].field, "Source");
        assert_eq!(notices.len(), 1);
    }

    #[test]
    fn supported_settings_untouched() {
        let caps = ScannerCapabilities::from_xml(CAPS).expect("well-formed");
        let requested = settings(600, ColorMode::Grayscale, InputSource::Platen, false);

        let (fitted, notices) = fit_settings(&requested, &caps);
        assert_eq!(fitted, requested);
        assert!(notices.is_empty());
    }

    #[test]
    fn unknown_capabilities_correct_nothing() {
        let caps = ScannerCapabilities::default();
        let requested = settings(1200, ColorMode::Color, InputSource::Feeder, true);

        let (fitted, notices) = fit_settings(&requested, &caps);
        assert_eq!(fitted, requested);
        assert!(notices.is_empty());
        assert!(caps.supports_source(InputSource::Feeder));
        assert!(caps.supports_format(InputSource::Feeder, PDF_MIME));
    }

    #[test]
    fn nearest_resolution_prefers_lower_on_tie() {
        let supported = BTreeSet::from([150, 300]);
        assert_eq!(nearest_resolution(225, &supported), Some(150));
        assert_eq!(nearest_resolution(1000, &supported), Some(300));
        assert_eq!(nearest_resolution(100, &BTreeSet::from([50])), None);
    }
}
