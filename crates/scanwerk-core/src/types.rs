// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Scanwerk scanning client.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, ScanwerkError};

/// Lowest resolution accepted in a scan request.
pub const MIN_RESOLUTION_DPI: u32 = 75;
/// Highest resolution accepted in a scan request.
pub const MAX_RESOLUTION_DPI: u32 = 1200;

/// MIME type of every document requested from the scanner.
pub const PDF_MIME: &str = "application/pdf";

/// Paper input mechanism on the scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InputSource {
    /// Automatic document feeder (ADF).
    Feeder,
    /// Flatbed glass.
    Platen,
}

impl InputSource {
    /// `pwg:InputSource` keyword.
    pub fn escl_keyword(&self) -> &'static str {
        match self {
            Self::Feeder => "Feeder",
            Self::Platen => "Platen",
        }
    }

    /// The opposite mechanism, used for the one-shot source fallback.
    pub fn other(&self) -> Self {
        match self {
            Self::Feeder => Self::Platen,
            Self::Platen => Self::Feeder,
        }
    }
}

impl fmt::Display for InputSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.escl_keyword())
    }
}

/// User preference for the paper source, before it is resolved against the
/// device state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceOverride {
    /// Inspect the scanner status and pick the feeder only when it has paper.
    #[default]
    Auto,
    Feeder,
    Platen,
}

impl SourceOverride {
    /// The forced source, if the user picked one.
    pub fn explicit(&self) -> Option<InputSource> {
        match self {
            Self::Auto => None,
            Self::Feeder => Some(InputSource::Feeder),
            Self::Platen => Some(InputSource::Platen),
        }
    }
}

impl FromStr for SourceOverride {
    type Err = ScanwerkError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" | "" => Ok(Self::Auto),
            "feeder" | "adf" => Ok(Self::Feeder),
            "platen" | "flatbed" => Ok(Self::Platen),
            other => Err(ScanwerkError::InvalidSettings(format!(
                "unknown paper source '{other}' (expected auto, feeder or platen)"
            ))),
        }
    }
}

/// Colour mode of the scanned document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ColorMode {
    #[default]
    Color,
    Grayscale,
}

impl ColorMode {
    /// `pwg:ColorMode` keyword.
    pub fn escl_keyword(&self) -> &'static str {
        match self {
            Self::Color => "Color",
            Self::Grayscale => "Grayscale",
        }
    }

    /// Interpret a free-form label. Anything starting with "gray" is
    /// grayscale, everything else is colour.
    pub fn from_label(label: &str) -> Self {
        if label.trim().to_ascii_lowercase().starts_with("gray") {
            Self::Grayscale
        } else {
            Self::Color
        }
    }
}

impl fmt::Display for ColorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.escl_keyword())
    }
}

/// Settings for one scan request. Immutable once constructed; the `with_*`
/// methods return adjusted copies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanSettings {
    resolution_dpi: u32,
    color_mode: ColorMode,
    page_size: String,
    input_source: InputSource,
    duplex: bool,
}

impl ScanSettings {
    /// Validate and build scan settings.
    ///
    /// A duplex preference is dropped when the source is the platen.
    pub fn new(
        resolution_dpi: u32,
        color_mode: ColorMode,
        page_size: impl Into<String>,
        input_source: InputSource,
        duplex: bool,
    ) -> Result<Self> {
        if !(MIN_RESOLUTION_DPI..=MAX_RESOLUTION_DPI).contains(&resolution_dpi) {
            return Err(ScanwerkError::InvalidSettings(format!(
                "resolution {resolution_dpi} dpi outside {MIN_RESOLUTION_DPI}-{MAX_RESOLUTION_DPI}"
            )));
        }

        let page_size = page_size.into().trim().to_string();
        if page_size.is_empty() {
            return Err(ScanwerkError::InvalidSettings("page size is empty".into()));
        }

        Ok(Self {
            resolution_dpi,
            color_mode,
            page_size,
            input_source,
            duplex: duplex && input_source == InputSource::Feeder,
        })
    }

    pub fn resolution_dpi(&self) -> u32 {
        self.resolution_dpi
    }

    pub fn color_mode(&self) -> ColorMode {
        self.color_mode
    }

    pub fn page_size(&self) -> &str {
        &self.page_size
    }

    pub fn input_source(&self) -> InputSource {
        self.input_source
    }

    /// Whether the request asks the device for two-sided capture. Always
    /// false on the platen.
    pub fn duplex(&self) -> bool {
        self.duplex && self.input_source == InputSource::Feeder
    }

    /// Copy with another paper source. Switching to the platen clears the
    /// duplex preference.
    pub fn with_input_source(&self, input_source: InputSource) -> Self {
        Self {
            input_source,
            duplex: self.duplex && input_source == InputSource::Feeder,
            ..self.clone()
        }
    }

    /// Copy with single-sided capture forced.
    pub fn simplex(&self) -> Self {
        Self {
            duplex: false,
            ..self.clone()
        }
    }

    /// Copy with another resolution (validated).
    pub fn with_resolution(&self, resolution_dpi: u32) -> Result<Self> {
        Self::new(
            resolution_dpi,
            self.color_mode,
            self.page_size.clone(),
            self.input_source,
            self.duplex,
        )
    }

    /// Copy with another colour mode.
    pub fn with_color_mode(&self, color_mode: ColorMode) -> Self {
        Self {
            color_mode,
            ..self.clone()
        }
    }
}

/// The finished document of a completed scan, as reported to the user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanResult {
    /// Final location of the document.
    pub path: PathBuf,
    /// Paper source the device actually scanned from.
    pub source: InputSource,
    /// Settings actually applied (after source fallback / corrections).
    pub settings: ScanSettings,
    /// Size of the final document.
    pub bytes: u64,
    /// Page count, when the document was parsed (manual duplex).
    pub page_count: Option<usize>,
    /// SHA-256 of the final document bytes.
    pub sha256: String,
    pub completed_at: DateTime<Utc>,
}
