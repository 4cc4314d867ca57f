// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Application configuration.

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::{Result, ScanwerkError};
use crate::types::{ColorMode, InputSource, ScanSettings, SourceOverride};

/// Default output file name pattern.
pub const DEFAULT_FILENAME_PATTERN: &str = "{class}_{date}_{time}.pdf";

/// `{class}` value when no document class is chosen.
pub const DEFAULT_CLASS: &str = "scan";

/// Extension every output file carries.
pub const OUTPUT_EXTENSION: &str = "pdf";

/// Persistent application settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Scanner host, IP address, or base URL. `None` until the user sets one.
    pub host: Option<String>,
    /// Resolution applied to both axes.
    pub resolution_dpi: u32,
    pub color_mode: ColorMode,
    /// Media size name sent to the scanner (e.g. "A4", "Letter").
    pub page_size: String,
    /// Ask the feeder for two-sided capture when the device supports it.
    pub duplex: bool,
    /// Paper source preference.
    pub source: SourceOverride,
    /// Scanner UUID used to verify we are talking to the right device.
    pub expected_uuid: Option<String>,
    /// Output file name when none is given. Tokens: `{class}`, `{date}`,
    /// `{time}`, `{topic}` and `{ext}`.
    pub filename_pattern: String,
    /// Document classes ("Invoices", "Letters", ...) and the folder each
    /// one is filed into.
    pub classes: BTreeMap<String, PathBuf>,
    /// Adjust settings to the scanner's advertised capabilities.
    pub fit_to_device: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: None,
            resolution_dpi: 300,
            color_mode: ColorMode::Color,
            page_size: "A4".into(),
            duplex: false,
            source: SourceOverride::Auto,
            expected_uuid: None,
            filename_pattern: DEFAULT_FILENAME_PATTERN.into(),
            classes: BTreeMap::new(),
            fit_to_device: true,
        }
    }
}

impl AppConfig {
    /// Build validated scan settings for an already resolved paper source.
    pub fn scan_settings(&self, source: InputSource) -> Result<ScanSettings> {
        ScanSettings::new(
            self.resolution_dpi,
            self.color_mode,
            self.page_size.clone(),
            source,
            self.duplex,
        )
    }

    /// Expand the file name pattern for a scan taken at `when`.
    ///
    /// Spaces in class and topic become underscores.  When the topic is empty
    /// the separator left in front of it is dropped, and the name always ends
    /// in `.pdf`.
    pub fn output_file_name(&self, when: NaiveDateTime, class: &str, topic: &str) -> String {
        let pattern = match self.filename_pattern.trim() {
            "" => DEFAULT_FILENAME_PATTERN,
            pattern => pattern,
        };
        let class = match class.trim() {
            "" => DEFAULT_CLASS.to_string(),
            class => class.replace(' ', "_"),
        };
        let topic = topic.trim().replace(' ', "_");

        let mut name = pattern
            .replace("{class}", &class)
            .replace("{date}", &when.format("%Y-%m-%d").to_string())
            .replace("{time}", &when.format("%H-%M-%S").to_string())
            .replace("{topic}", &topic)
            .replace("{ext}", OUTPUT_EXTENSION);

        if topic.is_empty() && pattern.contains("{topic}") {
            let (stem, suffix) = split_extension(&name);
            let stem = stem.trim_end_matches(['_', '-']);
            name = if suffix.is_empty() {
                format!("{stem}.{OUTPUT_EXTENSION}")
            } else {
                format!("{stem}{suffix}")
            };
        }

        if !name
            .to_ascii_lowercase()
            .ends_with(&format!(".{OUTPUT_EXTENSION}"))
        {
            name = format!("{name}.{OUTPUT_EXTENSION}");
        }
        name
    }

    /// Where a scan taken at `when` is saved when no path is given.
    ///
    /// With a class the file goes into that class's folder; without one it
    /// goes into the current directory.
    pub fn output_path(&self, when: NaiveDateTime, class: Option<&str>, topic: &str) -> Result<PathBuf> {
        match class {
            Some(class) => {
                let dir = self.classes.get(class).ok_or_else(|| {
                    ScanwerkError::InvalidSettings(format!("unknown document class '{class}'"))
                })?;
                Ok(dir.join(self.output_file_name(when, class, topic)))
            }
            None => Ok(PathBuf::from(self.output_file_name(when, DEFAULT_CLASS, topic))),
        }
    }
}

/// Split `name` into stem and extension (with its dot). Leading dots of the
/// file name are not an extension.
fn split_extension(name: &str) -> (&str, &str) {
    let file_start = name.rfind('/').map_or(0, |i| i + 1);
    match name[file_start..].rfind('.') {
        Some(dot) if dot > 0 => name.split_at(file_start + dot),
        _ => (name, ""),
    }
}
