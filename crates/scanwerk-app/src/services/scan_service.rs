// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scan service: turns a scan request into a finished file on disk.
//
// Single-sided scans stream straight into a temporary file next to the
// destination.  Manual duplex scans run two passes into temporary files,
// pause for the operator in between, then merge.  Either way the final path
// only ever appears complete.

use std::io::Read;
use std::path::{Path, PathBuf};

use chrono::Utc;
use sha2::{Digest, Sha256};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, instrument, warn};

use scanwerk_core::error::{Result, ScanwerkError};
use scanwerk_core::types::{ColorMode, InputSource, ScanResult, ScanSettings, SourceOverride};
use scanwerk_core::AppConfig;
use scanwerk_document::{DuplexInterleaver, PdfReader};
use scanwerk_escl::{EsclClient, ScanOutcome, ScannerCapabilities, fit_settings};

use super::pass_gate::{Pass, PassGate};

/// What the user asked for, before the paper source is known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanRequest {
    pub source: SourceOverride,
    pub resolution_dpi: u32,
    pub color_mode: ColorMode,
    pub page_size: String,
    /// Ask the feeder for two-sided capture.
    pub duplex: bool,
    /// Adjust settings to the scanner's advertised capabilities.
    pub fit_to_device: bool,
}

impl ScanRequest {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            source: config.source,
            resolution_dpi: config.resolution_dpi,
            color_mode: config.color_mode,
            page_size: config.page_size.clone(),
            duplex: config.duplex,
            fit_to_device: config.fit_to_device,
        }
    }

    fn settings_for(&self, source: InputSource) -> Result<ScanSettings> {
        ScanSettings::new(
            self.resolution_dpi,
            self.color_mode,
            self.page_size.clone(),
            source,
            self.duplex,
        )
    }
}

/// Runs scans against one scanner.
#[derive(Debug, Clone)]
pub struct ScanService {
    client: EsclClient,
}

impl ScanService {
    pub fn new(client: EsclClient) -> Self {
        Self { client }
    }

    /// Check the scanner before use and build the service either way.
    ///
    /// The check is advisory: a device that is asleep or slow to publish its
    /// capabilities may still accept jobs, and real transport failures
    /// surface from the scan itself.
    pub async fn connect(client: EsclClient, expected_uuid: Option<&str>) -> Self {
        let probe = client.probe(expected_uuid).await;
        if !probe.reachable {
            warn!(base = %client.base(), "no answer to the reachability check, trying the scan anyway");
        } else if probe.verified == Some(false) {
            warn!("the scanner at this address is not the one saved in the configuration");
        } else {
            info!(
                model = probe.make_and_model.as_deref().unwrap_or("unknown"),
                "scanner found"
            );
        }
        Self::new(client)
    }

    pub fn client(&self) -> &EsclClient {
        &self.client
    }

    /// Scan once and write the document to `out`.
    #[instrument(skip_all, fields(out = %out.display()))]
    pub async fn scan_to_file(&self, request: &ScanRequest, out: &Path) -> Result<ScanResult> {
        let source = self.client.choose_input_source(request.source).await;
        let settings = self.prepare(request, source, false).await?;

        let dir = parent_dir(out);
        tokio::fs::create_dir_all(&dir).await?;
        let temp = tempfile::NamedTempFile::new_in(&dir)?;
        let outcome = self.scan_into(&settings, temp.path()).await?;
        temp.persist(out).map_err(|err| err.error)?;

        let page_count = match PdfReader::open(out) {
            Ok(reader) => Some(reader.page_count()),
            Err(err) => {
                warn!(%err, "scanned document could not be parsed");
                None
            }
        };

        let result = finished(out, outcome.settings, outcome.bytes, page_count)?;
        info!(source = %result.source, bytes = result.bytes, "scan saved");
        Ok(result)
    }

    /// Two-pass manual duplex scan into `out`.
    ///
    /// The paper source is resolved once and reused for both passes.  `gate`
    /// is asked before the back pass; declining aborts without writing `out`.
    #[instrument(skip_all, fields(out = %out.display()))]
    pub async fn scan_manual_duplex(
        &self,
        request: &ScanRequest,
        out: &Path,
        gate: &mut dyn PassGate,
    ) -> Result<ScanResult> {
        let source = self.client.choose_input_source(request.source).await;
        if source == InputSource::Platen {
            warn!("manual duplex on the platen: every sheet has to be placed by hand");
        }
        let settings = self.prepare(request, source, true).await?;

        let dir = parent_dir(out);
        tokio::fs::create_dir_all(&dir).await?;
        let work = tempfile::tempdir_in(&dir)?;
        let front_path = work.path().join("front.pdf");
        let back_path = work.path().join("back.pdf");

        let front = self.scan_into(&settings, &front_path).await?;
        info!(source = %front.settings.input_source(), bytes = front.bytes, "front pass done");

        if !gate.ready_for_next_pass(Pass::Back) {
            info!("manual duplex cancelled before the back pass");
            return Err(ScanwerkError::Aborted {
                pass: Pass::Back.number(),
            });
        }

        // The back pass goes to whatever source the front pass really used.
        let back = self.scan_into(&front.settings, &back_path).await?;
        info!(bytes = back.bytes, "back pass done");

        let target = out.to_path_buf();
        let report = tokio::task::spawn_blocking(move || {
            DuplexInterleaver::merge_files(&front_path, &back_path, &target)
        })
        .await
        .map_err(|err| ScanwerkError::Assembly(format!("merge task failed: {err}")))??;

        // Pass files are removed with `work`.
        drop(work);

        let result = finished(out, front.settings, report.bytes, Some(report.pages))?;
        info!(pages = report.pages, bytes = result.bytes, "duplex scan saved");
        Ok(result)
    }

    /// Build settings for `source`, fitted to the device when requested.
    async fn prepare(&self, request: &ScanRequest, source: InputSource, simplex: bool) -> Result<ScanSettings> {
        let mut settings = request.settings_for(source)?;
        if simplex {
            settings = settings.simplex();
        }
        if !request.fit_to_device {
            return Ok(settings);
        }

        let Some(caps) = ScannerCapabilities::query(&self.client).await else {
            debug!("no capabilities, using settings as given");
            return Ok(settings);
        };
        let (fitted, notices) = fit_settings(&settings, &caps);
        for notice in &notices {
            warn!(
                field = %notice.field,
                from = %notice.original,
                to = %notice.corrected,
                "{}",
                notice.reason
            );
        }
        Ok(fitted)
    }

    async fn scan_into(&self, settings: &ScanSettings, path: &Path) -> Result<ScanOutcome> {
        let mut file = tokio::fs::File::create(path).await?;
        let outcome = self.client.scan(settings, &mut file).await?;
        file.sync_all().await?;
        file.shutdown().await?;
        Ok(outcome)
    }
}

fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn finished(path: &Path, settings: ScanSettings, bytes: u64, page_count: Option<usize>) -> Result<ScanResult> {
    Ok(ScanResult {
        path: path.to_path_buf(),
        source: settings.input_source(),
        settings,
        bytes,
        page_count,
        sha256: hash_file(path)?,
        completed_at: Utc::now(),
    })
}

/// SHA-256 of a file as lowercase hex, read in chunks.
pub fn hash_file(path: &Path) -> Result<String> {
    let mut file = std::fs::File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; 64 * 1024];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}
