// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Async eSCL client for network scanners.
//
// A scan is a job resource on the device:
//   - POST   <base>/ScanJobs               create a job (409 = busy)
//   - GET    <job>/NextDocument            stream the finished PDF
//   - DELETE <job>                         release the job
//   - GET    <base>/ScannerStatus          opaque status document
//   - GET    <base>/ScanJobs               job list (optional)
//
// Each client is bound to one device endpoint and holds no other state.

use std::fmt;
use std::time::Duration;

use reqwest::header::{ACCEPT, CONTENT_TYPE, LOCATION};
use reqwest::{Client, Response};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, error, info, instrument, warn};
use url::Url;

use scanwerk_core::error::{Result, ScanwerkError};
use scanwerk_core::types::{InputSource, PDF_MIME, ScanSettings, SourceOverride};

use crate::request::scan_settings_xml;
use crate::retry::{BusyRetryPolicy, Disposition, classify_status};
use crate::source;
use crate::status::{StatusReport, parse_elements};

/// Timeout for one job submission.
pub const SUBMIT_TIMEOUT: Duration = Duration::from_secs(30);
/// Timeout for downloading a finished document.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(120);
/// Timeout for releasing a job.
pub const RELEASE_TIMEOUT: Duration = Duration::from_secs(5);
/// Timeout for status, capability and job-list queries.
pub const STATUS_TIMEOUT: Duration = Duration::from_secs(10);

/// Largest slice handed to the sink in one write.
pub const FETCH_CHUNK_SIZE: usize = 64 * 1024;

/// Well-known eSCL root on the device.
const ESCL_ROOT: &str = "eSCL/";

/// Device-issued reference to a submitted scan job.
///
/// Not `Clone`: [`EsclClient::fetch`] and [`EsclClient::release`] take it by
/// value, so a released handle cannot be used again.
#[derive(Debug, PartialEq, Eq)]
pub struct JobHandle {
    uri: Url,
}

impl JobHandle {
    /// Absolute job URI.
    pub fn uri(&self) -> &Url {
        &self.uri
    }

    fn next_document_uri(&self) -> Result<Url> {
        let raw = format!("{}/NextDocument", self.uri.as_str().trim_end_matches('/'));
        Url::parse(&raw)
            .map_err(|e| ScanwerkError::MalformedAcceptance(format!("job URI '{raw}': {e}")))
    }
}

impl fmt::Display for JobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.uri)
    }
}

/// An accepted job together with the settings the device accepted it under
/// (which differ from the request when the source fallback kicked in).
#[derive(Debug)]
pub struct Submission {
    pub handle: JobHandle,
    pub settings: ScanSettings,
}

/// Result of a one-shot [`EsclClient::scan`].
#[derive(Debug, Clone)]
pub struct ScanOutcome {
    /// Settings actually applied.
    pub settings: ScanSettings,
    /// Bytes written to the sink.
    pub bytes: u64,
}

/// Summary of a job as listed by the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteJobInfo {
    /// Job URI as published by the device (usually relative).
    pub uri: String,
    /// `pwg:JobState` keyword, e.g. "Processing" or "Completed".
    pub state: String,
}

/// eSCL client bound to a single scanner.
#[derive(Debug, Clone)]
pub struct EsclClient {
    /// `<origin>/eSCL/`, always ending in a slash.
    base: Url,
    http: Client,
    retry: BusyRetryPolicy,
}

impl EsclClient {
    /// Create a client for a scanner host.
    ///
    /// Accepts a bare host or IP (`192.168.1.6`), `host:port`, or a full
    /// `http(s)://` URL.  The eSCL root is appended unless already present.
    pub fn new(host: &str) -> Result<Self> {
        let base = escl_base(host)?;
        // Scanners live on the local network; never route them through a proxy.
        let http = Client::builder()
            .no_proxy()
            .build()
            .map_err(|e| ScanwerkError::Transport(format!("HTTP client setup: {e}")))?;

        debug!(base = %base, "eSCL client created");
        Ok(Self {
            base,
            http,
            retry: BusyRetryPolicy::default(),
        })
    }

    /// Replace the busy-retry policy.
    pub fn with_retry_policy(mut self, retry: BusyRetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// The eSCL base endpoint.
    pub fn base(&self) -> &Url {
        &self.base
    }

    pub(crate) fn endpoint(&self, path: &str) -> Result<Url> {
        self.base
            .join(path)
            .map_err(|e| ScanwerkError::InvalidEndpoint(format!("{}{path}: {e}", self.base)))
    }

    // -- Status ---------------------------------------------------------------

    /// Fetch and parse the scanner status document.
    #[instrument(skip(self), fields(base = %self.base))]
    pub async fn status(&self) -> Result<StatusReport> {
        let body = self.get_text("ScannerStatus").await?;
        Ok(StatusReport::parse(body))
    }

    /// Pick the paper source for the next job.
    pub async fn choose_input_source(&self, source_override: SourceOverride) -> InputSource {
        source::resolve(source_override, || self.status()).await
    }

    /// List the jobs the device knows about. `None` if the device does not
    /// support listing or the request fails.
    pub async fn list_jobs(&self) -> Option<Vec<RemoteJobInfo>> {
        let body = match self.get_text("ScanJobs").await {
            Ok(body) => body,
            Err(err) => {
                debug!(%err, "job list not supported");
                return None;
            }
        };

        let Some(elements) = parse_elements(&body) else {
            debug!("job list is not well-formed XML");
            return None;
        };

        let mut jobs: Vec<RemoteJobInfo> = Vec::new();
        for element in elements {
            match element.name.as_str() {
                "JobUri" => jobs.push(RemoteJobInfo {
                    uri: element.text,
                    state: "Unknown".into(),
                }),
                "JobState" => {
                    if let Some(job) = jobs.last_mut() {
                        job.state = element.text;
                    }
                }
                _ => {}
            }
        }

        debug!(count = jobs.len(), "received job list");
        Some(jobs)
    }

    // -- Submission -----------------------------------------------------------

    /// Create a scan job.
    ///
    /// Busy answers are retried per the retry policy.  If the requested source
    /// stays busy, is rejected, or the acceptance is malformed, exactly one
    /// more attempt is made on the other source (simplex when that is the
    /// platen).  If that fails too, the original error is returned.
    #[instrument(
        skip(self, settings),
        fields(source = %settings.input_source(), dpi = settings.resolution_dpi())
    )]
    pub async fn submit(&self, settings: &ScanSettings) -> Result<Submission> {
        let primary = match self.submit_with_retry(settings).await {
            Ok(handle) => {
                info!(job = %handle, "scan job accepted");
                return Ok(Submission {
                    handle,
                    settings: settings.clone(),
                });
            }
            Err(err) => err,
        };

        if !primary.allows_source_fallback() {
            error!(error = %primary, "scan job submission failed");
            return Err(primary);
        }

        let fallback = settings.with_input_source(settings.input_source().other());
        warn!(
            error = %primary,
            fallback = %fallback.input_source(),
            "requested source failed, trying the other source once"
        );

        match self.post_job(&fallback).await {
            Ok(Some(handle)) => {
                info!(job = %handle, source = %fallback.input_source(), "scan job accepted on fallback source");
                Ok(Submission {
                    handle,
                    settings: fallback,
                })
            }
            Ok(None) => {
                warn!("fallback source busy");
                Err(primary)
            }
            Err(err) => {
                warn!(%err, "fallback source failed");
                Err(primary)
            }
        }
    }

    async fn submit_with_retry(&self, settings: &ScanSettings) -> Result<JobHandle> {
        let mut attempt = 1;
        loop {
            if let Some(handle) = self.post_job(settings).await? {
                return Ok(handle);
            }
            match self.retry.next_delay(attempt) {
                Some(delay) => {
                    debug!(attempt, delay_ms = delay.as_millis() as u64, "scanner busy, retrying");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                None => return Err(ScanwerkError::DeviceBusy { attempts: attempt }),
            }
        }
    }

    /// Send one job submission. `Ok(None)` means the device is busy.
    async fn post_job(&self, settings: &ScanSettings) -> Result<Option<JobHandle>> {
        let url = self.endpoint("ScanJobs")?;
        let response = self
            .http
            .post(url.clone())
            .header(CONTENT_TYPE, "text/xml; charset=utf-8")
            .header(ACCEPT, PDF_MIME)
            .timeout(SUBMIT_TIMEOUT)
            .body(scan_settings_xml(settings))
            .send()
            .await
            .map_err(|e| ScanwerkError::Transport(format!("POST {url}: {e}")))?;

        let status = response.status();
        match classify_status(status) {
            Disposition::Busy => Ok(None),
            Disposition::Rejected => Err(rejection(response).await),
            Disposition::Accepted => {
                let location = response
                    .headers()
                    .get(LOCATION)
                    .and_then(|v| v.to_str().ok())
                    .map(str::trim)
                    .filter(|v| !v.is_empty())
                    .ok_or_else(|| {
                        ScanwerkError::MalformedAcceptance(format!(
                            "HTTP {} without a Location header",
                            status.as_u16()
                        ))
                    })?;
                self.resolve_location(location).map(Some)
            }
        }
    }

    /// Turn a `Location` header into a job handle.
    ///
    /// Absolute URIs pass through.  Relative ones are anchored at the eSCL
    /// base; a path that already starts with the base path is resolved
    /// against the origin instead of being nested twice.
    pub fn resolve_location(&self, location: &str) -> Result<JobHandle> {
        let uri = match Url::parse(location) {
            Ok(absolute) => absolute,
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                let joined = if location.starts_with(self.base.path()) {
                    self.base.join(location)
                } else {
                    self.base.join(location.trim_start_matches('/'))
                };
                joined.map_err(|e| {
                    ScanwerkError::MalformedAcceptance(format!("job location '{location}': {e}"))
                })?
            }
            Err(err) => {
                return Err(ScanwerkError::MalformedAcceptance(format!(
                    "job location '{location}': {err}"
                )));
            }
        };
        Ok(JobHandle { uri })
    }

    // -- Retrieval ------------------------------------------------------------

    /// Stream the finished document into `sink`, then release the job.
    ///
    /// The job is released on both the success and failure path; release
    /// failures are ignored.  Returns the number of bytes written.
    #[instrument(skip(self, handle, sink), fields(job = %handle))]
    pub async fn fetch<W>(&self, handle: JobHandle, sink: &mut W) -> Result<u64>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        let result = self.download(&handle, sink).await;
        if let Err(err) = &result {
            error!(%err, "document retrieval failed");
        }

        let released = self.release(handle).await;
        debug!(released, "job released");

        result
    }

    async fn download<W>(&self, handle: &JobHandle, sink: &mut W) -> Result<u64>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        let url = handle.next_document_uri()?;
        let mut response = self
            .http
            .get(url.clone())
            .header(ACCEPT, PDF_MIME)
            .timeout(FETCH_TIMEOUT)
            .send()
            .await
            .map_err(|e| ScanwerkError::Transport(format!("GET {url}: {e}")))?;

        if !response.status().is_success() {
            return Err(rejection(response).await);
        }

        let mut written: u64 = 0;
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| ScanwerkError::Transport(format!("reading {url}: {e}")))?
        {
            for piece in chunk.chunks(FETCH_CHUNK_SIZE) {
                sink.write_all(piece).await?;
                written += piece.len() as u64;
            }
        }
        sink.flush().await?;

        info!(bytes = written, "document received");
        Ok(written)
    }

    /// Best-effort job release (DELETE). Returns whether the device
    /// acknowledged it; never fails.
    pub async fn release(&self, handle: JobHandle) -> bool {
        match self
            .http
            .delete(handle.uri.clone())
            .timeout(RELEASE_TIMEOUT)
            .send()
            .await
        {
            Ok(response) => {
                let status = response.status();
                debug!(job = %handle, %status, "release answered");
                status.is_success()
            }
            Err(err) => {
                debug!(job = %handle, %err, "release failed (ignored)");
                false
            }
        }
    }

    /// Submit a job and stream its document into `sink`.
    pub async fn scan<W>(&self, settings: &ScanSettings, sink: &mut W) -> Result<ScanOutcome>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        let Submission { handle, settings } = self.submit(settings).await?;
        let bytes = self.fetch(handle, sink).await?;
        Ok(ScanOutcome { settings, bytes })
    }

    // -- Helpers --------------------------------------------------------------

    /// GET a document below the base endpoint as text.
    pub(crate) async fn get_text(&self, path: &str) -> Result<String> {
        self.get_text_with_timeout(path, STATUS_TIMEOUT).await
    }

    pub(crate) async fn get_text_with_timeout(&self, path: &str, timeout: Duration) -> Result<String> {
        let url = self.endpoint(path)?;
        let response = self
            .http
            .get(url.clone())
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| ScanwerkError::Transport(format!("GET {url}: {e}")))?;

        if !response.status().is_success() {
            return Err(rejection(response).await);
        }

        response
            .text()
            .await
            .map_err(|e| ScanwerkError::Transport(format!("reading {url}: {e}")))
    }
}

/// Build a `Rejected` error from a non-success response.
async fn rejection(response: Response) -> ScanwerkError {
    let status = response.status();
    let url = response.url().clone();
    let body = response.text().await.unwrap_or_default();
    let snippet: String = body.trim().chars().take(200).collect();

    let reason = status.canonical_reason().unwrap_or("unknown status");
    let detail = if snippet.is_empty() {
        format!("{reason} ({url})")
    } else {
        format!("{reason} ({url}): {snippet}")
    };

    ScanwerkError::Rejected {
        status: status.as_u16(),
        detail,
    }
}

/// Normalise a user-supplied host into the eSCL base endpoint.
fn escl_base(host: &str) -> Result<Url> {
    let trimmed = host.trim();
    if trimmed.is_empty() {
        return Err(ScanwerkError::InvalidEndpoint(host.to_string()));
    }

    let lower = trimmed.to_ascii_lowercase();
    let with_scheme = if lower.starts_with("http://") || lower.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("http://{trimmed}")
    };

    let mut root = Url::parse(&with_scheme)
        .map_err(|e| ScanwerkError::InvalidEndpoint(format!("{host}: {e}")))?;
    if root.host_str().is_none_or(str::is_empty) {
        return Err(ScanwerkError::InvalidEndpoint(host.to_string()));
    }

    if !root.path().ends_with('/') {
        let path = format!("{}/", root.path());
        root.set_path(&path);
    }
    if root.path().ends_with(&format!("/{ESCL_ROOT}")) {
        return Ok(root);
    }

    root.join(ESCL_ROOT)
        .map_err(|e| ScanwerkError::InvalidEndpoint(format!("{host}: {e}")))
}
