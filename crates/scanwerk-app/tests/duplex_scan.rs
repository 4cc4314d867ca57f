// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// End-to-end scan service tests against a fake scanner serving real PDFs.

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use axum::extract::State;
use axum::http::header::LOCATION;
use axum::http::{Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use lopdf::{Dictionary, Document, Object, StringFormat};

use scanwerk_app::services::scan_service::hash_file;
use scanwerk_app::services::{AutoGate, Pass, PassGate, ScanRequest, ScanService};
use scanwerk_core::error::ScanwerkError;
use scanwerk_core::types::{ColorMode, InputSource, SourceOverride};
use scanwerk_escl::probe::PROBE_TIMEOUT;
use scanwerk_escl::{BusyRetryPolicy, EsclClient};

/// A PDF whose pages carry a `/Label` entry.
fn labelled_pdf(labels: &[&str]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let mut kids = Vec::new();
    for label in labels {
        let mut page = Dictionary::new();
        page.set("Type", Object::Name(b"Page".to_vec()));
        page.set("Parent", Object::Reference(pages_id));
        page.set(
            "Label",
            Object::String(label.as_bytes().to_vec(), StringFormat::Literal),
        );
        kids.push(Object::Reference(doc.add_object(Object::Dictionary(page))));
    }

    let mut pages = Dictionary::new();
    pages.set("Type", Object::Name(b"Pages".to_vec()));
    pages.set("Count", Object::Integer(kids.len() as i64));
    pages.set(
        "MediaBox",
        Object::Array(vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Integer(595),
            Object::Integer(842),
        ]),
    );
    pages.set("Kids", Object::Array(kids));
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let mut catalog = Dictionary::new();
    catalog.set("Type", Object::Name(b"Catalog".to_vec()));
    catalog.set("Pages", Object::Reference(pages_id));
    let catalog_id = doc.add_object(Object::Dictionary(catalog));
    doc.trailer.set("Root", Object::Reference(catalog_id));

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}

fn labels(path: &Path) -> Vec<String> {
    let doc = Document::load(path).unwrap();
    doc.get_pages()
        .into_values()
        .map(|id| {
            match doc.get_dictionary(id).unwrap().get(b"Label").unwrap() {
                Object::String(bytes, _) => String::from_utf8(bytes.clone()).unwrap(),
                other => panic!("unexpected label {other:?}"),
            }
        })
        .collect()
}

struct ScannerState {
    /// One document per accepted job, in submission order.
    documents: VecDeque<Vec<u8>>,
    jobs: u32,
    bodies: Vec<String>,
    deletes: Vec<String>,
}

#[derive(Clone)]
struct FakeScanner {
    state: Arc<Mutex<ScannerState>>,
    /// How long the capabilities endpoint takes before answering 404.
    capabilities_delay: Duration,
}

impl FakeScanner {
    fn new(documents: Vec<Vec<u8>>) -> Self {
        Self {
            state: Arc::new(Mutex::new(ScannerState {
                documents: documents.into(),
                jobs: 0,
                bodies: Vec::new(),
                deletes: Vec::new(),
            })),
            capabilities_delay: Duration::ZERO,
        }
    }

    fn slow_capabilities(mut self, delay: Duration) -> Self {
        self.capabilities_delay = delay;
        self
    }

    fn bodies(&self) -> Vec<String> {
        self.state.lock().unwrap().bodies.clone()
    }

    fn deletes(&self) -> Vec<String> {
        self.state.lock().unwrap().deletes.clone()
    }

    async fn serve(&self) -> SocketAddr {
        let app = Router::new().fallback(handle).with_state(self.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr
    }
}

async fn handle(State(scanner): State<FakeScanner>, method: Method, uri: Uri, body: String) -> Response {
    let path = uri.path();

    if method == Method::GET && path == "/eSCL/ScannerCapabilities" {
        tokio::time::sleep(scanner.capabilities_delay).await;
        return StatusCode::NOT_FOUND.into_response();
    }

    let mut state = scanner.state.lock().unwrap();

    if method == Method::POST && path == "/eSCL/ScanJobs" {
        state.bodies.push(body);
        state.jobs += 1;
        let location = format!("/eSCL/ScanJobs/{}", state.jobs);
        return (StatusCode::CREATED, [(LOCATION, location)]).into_response();
    }

    if method == Method::DELETE {
        state.deletes.push(path.to_string());
        return StatusCode::OK.into_response();
    }

    if method == Method::GET && path.ends_with("/NextDocument") {
        return match state.documents.pop_front() {
            Some(document) => (StatusCode::OK, document).into_response(),
            None => StatusCode::NOT_FOUND.into_response(),
        };
    }

    if method == Method::GET && path == "/eSCL/ScannerStatus" {
        return (
            StatusCode::OK,
            "<scan:ScannerStatus xmlns:scan=\"s\" xmlns:pwg=\"p\">\
             <pwg:State>Idle</pwg:State></scan:ScannerStatus>",
        )
            .into_response();
    }

    StatusCode::NOT_FOUND.into_response()
}

fn client(addr: SocketAddr) -> EsclClient {
    EsclClient::new(&format!("127.0.0.1:{}", addr.port()))
        .unwrap()
        .with_retry_policy(BusyRetryPolicy {
            max_attempts: 2,
            interval: Duration::from_millis(5),
        })
}

fn service(addr: SocketAddr) -> ScanService {
    ScanService::new(client(addr))
}

fn request() -> ScanRequest {
    ScanRequest {
        source: SourceOverride::Auto,
        resolution_dpi: 300,
        color_mode: ColorMode::Color,
        page_size: "A4".into(),
        duplex: true,
        fit_to_device: true,
    }
}

struct Decline;

impl PassGate for Decline {
    fn ready_for_next_pass(&mut self, _pass: Pass) -> bool {
        false
    }
}

#[tokio::test]
async fn manual_duplex_merges_both_passes() {
    let scanner = FakeScanner::new(vec![
        labelled_pdf(&["F1", "F2", "F3"]),
        labelled_pdf(&["B3", "B2", "B1"]),
    ]);
    let service = service(scanner.serve().await);
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("duplex.pdf");

    let result = service
        .scan_manual_duplex(&request(), &out, &mut AutoGate)
        .await
        .unwrap();

    assert_eq!(labels(&out), ["F1", "B1", "F2", "B2", "F3", "B3"]);
    assert_eq!(result.page_count, Some(6));
    assert_eq!(result.source, InputSource::Platen);
    assert_eq!(result.bytes, std::fs::metadata(&out).unwrap().len());
    assert_eq!(result.sha256, hash_file(&out).unwrap());

    let bodies = scanner.bodies();
    assert_eq!(bodies.len(), 2);
    assert!(bodies.iter().all(|b| b.contains("<pwg:Duplex>Simplex<")));
    assert_eq!(scanner.deletes().len(), 2);

    // Only the merged document is left behind.
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
}

#[tokio::test]
async fn declined_back_pass_aborts_without_output() {
    let scanner = FakeScanner::new(vec![labelled_pdf(&["F1"]), labelled_pdf(&["B1"])]);
    let service = service(scanner.serve().await);
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("duplex.pdf");

    let err = service
        .scan_manual_duplex(&request(), &out, &mut Decline)
        .await
        .unwrap_err();

    assert!(matches!(err, ScanwerkError::Aborted { pass: 2 }), "{err:?}");
    assert!(!out.exists());
    assert_eq!(scanner.bodies().len(), 1);
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn single_scan_counts_pages() {
    let scanner = FakeScanner::new(vec![labelled_pdf(&["P1", "P2"])]);
    let service = service(scanner.serve().await);
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("scan.pdf");

    let result = service.scan_to_file(&request(), &out).await.unwrap();

    assert_eq!(labels(&out), ["P1", "P2"]);
    assert_eq!(result.page_count, Some(2));
    assert_eq!(scanner.deletes(), ["/eSCL/ScanJobs/1"]);
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
}

#[tokio::test]
async fn slow_capabilities_do_not_block_the_scan() {
    // Slower than the reachability check allows.
    let scanner = FakeScanner::new(vec![labelled_pdf(&["P1"])])
        .slow_capabilities(PROBE_TIMEOUT + Duration::from_millis(500));
    let addr = scanner.serve().await;

    let service = ScanService::connect(client(addr), Some("AAAA-0001")).await;
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("scan.pdf");
    let request = ScanRequest {
        fit_to_device: false,
        ..request()
    };

    let result = service.scan_to_file(&request, &out).await.unwrap();
    assert_eq!(result.page_count, Some(1));
    assert_eq!(scanner.bodies().len(), 1);
}

#[tokio::test]
async fn missing_output_folders_are_created() {
    let scanner = FakeScanner::new(vec![
        labelled_pdf(&["P1"]),
        labelled_pdf(&["F1"]),
        labelled_pdf(&["B1"]),
    ]);
    let service = service(scanner.serve().await);
    let dir = tempfile::tempdir().unwrap();

    let single = dir.path().join("letters/2026/scan.pdf");
    service.scan_to_file(&request(), &single).await.unwrap();
    assert_eq!(labels(&single), ["P1"]);

    let duplex = dir.path().join("invoices/duplex.pdf");
    service
        .scan_manual_duplex(&request(), &duplex, &mut AutoGate)
        .await
        .unwrap();
    assert_eq!(labels(&duplex), ["F1", "B1"]);
}
