// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Command-line interface: argument parsing and command dispatch.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use scanwerk_core::AppConfig;
use scanwerk_core::error::{Result, ScanwerkError};
use scanwerk_core::types::{ColorMode, InputSource, ScanResult, SourceOverride};
use scanwerk_escl::{EsclClient, ScannerCapabilities, SourceCapabilities};
use scanwerk_escl::source::{decide, gather_evidence};

use crate::services::data_dir;
use crate::services::{AutoGate, PassGate, PromptGate, ScanRequest, ScanService};

#[derive(Debug, Parser)]
#[command(name = "scanwerk", version, about = "Scan documents from network scanners over eSCL")]
pub struct Cli {
    /// Scanner host, IP address or URL (overrides the saved configuration).
    #[arg(long, env = "SCANWERK_HOST", global = true)]
    pub host: Option<String>,

    /// Log debug detail.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Scan once into a PDF
    Scan {
        /// Output file (default: the configured file name pattern)
        output: Option<PathBuf>,
        #[command(flatten)]
        naming: Naming,
        #[command(flatten)]
        options: ScanOptions,
    },
    /// Manual duplex: scan fronts, flip the stack, scan backs, merge
    Duplex {
        /// Output file (default: the configured file name pattern)
        output: Option<PathBuf>,
        #[command(flatten)]
        naming: Naming,
        #[command(flatten)]
        options: ScanOptions,
        /// Do not wait for confirmation between passes
        #[arg(short, long)]
        yes: bool,
    },
    /// Show scanner status, detected paper source and capabilities
    Status,
    /// List jobs known to the scanner
    Jobs,
    /// Save options as the new defaults and print the configuration
    Config {
        #[command(flatten)]
        options: ScanOptions,
        /// Remember the scanner's UUID and warn when another device answers
        #[arg(long)]
        expected_uuid: Option<String>,
        /// Output file name pattern; {class}, {date}, {time}, {topic} and
        /// {ext} are expanded
        #[arg(long)]
        filename_pattern: Option<String>,
        /// File a document class into a folder, as NAME=DIR (repeatable)
        #[arg(long = "add-class", value_name = "NAME=DIR", value_parser = parse_class)]
        add_classes: Vec<(String, PathBuf)>,
        /// Forget a document class (repeatable)
        #[arg(long = "remove-class", value_name = "NAME")]
        remove_classes: Vec<String>,
    },
}

/// How a scan without an explicit output path is named and filed.
#[derive(Debug, Clone, Default, Args)]
pub struct Naming {
    /// Document class; the file goes into the class folder
    #[arg(short = 'k', long)]
    pub class: Option<String>,
    /// Free-text topic for the {topic} token
    #[arg(short, long, default_value = "")]
    pub topic: String,
}

/// Scan settings that may be given on the command line.
#[derive(Debug, Clone, Default, Args)]
pub struct ScanOptions {
    /// Resolution in dpi (75-1200)
    #[arg(short, long)]
    pub resolution: Option<u32>,
    /// Colour mode; anything starting with "gray" scans in grayscale
    #[arg(short, long)]
    pub color: Option<String>,
    /// Media size name, e.g. A4 or Letter
    #[arg(long)]
    pub page_size: Option<String>,
    /// Paper source: auto, feeder or platen
    #[arg(short, long)]
    pub source: Option<SourceOverride>,
    /// Ask the feeder for two-sided capture
    #[arg(long, overrides_with = "no_duplex")]
    pub duplex: bool,
    /// Single-sided capture
    #[arg(long, overrides_with = "duplex")]
    pub no_duplex: bool,
    /// Fit settings to the scanner's advertised capabilities
    #[arg(long, overrides_with = "no_fit")]
    pub fit: bool,
    /// Use settings as given instead of fitting them to the scanner
    #[arg(long, overrides_with = "fit")]
    pub no_fit: bool,
}

impl ScanOptions {
    /// Overlay these options onto `config`.
    pub fn apply(&self, config: &mut AppConfig) {
        if let Some(dpi) = self.resolution {
            config.resolution_dpi = dpi;
        }
        if let Some(label) = &self.color {
            config.color_mode = ColorMode::from_label(label);
        }
        if let Some(page_size) = &self.page_size {
            config.page_size = page_size.clone();
        }
        if let Some(source) = self.source {
            config.source = source;
        }
        if let Some(duplex) = flag(self.duplex, self.no_duplex) {
            config.duplex = duplex;
        }
        if let Some(fit) = flag(self.fit, self.no_fit) {
            config.fit_to_device = fit;
        }
    }

    fn request(&self, config: &AppConfig) -> ScanRequest {
        let mut config = config.clone();
        self.apply(&mut config);
        ScanRequest::from_config(&config)
    }
}

/// Run a parsed command line.
pub async fn run(cli: Cli) -> Result<()> {
    let dir = data_dir::data_dir();
    let mut config = data_dir::load_config(&dir);
    if let Some(host) = &cli.host {
        config.host = Some(host.clone());
    }

    match cli.command {
        Command::Scan {
            output,
            naming,
            options,
        } => {
            let out = output_path(output, &naming, &config)?;
            let service = connect(&config).await?;
            let result = service.scan_to_file(&options.request(&config), &out).await?;
            print_result(&result);
        }
        Command::Duplex {
            output,
            naming,
            options,
            yes,
        } => {
            let out = output_path(output, &naming, &config)?;
            let service = connect(&config).await?;
            let mut auto = AutoGate;
            let mut prompt = PromptGate::stdio();
            let gate: &mut dyn PassGate = if yes { &mut auto } else { &mut prompt };
            let result = service
                .scan_manual_duplex(&options.request(&config), &out, gate)
                .await?;
            print_result(&result);
        }
        Command::Status => {
            let client = client(&config)?;
            print_status(&client, &config).await?;
        }
        Command::Jobs => {
            let client = client(&config)?;
            match client.list_jobs().await {
                Some(jobs) if jobs.is_empty() => println!("No jobs."),
                Some(jobs) => {
                    for job in jobs {
                        println!("{:<12} {}", job.state, job.uri);
                    }
                }
                None => println!("This scanner does not list its jobs."),
            }
        }
        Command::Config {
            options,
            expected_uuid,
            filename_pattern,
            add_classes,
            remove_classes,
        } => {
            options.apply(&mut config);
            if let Some(uuid) = expected_uuid {
                config.expected_uuid = Some(uuid);
            }
            if let Some(pattern) = filename_pattern {
                config.filename_pattern = pattern;
            }
            for name in remove_classes {
                if config.classes.remove(&name).is_none() {
                    eprintln!("No class named '{name}'.");
                }
            }
            config.classes.extend(add_classes);
            // Fail early on settings the scanner would reject anyway.
            config.scan_settings(InputSource::Platen)?;
            data_dir::persist_config(&dir, &config)?;
            println!("{}", serde_json::to_string_pretty(&config)?);
            println!("Saved to {}", data_dir::config_path(&dir).display());
        }
    }

    Ok(())
}

fn client(config: &AppConfig) -> Result<EsclClient> {
    let host = config.host.as_deref().ok_or_else(|| {
        ScanwerkError::InvalidEndpoint("no scanner configured (use --host or SCANWERK_HOST)".into())
    })?;
    EsclClient::new(host)
}

/// Build the scan service. The reachability check only warns.
async fn connect(config: &AppConfig) -> Result<ScanService> {
    let client = client(config)?;
    Ok(ScanService::connect(client, config.expected_uuid.as_deref()).await)
}

fn output_path(output: Option<PathBuf>, naming: &Naming, config: &AppConfig) -> Result<PathBuf> {
    match output {
        Some(path) => Ok(path),
        None => config.output_path(
            chrono::Local::now().naive_local(),
            naming.class.as_deref(),
            &naming.topic,
        ),
    }
}

/// `--flag` / `--no-flag` pair: `None` when neither was given.
fn flag(on: bool, off: bool) -> Option<bool> {
    match (on, off) {
        (true, _) => Some(true),
        (_, true) => Some(false),
        _ => None,
    }
}

fn parse_class(arg: &str) -> std::result::Result<(String, PathBuf), String> {
    match arg.split_once('=') {
        Some((name, dir)) if !name.trim().is_empty() && !dir.trim().is_empty() => {
            Ok((name.trim().to_string(), PathBuf::from(dir.trim())))
        }
        _ => Err(format!("expected NAME=DIR, got '{arg}'")),
    }
}

async fn print_status(client: &EsclClient, config: &AppConfig) -> Result<()> {
    println!("Scanner:  {}", client.base());

    let probe = client.probe(config.expected_uuid.as_deref()).await;
    if let Some(model) = &probe.make_and_model {
        println!("Model:    {model}");
    }
    match probe.verified {
        Some(true) => println!("Identity: matches saved UUID"),
        Some(false) => println!("Identity: DIFFERENT device than the saved UUID"),
        None => {}
    }

    let report = client.status().await?;
    println!("State:    {}", report.scanner_state().unwrap_or("unknown"));
    if let Some(adf) = report.adf_state() {
        println!("Feeder:   {adf}");
    }

    let evidence = gather_evidence(&report);
    let source = decide(config.source, &evidence);
    println!("Source:   {source} ({} signal(s), preference {:?})", evidence.len(), config.source);

    if let Some(caps) = ScannerCapabilities::query(client).await {
        if let Some(platen) = &caps.platen {
            print_source("Platen:", platen);
        }
        if let Some(feeder) = &caps.feeder {
            let label = if caps.feeder_duplex { "Feeder (duplex):" } else { "Feeder:" };
            print_source(label, feeder);
        }
    }

    Ok(())
}

fn print_source(label: &str, caps: &SourceCapabilities) {
    let dpi: Vec<String> = caps.resolutions.iter().map(u32::to_string).collect();
    let modes: Vec<String> = caps.color_modes.iter().map(ColorMode::to_string).collect();
    println!("{label}");
    if !dpi.is_empty() {
        println!("  dpi      {}", dpi.join(", "));
    }
    if !modes.is_empty() {
        println!("  colour   {}", modes.join(", "));
    }
}

fn print_result(result: &ScanResult) {
    println!("Saved {}", result.path.display());
    println!("  source   {}", result.source);
    println!(
        "  settings {} dpi, {}, {}",
        result.settings.resolution_dpi(),
        result.settings.color_mode(),
        result.settings.page_size()
    );
    if let Some(pages) = result.page_count {
        println!("  pages    {pages}");
    }
    println!("  size     {} bytes", result.bytes);
    println!("  sha256   {}", result.sha256);
}
