//! edqm-usp command line interface
//!
//! # Usage
//!
//! ```bash
//! # Fetch every document for two EDQM codes
//! edqm-usp download edqm Y0001532 G0400006
//!
//! # Certificates only, one archive per code, then upload
//! edqm-usp download usp 1134357 --doc COA,COO --bundle position --upload
//!
//! # Mirror the local tree to Yandex Disk
//! edqm-usp upload all
//!
//! # Inspect what has been downloaded
//! edqm-usp list edqm
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;

use edqm_usp::bundle::{self, Bundle, BundleMode};
use edqm_usp::config::Config;
use edqm_usp::error::UploadError;
use edqm_usp::pipeline::{retrieve_all, CodeStatus, DocumentStatus, RunSummary};
use edqm_usp::sources;
use edqm_usp::types::{DocumentKind, Source, UploadScope};
use edqm_usp::upload::{collect_files, UploadReport, Uploader};

#[derive(Parser)]
#[command(name = "edqm-usp")]
#[command(version)]
#[command(about = "Download COA, MSDS and COO documents from EDQM and USP, bundle them and upload to Yandex Disk")]
#[command(long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Root of the download tree
    #[arg(long, global = true, env = "DOWNLOAD_DIR")]
    download_dir: Option<PathBuf>,

    /// Output format: json or pretty (default)
    #[arg(long, short = 'o', global = true, default_value = "pretty", value_enum)]
    format: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, short, global = true)]
    quiet: bool,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Json,
    Pretty,
}

#[derive(Subcommand)]
enum Commands {
    /// Look up catalogue codes and download their documents
    Download {
        /// Catalogue: edqm or usp
        source: Source,

        /// Catalogue codes (space or comma separated)
        #[arg(required = true, value_delimiter = ',')]
        codes: Vec<String>,

        /// Document types to fetch: COA, MSDS, COO (default: all)
        #[arg(long = "doc", value_delimiter = ',')]
        docs: Vec<DocumentKind>,

        /// Packaging: single, position or batch
        #[arg(long, default_value = "single")]
        bundle: BundleMode,

        /// Upload the source directory afterwards
        #[arg(long)]
        upload: bool,
    },

    /// Upload downloaded files to Yandex Disk
    Upload {
        /// Scope: all, edqm or usp
        #[arg(default_value = "all")]
        scope: UploadScope,
    },

    /// List downloaded files
    List {
        /// Scope: all, edqm or usp
        #[arg(default_value = "all")]
        scope: UploadScope,
    },

    /// Verify the Yandex Disk token
    CheckToken,
}

// =============================================================================
// MAIN
// =============================================================================

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.quiet {
        tracing::Level::WARN
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    match run(&cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            if cli.format == OutputFormat::Json {
                println!("{}", serde_json::json!({ "error": format!("{:#}", e) }));
            } else {
                eprintln!("{}: {:#}", "error".red().bold(), e);
            }
            ExitCode::FAILURE
        }
    }
}

/// Ok(false) when the command ran but the outcome counts as failure
async fn run(cli: &Cli) -> Result<bool> {
    let mut config = Config::from_env().context("Invalid configuration")?;
    if let Some(dir) = &cli.download_dir {
        config = config.with_download_dir(dir);
    }

    match &cli.command {
        Commands::Download {
            source,
            codes,
            docs,
            bundle,
            upload,
        } => cmd_download(&config, *source, codes, docs, *bundle, *upload, cli).await,
        Commands::Upload { scope } => cmd_upload(&config, *scope, cli).await,
        Commands::List { scope } => cmd_list(&config, *scope, cli.format),
        Commands::CheckToken => cmd_check_token(&config, cli.format).await,
    }
}

// =============================================================================
// COMMAND IMPLEMENTATIONS
// =============================================================================

async fn cmd_download(
    config: &Config,
    source: Source,
    codes: &[String],
    kinds: &[DocumentKind],
    mode: BundleMode,
    upload: bool,
    cli: &Cli,
) -> Result<bool> {
    let adapter = sources::from_config(source, config)?;
    let summary = retrieve_all(adapter.as_ref(), codes, kinds).await;

    let packaged = bundle::bundle(mode, source, &summary.file_sets(), &config.archive_dir(source))
        .context("Failed to bundle downloaded files")?;

    let uploaded = if upload {
        Some(upload_scope(config, source.into()).await)
    } else {
        None
    };

    let upload_ok = match &uploaded {
        Some(Ok(report)) => report.is_success(),
        Some(Err(_)) => false,
        None => true,
    };

    match cli.format {
        OutputFormat::Json => {
            let upload_json = match &uploaded {
                Some(Ok(report)) => serde_json::to_value(report)?,
                Some(Err(e)) => serde_json::json!({ "error": e.to_string() }),
                None => serde_json::Value::Null,
            };
            let output = serde_json::json!({
                "summary": summary,
                "bundle": packaged,
                "upload": upload_json,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Pretty => {
            print_summary(&summary, cli.quiet);
            print_bundle(&packaged, cli.quiet);
            match &uploaded {
                Some(Ok(report)) => print_upload(report, cli.quiet),
                Some(Err(e)) => eprintln!("{}: {}", "upload".red().bold(), e),
                None => {}
            }
        }
    }

    Ok(summary.all_resolved() && upload_ok)
}

async fn cmd_upload(config: &Config, scope: UploadScope, cli: &Cli) -> Result<bool> {
    let report = upload_scope(config, scope).await?;
    match cli.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Pretty => print_upload(&report, cli.quiet),
    }
    Ok(report.is_success())
}

async fn upload_scope(config: &Config, scope: UploadScope) -> Result<UploadReport, UploadError> {
    let uploader = Uploader::from_config(config, scope)?;
    uploader.upload(&config.download_dir, scope).await
}

fn cmd_list(config: &Config, scope: UploadScope, format: OutputFormat) -> Result<bool> {
    let mut entries = Vec::new();
    for source in scope.sources() {
        let dir = config.source_dir(source);
        if !dir.is_dir() {
            continue;
        }
        for path in collect_files(&dir).with_context(|| format!("Cannot list {}", dir.display()))? {
            let bytes = std::fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
            let relative = path
                .strip_prefix(&config.download_dir)
                .unwrap_or(&path)
                .to_path_buf();
            entries.push((source, relative, bytes));
        }
    }

    match format {
        OutputFormat::Json => {
            let files: Vec<_> = entries
                .iter()
                .map(|(source, path, bytes)| {
                    serde_json::json!({ "source": source, "path": path, "bytes": bytes })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&files)?);
        }
        OutputFormat::Pretty => {
            if entries.is_empty() {
                println!("No downloaded files under {}", config.download_dir.display());
            }
            for (_, path, bytes) in &entries {
                println!("  {:>10}  {}", format_bytes(*bytes).dimmed(), path.display());
            }
        }
    }
    Ok(true)
}

async fn cmd_check_token(config: &Config, format: OutputFormat) -> Result<bool> {
    let uploader = Uploader::from_config(config, UploadScope::All)?;
    let info = uploader.connect(UploadScope::All).await?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&info)?),
        OutputFormat::Pretty => {
            println!(
                "{} Token accepted{}",
                "OK".green().bold(),
                info.login
                    .as_deref()
                    .map(|l| format!(" for {}", l.bold()))
                    .unwrap_or_default()
            );
            if let (Some(used), Some(total)) = (info.used_space, info.total_space) {
                println!("  {} of {} used", format_bytes(used), format_bytes(total));
            }
            println!("  Upload path: {}", uploader.remote_base());
        }
    }
    Ok(true)
}

// =============================================================================
// OUTPUT
// =============================================================================

fn print_summary(summary: &RunSummary, quiet: bool) {
    for code in &summary.codes {
        let marker = match code.status {
            CodeStatus::Complete => "OK".green().bold(),
            CodeStatus::Partial => "PARTIAL".yellow().bold(),
            CodeStatus::Failed => "FAIL".red().bold(),
        };
        println!("{} {} {}", marker, code.source, code.code.bold());

        if let Some(error) = &code.error {
            println!("    {}", error.red());
        }
        if quiet {
            continue;
        }
        for doc in &code.documents {
            match &doc.status {
                DocumentStatus::Saved { file } => println!(
                    "    {:<5} {} ({})",
                    doc.kind.to_string(),
                    file.name.green(),
                    format_bytes(file.len)
                ),
                DocumentStatus::Missing { reason } => {
                    println!("    {:<5} {}", doc.kind.to_string(), reason.dimmed())
                }
                DocumentStatus::Failed { error } => {
                    println!("    {:<5} {}", doc.kind.to_string(), error.red())
                }
            }
        }
    }

    println!(
        "\n{}: {} complete, {} partial, {} failed, {} files",
        "Summary".bold(),
        summary.complete,
        summary.partial,
        summary.failed,
        summary.files
    );
}

fn print_bundle(bundle: &Bundle, quiet: bool) {
    match bundle {
        Bundle::Archives(paths) => {
            println!("{} {} archive(s)", "Bundled".cyan(), paths.len());
            if !quiet {
                for path in paths {
                    println!("    {}", path.display());
                }
            }
        }
        Bundle::Batch(path) => println!("{} {}", "Bundled".cyan(), path.display()),
        Bundle::Files(_) | Bundle::Empty => {}
    }
}

fn print_upload(report: &UploadReport, quiet: bool) {
    if !quiet {
        for file in &report.uploaded {
            println!("    {} -> {}", file.local.display(), file.remote.dimmed());
        }
    }
    for source in &report.skipped {
        println!("{} no local {} directory", "SKIP".yellow(), source);
    }
    for failed in &report.failed {
        println!("{} {}: {}", "FAIL".red().bold(), failed.local.display(), failed.error);
    }
    let marker = if report.is_success() {
        "OK".green().bold()
    } else {
        "FAIL".red().bold()
    };
    println!(
        "{} Uploaded {} file(s), {} failed",
        marker,
        report.uploaded.len(),
        report.failed.len()
    );
}

fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} B", bytes)
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}
