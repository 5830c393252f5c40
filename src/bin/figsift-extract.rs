//! CLI binary: extract embedded images from PDFs.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ExtractConfig` and prints results.

mod common;

use anyhow::{Context, Result};
use clap::Parser;
use common::{bold, cyan, dim, green, init_logging, red, CliProgressCallback};
use figsift::{
    extract_all, find_pdfs, inspect_document, DocumentInfo, ExtractConfig, ProgressCallback,
    SiftError,
};
use std::path::PathBuf;

const AFTER_HELP: &str = r#"EXAMPLES:
  # Every PDF in the current directory → one folder per PDF
  figsift-extract

  # Specific files, written under ./images/
  figsift-extract informe.pdf anexo.pdf --output-root images

  # Scanned negatives: invert colours while extracting
  figsift-extract --invert negativos.pdf

  # What is inside, without writing anything
  figsift-extract --list informe.pdf

OUTPUT:
  <output-root>/<pdf name without extension>/imagen_pagina{page}_{index}.{ext}

  JPEG (.jpg), JPEG 2000 (.jp2/.j2k) and JBIG2 (.jb2) streams are written
  byte-for-byte. Raw pixel data is written losslessly as .png.
"#;

/// Extract the embedded images of PDF files.
#[derive(Parser, Debug)]
#[command(
    name = "figsift-extract",
    version,
    about = "Extract every embedded image of PDF files into one folder per PDF",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// PDF files. When omitted, every *.pdf in --dir is processed.
    pdfs: Vec<PathBuf>,

    /// Directory scanned for PDFs when none are given.
    #[arg(long, env = "FIGSIFT_DIR", default_value = ".")]
    dir: PathBuf,

    /// Directory under which the per-PDF folders are created.
    #[arg(long, env = "FIGSIFT_OUTPUT_ROOT", default_value = ".")]
    output_root: PathBuf,

    /// Invert image colours before writing (re-encodes; JPEG at quality 95).
    #[arg(long, env = "FIGSIFT_INVERT")]
    invert: bool,

    /// List the images of each PDF instead of extracting them.
    #[arg(long)]
    list: bool,

    /// Print a JSON report on stdout.
    #[arg(long, env = "FIGSIFT_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "FIGSIFT_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "FIGSIFT_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "FIGSIFT_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !cli.list;
    init_logging(cli.verbose, cli.quiet, show_progress);

    // ── Resolve the PDFs to work on ──────────────────────────────────────
    let pdfs = if cli.pdfs.is_empty() {
        let found = find_pdfs(&cli.dir).context("Failed to scan for PDFs")?;
        if found.is_empty() {
            return Err(SiftError::NoPdfFound { dir: cli.dir.clone() }.into());
        }
        found
    } else {
        cli.pdfs.clone()
    };

    // ── List mode ────────────────────────────────────────────────────────
    if cli.list {
        return list(&pdfs, cli.json).await;
    }

    // ── Extract ──────────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new("Extracting", "images") as ProgressCallback)
    } else {
        None
    };

    let mut builder = ExtractConfig::builder()
        .output_root(&cli.output_root)
        .invert_colors(cli.invert);
    if let Some(cb) = progress_cb {
        builder = builder.progress_callback(cb);
    }
    let config = builder.build().context("Invalid configuration")?;

    let reports = extract_all(&pdfs, &config).await;

    if cli.json {
        let json = serde_json::to_string_pretty(&reports).context("Failed to serialise report")?;
        println!("{json}");
    } else if !cli.quiet {
        for report in &reports {
            match (&report.output, &report.error) {
                (Some(out), _) => {
                    eprintln!(
                        "{}  {}  {} images  →  {}  {}",
                        if out.errors.is_empty() { green("✔") } else { cyan("⚠") },
                        bold(&report.source.display().to_string()),
                        out.stats.images_written,
                        out.output_dir.display(),
                        dim(&format!("{}ms", out.stats.duration_ms)),
                    );
                    for err in &out.errors {
                        eprintln!("     {} {}", red("✗"), dim(&err.to_string()));
                    }
                }
                (None, Some(err)) => {
                    eprintln!(
                        "{}  {}  {}",
                        red("✘"),
                        bold(&report.source.display().to_string()),
                        red(err)
                    );
                }
                (None, None) => {}
            }
        }
    }

    let failed = reports.iter().filter(|r| r.error.is_some()).count();
    if failed > 0 {
        anyhow::bail!("{failed} of {} PDF(s) could not be extracted", reports.len());
    }
    Ok(())
}

/// Print the image summary of each PDF.
async fn list(pdfs: &[PathBuf], json: bool) -> Result<()> {
    let mut infos: Vec<DocumentInfo> = Vec::with_capacity(pdfs.len());
    for pdf in pdfs {
        let info = inspect_document(pdf)
            .await
            .with_context(|| format!("Failed to inspect {}", pdf.display()))?;
        infos.push(info);
    }

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&infos).context("Failed to serialise summary")?
        );
        return Ok(());
    }

    for info in &infos {
        println!("File:    {}", info.path.display());
        println!("Pages:   {}", info.page_count);
        println!("Images:  {}", info.images.len());
        for img in &info.images {
            println!(
                "  p{:<4} #{:<3} obj {:<6} {:>5}x{:<5} {:<24} {}",
                img.page,
                img.index,
                img.object_id,
                img.width,
                img.height,
                if img.filters.is_empty() { "-".to_string() } else { img.filters.join("+") },
                img.ext.as_deref().unwrap_or("unsupported"),
            );
        }
    }
    Ok(())
}
