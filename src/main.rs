use std::{
    path::{Path, PathBuf},
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info};
use tokio::signal;
use voter_roll_extract::{
    config::{ConfigLoader, ExtractConfig, OcrEngineKind},
    ocr::OcrEngineWrapper,
    text::TextParser,
    worker_pool,
};

/// Voter roll extractor - turns scanned electoral-roll PDFs into voter records
#[derive(Parser, Debug)]
#[command(name = "voter_roll_extract")]
#[command(about = "Extract voter records from scanned electoral-roll PDFs", long_about = None)]
struct Args {
    /// Configuration file (.toml or .json); built-in defaults when omitted
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// Directory containing the PDF files (overrides input.dir)
    #[arg(short = 'i', long)]
    input: Option<PathBuf>,

    /// Directory for JSON/spreadsheet output (overrides output.dir)
    #[arg(short = 'o', long)]
    output: Option<PathBuf>,

    /// Number of documents processed concurrently (overrides workers)
    #[arg(short = 'w', long)]
    workers: Option<usize>,

    /// OCR backend (overrides ocr.engine)
    #[arg(short = 'e', long, value_enum)]
    engine: Option<OcrEngineKind>,

    /// Trace-level logging for this crate
    #[arg(short = 'v', long, default_value = "false")]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    env_logger::builder()
        .filter(None, log::LevelFilter::Info)
        .filter(
            Some("voter_roll_extract"),
            if args.verbose {
                log::LevelFilter::Trace
            } else {
                log::LevelFilter::Debug
            },
        )
        .parse_default_env()
        .init();

    let config = load_config(&args)?;
    let documents = collect_documents(&config.input.dir)?;
    if documents.is_empty() {
        info!("No PDF files in {}", config.input.dir.display());
        return Ok(());
    }
    info!(
        "Found {} PDF files in {}",
        documents.len(),
        config.input.dir.display()
    );

    let should_quit = Arc::new(AtomicBool::new(false));
    let should_quit_batch = should_quit.clone();

    let mut batch = tokio::task::spawn_blocking(move || -> Result<Vec<worker_pool::DocumentReport>> {
        let parser = TextParser::from_config(&config.text).context("loading text tables")?;
        Ok(worker_pool::run_batch(
            &config,
            &parser,
            &documents,
            &should_quit_batch,
            || OcrEngineWrapper::from_config(&config.ocr),
        ))
    });

    // Ctrl-C stops new documents from starting; running ones finish
    let reports = tokio::select! {
        result = &mut batch => result??,
        result = signal::ctrl_c() => {
            match result {
                Ok(()) => {
                    info!("Received Ctrl-C, finishing documents in progress...");
                    should_quit.store(true, Ordering::SeqCst);
                }
                Err(err) => {
                    error!("Unable to listen for shutdown signal: {}", err);
                }
            }
            batch.await??
        }
    };

    if worker_pool::summarize(&reports) {
        anyhow::bail!("All {} documents failed", reports.len());
    }
    info!("Done");

    Ok(())
}

fn load_config(args: &Args) -> Result<ExtractConfig> {
    let mut config = match &args.config {
        Some(path) => ConfigLoader::load_from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => ExtractConfig::default(),
    };

    if let Some(input) = &args.input {
        config.input.dir = input.clone();
    }
    if let Some(output) = &args.output {
        config.output.dir = output.clone();
    }
    if let Some(workers) = args.workers {
        config.workers = workers;
    }
    if let Some(engine) = args.engine {
        config.ocr.engine = engine;
    }

    config.validate()?;
    Ok(config)
}

/// `*.pdf` files directly inside `dir`, sorted by name.
fn collect_documents(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut documents = Vec::new();
    for entry in std::fs::read_dir(dir).with_context(|| format!("reading {}", dir.display()))? {
        let path = entry?.path();
        let is_pdf = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("pdf"));
        if is_pdf && path.is_file() {
            documents.push(path);
        }
    }
    documents.sort();
    Ok(documents)
}
