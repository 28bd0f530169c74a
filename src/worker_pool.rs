// Document-level worker pool

use std::{
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        mpsc,
    },
    thread,
};

use anyhow::{Context, Result};
use log::{debug, error, info, warn};

use crate::{
    config::ExtractConfig,
    export::Exporter,
    extractor::Extractor,
    ocr::OcrEngine,
    raster::PdfRasterizer,
    text::TextParser,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentOutcome {
    Exported(Vec<PathBuf>),
    Failed(String),
    /// Not started because a stop was requested
    Skipped,
}

#[derive(Debug, Clone)]
pub struct DocumentReport {
    pub path: PathBuf,
    pub outcome: DocumentOutcome,
}

/// Process `items` on up to `workers` threads.
///
/// `make_state` runs once per worker thread; a worker whose state fails to
/// build exits without taking units. The result has one slot per item, in
/// input order; `None` marks an item no worker picked up.
pub fn run_pool<I, S, T, FS, FP>(
    items: &[I],
    workers: usize,
    quit: &AtomicBool,
    make_state: FS,
    process: FP,
) -> Vec<Option<T>>
where
    I: Sync,
    T: Send,
    FS: Fn(usize) -> Result<S> + Sync,
    FP: Fn(&mut S, usize, &I) -> T + Sync,
{
    let mut results: Vec<Option<T>> = items.iter().map(|_| None).collect();
    if items.is_empty() {
        return results;
    }

    let workers = workers.clamp(1, items.len());
    let cursor = AtomicUsize::new(0);
    let (tx, rx) = mpsc::channel::<(usize, T)>();

    thread::scope(|scope| {
        for worker_id in 0..workers {
            let tx = tx.clone();
            let (cursor, make_state, process) = (&cursor, &make_state, &process);

            scope.spawn(move || {
                let mut state = match make_state(worker_id) {
                    Ok(state) => state,
                    Err(e) => {
                        error!("Worker {worker_id} failed to start: {e:#}");
                        return;
                    }
                };
                debug!("Worker {worker_id} started");

                loop {
                    if quit.load(Ordering::SeqCst) {
                        debug!("Worker {worker_id} received quit signal");
                        break;
                    }
                    let index = cursor.fetch_add(1, Ordering::SeqCst);
                    let Some(item) = items.get(index) else {
                        break;
                    };
                    let result = process(&mut state, worker_id, item);
                    if tx.send((index, result)).is_err() {
                        break;
                    }
                }
                debug!("Worker {worker_id} stopped");
            });
        }
        drop(tx);

        for (index, result) in rx {
            results[index] = Some(result);
        }
    });

    results
}

/// Extract and export every document, one OCR engine per worker.
pub fn run_batch<E, F>(
    config: &ExtractConfig,
    parser: &TextParser,
    documents: &[PathBuf],
    quit: &AtomicBool,
    make_engine: F,
) -> Vec<DocumentReport>
where
    E: OcrEngine,
    F: Fn() -> crate::Result<E> + Sync,
{
    info!(
        "Processing {} documents with {} workers",
        documents.len(),
        config.workers.min(documents.len().max(1))
    );

    let outcomes = run_pool(
        documents,
        config.workers,
        quit,
        |worker_id| {
            let engine = make_engine()
                .with_context(|| format!("initializing OCR engine for worker {worker_id}"))?;
            Ok(Extractor::new(config, parser, engine))
        },
        |extractor, worker_id, path| {
            info!("Worker {worker_id}: {}", path.display());
            match process_document(extractor, config, path) {
                Ok(paths) => DocumentOutcome::Exported(paths),
                Err(e) => {
                    error!("{}: {e:#}", path.display());
                    DocumentOutcome::Failed(format!("{e:#}"))
                }
            }
        },
    );

    let stopped = quit.load(Ordering::SeqCst);
    documents
        .iter()
        .zip(outcomes)
        .map(|(path, outcome)| DocumentReport {
            path: path.clone(),
            outcome: outcome.unwrap_or_else(|| {
                if stopped {
                    DocumentOutcome::Skipped
                } else {
                    DocumentOutcome::Failed("no worker could start".to_string())
                }
            }),
        })
        .collect()
}

/// Rasterize, extract and export one PDF.
pub fn process_document<E: OcrEngine>(
    extractor: &mut Extractor<'_, E>,
    config: &ExtractConfig,
    path: &Path,
) -> Result<Vec<PathBuf>> {
    let raster = PdfRasterizer::open(path, config.input.dpi)
        .with_context(|| format!("opening {}", path.display()))?;
    let label = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    let extraction = extractor
        .extract_document(&raster, &label)
        .with_context(|| format!("extracting {}", path.display()))?;

    if extraction.stats.records == 0 {
        warn!("{label}: no records extracted");
    }

    Exporter::new(&config.output)
        .export(path, &extraction.pages)
        .with_context(|| format!("{label} [export]"))
}

/// Log one line per document; true when every document failed.
pub fn summarize(reports: &[DocumentReport]) -> bool {
    let mut failed = 0;
    for report in reports {
        match &report.outcome {
            DocumentOutcome::Exported(paths) => {
                info!("OK      {} -> {} files", report.path.display(), paths.len())
            }
            DocumentOutcome::Failed(reason) => {
                failed += 1;
                warn!("FAILED  {}: {reason}", report.path.display());
            }
            DocumentOutcome::Skipped => info!("SKIPPED {}", report.path.display()),
        }
    }
    !reports.is_empty() && failed == reports.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn results_keep_input_order() {
        let items: Vec<u32> = (0..50).collect();
        let quit = AtomicBool::new(false);

        let results = run_pool(&items, 4, &quit, |_| Ok(0usize), |seen, _, item| {
            *seen += 1;
            item * 2
        });

        let doubled: Vec<u32> = results.into_iter().map(|r| r.unwrap()).collect();
        assert_eq!(doubled, (0..50).map(|i| i * 2).collect::<Vec<_>>());
    }

    #[test]
    fn state_is_built_once_per_worker() {
        let items: Vec<u32> = (0..20).collect();
        let quit = AtomicBool::new(false);
        let built = AtomicUsize::new(0);

        run_pool(
            &items,
            3,
            &quit,
            |_| {
                built.fetch_add(1, Ordering::SeqCst);
                Ok(())
            },
            |_, _, item| *item,
        );

        assert_eq!(built.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn quit_before_start_processes_nothing() {
        let items = vec!["a", "b"];
        let quit = AtomicBool::new(true);
        let results = run_pool(&items, 2, &quit, |_| Ok(()), |_, _, s| s.len());
        assert!(results.iter().all(Option::is_none));
    }

    #[test]
    fn failing_worker_leaves_work_to_others() {
        let items: Vec<u32> = (0..10).collect();
        let quit = AtomicBool::new(false);
        let results = run_pool(
            &items,
            2,
            &quit,
            |worker_id| {
                if worker_id == 0 {
                    Err(anyhow!("no model"))
                } else {
                    Ok(())
                }
            },
            |_, _, item| *item,
        );
        assert!(results.iter().all(Option::is_some));
    }

    #[test]
    fn summary_flags_total_failure_only() {
        let report = |outcome| DocumentReport {
            path: PathBuf::from("a.pdf"),
            outcome,
        };
        assert!(summarize(&[report(DocumentOutcome::Failed("x".into()))]));
        assert!(!summarize(&[
            report(DocumentOutcome::Failed("x".into())),
            report(DocumentOutcome::Exported(vec![])),
        ]));
        assert!(!summarize(&[]));
    }
}
