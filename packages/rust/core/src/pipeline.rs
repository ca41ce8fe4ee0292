//! Batch runner: discovery → page index → per-document passes → report.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use pagesmith_discovery::{DiscoveredDocument, DiscoveryOptions, discover};
use pagesmith_shared::{
    DocumentKind, DocumentOutcome, PagesmithError, Result, RunConfig, RunId, RunStatistics,
    validate_config,
};

use crate::index::{IndexBuild, IndexBuilder, PageIndex};
use crate::passes::Transformer;
use crate::report::{DocumentReport, RunReport};

/// Progress callback for reporting run status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called once the number of documents to transform is known.
    fn documents_total(&self, total: usize);
    /// Called as each document's outcome is merged, in discovery order.
    fn document_processed(&self, path: &Path, outcome: &DocumentOutcome);
    /// Called when the run completes.
    fn done(&self, report: &RunReport);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn documents_total(&self, _total: usize) {}
    fn document_processed(&self, _path: &Path, _outcome: &DocumentOutcome) {}
    fn done(&self, _report: &RunReport) {}
}

/// Run every pass over the configured corpus.
///
/// 1. Discover documents (zero is fatal)
/// 2. Index every integration page
/// 3. Transform documents on a bounded blocking pool
/// 4. Merge outcomes in discovery order
///
/// Per-document failures are recorded in the report and never abort the run.
#[instrument(skip_all, fields(input_dir = %config.input_dir.display(), dry_run = config.dry_run))]
pub async fn run_batch(config: &RunConfig, progress: &dyn ProgressReporter) -> Result<RunReport> {
    let started_at = Utc::now();
    let run_id = RunId::new();
    info!(%run_id, "starting batch run");

    validate_config(config)?;
    let transformer = Arc::new(Transformer::new(config.clone())?);

    // --- Phase 1: Discovery ---
    progress.phase("Discovering documents");
    let documents = discover_documents(config)?;

    // --- Phase 2: Page index (barrier) ---
    progress.phase("Building page index");
    let IndexBuild { index, failures } = index_documents(&transformer, &documents);
    let indexed = index.len();
    let index = Arc::new(index);

    // --- Phase 3: Transform ---
    progress.phase("Transforming documents");
    progress.documents_total(documents.len());

    let semaphore = Arc::new(Semaphore::new(config.concurrency.max(1)));
    let handles: Vec<Option<JoinHandle<Result<DocumentOutcome>>>> = documents
        .iter()
        .map(|doc| match doc.kind {
            DocumentKind::Entry => None,
            DocumentKind::Integration => Some(spawn_document(
                Arc::clone(&semaphore),
                Arc::clone(&transformer),
                Arc::clone(&index),
                doc.path.clone(),
                config.dry_run,
            )),
        })
        .collect();

    // --- Phase 4: Merge ---
    let mut statistics = RunStatistics {
        index_failures: failures,
        ..RunStatistics::default()
    };
    let mut reports = Vec::with_capacity(documents.len());

    for (doc, handle) in documents.iter().zip(handles) {
        let outcome = match handle {
            None => DocumentOutcome::Skipped,
            Some(handle) => match handle.await {
                Ok(Ok(outcome)) => outcome,
                Ok(Err(e)) => DocumentOutcome::Failed {
                    message: e.to_string(),
                },
                Err(e) => DocumentOutcome::Failed {
                    message: PagesmithError::Worker(e.to_string()).to_string(),
                },
            },
        };

        match &outcome {
            DocumentOutcome::Failed { message } => {
                warn!(path = %doc.path.display(), error = %message, "document failed");
            }
            other => debug!(path = %doc.path.display(), outcome = ?other, "document done"),
        }

        progress.document_processed(&doc.path, &outcome);
        statistics.record(doc.path.clone(), doc.kind, &outcome);
        reports.push(DocumentReport {
            path: doc.path.clone(),
            kind: doc.kind,
            outcome,
        });
    }

    let report = RunReport {
        run_id,
        started_at,
        finished_at: Utc::now(),
        dry_run: config.dry_run,
        brand: config.brand_name.clone(),
        domain: config.domain.clone(),
        input_dir: config.input_dir.clone(),
        documents_discovered: documents.len(),
        indexed,
        statistics,
        documents: reports,
    };

    info!(
        run_id = %report.run_id,
        processed = report.statistics.files_processed,
        updated = report.statistics.integration.updated,
        failed = report.statistics.failed(),
        elapsed_ms = report.elapsed().num_milliseconds(),
        "batch run complete"
    );
    progress.done(&report);

    Ok(report)
}

/// Discover and index the corpus without transforming anything.
#[instrument(skip_all, fields(input_dir = %config.input_dir.display()))]
pub fn build_index(config: &RunConfig) -> Result<IndexBuild> {
    validate_config(config)?;
    let transformer = Transformer::new(config.clone())?;
    let documents = discover_documents(config)?;
    Ok(index_documents(&transformer, &documents))
}

fn discover_documents(config: &RunConfig) -> Result<Vec<DiscoveredDocument>> {
    let documents = discover(&DiscoveryOptions::from(config));
    if documents.is_empty() {
        return Err(PagesmithError::NoDocuments {
            dir: config.input_dir.clone(),
        });
    }
    Ok(documents)
}

/// Entry pages are not integration pages and stay out of the index.
fn index_documents(transformer: &Transformer, documents: &[DiscoveredDocument]) -> IndexBuild {
    let paths: Vec<PathBuf> = documents
        .iter()
        .filter(|d| d.kind == DocumentKind::Integration)
        .map(|d| d.path.clone())
        .collect();
    IndexBuilder::new(transformer.brand(), transformer.slugs()).build(&paths)
}

fn spawn_document(
    semaphore: Arc<Semaphore>,
    transformer: Arc<Transformer>,
    index: Arc<PageIndex>,
    path: PathBuf,
    dry_run: bool,
) -> JoinHandle<Result<DocumentOutcome>> {
    tokio::spawn(async move {
        let _permit = semaphore
            .acquire_owned()
            .await
            .map_err(|e| PagesmithError::Worker(e.to_string()))?;
        tokio::task::spawn_blocking(move || process_document(&transformer, &index, &path, dry_run))
            .await
            .map_err(|e| PagesmithError::Worker(e.to_string()))?
    })
}

/// Load, transform and (unless dry-run) persist one document.
fn process_document(
    transformer: &Transformer,
    index: &PageIndex,
    path: &Path,
    dry_run: bool,
) -> Result<DocumentOutcome> {
    let raw = std::fs::read_to_string(path).map_err(|e| PagesmithError::io(path, e))?;
    let result = transformer.transform(&raw, path, index)?;

    let Some(html) = result.html else {
        return Ok(DocumentOutcome::Unchanged);
    };
    if !dry_run {
        write_atomic(path, &html)?;
    }
    Ok(DocumentOutcome::Updated {
        changes: result.changes,
        written: !dry_run,
    })
}

/// Replace `path` via a sibling temp file so a crash never leaves half a document.
fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp = path.with_file_name(format!(".{name}.pagesmith.tmp"));
    let result = std::fs::write(&tmp, contents)
        .map_err(|e| PagesmithError::io(&tmp, e))
        .and_then(|()| std::fs::rename(&tmp, path).map_err(|e| PagesmithError::io(path, e)));
    if result.is_err() {
        // The temp file may not exist if the write itself failed.
        let _ = std::fs::remove_file(&tmp);
    }
    result
}
