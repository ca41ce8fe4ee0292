//! Core domain types for a Pagesmith batch run.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// RunId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper identifying one batch run (time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub Uuid);

impl RunId {
    /// Generate a new time-sortable run identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// PageRecord
// ---------------------------------------------------------------------------

/// One indexed document. Built during the index phase and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRecord {
    /// File name without directories; the record's key.
    pub filename: String,
    /// Path the document was read from.
    pub filepath: PathBuf,
    /// Link used when other pages point at this one.
    pub relative_link: String,
    /// Display title with the brand suffix removed.
    pub title: String,
    /// Source service from the filename convention.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_service: Option<String>,
    /// Target service from the filename convention.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_service: Option<String>,
}

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// Whether a discovered file is an integration page or a root entry page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Integration,
    Entry,
}

/// Which passes mutated a document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassChanges {
    pub brand: bool,
    pub title: bool,
    pub meta_description: bool,
    pub structure: bool,
    pub cta: bool,
    pub related_links: bool,
}

impl PassChanges {
    /// True if any pass mutated the document.
    pub fn any(&self) -> bool {
        self.brand
            || self.title
            || self.meta_description
            || self.structure
            || self.cta
            || self.related_links
    }
}

/// Result of processing one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DocumentOutcome {
    /// At least one pass mutated the tree. `written` is false in dry-run.
    Updated { changes: PassChanges, written: bool },
    /// Every pass reported no change.
    Unchanged,
    /// The document is not subject to the passes (entry pages).
    Skipped,
    /// Processing failed; nothing was written.
    Failed { message: String },
}

/// A `(file, error)` pair in the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureEntry {
    pub file: PathBuf,
    pub error: String,
}

/// Per-category outcome counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeTally {
    pub updated: usize,
    pub unchanged: usize,
    pub skipped: usize,
    pub failed: usize,
}

// ---------------------------------------------------------------------------
// RunStatistics
// ---------------------------------------------------------------------------

/// Counters for one run, merged by the runner from per-document outcomes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStatistics {
    pub files_processed: usize,
    pub brand_updated: usize,
    pub title_updated: usize,
    pub meta_desc_added: usize,
    pub ctas_added: usize,
    pub related_links_added: usize,
    pub structure_fixed: usize,
    /// Documents that failed during transformation, in discovery order.
    pub errors: Vec<FailureEntry>,
    /// Documents left out of the page index because they could not be read.
    pub index_failures: Vec<FailureEntry>,
    pub integration: OutcomeTally,
    pub entry: OutcomeTally,
}

impl RunStatistics {
    /// Fold one document's outcome into the counters.
    pub fn record(&mut self, file: PathBuf, kind: DocumentKind, outcome: &DocumentOutcome) {
        let tally = match kind {
            DocumentKind::Integration => &mut self.integration,
            DocumentKind::Entry => &mut self.entry,
        };

        match outcome {
            DocumentOutcome::Updated { changes, .. } => {
                tally.updated += 1;
                self.files_processed += 1;
                self.brand_updated += usize::from(changes.brand);
                self.title_updated += usize::from(changes.title);
                self.meta_desc_added += usize::from(changes.meta_description);
                self.structure_fixed += usize::from(changes.structure);
                self.ctas_added += usize::from(changes.cta);
                self.related_links_added += usize::from(changes.related_links);
            }
            DocumentOutcome::Unchanged => {
                tally.unchanged += 1;
                self.files_processed += 1;
            }
            DocumentOutcome::Skipped => {
                tally.skipped += 1;
                self.files_processed += 1;
            }
            DocumentOutcome::Failed { message } => {
                tally.failed += 1;
                self.errors.push(FailureEntry {
                    file,
                    error: message.clone(),
                });
            }
        }
    }

    /// Total documents that failed.
    pub fn failed(&self) -> usize {
        self.errors.len()
    }
}
