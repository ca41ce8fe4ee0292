//! Run report: the serializable record of one batch run.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;

use pagesmith_shared::{
    DocumentKind, DocumentOutcome, OutcomeTally, PagesmithError, Result, RunId, RunStatistics,
};

/// Outcome of one discovered document.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentReport {
    pub path: PathBuf,
    pub kind: DocumentKind,
    #[serde(flatten)]
    pub outcome: DocumentOutcome,
}

/// Everything a run did, in discovery order.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: RunId,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub dry_run: bool,
    /// Canonical brand the run rewrote towards.
    pub brand: String,
    /// Canonical site domain for that brand.
    pub domain: String,
    pub input_dir: PathBuf,
    pub documents_discovered: usize,
    /// Records in the page index.
    pub indexed: usize,
    pub statistics: RunStatistics,
    pub documents: Vec<DocumentReport>,
}

impl RunReport {
    /// Wall-clock duration of the run.
    pub fn elapsed(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }

    /// Plain-text summary for the console.
    pub fn render_text(&self) -> String {
        let s = &self.statistics;
        let mut out = String::new();

        let _ = writeln!(
            out,
            "Run {} for {} ({}){}",
            self.run_id,
            self.brand,
            self.domain,
            if self.dry_run { " (dry run)" } else { "" }
        );
        let _ = writeln!(
            out,
            "Discovered {} documents, indexed {}, in {} ms",
            self.documents_discovered,
            self.indexed,
            self.elapsed().num_milliseconds()
        );
        out.push('\n');

        let rows = [
            ("Files processed", s.files_processed),
            ("Brand updated", s.brand_updated),
            ("Titles updated", s.title_updated),
            ("Meta descriptions set", s.meta_desc_added),
            ("Structure fixed", s.structure_fixed),
            ("CTAs added", s.ctas_added),
            ("Related links added", s.related_links_added),
        ];
        for (label, value) in rows {
            let _ = writeln!(out, "  {label:<24}{value:>8}");
        }
        out.push('\n');

        let _ = writeln!(
            out,
            "  {:<14}{:>10}{:>11}{:>9}{:>8}",
            "", "updated", "unchanged", "skipped", "failed"
        );
        for (label, tally) in [("integration", &s.integration), ("entry", &s.entry)] {
            write_tally(&mut out, label, tally);
        }

        if !s.errors.is_empty() {
            let _ = writeln!(out, "\nErrors ({}):", s.errors.len());
            for e in &s.errors {
                let _ = writeln!(out, "  - {}: {}", e.file.display(), e.error);
            }
        }
        if !s.index_failures.is_empty() {
            let _ = writeln!(out, "\nNot indexed ({}):", s.index_failures.len());
            for e in &s.index_failures {
                let _ = writeln!(out, "  - {}: {}", e.file.display(), e.error);
            }
        }
        if self.dry_run {
            let _ = writeln!(out, "\nNo files were written. Run without --dry-run to apply.");
        }

        out
    }

    /// Write the report as pretty-printed JSON.
    pub fn write_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| PagesmithError::validation(format!("report serialization: {e}")))?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| PagesmithError::io(parent, e))?;
        }
        std::fs::write(path, json).map_err(|e| PagesmithError::io(path, e))
    }
}

fn write_tally(out: &mut String, label: &str, t: &OutcomeTally) {
    let _ = writeln!(
        out,
        "  {label:<14}{:>10}{:>11}{:>9}{:>8}",
        t.updated, t.unchanged, t.skipped, t.failed
    );
}
