//! Local document discovery.
//!
//! A run only ever touches a configured file set: every `*.html` under the
//! input directory (minus ignored directories) plus any root-level entry
//! pages that exist. Nothing is fetched or crawled.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use pagesmith_shared::{DocumentKind, RunConfig};
use tracing::{debug, info, instrument, warn};
use walkdir::{DirEntry, WalkDir};

/// File extensions treated as documents.
const HTML_EXTENSIONS: &[&str] = &["html", "htm"];

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// One file selected for the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredDocument {
    /// Path as found on disk.
    pub path: PathBuf,
    /// Integration page (transformed) or entry page (counted only).
    pub kind: DocumentKind,
}

/// Configuration for the discovery walk.
#[derive(Debug, Clone)]
pub struct DiscoveryOptions {
    /// Directory walked recursively.
    pub input_dir: PathBuf,
    /// Extra root-level files, included when they exist.
    pub entry_pages: Vec<PathBuf>,
    /// Directory names pruned from the walk.
    pub ignore_dirs: Vec<String>,
}

impl From<&RunConfig> for DiscoveryOptions {
    fn from(config: &RunConfig) -> Self {
        Self {
            input_dir: config.input_dir.clone(),
            entry_pages: config.entry_pages.clone(),
            ignore_dirs: config.ignore_dirs.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Main entry point
// ---------------------------------------------------------------------------

/// Collect the document set: integration pages sorted by path, then entry pages.
///
/// Unreadable directory entries are logged and skipped. An empty result is not
/// an error here; the runner decides that zero documents is fatal.
#[instrument(skip_all, fields(input_dir = %opts.input_dir.display()))]
pub fn discover(opts: &DiscoveryOptions) -> Vec<DiscoveredDocument> {
    let mut documents = Vec::new();
    let mut seen = HashSet::new();

    if opts.input_dir.is_dir() {
        let walker = WalkDir::new(&opts.input_dir)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| !is_ignored_dir(e, &opts.ignore_dirs));

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(error = %e, "skipping unreadable entry");
                    continue;
                }
            };
            if entry.file_type().is_file() && is_html(entry.path()) {
                seen.insert(normalize(entry.path()));
                documents.push(DiscoveredDocument {
                    path: entry.into_path(),
                    kind: DocumentKind::Integration,
                });
            }
        }
    } else {
        warn!("input directory does not exist or is not a directory");
    }

    for page in &opts.entry_pages {
        if !page.is_file() {
            debug!(path = %page.display(), "entry page not present");
            continue;
        }
        // An entry page inside the input dir was already picked up as an integration page.
        if !seen.insert(normalize(page)) {
            continue;
        }
        documents.push(DiscoveredDocument {
            path: page.clone(),
            kind: DocumentKind::Entry,
        });
    }

    info!(
        integration = documents
            .iter()
            .filter(|d| d.kind == DocumentKind::Integration)
            .count(),
        entry = documents
            .iter()
            .filter(|d| d.kind == DocumentKind::Entry)
            .count(),
        "documents discovered"
    );

    documents
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn is_ignored_dir(entry: &DirEntry, ignore_dirs: &[String]) -> bool {
    entry.depth() > 0
        && entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| ignore_dirs.iter().any(|d| d == name))
}

fn is_html(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| HTML_EXTENSIONS.iter().any(|h| ext.eq_ignore_ascii_case(h)))
}

fn normalize(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
