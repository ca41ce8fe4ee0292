//! Cross-document page index.
//!
//! Built once over the whole corpus before any document is transformed, then
//! shared read-only by every worker.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use scraper::{Html, Selector};
use tracing::{debug, info, instrument, warn};

use pagesmith_document::collapse_whitespace;
use pagesmith_shared::{FailureEntry, PageRecord, PagesmithError, Result};

use crate::passes::BrandRewriter;
use crate::slug::{SlugParser, file_stem, humanize};

/// Registry of every indexed page plus groupings by service.
///
/// Groupings hold positions into the registry, so each record is stored once.
#[derive(Debug, Clone, Default)]
pub struct PageIndex {
    registry: Vec<PageRecord>,
    by_source: HashMap<String, Vec<usize>>,
    by_target: HashMap<String, Vec<usize>>,
}

impl PageIndex {
    /// Register a page under its services. Returns its registry position.
    pub fn insert(&mut self, record: PageRecord) -> usize {
        let pos = self.registry.len();
        if let Some(source) = &record.source_service {
            self.by_source.entry(source.clone()).or_default().push(pos);
        }
        if let Some(target) = &record.target_service {
            self.by_target.entry(target.clone()).or_default().push(pos);
        }
        self.registry.push(record);
        pos
    }

    /// Every record in insertion order.
    pub fn records(&self) -> &[PageRecord] {
        &self.registry
    }

    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    /// Pages whose source service is `service`, in insertion order.
    pub fn by_source<'a>(&'a self, service: &str) -> impl Iterator<Item = &'a PageRecord> + 'a {
        self.group(&self.by_source, service)
    }

    /// Pages whose target service is `service`, in insertion order.
    pub fn by_target<'a>(&'a self, service: &str) -> impl Iterator<Item = &'a PageRecord> + 'a {
        self.group(&self.by_target, service)
    }

    /// Number of distinct source services.
    pub fn source_count(&self) -> usize {
        self.by_source.len()
    }

    /// Number of distinct target services.
    pub fn target_count(&self) -> usize {
        self.by_target.len()
    }

    fn group<'a>(
        &'a self,
        groups: &'a HashMap<String, Vec<usize>>,
        service: &str,
    ) -> impl Iterator<Item = &'a PageRecord> + 'a {
        groups
            .get(service)
            .map(Vec::as_slice)
            .unwrap_or_default()
            .iter()
            .map(|&pos| &self.registry[pos])
    }
}

/// Result of indexing a corpus.
#[derive(Debug, Default)]
pub struct IndexBuild {
    pub index: PageIndex,
    /// Documents that could not be read; they are absent from the index.
    pub failures: Vec<FailureEntry>,
}

/// Turns documents into [`PageRecord`]s.
#[derive(Debug, Clone, Copy)]
pub struct IndexBuilder<'a> {
    brand: &'a BrandRewriter,
    slugs: &'a SlugParser,
}

impl<'a> IndexBuilder<'a> {
    pub fn new(brand: &'a BrandRewriter, slugs: &'a SlugParser) -> Self {
        Self { brand, slugs }
    }

    /// Read and index every path, in order. Unreadable files are recorded as
    /// failures and skipped.
    #[instrument(skip_all, fields(documents = paths.len()))]
    pub fn build(&self, paths: &[PathBuf]) -> IndexBuild {
        let mut build = IndexBuild::default();

        for path in paths {
            match self.read_record(path) {
                Ok(record) => {
                    debug!(file = %record.filename, title = %record.title, "indexed");
                    build.index.insert(record);
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "excluded from index");
                    build.failures.push(FailureEntry {
                        file: path.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        info!(
            pages = build.index.len(),
            sources = build.index.source_count(),
            targets = build.index.target_count(),
            failures = build.failures.len(),
            "page index built"
        );
        build
    }

    fn read_record(&self, path: &Path) -> Result<PageRecord> {
        let html = std::fs::read_to_string(path).map_err(|e| PagesmithError::io(path, e))?;
        self.record(path, &html)
    }

    /// Build the record for one document's markup.
    pub fn record(&self, path: &Path, html: &str) -> Result<PageRecord> {
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| PagesmithError::validation(format!("unusable file name: {}", path.display())))?
            .to_string();

        let raw_title = extract_title(html).unwrap_or_else(|| humanize(file_stem(&filename)));
        let (title, _) = self.brand.rewrite(&raw_title);
        let title = strip_brand_suffix(&title, self.brand.brand()).to_string();

        let services = self.slugs.parse(&filename);
        Ok(PageRecord {
            relative_link: format!("./{filename}"),
            filename,
            filepath: path.to_path_buf(),
            title,
            source_service: services.source,
            target_service: services.target,
        })
    }
}

/// `<title>` text, else first `<h1>` text. Whitespace is collapsed and empty
/// text counts as missing.
pub fn extract_title(html: &str) -> Option<String> {
    let doc = Html::parse_document(html);
    ["title", "h1"].iter().find_map(|tag| {
        let selector = Selector::parse(tag).expect("tag name is a valid selector");
        doc.select(&selector)
            .next()
            .map(|el| collapse_whitespace(&el.text().collect::<String>()))
            .filter(|text| !text.is_empty())
    })
}

fn strip_brand_suffix<'t>(title: &'t str, brand: &str) -> &'t str {
    title
        .strip_suffix(brand)
        .and_then(|rest| rest.trim_end().strip_suffix('|'))
        .unwrap_or(title)
        .trim()
}
