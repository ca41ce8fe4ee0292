//! The six document transformations, applied in a fixed order.
//!
//! Brand rewriting runs over the raw markup before parsing; the remaining
//! five passes implement [`Pass`] and mutate a [`DocumentTree`]. Every pass
//! reports whether it changed anything and is a no-op on its own output.

mod brand;
mod cta;
mod meta;
mod related;
mod section;
mod structure;
mod title;

use std::path::Path;

use pagesmith_document::DocumentTree;
use pagesmith_shared::{PagesmithError, PassChanges, Result, RunConfig};
use tracing::debug;

use crate::index::PageIndex;
use crate::slug::{ServicePair, SlugParser};

pub use brand::BrandRewriter;
pub use cta::{CTA_CONSULTING_ID, CTA_DOWNLOAD_ID, CtaPass};
pub use meta::{MetaDescriptionPass, truncate_for_meta};
pub use related::{RELATED_CLASS, RelatedLinksPass, select_related};
pub use structure::{SCAFFOLD_HEADINGS, StructurePass};
pub use title::TitlePass;

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Which counter a pass feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassKind {
    Title,
    MetaDescription,
    Structure,
    Cta,
    RelatedLinks,
}

/// Read-only inputs shared by every tree pass for one document.
#[derive(Debug)]
pub struct PassContext<'a> {
    pub config: &'a RunConfig,
    pub index: &'a PageIndex,
    pub filepath: &'a Path,
    pub filename: &'a str,
    pub services: &'a ServicePair,
    /// Title synthesized from the filename, used when the page has no `<h1>`.
    pub display_title: &'a str,
}

/// A structural transformation over one document.
///
/// Implementations must be idempotent: applying a pass to its own output
/// returns `false` and leaves the tree untouched.
pub trait Pass: Send + Sync {
    /// Counter this pass feeds.
    fn kind(&self) -> PassKind;

    /// Human-readable pass name for tracing and errors.
    fn name(&self) -> &'static str;

    /// Apply the pass. Returns `true` if the tree was mutated.
    fn apply(&self, tree: &mut DocumentTree, ctx: &PassContext<'_>) -> Result<bool>;
}

/// Tree passes in application order.
pub fn tree_passes() -> Vec<Box<dyn Pass>> {
    vec![
        Box::new(TitlePass),
        Box::new(MetaDescriptionPass),
        Box::new(StructurePass),
        Box::new(CtaPass),
        Box::new(RelatedLinksPass),
    ]
}

fn mark(changes: &mut PassChanges, kind: PassKind) {
    match kind {
        PassKind::Title => changes.title = true,
        PassKind::MetaDescription => changes.meta_description = true,
        PassKind::Structure => changes.structure = true,
        PassKind::Cta => changes.cta = true,
        PassKind::RelatedLinks => changes.related_links = true,
    }
}

// ---------------------------------------------------------------------------
// Transformer
// ---------------------------------------------------------------------------

/// Output of running every pass over one document.
#[derive(Debug, Clone)]
pub struct Transformed {
    /// Which passes fired.
    pub changes: PassChanges,
    /// New markup, present only when something changed.
    pub html: Option<String>,
}

/// All passes plus the compiled state they need, built once per run.
pub struct Transformer {
    config: RunConfig,
    brand: BrandRewriter,
    slugs: SlugParser,
    passes: Vec<Box<dyn Pass>>,
}

impl Transformer {
    /// Compile brand and slug patterns for `config`.
    pub fn new(config: RunConfig) -> Result<Self> {
        let brand = BrandRewriter::new(&config.legacy_tokens, &config.brand_name)?;
        let slugs = SlugParser::new(&config.platform_tags)?;
        Ok(Self {
            config,
            brand,
            slugs,
            passes: tree_passes(),
        })
    }

    /// Brand rewriter shared with the index builder.
    pub fn brand(&self) -> &BrandRewriter {
        &self.brand
    }

    /// Slug parser shared with the index builder.
    pub fn slugs(&self) -> &SlugParser {
        &self.slugs
    }

    /// Run the brand pre-pass and every tree pass over `raw`.
    pub fn transform(&self, raw: &str, filepath: &Path, index: &PageIndex) -> Result<Transformed> {
        let filename = filepath
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                PagesmithError::validation(format!("unusable file name: {}", filepath.display()))
            })?;

        let (text, brand_changed) = self.brand.rewrite(raw);
        let mut tree = DocumentTree::parse(&text);

        let services = self.slugs.parse(filename);
        let display_title = self.slugs.display_title(filename);
        let ctx = PassContext {
            config: &self.config,
            index,
            filepath,
            filename,
            services: &services,
            display_title: &display_title,
        };

        let mut changes = PassChanges {
            brand: brand_changed,
            ..PassChanges::default()
        };
        if brand_changed {
            debug!(file = filename, pass = "brand", "pass mutated document");
        }

        for pass in &self.passes {
            if pass.apply(&mut tree, &ctx)? {
                debug!(file = filename, pass = pass.name(), "pass mutated document");
                mark(&mut changes, pass.kind());
            }
        }

        let html = changes.any().then(|| tree.serialize());
        Ok(Transformed { changes, html })
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// Runs single passes the way [`Transformer`] does, for pass unit tests.
    pub(crate) struct Harness {
        pub config: RunConfig,
        pub index: PageIndex,
        slugs: SlugParser,
    }

    impl Harness {
        pub fn new() -> Self {
            Self::with_index(PageIndex::default())
        }

        pub fn with_index(index: PageIndex) -> Self {
            Self {
                config: RunConfig::for_dir("."),
                index,
                slugs: SlugParser::default(),
            }
        }

        /// Parse `html` and apply `pass` once.
        pub fn apply(&self, pass: &dyn Pass, html: &str, filename: &str) -> (bool, DocumentTree) {
            let mut tree = DocumentTree::parse(html);
            let changed = self.apply_to(pass, &mut tree, filename);
            (changed, tree)
        }

        /// Apply `pass` to an existing tree.
        pub fn apply_to(&self, pass: &dyn Pass, tree: &mut DocumentTree, filename: &str) -> bool {
            let services = self.slugs.parse(filename);
            let display_title = self.slugs.display_title(filename);
            let ctx = PassContext {
                config: &self.config,
                index: &self.index,
                filepath: Path::new(filename),
                filename,
                services: &services,
                display_title: &display_title,
            };
            pass.apply(tree, &ctx)
                .unwrap_or_else(|e| panic!("{} failed: {e}", pass.name()))
        }

        /// Apply twice with a serialize/parse round trip in between, asserting
        /// the second application is a no-op. Returns the first output.
        pub fn assert_idempotent(&self, pass: &dyn Pass, html: &str, filename: &str) -> String {
            let (_, tree) = self.apply(pass, html, filename);
            let once = tree.serialize();
            let (changed, again) = self.apply(pass, &once, filename);
            assert!(!changed, "{} changed its own output", pass.name());
            assert_eq!(again.serialize(), once);
            once
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::PageIndex;
    use std::path::PathBuf;

    fn fixture(name: &str) -> (PathBuf, String) {
        let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("../../../fixtures/html")
            .join(name);
        let html = std::fs::read_to_string(&path)
            .unwrap_or_else(|e| panic!("failed to read fixture {name}: {e}"));
        (path, html)
    }

    fn transformer() -> Transformer {
        Transformer::new(RunConfig::for_dir("fixtures/html")).unwrap()
    }

    #[test]
    fn full_sequence_is_idempotent() {
        let t = transformer();
        let index = PageIndex::default();
        let (path, html) = fixture("facebook-ads-para-google-sheets-n8n.html");

        let first = t.transform(&html, &path, &index).unwrap();
        assert!(first.changes.brand);
        assert!(first.changes.title);
        assert!(first.changes.meta_description);
        assert!(first.changes.structure);
        assert!(first.changes.cta);
        assert!(first.changes.related_links);
        let once = first.html.expect("changed document has markup");

        let second = t.transform(&once, &path, &index).unwrap();
        assert_eq!(second.changes, PassChanges::default());
        assert!(second.html.is_none());
    }

    #[test]
    fn bare_document_is_idempotent() {
        let t = transformer();
        let index = PageIndex::default();
        let (path, html) = fixture("bare-h1.html");

        let once = t.transform(&html, &path, &index).unwrap().html.unwrap();
        let again = t.transform(&once, &path, &index).unwrap();
        assert!(!again.changes.any(), "second run changed: {:?}", again.changes);
    }

    #[test]
    fn page_without_main_only_gets_head_changes() {
        let t = transformer();
        let index = PageIndex::default();
        let (path, html) = fixture("no-main.html");

        let result = t.transform(&html, &path, &index).unwrap();
        assert!(result.changes.brand);
        assert!(result.changes.title);
        assert!(result.changes.meta_description);
        assert!(!result.changes.structure);
        assert!(!result.changes.cta);
        assert!(!result.changes.related_links);

        let out = result.html.unwrap();
        assert!(out.contains("<title>Welcome to Automations Cookbook | Automations Cookbook</title>"));
    }

    #[test]
    fn pass_order_is_fixed() {
        let kinds: Vec<_> = tree_passes().iter().map(|p| p.kind()).collect();
        assert_eq!(
            kinds,
            [
                PassKind::Title,
                PassKind::MetaDescription,
                PassKind::Structure,
                PassKind::Cta,
                PassKind::RelatedLinks,
            ]
        );
    }
}
