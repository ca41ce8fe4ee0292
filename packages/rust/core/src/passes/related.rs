use sha2::{Digest, Sha256};

use pagesmith_document::{DocumentTree, Placement, escape_attr, escape_text};
use pagesmith_shared::{PageRecord, Result};

use super::section::main_element;
use super::{Pass, PassContext, PassKind};
use crate::index::PageIndex;
use crate::slug::ServicePair;

/// Class marking the related-links section.
pub const RELATED_CLASS: &str = "related-integrations";

const MAX_RELATED: usize = 3;
const MAX_FROM_SOURCE: usize = 2;

/// Appends a list of related integration pages to `<main>`, once.
#[derive(Debug, Clone, Copy, Default)]
pub struct RelatedLinksPass;

impl Pass for RelatedLinksPass {
    fn kind(&self) -> PassKind {
        PassKind::RelatedLinks
    }

    fn name(&self) -> &'static str {
        "related-links"
    }

    fn apply(&self, tree: &mut DocumentTree, ctx: &PassContext<'_>) -> Result<bool> {
        let Some(main) = main_element(tree) else {
            return Ok(false);
        };
        if tree.find_by_class(main, RELATED_CLASS).is_some() {
            return Ok(false);
        }

        let related = select_related(ctx.index, ctx.filename, ctx.services);
        let items: String = related
            .iter()
            .map(|page| {
                format!(
                    r#"<li><a href="{}">{}</a></li>"#,
                    escape_attr(&page.relative_link),
                    escape_text(&page.title)
                )
            })
            .collect();
        let markup = format!(
            r#"<section class="{RELATED_CLASS}"><h2>More related integrations on {}</h2><ul>{items}</ul></section>"#,
            escape_text(&ctx.config.brand_name)
        );

        let inserted = tree.insert_markup(Placement::Append(main), &markup);
        Ok(!inserted.is_empty())
    }
}

/// Pick up to three related pages for `filename`.
///
/// Up to two share the source service, the rest share the target service.
/// When neither grouping yields anything, a start offset derived from the
/// SHA-256 of the filename selects consecutive records from the registry so
/// the choice is stable across runs. Never returns the page itself or the
/// same filename twice.
pub fn select_related<'a>(
    index: &'a PageIndex,
    filename: &str,
    services: &ServicePair,
) -> Vec<&'a PageRecord> {
    let mut picked: Vec<&PageRecord> = Vec::with_capacity(MAX_RELATED);

    if let Some(source) = &services.source {
        extend_unique(&mut picked, index.by_source(source), filename, MAX_FROM_SOURCE);
    }
    if let Some(target) = &services.target {
        extend_unique(&mut picked, index.by_target(target), filename, MAX_RELATED);
    }

    if picked.is_empty() {
        let others: Vec<&PageRecord> = index
            .records()
            .iter()
            .filter(|p| p.filename != filename)
            .collect();
        if !others.is_empty() {
            let start = (stable_hash(filename) % others.len() as u64) as usize;
            let ring = others.iter().cycle().skip(start).take(others.len()).copied();
            extend_unique(&mut picked, ring, filename, MAX_RELATED);
        }
    }

    picked
}

/// Push candidates until `picked` holds `limit` pages, skipping `filename`
/// and filenames already picked.
fn extend_unique<'a>(
    picked: &mut Vec<&'a PageRecord>,
    candidates: impl Iterator<Item = &'a PageRecord>,
    filename: &str,
    limit: usize,
) {
    for page in candidates {
        if picked.len() >= limit {
            break;
        }
        if page.filename != filename && !picked.iter().any(|p| p.filename == page.filename) {
            picked.push(page);
        }
    }
}

/// First eight bytes of the filename's SHA-256, big-endian.
fn stable_hash(filename: &str) -> u64 {
    let digest = Sha256::digest(filename.as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(bytes)
}
