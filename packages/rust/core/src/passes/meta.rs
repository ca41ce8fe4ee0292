use pagesmith_document::{DocumentTree, NodeId, collapse_whitespace};
use pagesmith_shared::{PagesmithError, Result};

use super::section::{main_element, primary_heading};
use super::{Pass, PassContext, PassKind};

const ELLIPSIS: &str = "...";

/// Creates or refreshes `<meta name="description">` from the intro paragraph.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetaDescriptionPass;

impl MetaDescriptionPass {
    /// The intro paragraph: first `<p>` sibling after the page heading.
    ///
    /// When `<main>` has no `<h1>` yet, the structure pass will prepend one,
    /// so the main's first direct `<p>` is already the paragraph that will
    /// follow it.
    fn intro_paragraph(tree: &DocumentTree) -> Option<NodeId> {
        if let Some(h1) = primary_heading(tree) {
            return tree.following_siblings(h1).find(|&n| tree.is_tag(n, "p"));
        }
        let main = main_element(tree)?;
        tree.children(main).into_iter().find(|&n| tree.is_tag(n, "p"))
    }

    fn describe(tree: &DocumentTree, ctx: &PassContext<'_>) -> String {
        let seo = ctx.config;
        let intro = Self::intro_paragraph(tree)
            .map(|p| collapse_whitespace(&tree.text_content(p)))
            .filter(|text| text.chars().count() > seo.meta_min_len);
        match intro {
            Some(text) => truncate_for_meta(&text, seo.meta_max_len),
            None => truncate_for_meta(&seo.default_meta_description, seo.meta_max_len),
        }
    }
}

impl Pass for MetaDescriptionPass {
    fn kind(&self) -> PassKind {
        PassKind::MetaDescription
    }

    fn name(&self) -> &'static str {
        "meta-description"
    }

    fn apply(&self, tree: &mut DocumentTree, ctx: &PassContext<'_>) -> Result<bool> {
        let description = Self::describe(tree, ctx);

        let existing = tree.descendants(tree.root()).find(|&n| {
            tree.is_tag(n, "meta")
                && tree
                    .attr(n, "name")
                    .is_some_and(|name| name.eq_ignore_ascii_case("description"))
        });

        match existing {
            Some(meta) => Ok(tree.set_attr(meta, "content", &description)),
            None => {
                let head = tree
                    .find_first(tree.root(), "head")
                    .ok_or_else(|| PagesmithError::pass(self.name(), "document has no <head>"))?;
                let meta = tree.create_element(
                    "meta",
                    vec![
                        ("name".to_string(), "description".to_string()),
                        ("content".to_string(), description),
                    ],
                );
                tree.append_child(head, meta);
                Ok(true)
            }
        }
    }
}

/// Collapse whitespace and cap `text` at `max_chars` characters.
///
/// Longer text is cut at the last space that leaves room for `...`, so the
/// result including the ellipsis never exceeds `max_chars`. A single word
/// longer than the budget is cut mid-word.
pub fn truncate_for_meta(text: &str, max_chars: usize) -> String {
    let text = collapse_whitespace(text);
    if text.chars().count() <= max_chars {
        return text;
    }

    let budget = max_chars.saturating_sub(ELLIPSIS.len());
    // One extra char so a space sitting right at the budget still counts.
    let window: String = text.chars().take(budget + 1).collect();
    let cut = match window.rfind(' ') {
        Some(pos) if pos > 0 => window[..pos].to_string(),
        _ => window.chars().take(budget).collect(),
    };
    format!("{}{ELLIPSIS}", cut.trim_end())
}
