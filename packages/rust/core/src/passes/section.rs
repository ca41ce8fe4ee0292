//! Tree lookups and heading-guarded section insertion shared by the passes.

use pagesmith_document::{DocumentTree, NodeId, Placement};

/// First `<main>` element, the scope of every content pass.
pub(crate) fn main_element(tree: &DocumentTree) -> Option<NodeId> {
    tree.find_first(tree.root(), "main")
}

/// The heading that names the page.
///
/// Inside `<main>` only the main's own `<h1>` counts, since the structure
/// pass synthesizes one there when it is missing. Pages without `<main>`
/// fall back to the first `<h1>` anywhere.
pub(crate) fn primary_heading(tree: &DocumentTree) -> Option<NodeId> {
    match main_element(tree) {
        Some(main) => tree.find_first(main, "h1"),
        None => tree.find_first(tree.root(), "h1"),
    }
}

/// Insert `markup` at the placement chosen by `place` unless an `<h2>` inside
/// `scope` already contains `needle`, compared case-insensitively. Returns
/// `true` if something was inserted.
///
/// `place` runs only when the section is missing, so it may inspect the tree
/// as it stands after earlier sections were added.
pub(crate) fn ensure_section<F>(
    tree: &mut DocumentTree,
    scope: NodeId,
    needle: &str,
    markup: &str,
    place: F,
) -> bool
where
    F: FnOnce(&DocumentTree) -> Placement,
{
    if tree.find_containing(scope, "h2", needle).is_some() {
        return false;
    }
    let placement = place(tree);
    !tree.insert_markup(placement, markup).is_empty()
}

/// The block a heading introduces: its parent `<section>` when the heading
/// leads that section, otherwise the heading itself.
pub(crate) fn heading_block(tree: &DocumentTree, heading: NodeId) -> NodeId {
    match tree.parent(heading) {
        Some(parent) if tree.is_tag(parent, "section") => {
            let leads = tree
                .children(parent)
                .into_iter()
                .find(|&c| tree.tag_name(c).is_some())
                == Some(heading);
            if leads { parent } else { heading }
        }
        _ => heading,
    }
}

/// Block of the first `<h2>` in `scope` containing `needle`.
pub(crate) fn find_block(tree: &DocumentTree, scope: NodeId, needle: &str) -> Option<NodeId> {
    tree.find_containing(scope, "h2", needle)
        .map(|h| heading_block(tree, h))
}
