use pagesmith_document::{DocumentTree, collapse_whitespace};
use pagesmith_shared::{PagesmithError, Result};

use super::section::primary_heading;
use super::{Pass, PassContext, PassKind};

/// Sets `<title>` to `"<page heading> | <brand>"`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TitlePass;

impl TitlePass {
    /// Title text for the tree as it currently stands.
    fn compose(tree: &DocumentTree, ctx: &PassContext<'_>) -> String {
        let heading = primary_heading(tree)
            .map(|h1| collapse_whitespace(&tree.text_content(h1)))
            .filter(|text| !text.is_empty())
            .unwrap_or_else(|| ctx.display_title.to_string());
        format!("{heading} | {}", ctx.config.brand_name)
    }
}

impl Pass for TitlePass {
    fn kind(&self) -> PassKind {
        PassKind::Title
    }

    fn name(&self) -> &'static str {
        "title"
    }

    fn apply(&self, tree: &mut DocumentTree, ctx: &PassContext<'_>) -> Result<bool> {
        let title_text = Self::compose(tree, ctx);

        let head = tree
            .find_first(tree.root(), "head")
            .ok_or_else(|| PagesmithError::pass(self.name(), "document has no <head>"))?;

        let (title, created) = match tree.find_first(head, "title") {
            Some(title) => (title, false),
            None => {
                let title = tree.create_element("title", Vec::new());
                tree.prepend_child(head, title);
                (title, true)
            }
        };

        let changed = tree.set_text(title, &title_text);
        Ok(created || changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::PageIndex;
    use crate::slug::ServicePair;
    use pagesmith_shared::RunConfig;
    use std::path::Path;

    fn run(html: &str, display_title: &str) -> (bool, DocumentTree) {
        let config = RunConfig::for_dir(".");
        let index = PageIndex::default();
        let services = ServicePair::default();
        let ctx = PassContext {
            config: &config,
            index: &index,
            filepath: Path::new("page.html"),
            filename: "page.html",
            services: &services,
            display_title,
        };
        let mut tree = DocumentTree::parse(html);
        let changed = TitlePass.apply(&mut tree, &ctx).unwrap();
        (changed, tree)
    }

    fn title_of(tree: &DocumentTree) -> String {
        let title = tree.find_first(tree.root(), "title").unwrap();
        tree.text_content(title)
    }

    #[test]
    fn uses_main_heading() {
        let (changed, tree) = run(
            "<html><head><title>Old</title></head><body><main><h1>  Slack\n para   Trello </h1></main></body></html>",
            "Fallback",
        );
        assert!(changed);
        assert_eq!(title_of(&tree), "Slack para Trello | Automations Cookbook");
    }

    #[test]
    fn creates_title_at_head_start() {
        let (changed, tree) = run(
            r#"<html><head><meta charset="utf-8"></head><body><main></main></body></html>"#,
            "Slack para Trello",
        );
        assert!(changed);
        let head = tree.find_first(tree.root(), "head").unwrap();
        let first = tree.children(head)[0];
        assert!(tree.is_tag(first, "title"));
        assert_eq!(title_of(&tree), "Slack para Trello | Automations Cookbook");
    }

    #[test]
    fn empty_heading_falls_back_to_display_title() {
        let (_, tree) = run("<main><h1> </h1></main>", "Gmail para Notion");
        assert_eq!(title_of(&tree), "Gmail para Notion | Automations Cookbook");
    }

    #[test]
    fn second_application_changes_nothing() {
        let (_, tree) = run("<main><h1>A &amp; B</h1></main>", "x");
        let out = tree.serialize();
        let (changed, again) = run(&out, "x");
        assert!(!changed);
        assert_eq!(again.serialize(), out);
        assert_eq!(title_of(&again), "A & B | Automations Cookbook");
    }
}
