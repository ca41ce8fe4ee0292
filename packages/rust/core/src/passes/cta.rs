use pagesmith_document::{DocumentTree, NodeId, Placement, escape_attr};
use pagesmith_shared::Result;
use tracing::debug;

use super::section::{find_block, main_element};
use super::{Pass, PassContext, PassKind};
use crate::slug::file_stem;

/// Id of the download button.
pub const CTA_DOWNLOAD_ID: &str = "cta-download-json";
/// Id of the consulting button.
pub const CTA_CONSULTING_ID: &str = "cta-consulting";
/// Consulting button id found on pages generated before the rebrand.
pub const LEGACY_CONSULTING_ID: &str = "cta-consultoria";

const CTA_SECTION_CLASS: &str = "download-section";

/// Injects the download/consulting call-to-action block, or refreshes its
/// links when it already exists.
#[derive(Debug, Clone, Copy, Default)]
pub struct CtaPass;

impl Pass for CtaPass {
    fn kind(&self) -> PassKind {
        PassKind::Cta
    }

    fn name(&self) -> &'static str {
        "cta"
    }

    fn apply(&self, tree: &mut DocumentTree, ctx: &PassContext<'_>) -> Result<bool> {
        let Some(main) = main_element(tree) else {
            return Ok(false);
        };
        let artifact = artifact_url(tree, main, ctx);
        let consulting = ctx.config.consulting_url.as_str();

        match tree.find_by_id(tree.root(), CTA_DOWNLOAD_ID) {
            Some(download) => {
                let mut changed = tree.set_attr(download, "href", &artifact);
                let consult = tree
                    .find_by_id(tree.root(), CTA_CONSULTING_ID)
                    .or_else(|| tree.find_by_id(tree.root(), LEGACY_CONSULTING_ID));
                match consult {
                    Some(consult) => changed |= tree.set_attr(consult, "href", consulting),
                    None => debug!(file = %ctx.filename, "CTA block has no consulting button"),
                }
                Ok(changed)
            }
            None => {
                let placement = match find_block(tree, main, "Variations") {
                    Some(block) => Placement::Before(block),
                    None => Placement::Append(main),
                };
                let markup = cta_markup(&artifact, consulting);
                Ok(!tree.insert_markup(placement, &markup).is_empty())
            }
        }
    }
}

/// First downloadable link in `<main>` outside the CTA block, else the
/// conventional workflow path for this page.
fn artifact_url(tree: &DocumentTree, main: NodeId, ctx: &PassContext<'_>) -> String {
    let cta_block = tree.find_by_class(main, CTA_SECTION_CLASS);
    let extensions: Vec<String> = ctx
        .config
        .download_extensions
        .iter()
        .filter(|e| !e.is_empty())
        .map(|e| e.to_ascii_lowercase())
        .collect();

    let existing = tree.descendants(main).find_map(|node| {
        if !tree.is_tag(node, "a") {
            return None;
        }
        if cta_block.is_some_and(|block| tree.is_descendant_of(node, block)) {
            return None;
        }
        if matches!(
            tree.attr(node, "id"),
            Some(CTA_DOWNLOAD_ID | CTA_CONSULTING_ID | LEGACY_CONSULTING_ID)
        ) {
            return None;
        }
        let href = tree.attr(node, "href")?;
        is_download(href, &extensions).then(|| href.to_string())
    });

    existing.unwrap_or_else(|| {
        let ext = extensions.first().map(String::as_str).unwrap_or(".json");
        let dir = ctx.config.workflow_dir.trim_end_matches('/');
        format!("{dir}/{}{ext}", file_stem(ctx.filename))
    })
}

fn is_download(href: &str, extensions: &[String]) -> bool {
    let path = href.split(['?', '#']).next().unwrap_or(href).to_ascii_lowercase();
    extensions.iter().any(|ext| path.ends_with(ext.as_str()))
}

fn cta_markup(artifact: &str, consulting: &str) -> String {
    format!(
        concat!(
            r#"<section class="{class}"><h2>Download the JSON template</h2>"#,
            "<p>Grab the ready-made template and import it straight into your workflow editor:</p>",
            r#"<div class="cta-buttons">"#,
            r#"<a id="{download_id}" class="btn btn-primary" href="{artifact}" target="_blank" rel="noopener">Download this workflow</a>"#,
            r#"<a id="{consult_id}" class="btn btn-secondary" href="{consulting}" target="_blank" rel="noopener">Get help adapting this workflow</a>"#,
            "</div></section>",
        ),
        class = CTA_SECTION_CLASS,
        download_id = CTA_DOWNLOAD_ID,
        consult_id = CTA_CONSULTING_ID,
        artifact = escape_attr(artifact),
        consulting = escape_attr(consulting),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::passes::testing::Harness;

    fn href_of(tree: &DocumentTree, id: &str) -> String {
        let a = tree.find_by_id(tree.root(), id).expect("cta anchor");
        tree.attr(a, "href").unwrap().to_string()
    }

    #[test]
    fn reuses_existing_download_link() {
        let h = Harness::new();
        let (changed, tree) = h.apply(
            &CtaPass,
            r#"<main><p><a href="../workflows/a-para-b.JSON?v=2">get</a></p></main>"#,
            "a-para-b-n8n.html",
        );
        assert!(changed);
        assert_eq!(href_of(&tree, CTA_DOWNLOAD_ID), "../workflows/a-para-b.JSON?v=2");
        assert_eq!(href_of(&tree, CTA_CONSULTING_ID), h.config.consulting_url);
    }

    #[test]
    fn falls_back_to_workflow_dir() {
        let h = Harness::new();
        let (_, tree) = h.apply(&CtaPass, "<main><h1>T</h1></main>", "a-para-b-n8n.html");
        assert_eq!(href_of(&tree, CTA_DOWNLOAD_ID), "./workflows/a-para-b-n8n.json");
    }

    #[test]
    fn inserted_before_variations_block() {
        let h = Harness::new();
        let (_, tree) = h.apply(
            &CtaPass,
            r#"<main><h1>T</h1><section class="scaffold-variations"><h2>Variations</h2></section><p>end</p></main>"#,
            "a-para-b.html",
        );
        let main = main_element(&tree).unwrap();
        let classes: Vec<_> = tree
            .children(main)
            .into_iter()
            .filter_map(|c| tree.attr(c, "class"))
            .collect();
        assert_eq!(classes, [CTA_SECTION_CLASS, "scaffold-variations"]);
    }

    #[test]
    fn appended_without_variations() {
        let h = Harness::new();
        let (_, tree) = h.apply(&CtaPass, "<main><h1>T</h1><p>end</p></main>", "a-para-b.html");
        let main = main_element(&tree).unwrap();
        let last = *tree.children(main).last().unwrap();
        assert!(tree.has_class(last, CTA_SECTION_CLASS));
    }

    #[test]
    fn refreshes_stale_links_only() {
        let h = Harness::new();
        let html = r#"<main><section class="download-section"><a id="cta-download-json" href="old.json">d</a><a id="cta-consulting" href="https://old.example">c</a></section><a href="new.json">n</a></main>"#;
        let (changed, tree) = h.apply(&CtaPass, html, "a-para-b.html");
        assert!(changed);
        assert_eq!(href_of(&tree, CTA_DOWNLOAD_ID), "new.json");
        assert_eq!(href_of(&tree, CTA_CONSULTING_ID), h.config.consulting_url);
        assert_eq!(tree.find_all(tree.root(), "section").len(), 1);
    }

    #[test]
    fn refreshes_legacy_consulting_button() {
        let h = Harness::new();
        let html = r#"<main><section class="download-section"><a id="cta-download-json" href="flow.json">d</a><a id="cta-consultoria" href="https://wa.me/000">c</a></section><a href="flow.json">n</a></main>"#;
        let (changed, tree) = h.apply(&CtaPass, html, "a-para-b.html");
        assert!(changed);
        assert_eq!(href_of(&tree, LEGACY_CONSULTING_ID), h.config.consulting_url);
        assert!(tree.find_by_id(tree.root(), CTA_CONSULTING_ID).is_none());
        h.assert_idempotent(&CtaPass, html, "a-para-b.html");
    }

    #[test]
    fn idempotent_with_and_without_artifact() {
        let h = Harness::new();
        h.assert_idempotent(&CtaPass, "<main><h1>T</h1></main>", "a-para-b.html");
        h.assert_idempotent(
            &CtaPass,
            r#"<main><a href="flow.json">x</a><h2>Variations</h2></main>"#,
            "a-para-b.html",
        );
    }

    #[test]
    fn no_main_is_a_no_op() {
        let h = Harness::new();
        let (changed, _) = h.apply(&CtaPass, "<p>x</p>", "a-para-b.html");
        assert!(!changed);
    }
}
