//! Canonical content scaffolding inside `<main>`.
//!
//! Each block is wrapped in its own `<section class="scaffold-…">` so that
//! inserted paragraphs never become siblings of the page heading.

use pagesmith_document::{DocumentTree, NodeId, Placement, escape_text};
use pagesmith_shared::Result;

use super::section::{ensure_section, heading_block, main_element};
use super::{Pass, PassContext, PassKind};
use crate::slug::humanize;

/// Heading text each scaffold block is recognized by, in page order.
pub const SCAFFOLD_HEADINGS: [&str; 4] = ["Overview", "Prerequisites", "Step by step", "Variations"];

const OVERVIEW: &str = SCAFFOLD_HEADINGS[0];
const PREREQUISITES: &str = SCAFFOLD_HEADINGS[1];
const STEPS: &str = SCAFFOLD_HEADINGS[2];
const VARIATIONS: &str = SCAFFOLD_HEADINGS[3];

/// Ensures `<h1>` plus the Overview, Prerequisites, Step by step and
/// Variations blocks exist in the first `<main>`.
#[derive(Debug, Clone, Copy, Default)]
pub struct StructurePass;

impl Pass for StructurePass {
    fn kind(&self) -> PassKind {
        PassKind::Structure
    }

    fn name(&self) -> &'static str {
        "structure"
    }

    fn apply(&self, tree: &mut DocumentTree, ctx: &PassContext<'_>) -> Result<bool> {
        let Some(main) = main_element(tree) else {
            return Ok(false);
        };
        let mut changed = false;

        let h1 = match tree.find_first(main, "h1") {
            Some(h1) => h1,
            None => {
                let h1 = tree.create_element("h1", Vec::new());
                tree.set_text(h1, ctx.display_title);
                tree.prepend_child(main, h1);
                changed = true;
                h1
            }
        };

        changed |= ensure_section(tree, main, OVERVIEW, &overview_markup(ctx), |_| {
            Placement::After(h1)
        });

        changed |= ensure_section(tree, main, PREREQUISITES, &prerequisites_markup(), |t| {
            prerequisites_placement(t, main)
        });

        changed |= ensure_section(tree, main, STEPS, &steps_markup(ctx), |_| {
            Placement::Append(main)
        });

        changed |= ensure_section(tree, main, VARIATIONS, &variations_markup(), |_| {
            Placement::Append(main)
        });

        Ok(changed)
    }
}

/// Right after the first sub-heading block, or at the end of `<main>`.
fn prerequisites_placement(tree: &DocumentTree, main: NodeId) -> Placement {
    match tree.find_first(main, "h2") {
        Some(h2) => Placement::After(heading_block(tree, h2)),
        None => Placement::Append(main),
    }
}

fn overview_markup(ctx: &PassContext<'_>) -> String {
    let heading = format!("<h2>{OVERVIEW} of the flow</h2>");
    let body = match (&ctx.services.source, &ctx.services.target) {
        (Some(source), Some(target)) => format!(
            "<p>This automation connects {} with {}, keeping data and actions in sync between the two platforms.</p>",
            escape_text(&humanize(source)),
            escape_text(&humanize(target)),
        ),
        _ => String::new(),
    };
    format!(r#"<section class="scaffold-overview">{heading}{body}</section>"#)
}

fn prerequisites_markup() -> String {
    format!(
        concat!(
            r#"<section class="scaffold-prerequisites"><h2>{}</h2><ul>"#,
            "<li>An active account on the source service</li>",
            "<li>An active account on the target service</li>",
            "<li>An n8n instance or an equivalent automation platform</li>",
            "<li>The API keys or authentication tokens both services require</li>",
            "</ul></section>",
        ),
        PREREQUISITES
    )
}

fn steps_markup(ctx: &PassContext<'_>) -> String {
    let heading = match ctx.config.platform_tags.first() {
        Some(platform) => format!("{STEPS} in {}", escape_text(platform)),
        None => STEPS.to_string(),
    };
    format!(
        concat!(
            r#"<section class="scaffold-steps"><h2>{}</h2><ol>"#,
            "<li>Create a new workflow</li>",
            "<li>Add the trigger for the source service</li>",
            "<li>Configure authentication and the events to listen for</li>",
            "<li>Add the action for the target service</li>",
            "<li>Map the fields between source and target</li>",
            "<li>Test the flow with real data</li>",
            "<li>Activate the workflow</li>",
            "</ol></section>",
        ),
        heading
    )
}

fn variations_markup() -> String {
    format!(
        concat!(
            r#"<section class="scaffold-variations"><h2>{} and advanced ideas</h2><ul>"#,
            "<li>Log every run to Google Sheets for auditing</li>",
            "<li>Send a Slack notification when an error occurs</li>",
            "<li>Enrich the data with OpenAI before sending it</li>",
            "</ul></section>",
        ),
        VARIATIONS
    )
}
