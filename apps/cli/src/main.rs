//! Pagesmith CLI: batch rewriter for HTML integration pages.
//!
//! Normalizes branding, synthesizes SEO metadata, scaffolds content, injects
//! calls to action and links related pages across a local HTML corpus.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
