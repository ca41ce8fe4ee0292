//! Shared types, error model, and configuration for Pagesmith.
//!
//! This crate is the foundation depended on by all other Pagesmith crates.
//! It provides:
//! - [`PagesmithError`]: the unified error type
//! - Domain types ([`PageRecord`], [`RunStatistics`], [`DocumentOutcome`], [`RunId`])
//! - Configuration ([`AppConfig`], [`RunConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, BrandConfig, CtaConfig, InputConfig, RunConfig, RunSection, SeoConfig,
    SlugConfig, config_dir, config_file_path, init_config, load_config, load_config_from,
    validate_config,
};
pub use error::{PagesmithError, Result};
pub use types::{
    DocumentKind, DocumentOutcome, FailureEntry, OutcomeTally, PageRecord, PassChanges, RunId,
    RunStatistics,
};
