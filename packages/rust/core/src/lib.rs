//! Core transformation logic for Pagesmith.
//!
//! This crate ties together discovery, the page index and the document passes
//! into a batch run over an HTML corpus (`run_batch`).

pub mod index;
pub mod passes;
pub mod pipeline;
pub mod report;
pub mod slug;

pub use index::{IndexBuild, IndexBuilder, PageIndex};
pub use passes::{Pass, PassContext, PassKind, Transformed, Transformer};
pub use pipeline::{ProgressReporter, SilentProgress, build_index, run_batch};
pub use report::{DocumentReport, RunReport};
pub use slug::{ServicePair, SlugParser};
