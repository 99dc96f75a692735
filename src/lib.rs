//! # reposyn
//!
//! Concatenates the text files of a repository into a single synopsis for an
//! LLM.
//!
//! ## Features
//!
//! - `.gitignore` support plus caller-supplied ignore patterns
//! - Per-file choice between full content and a statistical summary
//! - Fixed worker pool fed through a bounded queue, with small files batched
//! - Optional git commit statistics header and closing context block
//! - Clipboard output
//!
//! ## Quick Start
//!
//! ```no_run
//! use reposyn::Config;
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = Config::builder()
//!     .root_dir(".")
//!     .output_file("repo-synopsis.txt")
//!     .summary_patterns(vec!["*.json".to_string()])
//!     .build()?;
//!
//! let stats = reposyn::run(config)?;
//! println!("{} files", stats.files_dispatched);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! 1. **Scanner**: walks the tree once, filters by extension and ignore rules
//! 2. **Batcher**: groups small files into size-bounded jobs
//! 3. **Workers**: render segments into private buffers
//! 4. **Sink**: one mutex-guarded buffered writer receiving whole buffers
//!
//! Segments appear in no particular order; each one is contiguous.

#![warn(
    missing_docs,
    rust_2018_idioms,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery
)]
#![allow(clippy::module_name_repetitions)]

mod batch;
mod clipboard;
mod config;
mod context;
mod error;
mod file;
mod filter;
mod pipeline;
mod scanner;
mod sink;
mod summary;
mod worker;

pub mod git;

pub use clipboard::copy_text;
pub use config::{
    Config, ConfigBuilder, DEFAULT_FLUSH_THRESHOLD, DEFAULT_QUEUE_CAPACITY,
    DEFAULT_SMALL_FILE_THRESHOLD,
};
pub use context::render_context;
pub use error::{Error, Result};
pub use file::{Batch, FileTask, Job};
pub use filter::{ExtensionSet, PathMatcher, IGNORE_FILE_NAME};
pub use pipeline::{Pipeline, PipelineStats};
pub use summary::FileSummary;

/// Runs the complete pipeline with the given configuration.
///
/// This is the main entry point for the library.
///
/// # Errors
///
/// Returns an error if:
/// - Configuration is invalid
/// - The output target cannot be created or written
/// - An existing `.gitignore` cannot be read
/// - The directory walk fails part-way
///
/// # Examples
///
/// ```no_run
/// use reposyn::{Config, run};
///
/// # fn main() -> anyhow::Result<()> {
/// let config = Config::builder()
///     .root_dir(".")
///     .build()?;
///
/// run(config)?;
/// # Ok(())
/// # }
/// ```
pub fn run(config: Config) -> Result<PipelineStats> {
    Pipeline::new(config)?.run()
}
