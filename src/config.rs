use crate::error::{Error, Result};
use crate::filter::ExtensionSet;
use std::path::PathBuf;

const DEFAULT_OUTPUT_FILE: &str = "repo-synopsis.txt";

/// Bytes a worker buffers before pushing to the shared sink.
pub const DEFAULT_FLUSH_THRESHOLD: usize = 256 * 1024;

/// Files at or below this size are batched instead of dispatched alone.
pub const DEFAULT_SMALL_FILE_THRESHOLD: u64 = 32 * 1024;

/// Capacity of the bounded job queue between scanner and workers.
pub const DEFAULT_QUEUE_CAPACITY: usize = 10_000;

/// Configuration for the reposyn pipeline.
///
/// Use [`Config::builder()`] to construct a new configuration.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct Config {
    /// Root directory to walk
    pub root_dir: PathBuf,

    /// Output file receiving the synopsis
    pub output_file: PathBuf,

    /// Allowed file extensions (dot-prefixed, lowercase)
    pub extensions: ExtensionSet,

    /// Number of worker threads
    pub workers: usize,

    /// Ignore patterns added on top of the root `.gitignore`
    pub ignore_patterns: Vec<String>,

    /// Patterns selecting files rendered as summaries
    pub summary_patterns: Vec<String>,

    /// Size at or below which a file is batched
    pub small_file_threshold: u64,

    /// Worker buffer flush threshold in bytes; also the batch flush size
    pub flush_threshold: usize,

    /// Bounded job queue capacity
    pub queue_capacity: usize,

    /// Prepend git commit statistics
    pub repo_stats: bool,

    /// Append the trailing `<context>` instructions
    pub context_footer: bool,

    /// Copy the result to the system clipboard instead of keeping `output_file`
    pub clipboard: bool,
}

impl Config {
    /// Creates a new configuration builder.
    ///
    /// # Examples
    ///
    /// ```
    /// use reposyn::Config;
    ///
    /// let config = Config::builder()
    ///     .root_dir(".")
    ///     .workers(4)
    ///     .build()
    ///     .expect("valid configuration");
    /// ```
    #[must_use]
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Root directory doesn't exist or is not a directory
    /// - Worker count, flush threshold or queue capacity is zero
    /// - The small-file cutoff exceeds the flush threshold
    /// - The extension allow-list is empty
    pub fn validate(&self) -> Result<()> {
        if !self.root_dir.exists() {
            return Err(Error::config(format!(
                "Root directory does not exist: {}",
                self.root_dir.display()
            )));
        }

        if !self.root_dir.is_dir() {
            return Err(Error::config(format!(
                "Root path is not a directory: {}",
                self.root_dir.display()
            )));
        }

        if self.workers == 0 {
            return Err(Error::config("workers must be greater than 0"));
        }

        if self.flush_threshold == 0 {
            return Err(Error::config("flush_threshold must be greater than 0"));
        }

        if self.queue_capacity == 0 {
            return Err(Error::config("queue_capacity must be greater than 0"));
        }

        if self.small_file_threshold > self.flush_threshold as u64 {
            return Err(Error::config(format!(
                "small_file_threshold ({}) must not exceed flush_threshold ({})",
                self.small_file_threshold, self.flush_threshold
            )));
        }

        if self.extensions.is_empty() {
            return Err(Error::config("at least one file extension must be allowed"));
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            root_dir: PathBuf::from("."),
            output_file: PathBuf::from(DEFAULT_OUTPUT_FILE),
            extensions: ExtensionSet::default(),
            workers: num_cpus::get(),
            ignore_patterns: Vec::new(),
            summary_patterns: Vec::new(),
            small_file_threshold: DEFAULT_SMALL_FILE_THRESHOLD,
            flush_threshold: DEFAULT_FLUSH_THRESHOLD,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            repo_stats: false,
            context_footer: false,
            clipboard: false,
        }
    }
}

/// Builder for creating a [`Config`].
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    root_dir: Option<PathBuf>,
    output_file: Option<PathBuf>,
    extensions: Option<ExtensionSet>,
    workers: Option<usize>,
    ignore_patterns: Vec<String>,
    summary_patterns: Vec<String>,
    small_file_threshold: Option<u64>,
    flush_threshold: Option<usize>,
    queue_capacity: Option<usize>,
    repo_stats: bool,
    context_footer: bool,
    clipboard: bool,
}

impl ConfigBuilder {
    /// Sets the root directory to walk.
    #[must_use]
    pub fn root_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.root_dir = Some(path.into());
        self
    }

    /// Sets the output file.
    #[must_use]
    pub fn output_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_file = Some(path.into());
        self
    }

    /// Replaces the extension allow-list.
    ///
    /// Entries are normalized to a lowercase, dot-prefixed form, so `"RS"`,
    /// `"rs"` and `".rs"` are equivalent.
    #[must_use]
    pub fn extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.extensions = Some(ExtensionSet::new(extensions));
        self
    }

    /// Sets the number of worker threads.
    #[must_use]
    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = Some(workers);
        self
    }

    /// Sets extra ignore patterns (gitignore syntax).
    #[must_use]
    pub fn ignore_patterns(mut self, patterns: Vec<String>) -> Self {
        self.ignore_patterns = patterns;
        self
    }

    /// Sets the patterns of files rendered as summaries (gitignore syntax).
    #[must_use]
    pub fn summary_patterns(mut self, patterns: Vec<String>) -> Self {
        self.summary_patterns = patterns;
        self
    }

    /// Sets the small-file cutoff in bytes.
    #[must_use]
    pub fn small_file_threshold(mut self, bytes: u64) -> Self {
        self.small_file_threshold = Some(bytes);
        self
    }

    /// Sets the worker flush threshold in bytes.
    #[must_use]
    pub fn flush_threshold(mut self, bytes: usize) -> Self {
        self.flush_threshold = Some(bytes);
        self
    }

    /// Sets the job queue capacity.
    #[must_use]
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = Some(capacity);
        self
    }

    /// Enables or disables the git statistics header.
    #[must_use]
    pub fn repo_stats(mut self, enabled: bool) -> Self {
        self.repo_stats = enabled;
        self
    }

    /// Enables or disables the trailing context block.
    #[must_use]
    pub fn context_footer(mut self, enabled: bool) -> Self {
        self.context_footer = enabled;
        self
    }

    /// Enables clipboard mode.
    #[must_use]
    pub fn clipboard(mut self, enabled: bool) -> Self {
        self.clipboard = enabled;
        self
    }

    /// Builds the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if validation fails.
    pub fn build(self) -> Result<Config> {
        let config = Config {
            root_dir: self.root_dir.unwrap_or_else(|| PathBuf::from(".")),
            output_file: self
                .output_file
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_FILE)),
            extensions: self.extensions.unwrap_or_default(),
            workers: self.workers.unwrap_or_else(num_cpus::get),
            ignore_patterns: self.ignore_patterns,
            summary_patterns: self.summary_patterns,
            small_file_threshold: self
                .small_file_threshold
                .unwrap_or(DEFAULT_SMALL_FILE_THRESHOLD),
            flush_threshold: self.flush_threshold.unwrap_or(DEFAULT_FLUSH_THRESHOLD),
            queue_capacity: self.queue_capacity.unwrap_or(DEFAULT_QUEUE_CAPACITY),
            repo_stats: self.repo_stats,
            context_footer: self.context_footer,
            clipboard: self.clipboard,
        };

        config.validate()?;
        Ok(config)
    }
}
