use crate::{
    clipboard,
    config::Config,
    context::render_context,
    error::{Error, Result},
    git::RepoStats,
    scanner::{ScanStats, Scanner},
    sink::SharedSink,
    worker::{PoolStats, WorkerPool},
};
use crossbeam_channel::bounded;
use serde::Serialize;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

const FILES_HEADER: &[u8] = b"\n<Files>\n";
const FILES_FOOTER: &[u8] = b"\n</Files>";

/// Statistics collected during pipeline execution.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineStats {
    /// Files that passed every filter and were handed to workers
    pub files_dispatched: usize,

    /// Files inlined in full
    pub files_inlined: usize,

    /// Files rendered as summaries
    pub files_summarized: usize,

    /// Files skipped after a read or summary error
    pub files_failed: usize,

    /// Files excluded by ignore patterns
    pub files_ignored: usize,

    /// Jobs carrying a single large file
    pub single_jobs: usize,

    /// Jobs carrying batched small files
    pub batch_jobs: usize,

    /// Bytes of file segments written
    pub bytes_written: u64,

    /// Worker threads used
    pub workers: usize,

    /// Whether the git statistics header was written
    pub repo_stats_written: bool,

    /// Total execution time
    pub duration: Duration,

    /// Where the synopsis went (a path, or `clipboard`)
    pub output: String,
}

impl PipelineStats {
    fn new(
        scan: &ScanStats,
        pool: &PoolStats,
        workers: usize,
        repo_stats_written: bool,
        duration: Duration,
        output: String,
    ) -> Self {
        Self {
            files_dispatched: scan.files_dispatched,
            files_inlined: pool.files_inlined,
            files_summarized: pool.files_summarized,
            files_failed: pool.files_failed,
            files_ignored: scan.ignored,
            single_jobs: scan.single_jobs,
            batch_jobs: scan.batch_jobs,
            bytes_written: pool.bytes_written,
            workers,
            repo_stats_written,
            duration,
            output,
        }
    }

    /// Prints a human-readable summary to stdout.
    pub fn print_summary(&self) {
        println!("Files successfully concatenated to {}", self.output);
        println!(
            "  {} files ({} inlined, {} summarized, {} failed, {} ignored) in {} jobs",
            self.files_dispatched,
            self.files_inlined,
            self.files_summarized,
            self.files_failed,
            self.files_ignored,
            self.single_jobs + self.batch_jobs
        );
        println!(
            "Operation took {:.1}s ({:.0} files/s)",
            self.duration.as_secs_f64(),
            self.throughput_files_per_sec()
        );
    }

    /// Returns the throughput in files per second, or zero for an
    /// instantaneous run.
    #[must_use]
    pub fn throughput_files_per_sec(&self) -> f64 {
        let secs = self.duration.as_secs_f64();
        if secs > 0.0 {
            self.files_dispatched as f64 / secs
        } else {
            0.0
        }
    }
}

/// Orchestrates the output phases: repo statistics, files, context.
pub struct Pipeline {
    config: Config,
}

impl Pipeline {
    /// Creates a new pipeline with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration validation fails.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Executes the pipeline and returns statistics.
    ///
    /// # Process
    ///
    /// 1. **Truncate**: the output target is created or emptied once
    /// 2. **Stats**: git commit statistics are appended (optional, best-effort)
    /// 3. **Files**: the worker pool appends every selected file
    /// 4. **Context**: closing instructions are appended (optional)
    ///
    /// In clipboard mode the phases write to a temporary file whose content
    /// is then copied to the clipboard.
    ///
    /// # Errors
    ///
    /// Returns an error if the target cannot be written, the ignore file is
    /// unreadable, the directory walk fails, or the clipboard rejects the
    /// result. Failures on individual files are logged and skipped.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use reposyn::{Config, Pipeline};
    ///
    /// # fn main() -> anyhow::Result<()> {
    /// let config = Config::builder()
    ///     .root_dir(".")
    ///     .output_file("repo-synopsis.txt")
    ///     .build()?;
    ///
    /// let stats = Pipeline::new(config)?.run()?;
    /// stats.print_summary();
    /// # Ok(())
    /// # }
    /// ```
    #[instrument(skip(self), fields(root_dir = %self.config.root_dir.display()))]
    pub fn run(self) -> Result<PipelineStats> {
        let start_time = Instant::now();
        info!("Starting synopsis with {} workers", self.config.workers);

        if !self.config.clipboard {
            let output = self.config.output_file.display().to_string();
            return self.write_phases(&self.config.output_file, start_time, output);
        }

        let temp = tempfile::Builder::new()
            .prefix("reposyn-")
            .suffix(".txt")
            .tempfile()
            .map_err(|e| Error::io(std::env::temp_dir(), e))?;
        let stats = self.write_phases(temp.path(), start_time, "clipboard".to_string())?;

        let content = fs::read(temp.path()).map_err(|e| Error::io(temp.path(), e))?;
        clipboard::copy_text(&String::from_utf8_lossy(&content))?;
        info!("✓ Copied synopsis to clipboard");

        Ok(stats)
    }

    fn write_phases(
        &self,
        target: &Path,
        start_time: Instant,
        output: String,
    ) -> Result<PipelineStats> {
        File::create(target).map_err(|e| Error::io(target, e))?;

        let repo_stats_written = self.config.repo_stats && self.append_repo_stats(target)?;

        let (scan, pool) = self.merge_files(target)?;
        info!(
            "✓ Wrote {} files ({} summarized, {} failed)",
            pool.files_inlined + pool.files_summarized,
            pool.files_summarized,
            pool.files_failed
        );

        if self.config.context_footer {
            append(target, render_context(&self.config.root_dir).as_bytes())?;
        }

        let duration = start_time.elapsed();
        info!("✓ Completed in {:.2}s", duration.as_secs_f64());

        Ok(PipelineStats::new(
            &scan,
            &pool,
            self.config.workers,
            repo_stats_written,
            duration,
            output,
        ))
    }

    /// Returns whether the header was written; history errors are non-fatal.
    fn append_repo_stats(&self, target: &Path) -> Result<bool> {
        match RepoStats::collect(&self.config.root_dir) {
            Ok(stats) => {
                append(target, stats.render().as_bytes())?;
                debug!("Wrote statistics for {} commits", stats.commit_count);
                Ok(true)
            }
            Err(e) => {
                warn!("Skipping repository statistics: {}", e);
                Ok(false)
            }
        }
    }

    /// Runs the scanner against the worker pool, appending to `target`.
    fn merge_files(&self, target: &Path) -> Result<(ScanStats, PoolStats)> {
        let config = &self.config;
        let scanner = Scanner::new(config, Some(target))?;

        let file = OpenOptions::new()
            .append(true)
            .open(target)
            .map_err(|e| Error::io(target, e))?;
        let sink = Arc::new(SharedSink::new(
            target,
            file,
            config.flush_threshold.saturating_mul(2),
        ));
        sink.write(FILES_HEADER)?;

        let (jobs_tx, jobs_rx) = bounded(config.queue_capacity);
        let pool = WorkerPool::spawn(config.workers, &jobs_rx, &sink, config.flush_threshold)?;
        drop(jobs_rx);

        let scanned = scanner.scan(&jobs_tx);
        drop(jobs_tx);
        let pooled = pool.join();

        sink.write(FILES_FOOTER)?;
        sink.flush()?;

        let pool_stats = pooled?;
        let scan_stats = scanned?;
        Ok((scan_stats, pool_stats))
    }
}

fn append(target: &Path, bytes: &[u8]) -> Result<()> {
    let mut file = OpenOptions::new()
        .append(true)
        .open(target)
        .map_err(|e| Error::io(target, e))?;
    file.write_all(bytes).map_err(|e| Error::io(target, e))
}
