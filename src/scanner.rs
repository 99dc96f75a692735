use crate::{
    batch::Batcher,
    config::Config,
    error::{Error, Result},
    file::{to_slash_path, FileTask, Job},
    filter::{ExtensionSet, PathMatcher},
};
use crossbeam_channel::Sender;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};
use walkdir::{DirEntry, WalkDir};

/// Version-control metadata directory, never descended into.
const VCS_DIR: &str = ".git";

/// Statistics collected during scanning.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ScanStats {
    /// Files handed to the workers
    pub files_dispatched: usize,

    /// Jobs carrying one large file
    pub single_jobs: usize,

    /// Jobs carrying a batch of small files
    pub batch_jobs: usize,

    /// Files dropped by the ignore patterns
    pub ignored: usize,

    /// Files dropped by the extension allow-list
    pub unsupported_extension: usize,

    /// Dispatched files marked for summary rendering
    pub summarized: usize,
}

/// Walks the root directory once and feeds jobs into the queue.
pub(crate) struct Scanner {
    root_dir: PathBuf,
    extensions: ExtensionSet,
    ignore: PathMatcher,
    summarize: PathMatcher,
    small_file_threshold: u64,
    batch_threshold: u64,
    skip: Option<PathBuf>,
}

impl Scanner {
    /// Creates a scanner from configuration, loading the ignore file.
    ///
    /// `skip` names a file (usually the output target) that must never be
    /// picked up even if it lives under the root.
    ///
    /// # Errors
    ///
    /// Returns an error if the ignore file cannot be read or a pattern is
    /// invalid.
    pub(crate) fn new(config: &Config, skip: Option<&Path>) -> Result<Self> {
        let ignore = PathMatcher::load_ignore(&config.root_dir, &config.ignore_patterns)?;
        let summarize = PathMatcher::from_patterns(&config.root_dir, &config.summary_patterns)?;

        debug!(
            "Scanner ready: {} ignore patterns, {} summary patterns",
            ignore.pattern_count(),
            summarize.pattern_count()
        );

        Ok(Self {
            root_dir: config.root_dir.clone(),
            extensions: config.extensions.clone(),
            ignore,
            summarize,
            small_file_threshold: config.small_file_threshold,
            batch_threshold: config.flush_threshold as u64,
            skip: skip.and_then(|path| relative_to_root(path, &config.root_dir)),
        })
    }

    /// Walks the tree, sending every selected file to `jobs`.
    ///
    /// Small files are grouped by the [`Batcher`]; the last partial batch is
    /// sent even when the walk fails part-way.
    ///
    /// # Errors
    ///
    /// Returns the walk error that stopped the traversal, a relative-path
    /// failure, or an error if all receivers are gone.
    pub(crate) fn scan(&self, jobs: &Sender<Job>) -> Result<ScanStats> {
        let mut batcher = Batcher::new(self.batch_threshold);
        let mut stats = ScanStats::default();

        debug!("Starting scan of {}", self.root_dir.display());
        let walked = self.walk(jobs, &mut batcher, &mut stats);

        if let Some(job) = batcher.finish() {
            stats.batch_jobs += 1;
            send(jobs, job)?;
        }
        walked?;

        debug!(
            "Scan complete: {} files in {} single and {} batch jobs, {} ignored, {} other extensions",
            stats.files_dispatched,
            stats.single_jobs,
            stats.batch_jobs,
            stats.ignored,
            stats.unsupported_extension
        );
        Ok(stats)
    }

    fn walk(
        &self,
        jobs: &Sender<Job>,
        batcher: &mut Batcher,
        stats: &mut ScanStats,
    ) -> Result<()> {
        let walker = WalkDir::new(&self.root_dir)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| self.descend_into(entry));

        for entry in walker {
            let entry = entry?;
            if entry.file_type().is_dir() {
                continue;
            }

            let path = entry.path();
            let relative = pathdiff::diff_paths(path, &self.root_dir)
                .ok_or_else(|| Error::relative_path(path))?;

            if self.ignore.matches(&relative) {
                trace!("Ignored: {}", relative.display());
                stats.ignored += 1;
                continue;
            }

            if !self.extensions.contains(&relative) {
                stats.unsupported_extension += 1;
                continue;
            }

            if self.skip.as_deref() == Some(relative.as_path()) {
                debug!("Skipping output target {}", relative.display());
                continue;
            }

            let summarize = self.summarize.matches(&relative);
            let size = entry.metadata()?.len();
            let task = FileTask::new(path.to_path_buf(), to_slash_path(&relative), size, summarize);

            stats.files_dispatched += 1;
            if summarize {
                stats.summarized += 1;
            }

            if size <= self.small_file_threshold {
                if let Some(job) = batcher.add(task) {
                    stats.batch_jobs += 1;
                    send(jobs, job)?;
                }
            } else {
                stats.single_jobs += 1;
                send(jobs, Job::Single(task))?;
            }
        }

        Ok(())
    }

    /// Prunes the VCS directory and directories excluded by the ignore
    /// patterns; files below an excluded directory cannot be re-included.
    fn descend_into(&self, entry: &DirEntry) -> bool {
        if entry.depth() == 0 || !entry.file_type().is_dir() {
            return true;
        }

        if entry.file_name() == VCS_DIR {
            return false;
        }

        match entry.path().strip_prefix(&self.root_dir) {
            Ok(relative) => !self.ignore.matches_dir(relative),
            Err(_) => true,
        }
    }
}

fn send(jobs: &Sender<Job>, job: Job) -> Result<()> {
    jobs.send(job)
        .map_err(|_| Error::worker("job queue closed before the scan finished"))
}

/// Path of `path` relative to `root` when it lies inside it.
fn relative_to_root(path: &Path, root: &Path) -> Option<PathBuf> {
    let path = path.canonicalize().ok()?;
    let root = root.canonicalize().ok()?;
    path.strip_prefix(root).ok().map(Path::to_path_buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;
    use crossbeam_channel::unbounded;

    fn scan_jobs(config: &Config) -> (Vec<Job>, ScanStats) {
        let scanner = Scanner::new(config, None).unwrap();
        let (tx, rx) = unbounded();
        let stats = scanner.scan(&tx).unwrap();
        drop(tx);
        (rx.iter().collect(), stats)
    }

    fn relative_paths(jobs: &[Job]) -> Vec<String> {
        let mut paths: Vec<_> = jobs
            .iter()
            .flat_map(Job::tasks)
            .map(|t| t.relative_path.clone())
            .collect();
        paths.sort();
        paths
    }

    #[test]
    fn test_scanner_filters_by_extension() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("README.md").write_str("# readme").unwrap();
        temp.child("main.rs").write_str("fn main() {}").unwrap();
        temp.child("Makefile").write_str("all:").unwrap();
        temp.child("conf/app.YAML").write_str("a: 1").unwrap();

        let config = Config::builder().root_dir(temp.path()).build().unwrap();
        let (jobs, stats) = scan_jobs(&config);

        assert_eq!(relative_paths(&jobs), vec!["README.md", "conf/app.YAML"]);
        assert_eq!(stats.unsupported_extension, 2);
        assert_eq!(stats.files_dispatched, 2);
    }

    #[test]
    fn test_scanner_respects_gitignore() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child(".gitignore").write_str("ignored.md\nbuild/\n").unwrap();
        temp.child("included.md").write_str("keep").unwrap();
        temp.child("ignored.md").write_str("drop").unwrap();
        temp.child("build/out.txt").write_str("drop").unwrap();

        let config = Config::builder().root_dir(temp.path()).build().unwrap();
        let (jobs, stats) = scan_jobs(&config);

        assert_eq!(relative_paths(&jobs), vec!["included.md"]);
        assert_eq!(stats.ignored, 1);
    }

    #[test]
    fn test_scanner_extra_ignore_patterns() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("a.txt").write_str("a").unwrap();
        temp.child("b.json").write_str("{}").unwrap();
        temp.child("c.md").write_str("c").unwrap();

        let config = Config::builder()
            .root_dir(temp.path())
            .ignore_patterns(vec!["*.txt".into(), "*.json".into()])
            .build()
            .unwrap();
        let (jobs, _) = scan_jobs(&config);

        assert_eq!(relative_paths(&jobs), vec!["c.md"]);
    }

    #[test]
    fn test_scanner_skips_git_directory() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child(".git/description.txt").write_str("repo").unwrap();
        temp.child("notes.txt").write_str("notes").unwrap();

        let config = Config::builder().root_dir(temp.path()).build().unwrap();
        let (jobs, _) = scan_jobs(&config);

        assert_eq!(relative_paths(&jobs), vec!["notes.txt"]);
    }

    #[test]
    fn test_scanner_marks_summaries() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("data/info.txt").write_str("hello\n").unwrap();
        temp.child("README.md").write_str("# readme").unwrap();

        let config = Config::builder()
            .root_dir(temp.path())
            .summary_patterns(vec!["*.txt".into()])
            .build()
            .unwrap();
        let (jobs, stats) = scan_jobs(&config);

        let tasks: Vec<_> = jobs.iter().flat_map(Job::tasks).collect();
        assert_eq!(tasks.len(), 2);
        for task in tasks {
            assert_eq!(task.summarize, task.relative_path == "data/info.txt");
        }
        assert_eq!(stats.summarized, 1);
    }

    #[test]
    fn test_scanner_batches_small_files() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("large.md").write_str(&"x".repeat(200)).unwrap();
        for i in 0..10 {
            temp.child(format!("small/{i}.txt"))
                .write_str(&"y".repeat(30))
                .unwrap();
        }

        let config = Config::builder()
            .root_dir(temp.path())
            .small_file_threshold(50)
            .flush_threshold(100)
            .build()
            .unwrap();
        let (jobs, stats) = scan_jobs(&config);

        let singles: Vec<_> = jobs
            .iter()
            .filter(|job| matches!(job, Job::Single(_)))
            .collect();
        assert_eq!(singles.len(), 1);
        assert_eq!(stats.single_jobs, 1);

        // 30-byte files against a 100-byte threshold: batches of 4, 4, then 2.
        let batch_sizes: Vec<_> = jobs
            .iter()
            .filter_map(|job| match job {
                Job::Batch(batch) => Some(batch.len()),
                Job::Single(_) => None,
            })
            .collect();
        assert_eq!(batch_sizes, vec![4, 4, 2]);
        assert_eq!(stats.batch_jobs, 3);

        let total: usize = jobs.iter().map(Job::file_count).sum();
        assert_eq!(total, 11);
        assert_eq!(total, stats.files_dispatched);
    }

    #[test]
    fn test_scanner_cutoff_size_is_batched() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("exact.md").write_str(&"x".repeat(50)).unwrap();
        temp.child("over.md").write_str(&"x".repeat(51)).unwrap();

        let config = Config::builder()
            .root_dir(temp.path())
            .small_file_threshold(50)
            .flush_threshold(100)
            .build()
            .unwrap();
        let (jobs, stats) = scan_jobs(&config);

        assert_eq!(stats.single_jobs, 1);
        assert_eq!(stats.batch_jobs, 1);
        for job in &jobs {
            match job {
                Job::Batch(batch) => assert_eq!(batch.files[0].relative_path, "exact.md"),
                Job::Single(task) => assert_eq!(task.relative_path, "over.md"),
            }
        }
    }

    #[test]
    fn test_scanner_skips_output_target() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("notes.md").write_str("notes").unwrap();
        let output = temp.child("repo-synopsis.txt");
        output.touch().unwrap();

        let config = Config::builder().root_dir(temp.path()).build().unwrap();
        let scanner = Scanner::new(&config, Some(output.path())).unwrap();
        let (tx, rx) = unbounded();
        scanner.scan(&tx).unwrap();
        drop(tx);

        let jobs: Vec<_> = rx.iter().collect();
        assert_eq!(relative_paths(&jobs), vec!["notes.md"]);
    }

    #[test]
    fn test_scanner_reports_closed_queue() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("notes.md").write_str("notes").unwrap();

        let config = Config::builder().root_dir(temp.path()).build().unwrap();
        let scanner = Scanner::new(&config, None).unwrap();
        let (tx, rx) = unbounded();
        drop(rx);

        assert!(scanner.scan(&tx).is_err());
    }
}
