//! Fixed pool of threads rendering jobs into the shared sink.
//!
//! Each worker assembles complete segments in a private buffer and pushes
//! the buffer to the [`SharedSink`] once it crosses the flush threshold, so
//! the lock is taken once per flush rather than once per file.

use crate::{
    error::{Error, Result},
    file::{FileTask, Job},
    sink::SharedSink,
    summary::FileSummary,
};
use crossbeam_channel::Receiver;
use std::fs::File;
use std::io::{ErrorKind, Read, Write};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, trace, warn};

const READ_CHUNK_SIZE: usize = 64 * 1024;

/// Counters accumulated by the workers.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PoolStats {
    /// Jobs taken off the queue
    pub jobs: usize,

    /// Files inlined in full
    pub files_inlined: usize,

    /// Files rendered as summaries
    pub files_summarized: usize,

    /// Files skipped after an open, read or summary error
    pub files_failed: usize,

    /// Bytes handed to the sink
    pub bytes_written: u64,

    /// Number of buffer flushes
    pub flushes: usize,
}

impl PoolStats {
    fn merge(&mut self, other: &Self) {
        self.jobs += other.jobs;
        self.files_inlined += other.files_inlined;
        self.files_summarized += other.files_summarized;
        self.files_failed += other.files_failed;
        self.bytes_written += other.bytes_written;
        self.flushes += other.flushes;
    }
}

/// Handles to the running worker threads.
pub(crate) struct WorkerPool {
    handles: Vec<JoinHandle<Result<PoolStats>>>,
}

impl WorkerPool {
    /// Spawns `workers` threads draining `jobs` into `sink`.
    ///
    /// Workers exit once every sender of the queue is dropped and the queue
    /// is empty.
    ///
    /// # Errors
    ///
    /// Returns an error if a thread cannot be spawned.
    pub(crate) fn spawn<W>(
        workers: usize,
        jobs: &Receiver<Job>,
        sink: &Arc<SharedSink<W>>,
        flush_threshold: usize,
    ) -> Result<Self>
    where
        W: Write + Send + 'static,
    {
        let handles = (0..workers)
            .map(|id| {
                let worker = Worker::new(id, Arc::clone(sink), flush_threshold);
                let jobs = jobs.clone();
                thread::Builder::new()
                    .name(format!("reposyn-worker-{id}"))
                    .spawn(move || worker.run(&jobs))
                    .map_err(|e| Error::worker(format!("failed to spawn worker {id}: {e}")))
            })
            .collect::<Result<Vec<_>>>()?;

        debug!("Spawned {} workers", handles.len());
        Ok(Self { handles })
    }

    /// Waits for every worker and sums their counters.
    ///
    /// # Errors
    ///
    /// Returns the first sink error reported by a worker, or an error if a
    /// worker panicked. All workers are joined before returning.
    pub(crate) fn join(self) -> Result<PoolStats> {
        let mut total = PoolStats::default();
        let mut first_error = None;

        for (id, handle) in self.handles.into_iter().enumerate() {
            match handle.join() {
                Ok(Ok(stats)) => total.merge(&stats),
                Ok(Err(e)) => {
                    first_error.get_or_insert(e);
                }
                Err(_) => {
                    first_error.get_or_insert_with(|| Error::worker(format!("worker {id} panicked")));
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(total),
        }
    }
}

struct Worker<W: Write> {
    id: usize,
    sink: Arc<SharedSink<W>>,
    buffer: Vec<u8>,
    chunk: Vec<u8>,
    flush_threshold: usize,
    stats: PoolStats,
}

impl<W: Write> Worker<W> {
    fn new(id: usize, sink: Arc<SharedSink<W>>, flush_threshold: usize) -> Self {
        Self {
            id,
            sink,
            buffer: Vec::with_capacity(flush_threshold.saturating_mul(2)),
            chunk: vec![0; READ_CHUNK_SIZE],
            flush_threshold,
            stats: PoolStats::default(),
        }
    }

    fn run(mut self, jobs: &Receiver<Job>) -> Result<PoolStats> {
        while let Ok(job) = jobs.recv() {
            match &job {
                Job::Single(task) => self.process(task),
                Job::Batch(batch) => {
                    for task in &batch.files {
                        self.process(task);
                    }
                }
            }
            self.stats.jobs += 1;

            if self.buffer.len() >= self.flush_threshold {
                self.flush()?;
            }
        }

        if !self.buffer.is_empty() {
            self.flush()?;
        }

        debug!(
            "Worker {} done: {} jobs, {} inlined, {} summarized, {} failed",
            self.id,
            self.stats.jobs,
            self.stats.files_inlined,
            self.stats.files_summarized,
            self.stats.files_failed
        );
        Ok(self.stats)
    }

    /// Renders one file; on failure the partial segment is discarded.
    fn process(&mut self, task: &FileTask) {
        let mark = self.buffer.len();
        let result = if task.summarize {
            self.render_summary(task)
        } else {
            self.render_full(task)
        };

        match result {
            Ok(()) if task.summarize => self.stats.files_summarized += 1,
            Ok(()) => self.stats.files_inlined += 1,
            Err(e) => {
                self.buffer.truncate(mark);
                self.stats.files_failed += 1;
                warn!(
                    "Skipping {}: {}",
                    task.absolute_path.display(),
                    e
                );
            }
        }
    }

    fn render_full(&mut self, task: &FileTask) -> Result<()> {
        trace!("Inlining {}", task.relative_path);
        let path = &task.absolute_path;
        let mut file = File::open(path).map_err(|e| Error::io(path, e))?;

        self.buffer.extend_from_slice(b"\n<File = ");
        self.buffer.extend_from_slice(task.relative_path.as_bytes());
        self.buffer.extend_from_slice(b">\n");

        loop {
            match file.read(&mut self.chunk) {
                Ok(0) => break,
                Ok(n) => self.buffer.extend_from_slice(&self.chunk[..n]),
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => return Err(Error::io(path, e)),
            }
        }

        self.buffer.extend_from_slice(b"\n</File = ");
        self.buffer.extend_from_slice(task.relative_path.as_bytes());
        self.buffer.extend_from_slice(b">\n");
        Ok(())
    }

    fn render_summary(&mut self, task: &FileTask) -> Result<()> {
        trace!("Summarizing {}", task.relative_path);
        let summary = FileSummary::from_path(&task.absolute_path)?;
        summary.render(&task.relative_path, &mut self.buffer);
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.sink.write(&self.buffer)?;
        self.stats.bytes_written += self.buffer.len() as u64;
        self.stats.flushes += 1;
        self.buffer.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file::Batch;
    use assert_fs::prelude::*;
    use crossbeam_channel::bounded;

    fn task(temp: &assert_fs::TempDir, name: &str, summarize: bool) -> FileTask {
        let path = temp.path().join(name);
        let size = std::fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
        FileTask::new(path, name.to_string(), size, summarize)
    }

    fn run_pool(jobs: Vec<Job>, workers: usize, flush_threshold: usize) -> (String, PoolStats) {
        let sink = Arc::new(SharedSink::new("mem", Vec::new(), 1024));
        let (tx, rx) = bounded(4);
        let pool = WorkerPool::spawn(workers, &rx, &sink, flush_threshold).unwrap();
        drop(rx);

        for job in jobs {
            tx.send(job).unwrap();
        }
        drop(tx);

        let stats = pool.join().unwrap();
        let sink = Arc::try_unwrap(sink).unwrap();
        (String::from_utf8(sink.into_inner().unwrap()).unwrap(), stats)
    }

    #[test]
    fn test_single_and_batch_jobs() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("big.md").write_str("# Title\n").unwrap();
        temp.child("a.txt").write_str("alpha").unwrap();
        temp.child("b.txt").write_str("beta\n").unwrap();

        let batch = Batch {
            size: 10,
            files: vec![task(&temp, "a.txt", false), task(&temp, "b.txt", false)],
        };
        let jobs = vec![Job::Single(task(&temp, "big.md", false)), Job::Batch(batch)];

        let (out, stats) = run_pool(jobs, 3, 1 << 20);

        assert!(out.contains("\n<File = big.md>\n# Title\n\n</File = big.md>\n"));
        assert!(out.contains("\n<File = a.txt>\nalpha\n</File = a.txt>\n"));
        assert!(out.contains("\n<File = b.txt>\nbeta\n\n</File = b.txt>\n"));
        assert_eq!(stats.jobs, 2);
        assert_eq!(stats.files_inlined, 3);
        assert_eq!(stats.files_failed, 0);
        assert_eq!(stats.bytes_written, out.len() as u64);
    }

    #[test]
    fn test_missing_file_is_skipped() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("present.txt").write_str("here").unwrap();

        let batch = Batch {
            size: 4,
            files: vec![task(&temp, "gone.txt", false), task(&temp, "present.txt", false)],
        };
        let (out, stats) = run_pool(vec![Job::Batch(batch)], 1, 1 << 20);

        assert!(!out.contains("gone.txt"));
        assert!(out.contains("<File = present.txt>\nhere\n</File = present.txt>"));
        assert_eq!(stats.files_failed, 1);
        assert_eq!(stats.files_inlined, 1);
    }

    #[test]
    fn test_empty_summary_leaves_no_partial_segment() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("empty.txt").touch().unwrap();
        temp.child("notes.txt").write_str("one\ntwo\n").unwrap();

        let jobs = vec![
            Job::Single(task(&temp, "empty.txt", true)),
            Job::Single(task(&temp, "notes.txt", true)),
        ];
        let (out, stats) = run_pool(jobs, 1, 1 << 20);

        assert!(!out.contains("empty.txt"));
        assert!(out.contains("<Summary of file notes.txt>"));
        assert!(out.contains("<Total lines>2</Total lines>"));
        assert_eq!(stats.files_summarized, 1);
        assert_eq!(stats.files_failed, 1);
    }

    #[test]
    fn test_small_threshold_flushes_per_job() {
        let temp = assert_fs::TempDir::new().unwrap();
        for i in 0..5 {
            temp.child(format!("f{i}.txt"))
                .write_str(&"x".repeat(32))
                .unwrap();
        }

        let jobs = (0..5)
            .map(|i| Job::Single(task(&temp, &format!("f{i}.txt"), false)))
            .collect();
        let (out, stats) = run_pool(jobs, 1, 16);

        assert_eq!(stats.flushes, 5);
        for i in 0..5 {
            assert_eq!(out.matches(&format!("<File = f{i}.txt>")).count(), 1);
        }
    }

    #[test]
    fn test_no_jobs() {
        let (out, stats) = run_pool(Vec::new(), 2, 64);
        assert!(out.is_empty());
        assert_eq!(stats, PoolStats::default());
    }
}
