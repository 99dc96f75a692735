use std::path::{Component, Path, PathBuf};

/// A file selected by the scanner, ready to be rendered by a worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileTask {
    /// Absolute (or root-joined) path used to open the file
    pub absolute_path: PathBuf,

    /// Path relative to the traversal root, `/`-separated
    pub relative_path: String,

    /// Size observed at scan time
    pub size: u64,

    /// Render as a summary instead of inlining the content
    pub summarize: bool,
}

impl FileTask {
    /// Creates a new task.
    #[must_use]
    pub fn new(
        absolute_path: PathBuf,
        relative_path: String,
        size: u64,
        summarize: bool,
    ) -> Self {
        Self {
            absolute_path,
            relative_path,
            size,
            summarize,
        }
    }
}

/// Small files grouped into one job.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Batch {
    /// Files in traversal order
    pub files: Vec<FileTask>,

    /// Sum of the files' scan-time sizes
    pub size: u64,
}

impl Batch {
    /// Creates an empty batch with room for `capacity` files.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            files: Vec::with_capacity(capacity),
            size: 0,
        }
    }

    /// Appends a task and accounts for its size.
    pub fn push(&mut self, task: FileTask) {
        self.size += task.size;
        self.files.push(task);
    }

    /// Number of files in the batch.
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Returns true if the batch holds no files.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Unit of work placed on the job queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Job {
    /// One large file
    Single(FileTask),

    /// Several small files handled by the same worker
    Batch(Batch),
}

impl Job {
    /// Number of files carried by this job.
    #[must_use]
    pub fn file_count(&self) -> usize {
        match self {
            Self::Single(_) => 1,
            Self::Batch(batch) => batch.len(),
        }
    }

    /// Iterates the tasks carried by this job.
    pub fn tasks(&self) -> impl Iterator<Item = &FileTask> {
        let slice = match self {
            Self::Single(task) => std::slice::from_ref(task),
            Self::Batch(batch) => batch.files.as_slice(),
        };
        slice.iter()
    }
}

/// Renders a relative path with `/` separators regardless of platform.
#[must_use]
pub(crate) fn to_slash_path(path: &Path) -> String {
    path.components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}
