//! Repository discovery and the commit-log statistics header.

use crate::error::{Error, Result};
use git2::{Oid, Repository, Sort};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Directory marking a repository root.
pub const REPOSITORY_MARKER: &str = ".git";

/// Commit messages quoted in the header.
pub const RECENT_COMMITS: usize = 10;

/// Commits counted before reporting "more than".
pub const COMMIT_COUNT_CAP: usize = 100;

const DEFAULT_REMOTE_HEAD: &str = "refs/remotes/origin/HEAD";

/// Walks up from `start` to the first directory containing `.git/`.
///
/// # Errors
///
/// Returns an error if `start` cannot be made absolute or no ancestor is a
/// repository root.
pub fn find_git_root(start: &Path) -> Result<PathBuf> {
    let absolute = std::path::absolute(start).map_err(|e| Error::io(start, e))?;

    absolute
        .ancestors()
        .find(|dir| dir.join(REPOSITORY_MARKER).is_dir())
        .map(Path::to_path_buf)
        .ok_or_else(|| Error::no_repository(&absolute))
}

/// Recent history of a repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoStats {
    /// Newest first, at most [`RECENT_COMMITS`]
    pub recent_messages: Vec<String>,

    /// Commits reachable from the default branch, capped at [`COMMIT_COUNT_CAP`]
    pub commit_count: usize,

    /// More than [`COMMIT_COUNT_CAP`] commits exist
    pub capped: bool,
}

impl RepoStats {
    /// Reads history starting at `origin/HEAD`, or `HEAD` when there is no
    /// remote default branch.
    ///
    /// # Errors
    ///
    /// Returns an error if the repository cannot be opened, has no commits,
    /// or a commit cannot be read.
    pub fn collect(repo_path: &Path) -> Result<Self> {
        let repo = Repository::open(repo_path)?;
        let start = Self::start_commit(&repo)?;

        let mut revwalk = repo.revwalk()?;
        revwalk.set_sorting(Sort::TIME)?;
        revwalk.push(start)?;

        let mut recent_messages = Vec::with_capacity(RECENT_COMMITS);
        let mut seen = 0_usize;

        for oid in revwalk.take(COMMIT_COUNT_CAP + 1) {
            let oid = oid?;
            seen += 1;
            if recent_messages.len() < RECENT_COMMITS {
                let commit = repo.find_commit(oid)?;
                recent_messages.push(String::from_utf8_lossy(commit.message_bytes()).into_owned());
            }
        }

        debug!("Read {} commits from {}", seen, repo_path.display());
        Ok(Self {
            recent_messages,
            commit_count: seen.min(COMMIT_COUNT_CAP),
            capped: seen > COMMIT_COUNT_CAP,
        })
    }

    fn start_commit(repo: &Repository) -> Result<Oid> {
        let reference = match repo.find_reference(DEFAULT_REMOTE_HEAD) {
            Ok(reference) => reference,
            Err(_) => repo.head()?,
        };
        Ok(reference.peel_to_commit()?.id())
    }

    /// Renders the `<Repo statistics>` block.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::from("<Repo statistics>\n");
        out.push_str("<Most recent commits, starting at most recent>\n");
        for (i, message) in self.recent_messages.iter().enumerate() {
            let _ = write!(out, "<Commit message #{i}>\n{message}</Commit message #{i}>\n");
        }
        out.push_str("</Most recent commits, starting at most recent>\n");

        if self.capped {
            let _ = writeln!(
                out,
                "<Number of commits>> {COMMIT_COUNT_CAP}</Number of commits>"
            );
        } else {
            let _ = writeln!(
                out,
                "<Number of commits>{}</Number of commits>",
                self.commit_count
            );
        }
        out.push_str("</Repo statistics>\n");
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use git2::{Signature, Time};

    fn init_repo(dir: &Path, commits: usize) -> Repository {
        let repo = Repository::init(dir).unwrap();
        {
            let tree_id = repo.index().unwrap().write_tree().unwrap();
            let tree = repo.find_tree(tree_id).unwrap();
            let mut parent: Option<Oid> = None;

            for i in 0..commits {
                let time = Time::new(1_700_000_000 + i as i64 * 60, 0);
                let sig = Signature::new("Test", "test@example.com", &time).unwrap();
                let parents: Vec<_> = parent
                    .map(|oid| repo.find_commit(oid).unwrap())
                    .into_iter()
                    .collect();
                let parent_refs: Vec<_> = parents.iter().collect();
                let oid = repo
                    .commit(
                        Some("HEAD"),
                        &sig,
                        &sig,
                        &format!("commit {i}\n"),
                        &tree,
                        &parent_refs,
                    )
                    .unwrap();
                parent = Some(oid);
            }
        }
        repo
    }

    #[test]
    fn test_find_git_root_from_subdirectory() {
        let temp = assert_fs::TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join(".git")).unwrap();
        let nested = temp.path().join("src/deep");
        std::fs::create_dir_all(&nested).unwrap();

        let root = find_git_root(&nested).unwrap();
        assert_eq!(
            root.canonicalize().unwrap(),
            temp.path().canonicalize().unwrap()
        );
    }

    #[test]
    fn test_git_file_is_not_a_marker() {
        let temp = assert_fs::TempDir::new().unwrap();
        let inner = temp.path().join("inner");
        std::fs::create_dir_all(&inner).unwrap();
        std::fs::write(inner.join(".git"), "gitdir: elsewhere").unwrap();
        std::fs::create_dir_all(temp.path().join(".git")).unwrap();

        let root = find_git_root(&inner).unwrap();
        assert_eq!(
            root.canonicalize().unwrap(),
            temp.path().canonicalize().unwrap()
        );
    }

    #[test]
    fn test_collect_recent_commits() {
        let temp = assert_fs::TempDir::new().unwrap();
        init_repo(temp.path(), 12);

        let stats = RepoStats::collect(temp.path()).unwrap();

        assert_eq!(stats.commit_count, 12);
        assert!(!stats.capped);
        assert_eq!(stats.recent_messages.len(), RECENT_COMMITS);
        assert_eq!(stats.recent_messages[0], "commit 11\n");
        assert_eq!(stats.recent_messages[9], "commit 2\n");
    }

    #[test]
    fn test_collect_caps_commit_count() {
        let temp = assert_fs::TempDir::new().unwrap();
        init_repo(temp.path(), COMMIT_COUNT_CAP + 3);

        let stats = RepoStats::collect(temp.path()).unwrap();

        assert!(stats.capped);
        assert_eq!(stats.commit_count, COMMIT_COUNT_CAP);
        assert!(stats.render().contains("<Number of commits>> 100</Number of commits>\n"));
    }

    #[test]
    fn test_collect_without_commits_fails() {
        let temp = assert_fs::TempDir::new().unwrap();
        Repository::init(temp.path()).unwrap();

        assert!(RepoStats::collect(temp.path()).is_err());
    }

    #[test]
    fn test_render() {
        let stats = RepoStats {
            recent_messages: vec!["second\n".into(), "first\n".into()],
            commit_count: 2,
            capped: false,
        };

        let expected = "\
<Repo statistics>
<Most recent commits, starting at most recent>
<Commit message #0>
second
</Commit message #0>
<Commit message #1>
first
</Commit message #1>
</Most recent commits, starting at most recent>
<Number of commits>2</Number of commits>
</Repo statistics>
";
        assert_eq!(stats.render(), expected);
    }
}
