//! Closing instructions appended after the file listing.

use std::path::Path;

/// Renders the `<context>` block naming the repository.
///
/// The repository name is the last component of `repo_root`. Relative
/// roots such as `./` are resolved first; the whole path is used when no
/// component is left (e.g. `/`).
#[must_use]
pub fn render_context(repo_root: &Path) -> String {
    let resolved = match repo_root.file_name() {
        Some(_) => repo_root.to_path_buf(),
        None => repo_root
            .canonicalize()
            .unwrap_or_else(|_| repo_root.to_path_buf()),
    };
    let name = resolved
        .file_name()
        .map_or_else(|| resolved.display().to_string(), |n| n.to_string_lossy().into_owned());

    format!(
        "\n\n<context>\n\
         You are an expert software engineer who receives a summary of the repo \"{name}\".\n\
         Think about the contents and purpose of the repo.\n\
         </context>\n"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_context() {
        let block = render_context(Path::new("/home/dev/projects/reposyn"));

        assert_eq!(
            block,
            "\n\n<context>\nYou are an expert software engineer who receives a summary of the repo \"reposyn\".\nThink about the contents and purpose of the repo.\n</context>\n"
        );
    }

    #[test]
    fn test_render_context_relative_root() {
        let temp = assert_fs::TempDir::new().unwrap();
        let repo = temp.path().join("checkout");
        std::fs::create_dir_all(&repo).unwrap();

        let block = render_context(&repo.join("."));
        assert!(block.contains("summary of the repo \"checkout\""));

        let cwd = std::env::current_dir().unwrap();
        let cwd_name = cwd.file_name().unwrap().to_string_lossy().into_owned();
        let block = render_context(Path::new("./"));
        assert!(block.contains(&format!("summary of the repo \"{cwd_name}\"")));
    }

    #[test]
    fn test_render_context_without_name() {
        let block = render_context(Path::new("/"));
        assert!(block.contains("summary of the repo \"/\""));
    }
}
