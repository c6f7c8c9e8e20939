use std::path::{Path, PathBuf};

use git2::{BranchType, Repository, WorktreeAddOptions};

use crate::error::TransportError;

/// Make sure `worktree_path` is a worktree of the repository at `repo_path`
/// checked out on `branch`. Creates the branch from HEAD if needed and
/// reuses an existing worktree of the same name.
pub fn ensure_shared_worktree(
    repo_path: &Path,
    worktree_path: &Path,
    branch: &str,
) -> Result<PathBuf, TransportError> {
    let repo = Repository::discover(repo_path).map_err(|e| TransportError::read(repo_path, e))?;
    let name = worktree_name(branch);

    if let Ok(existing) = repo.find_worktree(&name) {
        if existing.validate().is_ok() {
            tracing::debug!("Reusing worktree {name} at {}", existing.path().display());
            return Ok(existing.path().to_path_buf());
        }
        tracing::warn!("Worktree {name} is stale, pruning");
        existing
            .prune(None)
            .map_err(|e| TransportError::write(worktree_path, e))?;
    }

    let git_err = |e: git2::Error| TransportError::write(worktree_path, e);
    let branch_ref = match repo.find_branch(branch, BranchType::Local) {
        Ok(b) => b.into_reference(),
        Err(_) => {
            let head = repo.head().and_then(|h| h.peel_to_commit()).map_err(git_err)?;
            repo.branch(branch, &head, false).map_err(git_err)?.into_reference()
        }
    };

    if let Some(parent) = worktree_path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| TransportError::write(parent, e))?;
    }
    let mut opts = WorktreeAddOptions::new();
    opts.reference(Some(&branch_ref));
    let worktree = repo.worktree(&name, worktree_path, Some(&opts)).map_err(git_err)?;
    tracing::info!("Created worktree {name} at {}", worktree.path().display());
    Ok(worktree.path().to_path_buf())
}

fn worktree_name(branch: &str) -> String {
    branch.replace('/', "-")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn repo_with_commit(path: &Path) -> Repository {
        let repo = Repository::init(path).unwrap();
        {
            let sig = git2::Signature::now("GitBrain", "gitbrain@example.com").unwrap();
            let tree_id = repo.index().unwrap().write_tree().unwrap();
            let tree = repo.find_tree(tree_id).unwrap();
            repo.commit(Some("HEAD"), &sig, &sig, "init", &tree, &[])
                .unwrap();
        }
        repo
    }

    #[test]
    fn test_creates_branch_and_worktree_then_reuses() {
        let tmp = TempDir::new().unwrap();
        let repo_dir = tmp.path().join("repo");
        let repo = repo_with_commit(&repo_dir);
        let wt = tmp.path().join("shared");

        let first = ensure_shared_worktree(&repo_dir, &wt, "gitbrain/messages").unwrap();
        assert!(wt.join(".git").exists());
        assert!(repo.find_branch("gitbrain/messages", BranchType::Local).is_ok());
        assert!(repo.find_worktree("gitbrain-messages").is_ok());

        let second = ensure_shared_worktree(&repo_dir, &wt, "gitbrain/messages").unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_worktree_name_flattens_branch() {
        assert_eq!(worktree_name("a/b/c"), "a-b-c");
    }
}
