//! Resolves a `BuildImage.from_git` source into a checked-out directory under
//! `<root>/.mnb/repo/<slug>/`, reusing a prior clone when one already exists for this repo.

use crate::error::{self, Result};
use mnb_spec::FromGit;
use regex::Regex;
use snafu::ResultExt;
use std::path::{Path, PathBuf};

/// Replace any run of characters outside `[A-Za-z0-9.-]` with `-`, mirroring the slugging
/// rule for the per-repo git cache directory name.
fn slug(repo: &str) -> String {
    let unsafe_chars = Regex::new(r"[^A-Za-z0-9.\-]+").expect("static regex is valid");
    unsafe_chars.replace_all(repo, "-").into_owned()
}

/// Resolve `from_git`, cloning or fetching into `<root>/.mnb/repo/<slug>/` as needed, and
/// check out `from_git.rev`. Returns the directory the checkout lives in.
pub fn resolve(root: &Path, from_git: &FromGit) -> Result<PathBuf> {
    let repo_dir = root.join(".mnb").join("repo").join(slug(&from_git.repo));
    log::info!(
        "resolving git source '{}' at '{}' into {}",
        from_git.repo,
        from_git.rev,
        repo_dir.display()
    );

    let repo = if repo_dir.join(".git").is_dir() {
        git2::Repository::open(&repo_dir).context(error::GitSnafu {
            repo: from_git.repo.clone(),
        })?
    } else {
        std::fs::create_dir_all(&repo_dir).context(error::DirectoryCreateSnafu {
            path: repo_dir.clone(),
        })?;
        let repo = git2::Repository::init(&repo_dir).context(error::GitSnafu {
            repo: from_git.repo.clone(),
        })?;
        repo.remote("origin", &from_git.repo)
            .context(error::GitSnafu {
                repo: from_git.repo.clone(),
            })?;
        repo
    };

    let mut remote = repo.find_remote("origin").context(error::GitSnafu {
        repo: from_git.repo.clone(),
    })?;
    remote
        .fetch::<&str>(&[], None, None)
        .context(error::GitSnafu {
            repo: from_git.repo.clone(),
        })?;

    let object = repo
        .revparse_single(&from_git.rev)
        .context(error::GitSnafu {
            repo: from_git.repo.clone(),
        })?;
    repo.checkout_tree(&object, None).context(error::GitSnafu {
        repo: from_git.repo.clone(),
    })?;
    repo.set_head_detached(object.id())
        .context(error::GitSnafu {
            repo: from_git.repo.clone(),
        })?;

    Ok(repo_dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugs_replace_unsafe_runs_with_a_single_dash() {
        assert_eq!(
            slug("https://github.com/foo/bar.git"),
            "https-github.com-foo-bar.git"
        );
        assert_eq!(slug("git@host:org/repo.git"), "git-host-org-repo.git");
    }
}
