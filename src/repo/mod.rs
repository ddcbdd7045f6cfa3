//! Source discovery and repository checkout
//!
//! This module handles:
//! - Finding the source files to index under a directory
//! - Cloning a remote Git repository (or reusing an existing checkout)
//! - Loading and saving the TOML configuration

mod config;

pub use config::{
    AppConfig, DatabaseConfig, EmbeddingsConfig, ModelConfig, RepositoryConfig, RetrievalConfig,
    DEFAULT_CONFIG_FILE,
};

use anyhow::{Context, Result};
use git2::Repository as GitRepo;
use std::path::{Path, PathBuf};

/// List files under `root` ending in `extension`, sorted by path
///
/// Hidden directories and any directory named in `ignore_dirs` are skipped.
/// `root` itself is always walked, even when its name starts with a dot.
pub fn list_source_files(
    root: &Path,
    extension: &str,
    ignore_dirs: &[String],
) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for entry in walkdir::WalkDir::new(root)
        .into_iter()
        .filter_entry(|e| {
            if e.depth() == 0 || !e.file_type().is_dir() {
                return true;
            }
            let name = e.file_name().to_str().unwrap_or("");
            !name.starts_with('.') && !ignore_dirs.iter().any(|dir| dir == name)
        })
    {
        let entry = entry.with_context(|| format!("Failed to walk {:?}", root))?;
        if entry.file_type().is_file() {
            let matches = entry
                .file_name()
                .to_str()
                .map(|name| name.ends_with(extension))
                .unwrap_or(false);
            if matches {
                files.push(entry.into_path());
            }
        }
    }

    files.sort();
    Ok(files)
}

/// Name of the directory a repository URL is cloned into
pub fn repo_name(url: &str) -> Option<&str> {
    let trimmed = url.trim_end_matches('/');
    let last = trimmed.rsplit(['/', ':']).next()?;
    let name = last.strip_suffix(".git").unwrap_or(last);
    (!name.is_empty()).then_some(name)
}

/// Clone `url` under `checkout_dir` and return the checkout path
///
/// A checkout that already exists and opens as a Git repository is reused
/// as-is.
pub fn download_repo(url: &str, checkout_dir: &Path) -> Result<PathBuf> {
    let url = if url.ends_with(".git") {
        url.to_string()
    } else {
        format!("{}.git", url.trim_end_matches('/'))
    };

    let name = repo_name(&url)
        .ok_or_else(|| anyhow::anyhow!("Cannot derive a repository name from {}", url))?;
    let dest = checkout_dir.join(name);

    if dest.exists() {
        if GitRepo::open(&dest).is_ok() {
            tracing::info!("Reusing existing checkout at {:?}", dest);
            return Ok(dest);
        }
        anyhow::bail!("{:?} exists but is not a Git repository", dest);
    }

    std::fs::create_dir_all(checkout_dir)
        .with_context(|| format!("Failed to create {:?}", checkout_dir))?;

    tracing::info!("Cloning {} into {:?}", url, dest);
    GitRepo::clone(&url, &dest).with_context(|| format!("Failed to clone {}", url))?;

    Ok(dest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_repo_name() {
        assert_eq!(repo_name("https://github.com/org/project.git"), Some("project"));
        assert_eq!(repo_name("https://github.com/org/project"), Some("project"));
        assert_eq!(repo_name("git@github.com:project.git"), Some("project"));
        assert_eq!(repo_name("https://github.com/"), Some("github.com"));
        assert_eq!(repo_name(""), None);
    }

    #[test]
    fn test_list_source_files_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();

        fs::create_dir_all(root.join("pkg/sub")).unwrap();
        fs::create_dir_all(root.join(".hidden")).unwrap();
        fs::create_dir_all(root.join("venv/lib")).unwrap();

        fs::write(root.join("b.py"), "").unwrap();
        fs::write(root.join("a.py"), "").unwrap();
        fs::write(root.join("notes.txt"), "").unwrap();
        fs::write(root.join("pkg/sub/c.py"), "").unwrap();
        fs::write(root.join(".hidden/d.py"), "").unwrap();
        fs::write(root.join("venv/lib/e.py"), "").unwrap();

        let files = list_source_files(root, ".py", &["venv".to_string()]).unwrap();
        let relative: Vec<_> = files
            .iter()
            .map(|p| p.strip_prefix(root).unwrap().to_path_buf())
            .collect();

        assert_eq!(
            relative,
            vec![
                PathBuf::from("a.py"),
                PathBuf::from("b.py"),
                PathBuf::from("pkg/sub/c.py"),
            ]
        );
    }

    #[test]
    fn test_download_reuses_existing_checkout() {
        let dir = tempfile::tempdir().unwrap();
        let existing = dir.path().join("project");
        GitRepo::init(&existing).unwrap();

        let path = download_repo("https://example.invalid/org/project", dir.path()).unwrap();
        assert_eq!(path, existing);
    }

    #[test]
    fn test_download_rejects_non_git_directory() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("project")).unwrap();

        assert!(download_repo("https://example.invalid/org/project.git", dir.path()).is_err());
    }
}
