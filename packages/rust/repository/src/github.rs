//! Retrieval manager for repositories hosted on github.com.

use std::path::{Path, PathBuf};
use std::process::Command;

use carton_shared::{CartonError, Result};
use tracing::{info, instrument};
use url::Url;

use crate::RetrievalManager;
use crate::pipeline::{Action, Pipeline};

const GITHUB_HOSTS: [&str; 2] = ["github.com", "www.github.com"];

/// Clones github repositories into `<workdir>/<repo-name>` with `git`.
#[derive(Debug, Clone)]
pub struct GithubManager {
    workdir: PathBuf,
    git_bin: String,
}

impl GithubManager {
    pub fn new(workdir: impl Into<PathBuf>, git_bin: impl Into<String>) -> Self {
        Self {
            workdir: workdir.into(),
            git_bin: git_bin.into(),
        }
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }
}

/// State threaded through the clone pipeline.
struct CloneArgs {
    url: Url,
    git_bin: String,
    workdir: PathBuf,
    dest: PathBuf,
}

impl RetrievalManager for GithubManager {
    fn scheme(&self) -> &str {
        "github"
    }

    #[instrument(skip(self), fields(workdir = %self.workdir.display()))]
    fn clone_repo(&self, url: &str) -> Result<PathBuf> {
        let parsed = parse_github_url(url)?;
        let dest = self.workdir.join(repo_dir_name(&parsed)?);

        info!(%url, dest = %dest.display(), "clone from github");

        let mut args = CloneArgs {
            url: parsed,
            git_bin: self.git_bin.clone(),
            workdir: self.workdir.clone(),
            dest,
        };
        clone_pipeline().execute(&mut args)?;
        Ok(args.dest)
    }
}

fn clone_pipeline() -> Pipeline<CloneArgs> {
    Pipeline::new(vec![
        Action {
            name: "prepare",
            forward: prepare,
            backward: None,
        },
        Action {
            name: "clone",
            forward: run_git_clone,
            backward: Some(remove_checkout),
        },
        Action {
            name: "verify",
            forward: verify_checkout,
            backward: None,
        },
    ])
}

fn prepare(args: &mut CloneArgs) -> Result<()> {
    std::fs::create_dir_all(&args.workdir).map_err(|e| CartonError::io(&args.workdir, e))?;
    if args.dest.exists() {
        return Err(CartonError::clone_failed(
            args.url.as_str(),
            format!("{} already exists", args.dest.display()),
        ));
    }
    Ok(())
}

fn run_git_clone(args: &mut CloneArgs) -> Result<()> {
    let output = Command::new(&args.git_bin)
        .arg("clone")
        .arg(args.url.as_str())
        .arg(&args.dest)
        .output()
        .map_err(|e| {
            CartonError::clone_failed(args.url.as_str(), format!("spawn {}: {e}", args.git_bin))
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(CartonError::clone_failed(
            args.url.as_str(),
            format!("{} exited with {}: {}", args.git_bin, output.status, stderr.trim()),
        ));
    }
    Ok(())
}

fn remove_checkout(args: &mut CloneArgs) {
    if args.dest.exists() {
        if let Err(e) = std::fs::remove_dir_all(&args.dest) {
            tracing::warn!(
                dest = %args.dest.display(),
                error = %e,
                "failed to remove partial checkout"
            );
        }
    }
}

fn verify_checkout(args: &mut CloneArgs) -> Result<()> {
    if !args.dest.join(".git").is_dir() {
        return Err(CartonError::clone_failed(
            args.url.as_str(),
            format!("{} is not a git checkout", args.dest.display()),
        ));
    }
    Ok(())
}

fn parse_github_url(url: &str) -> Result<Url> {
    let parsed =
        Url::parse(url.trim()).map_err(|e| CartonError::clone_failed(url, e.to_string()))?;
    match parsed.host_str() {
        Some(host) if GITHUB_HOSTS.contains(&host) => Ok(parsed),
        Some(host) => Err(CartonError::clone_failed(
            url,
            format!("host {host} is not github"),
        )),
        None => Err(CartonError::clone_failed(url, "missing host")),
    }
}

/// Checkout directory name: the last path segment without `.git`.
fn repo_dir_name(url: &Url) -> Result<String> {
    let name = url
        .path_segments()
        .and_then(|segments| segments.filter(|s| !s.is_empty()).next_back())
        .map(|s| s.trim_end_matches(".git"))
        .unwrap_or("");
    if name.is_empty() {
        return Err(CartonError::clone_failed(
            url.as_str(),
            "cannot derive repository name",
        ));
    }
    Ok(name.to_string())
}
