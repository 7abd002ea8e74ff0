//! Source retrieval managers for component repositories.
//!
//! A [`RetrievalManager`] knows how to clone one kind of repository (keyed by
//! a scheme such as `github`). Managers are collected in an explicit
//! [`ManagerRegistry`] built at start-up and passed to whoever needs to clone.

mod github;
pub mod pipeline;

use std::collections::HashMap;
use std::path::PathBuf;

use carton_shared::{CartonError, RepositoryConfig, Result, expand_home};

pub use github::GithubManager;
pub use pipeline::{Action, Pipeline};

/// Clones repositories for one scheme.
///
/// A clone either fully succeeds, returning the checkout directory, or fails
/// without leaving a partial checkout behind.
pub trait RetrievalManager: Send + Sync {
    /// Scheme this manager is registered under.
    fn scheme(&self) -> &str;

    /// Clone `url` and return the checkout directory.
    fn clone_repo(&self, url: &str) -> Result<PathBuf>;
}

/// Scheme → manager mapping.
#[derive(Default)]
pub struct ManagerRegistry {
    managers: HashMap<String, Box<dyn RetrievalManager>>,
}

impl ManagerRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the built-in managers configured from `config`.
    pub fn with_defaults(config: &RepositoryConfig) -> Result<Self> {
        let mut registry = Self::new();
        registry.register(GithubManager::new(
            expand_home(&config.workdir)?,
            config.git_bin.clone(),
        ));
        Ok(registry)
    }

    /// Register `manager` under its scheme, replacing any previous one.
    pub fn register(&mut self, manager: impl RetrievalManager + 'static) {
        let scheme = manager.scheme().to_string();
        tracing::debug!(%scheme, "registering retrieval manager");
        self.managers.insert(scheme, Box::new(manager));
    }

    pub fn get(&self, scheme: &str) -> Option<&dyn RetrievalManager> {
        self.managers.get(scheme).map(|m| m.as_ref())
    }

    /// Registered schemes, sorted.
    pub fn schemes(&self) -> Vec<&str> {
        let mut schemes: Vec<&str> = self.managers.keys().map(String::as_str).collect();
        schemes.sort_unstable();
        schemes
    }

    /// Clone `url` with the manager for `scheme`.
    pub fn clone_repo(&self, scheme: &str, url: &str) -> Result<PathBuf> {
        let manager = self.get(scheme).ok_or_else(|| {
            CartonError::clone_failed(url, format!("no retrieval manager for scheme '{scheme}'"))
        })?;
        manager.clone_repo(url)
    }
}
