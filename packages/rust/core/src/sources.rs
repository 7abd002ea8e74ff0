//! Fetching the source repositories of a composed carton.

use std::path::PathBuf;

use tracing::{info, instrument};

use carton_repository::ManagerRegistry;
use carton_shared::{Carton, Result};

/// A checkout produced for one box.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedSource {
    /// Component id, from the repo hook.
    pub box_id: String,
    /// Assembly id, from the repo hook.
    pub carton_id: String,
    pub url: String,
    pub path: PathBuf,
}

/// Clone the repository of every box with an enabled repo, in box order.
///
/// Each repo is cloned by the manager registered for its `source` scheme.
/// The first failure stops the run and is returned; checkouts that already
/// succeeded are kept.
#[instrument(skip_all, fields(carton = %carton.id))]
pub fn fetch_sources(carton: &Carton, registry: &ManagerRegistry) -> Result<Vec<FetchedSource>> {
    let mut fetched = Vec::new();
    for b in carton.enabled_repos() {
        let path = registry.clone_repo(&b.repo.source, &b.repo.url)?;
        info!(
            box_id = %b.repo.hook.box_id,
            path = %path.display(),
            "fetched source"
        );
        fetched.push(FetchedSource {
            box_id: b.repo.hook.box_id.clone(),
            carton_id: b.repo.hook.carton_id.clone(),
            url: b.repo.url.clone(),
            path,
        });
    }
    Ok(fetched)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use carton_repository::RetrievalManager;
    use carton_shared::{CartonError, DeployBox, Hook, Repo};

    struct FakeManager {
        fail_on: &'static str,
        seen: Mutex<Vec<String>>,
    }

    impl RetrievalManager for FakeManager {
        fn scheme(&self) -> &str {
            "github"
        }

        fn clone_repo(&self, url: &str) -> Result<PathBuf> {
            self.seen.lock().unwrap().push(url.to_string());
            if url == self.fail_on {
                return Err(CartonError::clone_failed(url, "denied"));
            }
            Ok(PathBuf::from("/src").join(url.rsplit('/').next().unwrap_or("x")))
        }
    }

    fn repo_box(id: &str, source: &str, url: &str, enabled: bool) -> DeployBox {
        DeployBox {
            id: id.into(),
            repo: Repo {
                enabled,
                source: source.into(),
                url: url.into(),
                hook: Hook {
                    carton_id: "A1".into(),
                    box_id: id.into(),
                },
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn registry(fail_on: &'static str) -> ManagerRegistry {
        let mut registry = ManagerRegistry::new();
        registry.register(FakeManager {
            fail_on,
            seen: Mutex::new(Vec::new()),
        });
        registry
    }

    #[test]
    fn clones_enabled_repos_in_order() {
        let carton = Carton {
            id: "A1".into(),
            boxes: vec![
                repo_box("C1", "github", "https://github.com/a/one", true),
                repo_box("C2", "github", "https://github.com/a/two", false),
                repo_box("C3", "github", "https://github.com/a/three", true),
            ],
            ..Default::default()
        };

        let fetched = fetch_sources(&carton, &registry("")).expect("fetch");
        let got: Vec<(&str, &str)> = fetched
            .iter()
            .map(|f| (f.box_id.as_str(), f.path.to_str().unwrap()))
            .collect();
        assert_eq!(got, vec![("C1", "/src/one"), ("C3", "/src/three")]);
        assert!(fetched.iter().all(|f| f.carton_id == "A1"));
    }

    #[test]
    fn first_failure_stops() {
        let carton = Carton {
            boxes: vec![
                repo_box("C1", "github", "https://github.com/a/one", true),
                repo_box("C2", "github", "https://github.com/a/two", true),
            ],
            ..Default::default()
        };
        let err = fetch_sources(&carton, &registry("https://github.com/a/one")).unwrap_err();
        assert!(matches!(err, CartonError::Clone { .. }));
    }

    #[test]
    fn unknown_scheme_fails() {
        let carton = Carton {
            boxes: vec![repo_box("C1", "bitbucket", "https://bitbucket.org/a/one", true)],
            ..Default::default()
        };
        let err = fetch_sources(&carton, &registry("")).unwrap_err();
        assert!(err.to_string().contains("bitbucket"));
    }
}
