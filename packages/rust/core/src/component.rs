//! Components and the resolver interface used to load them.

use std::future::Future;

use serde::{Deserialize, Serialize};

use carton_shared::types::{CPU, DOMAIN, HDD, IMAGE_VERSION, PROVIDER, PUBLIC_IP, RAM};
use carton_shared::{BoxCompute, CartonError, DeployBox, JsonPairs, Repo, Result, is_usable_id};
use carton_storage::RecordStore;

/// A single deployable piece of software belonging to an assembly.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Component {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "tosca_type")]
    pub tosca: String,
    #[serde(default)]
    pub inputs: JsonPairs,
    #[serde(default)]
    pub outputs: JsonPairs,
    #[serde(default)]
    pub envs: JsonPairs,
    #[serde(default)]
    pub repo: Repo,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub created_at: String,
}

impl Component {
    /// The box this component would deploy as, before any assembly overlay.
    pub fn to_box(&self) -> Result<DeployBox> {
        if !is_usable_id(&self.id) {
            return Err(CartonError::validation(format!(
                "component id '{}' is blank",
                self.id
            )));
        }
        Ok(DeployBox {
            id: self.id.clone(),
            name: self.name.clone(),
            domain_name: self.inputs.lookup(DOMAIN).to_string(),
            tosca: self.tosca.clone(),
            image_version: self.inputs.lookup(IMAGE_VERSION).to_string(),
            compute: BoxCompute {
                cpushare: self.inputs.lookup(CPU).to_string(),
                memory: self.inputs.lookup(RAM).to_string(),
                swap: String::new(),
                hdd: self.inputs.lookup(HDD).to_string(),
            },
            repo: self.repo.clone(),
            status: self.status.clone(),
            provider: self.inputs.lookup(PROVIDER).to_string(),
            public_ip: self.outputs.lookup(PUBLIC_IP).to_string(),
            ..Default::default()
        })
    }
}

/// Loads a fully populated [`Component`] by identifier.
pub trait ComponentResolver: Send + Sync {
    fn resolve(&self, id: &str) -> impl Future<Output = Result<Component>> + Send;
}

/// Resolves components from a bucket of a [`RecordStore`].
pub struct StoreResolver<'a, S> {
    store: &'a S,
    bucket: String,
}

impl<'a, S: RecordStore> StoreResolver<'a, S> {
    pub fn new(store: &'a S, bucket: impl Into<String>) -> Self {
        Self {
            store,
            bucket: bucket.into(),
        }
    }
}

impl<S: RecordStore> ComponentResolver for StoreResolver<'_, S> {
    async fn resolve(&self, id: &str) -> Result<Component> {
        self.store.fetch(&self.bucket, id).await
    }
}
