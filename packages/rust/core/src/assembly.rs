//! Assembly records and loading them, with or without their components.
//!
//! [`AssemblyStore::load_raw`] reads only the persisted record.
//! [`AssemblyStore::load`] additionally resolves every referenced component,
//! in the order the record lists them, and fails as a whole if any one of
//! them fails.

use std::collections::HashMap;
use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, instrument};

use carton_shared::types::{
    ASSEMBLY_BUCKET, CPU, DEFAULT_HDD, DOMAIN, HDD, IMAGE_VERSION, PROVIDER, PUBLIC_IP, RAM,
    SSHKEY,
};
use carton_shared::{BoxCompute, CartonError, JsonPairs, Policy, Result, is_usable_id};
use carton_storage::RecordStore;

use crate::component::{Component, ComponentResolver};

// ---------------------------------------------------------------------------
// Persisted record
// ---------------------------------------------------------------------------

/// The persisted assembly. Field names are the stored JSON keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssemblyRecord {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub json_claz: String,
    #[serde(default, rename = "tosca_type")]
    pub tosca: String,
    #[serde(default)]
    pub inputs: JsonPairs,
    #[serde(default)]
    pub outputs: JsonPairs,
    #[serde(default)]
    pub policies: Vec<Policy>,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub created_at: String,
    /// Authoritative, ordered list of member component ids.
    #[serde(default, rename = "components")]
    pub component_ids: Vec<String>,
}

impl AssemblyRecord {
    pub fn ssh_key(&self) -> &str {
        self.inputs.lookup(SSHKEY)
    }

    pub fn domain(&self) -> &str {
        self.inputs.lookup(DOMAIN)
    }

    pub fn provider(&self) -> &str {
        self.inputs.lookup(PROVIDER)
    }

    /// Public IP is discovered at runtime, so it lives in the outputs.
    pub fn public_ip(&self) -> &str {
        self.outputs.lookup(PUBLIC_IP)
    }

    pub fn image_version(&self) -> &str {
        self.inputs.lookup(IMAGE_VERSION)
    }

    pub fn cpu_share(&self) -> &str {
        self.inputs.lookup(CPU)
    }

    pub fn memory(&self) -> &str {
        self.inputs.lookup(RAM)
    }

    /// Swap is not supported yet and is always empty.
    pub fn swap(&self) -> &str {
        ""
    }

    /// Disk size, `"10"` when unset or blank.
    pub fn disk_size(&self) -> &str {
        self.disk_size_or(DEFAULT_HDD)
    }

    /// Disk size, `default` when unset or blank.
    pub fn disk_size_or<'a>(&'a self, default: &'a str) -> &'a str {
        let hdd = self.inputs.lookup(HDD);
        if hdd.trim().is_empty() { default } else { hdd }
    }

    /// Resource profile every box of this assembly is given.
    pub fn compute(&self) -> BoxCompute {
        self.compute_with(DEFAULT_HDD)
    }

    pub fn compute_with(&self, default_hdd: &str) -> BoxCompute {
        BoxCompute {
            cpushare: self.cpu_share().to_string(),
            memory: self.memory().to_string(),
            swap: self.swap().to_string(),
            hdd: self.disk_size_or(default_hdd).to_string(),
        }
    }

    /// Usable component ids in list order, each at most once.
    pub fn usable_component_ids(&self) -> impl Iterator<Item = &str> {
        let mut seen = HashSet::new();
        self.component_ids
            .iter()
            .map(String::as_str)
            .filter(|id| is_usable_id(id))
            .filter(move |id| seen.insert(*id))
    }
}

// ---------------------------------------------------------------------------
// Loaded assembly
// ---------------------------------------------------------------------------

/// An assembly record together with its resolved components.
#[derive(Debug, Clone, PartialEq)]
pub struct Assembly {
    pub record: AssemblyRecord,
    components: HashMap<String, Component>,
}

impl Assembly {
    /// Pair a record with already resolved components.
    ///
    /// Components whose ids are not listed by the record are dropped.
    pub fn new(record: AssemblyRecord, components: impl IntoIterator<Item = Component>) -> Self {
        let listed: HashSet<&str> = record.usable_component_ids().collect();
        let components = components
            .into_iter()
            .filter(|c| listed.contains(c.id.as_str()))
            .map(|c| (c.id.clone(), c))
            .collect();
        Self { record, components }
    }

    pub fn id(&self) -> &str {
        &self.record.id
    }

    pub fn component(&self, id: &str) -> Option<&Component> {
        self.components.get(id)
    }

    /// Resolved components in the record's component order.
    pub fn components(&self) -> impl Iterator<Item = &Component> {
        self.record
            .usable_component_ids()
            .filter_map(|id| self.components.get(id))
    }

    pub fn component_count(&self) -> usize {
        self.components.len()
    }
}

// ---------------------------------------------------------------------------
// Store access
// ---------------------------------------------------------------------------

/// Assembly records kept in one bucket of a [`RecordStore`].
pub struct AssemblyStore<'a, S> {
    pub(crate) store: &'a S,
    pub(crate) bucket: String,
}

impl<'a, S: RecordStore> AssemblyStore<'a, S> {
    /// Assemblies in the default `assembly` bucket.
    pub fn new(store: &'a S) -> Self {
        Self::with_bucket(store, ASSEMBLY_BUCKET)
    }

    pub fn with_bucket(store: &'a S, bucket: impl Into<String>) -> Self {
        Self {
            store,
            bucket: bucket.into(),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Fetch only the persisted record.
    #[instrument(skip(self), fields(bucket = %self.bucket))]
    pub async fn load_raw(&self, id: &str) -> Result<AssemblyRecord> {
        self.store.fetch(&self.bucket, id).await
    }

    /// Fetch the record and resolve every component it lists.
    ///
    /// Blank or single-character ids are skipped. The first component that
    /// fails to resolve aborts the load.
    #[instrument(skip(self, resolver), fields(bucket = %self.bucket))]
    pub async fn load<R: ComponentResolver>(&self, id: &str, resolver: &R) -> Result<Assembly> {
        let record = self.load_raw(id).await?;
        let mut components = HashMap::new();

        for cid in record.usable_component_ids() {
            match resolver.resolve(cid).await {
                Ok(comp) => {
                    debug!(component = cid, "resolved component");
                    components.insert(cid.to_string(), comp);
                }
                Err(e) => {
                    error!(component = cid, error = %e, "failed to get component");
                    return Err(CartonError::resolution(cid, e));
                }
            }
        }

        Ok(Assembly { record, components })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::{StaticResolver, component, record};
    use carton_storage::MemoryStore;

    #[test]
    fn accessors_read_inputs_and_outputs() {
        let mut rec = record("ASM1", &[]);
        rec.inputs = [
            ("sshkey", "key1"),
            ("domain", "megambox.com"),
            ("provider", "one"),
            ("version", "14.04"),
            ("cpu", "2"),
            ("ram", "2048"),
            ("publicip", "not-here"),
        ]
        .into_iter()
        .collect();
        rec.outputs = [("publicip", "192.168.0.7")].into_iter().collect();

        assert_eq!(rec.ssh_key(), "key1");
        assert_eq!(rec.domain(), "megambox.com");
        assert_eq!(rec.provider(), "one");
        assert_eq!(rec.image_version(), "14.04");
        assert_eq!(rec.cpu_share(), "2");
        assert_eq!(rec.memory(), "2048");
        assert_eq!(rec.public_ip(), "192.168.0.7");
        assert_eq!(rec.swap(), "");
    }

    #[test]
    fn disk_size_defaults_to_ten() {
        let mut rec = record("ASM1", &[]);
        assert_eq!(rec.disk_size(), "10");

        rec.inputs.push("hdd", "  ");
        assert_eq!(rec.disk_size(), "10");
        assert_eq!(rec.disk_size_or("25"), "25");

        let rec = AssemblyRecord {
            inputs: [("hdd", "40")].into_iter().collect(),
            ..record("ASM2", &[])
        };
        assert_eq!(rec.disk_size(), "40");
        assert_eq!(rec.compute().hdd, "40");
    }

    #[test]
    fn record_uses_stored_field_names() {
        let json = r#"{
            "id": "ASM1",
            "name": "calm-dew",
            "json_claz": "Megam::Assembly",
            "tosca_type": "tosca.torpedo.ubuntu",
            "inputs": [{"key": "provider", "value": "one"}],
            "outputs": [],
            "policies": [{"name": "bind policy", "type": "colocated", "members": ["COM1"]}],
            "status": "launching",
            "created_at": "2016-01-08 11:04:12 +0000",
            "components": ["COM1", ""]
        }"#;
        let rec: AssemblyRecord = serde_json::from_str(json).expect("decode");
        assert_eq!(rec.tosca, "tosca.torpedo.ubuntu");
        assert_eq!(rec.component_ids, vec!["COM1", ""]);
        assert_eq!(rec.policies[0].members, vec!["COM1"]);

        let encoded = serde_json::to_value(&rec).expect("encode");
        assert!(encoded.get("components").is_some());
        assert!(encoded.get("tosca_type").is_some());
    }

    #[test]
    fn usable_ids_skip_blanks_and_repeats() {
        let rec = record("ASM1", &["C1", "", " ", "x", "C2", "C1"]);
        let ids: Vec<&str> = rec.usable_component_ids().collect();
        assert_eq!(ids, vec!["C1", "C2"]);
    }

    #[tokio::test]
    async fn load_resolves_in_list_order() {
        let store = MemoryStore::new();
        let assemblies = AssemblyStore::new(&store);
        store
            .store(ASSEMBLY_BUCKET, "ASM1", &record("ASM1", &["C2", "", "C1"]))
            .await
            .unwrap();
        let resolver = StaticResolver::new([component("C1", ""), component("C2", "")]);

        let asm = assemblies.load("ASM1", &resolver).await.expect("load");
        assert_eq!(resolver.calls(), vec!["C2", "C1"]);
        assert_eq!(asm.component_count(), 2);
        let ids: Vec<&str> = asm.components().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["C2", "C1"]);
    }

    #[tokio::test]
    async fn load_fails_when_any_component_fails() {
        let store = MemoryStore::new();
        let assemblies = AssemblyStore::new(&store);
        store
            .store(ASSEMBLY_BUCKET, "ASM1", &record("ASM1", &["C1", "C9", "C2"]))
            .await
            .unwrap();
        let resolver = StaticResolver::new([component("C1", ""), component("C2", "")]);

        let err = assemblies.load("ASM1", &resolver).await.unwrap_err();
        assert!(matches!(&err, CartonError::Resolution { id, .. } if id == "C9"));
        assert!(err.is_not_found());
        // resolution stops at the failing component
        assert_eq!(resolver.calls(), vec!["C1", "C9"]);
    }

    #[tokio::test]
    async fn load_raw_skips_resolution() {
        let store = MemoryStore::new();
        let assemblies = AssemblyStore::new(&store);
        store
            .store(ASSEMBLY_BUCKET, "ASM1", &record("ASM1", &["C1"]))
            .await
            .unwrap();

        let rec = assemblies.load_raw("ASM1").await.expect("load raw");
        assert_eq!(rec.component_ids, vec!["C1"]);

        let err = assemblies.load_raw("ASM404").await.unwrap_err();
        assert!(matches!(err, CartonError::NotFound { .. }));
    }

    #[test]
    fn new_drops_unlisted_components() {
        let asm = Assembly::new(
            record("ASM1", &["C1"]),
            [component("C1", ""), component("C7", "")],
        );
        assert_eq!(asm.component_count(), 1);
        assert!(asm.component("C7").is_none());
        assert_eq!(asm.id(), "ASM1");
    }
}
