//! Turning an assembly and its components into a [`Carton`] of boxes.

use tracing::{info, instrument};

use carton_shared::types::DEFAULT_HDD;
use carton_shared::{Carton, DeployBox, Result, is_usable_id};
use carton_storage::RecordStore;

use crate::assembly::{Assembly, AssemblyStore};
use crate::component::ComponentResolver;

impl Assembly {
    /// One box per resolved component, in component order.
    ///
    /// Components whose own id is blank or a single character are skipped.
    /// Each box is tied back to this assembly and its group, takes the
    /// assembly's provider and public IP when it has none of its own, and is
    /// always given the assembly's resource profile.
    pub fn make_boxes(&self, assemblies_id: &str, default_hdd: &str) -> Result<Vec<DeployBox>> {
        let record = &self.record;
        let compute = record.compute_with(default_hdd);

        self.components()
            .filter(|comp| is_usable_id(&comp.id))
            .map(|comp| -> Result<DeployBox> {
                let mut b = comp.to_box()?;
                b.carton_id = record.id.clone();
                b.cartons_id = assemblies_id.to_string();
                b.carton_name = record.name.clone();
                if b.provider.trim().is_empty() {
                    b.provider = record.provider().to_string();
                }
                if b.public_ip.trim().is_empty() {
                    b.public_ip = record.public_ip().to_string();
                }
                if b.repo.is_enabled() {
                    // hook points at the assembly as well as the component
                    b.repo.hook.carton_id = record.id.clone();
                    b.repo.hook.box_id = comp.id.clone();
                }
                b.compute = compute.clone();
                Ok(b)
            })
            .collect()
    }

    pub fn to_carton(&self, assemblies_id: &str, default_hdd: &str) -> Result<Carton> {
        let boxes = self.make_boxes(assemblies_id, default_hdd)?;
        let record = &self.record;
        Ok(Carton {
            id: record.id.clone(),
            cartons_id: assemblies_id.to_string(),
            name: record.name.clone(),
            tosca: record.tosca.clone(),
            image_version: record.image_version().to_string(),
            domain_name: record.domain().to_string(),
            compute: record.compute_with(default_hdd),
            provider: record.provider().to_string(),
            public_ip: record.public_ip().to_string(),
            boxes,
        })
    }
}

/// Builds cartons from stored assemblies.
pub struct Composer<'a, S, R> {
    assemblies: AssemblyStore<'a, S>,
    resolver: &'a R,
    default_hdd: String,
}

impl<'a, S: RecordStore, R: ComponentResolver> Composer<'a, S, R> {
    pub fn new(assemblies: AssemblyStore<'a, S>, resolver: &'a R) -> Self {
        Self {
            assemblies,
            resolver,
            default_hdd: DEFAULT_HDD.to_string(),
        }
    }

    /// Disk size given to boxes whose assembly leaves `hdd` blank.
    pub fn with_default_hdd(mut self, hdd: impl Into<String>) -> Self {
        self.default_hdd = hdd.into();
        self
    }

    /// Load `assembly_id` with its components and compose its carton.
    ///
    /// Any failure aborts the whole composition.
    #[instrument(skip(self))]
    pub async fn compose(&self, assemblies_id: &str, assembly_id: &str) -> Result<Carton> {
        let assembly = self.assemblies.load(assembly_id, self.resolver).await?;
        let carton = assembly.to_carton(assemblies_id, &self.default_hdd)?;
        info!(boxes = carton.boxes.len(), name = %carton.name, "composed carton");
        Ok(carton)
    }
}
