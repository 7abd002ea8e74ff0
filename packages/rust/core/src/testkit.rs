//! Fixtures shared by the unit tests of this crate.

use std::collections::HashMap;
use std::sync::Mutex;

use carton_shared::types::COMPONENT_BUCKET;
use carton_shared::{CartonError, Result};

use crate::assembly::AssemblyRecord;
use crate::component::{Component, ComponentResolver};

/// An assembly record listing `component_ids` and nothing else.
pub(crate) fn record(id: &str, component_ids: &[&str]) -> AssemblyRecord {
    AssemblyRecord {
        id: id.to_string(),
        name: format!("{id}-name"),
        component_ids: component_ids.iter().map(|c| c.to_string()).collect(),
        ..Default::default()
    }
}

/// A component with an optional `provider` input.
pub(crate) fn component(id: &str, provider: &str) -> Component {
    let mut comp = Component {
        id: id.to_string(),
        name: format!("{id}-name"),
        ..Default::default()
    };
    if !provider.is_empty() {
        comp.inputs.push("provider", provider);
    }
    comp
}

/// Resolves from a fixed set of components and records every request.
pub(crate) struct StaticResolver {
    components: HashMap<String, Component>,
    calls: Mutex<Vec<String>>,
}

impl StaticResolver {
    pub(crate) fn new(components: impl IntoIterator<Item = Component>) -> Self {
        Self {
            components: components
                .into_iter()
                .map(|c| (c.id.clone(), c))
                .collect(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl ComponentResolver for StaticResolver {
    async fn resolve(&self, id: &str) -> Result<Component> {
        self.calls.lock().unwrap().push(id.to_string());
        self.components
            .get(id)
            .cloned()
            .ok_or_else(|| CartonError::not_found(COMPONENT_BUCKET, id))
    }
}
