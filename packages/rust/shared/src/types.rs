//! Core domain types for Carton: lifecycle status, boxes, cartons, policies.

use serde::{Deserialize, Serialize};

use crate::error::CartonError;

// ---------------------------------------------------------------------------
// Well-known keys and buckets
// ---------------------------------------------------------------------------

/// Default bucket holding assembly records.
pub const ASSEMBLY_BUCKET: &str = "assembly";
/// Default bucket holding component records.
pub const COMPONENT_BUCKET: &str = "components";

pub const SSHKEY: &str = "sshkey";
pub const DOMAIN: &str = "domain";
pub const PROVIDER: &str = "provider";
pub const PUBLIC_IP: &str = "publicip";
pub const IMAGE_VERSION: &str = "version";
pub const CPU: &str = "cpu";
pub const RAM: &str = "ram";
pub const HDD: &str = "hdd";
pub const STATUS: &str = "status";
pub const LAST_STATUS_UPDATE: &str = "lastsuccessstatusupdate";

/// Disk size used when an assembly does not set `hdd`.
pub const DEFAULT_HDD: &str = "10";

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Provisioning lifecycle state reported back onto an assembly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Launching,
    Launched,
    Bootstrapping,
    Bootstrapped,
    Stateup,
    Running,
    Starting,
    Started,
    Stopping,
    Stopped,
    Upgraded,
    Destroying,
    Destroyed,
    Error,
}

impl Status {
    pub const ALL: [Status; 14] = [
        Status::Launching,
        Status::Launched,
        Status::Bootstrapping,
        Status::Bootstrapped,
        Status::Stateup,
        Status::Running,
        Status::Starting,
        Status::Started,
        Status::Stopping,
        Status::Stopped,
        Status::Upgraded,
        Status::Destroying,
        Status::Destroyed,
        Status::Error,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Launching => "launching",
            Status::Launched => "launched",
            Status::Bootstrapping => "bootstrapping",
            Status::Bootstrapped => "bootstrapped",
            Status::Stateup => "stateup",
            Status::Running => "running",
            Status::Starting => "starting",
            Status::Started => "started",
            Status::Stopping => "stopping",
            Status::Stopped => "stopped",
            Status::Upgraded => "upgraded",
            Status::Destroying => "destroying",
            Status::Destroyed => "destroyed",
            Status::Error => "error",
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Status {
    type Err = CartonError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Status::ALL
            .into_iter()
            .find(|status| status.as_str() == wanted)
            .ok_or_else(|| CartonError::validation(format!("unknown status '{s}'")))
    }
}

// ---------------------------------------------------------------------------
// Policy
// ---------------------------------------------------------------------------

/// A named policy attached to an assembly. Carried as-is, never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub members: Vec<String>,
}

// ---------------------------------------------------------------------------
// Box
// ---------------------------------------------------------------------------

/// Compute sizing handed to the provisioner for one box.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoxCompute {
    pub cpushare: String,
    pub memory: String,
    pub swap: String,
    pub hdd: String,
}

/// Back-references stamped onto an enabled repository so a later clone or
/// build can be correlated with its owner.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hook {
    /// Owning assembly id.
    #[serde(default)]
    pub carton_id: String,
    /// Owning component id.
    #[serde(default)]
    pub box_id: String,
}

/// Source repository attached to a component.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repo {
    #[serde(default)]
    pub enabled: bool,
    /// Repository kind, e.g. `source` or `image`.
    #[serde(default, rename = "type")]
    pub kind: String,
    /// Retrieval scheme, e.g. `github`.
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub hook: Hook,
}

impl Repo {
    /// A repo takes part in deployment when switched on and pointing somewhere.
    pub fn is_enabled(&self) -> bool {
        self.enabled && !self.url.trim().is_empty()
    }
}

/// The deployable runtime representation of one component.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployBox {
    /// Component id.
    pub id: String,
    /// Owning assembly id.
    pub carton_id: String,
    /// Owning assemblies group id.
    pub cartons_id: String,
    pub carton_name: String,
    pub name: String,
    pub domain_name: String,
    pub tosca: String,
    pub image_version: String,
    pub compute: BoxCompute,
    pub repo: Repo,
    pub status: String,
    pub provider: String,
    pub public_ip: String,
}

// ---------------------------------------------------------------------------
// Carton
// ---------------------------------------------------------------------------

/// In-memory bundle of boxes built from one assembly. Never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Carton {
    /// Assembly id.
    pub id: String,
    /// Assemblies group id.
    pub cartons_id: String,
    pub name: String,
    pub tosca: String,
    pub image_version: String,
    pub domain_name: String,
    pub compute: BoxCompute,
    pub provider: String,
    pub public_ip: String,
    pub boxes: Vec<DeployBox>,
}

impl Carton {
    /// Boxes whose repository should be fetched before launch.
    pub fn enabled_repos(&self) -> impl Iterator<Item = &DeployBox> {
        self.boxes.iter().filter(|b| b.repo.is_enabled())
    }
}

/// True when an identifier is long enough to be a real id rather than a
/// placeholder (trimmed length greater than one byte).
pub fn is_usable_id(id: &str) -> bool {
    id.trim().len() > 1
}
