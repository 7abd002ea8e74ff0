//! Assembly loading, carton composition, and state synchronization.
//!
//! - [`assembly`]: assembly records, accessors, and loading with components
//! - [`component`]: components, their boxes, and the resolver interface
//! - [`composer`]: building a [`Carton`](carton_shared::Carton) from an assembly
//! - [`sync`]: status updates and output merges written back to the store
//! - [`sources`]: cloning the repositories of a composed carton

pub mod assembly;
pub mod component;
pub mod composer;
pub mod sources;
pub mod sync;

#[cfg(test)]
mod testkit;

pub use assembly::{Assembly, AssemblyRecord, AssemblyStore};
pub use component::{Component, ComponentResolver, StoreResolver};
pub use composer::Composer;
pub use sources::{FetchedSource, fetch_sources};
pub use sync::status_timestamp;
