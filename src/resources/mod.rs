//! Descriptor types for the four managed resource kinds
//!
//! Each descriptor is a plain serde record used both as desired state
//! (constructed from caller inputs) and observed state (deserialized from
//! the engine). The [`crate::resource::Resource`] impls carry each kind's
//! comparison and immutability tables.

pub mod container_cluster;
pub mod label;
pub mod pairing_key;
pub mod pairing_profile;

pub use container_cluster::ContainerCluster;
pub use label::Label;
pub use pairing_profile::{EnforcementMode, KeyLimit, PairingProfile, VisibilityLevel};
