//! segmentctl - declarative management of segmentation policy engine objects
//!
//! segmentctl converges policy objects on a remote segmentation policy engine
//! toward a caller-supplied desired state. Each invocation resolves the target
//! object, compares it against the desired descriptor, and issues at most one
//! mutating call (create, update, or delete) - or none at all when the remote
//! state already matches. A dry-run mode reports the would-be change without
//! touching the engine.
//!
//! Four resource kinds are managed, each independently:
//! container clusters, labels, pairing profiles, and pairing keys.
//!
//! # Modules
//!
//! - [`api`] - Policy engine HTTP transport and the object API seam
//! - [`resource`] - The resource contract: field tables, natural keys, tombstones
//! - [`resources`] - Per-kind descriptor types
//! - [`reconcile`] - The generic reconciliation engine
//! - [`cli`] - Command-line surface for automation runtimes
//! - [`error`] - Error types

#![deny(missing_docs)]

pub mod api;
pub mod cli;
pub mod error;
pub mod reconcile;
pub mod resource;
pub mod resources;

pub use error::Error;

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Default HTTPS port for the policy engine
pub const DEFAULT_PORT: u16 = 443;

/// Default organization ID
pub const DEFAULT_ORG_ID: u64 = 1;

/// API version prefix for all engine endpoints
pub const API_PREFIX: &str = "/api/v2";
