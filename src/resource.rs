//! The resource contract shared by every managed kind
//!
//! Each kind declares its comparison rules as plain data: a static table of
//! named field comparisons for equality, and a second table for fields that
//! are frozen after creation. The reconciler walks these tables instead of
//! reflecting over descriptors, so a kind's policy is exhaustive and
//! type-checked.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::Result;

/// One entry in a kind's comparison table.
///
/// `eq` receives the observed object first and the desired object second.
/// A comparison may declare a field optional-for-comparison by returning
/// `true` whenever the desired side is unset.
pub struct FieldCmp<R> {
    /// Field name, used in error messages
    pub name: &'static str,
    /// Returns true when observed and desired agree on this field
    pub eq: fn(observed: &R, desired: &R) -> bool,
}

/// A reference to another policy object, by href only.
///
/// Cross-kind validity of references is the engine's responsibility.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Href {
    /// The referenced object's href
    pub href: String,
}

impl Href {
    /// Create a reference to the given href
    pub fn new(href: impl Into<String>) -> Self {
        Self { href: href.into() }
    }
}

/// Contract implemented by every managed resource kind.
///
/// A descriptor doubles as desired state (constructed from caller inputs,
/// server-computed fields unset) and observed state (deserialized from the
/// engine, server-computed fields populated). Optional fields are skipped
/// during serialization so a desired descriptor never sends computed fields.
pub trait Resource:
    Clone + Send + Sync + Serialize + DeserializeOwned + std::fmt::Debug + 'static
{
    /// Human-readable kind name, e.g. "label"
    const KIND: &'static str;

    /// Engine collection path segment, e.g. "labels"
    const COLLECTION: &'static str;

    /// The object's href, once it exists remotely
    fn href(&self) -> Option<&str>;

    /// Whether the observed object carries a soft-delete tombstone.
    ///
    /// A tombstoned object is treated as absent when intent is `present`
    /// and as already satisfied when intent is `absent`.
    fn is_deleted(&self) -> bool {
        false
    }

    /// Natural-key filter for locating this object without an href.
    ///
    /// Empty when the descriptor carries no usable natural key.
    fn natural_key(&self) -> Vec<(&'static str, String)>;

    /// Validate desired-state inputs before any remote call
    fn validate(&self) -> Result<()> {
        Ok(())
    }

    /// Comparable fields: every entry must agree for the observed object to
    /// satisfy the desired state
    fn comparable_fields() -> &'static [FieldCmp<Self>];

    /// Fields frozen after creation; an update that would change one fails
    fn immutable_fields() -> &'static [FieldCmp<Self>] {
        &[]
    }

    /// Request body for an update: mutable fields only.
    ///
    /// Fields omitted here are left untouched server-side.
    fn update_body(&self) -> Result<serde_json::Value>;
}

/// Returns true when the observed object already satisfies the desired state
pub fn matches<R: Resource>(observed: &R, desired: &R) -> bool {
    R::comparable_fields()
        .iter()
        .all(|f| (f.eq)(observed, desired))
}

/// Returns the first frozen field the desired state would change, if any
pub fn frozen_conflict<R: Resource>(observed: &R, desired: &R) -> Option<&'static str> {
    R::immutable_fields()
        .iter()
        .find(|f| !(f.eq)(observed, desired))
        .map(|f| f.name)
}
