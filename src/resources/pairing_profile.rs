//! Pairing profile descriptor
//!
//! Pairing profiles control how enforcement agents are paired: the default
//! enforcement mode and visibility level, per-key usage limits, and default
//! labels applied to paired workloads.

use serde::{Deserialize, Serialize};

use crate::resource::{FieldCmp, Href, Resource};
use crate::{Error, Result};

/// Enforcement mode applied to agents paired with a profile
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnforcementMode {
    /// The agent does not take control of the host firewall
    #[default]
    Idle,
    /// No traffic is blocked by policy
    VisibilityOnly,
    /// Rules are enforced only for selected inbound services
    Selective,
    /// Rules are enforced for all inbound and outbound services
    Full,
}

/// Traffic logging level for agents paired with a profile
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisibilityLevel {
    /// Log connection information for allowed, blocked, and potentially
    /// blocked traffic
    #[default]
    FlowSummary,
    /// Log connection information for blocked and potentially blocked
    /// traffic only
    FlowDrops,
    /// Do not log traffic information
    FlowOff,
    /// Log byte counts in addition to connection details
    EnhancedDataCollection,
}

/// A per-key usage or lifespan limit: unlimited, or a positive count.
///
/// The engine serializes the unlimited case as the string `"unlimited"` and
/// bounded cases as bare integers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyLimit {
    /// No limit
    #[default]
    #[serde(rename = "unlimited")]
    Unlimited,
    /// A bounded count (uses, or seconds for lifespans)
    #[serde(untagged)]
    Count(i64),
}

impl std::str::FromStr for KeyLimit {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        if s == "unlimited" {
            return Ok(KeyLimit::Unlimited);
        }
        s.parse::<i64>()
            .map(KeyLimit::Count)
            .map_err(|_| format!("expected 'unlimited' or an integer, got '{s}'"))
    }
}

/// A policy engine pairing profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairingProfile {
    /// The profile's href, assigned by the engine on creation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,

    /// Profile display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Profile description.
    ///
    /// The engine stores an empty string rather than null when no
    /// description is given, so the desired default is `""` to keep
    /// comparisons stable.
    #[serde(default)]
    pub description: String,

    /// Whether the profile is enabled for pairing
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Default enforcement mode for paired agents
    #[serde(default)]
    pub enforcement_mode: EnforcementMode,

    /// When false, the enforcement mode can be overridden at pairing time
    #[serde(default = "default_true")]
    pub enforcement_mode_lock: bool,

    /// Traffic logging level for paired agents
    #[serde(default)]
    pub visibility_level: VisibilityLevel,

    /// When false, the visibility level can be overridden at pairing time
    #[serde(default = "default_true")]
    pub visibility_level_lock: bool,

    /// How many times each pairing key can be used
    #[serde(default)]
    pub allowed_uses_per_key: KeyLimit,

    /// How long, in seconds, each pairing key stays valid
    #[serde(default)]
    pub key_lifespan: KeyLimit,

    /// Agent software release pinned by this profile.
    ///
    /// Optional-for-comparison: when unset, the engine's default release is
    /// used and the field is excluded from equality. Observed values may be
    /// wrapped as `Default (X.Y.Z-NNNN)` and are normalized before
    /// comparison.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_software_release: Option<String>,

    /// Default labels applied to paired workloads, by href.
    ///
    /// Compared as an ordered sequence of hrefs; order matters and
    /// duplicates are preserved as given.
    #[serde(default)]
    pub labels: Vec<Href>,

    /// When false, the role label can be overridden at pairing time
    #[serde(default = "default_true")]
    pub role_label_lock: bool,

    /// When false, the app label can be overridden at pairing time
    #[serde(default = "default_true")]
    pub app_label_lock: bool,

    /// When false, the environment label can be overridden at pairing time
    #[serde(default = "default_true")]
    pub env_label_lock: bool,

    /// When false, the location label can be overridden at pairing time
    #[serde(default = "default_true")]
    pub loc_label_lock: bool,

    /// External data set identifier; must be set together with
    /// `external_data_reference`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_data_set: Option<String>,

    /// External data reference identifier; must be set together with
    /// `external_data_set`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_data_reference: Option<String>,

    /// Whether this is the engine's default pairing profile
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_default: Option<bool>,

    /// How many agents have been paired through this profile
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_use_count: Option<i64>,

    /// Creation timestamp
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,

    /// Reference to the user that created the profile
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<Href>,

    /// Last-update timestamp
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,

    /// Reference to the user that last updated the profile
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<Href>,

    /// Permissions held by the requesting user; empty means read-only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caps: Option<Vec<String>>,
}

fn default_true() -> bool {
    true
}

impl Default for PairingProfile {
    fn default() -> Self {
        Self {
            href: None,
            name: None,
            description: String::new(),
            enabled: true,
            enforcement_mode: EnforcementMode::default(),
            enforcement_mode_lock: true,
            visibility_level: VisibilityLevel::default(),
            visibility_level_lock: true,
            allowed_uses_per_key: KeyLimit::default(),
            key_lifespan: KeyLimit::default(),
            agent_software_release: None,
            labels: Vec::new(),
            role_label_lock: true,
            app_label_lock: true,
            env_label_lock: true,
            loc_label_lock: true,
            external_data_set: None,
            external_data_reference: None,
            is_default: None,
            total_use_count: None,
            created_at: None,
            created_by: None,
            updated_at: None,
            updated_by: None,
            caps: None,
        }
    }
}

impl PairingProfile {
    /// Build a desired-state profile with the given name and defaults
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }
}

/// Strips the engine's `Default (…)` wrapper from an observed release string.
///
/// The engine reports the profile's release as `Default (21.2.0-7831)` when
/// it falls back to the library default; desired state names the bare
/// version.
pub fn normalize_release(raw: &str) -> &str {
    raw.strip_prefix("Default (")
        .and_then(|rest| rest.strip_suffix(')'))
        .unwrap_or(raw)
}

fn release_matches(observed: &PairingProfile, desired: &PairingProfile) -> bool {
    let Some(want) = desired.agent_software_release.as_deref() else {
        // no release pinned: the engine default is acceptable
        return true;
    };
    match observed.agent_software_release.as_deref() {
        Some(have) => normalize_release(have) == want,
        None => false,
    }
}

fn labels_match(observed: &PairingProfile, desired: &PairingProfile) -> bool {
    let remote = observed.labels.iter().map(|l| l.href.as_str());
    let wanted = desired.labels.iter().map(|l| l.href.as_str());
    remote.eq(wanted)
}

// Optional fields skip comparison when the desired side is unset; an
// href-only invocation must converge without touching them.
static COMPARABLE: &[FieldCmp<PairingProfile>] = &[
    FieldCmp {
        name: "name",
        eq: |o, d| d.name.is_none() || o.name == d.name,
    },
    FieldCmp {
        name: "description",
        eq: |o, d| o.description == d.description,
    },
    FieldCmp {
        name: "enabled",
        eq: |o, d| o.enabled == d.enabled,
    },
    FieldCmp {
        name: "enforcement_mode",
        eq: |o, d| o.enforcement_mode == d.enforcement_mode,
    },
    FieldCmp {
        name: "enforcement_mode_lock",
        eq: |o, d| o.enforcement_mode_lock == d.enforcement_mode_lock,
    },
    FieldCmp {
        name: "visibility_level",
        eq: |o, d| o.visibility_level == d.visibility_level,
    },
    FieldCmp {
        name: "visibility_level_lock",
        eq: |o, d| o.visibility_level_lock == d.visibility_level_lock,
    },
    FieldCmp {
        name: "allowed_uses_per_key",
        eq: |o, d| o.allowed_uses_per_key == d.allowed_uses_per_key,
    },
    FieldCmp {
        name: "key_lifespan",
        eq: |o, d| o.key_lifespan == d.key_lifespan,
    },
    FieldCmp {
        name: "agent_software_release",
        eq: release_matches,
    },
    FieldCmp {
        name: "labels",
        eq: labels_match,
    },
    FieldCmp {
        name: "role_label_lock",
        eq: |o, d| o.role_label_lock == d.role_label_lock,
    },
    FieldCmp {
        name: "app_label_lock",
        eq: |o, d| o.app_label_lock == d.app_label_lock,
    },
    FieldCmp {
        name: "env_label_lock",
        eq: |o, d| o.env_label_lock == d.env_label_lock,
    },
    FieldCmp {
        name: "loc_label_lock",
        eq: |o, d| o.loc_label_lock == d.loc_label_lock,
    },
    FieldCmp {
        name: "external_data_set",
        eq: |o, d| d.external_data_set.is_none() || o.external_data_set == d.external_data_set,
    },
    FieldCmp {
        name: "external_data_reference",
        eq: |o, d| {
            d.external_data_reference.is_none()
                || o.external_data_reference == d.external_data_reference
        },
    },
];

impl Resource for PairingProfile {
    const KIND: &'static str = "pairing profile";
    const COLLECTION: &'static str = "pairing_profiles";

    fn href(&self) -> Option<&str> {
        self.href.as_deref()
    }

    fn natural_key(&self) -> Vec<(&'static str, String)> {
        match &self.name {
            Some(name) => vec![("name", name.clone())],
            None => vec![],
        }
    }

    fn validate(&self) -> Result<()> {
        if self.external_data_set.is_some() != self.external_data_reference.is_some() {
            return Err(Error::validation(
                "external_data_set and external_data_reference must be provided together",
            ));
        }
        Ok(())
    }

    fn comparable_fields() -> &'static [FieldCmp<Self>] {
        COMPARABLE
    }

    fn update_body(&self) -> Result<serde_json::Value> {
        let mut body = serde_json::to_value(self)
            .map_err(|e| Error::serialization(format!("failed to serialize pairing profile: {e}")))?;
        if let Some(map) = body.as_object_mut() {
            map.remove("href");
        }
        Ok(body)
    }
}
