//! Label descriptor
//!
//! Labels are key/value dimension markers attached to workloads. The key
//! names the dimension (e.g. `env`, `loc`) and is frozen once the label is
//! created; only the value and external data references can change.

use serde::{Deserialize, Serialize};

use crate::resource::{FieldCmp, Href, Resource};
use crate::{Error, Result};

/// A policy engine label.
///
/// When used as desired state only `key`, `value`, and the external data
/// pair are populated; the remaining fields are computed by the engine and
/// appear only on observed state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Label {
    /// The label's href, assigned by the engine on creation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,

    /// Label dimension key; cannot be changed after creation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,

    /// Label value within the dimension
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,

    /// External data set identifier; must be set together with
    /// `external_data_reference`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_data_set: Option<String>,

    /// External data reference identifier; must be set together with
    /// `external_data_set`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_data_reference: Option<String>,

    /// Soft-delete tombstone set by the engine
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted: Option<bool>,

    /// Creation timestamp
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,

    /// Reference to the user that created the label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<Href>,

    /// Last-update timestamp
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,

    /// Reference to the user that last updated the label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<Href>,
}

impl Label {
    /// Build a desired-state label from caller inputs
    pub fn new(key: Option<String>, value: Option<String>) -> Self {
        Self {
            key,
            value,
            ..Default::default()
        }
    }
}

// Every comparison skips when the desired side is unset: an href-only
// invocation names the label without restating its fields, and must
// converge without issuing an update.
static COMPARABLE: &[FieldCmp<Label>] = &[
    FieldCmp {
        name: "key",
        eq: |o, d| d.key.is_none() || o.key == d.key,
    },
    FieldCmp {
        name: "value",
        eq: |o, d| d.value.is_none() || o.value == d.value,
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

static IMMUTABLE: &[FieldCmp<Label>] = &[FieldCmp {
    name: "key",
    eq: |o, d| d.key.is_none() || o.key == d.key,
}];

impl Resource for Label {
    const KIND: &'static str = "label";
    const COLLECTION: &'static str = "labels";

    fn href(&self) -> Option<&str> {
        self.href.as_deref()
    }

    fn is_deleted(&self) -> bool {
        self.deleted.unwrap_or(false)
    }

    fn natural_key(&self) -> Vec<(&'static str, String)> {
        match (&self.key, &self.value) {
            (Some(k), Some(v)) => vec![("key", k.clone()), ("value", v.clone())],
            _ => vec![],
        }
    }

    fn validate(&self) -> Result<()> {
        if self.key.is_some() != self.value.is_some() {
            return Err(Error::validation(
                "label key and value must be provided together",
            ));
        }
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

    fn immutable_fields() -> &'static [FieldCmp<Self>] {
        IMMUTABLE
    }

    fn update_body(&self) -> Result<serde_json::Value> {
        // The key is frozen server-side, so it is never part of an update
        let mut body = serde_json::json!({});
        if let Some(value) = &self.value {
            body["value"] = serde_json::json!(value);
        }
        if let Some(eds) = &self.external_data_set {
            body["external_data_set"] = serde_json::json!(eds);
        }
        if let Some(edr) = &self.external_data_reference {
            body["external_data_reference"] = serde_json::json!(edr);
        }
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{frozen_conflict, matches};

    fn observed(key: &str, value: &str) -> Label {
        Label {
            href: Some("/orgs/1/labels/1500".to_string()),
            key: Some(key.to_string()),
            value: Some(value.to_string()),
            created_at: Some("2022-06-07T00:11:10.923Z".to_string()),
            created_by: Some(Href::new("/users/1")),
            ..Default::default()
        }
    }

    #[test]
    fn matching_desired_state_is_unchanged() {
        let desired = Label::new(Some("env".into()), Some("Test".into()));
        assert!(matches(&observed("env", "Test"), &desired));
    }

    #[test]
    fn changed_value_requires_update() {
        let desired = Label::new(Some("env".into()), Some("Prod".into()));
        assert!(!matches(&observed("env", "Test"), &desired));
        // not an immutable conflict: only the value differs
        assert!(frozen_conflict(&observed("env", "Test"), &desired).is_none());
    }

    #[test]
    fn empty_desired_descriptor_matches_any_observed_state() {
        // href-only invocation: nothing restated, nothing to change
        let desired = Label {
            href: Some("/orgs/1/labels/1500".to_string()),
            ..Default::default()
        };
        assert!(matches(&observed("env", "Test"), &desired));
    }

    #[test]
    fn changed_key_is_an_immutable_conflict() {
        let desired = Label::new(Some("loc".into()), Some("Test".into()));
        assert_eq!(
            frozen_conflict(&observed("env", "Test"), &desired),
            Some("key")
        );
    }

    #[test]
    fn unset_desired_key_is_not_a_conflict() {
        let desired = Label {
            value: Some("Prod".to_string()),
            ..Default::default()
        };
        assert!(frozen_conflict(&observed("env", "Test"), &desired).is_none());
    }

    #[test]
    fn update_body_never_carries_key() {
        let desired = Label::new(Some("env".into()), Some("Prod".into()));
        let body = desired.update_body().unwrap();
        assert!(body.get("key").is_none());
        assert_eq!(body["value"], "Prod");
    }

    #[test]
    fn key_without_value_fails_validation() {
        let desired = Label::new(Some("env".into()), None);
        assert!(desired.validate().is_err());
    }

    #[test]
    fn natural_key_requires_both_fields() {
        let desired = Label::new(Some("env".into()), Some("Test".into()));
        assert_eq!(
            desired.natural_key(),
            vec![("key", "env".to_string()), ("value", "Test".to_string())]
        );
        assert!(Label::default().natural_key().is_empty());
    }

    #[test]
    fn tombstoned_label_reports_deleted() {
        let mut label = observed("env", "Test");
        label.deleted = Some(true);
        assert!(label.is_deleted());
        assert!(!observed("env", "Test").is_deleted());
    }

    #[test]
    fn desired_state_serializes_without_computed_fields() {
        let desired = Label::new(Some("env".into()), Some("Test".into()));
        let json = serde_json::to_value(&desired).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"key": "env", "value": "Test"})
        );
    }
}
