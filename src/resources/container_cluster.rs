//! Container cluster descriptor
//!
//! Container clusters mirror Kubernetes or OpenShift clusters synced to the
//! engine by an in-cluster agent. Only `name` and `description` are
//! caller-managed; every other field is computed from sync data and is never
//! part of desired state.

use serde::{Deserialize, Serialize};

use crate::resource::{FieldCmp, Resource};
use crate::Result;

/// A node belonging to a container cluster, as reported by the sync agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterNode {
    /// Node name
    pub name: String,
    /// The node's pod subnet range
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pod_subnet: Option<String>,
}

/// A policy engine container cluster.
///
/// The pairing token in `container_cluster_token` is returned only on
/// creation and can never be retrieved again, so callers must persist it
/// from the creation result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContainerCluster {
    /// The cluster's href, assigned by the engine on creation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,

    /// Cluster display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Cluster description
    #[serde(default)]
    pub description: String,

    /// Engine fully-qualified domain name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pce_fqdn: Option<String>,

    /// Cluster manager type and version, e.g. "Kubernetes v1.24.1"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manager_type: Option<String>,

    /// Timestamp of the last heartbeat from the cluster
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_connected: Option<String>,

    /// Version of the sync agent paired with this cluster
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kubelink_version: Option<String>,

    /// Whether the cluster is currently online
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub online: Option<bool>,

    /// Node names and pod subnets reported by the sync agent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nodes: Option<Vec<ClusterNode>>,

    /// Default container runtime for the cluster
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_runtime: Option<String>,

    /// Sync errors reported against the cluster
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<serde_json::Value>>,

    /// Permissions held by the requesting user; empty means read-only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caps: Option<Vec<String>>,

    /// One-time pairing token, present only in the creation response
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_cluster_token: Option<String>,
}

impl ContainerCluster {
    /// Build a desired-state cluster from caller inputs
    pub fn new(name: Option<String>, description: impl Into<String>) -> Self {
        Self {
            name,
            description: description.into(),
            ..Default::default()
        }
    }
}

// The name comparison skips when the desired side is unset, so an
// href-only invocation converges without renaming the cluster.
static COMPARABLE: &[FieldCmp<ContainerCluster>] = &[
    FieldCmp {
        name: "name",
        eq: |o, d| d.name.is_none() || o.name == d.name,
    },
    FieldCmp {
        name: "description",
        eq: |o, d| o.description == d.description,
    },
];

impl Resource for ContainerCluster {
    const KIND: &'static str = "container cluster";
    const COLLECTION: &'static str = "container_clusters";

    fn href(&self) -> Option<&str> {
        self.href.as_deref()
    }

    fn natural_key(&self) -> Vec<(&'static str, String)> {
        match &self.name {
            Some(name) => vec![("name", name.clone())],
            None => vec![],
        }
    }

    fn comparable_fields() -> &'static [FieldCmp<Self>] {
        COMPARABLE
    }

    fn update_body(&self) -> Result<serde_json::Value> {
        let mut body = serde_json::json!({ "description": self.description });
        if let Some(name) = &self.name {
            body["name"] = serde_json::json!(name);
        }
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::matches;

    fn observed() -> ContainerCluster {
        ContainerCluster {
            href: Some("/orgs/1/container_clusters/f5bef182".to_string()),
            name: Some("CC-KUBE".to_string()),
            description: "Lab cluster".to_string(),
            manager_type: Some("Kubernetes v1.24.1".to_string()),
            online: Some(true),
            nodes: Some(vec![ClusterNode {
                name: "kube-leader".to_string(),
                pod_subnet: Some("192.168.0.0/24".to_string()),
            }]),
            ..Default::default()
        }
    }

    #[test]
    fn only_name_and_description_are_compared() {
        let desired = ContainerCluster::new(Some("CC-KUBE".into()), "Lab cluster");
        assert!(matches(&observed(), &desired));

        let renamed = ContainerCluster::new(Some("CC-EKS".into()), "Lab cluster");
        assert!(!matches(&observed(), &renamed));
    }

    #[test]
    fn computed_sync_fields_do_not_affect_equality() {
        let desired = ContainerCluster::new(Some("CC-KUBE".into()), "Lab cluster");
        let mut offline = observed();
        offline.online = Some(false);
        offline.kubelink_version = Some("2.0.2.d53d7f".to_string());
        assert!(matches(&offline, &desired));
    }

    #[test]
    fn creation_token_round_trips_from_observed_state() {
        let json = serde_json::json!({
            "href": "/orgs/1/container_clusters/f5bef182",
            "name": "CC-KUBE",
            "description": "",
            "container_cluster_token": "1_0dfec0acb8e4"
        });
        let cluster: ContainerCluster = serde_json::from_value(json).unwrap();
        assert_eq!(
            cluster.container_cluster_token.as_deref(),
            Some("1_0dfec0acb8e4")
        );
    }

    #[test]
    fn desired_state_serializes_name_and_description_only() {
        let desired = ContainerCluster::new(Some("CC-KUBE".into()), "");
        let json = serde_json::to_value(&desired).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"name": "CC-KUBE", "description": ""})
        );
    }
}
