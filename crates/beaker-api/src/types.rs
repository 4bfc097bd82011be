//! Wire types for the scheduler API.
//!
//! Field names follow the service's JSON conventions (camelCase).
//! Timestamps are set once by the service and never cleared: `started`
//! implies `scheduled`, and `finalized` implies `ended`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle timestamps of a session or execution.
///
/// A `None` field means the session has not reached that state yet.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExecutionState {
    /// When the scheduler assigned the session to a node.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduled: Option<DateTime<Utc>>,

    /// When the session's container started.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started: Option<DateTime<Utc>>,

    /// When the session's container exited.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ended: Option<DateTime<Utc>>,

    /// When the session's results and cleanup were fully settled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finalized: Option<DateTime<Utc>>,

    /// When cancellation was requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub canceled: Option<DateTime<Utc>>,
}

impl ExecutionState {
    /// Whether the scheduler has assigned this session to a node.
    #[must_use]
    pub fn is_scheduled(&self) -> bool {
        self.scheduled.is_some()
    }
}

/// The concrete resource allocation assigned to a scheduled session.
///
/// Immutable once observed; its absence on a [`Session`] means the
/// session has not been scheduled yet.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResourceGrant {
    /// Assigned GPU indices, e.g. `["0", "1"]`.
    pub gpus: Vec<String>,

    /// Assigned CPU count.
    pub cpu_count: f64,

    /// Memory limit in bytes.
    pub memory: i64,
}

/// An interactive, user-attachable unit of compute scheduled onto a
/// single node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Session identifier, assigned by the service.
    pub id: String,

    /// Optional friendly name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Node the session is assigned to.
    pub node: String,

    /// Lifecycle timestamps.
    #[serde(default)]
    pub state: ExecutionState,

    /// Granted resources; present only once scheduled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limits: Option<ResourceGrant>,
}

/// Requested resources for a new session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskResources {
    /// Number of GPUs requested.
    pub gpu_count: u32,
}

/// Client-side request to create a session.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSpec {
    /// Optional friendly name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Node the session should run on.
    pub node: String,

    /// Requested resources.
    pub resources: TaskResources,
}

/// Partial state update for a session.
///
/// The CLI only ever sets the cancellation timestamp; every other
/// transition is owned by the service.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionPatch {
    /// Partial execution state; only set fields are applied.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<ExecutionState>,
}

impl SessionPatch {
    /// A patch that cancels the session as of now.
    #[must_use]
    pub fn cancel_now() -> Self {
        Self {
            state: Some(ExecutionState {
                canceled: Some(Utc::now()),
                ..ExecutionState::default()
            }),
        }
    }
}

/// A worker node known to the scheduler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    /// Node identifier.
    pub id: String,

    /// Node hostname.
    #[serde(default)]
    pub hostname: String,

    /// Whether the node is cordoned (ineligible for new scheduling).
    #[serde(default)]
    pub cordoned: bool,

    /// Total node resources, if reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limits: Option<ResourceGrant>,
}

/// Partial update for a node; only cordoning is patchable here.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodePatch {
    /// Set or clear the cordoned flag.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cordoned: Option<bool>,
}

/// A unit of scheduled work on a node, as reported by the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Execution {
    /// Execution identifier.
    pub id: String,

    /// Node the execution ran on.
    #[serde(default)]
    pub node: String,

    /// Lifecycle timestamps.
    #[serde(default)]
    pub state: ExecutionState,
}

/// Paged execution listing returned by the service.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionPage {
    /// Executions in this page.
    #[serde(default)]
    pub data: Vec<Execution>,
}

/// A cluster of worker nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cluster {
    /// Cluster identifier.
    pub id: String,

    /// Cluster name.
    #[serde(default)]
    pub name: String,
}

/// Filters for listing sessions.
#[derive(Debug, Clone, Default)]
pub struct ListSessionOpts {
    /// Restrict to a node.
    pub node: Option<String>,

    /// Restrict to a cluster.
    pub cluster: Option<String>,

    /// Restrict by finalization state.
    pub finalized: Option<bool>,
}

impl ListSessionOpts {
    /// Render the filters as query parameters.
    #[must_use]
    pub fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut query = Vec::new();
        if let Some(node) = &self.node {
            query.push(("node", node.clone()));
        }
        if let Some(cluster) = &self.cluster {
            query.push(("cluster", cluster.clone()));
        }
        if let Some(finalized) = self.finalized {
            query.push(("finalized", finalized.to_string()));
        }
        query
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn execution_state_deserializes_missing_fields_as_none() {
        let state: ExecutionState = serde_json::from_str("{}").expect("parse");
        assert!(state.scheduled.is_none());
        assert!(state.canceled.is_none());
        assert!(!state.is_scheduled());
    }

    #[test]
    fn execution_state_scheduled_round_trip() {
        let json = r#"{"scheduled":"2021-03-01T12:00:00Z"}"#;
        let state: ExecutionState = serde_json::from_str(json).expect("parse");
        assert!(state.is_scheduled());
        assert!(state.started.is_none());
    }

    #[test]
    fn session_parses_without_limits() {
        let json = r#"{"id":"01ABC","node":"node-1","state":{}}"#;
        let session: Session = serde_json::from_str(json).expect("parse");
        assert_eq!(session.id, "01ABC");
        assert!(session.limits.is_none());
        assert!(session.name.is_none());
    }

    #[test]
    fn resource_grant_uses_camel_case_fields() {
        let json = r#"{"gpus":["0","1"],"cpuCount":4.0,"memory":8589934592}"#;
        let grant: ResourceGrant = serde_json::from_str(json).expect("parse");
        assert_eq!(grant.gpus, vec!["0", "1"]);
        assert_eq!(grant.cpu_count, 4.0);
        assert_eq!(grant.memory, 8 * 1024 * 1024 * 1024);
    }

    #[test]
    fn session_spec_serializes_gpu_count() {
        let spec = SessionSpec {
            name: None,
            node: "node-1".into(),
            resources: TaskResources { gpu_count: 2 },
        };
        let json = serde_json::to_value(&spec).expect("serialize");
        assert_eq!(json["node"], "node-1");
        assert_eq!(json["resources"]["gpuCount"], 2);
        assert!(json.get("name").is_none());
    }

    #[test]
    fn cancel_patch_sets_only_canceled() {
        let patch = SessionPatch::cancel_now();
        let json = serde_json::to_value(&patch).expect("serialize");
        let state = &json["state"];
        assert!(state.get("canceled").is_some());
        assert!(state.get("scheduled").is_none());
        assert!(state.get("started").is_none());
    }

    #[test]
    fn node_patch_serializes_cordoned_only_when_set() {
        let empty = serde_json::to_value(NodePatch::default()).expect("serialize");
        assert!(empty.get("cordoned").is_none());

        let patch = NodePatch {
            cordoned: Some(true),
        };
        let json = serde_json::to_value(&patch).expect("serialize");
        assert_eq!(json["cordoned"], true);
    }

    #[test]
    fn list_opts_query_includes_only_set_filters() {
        let opts = ListSessionOpts {
            node: Some("node-1".into()),
            cluster: None,
            finalized: Some(false),
        };
        let query = opts.to_query();
        assert_eq!(
            query,
            vec![("node", "node-1".to_string()), ("finalized", "false".to_string())]
        );
    }

    #[test]
    fn empty_list_opts_query_is_empty() {
        assert!(ListSessionOpts::default().to_query().is_empty());
    }
}
