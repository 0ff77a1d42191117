//! Play and teardown reports.
//!
//! Reports are accumulated by the orchestrator during one call and returned
//! to the caller unchanged afterwards. A play is forward-only: callers that
//! need atomicity diff the report against the desired state.

use serde::{Deserialize, Serialize};

/// Result of one pod created by a play.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayPodReport {
    /// Pod id assigned by the runtime.
    pub id: String,
    /// Ids of the application containers, in manifest order.
    pub containers: Vec<String>,
    /// Non-fatal per-container start errors.
    pub container_errors: Vec<String>,
    /// Informational lines (renames, exhausted address pools).
    pub logs: Vec<String>,
}

/// A volume created from a PersistentVolumeClaim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayVolumeReport {
    /// Volume name.
    pub name: String,
}

/// Result of [`crate::PlayEngine::play`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayReport {
    /// Created pods, in creation order.
    pub pods: Vec<PlayPodReport>,
    /// Created volumes, in creation order.
    pub volumes: Vec<PlayVolumeReport>,
}

impl PlayReport {
    /// Returns the ids of all created pods.
    #[must_use]
    pub fn pod_ids(&self) -> Vec<&str> {
        self.pods.iter().map(|p| p.id.as_str()).collect()
    }

    /// Returns true if any container failed to start.
    #[must_use]
    pub fn has_container_errors(&self) -> bool {
        self.pods.iter().any(|p| !p.container_errors.is_empty())
    }
}

/// Outcome of stopping one pod.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PodStopReport {
    /// Pod name as requested.
    pub name: String,
    /// Pod id, empty when the pod did not exist.
    pub id: String,
    /// Errors reported for this pod.
    pub errors: Vec<String>,
}

/// Outcome of removing one pod.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PodRmReport {
    /// Pod name as requested.
    pub name: String,
    /// Pod id, empty when the pod did not exist.
    pub id: String,
    /// Error reported for this pod, if any.
    pub error: Option<String>,
}

/// Result of [`crate::PlayEngine::play_down`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayDownReport {
    /// One entry per stopped pod name.
    pub stop: Vec<PodStopReport>,
    /// One entry per removed pod name.
    pub remove: Vec<PodRmReport>,
}
