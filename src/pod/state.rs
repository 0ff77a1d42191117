//! Pod handles and lifecycle options.
//!
//! - `PodHandle`: returned by `create_pod()`, carries the runtime id
//! - `PodStopOptions` / `PodRmOptions`: teardown knobs for `stop_pods()` and
//!   `remove_pods()`

use serde::{Deserialize, Serialize};

// =============================================================================
// Pod Handle
// =============================================================================

/// A pod known to the runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PodHandle {
    /// Runtime pod id.
    pub id: String,
    /// Pod name.
    pub name: String,
    /// Infra container id, once created.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub infra_container_id: Option<String>,
}

impl PodHandle {
    /// Creates a handle for a pod without an infra container yet.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            infra_container_id: None,
        }
    }
}

// =============================================================================
// Teardown Options
// =============================================================================

/// Options for stopping pods.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PodStopOptions {
    /// Skip pods that do not exist instead of failing.
    pub ignore: bool,
    /// Seconds to wait before killing, runtime default when `None`.
    pub timeout: Option<u32>,
}

/// Options for removing pods.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PodRmOptions {
    /// Skip pods that do not exist instead of failing.
    pub ignore: bool,
    /// Remove running pods.
    pub force: bool,
}
