//! # Pods - Blueprints, Runtime Seam, Assembly
//!
//! This module turns manifest pod instances into runtime pods.
//!
//! ```text
//!   translate::PodInstance
//!            │
//!            ▼
//!   ┌─────────────────┐   ImageStore      ┌──────────────────┐
//!   │  PodAssembler   │──────────────────▶│  ImageResolver   │
//!   │                 │   SecretsProvider └──────────────────┘
//!   │  blueprint()    │
//!   │  create()       │   ContainerRuntime
//!   └────────┬────────┘──────────────────▶ create_pod / infra / containers / start
//!            ▼
//!     report::PlayPodReport
//! ```
//!
//! ## Ordering
//!
//! Within one pod: pod, then infra container, then application containers in
//! manifest order, then start. Across pods: one [`AddressPool`] slot per pod,
//! in play order.
//!
//! ## Failure Model
//!
//! Blueprint failures create nothing. Runtime failures after `create_pod` are
//! returned as-is and leave created resources behind. A partial start is
//! reported per container and is not an error.

mod address;
mod assembler;
mod spec;
mod state;
mod traits;

pub use address::{AddressAssignment, AddressPool};
pub use assembler::{PodAssembler, apply_network_override, resolve_env};
pub use spec::{
    ContainerBlueprint, DnsSettings, HostEntry, ImageVolumeMode, InfraContainerSpec, Mount,
    MountSource, PodBlueprint, PodNetwork, PortMapping, ResourceLimits, RestartPolicy,
    SecurityOptions, auto_update_labels, resolve_pod_name,
};
pub use state::{PodHandle, PodRmOptions, PodStopOptions};
pub use traits::{ContainerRuntime, NoSecrets, SecretsProvider};
