//! # Play Engine Constants
//!
//! Annotation keys, defaults and limits used while translating manifests.
//! These are the **single source of truth** for the names the engine
//! recognizes: any annotation or file name not listed here is ignored.
//!
//! ## Cross-References
//!
//! - [`crate::manifest`]: Uses the manifest size limit
//! - [`crate::translate`]: Uses the PVC and seccomp annotation keys
//! - [`crate::image`]: Uses the build file names and default infra image
//! - [`crate::pod`]: Uses the auto-update labels and restart policies

// =============================================================================
// Manifest Limits
// =============================================================================

/// Maximum accepted manifest size in bytes (4 MiB).
///
/// A play manifest is read fully into memory before decoding.
pub const MAX_MANIFEST_SIZE: usize = 4 * 1024 * 1024;

/// Suffix appended to a pod name that collides with one of its containers.
pub const POD_NAME_COLLISION_SUFFIX: &str = "_pod";

/// Infix used to name Deployment replicas: `<deployment>-pod-<index>`.
pub const REPLICA_POD_INFIX: &str = "-pod-";

// =============================================================================
// PersistentVolumeClaim Annotations
// =============================================================================
//
// Volume options with no PVC counterpart are configured through annotations
// so they do not affect a real Kubernetes cluster.
// =============================================================================

/// Volume driver used to create the volume.
pub const VOLUME_DRIVER_ANNOTATION: &str = "volume.podman.io/driver";

/// Device backing a `local` driver volume. Stored as option `device`.
pub const VOLUME_DEVICE_ANNOTATION: &str = "volume.podman.io/device";

/// Filesystem type of the device. Stored as option `type`.
pub const VOLUME_TYPE_ANNOTATION: &str = "volume.podman.io/type";

/// Owner uid of the volume root. Stored as option `UID`.
pub const VOLUME_UID_ANNOTATION: &str = "volume.podman.io/uid";

/// Owner gid of the volume root. Stored as option `GID`.
pub const VOLUME_GID_ANNOTATION: &str = "volume.podman.io/gid";

/// Mount options for the device. Stored as option `o`.
pub const VOLUME_MOUNT_OPTS_ANNOTATION: &str = "volume.podman.io/mount-options";

// =============================================================================
// Auto-Update Labels
// =============================================================================

/// Enables auto-update for containers. Applies to every container when set
/// bare, or to one container when suffixed with `/<container>`.
pub const AUTO_UPDATE_LABEL: &str = "io.containers.autoupdate";

/// Authfile used by auto-update. Scoped like [`AUTO_UPDATE_LABEL`].
pub const AUTO_UPDATE_AUTHFILE_LABEL: &str = "io.containers.autoupdate.authfile";

// =============================================================================
// Seccomp Annotations
// =============================================================================

/// Pod-wide seccomp profile annotation.
pub const SECCOMP_POD_ANNOTATION: &str = "seccomp.security.alpha.kubernetes.io/pod";

/// Per-container seccomp profile annotation prefix (`<prefix>/<container>`).
pub const SECCOMP_CONTAINER_ANNOTATION_PREFIX: &str = "container.seccomp.security.alpha.kubernetes.io";

/// Prefix of a seccomp value pointing at a profile under the profile root.
pub const SECCOMP_LOCALHOST_PREFIX: &str = "localhost/";

/// Seccomp value disabling filtering.
pub const SECCOMP_UNCONFINED: &str = "unconfined";

// =============================================================================
// Images
// =============================================================================

/// Image used for infra containers when no override is configured.
pub const DEFAULT_INFRA_IMAGE: &str = "k8s.gcr.io/pause:3.5";

/// Name of the infra container. Manifest containers whose name is contained
/// in this word are not created.
pub const INFRA_CONTAINER_NAME: &str = "infra";

/// Build file names probed in a local build context, in order.
pub const BUILD_FILE_NAMES: [&str; 2] = ["Containerfile", "Dockerfile"];

// =============================================================================
// Restart Policies
// =============================================================================

/// Runtime restart policy: always restart.
pub const RESTART_POLICY_ALWAYS: &str = "always";

/// Runtime restart policy: restart on non-zero exit.
pub const RESTART_POLICY_ON_FAILURE: &str = "on-failure";

/// Runtime restart policy: never restart.
pub const RESTART_POLICY_NO: &str = "no";

// =============================================================================
// Namespaces
// =============================================================================

/// Namespaces shared by every manifest pod.
pub const DEFAULT_SHARED_NAMESPACES: [&str; 3] = ["ipc", "net", "uts"];

/// Namespace added when `shareProcessNamespace` is set.
pub const PID_NAMESPACE: &str = "pid";
