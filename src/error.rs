//! Error types for the manifest play engine.

use std::collections::BTreeMap;
use std::path::PathBuf;

/// Result type alias for play operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse classification of an [`Error`].
///
/// Callers use this to decide how to react to a failed play without
/// matching on individual variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Manifest or configmap file could not be decoded.
    Parse,
    /// A declared resource is missing required data or carries invalid values.
    Validation,
    /// An image could not be pulled or built.
    Resolution,
    /// Some containers of a pod failed to start. Never fatal to a play.
    PartialStart,
    /// The container runtime rejected an operation.
    Runtime,
    /// Local filesystem access failed.
    Io,
}

/// Errors that can occur while playing or tearing down a manifest.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    // =========================================================================
    // Manifest Errors
    // =========================================================================
    /// A manifest document or configmap file is not valid YAML, or does not
    /// match the schema of its declared kind.
    #[error("failed to parse {context}: {reason}")]
    Parse { context: String, reason: String },

    /// Manifest exceeds the accepted size.
    #[error("manifest exceeds size limit: {size} > {limit} bytes")]
    ManifestTooLarge { size: usize, limit: usize },

    /// No Pod, Deployment or PersistentVolumeClaim was realized.
    #[error("YAML document does not contain any supported kube kind")]
    NoSupportedKind,

    // =========================================================================
    // Validation Errors
    // =========================================================================
    /// A resource that requires a name has none.
    #[error("{kind} does not have a name")]
    MissingName { kind: String },

    /// A numeric owner annotation could not be parsed.
    #[error("cannot convert {field} {value:?} to integer")]
    InvalidOwner { field: String, value: String },

    /// Image pull policy string is not recognized.
    #[error("unsupported pull policy {0:?}")]
    InvalidPullPolicy(String),

    /// Network override cannot be applied to a manifest pod.
    #[error("invalid value passed to --network: {0}")]
    InvalidNetwork(String),

    /// Pod volume declaration is unusable.
    #[error("invalid volume '{name}': {reason}")]
    InvalidVolume { name: String, reason: String },

    /// Seccomp annotation value is not recognized.
    #[error("invalid seccomp path {0:?}")]
    InvalidSeccompPath(String),

    /// Generic invalid manifest content.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    // =========================================================================
    // Image Errors
    // =========================================================================
    /// Image pull failed.
    #[error("failed to pull image '{reference}': {reason}")]
    ImagePullFailed { reference: String, reason: String },

    /// Local image build failed.
    #[error("failed to build image '{reference}' from {containerfile}: {reason}")]
    ImageBuildFailed {
        reference: String,
        containerfile: PathBuf,
        reason: String,
    },

    // =========================================================================
    // Runtime Errors
    // =========================================================================
    /// Pod create failed.
    #[error("failed to create pod '{name}': {reason}")]
    PodCreateFailed { name: String, reason: String },

    /// Container create failed.
    #[error("failed to create container '{name}': {reason}")]
    ContainerCreateFailed { name: String, reason: String },

    /// Volume create failed.
    #[error("failed to create volume '{name}': {reason}")]
    VolumeCreateFailed { name: String, reason: String },

    /// Some, but not all, containers of a pod started.
    ///
    /// Keys are container ids, values the start error of that container.
    #[error("some containers failed to start in pod '{pod}'")]
    PodPartialFailure {
        pod: String,
        errors: BTreeMap<String, String>,
    },

    /// Pod start failed as a whole.
    #[error("failed to start pod '{pod}': {reason}")]
    PodStartFailed { pod: String, reason: String },

    /// Pod not found.
    ///
    /// Returned by a [`ContainerRuntime`](crate::pod::ContainerRuntime) when
    /// asked to stop or remove an unknown pod without `ignore`.
    #[error("pod not found: {0}")]
    PodNotFound(String),

    /// A Deployment replica could not be brought up.
    #[error("error encountered while bringing up pod {pod}")]
    Replica {
        pod: String,
        #[source]
        source: Box<Error>,
    },

    // =========================================================================
    // I/O Errors
    // =========================================================================
    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // =========================================================================
    // Internal Errors
    // =========================================================================
    /// Internal error (should not happen).
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Builds a [`Error::Parse`] from any displayable decoder error.
    pub(crate) fn parse(context: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::Parse {
            context: context.into(),
            reason: reason.to_string(),
        }
    }

    /// Classifies this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Parse { .. } | Self::ManifestTooLarge { .. } => ErrorKind::Parse,
            Self::NoSupportedKind
            | Self::MissingName { .. }
            | Self::InvalidOwner { .. }
            | Self::InvalidPullPolicy(_)
            | Self::InvalidNetwork(_)
            | Self::InvalidVolume { .. }
            | Self::InvalidSeccompPath(_)
            | Self::InvalidInput(_) => ErrorKind::Validation,
            Self::ImagePullFailed { .. } | Self::ImageBuildFailed { .. } => ErrorKind::Resolution,
            Self::PodPartialFailure { .. } => ErrorKind::PartialStart,
            Self::PodCreateFailed { .. }
            | Self::ContainerCreateFailed { .. }
            | Self::VolumeCreateFailed { .. }
            | Self::PodStartFailed { .. }
            | Self::PodNotFound(_)
            | Self::Internal(_) => ErrorKind::Runtime,
            Self::Replica { source, .. } => source.kind(),
            Self::Io(_) => ErrorKind::Io,
        }
    }

    /// Returns true if this is a partial pod start failure.
    #[must_use]
    pub fn is_partial_failure(&self) -> bool {
        matches!(self, Self::PodPartialFailure { .. })
    }

    /// Returns true if the error reports a missing pod.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::PodNotFound(_))
    }
}
