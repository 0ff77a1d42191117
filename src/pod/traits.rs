//! Runtime collaborator traits.
//!
//! The engine drives pods through [`ContainerRuntime`] step by step:
//!
//! ```text
//! create_pod ─▶ create_infra_container ─▶ create_container (×N) ─▶ start_pod
//! ```
//!
//! Nothing is rolled back when a later step fails; resources already created
//! for the pod stay behind for the caller to inspect or tear down.

use super::{ContainerBlueprint, InfraContainerSpec, PodBlueprint, PodHandle};
use super::{PodRmOptions, PodStopOptions};
use crate::error::Result;
use crate::report::{PodRmReport, PodStopReport};
use crate::volume::VolumeRequest;
use async_trait::async_trait;

/// Container runtime used to materialize a play.
///
/// Implementations must be `Send + Sync`; the engine holds them behind an
/// `Arc` and may be shared across tasks.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Creates an empty pod.
    async fn create_pod(&self, pod: &PodBlueprint) -> Result<PodHandle>;

    /// Creates the pod's infra container and returns its id.
    async fn create_infra_container(
        &self,
        pod: &PodHandle,
        infra: &InfraContainerSpec,
    ) -> Result<String>;

    /// Creates an application container in the pod and returns its id.
    async fn create_container(
        &self,
        pod: &PodHandle,
        container: &ContainerBlueprint,
    ) -> Result<String>;

    /// Starts every container of the pod.
    ///
    /// # Errors
    ///
    /// [`Error::PodPartialFailure`](crate::Error::PodPartialFailure) when some
    /// containers started and others did not. Any other error means the pod
    /// did not start at all.
    async fn start_pod(&self, pod: &PodHandle) -> Result<()>;

    /// Stops pods by name.
    ///
    /// With `ignore` set, unknown names yield a report with an empty id.
    ///
    /// # Errors
    ///
    /// [`Error::PodNotFound`](crate::Error::PodNotFound) for an unknown name
    /// when `ignore` is false.
    async fn stop_pods(
        &self,
        names: &[String],
        options: &PodStopOptions,
    ) -> Result<Vec<PodStopReport>>;

    /// Removes pods by name.
    ///
    /// Unknown names follow the same `ignore` rule as
    /// [`stop_pods`](Self::stop_pods).
    async fn remove_pods(
        &self,
        names: &[String],
        options: &PodRmOptions,
    ) -> Result<Vec<PodRmReport>>;

    /// Creates a named volume and returns its name.
    async fn create_volume(&self, request: &VolumeRequest) -> Result<String>;
}

/// Source of secret values for `secretKeyRef` environment variables.
#[async_trait]
pub trait SecretsProvider: Send + Sync {
    /// Returns the value of `key` in `secret`, `None` if either is unknown.
    async fn lookup(&self, secret: &str, key: &str) -> Result<Option<String>>;
}

/// Secrets provider that knows no secrets.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSecrets;

#[async_trait]
impl SecretsProvider for NoSecrets {
    async fn lookup(&self, _secret: &str, _key: &str) -> Result<Option<String>> {
        Ok(None)
    }
}
