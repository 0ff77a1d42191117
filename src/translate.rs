//! Kind-specific translation of manifest documents.
//!
//! Each [`Document`] maps to exactly one [`Resource`]:
//!
//! | Kind                    | Resource                                     |
//! |-------------------------|----------------------------------------------|
//! | `Pod`                   | one [`PodInstance`]                          |
//! | `Deployment`            | `replicas` instances named `<name>-pod-<i>`  |
//! | `PersistentVolumeClaim` | one [`VolumeRequest`]                        |
//! | anything else           | [`Resource::Unsupported`]                    |

use crate::constants::REPLICA_POD_INFIX;
use crate::error::{Error, Result};
use crate::kube::{Deployment, PersistentVolumeClaim, Pod, PodTemplateSpec};
use crate::manifest::{Document, Kind};
use crate::volume::VolumeRequest;
use std::collections::HashMap;

/// A pod to create: a name plus the template it is built from.
#[derive(Debug, Clone)]
pub struct PodInstance {
    /// Pod name before collision resolution.
    pub name: String,
    /// Pod template.
    pub template: PodTemplateSpec,
    /// Annotations driving auto-update labels.
    pub annotations: HashMap<String, String>,
}

/// A translated manifest document.
#[derive(Debug, Clone)]
pub enum Resource {
    /// A single pod.
    Pod(PodInstance),
    /// Deployment replicas, built one at a time.
    Deployment(DeploymentReplicas),
    /// A volume to create.
    PersistentVolumeClaim(VolumeRequest),
    /// A kind the engine does not play.
    Unsupported(String),
}

impl Resource {
    /// Translates a document.
    ///
    /// # Errors
    ///
    /// - [`Error::Parse`] if the document does not match its kind's schema
    /// - [`Error::MissingName`] for an unnamed Deployment or claim
    /// - [`Error::InvalidOwner`] for a claim with a bad uid/gid
    pub fn from_document(document: &Document) -> Result<Self> {
        match document.kind() {
            Kind::Pod => {
                let pod: Pod = document.decode()?;
                Ok(Self::Pod(PodInstance::from_pod(pod)))
            }
            Kind::Deployment => {
                let deployment: Deployment = document.decode()?;
                Ok(Self::Deployment(expand_deployment(deployment)?))
            }
            Kind::PersistentVolumeClaim => {
                let claim: PersistentVolumeClaim = document.decode()?;
                Ok(Self::PersistentVolumeClaim(VolumeRequest::from_claim(&claim)?))
            }
            Kind::Unsupported(kind) => Ok(Self::Unsupported(kind.clone())),
        }
    }
}

impl PodInstance {
    /// Builds the instance of a bare Pod.
    #[must_use]
    pub fn from_pod(pod: Pod) -> Self {
        let annotations = pod.metadata.annotations.clone();
        Self {
            name: pod.metadata.name.clone(),
            template: pod.into(),
            annotations,
        }
    }
}

/// Returns the replica count of a deployment: 1 when unset, never negative.
#[must_use]
pub fn replica_count(replicas: Option<i32>) -> usize {
    usize::try_from(replicas.unwrap_or(1)).unwrap_or(0)
}

/// Returns the pod name of replica `index` of a deployment.
#[must_use]
pub fn replica_name(deployment: &str, index: usize) -> String {
    format!("{deployment}{REPLICA_POD_INFIX}{index}")
}

/// Returns the pod names of a deployment's replicas.
#[must_use]
pub fn replica_names(deployment: &str, replicas: Option<i32>) -> Vec<String> {
    (0..replica_count(replicas))
        .map(|i| replica_name(deployment, i))
        .collect()
}

/// The replicas of a deployment, sharing one pod template.
///
/// Instances are built on demand by [`DeploymentReplicas::instances`], one
/// at a time.
#[derive(Debug, Clone)]
pub struct DeploymentReplicas {
    name: String,
    count: usize,
    template: PodTemplateSpec,
    annotations: HashMap<String, String>,
}

impl DeploymentReplicas {
    /// Deployment name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of replicas.
    #[must_use]
    pub fn count(&self) -> usize {
        self.count
    }

    /// Yields one pod instance per replica, in index order.
    ///
    /// Replicas reuse the deployment's pod template, with the deployment's
    /// own annotations.
    pub fn instances(&self) -> impl Iterator<Item = PodInstance> + '_ {
        (0..self.count).map(|i| PodInstance {
            name: replica_name(&self.name, i),
            template: self.template.clone(),
            annotations: self.annotations.clone(),
        })
    }
}

/// Expands a deployment into its replicas.
///
/// # Errors
///
/// Returns [`Error::MissingName`] if the deployment has no name.
pub fn expand_deployment(deployment: Deployment) -> Result<DeploymentReplicas> {
    if deployment.metadata.name.is_empty() {
        return Err(Error::MissingName {
            kind: "Deployment".to_string(),
        });
    }

    Ok(DeploymentReplicas {
        count: replica_count(deployment.spec.replicas),
        name: deployment.metadata.name,
        template: deployment.spec.template,
        annotations: deployment.metadata.annotations,
    })
}

/// Derives the pod names a document produces, for teardown.
///
/// Mirrors the apply naming scheme without validating anything beyond the
/// schema: Pods by name, Deployments by replica name, other kinds none.
pub fn teardown_pod_names(document: &Document) -> Result<Vec<String>> {
    match document.kind() {
        Kind::Pod => {
            let pod: Pod = document.decode()?;
            Ok(vec![pod.metadata.name])
        }
        Kind::Deployment => {
            let deployment: Deployment = document.decode()?;
            Ok(replica_names(
                &deployment.metadata.name,
                deployment.spec.replicas,
            ))
        }
        Kind::PersistentVolumeClaim | Kind::Unsupported(_) => Ok(Vec::new()),
    }
}
