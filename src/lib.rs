//! # magikplay
//!
//! **Manifest-Play Engine for a Local Pod Runtime**
//!
//! This crate takes a declarative, multi-document Kubernetes-style manifest
//! and realizes it against a local pod runtime: claims become named volumes,
//! Pods and Deployment replicas become pods with an infra container and their
//! application containers. The same manifest tears the workload down again.
//!
//! The runtime primitives and the image store are not part of this crate;
//! they are injected through the [`ContainerRuntime`] and [`ImageStore`]
//! traits.
//!
//! # Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                           magikplay                                 │
//! ├─────────────────────────────────────────────────────────────────────┤
//! │  ┌─────────────────────────────────────────────────────────────┐    │
//! │  │                       PlayEngine                            │    │
//! │  │          play(manifest)          play_down(manifest)        │    │
//! │  └─────────────────────────────────────────────────────────────┘    │
//! │                              │                                      │
//! │  ┌───────────────────────────┼───────────────────────────────┐      │
//! │  │                 Manifest Pipeline                         │      │
//! │  │  split documents → sort prerequisites → translate kinds   │      │
//! │  │  Pod │ Deployment (replicas) │ PersistentVolumeClaim      │      │
//! │  └───────────────────────────┼───────────────────────────────┘      │
//! │                              │                                      │
//! │  ┌───────────────────────────┼───────────────────────────────┐      │
//! │  │                    Pod Assembly                           │      │
//! │  │  names │ static IP/MAC │ volumes │ seccomp │ images │ env │      │
//! │  └───────────────────────────────────────────────────────────┘      │
//! ├─────────────────────────────────────────────────────────────────────┤
//! │                        Collaborators                                │
//! │  ┌──────────────────┐  ┌──────────────┐  ┌──────────────────┐       │
//! │  │ ContainerRuntime │  │  ImageStore  │  │ SecretsProvider  │       │
//! │  │ pods, containers │  │ exists, pull │  │   secretKeyRef   │       │
//! │  │ volumes          │  │ build        │  │                  │       │
//! │  └──────────────────┘  └──────────────┘  └──────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Ordering
//!
//! Workloads (Pod, Deployment) keep their manifest order. Every other kind
//! is moved in front of them, in reverse manifest order:
//!
//! ```text
//!   [Pod A, PVC X, Pod B, PVC Y]  ──▶  [PVC Y, PVC X, Pod A, Pod B]
//! ```
//!
//! # Failure Model
//!
//! A play is forward-only. The first fatal error aborts it and nothing
//! already created is removed; the error [`kind`](Error::kind) tells parse,
//! validation, resolution and runtime failures apart. Containers that fail
//! to start while their pod starts are reported in
//! [`PlayPodReport::container_errors`] and do not fail the play.
//!
//! # Size Limits
//!
//! Manifests larger than [`MAX_MANIFEST_SIZE`] are rejected before decoding.
//!
//! # Example
//!
//! ```rust,ignore
//! use magikplay::{PlayEngine, PlayOptions, PlayDownOptions};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> magikplay::Result<()> {
//!     let engine = PlayEngine::new(Arc::new(my_runtime), Arc::new(my_images));
//!
//!     let report = engine.play("app.yaml".as_ref(), &PlayOptions::default()).await?;
//!     for pod in &report.pods {
//!         println!("pod {} containers {:?}", pod.id, pod.containers);
//!     }
//!
//!     engine.play_down("app.yaml".as_ref(), &PlayDownOptions::default()).await?;
//!     Ok(())
//! }
//! ```

pub mod configmap;
pub mod constants;
pub mod error;
pub mod image;
pub mod kube;
pub mod manifest;
pub mod network;
pub mod options;
pub mod play;
pub mod report;
pub mod seccomp;
pub mod translate;
pub mod volume;

pub mod pod;

// Re-exports
pub use constants::*;
pub use error::{Error, ErrorKind, Result};
pub use image::{
    BuildIsolation, BuildRequest, ImageHandle, ImageSource, ImageStore, PullOptions, PullPolicy,
    ResolvedImage,
};
pub use manifest::{Document, Kind, parse_manifest, sort_documents};
pub use network::{NetworkMode, NetworkOverride};
pub use options::{Credentials, MacAddr, PlayDownOptions, PlayOptions, StartMode};
pub use play::PlayEngine;
pub use pod::{
    ContainerBlueprint, ContainerRuntime, InfraContainerSpec, NoSecrets, PodBlueprint, PodHandle,
    PodRmOptions, PodStopOptions, RestartPolicy, SecretsProvider,
};
pub use report::{
    PlayDownReport, PlayPodReport, PlayReport, PlayVolumeReport, PodRmReport, PodStopReport,
};
pub use seccomp::SeccompProfile;
pub use volume::VolumeRequest;
