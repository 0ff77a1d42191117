//! In-memory collaborators shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use magikplay::image::{BuildRequest, ImageHandle, ImageStore, PullOptions, PullPolicy};
use magikplay::pod::{
    ContainerBlueprint, ContainerRuntime, InfraContainerSpec, PodBlueprint, PodHandle,
    PodRmOptions, PodStopOptions, SecretsProvider,
};
use magikplay::report::{PodRmReport, PodStopReport};
use magikplay::volume::VolumeRequest;
use magikplay::{Error, PlayOptions, Result};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Mutex;
use tempfile::TempDir;

// =============================================================================
// Runtime
// =============================================================================

/// One recorded runtime call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    CreatePod(String),
    CreateInfra { pod: String, image: String },
    CreateContainer { pod: String, name: String, infra: Option<String> },
    StartPod(String),
    StopPods(Vec<String>),
    RemovePods(Vec<String>),
    CreateVolume(String),
}

#[derive(Default)]
struct RuntimeState {
    calls: Vec<Call>,
    pods: Vec<PodBlueprint>,
    containers: Vec<(String, String, ContainerBlueprint)>,
    volumes: Vec<VolumeRequest>,
    fail_start: HashSet<String>,
    fail_create: HashSet<String>,
    next_id: usize,
}

impl RuntimeState {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}{}", self.next_id)
    }

    /// Id of a created pod; empty for unknown pods when `ignore` is set.
    fn pod_id(&self, name: &str, ignore: bool) -> Result<String> {
        if self.pods.iter().any(|p| p.name == name) {
            Ok(format!("id-{name}"))
        } else if ignore {
            Ok(String::new())
        } else {
            Err(Error::PodNotFound(name.to_string()))
        }
    }
}

/// Runtime that records every call and creates nothing.
#[derive(Default)]
pub struct FakeRuntime {
    state: Mutex<RuntimeState>,
}

impl FakeRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Containers (by runtime name) that fail when their pod starts.
    pub fn failing_start(names: &[&str]) -> Self {
        let runtime = Self::default();
        runtime.state.lock().unwrap().fail_start =
            names.iter().map(ToString::to_string).collect();
        runtime
    }

    /// Containers (by runtime name) whose creation fails.
    pub fn failing_create(names: &[&str]) -> Self {
        let runtime = Self::default();
        runtime.state.lock().unwrap().fail_create =
            names.iter().map(ToString::to_string).collect();
        runtime
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn pods(&self) -> Vec<PodBlueprint> {
        self.state.lock().unwrap().pods.clone()
    }

    pub fn pod_names(&self) -> Vec<String> {
        self.pods().into_iter().map(|p| p.name).collect()
    }

    pub fn containers(&self) -> Vec<ContainerBlueprint> {
        self.state
            .lock()
            .unwrap()
            .containers
            .iter()
            .map(|(_, _, c)| c.clone())
            .collect()
    }

    pub fn volumes(&self) -> Vec<VolumeRequest> {
        self.state.lock().unwrap().volumes.clone()
    }
}

#[async_trait]
impl ContainerRuntime for FakeRuntime {
    async fn create_pod(&self, pod: &PodBlueprint) -> Result<PodHandle> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::CreatePod(pod.name.clone()));
        state.pods.push(pod.clone());
        let id = state.next_id("pod-");
        Ok(PodHandle::new(id, pod.name.clone()))
    }

    async fn create_infra_container(
        &self,
        pod: &PodHandle,
        infra: &InfraContainerSpec,
    ) -> Result<String> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::CreateInfra {
            pod: pod.name.clone(),
            image: infra.image.reference.clone(),
        });
        Ok(state.next_id("infra-"))
    }

    async fn create_container(
        &self,
        pod: &PodHandle,
        container: &ContainerBlueprint,
    ) -> Result<String> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::CreateContainer {
            pod: pod.name.clone(),
            name: container.name.clone(),
            infra: pod.infra_container_id.clone(),
        });
        if state.fail_create.contains(&container.name) {
            return Err(Error::ContainerCreateFailed {
                name: container.name.clone(),
                reason: "name already in use".to_string(),
            });
        }
        let id = state.next_id("ctr-");
        state
            .containers
            .push((pod.id.clone(), id.clone(), container.clone()));
        Ok(id)
    }

    async fn start_pod(&self, pod: &PodHandle) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::StartPod(pod.name.clone()));

        let errors: BTreeMap<String, String> = state
            .containers
            .iter()
            .filter(|(pod_id, _, c)| *pod_id == pod.id && state.fail_start.contains(&c.name))
            .map(|(_, id, _)| (id.clone(), "exit status 1".to_string()))
            .collect();

        if errors.is_empty() {
            Ok(())
        } else {
            Err(Error::PodPartialFailure {
                pod: pod.name.clone(),
                errors,
            })
        }
    }

    async fn stop_pods(
        &self,
        names: &[String],
        options: &PodStopOptions,
    ) -> Result<Vec<PodStopReport>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::StopPods(names.to_vec()));
        names
            .iter()
            .map(|name| {
                Ok(PodStopReport {
                    name: name.clone(),
                    id: state.pod_id(name, options.ignore)?,
                    errors: Vec::new(),
                })
            })
            .collect()
    }

    async fn remove_pods(
        &self,
        names: &[String],
        options: &PodRmOptions,
    ) -> Result<Vec<PodRmReport>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::RemovePods(names.to_vec()));
        names
            .iter()
            .map(|name| {
                Ok(PodRmReport {
                    name: name.clone(),
                    id: state.pod_id(name, options.ignore)?,
                    error: None,
                })
            })
            .collect()
    }

    async fn create_volume(&self, request: &VolumeRequest) -> Result<String> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::CreateVolume(request.name.clone()));
        state.volumes.push(request.clone());
        Ok(request.name.clone())
    }
}

// =============================================================================
// Image Store
// =============================================================================

#[derive(Default)]
struct ImageState {
    pulls: Vec<(String, PullPolicy)>,
    builds: Vec<BuildRequest>,
}

/// Image store with a fixed set of local images.
#[derive(Default)]
pub struct FakeImages {
    local: HashSet<String>,
    unpullable: HashSet<String>,
    state: Mutex<ImageState>,
}

impl FakeImages {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_local(images: &[&str]) -> Self {
        Self {
            local: images.iter().map(ToString::to_string).collect(),
            ..Self::default()
        }
    }

    pub fn unpullable(images: &[&str]) -> Self {
        Self {
            unpullable: images.iter().map(ToString::to_string).collect(),
            ..Self::default()
        }
    }

    pub fn pulls(&self) -> Vec<(String, PullPolicy)> {
        self.state.lock().unwrap().pulls.clone()
    }

    pub fn builds(&self) -> Vec<BuildRequest> {
        self.state.lock().unwrap().builds.clone()
    }
}

#[async_trait]
impl ImageStore for FakeImages {
    async fn exists(&self, reference: &str) -> Result<bool> {
        Ok(self.local.contains(reference))
    }

    async fn pull(
        &self,
        reference: &str,
        policy: PullPolicy,
        _options: &PullOptions,
    ) -> Result<ImageHandle> {
        self.state
            .lock()
            .unwrap()
            .pulls
            .push((reference.to_string(), policy));
        if self.unpullable.contains(reference) {
            return Err(Error::Internal(format!("{reference}: manifest unknown")));
        }
        Ok(ImageHandle {
            name: reference.to_string(),
            id: format!("sha256-{reference}"),
        })
    }

    async fn build(&self, request: &BuildRequest) -> Result<ImageHandle> {
        self.state.lock().unwrap().builds.push(request.clone());
        Ok(ImageHandle {
            name: request.output.clone(),
            id: format!("built-{}", request.output),
        })
    }
}

// =============================================================================
// Secrets
// =============================================================================

/// Secrets provider backed by a map of `(secret, key)` pairs.
#[derive(Default)]
pub struct FakeSecrets {
    values: HashMap<(String, String), String>,
}

impl FakeSecrets {
    pub fn with(entries: &[(&str, &str, &str)]) -> Self {
        Self {
            values: entries
                .iter()
                .map(|(s, k, v)| ((s.to_string(), k.to_string()), v.to_string()))
                .collect(),
        }
    }
}

#[async_trait]
impl SecretsProvider for FakeSecrets {
    async fn lookup(&self, secret: &str, key: &str) -> Result<Option<String>> {
        Ok(self
            .values
            .get(&(secret.to_string(), key.to_string()))
            .cloned())
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Play options with an empty build context directory.
pub fn options(context: &TempDir) -> PlayOptions {
    PlayOptions {
        context_dir: Some(context.path().to_path_buf()),
        ..PlayOptions::default()
    }
}

/// Single-container pod manifest.
pub fn pod_yaml(name: &str, container: &str, image: &str) -> String {
    format!(
        "apiVersion: v1\nkind: Pod\nmetadata:\n  name: {name}\nspec:\n  containers:\n  - name: {container}\n    image: {image}\n"
    )
}

/// Claim manifest.
pub fn pvc_yaml(name: &str) -> String {
    format!("apiVersion: v1\nkind: PersistentVolumeClaim\nmetadata:\n  name: {name}\n")
}
