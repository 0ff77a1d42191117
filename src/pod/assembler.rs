//! Pod assembly: from a manifest pod instance to a running pod.
//!
//! ```text
//! PodInstance
//!     │ name collision, network override, static addresses
//!     │ volumes, seccomp, restart policy
//!     │ infra image, container images, environment
//!     ▼
//! PodBlueprint ──▶ create_pod ──▶ infra ──▶ containers ──▶ start_pod
//! ```
//!
//! Everything that can be rejected up front is checked while building the
//! blueprint, so a pod whose images or volumes cannot be resolved creates
//! nothing. Runtime failures after `create_pod` are not rolled back.

use super::spec::{
    auto_update_labels, bind_mounts, resolve_pod_name, resource_limits, security_options,
};
use super::{
    AddressPool, ContainerBlueprint, ContainerRuntime, ImageVolumeMode, InfraContainerSpec,
    PodBlueprint, PodNetwork, RestartPolicy, SecretsProvider,
};
use crate::configmap;
use crate::constants::{DEFAULT_INFRA_IMAGE, INFRA_CONTAINER_NAME};
use crate::error::{Error, ErrorKind, Result};
use crate::image::{ImageResolver, ImageStore, PullOptions};
use crate::kube::{self, ConfigMap, EnvVarSource};
use crate::network::{NetworkMode, NetworkOverride};
use crate::options::PlayOptions;
use crate::report::PlayPodReport;
use crate::seccomp::SeccompPaths;
use crate::translate::PodInstance;
use crate::volume::initialize_volumes;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::{debug, info, instrument, warn};

/// Builds, creates and starts the pods of one play.
pub struct PodAssembler<'a> {
    runtime: &'a dyn ContainerRuntime,
    secrets: &'a dyn SecretsProvider,
    images: ImageResolver<'a>,
    options: &'a PlayOptions,
}

impl<'a> PodAssembler<'a> {
    /// Creates an assembler. `context_dir` is probed for image build files.
    pub fn new(
        runtime: &'a dyn ContainerRuntime,
        images: &'a dyn ImageStore,
        secrets: &'a dyn SecretsProvider,
        options: &'a PlayOptions,
        context_dir: PathBuf,
    ) -> Self {
        let pull_options = PullOptions {
            credentials: options.credentials.clone(),
            quiet: options.quiet,
        };
        Self {
            runtime,
            secrets,
            images: ImageResolver::new(images, context_dir, options.build, pull_options),
            options,
        }
    }

    /// Plays one pod: builds its blueprint, creates it and starts it.
    ///
    /// # Errors
    ///
    /// Any validation, resolution or runtime error. A partial start is not an
    /// error; failed containers are listed in the report.
    #[instrument(skip_all, fields(pod = %instance.name))]
    pub async fn play(
        &self,
        instance: &PodInstance,
        pool: &mut AddressPool<'_>,
        config_maps: &[ConfigMap],
    ) -> Result<PlayPodReport> {
        let (blueprint, logs) = self.blueprint(instance, pool, config_maps).await?;
        let mut report = self.create(&blueprint).await?;
        report.logs = logs;
        Ok(report)
    }

    /// Builds the blueprint of a pod without touching the runtime.
    ///
    /// Draws one slot from `pool` even when the blueprint is later rejected.
    /// Returns the blueprint and the informational lines for the report.
    pub async fn blueprint(
        &self,
        instance: &PodInstance,
        pool: &mut AddressPool<'_>,
        config_maps: &[ConfigMap],
    ) -> Result<(PodBlueprint, Vec<String>)> {
        if instance.name.is_empty() {
            return Err(Error::MissingName {
                kind: "pod".to_string(),
            });
        }

        let spec = &instance.template.spec;
        let (name, mut logs) = resolve_pod_name(&instance.name, &spec.containers);
        for line in &logs {
            info!(pod = %name, "{line}");
        }

        let mut blueprint = PodBlueprint::from_template(name, &instance.template);

        if let Some(network) = self.options.network.as_deref().filter(|n| !n.is_empty()) {
            let network = NetworkOverride::parse(network)?;
            network.validate_for_play()?;
            apply_network_override(&mut blueprint.network, network);
        }

        let addresses = pool.next_assignment();
        for warning in &addresses.warnings {
            warn!(pod = %blueprint.name, "{warning}");
        }
        blueprint.network.static_ip = addresses.ip;
        blueprint.network.static_mac = addresses.mac;
        logs.extend(addresses.warnings);

        let volumes = initialize_volumes(&spec.volumes)?;
        let seccomp = SeccompPaths::from_annotations(
            &instance.template.metadata.annotations,
            self.options.seccomp_profile_root.as_deref(),
        )?;
        let restart_policy = RestartPolicy::from_kube(spec.restart_policy.as_deref());

        let infra_image = self
            .options
            .infra_image
            .as_deref()
            .filter(|i| !i.is_empty())
            .unwrap_or(DEFAULT_INFRA_IMAGE);
        blueprint.infra = Some(InfraContainerSpec {
            image: self.images.resolve_infra(infra_image).await?,
            image_volumes: ImageVolumeMode::Bind,
            network_options: blueprint.network.options.clone(),
        });

        for container in &spec.containers {
            if INFRA_CONTAINER_NAME.contains(container.name.as_str()) {
                debug!(container = %container.name, "skipping infra container");
                continue;
            }

            let image = self
                .images
                .resolve(&container.image, container.image_pull_policy.as_deref())
                .await?;
            let env = resolve_env(container, config_maps, self.secrets).await?;

            blueprint.containers.push(ContainerBlueprint {
                name: format!("{}-{}", blueprint.name, container.name),
                manifest_name: container.name.clone(),
                image,
                restart_policy,
                labels: auto_update_labels(&instance.annotations, &container.name),
                command: container.command.clone(),
                args: container.args.clone(),
                working_dir: container.working_dir.clone().filter(|d| !d.is_empty()),
                env,
                mounts: bind_mounts(container, &volumes)?,
                resources: resource_limits(container.resources.as_ref()),
                security: security_options(
                    container.security_context.as_ref(),
                    seccomp.for_container(&container.name),
                ),
                log_driver: self.options.log_driver.clone(),
                host_network: spec.host_network,
                stdin: container.stdin,
                tty: container.tty,
            });
        }

        Ok((blueprint, logs))
    }

    /// Creates a pod from its blueprint and starts it unless the play is
    /// create-only.
    pub async fn create(&self, blueprint: &PodBlueprint) -> Result<PlayPodReport> {
        let mut handle = self
            .runtime
            .create_pod(blueprint)
            .await
            .map_err(|e| {
                runtime_failure(e, |reason| Error::PodCreateFailed {
                    name: blueprint.name.clone(),
                    reason,
                })
            })?;
        info!(pod = %handle.name, id = %handle.id, "created pod");

        if let Some(infra) = &blueprint.infra {
            let id = self
                .runtime
                .create_infra_container(&handle, infra)
                .await
                .map_err(|e| {
                    runtime_failure(e, |reason| Error::ContainerCreateFailed {
                        name: format!("{}-{INFRA_CONTAINER_NAME}", blueprint.name),
                        reason,
                    })
                })?;
            debug!(pod = %handle.name, id = %id, image = %infra.image.reference, "created infra container");
            handle.infra_container_id = Some(id);
        }

        let mut report = PlayPodReport {
            id: handle.id.clone(),
            ..PlayPodReport::default()
        };

        for container in &blueprint.containers {
            let id = self
                .runtime
                .create_container(&handle, container)
                .await
                .map_err(|e| {
                    runtime_failure(e, |reason| Error::ContainerCreateFailed {
                        name: container.name.clone(),
                        reason,
                    })
                })?;
            debug!(
                pod = %handle.name,
                container = %container.name,
                id = %id,
                image = %container.image.reference,
                "created container"
            );
            report.containers.push(id);
        }

        if !self.options.should_start() {
            return Ok(report);
        }

        match self.runtime.start_pod(&handle).await {
            Ok(()) => info!(pod = %handle.name, "started pod"),
            Err(Error::PodPartialFailure { errors, .. }) => {
                for (id, error) in errors {
                    warn!(pod = %handle.name, container = %id, error = %error, "container failed to start");
                    report
                        .container_errors
                        .push(format!("error starting container {id}: {error}"));
                }
            }
            Err(e) => {
                return Err(runtime_failure(e, |reason| Error::PodStartFailed {
                    pod: handle.name.clone(),
                    reason,
                }));
            }
        }

        Ok(report)
    }
}

/// Applies a validated network override to a pod's network.
///
/// The pod is always bridged once the override validates. Networks are
/// appended and options replace the pod's options when the override carries
/// any. The override's own mode only selects which options it parsed.
pub fn apply_network_override(network: &mut PodNetwork, over: NetworkOverride) {
    network.mode = NetworkMode::Bridge;
    network.networks.extend(over.networks);
    if !over.options.is_empty() {
        network.options = over.options;
    }
}

/// Resolves a container's environment.
///
/// `envFrom` ConfigMaps are applied first, then `env` entries, which win on
/// conflicting names.
///
/// # Errors
///
/// Returns [`Error::InvalidInput`] when a non-optional ConfigMap, ConfigMap
/// key or secret key is missing.
pub async fn resolve_env(
    container: &kube::Container,
    config_maps: &[ConfigMap],
    secrets: &dyn SecretsProvider,
) -> Result<BTreeMap<String, String>> {
    let mut env = BTreeMap::new();

    for source in &container.env_from {
        let Some(selector) = &source.config_map_ref else {
            continue;
        };
        match config_maps.iter().find(|cm| cm.metadata.name == selector.name) {
            Some(cm) => env.extend(cm.data.iter().map(|(k, v)| (k.clone(), v.clone()))),
            None if selector.optional == Some(true) => {}
            None => {
                return Err(Error::InvalidInput(format!(
                    "cannot set env from {}: configmap not found",
                    selector.name
                )));
            }
        }
    }

    for var in &container.env {
        let value = match &var.value_from {
            Some(source) => env_source_value(&var.name, source, config_maps, secrets).await?,
            None => Some(var.value.clone().unwrap_or_default()),
        };
        if let Some(value) = value {
            env.insert(var.name.clone(), value);
        }
    }

    Ok(env)
}

async fn env_source_value(
    var: &str,
    source: &EnvVarSource,
    config_maps: &[ConfigMap],
    secrets: &dyn SecretsProvider,
) -> Result<Option<String>> {
    if let Some(selector) = &source.config_map_key_ref {
        if let Some(value) = configmap::lookup(config_maps, &selector.name, &selector.key) {
            return Ok(Some(value.to_string()));
        }
        if selector.optional == Some(true) {
            return Ok(None);
        }
        return Err(Error::InvalidInput(format!(
            "cannot set env {var}: key {} not found in configmap {}",
            selector.key, selector.name
        )));
    }

    if let Some(selector) = &source.secret_key_ref {
        if let Some(value) = secrets.lookup(&selector.name, &selector.key).await? {
            return Ok(Some(value));
        }
        if selector.optional == Some(true) {
            return Ok(None);
        }
        return Err(Error::InvalidInput(format!(
            "cannot set env {var}: key {} not found in secret {}",
            selector.key, selector.name
        )));
    }

    Ok(None)
}

fn runtime_failure(err: Error, wrap: impl FnOnce(String) -> Error) -> Error {
    if err.kind() == ErrorKind::Runtime {
        err
    } else {
        wrap(err.to_string())
    }
}
