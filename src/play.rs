//! Play orchestrator: apply and tear down a manifest.
//!
//! ```text
//! play:       bytes ─▶ parse ─▶ sort ─▶ translate ─┬─ Pod/Deployment ─▶ PodAssembler
//!                                                  ├─ PVC ────────────▶ create_volume
//!                                                  └─ other ──────────▶ info!, skipped
//!
//! play_down:  bytes ─▶ parse ─▶ sort ─▶ pod names ─▶ stop_pods ─▶ remove_pods
//! ```
//!
//! Calls are sequential and forward-only: the first fatal error aborts the
//! play and nothing created so far is rolled back.

use crate::configmap::read_config_maps;
use crate::error::{Error, ErrorKind, Result};
use crate::image::ImageStore;
use crate::kube::ConfigMap;
use crate::manifest::{parse_manifest, sort_documents};
use crate::options::{PlayDownOptions, PlayOptions};
use crate::pod::{
    AddressPool, ContainerRuntime, NoSecrets, PodAssembler, PodRmOptions, PodStopOptions,
    SecretsProvider,
};
use crate::report::{PlayDownReport, PlayReport, PlayVolumeReport};
use crate::translate::{Resource, teardown_pod_names};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Plays manifests against a container runtime and image store.
pub struct PlayEngine {
    runtime: Arc<dyn ContainerRuntime>,
    images: Arc<dyn ImageStore>,
    secrets: Arc<dyn SecretsProvider>,
}

impl PlayEngine {
    /// Creates an engine without a secrets provider.
    ///
    /// `secretKeyRef` environment entries fail unless marked optional.
    pub fn new(runtime: Arc<dyn ContainerRuntime>, images: Arc<dyn ImageStore>) -> Self {
        Self {
            runtime,
            images,
            secrets: Arc::new(NoSecrets),
        }
    }

    /// Sets the secrets provider used for `secretKeyRef` entries.
    #[must_use]
    pub fn with_secrets(mut self, secrets: Arc<dyn SecretsProvider>) -> Self {
        self.secrets = secrets;
        self
    }

    /// Plays the manifest at `path`.
    ///
    /// # Errors
    ///
    /// [`Error::Io`] if the file cannot be read, otherwise as
    /// [`play_manifest`](Self::play_manifest).
    #[instrument(skip_all, fields(path = %path.display()))]
    pub async fn play(&self, path: &Path, options: &PlayOptions) -> Result<PlayReport> {
        let content = tokio::fs::read(path).await?;
        self.play_manifest(&content, options).await
    }

    /// Plays a manifest.
    ///
    /// Documents are played in dependency order: claims and other
    /// prerequisites first, then pods and deployments in manifest order.
    ///
    /// # Errors
    ///
    /// - [`Error::NoSupportedKind`] if no Pod, Deployment or claim was played
    /// - [`Error::Replica`] wrapping the failure of a deployment replica
    /// - any parse, validation, resolution or runtime error, as-is
    #[instrument(skip_all, fields(bytes = manifest.len()))]
    pub async fn play_manifest(&self, manifest: &[u8], options: &PlayOptions) -> Result<PlayReport> {
        let documents = sort_documents(parse_manifest(manifest)?);
        debug!(documents = documents.len(), "parsed manifest");

        let context_dir = match &options.context_dir {
            Some(dir) => dir.clone(),
            None => std::env::current_dir()?,
        };
        let assembler = PodAssembler::new(
            self.runtime.as_ref(),
            self.images.as_ref(),
            self.secrets.as_ref(),
            options,
            context_dir,
        );
        let mut pool = AddressPool::new(&options.static_ips, &options.static_macs);
        let mut config_map_cache = None;
        let mut report = PlayReport::default();
        let mut valid_kinds = 0usize;

        for document in &documents {
            match Resource::from_document(document)? {
                Resource::Pod(instance) => {
                    valid_kinds += 1;
                    let config_maps =
                        load_config_maps(&mut config_map_cache, &options.config_maps).await?;
                    report
                        .pods
                        .push(assembler.play(&instance, &mut pool, config_maps).await?);
                }
                Resource::Deployment(deployment) => {
                    valid_kinds += 1;
                    debug!(
                        deployment = %deployment.name(),
                        replicas = deployment.count(),
                        "expanding deployment"
                    );
                    for instance in deployment.instances() {
                        let config_maps =
                            load_config_maps(&mut config_map_cache, &options.config_maps).await?;
                        let pod = assembler
                            .play(&instance, &mut pool, config_maps)
                            .await
                            .map_err(|e| Error::Replica {
                                pod: instance.name.clone(),
                                source: Box::new(e),
                            })?;
                        report.pods.push(pod);
                    }
                }
                Resource::PersistentVolumeClaim(request) => {
                    valid_kinds += 1;
                    let name = self.runtime.create_volume(&request).await.map_err(|e| {
                        if e.kind() == ErrorKind::Runtime {
                            e
                        } else {
                            Error::VolumeCreateFailed {
                                name: request.name.clone(),
                                reason: e.to_string(),
                            }
                        }
                    })?;
                    info!(volume = %name, "created volume");
                    report.volumes.push(PlayVolumeReport { name });
                }
                Resource::Unsupported(kind) => {
                    info!(kind = %kind, "kube kind not supported");
                }
            }
        }

        if valid_kinds == 0 {
            return Err(Error::NoSupportedKind);
        }

        info!(
            pods = report.pods.len(),
            volumes = report.volumes.len(),
            "played manifest"
        );
        Ok(report)
    }

    /// Tears down the pods of the manifest at `path`.
    ///
    /// # Errors
    ///
    /// [`Error::Io`] if the file cannot be read, otherwise as
    /// [`play_down_manifest`](Self::play_down_manifest).
    #[instrument(skip_all, fields(path = %path.display()))]
    pub async fn play_down(&self, path: &Path, options: &PlayDownOptions) -> Result<PlayDownReport> {
        let content = tokio::fs::read(path).await?;
        self.play_down_manifest(&content, options).await
    }

    /// Stops, then removes, every pod a manifest would create.
    ///
    /// Pod names are derived the same way a play names them; pods that do
    /// not exist are skipped by the runtime. Claims and other kinds are left
    /// alone.
    ///
    /// # Errors
    ///
    /// Parse errors, or a stop/remove failure of the runtime itself.
    #[instrument(skip_all, fields(bytes = manifest.len()))]
    pub async fn play_down_manifest(
        &self,
        manifest: &[u8],
        options: &PlayDownOptions,
    ) -> Result<PlayDownReport> {
        let documents = sort_documents(parse_manifest(manifest)?);

        let mut names = Vec::new();
        for document in &documents {
            names.extend(teardown_pod_names(document)?);
        }
        debug!(pods = ?names, "tearing down pods");

        let stop = self
            .runtime
            .stop_pods(
                &names,
                &PodStopOptions {
                    ignore: true,
                    timeout: options.stop_timeout,
                },
            )
            .await?;
        let remove = self
            .runtime
            .remove_pods(
                &names,
                &PodRmOptions {
                    ignore: true,
                    force: false,
                },
            )
            .await?;

        info!(pods = names.len(), "tore down manifest");
        Ok(PlayDownReport { stop, remove })
    }
}

/// Reads the play's ConfigMap files on first use.
async fn load_config_maps<'c>(
    cache: &'c mut Option<Vec<ConfigMap>>,
    paths: &[PathBuf],
) -> Result<&'c [ConfigMap]> {
    if cache.is_none() {
        *cache = Some(read_config_maps(paths).await?);
    }
    Ok(cache.as_deref().unwrap_or_default())
}
