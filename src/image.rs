//! # Image Resolution
//!
//! Decides, per container, whether an image is built from a local build
//! context or pulled from a registry, and with which pull policy.
//!
//! ## Decision
//!
//! ```text
//!   <context-dir>/<image-prefix>/Containerfile  (or Dockerfile)
//!          │
//!          ├── present, and (image missing locally or build forced) ──► build
//!          │
//!          └── otherwise ──► pull with imagePullPolicy (default: newer)
//! ```
//!
//! The image prefix is the image name without tag, registry path or digest:
//! `quay.io/org/web:1.2` probes `<context-dir>/web/`.
//!
//! Infra images are always pulled with [`PullPolicy::Newer`], never built.
//!
//! ## Store Interface
//!
//! Pulling and building are delegated to an [`ImageStore`]. The resolver only
//! chooses the reference, the policy and the build file.

use crate::constants::BUILD_FILE_NAMES;
use crate::error::{Error, ErrorKind, Result};
use crate::options::Credentials;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, error, info};

// =============================================================================
// Pull Policy
// =============================================================================

/// Image pull policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PullPolicy {
    /// Always pull.
    Always,
    /// Pull only if the image is not present locally.
    Missing,
    /// Pull if the registry has a newer image than the local one.
    #[default]
    Newer,
    /// Never pull; the image must exist locally.
    Never,
}

impl FromStr for PullPolicy {
    type Err = Error;

    /// Parses a pull policy. Kubernetes spellings are accepted in any case.
    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "always" => Ok(Self::Always),
            "missing" | "ifmissing" | "ifnotpresent" => Ok(Self::Missing),
            "newer" | "ifnewer" => Ok(Self::Newer),
            "never" => Ok(Self::Never),
            _ => Err(Error::InvalidPullPolicy(s.to_string())),
        }
    }
}

impl std::fmt::Display for PullPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Always => write!(f, "always"),
            Self::Missing => write!(f, "missing"),
            Self::Newer => write!(f, "newer"),
            Self::Never => write!(f, "never"),
        }
    }
}

// =============================================================================
// Store Interface
// =============================================================================

/// Options passed with every pull.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PullOptions {
    /// Registry credentials.
    pub credentials: Credentials,
    /// Suppress progress output.
    pub quiet: bool,
}

/// Isolation used for local builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BuildIsolation {
    /// chroot-based build, no extra namespaces.
    #[default]
    Chroot,
    /// Full OCI runtime isolation.
    Oci,
}

/// A local image build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildRequest {
    /// Containerfile or Dockerfile to build.
    pub containerfile: PathBuf,
    /// Build context directory.
    pub context_dir: PathBuf,
    /// Name the built image is tagged with.
    pub output: String,
    /// Build isolation.
    pub isolation: BuildIsolation,
}

/// An image known to the local store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageHandle {
    /// Image name as stored (e.g. `docker.io/library/nginx:latest`).
    pub name: String,
    /// Image id.
    pub id: String,
}

/// Local image store: existence checks, pulls and builds.
#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Returns true if the reference resolves to a local image.
    async fn exists(&self, reference: &str) -> Result<bool>;

    /// Pulls an image according to `policy`.
    async fn pull(
        &self,
        reference: &str,
        policy: PullPolicy,
        options: &PullOptions,
    ) -> Result<ImageHandle>;

    /// Builds an image from a local build file.
    async fn build(&self, request: &BuildRequest) -> Result<ImageHandle>;
}

// =============================================================================
// Resolution
// =============================================================================

/// How an image was obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    /// Built from a local build file.
    Built { containerfile: PathBuf },
    /// Pulled with the given policy.
    Pulled { policy: PullPolicy },
}

/// A concrete image reference ready for container creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedImage {
    /// Reference used for the container.
    pub reference: String,
    /// Image id.
    pub id: String,
    /// How the image was obtained.
    pub source: ImageSource,
}

impl ResolvedImage {
    /// Returns the pull policy used, if the image was pulled.
    #[must_use]
    pub fn pull_policy(&self) -> Option<PullPolicy> {
        match self.source {
            ImageSource::Pulled { policy } => Some(policy),
            ImageSource::Built { .. } => None,
        }
    }
}

/// Returns the image name without tag, registry path or digest.
///
/// The tag is cut at the first `:`, so a registry with a port yields the
/// registry host: `localhost:5000/app` gives `localhost`.
#[must_use]
pub fn image_name_prefix(image: &str) -> &str {
    let prefix = image.split(':').next().unwrap_or(image);
    let prefix = prefix.rsplit('/').next().unwrap_or(prefix);
    prefix.split('@').next().unwrap_or(prefix)
}

/// Finds the local build file for an image under `context_dir`.
///
/// `Containerfile` is preferred over `Dockerfile`. Absence of both is not an
/// error.
///
/// # Errors
///
/// Returns [`Error::Io`] if `Dockerfile` cannot be checked for a reason other
/// than not existing.
pub fn find_build_file(image: &str, context_dir: &Path) -> Result<Option<PathBuf>> {
    let dir = context_dir.join(image_name_prefix(image));
    let [containerfile, dockerfile] = BUILD_FILE_NAMES.map(|name| dir.join(name));

    match std::fs::metadata(&containerfile) {
        Ok(_) => {
            debug!(image, path = %containerfile.display(), "building with Containerfile");
            return Ok(Some(containerfile));
        }
        Err(e) if e.kind() != std::io::ErrorKind::NotFound => {
            error!(path = %containerfile.display(), error = %e, "unable to check for build file");
        }
        Err(_) => {}
    }

    match std::fs::metadata(&dockerfile) {
        Ok(_) => {
            debug!(image, path = %dockerfile.display(), "building with Dockerfile");
            Ok(Some(dockerfile))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Resolves container images against an [`ImageStore`].
pub struct ImageResolver<'a> {
    store: &'a dyn ImageStore,
    context_dir: PathBuf,
    force_build: bool,
    pull_options: PullOptions,
}

impl<'a> ImageResolver<'a> {
    /// Creates a resolver probing `context_dir` for build contexts.
    pub fn new(
        store: &'a dyn ImageStore,
        context_dir: PathBuf,
        force_build: bool,
        pull_options: PullOptions,
    ) -> Self {
        Self {
            store,
            context_dir,
            force_build,
            pull_options,
        }
    }

    /// Resolves the image of a manifest container.
    ///
    /// `pull_policy` is the raw `imagePullPolicy` value; it is only parsed
    /// when the image is pulled.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidPullPolicy`] for an unknown policy
    /// - [`Error::ImageBuildFailed`] / [`Error::ImagePullFailed`] from the store
    pub async fn resolve(&self, image: &str, pull_policy: Option<&str>) -> Result<ResolvedImage> {
        let build_file = find_build_file(image, &self.context_dir)?;
        let exists = self.store.exists(image).await?;

        if let Some(containerfile) = build_file.filter(|_| !exists || self.force_build) {
            return self.build(image, containerfile).await;
        }

        let policy = match pull_policy.filter(|p| !p.is_empty()) {
            Some(raw) => raw.parse()?,
            None => PullPolicy::Newer,
        };
        self.pull(image, policy).await
    }

    /// Resolves an infra image. Infra images are never built.
    pub async fn resolve_infra(&self, image: &str) -> Result<ResolvedImage> {
        self.pull(image, PullPolicy::Newer).await
    }

    async fn build(&self, image: &str, containerfile: PathBuf) -> Result<ResolvedImage> {
        let context_dir = containerfile
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.context_dir.clone());
        let request = BuildRequest {
            containerfile: containerfile.clone(),
            context_dir,
            output: image.to_string(),
            isolation: BuildIsolation::Chroot,
        };

        info!(image, containerfile = %containerfile.display(), "building image");
        let handle = self.store.build(&request).await.map_err(|e| match e.kind() {
            ErrorKind::Resolution => e,
            _ => Error::ImageBuildFailed {
                reference: image.to_string(),
                containerfile: containerfile.clone(),
                reason: e.to_string(),
            },
        })?;

        Ok(ResolvedImage {
            reference: handle.name,
            id: handle.id,
            source: ImageSource::Built { containerfile },
        })
    }

    async fn pull(&self, image: &str, policy: PullPolicy) -> Result<ResolvedImage> {
        debug!(image, %policy, "pulling image");
        let handle = self
            .store
            .pull(image, policy, &self.pull_options)
            .await
            .map_err(|e| match e.kind() {
                ErrorKind::Resolution => e,
                _ => Error::ImagePullFailed {
                    reference: image.to_string(),
                    reason: e.to_string(),
                },
            })?;

        Ok(ResolvedImage {
            reference: handle.name,
            id: handle.id,
            source: ImageSource::Pulled { policy },
        })
    }
}
