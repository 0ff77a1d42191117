//! Pod and container blueprints.
//!
//! A blueprint is the fully-resolved creation request handed to the
//! [`ContainerRuntime`](super::ContainerRuntime): names are final, images are
//! resolved, volumes are bound and policies are mapped to runtime values.

use crate::constants::{
    AUTO_UPDATE_AUTHFILE_LABEL, AUTO_UPDATE_LABEL, DEFAULT_SHARED_NAMESPACES, PID_NAMESPACE,
    POD_NAME_COLLISION_SUFFIX, RESTART_POLICY_ALWAYS, RESTART_POLICY_NO,
    RESTART_POLICY_ON_FAILURE,
};
use crate::error::{Error, Result};
use crate::image::{PullPolicy, ResolvedImage};
use crate::kube::{self, PodSpec, PodTemplateSpec};
use crate::network::NetworkMode;
use crate::options::MacAddr;
use crate::seccomp::SeccompProfile;
use crate::volume::PodVolumeSource;
use std::collections::{BTreeMap, HashMap};
use std::net::IpAddr;

// =============================================================================
// Pod Blueprint
// =============================================================================

/// A pod ready for creation.
#[derive(Debug, Clone, PartialEq)]
pub struct PodBlueprint {
    /// Final pod name, unique within one play.
    pub name: String,
    /// Pod labels from the template metadata.
    pub labels: HashMap<String, String>,
    /// Hostname override.
    pub hostname: Option<String>,
    /// Namespaces shared between the pod's containers.
    pub share: Vec<String>,
    /// Network configuration.
    pub network: PodNetwork,
    /// Infra container, if the pod has one.
    pub infra: Option<InfraContainerSpec>,
    /// Application containers, in manifest order.
    pub containers: Vec<ContainerBlueprint>,
}

/// Network configuration of a pod.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PodNetwork {
    /// Namespace mode.
    pub mode: NetworkMode,
    /// Named networks to join.
    pub networks: Vec<String>,
    /// Mode options keyed by mode name.
    pub options: HashMap<String, Vec<String>>,
    /// Static IP from the play's address pool.
    pub static_ip: Option<IpAddr>,
    /// Static MAC from the play's address pool.
    pub static_mac: Option<MacAddr>,
    /// Published ports.
    pub ports: Vec<PortMapping>,
    /// Resolver configuration.
    pub dns: DnsSettings,
    /// Extra `/etc/hosts` entries.
    pub hosts: Vec<HostEntry>,
}

/// A published port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortMapping {
    /// Host address to bind, all addresses when `None`.
    pub host_ip: Option<String>,
    /// Port on the host.
    pub host_port: u16,
    /// Port inside the pod.
    pub container_port: u16,
    /// `tcp`, `udp` or `sctp`.
    pub protocol: String,
}

/// Resolver settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DnsSettings {
    pub servers: Vec<String>,
    pub searches: Vec<String>,
    pub options: Vec<String>,
}

/// `/etc/hosts` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostEntry {
    pub ip: String,
    pub hostnames: Vec<String>,
}

/// How the infra image's volumes are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImageVolumeMode {
    /// Bind-mount image volumes.
    #[default]
    Bind,
    /// Ignore image volumes.
    Ignore,
}

/// Infra container of a pod.
#[derive(Debug, Clone, PartialEq)]
pub struct InfraContainerSpec {
    /// Resolved infra image.
    pub image: ResolvedImage,
    /// Image volume handling.
    pub image_volumes: ImageVolumeMode,
    /// Network options inherited from the pod.
    pub network_options: HashMap<String, Vec<String>>,
}

impl PodBlueprint {
    /// Starts a blueprint from a pod template. Network override, addresses,
    /// infra and containers are filled in by the assembler.
    #[must_use]
    pub fn from_template(name: String, template: &PodTemplateSpec) -> Self {
        let spec = &template.spec;

        let mut share: Vec<String> = DEFAULT_SHARED_NAMESPACES
            .iter()
            .map(ToString::to_string)
            .collect();
        if spec.share_process_namespace == Some(true) {
            share.push(PID_NAMESPACE.to_string());
        }

        let network = PodNetwork {
            mode: if spec.host_network {
                NetworkMode::Host
            } else {
                NetworkMode::Bridge
            },
            ports: port_mappings(spec),
            dns: dns_settings(spec),
            hosts: spec
                .host_aliases
                .iter()
                .map(|alias| HostEntry {
                    ip: alias.ip.clone(),
                    hostnames: alias.hostnames.clone(),
                })
                .collect(),
            ..PodNetwork::default()
        };

        Self {
            name,
            labels: template.metadata.labels.clone(),
            hostname: spec.hostname.clone(),
            share,
            network,
            infra: None,
            containers: Vec::new(),
        }
    }
}

/// Renames a pod whose name collides with one of its containers.
///
/// Returns the final name and one log line per rename.
#[must_use]
pub fn resolve_pod_name(name: &str, containers: &[kube::Container]) -> (String, Vec<String>) {
    let mut name = name.to_string();
    let mut logs = Vec::new();

    for container in containers {
        if container.name == name {
            let renamed = format!("{name}{POD_NAME_COLLISION_SUFFIX}");
            logs.push(format!(
                "a container exists with the same name ({name:?}) as the pod in your YAML file; changing pod name to {renamed}"
            ));
            name = renamed;
        }
    }

    (name, logs)
}

fn port_mappings(spec: &PodSpec) -> Vec<PortMapping> {
    spec.containers
        .iter()
        .flat_map(|c| c.ports.iter())
        .filter_map(|p| {
            let host_port = p.host_port.filter(|&hp| hp != 0)?;
            Some(PortMapping {
                host_ip: p.host_ip.clone().filter(|ip| !ip.is_empty()),
                host_port,
                container_port: p.container_port,
                protocol: p
                    .protocol
                    .as_deref()
                    .unwrap_or("TCP")
                    .to_lowercase(),
            })
        })
        .collect()
}

fn dns_settings(spec: &PodSpec) -> DnsSettings {
    let Some(dns) = &spec.dns_config else {
        return DnsSettings::default();
    };

    DnsSettings {
        servers: dns.nameservers.clone(),
        searches: dns.searches.clone(),
        options: dns
            .options
            .iter()
            .map(|o| match &o.value {
                Some(value) => format!("{}:{}", o.name, value),
                None => o.name.clone(),
            })
            .collect(),
    }
}

// =============================================================================
// Container Blueprint
// =============================================================================

/// Runtime restart policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RestartPolicy {
    /// Restart unconditionally.
    #[default]
    Always,
    /// Restart on non-zero exit.
    OnFailure,
    /// Never restart.
    No,
}

impl RestartPolicy {
    /// Maps a Kubernetes restart policy. Unknown or unset values map to
    /// [`RestartPolicy::Always`].
    #[must_use]
    pub fn from_kube(policy: Option<&str>) -> Self {
        match policy {
            Some("OnFailure") => Self::OnFailure,
            Some("Never") => Self::No,
            _ => Self::Always,
        }
    }

    /// Runtime spelling of the policy.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Always => RESTART_POLICY_ALWAYS,
            Self::OnFailure => RESTART_POLICY_ON_FAILURE,
            Self::No => RESTART_POLICY_NO,
        }
    }
}

impl std::fmt::Display for RestartPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Source of a container mount.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MountSource {
    /// Host path bind mount.
    Bind { path: String },
    /// Named volume.
    Named { name: String },
    /// Anonymous volume.
    Anonymous,
}

/// A mount inside a container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mount {
    pub destination: String,
    pub source: MountSource,
    pub read_only: bool,
    pub sub_path: Option<String>,
}

/// Resource limits for a container.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResourceLimits {
    /// Memory limit in bytes, 0 for unlimited.
    pub memory_bytes: u64,
    /// CPU limit in millicores, 0 for unlimited.
    pub cpu_millis: u64,
}

/// Security settings for a container.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SecurityOptions {
    pub privileged: bool,
    pub read_only_rootfs: bool,
    /// `uid` or `uid:gid`.
    pub user: Option<String>,
    pub cap_add: Vec<String>,
    pub cap_drop: Vec<String>,
    pub seccomp: SeccompProfile,
}

/// A container ready for creation.
#[derive(Debug, Clone, PartialEq)]
pub struct ContainerBlueprint {
    /// Runtime container name: `<pod>-<container>`.
    pub name: String,
    /// Name in the manifest.
    pub manifest_name: String,
    /// Resolved image.
    pub image: ResolvedImage,
    /// Restart policy.
    pub restart_policy: RestartPolicy,
    /// Labels, including auto-update labels.
    pub labels: BTreeMap<String, String>,
    pub command: Vec<String>,
    pub args: Vec<String>,
    pub working_dir: Option<String>,
    /// Environment with ConfigMap and Secret references resolved.
    pub env: BTreeMap<String, String>,
    pub mounts: Vec<Mount>,
    pub resources: ResourceLimits,
    pub security: SecurityOptions,
    /// Log driver, runtime default when `None`.
    pub log_driver: Option<String>,
    /// Container shares the host network namespace.
    pub host_network: bool,
    pub stdin: bool,
    pub tty: bool,
}

impl ContainerBlueprint {
    /// Returns the pull policy used for the image, if it was pulled.
    #[must_use]
    pub fn pull_policy(&self) -> Option<PullPolicy> {
        self.image.pull_policy()
    }
}

/// Copies auto-update annotations into container labels.
///
/// Bare keys apply to every container; `<key>/<container>` applies to the
/// named container only and wins over the bare key. Any other annotation is
/// ignored.
#[must_use]
pub fn auto_update_labels(
    annotations: &HashMap<String, String>,
    container: &str,
) -> BTreeMap<String, String> {
    let mut labels = BTreeMap::new();

    for label in [AUTO_UPDATE_LABEL, AUTO_UPDATE_AUTHFILE_LABEL] {
        if let Some(value) = annotations.get(label) {
            labels.insert(label.to_string(), value.clone());
        }
        if let Some(value) = annotations.get(&format!("{label}/{container}")) {
            labels.insert(label.to_string(), value.clone());
        }
    }

    labels
}

/// Binds a container's volume mounts to the pod's initialized volumes.
///
/// # Errors
///
/// Returns [`Error::InvalidVolume`] if a mount names an undeclared volume.
pub fn bind_mounts(
    container: &kube::Container,
    volumes: &HashMap<String, PodVolumeSource>,
) -> Result<Vec<Mount>> {
    container
        .volume_mounts
        .iter()
        .map(|vm| {
            let volume = volumes.get(&vm.name).ok_or_else(|| Error::InvalidVolume {
                name: vm.name.clone(),
                reason: format!(
                    "volume mount specified for container {} but not configured in volumes",
                    container.name
                ),
            })?;

            let (source, read_only) = match volume {
                PodVolumeSource::HostPath { path } => {
                    (MountSource::Bind { path: path.clone() }, vm.read_only)
                }
                PodVolumeSource::Named { name, read_only } => (
                    MountSource::Named { name: name.clone() },
                    vm.read_only || *read_only,
                ),
                PodVolumeSource::Anonymous => (MountSource::Anonymous, vm.read_only),
            };

            Ok(Mount {
                destination: vm.mount_path.clone(),
                source,
                read_only,
                sub_path: vm.sub_path.clone().filter(|p| !p.is_empty()),
            })
        })
        .collect()
}

/// Reads memory and CPU limits, falling back to requests.
#[must_use]
pub fn resource_limits(resources: Option<&kube::ResourceRequirements>) -> ResourceLimits {
    let Some(r) = resources else {
        return ResourceLimits::default();
    };

    let quantity = |name: &str| {
        r.limits
            .get(name)
            .or_else(|| r.requests.get(name))
            .and_then(quantity_string)
    };

    ResourceLimits {
        memory_bytes: quantity("memory")
            .map(|m| parse_memory_string(&m))
            .unwrap_or(0),
        cpu_millis: quantity("cpu").map(|c| parse_cpu_string(&c)).unwrap_or(0),
    }
}

/// Reads security settings.
#[must_use]
pub fn security_options(
    context: Option<&kube::SecurityContext>,
    seccomp: SeccompProfile,
) -> SecurityOptions {
    let Some(ctx) = context else {
        return SecurityOptions {
            seccomp,
            ..SecurityOptions::default()
        };
    };

    let user = match (ctx.run_as_user, ctx.run_as_group) {
        (Some(uid), Some(gid)) => Some(format!("{uid}:{gid}")),
        (Some(uid), None) => Some(uid.to_string()),
        _ => None,
    };
    let (cap_add, cap_drop) = ctx
        .capabilities
        .as_ref()
        .map(|c| (c.add.clone(), c.drop.clone()))
        .unwrap_or_default();

    SecurityOptions {
        privileged: ctx.privileged.unwrap_or(false),
        read_only_rootfs: ctx.read_only_root_filesystem.unwrap_or(false),
        user,
        cap_add,
        cap_drop,
        seccomp,
    }
}

// =============================================================================
// Resource Parsing Helpers
// =============================================================================

fn quantity_string(value: &serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::String(s) => Some(s.clone()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Parses Kubernetes memory strings to bytes.
fn parse_memory_string(s: &str) -> u64 {
    let s = s.trim();
    if let Some(val) = s.strip_suffix("Gi") {
        val.parse::<u64>()
            .unwrap_or(0)
            .saturating_mul(1024 * 1024 * 1024)
    } else if let Some(val) = s.strip_suffix("Mi") {
        val.parse::<u64>().unwrap_or(0).saturating_mul(1024 * 1024)
    } else if let Some(val) = s.strip_suffix("Ki") {
        val.parse::<u64>().unwrap_or(0).saturating_mul(1024)
    } else if let Some(val) = s.strip_suffix('G') {
        val.parse::<u64>()
            .unwrap_or(0)
            .saturating_mul(1_000_000_000)
    } else if let Some(val) = s.strip_suffix('M') {
        val.parse::<u64>().unwrap_or(0).saturating_mul(1_000_000)
    } else if let Some(val) = s.strip_suffix('K') {
        val.parse::<u64>().unwrap_or(0).saturating_mul(1_000)
    } else {
        s.parse::<u64>().unwrap_or(0)
    }
}

/// Parses Kubernetes CPU strings to millicores.
fn parse_cpu_string(s: &str) -> u64 {
    let s = s.trim();
    if s.is_empty() {
        return 0;
    }
    if let Some(val) = s.strip_suffix('m') {
        val.parse::<u64>().unwrap_or(0)
    } else if let Ok(cores) = s.parse::<f64>() {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let millicores = (cores * 1000.0) as u64;
        millicores
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kube::{Container, ContainerPort, VolumeMount};

    fn container(name: &str) -> Container {
        Container {
            name: name.to_string(),
            image: "alpine".to_string(),
            ..Container::default()
        }
    }

    #[test]
    fn test_restart_policy_mapping() {
        assert_eq!(RestartPolicy::from_kube(Some("Always")), RestartPolicy::Always);
        assert_eq!(
            RestartPolicy::from_kube(Some("OnFailure")),
            RestartPolicy::OnFailure
        );
        assert_eq!(RestartPolicy::from_kube(Some("Never")), RestartPolicy::No);
        assert_eq!(RestartPolicy::from_kube(Some("never")), RestartPolicy::Always);
        assert_eq!(RestartPolicy::from_kube(None), RestartPolicy::Always);
        assert_eq!(RestartPolicy::No.as_str(), "no");
        assert_eq!(RestartPolicy::OnFailure.to_string(), "on-failure");
    }

    #[test]
    fn test_pod_name_collision() {
        let (name, logs) = resolve_pod_name("app", &[container("db"), container("app")]);
        assert_eq!(name, "app_pod");
        assert_eq!(logs.len(), 1);
        assert!(logs[0].contains("changing pod name to app_pod"));

        let (name, logs) = resolve_pod_name("web", &[container("app")]);
        assert_eq!(name, "web");
        assert!(logs.is_empty());
    }

    #[test]
    fn test_auto_update_labels() {
        let annotations: HashMap<String, String> = [
            (AUTO_UPDATE_LABEL, "registry"),
            ("io.containers.autoupdate/web", "local"),
            ("io.containers.autoupdate.authfile/db", "/auth.json"),
            ("io.containers.autoupdate/", "nobody"),
            ("unrelated", "x"),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let web = auto_update_labels(&annotations, "web");
        assert_eq!(web.len(), 1);
        assert_eq!(web[AUTO_UPDATE_LABEL], "local");

        let db = auto_update_labels(&annotations, "db");
        assert_eq!(db[AUTO_UPDATE_LABEL], "registry");
        assert_eq!(db[AUTO_UPDATE_AUTHFILE_LABEL], "/auth.json");
    }

    #[test]
    fn test_port_mappings_need_host_port() {
        let mut web = container("web");
        web.ports = vec![
            ContainerPort {
                container_port: 80,
                host_port: Some(8080),
                ..ContainerPort::default()
            },
            ContainerPort {
                container_port: 443,
                ..ContainerPort::default()
            },
        ];
        let template = PodTemplateSpec {
            spec: PodSpec {
                containers: vec![web],
                share_process_namespace: Some(true),
                ..PodSpec::default()
            },
            ..PodTemplateSpec::default()
        };

        let blueprint = PodBlueprint::from_template("web".to_string(), &template);
        assert_eq!(blueprint.network.ports.len(), 1);
        assert_eq!(blueprint.network.ports[0].host_port, 8080);
        assert_eq!(blueprint.network.ports[0].protocol, "tcp");
        assert!(blueprint.share.contains(&"pid".to_string()));
    }

    #[test]
    fn test_bind_mounts_rejects_unknown_volume() {
        let mut web = container("web");
        web.volume_mounts = vec![VolumeMount {
            name: "missing".to_string(),
            mount_path: "/data".to_string(),
            ..VolumeMount::default()
        }];
        assert!(bind_mounts(&web, &HashMap::new()).is_err());
    }

    #[test]
    fn test_resource_limits() {
        let resources: kube::ResourceRequirements =
            serde_yaml::from_str("limits:\n  memory: 512Mi\n  cpu: 500m\nrequests:\n  cpu: 1\n")
                .unwrap();
        let limits = resource_limits(Some(&resources));
        assert_eq!(limits.memory_bytes, 512 * 1024 * 1024);
        assert_eq!(limits.cpu_millis, 500);

        let requests: kube::ResourceRequirements =
            serde_yaml::from_str("requests:\n  cpu: 2\n").unwrap();
        assert_eq!(resource_limits(Some(&requests)).cpu_millis, 2000);
    }
}
