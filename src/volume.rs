//! Volumes: PersistentVolumeClaim translation and pod volume initialization.
//!
//! A claim becomes a named runtime volume. Options with no claim
//! counterpart are read from annotations (see [`crate::constants`]):
//!
//! | Annotation                        | Effect                   |
//! |-----------------------------------|--------------------------|
//! | `volume.podman.io/driver`         | volume driver            |
//! | `volume.podman.io/device`         | option `device`          |
//! | `volume.podman.io/type`           | option `type`            |
//! | `volume.podman.io/uid`            | owner uid, option `UID`  |
//! | `volume.podman.io/gid`            | owner gid, option `GID`  |
//! | `volume.podman.io/mount-options`  | option `o`               |

use crate::constants::{
    VOLUME_DEVICE_ANNOTATION, VOLUME_DRIVER_ANNOTATION, VOLUME_GID_ANNOTATION,
    VOLUME_MOUNT_OPTS_ANNOTATION, VOLUME_TYPE_ANNOTATION, VOLUME_UID_ANNOTATION,
};
use crate::error::{Error, Result};
use crate::kube::{self, PersistentVolumeClaim};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

// =============================================================================
// Volume Requests
// =============================================================================

/// A named volume to create, derived from a PersistentVolumeClaim.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VolumeRequest {
    /// Volume name (never empty).
    pub name: String,
    /// Labels copied from the claim.
    pub labels: HashMap<String, String>,
    /// Volume driver, `None` for the runtime default.
    pub driver: Option<String>,
    /// Owner uid of the volume root.
    pub uid: Option<u32>,
    /// Owner gid of the volume root.
    pub gid: Option<u32>,
    /// Driver options.
    pub options: BTreeMap<String, String>,
}

impl VolumeRequest {
    /// Translates a claim into a volume request.
    ///
    /// # Errors
    ///
    /// - [`Error::MissingName`] if the claim name is empty or whitespace
    /// - [`Error::InvalidOwner`] if the uid or gid annotation is not an integer
    pub fn from_claim(claim: &PersistentVolumeClaim) -> Result<Self> {
        let name = &claim.metadata.name;
        if name.trim().is_empty() {
            return Err(Error::MissingName {
                kind: "persistent volume claim".to_string(),
            });
        }

        let mut request = Self {
            name: name.clone(),
            labels: claim.metadata.labels.clone(),
            ..Self::default()
        };

        for (key, value) in &claim.metadata.annotations {
            match key.as_str() {
                VOLUME_DRIVER_ANNOTATION => request.driver = Some(value.clone()),
                VOLUME_DEVICE_ANNOTATION => {
                    request.options.insert("device".to_string(), value.clone());
                }
                VOLUME_TYPE_ANNOTATION => {
                    request.options.insert("type".to_string(), value.clone());
                }
                VOLUME_UID_ANNOTATION => {
                    request.uid = Some(parse_owner("uid", value)?);
                    request.options.insert("UID".to_string(), value.clone());
                }
                VOLUME_GID_ANNOTATION => {
                    request.gid = Some(parse_owner("gid", value)?);
                    request.options.insert("GID".to_string(), value.clone());
                }
                VOLUME_MOUNT_OPTS_ANNOTATION => {
                    request.options.insert("o".to_string(), value.clone());
                }
                _ => {}
            }
        }

        Ok(request)
    }
}

fn parse_owner(field: &str, value: &str) -> Result<u32> {
    value.trim().parse().map_err(|_| Error::InvalidOwner {
        field: field.to_string(),
        value: value.to_string(),
    })
}

// =============================================================================
// Pod Volumes
// =============================================================================

/// Source of a pod volume after initialization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PodVolumeSource {
    /// Bind mount of a host path.
    HostPath { path: String },
    /// Named runtime volume (from a claim).
    Named { name: String, read_only: bool },
    /// Anonymous volume removed with the container.
    Anonymous,
}

/// Initializes the volumes declared in a pod spec, keyed by volume name.
///
/// Host paths are checked (and created for the `*OrCreate` types) here, so
/// a bad host path fails before anything is created for the pod.
///
/// # Errors
///
/// Returns [`Error::InvalidVolume`] for unnamed volumes, failed host path
/// checks, or unsupported sources.
pub fn initialize_volumes(volumes: &[kube::Volume]) -> Result<HashMap<String, PodVolumeSource>> {
    let mut initialized = HashMap::with_capacity(volumes.len());

    for volume in volumes {
        if volume.name.is_empty() {
            return Err(Error::InvalidVolume {
                name: String::new(),
                reason: "volume must have a name".to_string(),
            });
        }

        let source = if let Some(host_path) = &volume.host_path {
            check_host_path(&volume.name, &host_path.path, host_path.kind.as_deref())?;
            PodVolumeSource::HostPath {
                path: host_path.path.clone(),
            }
        } else if let Some(claim) = &volume.persistent_volume_claim {
            PodVolumeSource::Named {
                name: claim.claim_name.clone(),
                read_only: claim.read_only,
            }
        } else if volume.empty_dir.is_some() {
            PodVolumeSource::Anonymous
        } else {
            return Err(Error::InvalidVolume {
                name: volume.name.clone(),
                reason: "HostPath, PersistentVolumeClaim and EmptyDir are the only supported volume sources".to_string(),
            });
        };

        initialized.insert(volume.name.clone(), source);
    }

    Ok(initialized)
}

fn check_host_path(name: &str, path: &str, kind: Option<&str>) -> Result<()> {
    let invalid = |reason: String| Error::InvalidVolume {
        name: name.to_string(),
        reason,
    };

    if !path.starts_with('/') {
        return Err(invalid(format!("host path {path} must be absolute")));
    }

    let host = Path::new(path);
    match kind.unwrap_or("") {
        "" => {}
        "DirectoryOrCreate" => {
            if !host.exists() {
                std::fs::create_dir_all(host)
                    .map_err(|e| invalid(format!("creating {path}: {e}")))?;
            }
            if !host.is_dir() {
                return Err(invalid(format!("{path} is not a directory")));
            }
        }
        "Directory" => {
            if !host.is_dir() {
                return Err(invalid(format!("{path} is not a directory")));
            }
        }
        "FileOrCreate" => {
            if !host.exists() {
                std::fs::File::create(host)
                    .map_err(|e| invalid(format!("creating {path}: {e}")))?;
            }
            if !host.is_file() {
                return Err(invalid(format!("{path} is not a file")));
            }
        }
        "File" => {
            if !host.is_file() {
                return Err(invalid(format!("{path} is not a file")));
            }
        }
        "Socket" | "CharDevice" | "BlockDevice" => {
            if !host.exists() {
                return Err(invalid(format!("{path} does not exist")));
            }
        }
        other => {
            return Err(invalid(format!("invalid host path type {other}")));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kube::{HostPathVolumeSource, ObjectMeta, PvcVolumeSource};
    use tempfile::TempDir;

    fn claim(name: &str, annotations: &[(&str, &str)]) -> PersistentVolumeClaim {
        PersistentVolumeClaim {
            metadata: ObjectMeta {
                name: name.to_string(),
                annotations: annotations
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
                ..ObjectMeta::default()
            },
        }
    }

    #[test]
    fn test_claim_requires_name() {
        for name in ["", "   "] {
            let err = VolumeRequest::from_claim(&claim(name, &[])).unwrap_err();
            assert!(matches!(err, Error::MissingName { .. }));
        }
    }

    #[test]
    fn test_claim_annotations() {
        let request = VolumeRequest::from_claim(&claim(
            "data",
            &[
                (VOLUME_DRIVER_ANNOTATION, "local"),
                (VOLUME_DEVICE_ANNOTATION, "/dev/sdb1"),
                (VOLUME_TYPE_ANNOTATION, "ext4"),
                (VOLUME_UID_ANNOTATION, "1000"),
                (VOLUME_GID_ANNOTATION, "100"),
                (VOLUME_MOUNT_OPTS_ANNOTATION, "nodev,noexec"),
                ("unrelated", "ignored"),
            ],
        ))
        .unwrap();

        assert_eq!(request.name, "data");
        assert_eq!(request.driver.as_deref(), Some("local"));
        assert_eq!(request.uid, Some(1000));
        assert_eq!(request.gid, Some(100));
        assert_eq!(request.options["device"], "/dev/sdb1");
        assert_eq!(request.options["type"], "ext4");
        assert_eq!(request.options["UID"], "1000");
        assert_eq!(request.options["GID"], "100");
        assert_eq!(request.options["o"], "nodev,noexec");
        assert_eq!(request.options.len(), 5);
    }

    #[test]
    fn test_claim_rejects_bad_uid() {
        let err =
            VolumeRequest::from_claim(&claim("data", &[(VOLUME_UID_ANNOTATION, "root")]))
                .unwrap_err();
        assert!(matches!(err, Error::InvalidOwner { .. }));
    }

    #[test]
    fn test_initialize_volume_sources() {
        let temp = TempDir::new().unwrap();
        let created = temp.path().join("cache");
        let volumes = vec![
            kube::Volume {
                name: "cache".to_string(),
                host_path: Some(HostPathVolumeSource {
                    path: created.to_string_lossy().into_owned(),
                    kind: Some("DirectoryOrCreate".to_string()),
                }),
                ..kube::Volume::default()
            },
            kube::Volume {
                name: "data".to_string(),
                persistent_volume_claim: Some(PvcVolumeSource {
                    claim_name: "data-claim".to_string(),
                    read_only: true,
                }),
                ..kube::Volume::default()
            },
            kube::Volume {
                name: "scratch".to_string(),
                empty_dir: Some(serde_yaml::Value::Null),
                ..kube::Volume::default()
            },
        ];

        let initialized = initialize_volumes(&volumes).unwrap();
        assert!(created.is_dir());
        assert_eq!(
            initialized["data"],
            PodVolumeSource::Named {
                name: "data-claim".to_string(),
                read_only: true
            }
        );
        assert_eq!(initialized["scratch"], PodVolumeSource::Anonymous);
    }

    #[test]
    fn test_initialize_rejects_missing_file() {
        let temp = TempDir::new().unwrap();
        let volumes = vec![kube::Volume {
            name: "conf".to_string(),
            host_path: Some(HostPathVolumeSource {
                path: temp.path().join("missing.conf").to_string_lossy().into_owned(),
                kind: Some("File".to_string()),
            }),
            ..kube::Volume::default()
        }];
        assert!(matches!(
            initialize_volumes(&volumes),
            Err(Error::InvalidVolume { .. })
        ));
    }

    #[test]
    fn test_initialize_rejects_unsupported_source() {
        let volumes = vec![kube::Volume {
            name: "cm".to_string(),
            config_map: Some(serde_yaml::Value::Null),
            ..kube::Volume::default()
        }];
        assert!(initialize_volumes(&volumes).is_err());
    }
}
