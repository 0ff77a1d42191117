//! Seccomp profile resolution from pod annotations.

use crate::constants::{
    SECCOMP_CONTAINER_ANNOTATION_PREFIX, SECCOMP_LOCALHOST_PREFIX, SECCOMP_POD_ANNOTATION,
    SECCOMP_UNCONFINED,
};
use crate::error::{Error, Result};
use std::collections::HashMap;
use std::path::Path;

/// Seccomp profile of a container.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SeccompProfile {
    /// Runtime default profile.
    #[default]
    Default,
    /// No filtering.
    Unconfined,
    /// Profile file on the host.
    Localhost(String),
}

/// Seccomp profiles declared for a pod and its containers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeccompPaths {
    pod: Option<SeccompProfile>,
    containers: HashMap<String, SeccompProfile>,
}

impl SeccompPaths {
    /// Reads seccomp annotations. `profile_root` anchors `localhost/` values.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSeccompPath`] for unrecognized values.
    pub fn from_annotations(
        annotations: &HashMap<String, String>,
        profile_root: Option<&Path>,
    ) -> Result<Self> {
        let mut paths = Self::default();

        for (key, value) in annotations {
            if key == SECCOMP_POD_ANNOTATION {
                paths.pod = Some(parse_profile(value, profile_root)?);
            } else if let Some(container) = key
                .strip_prefix(SECCOMP_CONTAINER_ANNOTATION_PREFIX)
                .and_then(|rest| rest.strip_prefix('/'))
            {
                paths
                    .containers
                    .insert(container.to_string(), parse_profile(value, profile_root)?);
            }
        }

        Ok(paths)
    }

    /// Returns the profile for a container, falling back to the pod profile.
    #[must_use]
    pub fn for_container(&self, name: &str) -> SeccompProfile {
        self.containers
            .get(name)
            .or(self.pod.as_ref())
            .cloned()
            .unwrap_or_default()
    }
}

fn parse_profile(value: &str, profile_root: Option<&Path>) -> Result<SeccompProfile> {
    match value {
        "runtime/default" | "docker/default" => Ok(SeccompProfile::Default),
        SECCOMP_UNCONFINED => Ok(SeccompProfile::Unconfined),
        _ => {
            let relative = value
                .strip_prefix(SECCOMP_LOCALHOST_PREFIX)
                .filter(|p| !p.is_empty())
                .ok_or_else(|| Error::InvalidSeccompPath(value.to_string()))?;
            let path = match profile_root {
                Some(root) => root.join(relative).to_string_lossy().into_owned(),
                None => relative.to_string(),
            };
            Ok(SeccompProfile::Localhost(path))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn annotations(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_container_overrides_pod() {
        let paths = SeccompPaths::from_annotations(
            &annotations(&[
                (SECCOMP_POD_ANNOTATION, "unconfined"),
                (
                    "container.seccomp.security.alpha.kubernetes.io/web",
                    "localhost/web.json",
                ),
            ]),
            Some(Path::new("/etc/profiles")),
        )
        .unwrap();

        assert_eq!(
            paths.for_container("web"),
            SeccompProfile::Localhost("/etc/profiles/web.json".to_string())
        );
        assert_eq!(paths.for_container("db"), SeccompProfile::Unconfined);
    }

    #[test]
    fn test_no_annotations_is_default() {
        let paths = SeccompPaths::from_annotations(&HashMap::new(), None).unwrap();
        assert_eq!(paths.for_container("any"), SeccompProfile::Default);
    }

    #[test]
    fn test_invalid_value() {
        let err = SeccompPaths::from_annotations(
            &annotations(&[(SECCOMP_POD_ANNOTATION, "strict")]),
            None,
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidSeccompPath(_)));
    }
}
