//! ConfigMap files supplied out-of-band with a play.
//!
//! ConfigMaps embedded in the manifest are not played; only files passed
//! through [`crate::PlayOptions::config_maps`] are used, and only to resolve
//! container environment references.

use crate::error::{Error, Result};
use crate::kube::ConfigMap;
use std::path::{Path, PathBuf};

/// Reads a ConfigMap from a YAML file.
///
/// # Errors
///
/// - [`Error::Io`] if the file cannot be read
/// - [`Error::Parse`] if it is not a single `ConfigMap` document
pub async fn read_config_map(path: &Path) -> Result<ConfigMap> {
    let content = tokio::fs::read(path).await?;
    parse_config_map(&content).map_err(|e| match e {
        Error::Parse { context, reason } => Error::Parse {
            context: format!("{context} in {}", path.display()),
            reason,
        },
        other => other,
    })
}

/// Parses ConfigMap YAML.
pub fn parse_config_map(content: &[u8]) -> Result<ConfigMap> {
    let config_map: ConfigMap =
        serde_yaml::from_slice(content).map_err(|e| Error::parse("YAML as Kube ConfigMap", e))?;

    if config_map.kind != "ConfigMap" {
        return Err(Error::parse(
            "ConfigMap",
            format!(
                "invalid YAML kind: {:?}. [ConfigMap] is the only supported by --configmap",
                config_map.kind
            ),
        ));
    }

    Ok(config_map)
}

/// Reads every ConfigMap file, in order.
pub async fn read_config_maps(paths: &[PathBuf]) -> Result<Vec<ConfigMap>> {
    let mut config_maps = Vec::with_capacity(paths.len());
    for path in paths {
        config_maps.push(read_config_map(path).await?);
    }
    Ok(config_maps)
}

/// Looks up one key of a named ConfigMap.
#[must_use]
pub fn lookup<'a>(config_maps: &'a [ConfigMap], name: &str, key: &str) -> Option<&'a str> {
    config_maps
        .iter()
        .find(|cm| cm.metadata.name == name)
        .and_then(|cm| cm.data.get(key))
        .map(String::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_config_map() {
        let cm = parse_config_map(b"kind: ConfigMap\nmetadata:\n  name: app\ndata:\n  LEVEL: debug\n")
            .unwrap();
        assert_eq!(cm.metadata.name, "app");
        assert_eq!(lookup(&[cm], "app", "LEVEL"), Some("debug"));
    }

    #[test]
    fn test_parse_rejects_other_kind() {
        let err = parse_config_map(b"kind: Secret\nmetadata:\n  name: app\n").unwrap_err();
        assert!(err.to_string().contains("only supported by --configmap"));
    }

    #[tokio::test]
    async fn test_read_reports_path() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("cm.yaml");
        std::fs::write(&path, "kind: [broken\n").unwrap();

        let err = read_config_map(&path).await.unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));
        assert!(err.to_string().contains("cm.yaml"));
    }
}
