//! Network override parsing.
//!
//! The `network` play option accepts either a namespace mode, optionally with
//! options, or a comma-separated list of network names:
//!
//! ```text
//!   slirp4netns:port_handler=slirp4netns   mode + options
//!   container:db                           join another container
//!   frontend,backend                       named networks (bridge mode)
//! ```

use crate::error::{Error, Result};
use std::collections::HashMap;

/// Network namespace mode of a pod.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum NetworkMode {
    /// Bridged networking through one or more named networks.
    #[default]
    Bridge,
    /// Host network namespace.
    Host,
    /// Loopback only.
    None,
    /// Private namespace without configuration.
    Private,
    /// User-mode networking.
    Slirp4netns,
    /// Join the namespace of an existing container.
    Container(String),
    /// Join the namespace at a path.
    Path(String),
}

/// Parsed network override.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NetworkOverride {
    /// Requested mode.
    pub mode: NetworkMode,
    /// Named networks to join.
    pub networks: Vec<String>,
    /// Mode options keyed by mode name.
    pub options: HashMap<String, Vec<String>>,
}

impl NetworkOverride {
    /// Parses a network override string.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidNetwork`] for an empty value, an empty network
    /// name, or a `container:`/`ns:` mode without a target.
    pub fn parse(value: &str) -> Result<Self> {
        let value = value.trim();
        if value.is_empty() {
            return Err(Error::InvalidNetwork("network cannot be empty".to_string()));
        }

        let (name, rest) = match value.split_once(':') {
            Some((name, rest)) => (name, Some(rest)),
            None => (value, None),
        };

        let mode = match name {
            "bridge" => NetworkMode::Bridge,
            "host" => NetworkMode::Host,
            "none" => NetworkMode::None,
            "private" => NetworkMode::Private,
            "slirp4netns" => NetworkMode::Slirp4netns,
            "container" => NetworkMode::Container(required_target(value, rest)?),
            "ns" => NetworkMode::Path(required_target(value, rest)?),
            _ => return Self::from_network_list(value),
        };

        let mut options = HashMap::new();
        if let (Some(rest), NetworkMode::Bridge | NetworkMode::Slirp4netns) = (rest, &mode) {
            let values: Vec<String> = rest
                .split(',')
                .filter(|o| !o.is_empty())
                .map(String::from)
                .collect();
            if !values.is_empty() {
                options.insert(name.to_string(), values);
            }
        }

        Ok(Self {
            mode,
            networks: Vec::new(),
            options,
        })
    }

    fn from_network_list(value: &str) -> Result<Self> {
        let networks: Vec<String> = value.split(',').map(|n| n.trim().to_string()).collect();
        if networks.iter().any(String::is_empty) {
            return Err(Error::InvalidNetwork(format!(
                "empty network name in '{value}'"
            )));
        }
        Ok(Self {
            mode: NetworkMode::Bridge,
            networks,
            options: HashMap::new(),
        })
    }

    /// Checks that the override can be applied to a manifest pod.
    ///
    /// Plain bridge and host networking are configured in the manifest
    /// itself, never through the override.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidNetwork`] for `bridge` without networks or `host`.
    pub fn validate_for_play(&self) -> Result<()> {
        let bare_bridge = self.mode == NetworkMode::Bridge && self.networks.is_empty();
        if bare_bridge || self.mode == NetworkMode::Host {
            return Err(Error::InvalidNetwork(
                "bridge or host networking must be configured in YAML".to_string(),
            ));
        }
        Ok(())
    }
}

fn required_target(value: &str, rest: Option<&str>) -> Result<String> {
    match rest {
        Some(target) if !target.is_empty() => Ok(target.to_string()),
        _ => Err(Error::InvalidNetwork(format!(
            "'{value}' requires a target"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_list_is_bridge() {
        let net = NetworkOverride::parse("frontend,backend").unwrap();
        assert_eq!(net.mode, NetworkMode::Bridge);
        assert_eq!(net.networks, vec!["frontend", "backend"]);
        assert!(net.validate_for_play().is_ok());
    }

    #[test]
    fn test_bare_bridge_and_host_rejected() {
        for value in ["bridge", "host"] {
            let net = NetworkOverride::parse(value).unwrap();
            let err = net.validate_for_play().unwrap_err();
            assert!(matches!(err, Error::InvalidNetwork(_)), "{value}");
        }
    }

    #[test]
    fn test_mode_options() {
        let net = NetworkOverride::parse("slirp4netns:port_handler=slirp4netns,mtu=1500").unwrap();
        assert_eq!(net.mode, NetworkMode::Slirp4netns);
        assert_eq!(
            net.options["slirp4netns"],
            vec!["port_handler=slirp4netns", "mtu=1500"]
        );
    }

    #[test]
    fn test_container_mode_requires_target() {
        assert!(NetworkOverride::parse("container:").is_err());
        let net = NetworkOverride::parse("container:db").unwrap();
        assert_eq!(net.mode, NetworkMode::Container("db".to_string()));
    }

    #[test]
    fn test_empty_values_rejected() {
        assert!(NetworkOverride::parse("").is_err());
        assert!(NetworkOverride::parse("a,,b").is_err());
    }
}
