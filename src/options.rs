//! Caller configuration for play and teardown.
//!
//! All option structs implement `Default` and serde `Deserialize` with
//! per-field defaults, so a partial YAML or JSON document is a valid
//! configuration:
//!
//! ```yaml
//! network: "backend"
//! static_ips: ["10.88.0.10", "10.88.0.11"]
//! start: create-only
//! ```

use crate::error::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::net::IpAddr;
use std::path::PathBuf;
use std::str::FromStr;

// =============================================================================
// MAC Address
// =============================================================================

/// Ethernet hardware address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MacAddr(pub [u8; 6]);

impl FromStr for MacAddr {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::InvalidInput(format!("invalid MAC address '{s}'"));

        let mut bytes = [0u8; 6];
        let mut parts = s.split([':', '-']);
        for byte in &mut bytes {
            let part = parts.next().ok_or_else(invalid)?;
            if part.len() != 2 {
                return Err(invalid());
            }
            *byte = u8::from_str_radix(part, 16).map_err(|_| invalid())?;
        }
        if parts.next().is_some() {
            return Err(invalid());
        }
        Ok(Self(bytes))
    }
}

impl std::fmt::Display for MacAddr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02x}:{b:02x}:{c:02x}:{d:02x}:{e:02x}:{g:02x}")
    }
}

impl Serialize for MacAddr {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for MacAddr {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// =============================================================================
// Play Options
// =============================================================================

/// Whether played pods are started after creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StartMode {
    /// Create and start every pod.
    #[default]
    Start,
    /// Create pods and containers, leave them stopped.
    CreateOnly,
}

/// Registry credentials and verification settings used for every pull.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Credentials {
    /// Path to a registry auth file.
    pub authfile: Option<PathBuf>,
    /// Directory holding registry certificates.
    pub cert_dir: Option<PathBuf>,
    /// Path to a signature policy file.
    pub signature_policy: Option<PathBuf>,
    /// Registry username.
    pub username: Option<String>,
    /// Registry password.
    #[serde(skip_serializing)]
    pub password: Option<String>,
    /// Skip TLS verification. `None` leaves the registry default.
    pub skip_tls_verify: Option<bool>,
}

/// Options for [`crate::PlayEngine::play`].
///
/// Immutable for the duration of one play call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayOptions {
    /// Network override (`--network`): a mode with options or network names.
    pub network: Option<String>,
    /// Static IPs handed out one per pod, in creation order.
    pub static_ips: Vec<IpAddr>,
    /// Static MACs handed out one per pod, in creation order.
    pub static_macs: Vec<MacAddr>,
    /// ConfigMap files used to resolve environment references.
    pub config_maps: Vec<PathBuf>,
    /// Force a local build whenever a build context exists.
    pub build: bool,
    /// Suppress pull progress output.
    pub quiet: bool,
    /// Start mode.
    pub start: StartMode,
    /// Registry credentials.
    pub credentials: Credentials,
    /// Root directory for `localhost/` seccomp profiles.
    pub seccomp_profile_root: Option<PathBuf>,
    /// Log driver for created containers.
    pub log_driver: Option<String>,
    /// Infra image override.
    pub infra_image: Option<String>,
    /// Directory probed for local build contexts. Defaults to the process
    /// working directory.
    pub context_dir: Option<PathBuf>,
}

impl PlayOptions {
    /// Returns true if pods should be started after creation.
    #[must_use]
    pub fn should_start(&self) -> bool {
        self.start == StartMode::Start
    }
}

/// Options for [`crate::PlayEngine::play_down`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayDownOptions {
    /// Seconds to wait before killing pods. `None` uses the runtime default.
    pub stop_timeout: Option<u32>,
}
