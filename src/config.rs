use std::net::SocketAddr;
use std::time::Duration;

use crate::credentials::DEFAULT_PBKDF2_ITERATIONS;

/// Application-level constants
pub const APP_NAME: &str = "patient-portal";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8080";
/// Default inactivity timeout: 15 minutes.
pub const DEFAULT_SESSION_TTL_SECS: u64 = 900;
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 60;

/// Filter used when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    "patient_portal=info,tower_http=warn"
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid bind address {value:?}: {source}")]
    InvalidBindAddr {
        value: String,
        source: std::net::AddrParseError,
    },
}

/// Runtime settings, read from `PORTAL_*` environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortalConfig {
    pub bind_addr: SocketAddr,
    pub session_ttl: Duration,
    pub sweep_interval: Duration,
    pub pbkdf2_iterations: u32,
    pub seed_demo_account: bool,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            session_ttl: Duration::from_secs(DEFAULT_SESSION_TTL_SECS),
            sweep_interval: Duration::from_secs(DEFAULT_SWEEP_INTERVAL_SECS),
            pbkdf2_iterations: DEFAULT_PBKDF2_ITERATIONS,
            seed_demo_account: true,
        }
    }
}

impl PortalConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let raw_addr = lookup("PORTAL_BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = raw_addr
            .trim()
            .parse()
            .map_err(|source| ConfigError::InvalidBindAddr {
                value: raw_addr.clone(),
                source,
            })?;

        let session_ttl = env_u64(&lookup, "PORTAL_SESSION_TTL_SECS", DEFAULT_SESSION_TTL_SECS);
        let sweep_interval =
            env_u64(&lookup, "PORTAL_SWEEP_INTERVAL_SECS", DEFAULT_SWEEP_INTERVAL_SECS);

        Ok(Self {
            bind_addr,
            session_ttl: Duration::from_secs(positive(session_ttl, DEFAULT_SESSION_TTL_SECS)),
            sweep_interval: Duration::from_secs(positive(
                sweep_interval,
                DEFAULT_SWEEP_INTERVAL_SECS,
            )),
            pbkdf2_iterations: env_u32(
                &lookup,
                "PORTAL_PBKDF2_ITERATIONS",
                defaults.pbkdf2_iterations,
            )
            .max(1),
            seed_demo_account: env_bool(
                &lookup,
                "PORTAL_SEED_DEMO_ACCOUNT",
                defaults.seed_demo_account,
            ),
        })
    }
}

fn positive(value: u64, default: u64) -> u64 {
    if value == 0 {
        default
    } else {
        value
    }
}

fn env_bool(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: bool) -> bool {
    lookup(name)
        .and_then(|v| match v.trim() {
            "1" | "true" | "TRUE" | "yes" | "YES" => Some(true),
            "0" | "false" | "FALSE" | "no" | "NO" => Some(false),
            other => {
                tracing::warn!(var = name, value = other, "Unrecognised boolean, using default");
                None
            }
        })
        .unwrap_or(default)
}

fn env_u64(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: u64) -> u64 {
    lookup(name)
        .and_then(|v| match v.trim().parse::<u64>() {
            Ok(n) => Some(n),
            Err(_) => {
                tracing::warn!(var = name, value = %v, "Unparseable number, using default");
                None
            }
        })
        .unwrap_or(default)
}

fn env_u32(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: u32) -> u32 {
    u32::try_from(env_u64(lookup, name, u64::from(default))).unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(pairs: &[(&str, &str)]) -> Result<PortalConfig, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        PortalConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn empty_environment_gives_defaults() {
        assert_eq!(config_from(&[]).unwrap(), PortalConfig::default());
    }

    #[test]
    fn defaults_match_documented_values() {
        let config = PortalConfig::default();
        assert_eq!(config.bind_addr.to_string(), DEFAULT_BIND_ADDR);
        assert_eq!(config.session_ttl, Duration::from_secs(900));
        assert_eq!(config.sweep_interval, Duration::from_secs(60));
        assert_eq!(config.pbkdf2_iterations, 600_000);
        assert!(config.seed_demo_account);
    }

    #[test]
    fn variables_override_defaults() {
        let config = config_from(&[
            ("PORTAL_BIND_ADDR", "0.0.0.0:9000"),
            ("PORTAL_SESSION_TTL_SECS", "120"),
            ("PORTAL_SWEEP_INTERVAL_SECS", "5"),
            ("PORTAL_PBKDF2_ITERATIONS", "1000"),
            ("PORTAL_SEED_DEMO_ACCOUNT", "false"),
        ])
        .unwrap();
        assert_eq!(config.bind_addr.port(), 9000);
        assert_eq!(config.session_ttl, Duration::from_secs(120));
        assert_eq!(config.sweep_interval, Duration::from_secs(5));
        assert_eq!(config.pbkdf2_iterations, 1000);
        assert!(!config.seed_demo_account);
    }

    #[test]
    fn bad_numbers_fall_back_to_defaults() {
        let config = config_from(&[
            ("PORTAL_SESSION_TTL_SECS", "forever"),
            ("PORTAL_SWEEP_INTERVAL_SECS", "0"),
            ("PORTAL_PBKDF2_ITERATIONS", "99999999999"),
            ("PORTAL_SEED_DEMO_ACCOUNT", "maybe"),
        ])
        .unwrap();
        assert_eq!(config.session_ttl, Duration::from_secs(DEFAULT_SESSION_TTL_SECS));
        assert_eq!(config.sweep_interval, Duration::from_secs(DEFAULT_SWEEP_INTERVAL_SECS));
        assert_eq!(config.pbkdf2_iterations, DEFAULT_PBKDF2_ITERATIONS);
        assert!(config.seed_demo_account);
    }

    #[test]
    fn invalid_bind_address_is_an_error() {
        let err = config_from(&[("PORTAL_BIND_ADDR", "localhost")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidBindAddr { .. }));
        assert!(err.to_string().contains("localhost"));
    }

    #[test]
    fn app_version_matches_cargo() {
        assert_eq!(APP_VERSION, "0.1.0");
    }
}
