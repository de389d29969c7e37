use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

/// System configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemConfig {
    #[serde(default = "default_conf_version")]
    pub conf_version: String,

    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Hide internal error details from clients.
    #[serde(default)]
    pub production: bool,

    /// Upper bound for any single store call, in milliseconds.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// How many documents the full-text fallback scan reads per collection.
    #[serde(default = "default_fallback_scan_limit")]
    pub fallback_scan_limit: usize,

    /// Origins allowed by CORS. Empty means any origin.
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

fn default_conf_version() -> String {
    "v1.0.0".to_string()
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5001
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

fn default_fallback_scan_limit() -> usize {
    500
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            conf_version: default_conf_version(),
            host: default_host(),
            port: default_port(),
            production: false,
            request_timeout_ms: default_request_timeout_ms(),
            fallback_scan_limit: default_fallback_scan_limit(),
            allowed_origins: Vec::new(),
        }
    }
}

impl SystemConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn bind_addr(&self) -> anyhow::Result<SocketAddr> {
        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid host {:?}: {}", self.host, e))?;
        Ok(SocketAddr::new(ip, self.port))
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.request_timeout_ms == 0 {
            return Err("request_timeout_ms must be greater than 0".to_string());
        }
        if self.fallback_scan_limit == 0 {
            return Err("fallback_scan_limit must be greater than 0".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = SystemConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.bind_addr().unwrap().port(), 5001);
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let config = SystemConfig {
            request_timeout_ms: 0,
            ..SystemConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn hostname_is_not_an_ip() {
        let config = SystemConfig {
            host: "localhost".into(),
            ..SystemConfig::default()
        };
        assert!(config.bind_addr().is_err());
    }
}
