//! Core configuration.
//!
//! Loaded from JSON, or TOML when the file name ends in `.toml`:
//!
//! ```toml
//! cipher_suite_policy = "strict"   # or "sha384-fallback"
//! max_domain_len = 253
//! geoip_path = "/var/lib/reality/geoip.dat"
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::dns::{self, DnsQuery, MAX_DOMAIN_LEN};
use crate::error::{Error, Result};
use crate::geoip::GeoIpTable;
use crate::tls::{KeySchedule, SuitePolicy};

/// Settings for the key schedule, DNS parser and GeoIP table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CoreConfig {
    /// Treatment of cipher suites other than 0x1301/0x1302
    pub cipher_suite_policy: SuitePolicy,
    /// Longest domain name [`dns::parse_query`] accepts, in bytes
    pub max_domain_len: usize,
    /// GeoIP table to load at startup
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geoip_path: Option<PathBuf>,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            cipher_suite_policy: SuitePolicy::Strict,
            max_domain_len: MAX_DOMAIN_LEN,
            geoip_path: None,
        }
    }
}

impl CoreConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if !(1..=255).contains(&self.max_domain_len) {
            return Err(Error::config(format!(
                "max_domain_len must be 1..=255, got {}",
                self.max_domain_len
            )));
        }
        if let Some(path) = &self.geoip_path {
            if path.as_os_str().is_empty() {
                return Err(Error::config("geoip_path cannot be empty"));
            }
        }
        Ok(())
    }

    /// Parse and validate JSON.
    pub fn from_json_str(content: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(content)
            .map_err(|e| Error::config(format!("invalid JSON config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate TOML.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| Error::config(format!("invalid TOML config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Read a config file; `.toml` files are TOML, anything else JSON.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let is_toml = path.extension().map_or(false, |ext| ext == "toml");
        let config = if is_toml {
            Self::from_toml_str(&content)?
        } else {
            Self::from_json_str(&content)?
        };
        tracing::debug!("loaded config from {}", path.display());
        Ok(config)
    }

    /// Render as TOML, e.g. to seed a config file.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::config(e.to_string()))
    }

    /// Key schedule for a negotiated suite under the configured policy.
    pub fn key_schedule(&self, cipher_suite: u16) -> Result<KeySchedule> {
        KeySchedule::for_suite_id(cipher_suite, self.cipher_suite_policy)
    }

    /// [`dns::parse_query`] with the configured name capacity.
    pub fn parse_dns_query(&self, data: &[u8]) -> Result<DnsQuery> {
        dns::parse_query(data, self.max_domain_len)
    }

    /// Load the configured GeoIP table, if any.
    pub fn load_geoip(&self) -> Result<Option<GeoIpTable>> {
        self.geoip_path.as_ref().map(GeoIpTable::load).transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tls::CipherSuite;

    #[test]
    fn test_defaults() {
        let config = CoreConfig::from_json_str("{}").unwrap();
        assert_eq!(config, CoreConfig::default());
        assert_eq!(config.cipher_suite_policy, SuitePolicy::Strict);
        assert_eq!(config.max_domain_len, 253);
        assert!(config.load_geoip().unwrap().is_none());
    }

    #[test]
    fn test_json_and_toml_agree() {
        let json = r#"{"cipher_suite_policy": "sha384-fallback", "max_domain_len": 100}"#;
        let toml = "cipher_suite_policy = \"sha384-fallback\"\nmax_domain_len = 100\n";
        let a = CoreConfig::from_json_str(json).unwrap();
        let b = CoreConfig::from_toml_str(toml).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.key_schedule(0x1303).unwrap().suite(), CipherSuite::Aes256GcmSha384);
    }

    #[test]
    fn test_validation() {
        assert!(CoreConfig::from_json_str(r#"{"max_domain_len": 0}"#).is_err());
        assert!(CoreConfig::from_json_str(r#"{"max_domain_len": 256}"#).is_err());
        assert!(CoreConfig::from_json_str(r#"{"geoip_path": ""}"#).is_err());
        assert!(CoreConfig::from_json_str(r#"{"cipher_suite_policy": "lenient"}"#).is_err());
        assert!(CoreConfig::from_json_str(r#"{"unknown": 1}"#).is_err());
    }

    #[test]
    fn test_strict_policy_from_config() {
        let config = CoreConfig::default();
        assert!(matches!(
            config.key_schedule(0x1303),
            Err(Error::InvalidCipherSuite(0x1303))
        ));
    }

    #[test]
    fn test_toml_roundtrip() {
        let config = CoreConfig {
            geoip_path: Some(PathBuf::from("/tmp/geoip.dat")),
            ..CoreConfig::default()
        };
        let text = config.to_toml_string().unwrap();
        assert!(text.contains("strict"));
        assert_eq!(CoreConfig::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn test_domain_capacity_applies() {
        let mut q = vec![0, 1, 1, 0, 0, 1, 0, 0, 0, 0, 0, 0];
        q.extend_from_slice(b"\x07example\x03com\x00\x00\x01\x00\x01");
        let config = CoreConfig::from_json_str(r#"{"max_domain_len": 5}"#).unwrap();
        assert!(matches!(
            config.parse_dns_query(&q),
            Err(Error::BufferTooSmall { .. })
        ));
        assert_eq!(
            CoreConfig::default().parse_dns_query(&q).unwrap().domain,
            "example.com"
        );
    }
}
