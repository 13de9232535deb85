//! TLS 1.3 cipher suite parameters.

use serde::{Deserialize, Serialize};

use crate::crypto::HashAlgorithm;
use crate::error::{Error, Result};

/// TLS 1.3 cipher suites the key schedule can drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CipherSuite {
    /// TLS_AES_128_GCM_SHA256 (0x1301)
    Aes128GcmSha256,
    /// TLS_AES_256_GCM_SHA384 (0x1302)
    Aes256GcmSha384,
}

/// Sizes and hash selected by a cipher suite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CipherSuiteParams {
    /// Hash used for HKDF, HMAC and the transcript
    pub hash: HashAlgorithm,
    /// Length of every secret in the schedule
    pub hash_len: usize,
    /// AEAD key length
    pub key_len: usize,
}

impl CipherSuite {
    /// Wire identifier of TLS_AES_128_GCM_SHA256
    pub const AES_128_GCM_SHA256: u16 = 0x1301;
    /// Wire identifier of TLS_AES_256_GCM_SHA384
    pub const AES_256_GCM_SHA384: u16 = 0x1302;

    /// Look up a suite by wire identifier.
    pub fn from_id(id: u16) -> Option<Self> {
        match id {
            Self::AES_128_GCM_SHA256 => Some(CipherSuite::Aes128GcmSha256),
            Self::AES_256_GCM_SHA384 => Some(CipherSuite::Aes256GcmSha384),
            _ => None,
        }
    }

    /// Wire identifier.
    pub fn id(self) -> u16 {
        match self {
            CipherSuite::Aes128GcmSha256 => Self::AES_128_GCM_SHA256,
            CipherSuite::Aes256GcmSha384 => Self::AES_256_GCM_SHA384,
        }
    }

    /// Hash and key sizes for the suite.
    pub fn params(self) -> CipherSuiteParams {
        match self {
            CipherSuite::Aes128GcmSha256 => CipherSuiteParams {
                hash: HashAlgorithm::Sha256,
                hash_len: HashAlgorithm::Sha256.output_len(),
                key_len: 16,
            },
            CipherSuite::Aes256GcmSha384 => CipherSuiteParams {
                hash: HashAlgorithm::Sha384,
                hash_len: HashAlgorithm::Sha384.output_len(),
                key_len: 32,
            },
        }
    }
}

impl TryFrom<u16> for CipherSuite {
    type Error = Error;

    fn try_from(id: u16) -> Result<Self> {
        Self::from_id(id).ok_or(Error::InvalidCipherSuite(id))
    }
}

/// How to treat a cipher suite identifier the key schedule does not know.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SuitePolicy {
    /// Reject with [`Error::InvalidCipherSuite`]
    #[default]
    Strict,
    /// Treat anything other than 0x1301 as TLS_AES_256_GCM_SHA384
    Sha384Fallback,
}

impl SuitePolicy {
    /// Resolve a wire identifier to a suite under this policy.
    pub fn resolve(self, id: u16) -> Result<CipherSuite> {
        match (self, CipherSuite::from_id(id)) {
            (_, Some(suite)) => Ok(suite),
            (SuitePolicy::Strict, None) => {
                tracing::debug!("rejecting unknown cipher suite {:#06x}", id);
                Err(Error::InvalidCipherSuite(id))
            }
            (SuitePolicy::Sha384Fallback, None) => {
                tracing::debug!("cipher suite {:#06x} falls back to SHA-384 parameters", id);
                Ok(CipherSuite::Aes256GcmSha384)
            }
        }
    }
}
