//! Primitive cryptographic capability.
//!
//! The key schedule never calls a hash or MAC implementation directly. It
//! goes through a [`CryptoProvider`], a two-method capability:
//! - `hmac(alg, key, data)`: HMAC-SHA-256 / HMAC-SHA-384
//! - `digest(alg, data)`: SHA-256 / SHA-384
//!
//! [`RustCryptoProvider`] backs it with the RustCrypto `hmac` and `sha2`
//! crates. Hosts with a platform crypto library, and tests that want to pin
//! intermediate values, supply their own implementation.

mod output;
mod provider;

pub use output::HashOutput;
pub use provider::RustCryptoProvider;

use crate::error::Result;

/// Output size of SHA-256 in bytes
pub const SHA256_LEN: usize = 32;

/// Output size of SHA-384 in bytes
pub const SHA384_LEN: usize = 48;

/// Largest hash output any supported suite produces
pub const MAX_HASH_LEN: usize = SHA384_LEN;

/// Hash function underlying a TLS 1.3 cipher suite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HashAlgorithm {
    /// SHA-256 (TLS_AES_128_GCM_SHA256)
    Sha256,
    /// SHA-384 (TLS_AES_256_GCM_SHA384)
    Sha384,
}

impl HashAlgorithm {
    /// Digest and HMAC output length in bytes.
    pub const fn output_len(self) -> usize {
        match self {
            HashAlgorithm::Sha256 => SHA256_LEN,
            HashAlgorithm::Sha384 => SHA384_LEN,
        }
    }
}

/// Injected HMAC and digest primitives.
///
/// Implementations must be stateless with respect to a call: the same
/// inputs always produce the same output, and nothing is retained.
pub trait CryptoProvider {
    /// HMAC over the concatenation of `data` parts, keyed with `key`.
    ///
    /// Taking parts avoids building `T(i-1) || info || i` in a scratch
    /// buffer during HKDF-Expand.
    fn hmac(&self, alg: HashAlgorithm, key: &[u8], data: &[&[u8]]) -> Result<HashOutput>;

    /// Hash of `data`. `data` may be empty; the result is then `Hash("")`.
    fn digest(&self, alg: HashAlgorithm, data: &[u8]) -> HashOutput;
}

impl<P: CryptoProvider + ?Sized> CryptoProvider for &P {
    fn hmac(&self, alg: HashAlgorithm, key: &[u8], data: &[&[u8]]) -> Result<HashOutput> {
        (**self).hmac(alg, key, data)
    }

    fn digest(&self, alg: HashAlgorithm, data: &[u8]) -> HashOutput {
        (**self).digest(alg, data)
    }
}
