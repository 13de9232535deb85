//! Fixed-capacity hash/HMAC output.

use std::fmt;

use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::crypto::{HashAlgorithm, MAX_HASH_LEN};
use crate::error::{Error, Result};

/// A digest or MAC of up to [`MAX_HASH_LEN`] bytes.
///
/// Sized for the largest supported hash so that both suites share one type;
/// `len` is always the producing algorithm's output length.
///
/// Outputs are often secrets (HKDF-Extract, Derive-Secret), so they are
/// zeroized on drop and `Debug` prints only the length.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct HashOutput {
    bytes: [u8; MAX_HASH_LEN],
    len: usize,
}

impl HashOutput {
    /// All-zero output of `alg`'s length.
    pub fn zeroed(alg: HashAlgorithm) -> Self {
        Self {
            bytes: [0u8; MAX_HASH_LEN],
            len: alg.output_len(),
        }
    }

    /// Copy raw bytes. Fails if longer than [`MAX_HASH_LEN`].
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        if bytes.len() > MAX_HASH_LEN {
            return Err(Error::crypto(format!(
                "hash output of {} bytes exceeds {}",
                bytes.len(),
                MAX_HASH_LEN
            )));
        }
        let mut out = Self {
            bytes: [0u8; MAX_HASH_LEN],
            len: bytes.len(),
        };
        out.bytes[..bytes.len()].copy_from_slice(bytes);
        Ok(out)
    }

    /// The `len` meaningful bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len]
    }

    /// Mutable view of the meaningful bytes.
    pub fn as_mut_bytes(&mut self) -> &mut [u8] {
        &mut self.bytes[..self.len]
    }

    /// Output length: 32 or 48.
    pub fn len(&self) -> usize {
        self.len
    }

    /// True for a zero-length output.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Constant-time comparison against `other`.
    ///
    /// Length is not secret; only the byte contents are compared without
    /// early exit.
    pub fn ct_eq(&self, other: &[u8]) -> bool {
        if other.len() != self.len {
            return false;
        }
        self.as_bytes()
            .iter()
            .zip(other.iter())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
    }
}

impl AsRef<[u8]> for HashOutput {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl PartialEq for HashOutput {
    fn eq(&self, other: &Self) -> bool {
        self.ct_eq(other.as_bytes())
    }
}

impl Eq for HashOutput {}

impl fmt::Debug for HashOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HashOutput([REDACTED; {}])", self.len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_slice_keeps_length() {
        let out = HashOutput::from_slice(&[0xab; 32]).unwrap();
        assert_eq!(out.len(), 32);
        assert_eq!(out.as_bytes(), &[0xab; 32][..]);

        assert!(HashOutput::from_slice(&[0u8; 49]).is_err());
    }

    #[test]
    fn test_ct_eq() {
        let a = HashOutput::from_slice(&[1, 2, 3]).unwrap();
        assert!(a.ct_eq(&[1, 2, 3]));
        assert!(!a.ct_eq(&[1, 2, 4]));
        assert!(!a.ct_eq(&[1, 2]));
    }

    #[test]
    fn test_debug_is_redacted() {
        let out = HashOutput::from_slice(&[0xab; 48]).unwrap();
        let printed = format!("{:?}", out);
        assert_eq!(printed, "HashOutput([REDACTED; 48])");
        assert!(!printed.contains("abab"));
    }

    #[test]
    fn test_zeroed_length_follows_algorithm() {
        assert_eq!(HashOutput::zeroed(HashAlgorithm::Sha256).len(), 32);
        assert_eq!(HashOutput::zeroed(HashAlgorithm::Sha384).len(), 48);
    }
}
