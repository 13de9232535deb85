//! RustCrypto-backed [`CryptoProvider`].

use hmac::digest::KeyInit;
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256, Sha384};

use crate::crypto::{CryptoProvider, HashAlgorithm, HashOutput};
use crate::error::{Error, Result};

/// HMAC and SHA-2 from the `hmac` and `sha2` crates.
#[derive(Debug, Clone, Copy, Default)]
pub struct RustCryptoProvider;

impl CryptoProvider for RustCryptoProvider {
    fn hmac(&self, alg: HashAlgorithm, key: &[u8], data: &[&[u8]]) -> Result<HashOutput> {
        match alg {
            HashAlgorithm::Sha256 => mac::<Hmac<Sha256>>(key, data),
            HashAlgorithm::Sha384 => mac::<Hmac<Sha384>>(key, data),
        }
    }

    fn digest(&self, alg: HashAlgorithm, data: &[u8]) -> HashOutput {
        let mut out = HashOutput::zeroed(alg);
        match alg {
            HashAlgorithm::Sha256 => out.as_mut_bytes().copy_from_slice(&Sha256::digest(data)),
            HashAlgorithm::Sha384 => out.as_mut_bytes().copy_from_slice(&Sha384::digest(data)),
        }
        out
    }
}

fn mac<M: Mac + KeyInit>(key: &[u8], data: &[&[u8]]) -> Result<HashOutput> {
    // HMAC accepts keys of any length; this only fails for a broken Mac impl
    let mut mac = <M as Mac>::new_from_slice(key).map_err(|_| Error::crypto("HMAC key rejected"))?;
    for part in data {
        mac.update(part);
    }
    HashOutput::from_slice(&mac.finalize().into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn test_sha256_empty() {
        let out = RustCryptoProvider.digest(HashAlgorithm::Sha256, b"");
        assert_eq!(
            out.as_bytes(),
            hex!("e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855")
        );
    }

    #[test]
    fn test_sha384_abc() {
        let out = RustCryptoProvider.digest(HashAlgorithm::Sha384, b"abc");
        assert_eq!(
            out.as_bytes(),
            hex!(
                "cb00753f45a35e8bb5a03d699ac65007272c32ab0eded1631a8b605a43ff5bed"
                "8086072ba1e7cc2358baeca134c825a7"
            )
        );
    }

    #[test]
    fn test_hmac_parts_equal_concatenation() {
        let key = [0x0bu8; 20];
        let joined = RustCryptoProvider
            .hmac(HashAlgorithm::Sha256, &key, &[b"Hi There"])
            .unwrap();
        let parts = RustCryptoProvider
            .hmac(HashAlgorithm::Sha256, &key, &[b"Hi ", b"", b"There"])
            .unwrap();
        assert_eq!(joined, parts);

        // RFC 4231 test case 1
        assert_eq!(
            joined.as_bytes(),
            hex!("b0344c61d8db38535ca8afceaf0bf12b881dc200c9833da726e9376c2e32cff7")
        );
    }

    #[test]
    fn test_hmac_sha384_length() {
        let out = RustCryptoProvider
            .hmac(HashAlgorithm::Sha384, b"key", &[b"data"])
            .unwrap();
        assert_eq!(out.len(), 48);
    }
}
