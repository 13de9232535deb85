//! TLS 1.3 key schedule (RFC 8446 §7.1).
//!
//! ```text
//!            0
//!            |
//!  0 ->  HKDF-Extract = Early Secret
//!            |
//!      Derive-Secret(., "derived", "")
//!            |
//!  (EC)DHE -> HKDF-Extract = Handshake Secret
//!            |
//!            +--> Derive-Secret(., "c hs traffic", CH..SH)
//!            +--> Derive-Secret(., "s hs traffic", CH..SH)
//!            |
//!      Derive-Secret(., "derived", "")
//!            |
//!  0 ->  HKDF-Extract = Master Secret
//!            |
//!            +--> Derive-Secret(., "c ap traffic", CH..SF)
//!            +--> Derive-Secret(., "s ap traffic", CH..SF)
//! ```
//!
//! Every secret is exactly `hash_len` bytes for the schedule's suite. Keys
//! and IVs are expanded from a traffic secret with the `"key"` and `"iv"`
//! labels.

use std::fmt;

use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::crypto::{CryptoProvider, HashOutput, RustCryptoProvider, MAX_HASH_LEN};
use crate::error::{Error, Result};
use crate::tls::hkdf;
use crate::tls::suite::{CipherSuite, CipherSuiteParams, SuitePolicy};

/// Record-protection IV length for every TLS 1.3 AEAD
pub const IV_LEN: usize = 12;

/// Largest AEAD key any supported suite uses
pub const MAX_KEY_LEN: usize = 32;

/// A key-schedule secret of exactly `hash_len` bytes.
///
/// Zeroized on drop. `Debug` never prints the contents.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Secret(HashOutput);

impl Secret {
    /// Wrap raw secret bytes, e.g. a handshake secret kept by the caller.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        HashOutput::from_slice(bytes).map(Secret)
    }

    /// Raw secret bytes.
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    /// Hash length of the suite that produced it.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Never true for a secret the schedule produced.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl PartialEq for Secret {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for Secret {}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Secret([REDACTED; {}])", self.len())
    }
}

/// AEAD key of `key_len` bytes.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct TrafficKey {
    bytes: [u8; MAX_KEY_LEN],
    len: usize,
}

impl TrafficKey {
    fn zeroed(len: usize) -> Self {
        Self {
            bytes: [0u8; MAX_KEY_LEN],
            len,
        }
    }

    /// Raw key bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len]
    }

    /// 16 for AES-128-GCM, 32 for AES-256-GCM.
    pub fn len(&self) -> usize {
        self.len
    }

    /// True only for a zero-length key.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl fmt::Debug for TrafficKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TrafficKey([REDACTED; {}])", self.len)
    }
}

/// Record-protection key and IV for one direction.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct TrafficKeyPair {
    key: TrafficKey,
    iv: [u8; IV_LEN],
}

impl TrafficKeyPair {
    /// AEAD key: 16 or 32 bytes.
    pub fn key(&self) -> &[u8] {
        self.key.as_bytes()
    }

    /// Static IV; XOR the record sequence number in to get a nonce.
    pub fn iv(&self) -> &[u8; IV_LEN] {
        &self.iv
    }
}

impl fmt::Debug for TrafficKeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrafficKeyPair")
            .field("key", &self.key)
            .field("iv", &"[REDACTED]")
            .finish()
    }
}

/// Output of [`KeySchedule::derive_handshake_keys`].
#[derive(Debug, Clone)]
pub struct HandshakeKeys {
    /// Input to [`KeySchedule::derive_application_keys`]
    pub handshake_secret: Secret,
    /// Client-to-server handshake key and IV
    pub client: TrafficKeyPair,
    /// Server-to-client handshake key and IV
    pub server: TrafficKeyPair,
    /// `c hs traffic`; feeds the client Finished
    pub client_traffic_secret: Secret,
    /// `s hs traffic`; feeds the server Finished
    pub server_traffic_secret: Secret,
}

/// Output of [`KeySchedule::derive_application_keys`].
#[derive(Debug, Clone)]
pub struct ApplicationKeys {
    /// Client-to-server application key and IV
    pub client: TrafficKeyPair,
    /// Server-to-client application key and IV
    pub server: TrafficKeyPair,
    /// `c ap traffic`; input to key updates
    pub client_traffic_secret: Secret,
    /// `s ap traffic`; input to key updates
    pub server_traffic_secret: Secret,
}

/// TLS 1.3 key schedule for one cipher suite over an injected
/// [`CryptoProvider`].
///
/// Stateless: every method is a pure function of its arguments, so one
/// schedule can be shared across threads and sessions.
#[derive(Debug, Clone)]
pub struct KeySchedule<P = RustCryptoProvider> {
    provider: P,
    suite: CipherSuite,
}

impl KeySchedule<RustCryptoProvider> {
    /// Schedule backed by the RustCrypto provider.
    pub fn new(suite: CipherSuite) -> Self {
        Self::with_provider(suite, RustCryptoProvider)
    }

    /// Resolve a wire cipher suite under `policy`.
    pub fn for_suite_id(id: u16, policy: SuitePolicy) -> Result<Self> {
        policy.resolve(id).map(Self::new)
    }
}

impl<P: CryptoProvider> KeySchedule<P> {
    /// Schedule backed by a caller-supplied provider.
    pub fn with_provider(suite: CipherSuite, provider: P) -> Self {
        Self { provider, suite }
    }

    /// Suite this schedule derives for.
    pub fn suite(&self) -> CipherSuite {
        self.suite
    }

    /// Sizes for [`suite`](Self::suite).
    pub fn params(&self) -> CipherSuiteParams {
        self.suite.params()
    }

    /// `Hash(messages)` with the suite's hash.
    pub fn transcript_hash(&self, messages: &[u8]) -> HashOutput {
        self.provider.digest(self.params().hash, messages)
    }

    /// Derive handshake traffic keys from the (EC)DHE shared secret and the
    /// ClientHello..ServerHello transcript.
    ///
    /// # Arguments
    ///
    /// * `shared_secret` - ECDH output computed from the peer's key share
    /// * `transcript` - raw handshake messages ClientHello..ServerHello
    pub fn derive_handshake_keys(
        &self,
        shared_secret: &[u8],
        transcript: &[u8],
    ) -> Result<HandshakeKeys> {
        let params = self.params();
        let zeros = [0u8; MAX_HASH_LEN];

        let early_secret = self.extract(&[], &zeros[..params.hash_len])?;
        let derived = self.derive_secret(&early_secret, b"derived", &[])?;
        let handshake_secret = self.extract(derived.as_bytes(), shared_secret)?;

        let client_traffic_secret =
            self.derive_secret(&handshake_secret, b"c hs traffic", transcript)?;
        let server_traffic_secret =
            self.derive_secret(&handshake_secret, b"s hs traffic", transcript)?;

        tracing::debug!(
            "derived handshake keys: suite={:#06x}, transcript={} bytes",
            self.suite.id(),
            transcript.len()
        );

        Ok(HandshakeKeys {
            client: self.traffic_keys(&client_traffic_secret)?,
            server: self.traffic_keys(&server_traffic_secret)?,
            handshake_secret,
            client_traffic_secret,
            server_traffic_secret,
        })
    }

    /// Derive application traffic keys from the handshake secret and the
    /// ClientHello..server Finished transcript.
    pub fn derive_application_keys(
        &self,
        handshake_secret: &Secret,
        transcript: &[u8],
    ) -> Result<ApplicationKeys> {
        self.check_secret(handshake_secret)?;
        let zeros = [0u8; MAX_HASH_LEN];

        let derived = self.derive_secret(handshake_secret, b"derived", &[])?;
        let master_secret = self.extract(derived.as_bytes(), &zeros[..self.params().hash_len])?;

        let client_traffic_secret =
            self.derive_secret(&master_secret, b"c ap traffic", transcript)?;
        let server_traffic_secret =
            self.derive_secret(&master_secret, b"s ap traffic", transcript)?;

        tracing::debug!(
            "derived application keys: suite={:#06x}, transcript={} bytes",
            self.suite.id(),
            transcript.len()
        );

        Ok(ApplicationKeys {
            client: self.traffic_keys(&client_traffic_secret)?,
            server: self.traffic_keys(&server_traffic_secret)?,
            client_traffic_secret,
            server_traffic_secret,
        })
    }

    /// Finished verify_data: `HMAC(finished_key, Hash(transcript))` where
    /// `finished_key = HKDF-Expand-Label(traffic_secret, "finished", "", hash_len)`.
    pub fn compute_finished(&self, traffic_secret: &Secret, transcript: &[u8]) -> Result<HashOutput> {
        self.check_secret(traffic_secret)?;
        let alg = self.params().hash;

        let mut finished_key = HashOutput::zeroed(alg);
        hkdf::expand_label(
            &self.provider,
            alg,
            traffic_secret.as_bytes(),
            b"finished",
            &[],
            finished_key.as_mut_bytes(),
        )?;
        let transcript_hash = self.transcript_hash(transcript);
        let verify_data = self
            .provider
            .hmac(alg, finished_key.as_bytes(), &[transcript_hash.as_bytes()]);
        finished_key.zeroize();
        verify_data
    }

    /// Check a peer's Finished verify_data in constant time.
    pub fn verify_finished(
        &self,
        traffic_secret: &Secret,
        transcript: &[u8],
        received: &[u8],
    ) -> Result<bool> {
        let expected = self.compute_finished(traffic_secret, transcript)?;
        let ok = expected.ct_eq(received);
        if !ok {
            tracing::debug!("finished verify_data mismatch");
        }
        Ok(ok)
    }

    /// Expand a traffic secret into its AEAD key and IV.
    pub fn traffic_keys(&self, traffic_secret: &Secret) -> Result<TrafficKeyPair> {
        self.check_secret(traffic_secret)?;
        let params = self.params();

        let mut pair = TrafficKeyPair {
            key: TrafficKey::zeroed(params.key_len),
            iv: [0u8; IV_LEN],
        };
        hkdf::expand_label(
            &self.provider,
            params.hash,
            traffic_secret.as_bytes(),
            b"key",
            &[],
            &mut pair.key.bytes[..params.key_len],
        )?;
        hkdf::expand_label(
            &self.provider,
            params.hash,
            traffic_secret.as_bytes(),
            b"iv",
            &[],
            &mut pair.iv,
        )?;
        Ok(pair)
    }

    /// Next-generation application traffic secret (RFC 8446 §7.2).
    pub fn next_traffic_secret(&self, traffic_secret: &Secret) -> Result<Secret> {
        self.check_secret(traffic_secret)?;
        let alg = self.params().hash;
        let mut next = HashOutput::zeroed(alg);
        hkdf::expand_label(
            &self.provider,
            alg,
            traffic_secret.as_bytes(),
            b"traffic upd",
            &[],
            next.as_mut_bytes(),
        )?;
        Ok(Secret(next))
    }

    fn extract(&self, salt: &[u8], ikm: &[u8]) -> Result<Secret> {
        hkdf::extract(&self.provider, self.params().hash, salt, ikm).map(Secret)
    }

    fn derive_secret(&self, secret: &Secret, label: &[u8], messages: &[u8]) -> Result<Secret> {
        hkdf::derive_secret(&self.provider, self.params().hash, secret.as_bytes(), label, messages)
            .map(Secret)
    }

    fn check_secret(&self, secret: &Secret) -> Result<()> {
        let hash_len = self.params().hash_len;
        if secret.len() != hash_len {
            return Err(Error::malformed(format!(
                "secret is {} bytes, suite {:#06x} needs {}",
                secret.len(),
                self.suite.id(),
                hash_len
            )));
        }
        Ok(())
    }
}

/// [`KeySchedule::derive_handshake_keys`] for a wire cipher suite id, strict policy.
pub fn derive_handshake_keys(
    cipher_suite: u16,
    shared_secret: &[u8],
    transcript: &[u8],
) -> Result<HandshakeKeys> {
    KeySchedule::for_suite_id(cipher_suite, SuitePolicy::Strict)?
        .derive_handshake_keys(shared_secret, transcript)
}

/// [`KeySchedule::derive_application_keys`] for a wire cipher suite id, strict policy.
pub fn derive_application_keys(
    cipher_suite: u16,
    handshake_secret: &Secret,
    transcript: &[u8],
) -> Result<ApplicationKeys> {
    KeySchedule::for_suite_id(cipher_suite, SuitePolicy::Strict)?
        .derive_application_keys(handshake_secret, transcript)
}

/// [`KeySchedule::compute_finished`] for a wire cipher suite id, strict policy.
pub fn compute_finished(
    cipher_suite: u16,
    traffic_secret: &Secret,
    transcript: &[u8],
) -> Result<HashOutput> {
    KeySchedule::for_suite_id(cipher_suite, SuitePolicy::Strict)?
        .compute_finished(traffic_secret, transcript)
}

/// [`KeySchedule::transcript_hash`] for a wire cipher suite id, strict policy.
pub fn transcript_hash(cipher_suite: u16, messages: &[u8]) -> Result<HashOutput> {
    Ok(KeySchedule::for_suite_id(cipher_suite, SuitePolicy::Strict)?.transcript_hash(messages))
}
