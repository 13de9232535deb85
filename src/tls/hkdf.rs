//! HKDF (RFC 5869) and the TLS 1.3 label helpers (RFC 8446 §7.1), built on
//! an injected [`CryptoProvider`].

use bytes::{BufMut, BytesMut};
use zeroize::Zeroize;

use crate::crypto::{CryptoProvider, HashAlgorithm, HashOutput, MAX_HASH_LEN};
use crate::error::{Error, Result};

/// Prefix prepended to every HKDF-Expand-Label label.
pub const LABEL_PREFIX: &[u8] = b"tls13 ";

/// HKDF-Extract: `PRK = HMAC(salt, ikm)`.
///
/// An empty salt means `hashLength` zero bytes, per RFC 5869 §2.2.
pub fn extract<P: CryptoProvider + ?Sized>(
    provider: &P,
    alg: HashAlgorithm,
    salt: &[u8],
    ikm: &[u8],
) -> Result<HashOutput> {
    if salt.is_empty() {
        let zero_salt = [0u8; MAX_HASH_LEN];
        provider.hmac(alg, &zero_salt[..alg.output_len()], &[ikm])
    } else {
        provider.hmac(alg, salt, &[ikm])
    }
}

/// HKDF-Expand: fills `okm` with `T(1) || T(2) || ...` truncated to its length,
/// where `T(i) = HMAC(prk, T(i-1) || info || i)` and `T(0)` is empty.
pub fn expand<P: CryptoProvider + ?Sized>(
    provider: &P,
    alg: HashAlgorithm,
    prk: &[u8],
    info: &[u8],
    okm: &mut [u8],
) -> Result<()> {
    let hash_len = alg.output_len();
    if okm.len() > 255 * hash_len {
        return Err(Error::crypto(format!(
            "HKDF-Expand output of {} bytes exceeds 255 blocks",
            okm.len()
        )));
    }

    let mut previous: Option<HashOutput> = None;
    for (i, chunk) in okm.chunks_mut(hash_len).enumerate() {
        // i < 255 by the check above
        let counter = [(i + 1) as u8];
        let block = match &previous {
            Some(t) => provider.hmac(alg, prk, &[t.as_bytes(), info, &counter])?,
            None => provider.hmac(alg, prk, &[info, &counter])?,
        };
        let bytes = block
            .as_bytes()
            .get(..chunk.len())
            .ok_or_else(|| Error::crypto("HMAC output shorter than hash length"))?;
        chunk.copy_from_slice(bytes);
        if let Some(mut t) = previous.replace(block) {
            t.zeroize();
        }
    }
    if let Some(mut t) = previous {
        t.zeroize();
    }
    Ok(())
}

/// HKDF-Expand-Label: expands `secret` into `out` with the TLS 1.3 `HkdfLabel`
///
/// ```text
/// struct {
///     uint16 length = out.len();
///     opaque label<7..255> = "tls13 " + label;
///     opaque context<0..255> = context;
/// } HkdfLabel;
/// ```
pub fn expand_label<P: CryptoProvider + ?Sized>(
    provider: &P,
    alg: HashAlgorithm,
    secret: &[u8],
    label: &[u8],
    context: &[u8],
    out: &mut [u8],
) -> Result<()> {
    let full_label_len = LABEL_PREFIX.len() + label.len();
    if full_label_len > u8::MAX as usize {
        return Err(Error::crypto(format!("label of {} bytes too long", label.len())));
    }
    if context.len() > u8::MAX as usize {
        return Err(Error::crypto(format!("context of {} bytes too long", context.len())));
    }
    let length = u16::try_from(out.len())
        .map_err(|_| Error::crypto(format!("output of {} bytes too long", out.len())))?;

    let mut info = BytesMut::with_capacity(2 + 1 + full_label_len + 1 + context.len());
    info.put_u16(length);
    info.put_u8(full_label_len as u8);
    info.put_slice(LABEL_PREFIX);
    info.put_slice(label);
    info.put_u8(context.len() as u8);
    info.put_slice(context);

    expand(provider, alg, secret, &info, out)
}

/// Derive-Secret: `HKDF-Expand-Label(secret, label, Hash(messages), hashLength)`.
///
/// Empty `messages` hash to `Hash("")`; they are never skipped.
pub fn derive_secret<P: CryptoProvider + ?Sized>(
    provider: &P,
    alg: HashAlgorithm,
    secret: &[u8],
    label: &[u8],
    messages: &[u8],
) -> Result<HashOutput> {
    let transcript_hash = provider.digest(alg, messages);
    let mut out = HashOutput::zeroed(alg);
    expand_label(
        provider,
        alg,
        secret,
        label,
        transcript_hash.as_bytes(),
        out.as_mut_bytes(),
    )?;
    Ok(out)
}
