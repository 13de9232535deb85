//! ServerHello extraction for the REALITY handshake.
//!
//! The tunnel captures the server's first flight and needs two things from
//! it: the selected cipher suite and the server's X25519 key share. Only the
//! first Handshake record is examined; records of other types in front of it
//! are skipped.

use crate::error::{Error, Result};
use crate::tls::record::ContentType;
use crate::wire::Reader;

/// TLS handshake types
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HandshakeType {
    /// client_hello
    ClientHello = 1,
    /// server_hello
    ServerHello = 2,
    /// encrypted_extensions
    EncryptedExtensions = 8,
    /// certificate
    Certificate = 11,
    /// certificate_verify
    CertificateVerify = 15,
    /// finished
    Finished = 20,
}

/// TLS extension types
#[repr(u16)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExtensionType {
    /// supported_versions
    SupportedVersions = 43,
    /// key_share
    KeyShare = 51,
}

/// Named group for X25519 key shares
pub const GROUP_X25519: u16 = 0x001d;

/// X25519 public key length
pub const X25519_KEY_LEN: usize = 32;

/// `random` value that marks a HelloRetryRequest (RFC 8446 §4.1.3)
pub const HELLO_RETRY_REQUEST_RANDOM: [u8; 32] = [
    0xcf, 0x21, 0xad, 0x74, 0xe5, 0x9a, 0x61, 0x11, 0xbe, 0x1d, 0x8c, 0x02, 0x1e, 0x65, 0xb8, 0x91,
    0xc2, 0xa2, 0x11, 0x16, 0x7a, 0xbb, 0x8c, 0x5e, 0x07, 0x9e, 0x09, 0xe2, 0xc8, 0xa8, 0x33, 0x9c,
];

/// Fields the tunnel needs from a ServerHello.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerHello {
    /// Server random (32 bytes)
    pub random: [u8; 32],
    /// Selected cipher suite
    pub cipher_suite: u16,
    /// Server's X25519 public key from `key_share`
    pub key_share: [u8; X25519_KEY_LEN],
}

/// Extract the cipher suite and X25519 key share from captured server bytes.
///
/// Fails when:
/// - the data runs out before a Handshake record is complete
/// - the first Handshake record does not start with a ServerHello
/// - the ServerHello is a HelloRetryRequest
/// - any declared length overruns what is left
/// - `key_share` is missing, or names a group other than X25519
pub fn parse_server_hello(data: &[u8]) -> Result<ServerHello> {
    let mut reader = Reader::new(data);
    loop {
        let content_type = reader.read_u8()?;
        reader.skip(2)?;
        let length = reader.read_u16()? as usize;
        let mut record = reader.sub_reader(length)?;

        if content_type != ContentType::Handshake as u8 {
            tracing::trace!("skipping record type {} ({} bytes)", content_type, length);
            continue;
        }
        return parse_handshake(&mut record);
    }
}

fn parse_handshake(r: &mut Reader<'_>) -> Result<ServerHello> {
    let msg_type = r.read_u8()?;
    if msg_type != HandshakeType::ServerHello as u8 {
        return Err(Error::malformed(format!(
            "first handshake message is type {}, not ServerHello",
            msg_type
        )));
    }
    // Body length is not trusted; every field below is bounded by the record
    let _length = r.read_u24()?;
    let _legacy_version = r.read_u16()?;

    let random: [u8; 32] = r.read_array()?;
    if random == HELLO_RETRY_REQUEST_RANDOM {
        return Err(Error::malformed("HelloRetryRequest carries no key share"));
    }

    let session_id_len = r.read_u8()? as usize;
    r.skip(session_id_len)?;

    let cipher_suite = r.read_u16()?;
    let _compression = r.read_u8()?;

    let extensions_len = r.read_u16()? as usize;
    let mut extensions = r.sub_reader(extensions_len)?;

    while !extensions.is_empty() {
        let ext_type = extensions.read_u16()?;
        let ext_len = extensions.read_u16()? as usize;
        let mut ext = extensions.sub_reader(ext_len)?;

        if ext_type != ExtensionType::KeyShare as u16 {
            continue;
        }

        let group = ext.read_u16()?;
        let key_len = ext.read_u16()? as usize;
        if group != GROUP_X25519 || key_len != X25519_KEY_LEN {
            tracing::debug!(
                "unsupported key share: group {:#06x}, {} bytes",
                group,
                key_len
            );
            return Err(Error::malformed(format!(
                "key share group {:#06x} is not X25519",
                group
            )));
        }
        let key_share = ext.read_array()?;

        tracing::debug!("parsed ServerHello: cipher suite {:#06x}", cipher_suite);
        return Ok(ServerHello {
            random,
            cipher_suite,
            key_share,
        });
    }

    Err(Error::malformed("ServerHello has no key_share extension"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tls::record::encode_record_header;
    use bytes::{BufMut, BytesMut};

    fn server_hello_record(group: u16, key: &[u8], cipher_suite: u16) -> Vec<u8> {
        let mut ext = BytesMut::new();
        // supported_versions: TLS 1.3
        ext.put_u16(ExtensionType::SupportedVersions as u16);
        ext.put_u16(2);
        ext.put_u16(0x0304);
        ext.put_u16(ExtensionType::KeyShare as u16);
        ext.put_u16(4 + key.len() as u16);
        ext.put_u16(group);
        ext.put_u16(key.len() as u16);
        ext.put_slice(key);

        let mut body = BytesMut::new();
        body.put_u16(0x0303);
        body.put_slice(&[0x11; 32]);
        body.put_u8(32);
        body.put_slice(&[0x22; 32]);
        body.put_u16(cipher_suite);
        body.put_u8(0);
        body.put_u16(ext.len() as u16);
        body.put_slice(&ext);

        let mut msg = BytesMut::new();
        msg.put_u8(HandshakeType::ServerHello as u8);
        msg.put_slice(&(body.len() as u32).to_be_bytes()[1..]);
        msg.put_slice(&body);

        let mut record = encode_record_header(ContentType::Handshake, msg.len() as u16).to_vec();
        record.extend_from_slice(&msg);
        record
    }

    #[test]
    fn test_extracts_x25519_key_share() {
        let key = [0xabu8; 32];
        let hello = parse_server_hello(&server_hello_record(GROUP_X25519, &key, 0x1302)).unwrap();
        assert_eq!(hello.cipher_suite, 0x1302);
        assert_eq!(hello.key_share, key);
        assert_eq!(hello.random, [0x11; 32]);
    }

    #[test]
    fn test_rejects_other_groups() {
        let p256 = [0x04u8; 65];
        assert!(parse_server_hello(&server_hello_record(0x0017, &p256, 0x1301)).is_err());
        assert!(parse_server_hello(&server_hello_record(0x0017, &[0xab; 32], 0x1301)).is_err());
    }

    #[test]
    fn test_truncated_anywhere_fails() {
        let record = server_hello_record(GROUP_X25519, &[0xcd; 32], 0x1301);
        for len in 0..record.len() {
            assert!(
                parse_server_hello(&record[..len]).is_err(),
                "prefix of {} bytes parsed",
                len
            );
        }
    }

    #[test]
    fn test_skips_leading_non_handshake_records() {
        let mut data = encode_record_header(ContentType::ChangeCipherSpec, 1).to_vec();
        data.push(0x01);
        data.extend_from_slice(&server_hello_record(GROUP_X25519, &[0x5a; 32], 0x1301));
        // Trailing records are never looked at
        data.extend_from_slice(&[0x17, 0x03, 0x03, 0xff, 0xff]);

        let hello = parse_server_hello(&data).unwrap();
        assert_eq!(hello.cipher_suite, 0x1301);
        assert_eq!(hello.key_share, [0x5a; 32]);
    }

    #[test]
    fn test_first_handshake_must_be_server_hello() {
        let mut record = server_hello_record(GROUP_X25519, &[1; 32], 0x1301);
        record[5] = HandshakeType::ClientHello as u8;
        assert!(matches!(parse_server_hello(&record), Err(Error::Malformed(_))));
    }

    #[test]
    fn test_rejects_hello_retry_request() {
        let mut record = server_hello_record(GROUP_X25519, &[1; 32], 0x1301);
        // header(5) + type(1) + len(3) + version(2)
        record[11..43].copy_from_slice(&HELLO_RETRY_REQUEST_RANDOM);
        assert!(matches!(parse_server_hello(&record), Err(Error::Malformed(_))));
    }

    #[test]
    fn test_missing_key_share() {
        let mut body = BytesMut::new();
        body.put_u16(0x0303);
        body.put_slice(&[0u8; 32]);
        body.put_u8(0);
        body.put_u16(0x1301);
        body.put_u8(0);
        body.put_u16(0);

        let mut record = encode_record_header(ContentType::Handshake, 4 + body.len() as u16).to_vec();
        record.push(HandshakeType::ServerHello as u8);
        record.extend_from_slice(&(body.len() as u32).to_be_bytes()[1..]);
        record.extend_from_slice(&body);

        assert!(matches!(parse_server_hello(&record), Err(Error::Malformed(_))));
    }

    #[test]
    fn test_extension_overrunning_block_fails() {
        let mut record = server_hello_record(GROUP_X25519, &[1; 32], 0x1301);
        // Inflate the key_share extension length past the extensions block
        let ks_len_at = record.len() - 32 - 4 - 2;
        record[ks_len_at] = 0x01;
        assert!(parse_server_hello(&record).is_err());
    }
}
