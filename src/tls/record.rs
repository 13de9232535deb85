//! TLS record framing and per-record helpers.
//!
//! Record header layout:
//!
//! ```text
//! +--------------+------------------+------------------+
//! | type (1)     | legacy ver (2)   | length (2, BE)   |
//! +--------------+------------------+------------------+
//! ```
//!
//! The legacy version bytes are carried but never validated. UDP datagrams
//! travel inside the tunnel stream as `len (u16 BE) || payload`.

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{Error, Result};
use crate::tls::key_schedule::IV_LEN;
use crate::wire::Reader;

/// Size of a TLS record header
pub const RECORD_HEADER_LEN: usize = 5;

/// Legacy record version written on outbound records (TLS 1.2)
pub const LEGACY_RECORD_VERSION: u16 = 0x0303;

/// Length prefix of a framed UDP payload
pub const UDP_FRAME_HEADER_LEN: usize = 2;

/// Largest UDP payload that fits the 16-bit frame prefix
pub const MAX_UDP_PAYLOAD: usize = u16::MAX as usize;

/// TLS record content types
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContentType {
    /// change_cipher_spec (20)
    ChangeCipherSpec = 20,
    /// alert (21)
    Alert = 21,
    /// handshake (22)
    Handshake = 22,
    /// application_data (23); all encrypted records carry this
    ApplicationData = 23,
}

impl ContentType {
    /// Known content type for a raw byte.
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            20 => Some(ContentType::ChangeCipherSpec),
            21 => Some(ContentType::Alert),
            22 => Some(ContentType::Handshake),
            23 => Some(ContentType::ApplicationData),
            _ => None,
        }
    }
}

/// Parsed record header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordHeader {
    /// Raw content type byte
    pub content_type: u8,
    /// Declared body length
    pub length: u16,
}

impl RecordHeader {
    /// Header plus declared body.
    pub fn total_len(&self) -> usize {
        RECORD_HEADER_LEN + self.length as usize
    }
}

/// Parse the 5-byte record header at the start of `buf`.
///
/// Fewer than five bytes is [`Error::InsufficientData`]: the caller should
/// wait for more bytes rather than drop the stream.
pub fn parse_record_header(buf: &[u8]) -> Result<RecordHeader> {
    let mut r = Reader::new(buf);
    let content_type = r.read_u8()?;
    r.skip(2)?;
    let length = r.read_u16()?;
    Ok(RecordHeader {
        content_type,
        length,
    })
}

/// Encode an outbound record header.
pub fn encode_record_header(content_type: ContentType, length: u16) -> [u8; RECORD_HEADER_LEN] {
    let [v0, v1] = LEGACY_RECORD_VERSION.to_be_bytes();
    let [l0, l1] = length.to_be_bytes();
    [content_type as u8, v0, v1, l0, l1]
}

/// One complete record borrowed from a larger buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Record<'a> {
    /// Parsed header
    pub header: RecordHeader,
    /// Exactly `header.length` bytes
    pub body: &'a [u8],
}

/// Iterator over back-to-back records.
///
/// Stops at the first incomplete record; [`Records::remainder`] then holds
/// the unconsumed bytes.
#[derive(Debug, Clone)]
pub struct Records<'a> {
    reader: Reader<'a>,
}

impl<'a> Records<'a> {
    /// Iterate records from the start of `buf`.
    pub fn new(buf: &'a [u8]) -> Self {
        Self {
            reader: Reader::new(buf),
        }
    }

    /// Bytes not yet yielded as a complete record.
    pub fn remainder(&self) -> &'a [u8] {
        self.reader.rest()
    }
}

impl<'a> Iterator for Records<'a> {
    type Item = Record<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut r = self.reader.clone();
        let header = parse_record_header(r.rest()).ok()?;
        r.skip(RECORD_HEADER_LEN).ok()?;
        let body = r.read_bytes(header.length as usize).ok()?;
        self.reader = r;
        Some(Record { header, body })
    }
}

/// Locate the real content of a decrypted TLS 1.3 record.
///
/// The inner plaintext is `content || type || zeros*`; the type is the last
/// non-zero byte. Returns `(content_len, content_type)`.
///
/// An empty or all-zero buffer has no content type and is
/// [`Error::Malformed`].
pub fn unwrap_inner_plaintext(decrypted: &[u8]) -> Result<(usize, u8)> {
    // Unpadded records end in the type byte, so the scan usually stops at
    // its first step.
    decrypted
        .iter()
        .rposition(|&b| b != 0)
        .map(|idx| (idx, decrypted[idx]))
        .ok_or_else(|| {
            tracing::trace!("inner plaintext of {} bytes has no content type", decrypted.len());
            Error::malformed("inner plaintext has no content type")
        })
}

/// XOR the big-endian `seq` into bytes 4..12 of `nonce`.
pub fn xor_nonce_with_sequence(nonce: &mut [u8; IV_LEN], seq: u64) {
    for (n, s) in nonce[IV_LEN - 8..].iter_mut().zip(seq.to_be_bytes()) {
        *n ^= s;
    }
}

/// Per-record nonce: the static IV with `seq` mixed in.
pub fn record_nonce(iv: &[u8; IV_LEN], seq: u64) -> [u8; IV_LEN] {
    let mut nonce = *iv;
    xor_nonce_with_sequence(&mut nonce, seq);
    nonce
}

fn udp_frame_len(payload: &[u8]) -> Result<u16> {
    u16::try_from(payload.len()).map_err(|_| {
        Error::malformed(format!(
            "UDP payload of {} bytes exceeds {}",
            payload.len(),
            MAX_UDP_PAYLOAD
        ))
    })
}

/// Frame a UDP datagram as `len (u16 BE) || payload`.
pub fn frame_udp_payload(payload: &[u8]) -> Result<Bytes> {
    let len = udp_frame_len(payload)?;
    let mut buf = BytesMut::with_capacity(UDP_FRAME_HEADER_LEN + payload.len());
    buf.put_u16(len);
    buf.put_slice(payload);
    Ok(buf.freeze())
}

/// Frame a UDP datagram into `out`, returning the bytes written.
pub fn frame_udp_payload_into(out: &mut [u8], payload: &[u8]) -> Result<usize> {
    let len = udp_frame_len(payload)?;
    let needed = UDP_FRAME_HEADER_LEN + payload.len();
    if out.len() < needed {
        return Err(Error::BufferTooSmall {
            needed,
            capacity: out.len(),
        });
    }
    out[..UDP_FRAME_HEADER_LEN].copy_from_slice(&len.to_be_bytes());
    out[UDP_FRAME_HEADER_LEN..needed].copy_from_slice(payload);
    Ok(needed)
}

/// Take one framed UDP datagram off the front of `buf`.
///
/// Returns the payload and the number of bytes consumed, or
/// [`Error::InsufficientData`] while the frame is still incomplete.
pub fn deframe_udp_payload(buf: &[u8]) -> Result<(&[u8], usize)> {
    let mut r = Reader::new(buf);
    let len = r.read_u16()? as usize;
    let payload = r.read_bytes(len)?;
    Ok((payload, r.position()))
}
