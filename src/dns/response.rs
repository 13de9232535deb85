use std::net::IpAddr;

use bytes::{BufMut, Bytes, BytesMut};

use crate::dns::{
    ANSWER_TTL, CLASS_IN, HEADER_LEN, POINTER_MASK, RESPONSE_FLAGS, TYPE_A, TYPE_AAAA,
};
use crate::error::{Error, Result};
use crate::wire::Reader;

/// Answer name: pointer to the QNAME at offset 12
const NAME_POINTER: u16 = 0xC000 | HEADER_LEN as u16;

/// name(2) + type(2) + class(2) + ttl(4) + rdlength(2)
const ANSWER_FIXED_LEN: usize = 12;

/// Offset just past QTYPE/QCLASS of the first question.
///
/// A compression pointer ends the name and occupies two bytes.
fn question_end(query: &[u8]) -> Result<usize> {
    let mut r = Reader::new(query);
    r.skip(HEADER_LEN)?;
    loop {
        let label_len = r.read_u8()?;
        if label_len == 0 {
            break;
        }
        if label_len & POINTER_MASK != 0 {
            r.skip(1)?;
            break;
        }
        r.skip(label_len as usize)?;
    }
    r.skip(4)?;
    Ok(r.position())
}

/// RDATA for the answer, if this query type and address produce one.
fn answer_rdata(fake: Option<IpAddr>, qtype: u16) -> Option<RData> {
    match (fake?, qtype) {
        (IpAddr::V4(ip), TYPE_A) => Some(RData::V4(ip.octets())),
        (IpAddr::V6(ip), TYPE_AAAA) => Some(RData::V6(ip.octets())),
        _ => None,
    }
}

enum RData {
    V4([u8; 4]),
    V6([u8; 16]),
}

impl RData {
    fn as_bytes(&self) -> &[u8] {
        match self {
            RData::V4(b) => &b[..],
            RData::V6(b) => &b[..],
        }
    }
}

/// Exact size [`generate_response_into`] will write for these inputs.
pub fn response_len(query: &[u8], fake: Option<IpAddr>, qtype: u16) -> Result<usize> {
    let end = question_end(query)?;
    Ok(match answer_rdata(fake, qtype) {
        Some(rdata) => end + ANSWER_FIXED_LEN + rdata.as_bytes().len(),
        None => end,
    })
}

/// Write a fabricated response to `query` into `out`, returning its length.
///
/// The header and first question are copied from the query, flags become
/// `0x8580` and NSCOUNT/ARCOUNT are cleared. When `fake` is an IPv4 address
/// and `qtype` is A, or IPv6 and AAAA, one answer with TTL 1 is appended;
/// any other combination yields NODATA.
///
/// # Arguments
///
/// * `query` - the intercepted DNS query payload
/// * `fake` - address to answer with, or `None` for NODATA
/// * `qtype` - QTYPE from [`parse_query`](crate::dns::parse_query)
/// * `out` - destination; too small is [`Error::BufferTooSmall`]
pub fn generate_response_into(
    query: &[u8],
    fake: Option<IpAddr>,
    qtype: u16,
    out: &mut [u8],
) -> Result<usize> {
    let end = question_end(query)?;
    let rdata = answer_rdata(fake, qtype);
    let needed = match &rdata {
        Some(rdata) => end + ANSWER_FIXED_LEN + rdata.as_bytes().len(),
        None => end,
    };
    if out.len() < needed {
        return Err(Error::BufferTooSmall {
            needed,
            capacity: out.len(),
        });
    }

    out[..end].copy_from_slice(&query[..end]);
    out[2..4].copy_from_slice(&RESPONSE_FLAGS.to_be_bytes());
    let ancount = u16::from(rdata.is_some());
    let mut counts = &mut out[6..HEADER_LEN];
    counts.put_u16(ancount);
    counts.put_u16(0);
    counts.put_u16(0);

    if let Some(rdata) = &rdata {
        let rdata = rdata.as_bytes();
        let mut answer = &mut out[end..needed];
        answer.put_u16(NAME_POINTER);
        answer.put_u16(qtype);
        answer.put_u16(CLASS_IN);
        answer.put_u32(ANSWER_TTL);
        answer.put_u16(rdata.len() as u16);
        answer.put_slice(rdata);
    }

    tracing::debug!(
        "fabricated DNS response: type {}, {} answer(s), {} bytes",
        qtype,
        ancount,
        needed
    );
    Ok(needed)
}

/// Allocating form of [`generate_response_into`].
pub fn generate_response(query: &[u8], fake: Option<IpAddr>, qtype: u16) -> Result<Bytes> {
    let len = response_len(query, fake, qtype)?;
    let mut buf = BytesMut::zeroed(len);
    generate_response_into(query, fake, qtype, &mut buf)?;
    Ok(buf.freeze())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{Ipv4Addr, Ipv6Addr};

    fn example_com(qtype: u16) -> Vec<u8> {
        let mut q = vec![0xab, 0xcd, 0x01, 0x00, 0x00, 0x01, 0, 0, 0, 0, 0, 0];
        q.extend_from_slice(b"\x07example\x03com\x00");
        q.extend_from_slice(&qtype.to_be_bytes());
        q.extend_from_slice(&CLASS_IN.to_be_bytes());
        q
    }

    #[test]
    fn test_a_answer() {
        let query = example_com(TYPE_A);
        let fake = IpAddr::V4(Ipv4Addr::new(93, 184, 216, 34));
        let resp = generate_response(&query, Some(fake), TYPE_A).unwrap();

        assert_eq!(resp.len(), query.len() + 16);
        assert_eq!(&resp[..2], &[0xabu8, 0xcd]);
        assert_eq!(&resp[2..4], &[0x85u8, 0x80]);
        assert_eq!(&resp[4..6], &[0x00u8, 0x01]);
        assert_eq!(&resp[6..8], &[0x00u8, 0x01]);
        assert_eq!(&resp[8..12], &[0u8; 4]);
        assert_eq!(&resp[12..query.len()], &query[12..]);

        let answer = &resp[query.len()..];
        assert_eq!(
            answer,
            &[0xc0u8, 0x0c, 0x00, 0x01, 0x00, 0x01, 0, 0, 0, 1, 0x00, 0x04, 93, 184, 216, 34]
        );
    }

    #[test]
    fn test_aaaa_answer() {
        let query = example_com(TYPE_AAAA);
        let fake: Ipv6Addr = "fd00::1".parse().unwrap();
        let resp = generate_response(&query, Some(IpAddr::V6(fake)), TYPE_AAAA).unwrap();
        assert_eq!(resp.len(), query.len() + 12 + 16);
        assert_eq!(&resp[query.len() + 2..query.len() + 4], &[0x00u8, 0x1c]);
        assert_eq!(&resp[resp.len() - 16..], &fake.octets());
    }

    #[test]
    fn test_nodata() {
        let query = example_com(TYPE_A);
        let resp = generate_response(&query, None, TYPE_A).unwrap();
        assert_eq!(resp.len(), query.len());
        assert_eq!(&resp[2..4], &[0x85u8, 0x80]);
        assert_eq!(&resp[6..12], &[0u8; 6]);
        assert_eq!(&resp[12..], &query[12..]);

        // Address family must match the query type
        let v4 = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1));
        let resp = generate_response(&example_com(TYPE_AAAA), Some(v4), TYPE_AAAA).unwrap();
        assert_eq!(&resp[6..8], &[0u8, 0]);

        // MX gets NODATA even with an address
        let resp = generate_response(&example_com(15), Some(v4), 15).unwrap();
        assert_eq!(&resp[6..8], &[0u8, 0]);
    }

    #[test]
    fn test_buffer_too_small() {
        let query = example_com(TYPE_A);
        let fake = Some(IpAddr::V4(Ipv4Addr::LOCALHOST));
        let needed = response_len(&query, fake, TYPE_A).unwrap();

        let mut out = vec![0u8; needed - 1];
        assert!(matches!(
            generate_response_into(&query, fake, TYPE_A, &mut out),
            Err(Error::BufferTooSmall { .. })
        ));

        let mut out = vec![0u8; needed + 8];
        assert_eq!(generate_response_into(&query, fake, TYPE_A, &mut out).unwrap(), needed);
    }

    #[test]
    fn test_question_end_with_pointer() {
        let mut q = vec![0u8; 12];
        q.extend_from_slice(&[0xc0, 0x0c, 0x00, 0x01, 0x00, 0x01]);
        assert_eq!(question_end(&q).unwrap(), 18);
        assert!(question_end(&q[..17]).is_err());
    }

    #[test]
    fn test_truncated_query_fails() {
        let query = example_com(TYPE_A);
        for len in 0..query.len() {
            assert!(generate_response(&query[..len], None, TYPE_A).is_err());
        }
    }
}
