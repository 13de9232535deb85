use crate::dns::{HEADER_LEN, POINTER_MASK, TYPE_A, TYPE_AAAA};
use crate::error::{Error, Result};
use crate::wire::Reader;

/// The first question of a DNS query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnsQuery {
    /// Transaction ID
    pub id: u16,
    /// Queried name, labels joined with `.`, no trailing dot.
    ///
    /// Label octets that are not UTF-8 become U+FFFD.
    pub domain: String,
    /// QTYPE of the first question
    pub qtype: u16,
}

impl DnsQuery {
    /// A or AAAA, the only types that get a fake-IP answer.
    pub fn is_address_query(&self) -> bool {
        self.qtype == TYPE_A || self.qtype == TYPE_AAAA
    }
}

/// Read the name and type of the first question in `data`.
///
/// `max_domain_len` caps the joined name in bytes; a longer name is
/// [`Error::BufferTooSmall`]. Compression pointers are not expected in a
/// query and are [`Error::Malformed`], as is an empty name. Labels are raw
/// octets; bytes that are not UTF-8 are decoded lossily rather than
/// rejected, so any query [`generate_response`](crate::dns::generate_response)
/// answers also parses.
pub fn parse_query(data: &[u8], max_domain_len: usize) -> Result<DnsQuery> {
    let mut r = Reader::new(data);
    let mut header = r.sub_reader(HEADER_LEN)?;
    let id = header.read_u16()?;
    let _flags = header.read_u16()?;
    let qdcount = header.read_u16()?;
    if qdcount == 0 {
        return Err(Error::malformed("DNS query has no question"));
    }

    let mut name = Vec::with_capacity(max_domain_len.min(64));
    loop {
        let label_len = r.read_u8()?;
        if label_len == 0 {
            break;
        }
        if label_len & POINTER_MASK != 0 {
            return Err(Error::malformed("compression pointer in query name"));
        }
        let label = r.read_bytes(label_len as usize)?;

        let separator = usize::from(!name.is_empty());
        let needed = name.len() + separator + label.len();
        if needed > max_domain_len {
            return Err(Error::BufferTooSmall {
                needed,
                capacity: max_domain_len,
            });
        }
        if separator == 1 {
            name.push(b'.');
        }
        name.extend_from_slice(label);
    }

    if name.is_empty() {
        return Err(Error::malformed("empty query name"));
    }
    let domain = String::from_utf8_lossy(&name).into_owned();
    let qtype = r.read_u16()?;

    tracing::trace!("DNS query {:#06x}: {} type {}", id, domain, qtype);
    Ok(DnsQuery { id, domain, qtype })
}
