//! Local DNS answering for fake-IP routing.
//!
//! The tunnel intercepts DNS queries on UDP/53, reads the queried name with
//! [`parse_query`], and answers on the spot with [`generate_response`]: an A
//! or AAAA record pointing at a fake address, or NODATA. Nothing here talks
//! to a resolver.
//!
//! Wire layout handled here:
//!
//! ```text
//! header (12) | QNAME labels .. 0 | QTYPE (2) | QCLASS (2) | [answer]
//! ```

mod query;
mod response;

pub use query::{parse_query, DnsQuery};
pub use response::{generate_response, generate_response_into, response_len};

/// DNS header size
pub const HEADER_LEN: usize = 12;

/// Longest presentation-form domain name
pub const MAX_DOMAIN_LEN: usize = 253;

/// QTYPE for IPv4 address records
pub const TYPE_A: u16 = 1;

/// QTYPE for IPv6 address records
pub const TYPE_AAAA: u16 = 28;

/// Internet class
pub const CLASS_IN: u16 = 1;

/// Flags on every fabricated response: QR, AA, RD, RA
pub const RESPONSE_FLAGS: u16 = 0x8580;

/// TTL of fabricated answers, in seconds
pub const ANSWER_TTL: u32 = 1;

/// Label length bits that mark a compression pointer
const POINTER_MASK: u8 = 0xC0;
