//! TLS 1.3 pieces the tunnel needs to ride on a captured handshake.
//!
//! - [`suite`]: cipher suite identifiers and their hash/key sizes
//! - [`hkdf`]: HKDF and the `tls13 ` label helpers
//! - [`key_schedule`]: handshake/application traffic keys and Finished
//! - [`record`]: record headers, inner plaintext, nonces, UDP framing
//! - [`server_hello`]: cipher suite and X25519 key share extraction
//!
//! None of this negotiates TLS. The outer tunnel feeds in captured bytes and
//! an ECDH shared secret, and gets keys and parsed fields back.

pub mod hkdf;
pub mod key_schedule;
pub mod record;
pub mod server_hello;
pub mod suite;

pub use key_schedule::{
    ApplicationKeys, HandshakeKeys, KeySchedule, Secret, TrafficKey, TrafficKeyPair, IV_LEN,
};
pub use record::{
    deframe_udp_payload, encode_record_header, frame_udp_payload, frame_udp_payload_into,
    parse_record_header, record_nonce, unwrap_inner_plaintext, xor_nonce_with_sequence,
    ContentType, Record, RecordHeader, Records, RECORD_HEADER_LEN,
};
pub use server_hello::{parse_server_hello, ServerHello};
pub use suite::{CipherSuite, CipherSuiteParams, SuitePolicy};
