//! # reality-core
//!
//! Cryptographic and wire-parsing core of a REALITY (TLS-camouflaged) proxy
//! tunnel.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │        Outer tunnel (sessions, netstack, routing)        │
//! ├──────────────────────────────┬──────────────────────────┤
//! │  tls::server_hello / record  │  dns (fake-IP answers)   │
//! │  (captured handshake bytes)  │  geoip (country routing) │
//! ├──────────────────────────────┴──────────────────────────┤
//! │  tls::key_schedule (RFC 8446 §7.1) over tls::hkdf        │
//! ├─────────────────────────────────────────────────────────┤
//! │  crypto::CryptoProvider (HMAC-SHA-256/384, SHA-256/384)  │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! The tunnel hands a captured ServerHello to [`tls::parse_server_hello`],
//! computes the ECDH shared secret from the returned key share, and derives
//! traffic keys with a [`tls::KeySchedule`]. Decrypted records pass through
//! [`tls::unwrap_inner_plaintext`]. DNS queries seen on the tunnel are
//! answered locally by [`dns::generate_response`], and [`geoip`] maps
//! destination addresses to countries for routing.
//!
//! ## Properties
//!
//! 1. **Pure**: no I/O, no shared mutable state; everything is reentrant
//! 2. **Bounds-checked**: every parser reads through [`wire::Reader`] and
//!    fails on a declared length that overruns its input
//! 3. **Exact**: key schedule output matches the RFC 8448 vectors

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod config;
pub mod crypto;
pub mod dns;
pub mod error;
pub mod geoip;
pub mod tls;
pub mod wire;

pub use config::CoreConfig;
pub use error::{Error, Result};
