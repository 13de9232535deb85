//! IPv4 to country lookup over a compact sorted range table.
//!
//! ## Table format
//!
//! ```text
//! "GEO1" | count (u32 BE) | count x entry
//!
//! entry: start (u32 BE) | end (u32 BE) | country (u16 BE)
//! ```
//!
//! Entries are sorted by `start` and do not overlap. Lookups binary-search
//! for the last entry whose `start <= ip` and accept it if `ip <= end`. The
//! table is not re-validated per lookup: an unsorted table gives wrong
//! answers, never a panic.
//!
//! Tables are produced by [`GeoIpTableBuilder`] (and the `geoip build`
//! command) from GeoLite2 country CSVs.

mod builder;
mod table;

use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

pub use builder::GeoIpTableBuilder;
pub use table::{GeoIpEntry, GeoIpTable, GeoIpView};

use crate::error::{Error, Result};

/// Table magic
pub const MAGIC: &[u8; 4] = b"GEO1";

/// Magic plus entry count
pub const HEADER_LEN: usize = 8;

/// Size of one range entry
pub const ENTRY_LEN: usize = 10;

/// Two-letter country code packed big-endian into 16 bits (`"CN"` is
/// `0x434E`).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CountryCode(u16);

impl CountryCode {
    /// Pack two ASCII letters. Lowercase is folded to uppercase.
    pub fn from_letters(code: &str) -> Option<Self> {
        match code.as_bytes() {
            [a, b] if a.is_ascii_alphabetic() && b.is_ascii_alphabetic() => Some(Self(
                u16::from_be_bytes([a.to_ascii_uppercase(), b.to_ascii_uppercase()]),
            )),
            _ => None,
        }
    }

    /// Wrap a packed value as stored in the table.
    pub const fn from_u16(packed: u16) -> Self {
        Self(packed)
    }

    /// Packed value as stored in the table.
    pub const fn get(self) -> u16 {
        self.0
    }

    /// The two code bytes, e.g. `*b"CN"`.
    pub fn letters(self) -> [u8; 2] {
        self.0.to_be_bytes()
    }
}

impl FromStr for CountryCode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_letters(s.trim()).ok_or_else(|| Error::malformed(format!("invalid country code: {:?}", s)))
    }
}

impl fmt::Display for CountryCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b] = self.letters();
        if a.is_ascii_graphic() && b.is_ascii_graphic() {
            write!(f, "{}{}", a as char, b as char)
        } else {
            write!(f, "{:#06x}", self.0)
        }
    }
}

impl fmt::Debug for CountryCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CountryCode({})", self)
    }
}

/// Look up a dotted-quad IPv4 string in a raw table.
///
/// Returns the packed country code, or `0` for a bad table, a bad address
/// or no covering range.
pub fn lookup(db: &[u8], ip: &str) -> u16 {
    let Ok(view) = GeoIpView::parse(db) else {
        return 0;
    };
    let Ok(addr) = ip.parse::<Ipv4Addr>() else {
        return 0;
    };
    view.lookup(addr).map_or(0, CountryCode::get)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn boundary_table() -> Vec<u8> {
        let mut db = MAGIC.to_vec();
        db.extend_from_slice(&3u32.to_be_bytes());
        for (start, end, cc) in [(1u32, 10u32, b"AA"), (11, 20, b"BB"), (100, 200, b"CC")] {
            db.extend_from_slice(&start.to_be_bytes());
            db.extend_from_slice(&end.to_be_bytes());
            db.extend_from_slice(cc);
        }
        db
    }

    fn ip(n: u32) -> String {
        Ipv4Addr::from(n).to_string()
    }

    #[test]
    fn test_boundaries() {
        let db = boundary_table();
        let aa = u16::from_be_bytes(*b"AA");
        let bb = u16::from_be_bytes(*b"BB");
        let cc = u16::from_be_bytes(*b"CC");

        let cases = [
            (1, aa),
            (10, aa),
            (11, bb),
            (20, bb),
            (21, 0),
            (100, cc),
            (200, cc),
            (201, 0),
        ];
        for (addr, expected) in cases {
            assert_eq!(lookup(&db, &ip(addr)), expected, "address {}", addr);
        }
        assert_eq!(lookup(&db, "0.0.0.0"), 0);
        assert_eq!(lookup(&db, "255.255.255.255"), 0);
    }

    #[test]
    fn test_bad_tables_return_zero() {
        let mut db = boundary_table();
        db[0] = b'X';
        assert_eq!(lookup(&db, &ip(5)), 0);

        let db = boundary_table();
        for len in 0..db.len() {
            for addr in [1, 10, 11, 150] {
                assert_eq!(lookup(&db[..len], &ip(addr)), 0);
            }
        }

        // Count far beyond the data
        let mut db = boundary_table();
        db[4..8].copy_from_slice(&u32::MAX.to_be_bytes());
        assert_eq!(lookup(&db, &ip(5)), 0);
    }

    #[test]
    fn test_bad_addresses_return_zero() {
        let db = boundary_table();
        for bad in ["", "1.2.3", "1.2.3.4.5", "256.0.0.1", "::1", "a.b.c.d", " 0.0.0.5"] {
            assert_eq!(lookup(&db, bad), 0, "{:?}", bad);
        }
    }

    #[test]
    fn test_trailing_bytes_ignored() {
        let mut db = boundary_table();
        db.extend_from_slice(&[0xff; 7]);
        assert_eq!(lookup(&db, &ip(15)), u16::from_be_bytes(*b"BB"));
    }

    #[test]
    fn test_country_code() {
        let cn = CountryCode::from_letters("cn").unwrap();
        assert_eq!(cn.get(), 0x434e);
        assert_eq!(cn.to_string(), "CN");
        assert_eq!("RU".parse::<CountryCode>().unwrap().letters(), *b"RU");
        assert!(CountryCode::from_letters("C").is_none());
        assert!(CountryCode::from_letters("C1").is_none());
        assert!("USA".parse::<CountryCode>().is_err());
        assert_eq!(CountryCode::from_u16(0).to_string(), "0x0000");
    }
}
