use std::collections::{BTreeSet, HashSet};
use std::net::Ipv4Addr;

use bytes::{BufMut, BytesMut};

use crate::error::{Error, Result};
use crate::geoip::{CountryCode, GeoIpEntry, GeoIpTable, ENTRY_LEN, HEADER_LEN, MAGIC};

/// Collects ranges and encodes a sorted `GEO1` table.
///
/// ```
/// use reality_core::geoip::{CountryCode, GeoIpTableBuilder};
/// use std::net::Ipv4Addr;
///
/// let cn = CountryCode::from_letters("CN").unwrap();
/// let mut builder = GeoIpTableBuilder::new();
/// builder.add_cidr("1.0.1.0/24", cn).unwrap();
/// let table = builder.build().unwrap();
/// assert_eq!(table.lookup(Ipv4Addr::new(1, 0, 1, 200)), Some(cn));
/// ```
#[derive(Debug, Clone, Default)]
pub struct GeoIpTableBuilder {
    entries: Vec<GeoIpEntry>,
    allowed: Option<HashSet<CountryCode>>,
    skipped: usize,
}

impl GeoIpTableBuilder {
    /// Empty builder that keeps every country.
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep only ranges for these countries; others are counted as skipped.
    pub fn allow_countries(mut self, countries: impl IntoIterator<Item = CountryCode>) -> Self {
        self.allowed = Some(countries.into_iter().collect());
        self
    }

    /// Add an inclusive range. Returns `false` if the country is filtered out.
    pub fn add_range(&mut self, start: Ipv4Addr, end: Ipv4Addr, country: CountryCode) -> Result<bool> {
        let (start, end) = (u32::from(start), u32::from(end));
        if start > end {
            return Err(Error::malformed(format!(
                "range start {} is after end {}",
                Ipv4Addr::from(start),
                Ipv4Addr::from(end)
            )));
        }
        if let Some(allowed) = &self.allowed {
            if !allowed.contains(&country) {
                self.skipped += 1;
                return Ok(false);
            }
        }
        self.entries.push(GeoIpEntry {
            start,
            end,
            country,
        });
        Ok(true)
    }

    /// Add an IPv4 CIDR block such as `"1.0.1.0/24"`. Host bits are ignored.
    pub fn add_cidr(&mut self, cidr: &str, country: CountryCode) -> Result<bool> {
        let (start, end) = parse_cidr(cidr)?;
        self.add_range(start, end, country)
    }

    /// Count a source row that never made it to [`add_range`](Self::add_range).
    pub fn skip(&mut self) {
        self.skipped += 1;
    }

    /// Ranges kept so far.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if no range has been kept.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Rows filtered out or skipped so far.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Distinct countries among the kept ranges, sorted.
    pub fn countries(&self) -> BTreeSet<CountryCode> {
        self.entries.iter().map(|e| e.country).collect()
    }

    /// Sort, check for overlaps and encode.
    pub fn build(mut self) -> Result<GeoIpTable> {
        self.entries.sort_by_key(|e| e.start);
        for pair in self.entries.windows(2) {
            if let [prev, next] = pair {
                if next.start <= prev.end {
                    return Err(Error::malformed(format!(
                        "range starting at {} overlaps range ending at {}",
                        Ipv4Addr::from(next.start),
                        Ipv4Addr::from(prev.end)
                    )));
                }
            }
        }

        let count = u32::try_from(self.entries.len())
            .map_err(|_| Error::malformed("too many GeoIP ranges"))?;
        let mut buf = BytesMut::with_capacity(HEADER_LEN + self.entries.len() * ENTRY_LEN);
        buf.put_slice(MAGIC);
        buf.put_u32(count);
        for entry in &self.entries {
            buf.put_u32(entry.start);
            buf.put_u32(entry.end);
            buf.put_u16(entry.country.get());
        }

        tracing::debug!(
            "built GeoIP table: {} ranges, {} skipped",
            self.entries.len(),
            self.skipped
        );
        GeoIpTable::from_bytes(buf.freeze())
    }
}

/// First and last address of an IPv4 CIDR block.
pub(crate) fn parse_cidr(cidr: &str) -> Result<(Ipv4Addr, Ipv4Addr)> {
    let bad = || Error::malformed(format!("invalid IPv4 CIDR: {:?}", cidr));
    let (addr, prefix) = cidr.trim().split_once('/').ok_or_else(bad)?;
    let addr: Ipv4Addr = addr.parse().map_err(|_| bad())?;
    let prefix: u32 = prefix.parse().map_err(|_| bad())?;
    if prefix > 32 {
        return Err(bad());
    }

    let mask = u32::MAX.checked_shl(32 - prefix).unwrap_or(0);
    let start = u32::from(addr) & mask;
    Ok((Ipv4Addr::from(start), Ipv4Addr::from(start | !mask)))
}
