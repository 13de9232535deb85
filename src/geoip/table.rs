use std::net::Ipv4Addr;
use std::path::Path;

use bytes::Bytes;

use crate::error::{Error, Result};
use crate::geoip::{CountryCode, ENTRY_LEN, HEADER_LEN, MAGIC};
use crate::wire::Reader;

/// One `[start, end]` range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeoIpEntry {
    /// First address, as a host-order integer
    pub start: u32,
    /// Last address, inclusive
    pub end: u32,
    /// Country owning the range
    pub country: CountryCode,
}

impl GeoIpEntry {
    /// True if `ip` falls inside the range.
    pub fn contains(&self, ip: u32) -> bool {
        self.start <= ip && ip <= self.end
    }
}

/// Borrowed, header-checked view of a table.
#[derive(Debug, Clone, Copy)]
pub struct GeoIpView<'a> {
    entries: &'a [u8],
    count: usize,
}

impl<'a> GeoIpView<'a> {
    /// Check the magic and that `count` entries are present.
    pub fn parse(db: &'a [u8]) -> Result<Self> {
        let mut r = Reader::new(db);
        let magic: [u8; 4] = r.read_array()?;
        if &magic != MAGIC {
            return Err(Error::malformed("GeoIP table has bad magic"));
        }
        let count = r.read_u32()? as usize;
        let entries_len = count
            .checked_mul(ENTRY_LEN)
            .ok_or_else(|| Error::malformed(format!("GeoIP entry count {} overflows", count)))?;
        let entries = r.read_bytes(entries_len)?;
        Ok(Self { entries, count })
    }

    /// Number of ranges.
    pub fn len(&self) -> usize {
        self.count
    }

    /// True if the table has no ranges.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Entry at `index`, in table order.
    pub fn entry(&self, index: usize) -> Option<GeoIpEntry> {
        let at = index.checked_mul(ENTRY_LEN)?;
        let raw = self.entries.get(at..at.checked_add(ENTRY_LEN)?)?;
        let mut r = Reader::new(raw);
        Some(GeoIpEntry {
            start: r.read_u32().ok()?,
            end: r.read_u32().ok()?,
            country: CountryCode::from_u16(r.read_u16().ok()?),
        })
    }

    /// All entries, in table order.
    pub fn iter(&self) -> impl Iterator<Item = GeoIpEntry> + 'a {
        let view = *self;
        (0..self.count).filter_map(move |i| view.entry(i))
    }

    /// Country of the range covering `ip`.
    pub fn lookup(&self, ip: Ipv4Addr) -> Option<CountryCode> {
        let ip = u32::from(ip);

        // Lower bound: `lo` ends as the number of entries with start <= ip
        let (mut lo, mut hi) = (0usize, self.count);
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            if self.entry(mid)?.start <= ip {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }

        let best = self.entry(lo.checked_sub(1)?)?;
        best.contains(ip).then_some(best.country)
    }
}

/// Owned, validated table, shareable across threads.
///
/// Cloning is cheap: the blob is reference-counted.
#[derive(Debug, Clone)]
pub struct GeoIpTable {
    data: Bytes,
    count: usize,
}

impl GeoIpTable {
    /// Validate a table held in memory.
    pub fn from_bytes(data: impl Into<Bytes>) -> Result<Self> {
        let data = data.into();
        let count = GeoIpView::parse(&data)?.len();
        Ok(Self { data, count })
    }

    /// Read and validate a table file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path)?;
        let table = Self::from_bytes(data)?;
        tracing::info!("loaded GeoIP table {} ({} ranges)", path.display(), table.len());
        Ok(table)
    }

    /// Borrow the table as a [`GeoIpView`].
    pub fn view(&self) -> GeoIpView<'_> {
        GeoIpView {
            entries: &self.data[HEADER_LEN..HEADER_LEN + self.count * ENTRY_LEN],
            count: self.count,
        }
    }

    /// Number of ranges.
    pub fn len(&self) -> usize {
        self.count
    }

    /// True if the table has no ranges.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Encoded table, as written by [`GeoIpTableBuilder`](crate::geoip::GeoIpTableBuilder).
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Country of the range covering `ip`.
    pub fn lookup(&self, ip: Ipv4Addr) -> Option<CountryCode> {
        let found = self.view().lookup(ip);
        tracing::trace!("GeoIP {} -> {:?}", ip, found);
        found
    }

    /// Like [`lookup`](Self::lookup), with no covering range as
    /// [`Error::NotFound`].
    pub fn try_lookup(&self, ip: Ipv4Addr) -> Result<CountryCode> {
        self.lookup(ip).ok_or(Error::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(entries: &[(u32, u32, &str)]) -> Vec<u8> {
        let mut db = MAGIC.to_vec();
        db.extend_from_slice(&(entries.len() as u32).to_be_bytes());
        for (start, end, cc) in entries {
            db.extend_from_slice(&start.to_be_bytes());
            db.extend_from_slice(&end.to_be_bytes());
            db.extend_from_slice(cc.as_bytes());
        }
        db
    }

    #[test]
    fn test_view_entries() {
        let db = table(&[(1, 10, "AA"), (11, 20, "BB")]);
        let view = GeoIpView::parse(&db).unwrap();
        assert_eq!(view.len(), 2);
        assert_eq!(
            view.entry(1),
            Some(GeoIpEntry {
                start: 11,
                end: 20,
                country: CountryCode::from_letters("BB").unwrap(),
            })
        );
        assert_eq!(view.entry(2), None);
        assert_eq!(view.iter().count(), 2);
    }

    #[test]
    fn test_empty_table() {
        let db = table(&[]);
        let t = GeoIpTable::from_bytes(db).unwrap();
        assert!(t.is_empty());
        assert_eq!(t.lookup(Ipv4Addr::new(1, 2, 3, 4)), None);
    }

    #[test]
    fn test_from_bytes_errors() {
        assert!(matches!(
            GeoIpTable::from_bytes(b"GEO2\0\0\0\0".to_vec()),
            Err(Error::Malformed(_))
        ));
        let mut db = table(&[(1, 2, "AA")]);
        db.pop();
        assert!(matches!(
            GeoIpTable::from_bytes(db),
            Err(Error::InsufficientData { .. })
        ));
    }

    #[test]
    fn test_table_lookup() {
        let t = GeoIpTable::from_bytes(table(&[
            (0x0100_0000, 0x01ff_ffff, "CN"),
            (0x0500_0000, 0x05ff_ffff, "RU"),
        ]))
        .unwrap();
        assert_eq!(
            t.lookup(Ipv4Addr::new(1, 2, 3, 4)).map(|c| c.to_string()),
            Some("CN".to_string())
        );
        assert_eq!(t.lookup(Ipv4Addr::new(3, 0, 0, 0)), None);
        assert_eq!(
            t.lookup(Ipv4Addr::new(5, 255, 255, 255)).map(|c| c.to_string()),
            Some("RU".to_string())
        );
        assert_eq!(t.lookup(Ipv4Addr::new(0, 255, 255, 255)), None);

        assert!(t.try_lookup(Ipv4Addr::new(3, 0, 0, 0)).unwrap_err().is_not_found());
        assert_eq!(t.try_lookup(Ipv4Addr::new(1, 0, 0, 0)).unwrap().get(), 0x434e);
    }

    #[test]
    fn test_load_missing_file() {
        let err = GeoIpTable::load("/nonexistent/geoip.dat").unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
