#![no_main]

use std::net::Ipv4Addr;

use libfuzzer_sys::fuzz_target;
use reality_core::geoip::{self, GeoIpTable};

fuzz_target!(|data: &[u8]| {
    let _ = geoip::lookup(data, "1.2.3.4");
    let _ = geoip::lookup(data, "255.255.255.255");

    if let Ok(table) = GeoIpTable::from_bytes(data.to_vec()) {
        let _ = table.lookup(Ipv4Addr::UNSPECIFIED);
        let _ = table.lookup(Ipv4Addr::new(10, 0, 0, 1));
        assert_eq!(table.view().iter().count(), table.len());
    }
});
