#![no_main]

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use libfuzzer_sys::fuzz_target;
use reality_core::dns::{self, TYPE_A, TYPE_AAAA};

fuzz_target!(|data: &[u8]| {
    let _ = dns::parse_query(data, dns::MAX_DOMAIN_LEN);
    let _ = dns::parse_query(data, 16);

    let v4 = Some(IpAddr::V4(Ipv4Addr::new(198, 18, 0, 1)));
    let v6 = Some(IpAddr::V6(Ipv6Addr::LOCALHOST));
    for (fake, qtype) in [(v4, TYPE_A), (v6, TYPE_AAAA), (v4, TYPE_AAAA), (None, 15)] {
        if let Ok(response) = dns::generate_response(data, fake, qtype) {
            assert_eq!(response.len(), dns::response_len(data, fake, qtype).unwrap());
            assert_eq!(&response[..2], &data[..2]);
        }
    }

    let mut small = [0u8; 64];
    let _ = dns::generate_response_into(data, v4, TYPE_A, &mut small);
});
