#![no_main]

use libfuzzer_sys::fuzz_target;
use reality_core::tls::{self, Records};

fuzz_target!(|data: &[u8]| {
    if let Ok(header) = tls::parse_record_header(data) {
        assert_eq!(header.total_len(), 5 + header.length as usize);
    }

    let mut records = Records::new(data);
    for record in records.by_ref() {
        let _ = tls::unwrap_inner_plaintext(record.body);
    }
    assert!(records.remainder().len() <= data.len());

    if let Ok((content_len, content_type)) = tls::unwrap_inner_plaintext(data) {
        assert!(content_len < data.len());
        assert_ne!(content_type, 0);
    }

    if let Ok((payload, consumed)) = tls::deframe_udp_payload(data) {
        assert_eq!(consumed, payload.len() + 2);
    }
});
