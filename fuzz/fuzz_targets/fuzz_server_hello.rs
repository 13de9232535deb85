#![no_main]

use libfuzzer_sys::fuzz_target;
use reality_core::tls::server_hello::HELLO_RETRY_REQUEST_RANDOM;
use reality_core::tls::{self, Records};

fuzz_target!(|data: &[u8]| {
    if let Ok(hello) = tls::parse_server_hello(data) {
        assert_ne!(hello.random, HELLO_RETRY_REQUEST_RANDOM);
    }

    for record in Records::new(data) {
        let _ = tls::parse_server_hello(record.body);
    }
});
