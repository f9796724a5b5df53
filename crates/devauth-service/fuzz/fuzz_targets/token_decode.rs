#![no_main]

use devauth_service::crypto::TokenCodec;
use libfuzzer_sys::fuzz_target;
use std::sync::OnceLock;

// Fixed seed so crashes reproduce across runs
const SEED: [u8; 32] = [7u8; 32];

static CODEC: OnceLock<Option<TokenCodec>> = OnceLock::new();

fn codec() -> Option<&'static TokenCodec> {
    CODEC
        .get_or_init(|| {
            // PKCS#8 v1 wrapping of an Ed25519 seed (RFC 8410)
            let mut pkcs8 = vec![
                0x30, 0x2e, 0x02, 0x01, 0x00, 0x30, 0x05, 0x06, 0x03, 0x2b, 0x65, 0x70, 0x04,
                0x22, 0x04, 0x20,
            ];
            pkcs8.extend_from_slice(&SEED);
            TokenCodec::new(&pkcs8, "fuzz-key", "device-auth").ok()
        })
        .as_ref()
}

fuzz_target!(|data: &[u8]| {
    let Some(codec) = codec() else {
        return;
    };

    // Arbitrary input must be refused or accepted, never panic
    if let Ok(raw) = std::str::from_utf8(data) {
        let _ = codec.decode(raw);
    }
});
