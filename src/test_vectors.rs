//! Synthetic handshake shared by unit tests.
//!
//! The message 2 frame below carries a MIC computed for `PASSPHRASE` on
//! `SSID` with the addresses and nonces listed here.

use crate::bytes::Bytes;
use crate::handshake::{CipherDescriptor, HandshakeParts, KeyTestParameters};

pub const PASSPHRASE: &str = "10zZz10ZZzZ";
pub const SSID: &str = "Netgear 2/158";
pub const BSSID: &str = "00:1E:2A:E0:BD:D0";
pub const CLIENT_MAC: &str = "CC:08:E0:62:0B:C8";
pub const ANONCE: &str = "61c9a3f5cdcdf5fae5fd760836b8008c863aa2317022c7a202434554fb38452b";
pub const SNONCE: &str = "60eff10088077f8b03a0e2fc2fc37e1fe1f30f9f7cfbcfb2826f26f3379c4318";
pub const M2_MIC: &str = "290b1f3a19e12a53c925f01b3d8aeba0";
pub const M2_FRAME: &str = "08013a01001e2ae0bdd0cc08e0620bc8001e2ae0bdd00000aaaa03000000888e00000103007502010a0010000000000000000160eff10088077f8b03a0e2fc2fc37e1fe1f30f9f7cfbcfb2826f26f3379c43180000000000000000000000000000000000000000000000000000000000000000290b1f3a19e12a53c925f01b3d8aeba0001630140100000fac040100000fac040100000fac020c00deadbeef";

pub fn bytes(hex: &str) -> Bytes {
    Bytes::from_hex(hex).unwrap()
}

pub fn parts() -> HandshakeParts {
    HandshakeParts {
        ssid: SSID.to_string(),
        bssid: bytes(BSSID),
        client_mac: bytes(CLIENT_MAC),
        anonce: bytes(ANONCE),
        snonce: bytes(SNONCE),
        cipher: CipherDescriptor::Ccmp,
        m2_frame: bytes(M2_FRAME),
        m2_mic: bytes(M2_MIC),
        m3_mic: None,
        m4_mic: None,
        m2_key_data: None,
        m3_key_data: None,
    }
}

pub fn key_test_parameters() -> KeyTestParameters {
    KeyTestParameters::new(parts()).unwrap()
}
