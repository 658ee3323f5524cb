/*!
 * WPA2 key derivation and MIC verification
 *
 * Implements the HMAC-SHA1 path of IEEE 802.11i:
 * - PMK (Pairwise Master Key) derivation using PBKDF2-HMAC-SHA1
 * - PTK (Pairwise Transient Key) expansion using the 802.11i PRF
 * - MIC (Message Integrity Code) over the EAPOL-Key body of message 2
 *
 * References:
 * - IEEE 802.11i-2004 standard
 * - RFC 2898 (PBKDF2)
 */

use hmac::{Hmac, Mac};
use pbkdf2::pbkdf2_hmac;
use sha1::Sha1;

use crate::bytes::compare_slices;
use crate::error::{Error, Result};
use crate::handshake::KeyTestParameters;

type HmacSha1 = Hmac<Sha1>;

pub const PBKDF2_ITERATIONS: u32 = 4096;
pub const PMK_LEN: usize = 32;
pub const PTK_LEN: usize = 80;
pub const KCK_LEN: usize = 16;
pub const MIC_LEN: usize = 16;
pub const MAC_LEN: usize = 6;
pub const NONCE_LEN: usize = 32;

/// Offset of the MIC field inside the EAPOL-Key body
pub const EAPOL_MIC_OFFSET: usize = 81;
/// First byte after the MIC field
pub const EAPOL_MIC_END: usize = EAPOL_MIC_OFFSET + MIC_LEN;

const SHA1_LEN: usize = 20;

/// "Pairwise key expansion" followed by its NUL terminator (23 bytes)
const PRF_LABEL: &[u8] = b"Pairwise key expansion\0";
const EXPANSION_LEN: usize = 100;
const MACS_OFFSET: usize = 23;
const NONCES_OFFSET: usize = MACS_OFFSET + 2 * MAC_LEN;
const COUNTER_OFFSET: usize = NONCES_OFFSET + 2 * NONCE_LEN;

/// Calculate PMK (Pairwise Master Key) from passphrase and SSID
///
/// PMK = PBKDF2(HMAC-SHA1, passphrase, SSID, 4096 iterations, 256 bits)
///
/// This is the expensive step of every candidate test.
#[inline]
pub fn derive_pmk(passphrase: &str, ssid: &str) -> [u8; PMK_LEN] {
    let mut pmk = [0u8; PMK_LEN];
    pbkdf2_hmac::<Sha1>(passphrase.as_bytes(), ssid.as_bytes(), PBKDF2_ITERATIONS, &mut pmk);
    pmk
}

/// Calculate the 80-byte PTK from addresses, nonces and PMK
///
/// Lengths are checked here; a wrong-sized buffer yields `Error::InvalidKeyMaterial`.
/// The addresses and nonces are placed in ascending order, so the argument
/// order of `client_mac`/`bssid` and `anonce`/`snonce` does not matter.
pub fn derive_ptk(
    client_mac: &[u8],
    bssid: &[u8],
    anonce: &[u8],
    snonce: &[u8],
    pmk: &[u8],
) -> Result<[u8; PTK_LEN]> {
    Ok(expand_ptk(
        fixed("client MAC", client_mac)?,
        fixed("BSSID", bssid)?,
        fixed("ANonce", anonce)?,
        fixed("SNonce", snonce)?,
        fixed("PMK", pmk)?,
    ))
}

/// Calculate the MIC of an EAPOL-Key body under the KCK of `ptk`
///
/// The 16-byte MIC window at offset 81 is zeroed before hashing; only the
/// first 16 bytes of the HMAC-SHA1 digest are returned.
pub fn compute_mic(ptk: &[u8], eapol: &[u8]) -> Result<[u8; MIC_LEN]> {
    let ptk: &[u8; PTK_LEN] = fixed("PTK", ptk)?;
    if eapol.len() < EAPOL_MIC_END {
        return Err(Error::MalformedHandshake(format!(
            "EAPOL body of {} bytes cannot hold a MIC at offset {}",
            eapol.len(),
            EAPOL_MIC_OFFSET
        )));
    }
    Ok(mic_with_kck(&ptk[..KCK_LEN], eapol))
}

/// Test one passphrase against a reconstructed handshake
///
/// Derives PMK and PTK, recomputes the MIC of message 2 and compares it with
/// the captured one. Pure: identical inputs always give identical answers.
#[inline]
pub fn test_passphrase(passphrase: &str, params: &KeyTestParameters) -> bool {
    let pmk = derive_pmk(passphrase, params.ssid());
    let ptk = expand_ptk(
        params.client_mac(),
        params.bssid(),
        params.anonce(),
        params.snonce(),
        &pmk,
    );
    let mic = mic_with_kck(&ptk[..KCK_LEN], params.eapol_body());
    constant_time_eq(&mic, params.m2_mic())
}

fn expand_ptk(
    client_mac: &[u8; MAC_LEN],
    bssid: &[u8; MAC_LEN],
    anonce: &[u8; NONCE_LEN],
    snonce: &[u8; NONCE_LEN],
    pmk: &[u8; PMK_LEN],
) -> [u8; PTK_LEN] {
    let mut buffer = [0u8; EXPANSION_LEN];
    buffer[..MACS_OFFSET].copy_from_slice(PRF_LABEL);

    // min(AA, SPA) || max(AA, SPA)
    let (low_mac, high_mac) = ascending(client_mac, bssid);
    buffer[MACS_OFFSET..MACS_OFFSET + MAC_LEN].copy_from_slice(low_mac);
    buffer[MACS_OFFSET + MAC_LEN..NONCES_OFFSET].copy_from_slice(high_mac);

    // min(ANonce, SNonce) || max(ANonce, SNonce)
    let (low_nonce, high_nonce) = ascending(snonce, anonce);
    buffer[NONCES_OFFSET..NONCES_OFFSET + NONCE_LEN].copy_from_slice(low_nonce);
    buffer[NONCES_OFFSET + NONCE_LEN..COUNTER_OFFSET].copy_from_slice(high_nonce);

    let mut ptk = [0u8; PTK_LEN];
    for (counter, block) in ptk.chunks_exact_mut(SHA1_LEN).enumerate() {
        buffer[COUNTER_OFFSET] = counter as u8;
        block.copy_from_slice(&hmac_sha1(pmk, &buffer));
    }
    ptk
}

/// Caller guarantees `eapol.len() >= EAPOL_MIC_END`
fn mic_with_kck(kck: &[u8], eapol: &[u8]) -> [u8; MIC_LEN] {
    let mut cleared = eapol.to_vec();
    cleared[EAPOL_MIC_OFFSET..EAPOL_MIC_END].fill(0);

    let digest = hmac_sha1(kck, &cleared);
    let mut mic = [0u8; MIC_LEN];
    mic.copy_from_slice(&digest[..MIC_LEN]);
    mic
}

fn hmac_sha1(key: &[u8], data: &[u8]) -> [u8; SHA1_LEN] {
    let mut mac = HmacSha1::new_from_slice(key).expect("HMAC can take key of any size");
    mac.update(data);
    let hash = mac.finalize().into_bytes();

    let mut out = [0u8; SHA1_LEN];
    out.copy_from_slice(&hash);
    out
}

fn ascending<'a>(a: &'a [u8], b: &'a [u8]) -> (&'a [u8], &'a [u8]) {
    if compare_slices(a, b).is_lt() {
        (a, b)
    } else {
        (b, a)
    }
}

pub(crate) fn fixed<'a, const N: usize>(what: &'static str, bytes: &'a [u8]) -> Result<&'a [u8; N]> {
    bytes.try_into().map_err(|_| Error::InvalidKeyMaterial {
        what,
        expected: N,
        actual: bytes.len(),
    })
}

#[inline(always)]
fn constant_time_eq(a: &[u8; MIC_LEN], b: &[u8; MIC_LEN]) -> bool {
    let mut diff = 0u8;
    for i in 0..MIC_LEN {
        diff |= a[i] ^ b[i];
    }
    diff == 0
}
