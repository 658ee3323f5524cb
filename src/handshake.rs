/*!
 * WPA/WPA2 4-way handshake reconstruction
 *
 * Captured EAPOL-Key frames are classified into handshake messages from
 * their key information flags, grouped per access point (BSSID), and later
 * paired into M1/M2/M3(/M4) exchanges. Each usable exchange yields a
 * `KeyTestParameters` bundle: everything needed to test a passphrase offline.
 */

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::{debug, warn};

use crate::bytes::Bytes;
use crate::crypto::{fixed, EAPOL_MIC_END, MAC_LEN, MIC_LEN, NONCE_LEN};
use crate::error::{Error, Result};

/// 802.11 QoS data header + LLC/SNAP + EAPOL header in front of the key descriptor body
pub const M2_FRAME_PREFIX_LEN: usize = 34;
/// Frame check sequence at the end of a captured frame
pub const FCS_LEN: usize = 4;
/// Smallest message 2 frame whose EAPOL body still contains the MIC window
pub const MIN_M2_FRAME_LEN: usize = M2_FRAME_PREFIX_LEN + EAPOL_MIC_END + FCS_LEN;

// Key information bits used for message classification
const KEY_ACK: u16 = 0x0080;
const KEY_MIC: u16 = 0x0100;
const ENCRYPTED_KEY_DATA: u16 = 0x1000;
const INSTALL_KEY_TYPE: u16 = 0x0300;
const DESCRIPTOR_VERSION: u16 = 0x0007;

/// Role of an EAPOL-Key frame in the 4-way handshake
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageRole {
    M1,
    M2,
    M3,
    M4,
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MessageRole::M1 => "M1",
            MessageRole::M2 => "M2",
            MessageRole::M3 => "M3",
            MessageRole::M4 => "M4",
        };
        f.write_str(name)
    }
}

/// Key descriptor version (low 3 bits of the key information field)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CipherDescriptor {
    Wep,
    Ccmp,
    Gcmp,
    Tkip,
    Unrecognized(u8),
}

impl CipherDescriptor {
    pub fn from_version(version: u8) -> Self {
        match version {
            1 => CipherDescriptor::Wep,
            2 => CipherDescriptor::Ccmp,
            3 => CipherDescriptor::Gcmp,
            4 => CipherDescriptor::Tkip,
            other => CipherDescriptor::Unrecognized(other),
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            CipherDescriptor::Wep => "WEP (Wired Equivalent Privacy) with CRC32 checksum (deprecated)",
            CipherDescriptor::Ccmp => "AES (CCMP) with HMAC-SHA1 MIC (WPA2)",
            CipherDescriptor::Gcmp => "AES (GCM) for encryption and integrity (WPA3)",
            CipherDescriptor::Tkip => "TKIP (Temporal Key Integrity Protocol) with MIC (WPA)",
            CipherDescriptor::Unrecognized(_) => "invalid key descriptor version",
        }
    }
}

impl fmt::Display for CipherDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CipherDescriptor::Wep => write!(f, "1:{}", self.description()),
            CipherDescriptor::Ccmp => write!(f, "2:{}", self.description()),
            CipherDescriptor::Gcmp => write!(f, "3:{}", self.description()),
            CipherDescriptor::Tkip => write!(f, "4:{}", self.description()),
            CipherDescriptor::Unrecognized(v) => write!(f, "{}:{}", v, self.description()),
        }
    }
}

/// 16-bit key information field of an EAPOL-Key frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyInfoFlags(u16);

impl KeyInfoFlags {
    pub fn new(bits: u16) -> Self {
        Self(bits)
    }

    pub fn bits(self) -> u16 {
        self.0
    }

    fn has(self, mask: u16) -> bool {
        self.0 & mask == mask
    }

    /// Classify the frame into a handshake message
    ///
    /// | ack | mic | encrypted | 0x0300 | role |
    /// |-----|-----|-----------|--------|------|
    /// |  1  |  0  |     0     |   0    |  M1  |
    /// |  0  |  1  |     0     |   0    |  M2  |
    /// |  1  |  1  |     1     |   1    |  M3  |
    /// |  0  |  1  |     0     |   1    |  M4  |
    ///
    /// Anything else is rejected with `Error::UnrecognizedKeyInfo`.
    pub fn message_role(self) -> Result<MessageRole> {
        match (
            self.has(KEY_ACK),
            self.has(KEY_MIC),
            self.has(ENCRYPTED_KEY_DATA),
            self.has(INSTALL_KEY_TYPE),
        ) {
            (true, false, false, false) => Ok(MessageRole::M1),
            (false, true, false, false) => Ok(MessageRole::M2),
            (true, true, true, true) => Ok(MessageRole::M3),
            (false, true, false, true) => Ok(MessageRole::M4),
            _ => Err(Error::UnrecognizedKeyInfo(self.0)),
        }
    }

    pub fn cipher(self) -> CipherDescriptor {
        CipherDescriptor::from_version((self.0 & DESCRIPTOR_VERSION) as u8)
    }
}

impl fmt::Display for KeyInfoFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04X}", self.0)
    }
}

// Serialized as a 4-digit hex string, e.g. "010A"
impl Serialize for KeyInfoFlags {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for KeyInfoFlags {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        let digits = text.trim_start_matches("0x").trim_start_matches("0X");
        u16::from_str_radix(digits, 16)
            .map(KeyInfoFlags)
            .map_err(|e| serde::de::Error::custom(format!("invalid key info '{}': {}", text, e)))
    }
}

/// One decoded EAPOL-Key frame as handed over by the frame source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyFrame {
    /// Capture order, strictly increasing over the capture
    pub sequence: u64,
    pub timestamp: DateTime<Utc>,
    pub bssid: Bytes,
    pub source: Bytes,
    pub destination: Bytes,
    pub key_info: KeyInfoFlags,
    pub nonce: Bytes,
    pub mic: Bytes,
    #[serde(default)]
    pub key_data: Bytes,
    /// Complete captured frame, needed to recompute the MIC of message 2
    pub frame: Bytes,
}

/// A classified key frame stored in a conversation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedKeyPacket {
    pub role: MessageRole,
    pub sequence: u64,
    pub timestamp: DateTime<Utc>,
    pub client_mac: Bytes,
    pub key_info: KeyInfoFlags,
    pub nonce: Bytes,
    pub mic: Bytes,
    pub key_data: Bytes,
    pub frame: Bytes,
}

/// Network announced by a beacon
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WifiNetwork {
    pub ssid: String,
    pub bssid: Bytes,
}

/// All key packets seen for one access point, in capture order
#[derive(Debug, Clone)]
pub struct HandshakeConversation {
    bssid: Bytes,
    ssid: Option<String>,
    packets: Vec<CapturedKeyPacket>,
}

impl HandshakeConversation {
    fn new(bssid: Bytes) -> Self {
        Self {
            bssid,
            ssid: None,
            packets: Vec::new(),
        }
    }

    pub fn bssid(&self) -> &Bytes {
        &self.bssid
    }

    pub fn ssid(&self) -> Option<&str> {
        self.ssid.as_deref()
    }

    pub fn packets(&self) -> &[CapturedKeyPacket] {
        &self.packets
    }

    /// Roles of the captured packets, e.g. `M1,M2,M3,M4`
    pub fn captured_messages(&self) -> String {
        self.packets
            .iter()
            .map(|p| p.role.to_string())
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Pair the captured messages into testable exchanges
    ///
    /// For every M2 and every later M3, the M1 is the most recent one before
    /// the M2 whose nonce equals the M3 nonce (the ANonce); pairs without such
    /// an M1 are skipped. The M4 is the first one after the M3 and is optional.
    /// Pairs whose message 2 frame is too short to carry a MIC are dropped.
    pub fn key_test_parameters(&self) -> Vec<KeyTestParameters> {
        let mut ordered: Vec<&CapturedKeyPacket> = self.packets.iter().collect();
        ordered.sort_by_key(|p| p.sequence);

        let mut result = Vec::new();
        for m2 in with_role(&ordered, MessageRole::M2) {
            for m3 in with_role(&ordered, MessageRole::M3).filter(|p| p.sequence > m2.sequence) {
                let m1 = with_role(&ordered, MessageRole::M1)
                    .filter(|p| p.sequence < m2.sequence && p.nonce == m3.nonce)
                    .last();
                let Some(m1) = m1 else {
                    debug!(
                        bssid = %self.bssid.mac_string(),
                        m2 = m2.sequence,
                        m3 = m3.sequence,
                        "no M1 with a matching ANonce before M2"
                    );
                    continue;
                };
                let m4 = with_role(&ordered, MessageRole::M4).find(|p| p.sequence > m3.sequence);

                let parts = HandshakeParts {
                    ssid: self.ssid.clone().unwrap_or_default(),
                    bssid: self.bssid.clone(),
                    client_mac: m2.client_mac.clone(),
                    anonce: m1.nonce.clone(),
                    snonce: m2.nonce.clone(),
                    cipher: m2.key_info.cipher(),
                    m2_frame: m2.frame.clone(),
                    m2_mic: m2.mic.clone(),
                    m3_mic: Some(m3.mic.clone()),
                    m4_mic: m4.map(|p| p.mic.clone()),
                    m2_key_data: Some(m2.key_data.clone()),
                    m3_key_data: Some(m3.key_data.clone()),
                };

                match KeyTestParameters::new(parts) {
                    Ok(params) => result.push(params),
                    Err(e) => warn!(
                        bssid = %self.bssid.mac_string(),
                        m2 = m2.sequence,
                        m3 = m3.sequence,
                        "dropping handshake pair: {}",
                        e
                    ),
                }
            }
        }
        result
    }
}

fn with_role<'a>(
    packets: &'a [&'a CapturedKeyPacket],
    role: MessageRole,
) -> impl Iterator<Item = &'a CapturedKeyPacket> + 'a {
    packets.iter().copied().filter(move |p| p.role == role)
}

/// Everything observed in one capture: beacons and per-AP conversations
#[derive(Debug, Clone, Default)]
pub struct CaptureSummary {
    conversations: Vec<HandshakeConversation>,
    by_bssid: HashMap<Bytes, usize>,
    networks: Vec<WifiNetwork>,
}

impl CaptureSummary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an (SSID, BSSID) pair from a beacon
    ///
    /// Empty SSIDs and SSIDs containing a backslash are ignored; returns
    /// whether the network was recorded.
    pub fn observe_beacon(&mut self, bssid: Bytes, ssid: &str) -> bool {
        if ssid.is_empty() || ssid.contains('\\') {
            return false;
        }
        let network = WifiNetwork {
            ssid: ssid.to_string(),
            bssid,
        };
        if !self.networks.contains(&network) {
            self.networks.push(network);
        }
        true
    }

    /// Classify a key frame and append it to its access point's conversation
    ///
    /// Frames whose flags match no handshake message are rejected with
    /// `Error::UnrecognizedKeyInfo` and leave the summary untouched.
    pub fn observe_key_frame(&mut self, frame: KeyFrame) -> Result<MessageRole> {
        let role = frame.key_info.message_role()?;

        // M1 and M3 travel AP -> client, M2 and M4 client -> AP
        let client_mac = match role {
            MessageRole::M1 | MessageRole::M3 => frame.destination,
            MessageRole::M2 | MessageRole::M4 => frame.source,
        };

        let index = match self.by_bssid.get(&frame.bssid) {
            Some(index) => *index,
            None => {
                self.conversations
                    .push(HandshakeConversation::new(frame.bssid.clone()));
                self.by_bssid
                    .insert(frame.bssid.clone(), self.conversations.len() - 1);
                self.conversations.len() - 1
            }
        };

        let conversation = &mut self.conversations[index];
        if conversation.ssid.is_none() {
            conversation.ssid = self
                .networks
                .iter()
                .find(|n| n.bssid == conversation.bssid)
                .map(|n| n.ssid.clone());
        }

        debug!(
            bssid = %frame.bssid.mac_string(),
            client = %client_mac.mac_string(),
            sequence = frame.sequence,
            "captured {}",
            role
        );

        conversation.packets.push(CapturedKeyPacket {
            role,
            sequence: frame.sequence,
            timestamp: frame.timestamp,
            client_mac,
            key_info: frame.key_info,
            nonce: frame.nonce,
            mic: frame.mic,
            key_data: frame.key_data,
            frame: frame.frame,
        });
        Ok(role)
    }

    /// Conversations in order of first appearance
    pub fn conversations(&self) -> &[HandshakeConversation] {
        &self.conversations
    }

    pub fn conversation(&self, bssid: &Bytes) -> Option<&HandshakeConversation> {
        self.by_bssid.get(bssid).map(|i| &self.conversations[*i])
    }

    pub fn networks(&self) -> &[WifiNetwork] {
        &self.networks
    }

    /// Key test parameters of every conversation, conversations in order of first appearance
    pub fn reconstruct_key_test_parameters(&self) -> Vec<KeyTestParameters> {
        self.conversations
            .iter()
            .flat_map(|c| c.key_test_parameters())
            .collect()
    }
}

/// Unvalidated fields of a handshake, as collected from captured packets
#[derive(Debug, Clone)]
pub struct HandshakeParts {
    pub ssid: String,
    pub bssid: Bytes,
    pub client_mac: Bytes,
    pub anonce: Bytes,
    pub snonce: Bytes,
    pub cipher: CipherDescriptor,
    /// Complete captured message 2 frame, prefix and FCS included
    pub m2_frame: Bytes,
    pub m2_mic: Bytes,
    pub m3_mic: Option<Bytes>,
    pub m4_mic: Option<Bytes>,
    pub m2_key_data: Option<Bytes>,
    pub m3_key_data: Option<Bytes>,
}

/// Minimal, validated parameter set to test a passphrase against one handshake
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyTestParameters {
    ssid: String,
    bssid: [u8; MAC_LEN],
    client_mac: [u8; MAC_LEN],
    anonce: [u8; NONCE_LEN],
    snonce: [u8; NONCE_LEN],
    cipher: CipherDescriptor,
    m2_frame: Bytes,
    m2_mic: [u8; MIC_LEN],
    m3_mic: Option<Bytes>,
    m4_mic: Option<Bytes>,
    m2_key_data: Option<Bytes>,
    m3_key_data: Option<Bytes>,
}

impl KeyTestParameters {
    /// Validate the collected parts
    ///
    /// Fails with `Error::MalformedHandshake` when the message 2 frame is too
    /// short for the fixed-offset EAPOL body, and with
    /// `Error::InvalidKeyMaterial` when an address, nonce or MIC has the wrong size.
    pub fn new(parts: HandshakeParts) -> Result<Self> {
        if parts.m2_frame.len() < MIN_M2_FRAME_LEN {
            return Err(Error::MalformedHandshake(format!(
                "message 2 frame has {} bytes, at least {} are needed",
                parts.m2_frame.len(),
                MIN_M2_FRAME_LEN
            )));
        }

        Ok(Self {
            bssid: *fixed("BSSID", parts.bssid.as_slice())?,
            client_mac: *fixed("client MAC", parts.client_mac.as_slice())?,
            anonce: *fixed("ANonce", parts.anonce.as_slice())?,
            snonce: *fixed("SNonce", parts.snonce.as_slice())?,
            m2_mic: *fixed("M2 MIC", parts.m2_mic.as_slice())?,
            ssid: parts.ssid,
            cipher: parts.cipher,
            m2_frame: parts.m2_frame,
            m3_mic: parts.m3_mic,
            m4_mic: parts.m4_mic,
            m2_key_data: parts.m2_key_data,
            m3_key_data: parts.m3_key_data,
        })
    }

    pub fn ssid(&self) -> &str {
        &self.ssid
    }

    pub fn bssid(&self) -> &[u8; MAC_LEN] {
        &self.bssid
    }

    pub fn client_mac(&self) -> &[u8; MAC_LEN] {
        &self.client_mac
    }

    pub fn anonce(&self) -> &[u8; NONCE_LEN] {
        &self.anonce
    }

    pub fn snonce(&self) -> &[u8; NONCE_LEN] {
        &self.snonce
    }

    pub fn cipher(&self) -> CipherDescriptor {
        self.cipher
    }

    pub fn m2_frame(&self) -> &Bytes {
        &self.m2_frame
    }

    pub fn m2_mic(&self) -> &[u8; MIC_LEN] {
        &self.m2_mic
    }

    pub fn m3_mic(&self) -> Option<&Bytes> {
        self.m3_mic.as_ref()
    }

    pub fn m4_mic(&self) -> Option<&Bytes> {
        self.m4_mic.as_ref()
    }

    pub fn m2_key_data(&self) -> Option<&Bytes> {
        self.m2_key_data.as_ref()
    }

    pub fn m3_key_data(&self) -> Option<&Bytes> {
        self.m3_key_data.as_ref()
    }

    /// EAPOL-Key body of message 2: the frame without its 34-byte prefix and 4-byte FCS
    pub fn eapol_body(&self) -> &[u8] {
        let raw = self.m2_frame.as_slice();
        &raw[M2_FRAME_PREFIX_LEN..raw.len() - FCS_LEN]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_vectors::{self, bytes};

    const M1_FLAGS: u16 = 0x008A;
    const M2_FLAGS: u16 = 0x010A;
    const M3_FLAGS: u16 = 0x13CA;
    const M4_FLAGS: u16 = 0x030A;

    fn frame(sequence: u64, flags: u16, nonce: &str, mic: Bytes, raw: Bytes) -> KeyFrame {
        let ap = bytes(test_vectors::BSSID);
        let client = bytes(test_vectors::CLIENT_MAC);
        let from_ap = matches!(flags, M1_FLAGS | M3_FLAGS);
        KeyFrame {
            sequence,
            timestamp: DateTime::<Utc>::from_timestamp(1_700_000_000 + sequence as i64, 0).unwrap(),
            bssid: ap.clone(),
            source: if from_ap { ap.clone() } else { client.clone() },
            destination: if from_ap { client } else { ap },
            key_info: KeyInfoFlags::new(flags),
            nonce: bytes(nonce),
            mic,
            key_data: Bytes::empty(),
            frame: raw,
        }
    }

    fn m1(sequence: u64, anonce: &str) -> KeyFrame {
        frame(sequence, M1_FLAGS, anonce, Bytes::new([0u8; 16]), Bytes::new([1u8; 99]))
    }

    fn m2(sequence: u64) -> KeyFrame {
        frame(
            sequence,
            M2_FLAGS,
            test_vectors::SNONCE,
            bytes(test_vectors::M2_MIC),
            bytes(test_vectors::M2_FRAME),
        )
    }

    fn m3(sequence: u64, anonce: &str, mic_byte: u8) -> KeyFrame {
        frame(sequence, M3_FLAGS, anonce, Bytes::new([mic_byte; 16]), Bytes::new([3u8; 155]))
    }

    fn m4(sequence: u64, mic_byte: u8) -> KeyFrame {
        frame(sequence, M4_FLAGS, &"00".repeat(32), Bytes::new([mic_byte; 16]), Bytes::new([4u8; 133]))
    }

    fn summary_of(frames: Vec<KeyFrame>) -> CaptureSummary {
        let mut summary = CaptureSummary::new();
        summary.observe_beacon(bytes(test_vectors::BSSID), test_vectors::SSID);
        for f in frames {
            summary.observe_key_frame(f).unwrap();
        }
        summary
    }

    #[test]
    fn test_message_classification() {
        assert_eq!(KeyInfoFlags::new(M1_FLAGS).message_role().unwrap(), MessageRole::M1);
        assert_eq!(KeyInfoFlags::new(M2_FLAGS).message_role().unwrap(), MessageRole::M2);
        assert_eq!(KeyInfoFlags::new(M3_FLAGS).message_role().unwrap(), MessageRole::M3);
        assert_eq!(KeyInfoFlags::new(M4_FLAGS).message_role().unwrap(), MessageRole::M4);
        // Only the bits of interest matter
        assert_eq!(KeyInfoFlags::new(0x0080).message_role().unwrap(), MessageRole::M1);
        assert_eq!(KeyInfoFlags::new(0x0300).message_role().unwrap(), MessageRole::M4);
    }

    #[test]
    fn test_unmatched_flags_are_rejected() {
        // ack + mic without encrypted data and install
        assert!(matches!(
            KeyInfoFlags::new(0x0180).message_role(),
            Err(Error::UnrecognizedKeyInfo(0x0180))
        ));
        // nothing set
        assert!(KeyInfoFlags::new(0x0002).message_role().is_err());
        // M3 without the install/key-type pair
        assert!(KeyInfoFlags::new(0x11CA).message_role().is_err());
    }

    #[test]
    fn test_cipher_descriptor() {
        assert_eq!(KeyInfoFlags::new(0x0089).cipher(), CipherDescriptor::Wep);
        assert_eq!(KeyInfoFlags::new(M2_FLAGS).cipher(), CipherDescriptor::Ccmp);
        assert_eq!(KeyInfoFlags::new(0x008B).cipher(), CipherDescriptor::Gcmp);
        assert_eq!(KeyInfoFlags::new(0x008C).cipher(), CipherDescriptor::Tkip);
        assert_eq!(KeyInfoFlags::new(0x008F).cipher(), CipherDescriptor::Unrecognized(7));
        assert!(CipherDescriptor::Ccmp.to_string().starts_with("2:AES (CCMP)"));
    }

    #[test]
    fn test_key_info_serde_hex() {
        let flags: KeyInfoFlags = serde_json::from_str("\"13CA\"").unwrap();
        assert_eq!(flags.bits(), M3_FLAGS);
        assert_eq!(serde_json::to_string(&KeyInfoFlags::new(0x008A)).unwrap(), "\"008A\"");
        assert!(serde_json::from_str::<KeyInfoFlags>("\"XYZ\"").is_err());
    }

    #[test]
    fn test_client_mac_follows_direction() {
        let summary = summary_of(vec![m1(1, test_vectors::ANONCE), m2(2)]);
        let conversation = &summary.conversations()[0];
        let client = bytes(test_vectors::CLIENT_MAC);
        assert!(conversation.packets().iter().all(|p| p.client_mac == client));
        assert_eq!(conversation.ssid(), Some(test_vectors::SSID));
        assert_eq!(conversation.captured_messages(), "M1,M2");
    }

    #[test]
    fn test_ssid_resolved_lazily() {
        let mut summary = CaptureSummary::new();
        summary.observe_key_frame(m1(1, test_vectors::ANONCE)).unwrap();
        let bssid = bytes(test_vectors::BSSID);
        assert_eq!(summary.conversation(&bssid).unwrap().ssid(), None);

        summary.observe_beacon(bssid.clone(), test_vectors::SSID);
        summary.observe_key_frame(m2(2)).unwrap();
        assert_eq!(summary.conversation(&bssid).unwrap().ssid(), Some(test_vectors::SSID));
    }

    #[test]
    fn test_beacon_filtering() {
        let mut summary = CaptureSummary::new();
        assert!(!summary.observe_beacon(bytes(test_vectors::BSSID), ""));
        assert!(!summary.observe_beacon(bytes(test_vectors::BSSID), "bad\\ssid"));
        assert!(summary.observe_beacon(bytes(test_vectors::BSSID), "Home"));
        assert_eq!(summary.networks().len(), 1);
    }

    #[test]
    fn test_invalid_frame_leaves_summary_untouched() {
        let mut summary = CaptureSummary::new();
        let mut bad = m2(1);
        bad.key_info = KeyInfoFlags::new(0x0180);
        assert!(summary.observe_key_frame(bad).is_err());
        assert!(summary.conversations().is_empty());

        summary.observe_key_frame(m2(2)).unwrap();
        assert_eq!(summary.conversations()[0].packets().len(), 1);
    }

    #[test]
    fn test_full_exchange_with_and_without_m4() {
        let anonce = test_vectors::ANONCE;
        let with_m4 = summary_of(vec![m1(1, anonce), m2(2), m3(3, anonce, 0x33), m4(4, 0x44)])
            .reconstruct_key_test_parameters();
        assert_eq!(with_m4.len(), 1);
        let params = &with_m4[0];
        assert_eq!(params.ssid(), test_vectors::SSID);
        assert_eq!(params.bssid().to_vec(), bytes(test_vectors::BSSID).as_slice());
        assert_eq!(params.client_mac().to_vec(), bytes(test_vectors::CLIENT_MAC).as_slice());
        assert_eq!(params.anonce().to_vec(), bytes(anonce).as_slice());
        assert_eq!(params.snonce().to_vec(), bytes(test_vectors::SNONCE).as_slice());
        assert_eq!(params.cipher(), CipherDescriptor::Ccmp);
        assert_eq!(params.m3_mic(), Some(&Bytes::new([0x33; 16])));
        assert_eq!(params.m4_mic(), Some(&Bytes::new([0x44; 16])));

        let without_m4 = summary_of(vec![m1(1, anonce), m2(2), m3(3, anonce, 0x33)])
            .reconstruct_key_test_parameters();
        assert_eq!(without_m4.len(), 1);
        let mut expected = with_m4[0].clone();
        expected.m4_mic = None;
        assert_eq!(without_m4[0], expected);
    }

    #[test]
    fn test_packets_paired_in_sequence_order() {
        // Delivered out of order; pairing follows sequence numbers
        let anonce = test_vectors::ANONCE;
        let params = summary_of(vec![m4(4, 0x44), m3(3, anonce, 0x33), m2(2), m1(1, anonce)])
            .reconstruct_key_test_parameters();
        assert_eq!(params.len(), 1);
        assert_eq!(params[0].m4_mic(), Some(&Bytes::new([0x44; 16])));
    }

    #[test]
    fn test_latest_matching_m1_and_first_m4() {
        let anonce = test_vectors::ANONCE;
        let other = "11".repeat(32);
        let params = summary_of(vec![
            m1(1, &other),
            m1(2, anonce),
            m1(3, &other),
            m2(5),
            m3(6, anonce, 0x33),
            m4(7, 0x47),
            m4(8, 0x48),
        ])
        .reconstruct_key_test_parameters();
        assert_eq!(params.len(), 1);
        assert_eq!(params[0].anonce().to_vec(), bytes(anonce).as_slice());
        assert_eq!(params[0].m4_mic(), Some(&Bytes::new([0x47; 16])));
    }

    #[test]
    fn test_m3_retransmissions_each_pair() {
        let anonce = test_vectors::ANONCE;
        let params = summary_of(vec![
            m1(1, anonce),
            m2(2),
            m3(3, anonce, 0x31),
            m3(5, anonce, 0x32),
            m4(6, 0x44),
        ])
        .reconstruct_key_test_parameters();
        assert_eq!(params.len(), 2);
        assert_eq!(params[0].m3_mic(), Some(&Bytes::new([0x31; 16])));
        assert_eq!(params[1].m3_mic(), Some(&Bytes::new([0x32; 16])));
        // Both M3s are followed by the same M4
        assert_eq!(params[0].m4_mic(), params[1].m4_mic());
    }

    #[test]
    fn test_no_pair_without_matching_m1() {
        let anonce = test_vectors::ANONCE;
        let other = "22".repeat(32);
        // M1 after M2, and an M1 with a foreign nonce before it
        let params = summary_of(vec![m1(1, &other), m2(2), m1(3, anonce), m3(4, anonce, 0x33)])
            .reconstruct_key_test_parameters();
        assert!(params.is_empty());

        // M3 before M2 never pairs
        let params = summary_of(vec![m1(1, anonce), m3(2, anonce, 0x33), m2(3)])
            .reconstruct_key_test_parameters();
        assert!(params.is_empty());
    }

    #[test]
    fn test_short_m2_frame_is_dropped() {
        let anonce = test_vectors::ANONCE;
        let mut short = m2(2);
        short.frame = Bytes::new([0u8; MIN_M2_FRAME_LEN - 1]);
        let params = summary_of(vec![m1(1, anonce), short, m3(3, anonce, 0x33)])
            .reconstruct_key_test_parameters();
        assert!(params.is_empty());
    }

    #[test]
    fn test_parameter_validation() {
        let mut parts = test_vectors::parts();
        parts.m2_frame = Bytes::new([0u8; 100]);
        assert!(matches!(
            KeyTestParameters::new(parts),
            Err(Error::MalformedHandshake(_))
        ));

        let mut parts = test_vectors::parts();
        parts.anonce = Bytes::new([0u8; 31]);
        assert!(matches!(
            KeyTestParameters::new(parts),
            Err(Error::InvalidKeyMaterial { what: "ANonce", expected: 32, actual: 31 })
        ));
    }

    #[test]
    fn test_eapol_body_strips_prefix_and_fcs() {
        let params = test_vectors::key_test_parameters();
        let raw = bytes(test_vectors::M2_FRAME);
        assert_eq!(params.eapol_body().len(), raw.len() - 38);
        assert_eq!(params.eapol_body()[0..4], [0x01, 0x03, 0x00, 0x75]);
        assert_eq!(params.eapol_body()[81..97].to_vec(), bytes(test_vectors::M2_MIC).as_slice());
    }

    #[test]
    fn test_conversations_keyed_by_bssid() {
        let mut summary = CaptureSummary::new();
        let mut other_ap = m1(2, test_vectors::ANONCE);
        other_ap.bssid = bytes("02:00:00:00:00:01");
        summary.observe_key_frame(m1(1, test_vectors::ANONCE)).unwrap();
        summary.observe_key_frame(other_ap).unwrap();
        summary.observe_key_frame(m2(3)).unwrap();
        assert_eq!(summary.conversations().len(), 2);
        assert_eq!(summary.conversations()[0].captured_messages(), "M1,M2");
        assert_eq!(summary.conversations()[1].captured_messages(), "M1");
    }
}
