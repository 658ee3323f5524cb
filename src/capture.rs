/*!
 * Decoded capture input
 *
 * Frame decoding happens upstream; this module reads the decoded beacon and
 * EAPOL-Key events of one capture from JSON and replays them, in capture
 * order, into a `CaptureSummary`.
 *
 * ```json
 * { "frames": [
 *     { "kind": "beacon", "bssid": "00:1E:2A:E0:BD:D0", "ssid": "Home" },
 *     { "kind": "key", "sequence": 1, "timestamp": "2024-01-01T00:00:00Z",
 *       "bssid": "..", "source": "..", "destination": "..", "key_info": "008A",
 *       "nonce": "..", "mic": "..", "key_data": "..", "frame": ".." }
 * ] }
 * ```
 */

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::bytes::Bytes;
use crate::error::Result;
use crate::handshake::{CaptureSummary, KeyFrame};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum CaptureEvent {
    Beacon { bssid: Bytes, ssid: String },
    Key(KeyFrame),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CaptureFile {
    pub frames: Vec<CaptureEvent>,
}

impl CaptureFile {
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let capture: CaptureFile = serde_json::from_str(&json)?;
        debug!(path = %path.display(), frames = capture.frames.len(), "loaded capture");
        Ok(capture)
    }
}

/// Outcome of replaying a capture
#[derive(Debug, Clone, Default)]
pub struct ScanReport {
    pub summary: CaptureSummary,
    /// Key frames whose flags match no handshake message
    pub rejected: usize,
    /// Beacons with an empty SSID or an SSID containing a backslash
    pub ignored_beacons: usize,
}

/// Feed events into a fresh summary in the order given
///
/// Rejected key frames are logged and skipped; they never abort the scan.
pub fn scan_events<I>(events: I) -> ScanReport
where
    I: IntoIterator<Item = CaptureEvent>,
{
    let mut report = ScanReport::default();
    for event in events {
        match event {
            CaptureEvent::Beacon { bssid, ssid } => {
                if !report.summary.observe_beacon(bssid, &ssid) {
                    report.ignored_beacons += 1;
                }
            }
            CaptureEvent::Key(frame) => {
                let sequence = frame.sequence;
                if let Err(e) = report.summary.observe_key_frame(frame) {
                    warn!(sequence, "skipping key frame: {}", e);
                    report.rejected += 1;
                }
            }
        }
    }
    report
}

/// Load a capture file and replay it
pub fn scan_file(path: &Path) -> Result<ScanReport> {
    let capture = CaptureFile::load(path)?;
    Ok(scan_events(capture.frames))
}
