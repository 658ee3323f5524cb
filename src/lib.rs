/*!
 * WPA2 handshake passphrase recovery
 *
 * Reconstructs 4-way handshakes from decoded EAPOL-Key frames, derives
 * PMK/PTK/MIC to verify candidate passphrases, and runs a rule-based
 * dictionary attack built from seed words.
 */

pub mod bruteforce;
pub mod bytes;
pub mod capture;
pub mod config;
pub mod crypto;
pub mod error;
pub mod handshake;
pub mod password_gen;
pub mod progress;

#[cfg(test)]
mod test_vectors;

pub use bruteforce::{dictionary_attack, AttackOutcome, DictionaryAttack, StopHandle};
pub use bytes::Bytes;
pub use capture::{scan_events, scan_file, CaptureEvent, CaptureFile, ScanReport};
pub use config::{Modification, WordTransformRules};
pub use crypto::{compute_mic, derive_pmk, derive_ptk, test_passphrase};
pub use error::{Error, Result};
pub use handshake::{
    CaptureSummary, CipherDescriptor, HandshakeConversation, HandshakeParts, KeyFrame,
    KeyInfoFlags, KeyTestParameters, MessageRole, WifiNetwork,
};
pub use password_gen::{
    basic_case_variants, generate_combinations, leet_and_case_variants, modified_variants,
    word_variants, OrderedSet,
};
pub use progress::{ProgressReporter, SilentProgress, TerminalProgress};
