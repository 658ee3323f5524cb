/*!
 * Offline dictionary attack against a reconstructed handshake
 *
 * Every unordered pair of seed words (each word also paired with itself) is
 * one round. A round generates the pair's candidates, then tests them in
 * parallel on a dedicated Rayon pool. The earliest matching candidate in
 * generation order wins.
 */

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use rayon::prelude::*;
use tracing::{debug, info};

use crate::config::WordTransformRules;
use crate::crypto;
use crate::error::{Error, Result};
use crate::handshake::KeyTestParameters;
use crate::password_gen::generate_combinations;
use crate::progress::ProgressReporter;

/// Candidates between two progress reports while testing
pub const REPORT_INTERVAL: u64 = 100;

const STEP_GENERATE: u8 = 1;
const STEP_TEST: u8 = 2;

/// Attack result
#[derive(Debug, Clone, PartialEq)]
pub struct AttackOutcome {
    pub password: Option<String>,
    pub attempts: u64,
    pub rounds: u64,
    pub duration_secs: f64,
    pub passwords_per_second: f64,
}

/// Cancels a running attack from another thread
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn stop(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Number of rounds for `words` seed words: n + n(n-1)/2
pub fn total_rounds(words: usize) -> u64 {
    let n = words as u64;
    n * (n + 1) / 2
}

pub struct DictionaryAttack {
    params: KeyTestParameters,
    rules: WordTransformRules,
    pool: rayon::ThreadPool,
    threads: usize,
    attempts: Arc<AtomicU64>,
    stop: StopHandle,
}

impl DictionaryAttack {
    /// Prepare an attack on the first available handshake
    ///
    /// Fails with `Error::NoHandshakeAvailable` when `key_parameters` is
    /// empty and with `Error::InvalidConfig` for unusable rules.
    pub fn new(
        key_parameters: &[KeyTestParameters],
        rules: WordTransformRules,
        threads: usize,
    ) -> Result<Self> {
        let params = key_parameters
            .first()
            .cloned()
            .ok_or(Error::NoHandshakeAvailable)?;
        rules.validate()?;
        if rules.words.is_empty() {
            return Err(Error::InvalidConfig(
                "at least one seed word is needed".to_string(),
            ));
        }

        let threads = threads.max(1);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .stack_size(4 * 1024 * 1024)
            .build()?;

        Ok(Self {
            params,
            rules,
            pool,
            threads,
            attempts: Arc::new(AtomicU64::new(0)),
            stop: StopHandle::default(),
        })
    }

    pub fn key_parameters(&self) -> &KeyTestParameters {
        &self.params
    }

    pub fn threads(&self) -> usize {
        self.threads
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn attempts(&self) -> u64 {
        self.attempts.load(Ordering::Relaxed)
    }

    /// Run every round until a candidate verifies, the rounds run out or the attack is stopped
    ///
    /// Running out of rounds is not an error: the outcome then has no password.
    pub fn run(&self, progress: &dyn ProgressReporter) -> AttackOutcome {
        let words = &self.rules.words;
        let total = total_rounds(words.len());
        info!(
            ssid = %self.params.ssid(),
            words = words.len(),
            rounds = total,
            threads = self.threads,
            "starting dictionary attack"
        );

        let start_time = Instant::now();
        let mut round = 0u64;
        let mut password = None;

        'rounds: for i in 0..words.len() {
            for j in 0..=i {
                if self.stop.is_stopped() {
                    break 'rounds;
                }
                round += 1;

                progress.set_round_and_step(total, round, STEP_GENERATE);
                let candidates = generate_combinations(&words[i], &words[j], &self.rules, progress);
                debug!(
                    round,
                    first = %words[i],
                    second = %words[j],
                    candidates = candidates.len(),
                    "generated candidates"
                );

                progress.set_round_and_step(total, round, STEP_TEST);
                if let Some(found) = self.test_candidates(&candidates, progress) {
                    password = Some(found);
                    break 'rounds;
                }
            }
        }

        let elapsed = start_time.elapsed().as_secs_f64();
        let attempts = self.attempts();
        let rate = if elapsed > 0.0 {
            attempts as f64 / elapsed
        } else {
            0.0
        };

        match &password {
            Some(_) => info!(round, attempts, "passphrase found"),
            None if self.stop.is_stopped() => info!(round, attempts, "dictionary attack stopped"),
            None => info!(round, attempts, "dictionary exhausted without a match"),
        }

        AttackOutcome {
            password,
            attempts,
            rounds: round,
            duration_secs: elapsed,
            passwords_per_second: rate,
        }
    }

    fn test_candidates(&self, candidates: &[String], progress: &dyn ProgressReporter) -> Option<String> {
        let len = candidates.len() as u64;
        progress.set_total_ticks(len);

        self.pool.install(|| {
            candidates
                .par_iter()
                .enumerate()
                .find_first(|(index, password)| {
                    if self.stop.is_stopped() {
                        return false;
                    }
                    let count = *index as u64 + 1;
                    if count % REPORT_INTERVAL == 0 {
                        progress.report(count, &format!("{} ({} of {} words)", password, count, len));
                    }
                    self.attempts.fetch_add(1, Ordering::Relaxed);
                    crypto::test_passphrase(password, &self.params)
                })
                .map(|(_, password)| password.clone())
        })
    }
}

/// Run a dictionary attack on the first available handshake with one worker per CPU
pub fn dictionary_attack(
    key_parameters: &[KeyTestParameters],
    rules: WordTransformRules,
    progress: &dyn ProgressReporter,
) -> Result<Option<String>> {
    let attack = DictionaryAttack::new(key_parameters, rules, num_cpus::get())?;
    Ok(attack.run(progress).password)
}
