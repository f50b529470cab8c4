// ============================
// finance-backend-lib/src/id.rs
// ============================
//! Collision-resistant identifiers for persisted records.
//!
//! Layout: `c` + timestamp (8 base-36 digits, epoch ms) + counter
//! (5 base-36 digits) + 8 random characters + 4-character process
//! fingerprint. Every identifier is therefore 26 characters long and
//! identifiers from one process sort by creation millisecond.
use std::sync::atomic::{AtomicU64, Ordering};

use rand::Rng;
use sha2::{Digest, Sha256};
use tracing::warn;

use crate::auth::now_ms;

/// Characters an identifier may contain
pub const ALPHABET: &[u8; 36] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Counter wraps at 2^24
pub const COUNTER_MODULUS: u64 = 1 << 24;

/// Shortest string `validate` accepts
pub const MIN_ID_LEN: usize = 25;

const PREFIX: char = 'c';
const BASE36_DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const TIMESTAMP_WIDTH: usize = 8;
const COUNTER_WIDTH: usize = 5;
const RANDOM_LEN: usize = 8;
const FINGERPRINT_LEN: usize = 4;

/// Process-wide identifier source.
///
/// Construct one at startup and share it by reference (or `Arc`) with every
/// component that creates entities. The counter is a lock-free atomic.
#[derive(Debug)]
pub struct IdGenerator {
    counter: AtomicU64,
    fingerprint: String,
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl IdGenerator {
    /// Create a generator fingerprinted from this host and process
    pub fn new() -> Self {
        Self::from_parts(0, compute_fingerprint())
    }

    fn from_parts(counter: u64, fingerprint: String) -> Self {
        Self {
            counter: AtomicU64::new(counter),
            fingerprint,
        }
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Produce a fresh identifier
    pub fn next(&self) -> String {
        self.next_at(u64::try_from(now_ms()).unwrap_or(0))
    }

    fn next_at(&self, timestamp_ms: u64) -> String {
        let count = self
            .counter
            .fetch_add(1, Ordering::Relaxed)
            .wrapping_add(1)
            % COUNTER_MODULUS;

        let mut id = String::with_capacity(
            1 + TIMESTAMP_WIDTH + COUNTER_WIDTH + RANDOM_LEN + FINGERPRINT_LEN,
        );
        id.push(PREFIX);
        push_base36(&mut id, timestamp_ms, TIMESTAMP_WIDTH);
        push_base36(&mut id, count, COUNTER_WIDTH);
        push_random(&mut id, RANDOM_LEN);
        id.push_str(&self.fingerprint);
        id
    }

    /// Whether `id` has the shape of a generated identifier
    pub fn validate(id: &str) -> bool {
        id.len() >= MIN_ID_LEN
            && id.starts_with(PREFIX)
            && id.bytes().all(|b| ALPHABET.contains(&b))
    }
}

fn push_base36(out: &mut String, mut value: u64, min_width: usize) {
    let mut digits = Vec::with_capacity(13);
    loop {
        digits.push(BASE36_DIGITS[(value % 36) as usize]);
        value /= 36;
        if value == 0 {
            break;
        }
    }
    for _ in digits.len()..min_width {
        out.push('0');
    }
    out.extend(digits.iter().rev().map(|&d| char::from(d)));
}

fn push_random(out: &mut String, len: usize) {
    // ThreadRng is a CSPRNG seeded from the OS
    let mut rng = rand::rng();
    for _ in 0..len {
        out.push(char::from(ALPHABET[rng.random_range(0..ALPHABET.len())]));
    }
}

/// Four alphabet characters derived from hostname and pid, or random when
/// the hostname cannot be read.
fn compute_fingerprint() -> String {
    match gethostname::gethostname().into_string() {
        Ok(host) if !host.is_empty() => {
            let digest = Sha256::digest(format!("{host}{}", std::process::id()).as_bytes());
            let mut hash = u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]]);
            let mut fingerprint = String::with_capacity(FINGERPRINT_LEN);
            for _ in 0..FINGERPRINT_LEN {
                fingerprint.push(char::from(ALPHABET[(hash % 36) as usize]));
                hash /= 36;
            }
            fingerprint
        },
        _ => {
            warn!("hostname unavailable, using a random id fingerprint");
            let mut fingerprint = String::with_capacity(FINGERPRINT_LEN);
            push_random(&mut fingerprint, FINGERPRINT_LEN);
            fingerprint
        },
    }
}
