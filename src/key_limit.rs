//! Limits on how much data one key may protect.
//!
//! The policy is a comma separated list of `<transformation> KeyUpdate <bytes>`
//! entries, for example
//! `"AES/GCM/NoPadding KeyUpdate 2^37, ChaCha20-Poly1305 KeyUpdate 2^37"`.
//! Byte counts are decimal or `2^N`.

use std::collections::HashMap;

use log::{trace, warn};
use once_cell::sync::Lazy;

/// The limit table used when nothing else is configured.
pub const DEFAULT_KEY_LIMITS: &str =
    "AES/GCM/NoPadding KeyUpdate 2^37, ChaCha20-Poly1305 KeyUpdate 2^37";

/// Largest accepted limit.
pub const MAX_KEY_LIMIT: i64 = 1 << 62;

const KEY_UPDATE: &str = "KEYUPDATE";

static DEFAULT: Lazy<KeyLimits> = Lazy::new(|| KeyLimits::parse(DEFAULT_KEY_LIMITS));

/// Parsed key limit policy, keyed by `"TRANSFORMATION:PURPOSE"`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyLimits {
    limits: HashMap<String, i64>,
}

impl KeyLimits {
    /// Parse a policy string. Bad entries are logged and skipped.
    pub fn parse(policy: &str) -> Self {
        let mut limits = HashMap::new();

        for entry in policy.split(',') {
            let entry = entry.trim().to_uppercase();
            if entry.is_empty() {
                continue;
            }
            let fields: Vec<&str> = entry.split_whitespace().collect();
            if fields.len() != 3 {
                warn!("Malformed key limit entry: {}", entry);
                continue;
            }

            if !fields[1].contains(KEY_UPDATE) {
                warn!("Unknown key limit type: {}", fields[1]);
                continue;
            }

            let Some(size) = parse_size(fields[2]) else {
                warn!("Failed to parse key limit value: {}", fields[2]);
                continue;
            };

            limits.insert(format!("{}:{}", fields[0], KEY_UPDATE), size);
        }

        KeyLimits { limits }
    }

    /// The built in policy.
    pub fn default_limits() -> &'static KeyLimits {
        &DEFAULT
    }

    /// Limit for rekeying `transformation`, 0 if there is none.
    pub fn key_update_limit(&self, transformation: &str) -> i64 {
        let key = format!("{}:{}", transformation.to_uppercase(), KEY_UPDATE);
        self.limits.get(&key).copied().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.limits.is_empty()
    }
}

fn parse_size(s: &str) -> Option<i64> {
    let size = match s.find('^') {
        Some(i) => {
            let exp: u32 = s[i + 1..].parse().ok()?;
            if exp > 62 {
                return None;
            }
            1i64 << exp
        }
        None => s.parse().ok()?,
    };
    (1..=MAX_KEY_LIMIT).contains(&size).then_some(size)
}

/// Result of charging bytes to a [`KeyUsageLimiter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyUsage {
    Ok,
    /// The key protected more than its limit. Reported once.
    RekeyRequired,
}

/// Countdown of the bytes one direction's key may still protect.
#[derive(Debug, Clone)]
pub struct KeyUsageLimiter {
    countdown: i64,
    enabled: bool,
}

impl KeyUsageLimiter {
    /// A limiter for `limit` bytes. A limit of 0 disables it.
    pub fn new(limit: i64) -> Self {
        KeyUsageLimiter {
            countdown: limit,
            enabled: limit > 0,
        }
    }

    pub fn disabled() -> Self {
        Self::new(0)
    }

    #[inline(always)]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Bytes left before a rekey is due, negative once past the limit.
    #[inline(always)]
    pub fn countdown(&self) -> i64 {
        self.countdown
    }

    pub fn charge(&mut self, n_bytes: usize) -> KeyUsage {
        if !self.enabled {
            return KeyUsage::Ok;
        }

        self.countdown -= n_bytes as i64;
        trace!("Key limit countdown: {}", self.countdown);

        if self.countdown < 0 {
            warn!("Key usage limit reached, rekey required");
            self.enabled = false;
            return KeyUsage::RekeyRequired;
        }
        KeyUsage::Ok
    }

    /// Whether the key went past its limit. No side effects.
    pub fn at_limit(&self) -> bool {
        self.countdown < 0
    }
}
