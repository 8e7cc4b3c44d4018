//! Bulk ciphers and the record scheme each one uses per protocol version.

use std::fmt;
use std::sync::Arc;

use crate::types::ProtocolVersion;

/// How a bulk cipher processes a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CipherKind {
    Null,
    Stream,
    Block,
    Aead,
}

/// Record protection scheme: a cipher kind specialized for a protocol range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    Null,
    Stream,
    /// CBC with the IV chained from the previous record (SSL 3.0, TLS 1.0).
    T10Block,
    /// CBC with an explicit per-record IV (TLS 1.1+, DTLS).
    T11Block,
    /// GCM with 8 explicit nonce bytes on the wire.
    T12Gcm,
    /// ChaCha20-Poly1305 with a sequence derived nonce.
    T12ChaCha,
    /// TLS 1.3 AEAD with the inner content type.
    T13Aead,
}

/// Platform policy on the strength of symmetric keys.
pub trait KeyLengthPolicy: fmt::Debug + Send + Sync {
    /// Longest key in bits allowed for `transformation`, e.g.
    /// "AES/GCM/NoPadding".
    fn max_allowed_key_length(&self, transformation: &str) -> u32;
}

/// Policy without restrictions.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unlimited;

impl KeyLengthPolicy for Unlimited {
    fn max_allowed_key_length(&self, _transformation: &str) -> u32 {
        u32::MAX
    }
}

impl Unlimited {
    pub fn shared() -> Arc<dyn KeyLengthPolicy> {
        Arc::new(Unlimited)
    }
}

const TO_10: &[ProtocolVersion] = &[ProtocolVersion::Tls10, ProtocolVersion::Ssl30];
const OF_11: &[ProtocolVersion] = &[ProtocolVersion::Tls11, ProtocolVersion::Dtls10];
const P_11_12: &[ProtocolVersion] = &[
    ProtocolVersion::Tls12,
    ProtocolVersion::Tls11,
    ProtocolVersion::Dtls12,
    ProtocolVersion::Dtls10,
];
const OF_12: &[ProtocolVersion] = &[ProtocolVersion::Tls12, ProtocolVersion::Dtls12];
const OF_13: &[ProtocolVersion] = &[ProtocolVersion::Tls13];
const TO_12: &[ProtocolVersion] = &[
    ProtocolVersion::Tls12,
    ProtocolVersion::Tls11,
    ProtocolVersion::Tls10,
    ProtocolVersion::Ssl30,
    ProtocolVersion::Dtls12,
    ProtocolVersion::Dtls10,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BulkCipher {
    Null,
    Rc4_128,
    Des,
    TripleDes,
    Idea,
    Aes128,
    Aes256,
    /// AES-GCM with a 4 byte fixed IV (TLS 1.2).
    Aes128Gcm,
    Aes256Gcm,
    /// AES-GCM with a full 12 byte IV (TLS 1.3).
    Aes128GcmIv,
    Aes256GcmIv,
    ChaCha20Poly1305,
}

impl BulkCipher {
    pub fn description(&self) -> &'static str {
        use BulkCipher::*;
        match self {
            Null => "NULL",
            Rc4_128 => "RC4_128",
            Des => "DES_CBC",
            TripleDes => "3DES_EDE_CBC",
            Idea => "IDEA_CBC",
            Aes128 => "AES_128_CBC",
            Aes256 => "AES_256_CBC",
            Aes128Gcm | Aes128GcmIv => "AES_128_GCM",
            Aes256Gcm | Aes256GcmIv => "AES_256_GCM",
            ChaCha20Poly1305 => "CHACHA20_POLY1305",
        }
    }

    /// Algorithm/mode/padding name of the underlying primitive.
    pub fn transformation(&self) -> &'static str {
        use BulkCipher::*;
        match self {
            Null => "NULL",
            Rc4_128 => "RC4",
            Des => "DES/CBC/NoPadding",
            TripleDes => "DESede/CBC/NoPadding",
            Idea => "IDEA",
            Aes128 | Aes256 => "AES/CBC/NoPadding",
            Aes128Gcm | Aes256Gcm | Aes128GcmIv | Aes256GcmIv => "AES/GCM/NoPadding",
            ChaCha20Poly1305 => "ChaCha20-Poly1305",
        }
    }

    pub fn kind(&self) -> CipherKind {
        use BulkCipher::*;
        match self {
            Null => CipherKind::Null,
            Rc4_128 => CipherKind::Stream,
            Des | TripleDes | Idea | Aes128 | Aes256 => CipherKind::Block,
            Aes128Gcm | Aes256Gcm | Aes128GcmIv | Aes256GcmIv | ChaCha20Poly1305 => {
                CipherKind::Aead
            }
        }
    }

    pub fn key_size(&self) -> usize {
        use BulkCipher::*;
        match self {
            Null => 0,
            Des => 8,
            Rc4_128 | Idea | Aes128 | Aes128Gcm | Aes128GcmIv => 16,
            TripleDes => 24,
            Aes256 | Aes256Gcm | Aes256GcmIv | ChaCha20Poly1305 => 32,
        }
    }

    pub fn expanded_key_size(&self) -> usize {
        self.key_size()
    }

    pub fn iv_size(&self) -> usize {
        use BulkCipher::*;
        match self {
            Null | Rc4_128 => 0,
            Des | TripleDes | Idea => 8,
            Aes128 | Aes256 => 16,
            Aes128Gcm | Aes256Gcm | Aes128GcmIv | Aes256GcmIv | ChaCha20Poly1305 => 12,
        }
    }

    /// IV bytes derived from the key schedule rather than sent per record.
    pub fn fixed_iv_size(&self) -> usize {
        use BulkCipher::*;
        match self {
            Aes128Gcm | Aes256Gcm => 4,
            ChaCha20Poly1305 => 12,
            _ => 0,
        }
    }

    pub fn tag_size(&self) -> usize {
        if self.kind() == CipherKind::Aead {
            16
        } else {
            0
        }
    }

    pub fn is_allowed(&self) -> bool {
        !matches!(self, BulkCipher::Idea)
    }

    pub fn is_exportable(&self) -> bool {
        false
    }

    /// Whether this crate carries an implementation of the primitive.
    fn has_engine(&self) -> bool {
        !matches!(self, BulkCipher::Idea)
    }

    /// Allowed, within the key length policy and implemented.
    pub fn is_available(&self, policy: &dyn KeyLengthPolicy) -> bool {
        if !self.is_allowed() || !self.has_engine() {
            return false;
        }
        let bits = (self.key_size() * 8) as u32;
        bits <= 128 || bits <= policy.max_allowed_key_length(self.transformation())
    }

    /// The record scheme for `version`, if this cipher may be used with it.
    pub fn scheme(&self, version: ProtocolVersion) -> Option<Scheme> {
        use BulkCipher::*;
        let table: &[(&[ProtocolVersion], Scheme)] = match self {
            Null => return Some(Scheme::Null),
            Rc4_128 => &[(TO_12, Scheme::Stream)],
            Des => &[(TO_10, Scheme::T10Block), (OF_11, Scheme::T11Block)],
            TripleDes | Aes128 | Aes256 => &[(TO_10, Scheme::T10Block), (P_11_12, Scheme::T11Block)],
            Idea => &[],
            Aes128Gcm | Aes256Gcm => &[(OF_12, Scheme::T12Gcm)],
            Aes128GcmIv | Aes256GcmIv => &[(OF_13, Scheme::T13Aead)],
            ChaCha20Poly1305 => &[(OF_12, Scheme::T12ChaCha), (OF_13, Scheme::T13Aead)],
        };

        table
            .iter()
            .find(|(versions, _)| versions.contains(&version))
            .map(|(_, scheme)| *scheme)
    }

    pub fn supports(&self, version: ProtocolVersion) -> bool {
        self.scheme(version).is_some()
    }
}

impl fmt::Display for BulkCipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Max128;

    impl KeyLengthPolicy for Max128 {
        fn max_allowed_key_length(&self, _transformation: &str) -> u32 {
            128
        }
    }

    // Strong keys for AEAD only.
    #[derive(Debug)]
    struct GcmOnly;

    impl KeyLengthPolicy for GcmOnly {
        fn max_allowed_key_length(&self, transformation: &str) -> u32 {
            match transformation {
                "AES/GCM/NoPadding" => 256,
                _ => 128,
            }
        }
    }

    #[test]
    fn availability_follows_policy() {
        assert!(BulkCipher::Aes256.is_available(&Unlimited));
        assert!(!BulkCipher::Aes256.is_available(&Max128));
        assert!(BulkCipher::Aes128Gcm.is_available(&Max128));
        assert!(!BulkCipher::Idea.is_available(&Unlimited));
    }

    #[test]
    fn policy_sees_full_transformation() {
        assert!(!BulkCipher::Aes256.is_available(&GcmOnly));
        assert!(BulkCipher::Aes256Gcm.is_available(&GcmOnly));
        assert!(BulkCipher::Aes256GcmIv.is_available(&GcmOnly));
        assert!(BulkCipher::Aes128.is_available(&GcmOnly));
    }

    #[test]
    fn schemes_by_version() {
        use ProtocolVersion::{Dtls12, Tls10, Tls12, Tls13};
        assert_eq!(BulkCipher::Aes128.scheme(Tls10), Some(Scheme::T10Block));
        assert_eq!(BulkCipher::Aes128.scheme(Dtls12), Some(Scheme::T11Block));
        assert_eq!(BulkCipher::Des.scheme(Tls12), None);
        assert_eq!(BulkCipher::Aes128Gcm.scheme(Tls13), None);
        assert_eq!(BulkCipher::Aes128GcmIv.scheme(Tls13), Some(Scheme::T13Aead));
        assert_eq!(BulkCipher::ChaCha20Poly1305.scheme(Tls12), Some(Scheme::T12ChaCha));
        assert_eq!(BulkCipher::ChaCha20Poly1305.scheme(Tls13), Some(Scheme::T13Aead));
        assert_eq!(BulkCipher::Rc4_128.scheme(Tls13), None);
        assert_eq!(BulkCipher::Null.scheme(Tls13), Some(Scheme::Null));
    }

    #[test]
    fn sizes() {
        assert_eq!(BulkCipher::Aes128Gcm.fixed_iv_size(), 4);
        assert_eq!(BulkCipher::Aes128GcmIv.fixed_iv_size(), 0);
        assert_eq!(BulkCipher::ChaCha20Poly1305.fixed_iv_size(), 12);
        assert_eq!(BulkCipher::TripleDes.key_size(), 24);
        assert_eq!(BulkCipher::Aes256.transformation(), "AES/CBC/NoPadding");
        assert_eq!(BulkCipher::Aes128.tag_size(), 0);
    }
}
