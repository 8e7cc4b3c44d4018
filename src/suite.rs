//! The cipher suite catalog.
//!
//! An immutable table of every suite this crate knows, indexed once on
//! first use. Unknown ids are not an error; they are simply never
//! negotiated.

use std::collections::HashMap;
use std::fmt;

use once_cell::sync::Lazy;

use crate::crypto::{BulkCipher, KeyLengthPolicy, MacAlg};
use crate::types::ProtocolVersion;

#[derive(Debug, PartialEq, Eq, Hash)]
pub struct CipherSuite {
    pub id: u16,
    pub name: &'static str,
    pub bulk: BulkCipher,
    pub mac: MacAlg,
    /// Protocol versions the suite is defined for.
    pub protocols: &'static [ProtocolVersion],
    /// Part of the default enabled list.
    pub default_enabled: bool,
    /// Signalling value, not a real suite.
    pub scsv: bool,
}

const TLS13: &[ProtocolVersion] = &[ProtocolVersion::Tls13];
const TLS12: &[ProtocolVersion] = &[ProtocolVersion::Tls12, ProtocolVersion::Dtls12];
const TO_12: &[ProtocolVersion] = &[
    ProtocolVersion::Tls12,
    ProtocolVersion::Tls11,
    ProtocolVersion::Tls10,
    ProtocolVersion::Ssl30,
    ProtocolVersion::Dtls12,
    ProtocolVersion::Dtls10,
];
const TO_11: &[ProtocolVersion] = &[
    ProtocolVersion::Tls11,
    ProtocolVersion::Tls10,
    ProtocolVersion::Ssl30,
    ProtocolVersion::Dtls10,
];
// RC4 is not allowed in DTLS.
const STREAM: &[ProtocolVersion] = &[
    ProtocolVersion::Tls12,
    ProtocolVersion::Tls11,
    ProtocolVersion::Tls10,
    ProtocolVersion::Ssl30,
];
const ANY: &[ProtocolVersion] = &[
    ProtocolVersion::Tls13,
    ProtocolVersion::Tls12,
    ProtocolVersion::Tls11,
    ProtocolVersion::Tls10,
    ProtocolVersion::Ssl30,
    ProtocolVersion::Dtls12,
    ProtocolVersion::Dtls10,
];

macro_rules! suite {
    ($id:expr, $name:expr, $bulk:ident, $mac:ident, $protocols:expr, $default:expr) => {
        CipherSuite {
            id: $id,
            name: $name,
            bulk: BulkCipher::$bulk,
            mac: MacAlg::$mac,
            protocols: $protocols,
            default_enabled: $default,
            scsv: false,
        }
    };
}

/// Every known suite, in default server preference order.
static SUITES: &[CipherSuite] = &[
    // TLS 1.3
    suite!(0x1302, "TLS_AES_256_GCM_SHA384", Aes256GcmIv, Null, TLS13, true),
    suite!(0x1301, "TLS_AES_128_GCM_SHA256", Aes128GcmIv, Null, TLS13, true),
    suite!(0x1303, "TLS_CHACHA20_POLY1305_SHA256", ChaCha20Poly1305, Null, TLS13, true),
    // TLS 1.2 AEAD
    suite!(0xC02C, "TLS_ECDHE_ECDSA_WITH_AES_256_GCM_SHA384", Aes256Gcm, Null, TLS12, true),
    suite!(0xC02B, "TLS_ECDHE_ECDSA_WITH_AES_128_GCM_SHA256", Aes128Gcm, Null, TLS12, true),
    suite!(0xCCA9, "TLS_ECDHE_ECDSA_WITH_CHACHA20_POLY1305_SHA256", ChaCha20Poly1305, Null, TLS12, true),
    suite!(0xC030, "TLS_ECDHE_RSA_WITH_AES_256_GCM_SHA384", Aes256Gcm, Null, TLS12, true),
    suite!(0xC02F, "TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256", Aes128Gcm, Null, TLS12, true),
    suite!(0xCCA8, "TLS_ECDHE_RSA_WITH_CHACHA20_POLY1305_SHA256", ChaCha20Poly1305, Null, TLS12, true),
    suite!(0x009D, "TLS_RSA_WITH_AES_256_GCM_SHA384", Aes256Gcm, Null, TLS12, true),
    suite!(0x009C, "TLS_RSA_WITH_AES_128_GCM_SHA256", Aes128Gcm, Null, TLS12, true),
    // CBC with SHA-2 MACs
    suite!(0xC024, "TLS_ECDHE_ECDSA_WITH_AES_256_CBC_SHA384", Aes256, Sha384, TLS12, true),
    suite!(0xC023, "TLS_ECDHE_ECDSA_WITH_AES_128_CBC_SHA256", Aes128, Sha256, TLS12, true),
    suite!(0xC028, "TLS_ECDHE_RSA_WITH_AES_256_CBC_SHA384", Aes256, Sha384, TLS12, true),
    suite!(0xC027, "TLS_ECDHE_RSA_WITH_AES_128_CBC_SHA256", Aes128, Sha256, TLS12, true),
    suite!(0x003D, "TLS_RSA_WITH_AES_256_CBC_SHA256", Aes256, Sha256, TLS12, true),
    suite!(0x003C, "TLS_RSA_WITH_AES_128_CBC_SHA256", Aes128, Sha256, TLS12, true),
    // CBC with SHA-1
    suite!(0xC00A, "TLS_ECDHE_ECDSA_WITH_AES_256_CBC_SHA", Aes256, Sha1, TO_12, true),
    suite!(0xC009, "TLS_ECDHE_ECDSA_WITH_AES_128_CBC_SHA", Aes128, Sha1, TO_12, true),
    suite!(0xC014, "TLS_ECDHE_RSA_WITH_AES_256_CBC_SHA", Aes256, Sha1, TO_12, true),
    suite!(0xC013, "TLS_ECDHE_RSA_WITH_AES_128_CBC_SHA", Aes128, Sha1, TO_12, true),
    suite!(0x0035, "TLS_RSA_WITH_AES_256_CBC_SHA", Aes256, Sha1, TO_12, true),
    suite!(0x002F, "TLS_RSA_WITH_AES_128_CBC_SHA", Aes128, Sha1, TO_12, true),
    // Legacy, never enabled unless asked for.
    suite!(0x000A, "SSL_RSA_WITH_3DES_EDE_CBC_SHA", TripleDes, Sha1, TO_12, false),
    suite!(0x0009, "SSL_RSA_WITH_DES_CBC_SHA", Des, Sha1, TO_11, false),
    suite!(0x0007, "TLS_RSA_WITH_IDEA_CBC_SHA", Idea, Sha1, TO_11, false),
    suite!(0x0005, "SSL_RSA_WITH_RC4_128_SHA", Rc4_128, Sha1, STREAM, false),
    suite!(0x0004, "SSL_RSA_WITH_RC4_128_MD5", Rc4_128, Md5, STREAM, false),
    suite!(0x003B, "TLS_RSA_WITH_NULL_SHA256", Null, Sha256, TLS12, false),
    suite!(0x0002, "SSL_RSA_WITH_NULL_SHA", Null, Sha1, TO_12, false),
    suite!(0x0001, "SSL_RSA_WITH_NULL_MD5", Null, Md5, TO_12, false),
    // Signalling
    CipherSuite {
        id: 0x00FF,
        name: "TLS_EMPTY_RENEGOTIATION_INFO_SCSV",
        bulk: BulkCipher::Null,
        mac: MacAlg::Null,
        protocols: ANY,
        default_enabled: true,
        scsv: true,
    },
    CipherSuite {
        id: 0x5600,
        name: "TLS_FALLBACK_SCSV",
        bulk: BulkCipher::Null,
        mac: MacAlg::Null,
        protocols: ANY,
        default_enabled: false,
        scsv: true,
    },
];

static BY_ID: Lazy<HashMap<u16, &'static CipherSuite>> =
    Lazy::new(|| SUITES.iter().map(|s| (s.id, s)).collect());

/// Id of the empty renegotiation info signalling suite.
pub const EMPTY_RENEGOTIATION_INFO_SCSV: u16 = 0x00FF;

impl CipherSuite {
    /// All known suites in default preference order.
    pub fn all() -> &'static [CipherSuite] {
        SUITES
    }

    pub fn lookup(id: u16) -> Option<&'static CipherSuite> {
        BY_ID.get(&id).copied()
    }

    pub fn by_name(name: &str) -> Option<&'static CipherSuite> {
        SUITES.iter().find(|s| s.name == name)
    }

    /// Resolve ids in order, dropping the ones we don't know.
    pub fn resolve(ids: &[u16]) -> Vec<&'static CipherSuite> {
        ids.iter().filter_map(|id| Self::lookup(*id)).collect()
    }

    /// Whether the suite is defined for `version`.
    pub fn supports(&self, version: ProtocolVersion) -> bool {
        self.protocols.contains(&version) && self.bulk.supports(version)
    }

    /// Whether the suite could be used at all on this platform.
    pub fn is_available(&self, policy: &dyn KeyLengthPolicy) -> bool {
        !self.scsv && self.bulk.is_available(policy)
    }

    pub fn is_negotiable(&self, version: ProtocolVersion, policy: &dyn KeyLengthPolicy) -> bool {
        self.is_available(policy) && self.supports(version)
    }

    pub fn uses_tls13(&self) -> bool {
        self.protocols == TLS13
    }
}

impl fmt::Display for CipherSuite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(0x{:04X})", self.name, self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::Unlimited;

    #[test]
    fn lookup_and_resolve() {
        let s = CipherSuite::lookup(0x1301).unwrap();
        assert_eq!(s.name, "TLS_AES_128_GCM_SHA256");
        assert!(CipherSuite::lookup(0xBEEF).is_none());

        let resolved = CipherSuite::resolve(&[0xBEEF, 0x1302, 0x00FF, 0x1301]);
        let ids: Vec<u16> = resolved.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![0x1302, 0x00FF, 0x1301]);
    }

    #[test]
    fn ids_are_unique() {
        assert_eq!(BY_ID.len(), SUITES.len());
    }

    #[test]
    fn negotiability() {
        let gcm13 = CipherSuite::lookup(0x1301).unwrap();
        assert!(gcm13.is_negotiable(ProtocolVersion::Tls13, &Unlimited));
        assert!(!gcm13.is_negotiable(ProtocolVersion::Tls12, &Unlimited));

        let scsv = CipherSuite::lookup(EMPTY_RENEGOTIATION_INFO_SCSV).unwrap();
        assert!(!scsv.is_negotiable(ProtocolVersion::Tls12, &Unlimited));

        let rc4 = CipherSuite::lookup(0x0005).unwrap();
        assert!(rc4.is_negotiable(ProtocolVersion::Tls10, &Unlimited));
        assert!(!rc4.is_negotiable(ProtocolVersion::Dtls12, &Unlimited));

        let idea = CipherSuite::lookup(0x0007).unwrap();
        assert!(!idea.is_negotiable(ProtocolVersion::Tls10, &Unlimited));
    }

    #[test]
    fn every_suite_has_a_scheme_for_its_protocols() {
        for s in CipherSuite::all().iter().filter(|s| !s.scsv) {
            for v in s.protocols {
                if s.bulk.is_allowed() {
                    assert!(s.bulk.supports(*v), "{} on {}", s, v);
                }
            }
        }
    }
}
