//! Record MACs: HMAC for TLS 1.0+ and the keyed hash of SSL 3.0.

use hmac::{Hmac, Mac};
use md5::Md5;
use sha1::Sha1;
use sha2::{Digest, Sha256, Sha384};
use tinyvec::ArrayVec;
use zeroize::Zeroizing;

use super::Authenticator;
use crate::types::ProtocolVersion;
use crate::Error;

/// MAC output. The largest MAC is 48 bytes (SHA-384).
pub type MacTag = ArrayVec<[u8; 64]>;

/// MAC algorithm of a cipher suite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MacAlg {
    Null,
    Md5,
    Sha1,
    Sha256,
    Sha384,
}

impl MacAlg {
    pub fn name(&self) -> &'static str {
        match self {
            MacAlg::Null => "NULL",
            MacAlg::Md5 => "MD5",
            MacAlg::Sha1 => "SHA",
            MacAlg::Sha256 => "SHA256",
            MacAlg::Sha384 => "SHA384",
        }
    }

    /// Tag length in bytes.
    pub fn size(&self) -> usize {
        match self {
            MacAlg::Null => 0,
            MacAlg::Md5 => 16,
            MacAlg::Sha1 => 20,
            MacAlg::Sha256 => 32,
            MacAlg::Sha384 => 48,
        }
    }

    /// Block size of the underlying hash.
    pub fn hash_block_size(&self) -> usize {
        match self {
            MacAlg::Null => 0,
            MacAlg::Md5 | MacAlg::Sha1 | MacAlg::Sha256 => 64,
            MacAlg::Sha384 => 128,
        }
    }

    /// Bytes the hash appends when padding its final block.
    pub fn minimal_padding_size(&self) -> usize {
        match self {
            MacAlg::Null => 0,
            MacAlg::Md5 | MacAlg::Sha1 | MacAlg::Sha256 => 9,
            MacAlg::Sha384 => 17,
        }
    }
}

enum Keyed {
    Null,
    HmacMd5(Hmac<Md5>),
    HmacSha1(Hmac<Sha1>),
    HmacSha256(Hmac<Sha256>),
    HmacSha384(Hmac<Sha384>),
    Ssl3Md5(Zeroizing<Vec<u8>>),
    Ssl3Sha1(Zeroizing<Vec<u8>>),
}

/// A record MAC bound to one direction's authenticator.
pub struct RecordMac {
    alg: MacAlg,
    keyed: Keyed,
    authenticator: Authenticator,
}

impl RecordMac {
    pub fn new(alg: MacAlg, key: &[u8], authenticator: Authenticator) -> Result<Self, Error> {
        fn hmac<M: Mac + hmac::digest::KeyInit>(key: &[u8]) -> Result<M, Error> {
            <M as Mac>::new_from_slice(key).map_err(|_| Error::Crypto("Invalid HMAC key".into()))
        }

        let ssl3 = !authenticator.version().uses_tls10_plus();
        let keyed = match (alg, ssl3) {
            (MacAlg::Null, _) => Keyed::Null,
            (MacAlg::Md5, true) => Keyed::Ssl3Md5(Zeroizing::new(key.to_vec())),
            (MacAlg::Sha1, true) => Keyed::Ssl3Sha1(Zeroizing::new(key.to_vec())),
            (MacAlg::Md5, false) => Keyed::HmacMd5(hmac(key)?),
            (MacAlg::Sha1, false) => Keyed::HmacSha1(hmac(key)?),
            (MacAlg::Sha256, false) => Keyed::HmacSha256(hmac(key)?),
            (MacAlg::Sha384, false) => Keyed::HmacSha384(hmac(key)?),
            (alg, true) => {
                return Err(Error::Unsupported(format!(
                    "{} MAC is not defined for SSLv3",
                    alg.name()
                )))
            }
        };

        Ok(RecordMac {
            alg,
            keyed,
            authenticator,
        })
    }

    /// A MAC that produces empty tags, for unprotected records.
    pub fn null(authenticator: Authenticator) -> Self {
        RecordMac {
            alg: MacAlg::Null,
            keyed: Keyed::Null,
            authenticator,
        }
    }

    #[inline(always)]
    pub fn alg(&self) -> MacAlg {
        self.alg
    }

    pub fn authenticator(&self) -> &Authenticator {
        &self.authenticator
    }

    pub fn authenticator_mut(&mut self) -> &mut Authenticator {
        &mut self.authenticator
    }

    /// MAC over `data` for a record of `content_type`.
    ///
    /// A simulated run hashes `data` only: no header and no sequence number
    /// advance. It exists to equalize the hashing work of CBC records.
    pub fn compute(
        &mut self,
        content_type: u8,
        data: &[u8],
        sequence: Option<&[u8; 8]>,
        simulated: bool,
    ) -> Result<MacTag, Error> {
        let mut out = MacTag::new();
        if self.alg.size() == 0 {
            return Ok(out);
        }

        let header = if simulated {
            Default::default()
        } else {
            self.authenticator
                .acquire_authentication_bytes(content_type, data.len(), sequence)?
        };

        match &self.keyed {
            Keyed::Null => {}
            Keyed::HmacMd5(m) => out.extend_from_slice(&hmac_parts(m, &header, data)),
            Keyed::HmacSha1(m) => out.extend_from_slice(&hmac_parts(m, &header, data)),
            Keyed::HmacSha256(m) => out.extend_from_slice(&hmac_parts(m, &header, data)),
            Keyed::HmacSha384(m) => out.extend_from_slice(&hmac_parts(m, &header, data)),
            Keyed::Ssl3Md5(key) => {
                out.extend_from_slice(&ssl3_mac::<Md5>(key, 48, &header, data));
            }
            Keyed::Ssl3Sha1(key) => {
                out.extend_from_slice(&ssl3_mac::<Sha1>(key, 40, &header, data));
            }
        }
        Ok(out)
    }
}

impl std::fmt::Debug for RecordMac {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordMac")
            .field("alg", &self.alg)
            .field("version", &self.authenticator.version())
            .finish()
    }
}

fn hmac_parts<M: Mac + Clone>(mac: &M, header: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = mac.clone();
    mac.update(header);
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

// hash(secret || pad2 || hash(secret || pad1 || header || data))
fn ssl3_mac<D: Digest>(secret: &[u8], pad_len: usize, header: &[u8], data: &[u8]) -> Vec<u8> {
    let pad1 = [0x36u8; 48];
    let pad2 = [0x5Cu8; 48];

    let mut inner = D::new();
    inner.update(secret);
    inner.update(&pad1[..pad_len]);
    inner.update(header);
    inner.update(data);
    let inner = inner.finalize();

    let mut outer = D::new();
    outer.update(secret);
    outer.update(&pad2[..pad_len]);
    outer.update(&inner);
    outer.finalize().to_vec()
}

/// Outcome of a tag comparison that never stops early.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TagCheck {
    pub mismatched: usize,
    pub matched: usize,
}

impl TagCheck {
    pub fn is_ok(&self) -> bool {
        self.mismatched == 0
    }

    /// Number of bytes compared.
    pub fn iterations(&self) -> usize {
        self.mismatched + self.matched
    }
}

/// Compare every byte of `expected` with `received`.
///
/// Always walks the full length of `expected`; bytes missing from
/// `received` count as mismatches.
pub fn compare_mac_tags(received: &[u8], expected: &[u8]) -> TagCheck {
    let mut check = TagCheck::default();
    for (i, t) in expected.iter().enumerate() {
        if received.get(i) != Some(t) {
            check.mismatched += 1;
        } else {
            check.matched += 1;
        }
    }
    check
}

/// Length of the dummy buffer a CBC receiver MACs after the real check.
///
/// Makes the number of hash compression rounds independent of how much
/// padding was stripped. `full_len` is the ciphertext length, `used_len`
/// the length actually MACed; `full_len >= used_len`.
pub fn calculate_remaining_len(alg: MacAlg, full_len: usize, used_len: usize) -> usize {
    let block_len = alg.hash_block_size() as i64;
    let adjust = 13 - (block_len - alg.minimal_padding_size() as i64);

    let full = full_len as i64 + adjust;
    let used = used_len as i64 + adjust;

    let blocks = ceil_div(full, block_len) - ceil_div(used, block_len);
    (1 + blocks * block_len) as usize
}

fn ceil_div(a: i64, b: i64) -> i64 {
    (a + b - 1).div_euclid(b)
}
