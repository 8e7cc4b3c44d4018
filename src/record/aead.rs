//! AEAD records for TLS 1.2 and TLS 1.3.

use log::{debug, trace, warn};

use crate::crypto::{AeadCipher, Authenticator, BulkCipher, Nonce, Scheme, NONCE_LEN, TAG_LEN};
use crate::key_limit::{KeyUsage, KeyUsageLimiter};
use crate::types::ContentType;
use crate::Error;

use super::{Plaintext, ReadCipher, RecordKeys, WriteCipher};

/// Explicit nonce carried by TLS 1.2 GCM records.
const RECORD_IV_LEN: usize = 8;

/// How a TLS 1.2 record nonce is formed.
#[derive(Clone, Copy)]
enum NonceMode {
    /// GCM: `fixed_iv(4) || explicit(8)`, the explicit part sent on the wire.
    Explicit { fixed_iv: [u8; 4] },
    /// ChaCha20-Poly1305: `iv XOR sequence`.
    Xor { iv: [u8; NONCE_LEN] },
}

impl NonceMode {
    fn new(scheme: Scheme, iv: &[u8]) -> Result<Self, Error> {
        match (scheme, iv.len()) {
            (Scheme::T12Gcm, 4) => {
                let mut fixed_iv = [0u8; 4];
                fixed_iv.copy_from_slice(iv);
                Ok(NonceMode::Explicit { fixed_iv })
            }
            (Scheme::T12ChaCha, NONCE_LEN) => Ok(NonceMode::Xor { iv: xor_iv(iv) }),
            (scheme, n) => Err(Error::Crypto(format!(
                "Invalid IV length {} for {:?}",
                n, scheme
            ))),
        }
    }

    fn record_iv_len(&self) -> usize {
        match self {
            NonceMode::Explicit { .. } => RECORD_IV_LEN,
            NonceMode::Xor { .. } => 0,
        }
    }
}

impl std::fmt::Debug for NonceMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NonceMode::Explicit { .. } => f.write_str("Explicit"),
            NonceMode::Xor { .. } => f.write_str("Xor"),
        }
    }
}

fn xor_iv(iv: &[u8]) -> [u8; NONCE_LEN] {
    let mut out = [0u8; NONCE_LEN];
    out.copy_from_slice(iv);
    out
}

fn tls13_iv(iv: &[u8]) -> Result<[u8; NONCE_LEN], Error> {
    if iv.len() != NONCE_LEN {
        return Err(Error::Crypto(format!("Invalid TLS 1.3 IV length {}", iv.len())));
    }
    Ok(xor_iv(iv))
}

#[derive(Debug)]
pub(crate) struct Aead12ReadCipher {
    cipher: AeadCipher,
    nonce: NonceMode,
    authenticator: Authenticator,
}

impl Aead12ReadCipher {
    pub fn new(
        bulk: BulkCipher,
        scheme: Scheme,
        keys: &RecordKeys<'_>,
        authenticator: Authenticator,
    ) -> Result<Self, Error> {
        Ok(Aead12ReadCipher {
            cipher: AeadCipher::new(bulk.transformation(), keys.key)?,
            nonce: NonceMode::new(scheme, keys.iv)?,
            authenticator,
        })
    }
}

impl ReadCipher for Aead12ReadCipher {
    fn decrypt(
        &mut self,
        content_type: u8,
        buf: &mut [u8],
        sequence: Option<&[u8; 8]>,
    ) -> Result<Plaintext, Error> {
        let record_iv_len = self.nonce.record_iv_len();
        let too_short = match self.nonce {
            NonceMode::Explicit { .. } => buf.len() < record_iv_len + TAG_LEN,
            NonceMode::Xor { .. } => buf.len() <= TAG_LEN,
        };
        if too_short {
            return Err(Error::BadRecordMac);
        }

        let nonce = match &self.nonce {
            NonceMode::Explicit { fixed_iv } => Nonce::new(fixed_iv, &buf[..record_iv_len]),
            NonceMode::Xor { iv } => {
                let sn = sequence
                    .copied()
                    .unwrap_or_else(|| self.authenticator.sequence_number());
                Nonce::xor(iv, &sn)
            }
        };

        let end = buf.len() - TAG_LEN;
        let aad = self.authenticator.acquire_authentication_bytes(
            content_type,
            end - record_iv_len,
            sequence,
        )?;

        let (data, tag) = buf.split_at_mut(end);
        self.cipher
            .open(&nonce, &aad, &mut data[record_iv_len..], tag)?;

        Ok(Plaintext::new(content_type, record_iv_len..end))
    }

    fn estimate_fragment_size(&self, packet_size: usize, header_size: usize) -> usize {
        packet_size.saturating_sub(header_size + self.nonce.record_iv_len() + TAG_LEN)
    }
}

#[derive(Debug)]
pub(crate) struct Aead12WriteCipher {
    cipher: AeadCipher,
    nonce: NonceMode,
    authenticator: Authenticator,
}

impl Aead12WriteCipher {
    pub fn new(
        bulk: BulkCipher,
        scheme: Scheme,
        keys: &RecordKeys<'_>,
        authenticator: Authenticator,
    ) -> Result<Self, Error> {
        Ok(Aead12WriteCipher {
            cipher: AeadCipher::new(bulk.transformation(), keys.key)?,
            nonce: NonceMode::new(scheme, keys.iv)?,
            authenticator,
        })
    }
}

impl WriteCipher for Aead12WriteCipher {
    fn encrypt(&mut self, content_type: u8, buf: &mut Vec<u8>) -> Result<usize, Error> {
        // The sequence number doubles as the GCM explicit nonce, so it never
        // repeats under one key.
        let sn = self.authenticator.sequence_number();
        let nonce = match &self.nonce {
            NonceMode::Explicit { fixed_iv } => Nonce::new(fixed_iv, &sn),
            NonceMode::Xor { iv } => Nonce::xor(iv, &sn),
        };

        let aad = self
            .authenticator
            .acquire_authentication_bytes(content_type, buf.len(), None)?;
        let tag = self.cipher.seal(&nonce, &aad, buf)?;
        buf.extend_from_slice(&tag);

        if let NonceMode::Explicit { .. } = self.nonce {
            buf.splice(0..0, sn);
        }
        trace!("AEAD record out: seq {:02x?}, {} bytes", sn, buf.len());
        Ok(buf.len())
    }

    fn explicit_nonce_size(&self) -> usize {
        self.nonce.record_iv_len()
    }

    fn calculate_fragment_size(&self, packet_limit: usize, header_size: usize) -> usize {
        packet_limit.saturating_sub(header_size + self.nonce.record_iv_len() + TAG_LEN)
    }

    fn calculate_packet_size(&self, fragment_size: usize, header_size: usize) -> usize {
        fragment_size + header_size + self.nonce.record_iv_len() + TAG_LEN
    }
}

/// TLS 1.3 record protection, shared by AES-GCM and ChaCha20-Poly1305.
///
/// The real content type travels encrypted at the end of the plaintext. The
/// outer header always says application data.
#[derive(Debug)]
pub(crate) struct Aead13ReadCipher {
    cipher: AeadCipher,
    iv: [u8; NONCE_LEN],
    authenticator: Authenticator,
    limiter: KeyUsageLimiter,
}

impl Aead13ReadCipher {
    pub fn new(
        bulk: BulkCipher,
        keys: &RecordKeys<'_>,
        authenticator: Authenticator,
        limiter: KeyUsageLimiter,
    ) -> Result<Self, Error> {
        Ok(Aead13ReadCipher {
            cipher: AeadCipher::new(bulk.transformation(), keys.key)?,
            iv: tls13_iv(keys.iv)?,
            authenticator,
            limiter,
        })
    }
}

impl ReadCipher for Aead13ReadCipher {
    fn decrypt(
        &mut self,
        content_type: u8,
        buf: &mut [u8],
        sequence: Option<&[u8; 8]>,
    ) -> Result<Plaintext, Error> {
        // Middlebox compatibility records are never protected.
        if content_type == ContentType::ChangeCipherSpec.as_u8() {
            return Ok(Plaintext::new(content_type, 0..buf.len()));
        }

        if buf.len() <= TAG_LEN {
            return Err(Error::BadRecordMac);
        }

        let sn = sequence
            .copied()
            .unwrap_or_else(|| self.authenticator.sequence_number());
        let nonce = Nonce::xor(&self.iv, &sn);
        let aad = self
            .authenticator
            .acquire_authentication_bytes(content_type, buf.len(), Some(&sn))?;

        let end = buf.len() - TAG_LEN;
        let (data, tag) = buf.split_at_mut(end);
        self.cipher.open(&nonce, &aad, data, tag)?;

        // Strip zero padding, the last non-zero byte is the content type.
        let Some(type_at) = data.iter().rposition(|b| *b != 0) else {
            return Err(Error::BadRecordMac);
        };
        let inner_type = data[type_at];

        if self.limiter.charge(end) == KeyUsage::RekeyRequired {
            debug!("Read key usage limit reached");
        }

        Ok(Plaintext::new(inner_type, 0..type_at))
    }

    fn estimate_fragment_size(&self, packet_size: usize, header_size: usize) -> usize {
        packet_size.saturating_sub(header_size + TAG_LEN)
    }

    fn at_key_limit(&self) -> bool {
        self.limiter.at_limit()
    }
}

#[derive(Debug)]
pub(crate) struct Aead13WriteCipher {
    cipher: AeadCipher,
    iv: [u8; NONCE_LEN],
    authenticator: Authenticator,
    limiter: KeyUsageLimiter,
}

impl Aead13WriteCipher {
    pub fn new(
        bulk: BulkCipher,
        keys: &RecordKeys<'_>,
        authenticator: Authenticator,
        limiter: KeyUsageLimiter,
    ) -> Result<Self, Error> {
        Ok(Aead13WriteCipher {
            cipher: AeadCipher::new(bulk.transformation(), keys.key)?,
            iv: tls13_iv(keys.iv)?,
            authenticator,
            limiter,
        })
    }
}

impl WriteCipher for Aead13WriteCipher {
    fn encrypt(&mut self, content_type: u8, buf: &mut Vec<u8>) -> Result<usize, Error> {
        buf.push(content_type);

        let sn = self.authenticator.sequence_number();
        let nonce = Nonce::xor(&self.iv, &sn);
        let output_len = buf.len() + TAG_LEN;
        let aad = self.authenticator.acquire_authentication_bytes(
            ContentType::ApplicationData.as_u8(),
            output_len,
            Some(&sn),
        )?;

        let tag = self.cipher.seal(&nonce, &aad, buf)?;
        buf.extend_from_slice(&tag);

        if self.limiter.charge(output_len) == KeyUsage::RekeyRequired {
            warn!("Write key usage limit reached, key update needed");
        }
        Ok(output_len)
    }

    fn explicit_nonce_size(&self) -> usize {
        0
    }

    fn calculate_fragment_size(&self, packet_limit: usize, header_size: usize) -> usize {
        packet_limit.saturating_sub(header_size + TAG_LEN)
    }

    fn calculate_packet_size(&self, fragment_size: usize, header_size: usize) -> usize {
        fragment_size + header_size + TAG_LEN
    }

    fn at_key_limit(&self) -> bool {
        self.limiter.at_limit()
    }
}
