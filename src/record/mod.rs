//! Record protection.
//!
//! A [`ReadCipher`] or [`WriteCipher`] protects one direction of one epoch.
//! They are built by [`create_read_cipher`] and [`create_write_cipher`] from
//! a cipher suite and the protocol version; the same suite maps to different
//! record schemes across versions.

use std::fmt;
use std::ops::Range;

use log::debug;

use crate::crypto::{Authenticator, MacAlg, RecordMac, Scheme};
use crate::key_limit::{KeyLimits, KeyUsageLimiter};
use crate::rng::SeededRng;
use crate::suite::CipherSuite;
use crate::types::ProtocolVersion;
use crate::Error;

mod aead;
mod block;
mod null;
mod stream;

use aead::{Aead12ReadCipher, Aead12WriteCipher, Aead13ReadCipher, Aead13WriteCipher};
use block::{BlockReadCipher, BlockWriteCipher};
use null::{NullReadCipher, NullWriteCipher};
use stream::{StreamReadCipher, StreamWriteCipher};

/// A decrypted record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plaintext {
    pub content_type: u8,
    /// Version markers. Always the [`ProtocolVersion::None`] bytes here.
    pub major: u8,
    pub minor: u8,
    /// The plaintext inside the buffer handed to `decrypt`.
    pub fragment: Range<usize>,
}

impl Plaintext {
    fn new(content_type: u8, fragment: Range<usize>) -> Self {
        Plaintext {
            content_type,
            major: ProtocolVersion::None.major(),
            minor: ProtocolVersion::None.minor(),
            fragment,
        }
    }
}

pub trait ReadCipher: fmt::Debug + Send {
    /// Decrypt and authenticate the record fragment in `buf`, in place.
    ///
    /// `sequence` overrides the implicit sequence number (DTLS). Any
    /// failure caused by the record contents is [`Error::BadRecordMac`].
    fn decrypt(
        &mut self,
        content_type: u8,
        buf: &mut [u8],
        sequence: Option<&[u8; 8]>,
    ) -> Result<Plaintext, Error>;

    /// Largest plaintext a packet of `packet_size` can carry.
    fn estimate_fragment_size(&self, packet_size: usize, header_size: usize) -> usize;

    fn is_null_cipher(&self) -> bool {
        false
    }

    /// Whether the key went past its usage limit.
    fn at_key_limit(&self) -> bool {
        false
    }
}

pub trait WriteCipher: fmt::Debug + Send {
    /// Protect the plaintext fragment in `buf`, replacing it with the record
    /// fragment. Returns the fragment length.
    fn encrypt(&mut self, content_type: u8, buf: &mut Vec<u8>) -> Result<usize, Error>;

    /// Bytes sent in front of the ciphertext.
    fn explicit_nonce_size(&self) -> usize;

    /// Largest plaintext that fits in `packet_limit`.
    fn calculate_fragment_size(&self, packet_limit: usize, header_size: usize) -> usize;

    /// Packet size needed for a plaintext of `fragment_size`.
    fn calculate_packet_size(&self, fragment_size: usize, header_size: usize) -> usize;

    fn is_cbc_mode(&self) -> bool {
        false
    }

    fn is_null_cipher(&self) -> bool {
        false
    }

    fn at_key_limit(&self) -> bool {
        false
    }
}

/// Key material for one direction.
#[derive(Clone, Copy)]
pub struct RecordKeys<'a> {
    pub key: &'a [u8],
    /// CBC IV (TLS 1.0), AEAD fixed IV or full TLS 1.3 IV.
    pub iv: &'a [u8],
    pub mac_key: &'a [u8],
}

impl<'a> RecordKeys<'a> {
    pub fn new(key: &'a [u8], iv: &'a [u8], mac_key: &'a [u8]) -> Self {
        RecordKeys { key, iv, mac_key }
    }
}

impl fmt::Debug for RecordKeys<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordKeys")
            .field("key_len", &self.key.len())
            .field("iv_len", &self.iv.len())
            .field("mac_key_len", &self.mac_key.len())
            .finish()
    }
}

fn scheme_for(suite: &CipherSuite, version: ProtocolVersion) -> Result<Scheme, Error> {
    suite.bulk.scheme(version).ok_or_else(|| {
        Error::Unsupported(format!("{} is not supported with {}", suite.name, version))
    })
}

fn check_key(suite: &CipherSuite, keys: &RecordKeys<'_>) -> Result<(), Error> {
    if keys.key.len() != suite.bulk.key_size() {
        return Err(Error::Crypto(format!(
            "{} needs a {} byte key, got {}",
            suite.bulk,
            suite.bulk.key_size(),
            keys.key.len()
        )));
    }
    Ok(())
}

fn limiter_for(suite: &CipherSuite, scheme: Scheme, limits: &KeyLimits) -> KeyUsageLimiter {
    if scheme != Scheme::T13Aead {
        return KeyUsageLimiter::disabled();
    }
    let limit = limits.key_update_limit(suite.bulk.transformation());
    debug!(
        "Key limit for {}:KEYUPDATE countdown value = {}",
        suite.bulk.transformation(),
        limit
    );
    KeyUsageLimiter::new(limit)
}

/// Build the read side cipher for `suite` under `authenticator`'s version.
pub fn create_read_cipher(
    suite: &CipherSuite,
    authenticator: Authenticator,
    keys: &RecordKeys<'_>,
    limits: &KeyLimits,
) -> Result<Box<dyn ReadCipher>, Error> {
    let version = authenticator.version();
    let scheme = scheme_for(suite, version)?;
    check_key(suite, keys)?;
    debug!("Read cipher {} {:?} for {}", suite.name, scheme, version);

    let cipher: Box<dyn ReadCipher> = match scheme {
        Scheme::Null => Box::new(NullReadCipher::new(RecordMac::new(
            suite.mac,
            keys.mac_key,
            authenticator,
        )?)),
        Scheme::Stream => Box::new(StreamReadCipher::new(
            keys.key,
            RecordMac::new(suite.mac, keys.mac_key, authenticator)?,
        )?),
        Scheme::T10Block | Scheme::T11Block => Box::new(BlockReadCipher::new(
            suite.bulk,
            scheme == Scheme::T11Block,
            keys,
            RecordMac::new(suite.mac, keys.mac_key, authenticator)?,
        )?),
        Scheme::T12Gcm | Scheme::T12ChaCha => Box::new(Aead12ReadCipher::new(
            suite.bulk,
            scheme,
            keys,
            authenticator,
        )?),
        Scheme::T13Aead => Box::new(Aead13ReadCipher::new(
            suite.bulk,
            keys,
            authenticator,
            limiter_for(suite, scheme, limits),
        )?),
    };
    Ok(cipher)
}

/// Build the write side cipher for `suite` under `authenticator`'s version.
///
/// `rng` supplies explicit CBC IVs.
pub fn create_write_cipher(
    suite: &CipherSuite,
    authenticator: Authenticator,
    keys: &RecordKeys<'_>,
    limits: &KeyLimits,
    rng: SeededRng,
) -> Result<Box<dyn WriteCipher>, Error> {
    let version = authenticator.version();
    let scheme = scheme_for(suite, version)?;
    check_key(suite, keys)?;
    debug!("Write cipher {} {:?} for {}", suite.name, scheme, version);

    let cipher: Box<dyn WriteCipher> = match scheme {
        Scheme::Null => Box::new(NullWriteCipher::new(RecordMac::new(
            suite.mac,
            keys.mac_key,
            authenticator,
        )?)),
        Scheme::Stream => Box::new(StreamWriteCipher::new(
            keys.key,
            RecordMac::new(suite.mac, keys.mac_key, authenticator)?,
        )?),
        Scheme::T10Block | Scheme::T11Block => Box::new(BlockWriteCipher::new(
            suite.bulk,
            scheme == Scheme::T11Block,
            keys,
            RecordMac::new(suite.mac, keys.mac_key, authenticator)?,
            rng,
        )?),
        Scheme::T12Gcm | Scheme::T12ChaCha => Box::new(Aead12WriteCipher::new(
            suite.bulk,
            scheme,
            keys,
            authenticator,
        )?),
        Scheme::T13Aead => Box::new(Aead13WriteCipher::new(
            suite.bulk,
            keys,
            authenticator,
            limiter_for(suite, scheme, limits),
        )?),
    };
    Ok(cipher)
}

/// The unprotected read cipher used before the first key change.
pub fn null_read_cipher(version: ProtocolVersion) -> Box<dyn ReadCipher> {
    Box::new(NullReadCipher::unprotected(Authenticator::new(version)))
}

/// The unprotected write cipher used before the first key change.
pub fn null_write_cipher(version: ProtocolVersion) -> Box<dyn WriteCipher> {
    Box::new(NullWriteCipher::unprotected(Authenticator::new(version)))
}

/// Append the MAC of `buf`, or just count the record when there is none.
fn add_mac(mac: &mut RecordMac, content_type: u8, buf: &mut Vec<u8>) -> Result<(), Error> {
    if mac.alg() == MacAlg::Null {
        mac.authenticator_mut().increase_sequence_number();
        return Ok(());
    }
    let tag = mac.compute(content_type, buf, None, false)?;
    buf.extend_from_slice(&tag);
    Ok(())
}

/// Verify the trailing MAC of a null or stream record.
///
/// Returns the content length.
fn check_stream_mac(
    mac: &mut RecordMac,
    content_type: u8,
    buf: &[u8],
    sequence: Option<&[u8; 8]>,
) -> Result<usize, Error> {
    let tag_len = mac.alg().size();
    if tag_len == 0 {
        mac.authenticator_mut().increase_sequence_number();
        return Ok(buf.len());
    }

    let Some(content_len) = buf.len().checked_sub(tag_len) else {
        return Err(Error::BadRecordMac);
    };

    let (content, received) = buf.split_at(content_len);
    let expected = mac.compute(content_type, content, sequence, false)?;
    if !crate::crypto::compare_mac_tags(received, &expected).is_ok() {
        return Err(Error::BadRecordMac);
    }
    Ok(content_len)
}
