//! AEAD engines, used with detached tags so records can be opened in place.

use aes_gcm::aead::generic_array::GenericArray;
use aes_gcm::aead::AeadInPlace;
use aes_gcm::{Aes128Gcm, Aes256Gcm, KeyInit};
use chacha20poly1305::ChaCha20Poly1305;

use crate::Error;

/// Tag length of every supported AEAD.
pub const TAG_LEN: usize = 16;

/// Nonce length of every supported AEAD.
pub const NONCE_LEN: usize = 12;

/// Full per-record AEAD nonce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Nonce(pub [u8; NONCE_LEN]);

impl Nonce {
    /// TLS 1.2 GCM: 4 byte fixed IV followed by the 8 byte explicit nonce.
    pub fn new(fixed_iv: &[u8], explicit_nonce: &[u8]) -> Self {
        let mut nonce = [0u8; NONCE_LEN];
        nonce[..4].copy_from_slice(&fixed_iv[..4]);
        nonce[4..].copy_from_slice(&explicit_nonce[..8]);
        Self(nonce)
    }

    /// `iv XOR pad_left(seq, 12)`, used by ChaCha20-Poly1305 and TLS 1.3.
    pub fn xor(iv: &[u8], seq: &[u8; 8]) -> Self {
        let mut nonce = [0u8; NONCE_LEN];
        nonce.copy_from_slice(&iv[..NONCE_LEN]);
        for (n, s) in nonce[4..].iter_mut().zip(seq.iter()) {
            *n ^= s;
        }
        Self(nonce)
    }
}

enum Engine {
    Aes128Gcm(Box<Aes128Gcm>),
    Aes256Gcm(Box<Aes256Gcm>),
    ChaCha20Poly1305(Box<ChaCha20Poly1305>),
}

pub struct AeadCipher(Engine);

impl AeadCipher {
    pub fn new(transformation: &str, key: &[u8]) -> Result<Self, Error> {
        let bad_key = |_| Error::Crypto(format!("Invalid key size for {}: {}", transformation, key.len()));

        let engine = match (transformation, key.len()) {
            ("AES/GCM/NoPadding", 16) => {
                Engine::Aes128Gcm(Box::new(Aes128Gcm::new_from_slice(key).map_err(bad_key)?))
            }
            ("AES/GCM/NoPadding", 32) => {
                Engine::Aes256Gcm(Box::new(Aes256Gcm::new_from_slice(key).map_err(bad_key)?))
            }
            ("ChaCha20-Poly1305", 32) => Engine::ChaCha20Poly1305(Box::new(
                ChaCha20Poly1305::new_from_slice(key).map_err(bad_key)?,
            )),
            (t, n) => {
                return Err(Error::Crypto(format!(
                    "No AEAD engine for {} with {} byte key",
                    t, n
                )))
            }
        };

        Ok(AeadCipher(engine))
    }

    /// Encrypt `data` in place and return the tag.
    pub fn seal(&self, nonce: &Nonce, aad: &[u8], data: &mut [u8]) -> Result<[u8; TAG_LEN], Error> {
        let n = GenericArray::from_slice(&nonce.0);
        let tag = match &self.0 {
            Engine::Aes128Gcm(c) => c.encrypt_in_place_detached(n, aad, data),
            Engine::Aes256Gcm(c) => c.encrypt_in_place_detached(n, aad, data),
            Engine::ChaCha20Poly1305(c) => c.encrypt_in_place_detached(n, aad, data),
        }
        .map_err(|_| Error::Crypto("AEAD encryption failed".into()))?;

        let mut out = [0u8; TAG_LEN];
        out.copy_from_slice(&tag);
        Ok(out)
    }

    /// Decrypt `data` in place, authenticating against `tag`.
    ///
    /// Any failure is reported as [`Error::BadRecordMac`].
    pub fn open(&self, nonce: &Nonce, aad: &[u8], data: &mut [u8], tag: &[u8]) -> Result<(), Error> {
        if tag.len() != TAG_LEN {
            return Err(Error::BadRecordMac);
        }
        let n = GenericArray::from_slice(&nonce.0);
        let t = GenericArray::from_slice(tag);
        match &self.0 {
            Engine::Aes128Gcm(c) => c.decrypt_in_place_detached(n, aad, data, t),
            Engine::Aes256Gcm(c) => c.decrypt_in_place_detached(n, aad, data, t),
            Engine::ChaCha20Poly1305(c) => c.decrypt_in_place_detached(n, aad, data, t),
        }
        .map_err(|_| Error::BadRecordMac)
    }
}

impl std::fmt::Debug for AeadCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.0 {
            Engine::Aes128Gcm(_) => f.debug_tuple("AeadCipher::Aes128Gcm").finish(),
            Engine::Aes256Gcm(_) => f.debug_tuple("AeadCipher::Aes256Gcm").finish(),
            Engine::ChaCha20Poly1305(_) => f.debug_tuple("AeadCipher::ChaCha20Poly1305").finish(),
        }
    }
}
