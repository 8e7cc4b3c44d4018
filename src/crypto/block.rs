//! CBC chaining over the RustCrypto block ciphers.
//!
//! The chaining value carries over between records, which is what TLS 1.0
//! and SSL 3.0 expect. Explicit IV modes feed the per-record IV as the
//! first block instead.

use aes::cipher::generic_array::GenericArray;
use aes::cipher::{BlockDecrypt, BlockEncrypt, KeyInit};
use aes::{Aes128, Aes256};
use des::{Des, TdesEde3};
use zeroize::Zeroize;

use crate::Error;

enum Engine {
    Des(Box<Des>),
    TdesEde3(Box<TdesEde3>),
    Aes128(Box<Aes128>),
    Aes256(Box<Aes256>),
}

/// A block cipher in CBC mode with its running chaining value.
pub struct CbcCipher {
    engine: Engine,
    iv: [u8; 16],
    block_size: usize,
}

impl CbcCipher {
    /// Create a CBC cipher for `transformation`.
    ///
    /// The engine is chosen by transformation name and key length, a
    /// missing `iv` starts the chain at zero.
    pub fn new(transformation: &str, key: &[u8], iv: Option<&[u8]>) -> Result<Self, Error> {
        fn init<C: KeyInit>(key: &[u8]) -> Result<Box<C>, Error> {
            C::new_from_slice(key)
                .map(Box::new)
                .map_err(|_| Error::Crypto(format!("Invalid key length: {}", key.len())))
        }

        let engine = match (transformation, key.len()) {
            ("DES/CBC/NoPadding", 8) => Engine::Des(init(key)?),
            ("DESede/CBC/NoPadding", 24) => Engine::TdesEde3(init(key)?),
            ("AES/CBC/NoPadding", 16) => Engine::Aes128(init(key)?),
            ("AES/CBC/NoPadding", 32) => Engine::Aes256(init(key)?),
            (t, n) => {
                return Err(Error::Crypto(format!(
                    "No CBC engine for {} with {} byte key",
                    t, n
                )))
            }
        };

        let block_size = match engine {
            Engine::Des(_) | Engine::TdesEde3(_) => 8,
            Engine::Aes128(_) | Engine::Aes256(_) => 16,
        };

        let mut chain = [0u8; 16];
        if let Some(iv) = iv {
            if iv.len() != block_size {
                return Err(Error::Crypto(format!(
                    "IV length {} does not match block size {}",
                    iv.len(),
                    block_size
                )));
            }
            chain[..block_size].copy_from_slice(iv);
        }

        Ok(CbcCipher {
            engine,
            iv: chain,
            block_size,
        })
    }

    #[inline(always)]
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Replace the chaining value.
    pub fn set_iv(&mut self, iv: &[u8]) {
        self.iv[..self.block_size].copy_from_slice(iv);
    }

    /// Encrypt `data` in place. `data.len()` must be a multiple of the block size.
    pub fn encrypt(&mut self, data: &mut [u8]) -> Result<(), Error> {
        self.check_len(data.len())?;
        let iv = &mut self.iv[..self.block_size];
        match &self.engine {
            Engine::Des(c) => cbc_encrypt(c.as_ref(), iv, data),
            Engine::TdesEde3(c) => cbc_encrypt(c.as_ref(), iv, data),
            Engine::Aes128(c) => cbc_encrypt(c.as_ref(), iv, data),
            Engine::Aes256(c) => cbc_encrypt(c.as_ref(), iv, data),
        }
        Ok(())
    }

    /// Decrypt `data` in place. `data.len()` must be a multiple of the block size.
    pub fn decrypt(&mut self, data: &mut [u8]) -> Result<(), Error> {
        self.check_len(data.len())?;
        let iv = &mut self.iv[..self.block_size];
        match &self.engine {
            Engine::Des(c) => cbc_decrypt(c.as_ref(), iv, data),
            Engine::TdesEde3(c) => cbc_decrypt(c.as_ref(), iv, data),
            Engine::Aes128(c) => cbc_decrypt(c.as_ref(), iv, data),
            Engine::Aes256(c) => cbc_decrypt(c.as_ref(), iv, data),
        }
        Ok(())
    }

    fn check_len(&self, len: usize) -> Result<(), Error> {
        if len % self.block_size != 0 {
            return Err(Error::Crypto(format!(
                "Input length {} not a multiple of block size {}",
                len, self.block_size
            )));
        }
        Ok(())
    }
}

impl Drop for CbcCipher {
    fn drop(&mut self) {
        self.iv.zeroize();
    }
}

impl std::fmt::Debug for CbcCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self.engine {
            Engine::Des(_) => "DES",
            Engine::TdesEde3(_) => "DESede",
            Engine::Aes128(_) => "AES-128",
            Engine::Aes256(_) => "AES-256",
        };
        f.debug_tuple("CbcCipher").field(&name).finish()
    }
}

fn cbc_encrypt<C: BlockEncrypt>(cipher: &C, iv: &mut [u8], data: &mut [u8]) {
    let bs = iv.len();
    for block in data.chunks_exact_mut(bs) {
        block.iter_mut().zip(iv.iter()).for_each(|(b, v)| *b ^= v);
        cipher.encrypt_block(GenericArray::from_mut_slice(block));
        iv.copy_from_slice(block);
    }
}

fn cbc_decrypt<C: BlockDecrypt>(cipher: &C, iv: &mut [u8], data: &mut [u8]) {
    let bs = iv.len();
    let mut saved = [0u8; 16];
    for block in data.chunks_exact_mut(bs) {
        saved[..bs].copy_from_slice(block);
        cipher.decrypt_block(GenericArray::from_mut_slice(block));
        block.iter_mut().zip(iv.iter()).for_each(|(b, v)| *b ^= v);
        iv.copy_from_slice(&saved[..bs]);
    }
}
