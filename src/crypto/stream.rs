use rc4::consts::U16;
use rc4::{KeyInit, Rc4, StreamCipher};

use crate::Error;

/// RC4 with a 128-bit key. The keystream runs across records.
pub struct Rc4Cipher(Box<Rc4<U16>>);

impl Rc4Cipher {
    pub fn new(key: &[u8]) -> Result<Self, Error> {
        let rc4 = Rc4::<U16>::new_from_slice(key)
            .map_err(|_| Error::Crypto(format!("Invalid RC4 key length: {}", key.len())))?;
        Ok(Rc4Cipher(Box::new(rc4)))
    }

    /// Encrypt or decrypt in place.
    pub fn apply(&mut self, data: &mut [u8]) {
        self.0.apply_keystream(data);
    }
}

impl std::fmt::Debug for Rc4Cipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Rc4Cipher").finish()
    }
}
