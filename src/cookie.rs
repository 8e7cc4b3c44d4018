//! Stateless DTLS cookies.
//!
//! The cookie is an HMAC-SHA256 over the ClientHello without its cookie
//! field. A client that echoes it proves it can receive at its claimed
//! address, and the server keeps no state between the two hellos.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use crate::message::{ClientHello, Cookie};

/// Cookie length, the full HMAC-SHA256 output.
pub const COOKIE_LEN: usize = 32;

pub struct CookieManager {
    secret: Zeroizing<[u8; 32]>,
}

impl CookieManager {
    pub fn new(secret: [u8; 32]) -> Self {
        CookieManager {
            secret: Zeroizing::new(secret),
        }
    }

    /// The cookie to send in a HelloVerifyRequest for `hello`.
    pub fn make_cookie(&self, hello: &ClientHello) -> Cookie {
        let tag = self.tag(hello);
        // 32 bytes always fit the 255 byte cookie field.
        Cookie::try_new(&tag[..COOKIE_LEN]).expect("cookie length")
    }

    /// Whether `hello` echoes the cookie we would have issued for it.
    pub fn is_cookie_valid(&self, hello: &ClientHello) -> bool {
        let Some(cookie) = &hello.cookie else {
            return false;
        };
        if cookie.len() != COOKIE_LEN {
            return false;
        }
        let expected = self.tag(hello);
        bool::from(cookie[..].ct_eq(&expected[..COOKIE_LEN]))
    }

    fn tag(&self, hello: &ClientHello) -> [u8; 32] {
        // HMAC accepts keys of any length.
        let mut mac =
            <Hmac<Sha256> as Mac>::new_from_slice(&self.secret[..]).expect("hmac key");
        mac.update(&hello.cookie_bytes());
        mac.finalize().into_bytes().into()
    }
}

impl std::fmt::Debug for CookieManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CookieManager").finish_non_exhaustive()
    }
}
