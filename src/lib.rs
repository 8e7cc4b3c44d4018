//! recseal
//!
//! TLS and DTLS record protection plus server side ClientHello negotiation.
//!
//! Two halves:
//!
//! * [`record`]: per-direction ciphers that protect and unprotect record
//!   fragments. Null, RC4 stream, CBC block (TLS 1.0 implicit IV and TLS 1.1+
//!   explicit IV), AES-GCM and ChaCha20-Poly1305 in both the TLS 1.2 and the
//!   TLS 1.3 record layouts. CBC decryption runs in constant time with
//!   respect to padding (Lucky 13), and TLS 1.3 keys carry a usage limit.
//! * [`ClientHelloDispatcher`]: negotiates the protocol version, routes a
//!   ClientHello to the TLS 1.2, TLS 1.3 or DTLS 1.2 flow, decides on
//!   resumption and picks a cipher suite.
//!
//! ```no_run
//! use std::sync::Arc;
//! use recseal::{ClientHelloDispatcher, Config, ConnectionState, NoSessions};
//!
//! # fn main() -> Result<(), recseal::Error> {
//! let config = Arc::new(Config::default());
//! let mut dispatcher = ClientHelloDispatcher::new(config, Arc::new(NoSessions));
//! dispatcher.start();
//!
//! # let body: &[u8] = &[];
//! let outcome = dispatcher.consume_message(&ConnectionState::default(), body)?;
//! println!("{:?}", outcome);
//! # Ok(())
//! # }
//! ```
#![forbid(unsafe_code)]
#![warn(clippy::all)]

mod config;
pub use config::{Config, ConfigBuilder};

mod cookie;
pub use cookie::{CookieManager, COOKIE_LEN};

pub mod crypto;

mod error;
pub use error::{Alert, Error};

mod key_limit;
pub use key_limit::{KeyLimits, KeyUsage, KeyUsageLimiter};

pub mod message;

mod negotiate;
pub use negotiate::{negotiate, negotiate_from_supported_versions};

pub mod record;

mod rng;
pub use rng::SeededRng;

mod server;
pub use server::{ClientHelloDispatcher, ConnectionState, ExtensionConsumer, ExtensionOutcome};
pub use server::{HandshakeState, IgnoreExtensions, NegotiationContext, Outcome};

mod session;
pub use session::{ClientAuthType, NoSessions, SessionHandle, SessionStore};

mod suite;
pub use suite::CipherSuite;

mod types;
pub use types::{ContentType, ProtocolVersion};
