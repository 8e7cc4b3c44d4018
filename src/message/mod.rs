//! Handshake message decoding for the ClientHello path.

mod client_hello;
pub use client_hello::ClientHello;

mod extension;
pub use extension::{parse_supported_versions, serialize_supported_versions};
pub use extension::{Extension, ExtensionType};

mod id;
pub use id::{Cookie, Random, SessionId};
