//! What the dispatcher needs to know about stored sessions.
//!
//! Storage itself lives outside this crate. The dispatcher only reads
//! sessions through [`SessionStore`].

use std::fmt;
use std::sync::Arc;

use crate::types::ProtocolVersion;

/// Whether the server asks for a client certificate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ClientAuthType {
    #[default]
    None,
    Requested,
    Required,
}

/// A previously established session.
pub trait SessionHandle: fmt::Debug + Send + Sync {
    fn protocol_version(&self) -> ProtocolVersion;

    /// Id of the cipher suite the session was established with.
    fn cipher_suite(&self) -> u16;

    /// Whether the session may be resumed at all.
    fn is_rejoinable(&self) -> bool;

    /// Whether the peer authenticated with a certificate.
    fn peer_identity_verified(&self) -> bool;

    /// Endpoint identification algorithm the session was checked with.
    fn identification_protocol(&self) -> Option<&str>;
}

/// Read-only access to the session cache and ticket decryption.
pub trait SessionStore: fmt::Debug + Send + Sync {
    /// Look a session up by the id sent in a ClientHello.
    fn get_session(&self, id: &[u8]) -> Option<Arc<dyn SessionHandle>>;

    /// Recover a session from a stateless resumption ticket.
    fn get_resuming_session(&self, ticket: &[u8]) -> Option<Arc<dyn SessionHandle>>;
}

/// A store that never finds anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoSessions;

impl SessionStore for NoSessions {
    fn get_session(&self, _id: &[u8]) -> Option<Arc<dyn SessionHandle>> {
        None
    }

    fn get_resuming_session(&self, _ticket: &[u8]) -> Option<Arc<dyn SessionHandle>> {
        None
    }
}
