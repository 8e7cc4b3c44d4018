//! Shared helpers for the ClientHello dispatch tests.
//!
//! This file has no `#[test]` functions; Cargo compiles it as a no-op binary.
//! Import it from other test files via `mod hello_common;`.

#![allow(unused)]

use std::sync::Arc;

use recseal::message::{serialize_supported_versions, ClientHello, Extension, ExtensionType};
use recseal::message::{Random, SessionId};
use recseal::{ProtocolVersion, SessionHandle, SessionStore};

pub const SESSION_ID: [u8; 32] = [0x5A; 32];
pub const TICKET: &[u8] = b"opaque ticket";

pub fn random() -> Random {
    let mut r = [0u8; 32];
    for (i, b) in r.iter_mut().enumerate() {
        *b = i as u8;
    }
    Random(r)
}

pub fn tls_hello(version: u16, suites: &[u16]) -> ClientHello {
    ClientHello::new(version, random(), SessionId::empty(), suites.to_vec(), false)
}

pub fn dtls_hello(version: u16, suites: &[u16]) -> ClientHello {
    ClientHello::new(version, random(), SessionId::empty(), suites.to_vec(), true)
}

pub fn with_session_id(mut hello: ClientHello) -> ClientHello {
    hello.session_id = SessionId::try_new(&SESSION_ID).unwrap();
    hello
}

pub fn with_supported_versions(hello: ClientHello, versions: &[u16]) -> ClientHello {
    let data = serialize_supported_versions(versions);
    hello.with_extension(Extension::new(ExtensionType::SupportedVersions, &data))
}

pub fn with_ticket(hello: ClientHello) -> ClientHello {
    hello.with_extension(Extension::new(ExtensionType::SessionTicket, TICKET))
}

/// A TLS 1.3 hello as modern clients send it.
pub fn tls13_hello(suites: &[u16]) -> ClientHello {
    with_supported_versions(tls_hello(0x0303, suites), &[0x0304, 0x0303])
}

#[derive(Debug, Clone)]
pub struct TestSession {
    pub version: ProtocolVersion,
    pub suite: u16,
    pub rejoinable: bool,
    pub verified: bool,
    pub identification: Option<String>,
}

impl TestSession {
    pub fn new(version: ProtocolVersion, suite: u16) -> Self {
        TestSession {
            version,
            suite,
            rejoinable: true,
            verified: false,
            identification: None,
        }
    }
}

impl SessionHandle for TestSession {
    fn protocol_version(&self) -> ProtocolVersion {
        self.version
    }

    fn cipher_suite(&self) -> u16 {
        self.suite
    }

    fn is_rejoinable(&self) -> bool {
        self.rejoinable
    }

    fn peer_identity_verified(&self) -> bool {
        self.verified
    }

    fn identification_protocol(&self) -> Option<&str> {
        self.identification.as_deref()
    }
}

/// Holds at most one session by id and one by ticket.
#[derive(Debug, Default)]
pub struct TestStore {
    pub by_id: Option<Arc<TestSession>>,
    pub by_ticket: Option<Arc<TestSession>>,
}

impl TestStore {
    pub fn with_session(session: TestSession) -> Arc<Self> {
        Arc::new(TestStore {
            by_id: Some(Arc::new(session)),
            by_ticket: None,
        })
    }

    pub fn with_ticket(session: TestSession) -> Arc<Self> {
        Arc::new(TestStore {
            by_id: None,
            by_ticket: Some(Arc::new(session)),
        })
    }
}

impl SessionStore for TestStore {
    fn get_session(&self, id: &[u8]) -> Option<Arc<dyn SessionHandle>> {
        if id != SESSION_ID {
            return None;
        }
        let session = self.by_id.clone()?;
        Some(session)
    }

    fn get_resuming_session(&self, ticket: &[u8]) -> Option<Arc<dyn SessionHandle>> {
        if ticket != TICKET {
            return None;
        }
        let session = self.by_ticket.clone()?;
        Some(session)
    }
}
