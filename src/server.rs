//! Server side ClientHello processing.
//!
//! [`ClientHelloDispatcher`] negotiates the protocol version, routes the hello
//! to the TLS 1.2, TLS 1.3 or DTLS 1.2 flow, decides on session resumption and
//! picks the cipher suite. It produces an [`Outcome`] naming the next message
//! to send; building that message is up to the caller.
//!
//! ```text
//! Idle ─ start ─▶ AwaitingClientHello ─ consume ─┬─▶ T12Flow
//!                   ▲                            ├─▶ T13Flow
//!                   │  HelloVerifyRequest        ├─▶ D12Flow
//!                   └─ HelloRetryRequest ────────┘
//! ```

use std::fmt;
use std::sync::Arc;

use log::{debug, trace, warn};

use crate::config::Config;
use crate::cookie::CookieManager;
use crate::crypto::Authenticator;
use crate::message::{ClientHello, Cookie, Random};
use crate::negotiate::{negotiate, negotiate_from_supported_versions};
use crate::record::{create_read_cipher, create_write_cipher, ReadCipher, RecordKeys, WriteCipher};
use crate::rng::SeededRng;
use crate::session::{ClientAuthType, SessionHandle, SessionStore};
use crate::suite::CipherSuite;
use crate::types::ProtocolVersion;
use crate::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeState {
    Idle,
    AwaitingClientHello,
    T12Flow,
    T13Flow,
    D12Flow,
}

/// What the connection already established, supplied by the caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConnectionState {
    /// A handshake completed before, so this hello renegotiates.
    pub is_negotiated: bool,
    /// The previous handshake agreed on secure renegotiation.
    pub secure_renegotiation: bool,
    /// The server asked for this renegotiation with a HelloRequest.
    pub kickstart_delivered: bool,
    /// Handshake messages that arrived behind the ClientHello in one flight.
    pub queued_handshake_messages: usize,
}

/// Per-handshake negotiation results.
#[derive(Debug, Default)]
pub struct NegotiationContext {
    pub negotiated_protocol: Option<ProtocolVersion>,
    pub is_resumption: bool,
    pub resuming_session: Option<Arc<dyn SessionHandle>>,
    /// Enabled suites in server preference order.
    pub active_cipher_suites: Vec<&'static CipherSuite>,
    pub client_hello_random: Option<Random>,
    pub selected_suite: Option<&'static CipherSuite>,
    /// A HelloRetryRequest went out in this handshake.
    pub hello_retry_sent: bool,
}

/// The message the server sends next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    ServerHello {
        version: ProtocolVersion,
        suite: &'static CipherSuite,
        resumption: bool,
    },
    HelloRetryRequest {
        version: ProtocolVersion,
        suite: &'static CipherSuite,
    },
    HelloVerifyRequest {
        cookie: Cookie,
    },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExtensionOutcome {
    #[default]
    Proceed,
    /// Ask the client for a new hello. TLS 1.3 only, earlier flows fail
    /// the handshake.
    RetryRequest,
}

/// Hook for the extension handlers of the chosen flow.
pub trait ExtensionConsumer: fmt::Debug + Send {
    /// TLS 1.3 `psk_key_exchange_modes` and `pre_shared_key`.
    ///
    /// Returns the session the client's PSK resumes, once its binder checks
    /// out. `None` means a full handshake.
    fn consume_pre_shared_key(
        &mut self,
        _hello: &ClientHello,
        _context: &NegotiationContext,
    ) -> Result<Option<Arc<dyn SessionHandle>>, Error> {
        Ok(None)
    }

    /// All remaining extensions.
    fn consume_extensions(
        &mut self,
        _hello: &ClientHello,
        _context: &NegotiationContext,
    ) -> Result<ExtensionOutcome, Error> {
        Ok(ExtensionOutcome::Proceed)
    }
}

/// Accepts every hello as is and never resumes through a PSK.
#[derive(Debug, Default)]
pub struct IgnoreExtensions;

impl ExtensionConsumer for IgnoreExtensions {}

pub struct ClientHelloDispatcher {
    config: Arc<Config>,
    store: Arc<dyn SessionStore>,
    consumer: Box<dyn ExtensionConsumer>,
    cookies: CookieManager,
    state: HandshakeState,
    context: NegotiationContext,
}

impl ClientHelloDispatcher {
    pub fn new(config: Arc<Config>, store: Arc<dyn SessionStore>) -> Self {
        let cookies = CookieManager::new(*config.cookie_secret());
        ClientHelloDispatcher {
            config,
            store,
            consumer: Box::new(IgnoreExtensions),
            cookies,
            state: HandshakeState::Idle,
            context: NegotiationContext::default(),
        }
    }

    pub fn with_extension_consumer(mut self, consumer: Box<dyn ExtensionConsumer>) -> Self {
        self.consumer = consumer;
        self
    }

    #[inline(always)]
    pub fn state(&self) -> HandshakeState {
        self.state
    }

    #[inline(always)]
    pub fn context(&self) -> &NegotiationContext {
        &self.context
    }

    /// Begin a handshake, or a renegotiation after an earlier one.
    pub fn start(&mut self) {
        self.context = NegotiationContext {
            active_cipher_suites: self.config.active_cipher_suites(),
            ..Default::default()
        };
        self.state = HandshakeState::AwaitingClientHello;
        trace!(
            "Awaiting ClientHello, {} active cipher suites",
            self.context.active_cipher_suites.len()
        );
    }

    /// Decode a ClientHello body and [`consume`](Self::consume) it.
    pub fn consume_message(
        &mut self,
        connection: &ConnectionState,
        body: &[u8],
    ) -> Result<Outcome, Error> {
        let hello = ClientHello::parse(body, self.config.dtls())?;
        self.consume(connection, &hello)
    }

    pub fn consume(
        &mut self,
        connection: &ConnectionState,
        hello: &ClientHello,
    ) -> Result<Outcome, Error> {
        if self.state != HandshakeState::AwaitingClientHello {
            return Err(Error::UnexpectedMessage(format!(
                "ClientHello in state {:?}",
                self.state
            )));
        }
        if connection.queued_handshake_messages > 0 {
            return Err(Error::UnexpectedMessage(
                "No more handshake message allowed in a ClientHello flight".into(),
            ));
        }

        debug!(
            "Consuming ClientHello: version {}, {} cipher suites, {} extensions",
            ProtocolVersion::name_of(hello.client_version),
            hello.cipher_suites.len(),
            hello.extensions.len()
        );
        hello.check_compression()?;

        let active = self.config.active_protocols();
        let version = match hello.supported_versions()? {
            Some(offered) => negotiate_from_supported_versions(&offered, &active)?,
            None => negotiate(hello.client_version, &active, self.config.dtls())?,
        };
        debug!("Negotiated protocol version: {}", version);
        self.context.negotiated_protocol = Some(version);

        match (version.is_dtls(), version.uses_tls13_plus()) {
            (false, false) => self.consume_t12(connection, hello, version),
            (false, true) => self.consume_t13(connection, hello, version),
            (true, false) => self.consume_d12(connection, hello, version),
            (true, true) => Err(Error::Unsupported(format!(
                "{} ClientHello is not supported yet",
                version
            ))),
        }
    }

    fn consume_t12(
        &mut self,
        connection: &ConnectionState,
        hello: &ClientHello,
        version: ProtocolVersion,
    ) -> Result<Outcome, Error> {
        self.check_renegotiation(connection)?;

        let ticket = hello.session_ticket();
        if !hello.session_id.is_empty() || ticket.is_some() {
            let previous = self.find_session(hello, ticket);
            let resumed = self.check_resumption(previous, hello, version, true);
            self.set_resumption(resumed);
        }

        self.context.client_hello_random = Some(hello.random);
        self.consume_legacy_extensions(hello)?;

        self.go_server_hello(hello, version, HandshakeState::T12Flow)
    }

    fn consume_d12(
        &mut self,
        connection: &ConnectionState,
        hello: &ClientHello,
        version: ProtocolVersion,
    ) -> Result<Outcome, Error> {
        self.check_renegotiation(connection)?;

        if !hello.session_id.is_empty() {
            let previous = self.find_session(hello, hello.session_ticket());
            let resumed = self.check_resumption(previous, hello, version, false);
            self.set_resumption(resumed);
        }

        if !self.context.is_resumption || self.config.enable_dtls_resume_cookie() {
            if !self.cookies.is_cookie_valid(hello) {
                debug!("Missing or invalid cookie, sending HelloVerifyRequest");
                self.context.is_resumption = false;
                self.context.resuming_session = None;
                self.state = HandshakeState::AwaitingClientHello;
                return Ok(Outcome::HelloVerifyRequest {
                    cookie: self.cookies.make_cookie(hello),
                });
            }
        }

        self.context.client_hello_random = Some(hello.random);
        self.consume_legacy_extensions(hello)?;

        self.go_server_hello(hello, version, HandshakeState::D12Flow)
    }

    /// Extension consumption before TLS 1.3, where there is nothing to retry.
    fn consume_legacy_extensions(&mut self, hello: &ClientHello) -> Result<(), Error> {
        match self.consumer.consume_extensions(hello, &self.context)? {
            ExtensionOutcome::Proceed => Ok(()),
            ExtensionOutcome::RetryRequest => {
                warn!("Extension consumer asked for a HelloRetryRequest before TLS 1.3");
                Err(Error::HandshakeFailure(
                    "HelloRetryRequest is not defined before TLS 1.3".into(),
                ))
            }
        }
    }

    fn consume_t13(
        &mut self,
        connection: &ConnectionState,
        hello: &ClientHello,
        version: ProtocolVersion,
    ) -> Result<Outcome, Error> {
        if connection.is_negotiated {
            return Err(Error::UnexpectedMessage(
                "Received unexpected renegotiation handshake message".into(),
            ));
        }
        if hello.client_version != ProtocolVersion::Tls12.id() {
            return Err(Error::ProtocolVersion(
                "The ClientHello.legacy_version field is not TLS 1.2".into(),
            ));
        }

        // Assume resumption until the PSK handlers say otherwise.
        self.context.is_resumption = true;
        let resumed = self.consumer.consume_pre_shared_key(hello, &self.context)?;
        self.set_resumption(resumed);

        match self.consumer.consume_extensions(hello, &self.context)? {
            ExtensionOutcome::RetryRequest => {
                if self.context.hello_retry_sent {
                    return Err(Error::HandshakeFailure(
                        "No HelloRetryRequest allowed after the first one".into(),
                    ));
                }
                let suite = self.choose_suite(hello, version)?;
                self.context.hello_retry_sent = true;
                self.context.selected_suite = Some(suite);
                self.state = HandshakeState::AwaitingClientHello;
                debug!("Sending HelloRetryRequest with {}", suite);
                Ok(Outcome::HelloRetryRequest { version, suite })
            }
            ExtensionOutcome::Proceed => {
                self.context.client_hello_random = Some(hello.random);
                self.go_server_hello(hello, version, HandshakeState::T13Flow)
            }
        }
    }

    fn check_renegotiation(&self, connection: &ConnectionState) -> Result<(), Error> {
        if !connection.is_negotiated {
            return Ok(());
        }

        if !connection.secure_renegotiation && !self.config.allow_unsafe_renegotiation() {
            warn!("Refusing unsafe renegotiation");
            return Err(Error::HandshakeFailure(
                "Unsafe renegotiation is not allowed".into(),
            ));
        }

        if self.config.reject_client_initiated_renegotiation() && !connection.kickstart_delivered {
            warn!("Refusing client initiated renegotiation");
            return Err(Error::HandshakeFailure(
                "Client initiated renegotiation is not allowed".into(),
            ));
        }

        Ok(())
    }

    /// A ticket that decrypts wins over the session id.
    fn find_session(
        &self,
        hello: &ClientHello,
        ticket: Option<&[u8]>,
    ) -> Option<Arc<dyn SessionHandle>> {
        if let Some(session) = ticket.and_then(|t| self.store.get_resuming_session(t)) {
            trace!("Resuming from session ticket");
            return Some(session);
        }
        if hello.session_id.is_empty() {
            return None;
        }
        self.store.get_session(&hello.session_id)
    }

    /// Run the resumption checks in order, stopping at the first that fails.
    fn check_resumption(
        &self,
        previous: Option<Arc<dyn SessionHandle>>,
        hello: &ClientHello,
        version: ProtocolVersion,
        check_identification: bool,
    ) -> Option<Arc<dyn SessionHandle>> {
        let Some(previous) = previous.filter(|s| s.is_rejoinable()) else {
            debug!("Can't resume, the existing session is not rejoinable");
            return None;
        };

        if previous.protocol_version() != version {
            debug!("Can't resume, not the same protocol version");
            return None;
        }

        if self.config.client_auth() == ClientAuthType::Required
            && !previous.peer_identity_verified()
        {
            debug!("Can't resume, client authentication is required");
            return None;
        }

        let id = previous.cipher_suite();
        let negotiable = CipherSuite::lookup(id).is_some_and(|s| self.is_negotiable(s, version));
        if !negotiable || !hello.cipher_suites.contains(&id) {
            debug!("Can't resume, the session cipher suite is absent");
            return None;
        }

        if check_identification {
            if let Some(requested) = self.config.identification_protocol() {
                let cached = previous.identification_protocol();
                if !cached.is_some_and(|c| c.eq_ignore_ascii_case(requested)) {
                    debug!(
                        "Can't resume, endpoint id algorithm does not match, \
                         requested: {}, cached: {:?}",
                        requested, cached
                    );
                    return None;
                }
            }
        }

        Some(previous)
    }

    fn set_resumption(&mut self, resumed: Option<Arc<dyn SessionHandle>>) {
        self.context.is_resumption = resumed.is_some();
        if resumed.is_none() {
            debug!("Session not resumed.");
        }
        self.context.resuming_session = resumed;
    }

    fn is_negotiable(&self, suite: &CipherSuite, version: ProtocolVersion) -> bool {
        self.context.active_cipher_suites.iter().any(|s| s.id == suite.id)
            && suite.is_negotiable(version, self.config.key_length_policy())
    }

    /// Server preference: the first active suite the client also offers.
    fn choose_suite(
        &self,
        hello: &ClientHello,
        version: ProtocolVersion,
    ) -> Result<&'static CipherSuite, Error> {
        let policy = self.config.key_length_policy();
        self.context
            .active_cipher_suites
            .iter()
            .copied()
            .find(|s| s.is_negotiable(version, policy) && hello.cipher_suites.contains(&s.id))
            .ok_or_else(|| {
                Error::HandshakeFailure(format!("No negotiable cipher suite for {}", version))
            })
    }

    fn go_server_hello(
        &mut self,
        hello: &ClientHello,
        version: ProtocolVersion,
        flow: HandshakeState,
    ) -> Result<Outcome, Error> {
        // A TLS 1.2 resumption keeps the suite of the session. TLS 1.3 PSKs
        // only bind the hash, so the suite is chosen as usual.
        let resumed_suite = self
            .context
            .resuming_session
            .as_ref()
            .filter(|_| !version.uses_tls13_plus())
            .and_then(|s| CipherSuite::lookup(s.cipher_suite()));

        let suite = match resumed_suite {
            Some(suite) => suite,
            None => self.choose_suite(hello, version)?,
        };

        self.context.selected_suite = Some(suite);
        self.state = flow;

        let resumption = self.context.is_resumption;
        debug!(
            "Sending ServerHello: {} {} (resumption: {})",
            version, suite, resumption
        );
        Ok(Outcome::ServerHello {
            version,
            suite,
            resumption,
        })
    }

    /// Build the record ciphers for the negotiated suite once the key
    /// schedule produced `read` and `write` keys.
    ///
    /// DTLS ciphers start at epoch 1, the first protected epoch.
    pub fn record_ciphers(
        &self,
        read: &RecordKeys<'_>,
        write: &RecordKeys<'_>,
    ) -> Result<(Box<dyn ReadCipher>, Box<dyn WriteCipher>), Error> {
        let (Some(version), Some(suite)) =
            (self.context.negotiated_protocol, self.context.selected_suite)
        else {
            return Err(Error::HandshakeFailure(
                "No cipher suite negotiated yet".into(),
            ));
        };

        let authenticator = || {
            if version.is_dtls() {
                Authenticator::with_epoch(version, 1)
            } else {
                Authenticator::new(version)
            }
        };

        let limits = self.config.key_limits();
        let reader = create_read_cipher(suite, authenticator(), read, limits)?;
        let writer = create_write_cipher(
            suite,
            authenticator(),
            write,
            limits,
            SeededRng::new(self.config.rng_seed()),
        )?;
        Ok((reader, writer))
    }
}

impl fmt::Debug for ClientHelloDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientHelloDispatcher")
            .field("state", &self.state)
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}
