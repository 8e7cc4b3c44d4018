//! TLS 1.3 ClientHello dispatch.

mod hello_common;

use std::sync::{Arc, Mutex};

use hello_common::*;
use recseal::message::ClientHello;
use recseal::{ClientHelloDispatcher, Config, ConnectionState, Error, ExtensionConsumer};
use recseal::{ExtensionOutcome, HandshakeState, NegotiationContext, NoSessions, Outcome};
use recseal::{ProtocolVersion, SessionHandle};

/// Scripted extension handling.
#[derive(Debug, Default)]
struct Scripted {
    psk: Option<Arc<dyn SessionHandle>>,
    /// Outcomes for successive `consume_extensions` calls, then `Proceed`.
    outcomes: Vec<ExtensionOutcome>,
    fail: bool,
    /// `is_resumption` as seen by the PSK handler.
    seen: Arc<Mutex<Vec<bool>>>,
}

impl ExtensionConsumer for Scripted {
    fn consume_pre_shared_key(
        &mut self,
        _hello: &ClientHello,
        context: &NegotiationContext,
    ) -> Result<Option<Arc<dyn SessionHandle>>, Error> {
        self.seen.lock().unwrap().push(context.is_resumption);
        Ok(self.psk.clone())
    }

    fn consume_extensions(
        &mut self,
        _hello: &ClientHello,
        _context: &NegotiationContext,
    ) -> Result<ExtensionOutcome, Error> {
        if self.fail {
            return Err(Error::IllegalParameter("Invalid key_share extension".into()));
        }
        if self.outcomes.is_empty() {
            return Ok(ExtensionOutcome::Proceed);
        }
        Ok(self.outcomes.remove(0))
    }
}

fn dispatcher(config: Config, consumer: Scripted) -> ClientHelloDispatcher {
    let mut dispatcher = ClientHelloDispatcher::new(Arc::new(config), Arc::new(NoSessions))
        .with_extension_consumer(Box::new(consumer));
    dispatcher.start();
    dispatcher
}

fn fresh() -> ConnectionState {
    ConnectionState::default()
}

#[test]
fn tls13_picks_server_preference() {
    let _ = env_logger::try_init();

    let config = Config::builder()
        .protocols(&[ProtocolVersion::Tls13, ProtocolVersion::Tls12])
        .cipher_suites(&[0x1301, 0x1302])
        .build()
        .unwrap();
    let mut d = dispatcher(config, Scripted::default());
    let hello = with_supported_versions(tls_hello(0x0303, &[0x1301, 0x1302, 0x00FF]), &[0x0304]);

    let outcome = d.consume(&fresh(), &hello).unwrap();

    assert_eq!(d.state(), HandshakeState::T13Flow);
    match outcome {
        Outcome::ServerHello {
            version,
            suite,
            resumption,
        } => {
            assert_eq!(version, ProtocolVersion::Tls13);
            assert_eq!(suite.id, 0x1301);
            assert!(!resumption);
        }
        other => panic!("Expected ServerHello, got {:?}", other),
    }
}

#[test]
fn tls13_default_preference() {
    let _ = env_logger::try_init();

    let mut d = dispatcher(Config::default(), Scripted::default());
    let outcome = d.consume(&fresh(), &tls13_hello(&[0x1303, 0x1301])).unwrap();

    match outcome {
        Outcome::ServerHello { suite, .. } => assert_eq!(suite.id, 0x1301),
        other => panic!("Expected ServerHello, got {:?}", other),
    }
}

#[test]
fn tls13_without_tls13_suites() {
    let _ = env_logger::try_init();

    let mut d = dispatcher(Config::default(), Scripted::default());
    let err = d.consume(&fresh(), &tls13_hello(&[0xC02F])).unwrap_err();
    assert!(matches!(err, Error::HandshakeFailure(_)), "{:?}", err);
}

#[test]
fn tls13_disabled_falls_back_to_tls12() {
    let _ = env_logger::try_init();

    let config = Config::builder()
        .protocols(&[ProtocolVersion::Tls12])
        .build()
        .unwrap();
    let mut d = dispatcher(config, Scripted::default());
    d.consume(&fresh(), &tls13_hello(&[0x1301, 0xC02F])).unwrap();

    assert_eq!(d.state(), HandshakeState::T12Flow);
    assert_eq!(d.context().selected_suite.map(|s| s.id), Some(0xC02F));
}

#[test]
fn no_supported_version_in_common() {
    let _ = env_logger::try_init();

    let mut d = dispatcher(Config::default(), Scripted::default());
    let hello = with_supported_versions(tls_hello(0x0303, &[0x1301]), &[0x0305, 0x7F1C]);

    let err = d.consume(&fresh(), &hello).unwrap_err();
    assert!(matches!(err, Error::ProtocolVersion(_)), "{:?}", err);
}

#[test]
fn legacy_version_must_be_tls12() {
    let _ = env_logger::try_init();

    let mut d = dispatcher(Config::default(), Scripted::default());
    let hello = with_supported_versions(tls_hello(0x0301, &[0x1301]), &[0x0304]);

    let err = d.consume(&fresh(), &hello).unwrap_err();
    assert_eq!(
        err,
        Error::ProtocolVersion("The ClientHello.legacy_version field is not TLS 1.2".into())
    );
}

#[test]
fn no_renegotiation_in_tls13() {
    let _ = env_logger::try_init();

    let mut d = dispatcher(Config::default(), Scripted::default());
    let conn = ConnectionState {
        is_negotiated: true,
        secure_renegotiation: true,
        ..Default::default()
    };

    let err = d.consume(&conn, &tls13_hello(&[0x1301])).unwrap_err();
    assert!(matches!(err, Error::UnexpectedMessage(_)), "{:?}", err);
}

#[test]
fn psk_resumption() {
    let _ = env_logger::try_init();

    let seen = Arc::new(Mutex::new(Vec::new()));
    let consumer = Scripted {
        psk: Some(Arc::new(TestSession::new(ProtocolVersion::Tls13, 0x1301))),
        seen: seen.clone(),
        ..Default::default()
    };
    let mut d = dispatcher(Config::default(), consumer);

    let outcome = d.consume(&fresh(), &tls13_hello(&[0x1301])).unwrap();

    assert_eq!(*seen.lock().unwrap(), vec![true]);
    assert!(d.context().is_resumption);
    match outcome {
        Outcome::ServerHello {
            suite, resumption, ..
        } => {
            assert_eq!(suite.id, 0x1301);
            assert!(resumption);
        }
        other => panic!("Expected ServerHello, got {:?}", other),
    }
}

#[test]
fn no_psk_is_a_full_handshake() {
    let _ = env_logger::try_init();

    let seen = Arc::new(Mutex::new(Vec::new()));
    let consumer = Scripted {
        seen: seen.clone(),
        ..Default::default()
    };
    let mut d = dispatcher(Config::default(), consumer);

    d.consume(&fresh(), &tls13_hello(&[0x1301])).unwrap();

    // Resumption is assumed until the PSK handler decides.
    assert_eq!(*seen.lock().unwrap(), vec![true]);
    assert!(!d.context().is_resumption);
}

#[test]
fn hello_retry_request() {
    let _ = env_logger::try_init();

    let consumer = Scripted {
        outcomes: vec![ExtensionOutcome::RetryRequest],
        ..Default::default()
    };
    let mut d = dispatcher(Config::default(), consumer);
    let hello = tls13_hello(&[0x1301, 0x1302]);

    let outcome = d.consume(&fresh(), &hello).unwrap();
    match outcome {
        Outcome::HelloRetryRequest { version, suite } => {
            assert_eq!(version, ProtocolVersion::Tls13);
            assert_eq!(suite.id, 0x1302);
        }
        other => panic!("Expected HelloRetryRequest, got {:?}", other),
    }
    assert_eq!(d.state(), HandshakeState::AwaitingClientHello);
    assert!(d.context().hello_retry_sent);

    let outcome = d.consume(&fresh(), &hello).unwrap();
    assert!(matches!(outcome, Outcome::ServerHello { .. }), "{:?}", outcome);
    assert_eq!(d.state(), HandshakeState::T13Flow);
}

#[test]
fn only_one_hello_retry_request() {
    let _ = env_logger::try_init();

    let consumer = Scripted {
        outcomes: vec![ExtensionOutcome::RetryRequest, ExtensionOutcome::RetryRequest],
        ..Default::default()
    };
    let mut d = dispatcher(Config::default(), consumer);
    let hello = tls13_hello(&[0x1301]);

    d.consume(&fresh(), &hello).unwrap();
    let err = d.consume(&fresh(), &hello).unwrap_err();
    assert!(matches!(err, Error::HandshakeFailure(_)), "{:?}", err);
}

#[test]
fn extension_errors_propagate() {
    let _ = env_logger::try_init();

    let consumer = Scripted {
        fail: true,
        ..Default::default()
    };
    let mut d = dispatcher(Config::default(), consumer);

    let err = d.consume(&fresh(), &tls13_hello(&[0x1301])).unwrap_err();
    assert_eq!(
        err,
        Error::IllegalParameter("Invalid key_share extension".into())
    );
    assert_eq!(d.state(), HandshakeState::AwaitingClientHello);
}

#[test]
fn malformed_supported_versions() {
    let _ = env_logger::try_init();

    let mut d = dispatcher(Config::default(), Scripted::default());
    let mut hello = tls_hello(0x0303, &[0x1301]);
    hello.extensions.push(recseal::message::Extension::new(
        recseal::message::ExtensionType::SupportedVersions,
        &[3, 3, 4],
    ));

    let err = d.consume(&fresh(), &hello).unwrap_err();
    assert!(matches!(err, Error::DecodeError(_)), "{:?}", err);
}

#[test]
fn record_ciphers_hide_the_content_type() {
    let _ = env_logger::try_init();

    let mut d = dispatcher(Config::default(), Scripted::default());
    d.consume(&fresh(), &tls13_hello(&[0x1303])).unwrap();

    let key = [0x42; 32];
    let iv = [0x24; 12];
    let keys = recseal::record::RecordKeys::new(&key, &iv, &[]);
    let (mut reader, mut writer) = d.record_ciphers(&keys, &keys).unwrap();

    let mut buf = b"handshake bytes".to_vec();
    writer.encrypt(22, &mut buf).unwrap();
    assert_eq!(buf.len(), 15 + 1 + 16);

    // Outer type is always application data.
    let plain = reader.decrypt(23, &mut buf, None).unwrap();
    assert_eq!(plain.content_type, 22);
    assert_eq!(&buf[plain.fragment], b"handshake bytes");
}
