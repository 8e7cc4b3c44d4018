use std::sync::Arc;

use crate::crypto::{KeyLengthPolicy, Unlimited};
use crate::key_limit::{KeyLimits, DEFAULT_KEY_LIMITS};
use crate::rng::SeededRng;
use crate::session::ClientAuthType;
use crate::suite::CipherSuite;
use crate::types::ProtocolVersion;
use crate::Error;

const DEFAULT_TLS_PROTOCOLS: &[ProtocolVersion] = &[
    ProtocolVersion::Tls13,
    ProtocolVersion::Tls12,
    ProtocolVersion::Tls11,
    ProtocolVersion::Tls10,
];

const DEFAULT_DTLS_PROTOCOLS: &[ProtocolVersion] =
    &[ProtocolVersion::Dtls12, ProtocolVersion::Dtls10];

/// Server side negotiation configuration
#[derive(Clone)]
pub struct Config {
    protocols: Vec<ProtocolVersion>,
    dtls: bool,
    cipher_suites: Vec<&'static CipherSuite>,
    client_auth: ClientAuthType,
    identification_protocol: Option<String>,
    allow_unsafe_renegotiation: bool,
    reject_client_initiated_renegotiation: bool,
    enable_dtls_resume_cookie: bool,
    key_limits: KeyLimits,
    key_length_policy: Arc<dyn KeyLengthPolicy>,
    cookie_secret: [u8; 32],
    rng_seed: Option<u64>,
}

impl Config {
    /// Create a new configuration builder.
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder {
            protocols: None,
            dtls: false,
            cipher_suites: None,
            client_auth: ClientAuthType::None,
            identification_protocol: None,
            allow_unsafe_renegotiation: false,
            reject_client_initiated_renegotiation: false,
            enable_dtls_resume_cookie: true,
            key_limits: KeyLimits::parse(DEFAULT_KEY_LIMITS),
            key_length_policy: Unlimited::shared(),
            cookie_secret: None,
            rng_seed: None,
        }
    }

    /// Enabled protocol versions, server preference first.
    #[inline(always)]
    pub fn protocols(&self) -> &[ProtocolVersion] {
        &self.protocols
    }

    /// Whether this is a datagram endpoint.
    #[inline(always)]
    pub fn dtls(&self) -> bool {
        self.dtls
    }

    /// Enabled cipher suites, server preference first.
    #[inline(always)]
    pub fn cipher_suites(&self) -> &[&'static CipherSuite] {
        &self.cipher_suites
    }

    #[inline(always)]
    pub fn client_auth(&self) -> ClientAuthType {
        self.client_auth
    }

    /// Endpoint identification algorithm a resumed session must match.
    #[inline(always)]
    pub fn identification_protocol(&self) -> Option<&str> {
        self.identification_protocol.as_deref()
    }

    /// Accept renegotiation from clients without secure renegotiation.
    #[inline(always)]
    pub fn allow_unsafe_renegotiation(&self) -> bool {
        self.allow_unsafe_renegotiation
    }

    /// Refuse renegotiation the server did not start.
    #[inline(always)]
    pub fn reject_client_initiated_renegotiation(&self) -> bool {
        self.reject_client_initiated_renegotiation
    }

    /// Require a cookie exchange even when a DTLS session is resumed.
    #[inline(always)]
    pub fn enable_dtls_resume_cookie(&self) -> bool {
        self.enable_dtls_resume_cookie
    }

    /// Byte limits per key, only consulted by TLS 1.3 ciphers.
    #[inline(always)]
    pub fn key_limits(&self) -> &KeyLimits {
        &self.key_limits
    }

    #[inline(always)]
    pub fn key_length_policy(&self) -> &dyn KeyLengthPolicy {
        self.key_length_policy.as_ref()
    }

    /// HMAC secret for DTLS cookies.
    #[inline(always)]
    pub fn cookie_secret(&self) -> &[u8; 32] {
        &self.cookie_secret
    }

    /// Seed for deterministic randomness.
    #[inline(always)]
    pub fn rng_seed(&self) -> Option<u64> {
        self.rng_seed
    }

    /// The enabled protocols, without the SSLv2 hello placeholder.
    pub fn active_protocols(&self) -> Vec<ProtocolVersion> {
        self.protocols
            .iter()
            .copied()
            .filter(|v| *v != ProtocolVersion::Ssl20Hello)
            .collect()
    }

    /// Enabled suites that are available and usable with at least one
    /// active protocol.
    pub fn active_cipher_suites(&self) -> Vec<&'static CipherSuite> {
        let policy = self.key_length_policy();
        let protocols = self.active_protocols();
        self.cipher_suites
            .iter()
            .copied()
            .filter(|s| protocols.iter().any(|v| s.is_negotiable(*v, policy)))
            .collect()
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("protocols", &self.protocols)
            .field("dtls", &self.dtls)
            .field("cipher_suites", &self.cipher_suites.len())
            .field("client_auth", &self.client_auth)
            .field("identification_protocol", &self.identification_protocol)
            .field("allow_unsafe_renegotiation", &self.allow_unsafe_renegotiation)
            .field(
                "reject_client_initiated_renegotiation",
                &self.reject_client_initiated_renegotiation,
            )
            .field("enable_dtls_resume_cookie", &self.enable_dtls_resume_cookie)
            .finish_non_exhaustive()
    }
}

/// Builder for [`Config`].
pub struct ConfigBuilder {
    protocols: Option<Vec<ProtocolVersion>>,
    dtls: bool,
    cipher_suites: Option<Vec<u16>>,
    client_auth: ClientAuthType,
    identification_protocol: Option<String>,
    allow_unsafe_renegotiation: bool,
    reject_client_initiated_renegotiation: bool,
    enable_dtls_resume_cookie: bool,
    key_limits: KeyLimits,
    key_length_policy: Arc<dyn KeyLengthPolicy>,
    cookie_secret: Option<[u8; 32]>,
    rng_seed: Option<u64>,
}

impl ConfigBuilder {
    /// Set the enabled protocol versions in server preference order.
    ///
    /// Defaults to TLS 1.3, 1.2, 1.1, 1.0 or, for DTLS, DTLS 1.2, 1.0.
    pub fn protocols(mut self, protocols: &[ProtocolVersion]) -> Self {
        self.protocols = Some(protocols.to_vec());
        self
    }

    /// Set whether this is a datagram endpoint.
    ///
    /// Defaults to false.
    pub fn dtls(mut self, dtls: bool) -> Self {
        self.dtls = dtls;
        self
    }

    /// Set the enabled cipher suites by id, in server preference order.
    ///
    /// Unknown ids are ignored. Defaults to every default enabled suite in
    /// catalog order.
    pub fn cipher_suites(mut self, ids: &[u16]) -> Self {
        self.cipher_suites = Some(ids.to_vec());
        self
    }

    /// Set the client authentication mode.
    ///
    /// Defaults to [`ClientAuthType::None`].
    pub fn client_auth(mut self, client_auth: ClientAuthType) -> Self {
        self.client_auth = client_auth;
        self
    }

    /// Set the endpoint identification algorithm, e.g. `"HTTPS"`.
    ///
    /// Defaults to none.
    pub fn identification_protocol(mut self, protocol: impl Into<String>) -> Self {
        self.identification_protocol = Some(protocol.into());
        self
    }

    /// Defaults to false.
    pub fn allow_unsafe_renegotiation(mut self, allow: bool) -> Self {
        self.allow_unsafe_renegotiation = allow;
        self
    }

    /// Defaults to false.
    pub fn reject_client_initiated_renegotiation(mut self, reject: bool) -> Self {
        self.reject_client_initiated_renegotiation = reject;
        self
    }

    /// Set whether a resumed DTLS handshake still goes through the cookie
    /// exchange.
    ///
    /// Defaults to true.
    pub fn enable_dtls_resume_cookie(mut self, enable: bool) -> Self {
        self.enable_dtls_resume_cookie = enable;
        self
    }

    /// Set the key limit policy, see [`KeyLimits::parse`].
    ///
    /// Defaults to 2^37 bytes for AES-GCM and ChaCha20-Poly1305.
    pub fn key_limits(mut self, policy: &str) -> Self {
        self.key_limits = KeyLimits::parse(policy);
        self
    }

    /// Set the key length policy.
    ///
    /// Defaults to no restriction.
    pub fn key_length_policy(mut self, policy: Arc<dyn KeyLengthPolicy>) -> Self {
        self.key_length_policy = policy;
        self
    }

    /// Set the DTLS cookie secret.
    ///
    /// Defaults to random bytes.
    pub fn cookie_secret(mut self, secret: [u8; 32]) -> Self {
        self.cookie_secret = Some(secret);
        self
    }

    /// Seed the random source, for reproducible tests.
    ///
    /// Defaults to none.
    pub fn rng_seed(mut self, seed: u64) -> Self {
        self.rng_seed = Some(seed);
        self
    }

    /// Build the configuration.
    ///
    /// Returns `Error::Config` for an empty protocol list, a protocol of the
    /// wrong family for the `dtls` setting, or no known cipher suite.
    pub fn build(self) -> Result<Config, Error> {
        let protocols = self.protocols.unwrap_or_else(|| {
            if self.dtls {
                DEFAULT_DTLS_PROTOCOLS.to_vec()
            } else {
                DEFAULT_TLS_PROTOCOLS.to_vec()
            }
        });

        if protocols.is_empty() {
            return Err(Error::Config("No protocol versions enabled".into()));
        }
        if let Some(v) = protocols
            .iter()
            .find(|v| **v != ProtocolVersion::Ssl20Hello && v.is_dtls() != self.dtls)
        {
            return Err(Error::Config(format!(
                "{} can not be enabled on a {} endpoint",
                v,
                if self.dtls { "DTLS" } else { "TLS" }
            )));
        }

        let cipher_suites: Vec<&'static CipherSuite> = match self.cipher_suites {
            Some(ids) => CipherSuite::resolve(&ids),
            None => CipherSuite::all()
                .iter()
                .filter(|s| s.default_enabled && !s.scsv)
                .collect(),
        };
        if cipher_suites.is_empty() {
            return Err(Error::Config("No known cipher suites enabled".into()));
        }

        let cookie_secret = self.cookie_secret.unwrap_or_else(|| {
            let mut secret = [0u8; 32];
            SeededRng::new(self.rng_seed).fill(&mut secret);
            secret
        });

        Ok(Config {
            protocols,
            dtls: self.dtls,
            cipher_suites,
            client_auth: self.client_auth,
            identification_protocol: self.identification_protocol,
            allow_unsafe_renegotiation: self.allow_unsafe_renegotiation,
            reject_client_initiated_renegotiation: self.reject_client_initiated_renegotiation,
            enable_dtls_resume_cookie: self.enable_dtls_resume_cookie,
            key_limits: self.key_limits,
            key_length_policy: self.key_length_policy,
            cookie_secret,
            rng_seed: self.rng_seed,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Config::builder()
            .build()
            .expect("Default config should always validate")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::default();
        assert!(!config.dtls());
        assert_eq!(config.protocols()[0], ProtocolVersion::Tls13);
        assert_eq!(config.client_auth(), ClientAuthType::None);
        assert!(config.enable_dtls_resume_cookie());
        assert!(config.identification_protocol().is_none());
        assert_eq!(
            config.key_limits().key_update_limit("AES/GCM/NoPadding"),
            1 << 37
        );
        assert!(config.cipher_suites().iter().all(|s| !s.scsv));
    }

    #[test]
    fn dtls_defaults() {
        let config = Config::builder().dtls(true).build().unwrap();
        assert_eq!(
            config.active_protocols(),
            vec![ProtocolVersion::Dtls12, ProtocolVersion::Dtls10]
        );
        // No TLS 1.3 only suites on DTLS 1.2.
        assert!(config.active_cipher_suites().iter().all(|s| !s.uses_tls13()));
    }

    #[test]
    fn rejects_mixed_families() {
        let result = Config::builder()
            .protocols(&[ProtocolVersion::Tls12, ProtocolVersion::Dtls12])
            .build();
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn rejects_empty_lists() {
        assert!(Config::builder().protocols(&[]).build().is_err());
        assert!(Config::builder().cipher_suites(&[0xBEEF]).build().is_err());
    }

    #[test]
    fn seeded_cookie_secret_is_reproducible() {
        let a = Config::builder().rng_seed(5).build().unwrap();
        let b = Config::builder().rng_seed(5).build().unwrap();
        assert_eq!(a.cookie_secret(), b.cookie_secret());
    }

    #[test]
    fn active_suites_follow_protocols() {
        let config = Config::builder()
            .protocols(&[ProtocolVersion::Tls13])
            .cipher_suites(&[0xC02F, 0x1301, 0x1303])
            .build()
            .unwrap();
        let ids: Vec<u16> = config.active_cipher_suites().iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![0x1301, 0x1303]);
    }
}
