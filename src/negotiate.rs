//! Protocol version selection from a ClientHello.

use log::debug;

use crate::types::ProtocolVersion;
use crate::Error;

/// Select a version from the legacy `client_version` field.
///
/// TLS caps the offer at TLS 1.2 since 1.3 is only ever negotiated through
/// `supported_versions`. DTLS numbers run backwards, anything numerically
/// below DTLS 1.2 is raised to it.
pub fn negotiate(
    offered: u16,
    active: &[ProtocolVersion],
    is_dtls: bool,
) -> Result<ProtocolVersion, Error> {
    let tls12 = ProtocolVersion::Tls12.id();
    let dtls12 = ProtocolVersion::Dtls12.id();

    let bound = if is_dtls {
        offered.max(dtls12)
    } else {
        offered.min(tls12)
    };

    match ProtocolVersion::selected_from(active, bound) {
        ProtocolVersion::None | ProtocolVersion::Ssl20Hello => Err(Error::ProtocolVersion(format!(
            "Client requested protocol {} is not enabled or supported in server context",
            ProtocolVersion::name_of(offered)
        ))),
        selected => {
            debug!(
                "Negotiated {} from legacy version {}",
                selected,
                ProtocolVersion::name_of(offered)
            );
            Ok(selected)
        }
    }
}

/// Select a version from the `supported_versions` extension.
///
/// Walks the server's versions in its own preference order and takes the
/// first the client also lists.
pub fn negotiate_from_supported_versions(
    offered: &[u16],
    active: &[ProtocolVersion],
) -> Result<ProtocolVersion, Error> {
    let placeholder = ProtocolVersion::Ssl20Hello;

    let selected = active
        .iter()
        .filter(|v| **v != placeholder)
        .find(|v| offered.iter().any(|c| *c != placeholder.id() && *c == v.id()));

    match selected {
        Some(v) => {
            debug!("Negotiated {} from supported_versions", v);
            Ok(*v)
        }
        None => {
            let offered: Vec<String> = offered.iter().map(|v| ProtocolVersion::name_of(*v)).collect();
            let active: Vec<&str> = active.iter().map(|v| v.name()).collect();
            Err(Error::ProtocolVersion(format!(
                "The client supported protocol versions {:?} are not accepted by server preferences {:?}",
                offered, active
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ProtocolVersion::*;

    #[test]
    fn legacy_tls_is_capped_at_tls12() {
        let active = [Tls13, Tls12, Tls11, Tls10];
        assert_eq!(negotiate(0x0304, &active, false), Ok(Tls12));
        assert_eq!(negotiate(0x0303, &active, false), Ok(Tls12));
        assert_eq!(negotiate(0x0302, &active, false), Ok(Tls11));
        // Unknown future minor versions negotiate down too.
        assert_eq!(negotiate(0x0309, &active, false), Ok(Tls12));
    }

    #[test]
    fn legacy_tls_picks_highest_below_offer() {
        assert_eq!(negotiate(0x0303, &[Tls13, Tls10], false), Ok(Tls10));
        assert!(matches!(
            negotiate(0x0301, &[Tls13, Tls12], false),
            Err(Error::ProtocolVersion(_))
        ));
    }

    #[test]
    fn legacy_tls_never_selects_only_tls13() {
        assert!(matches!(
            negotiate(0x0304, &[Tls13], false),
            Err(Error::ProtocolVersion(_))
        ));
    }

    #[test]
    fn placeholder_is_not_a_result() {
        assert!(negotiate(0x0300, &[Ssl20Hello, Tls12], false).is_err());
    }

    #[test]
    fn legacy_dtls() {
        let active = [Dtls12, Dtls10];
        assert_eq!(negotiate(0xFEFD, &active, true), Ok(Dtls12));
        assert_eq!(negotiate(0xFEFF, &active, true), Ok(Dtls10));
        // DTLS 1.3 in the legacy field is floored to DTLS 1.2.
        assert_eq!(negotiate(0xFEFC, &active, true), Ok(Dtls12));
        assert!(negotiate(0xFEFF, &[Dtls12], true).is_err());
    }

    #[test]
    fn supported_versions_server_preference() {
        let active = [Tls13, Tls12];
        assert_eq!(
            negotiate_from_supported_versions(&[0x0303, 0x0304], &active),
            Ok(Tls13)
        );
        assert_eq!(
            negotiate_from_supported_versions(&[0x0304], &active),
            Ok(Tls13)
        );
        assert_eq!(
            negotiate_from_supported_versions(&[0x7A7A, 0x0303], &active),
            Ok(Tls12)
        );
    }

    #[test]
    fn supported_versions_no_overlap() {
        let err = negotiate_from_supported_versions(&[0x0302, 0x0301], &[Tls13, Tls12]).unwrap_err();
        assert!(matches!(err, Error::ProtocolVersion(_)));
        assert!(err.to_string().contains("TLSv1.1"));
    }

    #[test]
    fn supported_versions_skips_placeholder() {
        assert!(negotiate_from_supported_versions(&[0x0002], &[Ssl20Hello]).is_err());
    }
}
