use thiserror::Error;

/// Alert descriptions this crate can ask the peer to be told about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Alert {
    UnexpectedMessage = 10,
    BadRecordMac = 20,
    HandshakeFailure = 40,
    IllegalParameter = 47,
    DecodeError = 50,
    ProtocolVersion = 70,
    InternalError = 80,
}

impl Alert {
    pub fn as_u8(&self) -> u8 {
        *self as u8
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("Protocol version: {0}")]
    ProtocolVersion(String),

    #[error("Handshake failure: {0}")]
    HandshakeFailure(String),

    #[error("Illegal parameter: {0}")]
    IllegalParameter(String),

    #[error("Decode error: {0}")]
    DecodeError(String),

    #[error("Unexpected message: {0}")]
    UnexpectedMessage(String),

    /// Record failed authentication.
    ///
    /// Padding, MAC and AEAD tag failures all fold into this one variant so
    /// that the caller can not tell them apart.
    #[error("Bad record MAC")]
    BadRecordMac,

    #[error("Unsupported: {0}")]
    Unsupported(String),

    #[error("Crypto error: {0}")]
    Crypto(String),

    #[error("Config error: {0}")]
    Config(String),
}

impl Error {
    /// The fatal alert to send for this error, if any.
    ///
    /// Configuration mistakes are local and never reach the peer.
    pub fn alert(&self) -> Option<Alert> {
        let alert = match self {
            Error::ProtocolVersion(_) => Alert::ProtocolVersion,
            Error::HandshakeFailure(_) => Alert::HandshakeFailure,
            Error::IllegalParameter(_) => Alert::IllegalParameter,
            Error::DecodeError(_) => Alert::DecodeError,
            Error::UnexpectedMessage(_) => Alert::UnexpectedMessage,
            Error::BadRecordMac => Alert::BadRecordMac,
            Error::Unsupported(_) | Error::Crypto(_) => Alert::InternalError,
            Error::Config(_) => return None,
        };
        Some(alert)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alert_codes() {
        assert_eq!(Error::BadRecordMac.alert().unwrap().as_u8(), 20);
        assert_eq!(
            Error::ProtocolVersion("x".into()).alert(),
            Some(Alert::ProtocolVersion)
        );
        assert_eq!(Alert::IllegalParameter.as_u8(), 47);
        assert!(Error::Config("x".into()).alert().is_none());
    }

    #[test]
    fn bad_record_mac_has_no_detail() {
        assert_eq!(Error::BadRecordMac.to_string(), "Bad record MAC");
    }
}
