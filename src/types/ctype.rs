use core::fmt;

/// Record content type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentType {
    ChangeCipherSpec,
    Alert,
    Handshake,
    ApplicationData,
    Unknown(u8),
}

impl ContentType {
    pub fn as_u8(&self) -> u8 {
        (*self).into()
    }
}

impl From<ContentType> for u8 {
    fn from(value: ContentType) -> Self {
        use ContentType::*;
        match value {
            ChangeCipherSpec => 20,
            Alert => 21,
            Handshake => 22,
            ApplicationData => 23,
            Unknown(v) => v,
        }
    }
}

impl From<u8> for ContentType {
    fn from(value: u8) -> Self {
        use ContentType::*;
        match value {
            20 => ChangeCipherSpec,
            21 => Alert,
            22 => Handshake,
            23 => ApplicationData,
            _ => Unknown(value),
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use ContentType::*;
        match self {
            ChangeCipherSpec => write!(f, "change_cipher_spec"),
            Alert => write!(f, "alert"),
            Handshake => write!(f, "handshake"),
            ApplicationData => write!(f, "application_data"),
            Unknown(v) => write!(f, "unknown({})", v),
        }
    }
}
