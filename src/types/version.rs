use core::fmt;

/// A SSL/TLS/DTLS protocol version.
///
/// DTLS versions use the one's complement of the TLS numbering, so a
/// numerically lower DTLS id is a newer version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProtocolVersion {
    /// Sentinel for "no version".
    None,
    Ssl20Hello,
    Ssl30,
    Tls10,
    Tls11,
    Tls12,
    Tls13,
    Dtls10,
    Dtls12,
    Dtls13,
}

impl ProtocolVersion {
    /// Every real version, newest first within each family.
    pub const ALL: &'static [ProtocolVersion] = &[
        ProtocolVersion::Tls13,
        ProtocolVersion::Tls12,
        ProtocolVersion::Tls11,
        ProtocolVersion::Tls10,
        ProtocolVersion::Ssl30,
        ProtocolVersion::Ssl20Hello,
        ProtocolVersion::Dtls13,
        ProtocolVersion::Dtls12,
        ProtocolVersion::Dtls10,
    ];

    pub fn from_id(id: u16) -> Option<Self> {
        use ProtocolVersion::*;
        let v = match id {
            0x0002 => Ssl20Hello,
            0x0300 => Ssl30,
            0x0301 => Tls10,
            0x0302 => Tls11,
            0x0303 => Tls12,
            0x0304 => Tls13,
            0xFEFF => Dtls10,
            0xFEFD => Dtls12,
            0xFEFC => Dtls13,
            _ => return Option::None,
        };
        Some(v)
    }

    pub fn from_bytes(major: u8, minor: u8) -> Option<Self> {
        Self::from_id(u16::from_be_bytes([major, minor]))
    }

    /// Wire id. The sentinel reports 0xFFFF, which no real version uses.
    pub fn id(&self) -> u16 {
        use ProtocolVersion::*;
        match self {
            None => 0xFFFF,
            Ssl20Hello => 0x0002,
            Ssl30 => 0x0300,
            Tls10 => 0x0301,
            Tls11 => 0x0302,
            Tls12 => 0x0303,
            Tls13 => 0x0304,
            Dtls10 => 0xFEFF,
            Dtls12 => 0xFEFD,
            Dtls13 => 0xFEFC,
        }
    }

    #[inline(always)]
    pub fn major(&self) -> u8 {
        (self.id() >> 8) as u8
    }

    #[inline(always)]
    pub fn minor(&self) -> u8 {
        self.id() as u8
    }

    pub fn name(&self) -> &'static str {
        use ProtocolVersion::*;
        match self {
            None => "NONE",
            Ssl20Hello => "SSLv2Hello",
            Ssl30 => "SSLv3",
            Tls10 => "TLSv1",
            Tls11 => "TLSv1.1",
            Tls12 => "TLSv1.2",
            Tls13 => "TLSv1.3",
            Dtls10 => "DTLSv1.0",
            Dtls12 => "DTLSv1.2",
            Dtls13 => "DTLSv1.3",
        }
    }

    /// Name for a raw id, also for ids we don't know.
    pub fn name_of(id: u16) -> String {
        match Self::from_id(id) {
            Some(v) => v.name().to_string(),
            Option::None => format!("0x{:04X}", id),
        }
    }

    pub fn is_dtls(&self) -> bool {
        use ProtocolVersion::*;
        matches!(self, Dtls10 | Dtls12 | Dtls13)
    }

    pub fn uses_tls13_plus(&self) -> bool {
        matches!(self, ProtocolVersion::Tls13 | ProtocolVersion::Dtls13)
    }

    /// Whether CBC records carry an explicit per-record IV.
    ///
    /// DTLS 1.0 is derived from TLS 1.1 and so counts.
    pub fn uses_tls11_plus(&self) -> bool {
        use ProtocolVersion::*;
        matches!(self, Tls11 | Tls12 | Tls13 | Dtls10 | Dtls12 | Dtls13)
    }

    /// Whether records are authenticated with HMAC rather than the SSL 3.0 MAC.
    pub fn uses_tls10_plus(&self) -> bool {
        use ProtocolVersion::*;
        !matches!(self, None | Ssl20Hello | Ssl30)
    }

    /// Whether `self` is a newer protocol than `other`.
    ///
    /// Only meaningful when both are of the same family.
    pub fn newer_than(&self, other: ProtocolVersion) -> bool {
        if self.is_dtls() {
            self.id() < other.id()
        } else {
            self.id() > other.id()
        }
    }

    /// The version to select from `listed` for a client proposing `suggested`.
    ///
    /// An exact match wins, otherwise the newest listed version older than
    /// `suggested`. Returns [`ProtocolVersion::None`] when nothing fits.
    pub fn selected_from(listed: &[ProtocolVersion], suggested: u16) -> ProtocolVersion {
        let mut selected = ProtocolVersion::None;
        for pv in listed {
            if pv.id() == suggested {
                return *pv;
            }
            let older = if pv.is_dtls() {
                pv.id() > suggested
            } else {
                pv.id() < suggested
            };
            if !older {
                continue;
            }
            if selected == ProtocolVersion::None || pv.newer_than(selected) {
                selected = *pv;
            }
        }
        selected
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}
