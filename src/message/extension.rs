use nom::bytes::complete::take;
use nom::number::complete::{be_u16, be_u8};
use nom::IResult;

use crate::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extension {
    pub extension_type: ExtensionType,
    pub extension_data: Vec<u8>,
}

impl Extension {
    pub fn new(extension_type: ExtensionType, extension_data: &[u8]) -> Self {
        Extension {
            extension_type,
            extension_data: extension_data.to_vec(),
        }
    }

    pub fn parse(input: &[u8]) -> IResult<&[u8], Extension> {
        let (input, extension_type) = ExtensionType::parse(input)?;
        let (input, extension_length) = be_u16(input)?;
        let (input, extension_data) = take(extension_length)(input)?;

        Ok((input, Extension::new(extension_type, extension_data)))
    }

    pub fn serialize(&self, output: &mut Vec<u8>) {
        output.extend_from_slice(&self.extension_type.as_u16().to_be_bytes());
        output.extend_from_slice(&(self.extension_data.len() as u16).to_be_bytes());
        output.extend_from_slice(&self.extension_data);
    }

    /// Total encoded size including the 4 byte header.
    pub fn encoded_len(&self) -> usize {
        4 + self.extension_data.len()
    }
}

/// The extensions a ClientHello consumer looks at. Everything else is carried
/// as [`ExtensionType::Unknown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExtensionType {
    ServerName,
    SupportedGroups,
    SignatureAlgorithms,
    SessionTicket,
    PreSharedKey,
    EarlyData,
    SupportedVersions,
    Cookie,
    PskKeyExchangeModes,
    KeyShare,
    RenegotiationInfo,
    Unknown(u16),
}

impl ExtensionType {
    pub fn from_u16(value: u16) -> Self {
        match value {
            0x0000 => ExtensionType::ServerName,
            0x000A => ExtensionType::SupportedGroups,
            0x000D => ExtensionType::SignatureAlgorithms,
            0x0023 => ExtensionType::SessionTicket,
            0x0029 => ExtensionType::PreSharedKey,
            0x002A => ExtensionType::EarlyData,
            0x002B => ExtensionType::SupportedVersions,
            0x002C => ExtensionType::Cookie,
            0x002D => ExtensionType::PskKeyExchangeModes,
            0x0033 => ExtensionType::KeyShare,
            0xFF01 => ExtensionType::RenegotiationInfo,
            _ => ExtensionType::Unknown(value),
        }
    }

    pub fn as_u16(&self) -> u16 {
        match self {
            ExtensionType::ServerName => 0x0000,
            ExtensionType::SupportedGroups => 0x000A,
            ExtensionType::SignatureAlgorithms => 0x000D,
            ExtensionType::SessionTicket => 0x0023,
            ExtensionType::PreSharedKey => 0x0029,
            ExtensionType::EarlyData => 0x002A,
            ExtensionType::SupportedVersions => 0x002B,
            ExtensionType::Cookie => 0x002C,
            ExtensionType::PskKeyExchangeModes => 0x002D,
            ExtensionType::KeyShare => 0x0033,
            ExtensionType::RenegotiationInfo => 0xFF01,
            ExtensionType::Unknown(value) => *value,
        }
    }

    pub fn parse(input: &[u8]) -> IResult<&[u8], ExtensionType> {
        let (input, value) = be_u16(input)?;
        Ok((input, ExtensionType::from_u16(value)))
    }
}

/// Decode the ClientHello form of `supported_versions`:
/// `u8 length || u16 versions...`, between 1 and 127 versions.
pub fn parse_supported_versions(data: &[u8]) -> Result<Vec<u16>, Error> {
    fn inner(input: &[u8]) -> IResult<&[u8], &[u8]> {
        let (input, len) = be_u8(input)?;
        take(len)(input)
    }

    let invalid = || Error::DecodeError("Invalid supported_versions extension".into());

    let (rest, list) = inner(data).map_err(|_| invalid())?;
    if !rest.is_empty() || list.len() < 2 || list.len() % 2 != 0 {
        return Err(invalid());
    }

    Ok(list
        .chunks_exact(2)
        .map(|c| u16::from_be_bytes([c[0], c[1]]))
        .collect())
}

pub fn serialize_supported_versions(versions: &[u16]) -> Vec<u8> {
    let mut out = Vec::with_capacity(1 + versions.len() * 2);
    out.push((versions.len() * 2) as u8);
    for v in versions {
        out.extend_from_slice(&v.to_be_bytes());
    }
    out
}
