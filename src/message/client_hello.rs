use nom::multi::length_data;
use nom::number::complete::{be_u16, be_u8};
use nom::IResult;

use super::extension::parse_supported_versions;
use super::{Cookie, Extension, ExtensionType, Random, SessionId};
use crate::suite::EMPTY_RENEGOTIATION_INFO_SCSV;
use crate::Error;

/// Only null compression is accepted.
const NULL_COMPRESSION: &[u8] = &[0];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientHello {
    /// `legacy_version` on the wire.
    pub client_version: u16,
    pub random: Random,
    pub session_id: SessionId,
    /// Present exactly when the hello came over DTLS.
    pub cookie: Option<Cookie>,
    /// Client preference order, unknown ids kept.
    pub cipher_suites: Vec<u16>,
    pub compression_methods: Vec<u8>,
    pub extensions: Vec<Extension>,
}

/// Borrowed view of the wire fields, before validation.
struct Fields<'a> {
    client_version: u16,
    random: Random,
    session_id: &'a [u8],
    cookie: Option<&'a [u8]>,
    cipher_suites: &'a [u8],
    compression_methods: &'a [u8],
    extensions: Option<&'a [u8]>,
}

impl ClientHello {
    pub fn new(
        client_version: u16,
        random: Random,
        session_id: SessionId,
        cipher_suites: Vec<u16>,
        is_dtls: bool,
    ) -> Self {
        ClientHello {
            client_version,
            random,
            session_id,
            cookie: is_dtls.then(Cookie::empty),
            cipher_suites,
            compression_methods: NULL_COMPRESSION.to_vec(),
            extensions: Vec::new(),
        }
    }

    pub fn with_extension(mut self, extension: Extension) -> Self {
        self.extensions.push(extension);
        self
    }

    #[inline(always)]
    pub fn is_dtls(&self) -> bool {
        self.cookie.is_some()
    }

    /// Decode a ClientHello body.
    ///
    /// Compression methods are decoded as sent and checked later with
    /// [`ClientHello::check_compression`].
    pub fn parse(input: &[u8], is_dtls: bool) -> Result<ClientHello, Error> {
        let (rest, fields) = Self::parse_fields(input, is_dtls)
            .map_err(|_| Error::DecodeError("Invalid ClientHello message".into()))?;
        if !rest.is_empty() {
            return Err(Error::DecodeError(format!(
                "{} bytes of trailing data after ClientHello",
                rest.len()
            )));
        }

        let session_id = SessionId::try_new(fields.session_id)?;
        let cookie = fields.cookie.map(Cookie::try_new).transpose()?;

        let encoded = fields.cipher_suites;
        if encoded.is_empty() || encoded.len() % 2 != 0 {
            return Err(Error::IllegalParameter("Invalid ClientHello message".into()));
        }
        let cipher_suites = encoded
            .chunks_exact(2)
            .map(|c| u16::from_be_bytes([c[0], c[1]]))
            .collect();

        let extensions = match fields.extensions {
            Some(data) => parse_extensions(data)?,
            None => Vec::new(),
        };

        Ok(ClientHello {
            client_version: fields.client_version,
            random: fields.random,
            session_id,
            cookie,
            cipher_suites,
            compression_methods: fields.compression_methods.to_vec(),
            extensions,
        })
    }

    fn parse_fields(input: &[u8], is_dtls: bool) -> IResult<&[u8], Fields<'_>> {
        let (input, client_version) = be_u16(input)?;
        let (input, random) = Random::parse(input)?;
        let (input, session_id) = length_data(be_u8)(input)?;
        let (input, cookie) = if is_dtls {
            let (input, cookie) = length_data(be_u8)(input)?;
            (input, Some(cookie))
        } else {
            (input, None)
        };
        let (input, cipher_suites) = length_data(be_u16)(input)?;
        let (input, compression_methods) = length_data(be_u8)(input)?;
        let (input, extensions) = if input.is_empty() {
            (input, None)
        } else {
            let (input, extensions) = length_data(be_u16)(input)?;
            (input, Some(extensions))
        };

        Ok((
            input,
            Fields {
                client_version,
                random,
                session_id,
                cookie,
                cipher_suites,
                compression_methods,
                extensions,
            },
        ))
    }

    pub fn serialize(&self, output: &mut Vec<u8>) {
        self.serialize_core(output, true);
    }

    /// The encoding a DTLS cookie is computed over: everything but the cookie.
    pub fn cookie_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.serialize_core(&mut out, false);
        out
    }

    fn serialize_core(&self, output: &mut Vec<u8>, with_cookie: bool) {
        output.extend_from_slice(&self.client_version.to_be_bytes());
        self.random.serialize(output);
        self.session_id.serialize(output);
        if with_cookie {
            if let Some(cookie) = &self.cookie {
                cookie.serialize(output);
            }
        }
        output.extend_from_slice(&((self.cipher_suites.len() * 2) as u16).to_be_bytes());
        for suite in &self.cipher_suites {
            output.extend_from_slice(&suite.to_be_bytes());
        }
        output.push(self.compression_methods.len() as u8);
        output.extend_from_slice(&self.compression_methods);

        if !self.extensions.is_empty() {
            let len: usize = self.extensions.iter().map(Extension::encoded_len).sum();
            output.extend_from_slice(&(len as u16).to_be_bytes());
            for ext in &self.extensions {
                ext.serialize(output);
            }
        }
    }

    /// Attach the cookie from a HelloVerifyRequest round trip.
    pub fn set_cookie(&mut self, cookie: Cookie) {
        self.cookie = Some(cookie);
    }

    pub fn extension(&self, extension_type: ExtensionType) -> Option<&Extension> {
        self.extensions
            .iter()
            .find(|e| e.extension_type == extension_type)
    }

    /// The versions listed in `supported_versions`, if the client sent it.
    pub fn supported_versions(&self) -> Result<Option<Vec<u16>>, Error> {
        self.extension(ExtensionType::SupportedVersions)
            .map(|e| parse_supported_versions(&e.extension_data))
            .transpose()
    }

    /// A non-empty session ticket for stateless resumption.
    pub fn session_ticket(&self) -> Option<&[u8]> {
        self.extension(ExtensionType::SessionTicket)
            .map(|e| &e.extension_data[..])
            .filter(|t| !t.is_empty())
    }

    pub fn has_renegotiation_info(&self) -> bool {
        self.extension(ExtensionType::RenegotiationInfo).is_some()
    }

    pub fn has_empty_renegotiation_scsv(&self) -> bool {
        self.cipher_suites.contains(&EMPTY_RENEGOTIATION_INFO_SCSV)
    }

    pub fn check_compression(&self) -> Result<(), Error> {
        if self.compression_methods != NULL_COMPRESSION {
            return Err(Error::DecodeError(format!(
                "Unsupported compression methods: {:02x?}",
                self.compression_methods
            )));
        }
        Ok(())
    }
}

fn parse_extensions(mut input: &[u8]) -> Result<Vec<Extension>, Error> {
    let mut extensions: Vec<Extension> = Vec::new();

    while !input.is_empty() {
        let (rest, extension) = Extension::parse(input)
            .map_err(|_| Error::DecodeError("Invalid ClientHello extensions".into()))?;

        if extensions
            .iter()
            .any(|e| e.extension_type == extension.extension_type)
        {
            return Err(Error::IllegalParameter(format!(
                "Duplicate extension {:?}",
                extension.extension_type
            )));
        }

        if extension.extension_type == ExtensionType::PreSharedKey && !rest.is_empty() {
            return Err(Error::IllegalParameter(
                "pre_shared_key extension is not last".into(),
            ));
        }

        extensions.push(extension);
        input = rest;
    }

    Ok(extensions)
}
