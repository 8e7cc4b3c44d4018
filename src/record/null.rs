use crate::crypto::{Authenticator, RecordMac};
use crate::Error;

use super::{add_mac, check_stream_mac, Plaintext, ReadCipher, WriteCipher};

/// No encryption. A MAC is still checked when the suite names one.
#[derive(Debug)]
pub(crate) struct NullReadCipher {
    mac: RecordMac,
}

impl NullReadCipher {
    pub fn new(mac: RecordMac) -> Self {
        NullReadCipher { mac }
    }

    pub fn unprotected(authenticator: Authenticator) -> Self {
        NullReadCipher {
            mac: RecordMac::null(authenticator),
        }
    }
}

impl ReadCipher for NullReadCipher {
    fn decrypt(
        &mut self,
        content_type: u8,
        buf: &mut [u8],
        sequence: Option<&[u8; 8]>,
    ) -> Result<Plaintext, Error> {
        let len = check_stream_mac(&mut self.mac, content_type, buf, sequence)?;
        Ok(Plaintext::new(content_type, 0..len))
    }

    fn estimate_fragment_size(&self, packet_size: usize, header_size: usize) -> usize {
        packet_size.saturating_sub(header_size + self.mac.alg().size())
    }

    fn is_null_cipher(&self) -> bool {
        true
    }
}

#[derive(Debug)]
pub(crate) struct NullWriteCipher {
    mac: RecordMac,
}

impl NullWriteCipher {
    pub fn new(mac: RecordMac) -> Self {
        NullWriteCipher { mac }
    }

    pub fn unprotected(authenticator: Authenticator) -> Self {
        NullWriteCipher {
            mac: RecordMac::null(authenticator),
        }
    }
}

impl WriteCipher for NullWriteCipher {
    fn encrypt(&mut self, content_type: u8, buf: &mut Vec<u8>) -> Result<usize, Error> {
        add_mac(&mut self.mac, content_type, buf)?;
        Ok(buf.len())
    }

    fn explicit_nonce_size(&self) -> usize {
        0
    }

    fn calculate_fragment_size(&self, packet_limit: usize, header_size: usize) -> usize {
        packet_limit.saturating_sub(header_size + self.mac.alg().size())
    }

    fn calculate_packet_size(&self, fragment_size: usize, header_size: usize) -> usize {
        fragment_size + header_size + self.mac.alg().size()
    }

    fn is_null_cipher(&self) -> bool {
        true
    }
}
