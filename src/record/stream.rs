use crate::crypto::{Rc4Cipher, RecordMac};
use crate::Error;

use super::{add_mac, check_stream_mac, Plaintext, ReadCipher, WriteCipher};

#[derive(Debug)]
pub(crate) struct StreamReadCipher {
    cipher: Rc4Cipher,
    mac: RecordMac,
}

impl StreamReadCipher {
    pub fn new(key: &[u8], mac: RecordMac) -> Result<Self, Error> {
        Ok(StreamReadCipher {
            cipher: Rc4Cipher::new(key)?,
            mac,
        })
    }
}

impl ReadCipher for StreamReadCipher {
    fn decrypt(
        &mut self,
        content_type: u8,
        buf: &mut [u8],
        sequence: Option<&[u8; 8]>,
    ) -> Result<Plaintext, Error> {
        // The keystream must advance over every record, even a short one.
        self.cipher.apply(buf);
        let len = check_stream_mac(&mut self.mac, content_type, buf, sequence)?;
        Ok(Plaintext::new(content_type, 0..len))
    }

    fn estimate_fragment_size(&self, packet_size: usize, header_size: usize) -> usize {
        packet_size.saturating_sub(header_size + self.mac.alg().size())
    }
}

#[derive(Debug)]
pub(crate) struct StreamWriteCipher {
    cipher: Rc4Cipher,
    mac: RecordMac,
}

impl StreamWriteCipher {
    pub fn new(key: &[u8], mac: RecordMac) -> Result<Self, Error> {
        Ok(StreamWriteCipher {
            cipher: Rc4Cipher::new(key)?,
            mac,
        })
    }
}

impl WriteCipher for StreamWriteCipher {
    fn encrypt(&mut self, content_type: u8, buf: &mut Vec<u8>) -> Result<usize, Error> {
        add_mac(&mut self.mac, content_type, buf)?;
        self.cipher.apply(buf);
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
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{Authenticator, MacAlg};
    use crate::types::ProtocolVersion;

    fn pair(version: ProtocolVersion) -> (StreamWriteCipher, StreamReadCipher) {
        let key = [0x42u8; 16];
        let mac_key = [0x11u8; 16];
        let mac = || RecordMac::new(MacAlg::Md5, &mac_key, Authenticator::new(version)).unwrap();
        (
            StreamWriteCipher::new(&key, mac()).unwrap(),
            StreamReadCipher::new(&key, mac()).unwrap(),
        )
    }

    #[test]
    fn records_in_sequence() {
        let (mut w, mut r) = pair(ProtocolVersion::Tls10);

        for msg in [&b"first"[..], b"", b"third record"] {
            let mut buf = msg.to_vec();
            let n = w.encrypt(23, &mut buf).unwrap();
            assert_eq!(n, msg.len() + 16);
            if !msg.is_empty() {
                assert_ne!(&buf[..msg.len()], msg);
            }

            let pt = r.decrypt(23, &mut buf, None).unwrap();
            assert_eq!(&buf[pt.fragment], msg);
        }
    }

    #[test]
    fn ssl3_mac() {
        let (mut w, mut r) = pair(ProtocolVersion::Ssl30);
        let mut buf = b"legacy".to_vec();
        w.encrypt(22, &mut buf).unwrap();
        let pt = r.decrypt(22, &mut buf, None).unwrap();
        assert_eq!(&buf[pt.fragment], b"legacy");
    }

    #[test]
    fn wrong_content_type_fails_mac() {
        let (mut w, mut r) = pair(ProtocolVersion::Tls12);
        let mut buf = b"data".to_vec();
        w.encrypt(23, &mut buf).unwrap();
        assert_eq!(r.decrypt(22, &mut buf, None), Err(Error::BadRecordMac));
    }
}
