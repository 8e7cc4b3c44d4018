//! Record sequence numbers and the bytes they are authenticated with.

use tinyvec::ArrayVec;

use crate::types::ProtocolVersion;
use crate::Error;

/// Authentication header, at most 13 bytes.
pub type AuthBytes = ArrayVec<[u8; 13]>;

/// Per-direction sequence counter and MAC header / AEAD AAD builder.
///
/// For DTLS the first two bytes of the sequence block carry the epoch and
/// only the low 48 bits count.
#[derive(Debug, Clone)]
pub struct Authenticator {
    version: ProtocolVersion,
    block: [u8; 8],
}

impl Authenticator {
    pub fn new(version: ProtocolVersion) -> Self {
        Authenticator {
            version,
            block: [0; 8],
        }
    }

    /// A DTLS authenticator starting at sequence 0 of `epoch`.
    pub fn with_epoch(version: ProtocolVersion, epoch: u16) -> Self {
        let mut block = [0; 8];
        block[..2].copy_from_slice(&epoch.to_be_bytes());
        Authenticator { version, block }
    }

    #[inline(always)]
    pub fn version(&self) -> ProtocolVersion {
        self.version
    }

    /// The sequence number the next record will use.
    pub fn sequence_number(&self) -> [u8; 8] {
        self.block
    }

    fn counter_start(&self) -> usize {
        if self.version.is_dtls() {
            2
        } else {
            0
        }
    }

    pub fn increase_sequence_number(&mut self) {
        let start = self.counter_start();
        for b in self.block[start..].iter_mut().rev() {
            *b = b.wrapping_add(1);
            if *b != 0 {
                break;
            }
        }
    }

    /// Less than 256 records left before the counter wraps.
    pub fn seq_num_overflow(&self) -> bool {
        let start = self.counter_start();
        self.block[start..7].iter().all(|b| *b == 0xFF)
    }

    /// The counter is past the point where a rekey should be scheduled.
    pub fn seq_num_is_huge(&self) -> bool {
        let start = self.counter_start();
        let half = start + (8 - start) / 2;
        self.block[start..half].iter().all(|b| *b == 0xFF)
    }

    /// Build the MAC header or AEAD additional data for a record.
    ///
    /// `sequence` overrides the internal counter (DTLS callers track their
    /// own). Without an override the internal counter advances. TLS 1.3 always
    /// advances since its nonce is derived from the counter.
    ///
    /// Fails, without touching the counter, when `length` does not fit the
    /// two byte length field.
    pub fn acquire_authentication_bytes(
        &mut self,
        content_type: u8,
        length: usize,
        sequence: Option<&[u8; 8]>,
    ) -> Result<AuthBytes, Error> {
        let len = u16::try_from(length)
            .map_err(|_| Error::Crypto(format!("Record of {} bytes is too long", length)))?
            .to_be_bytes();
        let mut ad = AuthBytes::new();

        if self.version.uses_tls13_plus() {
            // The outer header: type, legacy_record_version, length.
            ad.push(content_type);
            ad.extend_from_slice(&[0x03, 0x03]);
            ad.extend_from_slice(&len);
            self.increase_sequence_number();
            return Ok(ad);
        }

        match sequence {
            Some(seq) => ad.extend_from_slice(seq),
            None => {
                ad.extend_from_slice(&self.block);
                self.increase_sequence_number();
            }
        }
        ad.push(content_type);
        if self.version.uses_tls10_plus() {
            ad.push(self.version.major());
            ad.push(self.version.minor());
        }
        ad.extend_from_slice(&len);
        Ok(ad)
    }
}
