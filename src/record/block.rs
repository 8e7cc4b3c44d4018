//! CBC records: MAC-then-encrypt with block padding.
//!
//! TLS 1.0 and SSL 3.0 chain the IV across records. TLS 1.1+ and DTLS send a
//! fresh IV block in front of every record.
//!
//! Decryption does the same amount of MAC and padding work whether or not a
//! record turns out valid, and only reports the first failure at the end.

use std::hint::black_box;

use log::trace;

use crate::crypto::{calculate_remaining_len, compare_mac_tags, padding, BulkCipher};
use crate::crypto::{CbcCipher, MacAlg, RecordMac};
use crate::rng::SeededRng;
use crate::types::ProtocolVersion;
use crate::Error;

use super::{add_mac, Plaintext, ReadCipher, RecordKeys, WriteCipher};

fn cbc_for(bulk: BulkCipher, explicit_iv: bool, keys: &RecordKeys<'_>) -> Result<CbcCipher, Error> {
    let iv = if explicit_iv {
        // Only the starting chain value, every record carries its own IV.
        (!keys.iv.is_empty()).then_some(keys.iv)
    } else {
        if keys.iv.is_empty() {
            return Err(Error::Crypto(format!("{} needs an IV", bulk)));
        }
        Some(keys.iv)
    };
    CbcCipher::new(bulk.transformation(), keys.key, iv)
}

#[derive(Debug)]
pub(crate) struct BlockReadCipher {
    cipher: CbcCipher,
    mac: RecordMac,
    explicit_iv: bool,
    version: ProtocolVersion,
}

impl BlockReadCipher {
    pub fn new(
        bulk: BulkCipher,
        explicit_iv: bool,
        keys: &RecordKeys<'_>,
        mac: RecordMac,
    ) -> Result<Self, Error> {
        Ok(BlockReadCipher {
            cipher: cbc_for(bulk, explicit_iv, keys)?,
            version: mac.authenticator().version(),
            mac,
            explicit_iv,
        })
    }

    fn iv_len(&self) -> usize {
        if self.explicit_iv {
            self.cipher.block_size()
        } else {
            0
        }
    }

    /// Whether `len` could hold `IV || content || mac || padding`.
    fn sanity_check(&self, tag_len: usize, len: usize) -> bool {
        let bs = self.cipher.block_size();
        if len % bs != 0 {
            return false;
        }
        len >= (tag_len + 1).max(bs) + self.iv_len()
    }
}

impl ReadCipher for BlockReadCipher {
    fn decrypt(
        &mut self,
        content_type: u8,
        buf: &mut [u8],
        sequence: Option<&[u8; 8]>,
    ) -> Result<Plaintext, Error> {
        let bs = self.cipher.block_size();
        let tag_len = self.mac.alg().size();
        let ciphered_len = buf.len();

        // The record length is public. Nothing below it can be decrypted.
        if ciphered_len % bs != 0 || ciphered_len < bs + self.iv_len() {
            return Err(Error::BadRecordMac);
        }

        let mut reserved: Option<Error> = None;
        if tag_len != 0 && !self.sanity_check(tag_len, ciphered_len) {
            reserved = Some(Error::BadRecordMac);
        }

        // With an explicit IV the first block decrypts to noise and is dropped.
        self.cipher.decrypt(buf)?;
        let start = self.iv_len();
        let region = &buf[start..];

        let mut content_end = region.len();
        match padding::remove_padding(region, tag_len, bs, self.version) {
            Ok(n) => content_end = n,
            Err(e) => {
                reserved.get_or_insert(e);
            }
        }

        if tag_len != 0 {
            let checked = check_cbc_mac(
                &mut self.mac,
                content_type,
                &region[..content_end],
                ciphered_len,
                sequence,
            );
            if let Err(e) = checked {
                reserved.get_or_insert(e);
            }
        } else {
            self.mac.authenticator_mut().increase_sequence_number();
        }

        if let Some(e) = reserved {
            return Err(e);
        }

        let end = start + content_end - tag_len;
        Ok(Plaintext::new(content_type, start..end))
    }

    fn estimate_fragment_size(&self, packet_size: usize, header_size: usize) -> usize {
        // At least one padding byte.
        packet_size.saturating_sub(header_size + self.iv_len() + self.mac.alg().size() + 1)
    }
}

/// Verify the MAC of `data` (`content || mac`) in constant time.
///
/// Whatever the padding said, the hash runs over as many compression blocks
/// as the longest possible content would need.
fn check_cbc_mac(
    mac: &mut RecordMac,
    content_type: u8,
    data: &[u8],
    ciphered_len: usize,
    sequence: Option<&[u8; 8]>,
) -> Result<(), Error> {
    let alg = mac.alg();
    let tag_len = alg.size();

    // Shorter than a tag: MAC nothing and compare against what there is.
    let (content, received, short) = match data.len().checked_sub(tag_len) {
        Some(n) => (&data[..n], &data[n..], false),
        None => (&data[..0], data, true),
    };

    let expected = mac.compute(content_type, content, sequence, false)?;
    let check = compare_mac_tags(received, &expected);

    let remaining = calculate_remaining_len(alg, ciphered_len, content.len());
    let filler = vec![0u8; remaining + tag_len];
    let (filler_data, filler_tag) = filler.split_at(remaining);
    let simulated = mac.compute(content_type, filler_data, sequence, true)?;
    black_box(compare_mac_tags(filler_tag, &simulated));

    if short || !check.is_ok() {
        return Err(Error::BadRecordMac);
    }
    Ok(())
}

#[derive(Debug)]
pub(crate) struct BlockWriteCipher {
    cipher: CbcCipher,
    mac: RecordMac,
    explicit_iv: bool,
    rng: SeededRng,
}

impl BlockWriteCipher {
    pub fn new(
        bulk: BulkCipher,
        explicit_iv: bool,
        keys: &RecordKeys<'_>,
        mac: RecordMac,
        rng: SeededRng,
    ) -> Result<Self, Error> {
        Ok(BlockWriteCipher {
            cipher: cbc_for(bulk, explicit_iv, keys)?,
            mac,
            explicit_iv,
            rng,
        })
    }

    fn iv_len(&self) -> usize {
        if self.explicit_iv {
            self.cipher.block_size()
        } else {
            0
        }
    }

    fn tag_len(&self) -> usize {
        if self.mac.alg() == MacAlg::Null {
            0
        } else {
            self.mac.alg().size()
        }
    }
}

impl WriteCipher for BlockWriteCipher {
    fn encrypt(&mut self, content_type: u8, buf: &mut Vec<u8>) -> Result<usize, Error> {
        add_mac(&mut self.mac, content_type, buf)?;

        if self.explicit_iv {
            let mut iv = [0u8; 16];
            let iv = &mut iv[..self.cipher.block_size()];
            self.rng.fill(iv);
            buf.splice(0..0, iv.iter().copied());
        }

        let len = padding::add_padding(buf, self.cipher.block_size());
        self.cipher.encrypt(buf)?;
        trace!("CBC record out: {} bytes", len);
        Ok(len)
    }

    fn explicit_nonce_size(&self) -> usize {
        self.iv_len()
    }

    fn calculate_fragment_size(&self, packet_limit: usize, header_size: usize) -> usize {
        let bs = self.cipher.block_size();
        let mut fragment = packet_limit.saturating_sub(header_size + self.iv_len());
        fragment -= fragment % bs;
        // One padding byte and the MAC.
        fragment.saturating_sub(1 + self.tag_len())
    }

    fn calculate_packet_size(&self, fragment_size: usize, header_size: usize) -> usize {
        let bs = self.cipher.block_size();
        let mut padded = fragment_size + self.tag_len() + 1;
        if padded % bs != 0 {
            padded += bs - padded % bs;
        }
        header_size + self.iv_len() + padded
    }

    fn is_cbc_mode(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::Authenticator;

    const KEY: [u8; 16] = [0x0Fu8; 16];
    const IV: [u8; 16] = [0xA5u8; 16];
    const MAC_KEY: [u8; 20] = [0x33u8; 20];

    fn pair(version: ProtocolVersion, explicit_iv: bool) -> (BlockWriteCipher, BlockReadCipher) {
        let keys = RecordKeys::new(&KEY, &IV, &MAC_KEY);
        let mac = || RecordMac::new(MacAlg::Sha1, &MAC_KEY, Authenticator::new(version)).unwrap();
        let w = BlockWriteCipher::new(
            BulkCipher::Aes128,
            explicit_iv,
            &keys,
            mac(),
            SeededRng::new(Some(7)),
        )
        .unwrap();
        let r = BlockReadCipher::new(BulkCipher::Aes128, explicit_iv, &keys, mac()).unwrap();
        (w, r)
    }

    #[test]
    fn chained_iv_records() {
        let _ = env_logger::try_init();
        let (mut w, mut r) = pair(ProtocolVersion::Tls10, false);

        for i in 0..5 {
            let msg = vec![i as u8; i * 7];
            let mut buf = msg.clone();
            let n = w.encrypt(23, &mut buf).unwrap();
            assert_eq!(n % 16, 0);
            assert_eq!(n, buf.len());

            let pt = r.decrypt(23, &mut buf, None).unwrap();
            assert_eq!(&buf[pt.fragment], &msg[..]);
        }
    }

    #[test]
    fn explicit_iv_records() {
        let (mut w, mut r) = pair(ProtocolVersion::Tls12, true);
        let mut buf = b"GET / HTTP/1.1".to_vec();
        let n = w.encrypt(23, &mut buf).unwrap();
        // IV block plus 14 + 20 + padding to 48.
        assert_eq!(n, 16 + 48);

        let pt = r.decrypt(23, &mut buf, None).unwrap();
        assert_eq!(pt.fragment, 16..30);
        assert_eq!(&buf[pt.fragment], b"GET / HTTP/1.1");
    }

    #[test]
    fn tampered_ciphertext_is_bad_record_mac() {
        let (mut w, mut r) = pair(ProtocolVersion::Tls12, true);
        let mut buf = b"attack at dawn".to_vec();
        w.encrypt(23, &mut buf).unwrap();
        let last = buf.len() - 1;
        buf[last] ^= 0x80;
        assert_eq!(r.decrypt(23, &mut buf, None), Err(Error::BadRecordMac));
    }

    #[test]
    fn misaligned_or_short_is_bad_record_mac() {
        let (_, mut r) = pair(ProtocolVersion::Tls12, true);
        let mut buf = [0u8; 33];
        assert_eq!(r.decrypt(23, &mut buf, None), Err(Error::BadRecordMac));

        let (_, mut r) = pair(ProtocolVersion::Tls12, true);
        let mut buf = [0u8; 16];
        assert_eq!(r.decrypt(23, &mut buf, None), Err(Error::BadRecordMac));
    }

    #[test]
    fn garbage_padding_still_hashes_and_fails() {
        let (_, mut r) = pair(ProtocolVersion::Tls11, true);
        let mut buf = [0x5Au8; 64];
        assert_eq!(r.decrypt(23, &mut buf, None), Err(Error::BadRecordMac));
    }

    #[test]
    fn data_shorter_than_tag_still_compares() {
        let sha1 = || {
            let auth = Authenticator::new(ProtocolVersion::Tls12);
            RecordMac::new(MacAlg::Sha1, &MAC_KEY, auth).unwrap()
        };

        let mut mac = sha1();
        let result = check_cbc_mac(&mut mac, 23, &[0u8; 7], 32, None);
        assert_eq!(result, Err(Error::BadRecordMac));
        // The real MAC ran and consumed a sequence number.
        assert_eq!(mac.authenticator().sequence_number()[7], 1);

        // A truncated copy of the right tag is still a mismatch.
        let expected = sha1().compute(23, &[], None, false).unwrap();
        let mut mac = sha1();
        let result = check_cbc_mac(&mut mac, 23, &expected[..19], 32, None);
        assert_eq!(result, Err(Error::BadRecordMac));
    }

    #[test]
    fn sizes_tls10() {
        let (w, r) = pair(ProtocolVersion::Tls10, false);
        assert_eq!(w.explicit_nonce_size(), 0);
        // 100 - 5 = 95 -> 80, minus padding byte and MAC.
        assert_eq!(w.calculate_fragment_size(100, 5), 59);
        // 59 + 20 + 1 = 80, already aligned.
        assert_eq!(w.calculate_packet_size(59, 5), 85);
        assert_eq!(r.estimate_fragment_size(100, 5), 74);
        assert!(w.is_cbc_mode());
    }

    #[test]
    fn sizes_tls11() {
        let (w, r) = pair(ProtocolVersion::Tls11, true);
        assert_eq!(w.explicit_nonce_size(), 16);
        // 100 - 5 - 16 = 79 -> 64, minus 21.
        assert_eq!(w.calculate_fragment_size(100, 5), 43);
        assert_eq!(w.calculate_packet_size(43, 5), 5 + 16 + 64);
        assert_eq!(r.estimate_fragment_size(100, 5), 58);
    }

    #[test]
    fn sequence_numbers_stay_in_step_after_failure() {
        let (mut w, mut r) = pair(ProtocolVersion::Tls12, true);

        let mut bad = b"one".to_vec();
        w.encrypt(23, &mut bad).unwrap();
        bad[20] ^= 1;
        assert!(r.decrypt(23, &mut bad, None).is_err());

        let mut good = b"two".to_vec();
        w.encrypt(23, &mut good).unwrap();
        let pt = r.decrypt(23, &mut good, None).unwrap();
        assert_eq!(&good[pt.fragment], b"two");
    }
}
