//! CBC block padding.
//!
//! TLS pads with `n + 1` bytes each holding the value `n`. SSL 3.0 only
//! defines the final length byte, the fill bytes are arbitrary.

use crate::types::ProtocolVersion;
use crate::Error;

/// Pad `buf` to the next multiple of `block_size`.
///
/// Always adds at least one byte. Returns the padded length.
pub fn add_padding(buf: &mut Vec<u8>, block_size: usize) -> usize {
    let len = buf.len();
    let mut new_len = len + 1;
    if new_len % block_size != 0 {
        new_len += block_size - 1;
        new_len -= new_len % block_size;
    }

    let pad = (new_len - len) as u8;
    buf.resize(new_len, pad - 1);
    new_len
}

/// Strip the padding from a decrypted CBC fragment.
///
/// `buf` holds `content || mac || padding`. Returns the length of
/// `content || mac`. The padding bytes are scanned in constant time
/// whether or not they turn out valid.
pub fn remove_padding(
    buf: &[u8],
    tag_len: usize,
    block_size: usize,
    version: ProtocolVersion,
) -> Result<usize, Error> {
    let Some(&pad_len) = buf.last() else {
        return Err(Error::BadRecordMac);
    };

    let len = buf.len() as isize;
    let new_len = len - (pad_len as isize + 1);

    if new_len - (tag_len as isize) < 0 {
        // Same amount of work as a well formed record.
        check_padding(buf, pad_len);
        return Err(Error::BadRecordMac);
    }

    let check = check_padding(&buf[new_len as usize..], pad_len);
    if version.uses_tls10_plus() {
        if check.0 != 0 {
            return Err(Error::BadRecordMac);
        }
    } else if pad_len as usize > block_size {
        return Err(Error::BadRecordMac);
    }

    Ok(new_len as usize)
}

/// Compare 257 bytes against `pad`, cycling over `region`.
///
/// Returns `(mismatched, matched)`. The iteration count does not depend on
/// the region length, which covers every possible padding length.
pub fn check_padding(region: &[u8], pad: u8) -> (usize, usize) {
    let mut results = (0, 0);
    if region.is_empty() {
        return results;
    }

    for b in region.iter().cycle().take(257) {
        if *b != pad {
            results.0 += 1;
        } else {
            results.1 += 1;
        }
    }
    results
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn padding_is_inverse_for_all_lengths() {
        for &bs in &[8usize, 16] {
            for len in 0..=(4 * bs) {
                let content: Vec<u8> = (0..len).map(|i| i as u8).collect();
                let mut buf = content.clone();
                let padded = add_padding(&mut buf, bs);

                assert_eq!(padded % bs, 0);
                assert!(padded > len);
                assert_eq!(buf.len(), padded);

                let stripped = remove_padding(&buf, 0, bs, ProtocolVersion::Tls12).unwrap();
                assert_eq!(stripped, len);
                assert_eq!(&buf[..stripped], &content[..]);
            }
        }
    }

    #[test]
    fn aligned_input_gets_full_block() {
        let mut buf = vec![0u8; 16];
        assert_eq!(add_padding(&mut buf, 16), 32);
        assert!(buf[16..].iter().all(|b| *b == 15));
    }

    #[test]
    fn bad_fill_byte_rejected_for_tls() {
        let mut buf = vec![1u8; 5];
        add_padding(&mut buf, 8);
        buf[5] ^= 0x40;
        assert_eq!(
            remove_padding(&buf, 0, 8, ProtocolVersion::Tls10),
            Err(Error::BadRecordMac)
        );
    }

    #[test]
    fn ssl3_only_checks_length() {
        let mut buf = vec![1u8; 5];
        add_padding(&mut buf, 8);
        buf[5] ^= 0x40;
        assert_eq!(remove_padding(&buf, 0, 8, ProtocolVersion::Ssl30), Ok(5));

        let mut long = vec![0u8; 32];
        long[31] = 20;
        assert_eq!(
            remove_padding(&long, 0, 8, ProtocolVersion::Ssl30),
            Err(Error::BadRecordMac)
        );
    }

    #[test]
    fn padding_longer_than_record_rejected() {
        let buf = [0xFFu8; 16];
        assert_eq!(
            remove_padding(&buf, 0, 16, ProtocolVersion::Tls12),
            Err(Error::BadRecordMac)
        );
    }

    #[test]
    fn padding_eating_into_mac_rejected() {
        let mut buf = vec![0u8; 32];
        buf[31] = 15;
        buf[16..].iter_mut().for_each(|b| *b = 15);
        assert_eq!(
            remove_padding(&buf, 20, 16, ProtocolVersion::Tls12),
            Err(Error::BadRecordMac)
        );
    }

    #[test]
    fn check_padding_always_257() {
        let (a, b) = check_padding(&[3, 3, 3, 3], 3);
        assert_eq!((a, b), (0, 257));
        let (a, b) = check_padding(&[1], 3);
        assert_eq!(a + b, 257);
    }
}
