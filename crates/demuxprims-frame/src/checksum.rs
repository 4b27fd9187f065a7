//! CRC-CCITT frame trailer.
//!
//! Both supported protocol generations close every frame with a 16-bit
//! CRC-CCITT (polynomial `0x1021`, initial value `0xFFFF`, no reflection, no
//! final xor) computed over every byte of the frame except the trailer itself,
//! stored big-endian.

use bytes::{BufMut, BytesMut};

use crate::error::{FrameError, Result};

/// Size of the trailing checksum word.
pub const CHECKSUM_SIZE: usize = 2;

const POLYNOMIAL: u16 = 0x1021;
const INITIAL_VALUE: u16 = 0xFFFF;

static TABLE: [u16; 256] = build_table();

const fn build_table() -> [u16; 256] {
    let mut table = [0u16; 256];
    let mut index = 0;
    while index < 256 {
        let mut crc = (index as u16) << 8;
        let mut bit = 0;
        while bit < 8 {
            crc = if crc & 0x8000 != 0 {
                (crc << 1) ^ POLYNOMIAL
            } else {
                crc << 1
            };
            bit += 1;
        }
        table[index] = crc;
        index += 1;
    }
    table
}

/// Compute CRC-CCITT over `data`.
pub fn crc_ccitt(data: &[u8]) -> u16 {
    data.iter().fold(INITIAL_VALUE, |crc, &byte| {
        (crc << 8) ^ TABLE[usize::from((crc >> 8) ^ u16::from(byte))]
    })
}

/// Returns true if the frame at `buf[start..start + length]` carries a valid trailer.
///
/// The checksum covers `[start, start + length - 2)` and is compared against
/// the big-endian word in the final two bytes. Ranges that do not fit inside
/// `buf`, or are too short to hold a trailer, are never valid.
pub fn checksum_is_valid(buf: &[u8], start: usize, length: usize) -> bool {
    verify_checksum(buf, start, length).is_ok()
}

/// Like [`checksum_is_valid`] but reports why the trailer was rejected.
pub fn verify_checksum(buf: &[u8], start: usize, length: usize) -> Result<()> {
    if length < CHECKSUM_SIZE {
        return Err(FrameError::InvalidLength {
            field: "checksummed length",
            value: length,
            reason: "too short to hold a checksum",
        });
    }
    let end = start.saturating_add(length);
    if end > buf.len() {
        return Err(FrameError::Incomplete {
            needed: length,
            available: buf.len().saturating_sub(start),
        });
    }

    let body_end = end - CHECKSUM_SIZE;
    let computed = crc_ccitt(&buf[start..body_end]);
    let received = u16::from_be_bytes([buf[body_end], buf[body_end + 1]]);
    if computed != received {
        return Err(FrameError::ChecksumInvalid { computed, received });
    }
    Ok(())
}

/// Append the CRC-CCITT of `dst[start..]` to `dst`, big-endian.
pub fn append_checksum(dst: &mut BytesMut, start: usize) {
    let crc = crc_ccitt(&dst[start..]);
    dst.put_u16(crc);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_frame() -> BytesMut {
        let mut buf = BytesMut::new();
        buf.put_slice(&[0x4B, 0x2F, 0x1C, 0x00, 0x00, 0x05, 0x00, 0x0E, 0xDE, 0xAD, 0xBE, 0xEF]);
        append_checksum(&mut buf, 0);
        buf
    }

    #[test]
    fn matches_ccitt_false_check_value() {
        assert_eq!(crc_ccitt(b"123456789"), 0x29B1);
    }

    #[test]
    fn empty_input_is_initial_value() {
        assert_eq!(crc_ccitt(&[]), 0xFFFF);
    }

    #[test]
    fn appended_checksum_validates() {
        let buf = sample_frame();
        assert!(checksum_is_valid(&buf, 0, buf.len()));
    }

    #[test]
    fn validates_at_nonzero_offset() {
        let mut buf = BytesMut::from(&[0xFF, 0xFF, 0xFF][..]);
        buf.put_slice(b"payload");
        append_checksum(&mut buf, 3);
        assert!(checksum_is_valid(&buf, 3, buf.len() - 3));
        assert!(!checksum_is_valid(&buf, 0, buf.len()));
    }

    #[test]
    fn single_bit_flip_invalidates() {
        let original = sample_frame();
        let covered = original.len() - CHECKSUM_SIZE;
        for byte in 0..covered {
            for bit in 0..8 {
                let mut corrupted = original.clone();
                corrupted[byte] ^= 1 << bit;
                assert!(
                    !checksum_is_valid(&corrupted, 0, corrupted.len()),
                    "flip of byte {byte} bit {bit} went undetected"
                );
            }
        }
    }

    #[test]
    fn corrupted_trailer_reports_both_values() {
        let mut buf = sample_frame();
        let last = buf.len() - 1;
        buf[last] ^= 0x01;
        let err = verify_checksum(&buf, 0, buf.len()).unwrap_err();
        assert!(matches!(err, FrameError::ChecksumInvalid { computed, received } if computed != received));
    }

    #[test]
    fn out_of_range_length_is_incomplete() {
        let buf = sample_frame();
        let err = verify_checksum(&buf, 0, buf.len() + 4).unwrap_err();
        assert!(err.is_incomplete());
        assert!(!checksum_is_valid(&buf, 0, 1));
    }
}
