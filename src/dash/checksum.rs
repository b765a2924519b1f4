//! # Frame Checksum
//!
//! Additive checksum used by the dashboard: the sum of all bytes between the
//! start marker and the checksum byte, modulo 256.

/// Calculate the additive checksum of `data`
///
/// # Arguments
///
/// * `data` - Frame bytes after the start marker, excluding the checksum
///
/// # Examples
///
/// ```
/// use simdash_bridge::dash::checksum::checksum;
///
/// assert_eq!(checksum(&[0x80, 0x80, 0x01]), 0x01);
/// ```
pub fn checksum(data: &[u8]) -> u8 {
    data.iter().fold(0u8, |sum, &byte| sum.wrapping_add(byte))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Reference implementation over a wide accumulator
    fn checksum_wide(data: &[u8]) -> u8 {
        (data.iter().map(|&b| u32::from(b)).sum::<u32>() % 256) as u8
    }

    #[test]
    fn test_checksum_empty() {
        assert_eq!(checksum(&[]), 0x00);
    }

    #[test]
    fn test_checksum_wraps() {
        assert_eq!(checksum(&[0xFF, 0x01]), 0x00);
        assert_eq!(checksum(&[0xFF, 0xFF]), 0xFE);
    }

    #[test]
    fn test_checksum_matches_wide_sum() {
        let test_data = [
            vec![0x01, 0x02, 0x03],
            vec![0xFF; 31],
            vec![0x1A, 0x0A, 0x10, 0x14, 0x1E, 0x00],
            (0..=255u8).collect::<Vec<_>>(),
        ];

        for data in test_data.iter() {
            assert_eq!(checksum(data), checksum_wide(data), "Checksum mismatch for {:?}", data);
        }
    }

    #[test]
    fn test_checksum_changes_with_data() {
        assert_ne!(checksum(&[0x10, 0x20]), checksum(&[0x10, 0x21]));
    }
}
