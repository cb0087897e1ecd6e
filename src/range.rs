//! IPv4 Range Expansion
//!
//! Turns an inclusive `[start, end]` address range into the minimal ordered
//! set of CIDR blocks covering it exactly, with no overlap and no gap.

use crate::error::{BuildError, Result};
use std::fmt;

/// One CIDR block: a network address and a prefix length
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cidr {
    /// Network address (low `32 - prefix_len` bits are zero)
    pub network: u32,
    /// Prefix length, 0..=32
    pub prefix_len: u8,
}

impl Cidr {
    /// Number of addresses covered by this block
    pub fn address_count(&self) -> u64 {
        1u64 << (32 - self.prefix_len)
    }

    /// Last address of this block
    pub fn broadcast(&self) -> u32 {
        (self.network as u64 + self.address_count() - 1) as u32
    }
}

impl fmt::Display for Cidr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let n = self.network;
        write!(
            f,
            "{}.{}.{}.{}/{}",
            n >> 24,
            (n >> 16) & 0xFF,
            (n >> 8) & 0xFF,
            n & 0xFF,
            self.prefix_len
        )
    }
}

/// Compute the minimal CIDR cover of an inclusive address range
///
/// Standard greedy expansion: at each step emit the largest block whose
/// network address equals the cursor and whose broadcast does not pass
/// `end`. Blocks come out in ascending address order. The cursor is a u64
/// so a range ending at 255.255.255.255 terminates.
pub fn summarize_range(start: u32, end: u32) -> Result<Vec<Cidr>> {
    if start > end {
        return Err(BuildError::Input(format!(
            "range start {} exceeds end {}",
            start, end
        )));
    }

    let mut cover = Vec::new();
    let mut cursor = start as u64;
    let end = end as u64;

    while cursor <= end {
        // Largest block at the cursor: limited by the cursor's alignment
        // and by the number of addresses left.
        let align = if cursor == 0 {
            32
        } else {
            cursor.trailing_zeros().min(32)
        };
        let span = end - cursor + 1;
        let fit = 63 - span.leading_zeros();
        let host_bits = align.min(fit);

        cover.push(Cidr {
            network: cursor as u32,
            prefix_len: (32 - host_bits) as u8,
        });
        cursor += 1u64 << host_bits;
    }

    Ok(cover)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_single_host() {
        let cover = summarize_range(0x01020304, 0x01020304).unwrap();
        assert_eq!(
            cover,
            vec![Cidr {
                network: 0x01020304,
                prefix_len: 32
            }]
        );
    }

    #[test]
    fn test_full_span_is_default_route() {
        let cover = summarize_range(0, u32::MAX).unwrap();
        assert_eq!(
            cover,
            vec![Cidr {
                network: 0,
                prefix_len: 0
            }]
        );
    }

    #[test]
    fn test_aligned_slash24() {
        // 1.0.0.0 - 1.0.0.255
        let cover = summarize_range(16777216, 16777471).unwrap();
        assert_eq!(
            cover,
            vec![Cidr {
                network: 16777216,
                prefix_len: 24
            }]
        );
        assert_eq!(cover[0].to_string(), "1.0.0.0/24");
    }

    #[test]
    fn test_unaligned_range() {
        // 0.0.0.3 - 0.0.0.9 -> /32 + /30 + /31
        let cover = summarize_range(3, 9).unwrap();
        let rendered: Vec<String> = cover.iter().map(|c| c.to_string()).collect();
        assert_eq!(rendered, vec!["0.0.0.3/32", "0.0.0.4/30", "0.0.0.8/31"]);
    }

    #[test]
    fn test_range_ending_at_max_terminates() {
        let cover = summarize_range(u32::MAX - 1, u32::MAX).unwrap();
        assert_eq!(cover.len(), 1);
        assert_eq!(cover[0].prefix_len, 31);
        assert_eq!(cover[0].broadcast(), u32::MAX);
    }

    #[test]
    fn test_start_after_end_rejected() {
        assert!(matches!(
            summarize_range(10, 9),
            Err(BuildError::Input(_))
        ));
    }

    proptest! {
        #[test]
        fn cover_is_exact_and_disjoint(start in any::<u32>(), len in 0u32..100_000) {
            let end = start.saturating_add(len);
            let cover = summarize_range(start, end).unwrap();

            // Contiguous, in order, and exactly spanning [start, end]
            let mut cursor = start as u64;
            for cidr in &cover {
                prop_assert_eq!(cidr.network as u64, cursor);
                // Network address is aligned to the prefix
                let host_bits = 32 - cidr.prefix_len as u32;
                if host_bits < 32 {
                    prop_assert_eq!(cidr.network & ((1u32 << host_bits) - 1), 0);
                }
                cursor += cidr.address_count();
            }
            prop_assert_eq!(cursor, end as u64 + 1);
        }
    }
}
