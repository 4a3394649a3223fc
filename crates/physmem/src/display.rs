//! Formatting helpers for sizes and addresses in diagnostics.

use core::fmt;

/// Formats a byte count with binary prefixes, e.g. `4KiB`, `1.5MiB`, `16MiB`.
///
/// At most two fractional digits are printed, truncated rather than rounded, with trailing
/// zeros dropped.
///
/// ```
/// use physmem::HumanSize;
///
/// assert_eq!(format!("{}", HumanSize(512)), "512B");
/// assert_eq!(format!("{}", HumanSize(1536)), "1.5KiB");
/// assert_eq!(format!("{}", HumanSize(16 << 20)), "16MiB");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct HumanSize(pub usize);

impl From<usize> for HumanSize {
    #[inline]
    fn from(bytes: usize) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for HumanSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const UNITS: [&str; 7] = ["B", "KiB", "MiB", "GiB", "TiB", "PiB", "EiB"];

        let bytes = self.0 as u128;
        let mut unit = 0;
        while unit + 1 < UNITS.len() && bytes >> (10 * (unit + 1)) > 0 {
            unit += 1;
        }

        let shift = 10 * unit;
        let whole = bytes >> shift;
        let hundredths = ((bytes & ((1u128 << shift) - 1)) * 100) >> shift;

        match hundredths {
            0 => write!(f, "{whole}{}", UNITS[unit]),
            h if h % 10 == 0 => write!(f, "{whole}.{}{}", h / 10, UNITS[unit]),
            h => write!(f, "{whole}.{h:02}{}", UNITS[unit]),
        }
    }
}

/// Formats an address as uppercase hex with `_` between groups of four digits,
/// e.g. `0x1_0000_0000`.
///
/// ```
/// use physmem::HumanAddress;
///
/// assert_eq!(format!("{}", HumanAddress(0)), "0x0");
/// assert_eq!(format!("{}", HumanAddress(0x1000)), "0x1000");
/// assert_eq!(format!("{}", HumanAddress(0xDEAD_BEEF_CAFE)), "0xDEAD_BEEF_CAFE");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct HumanAddress(pub usize);

impl From<crate::PhysicalAddress> for HumanAddress {
    #[inline]
    fn from(addr: crate::PhysicalAddress) -> Self {
        Self(addr.as_usize())
    }
}

impl fmt::Display for HumanAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const DIGITS: &[u8; 16] = b"0123456789ABCDEF";

        let digits = (usize::BITS - self.0.leading_zeros()).div_ceil(4).max(1) as usize;

        f.write_str("0x")?;
        for i in (0..digits).rev() {
            let nibble = (self.0 >> (i * 4)) & 0xF;
            write!(f, "{}", DIGITS[nibble] as char)?;
            if i != 0 && i % 4 == 0 {
                f.write_str("_")?;
            }
        }
        Ok(())
    }
}
