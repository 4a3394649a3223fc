//! Physical frame numbers.

use core::fmt;
use core::ops::{Add, Sub};

use crate::{PAGE_SIZE, PhysicalAddress};

/// A physical page frame number.
///
/// Frame `n` covers the physical bytes `[n * PAGE_SIZE, (n + 1) * PAGE_SIZE)`. Buddy blocks are
/// aligned on frame numbers, so the buddy of a block of order `k` is found by flipping bit `k`
/// of its first frame number.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct FrameNumber(usize);

impl FrameNumber {
    /// Creates a frame number.
    #[inline]
    pub const fn new(number: usize) -> Self {
        Self(number)
    }

    /// Returns the raw frame number.
    #[inline]
    pub const fn as_usize(self) -> usize {
        self.0
    }

    /// Returns the physical address of the first byte of this frame.
    #[inline]
    pub const fn start(self) -> PhysicalAddress {
        PhysicalAddress::new(self.0 * PAGE_SIZE)
    }

    /// Returns the first frame of the buddy of the order-`order` block starting here.
    #[inline]
    pub const fn buddy(self, order: usize) -> Self {
        Self(self.0 ^ (1 << order))
    }

    /// Returns the largest order whose block size this frame number is aligned to.
    #[inline]
    pub const fn alignment_order(self) -> usize {
        if self.0 == 0 {
            usize::BITS as usize
        } else {
            self.0.trailing_zeros() as usize
        }
    }
}

impl fmt::Debug for FrameNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FrameNumber({})", self.0)
    }
}

impl fmt::Display for FrameNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<PhysicalAddress> for FrameNumber {
    #[inline]
    fn from(addr: PhysicalAddress) -> Self {
        addr.frame_number()
    }
}

impl Add<usize> for FrameNumber {
    type Output = Self;

    #[inline]
    fn add(self, rhs: usize) -> Self::Output {
        Self(self.0 + rhs)
    }
}

impl Sub<FrameNumber> for FrameNumber {
    type Output = usize;

    #[inline]
    fn sub(self, rhs: FrameNumber) -> Self::Output {
        self.0 - rhs.0
    }
}
