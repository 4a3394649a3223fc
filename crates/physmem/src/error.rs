//! Error types returned by the zone table, the page allocator and the slab allocator.

use crate::{HumanSize, PhysicalAddress};

/// Fatal errors raised while building the zone table.
///
/// None of these can be recovered from: the kernel has no page allocator without a zone table
/// and should halt with the error's message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum InitError {
    /// The memory map contains no usable page.
    #[error("no usable physical memory")]
    NoUsableMemory,
    /// Splitting usable memory at the capability thresholds produced more zones than fit in the
    /// zone table.
    #[error("{count} zones exceed the zone table capacity")]
    TooManyZones { count: usize },
    /// No usable range is large enough to hold the per-page metadata.
    #[error("no usable range can hold {} of allocator metadata", HumanSize(*required))]
    MetadataExhausted { required: usize },
}

/// Errors returned when a page allocation cannot be satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AllocError {
    /// A zero-page allocation was requested.
    #[error("cannot allocate zero pages")]
    ZeroPages,
    /// The capability mask was empty.
    #[error("empty zone capability mask")]
    EmptyCapability,
    /// The request (including its alignment) needs a block of order `order` or larger, beyond
    /// the largest block a buddy can hold.
    #[error("order {order} exceeds the largest block order")]
    OrderTooLarge { order: usize },
    /// No zone with the requested capabilities has a large enough free block.
    #[error("out of physical memory")]
    OutOfMemory,
}

/// Errors returned when freeing pages.
///
/// A failed free never changes allocator state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum FreeError {
    /// The address does not belong to any zone.
    #[error("address is not managed by any zone")]
    UnknownAddress,
    /// The address is not page aligned.
    #[error("address is not page aligned")]
    Misaligned,
    /// The address lies inside a block but is not its first page.
    #[error("address is not the start of a block")]
    NotBlockStart,
    /// The block starting at the address is already free.
    #[error("block is already free")]
    DoubleFree,
    /// The per-page metadata holds an order no block can have.
    #[error("page metadata holds invalid order {order}")]
    CorruptOrder { order: usize },
}

/// Errors returned by the slab allocator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SlabError {
    /// The size has no slab class; the caller wanted the page path.
    #[error("{size} bytes exceeds the largest slab class")]
    TooLarge { size: usize },
    /// The slab page header at `page` failed its magic check.
    #[error("slab page {page} is corrupted")]
    Corrupted { page: PhysicalAddress },
    /// The address is inside a slab page but not on an object boundary.
    #[error("address is not a slab object")]
    NotSlabObject,
    /// The address is not a live allocation of this allocator.
    #[error("address is not allocated")]
    NotAllocated,
    /// The table of page-granular allocations is full.
    #[error("large allocation table is full")]
    TrackingFull,
    /// The page allocator could not provide a page.
    #[error(transparent)]
    Page(#[from] AllocError),
}

/// Returned when a fixed-capacity region array cannot take another range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("region array is full")]
pub struct RegionsFull;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_exhaustion_names_required_size() {
        let err = InitError::MetadataExhausted { required: 3 << 20 };
        assert_eq!(
            format!("{err}"),
            "no usable range can hold 3MiB of allocator metadata"
        );
    }

    #[test]
    fn slab_error_wraps_page_errors() {
        let err: SlabError = AllocError::OutOfMemory.into();
        assert_eq!(err, SlabError::Page(AllocError::OutOfMemory));
        assert_eq!(format!("{err}"), "out of physical memory");
    }
}
