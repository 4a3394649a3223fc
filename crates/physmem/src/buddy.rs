//! Binary buddy allocator for one zone.
//!
//! The allocator manages a page-aligned physical range in blocks of `2^order` pages for
//! orders `0..MAX_ORDER`. Blocks are aligned on absolute frame numbers, so the buddy of a
//! block is found by flipping bit `order` of its first frame number.
//!
//! Per-page metadata lives in a [`PageFrame`] slice provided by the caller. Free lists are
//! singly linked through that slice by page index; the managed memory itself is never read or
//! written.

use crate::{
    AllocError, BlockState, FreeError, FrameNumber, HumanSize, MAX_ORDER, PAGE_SHIFT, PAGE_SIZE,
    PageFrame, PhysicalAddress, PhysicalRange,
};

/// Largest order a seeded or coalesced block can reach.
const TOP_ORDER: usize = MAX_ORDER - 1;

/// Head and length of one order's free list.
#[derive(Debug, Clone, Copy)]
struct FreeList {
    head: Option<usize>,
    count: usize,
}

impl FreeList {
    const fn new() -> Self {
        Self {
            head: None,
            count: 0,
        }
    }
}

/// Returns the smallest order whose blocks satisfy `align` bytes of alignment.
///
/// Alignments up to a page need no raised order. Alignments that are not a power of two are
/// rounded up to one.
pub fn alignment_order(align: usize) -> Option<usize> {
    if align <= PAGE_SIZE {
        return Some(0);
    }
    let align = align.checked_next_power_of_two()?;
    Some(align.trailing_zeros() as usize - PAGE_SHIFT)
}

/// Returns the smallest order whose blocks hold `count` pages.
pub const fn order_for_pages(count: usize) -> usize {
    if count <= 1 {
        0
    } else {
        (usize::BITS - (count - 1).leading_zeros()) as usize
    }
}

/// A binary buddy allocator over one page-aligned physical range.
pub struct BuddyAllocator {
    range: PhysicalRange,
    first_frame: FrameNumber,
    frames: &'static mut [PageFrame],
    free_lists: [FreeList; MAX_ORDER],
    free_pages: usize,
}

impl BuddyAllocator {
    /// Creates an allocator managing no memory.
    pub const fn empty() -> Self {
        Self {
            range: PhysicalRange::new(PhysicalAddress::new(0), 0),
            first_frame: FrameNumber::new(0),
            frames: &mut [],
            free_lists: [const { FreeList::new() }; MAX_ORDER],
            free_pages: 0,
        }
    }

    /// Creates an allocator for the whole pages of `range`, with every page free.
    ///
    /// `frames` holds the per-page metadata and must have one entry per whole page of the
    /// range. Its previous contents are overwritten. A range without a whole page yields an
    /// empty allocator.
    ///
    /// # Panics
    ///
    /// Panics if `frames` is shorter than the number of whole pages in `range`, or if the range
    /// has more pages than a free-list link can index.
    pub fn new(range: PhysicalRange, frames: &'static mut [PageFrame]) -> Self {
        let range = range.page_aligned();
        let total = range.page_count();
        assert!(
            frames.len() >= total,
            "buddy metadata holds {} pages, range needs {total}",
            frames.len()
        );
        assert!(total < crate::frame::NIL as usize, "buddy range too large");

        let (frames, _) = frames.split_at_mut(total);
        let mut buddy = Self {
            range,
            first_frame: range.base().frame_number(),
            frames,
            free_lists: [const { FreeList::new() }; MAX_ORDER],
            free_pages: 0,
        };
        buddy.seed();
        buddy
    }

    /// Covers the range with the largest naturally aligned blocks that fit, lowest address
    /// first in every free list.
    fn seed(&mut self) {
        self.frames.fill(PageFrame::TAIL);

        let total = self.frames.len();
        let mut tails: [Option<usize>; MAX_ORDER] = [None; MAX_ORDER];
        let mut index = 0;

        while index < total {
            let frame = self.first_frame + index;
            let mut order = frame.alignment_order().min(TOP_ORDER);
            while index + (1 << order) > total {
                order -= 1;
            }

            self.frames[index].set_state(BlockState::Free(order as u8));
            match tails[order] {
                Some(tail) => self.frames[tail].set_next(Some(index)),
                None => self.free_lists[order].head = Some(index),
            }
            tails[order] = Some(index);
            self.free_lists[order].count += 1;

            index += 1 << order;
        }

        self.free_pages = total;
    }

    /// Returns the managed range.
    pub fn range(&self) -> PhysicalRange {
        self.range
    }

    /// Returns the number of managed pages.
    pub fn total_pages(&self) -> usize {
        self.frames.len()
    }

    /// Returns the number of free pages.
    pub fn free_pages(&self) -> usize {
        self.free_pages
    }

    /// Returns true if the allocator manages no memory.
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Returns true if `addr` lies in the managed range.
    pub fn contains(&self, addr: PhysicalAddress) -> bool {
        self.range.contains(addr)
    }

    /// Returns the number of free blocks of the given order.
    pub fn free_blocks(&self, order: usize) -> usize {
        self.free_lists.get(order).map_or(0, |list| list.count)
    }

    /// Returns the number of free blocks of every order.
    pub fn free_block_counts(&self) -> [usize; MAX_ORDER] {
        core::array::from_fn(|order| self.free_lists[order].count)
    }

    /// Returns the largest order with a free block.
    pub fn largest_free_order(&self) -> Option<usize> {
        (0..MAX_ORDER).rev().find(|&order| self.free_lists[order].count > 0)
    }

    /// Returns the block state of the page at `addr`.
    pub fn block_state(&self, addr: PhysicalAddress) -> Option<BlockState> {
        self.index_of(addr).map(|index| self.frames[index].state())
    }

    /// Allocates a block of `2^order` pages whose address is a multiple of `align` bytes.
    ///
    /// Alignment stronger than the block's own size starts the search at a higher order; the
    /// block found is then split down to `order`, keeping its lower half each time, so the
    /// result inherits the alignment of the block found.
    pub fn allocate(&mut self, order: usize, align: usize) -> Result<PhysicalAddress, AllocError> {
        if order >= MAX_ORDER {
            return Err(AllocError::OrderTooLarge { order });
        }

        let align_order = alignment_order(align).ok_or(AllocError::OrderTooLarge {
            order: usize::BITS as usize,
        })?;
        let required = order.max(align_order);
        if required >= MAX_ORDER {
            return Err(AllocError::OrderTooLarge { order: required });
        }

        let found = (required..MAX_ORDER)
            .find(|&candidate| self.free_lists[candidate].count > 0)
            .ok_or(AllocError::OutOfMemory)?;
        let index = self.pop(found).ok_or(AllocError::OutOfMemory)?;

        for split in (order..found).rev() {
            let upper = index + (1 << split);
            self.frames[upper].set_state(BlockState::Free(split as u8));
            self.push(upper, split);
            log::trace!("buddy: split order {} block at {}", split + 1, self.address_of(index));
        }

        self.frames[index].set_state(BlockState::Allocated(order as u8));
        self.free_pages -= 1 << order;

        let addr = self.address_of(index);
        if align > PAGE_SIZE && !addr.is_aligned(1 << (align_order + PAGE_SHIFT)) {
            log::error!(
                "buddy: block at {addr} from order {found} misses {} alignment",
                HumanSize(1 << (align_order + PAGE_SHIFT))
            );
            self.release(index, order);
            self.free_pages += 1 << order;
            return Err(AllocError::OutOfMemory);
        }

        log::trace!("buddy: allocated order {order} block at {addr}");
        Ok(addr)
    }

    /// Frees the block starting at `addr`, merging it with free buddies.
    ///
    /// Returns the number of pages freed, which is the size of the block as allocated. On
    /// error nothing changes.
    pub fn free(&mut self, addr: PhysicalAddress) -> Result<usize, FreeError> {
        if !addr.is_aligned(PAGE_SIZE) {
            return Err(FreeError::Misaligned);
        }
        let index = self.index_of(addr).ok_or(FreeError::UnknownAddress)?;

        let order = match self.frames[index].state() {
            BlockState::Allocated(order) | BlockState::Free(order)
                if order as usize >= MAX_ORDER =>
            {
                return Err(FreeError::CorruptOrder {
                    order: order as usize,
                });
            }
            BlockState::Allocated(order) => order as usize,
            BlockState::Free(_) => return Err(FreeError::DoubleFree),
            BlockState::Tail => return Err(FreeError::NotBlockStart),
        };

        if index + (1 << order) > self.frames.len() {
            return Err(FreeError::CorruptOrder { order });
        }

        self.release(index, order);
        self.free_pages += 1 << order;

        log::trace!("buddy: freed order {order} block at {addr}");
        Ok(1 << order)
    }

    /// Logs the free-list occupancy of every order.
    pub fn dump(&self) {
        log::info!(
            "buddy {}: {} of {} pages free",
            self.range,
            self.free_pages,
            self.total_pages()
        );
        for (order, list) in self.free_lists.iter().enumerate() {
            if list.count > 0 {
                log::info!(
                    "  order {order:>2}: {:>5} blocks of {}",
                    list.count,
                    HumanSize(PAGE_SIZE << order)
                );
            }
        }
    }

    /// Returns the block at `index` to the free lists, coalescing with free buddies of equal
    /// order. Does not touch `free_pages`.
    fn release(&mut self, mut index: usize, mut order: usize) {
        while order < TOP_ORDER {
            let buddy_frame = (self.first_frame + index).buddy(order);
            if buddy_frame < self.first_frame {
                break;
            }
            let buddy = buddy_frame - self.first_frame;
            if buddy + (1 << order) > self.frames.len() {
                break;
            }
            if self.frames[buddy].state() != BlockState::Free(order as u8) {
                break;
            }
            if !self.unlink(buddy, order) {
                log::error!(
                    "buddy: order {order} block at {} is tagged free but missing from its list",
                    self.address_of(buddy)
                );
                break;
            }

            self.frames[index.max(buddy)].set_state(BlockState::Tail);
            index = index.min(buddy);
            order += 1;
            log::trace!("buddy: merged into order {order} block at {}", self.address_of(index));
        }

        self.frames[index].set_state(BlockState::Free(order as u8));
        self.push(index, order);
    }

    fn push(&mut self, index: usize, order: usize) {
        let list = &mut self.free_lists[order];
        self.frames[index].set_next(list.head);
        list.head = Some(index);
        list.count += 1;
    }

    fn pop(&mut self, order: usize) -> Option<usize> {
        let list = &mut self.free_lists[order];
        let index = list.head?;
        list.head = self.frames[index].next();
        list.count -= 1;
        self.frames[index].set_next(None);
        Some(index)
    }

    /// Removes the block at `index` from the free list of `order`. Walks the list.
    fn unlink(&mut self, index: usize, order: usize) -> bool {
        let mut prev: Option<usize> = None;
        let mut current = self.free_lists[order].head;

        while let Some(candidate) = current {
            let next = self.frames[candidate].next();
            if candidate == index {
                match prev {
                    Some(prev) => self.frames[prev].set_next(next),
                    None => self.free_lists[order].head = next,
                }
                self.free_lists[order].count -= 1;
                self.frames[index].set_next(None);
                return true;
            }
            prev = Some(candidate);
            current = next;
        }

        false
    }

    fn index_of(&self, addr: PhysicalAddress) -> Option<usize> {
        if !self.contains(addr) {
            return None;
        }
        Some(addr.frame_number() - self.first_frame)
    }

    fn address_of(&self, index: usize) -> PhysicalAddress {
        (self.first_frame + index).start()
    }
}

impl core::fmt::Debug for BuddyAllocator {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("BuddyAllocator")
            .field("range", &self.range)
            .field("total_pages", &self.total_pages())
            .field("free_pages", &self.free_pages)
            .finish()
    }
}
