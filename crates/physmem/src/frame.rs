/// Marks the end of an index-linked free list.
pub const NIL: u32 = u32::MAX;

/// The role a page plays in the buddy system.
///
/// Only the first page of a block carries the block's order; every other page of the block is
/// a [`BlockState::Tail`]. Splitting and merging therefore only retag block-start pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockState {
    /// First page of a free block of the given order, linked into that order's free list.
    Free(u8),
    /// First page of an allocated block of the given order.
    Allocated(u8),
    /// Any page of a block other than its first.
    Tail,
}

impl BlockState {
    /// Returns the block order if this is a block-start page.
    pub const fn order(self) -> Option<usize> {
        match self {
            BlockState::Free(order) | BlockState::Allocated(order) => Some(order as usize),
            BlockState::Tail => None,
        }
    }
}

/// Holds buddy metadata for one physical page.
///
/// Free lists are threaded through these entries by page index instead of through the free
/// pages themselves, so the buddy never touches the memory it manages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageFrame {
    state: BlockState,
    /// Index of the next free block in the same free list, or [`NIL`].
    next: u32,
}

impl PageFrame {
    /// A page in the middle of a block.
    pub const TAIL: PageFrame = PageFrame {
        state: BlockState::Tail,
        next: NIL,
    };

    /// Returns the page's block state.
    #[inline]
    pub const fn state(&self) -> BlockState {
        self.state
    }

    #[inline]
    pub(crate) fn set_state(&mut self, state: BlockState) {
        self.state = state;
    }

    #[inline]
    pub(crate) const fn next(&self) -> Option<usize> {
        if self.next == NIL {
            None
        } else {
            Some(self.next as usize)
        }
    }

    #[inline]
    pub(crate) fn set_next(&mut self, next: Option<usize>) {
        self.next = match next {
            Some(index) => index as u32,
            None => NIL,
        };
    }
}

impl Default for PageFrame {
    fn default() -> Self {
        Self::TAIL
    }
}
