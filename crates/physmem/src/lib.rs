#![cfg_attr(not(any(test, feature = "software-emulation")), no_std)]

//! # Physical Memory Core
//!
//! The physical memory core of a kernel. It provides:
//!
//! - A classified memory map built from the bootloader's memory map.
//! - Zones grouping usable memory by the devices able to reach it (DMA, DMA32, normal).
//! - A buddy allocator per zone, handing out power-of-two runs of pages.
//! - A page allocator choosing a zone by capability and falling back between zones.
//! - A slab allocator for small objects on top of the page allocator.
//! - Software emulation of physical memory for testing in non-kernel environments.
//!
//! Nothing here allocates from a heap: all bookkeeping lives in fixed-size arrays or in
//! metadata pages carved out of usable memory during initialization.

#[cfg(any(test, feature = "software-emulation"))]
extern crate alloc;

mod address;
pub mod buddy;
mod config;
mod display;
mod error;
mod frame;
mod memmap;
mod numbers;
mod physical_memory_manager;
pub mod slab;
mod zone;

#[cfg(test)]
mod testing;

pub use address::{AddressTranslator, PhysicalAddress, VirtualAddress};
#[cfg(any(test, feature = "software-emulation"))]
pub use address::EmulatedMemory;
pub use buddy::BuddyAllocator;
pub use config::ZoneConfig;
pub use display::{HumanAddress, HumanSize};
pub use error::{AllocError, FreeError, InitError, RegionsFull, SlabError};
pub use frame::{BlockState, PageFrame};
pub use memmap::{
    BootMemoryRegion, MAX_REGIONS, MemoryKind, MemoryMap, PhysicalRange, RegionArray,
};
pub use numbers::FrameNumber;
pub use physical_memory_manager::PhysicalMemoryManager;
pub use slab::{SlabAllocator, SlabUsage};
pub use zone::{MAX_ZONES, Zone, ZoneFlags, ZoneTable};
#[cfg(any(test, feature = "zone-stats"))]
pub use zone::{ZoneStats, ZoneStatsSnapshot};

/// Size of a page frame in bytes.
pub const PAGE_SIZE: usize = 4096;

/// `log2(PAGE_SIZE)`.
pub const PAGE_SHIFT: usize = 12;

/// Number of buddy orders. Blocks range from one page (order 0) to `1 << (MAX_ORDER - 1)` pages.
pub const MAX_ORDER: usize = 11;
