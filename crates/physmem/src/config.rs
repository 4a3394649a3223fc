//! Zone construction settings.

use crate::{PhysicalAddress, ZoneFlags};

/// Settings for building the zone table and placing slab pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZoneConfig {
    /// Memory below this address is reachable by legacy 24-bit DMA.
    pub dma_limit: PhysicalAddress,
    /// Memory below this address is reachable by 32-bit DMA.
    pub dma32_limit: PhysicalAddress,
    /// Capabilities requested for slab pages.
    pub slab_zone: ZoneFlags,
}

impl ZoneConfig {
    /// Default DMA limit: 16 MiB.
    pub const DEFAULT_DMA_LIMIT: usize = 16 << 20;
    /// Default DMA32 limit: 4 GiB.
    pub const DEFAULT_DMA32_LIMIT: usize = 1 << 32;

    /// Returns the capabilities of memory starting at `addr`.
    ///
    /// DMA memory is also DMA32 capable. Memory below the DMA32 limit is general purpose as
    /// well; memory below the DMA limit is kept for DMA users.
    pub fn capabilities_at(&self, addr: PhysicalAddress) -> ZoneFlags {
        if addr < self.dma_limit {
            ZoneFlags::DMA | ZoneFlags::DMA32
        } else if addr < self.dma32_limit {
            ZoneFlags::DMA32 | ZoneFlags::NORMAL
        } else {
            ZoneFlags::NORMAL
        }
    }
}

impl Default for ZoneConfig {
    fn default() -> Self {
        Self {
            dma_limit: PhysicalAddress::new(Self::DEFAULT_DMA_LIMIT),
            dma32_limit: PhysicalAddress::new(Self::DEFAULT_DMA32_LIMIT),
            slab_zone: ZoneFlags::NORMAL,
        }
    }
}
