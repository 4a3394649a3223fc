//! Physical memory manager: the page allocator's front door.
//!
//! This module routes page requests to zones. An allocation names the capabilities it needs
//! and a page count; the count is rounded up to a power of two, a zone is chosen through the
//! zone table and the zone's buddy allocator hands out the block. A free names only the
//! address; the owning zone is found by address and its buddy takes the block back.
//!
//! All operations take `&self`. Each zone's buddy allocator has its own lock, so requests
//! served by different zones do not contend.

use crate::buddy::order_for_pages;
use crate::{
    AddressTranslator, AllocError, FreeError, HumanAddress, HumanSize, InitError, MAX_ORDER,
    MemoryMap, PAGE_SIZE, PhysicalAddress, PhysicalRange, Zone, ZoneConfig, ZoneFlags, ZoneTable,
};

/// Physical memory manager owning every zone.
///
/// Built once at boot from the classified memory map. It never shrinks or grows afterwards and
/// has no teardown path.
pub struct PhysicalMemoryManager {
    translator: &'static AddressTranslator,
    zones: ZoneTable,
    metadata: PhysicalRange,
    config: ZoneConfig,
}

impl PhysicalMemoryManager {
    /// Creates a physical memory manager over the usable memory of `memory_map`.
    ///
    /// The per-page metadata is carved out of usable memory and written through `translator`,
    /// which must already map all usable memory. `memory_map` is updated to show the carved
    /// range as [`MemoryKind::AllocatorMetadata`](crate::MemoryKind::AllocatorMetadata).
    ///
    /// An error here is fatal: the kernel cannot continue without a page allocator.
    pub fn new(
        memory_map: &mut MemoryMap,
        translator: &'static AddressTranslator,
        config: &ZoneConfig,
    ) -> Result<Self, InitError> {
        let (zones, metadata) = ZoneTable::build(memory_map, translator, config)?;

        log::info!(
            "physical memory: {} in {} zones, {} of metadata at {}",
            HumanSize(zones.total_pages() * PAGE_SIZE),
            zones.len(),
            HumanSize(metadata.size()),
            HumanAddress::from(metadata.base())
        );

        Ok(Self {
            translator,
            zones,
            metadata,
            config: *config,
        })
    }

    /// Allocates at least `count` contiguous pages from a zone sharing a capability with
    /// `flags`.
    ///
    /// The block holds `2^order` pages, where `order` is the smallest order covering `count`,
    /// and is aligned to its own size.
    pub fn alloc_pages(&self, flags: ZoneFlags, count: usize) -> Result<PhysicalAddress, AllocError> {
        self.alloc_pages_aligned(flags, count, PAGE_SIZE)
    }

    /// Allocates at least `count` contiguous pages whose address is a multiple of `align`.
    ///
    /// Alignments that are not a power of two are rounded up to one. If the zone chosen for
    /// the request is too fragmented, the other zones with a matching capability are tried in
    /// address order.
    pub fn alloc_pages_aligned(
        &self,
        flags: ZoneFlags,
        count: usize,
        align: usize,
    ) -> Result<PhysicalAddress, AllocError> {
        if count == 0 {
            return Err(AllocError::ZeroPages);
        }
        if flags.is_empty() {
            return Err(AllocError::EmptyCapability);
        }

        let order = order_for_pages(count);
        if order >= MAX_ORDER {
            return Err(AllocError::OrderTooLarge { order });
        }

        let preferred = self.zones.find_by_capability(PAGE_SIZE << order, flags);
        if let Some(zone) = preferred {
            match self.alloc_from(zone, order, align) {
                Err(AllocError::OutOfMemory) => {}
                result => return result,
            }
        }

        let preferred = preferred.map(Zone::index);
        for zone in self
            .zones
            .iter()
            .filter(|zone| zone.flags().intersects(flags) && Some(zone.index()) != preferred)
        {
            match self.alloc_from(zone, order, align) {
                Err(AllocError::OutOfMemory) => {}
                result => return result,
            }
        }

        log::debug!("pmm: no {flags:?} zone can provide {count} pages");
        Err(AllocError::OutOfMemory)
    }

    fn alloc_from(
        &self,
        zone: &Zone,
        order: usize,
        align: usize,
    ) -> Result<PhysicalAddress, AllocError> {
        let addr = zone.allocate(order, align)?;

        #[cfg(any(test, feature = "zone-stats"))]
        zone.stats().record_alloc(order);

        log::trace!("pmm: allocated {} pages at {addr} from zone {}", 1 << order, zone.index());
        Ok(addr)
    }

    /// Frees the block starting at `addr`.
    ///
    /// Invalid frees are logged and leave every zone untouched.
    pub fn free_pages(&self, addr: PhysicalAddress) -> Result<(), FreeError> {
        let Some(zone) = self.zones.find_by_address(addr) else {
            log::warn!("pmm: ignoring free of {addr}, which belongs to no zone");
            return Err(FreeError::UnknownAddress);
        };

        match zone.free(addr) {
            Ok(pages) => {
                #[cfg(any(test, feature = "zone-stats"))]
                zone.stats().record_free(pages);

                log::trace!("pmm: freed {pages} pages at {addr} to zone {}", zone.index());
                Ok(())
            }
            Err(err) => {
                log::warn!("pmm: ignoring free of {addr} in zone {}: {err}", zone.index());
                Err(err)
            }
        }
    }

    /// Returns the total number of pages managed.
    pub fn total_page_count(&self) -> usize {
        self.zones.total_pages()
    }

    /// Returns the number of free pages.
    pub fn free_page_count(&self) -> usize {
        self.zones.free_pages()
    }

    /// Returns the zone table.
    pub fn zones(&self) -> &ZoneTable {
        &self.zones
    }

    /// Returns the physical range holding the allocator's per-page metadata.
    ///
    /// The range must stay mapped through the translator for as long as the manager is used.
    pub fn metadata(&self) -> PhysicalRange {
        self.metadata
    }

    /// Returns the configuration the zones were built with.
    pub fn config(&self) -> &ZoneConfig {
        &self.config
    }

    /// Returns the translator used to reach physical memory.
    pub fn translator(&self) -> &'static AddressTranslator {
        self.translator
    }

    /// Logs usage of every zone and, if `dump_buddy` is set, each zone's free lists.
    pub fn dump_stats(&self, dump_buddy: bool) {
        log::info!(
            "physical memory: {} of {} free",
            HumanSize(self.free_page_count() * PAGE_SIZE),
            HumanSize(self.total_page_count() * PAGE_SIZE)
        );
        for zone in self.zones.iter() {
            zone.dump(dump_buddy);
        }
    }
}
