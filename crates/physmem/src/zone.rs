//! Zones: physical address ranges grouped by which devices can reach them.
//!
//! The zone table is built once from the usable memory of a [`MemoryMap`]. Usable ranges are
//! split at the DMA and DMA32 limits so that every zone lies in exactly one capability class,
//! and the per-page metadata of every zone is carved out of usable memory before the zones
//! are built.

use core::sync::atomic::{AtomicUsize, Ordering};

use crate::{
    AddressTranslator, AllocError, BuddyAllocator, FreeError, HumanSize, InitError, MemoryKind,
    MemoryMap, PAGE_SIZE, PageFrame, PhysicalAddress, PhysicalRange, ZoneConfig,
};

/// Maximum number of zones.
pub const MAX_ZONES: usize = 32;

bitflags::bitflags! {
    /// Capabilities of a zone's memory, and the capabilities a request requires.
    ///
    /// A request is served by any zone sharing at least one capability with it.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ZoneFlags: u8 {
        /// Reachable by legacy 24-bit DMA.
        const DMA = 1 << 0;
        /// Reachable by 32-bit DMA.
        const DMA32 = 1 << 1;
        /// Not permanently mapped in the kernel address space.
        const HIGHMEM = 1 << 2;
        /// General purpose memory.
        const NORMAL = 1 << 3;
        /// Holds movable pages only.
        const MOVABLE = 1 << 4;
        /// Reserved for the kernel itself.
        const SYSTEM = 1 << 7;
    }
}

/// Number of capability bits, one capability-cache slot each.
const CAPABILITY_SLOTS: usize = u8::BITS as usize;

/// Debug counters for one zone.
#[cfg(any(test, feature = "zone-stats"))]
#[derive(Debug, Default)]
pub struct ZoneStats {
    alloc_count: AtomicUsize,
    free_count: AtomicUsize,
    pages_allocated: AtomicUsize,
    pages_freed: AtomicUsize,
    last_alloc_order: AtomicUsize,
}

/// A point-in-time copy of a zone's [`ZoneStats`].
#[cfg(any(test, feature = "zone-stats"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ZoneStatsSnapshot {
    pub alloc_count: usize,
    pub free_count: usize,
    pub pages_allocated: usize,
    pub pages_freed: usize,
    pub last_alloc_order: usize,
}

#[cfg(any(test, feature = "zone-stats"))]
impl ZoneStats {
    const fn new() -> Self {
        Self {
            alloc_count: AtomicUsize::new(0),
            free_count: AtomicUsize::new(0),
            pages_allocated: AtomicUsize::new(0),
            pages_freed: AtomicUsize::new(0),
            last_alloc_order: AtomicUsize::new(0),
        }
    }

    pub(crate) fn record_alloc(&self, order: usize) {
        self.alloc_count.fetch_add(1, Ordering::Relaxed);
        self.pages_allocated.fetch_add(1 << order, Ordering::Relaxed);
        self.last_alloc_order.store(order, Ordering::Relaxed);
    }

    pub(crate) fn record_free(&self, pages: usize) {
        self.free_count.fetch_add(1, Ordering::Relaxed);
        self.pages_freed.fetch_add(pages, Ordering::Relaxed);
    }

    /// Returns the current counter values.
    pub fn snapshot(&self) -> ZoneStatsSnapshot {
        ZoneStatsSnapshot {
            alloc_count: self.alloc_count.load(Ordering::Relaxed),
            free_count: self.free_count.load(Ordering::Relaxed),
            pages_allocated: self.pages_allocated.load(Ordering::Relaxed),
            pages_freed: self.pages_freed.load(Ordering::Relaxed),
            last_alloc_order: self.last_alloc_order.load(Ordering::Relaxed),
        }
    }
}

/// A contiguous physical range with one set of capabilities and its own buddy allocator.
pub struct Zone {
    index: usize,
    range: PhysicalRange,
    flags: ZoneFlags,
    total_pages: usize,
    /// Mirrors the buddy's free page count so it can be read without the lock.
    free_pages: AtomicUsize,
    buddy: spin::Mutex<BuddyAllocator>,
    #[cfg(any(test, feature = "zone-stats"))]
    stats: ZoneStats,
}

impl Zone {
    const fn placeholder() -> Self {
        Self {
            index: 0,
            range: PhysicalRange::new(PhysicalAddress::new(0), 0),
            flags: ZoneFlags::empty(),
            total_pages: 0,
            free_pages: AtomicUsize::new(0),
            buddy: spin::Mutex::new(BuddyAllocator::empty()),
            #[cfg(any(test, feature = "zone-stats"))]
            stats: ZoneStats::new(),
        }
    }

    fn new(index: usize, flags: ZoneFlags, buddy: BuddyAllocator) -> Self {
        Self {
            index,
            range: buddy.range(),
            flags,
            total_pages: buddy.total_pages(),
            free_pages: AtomicUsize::new(buddy.free_pages()),
            buddy: spin::Mutex::new(buddy),
            #[cfg(any(test, feature = "zone-stats"))]
            stats: ZoneStats::new(),
        }
    }

    /// Returns the zone's position in the zone table.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Returns the physical range managed by this zone.
    pub fn range(&self) -> PhysicalRange {
        self.range
    }

    /// Returns the zone's capabilities.
    pub fn flags(&self) -> ZoneFlags {
        self.flags
    }

    /// Returns true if `addr` belongs to this zone.
    pub fn contains(&self, addr: PhysicalAddress) -> bool {
        self.range.contains(addr)
    }

    /// Returns the number of pages in this zone.
    pub fn total_pages(&self) -> usize {
        self.total_pages
    }

    /// Returns the number of free pages in this zone.
    pub fn free_pages(&self) -> usize {
        self.free_pages.load(Ordering::Acquire)
    }

    /// Returns the zone's debug counters.
    #[cfg(any(test, feature = "zone-stats"))]
    pub fn stats(&self) -> &ZoneStats {
        &self.stats
    }

    /// Allocates `2^order` pages aligned to `align` bytes from this zone.
    pub fn allocate(&self, order: usize, align: usize) -> Result<PhysicalAddress, AllocError> {
        let mut buddy = self.buddy.lock();
        let addr = buddy.allocate(order, align)?;
        self.free_pages.store(buddy.free_pages(), Ordering::Release);
        Ok(addr)
    }

    /// Frees the block starting at `addr`, returning the number of pages freed.
    pub fn free(&self, addr: PhysicalAddress) -> Result<usize, FreeError> {
        let mut buddy = self.buddy.lock();
        let pages = buddy.free(addr)?;
        self.free_pages.store(buddy.free_pages(), Ordering::Release);
        Ok(pages)
    }

    /// Logs the zone's range, capabilities and usage, and optionally its free lists.
    pub fn dump(&self, dump_buddy: bool) {
        log::info!(
            "zone {} {:?}: {} - {} of {} free",
            self.index,
            self.flags,
            self.range,
            HumanSize(self.free_pages() * PAGE_SIZE),
            HumanSize(self.total_pages * PAGE_SIZE)
        );

        #[cfg(any(test, feature = "zone-stats"))]
        {
            let stats = self.stats.snapshot();
            log::info!(
                "  {} allocations ({} pages), {} frees ({} pages), last order {}",
                stats.alloc_count,
                stats.pages_allocated,
                stats.free_count,
                stats.pages_freed,
                stats.last_alloc_order
            );
        }

        if dump_buddy {
            self.buddy.lock().dump();
        }
    }
}

impl core::fmt::Debug for Zone {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Zone")
            .field("index", &self.index)
            .field("range", &self.range)
            .field("flags", &self.flags)
            .field("total_pages", &self.total_pages)
            .field("free_pages", &self.free_pages())
            .finish()
    }
}

/// Hands out the carved metadata range one zone at a time.
struct MetadataArena {
    next: *mut PageFrame,
    remaining: usize,
}

impl MetadataArena {
    /// # Safety
    ///
    /// `range` must be page aligned, translated by `translator` to memory that is writable and
    /// used for nothing else for the rest of the kernel's life.
    unsafe fn new(translator: &AddressTranslator, range: PhysicalRange) -> Self {
        Self {
            next: translator.phys_to_ptr(range.base()),
            remaining: range.size() / core::mem::size_of::<PageFrame>(),
        }
    }

    fn take(&mut self, count: usize) -> Option<&'static mut [PageFrame]> {
        if count > self.remaining {
            return None;
        }

        // SAFETY: `new` guarantees the next `remaining` entries are exclusively ours; every
        // entry is written before the slice is created.
        unsafe {
            for i in 0..count {
                self.next.add(i).write(PageFrame::TAIL);
            }
            let frames = core::slice::from_raw_parts_mut(self.next, count);
            self.next = self.next.add(count);
            self.remaining -= count;
            Some(frames)
        }
    }
}

/// The sorted, non-overlapping set of zones.
pub struct ZoneTable {
    zones: [Zone; MAX_ZONES],
    count: usize,
    /// Zone index + 1 of the last zone chosen for requests whose lowest capability bit is the
    /// slot number; 0 when empty.
    capability_cache: [AtomicUsize; CAPABILITY_SLOTS],
    /// Zone index + 1 of the last zone found by address; 0 when empty.
    last_by_address: AtomicUsize,
}

impl ZoneTable {
    /// Builds the zone table from the usable memory in `memory_map`.
    ///
    /// The per-page metadata of all zones is carved from the start of the smallest usable
    /// range that can hold it. The carved range is reclassified as
    /// [`MemoryKind::AllocatorMetadata`] in `memory_map` and returned so that the caller can
    /// keep it mapped.
    pub fn build(
        memory_map: &mut MemoryMap,
        translator: &'static AddressTranslator,
        config: &ZoneConfig,
    ) -> Result<(Self, PhysicalRange), InitError> {
        let mut ranges = [PhysicalRange::default(); MAX_ZONES];
        let count = split_usable(memory_map, config, &mut ranges)?;
        let ranges = &mut ranges[..count];

        let pages: usize = ranges.iter().map(|r| r.page_count()).sum();
        let required = (pages * core::mem::size_of::<PageFrame>()).next_multiple_of(PAGE_SIZE);

        let metadata = carve(ranges, required)?;

        log::debug!(
            "zones: {} of metadata for {pages} pages at {metadata}",
            HumanSize(required)
        );

        if memory_map
            .reclassify(metadata, MemoryKind::Usable, MemoryKind::AllocatorMetadata)
            .is_err()
        {
            log::warn!("zones: memory map too full to record allocator metadata at {metadata}");
        }

        // SAFETY: the metadata range was usable memory and has just been removed from every
        // range that becomes a zone.
        let mut arena = unsafe { MetadataArena::new(translator, metadata) };

        let mut table = Self {
            zones: [const { Zone::placeholder() }; MAX_ZONES],
            count: 0,
            capability_cache: [const { AtomicUsize::new(0) }; CAPABILITY_SLOTS],
            last_by_address: AtomicUsize::new(0),
        };

        for range in ranges.iter().filter(|r| !r.is_empty()) {
            let frames = arena
                .take(range.page_count())
                .ok_or(InitError::MetadataExhausted { required })?;
            let index = table.count;
            let flags = config.capabilities_at(range.base());
            table.zones[index] = Zone::new(index, flags, BuddyAllocator::new(*range, frames));
            table.count += 1;

            log::debug!("zones: zone {index} {flags:?} at {range}");
        }

        if table.count == 0 {
            return Err(InitError::NoUsableMemory);
        }

        Ok((table, metadata))
    }

    /// Returns the zones, sorted by base address.
    pub fn as_slice(&self) -> &[Zone] {
        &self.zones[..self.count]
    }

    /// Returns an iterator over the zones, sorted by base address.
    pub fn iter(&self) -> impl Iterator<Item = &Zone> {
        self.as_slice().iter()
    }

    /// Returns the number of zones.
    pub fn len(&self) -> usize {
        self.count
    }

    /// Returns true if there are no zones.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Returns a zone sharing a capability with `flags` and holding at least `bytes` of free
    /// memory.
    ///
    /// The zone last chosen for the same lowest capability bit is reused while it still
    /// qualifies. Otherwise the qualifying zone with the most free pages wins, the first one in
    /// address order on ties.
    pub fn find_by_capability(&self, bytes: usize, flags: ZoneFlags) -> Option<&Zone> {
        if flags.is_empty() {
            return None;
        }

        let pages = bytes.div_ceil(PAGE_SIZE).max(1);
        let qualifies = |zone: &Zone| zone.flags.intersects(flags) && zone.free_pages() >= pages;
        let slot = &self.capability_cache[flags.bits().trailing_zeros() as usize];

        if let Some(zone) = cached(slot, self.as_slice())
            && qualifies(zone)
        {
            return Some(zone);
        }

        let mut best: Option<&Zone> = None;
        for zone in self.iter().filter(|&zone| qualifies(zone)) {
            if best.is_none_or(|b| zone.free_pages() > b.free_pages()) {
                best = Some(zone);
            }
        }

        if let Some(zone) = best {
            slot.store(zone.index + 1, Ordering::Relaxed);
        }
        best
    }

    /// Returns the zone containing `addr`.
    pub fn find_by_address(&self, addr: PhysicalAddress) -> Option<&Zone> {
        if let Some(zone) = cached(&self.last_by_address, self.as_slice())
            && zone.contains(addr)
        {
            return Some(zone);
        }

        let zones = self.as_slice();
        let index = zones.partition_point(|zone| zone.range.end() <= addr);
        let zone = zones.get(index).filter(|zone| zone.contains(addr))?;
        self.last_by_address.store(index + 1, Ordering::Relaxed);
        Some(zone)
    }

    /// Returns the total number of pages in all zones.
    pub fn total_pages(&self) -> usize {
        self.iter().map(Zone::total_pages).sum()
    }

    /// Returns the number of free pages in all zones.
    pub fn free_pages(&self) -> usize {
        self.iter().map(Zone::free_pages).sum()
    }
}

/// Takes `required` bytes from the start of the smallest range that holds them, shrinking that
/// range.
fn carve(ranges: &mut [PhysicalRange], required: usize) -> Result<PhysicalRange, InitError> {
    let host = ranges
        .iter_mut()
        .filter(|r| r.size() >= required)
        .min_by_key(|r| r.size())
        .ok_or(InitError::MetadataExhausted { required })?;
    let carved = PhysicalRange::new(host.base(), required);
    *host = PhysicalRange::from_bounds(carved.end(), host.end());
    Ok(carved)
}

fn cached<'a>(slot: &AtomicUsize, zones: &'a [Zone]) -> Option<&'a Zone> {
    let index = slot.load(Ordering::Relaxed).checked_sub(1)?;
    zones.get(index)
}

/// Splits the usable ranges of `memory_map` at the capability thresholds, dropping partial
/// pages. Returns the number of ranges written to `out`.
fn split_usable(
    memory_map: &MemoryMap,
    config: &ZoneConfig,
    out: &mut [PhysicalRange; MAX_ZONES],
) -> Result<usize, InitError> {
    let mut count = 0;

    for usable in memory_map.usable().iter() {
        let (dma, rest) = usable.page_aligned().split_at(config.dma_limit);
        let (dma32, normal) = rest.split_at(config.dma32_limit);

        for range in [dma, dma32, normal] {
            let range = range.page_aligned();
            if range.is_empty() {
                continue;
            }
            if let Some(slot) = out.get_mut(count) {
                *slot = range;
            }
            count += 1;
        }
    }

    match count {
        0 => Err(InitError::NoUsableMemory),
        n if n > MAX_ZONES => Err(InitError::TooManyZones { count: n }),
        n => Ok(n),
    }
}
