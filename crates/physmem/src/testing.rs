//! Fixtures shared by the unit tests.

use crate::memmap::tests::TestRegion;
use crate::{
    AddressTranslator, MemoryMap, PageFrame, PhysicalAddress, PhysicalMemoryManager, ZoneConfig,
    ZoneFlags,
};

pub(crate) const MIB: usize = 1 << 20;

/// Returns metadata for `count` pages that lives for the rest of the test run.
pub(crate) fn leak_frames(count: usize) -> &'static mut [PageFrame] {
    Box::leak(vec![PageFrame::TAIL; count].into_boxed_slice())
}

/// Returns a translator backing `[base, base + size)` with host memory.
pub(crate) fn leak_translator(base: usize, size: usize) -> &'static AddressTranslator {
    Box::leak(Box::new(AddressTranslator::emulated(
        PhysicalAddress::new(base),
        size,
    )))
}

/// Thresholds scaled down so that a few MiB of emulated memory spans all capability classes.
pub(crate) fn small_config() -> ZoneConfig {
    ZoneConfig {
        dma_limit: PhysicalAddress::new(2 * MIB),
        dma32_limit: PhysicalAddress::new(4 * MIB),
        slab_zone: ZoneFlags::NORMAL,
    }
}

/// Builds a memory map whose usable memory is the given `(base, size)` ranges.
pub(crate) fn usable_map(ranges: &[(usize, usize)]) -> MemoryMap {
    let regions: Vec<TestRegion> = ranges
        .iter()
        .map(|&(base, size)| TestRegion::usable(base, size))
        .collect();
    MemoryMap::from_boot_map(&regions)
}

/// Builds a page allocator over emulated memory covering every given usable range.
pub(crate) fn emulated_pmm(ranges: &[(usize, usize)], config: &ZoneConfig) -> PhysicalMemoryManager {
    let end = ranges.iter().map(|&(base, size)| base + size).max().unwrap_or(0);
    let translator = leak_translator(0, end.max(crate::PAGE_SIZE));
    let mut map = usable_map(ranges);
    PhysicalMemoryManager::new(&mut map, translator, config).unwrap()
}

/// The default test machine: 1 MiB to 8 MiB usable, split into a 1 MiB DMA zone, a 2 MiB
/// DMA32 zone and a 4 MiB normal zone by [`small_config`].
pub(crate) fn test_pmm() -> PhysicalMemoryManager {
    emulated_pmm(&[(MIB, 7 * MIB)], &small_config())
}
