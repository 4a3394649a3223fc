//! Classified physical memory map.
//!
//! The boot protocol hands the kernel a list of physical ranges, each tagged with what the
//! firmware or bootloader uses it for. [`MemoryMap`] sorts those ranges into one
//! [`RegionArray`] per [`MemoryKind`], merging adjacent ranges of the same kind. The zone table
//! is built from the usable ranges only.
//!
//! Everything here lives in fixed-size arrays, since the memory map is needed before any
//! allocator exists.
//!
//! # Building a Memory Map
//!
//! Implement [`BootMemoryRegion`] on the bootloader's memory map entry type, then call
//! [`MemoryMap::from_boot_map`]:
//!
//! ```ignore
//! struct MyBootEntry { /* ... */ }
//!
//! impl BootMemoryRegion for MyBootEntry {
//!     fn base(&self) -> PhysicalAddress { /* ... */ }
//!     fn size(&self) -> usize { /* ... */ }
//!     fn kind(&self) -> MemoryKind { /* ... */ }
//! }
//!
//! let boot_entries: &[MyBootEntry] = /* ... */;
//! let memory_map = MemoryMap::from_boot_map(boot_entries);
//! ```

#[cfg(feature = "limine")]
mod limine;

use core::fmt;

use crate::{HumanAddress, HumanSize, PAGE_SIZE, PhysicalAddress, RegionsFull};

/// Maximum number of ranges tracked per memory kind.
pub const MAX_REGIONS: usize = 64;

/// What a range of physical memory is used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemoryKind {
    /// Free RAM available to the page allocator.
    Usable,
    /// Reserved by firmware.
    Reserved,
    /// Used by the bootloader; reclaimable once boot information has been consumed.
    BootloaderReclaimable,
    /// Holds ACPI tables that may be reclaimed after parsing.
    AcpiReclaimable,
    /// ACPI non-volatile storage.
    AcpiNvs,
    /// ACPI tables that must be preserved.
    AcpiTables,
    /// The kernel image and boot modules.
    KernelImage,
    /// The boot framebuffer.
    Framebuffer,
    /// Memory-mapped device registers.
    Mmio,
    /// Memory reported as defective.
    BadMemory,
    /// Anything the boot protocol could not classify.
    Unknown,
    /// Carved out of usable memory for the page allocator's own metadata.
    AllocatorMetadata,
}

impl MemoryKind {
    /// Number of memory kinds.
    pub const COUNT: usize = 12;

    /// All memory kinds, in display order.
    pub const ALL: [MemoryKind; Self::COUNT] = [
        MemoryKind::Usable,
        MemoryKind::Reserved,
        MemoryKind::BootloaderReclaimable,
        MemoryKind::AcpiReclaimable,
        MemoryKind::AcpiNvs,
        MemoryKind::AcpiTables,
        MemoryKind::KernelImage,
        MemoryKind::Framebuffer,
        MemoryKind::Mmio,
        MemoryKind::BadMemory,
        MemoryKind::Unknown,
        MemoryKind::AllocatorMetadata,
    ];

    /// Returns a short name for diagnostics.
    pub const fn name(self) -> &'static str {
        match self {
            MemoryKind::Usable => "usable",
            MemoryKind::Reserved => "reserved",
            MemoryKind::BootloaderReclaimable => "bootloader reclaimable",
            MemoryKind::AcpiReclaimable => "ACPI reclaimable",
            MemoryKind::AcpiNvs => "ACPI NVS",
            MemoryKind::AcpiTables => "ACPI tables",
            MemoryKind::KernelImage => "kernel image",
            MemoryKind::Framebuffer => "framebuffer",
            MemoryKind::Mmio => "MMIO",
            MemoryKind::BadMemory => "bad memory",
            MemoryKind::Unknown => "unknown",
            MemoryKind::AllocatorMetadata => "allocator metadata",
        }
    }

    const fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for MemoryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Represents a single entry in a boot-time memory map.
///
/// Implement this trait on bootloader-specific memory map entry types so that a
/// [`MemoryMap`] can be built from the boot map.
pub trait BootMemoryRegion {
    /// Returns the base physical address of this region.
    fn base(&self) -> PhysicalAddress;

    /// Returns the size of this region in bytes.
    fn size(&self) -> usize;

    /// Returns what this region is used for.
    fn kind(&self) -> MemoryKind;

    /// Returns whether this region contains memory the page allocator may hand out.
    fn is_usable(&self) -> bool {
        self.kind() == MemoryKind::Usable
    }
}

impl<T: BootMemoryRegion + ?Sized> BootMemoryRegion for &T {
    fn base(&self) -> PhysicalAddress {
        (**self).base()
    }

    fn size(&self) -> usize {
        (**self).size()
    }

    fn kind(&self) -> MemoryKind {
        (**self).kind()
    }
}

/// A contiguous range of physical memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PhysicalRange {
    base: PhysicalAddress,
    size: usize,
}

impl PhysicalRange {
    /// Creates a new range.
    pub const fn new(base: PhysicalAddress, size: usize) -> Self {
        Self { base, size }
    }

    /// Creates the range `[start, end)`.
    pub const fn from_bounds(start: PhysicalAddress, end: PhysicalAddress) -> Self {
        Self::new(start, end.as_usize() - start.as_usize())
    }

    /// Returns the base address of this range.
    pub const fn base(&self) -> PhysicalAddress {
        self.base
    }

    /// Returns the size of this range in bytes.
    pub const fn size(&self) -> usize {
        self.size
    }

    /// Returns the end address (exclusive) of this range.
    pub const fn end(&self) -> PhysicalAddress {
        PhysicalAddress::new(self.base.as_usize() + self.size)
    }

    /// Returns true if the range holds no bytes.
    pub const fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Returns true if `addr` lies inside this range.
    pub const fn contains(&self, addr: PhysicalAddress) -> bool {
        addr.as_usize() >= self.base.as_usize() && addr.as_usize() < self.end().as_usize()
    }

    /// Returns true if `other` lies entirely inside this range.
    pub const fn contains_range(&self, other: &PhysicalRange) -> bool {
        other.base.as_usize() >= self.base.as_usize()
            && other.end().as_usize() <= self.end().as_usize()
    }

    /// Returns true if this range overlaps with another range.
    pub const fn overlaps(&self, other: &PhysicalRange) -> bool {
        self.base.as_usize() < other.end().as_usize()
            && other.base.as_usize() < self.end().as_usize()
    }

    /// Returns true if this range is directly followed or preceded by `other`.
    pub const fn adjacent(&self, other: &PhysicalRange) -> bool {
        self.end().as_usize() == other.base.as_usize()
            || other.end().as_usize() == self.base.as_usize()
    }

    /// Returns the smallest range spanning both ranges.
    pub const fn merge(&self, other: &PhysicalRange) -> PhysicalRange {
        let base = if self.base.as_usize() < other.base.as_usize() {
            self.base
        } else {
            other.base
        };
        let end = if self.end().as_usize() > other.end().as_usize() {
            self.end()
        } else {
            other.end()
        };
        PhysicalRange::from_bounds(base, end)
    }

    /// Shrinks the range inwards to whole pages. Returns an empty range at the aligned base if
    /// no whole page fits.
    pub const fn page_aligned(&self) -> PhysicalRange {
        let start = self.base.align_up(PAGE_SIZE);
        let end = self.end().align_down(PAGE_SIZE);
        if end.as_usize() <= start.as_usize() {
            PhysicalRange::new(start, 0)
        } else {
            PhysicalRange::from_bounds(start, end)
        }
    }

    /// Returns the number of whole pages in this range. The range must be page aligned.
    pub const fn page_count(&self) -> usize {
        self.size / PAGE_SIZE
    }

    /// Splits the range at `addr`, returning the parts below and at-or-above it. Either part
    /// may be empty.
    pub const fn split_at(&self, addr: PhysicalAddress) -> (PhysicalRange, PhysicalRange) {
        if addr.as_usize() <= self.base.as_usize() {
            (PhysicalRange::new(self.base, 0), *self)
        } else if addr.as_usize() >= self.end().as_usize() {
            (*self, PhysicalRange::new(self.end(), 0))
        } else {
            (
                PhysicalRange::from_bounds(self.base, addr),
                PhysicalRange::from_bounds(addr, self.end()),
            )
        }
    }
}

impl fmt::Display for PhysicalRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} - {} ({})",
            HumanAddress::from(self.base),
            HumanAddress::from(self.end()),
            HumanSize(self.size)
        )
    }
}

/// Fixed-size, sorted array of non-overlapping ranges.
///
/// Adding a range merges it with every range it overlaps or touches; subtracting a range
/// trims or splits the ranges it overlaps.
#[derive(Debug, Clone)]
pub struct RegionArray {
    regions: [PhysicalRange; MAX_REGIONS],
    count: usize,
}

impl RegionArray {
    /// Creates a new empty region array.
    pub const fn new() -> Self {
        Self {
            regions: [PhysicalRange::new(PhysicalAddress::new(0), 0); MAX_REGIONS],
            count: 0,
        }
    }

    /// Returns the number of ranges in the array.
    pub const fn len(&self) -> usize {
        self.count
    }

    /// Returns true if the array is empty.
    pub const fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Returns true if the array is full.
    pub const fn is_full(&self) -> bool {
        self.count >= MAX_REGIONS
    }

    /// Returns the ranges, sorted by base address.
    pub fn as_slice(&self) -> &[PhysicalRange] {
        &self.regions[..self.count]
    }

    /// Returns an iterator over the ranges, sorted by base address.
    pub fn iter(&self) -> impl Iterator<Item = &PhysicalRange> {
        self.as_slice().iter()
    }

    /// Returns the range containing `addr`, if any.
    pub fn find(&self, addr: PhysicalAddress) -> Option<&PhysicalRange> {
        let slice = self.as_slice();
        let idx = slice.partition_point(|r| r.end() <= addr);
        slice.get(idx).filter(|r| r.contains(addr))
    }

    /// Calculates the total size of all ranges.
    pub fn total_size(&self) -> usize {
        self.iter().map(|r| r.size()).sum()
    }

    /// Inserts a range at the specified index, shifting subsequent ranges.
    fn insert(&mut self, index: usize, range: PhysicalRange) -> Result<(), RegionsFull> {
        if self.is_full() || index > self.count {
            return Err(RegionsFull);
        }

        self.regions.copy_within(index..self.count, index + 1);
        self.regions[index] = range;
        self.count += 1;
        Ok(())
    }

    /// Removes the range at the specified index, shifting subsequent ranges.
    fn remove(&mut self, index: usize) {
        if index >= self.count {
            return;
        }

        self.regions.copy_within(index + 1..self.count, index);
        self.count -= 1;
    }

    /// Adds a range, keeping the array sorted and merging with overlapping or adjacent ranges.
    pub fn add(&mut self, range: PhysicalRange) -> Result<(), RegionsFull> {
        if range.is_empty() {
            return Ok(());
        }

        let mut insert_pos = self.count;
        let mut merged = range;
        let mut merge_span: Option<(usize, usize)> = None;

        for (i, existing) in self.as_slice().iter().enumerate() {
            if merged.base() > existing.end() {
                continue;
            } else if merged.end() < existing.base() {
                insert_pos = i;
                break;
            } else {
                merged = merged.merge(existing);
                merge_span = Some(match merge_span {
                    Some((start, _)) => (start, i),
                    None => (i, i),
                });
            }
        }

        if let Some((start, end)) = merge_span {
            for _ in start..=end {
                self.remove(start);
            }
            insert_pos = start;
        }

        self.insert(insert_pos, merged)
    }

    /// Removes a range, trimming or splitting any range it overlaps.
    pub fn subtract(&mut self, range: PhysicalRange) -> Result<(), RegionsFull> {
        if range.is_empty() {
            return Ok(());
        }

        let mut i = 0;
        while i < self.count {
            let existing = self.regions[i];

            if !existing.overlaps(&range) {
                i += 1;
                continue;
            }

            self.remove(i);

            if existing.base() < range.base() {
                self.insert(i, PhysicalRange::from_bounds(existing.base(), range.base()))?;
                i += 1;
            }

            if existing.end() > range.end() {
                self.insert(i, PhysicalRange::from_bounds(range.end(), existing.end()))?;
                i += 1;
            }
        }

        Ok(())
    }
}

impl Default for RegionArray {
    fn default() -> Self {
        Self::new()
    }
}

/// Physical memory classified by use.
///
/// Ranges of different kinds never overlap: where the boot map reports the same memory as
/// both usable and something else, the other kind wins.
#[derive(Debug, Clone)]
pub struct MemoryMap {
    regions: [RegionArray; MemoryKind::COUNT],
}

impl MemoryMap {
    /// Creates an empty memory map.
    pub const fn new() -> Self {
        Self {
            regions: [const { RegionArray::new() }; MemoryKind::COUNT],
        }
    }

    /// Constructs a memory map from a boot-time memory map.
    ///
    /// Entries may be unsorted. Ranges that do not fit in their kind's array are dropped with
    /// a warning; for usable memory that only costs the dropped pages.
    pub fn from_boot_map<R: BootMemoryRegion>(boot_map: &[R]) -> Self {
        let mut map = Self::new();

        for region in boot_map {
            let range = PhysicalRange::new(region.base(), region.size());
            if let Err(RegionsFull) = map.insert(region.kind(), range) {
                log::warn!("memory map: dropping {} range {range}", region.kind());
            }
        }

        // Anything reported as both usable and reserved is treated as reserved.
        for kind in MemoryKind::ALL {
            if kind == MemoryKind::Usable {
                continue;
            }
            for range in map.regions[kind.index()].clone().iter() {
                if map.regions[MemoryKind::Usable.index()].subtract(*range).is_err() {
                    log::warn!("memory map: could not exclude {kind} range {range} from usable memory");
                }
            }
        }

        log::debug!(
            "memory map: {} usable in {} ranges",
            HumanSize(map.total(MemoryKind::Usable)),
            map.usable().len()
        );

        map
    }

    /// Adds a range of the given kind.
    pub fn insert(&mut self, kind: MemoryKind, range: PhysicalRange) -> Result<(), RegionsFull> {
        self.regions[kind.index()].add(range)
    }

    /// Moves `range` from one kind to another.
    pub fn reclassify(
        &mut self,
        range: PhysicalRange,
        from: MemoryKind,
        to: MemoryKind,
    ) -> Result<(), RegionsFull> {
        self.regions[from.index()].subtract(range)?;
        self.regions[to.index()].add(range)
    }

    /// Returns the usable ranges.
    pub fn usable(&self) -> &RegionArray {
        self.regions(MemoryKind::Usable)
    }

    /// Returns the ranges of the given kind.
    pub fn regions(&self, kind: MemoryKind) -> &RegionArray {
        &self.regions[kind.index()]
    }

    /// Returns the kind of the memory at `addr`, or `None` if the boot map does not cover it.
    pub fn kind_of(&self, addr: PhysicalAddress) -> Option<MemoryKind> {
        MemoryKind::ALL
            .into_iter()
            .find(|kind| self.regions[kind.index()].find(addr).is_some())
    }

    /// Returns the total size of all ranges of the given kind.
    pub fn total(&self, kind: MemoryKind) -> usize {
        self.regions[kind.index()].total_size()
    }

    /// Logs every range, grouped by kind.
    pub fn dump(&self) {
        log::info!("physical memory map:");
        for kind in MemoryKind::ALL {
            let regions = &self.regions[kind.index()];
            if regions.is_empty() {
                continue;
            }
            log::info!("  {kind}: {}", HumanSize(regions.total_size()));
            for range in regions.iter() {
                log::info!("    {range}");
            }
        }
    }
}

impl Default for MemoryMap {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Test implementation of BootMemoryRegion.
    pub(crate) struct TestRegion {
        base: PhysicalAddress,
        size: usize,
        kind: MemoryKind,
    }

    impl TestRegion {
        pub(crate) fn usable(base: usize, size: usize) -> Self {
            Self::new(base, size, MemoryKind::Usable)
        }

        pub(crate) fn reserved(base: usize, size: usize) -> Self {
            Self::new(base, size, MemoryKind::Reserved)
        }

        pub(crate) fn new(base: usize, size: usize, kind: MemoryKind) -> Self {
            Self {
                base: PhysicalAddress::new(base),
                size,
                kind,
            }
        }
    }

    impl BootMemoryRegion for TestRegion {
        fn base(&self) -> PhysicalAddress {
            self.base
        }

        fn size(&self) -> usize {
            self.size
        }

        fn kind(&self) -> MemoryKind {
            self.kind
        }
    }

    fn range(base: usize, size: usize) -> PhysicalRange {
        PhysicalRange::new(PhysicalAddress::new(base), size)
    }

    mod physical_range {
        use super::*;

        #[test]
        fn bounds_and_overlap() {
            let r1 = range(0x1000, 0x1000);
            let r2 = range(0x2000, 0x1000);
            let r3 = range(0x1800, 0x1000);

            assert_eq!(r1.end(), PhysicalAddress::new(0x2000));
            assert!(!r1.overlaps(&r2));
            assert!(r1.adjacent(&r2));
            assert!(r1.overlaps(&r3));
            assert!(r1.contains(PhysicalAddress::new(0x1FFF)));
            assert!(!r1.contains(PhysicalAddress::new(0x2000)));
        }

        #[test]
        fn merge_spans_both() {
            let merged = range(0x1000, 0x1000).merge(&range(0x2000, 0x1000));
            assert_eq!(merged, range(0x1000, 0x2000));
        }

        #[test]
        fn page_aligned_shrinks_inwards() {
            let aligned = range(0x1001, 0x3000).page_aligned();
            assert_eq!(aligned, range(0x2000, 0x2000));
            assert_eq!(aligned.page_count(), 2);

            assert!(range(0x1001, 0x1000).page_aligned().is_empty());
        }

        #[test]
        fn split_at_threshold() {
            let (low, high) = range(0x1000, 0x3000).split_at(PhysicalAddress::new(0x2000));
            assert_eq!(low, range(0x1000, 0x1000));
            assert_eq!(high, range(0x2000, 0x2000));

            let (low, high) = range(0x1000, 0x1000).split_at(PhysicalAddress::new(0x8000));
            assert_eq!(low, range(0x1000, 0x1000));
            assert!(high.is_empty());
        }
    }

    mod region_array {
        use super::*;

        #[test]
        fn add_keeps_sorted_and_merges() {
            let mut array = RegionArray::new();
            array.add(range(0x5000, 0x1000)).unwrap();
            array.add(range(0x1000, 0x1000)).unwrap();
            assert_eq!(array.as_slice(), &[range(0x1000, 0x1000), range(0x5000, 0x1000)]);

            // Adjacent on the left, then bridging the gap.
            array.add(range(0x2000, 0x1000)).unwrap();
            assert_eq!(array.len(), 2);
            array.add(range(0x3000, 0x2000)).unwrap();
            assert_eq!(array.as_slice(), &[range(0x1000, 0x5000)]);
        }

        #[test]
        fn subtract_splits() {
            let mut array = RegionArray::new();
            array.add(range(0x1000, 0x3000)).unwrap();
            array.subtract(range(0x2000, 0x1000)).unwrap();

            assert_eq!(array.as_slice(), &[range(0x1000, 0x1000), range(0x3000, 0x1000)]);
            assert_eq!(array.total_size(), 0x2000);
        }

        #[test]
        fn subtract_trims_across_ranges() {
            let mut array = RegionArray::new();
            array.add(range(0x1000, 0x1000)).unwrap();
            array.add(range(0x3000, 0x1000)).unwrap();
            array.subtract(range(0x1800, 0x2000)).unwrap();

            assert_eq!(array.as_slice(), &[range(0x1000, 0x800), range(0x3800, 0x800)]);
        }

        #[test]
        fn find_locates_containing_range() {
            let mut array = RegionArray::new();
            array.add(range(0x1000, 0x1000)).unwrap();
            array.add(range(0x4000, 0x1000)).unwrap();

            assert_eq!(array.find(PhysicalAddress::new(0x4800)), Some(&range(0x4000, 0x1000)));
            assert_eq!(array.find(PhysicalAddress::new(0x2000)), None);
            assert_eq!(array.find(PhysicalAddress::new(0)), None);
        }

        #[test]
        fn full_array_rejects_new_range() {
            let mut array = RegionArray::new();
            for i in 0..MAX_REGIONS {
                array.add(range(i * 0x2000, 0x1000)).unwrap();
            }
            assert!(array.is_full());
            assert_eq!(array.add(range(MAX_REGIONS * 0x2000, 0x1000)), Err(RegionsFull));

            // Merging into an existing range still works when full.
            array.add(range(0x1000, 0x1000)).unwrap();
            assert_eq!(array.len(), MAX_REGIONS - 1);
        }
    }

    mod memory_map {
        use super::*;

        #[test]
        fn empty_boot_map_creates_empty_memory_map() {
            let boot_map: &[TestRegion] = &[];
            let map = MemoryMap::from_boot_map(boot_map);

            assert!(map.usable().is_empty());
            assert_eq!(map.kind_of(PhysicalAddress::new(0)), None);
        }

        #[test]
        fn classifies_by_kind() {
            let boot_map = [
                TestRegion::usable(0x10_0000, 0x10_0000),
                TestRegion::reserved(0, 0x10_0000),
                TestRegion::new(0x20_0000, 0x1000, MemoryKind::AcpiTables),
                TestRegion::new(0x30_0000, 0x8000, MemoryKind::Framebuffer),
            ];

            let map = MemoryMap::from_boot_map(&boot_map);

            assert_eq!(map.total(MemoryKind::Usable), 0x10_0000);
            assert_eq!(map.kind_of(PhysicalAddress::new(0x500)), Some(MemoryKind::Reserved));
            assert_eq!(
                map.kind_of(PhysicalAddress::new(0x18_0000)),
                Some(MemoryKind::Usable)
            );
            assert_eq!(
                map.kind_of(PhysicalAddress::new(0x20_0010)),
                Some(MemoryKind::AcpiTables)
            );
            assert_eq!(map.regions(MemoryKind::Framebuffer).len(), 1);
            assert_eq!(map.kind_of(PhysicalAddress::new(0x40_0000)), None);
        }

        #[test]
        fn unsorted_usable_ranges_are_sorted_and_merged() {
            let boot_map = [
                TestRegion::usable(0x3000, 0x1000),
                TestRegion::usable(0x1000, 0x1000),
                TestRegion::usable(0x2000, 0x1000),
            ];

            let map = MemoryMap::from_boot_map(&boot_map);
            assert_eq!(map.usable().as_slice(), &[range(0x1000, 0x3000)]);
        }

        #[test]
        fn reserved_holes_within_usable_region() {
            let boot_map = [
                TestRegion::usable(0, PAGE_SIZE * 100),
                TestRegion::reserved(PAGE_SIZE * 40, PAGE_SIZE * 20),
            ];

            let map = MemoryMap::from_boot_map(&boot_map);

            assert_eq!(
                map.usable().as_slice(),
                &[range(0, PAGE_SIZE * 40), range(PAGE_SIZE * 60, PAGE_SIZE * 40)]
            );
            assert_eq!(
                map.kind_of(PhysicalAddress::new(PAGE_SIZE * 50)),
                Some(MemoryKind::Reserved)
            );
        }

        #[test]
        fn reclassify_moves_range() {
            let boot_map = [TestRegion::usable(0, PAGE_SIZE * 8)];
            let mut map = MemoryMap::from_boot_map(&boot_map);

            map.reclassify(
                range(0, PAGE_SIZE * 2),
                MemoryKind::Usable,
                MemoryKind::AllocatorMetadata,
            )
            .unwrap();

            assert_eq!(map.usable().as_slice(), &[range(PAGE_SIZE * 2, PAGE_SIZE * 6)]);
            assert_eq!(
                map.kind_of(PhysicalAddress::new(PAGE_SIZE)),
                Some(MemoryKind::AllocatorMetadata)
            );
        }

        #[test]
        fn references_are_boot_regions() {
            let entries = [TestRegion::usable(0, PAGE_SIZE)];
            let refs: Vec<&TestRegion> = entries.iter().collect();

            let map = MemoryMap::from_boot_map(&refs);
            assert_eq!(map.total(MemoryKind::Usable), PAGE_SIZE);
        }
    }
}
