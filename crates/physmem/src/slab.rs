//! Small-object allocator layered on the page allocator.
//!
//! Requests up to half a page are served from size-class caches. Each cache owns a list of
//! slab pages; a slab page starts with a [`SlabHeader`] and the rest of the page is cut into
//! equally sized objects. Free objects are chained through their first word, which holds the
//! physical address of the next free object in the same page (0 ends the chain).
//!
//! Larger requests are rounded up to whole pages and go straight to the page allocator. They
//! are remembered in a fixed-size table so that they can be freed.
//!
//! Slab pages are never given back to the page allocator, even when all their objects are
//! free.

use core::mem::size_of;

use crate::{
    HumanAddress, HumanSize, PAGE_SIZE, PhysicalAddress, PhysicalMemoryManager, SlabError,
    ZoneFlags,
};

/// Tag at the start of every slab page.
pub const SLAB_MAGIC: u32 = 0x5350_4C55;

/// Smallest size class.
pub const MIN_OBJECT_SIZE: usize = 8;

/// Largest size class.
pub const MAX_OBJECT_SIZE: usize = PAGE_SIZE / 2;

/// Number of size classes: 8, 16, ..., 2048.
pub const SIZE_CLASS_COUNT: usize =
    (MAX_OBJECT_SIZE.trailing_zeros() - MIN_OBJECT_SIZE.trailing_zeros()) as usize + 1;

/// Number of page-granular allocations that can be live at once.
pub const MAX_LARGE_ALLOCATIONS: usize = 256;

/// Page link value meaning "no next page".
const NO_PAGE: usize = usize::MAX;

/// Header at the start of every slab page.
#[repr(C)]
#[derive(Debug)]
struct SlabHeader {
    magic: u32,
    object_size: u32,
    total_objects: u32,
    free_count: u32,
    /// Physical address of the next page of the same cache, or `NO_PAGE`.
    next_page: usize,
    /// Physical address of the first free object, or 0.
    free_list: usize,
}

/// Bytes at the start of a slab page taken by the header.
const HEADER_SIZE: usize = size_of::<SlabHeader>().next_multiple_of(8);

/// Offset of the first object in a slab page, keeping every object aligned to its size.
const fn first_object_offset(object_size: usize) -> usize {
    HEADER_SIZE.next_multiple_of(object_size)
}

/// Number of objects of `object_size` bytes in one slab page.
const fn objects_per_page(object_size: usize) -> usize {
    (PAGE_SIZE - first_object_offset(object_size)) / object_size
}

impl SlabHeader {
    /// Returns true if `addr` is the start of one of the objects in the slab page at `page`.
    fn holds_object(&self, page: PhysicalAddress, addr: usize) -> bool {
        let object_size = self.object_size as usize;
        if object_size == 0 {
            return false;
        }

        let first = page.as_usize() + first_object_offset(object_size);
        addr >= first
            && addr + object_size <= page.as_usize() + PAGE_SIZE
            && (addr - first) % object_size == 0
            && (addr - first) / object_size < self.total_objects as usize
    }
}

/// Returns the index of the smallest size class holding `size` bytes.
///
/// Sizes below the smallest class use the smallest class. Sizes above [`MAX_OBJECT_SIZE`] have
/// no class.
pub fn size_class_index(size: usize) -> Result<usize, SlabError> {
    if size > MAX_OBJECT_SIZE {
        return Err(SlabError::TooLarge { size });
    }
    let size = size.max(MIN_OBJECT_SIZE).next_power_of_two();
    Ok((size.trailing_zeros() - MIN_OBJECT_SIZE.trailing_zeros()) as usize)
}

/// Returns the object size of a size class.
pub const fn class_size(index: usize) -> usize {
    MIN_OBJECT_SIZE << index
}

/// Usage of one size class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SlabUsage {
    pub object_size: usize,
    pub pages: usize,
    pub total_objects: usize,
    pub free_objects: usize,
}

#[derive(Debug)]
struct SlabCache {
    object_size: usize,
    /// Physical address of the first slab page, or `NO_PAGE`.
    pages: usize,
    page_count: usize,
}

impl SlabCache {
    const fn new(object_size: usize) -> Self {
        Self {
            object_size,
            pages: NO_PAGE,
            page_count: 0,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct LargeAllocation {
    addr: PhysicalAddress,
    pages: usize,
}

/// Fixed-size table of live page-granular allocations.
struct LargeAllocations {
    entries: [Option<LargeAllocation>; MAX_LARGE_ALLOCATIONS],
    live: usize,
}

impl LargeAllocations {
    const fn new() -> Self {
        Self {
            entries: [None; MAX_LARGE_ALLOCATIONS],
            live: 0,
        }
    }

    fn is_full(&self) -> bool {
        self.live == MAX_LARGE_ALLOCATIONS
    }

    fn insert(&mut self, allocation: LargeAllocation) -> Result<(), SlabError> {
        let slot = self
            .entries
            .iter_mut()
            .find(|entry| entry.is_none())
            .ok_or(SlabError::TrackingFull)?;
        *slot = Some(allocation);
        self.live += 1;
        Ok(())
    }

    fn remove(&mut self, addr: PhysicalAddress) -> Option<LargeAllocation> {
        let slot = self
            .entries
            .iter_mut()
            .find(|entry| entry.is_some_and(|a| a.addr == addr))?;
        self.live -= 1;
        slot.take()
    }
}

/// Size-class allocator for objects up to half a page, with a page path for larger requests.
///
/// Every size class has its own lock; the table of large allocations has another.
pub struct SlabAllocator<'a> {
    pmm: &'a PhysicalMemoryManager,
    zone_flags: ZoneFlags,
    caches: [spin::Mutex<SlabCache>; SIZE_CLASS_COUNT],
    large: spin::Mutex<LargeAllocations>,
}

impl<'a> SlabAllocator<'a> {
    /// Creates a slab allocator taking its pages from the zones named by the page allocator's
    /// [`ZoneConfig::slab_zone`](crate::ZoneConfig::slab_zone).
    pub fn new(pmm: &'a PhysicalMemoryManager) -> Self {
        Self::with_zone_flags(pmm, pmm.config().slab_zone)
    }

    /// Creates a slab allocator taking its pages from zones matching `zone_flags`.
    pub fn with_zone_flags(pmm: &'a PhysicalMemoryManager, zone_flags: ZoneFlags) -> Self {
        Self {
            pmm,
            zone_flags,
            caches: core::array::from_fn(|index| spin::Mutex::new(SlabCache::new(class_size(index)))),
            large: spin::Mutex::new(LargeAllocations::new()),
        }
    }

    /// Allocates `size` bytes and returns the physical address of the object.
    ///
    /// Objects are aligned to their size class. Requests above [`MAX_OBJECT_SIZE`] get whole
    /// pages and are page aligned.
    pub fn alloc(&self, size: usize) -> Result<PhysicalAddress, SlabError> {
        if size > MAX_OBJECT_SIZE {
            return self.alloc_large(size);
        }

        let class = size_class_index(size)?;
        let mut cache = self.caches[class].lock();

        let page = match self.find_page_with_space(&cache) {
            Some(page) => page,
            None => self.grow(&mut cache)?,
        };

        // SAFETY: `page` is a validated slab page of this cache and the cache lock is held.
        let header = unsafe { &mut *self.header(page) };
        let object = header.free_list;
        // SAFETY: the walk only returns pages whose free-list head is an object of the page.
        let next = unsafe {
            self.pmm
                .translator()
                .phys_to_ptr::<usize>(PhysicalAddress::new(object))
                .read()
        };

        if next != 0 && !header.holds_object(page, next) {
            // The rest of the chain cannot be trusted. Hand out the head and retire the others.
            log::error!(
                "slab: page {page} has free link {} outside its objects, dropping {} free objects",
                HumanAddress(next),
                header.free_count - 1
            );
            header.free_list = 0;
            header.free_count = 0;
        } else {
            header.free_list = next;
            header.free_count -= 1;
        }

        log::trace!("slab: allocated {}-byte object at {}", cache.object_size, HumanAddress(object));
        Ok(PhysicalAddress::new(object))
    }

    /// Frees an object returned by [`alloc`](Self::alloc).
    ///
    /// Nothing changes when the address is not a live allocation.
    pub fn free(&self, addr: PhysicalAddress) -> Result<(), SlabError> {
        if self.pmm.zones().find_by_address(addr).is_none() {
            log::warn!("slab: ignoring free of {addr}, which belongs to no zone");
            return Err(SlabError::NotAllocated);
        }

        if addr.is_aligned(PAGE_SIZE) {
            return self.free_large(addr);
        }

        let page = addr.align_down(PAGE_SIZE);
        let header = self.header(page);

        // SAFETY: the page belongs to a zone, so it is mapped. The magic and object size are
        // written once when a slab page is created.
        let (magic, object_size) = unsafe { ((*header).magic, (*header).object_size as usize) };
        if magic != SLAB_MAGIC {
            log::error!("slab: refusing free of {addr}: page {page} has no valid slab header");
            return Err(SlabError::Corrupted { page });
        }
        let class = match size_class_index(object_size) {
            Ok(class) if class_size(class) == object_size => class,
            _ => {
                log::error!("slab: page {page} has invalid object size {object_size}");
                return Err(SlabError::Corrupted { page });
            }
        };

        let _cache = self.caches[class].lock();
        // SAFETY: the header is valid and the cache lock is held.
        let header = unsafe { &mut *header };

        if !header.holds_object(page, addr.as_usize()) {
            log::warn!("slab: ignoring free of {addr}: not a {object_size}-byte object boundary");
            return Err(SlabError::NotSlabObject);
        }

        if header.free_count >= header.total_objects || self.is_free_object(page, header, addr) {
            log::warn!("slab: ignoring free of {addr}: object is already free");
            return Err(SlabError::NotAllocated);
        }

        // SAFETY: `addr` is an allocated object of this page.
        unsafe {
            self.pmm
                .translator()
                .phys_to_ptr::<usize>(addr)
                .write(header.free_list);
        }
        header.free_list = addr.as_usize();
        header.free_count += 1;

        log::trace!("slab: freed {object_size}-byte object at {addr}");
        Ok(())
    }

    /// Returns the usage of the size class with the given index.
    pub fn cache_usage(&self, class: usize) -> SlabUsage {
        let cache = self.caches[class].lock();
        let mut usage = SlabUsage {
            object_size: cache.object_size,
            ..SlabUsage::default()
        };

        self.walk(&cache, |_, header| {
            usage.pages += 1;
            usage.total_objects += header.total_objects as usize;
            usage.free_objects += header.free_count as usize;
            false
        });
        usage
    }

    /// Returns the number of live page-granular allocations.
    pub fn large_allocations(&self) -> usize {
        self.large.lock().live
    }

    /// Logs the occupancy of every size class.
    pub fn dump_stats(&self) {
        log::info!("slab caches:");
        for class in 0..SIZE_CLASS_COUNT {
            let usage = self.cache_usage(class);
            if usage.pages == 0 {
                continue;
            }
            log::info!(
                "  {:>4} bytes: {} pages, {}/{} objects free",
                usage.object_size,
                usage.pages,
                usage.free_objects,
                usage.total_objects
            );
        }

        let large = self.large.lock();
        let pages: usize = large.entries.iter().flatten().map(|a| a.pages).sum();
        log::info!(
            "  large: {} allocations, {}",
            large.live,
            HumanSize(pages * PAGE_SIZE)
        );
    }

    fn alloc_large(&self, size: usize) -> Result<PhysicalAddress, SlabError> {
        let pages = size.div_ceil(PAGE_SIZE);
        let mut large = self.large.lock();
        if large.is_full() {
            log::warn!("slab: cannot track another large allocation");
            return Err(SlabError::TrackingFull);
        }

        let addr = self.pmm.alloc_pages(self.zone_flags, pages)?;
        large.insert(LargeAllocation { addr, pages })?;

        log::trace!("slab: allocated {} as {pages} pages at {addr}", HumanSize(size));
        Ok(addr)
    }

    fn free_large(&self, addr: PhysicalAddress) -> Result<(), SlabError> {
        let mut large = self.large.lock();
        let Some(allocation) = large.remove(addr) else {
            log::warn!("slab: ignoring free of {addr}: not a large allocation");
            return Err(SlabError::NotAllocated);
        };

        if let Err(err) = self.pmm.free_pages(addr) {
            log::error!("slab: page allocator refused large allocation at {addr}: {err}");
            large.insert(allocation)?;
            return Err(SlabError::NotAllocated);
        }

        log::trace!("slab: freed {} pages at {addr}", allocation.pages);
        Ok(())
    }

    /// Finds a page of `cache` with a free object.
    fn find_page_with_space(&self, cache: &SlabCache) -> Option<PhysicalAddress> {
        let mut found = None;
        self.walk(cache, |page, header| {
            if header.free_count == 0 {
                return false;
            }
            if !header.holds_object(page, header.free_list) {
                log::error!(
                    "slab: skipping page {page} with {} free objects and free list head {}",
                    header.free_count,
                    HumanAddress(header.free_list)
                );
                return false;
            }
            found = Some(page);
            true
        });
        found
    }

    /// Takes a new page from the page allocator, formats it for `cache` and links it first.
    fn grow(&self, cache: &mut SlabCache) -> Result<PhysicalAddress, SlabError> {
        let page = self.pmm.alloc_pages(self.zone_flags, 1)?;
        let object_size = cache.object_size;
        let first = page + first_object_offset(object_size);
        let total = objects_per_page(object_size);

        // Chain the objects so that the lowest address is handed out first.
        let translator = self.pmm.translator();
        for i in 0..total {
            let object = first + i * object_size;
            let next = if i + 1 < total { object.as_usize() + object_size } else { 0 };
            // SAFETY: the page was just allocated to us and every object lies inside it.
            unsafe { translator.phys_to_ptr::<usize>(object).write(next) };
        }

        let header = SlabHeader {
            magic: SLAB_MAGIC,
            object_size: object_size as u32,
            total_objects: total as u32,
            free_count: total as u32,
            next_page: cache.pages,
            free_list: first.as_usize(),
        };
        // SAFETY: as above; the header occupies the start of the page.
        unsafe { self.header(page).write(header) };

        cache.pages = page.as_usize();
        cache.page_count += 1;

        log::debug!("slab: new page at {page} for {object_size}-byte objects ({total} objects)");
        Ok(page)
    }

    /// Visits the pages of `cache` until `visit` returns true.
    ///
    /// Pages with a bad magic are skipped. The walk stops early if a link points outside every
    /// zone or the list is longer than the cache's page count.
    fn walk(&self, cache: &SlabCache, mut visit: impl FnMut(PhysicalAddress, &SlabHeader) -> bool) {
        let mut link = cache.pages;
        let mut visited = 0;

        while link != NO_PAGE && visited < cache.page_count {
            let page = PhysicalAddress::new(link);
            if !page.is_aligned(PAGE_SIZE) || self.pmm.zones().find_by_address(page).is_none() {
                log::error!(
                    "slab: {}-byte cache links to invalid page {page}",
                    cache.object_size
                );
                return;
            }

            // SAFETY: the page is mapped and the caller holds the cache lock.
            let header = unsafe { &*self.header(page) };
            visited += 1;
            link = header.next_page;

            if header.magic != SLAB_MAGIC {
                log::error!(
                    "slab: skipping page {page} of {}-byte cache with bad magic {:#x}",
                    cache.object_size,
                    header.magic
                );
                continue;
            }

            if visit(page, header) {
                return;
            }
        }
    }

    fn is_free_object(&self, page: PhysicalAddress, header: &SlabHeader, addr: PhysicalAddress) -> bool {
        let translator = self.pmm.translator();
        let mut object = header.free_list;
        let mut steps = 0;

        while steps < header.free_count && header.holds_object(page, object) {
            if object == addr.as_usize() {
                return true;
            }
            // SAFETY: `object` is an object of the slab page.
            object = unsafe {
                translator
                    .phys_to_ptr::<usize>(PhysicalAddress::new(object))
                    .read()
            };
            steps += 1;
        }
        false
    }

    fn header(&self, page: PhysicalAddress) -> *mut SlabHeader {
        self.pmm.translator().phys_to_ptr(page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ZoneConfig;
    use crate::testing::{MIB, emulated_pmm, small_config, test_pmm};

    #[test]
    fn size_classes() {
        assert_eq!(size_class_index(0), Ok(0));
        assert_eq!(size_class_index(1), Ok(0));
        assert_eq!(size_class_index(8), Ok(0));
        assert_eq!(size_class_index(9), Ok(1));
        assert_eq!(size_class_index(10), Ok(1));
        assert_eq!(size_class_index(100), Ok(4));
        assert_eq!(size_class_index(2048), Ok(SIZE_CLASS_COUNT - 1));
        assert_eq!(size_class_index(2049), Err(SlabError::TooLarge { size: 2049 }));
        assert_eq!(class_size(SIZE_CLASS_COUNT - 1), MAX_OBJECT_SIZE);
        assert_eq!(SIZE_CLASS_COUNT, 9);
    }

    #[test]
    fn header_layout() {
        assert_eq!(HEADER_SIZE % 8, 0);
        assert!(HEADER_SIZE >= 4 * size_of::<u32>() + 2 * size_of::<usize>());
    }

    mod allocation {
        use super::*;

        #[test]
        fn objects_are_distinct_and_aligned() {
            let pmm = test_pmm();
            let slab = SlabAllocator::new(&pmm);

            let a = slab.alloc(24).unwrap();
            let b = slab.alloc(24).unwrap();

            assert_ne!(a, b);
            assert!(a.is_aligned(8));
            assert_eq!(b - a, 32);
            assert_eq!(a.align_down(PAGE_SIZE), b.align_down(PAGE_SIZE));
            assert_eq!(pmm.free_page_count(), pmm.total_page_count() - 1);
        }

        #[test]
        fn objects_are_aligned_to_their_class() {
            let pmm = test_pmm();
            let slab = SlabAllocator::new(&pmm);

            for class in 0..SIZE_CLASS_COUNT {
                let size = class_size(class);
                let first = slab.alloc(size).unwrap();
                let second = slab.alloc(size).unwrap();

                assert!(first.is_aligned(size), "{size}-byte object at {first}");
                assert!(second.is_aligned(size), "{size}-byte object at {second}");
                assert_eq!(first - first.align_down(PAGE_SIZE), first_object_offset(size));
            }
        }

        #[test]
        fn objects_per_page_by_class() {
            assert_eq!(objects_per_page(8), 508);
            assert_eq!(objects_per_page(32), 127);
            assert_eq!(objects_per_page(64), 63);
            assert_eq!(objects_per_page(128), 31);
            assert_eq!(objects_per_page(1024), 3);
            assert_eq!(objects_per_page(2048), 1);
        }

        #[test]
        fn pages_come_from_configured_zone() {
            let config = ZoneConfig {
                slab_zone: ZoneFlags::DMA,
                ..small_config()
            };
            let pmm = emulated_pmm(&[(MIB, 7 * MIB)], &config);
            let slab = SlabAllocator::new(&pmm);
            let dma = pmm.zones().as_slice()[0].range();

            assert_eq!(pmm.config().slab_zone, ZoneFlags::DMA);
            assert!(dma.contains(slab.alloc(48).unwrap()));
            assert!(dma.contains(slab.alloc(3 * PAGE_SIZE).unwrap()));
        }

        #[test]
        fn small_object_write_does_not_spill() {
            let pmm = test_pmm();
            let slab = SlabAllocator::new(&pmm);
            let translator = pmm.translator();

            let first = slab.alloc(10).unwrap();
            let second = slab.alloc(10).unwrap();
            let message = b"hello slab\0";

            unsafe {
                let ptr = translator.phys_to_ptr::<u8>(second);
                ptr.copy_from_nonoverlapping(message.as_ptr(), message.len());
                let bytes = core::slice::from_raw_parts(ptr, message.len());
                assert_eq!(bytes, message);
            }

            // The neighbouring object and the header are intact.
            slab.free(first).unwrap();
            let again = slab.alloc(10).unwrap();
            assert_eq!(again, first);
            unsafe {
                let bytes = core::slice::from_raw_parts(translator.phys_to_ptr::<u8>(second), message.len());
                assert_eq!(bytes, message);
            }
        }

        #[test]
        fn full_page_grows_cache() {
            let pmm = test_pmm();
            let slab = SlabAllocator::new(&pmm);
            let per_page = objects_per_page(2048);
            assert_eq!(per_page, 1);

            let a = slab.alloc(2048).unwrap();
            let b = slab.alloc(2000).unwrap();

            assert_ne!(a.align_down(PAGE_SIZE), b.align_down(PAGE_SIZE));
            let usage = slab.cache_usage(SIZE_CLASS_COUNT - 1);
            assert_eq!(usage.pages, 2);
            assert_eq!(usage.free_objects, 0);
        }

        #[test]
        fn freed_objects_are_reused() {
            let pmm = test_pmm();
            let slab = SlabAllocator::new(&pmm);

            let objects: Vec<_> = (0..200).map(|_| slab.alloc(64).unwrap()).collect();
            let pages = slab.cache_usage(3).pages;

            for &object in objects.iter().rev().step_by(3) {
                slab.free(object).unwrap();
            }
            for _ in objects.iter().rev().step_by(3) {
                slab.alloc(64).unwrap();
            }

            assert_eq!(slab.cache_usage(3).pages, pages);
            assert_eq!(slab.cache_usage(3).free_objects, pages * objects_per_page(64) - 200);
        }

        #[test]
        fn slab_pages_come_from_requested_zone() {
            let pmm = test_pmm();
            let slab = SlabAllocator::with_zone_flags(&pmm, ZoneFlags::DMA);
            let dma = pmm.zones().as_slice()[0].range();

            assert!(dma.contains(slab.alloc(16).unwrap()));
            assert!(dma.contains(slab.alloc(8192).unwrap()));
        }
    }

    mod large {
        use super::*;

        #[test]
        fn large_allocations_round_trip() {
            let pmm = test_pmm();
            let slab = SlabAllocator::new(&pmm);
            let before = pmm.free_page_count();

            let addr = slab.alloc(3 * PAGE_SIZE + 1).unwrap();
            assert!(addr.is_aligned(PAGE_SIZE));
            assert_eq!(pmm.free_page_count(), before - 4);
            assert_eq!(slab.large_allocations(), 1);

            slab.free(addr).unwrap();
            assert_eq!(pmm.free_page_count(), before);
            assert_eq!(slab.large_allocations(), 0);
            assert_eq!(slab.free(addr), Err(SlabError::NotAllocated));
        }

        #[test]
        fn untracked_page_is_not_freed() {
            let pmm = test_pmm();
            let slab = SlabAllocator::new(&pmm);

            let page = pmm.alloc_pages(ZoneFlags::NORMAL, 1).unwrap();
            let free = pmm.free_page_count();

            assert_eq!(slab.free(page), Err(SlabError::NotAllocated));
            assert_eq!(pmm.free_page_count(), free);
        }

        #[test]
        fn table_capacity_is_enforced() {
            let pmm = test_pmm();
            let slab = SlabAllocator::new(&pmm);

            for _ in 0..MAX_LARGE_ALLOCATIONS {
                slab.alloc(PAGE_SIZE).unwrap();
            }
            let free = pmm.free_page_count();

            assert_eq!(slab.alloc(PAGE_SIZE), Err(SlabError::TrackingFull));
            assert_eq!(pmm.free_page_count(), free);
        }

        #[test]
        fn exhaustion_is_reported() {
            let pmm = test_pmm();
            let slab = SlabAllocator::with_zone_flags(&pmm, ZoneFlags::HIGHMEM);

            assert_eq!(slab.alloc(16), Err(SlabError::Page(crate::AllocError::OutOfMemory)));
            assert_eq!(
                slab.alloc(2 * PAGE_SIZE),
                Err(SlabError::Page(crate::AllocError::OutOfMemory))
            );
        }
    }

    mod freeing {
        use super::*;

        #[test]
        fn double_free_is_refused() {
            let pmm = test_pmm();
            let slab = SlabAllocator::new(&pmm);

            let a = slab.alloc(32).unwrap();
            let _b = slab.alloc(32).unwrap();
            slab.free(a).unwrap();

            assert_eq!(slab.free(a), Err(SlabError::NotAllocated));
            assert_eq!(slab.cache_usage(2).free_objects, slab.cache_usage(2).total_objects - 1);
        }

        #[test]
        fn interior_pointer_is_refused() {
            let pmm = test_pmm();
            let slab = SlabAllocator::new(&pmm);

            let a = slab.alloc(32).unwrap();
            assert_eq!(slab.free(a + 4), Err(SlabError::NotSlabObject));
            assert_eq!(slab.free(a.align_down(PAGE_SIZE) + 8), Err(SlabError::NotSlabObject));
        }

        #[test]
        fn non_slab_page_is_corrupted() {
            let pmm = test_pmm();
            let slab = SlabAllocator::new(&pmm);

            let page = pmm.alloc_pages(ZoneFlags::NORMAL, 1).unwrap();
            assert_eq!(slab.free(page + 64), Err(SlabError::Corrupted { page }));
        }

        #[test]
        fn address_outside_zones() {
            let pmm = test_pmm();
            let slab = SlabAllocator::new(&pmm);

            assert_eq!(slab.free(pmm.metadata().base() + 64), Err(SlabError::NotAllocated));
        }

        #[test]
        fn corrupted_page_is_skipped_by_alloc() {
            let pmm = test_pmm();
            let slab = SlabAllocator::new(&pmm);

            let a = slab.alloc(128).unwrap();
            let page = a.align_down(PAGE_SIZE);
            unsafe { pmm.translator().phys_to_ptr::<u32>(page).write(0xDEAD) };

            let b = slab.alloc(128).unwrap();
            assert_ne!(b.align_down(PAGE_SIZE), page);
            assert_eq!(slab.free(a), Err(SlabError::Corrupted { page }));
            assert_eq!(slab.cache_usage(4).pages, 1);
        }

        #[test]
        fn page_with_empty_free_list_is_skipped() {
            let pmm = test_pmm();
            let slab = SlabAllocator::new(&pmm);

            let a = slab.alloc(128).unwrap();
            let page = a.align_down(PAGE_SIZE);
            unsafe { (*pmm.translator().phys_to_ptr::<SlabHeader>(page)).free_list = 0 };

            for _ in 0..3 {
                let b = slab.alloc(128).unwrap();
                assert_ne!(b.align_down(PAGE_SIZE), page);
            }
            assert_eq!(slab.cache_usage(4).pages, 2);
            assert_eq!(slab.free(a), Ok(()));
        }

        #[test]
        fn stray_free_link_is_not_followed() {
            let pmm = test_pmm();
            let slab = SlabAllocator::new(&pmm);

            let _a = slab.alloc(64).unwrap();
            let b = slab.alloc(64).unwrap();
            let page = b.align_down(PAGE_SIZE);
            slab.free(b).unwrap();

            // Write into the freed object, clobbering its free link.
            unsafe { pmm.translator().phys_to_ptr::<usize>(b).write(0x10) };

            assert_eq!(slab.alloc(64), Ok(b));
            let c = slab.alloc(64).unwrap();
            assert_ne!(c.align_down(PAGE_SIZE), page);
            assert!(c.is_aligned(64));

            let usage = slab.cache_usage(3);
            assert_eq!(usage.pages, 2);
            assert_eq!(usage.free_objects, objects_per_page(64) - 1);
        }
    }
}
