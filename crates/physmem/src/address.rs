//! Physical and kernel-virtual address types, and the translation between them.
//!
//! The allocator never dereferences a physical address directly. Whenever it needs to touch
//! memory it owns (slab headers, slab objects, carved metadata) it asks an
//! [`AddressTranslator`] for the kernel-addressable alias of that physical address.

use core::fmt;
use core::ops::{Add, Sub};

use crate::{FrameNumber, PAGE_SIZE};

/// Generates the parts shared by [`PhysicalAddress`] and [`VirtualAddress`].
macro_rules! address_type {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
        #[repr(transparent)]
        pub struct $name(usize);

        impl $name {
            /// Wraps a raw address.
            #[inline]
            pub const fn new(addr: usize) -> Self {
                Self(addr)
            }

            /// Returns the raw address value.
            #[inline]
            pub const fn as_usize(self) -> usize {
                self.0
            }

            /// Returns true if the address is a multiple of `align`.
            ///
            /// # Panics
            ///
            /// Panics if `align` is not a power of two.
            #[inline]
            pub const fn is_aligned(self, align: usize) -> bool {
                assert!(align.is_power_of_two(), "alignment must be a power of two");
                self.0 & (align - 1) == 0
            }

            /// Rounds the address down to a multiple of `align`.
            ///
            /// # Panics
            ///
            /// Panics if `align` is not a power of two.
            #[inline]
            pub const fn align_down(self, align: usize) -> Self {
                assert!(align.is_power_of_two(), "alignment must be a power of two");
                Self(self.0 & !(align - 1))
            }

            /// Rounds the address up to a multiple of `align`.
            ///
            /// # Panics
            ///
            /// Panics if `align` is not a power of two.
            #[inline]
            pub const fn align_up(self, align: usize) -> Self {
                assert!(align.is_power_of_two(), "alignment must be a power of two");
                Self((self.0 + align - 1) & !(align - 1))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({:#x})", stringify!($name), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{:#x}", self.0)
            }
        }

        impl From<usize> for $name {
            #[inline]
            fn from(addr: usize) -> Self {
                Self(addr)
            }
        }

        impl Add<usize> for $name {
            type Output = Self;

            #[inline]
            fn add(self, rhs: usize) -> Self::Output {
                Self(self.0 + rhs)
            }
        }

        impl Sub<usize> for $name {
            type Output = Self;

            #[inline]
            fn sub(self, rhs: usize) -> Self::Output {
                Self(self.0 - rhs)
            }
        }

        impl Sub<$name> for $name {
            type Output = usize;

            #[inline]
            fn sub(self, rhs: $name) -> Self::Output {
                self.0 - rhs.0
            }
        }
    };
}

address_type!(
    PhysicalAddress,
    "A physical memory address, as handed out by the page and slab allocators."
);

impl PhysicalAddress {
    /// Returns the frame containing this address.
    #[inline]
    pub const fn frame_number(self) -> FrameNumber {
        FrameNumber::new(self.0 / PAGE_SIZE)
    }

    /// Returns the byte offset of this address within its page.
    #[inline]
    pub const fn page_offset(self) -> usize {
        self.0 & (PAGE_SIZE - 1)
    }
}

address_type!(
    VirtualAddress,
    "A kernel-virtual address through which physical memory can be read and written."
);

impl VirtualAddress {
    /// Converts the address to a pointer.
    #[inline]
    pub const fn as_ptr<T>(self) -> *const T {
        self.0 as *const T
    }

    /// Converts the address to a mutable pointer.
    #[inline]
    pub const fn as_mut_ptr<T>(self) -> *mut T {
        self.0 as *mut T
    }
}

/// Translates physical addresses into kernel-addressable ones.
///
/// In the kernel this is the higher-half direct map: a fixed offset added to every physical
/// address. Under test (or with the `software-emulation` feature) a window of physical memory
/// is backed by a host buffer instead.
///
/// The translation must be a pure bijection and must be in place before any zone or slab
/// operation runs. The allocator holds it by `'static` reference.
pub enum AddressTranslator {
    /// Physical memory is mapped at `offset` in the kernel address space.
    DirectMap { offset: usize },
    /// Physical memory is simulated by a host allocation.
    #[cfg(any(test, feature = "software-emulation"))]
    Emulated(EmulatedMemory),
}

impl AddressTranslator {
    /// Creates a translator for a direct map at the given offset.
    pub const fn direct_map(offset: usize) -> Self {
        Self::DirectMap { offset }
    }

    /// Creates a translator backed by `size` bytes of host memory standing in for the physical
    /// window starting at `base`.
    #[cfg(any(test, feature = "software-emulation"))]
    pub fn emulated(base: PhysicalAddress, size: usize) -> Self {
        Self::Emulated(EmulatedMemory::new(base, size))
    }

    /// Returns the kernel address aliasing `phys`.
    pub fn phys_to_virt(&self, phys: PhysicalAddress) -> VirtualAddress {
        match self {
            Self::DirectMap { offset } => VirtualAddress::new(phys.as_usize().wrapping_add(*offset)),
            #[cfg(any(test, feature = "software-emulation"))]
            Self::Emulated(mem) => VirtualAddress::new(mem.translate(phys) as usize),
        }
    }

    /// Returns the physical address aliased by the kernel address `virt`.
    pub fn virt_to_phys(&self, virt: VirtualAddress) -> PhysicalAddress {
        match self {
            Self::DirectMap { offset } => PhysicalAddress::new(virt.as_usize().wrapping_sub(*offset)),
            #[cfg(any(test, feature = "software-emulation"))]
            Self::Emulated(mem) => mem.ptr_to_phys(virt.as_ptr()),
        }
    }

    /// Returns a typed pointer to the memory at `phys`.
    #[inline]
    pub fn phys_to_ptr<T>(&self, phys: PhysicalAddress) -> *mut T {
        self.phys_to_virt(phys).as_mut_ptr()
    }
}

#[cfg(any(test, feature = "software-emulation"))]
pub use emulated::EmulatedMemory;

#[cfg(any(test, feature = "software-emulation"))]
mod emulated {
    use core::ptr::NonNull;

    use alloc::alloc::{Layout, alloc_zeroed, dealloc};

    use crate::{PAGE_SIZE, PhysicalAddress};

    /// A window of simulated physical memory.
    ///
    /// The buffer is page-aligned and zero-filled, so structures placed at page-aligned
    /// physical addresses are correctly aligned on the host as well.
    pub struct EmulatedMemory {
        base: PhysicalAddress,
        size: usize,
        memory: NonNull<u8>,
    }

    // SAFETY: the buffer is uniquely owned; all mutation goes through the allocator's locks.
    unsafe impl Send for EmulatedMemory {}
    // SAFETY: see above.
    unsafe impl Sync for EmulatedMemory {}

    impl EmulatedMemory {
        /// Allocates a zeroed host buffer standing in for `[base, base + size)`.
        ///
        /// # Panics
        ///
        /// Panics if `size` is zero, `base` is not page aligned, or the host is out of memory.
        pub fn new(base: PhysicalAddress, size: usize) -> Self {
            assert!(size > 0, "emulated memory must not be empty");
            assert!(base.is_aligned(PAGE_SIZE), "emulated memory base must be page aligned");

            let layout = Self::layout(size);
            // SAFETY: the layout has a non-zero size.
            let memory = NonNull::new(unsafe { alloc_zeroed(layout) })
                .expect("host allocation for emulated memory failed");

            Self { base, size, memory }
        }

        /// Returns the first emulated physical address.
        pub fn base(&self) -> PhysicalAddress {
            self.base
        }

        /// Returns the size of the emulated window in bytes.
        pub fn size(&self) -> usize {
            self.size
        }

        /// Translates a physical address into a pointer into the host buffer.
        ///
        /// # Panics
        ///
        /// Panics if the address lies outside the emulated window.
        pub fn translate(&self, phys: PhysicalAddress) -> *mut u8 {
            let addr = phys.as_usize();
            let base = self.base.as_usize();
            assert!(
                addr >= base && addr < base + self.size,
                "physical address {phys} outside emulated memory"
            );
            // SAFETY: the offset was checked against the buffer size above.
            unsafe { self.memory.as_ptr().add(addr - base) }
        }

        /// Translates a pointer into the host buffer back into a physical address.
        ///
        /// # Panics
        ///
        /// Panics if the pointer does not point into the host buffer.
        pub fn ptr_to_phys(&self, ptr: *const u8) -> PhysicalAddress {
            let start = self.memory.as_ptr() as usize;
            let addr = ptr as usize;
            assert!(
                addr >= start && addr < start + self.size,
                "pointer not within emulated memory"
            );
            self.base + (addr - start)
        }

        fn layout(size: usize) -> Layout {
            Layout::from_size_align(size, PAGE_SIZE).expect("invalid emulated memory layout")
        }
    }

    impl Drop for EmulatedMemory {
        fn drop(&mut self) {
            // SAFETY: allocated in `new` with the same layout.
            unsafe { dealloc(self.memory.as_ptr(), Self::layout(self.size)) }
        }
    }
}
