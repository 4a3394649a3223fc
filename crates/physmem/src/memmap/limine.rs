//! [`BootMemoryRegion`] for Limine memory-map entries.
//!
//! The Limine memory map response hands out `&[&Entry]`, which can be passed straight to
//! [`MemoryMap::from_boot_map`](super::MemoryMap::from_boot_map).

use ::limine::memory_map::{Entry, EntryType};

use super::{BootMemoryRegion, MemoryKind};
use crate::PhysicalAddress;

impl BootMemoryRegion for Entry {
    fn base(&self) -> PhysicalAddress {
        PhysicalAddress::new(self.base as usize)
    }

    fn size(&self) -> usize {
        self.length as usize
    }

    fn kind(&self) -> MemoryKind {
        match self.entry_type {
            EntryType::USABLE => MemoryKind::Usable,
            EntryType::RESERVED => MemoryKind::Reserved,
            EntryType::ACPI_RECLAIMABLE => MemoryKind::AcpiReclaimable,
            EntryType::ACPI_NVS => MemoryKind::AcpiNvs,
            EntryType::BAD_MEMORY => MemoryKind::BadMemory,
            EntryType::BOOTLOADER_RECLAIMABLE => MemoryKind::BootloaderReclaimable,
            EntryType::EXECUTABLE_AND_MODULES => MemoryKind::KernelImage,
            EntryType::FRAMEBUFFER => MemoryKind::Framebuffer,
            _ => MemoryKind::Unknown,
        }
    }
}
