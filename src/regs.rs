//! Offset-based volatile access to a peripheral register block.
//!
//! AT91 peripherals have no generated PAC here, so the PMC and DDR controller
//! drivers address their registers as `base + offset`.

use core::ptr::{read_volatile, write_volatile};

/// A peripheral register block at a fixed base address.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct RegisterBlock {
    base: usize,
}

impl RegisterBlock {
    /// # Safety
    ///
    /// `base` must be the mapped address of a peripheral register block, and
    /// every offset later passed to `read`/`write` must be a valid 32-bit
    /// register inside it.
    pub(crate) const unsafe fn new(base: usize) -> Self {
        Self { base }
    }

    pub(crate) const fn base(&self) -> usize {
        self.base
    }

    #[inline]
    pub(crate) fn read(&self, offset: usize) -> u32 {
        debug_assert!(offset % 4 == 0, "register offset not aligned");
        // SAFETY: guaranteed by the contract of `new`
        unsafe { read_volatile((self.base + offset) as *const u32) }
    }

    #[inline]
    pub(crate) fn write(&self, offset: usize, value: u32) {
        debug_assert!(offset % 4 == 0, "register offset not aligned");
        // SAFETY: guaranteed by the contract of `new`
        unsafe { write_volatile((self.base + offset) as *mut u32, value) }
    }
}
