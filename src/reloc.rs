//! Staging the clock-update routine into its execution window.
//!
//! The window ends at a fixed anchor address and the routine is copied so
//! that its last byte sits right below the anchor, whatever its length. The
//! region below the anchor stays mapped and stable under every PLL/MDIV
//! combination a recipe can select, which ordinary program memory does not.

use core::mem;
use core::ptr;

/// Relocation error.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// The image is longer than the address space below the anchor.
    DoesNotFit { len: usize, anchor: usize },
}

/// The window the routine image is copied into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelocationWindow {
    anchor: usize,
}

impl RelocationWindow {
    pub const fn new(anchor: usize) -> Self {
        Self { anchor }
    }

    pub const fn anchor(&self) -> usize {
        self.anchor
    }

    /// Address a routine of `len` bytes is staged at, or `None` if it would
    /// start below address 0.
    pub const fn stage_address(&self, len: usize) -> Option<usize> {
        self.anchor.checked_sub(len)
    }

    /// Check that an image of `len` bytes fits below the anchor.
    pub const fn fit(&self, len: usize) -> Result<usize, Error> {
        match self.stage_address(len) {
            Some(entry) => Ok(entry),
            None => Err(Error::DoesNotFit {
                len,
                anchor: self.anchor,
            }),
        }
    }

    /// Copy `image` so it ends exactly at the anchor.
    ///
    /// # Safety
    ///
    /// `[anchor - image.len(), anchor)` must be writable and executable, and
    /// nothing else may use it while the routine is staged and running.
    pub unsafe fn stage(&self, image: &[u8]) -> Result<StagedRoutine, Error> {
        let entry = self.fit(image.len())?;
        Ok(install(entry, image))
    }
}

/// Copy `image` to `entry`, which a [`RelocationWindow::fit`] check produced.
pub(crate) unsafe fn install(entry: usize, image: &[u8]) -> StagedRoutine {
    debug!("cpufreq: staging {} byte routine at 0x{:08X}", image.len(), entry);

    ptr::copy_nonoverlapping(image.as_ptr(), entry as *mut u8, image.len());
    sync_staged_code();

    StagedRoutine {
        entry,
        len: image.len(),
    }
}

/// Make freshly written code visible to instruction fetch.
#[inline(always)]
fn sync_staged_code() {
    cfg_if::cfg_if! {
        if #[cfg(target_arch = "arm")] {
            // SAFETY: barriers only
            unsafe { core::arch::asm!("dsb", "isb", options(nostack, preserves_flags)) };
        } else {
            core::sync::atomic::compiler_fence(core::sync::atomic::Ordering::SeqCst);
        }
    }
}

/// A routine sitting in the relocation window, ready to run.
#[derive(Debug, PartialEq, Eq)]
pub struct StagedRoutine {
    entry: usize,
    len: usize,
}

impl StagedRoutine {
    #[cfg(test)]
    pub(crate) fn fake(entry: usize, len: usize) -> Self {
        Self { entry, len }
    }

    pub fn entry(&self) -> usize {
        self.entry
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Jump into the staged copy.
    ///
    /// # Safety
    ///
    /// The staged bytes must be a routine following the calling convention in
    /// [`crate::routine`], `pmc_base`/`ramc_base` must be the mapped PMC and
    /// DDR controller, and interrupts must be masked.
    pub unsafe fn call(self, pmc_base: usize, pllar: u32, mdiv: u32, ramc_base: usize) {
        let routine: unsafe extern "C" fn(usize, u32, u32, usize) =
            mem::transmute(self.entry as *const ());
        routine(pmc_base, pllar, mdiv, ramc_base);
    }
}
