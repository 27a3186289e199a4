//! DDR SDRAM controller (DDRSDRC / MPDDRC) refresh timing.

use crate::regs::RegisterBlock;

/// Refresh Timer Register.
pub const DDRSDRC_RTR: usize = 0x04;

/// The DDR controller, reduced to the refresh timer the clock change depends on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Ramc {
    regs: RegisterBlock,
}

impl Ramc {
    /// # Safety
    ///
    /// `base` must be the mapped address of the DDR controller.
    pub const unsafe fn new(base: usize) -> Self {
        Self {
            regs: RegisterBlock::new(base),
        }
    }

    pub const fn base(&self) -> usize {
        self.regs.base()
    }

    /// Program the refresh interval for the clock regime about to be entered.
    ///
    /// This is a single unconditional write; the value comes from a register
    /// recipe and is not checked. It must land before the clock-update routine
    /// runs.
    #[inline]
    pub fn set_refresh_timing(&self, value: u32) {
        self.regs.write(DDRSDRC_RTR, value);
    }

    pub fn refresh_timing(&self) -> u32 {
        self.regs.read(DDRSDRC_RTR)
    }
}
