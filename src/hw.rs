//! The hardware steps of a frequency change.
//!
//! [`ClockHardware`] is the seam the transition engine drives. Every step
//! that must run with interrupts masked takes a [`CriticalSection`] token, so
//! it cannot be called outside one.

use critical_section::CriticalSection;

use crate::pmc::Pmc;
use crate::ramc::Ramc;
use crate::reloc::{self, RelocationWindow, StagedRoutine};
use crate::routine::ClockRoutine;
use crate::time::Hertz;

/// The clock and memory-controller operations of one transition.
pub trait ClockHardware {
    /// Running CPU clock in kHz, or 0 when it cannot be determined.
    fn cpu_clock_khz(&self) -> u32;

    /// Program the DDR refresh timer.
    fn set_refresh_timing(&mut self, cs: CriticalSection<'_>, value: u32);

    /// Copy the clock-update routine into its execution window.
    fn stage_routine(&mut self, cs: CriticalSection<'_>) -> StagedRoutine;

    /// Run a staged routine with the given PLL and divider values.
    fn run_routine(
        &mut self,
        cs: CriticalSection<'_>,
        routine: StagedRoutine,
        multiplier: u32,
        divider: u32,
    );
}

/// AT91SAMA5 PMC + DDR controller, driven through the relocated routine.
pub struct At91Hardware {
    pmc: Pmc,
    ramc: Ramc,
    routine: ClockRoutine,
    entry: usize,
    mck: Hertz,
}

impl At91Hardware {
    /// Fails if `routine` does not fit below the window anchor.
    ///
    /// # Safety
    ///
    /// `pmc` and `ramc` must map the real controllers, the window below
    /// `window.anchor()` must be writable, executable and unused by anything
    /// else, and `routine` must follow the contract in [`crate::routine`].
    pub unsafe fn new(
        pmc: Pmc,
        ramc: Ramc,
        window: RelocationWindow,
        routine: ClockRoutine,
        mck: Hertz,
    ) -> Result<Self, reloc::Error> {
        let entry = window.fit(routine.len())?;

        Ok(Self {
            pmc,
            ramc,
            routine,
            entry,
            mck,
        })
    }

    /// Hardware for the board selected at build time, running the built-in
    /// routine.
    ///
    /// # Safety
    ///
    /// Same as [`At91Hardware::new`], for the addresses in [`crate::board`].
    #[cfg(target_arch = "arm")]
    pub unsafe fn board() -> Result<Self, reloc::Error> {
        use crate::board;

        Self::new(
            Pmc::new(board::PMC_BASE),
            Ramc::new(board::RAMC_BASE),
            RelocationWindow::new(board::RELOCATION_ANCHOR),
            ClockRoutine::builtin(),
            Hertz(board::MCK_HZ),
        )
    }

    pub fn pmc(&self) -> &Pmc {
        &self.pmc
    }

    pub fn ramc(&self) -> &Ramc {
        &self.ramc
    }
}

impl ClockHardware for At91Hardware {
    fn cpu_clock_khz(&self) -> u32 {
        self.pmc.cpu_clock(self.mck).0
    }

    fn set_refresh_timing(&mut self, _cs: CriticalSection<'_>, value: u32) {
        self.ramc.set_refresh_timing(value);
    }

    fn stage_routine(&mut self, _cs: CriticalSection<'_>) -> StagedRoutine {
        // SAFETY: window ownership is part of the `new` contract, which also
        // checked that the image fits below the anchor.
        unsafe { reloc::install(self.entry, self.routine.image()) }
    }

    fn run_routine(
        &mut self,
        _cs: CriticalSection<'_>,
        routine: StagedRoutine,
        multiplier: u32,
        divider: u32,
    ) {
        // SAFETY: interrupts are masked (cs), the routine was staged by
        // `stage_routine` from an image satisfying the `new` contract.
        unsafe {
            routine.call(self.pmc.base(), multiplier, divider, self.ramc.base());
        }
    }
}
