//! Power Management Controller: the registers the clock-update routine
//! programs, and decoding of the running CPU clock.

use crate::regs::RegisterBlock;
use crate::time::{Hertz, KiloHertz};

/// PLLA Register.
pub const PMC_PLLAR: usize = 0x28;
/// Master Clock Register.
pub const PMC_MCKR: usize = 0x30;
/// Status Register.
pub const PMC_SR: usize = 0x68;

/// `PMC_SR.LOCKA`: PLLA locked.
pub const PMC_SR_LOCKA: u32 = 1 << 1;
/// `PMC_SR.MCKRDY`: master clock ready.
pub const PMC_SR_MCKRDY: u32 = 1 << 3;

pub const PMC_MCKR_MDIV_SHIFT: u32 = 8;
pub const PMC_MCKR_MDIV_MASK: u32 = 0x3 << PMC_MCKR_MDIV_SHIFT;

/// Master clock divider, `PMC_MCKR.MDIV`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Mdiv {
    Div1 = 0,
    Div2 = 1,
    Div4 = 2,
    Div3 = 3,
}

impl Mdiv {
    pub const fn from_bits(bits: u32) -> Self {
        match bits & 0x3 {
            0 => Mdiv::Div1,
            1 => Mdiv::Div2,
            2 => Mdiv::Div4,
            _ => Mdiv::Div3,
        }
    }

    pub const fn to_bits(self) -> u32 {
        self as u32
    }

    /// Ratio between the processor clock and the master clock.
    pub const fn divisor(self) -> u32 {
        match self {
            Mdiv::Div3 => 3,
            _ => 1 << (self as u32),
        }
    }
}

/// The PMC register block.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Pmc {
    regs: RegisterBlock,
}

impl Pmc {
    /// # Safety
    ///
    /// `base` must be the mapped address of the PMC.
    pub const unsafe fn new(base: usize) -> Self {
        Self {
            regs: RegisterBlock::new(base),
        }
    }

    pub const fn base(&self) -> usize {
        self.regs.base()
    }

    pub fn mdiv(&self) -> Mdiv {
        Mdiv::from_bits((self.regs.read(PMC_MCKR) & PMC_MCKR_MDIV_MASK) >> PMC_MCKR_MDIV_SHIFT)
    }

    pub fn pllar(&self) -> u32 {
        self.regs.read(PMC_PLLAR)
    }

    /// Processor clock derived from the current master clock rate.
    pub fn cpu_clock(&self, mck: Hertz) -> KiloHertz {
        cpu_clock_from_mdiv(self.mdiv(), mck)
    }
}

/// PCK = MCK * MDIV, truncated to kHz.
pub const fn cpu_clock_from_mdiv(mdiv: Mdiv, mck: Hertz) -> KiloHertz {
    KiloHertz(mdiv.divisor() * (mck.0 / 1_000))
}
