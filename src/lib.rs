#![cfg_attr(not(test), no_std)]
#![doc = include_str!("../README.md")]
#![allow(unsafe_op_in_unsafe_fn)]

// This mod MUST go first, so that the others see its macros.
pub(crate) mod fmt;

mod regs;

pub mod time;
pub mod pmc;
pub mod ramc;
pub mod recipe;
pub mod opp;
pub mod freq_table;
pub mod voltage;
pub mod routine;
pub mod reloc;
pub mod hw;
pub mod transition;
pub mod cpufreq;

#[cfg(test)]
mod testing;

pub(crate) mod _generated {
    #![allow(dead_code)]
    #![allow(unused_imports)]
    #![allow(non_snake_case)]
    #![allow(missing_docs)]

    include!(concat!(env!("OUT_DIR"), "/_generated.rs"));
}

pub use _generated::board;

// Reexports
pub use cpufreq::{Config, CpuFreqDriver, Policy};
pub use hw::{At91Hardware, ClockHardware};
pub use recipe::{RecipeTable, RegisterRecipe};
pub use transition::{Transition, TransitionEngine};
pub use voltage::{Regulator, VoltageCoordinator};

/// Driver for the board selected at build time, on its real registers.
///
/// # Safety
///
/// See [`At91Hardware::board`]. Must be called at most once.
#[cfg(target_arch = "arm")]
pub unsafe fn init<R: Regulator>(
    regulator: Option<R>,
) -> Result<CpuFreqDriver<'static, At91Hardware, R>, cpufreq::Error> {
    let hw = At91Hardware::board()?;
    let opps = opp::OppTable::new(&board::OPERATING_POINTS);

    CpuFreqDriver::probe(Config::board(), hw, VoltageCoordinator::new(opps, regulator))
}
