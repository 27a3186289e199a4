//! The frequency transition engine.
//!
//! One call to [`TransitionEngine::transition`] takes the CPU from its
//! current frequency to a target that has a register recipe:
//!
//! 1. an equal target is skipped without touching anything;
//! 2. the recipe is resolved, and a missing one aborts before any hardware
//!    access or notification;
//! 3. observers get a pre-change notification;
//! 4. with interrupts masked: DDR refresh is retimed, the clock-update routine
//!    is staged into its window and run;
//! 5. the new frequency is recorded and observers get a post-change
//!    notification;
//! 6. the core voltage is set for the new frequency.
//!
//! Step 4 cannot be cancelled or rolled back once started, so nothing after
//! it undoes the frequency change: a voltage failure in step 6 is reported
//! alongside the completed transition.

use crate::hw::ClockHardware;
use crate::recipe::RecipeTable;
use crate::voltage::{Regulator, VoltageCoordinator, VoltageError};

/// Transition error.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// No register recipe for the requested frequency; nothing was changed.
    RecipeNotFound { freq_khz: u32 },
}

/// The two sides of a transition.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Freqs {
    pub cpu: u32,
    pub old: u32,
    pub new: u32,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransitionEvent {
    PreChange,
    PostChange,
}

/// Receives notifications around the clock change.
pub trait TransitionObserver {
    fn notify(&mut self, event: TransitionEvent, freqs: &Freqs);
}

impl TransitionObserver for () {
    fn notify(&mut self, _event: TransitionEvent, _freqs: &Freqs) {}
}

/// Result of a transition request.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Transition {
    /// Already running at the target.
    Skipped { freq_khz: u32 },
    /// The clock changed. `voltage` is the applied voltage in uV or why it
    /// could not be applied.
    Completed {
        freqs: Freqs,
        voltage: Result<u32, VoltageError>,
    },
}

/// Owns the clock hardware, the recipe table and the current frequency.
pub struct TransitionEngine<'a, H, R> {
    hw: H,
    recipes: RecipeTable,
    voltage: VoltageCoordinator<'a, R>,
    current_khz: u32,
}

impl<'a, H: ClockHardware, R: Regulator> TransitionEngine<'a, H, R> {
    pub fn new(
        hw: H,
        recipes: RecipeTable,
        voltage: VoltageCoordinator<'a, R>,
        current_khz: u32,
    ) -> Self {
        Self {
            hw,
            recipes,
            voltage,
            current_khz,
        }
    }

    /// Frequency the CPU is running at, in kHz.
    pub fn current_frequency(&self) -> u32 {
        self.current_khz
    }

    pub fn recipes(&self) -> &RecipeTable {
        &self.recipes
    }

    pub fn hardware(&self) -> &H {
        &self.hw
    }

    pub fn voltage(&self) -> &VoltageCoordinator<'a, R> {
        &self.voltage
    }

    pub fn voltage_mut(&mut self) -> &mut VoltageCoordinator<'a, R> {
        &mut self.voltage
    }

    /// Move the CPU to `target_khz`.
    pub fn transition<O>(
        &mut self,
        cpu: u32,
        target_khz: u32,
        observer: &mut O,
    ) -> Result<Transition, Error>
    where
        O: TransitionObserver + ?Sized,
    {
        let old = self.current_khz;
        if target_khz == old {
            return Ok(Transition::Skipped { freq_khz: old });
        }

        let Some(&recipe) = self.recipes.lookup(target_khz) else {
            error!("failed to find frequency: {} in setting table", target_khz);
            return Err(Error::RecipeNotFound {
                freq_khz: target_khz,
            });
        };

        let freqs = Freqs {
            cpu,
            old,
            new: target_khz,
        };

        observer.notify(TransitionEvent::PreChange, &freqs);

        let hw = &mut self.hw;
        critical_section::with(|cs| {
            hw.set_refresh_timing(cs, recipe.memory_refresh_value);
            let staged = hw.stage_routine(cs);
            hw.run_routine(cs, staged, recipe.clock_multiplier, recipe.clock_divider);
        });

        self.current_khz = target_khz;

        observer.notify(TransitionEvent::PostChange, &freqs);

        // TODO: raise the voltage before the clock when going up, once the
        // boards' regulator headroom is characterised.
        let voltage = self.voltage.scale_to(target_khz);
        match voltage {
            Ok(uv) => info!(
                "Now, running on the frequency / voltage: {}MHz / {}mV",
                target_khz / 1000,
                uv / 1000
            ),
            Err(_) => info!("Now, running on the frequency: {} MHz", target_khz / 1000),
        }

        Ok(Transition::Completed { freqs, voltage })
    }
}
