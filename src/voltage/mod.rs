//! Core supply voltage scaling.
//!
//! The coordinator maps a CPU frequency to its operating point and asks the
//! regulator for that voltage. The transition engine calls it **after** the
//! clock has changed, for raising and lowering alike. That is only safe when
//! the voltage in effect before the change already covers the new frequency;
//! a raise-before/lower-after ordering is not implemented.

use crate::opp::OppTable;

mod act8865;
pub use act8865::{Act8865, Output as Act8865Output};

/// Regulator failure.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RegulatorError {
    /// The requested voltage cannot be produced.
    OutOfRange { uv: u32 },
    /// Communication with the regulator failed.
    Bus,
}

/// Voltage scaling error.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum VoltageError {
    /// No operating point for this frequency.
    OperatingPointNotFound { freq_khz: u32 },
    /// The regulator rejected the voltage.
    Regulator(RegulatorError),
}

impl From<RegulatorError> for VoltageError {
    fn from(e: RegulatorError) -> Self {
        VoltageError::Regulator(e)
    }
}

/// A voltage regulator output.
pub trait Regulator {
    /// Set the output to a voltage within `[min_uv, max_uv]`.
    fn set_voltage(&mut self, min_uv: u32, max_uv: u32) -> Result<(), RegulatorError>;
}

impl<R: Regulator + ?Sized> Regulator for &mut R {
    fn set_voltage(&mut self, min_uv: u32, max_uv: u32) -> Result<(), RegulatorError> {
        (**self).set_voltage(min_uv, max_uv)
    }
}

/// Maps frequencies to voltages and drives the (optional) core regulator.
pub struct VoltageCoordinator<'a, R> {
    opps: OppTable<'a>,
    regulator: Option<R>,
}

impl<'a, R: Regulator> VoltageCoordinator<'a, R> {
    pub fn new(opps: OppTable<'a>, regulator: Option<R>) -> Self {
        Self { opps, regulator }
    }

    pub fn opps(&self) -> &OppTable<'a> {
        &self.opps
    }

    pub fn has_regulator(&self) -> bool {
        self.regulator.is_some()
    }

    pub fn regulator(&self) -> Option<&R> {
        self.regulator.as_ref()
    }

    pub fn regulator_mut(&mut self) -> Option<&mut R> {
        self.regulator.as_mut()
    }

    /// Voltage required at `freq_khz`.
    pub fn voltage_for(&self, freq_khz: u32) -> Result<u32, VoltageError> {
        match self.opps.find_exact(freq_khz) {
            Some(opp) => Ok(opp.voltage_uv),
            None => {
                error!("failed to find OPP for {} kHz", freq_khz);
                Err(VoltageError::OperatingPointNotFound { freq_khz })
            }
        }
    }

    /// Request exactly `uv` from the regulator. Without a regulator this
    /// succeeds and does nothing.
    pub fn apply(&mut self, uv: u32) -> Result<(), VoltageError> {
        let Some(regulator) = self.regulator.as_mut() else {
            return Ok(());
        };

        regulator.set_voltage(uv, uv).map_err(|e| {
            error!("failed to set vddcore to {} uV: {:?}", uv, e);
            VoltageError::from(e)
        })
    }

    /// Look up and apply the voltage for `freq_khz`, returning it.
    pub fn scale_to(&mut self, freq_khz: u32) -> Result<u32, VoltageError> {
        let uv = self.voltage_for(freq_khz)?;
        self.apply(uv)?;
        Ok(uv)
    }
}
