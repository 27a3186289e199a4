//! ACT8865 PMIC, the VDDCORE supply on SAMA5 evaluation kits.

use embedded_hal_1::i2c::I2c;

use super::{Regulator, RegulatorError};

/// 7-bit I2C address.
pub const ADDRESS: u8 = 0x5B;

const VSET_MASK: u8 = 0x3F;

/// Regulator outputs and their VSET register.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Output {
    Dcdc1,
    Dcdc2,
    Dcdc3,
    Ldo1,
    Ldo2,
    Ldo3,
    Ldo4,
}

impl Output {
    pub const fn vset_register(self) -> u8 {
        match self {
            Output::Dcdc1 => 0x20,
            Output::Dcdc2 => 0x30,
            Output::Dcdc3 => 0x40,
            Output::Ldo1 => 0x50,
            Output::Ldo2 => 0x54,
            Output::Ldo3 => 0x60,
            Output::Ldo4 => 0x64,
        }
    }
}

/// Smallest VSET selector whose voltage lies in `[min_uv, max_uv]`.
///
/// Selectors 0..24 step 25 mV from 600 mV, 24..48 step 50 mV from 1.2 V,
/// 48..64 step 100 mV from 2.4 V.
pub const fn selector_for(min_uv: u32, max_uv: u32) -> Option<u8> {
    let mut sel = 0u8;
    while sel <= VSET_MASK {
        let uv = selector_to_uv(sel);
        if uv >= min_uv && uv <= max_uv {
            return Some(sel);
        }
        sel += 1;
    }
    None
}

pub const fn selector_to_uv(sel: u8) -> u32 {
    let sel = (sel & VSET_MASK) as u32;
    if sel < 24 {
        600_000 + sel * 25_000
    } else if sel < 48 {
        1_200_000 + (sel - 24) * 50_000
    } else {
        2_400_000 + (sel - 48) * 100_000
    }
}

/// One ACT8865 output behind an I2C bus.
pub struct Act8865<I2C> {
    i2c: I2C,
    output: Output,
}

impl<I2C: I2c> Act8865<I2C> {
    pub fn new(i2c: I2C, output: Output) -> Self {
        Self { i2c, output }
    }

    pub fn output(&self) -> Output {
        self.output
    }

    /// Read back the programmed output voltage.
    pub fn voltage(&mut self) -> Result<u32, RegulatorError> {
        let mut buf = [0u8; 1];
        self.i2c
            .write_read(ADDRESS, &[self.output.vset_register()], &mut buf)
            .map_err(|_| RegulatorError::Bus)?;
        Ok(selector_to_uv(buf[0]))
    }

    pub fn release(self) -> I2C {
        self.i2c
    }
}

impl<I2C: I2c> Regulator for Act8865<I2C> {
    fn set_voltage(&mut self, min_uv: u32, max_uv: u32) -> Result<(), RegulatorError> {
        let sel = selector_for(min_uv, max_uv).ok_or(RegulatorError::OutOfRange { uv: min_uv })?;

        trace!(
            "act8865: reg 0x{:02X} <- sel {} ({} uV)",
            self.output.vset_register(),
            sel,
            selector_to_uv(sel)
        );

        self.i2c
            .write(ADDRESS, &[self.output.vset_register(), sel])
            .map_err(|_| RegulatorError::Bus)
    }
}
