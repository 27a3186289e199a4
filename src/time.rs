//! Frequency units.

/// Hertz
#[derive(PartialEq, PartialOrd, Clone, Copy, Debug, Eq, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Hertz(pub u32);

impl Hertz {
    /// Create a `Hertz` from the given megahertz.
    pub const fn mhz(megahertz: u32) -> Self {
        Self(megahertz * 1_000_000)
    }
}

/// Kilohertz, the unit the frequency and recipe tables are keyed by.
#[derive(PartialEq, PartialOrd, Clone, Copy, Debug, Eq, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct KiloHertz(pub u32);
