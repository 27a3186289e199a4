//! Operating points: the supply voltage each CPU frequency needs.

/// A (frequency, voltage) pair.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct OperatingPoint {
    pub frequency_khz: u32,
    pub voltage_uv: u32,
    /// Unavailable points are kept in the table but never selected.
    pub available: bool,
}

/// A borrowed, read-only operating-point table.
#[derive(Debug, Copy, Clone)]
pub struct OppTable<'a> {
    points: &'a [OperatingPoint],
}

impl<'a> OppTable<'a> {
    pub const fn new(points: &'a [OperatingPoint]) -> Self {
        Self { points }
    }

    /// Find the available operating point for exactly `frequency_khz`.
    pub fn find_exact(&self, frequency_khz: u32) -> Option<&'a OperatingPoint> {
        self.points
            .iter()
            .find(|opp| opp.available && opp.frequency_khz == frequency_khz)
    }

    /// Available operating points, in table order.
    pub fn available(&self) -> impl Iterator<Item = &'a OperatingPoint> + 'a {
        self.points.iter().filter(|opp| opp.available)
    }

    /// Number of available operating points.
    pub fn count(&self) -> usize {
        self.available().count()
    }
}
