//! The table of legal CPU frequencies and target resolution against it.

use core::slice;

use crate::opp::OppTable;
use crate::recipe::ConfigError;

/// Maximum number of entries in a frequency table.
pub const MAX_FREQUENCIES: usize = 16;

/// How a requested frequency maps onto a table entry.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Relation {
    /// Lowest frequency at or above the target.
    Low,
    /// Highest frequency at or below the target.
    High,
}

/// Frequency limits a resolution or verification is bounded by.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Limits {
    pub min: u32,
    pub max: u32,
}

/// Ascending list of legal frequencies in kHz.
#[derive(Debug, Clone)]
pub struct FrequencyTable {
    freqs: [u32; MAX_FREQUENCIES],
    len: usize,
}

impl FrequencyTable {
    /// Build the table from the available operating points, sorted and
    /// deduplicated.
    pub fn from_opps(opps: &OppTable<'_>) -> Result<Self, ConfigError> {
        Self::collect(opps.available().map(|opp| opp.frequency_khz))
    }

    pub fn from_frequencies(list: &[u32]) -> Result<Self, ConfigError> {
        Self::collect(list.iter().copied())
    }

    fn collect(freqs: impl Iterator<Item = u32>) -> Result<Self, ConfigError> {
        let mut table = Self {
            freqs: [0; MAX_FREQUENCIES],
            len: 0,
        };

        for khz in freqs {
            if table.contains(khz) {
                continue;
            }
            if table.len == MAX_FREQUENCIES {
                error!("cpufreq: more than {} distinct frequencies", MAX_FREQUENCIES);
                return Err(ConfigError::TooManyFrequencies {
                    max: MAX_FREQUENCIES,
                });
            }
            table.freqs[table.len] = khz;
            table.len += 1;
        }

        table.freqs[..table.len].sort_unstable();
        Ok(table)
    }

    pub fn iter(&self) -> slice::Iter<'_, u32> {
        self.freqs[..self.len].iter()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn contains(&self, khz: u32) -> bool {
        self.iter().any(|&f| f == khz)
    }

    /// Lowest and highest frequency in the table.
    pub fn cpuinfo(&self) -> Option<Limits> {
        let freqs = &self.freqs[..self.len];
        Some(Limits {
            min: *freqs.first()?,
            max: *freqs.last()?,
        })
    }

    /// Pick the table entry for `target` within `limits`.
    ///
    /// If nothing lies on the preferred side of the target, the closest
    /// entry on the other side is used. Returns `None` only when no entry
    /// falls within `limits`.
    pub fn target(&self, limits: Limits, target: u32, relation: Relation) -> Option<u32> {
        let mut optimal: Option<u32> = None;
        let mut suboptimal: Option<u32> = None;

        for &freq in self.iter().filter(|&&f| f >= limits.min && f <= limits.max) {
            match relation {
                Relation::High => {
                    if freq <= target {
                        if optimal.map_or(true, |o| freq > o) {
                            optimal = Some(freq);
                        }
                    } else if suboptimal.map_or(true, |s| freq < s) {
                        suboptimal = Some(freq);
                    }
                }
                Relation::Low => {
                    if freq >= target {
                        if optimal.map_or(true, |o| freq < o) {
                            optimal = Some(freq);
                        }
                    } else if suboptimal.map_or(true, |s| freq > s) {
                        suboptimal = Some(freq);
                    }
                }
            }
        }

        optimal.or(suboptimal)
    }

    /// Clamp `limits` to the table and make sure at least one entry lies
    /// within them, widening `max` to the next entry above if needed.
    pub fn verify(&self, limits: &mut Limits) {
        let Some(info) = self.cpuinfo() else {
            return;
        };

        clamp(limits, info);

        let mut count = 0;
        let mut next_larger = u32::MAX;
        for &freq in self.iter() {
            if freq >= limits.min && freq <= limits.max {
                count += 1;
            } else if freq > limits.max && freq < next_larger {
                next_larger = freq;
            }
        }

        if count == 0 {
            limits.max = next_larger;
        }

        clamp(limits, info);
    }
}

fn clamp(limits: &mut Limits, info: Limits) {
    if limits.min < info.min {
        limits.min = info.min;
    }
    if limits.max < info.min {
        limits.max = info.min;
    }
    if limits.min > info.max {
        limits.min = info.max;
    }
    if limits.max > info.max {
        limits.max = info.max;
    }
    if limits.min > limits.max {
        limits.min = limits.max;
    }
}
