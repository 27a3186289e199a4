//! The cpufreq driver: governance-facing glue around the transition engine.
//!
//! A governor hands the driver a [`Policy`] and a target frequency; the
//! driver resolves it against the table of legal frequencies, runs the
//! transition and keeps the policy bookkeeping (`init`, `verify`, `get`,
//! `exit`) in the shape the cpufreq core expects.

use crate::freq_table::{FrequencyTable, Limits};
use crate::hw::ClockHardware;
use crate::opp::OppTable;
use crate::recipe::{ConfigError, RecipeTable};
use crate::reloc;
use crate::transition::{self, TransitionEngine};
use crate::voltage::{Regulator, VoltageCoordinator, VoltageError};

pub use crate::freq_table::Relation;
pub use crate::transition::{Freqs, Transition, TransitionEvent, TransitionObserver};

/// Transition latency used when the configuration does not give one.
pub const DEFAULT_TRANS_LATENCY_NS: u32 = 100_000;

/// Driver error.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    Config(ConfigError),
    /// Only CPU 0 is handled.
    InvalidCpu { cpu: u32 },
    /// No legal frequency within the policy limits.
    NoTarget { target_khz: u32 },
    RecipeNotFound { freq_khz: u32 },
    /// The clock changed but the voltage could not be set.
    Voltage(VoltageError),
    Relocation(reloc::Error),
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Error::Config(e)
    }
}

impl From<transition::Error> for Error {
    fn from(e: transition::Error) -> Self {
        match e {
            transition::Error::RecipeNotFound { freq_khz } => Error::RecipeNotFound { freq_khz },
        }
    }
}

impl From<reloc::Error> for Error {
    fn from(e: reloc::Error) -> Self {
        Error::Relocation(e)
    }
}

impl From<VoltageError> for Error {
    fn from(e: VoltageError) -> Self {
        Error::Voltage(e)
    }
}

/// Probe-time configuration.
#[derive(Debug, Copy, Clone, Default)]
pub struct Config<'a> {
    /// Big-endian recipe records, see [`crate::recipe`].
    pub recipes: Option<&'a [u8]>,
    /// Transition latency in ns.
    pub clock_latency_ns: Option<u32>,
}

impl Config<'static> {
    /// Configuration of the board selected at build time.
    pub fn board() -> Self {
        Self {
            recipes: Some(&crate::board::RECIPE_CELLS[..]),
            clock_latency_ns: crate::board::CLOCK_LATENCY_NS,
        }
    }
}

#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CpuInfo {
    pub min_freq: u32,
    pub max_freq: u32,
    pub transition_latency_ns: u32,
}

/// Per-CPU frequency policy. All frequencies in kHz.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Policy {
    pub cpu: u32,
    pub min: u32,
    pub max: u32,
    pub cur: u32,
    pub cpuinfo: CpuInfo,
}

impl Policy {
    pub fn new(cpu: u32) -> Self {
        Self {
            cpu,
            ..Default::default()
        }
    }

    fn limits(&self) -> Limits {
        Limits {
            min: self.min,
            max: self.max,
        }
    }
}

pub struct CpuFreqDriver<'a, H, R> {
    engine: TransitionEngine<'a, H, R>,
    freq_table: FrequencyTable,
    latency_ns: u32,
}

impl<'a, H: ClockHardware, R: Regulator> CpuFreqDriver<'a, H, R> {
    pub const NAME: &'static str = "at91-cpufreq";

    /// Bring the driver up on `hw`, taking the legal frequencies from the
    /// coordinator's operating points.
    pub fn probe(config: Config<'_>, hw: H, voltage: VoltageCoordinator<'a, R>) -> Result<Self, Error> {
        let freq_table = FrequencyTable::from_opps(voltage.opps())?;
        if freq_table.is_empty() {
            error!("no OPP table is found");
            return Err(ConfigError::NoFrequencies.into());
        }

        let latency_ns = config.clock_latency_ns.unwrap_or(DEFAULT_TRANS_LATENCY_NS);

        let current_khz = hw.cpu_clock_khz();
        if current_khz == 0 {
            error!("failed to get clock rate");
            return Err(ConfigError::NoClockRate.into());
        }

        let recipes = RecipeTable::from_be_bytes(config.recipes).map_err(|e| {
            error!("failed to init register setting table: {:?}", e);
            Error::Config(e)
        })?;

        if voltage.has_regulator() {
            info!("Found vddcore regulator");
        } else {
            warn!("unable to get the vddcore regulator");
        }

        debug!(
            "cpufreq: {} frequencies, {} recipes, running at {} kHz",
            freq_table.len(),
            recipes.len(),
            current_khz
        );

        Ok(Self {
            engine: TransitionEngine::new(hw, recipes, voltage, current_khz),
            freq_table,
            latency_ns,
        })
    }

    /// Fill in a fresh policy with the table limits and current state.
    pub fn init(&self, policy: &mut Policy) -> Result<(), Error> {
        let Some(info) = self.freq_table.cpuinfo() else {
            error!("Invalid frequency table");
            return Err(ConfigError::NoFrequencies.into());
        };

        policy.cpuinfo = CpuInfo {
            min_freq: info.min,
            max_freq: info.max,
            transition_latency_ns: self.latency_ns,
        };
        policy.min = info.min;
        policy.max = info.max;
        policy.cur = self.engine.current_frequency();

        info!("CPUFREQ support for AT91 initialized");
        Ok(())
    }

    /// Bring the policy limits within the table, keeping at least one legal
    /// frequency between them.
    pub fn verify(&self, policy: &mut Policy) {
        let mut limits = policy.limits();
        self.freq_table.verify(&mut limits);
        policy.min = limits.min;
        policy.max = limits.max;
    }

    /// Move CPU `policy.cpu` to the legal frequency `relation` selects for
    /// `target_khz`.
    ///
    /// A voltage failure is returned as [`Error::Voltage`]; the frequency
    /// change has happened by then and is not undone.
    pub fn target<O>(
        &mut self,
        policy: &mut Policy,
        target_khz: u32,
        relation: Relation,
        observer: &mut O,
    ) -> Result<(), Error>
    where
        O: TransitionObserver + ?Sized,
    {
        if policy.cpu != 0 {
            return Err(Error::InvalidCpu { cpu: policy.cpu });
        }

        let new = self
            .freq_table
            .target(policy.limits(), target_khz, relation)
            .ok_or(Error::NoTarget { target_khz })?;
        let old = self.engine.current_frequency();

        info!(
            "CPU frequency from {} MHz to {} MHz{}",
            old / 1000,
            new / 1000,
            if old == new { " (skipped)" } else { "" }
        );

        let result = self.engine.transition(policy.cpu, new, observer)?;
        policy.cur = self.engine.current_frequency();

        match result {
            Transition::Skipped { .. } => Ok(()),
            Transition::Completed { voltage, .. } => voltage.map(|_| ()).map_err(Error::from),
        }
    }

    /// Current frequency of `cpu` in kHz.
    pub fn get(&self, _cpu: u32) -> u32 {
        self.engine.current_frequency()
    }

    pub fn exit(&mut self, policy: &mut Policy) {
        debug!("cpufreq: exit cpu {}", policy.cpu);
    }

    /// Legal frequencies in ascending order.
    pub fn available_frequencies(&self) -> impl Iterator<Item = u32> + '_ {
        self.freq_table.iter().copied()
    }

    /// Re-apply the voltage for the current frequency, for use after the
    /// regulator lost its setting over a system suspend.
    pub fn resume_voltage(&mut self) -> Result<u32, Error> {
        let khz = self.engine.current_frequency();
        let uv = self.engine.voltage_mut().scale_to(khz)?;
        info!("vddcore restored to {} mV for {} MHz", uv / 1000, khz / 1000);
        Ok(uv)
    }

    pub fn frequency_table(&self) -> &FrequencyTable {
        &self.freq_table
    }

    pub fn opps(&self) -> &OppTable<'a> {
        self.engine.voltage().opps()
    }

    pub fn latency_ns(&self) -> u32 {
        self.latency_ns
    }

    pub fn engine(&self) -> &TransitionEngine<'a, H, R> {
        &self.engine
    }
}

#[cfg(test)]
mod tests;
