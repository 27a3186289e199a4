//! Register recipes: the exact register values that realise one CPU frequency.
//!
//! The table is supplied once, at probe time, as a list of big-endian 4-cell
//! records (the `atmel,cpufreq_regs_setting` device tree property layout):
//!
//! ```text
//! <frequency_khz  refresh  pllar  mdiv>  <frequency_khz  refresh  pllar  mdiv> ...
//! ```

use core::slice;

/// Maximum number of recipes a table can hold.
pub const MAX_RECIPES: usize = 16;

/// Size of one record in bytes.
pub const RECORD_SIZE: usize = 4 * core::mem::size_of::<u32>();

/// Recipe table configuration error.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// No recipe table was supplied.
    Missing,
    /// The recipe table is present but empty.
    Empty,
    /// Length is not a whole number of records.
    InvalidLength { len: usize },
    /// More records than the table can hold.
    TooManyRecipes { count: usize, max: usize },
    /// The operating-point table has no usable frequency.
    NoFrequencies,
    /// More distinct frequencies than the frequency table can hold.
    TooManyFrequencies { max: usize },
    /// The running CPU clock could not be determined.
    NoClockRate,
}

/// Register values for one target frequency.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RegisterRecipe {
    pub target_frequency_khz: u32,
    /// DDR controller refresh timer (`RTR`) value.
    pub memory_refresh_value: u32,
    /// `PMC_PLLAR` value.
    pub clock_multiplier: u32,
    /// `PMC_MCKR.MDIV` field value.
    pub clock_divider: u32,
}

impl RegisterRecipe {
    const EMPTY: Self = Self {
        target_frequency_khz: 0,
        memory_refresh_value: 0,
        clock_multiplier: 0,
        clock_divider: 0,
    };

    fn from_be_record(record: &[u8]) -> Self {
        let cell = |i: usize| {
            u32::from_be_bytes([
                record[i * 4],
                record[i * 4 + 1],
                record[i * 4 + 2],
                record[i * 4 + 3],
            ])
        };

        Self {
            target_frequency_khz: cell(0),
            memory_refresh_value: cell(1),
            clock_multiplier: cell(2),
            clock_divider: cell(3),
        }
    }
}

/// An immutable, ordered set of register recipes keyed by frequency.
#[derive(Debug, Clone)]
pub struct RecipeTable {
    recipes: [RegisterRecipe; MAX_RECIPES],
    len: usize,
}

impl RecipeTable {
    /// Parse the big-endian configuration records.
    ///
    /// Only the aggregate size is validated; field values are taken as-is.
    pub fn from_be_bytes(cells: Option<&[u8]>) -> Result<Self, ConfigError> {
        let cells = cells.ok_or(ConfigError::Missing)?;

        if cells.is_empty() {
            return Err(ConfigError::Empty);
        }
        if cells.len() % RECORD_SIZE != 0 {
            error!("invalid cpufreq register setting table: {} bytes", cells.len());
            return Err(ConfigError::InvalidLength { len: cells.len() });
        }

        let count = cells.len() / RECORD_SIZE;
        if count > MAX_RECIPES {
            return Err(ConfigError::TooManyRecipes {
                count,
                max: MAX_RECIPES,
            });
        }

        let mut recipes = [RegisterRecipe::EMPTY; MAX_RECIPES];
        for (slot, record) in recipes.iter_mut().zip(cells.chunks_exact(RECORD_SIZE)) {
            *slot = RegisterRecipe::from_be_record(record);
        }

        debug!("cpufreq: {} register recipes", count);

        Ok(Self { recipes, len: count })
    }

    /// Build a table from already structured recipes.
    pub fn from_recipes(list: &[RegisterRecipe]) -> Result<Self, ConfigError> {
        if list.is_empty() {
            return Err(ConfigError::Empty);
        }
        if list.len() > MAX_RECIPES {
            return Err(ConfigError::TooManyRecipes {
                count: list.len(),
                max: MAX_RECIPES,
            });
        }

        let mut recipes = [RegisterRecipe::EMPTY; MAX_RECIPES];
        recipes[..list.len()].copy_from_slice(list);

        Ok(Self {
            recipes,
            len: list.len(),
        })
    }

    /// Exact-match lookup. There is no nearest-frequency fallback.
    pub fn lookup(&self, target_frequency_khz: u32) -> Option<&RegisterRecipe> {
        self.iter()
            .find(|r| r.target_frequency_khz == target_frequency_khz)
    }

    pub fn iter(&self) -> slice::Iter<'_, RegisterRecipe> {
        self.recipes[..self.len].iter()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}
