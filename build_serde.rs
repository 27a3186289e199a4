use serde::{Deserialize, Serialize};

// ---------- cpufreq.yaml ----------

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Board {
    pub pmc_base: u32,
    pub ramc_base: u32,
    pub relocation_anchor: u32,
    pub mck_hz: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clock_latency_ns: Option<u32>,
    pub recipes: Vec<Recipe>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub operating_points: Vec<OperatingPoint>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    pub frequency_khz: u32,
    pub refresh: u32,
    pub pllar: u32,
    pub mdiv: u32,
}

impl Recipe {
    /// Device-tree cell order: frequency, refresh, multiplier, divider.
    pub fn cells(&self) -> [u32; 4] {
        [self.frequency_khz, self.refresh, self.pllar, self.mdiv]
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OperatingPoint {
    pub frequency_khz: u32,
    pub voltage_uv: u32,
    #[serde(default = "default_available")]
    pub available: bool,
}

fn default_available() -> bool {
    true
}
