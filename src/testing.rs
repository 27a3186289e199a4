//! Host-side fakes shared by the unit tests.

use std::cell::RefCell;
use std::rc::Rc;

use critical_section::CriticalSection;
use embedded_hal_1::i2c::{ErrorKind, ErrorType, I2c, Operation};

use crate::hw::ClockHardware;
use crate::opp::OperatingPoint;
use crate::recipe::{RecipeTable, RegisterRecipe};
use crate::reloc::StagedRoutine;
use crate::transition::{Freqs, TransitionEvent, TransitionObserver};
use crate::voltage::{Regulator, RegulatorError};

pub const STAGE_ENTRY: usize = 0xFEFF_BFC0;
pub const STAGE_LEN: usize = 0x40;

pub fn recipes() -> RecipeTable {
    RecipeTable::from_recipes(&[
        RegisterRecipe {
            target_frequency_khz: 396_000,
            memory_refresh_value: 0x406,
            clock_multiplier: 0x2104_3F01,
            clock_divider: 3,
        },
        RegisterRecipe {
            target_frequency_khz: 528_000,
            memory_refresh_value: 0x406,
            clock_multiplier: 0x215C_3F01,
            clock_divider: 2,
        },
        RegisterRecipe {
            target_frequency_khz: 600_000,
            memory_refresh_value: 0x492,
            clock_multiplier: 0x218C_3F01,
            clock_divider: 2,
        },
    ])
    .unwrap()
}

/// Recipe table as big-endian configuration cells.
pub fn recipe_cells() -> Vec<u8> {
    recipes()
        .iter()
        .flat_map(|r| {
            [
                r.target_frequency_khz,
                r.memory_refresh_value,
                r.clock_multiplier,
                r.clock_divider,
            ]
        })
        .flat_map(u32::to_be_bytes)
        .collect()
}

pub static OPPS: [OperatingPoint; 3] = [
    OperatingPoint {
        frequency_khz: 396_000,
        voltage_uv: 1_100_000,
        available: true,
    },
    OperatingPoint {
        frequency_khz: 528_000,
        voltage_uv: 1_200_000,
        available: true,
    },
    OperatingPoint {
        frequency_khz: 600_000,
        voltage_uv: 1_250_000,
        available: true,
    },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwEvent {
    Refresh(u32),
    Stage,
    Run { entry: usize, multiplier: u32, divider: u32 },
}

/// One step seen by any of the fakes, in the order it happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Hw(HwEvent),
    Notify(TransitionEvent, Freqs),
    SetVoltage(u32),
}

/// Event log shared between fakes.
#[derive(Debug, Clone, Default)]
pub struct Journal(Rc<RefCell<Vec<Step>>>);

impl Journal {
    fn record(journal: &Option<Journal>, step: Step) {
        if let Some(journal) = journal {
            journal.0.borrow_mut().push(step);
        }
    }

    pub fn steps(&self) -> Vec<Step> {
        self.0.borrow().clone()
    }
}

/// Records every hardware step instead of touching registers.
#[derive(Debug, Default)]
pub struct MockHardware {
    pub clock_khz: u32,
    pub events: Vec<HwEvent>,
    pub journal: Option<Journal>,
}

impl MockHardware {
    pub fn running_at(clock_khz: u32) -> Self {
        Self {
            clock_khz,
            ..Default::default()
        }
    }

    pub fn journaled(mut self, journal: &Journal) -> Self {
        self.journal = Some(journal.clone());
        self
    }

    fn push(&mut self, event: HwEvent) {
        self.events.push(event);
        Journal::record(&self.journal, Step::Hw(event));
    }
}

impl ClockHardware for MockHardware {
    fn cpu_clock_khz(&self) -> u32 {
        self.clock_khz
    }

    fn set_refresh_timing(&mut self, _cs: CriticalSection<'_>, value: u32) {
        self.push(HwEvent::Refresh(value));
    }

    fn stage_routine(&mut self, _cs: CriticalSection<'_>) -> StagedRoutine {
        self.push(HwEvent::Stage);
        StagedRoutine::fake(STAGE_ENTRY, STAGE_LEN)
    }

    fn run_routine(
        &mut self,
        _cs: CriticalSection<'_>,
        routine: StagedRoutine,
        multiplier: u32,
        divider: u32,
    ) {
        self.push(HwEvent::Run {
            entry: routine.entry(),
            multiplier,
            divider,
        });
    }
}

#[derive(Debug, Default)]
pub struct RecordingObserver {
    pub events: Vec<(TransitionEvent, Freqs)>,
    pub journal: Option<Journal>,
}

impl RecordingObserver {
    pub fn journaled(journal: &Journal) -> Self {
        Self {
            journal: Some(journal.clone()),
            ..Default::default()
        }
    }
}

impl TransitionObserver for RecordingObserver {
    fn notify(&mut self, event: TransitionEvent, freqs: &Freqs) {
        self.events.push((event, *freqs));
        Journal::record(&self.journal, Step::Notify(event, *freqs));
    }
}

/// Unwinds out of the transition when its event is delivered, leaving the
/// engine as it was at that moment.
#[derive(Debug)]
pub struct StopAt(pub TransitionEvent);

impl TransitionObserver for StopAt {
    fn notify(&mut self, event: TransitionEvent, _freqs: &Freqs) {
        if event == self.0 {
            panic!("stopped at {:?}", event);
        }
    }
}

#[derive(Debug, Default)]
pub struct FakeRegulator {
    pub requests: Vec<(u32, u32)>,
    pub fail: Option<RegulatorError>,
    pub journal: Option<Journal>,
}

impl FakeRegulator {
    pub fn journaled(journal: &Journal) -> Self {
        Self {
            journal: Some(journal.clone()),
            ..Default::default()
        }
    }
}

impl Regulator for FakeRegulator {
    fn set_voltage(&mut self, min_uv: u32, max_uv: u32) -> Result<(), RegulatorError> {
        self.requests.push((min_uv, max_uv));
        Journal::record(&self.journal, Step::SetVoltage(min_uv));
        match self.fail {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// I2C bus with a single register file behind one address.
#[derive(Debug)]
pub struct FakeI2c {
    pub address: u8,
    pub regs: [u8; 256],
    pub writes: Vec<(u8, Vec<u8>)>,
    pub nack: bool,
}

impl FakeI2c {
    pub fn new(address: u8) -> Self {
        Self {
            address,
            regs: [0; 256],
            writes: Vec::new(),
            nack: false,
        }
    }
}

impl ErrorType for FakeI2c {
    type Error = ErrorKind;
}

impl I2c for FakeI2c {
    fn transaction(&mut self, address: u8, operations: &mut [Operation<'_>]) -> Result<(), Self::Error> {
        if self.nack || address != self.address {
            return Err(ErrorKind::NoAcknowledge(
                embedded_hal_1::i2c::NoAcknowledgeSource::Address,
            ));
        }

        let mut pointer = 0usize;
        for op in operations {
            match op {
                Operation::Write(bytes) => {
                    self.writes.push((address, bytes.to_vec()));
                    if let Some((&reg, data)) = bytes.split_first() {
                        pointer = reg as usize;
                        for (i, b) in data.iter().enumerate() {
                            self.regs[(pointer + i) & 0xFF] = *b;
                        }
                    }
                }
                Operation::Read(buf) => {
                    for (i, b) in buf.iter_mut().enumerate() {
                        *b = self.regs[(pointer + i) & 0xFF];
                    }
                }
            }
        }
        Ok(())
    }
}
