use super::*;
use crate::opp::OperatingPoint;
use crate::testing::{recipe_cells, FakeRegulator, HwEvent, MockHardware, RecordingObserver, OPPS};
use crate::voltage::RegulatorError;

type Driver = CpuFreqDriver<'static, MockHardware, FakeRegulator>;

fn probe_at(current_khz: u32, cells: &[u8], regulator: Option<FakeRegulator>) -> Result<Driver, Error> {
    let config = Config {
        recipes: Some(cells),
        clock_latency_ns: None,
    };
    CpuFreqDriver::probe(
        config,
        MockHardware::running_at(current_khz),
        VoltageCoordinator::new(OppTable::new(&OPPS), regulator),
    )
}

fn initialized(current_khz: u32) -> (Driver, Policy) {
    let cells = recipe_cells();
    let driver = probe_at(current_khz, &cells, Some(FakeRegulator::default())).unwrap();
    let mut policy = Policy::new(0);
    driver.init(&mut policy).unwrap();
    (driver, policy)
}

#[test]
fn probe_reads_current_clock_and_default_latency() {
    let (driver, policy) = initialized(396_000);

    assert_eq!(driver.get(0), 396_000);
    assert_eq!(driver.latency_ns(), DEFAULT_TRANS_LATENCY_NS);
    assert_eq!(
        policy,
        Policy {
            cpu: 0,
            min: 396_000,
            max: 600_000,
            cur: 396_000,
            cpuinfo: CpuInfo {
                min_freq: 396_000,
                max_freq: 600_000,
                transition_latency_ns: 100_000,
            },
        }
    );
    assert_eq!(
        driver.available_frequencies().collect::<Vec<_>>(),
        [396_000, 528_000, 600_000]
    );
}

#[test]
fn probe_uses_configured_latency() {
    let cells = recipe_cells();
    let config = Config {
        recipes: Some(&cells[..]),
        clock_latency_ns: Some(300_000),
    };
    let driver: Driver = CpuFreqDriver::probe(
        config,
        MockHardware::running_at(528_000),
        VoltageCoordinator::new(OppTable::new(&OPPS), None),
    )
    .unwrap();

    let mut policy = Policy::new(0);
    driver.init(&mut policy).unwrap();
    assert_eq!(policy.cpuinfo.transition_latency_ns, 300_000);
}

#[test]
fn probe_failures() {
    let cells = recipe_cells();

    assert_eq!(
        probe_at(0, &cells, None).err(),
        Some(Error::Config(ConfigError::NoClockRate))
    );
    assert_eq!(
        probe_at(396_000, &cells[..20], None).err(),
        Some(Error::Config(ConfigError::InvalidLength { len: 20 }))
    );

    let missing: Result<Driver, _> = CpuFreqDriver::probe(
        Config::default(),
        MockHardware::running_at(396_000),
        VoltageCoordinator::new(OppTable::new(&OPPS), None),
    );
    assert_eq!(missing.err(), Some(Error::Config(ConfigError::Missing)));

    let unavailable = [OperatingPoint {
        available: false,
        ..OPPS[0]
    }];
    let empty: Result<CpuFreqDriver<'_, MockHardware, FakeRegulator>, _> = CpuFreqDriver::probe(
        Config {
            recipes: Some(&cells[..]),
            clock_latency_ns: None,
        },
        MockHardware::running_at(396_000),
        VoltageCoordinator::new(OppTable::new(&unavailable), None),
    );
    assert_eq!(empty.err(), Some(Error::Config(ConfigError::NoFrequencies)));

    let crowded: Vec<OperatingPoint> = (1..=17)
        .map(|i| OperatingPoint {
            frequency_khz: i * 36_000,
            ..OPPS[0]
        })
        .collect();
    let overflow: Result<CpuFreqDriver<'_, MockHardware, FakeRegulator>, _> = CpuFreqDriver::probe(
        Config {
            recipes: Some(&cells[..]),
            clock_latency_ns: None,
        },
        MockHardware::running_at(396_000),
        VoltageCoordinator::new(OppTable::new(&crowded), None),
    );
    assert_eq!(
        overflow.err(),
        Some(Error::Config(ConfigError::TooManyFrequencies { max: 16 }))
    );
}

#[test]
fn target_resolves_relation_and_notifies() {
    let (mut driver, mut policy) = initialized(396_000);
    let mut observer = RecordingObserver::default();

    driver
        .target(&mut policy, 500_000, Relation::Low, &mut observer)
        .unwrap();

    assert_eq!(driver.get(0), 528_000);
    assert_eq!(policy.cur, 528_000);
    assert_eq!(observer.events.len(), 2);
    assert_eq!(observer.events[0].0, TransitionEvent::PreChange);
    assert_eq!(
        observer.events[1].1,
        Freqs {
            cpu: 0,
            old: 396_000,
            new: 528_000
        }
    );

    driver
        .target(&mut policy, 599_999, Relation::High, &mut observer)
        .unwrap();
    assert_eq!(driver.get(0), 528_000);
    assert_eq!(observer.events.len(), 2);
}

#[test]
fn target_respects_policy_limits() {
    let (mut driver, mut policy) = initialized(396_000);
    policy.max = 528_000;

    driver
        .target(&mut policy, 1_000_000, Relation::Low, &mut ())
        .unwrap();

    assert_eq!(driver.get(0), 528_000);
}

#[test]
fn target_rejects_other_cpus() {
    let (mut driver, _) = initialized(396_000);
    let mut policy = Policy::new(1);

    assert_eq!(
        driver.target(&mut policy, 528_000, Relation::Low, &mut ()),
        Err(Error::InvalidCpu { cpu: 1 })
    );
    assert!(driver.engine().hardware().events.is_empty());
}

#[test]
fn target_without_candidates_fails() {
    let (mut driver, mut policy) = initialized(396_000);
    policy.min = 700_000;
    policy.max = 800_000;

    assert_eq!(
        driver.target(&mut policy, 750_000, Relation::Low, &mut ()),
        Err(Error::NoTarget { target_khz: 750_000 })
    );
}

#[test]
fn legal_frequency_without_recipe_is_not_applied() {
    let cells = recipe_cells();
    let (mut driver, mut policy) = {
        let driver = probe_at(396_000, &cells[..2 * 16], None).unwrap();
        let mut policy = Policy::new(0);
        driver.init(&mut policy).unwrap();
        (driver, policy)
    };
    let mut observer = RecordingObserver::default();

    assert_eq!(
        driver.target(&mut policy, 600_000, Relation::Low, &mut observer),
        Err(Error::RecipeNotFound { freq_khz: 600_000 })
    );
    assert_eq!(driver.get(0), 396_000);
    assert_eq!(policy.cur, 396_000);
    assert!(observer.events.is_empty());
    assert!(driver.engine().hardware().events.is_empty());
}

#[test]
fn voltage_failure_is_reported_after_the_change() {
    let cells = recipe_cells();
    let regulator = FakeRegulator {
        fail: Some(RegulatorError::Bus),
        ..Default::default()
    };
    let mut driver = probe_at(396_000, &cells, Some(regulator)).unwrap();
    let mut policy = Policy::new(0);
    driver.init(&mut policy).unwrap();

    assert_eq!(
        driver.target(&mut policy, 600_000, Relation::Low, &mut ()),
        Err(Error::Voltage(VoltageError::Regulator(RegulatorError::Bus)))
    );
    assert_eq!(driver.get(0), 600_000);
    assert_eq!(policy.cur, 600_000);
    assert_eq!(
        driver.engine().hardware().events.last(),
        Some(&HwEvent::Run {
            entry: crate::testing::STAGE_ENTRY,
            multiplier: 0x218C_3F01,
            divider: 2
        })
    );
}

#[test]
fn verify_clamps_and_keeps_a_legal_frequency() {
    let (driver, _) = initialized(396_000);

    let mut policy = Policy {
        min: 100_000,
        max: 2_000_000,
        ..Policy::new(0)
    };
    driver.verify(&mut policy);
    assert_eq!((policy.min, policy.max), (396_000, 600_000));

    let mut policy = Policy {
        min: 400_000,
        max: 500_000,
        ..Policy::new(0)
    };
    driver.verify(&mut policy);
    assert_eq!((policy.min, policy.max), (400_000, 528_000));
}

#[test]
fn resume_reapplies_current_voltage() {
    let (mut driver, mut policy) = initialized(396_000);
    driver
        .target(&mut policy, 528_000, Relation::Low, &mut ())
        .unwrap();

    assert_eq!(driver.resume_voltage(), Ok(1_200_000));
    assert_eq!(
        driver.engine().voltage().regulator().unwrap().requests,
        [(1_200_000, 1_200_000), (1_200_000, 1_200_000)]
    );
}

#[test]
fn resume_without_operating_point_fails() {
    let cells = recipe_cells();
    let driver = probe_at(450_000, &cells, Some(FakeRegulator::default()));
    let mut driver = driver.unwrap();

    assert_eq!(
        driver.resume_voltage(),
        Err(Error::Voltage(VoltageError::OperatingPointNotFound { freq_khz: 450_000 }))
    );
}

#[test]
fn board_configuration_probes() {
    let config = Config::board();
    let current = crate::board::OPERATING_POINTS[0].frequency_khz;
    let driver: Driver = CpuFreqDriver::probe(
        config,
        MockHardware::running_at(current),
        VoltageCoordinator::new(OppTable::new(&crate::board::OPERATING_POINTS), None),
    )
    .unwrap();

    for khz in driver.available_frequencies() {
        assert!(driver.engine().recipes().lookup(khz).is_some());
    }
}
