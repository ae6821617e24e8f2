use super::{rate_to_velocity, steps, velocity, volume_to_steps, FlowRate, Quantity};
use crate::{config::PumpConfig, driver::DriverError};

#[test]
fn full_syringe_is_max_steps() {
    let config = PumpConfig::default();
    assert_eq!(volume_to_steps(&config, 5.0).unwrap().get(), 3000);
    assert_eq!(volume_to_steps(&config, 0.0).unwrap().get(), 0);
}

#[test]
fn volume_truncates() {
    let config = PumpConfig::default();
    // 0.0049 mL are 2.94 steps
    assert_eq!(volume_to_steps(&config, 0.0049).unwrap().get(), 2);
    assert_eq!(volume_to_steps(&config, 2.5).unwrap().get(), 1500);
}

#[test]
fn volume_monotonic_and_in_range() {
    let config = PumpConfig::default();
    let mut last = 0;
    for i in 0..=500 {
        let v = config.syringe_size_ml * i as f64 / 500.0;
        let s = volume_to_steps(&config, v).unwrap().get();
        assert!(s >= last, "{} mL gave {} steps, less than {}", v, s, last);
        assert!(s <= config.max_steps);
        last = s;
    }
    assert_eq!(last, config.max_steps);
}

#[test]
fn volume_out_of_range() {
    let config = PumpConfig::default();
    assert!(matches!(
        volume_to_steps(&config, 5.01),
        Err(DriverError::OutOfRange {
            quantity: Quantity::Steps,
            max: 3000,
            ..
        })
    ));
    assert!(matches!(
        volume_to_steps(&config, -0.001),
        Err(DriverError::OutOfRange { .. })
    ));
    assert!(matches!(
        volume_to_steps(&config, f64::NAN),
        Err(DriverError::OutOfRange { .. })
    ));
}

#[test]
fn other_syringe() {
    let config = PumpConfig {
        syringe_size_ml: 1.0,
        max_steps: 24000,
        ..PumpConfig::default()
    };
    assert_eq!(volume_to_steps(&config, 0.5).unwrap().get(), 12000);
}

#[test]
fn rate_default_is_none() {
    let config = PumpConfig::default();
    assert_eq!(rate_to_velocity(&config, FlowRate::Default).unwrap(), None);
}

#[test]
fn rate_to_half_steps() {
    let config = PumpConfig::default();
    // 1 mL/min = 600 steps/min = 20 half-steps/s
    let v = rate_to_velocity(&config, FlowRate::MlPerMin(1.0)).unwrap();
    assert_eq!(v.unwrap().get(), 20);
    let v = rate_to_velocity(&config, FlowRate::MlPerMin(10.0)).unwrap();
    assert_eq!(v.unwrap().get(), 200);
    // fastest the pump can go
    let v = rate_to_velocity(&config, FlowRate::MlPerMin(300.0)).unwrap();
    assert_eq!(v.unwrap().get(), 6000);
}

#[test]
fn rate_truncates() {
    let config = PumpConfig::default();
    // 0.04 mL/min = 24 steps/min = 0.8 half-steps/s
    let v = rate_to_velocity(&config, FlowRate::MlPerMin(0.04)).unwrap();
    assert_eq!(v.unwrap().get(), 0);
}

#[test]
fn rate_out_of_range() {
    let config = PumpConfig::default();
    assert!(matches!(
        rate_to_velocity(&config, FlowRate::MlPerMin(301.0)),
        Err(DriverError::OutOfRange {
            quantity: Quantity::Velocity,
            max: 6000,
            ..
        })
    ));
    assert!(matches!(
        rate_to_velocity(&config, FlowRate::MlPerMin(-1.0)),
        Err(DriverError::OutOfRange { .. })
    ));
}

#[test]
fn rate_parse() {
    assert_eq!("default".parse::<FlowRate>().unwrap(), FlowRate::Default);
    assert_eq!("2.5".parse::<FlowRate>().unwrap(), FlowRate::MlPerMin(2.5));
    assert!(matches!(
        "fast".parse::<FlowRate>(),
        Err(DriverError::InvalidArgument)
    ));
}

#[test]
fn raw_units() {
    let config = PumpConfig::default();
    assert_eq!(steps(&config, 3000).unwrap().get(), 3000);
    assert!(steps(&config, 3001).is_err());
    assert_eq!(velocity(&config, 440).unwrap().get(), 440);
    assert!(velocity(&config, 6001).is_err());
}

#[test]
fn full_syringe_is_max_steps_for_any_size() {
    let sizes = [0.085, 0.135, 0.17, 0.27, 0.54]
        .into_iter()
        .chain((1..=20_000).map(|i| i as f64 * 0.0005));
    for s in sizes {
        let config = PumpConfig {
            syringe_size_ml: s,
            stroke_volume_ml: s,
            ..PumpConfig::default()
        };
        let steps = volume_to_steps(&config, s).unwrap().get();
        assert_eq!(steps, 3000, "{} mL syringe", s);
        let half = volume_to_steps(&config, s / 2.0).unwrap().get();
        assert_eq!(half, 1500, "half of a {} mL syringe", s);
    }
}

#[test]
fn tiny_negative_volume() {
    let config = PumpConfig::default();
    // float noise around zero still means the empty syringe
    assert_eq!(volume_to_steps(&config, -1e-15).unwrap().get(), 0);
    assert!(volume_to_steps(&config, -1e-6).is_err());
}
