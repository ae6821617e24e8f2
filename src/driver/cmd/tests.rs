use super::{
    super::{convert, DriverError},
    frame::{Frame, PumpAddress},
    Direction, Directive, InitDirection, Repeats, Travel, Valve,
};
use crate::config::PumpConfig;

fn steps(n: u32) -> Directive {
    Directive::Goto(convert::steps(&PumpConfig::default(), n).unwrap())
}

#[test]
fn fmt_standalone() {
    assert_eq!(format!("{}", Directive::Valve(Valve::Inlet)), "I");
    assert_eq!(format!("{}", Directive::Valve(Valve::Outlet)), "O");
    assert_eq!(format!("{}", Directive::Valve(Valve::Bypass)), "B");
    assert_eq!(format!("{}", Directive::Query), "Q");
}

#[test]
fn fmt_with_value() {
    let config = PumpConfig::default();
    assert_eq!(format!("{}", steps(1337)), "A1337");
    let v = convert::velocity(&config, 6000).unwrap();
    assert_eq!(format!("{}", Directive::Velocity(v)), "V6000");
    let r = Repeats::new(3).unwrap();
    assert_eq!(format!("{}", Directive::Repeat(r)), "G3");
    assert_eq!(format!("{}", Directive::Report(19)), "?19");
}

#[test]
fn fmt_initialize() {
    assert_eq!(
        format!("{}", Directive::Initialize(InitDirection::InputLeft)),
        "Z"
    );
    assert_eq!(
        format!("{}", Directive::Initialize(InitDirection::InputRight)),
        "Y"
    );
}

#[test]
fn fmt_relative() {
    let s = convert::steps(&PumpConfig::default(), 42).unwrap();
    assert_eq!(
        format!("{}", Directive::relative(Travel::Pickup, s)),
        "P42"
    );
    assert_eq!(
        format!("{}", Directive::relative(Travel::Dispense, s)),
        "D42"
    );
}

#[test]
fn frame_transfer() {
    let frame = Frame::new(
        PumpAddress::new(1).unwrap(),
        [
            Directive::Valve(Valve::Inlet),
            steps(3000),
            Directive::Valve(Valve::Outlet),
            steps(0),
            Directive::Repeat(Repeats::new(3).unwrap()),
        ],
    );
    assert_eq!(frame.to_bytes(), b"/1IA3000OA0G3R\r".to_vec());
}

#[test]
fn frame_keeps_order() {
    let frame = Frame::new(
        PumpAddress::new(2).unwrap(),
        [steps(0), Directive::Valve(Valve::Bypass)],
    );
    assert_eq!(frame.to_string(), "/2A0BR\r");
    assert_eq!(frame.directives().len(), 2);
}

#[test]
fn frame_queries() {
    let a = PumpAddress::new(1).unwrap();
    assert_eq!(Frame::query(a).to_string(), "/1QR\r");
    assert_eq!(Frame::report_initialized(a).to_string(), "/1?19R\r");
}

#[test]
fn repeats_bounds() {
    assert!(matches!(Repeats::new(0), Err(DriverError::InvalidArgument)));
    assert_eq!(Repeats::new(1).unwrap().get(), 1);
    assert_eq!(Repeats::new(Repeats::MAX).unwrap().get(), Repeats::MAX);
    assert!(matches!(
        Repeats::new(Repeats::MAX + 1),
        Err(DriverError::InvalidArgument)
    ));
}

#[test]
fn valve_parse() {
    assert_eq!("inlet".parse::<Valve>().unwrap(), Valve::Inlet);
    assert_eq!("Outlet".parse::<Valve>().unwrap(), Valve::Outlet);
    assert_eq!("bypass".parse::<Valve>().unwrap(), Valve::Bypass);
    assert!(matches!(
        "sideways".parse::<Valve>(),
        Err(DriverError::InvalidValvePosition(s)) if s == "sideways"
    ));
}

#[test]
fn direction_parse() {
    assert_eq!(Direction::try_from("in").unwrap(), Direction::In);
    assert_eq!("out".parse::<Direction>().unwrap(), Direction::Out);
    assert!(matches!(
        Direction::try_from("sideways"),
        Err(DriverError::InvalidDirection(s)) if s == "sideways"
    ));
}

#[test]
fn direction_valves() {
    assert_eq!(Direction::In.valves(), (Valve::Inlet, Valve::Outlet));
    assert_eq!(Direction::Out.valves(), (Valve::Outlet, Valve::Inlet));
}

#[test]
fn init_direction_parse() {
    assert_eq!("Z".parse::<InitDirection>().unwrap(), InitDirection::InputLeft);
    assert_eq!("Y".parse::<InitDirection>().unwrap(), InitDirection::InputRight);
    assert!(matches!(
        "X".parse::<InitDirection>(),
        Err(DriverError::InvalidArgument)
    ));
}
