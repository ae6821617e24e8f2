use super::{
    cmd::frame::{ErrorCode, PumpAddress, ReadinessState},
    transport::{StreamTransport, TransportError},
    Driver, DriverError,
};
use crate::config::{PollConfig, PumpConfig};
use tricontinent_pump_driver_test::Interface;

fn poll() -> PollConfig {
    PollConfig {
        interval_ms: 0,
        max_attempts: 5,
        deadline_ms: 60_000,
        read_timeout_ms: 10,
        completion_max_attempts: 8,
        completion_deadline_ms: 60_000,
    }
}

fn driver(interface: &Interface) -> Driver<StreamTransport<Interface>> {
    let mut driver = Driver::with_poll_config(StreamTransport::new(interface.clone()), poll());
    driver.open().unwrap();
    driver
}

fn address(a: u8) -> PumpAddress {
    PumpAddress::new(a).unwrap()
}

#[test]
fn add_pump() {
    let interface = Interface::new();
    let mut driver = driver(&interface);
    let p1 = driver.add_pump(1, PumpConfig::default()).unwrap();
    assert_eq!(p1.address(), address(1));
    assert!(driver.inner.borrow().pumps.contains(&address(1)));
}

#[test]
fn add_pump_invalid_address() {
    let interface = Interface::new();
    let mut driver = driver(&interface);
    assert!(matches!(
        driver.add_pump(0, PumpConfig::default()),
        Err(DriverError::InvalidAddress(0))
    ));
    assert!(matches!(
        driver.add_pump(10, PumpConfig::default()),
        Err(DriverError::InvalidAddress(10))
    ));
}

#[test]
fn add_pump_twice() {
    let interface = Interface::new();
    let mut driver = driver(&interface);
    let _p1 = driver.add_pump(1, PumpConfig::default()).unwrap();
    assert!(matches!(
        driver.add_pump(1, PumpConfig::default()),
        Err(DriverError::AlreadyExists(a)) if a == address(1)
    ));
}

#[test]
fn add_pump_after_drop() {
    let interface = Interface::new();
    let mut driver = driver(&interface);
    let p1 = driver.add_pump(1, PumpConfig::default()).unwrap();
    drop(p1);
    assert!(driver.inner.borrow().pumps.is_empty());
    driver.add_pump(1, PumpConfig::default()).unwrap();
}

#[test]
fn add_pump_invalid_config() {
    let interface = Interface::new();
    let mut driver = driver(&interface);
    let config = PumpConfig {
        stroke_volume_ml: 10.0,
        ..PumpConfig::default()
    };
    assert!(matches!(
        driver.add_pump(1, config),
        Err(DriverError::Config(_))
    ));
    assert!(driver.inner.borrow().pumps.is_empty());
}

#[test]
fn session_closes() {
    let interface = Interface::new();
    let mut driver = Driver::with_poll_config(StreamTransport::new(interface.clone()), poll());
    let r = driver.session(|d| {
        assert!(d.is_open());
        Ok(42)
    });
    assert_eq!(r.unwrap(), 42);
    assert!(!driver.is_open());
}

#[test]
fn session_closes_on_error() {
    let interface = Interface::new();
    let mut driver = Driver::with_poll_config(StreamTransport::new(interface.clone()), poll());
    let r: Result<(), _> = driver.session(|d| {
        let mut p1 = d.add_pump(1, PumpConfig::default())?;
        p1.is_ready()?;
        Ok(())
    });
    assert!(matches!(r, Err(DriverError::Timeout { attempts: 5, .. })));
    assert!(!driver.is_open());
}

#[test]
fn closed_driver() {
    let interface = Interface::new();
    let mut driver = Driver::with_poll_config(StreamTransport::new(interface.clone()), poll());
    let mut p1 = driver.add_pump(1, PumpConfig::default()).unwrap();
    assert!(matches!(
        p1.is_ready(),
        Err(DriverError::Transport(TransportError::NotOpen))
    ));
    assert_eq!(interface.write_count(), 0);
}

//

#[test]
fn wait_ready() {
    let mut interface = Interface::new();
    let driver = driver(&interface);
    interface.add_busy();
    interface.add_busy();
    interface.add_ready();

    driver.inner.borrow_mut().wait_ready(address(1)).unwrap();

    assert!(interface.is_empty());
    assert_eq!(interface.written(), vec![b"/1QR\r".to_vec(); 3]);
}

#[test]
fn wait_ready_marker_anywhere() {
    let mut interface = Interface::new();
    let driver = driver(&interface);
    interface.add_read(b"garbage`garbage\r\n");

    driver.inner.borrow_mut().wait_ready(address(1)).unwrap();
}

#[test]
fn wait_ready_timeout_attempts() {
    let mut interface = Interface::new();
    let driver = driver(&interface);
    for _ in 0..10 {
        interface.add_busy();
    }

    let r = driver.inner.borrow_mut().wait_ready(address(3));

    assert!(matches!(
        r,
        Err(DriverError::Timeout { address: a, attempts: 5 }) if a == address(3)
    ));
    assert_eq!(interface.write_count(), 5);
}

#[test]
fn wait_ready_timeout_deadline() {
    let interface = Interface::new();
    let poll = PollConfig {
        interval_ms: 5,
        max_attempts: 1000,
        deadline_ms: 1,
        read_timeout_ms: 10,
        completion_max_attempts: 1000,
        completion_deadline_ms: 60_000,
    };
    let mut driver = Driver::with_poll_config(StreamTransport::new(interface.clone()), poll);
    driver.open().unwrap();

    let r = driver.inner.borrow_mut().wait_ready(address(1));

    assert!(matches!(r, Err(DriverError::Timeout { attempts: 1, .. })));
}

#[test]
fn query_initialized() {
    let mut interface = Interface::new();
    let driver = driver(&interface);
    interface.add_ready();
    // a reply without the marker is asked again
    interface.add_read(b"/0@\x03\r\n");
    interface.add_initialized(true);

    assert!(driver.inner.borrow_mut().query_initialized(address(1)).unwrap());

    assert!(interface.is_empty());
    assert_eq!(
        interface.written(),
        vec![
            b"/1QR\r".to_vec(),
            b"/1?19R\r".to_vec(),
            b"/1?19R\r".to_vec()
        ]
    );
}

#[test]
fn query_readiness() {
    let mut interface = Interface::new();
    let driver = driver(&interface);
    interface.add_busy();
    interface.add_ready();
    interface.add_reply(0x60 | 9, b"");
    let mut inner = driver.inner.borrow_mut();

    assert_eq!(
        inner.query_readiness(address(1)).unwrap(),
        ReadinessState::Busy
    );
    assert_eq!(
        inner.query_readiness(address(1)).unwrap(),
        ReadinessState::Idle
    );
    assert_eq!(
        inner.query_readiness(address(1)).unwrap(),
        ReadinessState::IdleWithError(ErrorCode::PlungerOverload)
    );
}

#[test]
fn query_readiness_no_answer() {
    let interface = Interface::new();
    let driver = driver(&interface);

    let r = driver.inner.borrow_mut().query_readiness(address(1));

    assert!(matches!(r, Err(DriverError::Timeout { attempts: 1, .. })));
}

#[test]
fn query_readiness_unknown_status() {
    let mut interface = Interface::new();
    let driver = driver(&interface);
    interface.add_reply(b'0', b"");

    let r = driver.inner.borrow_mut().query_readiness(address(1));

    assert!(matches!(r, Err(DriverError::UnexpectedStatus(_))));
}

#[test]
fn wait_done_has_own_bounds() {
    let mut interface = Interface::new();
    let driver = driver(&interface);
    // more busy replies than a status poll accepts
    for _ in 0..7 {
        interface.add_busy();
    }
    interface.add_ready();

    driver.inner.borrow_mut().wait_done(address(1)).unwrap();

    assert!(interface.is_empty());
    assert_eq!(interface.write_count(), 8);
}

#[test]
fn wait_done_timeout_attempts() {
    let interface = Interface::new();
    let driver = driver(&interface);

    let r = driver.inner.borrow_mut().wait_done(address(2));

    assert!(matches!(r, Err(DriverError::Timeout { attempts: 8, .. })));
}

#[test]
fn wait_done_timeout_deadline() {
    let interface = Interface::new();
    let poll = PollConfig {
        interval_ms: 5,
        completion_max_attempts: 1000,
        completion_deadline_ms: 1,
        ..poll()
    };
    let mut driver = Driver::with_poll_config(StreamTransport::new(interface.clone()), poll);
    driver.open().unwrap();

    let r = driver.inner.borrow_mut().wait_done(address(1));

    assert!(matches!(r, Err(DriverError::Timeout { attempts: 1, .. })));
}
