//! Provides bindings for the individual protocol letters

macro_rules! makepl {
    ($($name:ident, $val:literal),*) => {
        $(pub const $name: &str = $val;)*
    };
}

// symbols of the commands in the order they appear in the manual
#[rustfmt::skip]
makepl!(
    FRAME_START, "/",
    EXECUTE, "R",
    FRAME_END, "\r",
    INIT_INPUT_LEFT, "Z",
    INIT_INPUT_RIGHT, "Y",
    VALVE_INLET, "I",
    VALVE_OUTLET, "O",
    VALVE_BYPASS, "B",
    ABSOLUTE_POSITION, "A",
    RELATIVE_PICKUP, "P",
    RELATIVE_DISPENSE, "D",
    TOP_VELOCITY, "V",
    REPEAT, "G",
    QUERY, "Q",
    REPORT, "?"
);

/// Report number of the initialization state
pub const REPORT_INITIALIZED: u8 = 19;

/// Status byte of an idle pump without error, also what readiness is detected by
pub const READY_MARKER: u8 = b'`';
