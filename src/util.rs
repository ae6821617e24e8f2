
// Basically does same as anyhow::ensure
macro_rules! ensure {
    ($cond:expr, $err:expr) => {
        if !$cond {
            return Err($err);
        }
    };
}

pub(crate) use ensure;

// float error below this is noise, not a fraction of a step
const SNAP_EPSILON: f64 = 1e-9;

/// Returns the nearest integer if `value` is within float noise of it,
/// `value` otherwise. `3000.0 / 0.085 * 0.085` is `2999.9999999999995`.
pub(crate) fn snap(value: f64) -> f64 {
    let r = value.round();
    if (value - r).abs() < SNAP_EPSILON {
        r
    } else {
        value
    }
}

/// Truncates `value` towards zero after snapping it, returns `None` if it is
/// negative, not finite or bigger than `max` after truncation
pub(crate) fn checked_trunc(value: f64, max: u32) -> Option<u32> {
    let value = snap(value);
    if !value.is_finite() || value < 0.0 {
        return None;
    }
    let t = value.trunc();
    if t > max as f64 {
        None
    } else {
        Some(t as u32)
    }
}
