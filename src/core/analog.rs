// Analog value helpers: sensitivity scaling, deadzones and clamping

/// Clamp a value between min and max
pub fn clamp<T: PartialOrd>(value: T, min: T, max: T) -> T {
    if value < min {
        min
    } else if value > max {
        max
    } else {
        value
    }
}

/// Zero out values whose magnitude is below `deadzone`.
///
/// The result is exactly `0.0` inside the deadzone, never a tiny residual.
pub fn apply_deadzone(value: f64, deadzone: f64) -> f64 {
    if value.abs() < deadzone {
        0.0
    } else {
        value
    }
}

/// Scale by sensitivity, then apply the deadzone to the scaled value
pub fn scale_and_deadzone(value: f64, sensitivity: f64, deadzone: f64) -> f64 {
    apply_deadzone(value * sensitivity, deadzone)
}

/// Check if two values differ by less than `epsilon`
pub fn approx_equal(a: f64, b: f64, epsilon: f64) -> bool {
    (a - b).abs() < epsilon
}
