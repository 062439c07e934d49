//! Type definition of Float, otherwise constants and functions which
//! can be used almost everywhere else in the code.

// std
use std;
// others
use num;

pub type Float = f32;

pub const MACHINE_EPSILON: Float = std::f32::EPSILON * 0.5;

/// Error propagation.
pub fn gamma(n: i32) -> Float {
    (n as Float * MACHINE_EPSILON) / (1.0 - n as Float * MACHINE_EPSILON)
}

/// Is used to write sRGB-compatible 8-bit image files.
pub fn gamma_correct(value: Float) -> Float {
    if value <= 0.003_130_8 {
        12.92 * value
    } else {
        1.055 as Float * value.powf((1.0 / 2.4) as Float) - 0.055
    }
}

/// Convert from angles expressed in degrees to radians.
pub fn radians(deg: Float) -> Float {
    (std::f32::consts::PI / 180.0 as Float) * deg
}

/// Clamp the given value *val* to lie between the values *low* and *high*.
pub fn clamp_t<T>(val: T, low: T, high: T) -> T
where
    T: PartialOrd,
{
    if val < low {
        low
    } else if val > high {
        high
    } else {
        val
    }
}

/// Linear interpolation between *a* (*t* == 0) and *b* (*t* == 1).
pub fn lerp<S, T>(t: S, a: T, b: T) -> T
where
    S: num::One,
    S: std::ops::Sub<S, Output = S>,
    S: Copy,
    T: std::ops::Add<T, Output = T>,
    T: std::ops::Mul<S, Output = T>,
{
    let one: S = num::One::one();
    a * (one - t) + b * t
}

/// Replace a zero by a tiny value carrying the same sign, so its
/// reciprocal stays finite.
pub fn nonzero_or_tiny(v: Float) -> Float {
    if v == 0.0 as Float {
        (1e-20 as Float).copysign(v)
    } else {
        v
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn gamma_grows_with_n() {
        assert!(gamma(3) > 0.0);
        assert!(gamma(5) > gamma(3));
    }

    #[test]
    fn clamp_and_lerp() {
        assert_eq!(clamp_t(5, 0, 3), 3);
        assert_eq!(clamp_t(-1.0, 0.0, 3.0), 0.0);
        assert_eq!(lerp(0.25 as Float, 0.0 as Float, 4.0 as Float), 1.0);
    }

    #[test]
    fn tiny_keeps_sign() {
        assert!(nonzero_or_tiny(0.0).is_sign_positive());
        assert!(nonzero_or_tiny(-0.0).is_sign_negative());
        assert!((1.0 / nonzero_or_tiny(-0.0)).is_finite());
        assert_eq!(nonzero_or_tiny(2.0), 2.0);
    }
}
