//! Scalar helpers called from generated right-hand sides.

use crate::traits::{constant, Scalar};

/// Clamps `x` into `[min, max]`.
pub fn clip<T: Scalar>(x: T, min: T, max: T) -> T {
    if x < min {
        min
    } else if x > max {
        max
    } else {
        x
    }
}

/// Wraps `x` into `[min, max]` periodically.
pub fn cycle<T: Scalar>(x: T, min: T, max: T) -> T {
    let period = max - min;
    if x < min {
        max - (min - x) % period
    } else if x > max {
        min + (x - min) % period
    } else {
        x
    }
}

/// Interpolates from `from` to `to` by the fraction `x`.
pub fn lerp<T: Scalar>(x: T, from: T, to: T) -> T {
    from + (to - from) * x
}

/// Remainder of `x / y` shifted into the sign of a positive divisor.
pub fn modulo<T: Scalar>(x: T, y: T) -> T {
    let remainder = x % y;
    if remainder < T::zero() {
        remainder + y
    } else {
        remainder
    }
}

/// `-1` when the sign bit of `x` is set, `1` otherwise.
pub fn sign<T: Scalar>(x: T) -> T {
    if x.is_sign_negative() {
        -T::one()
    } else {
        T::one()
    }
}

/// Magnitude of `x` with the sign of `y`.
pub fn csign<T: Scalar>(x: T, y: T) -> T {
    if y.is_sign_negative() {
        -x.abs()
    } else {
        x.abs()
    }
}

pub fn invsqrt<T: Scalar>(x: T) -> T {
    T::one() / x.sqrt()
}

pub fn exp2<T: Scalar>(x: T) -> T {
    x.exp2()
}

pub fn hypot<T: Scalar>(x: T, y: T) -> T {
    x.hypot(y)
}

pub fn min<T: Scalar>(x: T, y: T) -> T {
    x.min(y)
}

pub fn max<T: Scalar>(x: T, y: T) -> T {
    x.max(y)
}

/// Error function, Abramowitz and Stegun formula 7.1.26.
///
/// Absolute error is below `1.5e-7`, which is enough for the smooth
/// switching functions models build from it.
pub fn erf<T: Scalar>(x: T) -> T {
    let a1 = constant::<T>(0.254829592);
    let a2 = constant::<T>(-0.284496736);
    let a3 = constant::<T>(1.421413741);
    let a4 = constant::<T>(-1.453152027);
    let a5 = constant::<T>(1.061405429);
    let p = constant::<T>(0.3275911);

    let s = sign(x);
    let x = x.abs();
    let t = T::one() / (T::one() + p * x);
    let y = T::one() - ((((a5 * t + a4) * t + a3) * t + a2) * t + a1) * t * (-x * x).exp();

    s * y
}

pub fn sum<T: Scalar>(x: &[T]) -> T {
    x.iter().fold(T::zero(), |acc, &v| acc + v)
}

pub fn product<T: Scalar>(x: &[T]) -> T {
    x.iter().fold(T::one(), |acc, &v| acc * v)
}

/// Sum of squares.
pub fn sqsum<T: Scalar>(x: &[T]) -> T {
    x.iter().fold(T::zero(), |acc, &v| acc + v * v)
}

/// Euclidean norm.
pub fn norm<T: Scalar>(x: &[T]) -> T {
    sqsum(x).sqrt()
}

/// Smallest element, `+inf` for an empty slice.
pub fn min_of<T: Scalar>(x: &[T]) -> T {
    x.iter().fold(T::infinity(), |acc, &v| acc.min(v))
}

/// Largest element, `-inf` for an empty slice.
pub fn max_of<T: Scalar>(x: &[T]) -> T {
    x.iter().fold(T::neg_infinity(), |acc, &v| acc.max(v))
}
