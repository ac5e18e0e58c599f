// fixed.rs -- 16.16 fixed-point arithmetic
//
// Every coordinate, momentum and height in the simulation is a Fixed.
// All operations are integer-only so a tic sequence replays identically
// on every platform; no f32/f64 ever enters the simulation path.

use std::fmt;
use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};

pub const FRACBITS: u32 = 16;

/// A 16.16 fixed-point number.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Fixed(pub i32);

pub const FRACUNIT: Fixed = Fixed(1 << FRACBITS);
pub const FIXED_MIN: Fixed = Fixed(i32::MIN);
pub const FIXED_MAX: Fixed = Fixed(i32::MAX);
pub const ZERO: Fixed = Fixed(0);

impl Fixed {
    #[inline]
    pub const fn from_int(v: i32) -> Fixed {
        Fixed(v << FRACBITS)
    }

    /// Integer part, rounding toward negative infinity.
    #[inline]
    pub const fn to_int(self) -> i32 {
        self.0 >> FRACBITS
    }

    #[inline]
    pub const fn frac(self) -> Fixed {
        Fixed(self.0 & ((1 << FRACBITS) - 1))
    }

    /// Fixed-point multiply, widened through i64 and truncated back.
    #[inline]
    pub const fn mul(self, other: Fixed) -> Fixed {
        Fixed(((self.0 as i64 * other.0 as i64) >> FRACBITS) as i32)
    }

    /// Fixed-point divide. Saturates on overflow the way the original
    /// engine did (|a| >> 14 >= |b| check), so a near-zero divisor yields
    /// FIXED_MAX/MIN instead of a trap.
    #[inline]
    pub const fn div(self, other: Fixed) -> Fixed {
        if (self.0.abs() >> 14) >= other.0.abs() {
            if (self.0 ^ other.0) < 0 {
                FIXED_MIN
            } else {
                FIXED_MAX
            }
        } else {
            Fixed((((self.0 as i64) << FRACBITS) / other.0 as i64) as i32)
        }
    }

    #[inline]
    pub const fn abs(self) -> Fixed {
        Fixed(self.0.abs())
    }

    #[inline]
    pub fn min(self, other: Fixed) -> Fixed {
        if self.0 < other.0 { self } else { other }
    }

    #[inline]
    pub fn max(self, other: Fixed) -> Fixed {
        if self.0 > other.0 { self } else { other }
    }

    pub fn clamp(self, lo: Fixed, hi: Fixed) -> Fixed {
        self.max(lo).min(hi)
    }

    /// Halve, preserving the arithmetic-shift semantics relied on by the
    /// movement code.
    #[inline]
    pub const fn half(self) -> Fixed {
        Fixed(self.0 >> 1)
    }
}

/// P_AproxDistance: a + b - min(a,b)/2, the engine's traditional cheap
/// octagonal distance bound. Within ~12% of the true euclidean length.
#[inline]
pub fn approx_dist(dx: Fixed, dy: Fixed) -> Fixed {
    let dx = dx.abs();
    let dy = dy.abs();
    if dx < dy {
        Fixed(dx.0 + dy.0 - (dx.0 >> 1))
    } else {
        Fixed(dx.0 + dy.0 - (dy.0 >> 1))
    }
}

impl Add for Fixed {
    type Output = Fixed;
    #[inline]
    fn add(self, rhs: Fixed) -> Fixed {
        Fixed(self.0.wrapping_add(rhs.0))
    }
}

impl Sub for Fixed {
    type Output = Fixed;
    #[inline]
    fn sub(self, rhs: Fixed) -> Fixed {
        Fixed(self.0.wrapping_sub(rhs.0))
    }
}

impl Neg for Fixed {
    type Output = Fixed;
    #[inline]
    fn neg(self) -> Fixed {
        Fixed(self.0.wrapping_neg())
    }
}

impl AddAssign for Fixed {
    #[inline]
    fn add_assign(&mut self, rhs: Fixed) {
        self.0 = self.0.wrapping_add(rhs.0);
    }
}

impl SubAssign for Fixed {
    #[inline]
    fn sub_assign(&mut self, rhs: Fixed) {
        self.0 = self.0.wrapping_sub(rhs.0);
    }
}

impl Mul for Fixed {
    type Output = Fixed;
    #[inline]
    fn mul(self, rhs: Fixed) -> Fixed {
        Fixed::mul(self, rhs)
    }
}

impl Div for Fixed {
    type Output = Fixed;
    #[inline]
    fn div(self, rhs: Fixed) -> Fixed {
        Fixed::div(self, rhs)
    }
}

/// Scale by a plain integer (state-table distances, damage multiples).
impl Mul<i32> for Fixed {
    type Output = Fixed;
    #[inline]
    fn mul(self, rhs: i32) -> Fixed {
        Fixed(self.0.wrapping_mul(rhs))
    }
}

impl fmt::Debug for Fixed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fixed({}.{:05})", self.0 >> FRACBITS, {
            // fractional part in 1/100000ths, unsigned
            ((self.0 & 0xffff) as u64 * 100000) >> FRACBITS
        })
    }
}

impl fmt::Display for Fixed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
