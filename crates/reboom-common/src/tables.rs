// tables.rs -- binary angle arithmetic and integer trigonometry
//
// Angles are 32-bit binary angle measurement (BAM): the full circle is the
// full u32 range, so wrap-around is free and every platform agrees on every
// bit. The original engine carried 10k-entry sine/tangent lookup tables;
// here sine is a Bhaskara rational approximation and arctangent a
// polynomial, both integer-only, so the tables stay out of the binary while
// determinism is preserved.

use crate::fixed::{Fixed, FRACUNIT};
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};

/// Binary angle. 0 is east, increasing counterclockwise.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Debug, Hash)]
pub struct Angle(pub u32);

pub const ANG0: Angle = Angle(0);
pub const ANG45: Angle = Angle(0x2000_0000);
pub const ANG90: Angle = Angle(0x4000_0000);
pub const ANG180: Angle = Angle(0x8000_0000);
pub const ANG270: Angle = Angle(0xC000_0000);

// 0.273 rad scaled to BAM, the correction term of the atan approximation
// atan(t) ~= (pi/4)t + 0.273 t (1 - t) for t in [0,1].
const ATAN_K: u64 = 186_613_324;

impl Angle {
    /// One of the eight compass movement directions (0 = east, counting
    /// counterclockwise), as used by monster movement.
    #[inline]
    pub const fn from_movedir(dir: u8) -> Angle {
        Angle((dir as u32) << 29)
    }

    /// Sine as 16.16, via the Bhaskara I rational approximation on the
    /// half-turn. Maximum error below 0.0017.
    pub fn sin(self) -> Fixed {
        let (a, sign) = if self.0 >= ANG180.0 {
            (self.0 - ANG180.0, -1)
        } else {
            (self.0, 1)
        };
        // fraction of the half-turn in 16.16: a / 2^31 * 2^16
        let f = (a >> 15) as i64;
        let p = (f * ((FRACUNIT.0 as i64) - f)) >> 16; // f(1-f)
        let num = 16 * p << 16;
        let den = 5 * FRACUNIT.0 as i64 - 4 * p;
        let s = (num / den) as i32;
        Fixed(s * sign)
    }

    #[inline]
    pub fn cos(self) -> Fixed {
        (self + ANG90).sin()
    }
}

impl Add for Angle {
    type Output = Angle;
    #[inline]
    fn add(self, rhs: Angle) -> Angle {
        Angle(self.0.wrapping_add(rhs.0))
    }
}

impl Sub for Angle {
    type Output = Angle;
    #[inline]
    fn sub(self, rhs: Angle) -> Angle {
        Angle(self.0.wrapping_sub(rhs.0))
    }
}

impl Neg for Angle {
    type Output = Angle;
    #[inline]
    fn neg(self) -> Angle {
        Angle(self.0.wrapping_neg())
    }
}

impl AddAssign for Angle {
    fn add_assign(&mut self, rhs: Angle) {
        self.0 = self.0.wrapping_add(rhs.0);
    }
}

impl SubAssign for Angle {
    fn sub_assign(&mut self, rhs: Angle) {
        self.0 = self.0.wrapping_sub(rhs.0);
    }
}

/// atan of a ratio already clamped to [0, 1] (16.16), result in [0, ANG45].
fn atan_octant(t: i64) -> u32 {
    let linear = (ANG45.0 as u64 * t as u64) >> 16;
    let bend = (ATAN_K * ((t as u64 * (FRACUNIT.0 as i64 - t) as u64) >> 16)) >> 16;
    (linear + bend) as u32
}

/// R_PointToAngle2 equivalent: the BAM angle of the vector (dx, dy).
/// Zero vector maps to angle 0.
pub fn point_to_angle(dx: Fixed, dy: Fixed) -> Angle {
    if dx.0 == 0 && dy.0 == 0 {
        return ANG0;
    }
    let ax = dx.abs();
    let ay = dy.abs();

    // first octant angle for |dy| <= |dx|
    let oct = if ay <= ax {
        Angle(atan_octant(ay.div(ax).0 as i64))
    } else {
        ANG90 - Angle(atan_octant(ax.div(ay).0 as i64))
    };

    match (dx.0 >= 0, dy.0 >= 0) {
        (true, true) => oct,
        (false, true) => ANG180 - oct,
        (false, false) => ANG180 + oct,
        (true, false) => -oct,
    }
}
