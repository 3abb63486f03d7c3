//!
//! # Gates21 Coordinate System
//!

// Std-lib imports
use std::ops::Not;

// Crates.io
use derive_more::{Add, AddAssign, From, Neg, Sub, SubAssign, Sum};
use serde::{Deserialize, Serialize};

/// # Location Integer Type-Alias
///
/// Widths, offsets and positions are all signed: ports sit at negative offsets
/// from the cell center line, and cost math subtracts freely.
pub type Int = isize;

/// A Scalar Value in Database Units
///
/// Every length in a generated cell (widths, positions, pitches) is one of these.
/// Integer units keep placement results bit-identical from run to run.
#[derive(
    From,
    Add,
    AddAssign,
    Sub,
    SubAssign,
    Neg,
    Sum,
    Debug,
    Default,
    Clone,
    Copy,
    Serialize,
    Deserialize,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
)]
pub struct DbUnits(pub Int);
impl DbUnits {
    /// Every so often we need the raw number, fine. Use sparingly.
    #[inline(always)]
    pub fn raw(&self) -> Int {
        self.0
    }
    /// Absolute value
    pub fn abs(&self) -> Self {
        Self(self.0.abs())
    }
    /// Half of `self`, rounding toward zero
    pub fn half(&self) -> Self {
        Self(self.0 / 2)
    }
}
impl std::ops::Div<Int> for DbUnits {
    type Output = Self;
    fn div(self, rhs: Int) -> Self::Output {
        Self(self.raw() / rhs)
    }
}
impl std::ops::Mul<Int> for DbUnits {
    type Output = Self;
    fn mul(self, rhs: Int) -> Self::Output {
        Self(self.0 * rhs)
    }
}
impl std::fmt::Display for DbUnits {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// # Direction Enumeration
///
/// The axis along which a routing track runs.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Dir {
    Horiz,
    Vert,
}
impl Dir {
    /// Whichever direction we are *not*
    pub fn other(self) -> Self {
        match self {
            Self::Horiz => Self::Vert,
            Self::Vert => Self::Horiz,
        }
    }
}
impl Not for Dir {
    type Output = Self;
    /// Exclamation Operator returns the opposite direction
    fn not(self) -> Self::Output {
        self.other()
    }
}

/// Common geometric pairing of (x,y) coordinates
/// Represents points, offsets, and sizes.
#[derive(
    Debug,
    Default,
    Clone,
    Copy,
    Serialize,
    Deserialize,
    PartialEq,
    Eq,
    Hash,
    Add,
    AddAssign,
    Sub,
    SubAssign,
)]
pub struct Xy {
    pub x: DbUnits,
    pub y: DbUnits,
}
impl Xy {
    /// Create a new [Xy].
    pub fn new(x: impl Into<DbUnits>, y: impl Into<DbUnits>) -> Xy {
        Self {
            x: x.into(),
            y: y.into(),
        }
    }
    /// Create a new [Xy] with transposed coordinates.
    pub fn transpose(&self) -> Xy {
        Self {
            y: self.x,
            x: self.y,
        }
    }
    /// Create from a coordinate `along` direction `dir`, and one `across` it.
    pub fn from_dir(dir: Dir, along: DbUnits, across: DbUnits) -> Xy {
        match dir {
            Dir::Horiz => Self::new(along, across),
            Dir::Vert => Self::new(across, along),
        }
    }
    /// Get the dimension in direction `dir`
    /// Also available via the [Index] trait.
    pub fn dir(&self, dir: Dir) -> &DbUnits {
        match dir {
            Dir::Horiz => &self.x,
            Dir::Vert => &self.y,
        }
    }
}
impl std::ops::Index<Dir> for Xy {
    type Output = DbUnits;
    fn index(&self, dir: Dir) -> &Self::Output {
        self.dir(dir)
    }
}
impl From<(Int, Int)> for Xy {
    fn from(tup: (Int, Int)) -> Self {
        Self::new(tup.0, tup.1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dbunits_math() {
        let a = DbUnits(7);
        assert_eq!(a + DbUnits(3), DbUnits(10));
        assert_eq!(a - DbUnits(10), DbUnits(-3));
        assert_eq!((a - DbUnits(10)).abs(), DbUnits(3));
        assert_eq!(a.half(), DbUnits(3));
        assert_eq!(a * 2, DbUnits(14));
        assert_eq!(vec![a, a].into_iter().sum::<DbUnits>(), DbUnits(14));
    }
    #[test]
    fn test_xy_dirs() {
        let p = Xy::new(3, 5);
        assert_eq!(p[Dir::Horiz], DbUnits(3));
        assert_eq!(p[Dir::Vert], DbUnits(5));
        assert_eq!(p.transpose(), Xy::new(5, 3));
        assert_eq!(Xy::from_dir(Dir::Vert, DbUnits(5), DbUnits(3)), p);
        assert_eq!(!Dir::Horiz, Dir::Vert);
    }
}
