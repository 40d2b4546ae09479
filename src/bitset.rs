use std::fmt;
use std::ops::{BitAnd, BitOr, Sub};

use crate::puzzle::Color;

/// Set of colours a cell may still take, one bit per colour index.
/// Colour 0 is the background, so a 32-bit word covers every puzzle
/// this solver accepts.
#[derive(Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct ColorSet(u32);

pub const MAX_COLORS: u8 = 32;

impl ColorSet {
    pub fn empty() -> Self {
        ColorSet(0)
    }

    /// All colours of an `ncolor`-colour puzzle, background included.
    pub fn full(ncolor: u8) -> Self {
        debug_assert!(ncolor >= 1 && ncolor <= MAX_COLORS);
        if ncolor == MAX_COLORS {
            ColorSet(u32::MAX)
        } else {
            ColorSet((1 << ncolor) - 1)
        }
    }

    pub fn single(c: Color) -> Self {
        ColorSet(1 << c)
    }

    pub fn set(&mut self, c: Color) {
        self.0 |= 1 << c;
    }

    pub fn clear(&mut self, c: Color) {
        self.0 &= !(1 << c);
    }

    pub fn contains(self, c: Color) -> bool {
        self.0 & (1 << c) != 0
    }

    pub fn count(self) -> u8 {
        self.0.count_ones() as u8
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn intersect(self, other: Self) -> Self {
        ColorSet(self.0 & other.0)
    }

    pub fn union(self, other: Self) -> Self {
        ColorSet(self.0 | other.0)
    }

    pub fn minus(self, other: Self) -> Self {
        ColorSet(self.0 & !other.0)
    }

    /// Colours of an `ncolor`-colour puzzle not in this set.
    pub fn complement(self, ncolor: u8) -> Self {
        Self::full(ncolor).minus(self)
    }

    /// The one colour in a solved cell's set.
    pub fn sole(self) -> Option<Color> {
        if self.count() == 1 {
            Some(self.0.trailing_zeros() as Color)
        } else {
            None
        }
    }

    pub fn iter(self) -> impl Iterator<Item = Color> {
        let mut bits = self.0;
        std::iter::from_fn(move || {
            if bits == 0 {
                return None;
            }
            let c = bits.trailing_zeros() as Color;
            bits &= bits - 1;
            Some(c)
        })
    }
}

impl BitOr for ColorSet {
    type Output = ColorSet;
    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

impl BitAnd for ColorSet {
    type Output = ColorSet;
    fn bitand(self, rhs: Self) -> Self {
        self.intersect(rhs)
    }
}

impl Sub for ColorSet {
    type Output = ColorSet;
    fn sub(self, rhs: Self) -> Self {
        self.minus(rhs)
    }
}

impl FromIterator<Color> for ColorSet {
    fn from_iter<T: IntoIterator<Item = Color>>(iter: T) -> Self {
        let mut out = ColorSet::empty();
        for c in iter {
            out.set(c);
        }
        out
    }
}

impl fmt::Debug for ColorSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ColorSet({:#b})", self.0)
    }
}
