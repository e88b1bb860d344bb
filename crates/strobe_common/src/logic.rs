//! IEEE 1164 four-state logic values.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{BitAnd, Not};

/// A single 4-state logic value following the IEEE 1164 standard.
///
/// Signals start out as `X` until something drives them, which is how the
/// harness tells "never reset" apart from "held low".
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum Logic {
    /// Logic low (0).
    Zero = 0,
    /// Logic high (1).
    One = 1,
    /// Unknown or uninitialized.
    #[default]
    X = 2,
    /// High-impedance (tri-state).
    Z = 3,
}

impl Logic {
    /// Converts a character to a [`Logic`] value.
    ///
    /// Accepts '0', '1', 'x'/'X', and 'z'/'Z'.
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            '0' => Some(Logic::Zero),
            '1' => Some(Logic::One),
            'x' | 'X' => Some(Logic::X),
            'z' | 'Z' => Some(Logic::Z),
            _ => None,
        }
    }

    /// Maps a boolean onto a driven level.
    pub fn from_bool(value: bool) -> Self {
        if value {
            Logic::One
        } else {
            Logic::Zero
        }
    }

    /// Returns the boolean level, or `None` for `X` and `Z`.
    pub fn to_bool(self) -> Option<bool> {
        match self {
            Logic::Zero => Some(false),
            Logic::One => Some(true),
            Logic::X | Logic::Z => None,
        }
    }

    /// True only for a driven `1`.
    pub fn is_high(self) -> bool {
        self == Logic::One
    }

    /// True only for a driven `0`.
    pub fn is_low(self) -> bool {
        self == Logic::Zero
    }

    /// True for `0` and `1`.
    pub fn is_known(self) -> bool {
        matches!(self, Logic::Zero | Logic::One)
    }

    /// Decodes the 2-bit packed representation used by [`LogicVec`](crate::LogicVec).
    pub(crate) fn from_bits(bits: u64) -> Self {
        match bits & 0b11 {
            0 => Logic::Zero,
            1 => Logic::One,
            2 => Logic::X,
            _ => Logic::Z,
        }
    }
}

impl From<bool> for Logic {
    fn from(value: bool) -> Self {
        Logic::from_bool(value)
    }
}

impl fmt::Display for Logic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Logic::Zero => write!(f, "0"),
            Logic::One => write!(f, "1"),
            Logic::X => write!(f, "X"),
            Logic::Z => write!(f, "Z"),
        }
    }
}

/// IEEE 1164 AND truth table:
/// ```text
///     0  1  X  Z
/// 0 | 0  0  0  0
/// 1 | 0  1  X  X
/// X | 0  X  X  X
/// Z | 0  X  X  X
/// ```
impl BitAnd for Logic {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        use Logic::*;
        match (self, rhs) {
            (Zero, _) | (_, Zero) => Zero,
            (One, One) => One,
            _ => X,
        }
    }
}

/// IEEE 1164 NOT:
/// - `!0 = 1`, `!1 = 0`, `!X = X`, `!Z = X`
impl Not for Logic {
    type Output = Self;

    fn not(self) -> Self {
        use Logic::*;
        match self {
            Zero => One,
            One => Zero,
            X | Z => X,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Logic::*;
    use super::Logic;

    #[test]
    fn and_truth_table() {
        // Zero dominates
        assert_eq!(Zero & X, Zero);
        assert_eq!(Z & Zero, Zero);
        assert_eq!(One & One, One);
        // A handshake with an unknown side is unknown
        assert_eq!(One & X, X);
        assert_eq!(One & Z, X);
        assert_eq!(X & X, X);
    }

    #[test]
    fn not_values() {
        assert_eq!(!Zero, One);
        assert_eq!(!One, Zero);
        assert_eq!(!X, X);
        assert_eq!(!Z, X);
    }

    #[test]
    fn bool_conversions() {
        assert_eq!(Logic::from_bool(true), One);
        assert_eq!(Logic::from(false), Zero);
        assert_eq!(One.to_bool(), Some(true));
        assert_eq!(Zero.to_bool(), Some(false));
        assert_eq!(X.to_bool(), None);
        assert_eq!(Z.to_bool(), None);
    }

    #[test]
    fn level_predicates() {
        assert!(One.is_high());
        assert!(!X.is_high());
        assert!(Zero.is_low());
        assert!(!Z.is_low());
        assert!(Zero.is_known() && One.is_known());
        assert!(!X.is_known());
    }

    #[test]
    fn default_is_unknown() {
        assert_eq!(Logic::default(), X);
    }

    #[test]
    fn display() {
        assert_eq!(format!("{Zero}{One}{X}{Z}"), "01XZ");
    }

    #[test]
    fn from_char_valid_and_invalid() {
        assert_eq!(Logic::from_char('x'), Some(X));
        assert_eq!(Logic::from_char('Z'), Some(Z));
        assert_eq!(Logic::from_char('2'), None);
    }
}
