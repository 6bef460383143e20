//! Presence flags for cached metadata fields.

use std::fmt;
use std::ops::{BitAnd, BitOr, BitOrAssign, Not};

/// Set of metadata fields known to hold a valid value.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Bits(u8);

const NAMES: [&str; Bits::COUNT] = ["size", "time", "md5", "sha1", "sha256"];

impl Bits {
    /// No fields set.
    pub const NONE: Self = Self(0);
    /// Cached size.
    pub const SIZE: Self = Self(1 << 0);
    /// Cached modification time.
    pub const TIME: Self = Self(1 << 1);
    /// MD5 digest.
    pub const MD5: Self = Self(1 << 2);
    /// SHA-1 digest.
    pub const SHA1: Self = Self(1 << 3);
    /// SHA-256 digest.
    pub const SHA256: Self = Self(1 << 4);
    /// Every field.
    pub const ALL: Self = Self((1 << Self::COUNT) - 1);

    /// Number of defined flags.
    pub const COUNT: usize = 5;

    /// Build from a raw value, keeping undefined bits.
    #[must_use]
    pub const fn from_raw(raw: u8) -> Self {
        Self(raw)
    }

    /// Raw value.
    #[must_use]
    pub const fn raw(self) -> u8 {
        self.0
    }

    /// True if any bit of `other` is set.
    #[must_use]
    pub const fn has(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    /// True if every bit of `other` is set.
    #[must_use]
    pub const fn has_all(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for Bits {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for Bits {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for Bits {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl Not for Bits {
    type Output = Self;

    fn not(self) -> Self {
        Self(!self.0)
    }
}

impl fmt::Display for Bits {
    /// Renders `size|time|md5|sha1|sha256`, `0` when empty, and any
    /// undefined bits as a trailing hex value.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("0");
        }

        let mut need_sep = false;
        for (i, name) in NAMES.iter().enumerate() {
            if !self.has(Self(1 << i)) {
                continue;
            }
            if need_sep {
                f.write_str("|")?;
            }
            f.write_str(name)?;
            need_sep = true;
        }

        let unknown = *self & !Self::ALL;
        if !unknown.is_empty() {
            if need_sep {
                f.write_str("|")?;
            }
            write!(f, "{:#x}", unknown.0)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Bits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Bits({self})")
    }
}
