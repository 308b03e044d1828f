// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! A small, dependency-free bitflags macro for fixed-layout flag sets.

/// Declares a flag set backed by an integer.
///
/// The generated type is `Copy`, comparable, supports the usual bitwise operators,
/// and can be stored verbatim in fixed-layout asset records through `bits()` and
/// `from_bits_truncate()`.
#[macro_export]
macro_rules! lumen_bitflags {
    (
        $(#[$attr:meta])*
        $vis:vis struct $name:ident: $ty:ty {
            $(
                $(#[$flag_attr:meta])*
                const $flag_name:ident = $flag_value:expr;
            )*
        }
    ) => {
        $(#[$attr])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
        $vis struct $name {
            bits: $ty,
        }

        impl $name {
            /// An empty set of flags.
            pub const EMPTY: Self = Self { bits: 0 };

            $(
                $(#[$flag_attr])*
                pub const $flag_name: Self = Self { bits: $flag_value };
            )*

            /// Creates a flag set from raw bits, keeping unknown bits.
            pub const fn from_bits_truncate(bits: $ty) -> Self {
                Self { bits }
            }

            /// Returns the raw bits.
            pub const fn bits(&self) -> $ty {
                self.bits
            }

            /// Returns `true` if all flags in `other` are set.
            pub const fn contains(&self, other: Self) -> bool {
                (self.bits & other.bits) == other.bits
            }

            /// Returns `true` if any flag in `other` is set.
            pub const fn intersects(&self, other: Self) -> bool {
                (self.bits & other.bits) != 0
            }

            /// Returns `true` if no flag is set.
            pub const fn is_empty(&self) -> bool {
                self.bits == 0
            }

            /// Sets the flags in `other`.
            pub fn insert(&mut self, other: Self) {
                self.bits |= other.bits;
            }

            /// Clears the flags in `other`.
            pub fn remove(&mut self, other: Self) {
                self.bits &= !other.bits;
            }
        }

        impl core::ops::BitOr for $name {
            type Output = Self;
            fn bitor(self, other: Self) -> Self {
                Self { bits: self.bits | other.bits }
            }
        }

        impl core::ops::BitAnd for $name {
            type Output = Self;
            fn bitand(self, other: Self) -> Self {
                Self { bits: self.bits & other.bits }
            }
        }

        impl core::ops::BitOrAssign for $name {
            fn bitor_assign(&mut self, other: Self) {
                self.bits |= other.bits;
            }
        }

        impl core::ops::Not for $name {
            type Output = Self;
            fn not(self) -> Self {
                Self { bits: !self.bits }
            }
        }

        impl core::fmt::Debug for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                let mut bits = self.bits;
                let mut first_flag = true;
                write!(f, "{} {{ ", stringify!($name))?;
                $(
                    if ($flag_value != 0) && (bits & $flag_value) == $flag_value {
                        if !first_flag {
                            write!(f, " | ")?;
                        }
                        write!(f, "{}", stringify!($flag_name))?;
                        bits &= !$flag_value;
                        first_flag = false;
                    }
                )*
                if bits != 0 {
                    if !first_flag {
                        write!(f, " | ")?;
                    }
                    write!(f, "UNKNOWN({:#x})", bits)?;
                    first_flag = false;
                }
                if first_flag {
                    write!(f, "EMPTY")?;
                }
                write!(f, " }}")
            }
        }
    };
}

#[cfg(test)]
mod tests {
    crate::lumen_bitflags! {
        struct TestFlags: u32 {
            const A = 1 << 0;
            const B = 1 << 1;
            const C = 1 << 2;
        }
    }

    #[test]
    fn operators_and_queries() {
        let ab = TestFlags::A | TestFlags::B;
        assert!(ab.contains(TestFlags::A));
        assert!(!ab.contains(TestFlags::C));
        assert!(ab.intersects(TestFlags::B | TestFlags::C));
        assert_eq!((ab & TestFlags::B), TestFlags::B);
        assert!(TestFlags::EMPTY.is_empty());
        assert_eq!(TestFlags::from_bits_truncate(ab.bits()), ab);
    }

    #[test]
    fn debug_lists_flags() {
        assert_eq!(format!("{:?}", TestFlags::A | TestFlags::C), "TestFlags { A | C }");
        assert_eq!(format!("{:?}", TestFlags::EMPTY), "TestFlags { EMPTY }");
        assert_eq!(
            format!("{:?}", TestFlags::from_bits_truncate(0b1001)),
            "TestFlags { A | UNKNOWN(0x8) }"
        );
    }
}
