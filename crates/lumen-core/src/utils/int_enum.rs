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

//! Integer-backed enums with checked conversion.

/// Declares a fieldless enum with explicit `i32` discriminants.
///
/// Generates `as_i32()` and a `TryFrom<i32>` implementation written as an
/// exhaustive `match`, so adding a variant can never silently shift a mapping.
/// The error of the conversion is the rejected raw value.
#[macro_export]
macro_rules! lumen_int_enum {
    (
        $(#[$attr:meta])*
        $vis:vis enum $name:ident {
            $(
                $(#[$variant_attr:meta])*
                $variant:ident = $value:literal,
            )*
        }
    ) => {
        $(#[$attr])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ::serde::Serialize, ::serde::Deserialize)]
        #[repr(i32)]
        $vis enum $name {
            $(
                $(#[$variant_attr])*
                $variant = $value,
            )*
        }

        impl $name {
            /// Returns the stable integer representation.
            #[inline]
            pub const fn as_i32(self) -> i32 {
                self as i32
            }

            /// Every variant, in declaration order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),*];
        }

        impl ::core::convert::TryFrom<i32> for $name {
            type Error = i32;

            fn try_from(value: i32) -> Result<Self, Self::Error> {
                match value {
                    $($value => Ok(Self::$variant),)*
                    other => Err(other),
                }
            }
        }

        impl $crate::hash::ContentHash for $name {
            fn content_hash(&self, hasher: &mut $crate::hash::ContentHasher) {
                hasher.write_i32(self.as_i32());
            }
        }
    };
}

#[cfg(test)]
mod tests {
    crate::lumen_int_enum! {
        enum Mode {
            First = 1,
            Second = 2,
        }
    }

    #[test]
    fn conversion_round_trips_and_rejects_unknown() {
        for mode in Mode::ALL {
            assert_eq!(Mode::try_from(mode.as_i32()), Ok(*mode));
        }
        assert_eq!(Mode::try_from(7), Err(7));
    }
}
