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

//! Stable 64-bit identifiers and content hashing.
//!
//! Every identifier the runtime persists or exchanges with the asset toolkit
//! (asset ids, property ids, technique ids, cache keys) is derived with the same
//! XXH3 function, so an id computed at compile time by the toolkit always matches
//! the one computed at runtime. The hash is evaluated in `const` context, which
//! lets well-known property names become compile-time constants.

use serde::{Deserialize, Serialize};
use std::fmt;
use xxhash_rust::const_xxh3;
use xxhash_rust::xxh3::Xxh3;

/// Hashes a string into a stable 64-bit value. Usable in `const` context.
#[inline]
pub const fn hash_str(value: &str) -> u64 {
    const_xxh3::xxh3_64(value.as_bytes())
}

/// Hashes a byte slice into a stable 64-bit value.
#[inline]
pub fn hash_bytes(bytes: &[u8]) -> u64 {
    xxhash_rust::xxh3::xxh3_64(bytes)
}

/// Declares a hashed string identifier newtype.
///
/// The generated type wraps a `u64`, can be built from a name at compile time via
/// `from_name`, and from a raw value via `from_raw`.
#[macro_export]
macro_rules! lumen_string_id {
    ($(#[$outer:meta])* $vis:vis struct $name:ident;) => {
        $(#[$outer])*
        #[derive(
            Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
            ::serde::Serialize, ::serde::Deserialize,
        )]
        #[serde(transparent)]
        $vis struct $name(u64);

        impl $name {
            /// Hashes the given name into an identifier.
            #[inline]
            pub const fn from_name(name: &str) -> Self {
                Self($crate::hash::hash_str(name))
            }

            /// Wraps an already hashed value.
            #[inline]
            pub const fn from_raw(value: u64) -> Self {
                Self(value)
            }

            /// Returns the raw hashed value.
            #[inline]
            pub const fn value(self) -> u64 {
                self.0
            }
        }

        impl ::std::fmt::Debug for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                write!(f, "{}({:#018x})", stringify!($name), self.0)
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                write!(f, "{:#018x}", self.0)
            }
        }
    };
}

lumen_string_id! {
    /// Identifier of a material or shader property, hashed from its name.
    pub struct PropertyId;
}

lumen_string_id! {
    /// Identifier of a material technique (for example `"Forward"` or `"ShadowMap"`).
    pub struct MaterialTechniqueId;
}

/// A streaming hasher producing stable 64-bit content keys.
///
/// Used to build composite keys (pipeline signatures, shader combinations,
/// render target signatures) from several fields in a fixed order.
pub struct ContentHasher {
    state: Xxh3,
}

impl ContentHasher {
    /// Creates a hasher with an empty state.
    pub fn new() -> Self {
        Self { state: Xxh3::new() }
    }

    /// Feeds raw bytes.
    pub fn write_bytes(&mut self, bytes: &[u8]) -> &mut Self {
        self.state.update(bytes);
        self
    }

    /// Feeds a `u64` in little-endian order.
    pub fn write_u64(&mut self, value: u64) -> &mut Self {
        self.write_bytes(&value.to_le_bytes())
    }

    /// Feeds a `u32` in little-endian order.
    pub fn write_u32(&mut self, value: u32) -> &mut Self {
        self.write_bytes(&value.to_le_bytes())
    }

    /// Feeds an `i32` in little-endian order.
    pub fn write_i32(&mut self, value: i32) -> &mut Self {
        self.write_bytes(&value.to_le_bytes())
    }

    /// Feeds an `f32` by its bit pattern.
    pub fn write_f32(&mut self, value: f32) -> &mut Self {
        self.write_u32(value.to_bits())
    }

    /// Feeds a boolean as a single byte.
    pub fn write_bool(&mut self, value: bool) -> &mut Self {
        self.write_bytes(&[value as u8])
    }

    /// Feeds any value implementing [`ContentHash`].
    pub fn write<T: ContentHash + ?Sized>(&mut self, value: &T) -> &mut Self {
        value.content_hash(self);
        self
    }

    /// Returns the 64-bit digest of everything fed so far.
    pub fn finish(&self) -> u64 {
        self.state.digest()
    }
}

impl Default for ContentHasher {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ContentHasher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContentHasher")
            .field("digest", &self.finish())
            .finish()
    }
}

/// Types whose content can be fed into a [`ContentHasher`].
///
/// Unlike `std::hash::Hash`, implementations must be stable across processes and
/// platforms because the resulting keys are persisted to disk.
pub trait ContentHash {
    /// Feeds `self` into the hasher.
    fn content_hash(&self, hasher: &mut ContentHasher);
}

impl ContentHash for PropertyId {
    fn content_hash(&self, hasher: &mut ContentHasher) {
        hasher.write_u64(self.0);
    }
}

impl ContentHash for MaterialTechniqueId {
    fn content_hash(&self, hasher: &mut ContentHasher) {
        hasher.write_u64(self.0);
    }
}

/// Serializable wrapper used when a raw key is persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentKey(pub u64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_ids_are_const_and_stable() {
        const NORMAL_MAP: PropertyId = PropertyId::from_name("USE_NORMAL_MAP");
        assert_eq!(NORMAL_MAP, PropertyId::from_name("USE_NORMAL_MAP"));
        assert_eq!(NORMAL_MAP.value(), hash_bytes(b"USE_NORMAL_MAP"));
        assert_ne!(NORMAL_MAP, PropertyId::from_name("USE_ALPHA_MAP"));
    }

    #[test]
    fn content_hasher_is_order_sensitive() {
        let mut a = ContentHasher::new();
        a.write_u32(1).write_u32(2);
        let mut b = ContentHasher::new();
        b.write_u32(2).write_u32(1);
        assert_ne!(a.finish(), b.finish());

        let mut c = ContentHasher::new();
        c.write_u32(1).write_u32(2);
        assert_eq!(a.finish(), c.finish());
    }
}
