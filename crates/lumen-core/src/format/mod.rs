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

//! Fixed-layout binary asset formats shared by the toolkit and the runtime.
//!
//! Every compiled asset starts with a [`FileHeader`] carrying magic bytes, the
//! [`AssetFormat`] type tag and a format version. Loaders call
//! [`BlobReader::read_header`] before anything else; a mismatch aborts the load
//! instead of attempting a best-effort parse. The body is a sequence of
//! little-endian `#[repr(C)]` records read in declaration order.

mod compositor_node;
mod material;
mod material_blueprint;
mod scene;
mod shader;

pub use compositor_node::*;
pub use material::*;
pub use material_blueprint::*;
pub use scene::*;
pub use shader::*;

use bytemuck::{Pod, Zeroable};
use thiserror::Error;

/// Magic bytes opening every compiled asset. ("LUMN")
pub const HEADER_MAGIC_BYTES: [u8; 4] = *b"LUMN";

crate::lumen_int_enum! {
    /// The kind of a compiled asset.
    pub enum AssetFormat {
        /// A reusable shader source fragment.
        ShaderPiece = 1,
        /// A shader template with combination directives.
        ShaderBlueprint = 2,
        /// A material blueprint.
        MaterialBlueprint = 3,
        /// A material.
        Material = 4,
        /// A compositor node.
        CompositorNode = 5,
        /// A scene.
        Scene = 6,
    }
}

impl AssetFormat {
    /// The current version of the format.
    pub const fn version(self) -> u32 {
        match self {
            AssetFormat::ShaderPiece => 1,
            AssetFormat::ShaderBlueprint => 1,
            AssetFormat::MaterialBlueprint => 3,
            AssetFormat::Material => 2,
            AssetFormat::CompositorNode => 2,
            AssetFormat::Scene => 1,
        }
    }
}

/// The header opening every compiled asset.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct FileHeader {
    /// Must equal [`HEADER_MAGIC_BYTES`].
    pub magic: [u8; 4],
    /// An [`AssetFormat`] value.
    pub format_type: u32,
    /// The format version the file was written with.
    pub format_version: u32,
    /// Reserved, zero.
    pub reserved: u32,
}

impl FileHeader {
    /// The header of a file in the current version of `format`.
    pub const fn new(format: AssetFormat) -> Self {
        Self {
            magic: HEADER_MAGIC_BYTES,
            format_type: format.as_i32() as u32,
            format_version: format.version(),
            reserved: 0,
        }
    }
}

/// Errors raised while reading a compiled asset.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FormatError {
    /// The data ended before a record could be read.
    #[error("unexpected end of data: needed {needed} bytes at offset {offset}, {remaining} remaining")]
    UnexpectedEof {
        /// Bytes requested.
        needed: usize,
        /// Read position.
        offset: usize,
        /// Bytes left.
        remaining: usize,
    },
    /// The file does not start with the magic bytes.
    #[error("invalid magic bytes {0:?}; not a compiled asset")]
    InvalidMagic([u8; 4]),
    /// The file holds another kind of asset.
    #[error("asset type mismatch: expected {expected:?}, found type tag {found}")]
    TypeMismatch {
        /// The expected kind.
        expected: AssetFormat,
        /// The raw tag found.
        found: u32,
    },
    /// The file was written with another format version.
    #[error("format version mismatch for {format:?}: expected {expected}, found {found}")]
    VersionMismatch {
        /// The kind of asset.
        format: AssetFormat,
        /// The supported version.
        expected: u32,
        /// The version found.
        found: u32,
    },
    /// A field holds a value outside of its domain.
    #[error("invalid value {value} for field '{field}'")]
    InvalidValue {
        /// The field name.
        field: &'static str,
        /// The raw value.
        value: i64,
    },
    /// A string is not valid UTF-8.
    #[error("string at offset {offset} is not valid UTF-8")]
    InvalidUtf8 {
        /// Offset of the string bytes.
        offset: usize,
    },
}

/// Reads records front to back from a byte slice.
#[derive(Debug, Clone)]
pub struct BlobReader<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> BlobReader<'a> {
    /// Starts reading at the beginning of `bytes`.
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, offset: 0 }
    }

    /// Current read position.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Bytes left to read.
    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.offset
    }

    /// Reads `count` raw bytes.
    pub fn read_bytes(&mut self, count: usize) -> Result<&'a [u8], FormatError> {
        if count > self.remaining() {
            return Err(FormatError::UnexpectedEof {
                needed: count,
                offset: self.offset,
                remaining: self.remaining(),
            });
        }
        let slice = &self.bytes[self.offset..self.offset + count];
        self.offset += count;
        Ok(slice)
    }

    /// Skips `count` bytes.
    pub fn skip(&mut self, count: usize) -> Result<(), FormatError> {
        self.read_bytes(count).map(|_| ())
    }

    /// Reads one record. The source does not need to be aligned.
    pub fn read_pod<T: Pod>(&mut self) -> Result<T, FormatError> {
        let bytes = self.read_bytes(std::mem::size_of::<T>())?;
        Ok(bytemuck::pod_read_unaligned(bytes))
    }

    /// Reads `count` consecutive records.
    pub fn read_pod_vec<T: Pod>(&mut self, count: usize) -> Result<Vec<T>, FormatError> {
        let size = std::mem::size_of::<T>();
        let needed = size.checked_mul(count).ok_or(FormatError::InvalidValue {
            field: "record count",
            value: count as i64,
        })?;
        let bytes = self.read_bytes(needed)?;
        Ok(bytes
            .chunks_exact(size)
            .map(bytemuck::pod_read_unaligned::<T>)
            .collect())
    }

    /// Reads a `u32` length followed by UTF-8 bytes.
    pub fn read_string(&mut self) -> Result<String, FormatError> {
        let length = self.read_pod::<u32>()? as usize;
        let offset = self.offset;
        let bytes = self.read_bytes(length)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| FormatError::InvalidUtf8 { offset })
    }

    /// Reads and checks the file header. Must be the first read of a file.
    pub fn read_header(&mut self, expected: AssetFormat) -> Result<FileHeader, FormatError> {
        let header: FileHeader = self.read_pod()?;
        if header.magic != HEADER_MAGIC_BYTES {
            return Err(FormatError::InvalidMagic(header.magic));
        }
        if header.format_type != expected.as_i32() as u32 {
            return Err(FormatError::TypeMismatch {
                expected,
                found: header.format_type,
            });
        }
        if header.format_version != expected.version() {
            return Err(FormatError::VersionMismatch {
                format: expected,
                expected: expected.version(),
                found: header.format_version,
            });
        }
        Ok(header)
    }
}

/// Appends records to a growing byte vector.
#[derive(Debug, Clone, Default)]
pub struct BlobWriter {
    bytes: Vec<u8>,
}

impl BlobWriter {
    /// Starts a file of the given kind by writing its header.
    pub fn new(format: AssetFormat) -> Self {
        let mut writer = Self::default();
        writer.write_pod(&FileHeader::new(format));
        writer
    }

    /// Appends raw bytes.
    pub fn write_bytes(&mut self, bytes: &[u8]) -> &mut Self {
        self.bytes.extend_from_slice(bytes);
        self
    }

    /// Appends one record.
    pub fn write_pod<T: Pod>(&mut self, value: &T) -> &mut Self {
        self.write_bytes(bytemuck::bytes_of(value))
    }

    /// Appends consecutive records.
    pub fn write_pod_slice<T: Pod>(&mut self, values: &[T]) -> &mut Self {
        self.write_bytes(bytemuck::cast_slice(values))
    }

    /// Appends a `u32` length followed by the UTF-8 bytes.
    pub fn write_string(&mut self, value: &str) -> &mut Self {
        self.write_pod(&(value.len() as u32));
        self.write_bytes(value.as_bytes())
    }

    /// Number of bytes written so far.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns `true` if nothing was written.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Returns the written bytes.
    pub fn finish(self) -> Vec<u8> {
        self.bytes
    }
}

/// Copies `value` into a zero-padded fixed-size name field, truncating at `N` bytes.
pub fn encode_name<const N: usize>(value: &str) -> [u8; N] {
    let mut out = [0u8; N];
    let length = value.len().min(N);
    out[..length].copy_from_slice(&value.as_bytes()[..length]);
    out
}

/// Reads a zero-padded fixed-size name field.
pub fn decode_name(bytes: &[u8]) -> Result<String, FormatError> {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    std::str::from_utf8(&bytes[..end])
        .map(str::to_owned)
        .map_err(|_| FormatError::InvalidUtf8 { offset: 0 })
}

/// Converts a raw integer into an integer-backed enum, naming the field on failure.
pub fn decode_enum<T: TryFrom<i32, Error = i32>>(field: &'static str, raw: i32) -> Result<T, FormatError> {
    T::try_from(raw).map_err(|value| FormatError::InvalidValue {
        field,
        value: value as i64,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_is_checked_before_the_body() {
        let bytes = BlobWriter::new(AssetFormat::Scene).finish();
        assert!(BlobReader::new(&bytes).read_header(AssetFormat::Scene).is_ok());
        assert_eq!(
            BlobReader::new(&bytes).read_header(AssetFormat::Material),
            Err(FormatError::TypeMismatch {
                expected: AssetFormat::Material,
                found: AssetFormat::Scene.as_i32() as u32,
            })
        );

        let mut old = FileHeader::new(AssetFormat::Scene);
        old.format_version = 0;
        let bytes = bytemuck::bytes_of(&old).to_vec();
        assert!(matches!(
            BlobReader::new(&bytes).read_header(AssetFormat::Scene),
            Err(FormatError::VersionMismatch { found: 0, .. })
        ));

        assert!(matches!(
            BlobReader::new(b"NOPE0000000000000000").read_header(AssetFormat::Scene),
            Err(FormatError::InvalidMagic(_))
        ));
    }

    #[test]
    fn truncated_data_is_an_error() {
        let mut reader = BlobReader::new(&[1, 2, 3]);
        assert!(matches!(
            reader.read_pod::<u32>(),
            Err(FormatError::UnexpectedEof { needed: 4, remaining: 3, .. })
        ));
    }

    #[test]
    fn strings_and_names() {
        let mut writer = BlobWriter::default();
        writer.write_string("hello");
        let bytes = writer.finish();
        assert_eq!(BlobReader::new(&bytes).read_string().unwrap(), "hello");

        let field: [u8; 8] = encode_name("Position");
        assert_eq!(decode_name(&field).unwrap(), "Position");
        let field: [u8; 16] = encode_name("uv");
        assert_eq!(decode_name(&field).unwrap(), "uv");
    }
}
