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

//! Shader blueprints and shader pieces: a header followed by the template text.

use super::{AssetFormat, BlobReader, BlobWriter, FormatError};

/// Serializes shader template text as a shader blueprint or shader piece asset.
pub fn write_shader_source(format: AssetFormat, source_code: &str) -> Vec<u8> {
    debug_assert!(matches!(
        format,
        AssetFormat::ShaderBlueprint | AssetFormat::ShaderPiece
    ));
    let mut writer = BlobWriter::new(format);
    writer.write_string(source_code);
    writer.finish()
}

/// Reads shader template text written by [`write_shader_source`].
pub fn read_shader_source(format: AssetFormat, bytes: &[u8]) -> Result<String, FormatError> {
    let mut reader = BlobReader::new(bytes);
    reader.read_header(format)?;
    reader.read_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pieces_are_not_blueprints() {
        let bytes = write_shader_source(AssetFormat::ShaderPiece, "float4 f() {}");
        assert_eq!(
            read_shader_source(AssetFormat::ShaderPiece, &bytes).unwrap(),
            "float4 f() {}"
        );
        assert!(matches!(
            read_shader_source(AssetFormat::ShaderBlueprint, &bytes),
            Err(FormatError::TypeMismatch { .. })
        ));
    }
}
