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

//! The on-disk pipeline state cache.
//!
//! Layout: a fixed [`CacheFileHeader`] followed by a bincode payload. The
//! header carries a format version, the backend the cache was written for and
//! a blake3 digest of the payload. Any mismatch discards the whole file.

use super::signature::PipelineStateSignature;
use crate::error::PersistenceError;
use crate::shader::ShaderBytecode;
use bytemuck::{Pod, Zeroable};
use lumen_core::renderer::api::GraphicsBackendType;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

/// Magic bytes of a pipeline state cache file.
pub const CACHE_FILE_MAGIC: [u8; 8] = *b"LUMNPSOC";

/// Bumped whenever the payload layout or the key derivation changes.
pub const CACHE_FILE_VERSION: u32 = 1;

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
struct CacheFileHeader {
    magic: [u8; 8],
    version: u32,
    backend: i32,
    payload_length: u64,
    digest: [u8; 32],
}

/// What a previous run knew: built signatures and compiled shaders.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineCacheSnapshot {
    /// Signatures of successfully built pipeline states.
    pub signatures: Vec<PipelineStateSignature>,
    /// Exported shader bytecode.
    pub shader_bytecode: Vec<ShaderBytecode>,
}

impl PipelineCacheSnapshot {
    /// Returns `true` if there is nothing to persist.
    pub fn is_empty(&self) -> bool {
        self.signatures.is_empty() && self.shader_bytecode.is_empty()
    }
}

/// Serializes a snapshot for `backend`.
pub fn encode(snapshot: &PipelineCacheSnapshot, backend: GraphicsBackendType) -> Result<Vec<u8>, PersistenceError> {
    let payload = bincode::serde::encode_to_vec(snapshot, bincode::config::standard())?;
    let header = CacheFileHeader {
        magic: CACHE_FILE_MAGIC,
        version: CACHE_FILE_VERSION,
        backend: backend.as_i32(),
        payload_length: payload.len() as u64,
        digest: *blake3::hash(&payload).as_bytes(),
    };
    let mut bytes = Vec::with_capacity(std::mem::size_of::<CacheFileHeader>() + payload.len());
    bytes.extend_from_slice(bytemuck::bytes_of(&header));
    bytes.extend_from_slice(&payload);
    Ok(bytes)
}

/// Deserializes a snapshot, checking magic, version, backend and digest first.
pub fn decode(bytes: &[u8], backend: GraphicsBackendType) -> Result<PipelineCacheSnapshot, PersistenceError> {
    let header_size = std::mem::size_of::<CacheFileHeader>();
    if bytes.len() < header_size {
        return Err(PersistenceError::InvalidHeader);
    }
    let header: CacheFileHeader = bytemuck::pod_read_unaligned(&bytes[..header_size]);
    if header.magic != CACHE_FILE_MAGIC {
        return Err(PersistenceError::InvalidHeader);
    }
    if header.version != CACHE_FILE_VERSION {
        return Err(PersistenceError::VersionMismatch {
            expected: CACHE_FILE_VERSION,
            found: header.version,
        });
    }
    if header.backend != backend.as_i32() {
        return Err(PersistenceError::BackendMismatch {
            expected: backend.as_i32(),
            found: header.backend,
        });
    }
    let payload = &bytes[header_size..];
    if payload.len() as u64 != header.payload_length || *blake3::hash(payload).as_bytes() != header.digest {
        return Err(PersistenceError::DigestMismatch);
    }
    let (snapshot, _) = bincode::serde::decode_from_slice(payload, bincode::config::standard())?;
    Ok(snapshot)
}

/// Writes a snapshot next to `path` and moves it into place.
pub fn save(path: &Path, snapshot: &PipelineCacheSnapshot, backend: GraphicsBackendType) -> Result<(), PersistenceError> {
    let bytes = encode(snapshot, backend)?;
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let staging = path.with_extension("tmp");
    fs::write(&staging, &bytes)?;
    fs::rename(&staging, path)?;
    log::info!(
        "Saved pipeline state cache '{}': {} signatures, {} shaders, {} bytes",
        path.display(),
        snapshot.signatures.len(),
        snapshot.shader_bytecode.len(),
        bytes.len()
    );
    Ok(())
}

/// Reads a snapshot. A missing file is `Ok(None)`; a file that does not match
/// the current version or backend, or is corrupted, is an error and must be
/// ignored as a whole by the caller.
pub fn load(path: &Path, backend: GraphicsBackendType) -> Result<Option<PipelineCacheSnapshot>, PersistenceError> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(error) if error.kind() == ErrorKind::NotFound => return Ok(None),
        Err(error) => return Err(error.into()),
    };
    decode(&bytes, backend).map(Some)
}
