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

//! Recorded GPU commands.
//!
//! A [`CommandBuffer`] is a plain list of [`Command`]s recorded on the CPU and
//! handed to [`RenderBackend::submit`](crate::renderer::RenderBackend::submit) in
//! one go. Recording never touches the backend.

use super::ids::{
    FramebufferId, PipelineStateId, RootSignatureId, SamplerStateId, TextureBufferId, TextureId,
    UniformBufferId,
};

crate::lumen_bitflags! {
    /// Which attachments a clear command touches.
    pub struct ClearFlags: u32 {
        /// Color attachments.
        const COLOR = 1 << 0;
        /// Depth.
        const DEPTH = 1 << 1;
        /// Stencil.
        const STENCIL = 1 << 2;
    }
}

/// A resource bound through a root descriptor table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DescriptorResource {
    /// A uniform buffer.
    UniformBuffer(UniformBufferId),
    /// A texture buffer.
    TextureBuffer(TextureBufferId),
    /// A texture.
    Texture(TextureId),
    /// A sampler state.
    SamplerState(SamplerStateId),
}

/// A viewport rectangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    /// Left edge in pixels.
    pub top_left_x: f32,
    /// Top edge in pixels.
    pub top_left_y: f32,
    /// Width in pixels.
    pub width: f32,
    /// Height in pixels.
    pub height: f32,
}

/// One recorded command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Binds a root signature.
    SetGraphicsRootSignature(RootSignatureId),
    /// Binds a pipeline state object.
    SetPipelineState(PipelineStateId),
    /// Binds a resource to a root parameter.
    SetGraphicsRootDescriptorTable {
        /// The root parameter.
        root_parameter_index: u32,
        /// The bound resource.
        resource: DescriptorResource,
    },
    /// Selects the render target; `None` is the backend's main target.
    SetFramebuffer(Option<FramebufferId>),
    /// Sets the viewport.
    SetViewport(Viewport),
    /// Clears the bound render target.
    Clear {
        /// Attachments to clear.
        flags: ClearFlags,
        /// RGBA clear color.
        color: [f32; 4],
        /// Depth clear value.
        z: f32,
        /// Stencil clear value.
        stencil: u32,
    },
    /// Non-indexed draw call.
    Draw {
        /// Vertices per instance.
        vertex_count: u32,
        /// Number of instances.
        instance_count: u32,
        /// First vertex.
        start_vertex: u32,
    },
    /// Indexed draw call.
    DrawIndexed {
        /// Indices per instance.
        index_count: u32,
        /// Number of instances.
        instance_count: u32,
        /// First index.
        start_index: u32,
        /// Value added to every index.
        base_vertex: i32,
    },
    /// Uploads bytes into a uniform buffer.
    CopyUniformBufferData {
        /// Destination buffer.
        buffer: UniformBufferId,
        /// Bytes written at offset zero.
        data: Vec<u8>,
    },
    /// Uploads bytes into a texture buffer.
    CopyTextureBufferData {
        /// Destination buffer.
        buffer: TextureBufferId,
        /// Bytes written at offset zero.
        data: Vec<u8>,
    },
    /// Copies a whole texture into another of identical shape.
    CopyResource {
        /// Destination texture.
        destination: TextureId,
        /// Source texture.
        source: TextureId,
    },
    /// Opens a named debug region.
    BeginDebugEvent(String),
    /// Closes the innermost debug region.
    EndDebugEvent,
}

/// An ordered list of commands ready for submission.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommandBuffer {
    commands: Vec<Command>,
}

impl CommandBuffer {
    /// Creates an empty command buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a command.
    pub fn push(&mut self, command: Command) {
        self.commands.push(command);
    }

    /// The recorded commands.
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// Number of recorded commands.
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Returns `true` if nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Number of draw commands, indexed or not.
    pub fn number_of_draw_calls(&self) -> usize {
        self.commands
            .iter()
            .filter(|command| matches!(command, Command::Draw { .. } | Command::DrawIndexed { .. }))
            .count()
    }

    /// Removes every command, keeping the allocation.
    pub fn clear(&mut self) {
        self.commands.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_draw_calls() {
        let mut buffer = CommandBuffer::new();
        buffer.push(Command::SetPipelineState(PipelineStateId(1)));
        buffer.push(Command::Draw {
            vertex_count: 3,
            instance_count: 1,
            start_vertex: 0,
        });
        buffer.push(Command::DrawIndexed {
            index_count: 6,
            instance_count: 2,
            start_index: 0,
            base_vertex: 0,
        });
        assert_eq!(buffer.len(), 3);
        assert_eq!(buffer.number_of_draw_calls(), 2);
        buffer.clear();
        assert!(buffer.is_empty());
    }

    #[test]
    fn clear_flags_combine() {
        let flags = ClearFlags::COLOR | ClearFlags::DEPTH;
        assert!(flags.contains(ClearFlags::DEPTH));
        assert!(!flags.contains(ClearFlags::STENCIL));
    }
}
