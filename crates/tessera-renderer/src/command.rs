//! Command recording
//!
//! The paging core never talks to a GPU directly. Each frame phase records
//! its work into a [`CommandBuffer`] that is handed to a [`RenderBackend`],
//! which executes buffers in submission order.

use glam::{IVec2, Mat4, UVec2, Vec4};
use smallvec::SmallVec;

use crate::page_table_pass::PageTableInstance;
use crate::texture::{TextureDesc, VirtualTextureParams};

/// Handle to a texture owned by the render backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureHandle(pub u32);

/// Surface textures bound for one terrain layer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayerBinding {
    pub albedo: TextureHandle,
    pub normal: TextureHandle,
    /// Layer tiling scale (xy) and offset (zw) for the drawn region
    pub tile_offset: Vec4,
}

/// A recorded command
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Bind the virtual texture's shading parameters
    SetVirtualTextureParams(VirtualTextureParams),
    /// Bind color targets for following draws
    SetRenderTarget {
        colors: SmallVec<[TextureHandle; 2]>,
    },
    /// Instanced quad draw into the page table, one instance per page
    DrawPageTable {
        instances: Vec<PageTableInstance>,
    },
    /// Draw one splat map's worth of terrain layers into a physical tile
    DrawTile {
        transform: Mat4,
        /// Shader pass, 0 for the first four layers of a terrain
        pass: u32,
        splat: TextureHandle,
        splat_scale_offset: Vec4,
        layers: SmallVec<[LayerBinding; 4]>,
    },
    /// Compute dispatch
    Dispatch {
        kernel: &'static str,
        keyword: &'static str,
        src: TextureHandle,
        src_origin: IVec2,
        dst: TextureHandle,
        size: u32,
        groups: [u32; 3],
    },
    /// Texel copy between textures
    CopyTexture {
        src: TextureHandle,
        src_origin: IVec2,
        dst: TextureHandle,
        dst_origin: IVec2,
        size: UVec2,
    },
}

/// Ordered list of commands for one submission
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommandBuffer {
    name: String,
    commands: Vec<Command>,
}

impl CommandBuffer {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            commands: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn push(&mut self, command: Command) {
        self.commands.push(command);
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn clear(&mut self) {
        self.commands.clear();
    }
}

/// Rasterization and compute backend
pub trait RenderBackend {
    /// Allocate a texture
    fn create_texture(&mut self, desc: &TextureDesc) -> TextureHandle;

    /// Release a texture created by this backend
    fn release_texture(&mut self, texture: TextureHandle);

    /// Execute a command buffer. Buffers run in submission order.
    fn execute(&mut self, buffer: &CommandBuffer);
}

/// Backend that only records what it was asked to do
#[derive(Debug, Default)]
pub struct RecordingBackend {
    textures: Vec<Option<TextureDesc>>,
    executed: Vec<CommandBuffer>,
    total_commands: u64,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Description of a live texture
    pub fn texture(&self, texture: TextureHandle) -> Option<&TextureDesc> {
        self.textures.get(texture.0 as usize).and_then(Option::as_ref)
    }

    pub fn live_textures(&self) -> usize {
        self.textures.iter().filter(|t| t.is_some()).count()
    }

    /// Buffers executed since the last drain
    pub fn executed(&self) -> &[CommandBuffer] {
        &self.executed
    }

    pub fn drain(&mut self) -> Vec<CommandBuffer> {
        std::mem::take(&mut self.executed)
    }

    /// Commands executed over the backend's lifetime
    pub fn total_commands(&self) -> u64 {
        self.total_commands
    }
}

impl RenderBackend for RecordingBackend {
    fn create_texture(&mut self, desc: &TextureDesc) -> TextureHandle {
        self.textures.push(Some(desc.clone()));
        TextureHandle(self.textures.len() as u32 - 1)
    }

    fn release_texture(&mut self, texture: TextureHandle) {
        if let Some(slot) = self.textures.get_mut(texture.0 as usize) {
            *slot = None;
        }
    }

    fn execute(&mut self, buffer: &CommandBuffer) {
        self.total_commands += buffer.len() as u64;
        self.executed.push(buffer.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_buffer() {
        let mut cmd = CommandBuffer::new("Test");
        assert!(cmd.is_empty());

        cmd.push(Command::SetRenderTarget {
            colors: SmallVec::from_slice(&[TextureHandle(0)]),
        });
        assert_eq!(cmd.len(), 1);
        assert_eq!(cmd.name(), "Test");

        cmd.clear();
        assert!(cmd.is_empty());
    }

    #[test]
    fn test_recording_backend() {
        let mut backend = RecordingBackend::new();
        let desc = TextureDesc::page_table(64);

        let a = backend.create_texture(&desc);
        let b = backend.create_texture(&desc);
        assert_ne!(a, b);
        assert_eq!(backend.live_textures(), 2);

        backend.release_texture(a);
        assert!(backend.texture(a).is_none());
        assert_eq!(backend.texture(b).unwrap().width, 64);

        let mut cmd = CommandBuffer::new("Copy");
        cmd.push(Command::CopyTexture {
            src: a,
            src_origin: IVec2::ZERO,
            dst: b,
            dst_origin: IVec2::ZERO,
            size: UVec2::ONE,
        });
        backend.execute(&cmd);
        assert_eq!(backend.executed().len(), 1);
        assert_eq!(backend.total_commands(), 1);
        assert_eq!(backend.drain().len(), 1);
        assert!(backend.executed().is_empty());
    }
}
