//! Virtual texture resources
//!
//! Physical tile pool textures, the page table texture, and the parameter set
//! the shading stage needs to sample them.

use glam::Vec4;
use tessera_core::VirtualTextureConfig;

use crate::command::{RenderBackend, TextureHandle};
use crate::compress::BlockFormat;

/// Texture description handed to the backend
#[derive(Debug, Clone, PartialEq)]
pub struct TextureDesc {
    pub name: &'static str,
    pub width: u32,
    pub height: u32,
    pub format: wgpu::TextureFormat,
    pub filter: wgpu::FilterMode,
    pub usage: wgpu::TextureUsages,
}

impl TextureDesc {
    /// Render target holding produced tiles
    pub fn physical(name: &'static str, size: u32) -> Self {
        Self {
            name,
            width: size,
            height: size,
            format: wgpu::TextureFormat::Rgba8Unorm,
            filter: wgpu::FilterMode::Linear,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_SRC,
        }
    }

    /// Indirection texture, one texel per finest-mip page
    pub fn page_table(page_size: u32) -> Self {
        Self {
            name: "PageTableTexture",
            width: page_size,
            height: page_size,
            format: wgpu::TextureFormat::Rgba8Unorm,
            filter: wgpu::FilterMode::Nearest,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
        }
    }

    /// Sampled input of tile production, such as a splat map or layer texture
    pub fn source(name: &'static str, size: u32) -> Self {
        Self {
            name,
            width: size,
            height: size,
            format: wgpu::TextureFormat::Rgba8Unorm,
            filter: wgpu::FilterMode::Linear,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        }
    }

    /// Block compressed copy of a physical texture
    pub fn compressed(name: &'static str, size: u32, format: BlockFormat) -> Self {
        Self {
            name,
            width: size,
            height: size,
            format: format.texture_format(),
            filter: wgpu::FilterMode::Linear,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        }
    }

    /// Compute output with one 128-bit texel per 4x4 block
    pub fn block_target(quad_size: u32) -> Self {
        Self {
            name: "CompressBlockTarget",
            width: quad_size,
            height: quad_size,
            format: wgpu::TextureFormat::Rgba32Uint,
            filter: wgpu::FilterMode::Nearest,
            usage: wgpu::TextureUsages::STORAGE_BINDING | wgpu::TextureUsages::COPY_SRC,
        }
    }
}

/// Shading parameters of a virtual texture
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VirtualTextureParams {
    /// x: page table size, y: its reciprocal, z: highest mip
    pub page_params: Vec4,
    /// x: tile border, y: tile size, zw: physical texture size
    pub tile_params: Vec4,
    pub albedo: TextureHandle,
    pub normal: TextureHandle,
    pub page_table: TextureHandle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressedTextures {
    pub albedo: TextureHandle,
    pub normal: TextureHandle,
    pub block_target: TextureHandle,
}

/// Textures owned by one virtual texture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhysicalTextures {
    pub albedo: TextureHandle,
    pub normal: TextureHandle,
    pub page_table: TextureHandle,
    pub compressed: Option<CompressedTextures>,
}

impl PhysicalTextures {
    pub fn create(
        config: &VirtualTextureConfig,
        backend: &mut dyn RenderBackend,
        compression: Option<BlockFormat>,
    ) -> Self {
        let size = config.texture_size();
        let albedo = backend.create_texture(&TextureDesc::physical("PhysicalTextureA", size));
        let normal = backend.create_texture(&TextureDesc::physical("PhysicalTextureB", size));
        let page_table = backend.create_texture(&TextureDesc::page_table(config.page_size));

        let compressed = compression.map(|format| CompressedTextures {
            albedo: backend.create_texture(&TextureDesc::compressed("CompressedTextureA", size, format)),
            normal: backend.create_texture(&TextureDesc::compressed("CompressedTextureB", size, format)),
            block_target: backend.create_texture(&TextureDesc::block_target(config.quad_tile_size_padding())),
        });

        Self {
            albedo,
            normal,
            page_table,
            compressed,
        }
    }

    /// Render targets tiles are produced into
    pub fn color_targets(&self) -> [TextureHandle; 2] {
        [self.albedo, self.normal]
    }

    /// Parameters for shading, pointing at the compressed copies when present
    pub fn params(&self, config: &VirtualTextureConfig) -> VirtualTextureParams {
        let page_size = config.page_size as f32;
        let texture_size = config.texture_size() as f32;
        let (albedo, normal) = match self.compressed {
            Some(compressed) => (compressed.albedo, compressed.normal),
            None => (self.albedo, self.normal),
        };

        VirtualTextureParams {
            page_params: Vec4::new(page_size, 1.0 / page_size, (config.num_mip() - 1) as f32, 0.0),
            tile_params: Vec4::new(
                config.tile_border.texels() as f32,
                config.tile_size as f32,
                texture_size,
                texture_size,
            ),
            albedo,
            normal,
            page_table: self.page_table,
        }
    }

    pub fn release(&self, backend: &mut dyn RenderBackend) {
        backend.release_texture(self.albedo);
        backend.release_texture(self.normal);
        backend.release_texture(self.page_table);
        if let Some(compressed) = self.compressed {
            backend.release_texture(compressed.albedo);
            backend.release_texture(compressed.normal);
            backend.release_texture(compressed.block_target);
        }
    }
}
