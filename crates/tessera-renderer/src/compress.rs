//! Tile compression
//!
//! Drives an external real-time block compression kernel over each freshly
//! produced tile, then copies the encoded blocks into the texture shading
//! samples from. The block format is fixed per platform family.

use glam::{IVec2, UVec2};
use tessera_core::math::RectI;

use crate::command::{Command, CommandBuffer, TextureHandle};
use crate::{RendererError, RendererResult};

const KERNEL: &str = "CompressTile";
const GROUP_SIZE: u32 = 8;

/// 4x4 block compressed target format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockFormat {
    /// BC3 / DXT5, desktop
    Bc3,
    /// ETC2 RGBA8, mobile
    Etc2,
}

impl BlockFormat {
    /// Format for the platform being compiled for
    pub fn for_platform() -> Self {
        if cfg!(any(target_os = "android", target_os = "ios")) {
            Self::Etc2
        } else {
            Self::Bc3
        }
    }

    pub fn texture_format(self) -> wgpu::TextureFormat {
        match self {
            Self::Bc3 => wgpu::TextureFormat::Bc3RgbaUnorm,
            Self::Etc2 => wgpu::TextureFormat::Etc2Rgba8Unorm,
        }
    }

    /// Device feature needed to sample this format
    pub fn required_features(self) -> wgpu::Features {
        match self {
            Self::Bc3 => wgpu::Features::TEXTURE_COMPRESSION_BC,
            Self::Etc2 => wgpu::Features::TEXTURE_COMPRESSION_ETC2,
        }
    }

    /// Kernel variant keyword
    pub fn keyword(self) -> &'static str {
        match self {
            Self::Bc3 => "_COMPRESS_BC3",
            Self::Etc2 => "_COMPRESS_ETC2",
        }
    }
}

/// Records compression of produced tiles
#[derive(Debug, Clone, Copy)]
pub struct TileCompressor {
    format: BlockFormat,
    tile_size: u32,
    block_target: TextureHandle,
}

impl TileCompressor {
    /// `tile_size` is the padded tile size and must be a whole number of blocks
    pub fn new(format: BlockFormat, tile_size: u32, block_target: TextureHandle) -> RendererResult<Self> {
        if tile_size == 0 || tile_size % 4 != 0 {
            return Err(RendererError::Compression(format!(
                "padded tile size {tile_size} is not a multiple of the 4 texel block size"
            )));
        }
        Ok(Self {
            format,
            tile_size,
            block_target,
        })
    }

    pub fn format(&self) -> BlockFormat {
        self.format
    }

    /// Blocks per tile side
    pub fn quad_size(&self) -> u32 {
        self.tile_size / 4
    }

    /// Dispatch size covering every block of a tile
    pub fn group_count(&self) -> [u32; 3] {
        let groups = self.quad_size().div_ceil(GROUP_SIZE);
        [groups, groups, 1]
    }

    /// Compress the tile at `tile` in `src` and place it at the same location in `dst`
    pub fn compress_tile(&self, cmd: &mut CommandBuffer, src: TextureHandle, dst: TextureHandle, tile: RectI) {
        cmd.push(Command::Dispatch {
            kernel: KERNEL,
            keyword: self.format.keyword(),
            src,
            src_origin: IVec2::new(tile.x, tile.y),
            dst: self.block_target,
            size: self.tile_size,
            groups: self.group_count(),
        });
        cmd.push(Command::CopyTexture {
            src: self.block_target,
            src_origin: IVec2::ZERO,
            dst,
            dst_origin: IVec2::new(tile.x, tile.y),
            size: UVec2::splat(self.quad_size()),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_format() {
        let format = BlockFormat::for_platform();
        #[cfg(not(any(target_os = "android", target_os = "ios")))]
        assert_eq!(format, BlockFormat::Bc3);
        assert_eq!(BlockFormat::Etc2.texture_format(), wgpu::TextureFormat::Etc2Rgba8Unorm);
        assert_eq!(BlockFormat::Bc3.keyword(), "_COMPRESS_BC3");
        assert_ne!(format.required_features(), wgpu::Features::empty());
    }

    #[test]
    fn test_rejects_unaligned_tiles() {
        assert!(TileCompressor::new(BlockFormat::Bc3, 258, TextureHandle(0)).is_err());
        assert!(TileCompressor::new(BlockFormat::Bc3, 0, TextureHandle(0)).is_err());
    }

    #[test]
    fn test_group_count() {
        let compressor = TileCompressor::new(BlockFormat::Bc3, 260, TextureHandle(0)).unwrap();
        assert_eq!(compressor.quad_size(), 65);
        assert_eq!(compressor.group_count(), [9, 9, 1]);
    }

    #[test]
    fn test_compress_records_dispatch_then_copy() {
        let block_target = TextureHandle(9);
        let compressor = TileCompressor::new(BlockFormat::Etc2, 64, block_target).unwrap();
        let mut cmd = CommandBuffer::new("Compress");

        compressor.compress_tile(&mut cmd, TextureHandle(1), TextureHandle(2), RectI::new(128, 64, 64, 64));

        assert_eq!(cmd.len(), 2);
        match &cmd.commands()[0] {
            Command::Dispatch { keyword, src_origin, dst, groups, .. } => {
                assert_eq!(*keyword, "_COMPRESS_ETC2");
                assert_eq!(*src_origin, IVec2::new(128, 64));
                assert_eq!(*dst, block_target);
                assert_eq!(*groups, [2, 2, 1]);
            }
            other => panic!("Expected dispatch, got {other:?}"),
        }
        match &cmd.commands()[1] {
            Command::CopyTexture { src, dst, dst_origin, size, .. } => {
                assert_eq!(*src, block_target);
                assert_eq!(*dst, TextureHandle(2));
                assert_eq!(*dst_origin, IVec2::new(128, 64));
                assert_eq!(*size, UVec2::splat(16));
            }
            other => panic!("Expected copy, got {other:?}"),
        }
    }
}
