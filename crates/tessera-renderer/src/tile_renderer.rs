//! Tile production
//!
//! A [`TileRenderer`] fills one physical slot with the content of one logical
//! page. [`SplatTileRenderer`] produces terrain pages by blending splat-mapped
//! surface layers of every terrain overlapping the page.

use glam::{IVec2, Mat4, Vec2, Vec4};
use smallvec::SmallVec;
use tessera_core::math::{Rect, RectI};
use tessera_core::{PageProducer, PageRequestInfo, TileBorder};

use crate::command::{Command, CommandBuffer, LayerBinding, TextureHandle};

/// Layers a single tile draw can blend
const LAYERS_PER_DRAW: usize = 4;

/// Everything a renderer needs to produce one page
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileRenderRequest {
    pub request: PageRequestInfo,
    /// Logical page area in page table pixels
    pub page_rect: RectI,
    /// Destination slot coordinate
    pub slot: IVec2,
    /// Destination area in physical texture texels, border included
    pub dest_rect: RectI,
    pub mip: u32,
    /// Page table pixels covered per page side, `2^mip`
    pub scale: u32,
}

impl TileRenderRequest {
    pub fn new(request: PageRequestInfo, page_rect: RectI, slot: IVec2, tile_size_padding: u32) -> Self {
        let padding = tile_size_padding as i32;
        Self {
            request,
            page_rect,
            slot,
            dest_rect: RectI::new(slot.x * padding, slot.y * padding, padding, padding),
            mip: request.mip,
            scale: 1 << request.mip,
        }
    }
}

/// Producer of physical tile content
pub trait TileRenderer {
    /// Record the commands producing `tile`. Color targets are already bound
    /// and the previous owner of the destination slot is no longer resident
    /// in `pages`.
    fn render_tile(&mut self, cmd: &mut CommandBuffer, tile: &TileRenderRequest, pages: &PageProducer);
}

/// One surface layer of a terrain
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TerrainLayer {
    pub albedo: TextureHandle,
    pub normal: TextureHandle,
    /// World size of one repetition of the layer textures
    pub tile_size: Vec2,
}

/// A terrain sampled when producing pages
#[derive(Debug, Clone, PartialEq)]
pub struct TerrainSource {
    /// World-space footprint (x, z)
    pub rect: Rect,
    /// Each splat map weights four consecutive layers
    pub splat_maps: Vec<TextureHandle>,
    pub layers: Vec<TerrainLayer>,
}

/// Produces terrain pages from splat maps and surface layers
#[derive(Debug, Clone)]
pub struct SplatTileRenderer {
    /// World area the whole page table covers
    volume_rect: Rect,
    page_size: u32,
    tile_size: u32,
    border: TileBorder,
    texture_size: u32,
    terrains: Vec<TerrainSource>,
}

impl SplatTileRenderer {
    pub fn new(volume_rect: Rect, page_size: u32, tile_size: u32, border: TileBorder, texture_size: u32) -> Self {
        Self {
            volume_rect,
            page_size,
            tile_size,
            border,
            texture_size,
            terrains: Vec::new(),
        }
    }

    pub fn add_terrain(&mut self, terrain: TerrainSource) {
        self.terrains.push(terrain);
    }

    pub fn terrains(&self) -> &[TerrainSource] {
        &self.terrains
    }

    /// World area a page covers, grown by the border so neighbouring tiles
    /// filter seamlessly
    pub fn world_rect(&self, page_rect: RectI, scale: u32) -> Rect {
        let table = self.page_size as f32;
        let texel_world = self.volume_rect.width / table;
        let padding = self.border.texels() as f32 * scale as f32 * texel_world / self.tile_size as f32;
        let size = texel_world * scale as f32 + 2.0 * padding;

        Rect::new(
            self.volume_rect.x + page_rect.x as f32 / table * self.volume_rect.width - padding,
            self.volume_rect.y + page_rect.y as f32 / table * self.volume_rect.height - padding,
            size,
            size,
        )
    }

    /// Orthographic transform of a physical texture region to clip space
    fn clip_transform(&self, position: Rect) -> Mat4 {
        let texture_size = self.texture_size as f32;
        let l = position.x * 2.0 / texture_size - 1.0;
        let r = (position.x + position.width) * 2.0 / texture_size - 1.0;
        let b = position.y * 2.0 / texture_size - 1.0;
        let t = (position.y + position.height) * 2.0 / texture_size - 1.0;

        Mat4::from_cols(
            Vec4::new(r - l, 0.0, 0.0, 0.0),
            Vec4::new(0.0, t - b, 0.0, 0.0),
            Vec4::ZERO,
            Vec4::new(l, b, -1.0, 1.0),
        )
    }

    fn draw_terrain(&self, cmd: &mut CommandBuffer, terrain: &TerrainSource, real: Rect, dest: Rect) {
        let Some(needed) = real.intersection(&terrain.rect) else {
            return;
        };
        let ter = terrain.rect;

        let scale_factor = dest.width / real.width;
        let position = Rect::new(
            dest.x + (needed.x - real.x) * scale_factor,
            dest.y + (needed.y - real.y) * scale_factor,
            needed.width * scale_factor,
            needed.height * scale_factor,
        );
        let scale_offset = Vec4::new(
            needed.width / ter.width,
            needed.height / ter.height,
            (needed.x - ter.x) / ter.width,
            (needed.y - ter.y) / ter.height,
        );
        let transform = self.clip_transform(position);

        let mut layer_index = 0;
        for &splat in &terrain.splat_maps {
            let mut layers = SmallVec::<[LayerBinding; LAYERS_PER_DRAW]>::new();
            while layer_index < terrain.layers.len() && layers.len() < LAYERS_PER_DRAW {
                let layer = &terrain.layers[layer_index];
                let tile_scale = ter.size() / layer.tile_size;
                layers.push(LayerBinding {
                    albedo: layer.albedo,
                    normal: layer.normal,
                    tile_offset: Vec4::new(
                        tile_scale.x * scale_offset.x,
                        tile_scale.y * scale_offset.y,
                        scale_offset.z * tile_scale.x,
                        scale_offset.w * tile_scale.y,
                    ),
                });
                layer_index += 1;
            }

            cmd.push(Command::DrawTile {
                transform,
                pass: if layer_index <= LAYERS_PER_DRAW { 0 } else { 1 },
                splat,
                splat_scale_offset: scale_offset,
                layers,
            });
        }
    }
}

impl TileRenderer for SplatTileRenderer {
    fn render_tile(&mut self, cmd: &mut CommandBuffer, tile: &TileRenderRequest, _pages: &PageProducer) {
        let real = self.world_rect(tile.page_rect, tile.scale);
        let dest = tile.dest_rect.as_rect();
        for terrain in &self.terrains {
            self.draw_terrain(cmd, terrain, real, dest);
        }
    }
}
