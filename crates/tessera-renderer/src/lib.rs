//! # Tessera Renderer
//!
//! Per-frame driver of the virtual texture paging core.
//!
//! ## Features
//! - Command recording handed to an external render backend
//! - Page table (indirection texture) composition, coarse to fine
//! - Budgeted servicing of page requests with LRU eviction
//! - Terrain splat tile production into the physical cache
//! - Real-time block compression of produced tiles

pub mod command;
pub mod compress;
pub mod page_table_pass;
pub mod scheduler;
pub mod texture;
pub mod tile_renderer;
pub mod virtual_texture;

pub use command::{Command, CommandBuffer, RecordingBackend, RenderBackend, TextureHandle};
pub use compress::{BlockFormat, TileCompressor};
pub use page_table_pass::{PageDrawInfo, PageTableInstance};
pub use scheduler::{Activation, DrainReport, PageScheduler, SlotEvent};
pub use texture::{PhysicalTextures, TextureDesc, VirtualTextureParams};
pub use tile_renderer::{SplatTileRenderer, TerrainLayer, TerrainSource, TileRenderRequest, TileRenderer};
pub use virtual_texture::{FrameReport, VirtualTexture};

use tessera_core::CoreError;
use thiserror::Error;

/// Renderer errors
#[derive(Error, Debug)]
pub enum RendererError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Tile compression unavailable: {0}")]
    Compression(String),
}

/// Result type for renderer operations
pub type RendererResult<T> = Result<T, RendererError>;

/// Renderer statistics, accumulated over the lifetime of a virtual texture
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RendererStats {
    /// Frames run
    pub frames: u64,
    /// Page table instances drawn
    pub page_table_draws: u64,
    /// Requests turned into resident pages
    pub pages_serviced: u64,
    /// Stale, cancelled or null requests dropped
    pub requests_discarded: u64,
    /// Resident pages evicted to make room
    pub evictions: u64,
    /// Tiles run through the block compressor
    pub tiles_compressed: u64,
}

impl RendererStats {
    pub fn record(&mut self, report: &FrameReport) {
        self.frames += 1;
        self.page_table_draws += report.page_table_draws as u64;
        self.pages_serviced += report.drain.serviced as u64;
        self.requests_discarded += report.drain.discarded as u64;
        self.evictions += report.drain.evicted as u64;
        self.tiles_compressed += report.compressed as u64;
    }
}
