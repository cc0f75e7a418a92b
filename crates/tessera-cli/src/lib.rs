//! # Tessera CLI
//!
//! Command-line driver for the virtual texturing core.
//!
//! ## Commands
//! - `info` - Print a configuration and its derived parameters
//! - `simulate` - Sweep a camera over a terrain and report paging statistics

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tessera_core::math::{Rect, Vec2};
use tessera_core::{RequestPriority, TileBorder, VirtualTextureConfig};
use tessera_renderer::{
    BlockFormat, RecordingBackend, RenderBackend, RendererStats, SplatTileRenderer, TerrainLayer, TerrainSource,
    TextureDesc, VirtualTexture,
};

/// World units covered by the simulated page table
const WORLD_SIZE: f32 = 4096.0;

/// Half extent of the visible window, in cells of each mip
const VIEW_CELLS: i32 = 2;

/// Tessera virtual texturing CLI
#[derive(Parser)]
#[command(name = "tessera")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Virtual texture configuration (JSON)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Print the configuration and its derived parameters
    Info {
        #[command(flatten)]
        overrides: ConfigOverrides,
    },

    /// Run a camera sweep against a recording backend
    Simulate {
        /// Frames to run
        #[arg(short, long, default_value = "120")]
        frames: u64,

        /// Page table pixels the camera moves per frame
        #[arg(short, long, default_value = "0.5")]
        speed: f32,

        /// Block compress produced tiles
        #[arg(long)]
        compress: bool,

        /// Print the summary as JSON
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        overrides: ConfigOverrides,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BorderArg {
    X0,
    X1,
    X2,
    X4,
}

impl From<BorderArg> for TileBorder {
    fn from(border: BorderArg) -> Self {
        match border {
            BorderArg::X0 => TileBorder::X0,
            BorderArg::X1 => TileBorder::X1,
            BorderArg::X2 => TileBorder::X2,
            BorderArg::X4 => TileBorder::X4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PriorityArg {
    FineFirst,
    CoarseFirst,
}

impl From<PriorityArg> for RequestPriority {
    fn from(priority: PriorityArg) -> Self {
        match priority {
            PriorityArg::FineFirst => RequestPriority::FineFirst,
            PriorityArg::CoarseFirst => RequestPriority::CoarseFirst,
        }
    }
}

/// Command-line overrides of configuration fields
#[derive(Args, Debug, Clone, Default, PartialEq)]
pub struct ConfigOverrides {
    /// Physical tiles per side
    #[arg(long)]
    pub tile_num: Option<u32>,

    /// Tile size in texels, without border
    #[arg(long)]
    pub tile_size: Option<u32>,

    /// Border texels around each tile
    #[arg(long, value_enum)]
    pub border: Option<BorderArg>,

    /// Page table size in pixels
    #[arg(long)]
    pub page_size: Option<u32>,

    /// Requests serviced per frame
    #[arg(long)]
    pub budget: Option<usize>,

    /// Which pending requests go first
    #[arg(long, value_enum)]
    pub priority: Option<PriorityArg>,
}

impl ConfigOverrides {
    pub fn apply(&self, mut config: VirtualTextureConfig) -> VirtualTextureConfig {
        if let Some(tile_num) = self.tile_num {
            config = config.with_tile_num(tile_num);
        }
        if let Some(tile_size) = self.tile_size {
            config = config.with_tile_size(tile_size);
        }
        if let Some(border) = self.border {
            config = config.with_tile_border(border.into());
        }
        if let Some(page_size) = self.page_size {
            config = config.with_page_size(page_size);
        }
        if let Some(budget) = self.budget {
            config = config.with_request_budget(budget);
        }
        if let Some(priority) = self.priority {
            config = config.with_priority(priority.into());
        }
        config
    }
}

/// Read a configuration file, or the defaults when no path is given
pub fn load_config(path: Option<&Path>) -> Result<VirtualTextureConfig> {
    let Some(path) = path else {
        return Ok(VirtualTextureConfig::default());
    };
    let text = fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Failed to parse {}", path.display()))
}

/// A configuration with its derived parameters
#[derive(Debug, Serialize)]
pub struct ConfigInfo {
    pub tile_num: u32,
    pub tile_size: u32,
    pub tile_border: u32,
    pub page_size: u32,
    pub request_budget: usize,
    pub priority: RequestPriority,
    pub num_mip: u32,
    pub tile_size_padding: u32,
    pub quad_tile_size_padding: u32,
    pub texture_size: u32,
    pub tile_capacity: usize,
}

impl From<&VirtualTextureConfig> for ConfigInfo {
    fn from(config: &VirtualTextureConfig) -> Self {
        Self {
            tile_num: config.tile_num,
            tile_size: config.tile_size,
            tile_border: config.tile_border.texels(),
            page_size: config.page_size,
            request_budget: config.request_budget,
            priority: config.priority,
            num_mip: config.num_mip(),
            tile_size_padding: config.tile_size_padding(),
            quad_tile_size_padding: config.quad_tile_size_padding(),
            texture_size: config.texture_size(),
            tile_capacity: config.tile_capacity(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SimulationOptions {
    pub frames: u64,
    pub speed: f32,
    pub compress: bool,
}

/// Paging statistics of a finished simulation
#[derive(Debug, Clone, Serialize)]
pub struct SimulationSummary {
    pub frames: u64,
    pub page_table_draws: u64,
    pub pages_serviced: u64,
    pub requests_discarded: u64,
    pub evictions: u64,
    pub tiles_compressed: u64,
    pub resident_pages: usize,
    pub pending_requests: usize,
    pub commands_executed: u64,
}

impl SimulationSummary {
    fn new(stats: &RendererStats, vt: &VirtualTexture, backend: &RecordingBackend) -> Self {
        Self {
            frames: stats.frames,
            page_table_draws: stats.page_table_draws,
            pages_serviced: stats.pages_serviced,
            requests_discarded: stats.requests_discarded,
            evictions: stats.evictions,
            tiles_compressed: stats.tiles_compressed,
            resident_pages: vt.producer().resident_count(),
            pending_requests: vt.scheduler().queue().len(),
            commands_executed: backend.total_commands(),
        }
    }

    fn log(&self) {
        log::info!("Simulated {} frames", self.frames);
        log::info!("  Page table draws: {}", self.page_table_draws);
        log::info!("  Pages serviced: {}", self.pages_serviced);
        log::info!("  Requests discarded: {}", self.requests_discarded);
        log::info!("  Evictions: {}", self.evictions);
        log::info!("  Tiles compressed: {}", self.tiles_compressed);
        log::info!("  Resident pages: {}", self.resident_pages);
        log::info!("  Pending requests: {}", self.pending_requests);
        log::info!("  Commands executed: {}", self.commands_executed);
    }
}

/// Camera position in page table pixels on `frame`
pub fn camera_position(frame: u64, speed: f32, page_size: u32) -> Vec2 {
    let page_size = page_size as f32;
    Vec2::new((frame as f32 * speed).rem_euclid(page_size), page_size * 0.5)
}

/// Pages a camera at `center` needs, finest mip nearest to it. Each mip
/// covers a ring around the area of the next finer one.
pub fn visible_pages(center: Vec2, page_size: u32, num_mip: u32) -> Vec<(i32, i32, u32)> {
    let mut pages = Vec::new();
    for mip in 0..num_mip {
        let cell_size = 1i32 << mip;
        let cell = cell_size as f32;
        let col = (center.x / cell).floor() as i32;
        let row = (center.y / cell).floor() as i32;
        let inner = if mip == 0 { 0.0 } else { cell };

        for dy in -VIEW_CELLS..VIEW_CELLS {
            for dx in -VIEW_CELLS..VIEW_CELLS {
                let x = (col + dx) * cell_size;
                let y = (row + dy) * cell_size;
                let cell_center = Vec2::new(x as f32 + cell * 0.5, y as f32 + cell * 0.5);
                let distance = (cell_center - center).abs().max_element();
                if distance >= inner && distance < VIEW_CELLS as f32 * cell {
                    pages.push((x.rem_euclid(page_size as i32), y.rem_euclid(page_size as i32), mip));
                }
            }
        }
    }
    pages.sort_unstable();
    pages.dedup();
    pages
}

/// Two side by side terrains with six layers each
fn terrain_renderer(config: &VirtualTextureConfig, backend: &mut dyn RenderBackend) -> SplatTileRenderer {
    let mut renderer = SplatTileRenderer::new(
        Rect::new(0.0, 0.0, WORLD_SIZE, WORLD_SIZE),
        config.page_size,
        config.tile_size,
        config.tile_border,
        config.texture_size(),
    );

    let half = WORLD_SIZE * 0.5;
    for index in 0..2 {
        let splat_maps = (0..2)
            .map(|_| backend.create_texture(&TextureDesc::source("SplatMap", 1024)))
            .collect();
        let layers = (0..6)
            .map(|layer| TerrainLayer {
                albedo: backend.create_texture(&TextureDesc::source("LayerAlbedo", 512)),
                normal: backend.create_texture(&TextureDesc::source("LayerNormal", 512)),
                tile_size: Vec2::splat(16.0 * (layer + 1) as f32),
            })
            .collect();
        renderer.add_terrain(TerrainSource {
            rect: Rect::new(index as f32 * half, 0.0, half, WORLD_SIZE),
            splat_maps,
            layers,
        });
    }
    renderer
}

/// Sweep a camera across the page table for `options.frames` frames
pub fn simulate(config: VirtualTextureConfig, options: &SimulationOptions) -> Result<SimulationSummary> {
    let mut backend = RecordingBackend::new();
    let compression = options.compress.then(BlockFormat::for_platform);
    let mut vt = VirtualTexture::new(config, &mut backend, compression)?;
    let mut renderer = terrain_renderer(vt.config(), &mut backend);

    let page_size = vt.config().page_size;
    let num_mip = vt.config().num_mip();
    for _ in 0..options.frames {
        let frame = vt.begin_frame();
        let center = camera_position(frame, options.speed, page_size);
        for (x, y, mip) in visible_pages(center, page_size, num_mip) {
            vt.activate(x, y, mip);
        }
        vt.run_frame(&mut renderer, &mut backend);
        backend.drain();
    }

    vt.producer().check_consistency()?;
    let summary = SimulationSummary::new(vt.stats(), &vt, &backend);
    vt.release(&mut backend);
    Ok(summary)
}

/// Execute the CLI command
pub fn execute(cli: Cli) -> Result<()> {
    if cli.verbose {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    }

    let base = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Info { overrides } => {
            let config = overrides.apply(base);
            config.validate()?;
            println!("{}", serde_json::to_string_pretty(&ConfigInfo::from(&config))?);
        }

        Commands::Simulate {
            frames,
            speed,
            compress,
            json,
            overrides,
        } => {
            let config = overrides.apply(base);
            log::info!("Simulating {} frames...", frames);
            let summary = simulate(
                config,
                &SimulationOptions {
                    frames,
                    speed,
                    compress,
                },
            )?;
            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                summary.log();
            }
        }
    }

    Ok(())
}
