//! Virtual texture context
//!
//! Owns everything one virtual texture needs: configuration, page tables,
//! tile cache, scheduler, backend textures and the optional compressor.

use tessera_core::{PageProducer, PageRequestInfo, TileCache, VirtualTextureConfig};

use crate::command::{Command, CommandBuffer, RenderBackend};
use crate::compress::{BlockFormat, TileCompressor};
use crate::scheduler::{Activation, DrainReport, PageScheduler};
use crate::texture::{PhysicalTextures, VirtualTextureParams};
use crate::tile_renderer::TileRenderer;
use crate::{RendererResult, RendererStats};

/// What one frame did
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameReport {
    pub frame: u64,
    pub page_table_draws: usize,
    pub drain: DrainReport,
    /// Tiles run through the block compressor
    pub compressed: usize,
}

#[derive(Debug)]
pub struct VirtualTexture {
    config: VirtualTextureConfig,
    scheduler: PageScheduler,
    producer: PageProducer,
    cache: TileCache,
    textures: PhysicalTextures,
    compressor: Option<TileCompressor>,
    stats: RendererStats,
    frame: u64,
}

impl VirtualTexture {
    /// Validate `config`, allocate the backend textures and bind the shading
    /// parameters
    pub fn new(
        config: VirtualTextureConfig,
        backend: &mut dyn RenderBackend,
        compression: Option<BlockFormat>,
    ) -> RendererResult<Self> {
        config.validate()?;
        let cache = TileCache::new(config.tile_capacity())?;
        let textures = PhysicalTextures::create(&config, backend, compression);

        let compressor = match (compression, textures.compressed) {
            (Some(format), Some(compressed)) => {
                match TileCompressor::new(format, config.tile_size_padding(), compressed.block_target) {
                    Ok(compressor) => Some(compressor),
                    Err(err) => {
                        textures.release(backend);
                        return Err(err);
                    }
                }
            }
            _ => None,
        };

        let mut cmd = CommandBuffer::new("SetVirtualTextureParams");
        cmd.push(Command::SetVirtualTextureParams(textures.params(&config)));
        backend.execute(&cmd);

        log::info!(
            "Virtual texture: {} mips, {} tiles of {} texels, physical {}x{}",
            config.num_mip(),
            config.tile_capacity(),
            config.tile_size_padding(),
            config.texture_size(),
            config.texture_size()
        );

        Ok(Self {
            scheduler: PageScheduler::new(&config),
            producer: PageProducer::new(config.page_size, config.num_mip()),
            config,
            cache,
            textures,
            compressor,
            stats: RendererStats::default(),
            frame: 0,
        })
    }

    pub fn config(&self) -> &VirtualTextureConfig {
        &self.config
    }

    pub fn producer(&self) -> &PageProducer {
        &self.producer
    }

    pub fn cache(&self) -> &TileCache {
        &self.cache
    }

    pub fn scheduler(&self) -> &PageScheduler {
        &self.scheduler
    }

    pub fn textures(&self) -> &PhysicalTextures {
        &self.textures
    }

    pub fn stats(&self) -> &RendererStats {
        &self.stats
    }

    pub fn params(&self) -> VirtualTextureParams {
        self.textures.params(&self.config)
    }

    /// Current frame number
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Advance to the next frame
    pub fn begin_frame(&mut self) -> u64 {
        self.frame += 1;
        self.frame
    }

    /// Report a page as visible this frame
    pub fn activate(&mut self, x: i32, y: i32, mip: u32) -> Activation {
        self.scheduler
            .activate(&mut self.producer, &mut self.cache, x, y, mip, self.frame)
    }

    pub fn request_page(&mut self, x: i32, y: i32, mip: u32) -> Option<PageRequestInfo> {
        self.scheduler.request_page(&mut self.producer, x, y, mip)
    }

    /// Record and execute this frame's page table update, request servicing
    /// and tile compression
    pub fn run_frame(&mut self, renderer: &mut dyn TileRenderer, backend: &mut dyn RenderBackend) -> FrameReport {
        let mut cmd = CommandBuffer::new("DrawPageTable");
        let page_table_draws =
            self.scheduler
                .draw_page_table(&self.producer, self.frame, self.textures.page_table, &mut cmd);
        if !cmd.is_empty() {
            backend.execute(&cmd);
        }

        let mut cmd = CommandBuffer::new("DrawPageColor");
        let drain = self.scheduler.draw_page_color(
            &mut self.producer,
            &mut self.cache,
            self.textures.color_targets(),
            renderer,
            &mut cmd,
        );
        if !cmd.is_empty() {
            backend.execute(&cmd);
        }

        let mut compressed = 0;
        if let (Some(compressor), Some(targets)) = (self.compressor, self.textures.compressed) {
            if !drain.produced.is_empty() {
                let mut cmd = CommandBuffer::new("CompressTiles");
                for tile in &drain.produced {
                    compressor.compress_tile(&mut cmd, self.textures.albedo, targets.albedo, tile.dest_rect);
                    compressor.compress_tile(&mut cmd, self.textures.normal, targets.normal, tile.dest_rect);
                }
                backend.execute(&cmd);
                compressed = drain.produced.len();
            }
        }

        debug_assert!(self.producer.check_consistency().is_ok());

        let report = FrameReport {
            frame: self.frame,
            page_table_draws,
            drain,
            compressed,
        };
        self.stats.record(&report);
        report
    }

    /// Drop all residency and pending requests
    pub fn reset(&mut self) {
        self.scheduler.reset();
        self.producer.reset();
        self.cache.reset();
        log::info!("Virtual texture reset");
    }

    /// Release the backend textures
    pub fn release(self, backend: &mut dyn RenderBackend) {
        self.textures.release(backend);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RendererError;
    use crate::command::RecordingBackend;
    use crate::tile_renderer::TileRenderRequest;
    use tessera_core::{CoreError, TileBorder};

    #[derive(Default)]
    struct CountingRenderer {
        tiles: usize,
    }

    impl TileRenderer for CountingRenderer {
        fn render_tile(&mut self, _cmd: &mut CommandBuffer, _tile: &TileRenderRequest, _pages: &PageProducer) {
            self.tiles += 1;
        }
    }

    fn config() -> VirtualTextureConfig {
        VirtualTextureConfig::default()
            .with_tile_num(2)
            .with_tile_size(60)
            .with_page_size(16)
            .with_request_budget(4)
    }

    fn names(backend: &RecordingBackend) -> Vec<&str> {
        backend.executed().iter().map(|b| b.name()).collect()
    }

    #[test]
    fn test_new_binds_params() {
        let mut backend = RecordingBackend::new();
        let vt = VirtualTexture::new(config(), &mut backend, None).unwrap();

        assert_eq!(names(&backend), vec!["SetVirtualTextureParams"]);
        assert_eq!(
            backend.executed()[0].commands()[0],
            Command::SetVirtualTextureParams(vt.params())
        );
        assert_eq!(vt.cache().capacity(), 4);
        assert_eq!(vt.producer().num_mip(), 5);
        assert_eq!(vt.frame(), 0);
    }

    #[test]
    fn test_invalid_config() {
        let mut backend = RecordingBackend::new();
        let result = VirtualTexture::new(config().with_page_size(100), &mut backend, None);
        assert!(matches!(result, Err(RendererError::Core(CoreError::InvalidConfig(_)))));
        assert_eq!(backend.live_textures(), 0);
    }

    #[test]
    fn test_unaligned_compression_releases_textures() {
        let mut backend = RecordingBackend::new();
        let config = config().with_tile_size(63).with_tile_border(TileBorder::X0);
        let result = VirtualTexture::new(config, &mut backend, Some(BlockFormat::Bc3));
        assert!(matches!(result, Err(RendererError::Compression(_))));
        assert_eq!(backend.live_textures(), 0);
    }

    #[test]
    fn test_frames() {
        let mut backend = RecordingBackend::new();
        let mut renderer = CountingRenderer::default();
        let mut vt = VirtualTexture::new(config(), &mut backend, None).unwrap();
        backend.drain();

        vt.begin_frame();
        assert_eq!(vt.activate(0, 0, 0), Activation::Queued);
        assert_eq!(vt.activate(8, 8, 3), Activation::Queued);
        let first = vt.run_frame(&mut renderer, &mut backend);
        assert_eq!(first.frame, 1);
        assert_eq!(first.page_table_draws, 0);
        assert_eq!(first.drain.serviced, 2);
        assert_eq!(renderer.tiles, 2);
        assert_eq!(names(&backend), vec!["DrawPageColor"]);
        backend.drain();

        vt.begin_frame();
        assert_eq!(vt.activate(0, 0, 0), Activation::Resident);
        assert_eq!(vt.activate(8, 8, 3), Activation::Resident);
        let second = vt.run_frame(&mut renderer, &mut backend);
        assert_eq!(second.page_table_draws, 2);
        assert_eq!(second.drain, DrainReport::default());
        assert_eq!(names(&backend), vec!["DrawPageTable"]);

        let stats = vt.stats();
        assert_eq!(stats.frames, 2);
        assert_eq!(stats.pages_serviced, 2);
        assert_eq!(stats.page_table_draws, 2);
    }

    #[test]
    fn test_compression_follows_production() {
        let mut backend = RecordingBackend::new();
        let mut renderer = CountingRenderer::default();
        let mut vt = VirtualTexture::new(config(), &mut backend, Some(BlockFormat::Bc3)).unwrap();
        backend.drain();

        vt.begin_frame();
        vt.request_page(0, 0, 0);
        vt.request_page(1, 0, 0);
        let report = vt.run_frame(&mut renderer, &mut backend);

        assert_eq!(report.compressed, 2);
        assert_eq!(names(&backend), vec!["DrawPageColor", "CompressTiles"]);
        // Dispatch and copy for both color targets of both tiles.
        assert_eq!(backend.executed()[1].len(), 8);
        assert_eq!(vt.stats().tiles_compressed, 2);
    }

    #[test]
    fn test_reset_and_release() {
        let mut backend = RecordingBackend::new();
        let mut renderer = CountingRenderer::default();
        let mut vt = VirtualTexture::new(config(), &mut backend, None).unwrap();

        vt.begin_frame();
        vt.activate(0, 0, 0);
        vt.activate(4, 0, 0);
        vt.run_frame(&mut renderer, &mut backend);
        assert_eq!(vt.producer().resident_count(), 2);

        vt.activate(8, 0, 0);
        vt.reset();
        assert_eq!(vt.producer().resident_count(), 0);
        assert!(vt.scheduler().queue().is_empty());

        vt.release(&mut backend);
        assert_eq!(backend.live_textures(), 0);
    }
}
