//! Page Scheduler
//!
//! Per-frame driver of the paging core. Each frame the scheduler
//!
//! 1. paints every resident page reported visible this frame into the page
//!    table, coarse to fine;
//! 2. pops up to `request_budget` pending requests, evicting the least
//!    recently used slot for each live one and recording its production.
//!
//! Stale requests (superseded, cancelled, null pages or pages that became
//! resident meanwhile) are dropped at pop time. They still count as popped,
//! so the work of one frame stays bounded.

use glam::IVec2;
use smallvec::smallvec;
use tessera_core::lru::{slot_coord, slot_index};
use tessera_core::{
    PageKey, PageProducer, PageRequestInfo, RequestPriority, RequestQueue, TileCache, VirtualTextureConfig,
};

use crate::command::{Command, CommandBuffer, TextureHandle};
use crate::page_table_pass::{PageDrawInfo, build_draw_infos, build_instances};
use crate::tile_renderer::{TileRenderRequest, TileRenderer};

/// Outcome of reporting a page as visible
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    /// Page is resident; its slot was promoted
    Resident,
    /// A request was submitted
    Queued,
    /// A request for the page is already waiting
    Pending,
    /// Placeholder page, never produced
    Null,
}

/// Slot state change, in the order it happened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotEvent {
    /// The previous owner of the slot lost its residency
    Invalidated { slot: IVec2, key: PageKey },
    /// Production of `key` into the slot was recorded
    Rendered { slot: IVec2, key: PageKey },
    /// `key` became resident in the slot
    Bound { slot: IVec2, key: PageKey },
}

/// Result of one queue drain
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DrainReport {
    pub serviced: usize,
    pub discarded: usize,
    pub evicted: usize,
    /// Requests left in the queue for later frames
    pub deferred: usize,
    pub produced: Vec<TileRenderRequest>,
    pub events: Vec<SlotEvent>,
}

#[derive(Debug)]
pub struct PageScheduler {
    budget: usize,
    priority: RequestPriority,
    page_size: u32,
    num_mip: u32,
    tile_num: u32,
    tile_size_padding: u32,
    queue: RequestQueue,
    draw_infos: Vec<PageDrawInfo>,
}

impl PageScheduler {
    pub fn new(config: &VirtualTextureConfig) -> Self {
        Self {
            budget: config.request_budget,
            priority: config.priority,
            page_size: config.page_size,
            num_mip: config.num_mip(),
            tile_num: config.tile_num,
            tile_size_padding: config.tile_size_padding(),
            queue: RequestQueue::new(),
            draw_infos: Vec::new(),
        }
    }

    pub fn budget(&self) -> usize {
        self.budget
    }

    pub fn priority(&self) -> RequestPriority {
        self.priority
    }

    pub fn set_priority(&mut self, priority: RequestPriority) {
        self.priority = priority;
    }

    pub fn queue(&self) -> &RequestQueue {
        &self.queue
    }

    /// Draw list of the last page table pass
    pub fn draw_infos(&self) -> &[PageDrawInfo] {
        &self.draw_infos
    }

    /// Report the page at (x, y) on `mip` as needed on `frame`.
    ///
    /// The page is stamped active either way. A resident page has its slot
    /// promoted in the cache; a missing page is requested unless a request
    /// is already waiting. Other mips of the same coordinate are separate
    /// pages and keep their requests.
    pub fn activate(
        &mut self,
        producer: &mut PageProducer,
        cache: &mut TileCache,
        x: i32,
        y: i32,
        mip: u32,
        frame: u64,
    ) -> Activation {
        let mip = mip.min(self.num_mip - 1);
        let page = producer.page_mut(PageKey::new(x, y, mip));
        page.payload.active_frame = frame;

        if page.is_null {
            return Activation::Null;
        }
        if page.payload.is_ready() {
            cache.touch(slot_index(page.payload.slot, self.tile_num));
            return Activation::Resident;
        }
        if page.payload.is_loading() {
            return Activation::Pending;
        }

        self.queue.submit_page(producer, x, y, mip);
        Activation::Queued
    }

    /// Request production of the page at (x, y) on `mip`. Duplicates are
    /// accepted; the latest one wins, and it cancels a pending request made
    /// here for the same coordinate on another mip. Null and resident pages
    /// are skipped.
    pub fn request_page(&mut self, producer: &mut PageProducer, x: i32, y: i32, mip: u32) -> Option<PageRequestInfo> {
        let mip = mip.min(self.num_mip - 1);
        let page = producer.page(PageKey::new(x, y, mip));
        if page.is_null || page.payload.is_ready() {
            return None;
        }
        Some(self.queue.submit(producer, x, y, mip))
    }

    /// Record the page table update for `frame` into `target`. Returns the
    /// number of pages drawn; nothing is recorded when no page is active.
    pub fn draw_page_table(
        &mut self,
        producer: &PageProducer,
        frame: u64,
        target: TextureHandle,
        cmd: &mut CommandBuffer,
    ) -> usize {
        let _span = tracing::debug_span!("draw_page_table", frame).entered();

        build_draw_infos(producer, frame, &mut self.draw_infos);
        if self.draw_infos.is_empty() {
            return 0;
        }

        cmd.push(Command::SetRenderTarget {
            colors: smallvec![target],
        });
        cmd.push(Command::DrawPageTable {
            instances: build_instances(&self.draw_infos, self.page_size),
        });
        self.draw_infos.len()
    }

    /// Pop at most `budget` pending requests and service the live ones,
    /// recording tile production into `colors`
    pub fn draw_page_color(
        &mut self,
        producer: &mut PageProducer,
        cache: &mut TileCache,
        colors: [TextureHandle; 2],
        renderer: &mut dyn TileRenderer,
        cmd: &mut CommandBuffer,
    ) -> DrainReport {
        let mut report = DrainReport::default();
        if self.queue.is_empty() {
            return report;
        }

        let _span = tracing::debug_span!("draw_page_color", pending = self.queue.len()).entered();
        self.queue.sort(self.priority);

        let mut targets_bound = false;
        let mut popped = 0;
        while popped < self.budget {
            let Some(request) = self.queue.pop() else {
                break;
            };
            popped += 1;

            let page = producer.page(request.key());
            if page.is_null || page.payload.is_ready() || !page.payload.request.matches(&request) {
                log::trace!("discarding stale request {:?}", request.key());
                report.discarded += 1;
                continue;
            }
            let (key, rect) = (page.key(), page.rect);

            let index = cache.oldest_slot();
            let slot = slot_coord(index, self.tile_num);
            let reassigned = cache.touch(index);

            // A slot still holding another page has to be refilled even when
            // the cache reports it as the current binding.
            if reassigned || producer.owner_of(slot) != Some(key) {
                if let Some(evicted) = producer.invalidate_page(slot) {
                    log::debug!("slot {slot} evicts {evicted:?} for {key:?}");
                    report.evicted += 1;
                    report.events.push(SlotEvent::Invalidated { slot, key: evicted });
                }

                if !targets_bound {
                    cmd.push(Command::SetRenderTarget {
                        colors: smallvec![colors[0], colors[1]],
                    });
                    targets_bound = true;
                }

                let tile = TileRenderRequest::new(request, rect, slot, self.tile_size_padding);
                renderer.render_tile(cmd, &tile, producer);
                report.events.push(SlotEvent::Rendered { slot, key });
                report.produced.push(tile);
            }

            producer.bind_page(key, slot);
            report.events.push(SlotEvent::Bound { slot, key });
            report.serviced += 1;
        }

        report.deferred = self.queue.len();
        log::debug!(
            "serviced {} requests, discarded {}, deferred {}",
            report.serviced,
            report.discarded,
            report.deferred
        );
        report
    }

    /// Drop every pending request
    pub fn reset(&mut self) {
        self.queue.clear();
        self.draw_infos.clear();
    }
}
