//! Page request queue
//!
//! Pending page productions. The queue accepts duplicates: the descriptor
//! stored in the target page's payload is the single live request, and any
//! queued entry that no longer matches it is discarded when popped.

use std::collections::VecDeque;

use ahash::AHashMap;
use glam::IVec2;
use serde::{Deserialize, Serialize};

use crate::page::PageRequestInfo;
use crate::producer::PageProducer;

/// Which pending requests are serviced first when the budget runs out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum RequestPriority {
    /// Lowest mip (most detailed) first
    #[default]
    FineFirst,
    /// Highest mip (coarsest) first
    CoarseFirst,
}

/// Queue of page requests awaiting production
#[derive(Debug, Default)]
pub struct RequestQueue {
    pending: VecDeque<PageRequestInfo>,
    /// Latest submission per requested coordinate, across mips
    latest: AHashMap<IVec2, PageRequestInfo>,
    next_serial: u64,
}

impl RequestQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Submit a request for the page at (x, y) on `mip`.
    ///
    /// The new request becomes the live descriptor of its page. A pending
    /// request submitted through this call for the same coordinate on
    /// another mip is cancelled.
    pub fn submit(&mut self, producer: &mut PageProducer, x: i32, y: i32, mip: u32) -> PageRequestInfo {
        let request = self.push(producer, x, y, mip);

        if let Some(previous) = self.latest.insert(IVec2::new(x, y), request) {
            if previous.mip != mip {
                let stored = &mut producer.page_mut(previous.key()).payload.request;
                if stored.matches(&previous) {
                    stored.cancel();
                    log::trace!("request ({x}, {y}) mip {} superseded by mip {mip}", previous.mip);
                }
            }
        }
        request
    }

    /// Submit a request for exactly the page at (x, y) on `mip`, leaving
    /// requests for other mips of the same coordinate alone
    pub fn submit_page(&mut self, producer: &mut PageProducer, x: i32, y: i32, mip: u32) -> PageRequestInfo {
        self.push(producer, x, y, mip)
    }

    fn push(&mut self, producer: &mut PageProducer, x: i32, y: i32, mip: u32) -> PageRequestInfo {
        self.next_serial += 1;
        let request = PageRequestInfo::new(x, y, mip, self.next_serial);
        producer.page_mut(request.key()).payload.request = request;
        self.pending.push_back(request);
        request
    }

    /// Order pending requests for servicing. Requests on the same mip keep
    /// their submission order.
    pub fn sort(&mut self, priority: RequestPriority) {
        let pending = self.pending.make_contiguous();
        match priority {
            RequestPriority::FineFirst => pending.sort_by(|a, b| a.cmp_mip(b)),
            RequestPriority::CoarseFirst => pending.sort_by(|a, b| b.cmp_mip(a)),
        }
    }

    /// Remove the next request in queue order
    pub fn pop(&mut self) -> Option<PageRequestInfo> {
        let request = self.pending.pop_front()?;
        let coord = IVec2::new(request.x, request.y);
        if self.latest.get(&coord).is_some_and(|latest| latest.serial() == request.serial()) {
            self.latest.remove(&coord);
        }
        Some(request)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PageRequestInfo> {
        self.pending.iter()
    }

    /// Drop every pending request. Payload descriptors are left untouched;
    /// callers resetting the whole texture reset the producer as well.
    pub fn clear(&mut self) {
        self.pending.clear();
        self.latest.clear();
    }
}
