//! Page records
//!
//! A page is one quad-tree cell of the virtual texture at a given mip level.
//! Its payload carries the runtime residency and request state.

use std::cmp::Ordering;

use glam::IVec2;

use crate::math::RectI;

/// Slot coordinate stored in a payload whose page is not resident
pub const INVALID_SLOT: IVec2 = IVec2::new(-1, -1);

/// Logical page coordinate: page table pixel position and mip level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageKey {
    pub x: i32,
    pub y: i32,
    pub mip: u32,
}

impl PageKey {
    pub const fn new(x: i32, y: i32, mip: u32) -> Self {
        Self { x, y, mip }
    }
}

/// A request to produce one page
///
/// Two requests are equal when they target the same coordinate and mip. The
/// serial identifies one particular submission so that a superseded entry
/// can be told apart from the live one.
#[derive(Debug, Clone, Copy)]
pub struct PageRequestInfo {
    pub x: i32,
    pub y: i32,
    pub mip: u32,
    pub cancelled: bool,
    pub(crate) serial: u64,
}

impl PageRequestInfo {
    /// Placeholder stored in payloads with nothing in flight
    pub const NONE: Self = Self {
        x: 0,
        y: 0,
        mip: 0,
        cancelled: true,
        serial: 0,
    };

    pub(crate) fn new(x: i32, y: i32, mip: u32, serial: u64) -> Self {
        Self {
            x,
            y,
            mip,
            cancelled: false,
            serial,
        }
    }

    /// Request that did not go through a queue
    pub fn standalone(x: i32, y: i32, mip: u32) -> Self {
        Self::new(x, y, mip, 0)
    }

    /// Submission identity
    pub fn serial(&self) -> u64 {
        self.serial
    }

    pub fn key(&self) -> PageKey {
        PageKey::new(self.x, self.y, self.mip)
    }

    /// Whether this request is still waiting to be serviced
    pub fn is_live(&self) -> bool {
        !self.cancelled
    }

    pub fn cancel(&mut self) {
        self.cancelled = true;
    }

    /// True when `popped` is exactly the live submission stored here
    pub fn matches(&self, popped: &PageRequestInfo) -> bool {
        self.is_live() && self == popped && self.serial == popped.serial
    }

    /// Order by mip level only
    pub fn cmp_mip(&self, other: &PageRequestInfo) -> Ordering {
        self.mip.cmp(&other.mip)
    }
}

impl PartialEq for PageRequestInfo {
    fn eq(&self, other: &Self) -> bool {
        self.x == other.x && self.y == other.y && self.mip == other.mip
    }
}

impl Eq for PageRequestInfo {}

impl Default for PageRequestInfo {
    fn default() -> Self {
        Self::NONE
    }
}

/// Runtime state attached to a page
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PagePayload {
    /// Physical slot holding the page, `INVALID_SLOT` when not resident
    pub slot: IVec2,
    /// Last frame the page was reported visible
    pub active_frame: u64,
    /// In-flight request descriptor
    pub request: PageRequestInfo,
}

impl PagePayload {
    pub fn is_ready(&self) -> bool {
        self.slot != INVALID_SLOT
    }

    pub fn reset_slot(&mut self) {
        self.slot = INVALID_SLOT;
    }

    /// True when a non-cancelled request is waiting in the queue
    pub fn is_loading(&self) -> bool {
        self.request.is_live()
    }
}

impl Default for PagePayload {
    fn default() -> Self {
        Self {
            slot: INVALID_SLOT,
            active_frame: 0,
            request: PageRequestInfo::NONE,
        }
    }
}

/// One cell of a page table
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Page {
    /// Covered area in page table pixels
    pub rect: RectI,
    pub mip: u32,
    /// Placeholder page that is never produced
    pub is_null: bool,
    pub payload: PagePayload,
}

impl Page {
    pub fn new(x: i32, y: i32, size: i32, mip: u32) -> Self {
        Self {
            rect: RectI::new(x, y, size, size),
            mip,
            is_null: false,
            payload: PagePayload::default(),
        }
    }

    /// Canonical key of this page
    pub fn key(&self) -> PageKey {
        PageKey::new(self.rect.x, self.rect.y, self.mip)
    }
}
