//! # Tessera Core
//!
//! Paging and cache-management core for GPU virtual texturing.
//!
//! A large logical texture is split into a quad-tree of fixed-size pages over
//! several mip levels. Only the pages currently needed are materialized into a
//! small fixed-capacity physical tile pool; a page table maps logical pages to
//! physical slots.
//!
//! This crate provides the CPU-side bookkeeping:
//! - **Page tables**: one fixed grid of page records per mip level
//! - **Tile cache**: O(1) least-recently-used pool of physical slots
//! - **Page producer**: owns the page tables and the slot to page index
//! - **Request queue**: pending page productions with an explicit priority policy
//! - **Configuration**: virtual texture dimensions and derived parameters

pub mod config;
pub mod lru;
pub mod math;
pub mod page;
pub mod page_table;
pub mod producer;
pub mod request;

pub use config::{TileBorder, VirtualTextureConfig};
pub use lru::TileCache;
pub use page::{Page, PageKey, PagePayload, PageRequestInfo};
pub use page_table::PageTable;
pub use producer::{ActivePageMap, PageProducer};
pub use request::{RequestPriority, RequestQueue};

use thiserror::Error;

/// Core errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("Invalid virtual texture configuration: {0}")]
    InvalidConfig(String),

    #[error("Tile cache capacity must be positive")]
    InvalidCapacity,

    #[error("Page table and active page index disagree: {0}")]
    Inconsistent(String),
}

/// Result type for core operations
pub type CoreResult<T> = Result<T, CoreError>;
