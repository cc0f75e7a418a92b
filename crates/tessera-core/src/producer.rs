//! Page Producer
//!
//! Owns the page table of every mip level and the active page index, the
//! reverse mapping from physical slot to the page it holds. Every resident
//! page has exactly one index entry pointing back at it.

use ahash::AHashMap;
use glam::IVec2;

use crate::page::{Page, PageKey};
use crate::page_table::PageTable;
use crate::{CoreError, CoreResult};

/// Physical slot coordinate to the canonical key of the page it holds
pub type ActivePageMap = AHashMap<IVec2, PageKey>;

/// Page tables plus the slot to page index
#[derive(Debug)]
pub struct PageProducer {
    table_size: u32,
    tables: Vec<PageTable>,
    active_pages: ActivePageMap,
}

impl PageProducer {
    /// Allocate `num_mip` tables over a page table of `table_size` pixels
    pub fn new(table_size: u32, num_mip: u32) -> Self {
        let tables = (0..num_mip).map(|mip| PageTable::new(mip, table_size)).collect();
        Self {
            table_size,
            tables,
            active_pages: ActivePageMap::default(),
        }
    }

    pub fn table_size(&self) -> u32 {
        self.table_size
    }

    pub fn num_mip(&self) -> u32 {
        self.tables.len() as u32
    }

    /// # Panics
    /// If `mip` is not below `num_mip`.
    pub fn table(&self, mip: u32) -> &PageTable {
        &self.tables[mip as usize]
    }

    /// Page covering `key`'s pixel on `key`'s mip
    pub fn page(&self, key: PageKey) -> &Page {
        self.tables[key.mip as usize].page(key.x, key.y)
    }

    pub fn page_mut(&mut self, key: PageKey) -> &mut Page {
        self.tables[key.mip as usize].page_mut(key.x, key.y)
    }

    pub fn active_pages(&self) -> &ActivePageMap {
        &self.active_pages
    }

    /// Page currently held by `slot`
    pub fn owner_of(&self, slot: IVec2) -> Option<PageKey> {
        self.active_pages.get(&slot).copied()
    }

    /// Number of pages currently resident in the tile pool
    pub fn resident_count(&self) -> usize {
        self.active_pages.len()
    }

    /// Flag the page covering `key` as a placeholder that is never produced
    pub fn set_null(&mut self, key: PageKey, is_null: bool) {
        self.page_mut(key).is_null = is_null;
    }

    /// Sever the mapping of `slot`: its page becomes non-resident and the
    /// index entry is removed. A slot without mapping is left alone.
    pub fn invalidate_page(&mut self, slot: IVec2) -> Option<PageKey> {
        let owner = self.active_pages.remove(&slot)?;
        let page = self.page_mut(owner);
        debug_assert_eq!(page.payload.slot, slot);
        page.payload.reset_slot();
        Some(owner)
    }

    /// Make the page at `key` resident in `slot` and retire its in-flight
    /// request. The slot must have been invalidated first.
    pub fn bind_page(&mut self, key: PageKey, slot: IVec2) -> PageKey {
        debug_assert!(!self.active_pages.contains_key(&slot), "slot {slot} still bound");

        let page = self.page_mut(key);
        debug_assert!(!page.payload.is_ready(), "page {:?} already resident", page.key());
        page.payload.slot = slot;
        page.payload.request.cancel();
        let canonical = page.key();

        self.active_pages.insert(slot, canonical);
        canonical
    }

    /// Verify that page payloads and the active page index mirror each other
    pub fn check_consistency(&self) -> CoreResult<()> {
        for (slot, key) in &self.active_pages {
            let page = self.page(*key);
            if page.key() != *key {
                return Err(CoreError::Inconsistent(format!("index holds non-canonical key {key:?}")));
            }
            if page.payload.slot != *slot {
                return Err(CoreError::Inconsistent(format!(
                    "slot {slot} maps to {key:?} but the page points at {}",
                    page.payload.slot
                )));
            }
        }

        let resident = self
            .tables
            .iter()
            .flat_map(|table| table.pages())
            .filter(|page| page.payload.is_ready())
            .count();
        if resident != self.active_pages.len() {
            return Err(CoreError::Inconsistent(format!(
                "{resident} resident pages but {} index entries",
                self.active_pages.len()
            )));
        }
        Ok(())
    }

    /// Forget all residency and request state
    pub fn reset(&mut self) {
        for table in &mut self.tables {
            table.reset();
        }
        self.active_pages.clear();
    }
}
