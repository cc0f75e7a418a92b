//! Page tables
//!
//! One fixed grid of pages per mip level. Geometry is immutable after
//! construction; only page payloads change.

use crate::page::{Page, PagePayload};

/// Grid of pages for a single mip level
#[derive(Debug, Clone)]
pub struct PageTable {
    mip: u32,
    cell_size: i32,
    cell_count: i32,
    /// Row-major, `cell_count * cell_count` entries
    pages: Vec<Page>,
}

impl PageTable {
    /// Create the table for `mip` over a page table of `table_size` pixels
    pub fn new(mip: u32, table_size: u32) -> Self {
        let cell_size = 1i32 << mip;
        let cell_count = (table_size as i32 / cell_size).max(1);

        let mut pages = Vec::with_capacity((cell_count * cell_count) as usize);
        for row in 0..cell_count {
            for col in 0..cell_count {
                pages.push(Page::new(col * cell_size, row * cell_size, cell_size, mip));
            }
        }

        Self {
            mip,
            cell_size,
            cell_count,
            pages,
        }
    }

    pub fn mip(&self) -> u32 {
        self.mip
    }

    /// Pixels covered by one cell, `2^mip`
    pub fn cell_size(&self) -> i32 {
        self.cell_size
    }

    /// Cells per side
    pub fn cell_count(&self) -> i32 {
        self.cell_count
    }

    /// Linear index of the cell covering pixel (x, y), wrapping at the table edge
    pub fn cell_index(&self, x: i32, y: i32) -> usize {
        let col = x.div_euclid(self.cell_size).rem_euclid(self.cell_count);
        let row = y.div_euclid(self.cell_size).rem_euclid(self.cell_count);
        (row * self.cell_count + col) as usize
    }

    /// Page covering pixel (x, y)
    pub fn page(&self, x: i32, y: i32) -> &Page {
        &self.pages[self.cell_index(x, y)]
    }

    /// Mutable page covering pixel (x, y)
    pub fn page_mut(&mut self, x: i32, y: i32) -> &mut Page {
        let index = self.cell_index(x, y);
        &mut self.pages[index]
    }

    pub fn pages(&self) -> impl Iterator<Item = &Page> {
        self.pages.iter()
    }

    /// Return every payload to the non-resident, idle state
    pub fn reset(&mut self) {
        for page in &mut self.pages {
            page.payload = PagePayload::default();
        }
    }
}
