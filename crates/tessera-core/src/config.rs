//! Virtual texture configuration
//!
//! Dimensions of the physical tile pool and the logical page table, plus the
//! per-frame scheduling knobs.

use serde::{Deserialize, Serialize};

use crate::request::RequestPriority;
use crate::{CoreError, CoreResult};

/// Border texels added on each side of a tile for filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TileBorder {
    X0 = 0,
    X1 = 1,
    #[default]
    X2 = 2,
    X4 = 4,
}

impl TileBorder {
    /// Border width in texels
    pub fn texels(self) -> u32 {
        self as u32
    }
}

/// Virtual texture configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VirtualTextureConfig {
    /// Physical tiles per side of the tile pool
    pub tile_num: u32,
    /// Tile size in texels, without border
    pub tile_size: u32,
    /// Tile border
    pub tile_border: TileBorder,
    /// Page table size in pages (finest mip)
    pub page_size: u32,
    /// Maximum page productions serviced per frame
    pub request_budget: usize,
    /// Which pending requests are serviced first
    pub priority: RequestPriority,
}

impl Default for VirtualTextureConfig {
    fn default() -> Self {
        Self {
            tile_num: 16,
            tile_size: 256,
            tile_border: TileBorder::X2,
            page_size: 256,
            request_budget: 12,
            priority: RequestPriority::FineFirst,
        }
    }
}

impl VirtualTextureConfig {
    /// Set the tile pool dimension
    pub fn with_tile_num(mut self, tile_num: u32) -> Self {
        self.tile_num = tile_num;
        self
    }

    /// Set the tile size
    pub fn with_tile_size(mut self, tile_size: u32) -> Self {
        self.tile_size = tile_size;
        self
    }

    /// Set the tile border
    pub fn with_tile_border(mut self, border: TileBorder) -> Self {
        self.tile_border = border;
        self
    }

    /// Set the page table size
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    /// Set the per-frame request budget
    pub fn with_request_budget(mut self, budget: usize) -> Self {
        self.request_budget = budget;
        self
    }

    /// Set the request priority policy
    pub fn with_priority(mut self, priority: RequestPriority) -> Self {
        self.priority = priority;
        self
    }

    /// Number of mip levels, `log2(page_size) + 1`
    pub fn num_mip(&self) -> u32 {
        self.page_size.ilog2() + 1
    }

    /// Tile size including the border on both sides
    pub fn tile_size_padding(&self) -> u32 {
        self.tile_size + self.tile_border.texels() * 2
    }

    /// Padded tile size in 4x4 compression blocks
    pub fn quad_tile_size_padding(&self) -> u32 {
        self.tile_size_padding() / 4
    }

    /// Physical texture size in texels
    pub fn texture_size(&self) -> u32 {
        self.tile_num * self.tile_size_padding()
    }

    /// Number of physical slots in the tile pool
    pub fn tile_capacity(&self) -> usize {
        (self.tile_num * self.tile_num) as usize
    }

    /// Check the configuration before any table or cache is allocated
    pub fn validate(&self) -> CoreResult<()> {
        // Slot coordinates are encoded into an 8-bit channel of the page table.
        if self.tile_num == 0 || self.tile_num > 256 {
            return Err(CoreError::InvalidConfig(format!(
                "tile_num must be in 1..=256, got {}",
                self.tile_num
            )));
        }
        if self.tile_size == 0 {
            return Err(CoreError::InvalidConfig("tile_size must be positive".into()));
        }
        if !self.page_size.is_power_of_two() {
            return Err(CoreError::InvalidConfig(format!(
                "page_size must be a power of two, got {}",
                self.page_size
            )));
        }
        let texture_size = self
            .tile_size
            .checked_add(self.tile_border.texels() * 2)
            .and_then(|padded| padded.checked_mul(self.tile_num));
        if texture_size.is_none() {
            return Err(CoreError::InvalidConfig(format!(
                "physical texture of {} tiles of {} texels does not fit in u32",
                self.tile_num, self.tile_size
            )));
        }
        if self.request_budget == 0 {
            return Err(CoreError::InvalidConfig("request_budget must be positive".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = VirtualTextureConfig::default();
        assert_eq!(config.num_mip(), 9);
        assert_eq!(config.tile_size_padding(), 260);
        assert_eq!(config.quad_tile_size_padding(), 65);
        assert_eq!(config.texture_size(), 16 * 260);
        assert_eq!(config.tile_capacity(), 256);
        assert_eq!(config.request_budget, 12);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_border_texels() {
        assert_eq!(TileBorder::X0.texels(), 0);
        assert_eq!(TileBorder::X4.texels(), 4);
        let config = VirtualTextureConfig::default().with_tile_border(TileBorder::X0);
        assert_eq!(config.tile_size_padding(), 256);
    }

    #[test]
    fn test_invalid_config() {
        let config = VirtualTextureConfig::default().with_page_size(300);
        assert!(matches!(config.validate(), Err(CoreError::InvalidConfig(_))));

        let config = VirtualTextureConfig::default().with_tile_num(0);
        assert!(config.validate().is_err());

        let config = VirtualTextureConfig::default().with_request_budget(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_oversized_texture_rejected() {
        let config = VirtualTextureConfig::default()
            .with_tile_num(256)
            .with_tile_size(20_000_000);
        assert!(matches!(config.validate(), Err(CoreError::InvalidConfig(_))));

        let config = VirtualTextureConfig::default().with_tile_size(u32::MAX - 1);
        assert!(config.validate().is_err());

        let config = VirtualTextureConfig::default().with_tile_num(256).with_tile_size(4096);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_from_partial_json() {
        let config: VirtualTextureConfig =
            serde_json::from_str(r#"{ "tile_num": 8, "priority": "CoarseFirst" }"#).unwrap();
        assert_eq!(config.tile_num, 8);
        assert_eq!(config.priority, RequestPriority::CoarseFirst);
        assert_eq!(config.page_size, 256);
    }
}
