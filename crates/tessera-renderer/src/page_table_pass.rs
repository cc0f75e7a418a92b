//! Page table composition
//!
//! Every resident page that was visible this frame is painted into the
//! indirection texture as one quad covering its cells. Quads are drawn from
//! the coarsest mip to the finest so that finer pages overwrite the coarse
//! pages underneath them.

use bytemuck::{Pod, Zeroable};
use glam::{IVec2, Mat4, Quat, Vec2, Vec3, Vec4};
use rayon::prelude::*;
use tessera_core::math::Rect;
use tessera_core::{PageKey, PageProducer};

/// Slot coordinates and mip are stored in 8-bit channels
const CHANNEL_MAX: f32 = 255.0;

/// One page to paint into the page table
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageDrawInfo {
    pub mip: u32,
    /// Covered area in page table pixels
    pub rect: Rect,
    /// Physical slot coordinate, normalized for an 8-bit channel
    pub draw_pos: Vec2,
}

/// Per-instance data of the page table draw
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct PageTableInstance {
    /// xy: slot coordinate, z: mip, w: unused
    pub page_data: Vec4,
    /// Unit quad to page table space
    pub transform: Mat4,
}

/// Collect the resident pages stamped active on `frame`, coarse to fine
pub fn build_draw_infos(producer: &PageProducer, frame: u64, out: &mut Vec<PageDrawInfo>) {
    let entries: Vec<(IVec2, PageKey)> = producer
        .active_pages()
        .iter()
        .map(|(slot, key)| (*slot, *key))
        .collect();

    out.clear();
    out.par_extend(entries.par_iter().filter_map(|(slot, key)| {
        let page = producer.page(*key);
        (page.payload.active_frame == frame).then(|| PageDrawInfo {
            mip: page.mip,
            rect: page.rect.as_rect(),
            draw_pos: slot.as_vec2() / CHANNEL_MAX,
        })
    }));

    sort_draw_infos(out);
}

/// Coarsest mip first. Position breaks ties so the order does not depend on
/// index iteration order.
pub fn sort_draw_infos(infos: &mut [PageDrawInfo]) {
    infos.sort_by(|a, b| {
        b.mip
            .cmp(&a.mip)
            .then(a.rect.y.total_cmp(&b.rect.y))
            .then(a.rect.x.total_cmp(&b.rect.x))
    });
}

/// Instance data for a sorted draw list on a page table of `page_size` pixels
pub fn build_instances(infos: &[PageDrawInfo], page_size: u32) -> Vec<PageTableInstance> {
    let page_size = page_size as f32;
    infos
        .iter()
        .map(|info| {
            let size = info.rect.width / page_size;
            PageTableInstance {
                page_data: Vec4::new(info.draw_pos.x, info.draw_pos.y, info.mip as f32 / CHANNEL_MAX, 0.0),
                transform: Mat4::from_scale_rotation_translation(
                    Vec3::splat(size),
                    Quat::IDENTITY,
                    Vec3::new(info.rect.x / page_size, info.rect.y / page_size, 0.0),
                ),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn producer_with(pages: &[(PageKey, IVec2, u64)]) -> PageProducer {
        let mut producer = PageProducer::new(16, 5);
        for &(key, slot, frame) in pages {
            producer.bind_page(key, slot);
            producer.page_mut(key).payload.active_frame = frame;
        }
        producer
    }

    #[test]
    fn test_only_active_pages_collected() {
        let producer = producer_with(&[
            (PageKey::new(0, 0, 0), IVec2::new(0, 0), 3),
            (PageKey::new(4, 4, 2), IVec2::new(1, 0), 2),
        ]);
        let mut infos = Vec::new();

        build_draw_infos(&producer, 3, &mut infos);
        assert_eq!(infos.len(), 1);
        assert_eq!(infos[0].mip, 0);

        build_draw_infos(&producer, 7, &mut infos);
        assert!(infos.is_empty());
    }

    #[test]
    fn test_coarse_to_fine_order() {
        let producer = producer_with(&[
            (PageKey::new(2, 2, 0), IVec2::new(0, 0), 1),
            (PageKey::new(0, 0, 3), IVec2::new(1, 0), 1),
            (PageKey::new(0, 0, 1), IVec2::new(2, 0), 1),
            (PageKey::new(4, 0, 0), IVec2::new(3, 0), 1),
        ]);
        let mut infos = Vec::new();
        build_draw_infos(&producer, 1, &mut infos);

        let mips: Vec<u32> = infos.iter().map(|i| i.mip).collect();
        assert_eq!(mips, vec![3, 1, 0, 0]);
        // Same mip ordered by position.
        assert_eq!(infos[2].rect.x, 4.0);
        assert_eq!(infos[3].rect.x, 2.0);
    }

    #[test]
    fn test_draw_pos_encodes_slot() {
        let producer = producer_with(&[(PageKey::new(0, 0, 0), IVec2::new(3, 5), 1)]);
        let mut infos = Vec::new();
        build_draw_infos(&producer, 1, &mut infos);
        assert_eq!(infos[0].draw_pos, Vec2::new(3.0 / 255.0, 5.0 / 255.0));
    }

    #[test]
    fn test_instance_transform() {
        let info = PageDrawInfo {
            mip: 2,
            rect: Rect::new(8.0, 4.0, 4.0, 4.0),
            draw_pos: Vec2::new(0.5, 0.25),
        };
        let instances = build_instances(&[info], 16);
        let instance = instances[0];

        assert_eq!(instance.page_data, Vec4::new(0.5, 0.25, 2.0 / 255.0, 0.0));
        let corner = instance.transform.transform_point3(Vec3::new(1.0, 1.0, 0.0));
        assert!((corner - Vec3::new(0.75, 0.5, 0.0)).length() < 1e-6);
        assert_eq!(bytemuck::bytes_of(&instance).len(), 80);
    }
}
