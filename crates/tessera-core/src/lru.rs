//! Tile Cache
//!
//! Least-recently-used ordering over the physical tile slots. Slots are dense
//! integers, so the recency list is an intrusive doubly linked list stored in
//! a flat array indexed by slot; both queries and promotions are O(1).
//!
//! The cache only tracks recency. Which page occupies a slot is owned by the
//! [`PageProducer`](crate::PageProducer).

use glam::IVec2;

use crate::{CoreError, CoreResult};

const NIL: u32 = u32::MAX;

#[derive(Debug, Clone, Copy)]
struct Node {
    prev: u32,
    next: u32,
    touched: bool,
}

/// Fixed-capacity LRU over slot indices `0..capacity`
#[derive(Debug, Clone)]
pub struct TileCache {
    nodes: Vec<Node>,
    /// Least recently used
    head: u32,
    /// Most recently used
    tail: u32,
}

impl TileCache {
    /// Create a cache of `capacity` slots, initially ordered 0 (oldest) to
    /// `capacity - 1` (newest)
    pub fn new(capacity: usize) -> CoreResult<Self> {
        if capacity == 0 || capacity >= NIL as usize {
            return Err(CoreError::InvalidCapacity);
        }

        let last = capacity as u32 - 1;
        let nodes = (0..capacity as u32)
            .map(|i| Node {
                prev: if i == 0 { NIL } else { i - 1 },
                next: if i == last { NIL } else { i + 1 },
                touched: false,
            })
            .collect();

        Ok(Self {
            nodes,
            head: 0,
            tail: last,
        })
    }

    pub fn capacity(&self) -> usize {
        self.nodes.len()
    }

    /// Slot least recently promoted
    pub fn oldest_slot(&self) -> usize {
        self.head as usize
    }

    /// Slot most recently promoted
    pub fn newest_slot(&self) -> usize {
        self.tail as usize
    }

    /// Promote `slot` to most recently used.
    ///
    /// Returns `true` when the caller has to treat the slot as reassigned:
    /// it was never handed out before, or it was not already the most
    /// recently used slot. Returns `false` when the slot already is the
    /// current binding.
    ///
    /// # Panics
    /// If `slot` is outside `0..capacity`.
    pub fn touch(&mut self, slot: usize) -> bool {
        assert!(
            slot < self.nodes.len(),
            "tile slot {slot} out of range (capacity {})",
            self.nodes.len()
        );

        let first_use = !self.nodes[slot].touched;
        self.nodes[slot].touched = true;

        let slot = slot as u32;
        if slot == self.tail {
            return first_use;
        }

        self.unlink(slot);
        self.push_back(slot);
        true
    }

    /// Slots from least to most recently used
    pub fn iter_oldest_first(&self) -> impl Iterator<Item = usize> + '_ {
        let mut cursor = self.head;
        std::iter::from_fn(move || {
            if cursor == NIL {
                return None;
            }
            let slot = cursor;
            cursor = self.nodes[slot as usize].next;
            Some(slot as usize)
        })
    }

    /// Restore the initial ordering and forget every previous use
    pub fn reset(&mut self) {
        if let Ok(fresh) = Self::new(self.nodes.len()) {
            *self = fresh;
        }
    }

    fn unlink(&mut self, slot: u32) {
        let Node { prev, next, .. } = self.nodes[slot as usize];
        if prev == NIL {
            self.head = next;
        } else {
            self.nodes[prev as usize].next = next;
        }
        if next == NIL {
            self.tail = prev;
        } else {
            self.nodes[next as usize].prev = prev;
        }
    }

    fn push_back(&mut self, slot: u32) {
        let old_tail = self.tail;
        {
            let node = &mut self.nodes[slot as usize];
            node.prev = old_tail;
            node.next = NIL;
        }
        if old_tail == NIL {
            self.head = slot;
        } else {
            self.nodes[old_tail as usize].next = slot;
        }
        self.tail = slot;
    }
}

/// Coordinate of a linear slot index in a pool of `tile_num` tiles per side
pub fn slot_coord(slot: usize, tile_num: u32) -> IVec2 {
    let tile_num = tile_num as usize;
    IVec2::new((slot % tile_num) as i32, (slot / tile_num) as i32)
}

/// Linear slot index, `row * tile_num + col`
pub fn slot_index(coord: IVec2, tile_num: u32) -> usize {
    coord.y as usize * tile_num as usize + coord.x as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_capacity_rejected() {
        assert_eq!(TileCache::new(0).unwrap_err(), CoreError::InvalidCapacity);
    }

    #[test]
    fn test_initial_order() {
        let cache = TileCache::new(4).unwrap();
        assert_eq!(cache.oldest_slot(), 0);
        assert_eq!(cache.newest_slot(), 3);
        assert_eq!(cache.iter_oldest_first().collect::<Vec<_>>(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_touch_promotes() {
        let mut cache = TileCache::new(4).unwrap();

        assert!(cache.touch(0));
        assert_eq!(cache.oldest_slot(), 1);
        assert_eq!(cache.newest_slot(), 0);

        assert!(cache.touch(2));
        assert_eq!(cache.iter_oldest_first().collect::<Vec<_>>(), vec![1, 3, 0, 2]);
    }

    #[test]
    fn test_touch_newest_is_not_reassignment() {
        let mut cache = TileCache::new(3).unwrap();
        assert!(cache.touch(1));
        assert!(!cache.touch(1));
    }

    #[test]
    fn test_first_use_of_newest_slot_is_reassignment() {
        let mut cache = TileCache::new(3).unwrap();
        // Slot 2 starts as newest but has never been handed out.
        assert!(cache.touch(2));
        assert!(!cache.touch(2));

        let mut single = TileCache::new(1).unwrap();
        assert!(single.touch(0));
        assert!(!single.touch(0));
        assert_eq!(single.oldest_slot(), 0);
    }

    #[test]
    #[should_panic]
    fn test_touch_out_of_range() {
        let mut cache = TileCache::new(2).unwrap();
        cache.touch(2);
    }

    #[test]
    fn test_oldest_has_smallest_timestamp() {
        let capacity = 16;
        let mut cache = TileCache::new(capacity).unwrap();
        // Initial order counts as touches at negative times.
        let mut stamps: Vec<i64> = (0..capacity as i64).map(|i| i - capacity as i64).collect();

        let mut state = 0x2545_f491_u64;
        for time in 0..2000i64 {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            let slot = (state >> 33) as usize % capacity;

            cache.touch(slot);
            stamps[slot] = time;

            let oldest = cache.oldest_slot();
            let min = stamps.iter().copied().min().unwrap();
            assert_eq!(stamps[oldest], min);
            assert_eq!(cache.newest_slot(), slot);
        }

        let mut order: Vec<usize> = cache.iter_oldest_first().collect();
        assert_eq!(order.len(), capacity);
        order.sort_unstable();
        order.dedup();
        assert_eq!(order.len(), capacity);
    }

    #[test]
    fn test_reset() {
        let mut cache = TileCache::new(3).unwrap();
        cache.touch(0);
        cache.touch(1);
        cache.reset();
        assert_eq!(cache.iter_oldest_first().collect::<Vec<_>>(), vec![0, 1, 2]);
        assert!(cache.touch(2));
    }

    #[test]
    fn test_slot_coords() {
        assert_eq!(slot_coord(5, 4), IVec2::new(1, 1));
        assert_eq!(slot_index(IVec2::new(3, 2), 4), 11);
        for slot in 0..16 {
            assert_eq!(slot_index(slot_coord(slot, 4), 4), slot);
        }
    }
}
