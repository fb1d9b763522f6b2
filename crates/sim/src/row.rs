//! Row ledger - per-row occupancy and containability bookkeeping.
//!
//! Each row tracks, per cell: block occupancy, containability, the nearest
//! block index to either side, and which container currently covers the cell.
//! Blocks are never removed, so occupancy and containability are monotonic
//! and the nearest-block anchors are maintained incrementally instead of
//! being recomputed from scratch.

use crate::container::ContainerId;

/// One grid row of cell state.
///
/// Containability convention: a block counts as containable (its column can
/// support fluid above it), but only empty containable cells hold capacity
/// and carry a container id.
pub struct Row {
    width: i32,
    has_block: Vec<bool>,
    containable: Vec<bool>,
    /// Nearest block index to the left, -1 if none.
    left_block: Vec<i32>,
    /// Nearest block index to the right, `width` if none.
    right_block: Vec<i32>,
    container_id: Vec<Option<ContainerId>>,
}

impl Row {
    pub fn new(width: i32) -> Self {
        let w = width as usize;
        Self {
            width,
            has_block: vec![false; w],
            containable: vec![false; w],
            left_block: vec![-1; w],
            right_block: vec![width; w],
            container_id: vec![None; w],
        }
    }

    #[inline]
    fn in_bounds(&self, x: i32) -> bool {
        0 <= x && x < self.width
    }

    /// Whether the cell holds a block. Out-of-range reads as false.
    #[inline]
    pub fn has_block(&self, x: i32) -> bool {
        self.in_bounds(x) && self.has_block[x as usize]
    }

    /// Whether the cell is containable. Out-of-range reads as false.
    #[inline]
    pub fn containable(&self, x: i32) -> bool {
        self.in_bounds(x) && self.containable[x as usize]
    }

    /// Container covering this cell, if any. Blocks always read as `None`.
    #[inline]
    pub fn container_id(&self, x: i32) -> Option<ContainerId> {
        if self.in_bounds(x) {
            self.container_id[x as usize]
        } else {
            None
        }
    }

    /// Nearest block index strictly left of `x`, -1 if none.
    #[inline]
    pub fn left_block(&self, x: i32) -> i32 {
        self.left_block[x as usize]
    }

    /// Nearest block index strictly right of `x`, `width` if none.
    #[inline]
    pub fn right_block(&self, x: i32) -> i32 {
        self.right_block[x as usize]
    }

    /// Mark a cell occupied and re-anchor the nearest-block indices of the
    /// cells between the previous neighbor blocks and `x`.
    ///
    /// Amortized O(distance to neighbor): blocks are never removed, so each
    /// cell's anchor is rewritten at most once per wall it ends up next to.
    pub fn set_block(&mut self, x: i32) {
        let xi = x as usize;
        self.has_block[xi] = true;
        // blocks count as containable for the support check of the row above
        self.containable[xi] = true;

        let mut i = self.left_block[xi] + 1;
        while i < x {
            self.right_block[i as usize] = x;
            i += 1;
        }
        let mut i = self.right_block[xi] - 1;
        while i > x {
            self.left_block[i as usize] = x;
            i -= 1;
        }
    }

    /// Containable cells in `[lx, rx]`, clamped to the row.
    pub fn count_containable(&self, lx: i32, rx: i32) -> i32 {
        let lx = lx.max(0);
        let rx = rx.min(self.width - 1);
        if rx < lx {
            return 0;
        }
        self.containable[lx as usize..=rx as usize]
            .iter()
            .filter(|&&c| c)
            .count() as i32
    }

    /// Blocks in `[lx, rx]`, clamped to the row.
    pub fn count_blocks(&self, lx: i32, rx: i32) -> i32 {
        let lx = lx.max(0);
        let rx = rx.min(self.width - 1);
        if rx < lx {
            return 0;
        }
        self.has_block[lx as usize..=rx as usize]
            .iter()
            .filter(|&&b| b)
            .count() as i32
    }

    /// Empty containable cells in this row.
    pub fn capacity(&self) -> i32 {
        self.total_containable() - self.total_blocks()
    }

    pub fn total_containable(&self) -> i32 {
        self.containable.iter().filter(|&&c| c).count() as i32
    }

    pub fn total_blocks(&self) -> i32 {
        self.has_block.iter().filter(|&&b| b).count() as i32
    }

    /// Mark `[lx, rx]` containable.
    pub fn mark_containable(&mut self, lx: i32, rx: i32) {
        for x in lx..=rx {
            self.containable[x as usize] = true;
        }
    }

    /// Assign a container id to every cell in `[lx, rx]`.
    pub fn set_container_id(&mut self, lx: i32, rx: i32, id: ContainerId) {
        for x in lx..=rx {
            self.container_id[x as usize] = Some(id);
        }
    }

    /// Drop the container assignment of a single cell.
    pub fn clear_container_id(&mut self, x: i32) {
        self.container_id[x as usize] = None;
    }

    /// First maximal empty run at or after `begin`, bounded by `end`.
    ///
    /// The returned span runs from the first empty cell up to the cell before
    /// its nearest right block, which may extend past `end`.
    pub fn next_empty_span(&self, begin: i32, end: i32) -> Option<(i32, i32)> {
        let mut x = begin.max(0);
        let end = end.min(self.width - 1);
        while x <= end && self.has_block[x as usize] {
            x += 1;
        }
        if x > end {
            None
        } else {
            Some((x, self.right_block[x as usize] - 1))
        }
    }

    /// Human-readable cell state, for debug output.
    pub fn debug_info(&self, x: i32) -> String {
        format!(
            "block: {}, containable: {}, container: {}, walls: [{}, {}]",
            self.has_block(x),
            self.containable(x),
            match self.container_id(x) {
                Some(id) => format!("{id}"),
                None => "-".to_string(),
            },
            self.left_block(x),
            self.right_block(x),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_row_has_open_anchors() {
        let row = Row::new(8);
        for x in 0..8 {
            assert!(!row.has_block(x));
            assert!(!row.containable(x));
            assert_eq!(row.left_block(x), -1);
            assert_eq!(row.right_block(x), 8);
        }
    }

    #[test]
    fn set_block_reanchors_between_walls() {
        let mut row = Row::new(8);
        row.set_block(2);
        row.set_block(6);

        // cells between the walls point at both
        for x in 3..6 {
            assert_eq!(row.left_block(x), 2, "left anchor of {x}");
            assert_eq!(row.right_block(x), 6, "right anchor of {x}");
        }
        // cells outside still see the open edge
        assert_eq!(row.left_block(0), -1);
        assert_eq!(row.right_block(7), 8);

        // a wall in the middle splits the anchors again
        row.set_block(4);
        assert_eq!(row.right_block(3), 4);
        assert_eq!(row.left_block(5), 4);
        assert_eq!(row.left_block(3), 2);
        assert_eq!(row.right_block(5), 6);
    }

    #[test]
    fn blocks_count_as_containable() {
        let mut row = Row::new(5);
        row.set_block(1);
        assert!(row.containable(1));
        assert_eq!(row.total_containable(), 1);
        assert_eq!(row.capacity(), 0, "a block holds no fluid itself");
    }

    #[test]
    fn count_ranges_clamp_to_row() {
        let mut row = Row::new(5);
        row.set_block(0);
        row.set_block(4);
        assert_eq!(row.count_blocks(-3, 10), 2);
        assert_eq!(row.count_containable(-1, 5), 2);
        assert_eq!(row.count_containable(3, 1), 0);
    }

    #[test]
    fn next_empty_span_skips_blocks() {
        let mut row = Row::new(10);
        row.set_block(0);
        row.set_block(3);
        row.set_block(4);

        assert_eq!(row.next_empty_span(0, 9), Some((1, 2)));
        assert_eq!(row.next_empty_span(3, 9), Some((5, 9)));
        assert_eq!(row.next_empty_span(3, 4), None);
    }

    #[test]
    fn out_of_range_reads_are_empty() {
        let row = Row::new(4);
        assert!(!row.has_block(-1));
        assert!(!row.containable(4));
        assert_eq!(row.container_id(-1), None);
    }
}
