//! Structure - owns all rows and containers, orchestrates block placement,
//! containability propagation, and the external fluid API.
//!
//! Containers are kept in a `BTreeMap` keyed by their id: water is added in
//! ascending id order (oldest, lowest containers first) and drained in
//! descending order. The cross-row propagation primitives live here rather
//! than on `Row`, so they can split-borrow the row list and the container
//! map without back-references.

use std::collections::BTreeMap;

use glam::IVec2;

use crate::container::{Container, ContainerId, IdAlloc};
use crate::row::Row;

/// A growable 2D block structure that traps and transports water.
///
/// Fixed-size grid, origin (0, 0) bottom-left. Blocks are only ever added;
/// per cell the state machine is `empty-not-containable -> empty-containable
/// -> blocked`, with no reverse transitions.
pub struct Structure {
    width: i32,
    height: i32,
    rows: Vec<Row>,
    containers: BTreeMap<ContainerId, Container>,
    ids: IdAlloc,
}

impl Structure {
    pub fn new(width: i32, height: i32) -> Self {
        assert!(width > 0 && height > 0, "grid dimensions must be positive");
        Self {
            width,
            height,
            rows: (0..height).map(|_| Row::new(width)).collect(),
            containers: BTreeMap::new(),
            ids: IdAlloc::new(),
        }
    }

    #[inline]
    pub fn width(&self) -> i32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> i32 {
        self.height
    }

    #[inline]
    fn in_bounds(&self, cell: IVec2) -> bool {
        0 <= cell.x && cell.x < self.width && 0 <= cell.y && cell.y < self.height
    }

    /// Whether the cell holds a block. Out-of-bounds reads as false.
    pub fn has_block(&self, cell: IVec2) -> bool {
        self.in_bounds(cell) && self.rows[cell.y as usize].has_block(cell.x)
    }

    /// Whether the cell is containable (blocks included).
    pub fn containable(&self, cell: IVec2) -> bool {
        self.in_bounds(cell) && self.rows[cell.y as usize].containable(cell.x)
    }

    /// Container covering the cell, if any.
    pub fn container_id_at(&self, cell: IVec2) -> Option<ContainerId> {
        if self.in_bounds(cell) {
            self.rows[cell.y as usize].container_id(cell.x)
        } else {
            None
        }
    }

    /// Whether a block may legally be placed here: in bounds and adjacent to
    /// an existing block. The placement itself does not re-check this; it is
    /// the caller's contract.
    pub fn can_grow(&self, cell: IVec2) -> bool {
        let IVec2 { x, y } = cell;
        self.in_bounds(cell)
            && ((y > 0 && self.rows[y as usize - 1].has_block(x))
                || (y < self.height - 1 && self.rows[y as usize + 1].has_block(x))
                || self.rows[y as usize].has_block(x - 1)
                || self.rows[y as usize].has_block(x + 1))
    }

    pub fn row(&self, y: i32) -> &Row {
        &self.rows[y as usize]
    }

    pub fn container(&self, id: ContainerId) -> Option<&Container> {
        self.containers.get(&id)
    }

    pub fn container_count(&self) -> usize {
        self.containers.len()
    }

    pub fn container_ids(&self) -> impl Iterator<Item = ContainerId> + '_ {
        self.containers.keys().copied()
    }

    /// Total water held across all containers.
    pub fn stored_water(&self) -> f32 {
        self.containers.values().map(Container::stored_water).sum()
    }

    /// Total sealed capacity across all containers.
    pub fn capacity(&self) -> i32 {
        self.containers.values().map(Container::capacity).sum()
    }

    /// Containable empty cells regardless of seal state; an upper bound on
    /// `capacity`.
    pub fn capacity_over_estimate(&self) -> i32 {
        self.rows.iter().map(Row::capacity).sum()
    }

    pub fn total_containable(&self) -> i32 {
        self.rows.iter().map(Row::total_containable).sum()
    }

    pub fn total_blocks(&self) -> i32 {
        self.rows.iter().map(Row::total_blocks).sum()
    }

    /// Blocks within `[lx, rx]` over all rows strictly below `y`.
    pub fn blocks_in_range(&self, lx: i32, rx: i32, y: i32) -> i32 {
        let top = y.clamp(0, self.height - 1) as usize;
        self.rows[..top].iter().map(|r| r.count_blocks(lx, rx)).sum()
    }

    /// Containable cells within `[lx, rx]` over all rows strictly below `y`.
    pub fn containable_in_range(&self, lx: i32, rx: i32, y: i32) -> i32 {
        let top = y.clamp(0, self.height - 1) as usize;
        self.rows[..top]
            .iter()
            .map(|r| r.count_containable(lx, rx))
            .sum()
    }

    /// Place a block. Returns whether any containability changed (callers
    /// use this to refresh their presentation). No-op on an occupied cell.
    ///
    /// Placement inside an existing container splits it; otherwise the two
    /// same-row neighbors get a containability fill attempt and the change
    /// propagates upward row by row over the diagonally expanded changed
    /// range until a row reports no change.
    pub fn set_block(&mut self, cell: IVec2) -> bool {
        assert!(self.in_bounds(cell), "set_block out of bounds: {cell}");
        let IVec2 { x, y } = cell;
        if self.rows[y as usize].has_block(x) {
            return false;
        }

        self.rows[y as usize].set_block(x);
        // the new wall may seal a leak of the container below, whether or
        // not anything else changes
        if y > 0 {
            self.fix_leak_below(x, y);
        }

        if let Some(id) = self.rows[y as usize].container_id(x) {
            self.split_container(id, x, y);
            // the region was already sealed; more wall inside it cannot make
            // new cells containable above
            return true;
        }

        // by default only this cell changed; fills widen the range
        let mut left_x = x - 1;
        let mut right_x = x + 1;
        let mut changed = false;

        // the wall can close a basin on either side of it (not on the ground
        // row - there is no row below to support a fill)
        if y > 0 {
            if let Some((lx, _)) = self.fill_containable(x - 1, y) {
                left_x = lx - 1; // water flows diagonally
                changed = true;
            }
            if let Some((_, rx)) = self.fill_containable(x + 1, y) {
                right_x = rx + 1;
                changed = true;
            }
        }

        let mut up = y + 1;
        while up < self.height {
            match self.fill_containable_range(left_x, right_x, up) {
                Some((lx, rx)) => {
                    left_x = lx - 1;
                    right_x = rx + 1;
                    up += 1;
                    changed = true;
                }
                None => break,
            }
        }
        changed
    }

    /// Add water to the structure, filling containers in ascending id order.
    /// Returns the amount that exceeded total remaining capacity.
    pub fn add_water(&mut self, amount: f32) -> f32 {
        let mut amount = amount;
        for container in self.containers.values_mut() {
            if amount <= 0.0 {
                break;
            }
            amount = container.add_water(amount);
        }
        amount.max(0.0)
    }

    /// Consume `amount` of stored water, draining containers in descending
    /// id order. If not enough is stored, consumes nothing and returns false.
    pub fn try_get_water(&mut self, amount: f32) -> bool {
        if amount > self.stored_water() {
            return false;
        }
        let mut amount = amount;
        for container in self.containers.values_mut().rev() {
            if amount <= 0.0 {
                break;
            }
            amount = container.get_water(amount);
        }
        true
    }

    /// Fluid content of the slice covering the cell, 0 if none.
    pub fn content_at(&self, cell: IVec2) -> f32 {
        let Some(id) = self.container_id_at(cell) else {
            return 0.0;
        };
        match self.containers.get(&id) {
            Some(container) => container.content_at(cell.x, cell.y).unwrap_or(0.0),
            None => {
                // propagation bug, not a runtime condition - surface it
                log::error!(
                    "cell ({}, {}) holds container id {id} with no matching container",
                    cell.x,
                    cell.y
                );
                0.0
            }
        }
    }

    /// Human-readable cell description for debugging overlays.
    pub fn debug_info(&self, cell: IVec2) -> String {
        assert!(self.in_bounds(cell), "debug_info out of bounds: {cell}");
        format!(
            "cell ({}, {}): {}, content: {:.3}",
            cell.x,
            cell.y,
            self.rows[cell.y as usize].debug_info(cell.x),
            self.content_at(cell),
        )
    }

    /// Let containers owning cells next to the new wall at (x, y) seal a
    /// leak boundary it covers. The row below is inspected one cell to each
    /// side because leak points sit just outside their interval.
    fn fix_leak_below(&mut self, x: i32, y: i32) {
        let below = &self.rows[y as usize - 1];
        let seen = [-1, 0, 1].map(|dx| below.container_id(x + dx));

        let mut handled: Vec<ContainerId> = Vec::with_capacity(3);
        for id in seen.into_iter().flatten() {
            if handled.contains(&id) {
                continue;
            }
            handled.push(id);
            if let Some(container) = self.containers.get_mut(&id) {
                container.fix_leak(x, y);
            } else {
                log::error!("row {} references missing container {id}", y - 1);
            }
        }
    }

    /// Split the container covering the newly blocked cell (x, y), replace
    /// it with the resulting components, and re-add the spilled share.
    fn split_container(&mut self, id: ContainerId, x: i32, y: i32) {
        let Some(mut old) = self.containers.remove(&id) else {
            log::error!("cell ({x}, {y}) references missing container {id}");
            return;
        };
        match old.split_at(x, y, &self.rows, &mut self.ids) {
            None => {
                // contract violation, logged by the container; restore state
                self.containers.insert(id, old);
            }
            Some((new_containers, spilled)) => {
                self.rows[y as usize].clear_container_id(x);
                if new_containers.len() > 1 {
                    log::debug!("split produced {} containers", new_containers.len());
                }
                for container in new_containers {
                    container.overwrite_cell_container_id(&mut self.rows);
                    self.containers.insert(container.id(), container);
                }
                if spilled > 0.0 {
                    // whatever the surviving containers cannot absorb is lost
                    let _ = self.add_water(spilled);
                }
            }
        }
    }

    /// Try to make the empty cell at (x, y) containable.
    ///
    /// Succeeds when every cell below the enclosing empty span - extended one
    /// cell to each side, since water flows diagonally - is containable. The
    /// whole span fills at once and joins the container(s) directly below:
    /// none existing creates one, several get merged (first id encountered
    /// wins, the others are removed and their cells rewritten).
    ///
    /// Returns the changed span, or `None` when nothing changed. Border
    /// columns never fill: the grid edge is a permanent open boundary.
    fn fill_containable(&mut self, x: i32, y: i32) -> Option<(i32, i32)> {
        debug_assert!(y > 0);
        let row = &self.rows[y as usize];
        if x <= 0 || x >= self.width - 1 || row.containable(x) {
            return None;
        }
        let lb = row.left_block(x);
        let rb = row.right_block(x);
        let below = &self.rows[y as usize - 1];
        // spans reaching the grid border fail here: the clamped count can
        // never cover the out-of-range column
        if below.count_containable(lb, rb) < rb - lb + 1 {
            return None;
        }
        let (lx, rx) = (lb + 1, rb - 1);

        let mut below_ids: Vec<ContainerId> = Vec::new();
        for cx in (lx - 1)..=(rx + 1) {
            if let Some(id) = below.container_id(cx) {
                if !below_ids.contains(&id) {
                    below_ids.push(id);
                }
            }
        }

        self.rows[y as usize].mark_containable(lx, rx);

        let keep = match below_ids.first().copied() {
            None => {
                let id = self.ids.next_id();
                self.containers
                    .insert(id, Container::new(self.width, self.height, id));
                id
            }
            Some(first) => {
                for &other_id in &below_ids[1..] {
                    let Some(other) = self.containers.remove(&other_id) else {
                        log::error!("row {} references missing container {other_id}", y - 1);
                        continue;
                    };
                    for (sy, slice) in other.iter_slices() {
                        self.rows[sy as usize].set_container_id(slice.lx, slice.rx, first);
                    }
                    if let Some(keeper) = self.containers.get_mut(&first) {
                        keeper.merge(other);
                    }
                }
                first
            }
        };

        self.rows[y as usize].set_container_id(lx, rx, keep);
        let next_row = self.rows.get(y as usize + 1);
        if let Some(container) = self.containers.get_mut(&keep) {
            container.add_interval(y, lx, rx, next_row, false, 0.0);
        }
        Some((lx, rx))
    }

    /// Apply `fill_containable` to every maximal empty span intersecting
    /// `[begin_x, end_x]` at row `y`. Returns the overall changed span.
    fn fill_containable_range(&mut self, begin_x: i32, end_x: i32, y: i32) -> Option<(i32, i32)> {
        let mut begin = begin_x.max(0);
        let end = end_x.min(self.width - 1);
        let mut changed: Option<(i32, i32)> = None;

        while let Some((span_lx, span_rx)) = self.rows[y as usize].next_empty_span(begin, end) {
            begin = span_rx + 1;
            // filling the span's first cell fills the whole enclosing span
            if let Some((lx, rx)) = self.fill_containable(span_lx, y) {
                changed = Some(match changed {
                    None => (lx, rx),
                    Some((l, _)) => (l, rx),
                });
            }
        }
        changed
    }
}
