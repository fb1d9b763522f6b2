//! Container - one connected containable region with per-slice fluid content,
//! leak tracking, and the structural split/merge algorithms.
//!
//! A container stores its cells as closed integer intervals ("slices"), one
//! unordered list per row. Each slice carries the fluid it currently holds.
//! Leak state is tracked per boundary row (0..=height): the leftmost and
//! rightmost x at which that boundary is not yet sealed from above. Rows at
//! or above the lowest leaking boundary hold no capacity - fluid would spill
//! out there.

use std::fmt;

use glam::IVec3;

use crate::row::Row;

/// Opaque, stable container handle. Allocated from a monotonically
/// increasing counter and never reused after removal, so ascending id order
/// is creation order (bottom-up as the structure grows).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ContainerId(u32);

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Allocator for container ids, owned by the structure.
#[derive(Default)]
pub struct IdAlloc {
    next: u32,
}

impl IdAlloc {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&mut self) -> ContainerId {
        let id = ContainerId(self.next);
        self.next += 1;
        id
    }
}

/// A contiguous run `[lx, rx]` of containable empty cells in one row,
/// the unit of storage inside a container.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Slice {
    pub lx: i32,
    pub rx: i32,
    /// Fluid held by this slice, `0.0..=width`.
    pub content: f32,
}

impl Slice {
    #[inline]
    pub fn width(&self) -> i32 {
        self.rx - self.lx + 1
    }

    #[inline]
    pub fn covers(&self, x: i32) -> bool {
        self.lx <= x && x <= self.rx
    }
}

/// A maximal connected containable empty region.
pub struct Container {
    id: ContainerId,
    width: i32,
    height: i32,
    /// Slices per row, unordered within a row.
    rows: Vec<Vec<Slice>>,
    /// Leftmost open leak x per boundary row (height+1 entries),
    /// `width` = sealed.
    left_leak: Vec<i32>,
    /// Rightmost open leak x per boundary row (height+1 entries),
    /// -1 = sealed.
    right_leak: Vec<i32>,
}

impl Container {
    pub fn new(width: i32, height: i32, id: ContainerId) -> Self {
        Self {
            id,
            width,
            height,
            rows: (0..height).map(|_| Vec::new()).collect(),
            left_leak: vec![width; height as usize + 1],
            right_leak: vec![-1; height as usize + 1],
        }
    }

    #[inline]
    pub fn id(&self) -> ContainerId {
        self.id
    }

    pub fn contains_cell(&self, x: i32, y: i32) -> bool {
        0 <= y && y < self.height && self.rows[y as usize].iter().any(|s| s.covers(x))
    }

    pub fn slices_at(&self, y: i32) -> &[Slice] {
        &self.rows[y as usize]
    }

    /// All (row, slice) pairs of this container.
    pub fn iter_slices(&self) -> impl Iterator<Item = (i32, Slice)> + '_ {
        self.rows
            .iter()
            .enumerate()
            .flat_map(|(y, slices)| slices.iter().map(move |s| (y as i32, *s)))
    }

    pub fn find_slice_cover(&self, x: i32, y: i32) -> Option<Slice> {
        self.rows[y as usize].iter().find(|s| s.covers(x)).copied()
    }

    #[inline]
    pub fn left_leak(&self, y: i32) -> i32 {
        self.left_leak[y as usize]
    }

    #[inline]
    pub fn right_leak(&self, y: i32) -> i32 {
        self.right_leak[y as usize]
    }

    /// Lowest boundary row with an open leak, `height` if fully sealed.
    /// A leak at boundary y means fluid in row y-1 is at the brim; rows >= y
    /// cannot hold fluid.
    pub fn lowest_leak_y(&self) -> i32 {
        let left = self.left_leak.iter().position(|&x| x < self.width);
        let right = self.right_leak.iter().position(|&x| x >= 0);
        match (left, right) {
            (Some(l), Some(r)) => l.min(r) as i32,
            (Some(l), None) => l as i32,
            (None, Some(r)) => r as i32,
            (None, None) => self.height,
        }
    }

    /// Cells that can hold fluid: slice widths over all rows strictly below
    /// the lowest leaking boundary.
    pub fn capacity(&self) -> i32 {
        let top = self.lowest_leak_y() as usize;
        self.rows[..top]
            .iter()
            .flatten()
            .map(Slice::width)
            .sum()
    }

    pub fn stored_water(&self) -> f32 {
        self.rows.iter().flatten().map(|s| s.content).sum()
    }

    pub fn is_full(&self) -> bool {
        self.stored_water() >= self.capacity() as f32 - 1e-6
    }

    /// Content of the slice covering (x, y), if any.
    pub fn content_at(&self, x: i32, y: i32) -> Option<f32> {
        self.find_slice_cover(x, y).map(|s| s.content)
    }

    /// Append a slice and update leak state.
    ///
    /// A new leak opens at boundary y+1 on a side where the diagonal cell
    /// just outside the slice is not containable in `next_row` (or there is
    /// no next row). An existing leak at boundary y is sealed when the
    /// slice's wall covers it. `bypass_leak_check` skips both, for re-adding
    /// slices inside an already-sealed region. `lx > rx` is a no-op.
    pub fn add_interval(
        &mut self,
        y: i32,
        lx: i32,
        rx: i32,
        next_row: Option<&Row>,
        bypass_leak_check: bool,
        content: f32,
    ) {
        if lx > rx {
            return;
        }
        self.rows[y as usize].push(Slice { lx, rx, content });
        if bypass_leak_check {
            return;
        }

        let yb = y as usize;
        let ya = yb + 1;
        // leaks propagate upward: keep the extreme of the current boundary
        // and the new slice's open corner
        if next_row.is_none_or(|row| !row.containable(lx - 1)) {
            self.left_leak[ya] = self.left_leak[yb].min(lx - 1);
        }
        if next_row.is_none_or(|row| !row.containable(rx + 1)) {
            self.right_leak[ya] = self.right_leak[yb].max(rx + 1);
        }
        // the slice's walls at lx-1 / rx+1 seal a leak they cover
        if lx - 1 <= self.left_leak[yb] {
            self.left_leak[yb] = self.width;
        }
        if self.right_leak[yb] <= rx + 1 {
            self.right_leak[yb] = -1;
        }
    }

    /// Distribute `amount` bottom-up across rows below the lowest leak,
    /// filling each slice's free space. Returns the unabsorbed remainder.
    pub fn add_water(&mut self, amount: f32) -> f32 {
        let mut amount = amount;
        let top = self.lowest_leak_y() as usize;
        for slices in self.rows[..top].iter_mut() {
            for slice in slices.iter_mut() {
                if amount <= 0.0 {
                    return 0.0;
                }
                let free = slice.width() as f32 - slice.content;
                if free > 0.0 {
                    let take = free.min(amount);
                    slice.content += take;
                    amount -= take;
                }
            }
        }
        amount.max(0.0)
    }

    /// Drain `amount` top-down from stored content. Returns the shortfall
    /// (0 if fully satisfied); callers pre-check `stored_water` when a
    /// partial drain is not acceptable.
    pub fn get_water(&mut self, amount: f32) -> f32 {
        let mut amount = amount;
        for slices in self.rows.iter_mut().rev() {
            for slice in slices.iter_mut() {
                if amount <= 0.0 {
                    return 0.0;
                }
                if slice.content > 0.0 {
                    let take = slice.content.min(amount);
                    slice.content -= take;
                    amount -= take;
                }
            }
        }
        amount.max(0.0)
    }

    /// Remove and return every slice at row `y` overlapping `[lx, rx]`
    /// (callers pass the 1-cell diagonally expanded range).
    fn take_overlapping(&mut self, lx: i32, rx: i32, y: i32) -> Vec<Slice> {
        let row = &mut self.rows[y as usize];
        let mut taken = Vec::new();
        let mut i = 0;
        while i < row.len() {
            if row[i].lx <= rx && lx <= row[i].rx {
                taken.push(row.swap_remove(i));
            } else {
                i += 1;
            }
        }
        taken
    }

    /// Partition this container around a block newly placed at (x, y).
    ///
    /// The covering slice is removed and its two remainders re-added with the
    /// leak recompute bypassed - splitting inside an already-sealed region
    /// cannot open a new leak. Each remainder keeps a width-proportional
    /// share of the removed slice's content; the blocked cell's share is
    /// returned as spilled water for the caller to re-add against the
    /// updated container set.
    ///
    /// A per-row worklist sweep then regroups every remaining slice into
    /// brand-new containers, one per still-connected component, transferring
    /// slice content as-is. This container is left empty and is expected to
    /// be discarded by the caller.
    ///
    /// Returns `None` (and mutates nothing) if (x, y) is not covered by this
    /// container - a caller contract violation.
    pub fn split_at(
        &mut self,
        x: i32,
        y: i32,
        rows: &[Row],
        ids: &mut IdAlloc,
    ) -> Option<(Vec<Container>, f32)> {
        let slices = &mut self.rows[y as usize];
        let Some(pos) = slices.iter().position(|s| s.covers(x)) else {
            log::warn!("cannot split container {} at ({x}, {y}): cell is not covered", self.id);
            return None;
        };
        let target = slices.swap_remove(pos);

        let per_cell = target.content / target.width() as f32;
        let left_width = (x - target.lx) as f32;
        let right_width = (target.rx - x) as f32;
        self.add_interval(y, target.lx, x - 1, None, true, per_cell * left_width);
        self.add_interval(y, x + 1, target.rx, None, true, per_cell * right_width);
        let spilled = per_cell;

        let mut new_containers = Vec::new();
        for y in 0..self.height {
            // every remaining slice seeds a component; the worklist pulls in
            // all slices still connected to it through diagonal adjacency
            while let Some(seed) = self.rows[y as usize].pop() {
                let mut fresh = Container::new(self.width, self.height, ids.next_id());
                fresh.add_interval(
                    y,
                    seed.lx,
                    seed.rx,
                    rows.get(y as usize + 1),
                    false,
                    seed.content,
                );
                let mut worklist = vec![IVec3::new(seed.lx, y, seed.rx)];
                while let Some(span) = worklist.pop() {
                    if span.y > 0 {
                        let below = span.y - 1;
                        for s in self.take_overlapping(span.x - 1, span.z + 1, below) {
                            fresh.add_interval(
                                below,
                                s.lx,
                                s.rx,
                                rows.get(below as usize + 1),
                                false,
                                s.content,
                            );
                            worklist.push(IVec3::new(s.lx, below, s.rx));
                        }
                    }
                    if span.y < self.height - 1 {
                        let above = span.y + 1;
                        for s in self.take_overlapping(span.x - 1, span.z + 1, above) {
                            fresh.add_interval(
                                above,
                                s.lx,
                                s.rx,
                                rows.get(above as usize + 1),
                                false,
                                s.content,
                            );
                            worklist.push(IVec3::new(s.lx, above, s.rx));
                        }
                    }
                }
                new_containers.push(fresh);
            }
        }

        Some((new_containers, spilled))
    }

    /// Absorb `other`: row-wise slice concatenation and element-wise min/max
    /// merge of the leak boundaries, including the top sentinel row.
    ///
    /// The caller removes `other` from the container map first and rewrites
    /// its cells to this container's id.
    pub fn merge(&mut self, other: Container) {
        if other.id == self.id {
            log::warn!("cannot merge container {} with itself", self.id);
            return;
        }
        for (mine, theirs) in self.rows.iter_mut().zip(other.rows) {
            mine.extend(theirs);
        }
        for y in 0..=self.height as usize {
            self.left_leak[y] = self.left_leak[y].min(other.left_leak[y]);
            self.right_leak[y] = self.right_leak[y].max(other.right_leak[y]);
        }
    }

    /// Push this container's id into every cell it owns.
    pub fn overwrite_cell_container_id(&self, rows: &mut [Row]) {
        for (y, slice) in self.iter_slices() {
            rows[y as usize].set_container_id(slice.lx, slice.rx, self.id);
        }
    }

    /// Clear a leak boundary exactly covered by a new wall at (x, y).
    pub fn fix_leak(&mut self, x: i32, y: i32) {
        let yb = y as usize;
        if self.left_leak[yb] == x {
            self.left_leak[yb] = self.width;
        }
        if self.right_leak[yb] == x {
            self.right_leak[yb] = -1;
        }
    }
}
