//! Axis-aligned integer boxes with inclusive bounds.

use crate::coords::{BlockPos, ChunkPos, CHUNK_WIDTH};
use crate::direction::Direction;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Inclusive integer box.
///
/// Invariant: `min_* <= max_*` on every axis; single-block boxes are allowed.
/// Boxes are plain values: every transformation returns a new box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoundingBox {
    min_x: i32,
    min_y: i32,
    min_z: i32,
    max_x: i32,
    max_y: i32,
    max_z: i32,
}

impl BoundingBox {
    /// Build a box from two opposite corners given in any order.
    pub fn new(x0: i32, y0: i32, z0: i32, x1: i32, y1: i32, z1: i32) -> Self {
        Self {
            min_x: x0.min(x1),
            min_y: y0.min(y1),
            min_z: z0.min(z1),
            max_x: x0.max(x1),
            max_y: y0.max(y1),
            max_z: z0.max(z1),
        }
    }

    /// Build a box spanning two block positions.
    pub fn from_corners(a: BlockPos, b: BlockPos) -> Self {
        Self::new(a.x, a.y, a.z, b.x, b.y, b.z)
    }

    /// Box covering the full column range of a chunk between `min_y` and `max_y`.
    pub fn for_chunk(chunk: ChunkPos, min_y: i32, max_y: i32) -> Self {
        Self::new(
            chunk.min_block_x(),
            min_y,
            chunk.min_block_z(),
            chunk.min_block_x() + CHUNK_WIDTH - 1,
            max_y,
            chunk.min_block_z() + CHUNK_WIDTH - 1,
        )
    }

    /// Box of `size` blocks placed relative to an anchor and facing `dir`.
    ///
    /// The anchor `(x, y, z)` is the doorway the new box grows out of; the
    /// offsets are expressed in the box's own frame (x = sideways,
    /// z = forward). Non-horizontal directions are treated as north.
    #[allow(clippy::too_many_arguments)]
    pub fn oriented(
        x: i32,
        y: i32,
        z: i32,
        off_x: i32,
        off_y: i32,
        off_z: i32,
        size_x: i32,
        size_y: i32,
        size_z: i32,
        dir: Direction,
    ) -> Self {
        let y0 = y + off_y;
        let y1 = y + size_y - 1 + off_y;
        match dir {
            Direction::South => Self::new(
                x + off_x,
                y0,
                z + off_z,
                x + size_x - 1 + off_x,
                y1,
                z + size_z - 1 + off_z,
            ),
            Direction::West => Self::new(
                x - size_z + 1 + off_z,
                y0,
                z + off_x,
                x + off_z,
                y1,
                z + size_x - 1 + off_x,
            ),
            Direction::East => Self::new(
                x + off_z,
                y0,
                z + off_x,
                x + size_z - 1 + off_z,
                y1,
                z + size_x - 1 + off_x,
            ),
            _ => Self::new(
                x + off_x,
                y0,
                z - size_z + 1 + off_z,
                x + size_x - 1 + off_x,
                y1,
                z + off_z,
            ),
        }
    }

    /// Smallest box enclosing every box in `boxes`, or `None` when empty.
    pub fn encapsulating<I>(boxes: I) -> Option<Self>
    where
        I: IntoIterator<Item = BoundingBox>,
    {
        boxes.into_iter().reduce(|acc, bb| acc.expanded_to(&bb))
    }

    /// Smallest X inside the box.
    pub const fn min_x(&self) -> i32 {
        self.min_x
    }
    /// Smallest Y inside the box.
    pub const fn min_y(&self) -> i32 {
        self.min_y
    }
    /// Smallest Z inside the box.
    pub const fn min_z(&self) -> i32 {
        self.min_z
    }
    /// Largest X inside the box.
    pub const fn max_x(&self) -> i32 {
        self.max_x
    }
    /// Largest Y inside the box.
    pub const fn max_y(&self) -> i32 {
        self.max_y
    }
    /// Largest Z inside the box.
    pub const fn max_z(&self) -> i32 {
        self.max_z
    }

    /// Number of blocks along X.
    pub const fn x_span(&self) -> i32 {
        self.max_x - self.min_x + 1
    }

    /// Number of blocks along Y.
    pub const fn y_span(&self) -> i32 {
        self.max_y - self.min_y + 1
    }

    /// Number of blocks along Z.
    pub const fn z_span(&self) -> i32 {
        self.max_z - self.min_z + 1
    }

    /// Block at the (rounded down) center.
    pub const fn center(&self) -> BlockPos {
        BlockPos::new(
            self.min_x + (self.max_x - self.min_x + 1) / 2,
            self.min_y + (self.max_y - self.min_y + 1) / 2,
            self.min_z + (self.max_z - self.min_z + 1) / 2,
        )
    }

    /// True iff the two boxes share at least one block.
    pub const fn intersects(&self, other: &BoundingBox) -> bool {
        self.max_x >= other.min_x
            && self.min_x <= other.max_x
            && self.max_z >= other.min_z
            && self.min_z <= other.max_z
            && self.max_y >= other.min_y
            && self.min_y <= other.max_y
    }

    /// True iff the XZ footprints overlap, ignoring Y.
    pub const fn intersects_xz(&self, min_x: i32, min_z: i32, max_x: i32, max_z: i32) -> bool {
        self.max_x >= min_x && self.min_x <= max_x && self.max_z >= min_z && self.min_z <= max_z
    }

    /// True iff `pos` lies inside the box.
    pub const fn contains(&self, pos: BlockPos) -> bool {
        pos.x >= self.min_x
            && pos.x <= self.max_x
            && pos.z >= self.min_z
            && pos.z <= self.max_z
            && pos.y >= self.min_y
            && pos.y <= self.max_y
    }

    /// True iff `other` lies entirely inside this box.
    pub const fn encloses(&self, other: &BoundingBox) -> bool {
        other.min_x >= self.min_x
            && other.max_x <= self.max_x
            && other.min_y >= self.min_y
            && other.max_y <= self.max_y
            && other.min_z >= self.min_z
            && other.max_z <= self.max_z
    }

    /// Translated copy.
    pub const fn translated(&self, dx: i32, dy: i32, dz: i32) -> Self {
        Self {
            min_x: self.min_x + dx,
            min_y: self.min_y + dy,
            min_z: self.min_z + dz,
            max_x: self.max_x + dx,
            max_y: self.max_y + dy,
            max_z: self.max_z + dz,
        }
    }

    /// Smallest box enclosing both boxes.
    pub fn expanded_to(&self, other: &BoundingBox) -> Self {
        Self {
            min_x: self.min_x.min(other.min_x),
            min_y: self.min_y.min(other.min_y),
            min_z: self.min_z.min(other.min_z),
            max_x: self.max_x.max(other.max_x),
            max_y: self.max_y.max(other.max_y),
            max_z: self.max_z.max(other.max_z),
        }
    }

    /// Overlapping region of both boxes, if any.
    pub fn intersection(&self, other: &BoundingBox) -> Option<Self> {
        if !self.intersects(other) {
            return None;
        }
        Some(Self {
            min_x: self.min_x.max(other.min_x),
            min_y: self.min_y.max(other.min_y),
            min_z: self.min_z.max(other.min_z),
            max_x: self.max_x.min(other.max_x),
            max_y: self.max_y.min(other.max_y),
            max_z: self.max_z.min(other.max_z),
        })
    }

    /// Copy grown by `amount` blocks on every side.
    pub fn inflated(&self, amount: i32) -> Self {
        Self::new(
            self.min_x - amount,
            self.min_y - amount,
            self.min_z - amount,
            self.max_x + amount,
            self.max_y + amount,
            self.max_z + amount,
        )
    }

    /// `[min_x, min_y, min_z, max_x, max_y, max_z]`, the persisted layout.
    pub const fn to_array(&self) -> [i32; 6] {
        [
            self.min_x, self.min_y, self.min_z, self.max_x, self.max_y, self.max_z,
        ]
    }

    /// Inverse of [`BoundingBox::to_array`].
    pub fn from_array(values: [i32; 6]) -> Self {
        let [x0, y0, z0, x1, y1, z1] = values;
        Self::new(x0, y0, z0, x1, y1, z1)
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}, {}, {}] -> [{}, {}, {}]",
            self.min_x, self.min_y, self.min_z, self.max_x, self.max_y, self.max_z
        )
    }
}
