//! Integer block and chunk coordinates.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Sub};

/// Chunk edge length (X and Z) in blocks.
pub const CHUNK_WIDTH: i32 = 16;

/// World-space block coordinate.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct BlockPos {
    /// X (east is positive).
    pub x: i32,
    /// Y (up is positive).
    pub y: i32,
    /// Z (south is positive).
    pub z: i32,
}

impl BlockPos {
    /// The origin.
    pub const ZERO: Self = Self::new(0, 0, 0);

    /// Build a position from components.
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Offset by the given deltas.
    pub const fn offset(self, dx: i32, dy: i32, dz: i32) -> Self {
        Self::new(self.x + dx, self.y + dy, self.z + dz)
    }

    /// Shift upwards by `n` blocks.
    pub const fn above(self, n: i32) -> Self {
        self.offset(0, n, 0)
    }

    /// Chunk that contains this block column.
    pub const fn chunk(self) -> ChunkPos {
        ChunkPos::new(
            self.x.div_euclid(CHUNK_WIDTH),
            self.z.div_euclid(CHUNK_WIDTH),
        )
    }
}

impl Add for BlockPos {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        self.offset(rhs.x, rhs.y, rhs.z)
    }
}

impl Sub for BlockPos {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        self.offset(-rhs.x, -rhs.y, -rhs.z)
    }
}

impl fmt::Display for BlockPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// Chunk coordinate (X,Z) in chunk space.
/// Implements Ord for deterministic iteration in BTreeMap/BTreeSet (sorts by x, then z).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct ChunkPos {
    /// Chunk X.
    pub x: i32,
    /// Chunk Z.
    pub z: i32,
}

impl ChunkPos {
    /// Build a chunk coordinate.
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// Smallest block X inside this chunk.
    pub const fn min_block_x(self) -> i32 {
        self.x * CHUNK_WIDTH
    }

    /// Smallest block Z inside this chunk.
    pub const fn min_block_z(self) -> i32 {
        self.z * CHUNK_WIDTH
    }

    /// Block X at local offset `dx` inside this chunk.
    pub const fn block_x(self, dx: i32) -> i32 {
        self.min_block_x() + dx
    }

    /// Block Z at local offset `dz` inside this chunk.
    pub const fn block_z(self, dz: i32) -> i32 {
        self.min_block_z() + dz
    }

    /// Pack into the 64-bit key used by persisted chunk sets.
    ///
    /// Low 32 bits hold X, high 32 bits hold Z.
    pub const fn pack(self) -> i64 {
        (self.x as i64 & 0xFFFF_FFFF) | ((self.z as i64 & 0xFFFF_FFFF) << 32)
    }

    /// Inverse of [`ChunkPos::pack`].
    pub const fn unpack(packed: i64) -> Self {
        Self::new(packed as i32, (packed >> 32) as i32)
    }
}

impl fmt::Display for ChunkPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.z)
    }
}
