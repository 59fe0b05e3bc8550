//! Chunked in-memory voxel grid used to realize structures.

use crate::block::{Fluid, SetBlockFlags, Voxel, BLOCK_STONE, BLOCK_WATER};
use crate::grid::{HeightmapKind, VoxelGrid};
use std::collections::{BTreeMap, BTreeSet};
use structgen_core::{BlockPos, ChunkPos};

/// Chunk width (X axis) in voxels.
pub const CHUNK_SIZE_X: usize = 16;
/// Chunk height (Y axis) in voxels.
pub const CHUNK_SIZE_Y: usize = 256;
/// Chunk depth (Z axis) in voxels.
pub const CHUNK_SIZE_Z: usize = 16;
/// Total voxel count per chunk.
pub const CHUNK_VOLUME: usize = CHUNK_SIZE_X * CHUNK_SIZE_Y * CHUNK_SIZE_Z;

/// Lowest stored world Y.
pub const WORLD_MIN_Y: i32 = 0;
/// Highest stored world Y.
pub const WORLD_MAX_Y: i32 = WORLD_MIN_Y + CHUNK_SIZE_Y as i32 - 1;

/// Map a world Y to a chunk-local Y, `None` outside the stored range.
pub fn world_y_to_local_y(y: i32) -> Option<usize> {
    if (WORLD_MIN_Y..=WORLD_MAX_Y).contains(&y) {
        Some((y - WORLD_MIN_Y) as usize)
    } else {
        None
    }
}

/// Chunk-local position (X, Y, Z).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LocalPos {
    pub x: usize,
    pub y: usize,
    pub z: usize,
}

impl LocalPos {
    /// Convert to a linear index within the voxel array.
    pub fn index(self) -> usize {
        debug_assert!(self.x < CHUNK_SIZE_X);
        debug_assert!(self.y < CHUNK_SIZE_Y);
        debug_assert!(self.z < CHUNK_SIZE_Z);
        (self.y * CHUNK_SIZE_Z + self.z) * CHUNK_SIZE_X + self.x
    }

    /// Local position of a world block, `None` outside the stored Y range.
    pub fn from_world(pos: BlockPos) -> Option<Self> {
        let y = world_y_to_local_y(pos.y)?;
        Some(Self {
            x: pos.x.rem_euclid(CHUNK_SIZE_X as i32) as usize,
            y,
            z: pos.z.rem_euclid(CHUNK_SIZE_Z as i32) as usize,
        })
    }
}

bitflags::bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    /// Dirty flags set whenever structure painting touches a chunk.
    pub struct DirtyFlags: u8 {
        const BLOCKS = 0b0000_0001;
        const FLUID_TICKS = 0b0000_0010;
        const SHAPES = 0b0000_0100;
    }
}

impl Default for DirtyFlags {
    fn default() -> Self {
        DirtyFlags::empty()
    }
}

/// Flat terrain used to seed chunks that have not been written yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlatFill {
    /// Stone occupies `WORLD_MIN_Y..stone_top`.
    pub stone_top: i32,
    /// Water occupies `stone_top..water_top`.
    pub water_top: i32,
}

impl FlatFill {
    /// Solid stone up to `stone_top`, nothing above.
    pub const fn stone(stone_top: i32) -> Self {
        Self {
            stone_top,
            water_top: stone_top,
        }
    }

    /// Block at height `y`.
    pub fn voxel_at(&self, y: i32) -> Voxel {
        if y < self.stone_top {
            Voxel::new(BLOCK_STONE)
        } else if y < self.water_top {
            Voxel::new(BLOCK_WATER)
        } else {
            Voxel::AIR
        }
    }

    fn height(&self, kind: HeightmapKind) -> i32 {
        match kind {
            HeightmapKind::WorldSurface => self.water_top.max(self.stone_top),
            HeightmapKind::OceanFloor => self.stone_top,
        }
    }
}

/// One 16x256x16 column of voxels plus the side effects recorded while painting.
pub struct Chunk {
    position: ChunkPos,
    voxels: Vec<Voxel>,
    fluid_ticks: BTreeMap<BlockPos, Fluid>,
    post_processing: BTreeSet<BlockPos>,
    dirty: DirtyFlags,
}

impl Chunk {
    /// Allocate a fresh chunk filled with air.
    pub fn new(position: ChunkPos) -> Self {
        Self {
            position,
            voxels: vec![Voxel::default(); CHUNK_VOLUME],
            fluid_ticks: BTreeMap::new(),
            post_processing: BTreeSet::new(),
            dirty: DirtyFlags::empty(),
        }
    }

    /// Allocate a chunk seeded from flat terrain.
    pub fn filled(position: ChunkPos, fill: FlatFill) -> Self {
        let mut chunk = Self::new(position);
        for y in 0..CHUNK_SIZE_Y {
            let voxel = fill.voxel_at(WORLD_MIN_Y + y as i32);
            if voxel.is_air() {
                continue;
            }
            let start = LocalPos { x: 0, y, z: 0 }.index();
            chunk.voxels[start..start + CHUNK_SIZE_X * CHUNK_SIZE_Z].fill(voxel);
        }
        chunk
    }

    #[inline]
    pub fn position(&self) -> ChunkPos {
        self.position
    }

    /// Fetch a voxel copy.
    pub fn voxel(&self, local: LocalPos) -> Voxel {
        self.voxels[local.index()]
    }

    /// Set a voxel and mark the chunk dirty when it changes.
    pub fn set_voxel(&mut self, local: LocalPos, voxel: Voxel) {
        let idx = local.index();
        if self.voxels[idx] != voxel {
            self.voxels[idx] = voxel;
            self.dirty.insert(DirtyFlags::BLOCKS);
        }
    }

    /// Raw voxel storage in index order.
    pub fn voxels(&self) -> &[Voxel] {
        &self.voxels
    }

    /// Fluid ticks scheduled inside this chunk.
    pub fn fluid_ticks(&self) -> &BTreeMap<BlockPos, Fluid> {
        &self.fluid_ticks
    }

    /// Positions waiting for neighbour-dependent shape fixes.
    pub fn post_processing(&self) -> &BTreeSet<BlockPos> {
        &self.post_processing
    }

    /// Consume and return the current dirty flags.
    pub fn take_dirty_flags(&mut self) -> DirtyFlags {
        let flags = self.dirty;
        self.dirty = DirtyFlags::empty();
        flags
    }

    fn height(&self, kind: HeightmapKind, x: usize, z: usize) -> i32 {
        for y in (0..CHUNK_SIZE_Y).rev() {
            let voxel = self.voxel(LocalPos { x, y, z });
            let counts = match kind {
                HeightmapKind::WorldSurface => !voxel.is_air(),
                HeightmapKind::OceanFloor => !voxel.is_air() && voxel.fluid().is_empty(),
            };
            if counts {
                return WORLD_MIN_Y + y as i32 + 1;
            }
        }
        WORLD_MIN_Y
    }
}

/// In-memory [`VoxelGrid`] made of lazily created chunks.
///
/// Chunks are created from the flat fill on first write; reads of chunks that
/// were never written see the fill directly.
pub struct ChunkedGrid {
    fill: FlatFill,
    chunks: BTreeMap<ChunkPos, Chunk>,
}

impl ChunkedGrid {
    pub fn new(fill: FlatFill) -> Self {
        Self {
            fill,
            chunks: BTreeMap::new(),
        }
    }

    /// Terrain used for chunks that have not been written.
    pub fn fill(&self) -> FlatFill {
        self.fill
    }

    /// Stored chunk, if it was ever written.
    pub fn chunk(&self, pos: ChunkPos) -> Option<&Chunk> {
        self.chunks.get(&pos)
    }

    /// Stored chunk, created from the fill when missing.
    pub fn chunk_mut(&mut self, pos: ChunkPos) -> &mut Chunk {
        let fill = self.fill;
        self.chunks
            .entry(pos)
            .or_insert_with(|| Chunk::filled(pos, fill))
    }

    /// Stored chunks in position order.
    pub fn chunks(&self) -> impl Iterator<Item = &Chunk> {
        self.chunks.values()
    }
}

impl VoxelGrid for ChunkedGrid {
    fn get_block(&self, pos: BlockPos) -> Voxel {
        let Some(local) = LocalPos::from_world(pos) else {
            return Voxel::AIR;
        };
        match self.chunks.get(&pos.chunk()) {
            Some(chunk) => chunk.voxel(local),
            None => self.fill.voxel_at(pos.y),
        }
    }

    fn set_block(&mut self, pos: BlockPos, voxel: Voxel, _flags: SetBlockFlags) {
        if let Some(local) = LocalPos::from_world(pos) {
            self.chunk_mut(pos.chunk()).set_voxel(local, voxel);
        }
    }

    fn get_height(&self, kind: HeightmapKind, x: i32, z: i32) -> i32 {
        let pos = BlockPos::new(x, WORLD_MIN_Y, z);
        match self.chunks.get(&pos.chunk()) {
            Some(chunk) => chunk.height(
                kind,
                x.rem_euclid(CHUNK_SIZE_X as i32) as usize,
                z.rem_euclid(CHUNK_SIZE_Z as i32) as usize,
            ),
            None => self.fill.height(kind),
        }
    }

    fn schedule_fluid_tick(&mut self, pos: BlockPos, fluid: Fluid) {
        if world_y_to_local_y(pos.y).is_none() {
            return;
        }
        let chunk = self.chunk_mut(pos.chunk());
        chunk.fluid_ticks.insert(pos, fluid);
        chunk.dirty.insert(DirtyFlags::FLUID_TICKS);
    }

    fn mark_for_post_processing(&mut self, pos: BlockPos) {
        if world_y_to_local_y(pos.y).is_none() {
            return;
        }
        let chunk = self.chunk_mut(pos.chunk());
        chunk.post_processing.insert(pos);
        chunk.dirty.insert(DirtyFlags::SHAPES);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::{BLOCK_AIR, BLOCK_TORCH};

    #[test]
    fn test_local_pos_index() {
        let pos1 = LocalPos { x: 0, y: 0, z: 0 };
        assert_eq!(pos1.index(), 0);

        let pos2 = LocalPos { x: 15, y: 0, z: 0 };
        assert_eq!(pos2.index(), 15);

        let pos3 = LocalPos { x: 0, y: 1, z: 0 };
        assert_eq!(pos3.index(), CHUNK_SIZE_Z * CHUNK_SIZE_X);
    }

    #[test]
    fn local_pos_wraps_negative_coordinates() {
        let local = LocalPos::from_world(BlockPos::new(-1, 10, -17)).unwrap();
        assert_eq!((local.x, local.y, local.z), (15, 10, 15));
        assert!(LocalPos::from_world(BlockPos::new(0, -1, 0)).is_none());
        assert!(LocalPos::from_world(BlockPos::new(0, 256, 0)).is_none());
    }

    #[test]
    fn test_chunk_new_is_air() {
        let chunk = Chunk::new(ChunkPos::new(0, 0));
        assert!(chunk.voxels().iter().all(|v| v.id == BLOCK_AIR));
    }

    #[test]
    fn set_same_voxel_keeps_chunk_clean() {
        let mut chunk = Chunk::new(ChunkPos::new(0, 0));
        chunk.set_voxel(LocalPos { x: 0, y: 0, z: 0 }, Voxel::AIR);
        assert!(chunk.take_dirty_flags().is_empty());

        chunk.set_voxel(LocalPos { x: 0, y: 0, z: 0 }, Voxel::new(BLOCK_STONE));
        assert!(chunk.take_dirty_flags().contains(DirtyFlags::BLOCKS));
    }

    #[test]
    fn unwritten_chunks_read_the_fill() {
        let grid = ChunkedGrid::new(FlatFill {
            stone_top: 40,
            water_top: 63,
        });
        assert_eq!(grid.get_block(BlockPos::new(5, 39, 5)).id, BLOCK_STONE);
        assert_eq!(grid.get_block(BlockPos::new(5, 40, 5)).id, BLOCK_WATER);
        assert!(grid.get_block(BlockPos::new(5, 63, 5)).is_air());
        assert_eq!(grid.get_height(HeightmapKind::WorldSurface, 5, 5), 63);
        assert_eq!(grid.get_height(HeightmapKind::OceanFloor, 5, 5), 40);
        assert_eq!(grid.chunks().count(), 0);
    }

    #[test]
    fn writes_create_filled_chunk_and_update_height() {
        let mut grid = ChunkedGrid::new(FlatFill::stone(30));
        let pos = BlockPos::new(-3, 70, 20);
        grid.set_block(pos, Voxel::new(BLOCK_STONE), SetBlockFlags::STRUCTURE);

        assert_eq!(grid.get_block(pos).id, BLOCK_STONE);
        assert_eq!(grid.get_block(BlockPos::new(-3, 10, 20)).id, BLOCK_STONE);
        assert_eq!(grid.get_height(HeightmapKind::WorldSurface, -3, 20), 71);
        assert_eq!(grid.get_height(HeightmapKind::WorldSurface, -4, 20), 30);
        assert!(grid.chunk(ChunkPos::new(-1, 1)).is_some());
    }

    #[test]
    fn side_effects_are_recorded_once_per_position() {
        let mut grid = ChunkedGrid::new(FlatFill::stone(0));
        let pos = BlockPos::new(1, 1, 1);
        grid.set_block(pos, Voxel::new(BLOCK_TORCH), SetBlockFlags::STRUCTURE);
        grid.mark_for_post_processing(pos);
        grid.mark_for_post_processing(pos);
        grid.schedule_fluid_tick(pos, Fluid::Water);
        grid.schedule_fluid_tick(pos, Fluid::Water);

        let chunk = grid.chunk_mut(ChunkPos::new(0, 0));
        assert_eq!(chunk.post_processing().len(), 1);
        assert_eq!(chunk.fluid_ticks().len(), 1);
        let flags = chunk.take_dirty_flags();
        assert!(flags.contains(DirtyFlags::SHAPES | DirtyFlags::FLUID_TICKS | DirtyFlags::BLOCKS));
    }

    #[test]
    fn out_of_range_writes_are_dropped() {
        let mut grid = ChunkedGrid::new(FlatFill::stone(0));
        grid.set_block(BlockPos::new(0, -5, 0), Voxel::new(BLOCK_STONE), SetBlockFlags::STRUCTURE);
        grid.schedule_fluid_tick(BlockPos::new(0, 300, 0), Fluid::Lava);
        assert_eq!(grid.chunks().count(), 0);
    }
}
