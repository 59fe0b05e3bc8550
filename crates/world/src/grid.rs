//! Abstract voxel grid consumed by structure painting.

use crate::block::{needs_shape_update, Fluid, SetBlockFlags, Voxel};
use structgen_core::BlockPos;

/// Column height queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HeightmapKind {
    /// One above the highest non-air block.
    WorldSurface,
    /// One above the highest block that is neither air nor fluid.
    OceanFloor,
}

/// Mutable block world a structure is painted into.
///
/// Implementations decide how blocks are stored; painting code only relies on
/// this interface.
pub trait VoxelGrid {
    /// Block at `pos` (air outside the stored range).
    fn get_block(&self, pos: BlockPos) -> Voxel;

    /// Write a block. Writes outside the stored range are dropped.
    fn set_block(&mut self, pos: BlockPos, voxel: Voxel, flags: SetBlockFlags);

    /// Column height at `(x, z)`.
    fn get_height(&self, kind: HeightmapKind, x: i32, z: i32) -> i32;

    /// Fluid at `pos`.
    fn fluid_state(&self, pos: BlockPos) -> Fluid {
        self.get_block(pos).fluid()
    }

    /// Ask the fluid simulation to revisit `pos`.
    fn schedule_fluid_tick(&mut self, pos: BlockPos, fluid: Fluid);

    /// Flag `pos` for neighbour-dependent shape fixes once neighbours exist.
    fn mark_for_post_processing(&mut self, pos: BlockPos);
}

/// Write one structure block and record the follow-up work it needs.
pub fn place_structure_block(grid: &mut dyn VoxelGrid, pos: BlockPos, voxel: Voxel) {
    grid.set_block(pos, voxel, SetBlockFlags::STRUCTURE);
    let fluid = grid.fluid_state(pos);
    if !fluid.is_empty() {
        grid.schedule_fluid_tick(pos, fluid);
    }
    if needs_shape_update(voxel.id) {
        grid.mark_for_post_processing(pos);
    }
}
