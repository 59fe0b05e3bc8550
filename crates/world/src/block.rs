//! Block identifiers, per-voxel state and placement flags.
//!
//! Structure painting only needs a small palette; ids are stable because they
//! are persisted inside templates and chunk snapshots.

use serde::{Deserialize, Serialize};
use structgen_core::{Direction, Mirror, Rotation};

/// Block identifier.
pub type BlockId = u16;
/// Block state metadata bits.
pub type BlockState = u16;

/// Reserved ID for air.
pub const BLOCK_AIR: BlockId = 0;
pub const BLOCK_STONE: BlockId = 1;
pub const BLOCK_WATER: BlockId = 2;
pub const BLOCK_LAVA: BlockId = 3;
pub const BLOCK_DIRT: BlockId = 4;
pub const BLOCK_GRAVEL: BlockId = 5;
pub const BLOCK_COBBLESTONE: BlockId = 6;
pub const BLOCK_MOSSY_COBBLESTONE: BlockId = 7;
pub const BLOCK_STONE_BRICKS: BlockId = 8;
pub const BLOCK_MOSSY_STONE_BRICKS: BlockId = 9;
pub const BLOCK_CRACKED_STONE_BRICKS: BlockId = 10;
pub const BLOCK_STONE_BRICK_STAIRS: BlockId = 11;
pub const BLOCK_COBBLESTONE_STAIRS: BlockId = 12;
pub const BLOCK_OAK_PLANKS: BlockId = 13;
pub const BLOCK_OAK_FENCE: BlockId = 14;
pub const BLOCK_OAK_DOOR: BlockId = 15;
pub const BLOCK_IRON_DOOR: BlockId = 16;
pub const BLOCK_IRON_BARS: BlockId = 17;
pub const BLOCK_TORCH: BlockId = 18;
pub const BLOCK_WALL_TORCH: BlockId = 19;
pub const BLOCK_LADDER: BlockId = 20;
pub const BLOCK_RAIL: BlockId = 21;
pub const BLOCK_COBWEB: BlockId = 22;
pub const BLOCK_CHEST: BlockId = 23;
pub const BLOCK_SPAWNER: BlockId = 24;
pub const BLOCK_BOOKSHELF: BlockId = 25;
pub const BLOCK_END_PORTAL_FRAME: BlockId = 26;
pub const BLOCK_PRISMARINE: BlockId = 27;
pub const BLOCK_PRISMARINE_BRICKS: BlockId = 28;
pub const BLOCK_DARK_PRISMARINE: BlockId = 29;
pub const BLOCK_SEA_LANTERN: BlockId = 30;
pub const BLOCK_SPONGE: BlockId = 31;
pub const BLOCK_GOLD_BLOCK: BlockId = 32;
pub const BLOCK_PURPUR_BLOCK: BlockId = 33;
pub const BLOCK_PURPUR_PILLAR: BlockId = 34;
pub const BLOCK_END_STONE_BRICKS: BlockId = 35;
pub const BLOCK_END_ROD: BlockId = 36;
pub const BLOCK_DARK_OAK_PLANKS: BlockId = 37;
pub const BLOCK_DARK_OAK_LOG: BlockId = 38;
pub const BLOCK_BIRCH_PLANKS: BlockId = 39;
pub const BLOCK_GLASS_PANE: BlockId = 40;
pub const BLOCK_WHITE_WOOL: BlockId = 41;
pub const BLOCK_OAK_STAIRS: BlockId = 42;

/// Facing bits stored in the low three bits of [`BlockState`].
const FACING_MASK: BlockState = 0b111;

/// Fluid occupying a voxel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Fluid {
    Empty,
    Water,
    Lava,
}

impl Fluid {
    /// True for [`Fluid::Empty`].
    pub const fn is_empty(self) -> bool {
        matches!(self, Fluid::Empty)
    }
}

/// Fluid carried by a block id.
pub const fn fluid_of(id: BlockId) -> Fluid {
    match id {
        BLOCK_WATER => Fluid::Water,
        BLOCK_LAVA => Fluid::Lava,
        _ => Fluid::Empty,
    }
}

/// True for blocks whose final shape depends on neighbours that may not exist yet.
pub const fn needs_shape_update(id: BlockId) -> bool {
    matches!(
        id,
        BLOCK_TORCH | BLOCK_WALL_TORCH | BLOCK_LADDER | BLOCK_OAK_FENCE | BLOCK_IRON_BARS
            | BLOCK_GLASS_PANE
    )
}

/// True for blocks that store a horizontal facing in their state bits.
pub const fn has_facing(id: BlockId) -> bool {
    matches!(
        id,
        BLOCK_STONE_BRICK_STAIRS
            | BLOCK_COBBLESTONE_STAIRS
            | BLOCK_OAK_STAIRS
            | BLOCK_OAK_DOOR
            | BLOCK_IRON_DOOR
            | BLOCK_WALL_TORCH
            | BLOCK_LADDER
            | BLOCK_CHEST
            | BLOCK_END_PORTAL_FRAME
    )
}

/// Per-voxel data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Voxel {
    pub id: BlockId,
    pub state: BlockState,
}

impl Voxel {
    /// Air.
    pub const AIR: Voxel = Voxel::new(BLOCK_AIR);

    /// Block with default state.
    pub const fn new(id: BlockId) -> Self {
        Self { id, state: 0 }
    }

    /// Block facing `dir`.
    pub const fn facing(id: BlockId, dir: Direction) -> Self {
        Self {
            id,
            state: dir.data_3d() as BlockState,
        }
    }

    #[inline]
    pub const fn is_air(&self) -> bool {
        self.id == BLOCK_AIR
    }

    /// Fluid held by this voxel.
    #[inline]
    pub const fn fluid(&self) -> Fluid {
        fluid_of(self.id)
    }

    /// Facing stored in the state bits, if the block has one.
    pub fn direction(&self) -> Option<Direction> {
        if has_facing(self.id) {
            Some(Direction::from_3d((self.state & FACING_MASK) as usize))
        } else {
            None
        }
    }

    fn with_direction(self, dir: Direction) -> Self {
        Self {
            id: self.id,
            state: (self.state & !FACING_MASK) | dir.data_3d() as BlockState,
        }
    }

    /// Copy rotated about the vertical axis.
    pub fn rotated(self, rotation: Rotation) -> Self {
        match self.direction() {
            Some(dir) => self.with_direction(rotation.rotate(dir)),
            None => self,
        }
    }

    /// Copy mirrored across a vertical plane.
    pub fn mirrored(self, mirror: Mirror) -> Self {
        match self.direction() {
            Some(dir) => self.with_direction(mirror.mirror(dir)),
            None => self,
        }
    }
}

bitflags::bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    /// Side effects requested by a block write.
    pub struct SetBlockFlags: u8 {
        const UPDATE_NEIGHBORS = 0b0000_0001;
        const NOTIFY_CLIENTS = 0b0000_0010;
        const SKIP_LIGHTING = 0b0000_0100;
    }
}

impl SetBlockFlags {
    /// Flags used by structure painting.
    pub const STRUCTURE: SetBlockFlags = SetBlockFlags::NOTIFY_CLIENTS;
}

impl Default for SetBlockFlags {
    fn default() -> Self {
        SetBlockFlags::UPDATE_NEIGHBORS | SetBlockFlags::NOTIFY_CLIENTS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn facing_survives_rotation_cycle() {
        let stairs = Voxel::facing(BLOCK_STONE_BRICK_STAIRS, Direction::North);
        assert_eq!(
            stairs.rotated(Rotation::Clockwise90).direction(),
            Some(Direction::East)
        );
        let back = stairs
            .rotated(Rotation::Clockwise90)
            .rotated(Rotation::CounterClockwise90);
        assert_eq!(back, stairs);
    }

    #[test]
    fn blocks_without_facing_ignore_transforms() {
        let stone = Voxel::new(BLOCK_STONE);
        assert_eq!(stone.rotated(Rotation::Clockwise180), stone);
        assert_eq!(stone.mirrored(Mirror::LeftRight), stone);
        assert_eq!(stone.direction(), None);
    }

    #[test]
    fn mirror_flips_ladder() {
        let ladder = Voxel::facing(BLOCK_LADDER, Direction::South);
        assert_eq!(
            ladder.mirrored(Mirror::LeftRight).direction(),
            Some(Direction::North)
        );
    }

    #[test]
    fn fluids_are_classified() {
        assert_eq!(Voxel::new(BLOCK_WATER).fluid(), Fluid::Water);
        assert!(Voxel::new(BLOCK_STONE).fluid().is_empty());
        assert!(needs_shape_update(BLOCK_OAK_FENCE));
        assert!(!needs_shape_update(BLOCK_STONE));
    }

    #[test]
    fn test_voxel_serialization() {
        let voxel = Voxel::facing(BLOCK_CHEST, Direction::West);
        let serialized = serde_json::to_string(&voxel).unwrap();
        let deserialized: Voxel = serde_json::from_str(&serialized).unwrap();
        assert_eq!(deserialized, voxel);
    }
}
