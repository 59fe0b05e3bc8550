//! Pre-authored block patterns placed by template-backed pieces.

use crate::block::*;
use crate::grid::{place_structure_block, VoxelGrid};
use std::collections::BTreeMap;
use std::sync::Arc;
use structgen_core::{BlockPos, BoundingBox, Direction, Mirror, RandomSource, Rotation};
use thiserror::Error;
use tracing::warn;

/// Errors raised while building or looking up templates.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("template `{0}` is not registered")]
    Unknown(String),
    #[error("template `{0}` has no layers")]
    Empty(String),
    #[error("template `{name}` layer {layer} does not match the first layer's dimensions")]
    RaggedLayer { name: String, layer: usize },
}

/// One block of a template in template-local coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TemplateBlock {
    pub pos: BlockPos,
    pub voxel: Voxel,
}

/// How a template is positioned when placed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacementSettings {
    pub rotation: Rotation,
    pub mirror: Mirror,
    /// Point the rotation turns around, in template-local coordinates.
    pub pivot: BlockPos,
    /// Only blocks inside this box are written.
    pub clip: Option<BoundingBox>,
    /// Skip air blocks so the template does not carve into existing terrain.
    pub ignore_air: bool,
    /// Fraction of blocks kept; below `1.0` each block draws a random float.
    pub integrity: f32,
}

impl Default for PlacementSettings {
    fn default() -> Self {
        Self {
            rotation: Rotation::None,
            mirror: Mirror::None,
            pivot: BlockPos::ZERO,
            clip: None,
            ignore_air: false,
            integrity: 1.0,
        }
    }
}

impl PlacementSettings {
    pub fn with_rotation(mut self, rotation: Rotation) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_mirror(mut self, mirror: Mirror) -> Self {
        self.mirror = mirror;
        self
    }

    pub fn with_clip(mut self, clip: BoundingBox) -> Self {
        self.clip = Some(clip);
        self
    }

    pub fn with_ignore_air(mut self, ignore_air: bool) -> Self {
        self.ignore_air = ignore_air;
        self
    }

    pub fn with_integrity(mut self, integrity: f32) -> Self {
        self.integrity = integrity;
        self
    }

    /// Template-local position to offset from the placement origin.
    pub fn transform(&self, pos: BlockPos) -> BlockPos {
        self.rotation
            .transform(self.mirror.transform(pos), self.pivot)
    }
}

/// Sized block pattern.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    name: String,
    size: BlockPos,
    blocks: BTreeMap<BlockPos, Voxel>,
}

impl Template {
    /// Template of the given size with no blocks.
    pub fn new(name: &str, size_x: i32, size_y: i32, size_z: i32) -> Self {
        Self {
            name: name.to_string(),
            size: BlockPos::new(size_x, size_y, size_z),
            blocks: BTreeMap::new(),
        }
    }

    /// Zero-sized placeholder.
    pub fn empty(name: &str) -> Self {
        Self::new(name, 0, 0, 0)
    }

    /// Build from ASCII layers.
    ///
    /// `layers[y][z]` is a row of `size_x` bytes; `palette` returns the voxel
    /// for a byte, or `None` to leave that cell out of the template.
    pub fn from_layers(
        name: &str,
        layers: &[&[&str]],
        mut palette: impl FnMut(u8) -> Option<Voxel>,
    ) -> Result<Self, TemplateError> {
        let first = layers
            .first()
            .filter(|layer| !layer.is_empty())
            .ok_or_else(|| TemplateError::Empty(name.to_string()))?;
        let size_z = first.len();
        let size_x = first[0].len();

        let mut template = Self::new(name, size_x as i32, layers.len() as i32, size_z as i32);
        for (y, layer) in layers.iter().enumerate() {
            if layer.len() != size_z || layer.iter().any(|row| row.len() != size_x) {
                return Err(TemplateError::RaggedLayer {
                    name: name.to_string(),
                    layer: y,
                });
            }
            for (z, row) in layer.iter().enumerate() {
                for (x, byte) in row.bytes().enumerate() {
                    if let Some(voxel) = palette(byte) {
                        template.set(BlockPos::new(x as i32, y as i32, z as i32), voxel);
                    }
                }
            }
        }
        Ok(template)
    }

    /// Hollow box: `floor` on the bottom layer, `wall` on the sides, air inside.
    pub fn shell(name: &str, size_x: i32, size_y: i32, size_z: i32, wall: Voxel, floor: Voxel) -> Self {
        let mut template = Self::new(name, size_x, size_y, size_z);
        for y in 0..size_y {
            for z in 0..size_z {
                for x in 0..size_x {
                    let edge = x == 0 || z == 0 || x == size_x - 1 || z == size_z - 1;
                    let voxel = if y == 0 {
                        floor
                    } else if edge {
                        wall
                    } else {
                        Voxel::AIR
                    };
                    template.set(BlockPos::new(x, y, z), voxel);
                }
            }
        }
        template
    }

    /// Replace the block at `pos`. Positions outside the template size are ignored.
    pub fn set(&mut self, pos: BlockPos, voxel: Voxel) {
        let inside = (0..self.size.x).contains(&pos.x)
            && (0..self.size.y).contains(&pos.y)
            && (0..self.size.z).contains(&pos.z);
        if inside {
            self.blocks.insert(pos, voxel);
        }
    }

    /// Builder form of [`Template::set`].
    pub fn with_block(mut self, pos: BlockPos, voxel: Voxel) -> Self {
        self.set(pos, voxel);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Unrotated size.
    pub fn size(&self) -> BlockPos {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Blocks in template-local order.
    pub fn blocks(&self) -> impl Iterator<Item = TemplateBlock> + '_ {
        self.blocks
            .iter()
            .map(|(&pos, &voxel)| TemplateBlock { pos, voxel })
    }

    /// World box covered when placed at `origin`.
    pub fn bounding_box(&self, settings: &PlacementSettings, origin: BlockPos) -> BoundingBox {
        let far = BlockPos::new(self.size.x - 1, self.size.y - 1, self.size.z - 1);
        BoundingBox::from_corners(
            origin + settings.transform(BlockPos::ZERO),
            origin + settings.transform(far),
        )
    }

    /// Write the template into `grid`. Returns `false` for an empty template.
    pub fn place_in_world(
        &self,
        grid: &mut dyn VoxelGrid,
        origin: BlockPos,
        settings: &PlacementSettings,
        rng: &mut dyn RandomSource,
    ) -> bool {
        if self.blocks.is_empty() {
            return false;
        }
        for block in self.blocks() {
            if settings.integrity < 1.0 && rng.next_float() > settings.integrity {
                continue;
            }
            if settings.ignore_air && block.voxel.is_air() {
                continue;
            }
            let pos = origin + settings.transform(block.pos);
            if settings.clip.is_some_and(|clip| !clip.contains(pos)) {
                continue;
            }
            let voxel = block
                .voxel
                .mirrored(settings.mirror)
                .rotated(settings.rotation);
            place_structure_block(grid, pos, voxel);
        }
        true
    }
}

/// Source of named templates.
pub trait TemplateLibrary {
    /// Registered template, if any.
    fn get(&self, name: &str) -> Option<Arc<Template>>;

    /// Registered template, or an empty placeholder when the name is unknown.
    fn get_or_create(&self, name: &str) -> Arc<Template> {
        self.get(name).unwrap_or_else(|| {
            warn!(template = name, "unknown template, using empty placeholder");
            Arc::new(Template::empty(name))
        })
    }

    /// Registered template or [`TemplateError::Unknown`].
    fn require(&self, name: &str) -> Result<Arc<Template>, TemplateError> {
        self.get(name)
            .ok_or_else(|| TemplateError::Unknown(name.to_string()))
    }
}

/// Names of every end city template.
pub const END_CITY_TEMPLATES: [&str; 19] = [
    "base_floor",
    "base_roof",
    "second_floor_1",
    "second_floor_2",
    "second_roof",
    "third_floor_1",
    "third_floor_2",
    "third_roof",
    "tower_base",
    "tower_piece",
    "tower_top",
    "bridge_end",
    "bridge_piece",
    "bridge_steep_stairs",
    "bridge_gentle_stairs",
    "fat_tower_base",
    "fat_tower_middle",
    "fat_tower_top",
    "ship",
];

/// In-memory library with every template the layout generators reference.
#[derive(Debug, Clone, Default)]
pub struct BuiltinTemplates {
    templates: BTreeMap<String, Arc<Template>>,
}

impl BuiltinTemplates {
    /// Library with mansion templates sized for 8-block cells and floors.
    pub fn new() -> Self {
        Self::with_mansion_cells(8, 8)
    }

    /// Library with mansion templates sized for the given cell and floor size.
    pub fn with_mansion_cells(cell_size: i32, floor_height: i32) -> Self {
        let mut library = Self::default();
        library.register_end_city();
        library.register_mansion(cell_size, floor_height);
        library
    }

    /// Add or replace a template.
    pub fn insert(&mut self, template: Template) {
        self.templates
            .insert(template.name().to_string(), Arc::new(template));
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.templates.keys().map(String::as_str)
    }

    fn register_end_city(&mut self) {
        let purpur = Voxel::new(BLOCK_PURPUR_BLOCK);
        let pillar = Voxel::new(BLOCK_PURPUR_PILLAR);
        let bricks = Voxel::new(BLOCK_END_STONE_BRICKS);
        let sizes: [(&str, i32, i32, i32, Voxel); 17] = [
            ("base_floor", 10, 4, 10, purpur),
            ("base_roof", 12, 2, 12, purpur),
            ("second_floor_1", 12, 8, 12, purpur),
            ("second_floor_2", 12, 8, 12, purpur),
            ("second_roof", 14, 2, 14, purpur),
            ("third_floor_1", 14, 4, 14, purpur),
            ("third_floor_2", 14, 4, 14, purpur),
            ("third_roof", 16, 2, 16, purpur),
            ("tower_base", 7, 7, 7, pillar),
            ("tower_piece", 7, 4, 7, pillar),
            ("tower_top", 9, 5, 9, purpur),
            ("bridge_end", 5, 6, 2, purpur),
            ("bridge_piece", 5, 6, 4, purpur),
            ("bridge_steep_stairs", 5, 7, 4, purpur),
            ("bridge_gentle_stairs", 5, 7, 8, purpur),
            ("fat_tower_base", 13, 4, 13, pillar),
            ("fat_tower_middle", 13, 8, 13, pillar),
        ];
        for (name, x, y, z, wall) in sizes {
            self.insert(Template::shell(name, x, y, z, wall, bricks));
        }
        self.insert(
            Template::shell("fat_tower_top", 17, 6, 17, purpur, bricks)
                .with_block(BlockPos::new(8, 5, 8), Voxel::new(BLOCK_END_ROD)),
        );
        self.insert(
            Template::shell("ship", 13, 24, 29, purpur, purpur)
                .with_block(BlockPos::new(6, 1, 14), Voxel::facing(BLOCK_CHEST, Direction::North)),
        );
    }

    fn register_mansion(&mut self, cell: i32, floor: i32) {
        let log = Voxel::new(BLOCK_DARK_OAK_LOG);
        let planks = Voxel::new(BLOCK_DARK_OAK_PLANKS);
        let birch = Voxel::new(BLOCK_BIRCH_PLANKS);
        let wool = Voxel::new(BLOCK_WHITE_WOOL);
        let pane = Voxel::new(BLOCK_GLASS_PANE);
        let mid = cell / 2;

        self.insert(Template::shell("corridor_floor", cell, 1, cell, birch, birch));
        self.insert(Template::shell("roof", cell, 1, cell, planks, planks));
        self.insert(Template::shell("wall_flat", cell, floor, 1, log, log));

        let mut window = Template::shell("wall_window", cell, floor, 1, log, log);
        for y in 2..floor.min(5) {
            for x in (mid - 1)..=mid {
                window.set(BlockPos::new(x, y, 0), pane);
            }
        }
        self.insert(window);

        let mut door = Template::shell("door", cell, floor, 1, log, log);
        for y in 1..floor.min(4) {
            for x in (mid - 1)..=mid {
                door.set(BlockPos::new(x, y, 0), Voxel::AIR);
            }
        }
        self.insert(door);

        let mut entrance = Template::shell("entrance", cell, floor, cell, log, planks);
        for y in 1..floor.min(5) {
            for x in (mid - 1)..=mid {
                entrance.set(BlockPos::new(x, y, 0), Voxel::AIR);
            }
        }
        self.insert(entrance);

        let mut stairs = Template::shell("stairs", cell, floor, cell, planks, planks);
        for step in 1..floor.min(cell - 1) {
            stairs.set(
                BlockPos::new(1, step, step),
                Voxel::facing(BLOCK_OAK_STAIRS, Direction::South),
            );
        }
        self.insert(stairs);

        self.insert(Template::shell("1x1_a", cell, floor, cell, planks, wool));
        self.insert(Template::shell("1x2_a", cell * 2, floor, cell, planks, wool));
        self.insert(Template::shell("2x2_a", cell * 2, floor, cell * 2, planks, wool));
    }
}

impl TemplateLibrary for BuiltinTemplates {
    fn get(&self, name: &str) -> Option<Arc<Template>> {
        self.templates.get(name).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::{ChunkedGrid, FlatFill};
    use structgen_core::StructureRng;

    const LAYER0: [&str; 2] = ["ab", "cd"];
    const VOLUME: [&[&str]; 1] = [&LAYER0];

    fn voxel_for_byte(byte: u8) -> Option<Voxel> {
        let id = match byte {
            b'a' => BLOCK_STONE,
            b'b' => BLOCK_DIRT,
            b'c' => BLOCK_GRAVEL,
            b'd' => BLOCK_COBBLESTONE,
            _ => return None,
        };
        Some(Voxel::new(id))
    }

    #[test]
    fn template_rotation_maps_expected_positions() {
        let template = Template::from_layers("tiny", &VOLUME, voxel_for_byte).unwrap();
        let mut grid = ChunkedGrid::new(FlatFill::stone(0));
        let settings = PlacementSettings::default().with_rotation(Rotation::Clockwise90);
        let mut rng = StructureRng::new(1);
        let origin = BlockPos::new(1, 64, 0);
        assert!(template.place_in_world(&mut grid, origin, &settings, &mut rng));

        // z=0: a b        x'=-z
        // z=1: c d   ->   z'= x
        let positions = [
            (1, 0, BLOCK_STONE),
            (1, 1, BLOCK_DIRT),
            (0, 0, BLOCK_GRAVEL),
            (0, 1, BLOCK_COBBLESTONE),
        ];
        for (wx, wz, id) in positions {
            assert_eq!(
                grid.get_block(BlockPos::new(wx, 64, wz)).id,
                id,
                "mismatch at ({wx},{wz})"
            );
        }
        assert_eq!(
            template.bounding_box(&settings, origin).to_array(),
            [0, 64, 0, 1, 64, 1]
        );
    }

    #[test]
    fn ragged_layers_are_rejected() {
        let layer0: [&str; 2] = ["ab", "cd"];
        let layer1: [&str; 1] = ["ab"];
        let volume: [&[&str]; 2] = [&layer0, &layer1];
        assert_eq!(
            Template::from_layers("bad", &volume, voxel_for_byte),
            Err(TemplateError::RaggedLayer {
                name: "bad".into(),
                layer: 1
            })
        );
        assert_eq!(
            Template::from_layers("none", &[], voxel_for_byte),
            Err(TemplateError::Empty("none".into()))
        );
    }

    #[test]
    fn clip_and_ignore_air_limit_writes() {
        let template = Template::shell("box", 4, 3, 4, Voxel::new(BLOCK_STONE), Voxel::new(BLOCK_DIRT));
        let mut grid = ChunkedGrid::new(FlatFill::stone(0));
        grid.set_block(BlockPos::new(1, 11, 1), Voxel::new(BLOCK_GRAVEL), SetBlockFlags::STRUCTURE);
        let clip = BoundingBox::new(0, 10, 0, 1, 12, 3);
        let settings = PlacementSettings::default()
            .with_clip(clip)
            .with_ignore_air(true);
        let mut rng = StructureRng::new(1);
        template.place_in_world(&mut grid, BlockPos::new(0, 10, 0), &settings, &mut rng);

        assert_eq!(grid.get_block(BlockPos::new(0, 10, 0)).id, BLOCK_DIRT);
        assert!(grid.get_block(BlockPos::new(2, 10, 0)).is_air());
        assert_eq!(grid.get_block(BlockPos::new(1, 11, 1)).id, BLOCK_GRAVEL);
    }

    #[test]
    fn zero_integrity_places_nothing() {
        let template = Template::shell("box", 2, 2, 2, Voxel::new(BLOCK_STONE), Voxel::new(BLOCK_STONE));
        let mut grid = ChunkedGrid::new(FlatFill::stone(0));
        let settings = PlacementSettings::default().with_integrity(0.0);
        let mut rng = StructureRng::new(3);
        assert!(template.place_in_world(&mut grid, BlockPos::new(0, 5, 0), &settings, &mut rng));
        assert_eq!(grid.chunks().count(), 0);
    }

    #[test]
    fn facing_blocks_follow_rotation() {
        let template = Template::new("chest", 1, 1, 1)
            .with_block(BlockPos::ZERO, Voxel::facing(BLOCK_CHEST, Direction::North));
        let mut grid = ChunkedGrid::new(FlatFill::stone(0));
        let settings = PlacementSettings::default().with_rotation(Rotation::Clockwise90);
        let mut rng = StructureRng::new(3);
        template.place_in_world(&mut grid, BlockPos::new(3, 3, 3), &settings, &mut rng);
        assert_eq!(
            grid.get_block(BlockPos::new(3, 3, 3)).direction(),
            Some(Direction::East)
        );
    }

    #[test]
    fn builtin_library_knows_every_end_city_name() {
        let library = BuiltinTemplates::new();
        for name in END_CITY_TEMPLATES {
            assert!(library.require(name).is_ok(), "{name}");
        }
        assert_eq!(
            library.require("igloo"),
            Err(TemplateError::Unknown("igloo".into()))
        );
        assert!(library.get_or_create("igloo").is_empty());
    }
}
