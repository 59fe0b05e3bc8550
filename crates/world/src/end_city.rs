//! End city layout built from named templates.
//!
//! Sections (house towers, towers, bridges and fat towers) call each other
//! through [`CityBuilder::recursive_children`]. Each call adds one group of
//! pieces stamped with a fresh batch; the group is kept only if none of its
//! pieces collides with anything outside its own batch or its parent's.

use crate::config::EndCityConfig;
use crate::piece::{Piece, PieceKind, TemplateRef};
use crate::structure_start::{StructurePieces, StructureStart};
use crate::structure_template::TemplateLibrary;
use crate::structures::{StructureFamily, StructureGenerator};
use std::sync::Arc;
use structgen_core::{BlockPos, ChunkPos, RandomSource, Rotation};
use tracing::debug;

/// Batch of the fixed base pieces.
const BASE_BATCH: i32 = 0;

/// Bridge sockets around a tower piece.
const TOWER_BRIDGES: [(Rotation, BlockPos); 4] = [
    (Rotation::None, BlockPos::new(1, -1, 0)),
    (Rotation::Clockwise90, BlockPos::new(6, -1, 1)),
    (Rotation::CounterClockwise90, BlockPos::new(0, -1, 5)),
    (Rotation::Clockwise180, BlockPos::new(5, -1, 6)),
];

/// Bridge sockets around a fat tower floor.
const FAT_TOWER_BRIDGES: [(Rotation, BlockPos); 4] = [
    (Rotation::None, BlockPos::new(4, -1, 0)),
    (Rotation::Clockwise90, BlockPos::new(12, -1, 4)),
    (Rotation::CounterClockwise90, BlockPos::new(0, -1, 8)),
    (Rotation::Clockwise180, BlockPos::new(8, -1, 12)),
];

/// Section kinds that grow a city.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    HouseTower,
    Tower,
    TowerBridge,
    FatTower,
}

#[derive(Debug, Clone, Copy)]
struct Group {
    batch: i32,
    parent_batch: Option<i32>,
    depth: i32,
}

/// Mutable state of one city layout.
pub struct CityBuilder<'a> {
    templates: &'a dyn TemplateLibrary,
    rng: &'a mut dyn RandomSource,
    max_depth: i32,
    pieces: StructurePieces,
    group: Group,
    ship_created: bool,
}

impl<'a> CityBuilder<'a> {
    pub fn new(templates: &'a dyn TemplateLibrary, rng: &'a mut dyn RandomSource, max_depth: i32) -> Self {
        Self {
            templates,
            rng,
            max_depth,
            pieces: StructurePieces::new(),
            group: Group {
                batch: BASE_BATCH,
                parent_batch: None,
                depth: 0,
            },
            ship_created: false,
        }
    }

    pub fn pieces(&self) -> &StructurePieces {
        &self.pieces
    }

    pub fn into_pieces(self) -> StructurePieces {
        self.pieces
    }

    /// True once a ship has been placed in this city.
    pub fn ship_created(&self) -> bool {
        self.ship_created
    }

    /// Add a template piece at `position` to the current group.
    pub fn add_root(&mut self, name: &str, position: BlockPos, rotation: Rotation, overwrite: bool) -> TemplateRef {
        let template = TemplateRef::new(name, position, rotation).with_ignore_air(!overwrite);
        let bb = self
            .templates
            .get_or_create(name)
            .bounding_box(&template.settings(), position);
        let piece = Piece::new(
            PieceKind::EndCity {
                template: template.clone(),
                parent_batch: self.group.parent_batch,
            },
            bb,
            None,
            self.group.depth,
        )
        .with_batch(self.group.batch);
        self.pieces.push(piece);
        template
    }

    /// Add a template attached to `parent` at `offset` in the parent's frame.
    pub fn add_piece(
        &mut self,
        parent: &TemplateRef,
        offset: BlockPos,
        name: &str,
        rotation: Rotation,
        overwrite: bool,
    ) -> TemplateRef {
        let position = parent.position + parent.rotation.transform(offset, BlockPos::ZERO);
        self.add_root(name, position, rotation, overwrite)
    }

    /// Grow `section` from `parent` as a new all-or-nothing group.
    ///
    /// Returns `false` when the depth bound is hit, the section gives up, or
    /// the group collides; nothing from the group is kept in that case.
    pub fn recursive_children(
        &mut self,
        section: Section,
        counter: i32,
        parent: &TemplateRef,
        offset: BlockPos,
    ) -> bool {
        if counter > self.max_depth {
            return false;
        }
        let batch = self.rng.next_i32();
        let outer = self.group;
        self.group = Group {
            batch,
            parent_batch: Some(outer.batch),
            depth: counter,
        };
        let mark = self.pieces.len();
        let kept = self.generate_section(section, counter, parent, offset)
            && self.group_fits(mark, batch, outer.batch);
        self.group = outer;
        if !kept {
            self.pieces.truncate(mark);
        }
        kept
    }

    fn group_fits(&self, mark: usize, batch: i32, parent_batch: i32) -> bool {
        self.pieces.pieces()[mark..]
            .iter()
            .filter(|piece| piece.batch() == Some(batch))
            .all(|piece| {
                self.pieces
                    .find_collision_outside_batch(piece.bounding_box(), batch, Some(parent_batch))
                    .is_none()
            })
    }

    fn generate_section(&mut self, section: Section, counter: i32, parent: &TemplateRef, offset: BlockPos) -> bool {
        match section {
            Section::HouseTower => self.house_tower(counter, parent, offset),
            Section::Tower => self.tower(counter, parent),
            Section::TowerBridge => self.tower_bridge(counter, parent),
            Section::FatTower => self.fat_tower(counter, parent),
        }
    }

    fn house_tower(&mut self, counter: i32, parent: &TemplateRef, offset: BlockPos) -> bool {
        if counter > self.max_depth {
            return false;
        }
        let rot = parent.rotation;
        let base = self.add_piece(parent, offset, "base_floor", rot, true);
        match self.rng.next_int(3) {
            0 => {
                self.add_piece(&base, BlockPos::new(-1, 4, -1), "base_roof", rot, true);
            }
            1 => {
                let floor = self.add_piece(&base, BlockPos::new(-1, 0, -1), "second_floor_2", rot, false);
                let roof = self.add_piece(&floor, BlockPos::new(-1, 8, -1), "second_roof", rot, false);
                self.recursive_children(Section::Tower, counter + 1, &roof, BlockPos::ZERO);
            }
            _ => {
                let floor = self.add_piece(&base, BlockPos::new(-1, 0, -1), "second_floor_2", rot, false);
                let floor = self.add_piece(&floor, BlockPos::new(-1, 4, -1), "third_floor_2", rot, false);
                let roof = self.add_piece(&floor, BlockPos::new(-1, 8, -1), "third_roof", rot, true);
                self.recursive_children(Section::Tower, counter + 1, &roof, BlockPos::ZERO);
            }
        }
        true
    }

    fn tower(&mut self, counter: i32, parent: &TemplateRef) -> bool {
        let rot = parent.rotation;
        let base_offset = BlockPos::new(3 + self.rng.next_int(2), -3, 3 + self.rng.next_int(2));
        let base = self.add_piece(parent, base_offset, "tower_base", rot, true);
        let mut top = self.add_piece(&base, BlockPos::new(0, 7, 0), "tower_piece", rot, true);
        let mut bridge_floor = (self.rng.next_int(3) == 0).then(|| top.clone());
        let floors = 1 + self.rng.next_int(3);
        for floor in 0..floors {
            top = self.add_piece(&top, BlockPos::new(0, 4, 0), "tower_piece", rot, true);
            if floor < floors - 1 && self.rng.next_bool() {
                bridge_floor = Some(top.clone());
            }
        }

        match bridge_floor {
            Some(floor) => {
                for (turn, socket) in TOWER_BRIDGES {
                    if self.rng.next_bool() {
                        let end = self.add_piece(&floor, socket, "bridge_end", rot.rotated(turn), true);
                        self.recursive_children(Section::TowerBridge, counter + 1, &end, BlockPos::ZERO);
                    }
                }
            }
            None if counter != self.max_depth - 1 => {
                return self.recursive_children(Section::FatTower, counter + 1, &top, BlockPos::ZERO);
            }
            None => {}
        }
        self.add_piece(&top, BlockPos::new(-1, 4, -1), "tower_top", rot, true);
        true
    }

    fn tower_bridge(&mut self, counter: i32, parent: &TemplateRef) -> bool {
        let rot = parent.rotation;
        let spans = self.rng.next_int(4) + 1;
        let mut piece = self.add_piece(parent, BlockPos::new(0, 0, -4), "bridge_piece", rot, true);
        let mut rise = 0;
        for _ in 0..spans {
            if self.rng.next_bool() {
                piece = self.add_piece(&piece, BlockPos::new(0, rise, -4), "bridge_piece", rot, true);
                rise = 0;
            } else {
                piece = if self.rng.next_bool() {
                    self.add_piece(&piece, BlockPos::new(0, rise, -4), "bridge_steep_stairs", rot, true)
                } else {
                    self.add_piece(&piece, BlockPos::new(0, rise, -8), "bridge_gentle_stairs", rot, true)
                };
                rise = 4;
            }
        }

        if !self.ship_created && self.rng.next_int(10 - counter) == 0 {
            let offset = BlockPos::new(-8 + self.rng.next_int(8), rise, -70 + self.rng.next_int(10));
            self.add_piece(&piece, offset, "ship", rot, true);
            self.ship_created = true;
            debug!(counter, "end city ship placed");
        } else if !self.recursive_children(
            Section::HouseTower,
            counter + 1,
            &piece,
            BlockPos::new(-3, rise + 1, -11),
        ) {
            return false;
        }

        self.add_piece(&piece, BlockPos::new(4, rise, 0), "bridge_end", rot.rotated(Rotation::Clockwise180), true);
        true
    }

    fn fat_tower(&mut self, counter: i32, parent: &TemplateRef) -> bool {
        let rot = parent.rotation;
        let base = self.add_piece(parent, BlockPos::new(-3, 4, -3), "fat_tower_base", rot, true);
        let mut top = self.add_piece(&base, BlockPos::new(0, 4, 0), "fat_tower_middle", rot, true);
        let mut floor = 0;
        while floor < 2 && self.rng.next_int(3) != 0 {
            top = self.add_piece(&top, BlockPos::new(0, 8, 0), "fat_tower_middle", rot, true);
            for (turn, socket) in FAT_TOWER_BRIDGES {
                if self.rng.next_bool() {
                    let end = self.add_piece(&top, socket, "bridge_end", rot.rotated(turn), true);
                    self.recursive_children(Section::TowerBridge, counter + 1, &end, BlockPos::ZERO);
                }
            }
            floor += 1;
        }
        self.add_piece(&top, BlockPos::new(-2, 8, -2), "fat_tower_top", rot, true);
        true
    }
}

/// End city generator.
pub struct EndCityGenerator {
    max_depth: i32,
    base_y: i32,
    templates: Arc<dyn TemplateLibrary>,
}

impl EndCityGenerator {
    pub fn new(config: &EndCityConfig, templates: Arc<dyn TemplateLibrary>) -> Self {
        Self {
            max_depth: config.max_depth,
            base_y: config.base_y,
            templates,
        }
    }
}

impl StructureGenerator for EndCityGenerator {
    fn family(&self) -> StructureFamily {
        StructureFamily::EndCity
    }

    fn generate(&self, chunk: ChunkPos, rng: &mut dyn RandomSource) -> Option<StructureStart> {
        let rotation = Rotation::random(rng);
        let origin = BlockPos::new(chunk.block_x(8), self.base_y, chunk.block_z(8));
        let mut city = CityBuilder::new(self.templates.as_ref(), rng, self.max_depth);
        let base = city.add_root("base_floor", origin, rotation, true);
        let floor = city.add_piece(&base, BlockPos::new(-1, 0, -1), "second_floor_1", rotation, false);
        let floor = city.add_piece(&floor, BlockPos::new(-1, 4, -1), "third_floor_1", rotation, false);
        let roof = city.add_piece(&floor, BlockPos::new(-1, 8, -1), "third_roof", rotation, true);
        city.recursive_children(Section::Tower, 1, &roof, BlockPos::ZERO);
        city.into_pieces().build(StructureFamily::EndCity, chunk)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::overlapping_pairs;
    use crate::structure_template::BuiltinTemplates;
    use structgen_core::{BoundingBox, StructureRng};

    fn generator() -> EndCityGenerator {
        EndCityGenerator::new(&EndCityConfig::default(), Arc::new(BuiltinTemplates::new()))
    }

    fn template_name(piece: &Piece) -> &str {
        match piece.kind() {
            PieceKind::EndCity { template, .. } => &template.name,
            other => panic!("unexpected kind {other:?}"),
        }
    }

    #[test]
    fn city_starts_with_the_base_stack() {
        let start = generator()
            .generate(ChunkPos::new(3, 5), &mut StructureRng::new(12))
            .expect("base pieces always exist");
        let names: Vec<&str> = start.pieces().iter().take(4).map(template_name).collect();
        assert_eq!(names, ["base_floor", "second_floor_1", "third_floor_1", "third_roof"]);
        assert!(start.pieces().iter().take(4).all(|p| p.batch() == Some(BASE_BATCH)));
    }

    #[test]
    fn groups_never_overlap_foreign_batches() {
        for seed in 0..40 {
            let start = generator()
                .generate(ChunkPos::new(-2, 9), &mut StructureRng::new(seed))
                .expect("base pieces always exist");
            assert!(overlapping_pairs(start.pieces()).is_empty(), "seed {seed}");
            assert!(start.pieces().iter().all(|p| p.gen_depth() <= 8));
            let ships = start.pieces().iter().filter(|p| template_name(p) == "ship").count();
            assert!(ships <= 1);
        }
    }

    #[test]
    fn non_overwriting_floors_ignore_air() {
        let start = generator()
            .generate(ChunkPos::new(0, 0), &mut StructureRng::new(1))
            .expect("base pieces always exist");
        match start.pieces()[1].kind() {
            PieceKind::EndCity { template, .. } => assert!(template.ignore_air),
            other => panic!("unexpected kind {other:?}"),
        }
    }

    #[test]
    fn colliding_group_is_rolled_back() {
        let templates = BuiltinTemplates::new();
        let mut rng = StructureRng::new(4);
        let mut city = CityBuilder::new(&templates, &mut rng, 8);
        let roof = city.add_root("third_roof", BlockPos::new(0, 64, 0), Rotation::None, true);
        city.pieces.push(Piece::new(
            PieceKind::MineshaftStairs,
            BoundingBox::new(-40, 0, -40, 40, 200, 40),
            None,
            0,
        ));
        let before = city.pieces().len();
        assert!(!city.recursive_children(Section::Tower, 1, &roof, BlockPos::ZERO));
        assert_eq!(city.pieces().len(), before);
    }

    #[test]
    fn depth_bound_rejects_without_drawing() {
        let templates = BuiltinTemplates::new();
        let mut rng = StructureRng::new(4);
        let mut city = CityBuilder::new(&templates, &mut rng, 8);
        let roof = city.add_root("third_roof", BlockPos::new(0, 64, 0), Rotation::None, true);
        assert!(!city.recursive_children(Section::Tower, 9, &roof, BlockPos::ZERO));
        assert_eq!(city.pieces().len(), 1);
    }

    #[test]
    fn attached_pieces_follow_parent_rotation() {
        let templates = BuiltinTemplates::new();
        let mut rng = StructureRng::new(4);
        let mut city = CityBuilder::new(&templates, &mut rng, 8);
        let base = city.add_root("base_floor", BlockPos::new(10, 64, 10), Rotation::Clockwise90, true);
        let child = city.add_piece(&base, BlockPos::new(-1, 0, -1), "second_floor_1", Rotation::Clockwise90, false);
        assert_eq!(child.position, BlockPos::new(11, 64, 9));
    }
}
