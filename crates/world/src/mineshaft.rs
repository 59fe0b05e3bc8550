//! Mineshaft layout: rooms, corridors, crossings and stairs, and how each is painted.

use crate::block::*;
use crate::config::GenerationConfig;
use crate::piece::{Painter, Piece, PieceKind};
use crate::structure_start::{StructurePieces, StructureStart};
use crate::structures::{StructureFamily, StructureGenerator};
use structgen_core::{Axis, BoundingBox, ChunkPos, Direction, RandomSource};

const CORRIDOR_SECTION_LENGTH: i32 = 5;

/// Branching mineshaft: a dirt room feeding corridors, crossings and stairs.
///
/// Every branch is accepted only if it collides with nothing already placed
/// and stays within `max_distance` blocks of the starting room.
#[derive(Debug, Clone, Copy)]
pub struct MineshaftGenerator {
    max_depth: i32,
    max_distance: i32,
    sea_level: i32,
    min_y: i32,
    sea_level_offset: i32,
}

impl MineshaftGenerator {
    pub fn new(config: &GenerationConfig) -> Self {
        Self {
            max_depth: config.mineshaft.max_depth,
            max_distance: config.mineshaft.max_distance,
            sea_level: config.sea_level,
            min_y: config.min_y,
            sea_level_offset: config.mineshaft.sea_level_offset,
        }
    }

    /// Expand the full piece tree without sinking it below sea level.
    pub fn layout(&self, chunk: ChunkPos, rng: &mut dyn RandomSource) -> StructurePieces {
        let x = chunk.block_x(2);
        let z = chunk.block_z(2);
        let room_box = BoundingBox::new(
            x,
            50,
            z,
            x + 7 + rng.next_int(6),
            54 + rng.next_int(6),
            z + 7 + rng.next_int(6),
        );
        let mut expansion = Expansion {
            generator: self,
            pieces: StructurePieces::new(),
            rng,
            origin: room_box,
        };
        expansion.pieces.push(Piece::new(
            PieceKind::MineshaftRoom {
                entrances: Vec::new(),
            },
            room_box,
            None,
            0,
        ));
        let entrances = expansion.add_room_children(&room_box, 0);
        if let Some(room) = expansion.pieces.get_mut(0) {
            *room.kind_mut() = PieceKind::MineshaftRoom { entrances };
        }
        expansion.pieces
    }
}

impl StructureGenerator for MineshaftGenerator {
    fn family(&self) -> StructureFamily {
        StructureFamily::Mineshaft
    }

    fn generate(&self, chunk: ChunkPos, rng: &mut dyn RandomSource) -> Option<StructureStart> {
        let mut pieces = self.layout(chunk, rng);
        pieces.move_below_sea_level(self.sea_level, self.min_y, rng, self.sea_level_offset);
        pieces.build(StructureFamily::Mineshaft, chunk)
    }
}

/// Candidate corridor box growing from `(x, y, z)` towards `dir`.
///
/// Tries up to three sections, shrinking by one on every collision.
pub fn find_corridor_size(
    pieces: &StructurePieces,
    rng: &mut dyn RandomSource,
    x: i32,
    y: i32,
    z: i32,
    dir: Direction,
) -> Option<BoundingBox> {
    let mut sections = rng.next_int(3) + 1;
    while sections > 0 {
        let len = sections * CORRIDOR_SECTION_LENGTH;
        let bb = match dir {
            Direction::South => BoundingBox::new(0, 0, 0, 2, 2, len - 1),
            Direction::West => BoundingBox::new(-(len - 1), 0, 0, 0, 2, 2),
            Direction::East => BoundingBox::new(0, 0, 0, len - 1, 2, 2),
            _ => BoundingBox::new(0, 0, -(len - 1), 2, 2, 0),
        }
        .translated(x, y, z);
        if pieces.find_collision(&bb).is_none() {
            return Some(bb);
        }
        sections -= 1;
    }
    None
}

fn find_crossing(
    pieces: &StructurePieces,
    rng: &mut dyn RandomSource,
    x: i32,
    y: i32,
    z: i32,
    dir: Direction,
) -> Option<BoundingBox> {
    let top = if rng.next_int(4) == 0 { 6 } else { 2 };
    let bb = match dir {
        Direction::South => BoundingBox::new(-1, 0, 0, 3, top, 4),
        Direction::West => BoundingBox::new(-4, 0, -1, 0, top, 3),
        Direction::East => BoundingBox::new(0, 0, -1, 4, top, 3),
        _ => BoundingBox::new(-1, 0, -4, 3, top, 0),
    }
    .translated(x, y, z);
    pieces.find_collision(&bb).is_none().then_some(bb)
}

fn find_stairs(pieces: &StructurePieces, x: i32, y: i32, z: i32, dir: Direction) -> Option<BoundingBox> {
    let bb = match dir {
        Direction::South => BoundingBox::new(0, -5, 0, 2, 2, 8),
        Direction::West => BoundingBox::new(-8, -5, 0, 0, 2, 2),
        Direction::East => BoundingBox::new(0, -5, 0, 8, 2, 2),
        _ => BoundingBox::new(0, -5, -8, 2, 2, 0),
    }
    .translated(x, y, z);
    pieces.find_collision(&bb).is_none().then_some(bb)
}

fn corridor_piece(
    rng: &mut dyn RandomSource,
    bb: BoundingBox,
    dir: Direction,
    depth: i32,
) -> Piece {
    let has_rails = rng.next_int(3) == 0;
    let has_spiders = !has_rails && rng.next_int(23) == 0;
    let span = match dir.axis() {
        Axis::Z => bb.z_span(),
        _ => bb.x_span(),
    };
    Piece::new(
        PieceKind::MineshaftCorridor {
            has_rails,
            has_spiders,
            num_sections: span / CORRIDOR_SECTION_LENGTH,
        },
        bb,
        Some(dir),
        depth,
    )
}

struct Expansion<'g, 'r> {
    generator: &'g MineshaftGenerator,
    pieces: StructurePieces,
    rng: &'r mut dyn RandomSource,
    origin: BoundingBox,
}

impl Expansion<'_, '_> {
    /// Add one random piece at the doorway and recurse into it.
    fn generate_and_add(
        &mut self,
        x: i32,
        y: i32,
        z: i32,
        dir: Direction,
        depth: i32,
    ) -> Option<BoundingBox> {
        if depth > self.generator.max_depth {
            return None;
        }
        let reach = self.generator.max_distance;
        if (x - self.origin.min_x()).abs() > reach || (z - self.origin.min_z()).abs() > reach {
            return None;
        }
        let piece = self.create_random_piece(x, y, z, dir, depth + 1)?;
        let bb = *piece.bounding_box();
        self.pieces.push(piece.clone());
        self.add_children(&piece);
        Some(bb)
    }

    fn create_random_piece(
        &mut self,
        x: i32,
        y: i32,
        z: i32,
        dir: Direction,
        depth: i32,
    ) -> Option<Piece> {
        let roll = self.rng.next_int(100);
        if roll >= 80 {
            let bb = find_crossing(&self.pieces, self.rng, x, y, z, dir)?;
            Some(Piece::new(
                PieceKind::MineshaftCrossing {
                    direction: dir,
                    two_floors: bb.y_span() > 3,
                },
                bb,
                None,
                depth,
            ))
        } else if roll >= 70 {
            let bb = find_stairs(&self.pieces, x, y, z, dir)?;
            Some(Piece::new(PieceKind::MineshaftStairs, bb, Some(dir), depth))
        } else {
            let bb = find_corridor_size(&self.pieces, self.rng, x, y, z, dir)?;
            Some(corridor_piece(self.rng, bb, dir, depth))
        }
    }

    fn add_children(&mut self, piece: &Piece) {
        let bb = *piece.bounding_box();
        let depth = piece.gen_depth();
        match piece.kind() {
            PieceKind::MineshaftCorridor { .. } => {
                if let Some(dir) = piece.orientation() {
                    self.add_corridor_children(&bb, dir, depth);
                }
            }
            PieceKind::MineshaftCrossing {
                direction,
                two_floors,
            } => self.add_crossing_children(&bb, *direction, *two_floors, depth),
            PieceKind::MineshaftStairs => {
                if let Some(dir) = piece.orientation() {
                    let (x, z) = match dir {
                        Direction::South => (bb.min_x(), bb.max_z() + 1),
                        Direction::West => (bb.min_x() - 1, bb.min_z()),
                        Direction::East => (bb.max_x() + 1, bb.min_z()),
                        _ => (bb.min_x(), bb.min_z() - 1),
                    };
                    self.generate_and_add(x, bb.min_y(), z, dir, depth);
                }
            }
            _ => {}
        }
    }

    /// Children along all four room walls; returns the carved entrance boxes.
    fn add_room_children(&mut self, bb: &BoundingBox, depth: i32) -> Vec<BoundingBox> {
        let mut entrances = Vec::new();
        let rise = (bb.y_span() - 3 - 1).max(1);

        let x_span = bb.x_span();
        let mut k = 0;
        while k < x_span {
            k += self.rng.next_int(x_span);
            if k + 3 > x_span {
                break;
            }
            let y = bb.min_y() + self.rng.next_int(rise) + 1;
            if let Some(child) =
                self.generate_and_add(bb.min_x() + k, y, bb.min_z() - 1, Direction::North, depth)
            {
                entrances.push(BoundingBox::new(
                    child.min_x(),
                    child.min_y(),
                    bb.min_z(),
                    child.max_x(),
                    child.max_y(),
                    bb.min_z() + 1,
                ));
            }
            k += 4;
        }

        let mut k = 0;
        while k < x_span {
            k += self.rng.next_int(x_span);
            if k + 3 > x_span {
                break;
            }
            let y = bb.min_y() + self.rng.next_int(rise) + 1;
            if let Some(child) =
                self.generate_and_add(bb.min_x() + k, y, bb.max_z() + 1, Direction::South, depth)
            {
                entrances.push(BoundingBox::new(
                    child.min_x(),
                    child.min_y(),
                    bb.max_z() - 1,
                    child.max_x(),
                    child.max_y(),
                    bb.max_z(),
                ));
            }
            k += 4;
        }

        let z_span = bb.z_span();
        let mut k = 0;
        while k < z_span {
            k += self.rng.next_int(z_span);
            if k + 3 > z_span {
                break;
            }
            let y = bb.min_y() + self.rng.next_int(rise) + 1;
            if let Some(child) =
                self.generate_and_add(bb.min_x() - 1, y, bb.min_z() + k, Direction::West, depth)
            {
                entrances.push(BoundingBox::new(
                    bb.min_x(),
                    child.min_y(),
                    child.min_z(),
                    bb.min_x() + 1,
                    child.max_y(),
                    child.max_z(),
                ));
            }
            k += 4;
        }

        let mut k = 0;
        while k < z_span {
            k += self.rng.next_int(z_span);
            if k + 3 > z_span {
                break;
            }
            let y = bb.min_y() + self.rng.next_int(rise) + 1;
            if let Some(child) =
                self.generate_and_add(bb.max_x() + 1, y, bb.min_z() + k, Direction::East, depth)
            {
                entrances.push(BoundingBox::new(
                    bb.max_x() - 1,
                    child.min_y(),
                    child.min_z(),
                    bb.max_x(),
                    child.max_y(),
                    child.max_z(),
                ));
            }
            k += 4;
        }

        entrances
    }

    fn add_corridor_children(&mut self, bb: &BoundingBox, dir: Direction, depth: i32) {
        let choice = self.rng.next_int(4);
        let y = bb.min_y() - 1 + self.rng.next_int(3);
        let (x, z, next) = match dir {
            Direction::South => match choice {
                0 | 1 => (bb.min_x(), bb.max_z() + 1, Direction::South),
                2 => (bb.min_x() - 1, bb.max_z() - 3, Direction::West),
                _ => (bb.max_x() + 1, bb.max_z() - 3, Direction::East),
            },
            Direction::West => match choice {
                0 | 1 => (bb.min_x() - 1, bb.min_z(), Direction::West),
                2 => (bb.min_x(), bb.min_z() - 1, Direction::North),
                _ => (bb.min_x(), bb.max_z() + 1, Direction::South),
            },
            Direction::East => match choice {
                0 | 1 => (bb.max_x() + 1, bb.min_z(), Direction::East),
                2 => (bb.max_x() - 3, bb.min_z() - 1, Direction::North),
                _ => (bb.max_x() - 3, bb.max_z() + 1, Direction::South),
            },
            _ => match choice {
                0 | 1 => (bb.min_x(), bb.min_z() - 1, Direction::North),
                2 => (bb.min_x() - 1, bb.min_z(), Direction::West),
                _ => (bb.max_x() + 1, bb.min_z(), Direction::East),
            },
        };
        self.generate_and_add(x, y, z, next, depth);

        if depth >= self.generator.max_depth {
            return;
        }
        if dir.axis() == Axis::Z {
            let mut k = bb.min_z() + 3;
            while k + 3 <= bb.max_z() {
                match self.rng.next_int(5) {
                    0 => {
                        self.generate_and_add(bb.min_x() - 1, bb.min_y(), k, Direction::West, depth + 1);
                    }
                    1 => {
                        self.generate_and_add(bb.max_x() + 1, bb.min_y(), k, Direction::East, depth + 1);
                    }
                    _ => {}
                }
                k += 5;
            }
        } else {
            let mut k = bb.min_x() + 3;
            while k + 3 <= bb.max_x() {
                match self.rng.next_int(5) {
                    0 => {
                        self.generate_and_add(k, bb.min_y(), bb.min_z() - 1, Direction::North, depth + 1);
                    }
                    1 => {
                        self.generate_and_add(k, bb.min_y(), bb.max_z() + 1, Direction::South, depth + 1);
                    }
                    _ => {}
                }
                k += 5;
            }
        }
    }

    fn add_crossing_children(
        &mut self,
        bb: &BoundingBox,
        direction: Direction,
        two_floors: bool,
        depth: i32,
    ) {
        let (x0, y0, z0) = (bb.min_x(), bb.min_y(), bb.min_z());
        let (x1, z1) = (bb.max_x(), bb.max_z());
        let north = (x0 + 1, z0 - 1, Direction::North);
        let south = (x0 + 1, z1 + 1, Direction::South);
        let west = (x0 - 1, z0 + 1, Direction::West);
        let east = (x1 + 1, z0 + 1, Direction::East);
        let exits = match direction {
            Direction::South => [south, west, east],
            Direction::West => [north, south, west],
            Direction::East => [north, south, east],
            _ => [north, west, east],
        };
        for (x, z, dir) in exits {
            self.generate_and_add(x, y0, z, dir, depth);
        }
        if two_floors {
            for (x, z, dir) in [north, west, east, south] {
                if self.rng.next_bool() {
                    self.generate_and_add(x, y0 + 3 + 1, z, dir, depth);
                }
            }
        }
    }
}

pub(crate) fn paint(piece: &Piece, painter: &mut Painter<'_, '_>) -> bool {
    if painter.edges_liquid() {
        return false;
    }
    let bb = piece.bounding_box();
    match piece.kind() {
        PieceKind::MineshaftRoom { entrances } => paint_room(bb, entrances, painter),
        PieceKind::MineshaftCorridor {
            has_rails,
            has_spiders,
            num_sections,
        } => paint_corridor(*has_rails, *has_spiders, *num_sections, painter),
        PieceKind::MineshaftCrossing { two_floors, .. } => {
            paint_crossing(bb, *two_floors, painter)
        }
        PieceKind::MineshaftStairs => paint_stairs(painter),
        _ => {}
    }
    true
}

fn paint_room(bb: &BoundingBox, entrances: &[BoundingBox], painter: &mut Painter<'_, '_>) {
    let (w, h, d) = (bb.x_span() - 1, bb.y_span() - 1, bb.z_span() - 1);
    painter.fill(0, 0, 0, w, 0, d, Voxel::new(BLOCK_DIRT), Voxel::new(BLOCK_DIRT), true);
    painter.fill_air(0, 1, 0, w, 3.min(h), d);
    for entrance in entrances {
        painter.fill_air(
            entrance.min_x() - bb.min_x(),
            entrance.max_y() - 2 - bb.min_y(),
            entrance.min_z() - bb.min_z(),
            entrance.max_x() - bb.min_x(),
            entrance.max_y() - bb.min_y(),
            entrance.max_z() - bb.min_z(),
        );
    }

    // Dome carved out of everything above the fourth layer.
    let fx = (w + 1) as f32;
    let fy = (h - 4 + 1) as f32;
    let fz = (d + 1) as f32;
    let cx = fx / 2.0;
    let cz = fz / 2.0;
    for y in 4..=h {
        let dy = (y - 4) as f32 / fy;
        for x in 0..=w {
            let dx = (x as f32 - cx) / (fx * 0.5);
            for z in 0..=d {
                let dz = (z as f32 - cz) / (fz * 0.5);
                if dx * dx + dy * dy + dz * dz <= 1.05 && !painter.get(x, y, z).is_air() {
                    painter.place(Voxel::AIR, x, y, z);
                }
            }
        }
    }
}

fn paint_corridor(
    has_rails: bool,
    has_spiders: bool,
    num_sections: i32,
    painter: &mut Painter<'_, '_>,
) {
    let end = num_sections * CORRIDOR_SECTION_LENGTH - 1;
    let planks = Voxel::new(BLOCK_OAK_PLANKS);
    let fence = Voxel::new(BLOCK_OAK_FENCE);
    let web = Voxel::new(BLOCK_COBWEB);

    painter.fill_air(0, 0, 0, 2, 1, end);
    painter.fill_maybe(0.8, 0, 2, 0, 2, 2, end, Voxel::AIR, Voxel::AIR, false);
    if has_spiders {
        painter.fill_maybe(0.6, 0, 0, 0, 2, 1, end, web, web, true);
    }

    for section in 0..num_sections {
        let z = 2 + section * CORRIDOR_SECTION_LENGTH;
        painter.fill(0, 0, z, 0, 1, z, fence, fence, false);
        painter.fill(2, 0, z, 2, 1, z, fence, fence, false);
        if painter.rng().next_int(4) == 0 {
            painter.place(planks, 0, 2, z);
            painter.place(planks, 2, 2, z);
        } else {
            painter.fill(0, 2, z, 2, 2, z, planks, planks, false);
            painter.maybe_place(0.05, Voxel::facing(BLOCK_WALL_TORCH, Direction::South), 1, 2, z - 1);
            painter.maybe_place(0.05, Voxel::facing(BLOCK_WALL_TORCH, Direction::North), 1, 2, z + 1);
        }

        for (dx, dz, chance) in [
            (0, -1, 0.1),
            (2, -1, 0.1),
            (0, 1, 0.1),
            (2, 1, 0.1),
            (0, -2, 0.05),
            (2, -2, 0.05),
            (0, 2, 0.05),
            (2, 2, 0.05),
        ] {
            painter.maybe_place(chance, web, dx, 2, z + dz);
        }

        if painter.rng().next_int(100) == 0 {
            painter.place_chest(2, 0, z - 1, Direction::West);
        }
        if painter.rng().next_int(100) == 0 {
            painter.place_chest(0, 0, z + 1, Direction::East);
        }
        if has_spiders && section == 0 {
            let spawner_z = z - 1 + painter.rng().next_int(3);
            painter.place(Voxel::new(BLOCK_SPAWNER), 1, 0, spawner_z);
        }
    }

    if has_rails {
        for z in 0..=end {
            if painter.rng().next_float() < 0.7 {
                painter.place(Voxel::new(BLOCK_RAIL), 1, 0, z);
            }
        }
    }
}

fn paint_crossing(bb: &BoundingBox, two_floors: bool, painter: &mut Painter<'_, '_>) {
    let (w, h, d) = (bb.x_span() - 1, bb.y_span() - 1, bb.z_span() - 1);
    if two_floors {
        painter.fill_air(1, 0, 0, w - 1, 2, d);
        painter.fill_air(0, 0, 1, w, 2, d - 1);
        painter.fill_air(1, h - 2, 0, w - 1, h, d);
        painter.fill_air(0, h - 2, 1, w, h, d - 1);
        painter.fill_air(1, 3, 1, w - 1, 3, d - 1);
    } else {
        painter.fill_air(1, 0, 0, w - 1, h, d);
        painter.fill_air(0, 0, 1, w, h, d - 1);
    }

    let planks = Voxel::new(BLOCK_OAK_PLANKS);
    for (x, z) in [(1, 1), (1, d - 1), (w - 1, 1), (w - 1, d - 1)] {
        painter.fill(x, 0, z, x, h, z, planks, planks, false);
    }
}

fn paint_stairs(painter: &mut Painter<'_, '_>) {
    painter.fill_air(0, 5, 0, 2, 7, 1);
    painter.fill_air(0, 0, 7, 2, 2, 8);
    for step in 0..5 {
        let bottom = 5 - step - if step < 4 { 1 } else { 0 };
        painter.fill_air(0, bottom, 2 + step, 2, 7 - step, 2 + step);
    }
}
