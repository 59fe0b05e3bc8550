//! Woodland mansion floor plan and its template layout.
//!
//! [`MansionGrid`] lays the plan out on an 11x11 cell grid. A corridor walk
//! starts at the entrance, edges are thickened into rooms and rooms are
//! grouped into 1x1, 1x2 and 2x2 shapes per floor. The generator then
//! visits every cell and emits the templates for floors, rooms, walls, doors
//! and roofs.

use crate::config::WoodlandMansionConfig;
use crate::piece::{Piece, PieceKind, TemplateRef};
use crate::structure_start::{StructurePieces, StructureStart};
use crate::structure_template::TemplateLibrary;
use crate::structures::{StructureFamily, StructureGenerator};
use std::collections::BTreeSet;
use std::sync::Arc;
use structgen_core::{BlockPos, ChunkPos, Direction, RandomSource, Rotation};
use tracing::debug;

pub const GRID_SIZE: i32 = 11;
pub const ENTRANCE_X: i32 = 7;
pub const ENTRANCE_Y: i32 = 4;
pub const FLOORS: usize = 3;

pub const CLEAR: i32 = 0;
pub const CORRIDOR: i32 = 1;
pub const ROOM: i32 = 2;
pub const START_ROOM: i32 = 3;
pub const TEST_ROOM: i32 = 4;
pub const BLOCKED: i32 = 5;

pub const ROOM_1X1: i32 = 0x1_0000;
pub const ROOM_1X2: i32 = 0x2_0000;
pub const ROOM_2X2: i32 = 0x4_0000;
pub const ROOM_ORIGIN_FLAG: i32 = 0x10_0000;
pub const ROOM_DOOR_FLAG: i32 = 0x20_0000;
pub const ROOM_STAIRS_FLAG: i32 = 0x40_0000;
pub const ROOM_CORRIDOR_FLAG: i32 = 0x80_0000;
pub const ROOM_TYPE_MASK: i32 = 0xF_0000;
pub const ROOM_ID_MASK: i32 = 0xFFFF;

const FIRST_ROOM_ID: i32 = 10;
const MANSION_BATCH: i32 = 0;

/// Dense 2D cell grid with a fixed value outside its bounds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellGrid {
    width: i32,
    height: i32,
    cells: Vec<i32>,
    outside: i32,
}

impl CellGrid {
    pub fn new(width: i32, height: i32, outside: i32) -> Self {
        Self {
            width,
            height,
            cells: vec![CLEAR; (width * height) as usize],
            outside,
        }
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    fn index(&self, x: i32, y: i32) -> Option<usize> {
        ((0..self.width).contains(&x) && (0..self.height).contains(&y))
            .then(|| (y * self.width + x) as usize)
    }

    pub fn get(&self, x: i32, y: i32) -> i32 {
        self.index(x, y).map_or(self.outside, |i| self.cells[i])
    }

    pub fn set(&mut self, x: i32, y: i32, value: i32) {
        if let Some(i) = self.index(x, y) {
            self.cells[i] = value;
        }
    }

    /// Set every in-bounds cell of the inclusive rectangle.
    pub fn set_area(&mut self, x0: i32, y0: i32, x1: i32, y1: i32, value: i32) {
        for y in y0..=y1 {
            for x in x0..=x1 {
                self.set(x, y, value);
            }
        }
    }

    pub fn set_if(&mut self, x: i32, y: i32, expected: i32, value: i32) {
        if self.get(x, y) == expected {
            self.set(x, y, value);
        }
    }

    /// True when a horizontal neighbour holds `value`.
    pub fn edges_to(&self, x: i32, y: i32, value: i32) -> bool {
        self.get(x - 1, y) == value
            || self.get(x + 1, y) == value
            || self.get(x, y + 1) == value
            || self.get(x, y - 1) == value
    }
}

/// Cells that belong to the building.
pub fn is_house(grid: &CellGrid, x: i32, y: i32) -> bool {
    matches!(grid.get(x, y), CORRIDOR | ROOM | START_ROOM | TEST_ROOM)
}

/// Floor plan of one mansion.
#[derive(Debug, Clone)]
pub struct MansionGrid {
    base: CellGrid,
    third_floor: CellGrid,
    floor_rooms: [CellGrid; FLOORS],
}

impl MansionGrid {
    pub fn new(rng: &mut dyn RandomSource) -> Self {
        let blank = || CellGrid::new(GRID_SIZE, GRID_SIZE, BLOCKED);
        let (ex, ey) = (ENTRANCE_X, ENTRANCE_Y);
        let mut base = blank();
        base.set_area(ex, ey, ex + 1, ey + 1, START_ROOM);
        base.set_area(ex - 1, ey, ex - 1, ey + 1, ROOM);
        base.set_area(ex + 2, ey - 2, ex + 3, ey + 3, BLOCKED);
        base.set_area(ex + 1, ey - 2, ex + 1, ey - 1, CORRIDOR);
        base.set_area(ex + 1, ey + 2, ex + 1, ey + 3, CORRIDOR);
        base.set(ex - 1, ey - 1, CORRIDOR);
        base.set(ex - 1, ey + 2, CORRIDOR);
        base.set_area(0, 0, GRID_SIZE, 1, BLOCKED);
        base.set_area(0, 9, GRID_SIZE, GRID_SIZE, BLOCKED);
        recursive_corridor(&mut base, rng, ex, ey - 2, Direction::West, 6);
        recursive_corridor(&mut base, rng, ex, ey + 3, Direction::West, 6);
        recursive_corridor(&mut base, rng, ex - 2, ey - 1, Direction::West, 3);
        recursive_corridor(&mut base, rng, ex - 2, ey + 2, Direction::West, 3);
        while clean_edges(&mut base) {}

        let mut plan = Self {
            base,
            third_floor: blank(),
            floor_rooms: [blank(), blank(), blank()],
        };
        for floor in 0..2 {
            identify_rooms(&plan.base, &mut plan.floor_rooms[floor], rng);
            plan.floor_rooms[floor].set_area(ex + 1, ey, ex + 1, ey + 1, ROOM_CORRIDOR_FLAG);
        }
        plan.setup_third_floor(rng);
        identify_rooms(&plan.third_floor, &mut plan.floor_rooms[2], rng);
        plan
    }

    /// Layout grid shared by the two lower floors.
    pub fn base(&self) -> &CellGrid {
        &self.base
    }

    pub fn third_floor(&self) -> &CellGrid {
        &self.third_floor
    }

    /// Layout grid of `floor`.
    pub fn layout(&self, floor: usize) -> &CellGrid {
        if floor >= 2 {
            &self.third_floor
        } else {
            &self.base
        }
    }

    /// Room ids and flags of `floor`.
    pub fn rooms(&self, floor: usize) -> &CellGrid {
        &self.floor_rooms[floor.min(FLOORS - 1)]
    }

    fn setup_third_floor(&mut self, rng: &mut dyn RandomSource) {
        let second = &self.floor_rooms[1];
        let mut candidates = Vec::new();
        for y in 0..GRID_SIZE {
            for x in 0..GRID_SIZE {
                let cell = second.get(x, y);
                if cell & ROOM_TYPE_MASK == ROOM_1X2 && cell & ROOM_DOOR_FLAG != 0 {
                    candidates.push((x, y));
                }
            }
        }
        if candidates.is_empty() {
            self.third_floor.set_area(0, 0, GRID_SIZE, GRID_SIZE, BLOCKED);
            return;
        }

        let (sx, sy) = candidates[rng.next_int(candidates.len() as i32) as usize];
        let stairs_cell = self.floor_rooms[1].get(sx, sy);
        self.floor_rooms[1].set(sx, sy, stairs_cell | ROOM_STAIRS_FLAG);
        let toward = self.room_direction(sx, sy, 1, stairs_cell & ROOM_ID_MASK);
        let (lx, ly) = (sx + toward.step_x(), sy + toward.step_z());

        for y in 0..GRID_SIZE {
            for x in 0..GRID_SIZE {
                if !is_house(&self.base, x, y) {
                    self.third_floor.set(x, y, BLOCKED);
                } else if (x, y) == (sx, sy) {
                    self.third_floor.set(x, y, START_ROOM);
                } else if (x, y) == (lx, ly) {
                    self.third_floor.set(x, y, START_ROOM);
                    self.floor_rooms[2].set(x, y, ROOM_CORRIDOR_FLAG);
                }
            }
        }

        let exits: Vec<Direction> = Direction::HORIZONTAL
            .into_iter()
            .filter(|dir| self.third_floor.get(lx + dir.step_x(), ly + dir.step_z()) == CLEAR)
            .collect();
        if exits.is_empty() {
            self.third_floor.set_area(0, 0, GRID_SIZE, GRID_SIZE, BLOCKED);
            self.floor_rooms[1].set(sx, sy, stairs_cell);
            return;
        }
        let exit = exits[rng.next_int(exits.len() as i32) as usize];
        recursive_corridor(
            &mut self.third_floor,
            rng,
            lx + exit.step_x(),
            ly + exit.step_z(),
            exit,
            4,
        );
        while clean_edges(&mut self.third_floor) {}
    }

    /// Direction from `(x, y)` to the other cell of its 1x2 room.
    fn room_direction(&self, x: i32, y: i32, floor: usize, room_id: i32) -> Direction {
        Direction::HORIZONTAL
            .into_iter()
            .find(|dir| {
                let (nx, ny) = (x + dir.step_x(), y + dir.step_z());
                is_house(&self.base, nx, ny) && self.floor_rooms[floor].get(nx, ny) & ROOM_ID_MASK == room_id
            })
            .unwrap_or(Direction::South)
    }
}

fn recursive_corridor(
    grid: &mut CellGrid,
    rng: &mut dyn RandomSource,
    x: i32,
    y: i32,
    dir: Direction,
    length: i32,
) {
    if length <= 0 {
        return;
    }
    grid.set(x, y, CORRIDOR);
    let (ax, ay) = (x + dir.step_x(), y + dir.step_z());
    grid.set_if(ax, ay, CLEAR, CORRIDOR);

    for _ in 0..8 {
        let turn = Direction::from_2d(rng.next_int(4));
        if turn == dir.opposite() || (turn == Direction::East && rng.next_bool()) {
            continue;
        }
        let (tx, ty) = (turn.step_x(), turn.step_z());
        if grid.get(ax + tx, ay + ty) == CLEAR && grid.get(ax + tx * 2, ay + ty * 2) == CLEAR {
            recursive_corridor(grid, rng, ax + tx, ay + ty, turn, length - 1);
            break;
        }
    }

    let cw = dir.clockwise();
    let ccw = dir.counter_clockwise();
    let (dx, dy) = (dir.step_x(), dir.step_z());
    grid.set_if(x + cw.step_x(), y + cw.step_z(), CLEAR, ROOM);
    grid.set_if(x + ccw.step_x(), y + ccw.step_z(), CLEAR, ROOM);
    grid.set_if(ax + cw.step_x(), ay + cw.step_z(), CLEAR, ROOM);
    grid.set_if(ax + ccw.step_x(), ay + ccw.step_z(), CLEAR, ROOM);
    grid.set_if(x + dx * 2, y + dy * 2, CLEAR, ROOM);
    grid.set_if(x + cw.step_x() * 2, y + cw.step_z() * 2, CLEAR, ROOM);
    grid.set_if(x + ccw.step_x() * 2, y + ccw.step_z() * 2, CLEAR, ROOM);
}

/// Fill clear cells hemmed in by the house. Returns whether anything changed.
fn clean_edges(grid: &mut CellGrid) -> bool {
    let mut changed = false;
    for y in 0..grid.height() {
        for x in 0..grid.width() {
            if grid.get(x, y) != CLEAR {
                continue;
            }
            let sides = [(1, 0), (-1, 0), (0, 1), (0, -1)]
                .into_iter()
                .filter(|&(dx, dy)| is_house(grid, x + dx, y + dy))
                .count();
            let fill = match sides {
                3.. => true,
                2 => {
                    [(1, 1), (-1, 1), (1, -1), (-1, -1)]
                        .into_iter()
                        .filter(|&(dx, dy)| is_house(grid, x + dx, y + dy))
                        .count()
                        <= 1
                }
                _ => false,
            };
            if fill {
                grid.set(x, y, ROOM);
                changed = true;
            }
        }
    }
    changed
}

/// Group `layout`'s room cells into shaped rooms written to `rooms`.
fn identify_rooms(layout: &CellGrid, rooms: &mut CellGrid, rng: &mut dyn RandomSource) {
    let mut cells = Vec::new();
    for y in 0..layout.height() {
        for x in 0..layout.width() {
            if layout.get(x, y) == ROOM {
                cells.push((x, y));
            }
        }
    }
    for i in (1..cells.len()).rev() {
        let j = rng.next_int(i as i32 + 1) as usize;
        cells.swap(i, j);
    }

    let free = |rooms: &CellGrid, x: i32, y: i32| rooms.get(x, y) == CLEAR && layout.get(x, y) == ROOM;
    let mut room_id = FIRST_ROOM_ID;
    for (x, y) in cells {
        if rooms.get(x, y) != CLEAR {
            continue;
        }
        let (mut x0, mut x1, mut y0, mut y1) = (x, x, y, y);
        let shape = if free(rooms, x + 1, y) && free(rooms, x, y + 1) && free(rooms, x + 1, y + 1) {
            x1 = x + 1;
            y1 = y + 1;
            ROOM_2X2
        } else if free(rooms, x - 1, y) && free(rooms, x, y + 1) && free(rooms, x - 1, y + 1) {
            x0 = x - 1;
            y1 = y + 1;
            ROOM_2X2
        } else if free(rooms, x - 1, y) && free(rooms, x, y - 1) && free(rooms, x - 1, y - 1) {
            x0 = x - 1;
            y0 = y - 1;
            ROOM_2X2
        } else if free(rooms, x + 1, y) {
            x1 = x + 1;
            ROOM_1X2
        } else if free(rooms, x, y + 1) {
            y1 = y + 1;
            ROOM_1X2
        } else if free(rooms, x - 1, y) {
            x0 = x - 1;
            ROOM_1X2
        } else if free(rooms, x, y - 1) {
            y0 = y - 1;
            ROOM_1X2
        } else {
            ROOM_1X1
        };

        let flip = |v: i32, lo: i32, hi: i32| if v == lo { hi } else { lo };
        let mut door_x = if rng.next_bool() { x0 } else { x1 };
        let mut door_y = if rng.next_bool() { y0 } else { y1 };
        let mut door = ROOM_DOOR_FLAG;
        if !layout.edges_to(door_x, door_y, CORRIDOR) {
            door_x = flip(door_x, x0, x1);
            door_y = flip(door_y, y0, y1);
            if !layout.edges_to(door_x, door_y, CORRIDOR) {
                door_y = flip(door_y, y0, y1);
                if !layout.edges_to(door_x, door_y, CORRIDOR) {
                    door_x = flip(door_x, x0, x1);
                    door_y = flip(door_y, y0, y1);
                    if !layout.edges_to(door_x, door_y, CORRIDOR) {
                        door = 0;
                        door_x = x0;
                        door_y = y0;
                    }
                }
            }
        }

        for cy in y0..=y1 {
            for cx in x0..=x1 {
                let value = if (cx, cy) == (door_x, door_y) {
                    ROOM_ORIGIN_FLAG | door | shape | room_id
                } else {
                    shape | room_id
                };
                rooms.set(cx, cy, value);
            }
        }
        room_id += 1;
    }
}

/// Woodland mansion generator.
pub struct WoodlandMansionGenerator {
    cell_size: i32,
    floor_height: i32,
    base_y: i32,
    templates: Arc<dyn TemplateLibrary>,
}

impl WoodlandMansionGenerator {
    pub fn new(config: &WoodlandMansionConfig, templates: Arc<dyn TemplateLibrary>) -> Self {
        Self {
            cell_size: config.cell_size,
            floor_height: config.floor_height,
            base_y: config.base_y,
            templates,
        }
    }

    /// Emit the templates for `plan` around `origin`.
    pub fn place(&self, plan: &MansionGrid, origin: BlockPos, rotation: Rotation) -> StructurePieces {
        let mut placer = Placer {
            generator: self,
            origin,
            rotation,
            pieces: StructurePieces::new(),
        };
        for floor in 0..FLOORS {
            placer.floor(plan, floor);
        }
        placer.pieces
    }
}

impl StructureGenerator for WoodlandMansionGenerator {
    fn family(&self) -> StructureFamily {
        StructureFamily::WoodlandMansion
    }

    fn generate(&self, chunk: ChunkPos, rng: &mut dyn RandomSource) -> Option<StructureStart> {
        let rotation = Rotation::random(rng);
        let plan = MansionGrid::new(rng);
        let origin = BlockPos::new(chunk.block_x(7), self.base_y, chunk.block_z(7));
        let pieces = self.place(&plan, origin, rotation);
        debug!(pieces = pieces.len(), rotation = rotation.name(), "mansion laid out");
        pieces.build(StructureFamily::WoodlandMansion, chunk)
    }
}

struct Placer<'g> {
    generator: &'g WoodlandMansionGenerator,
    origin: BlockPos,
    rotation: Rotation,
    pieces: StructurePieces,
}

impl Placer<'_> {
    fn floor(&mut self, plan: &MansionGrid, floor: usize) {
        let layout = plan.layout(floor);
        let rooms = plan.rooms(floor);
        let above = (floor + 1 < FLOORS).then(|| plan.layout(floor + 1));
        let mut placed_rooms = BTreeSet::new();

        for gy in 0..GRID_SIZE {
            for gx in 0..GRID_SIZE {
                if !is_house(layout, gx, gy) {
                    continue;
                }
                match layout.get(gx, gy) {
                    START_ROOM if floor == 0 && (gx, gy) == (ENTRANCE_X, ENTRANCE_Y) => {
                        self.cell_template("entrance", gx, gy, floor, Rotation::None);
                    }
                    START_ROOM if floor == 2 && rooms.get(gx, gy) & ROOM_CORRIDOR_FLAG == 0 => {
                        self.cell_template("stairs", gx, gy, floor, Rotation::None);
                    }
                    CORRIDOR | START_ROOM => {
                        self.cell_template("corridor_floor", gx, gy, floor, Rotation::None);
                    }
                    _ => {
                        let cell = rooms.get(gx, gy);
                        let id = cell & ROOM_ID_MASK;
                        if id != 0 && placed_rooms.insert(id) {
                            self.room(layout, rooms, floor, id, cell & ROOM_TYPE_MASK);
                        }
                    }
                }

                for dir in Direction::HORIZONTAL {
                    if !is_house(layout, gx + dir.step_x(), gy + dir.step_z()) {
                        let name = if floor == 0 && (gx + gy) % 2 == 0 {
                            "wall_flat"
                        } else {
                            "wall_window"
                        };
                        self.edge_template(name, gx, gy, floor, dir);
                    }
                }

                let covered = above.is_some_and(|grid| is_house(grid, gx, gy));
                if !covered {
                    self.roof(gx, gy, floor);
                }
            }
        }
    }

    fn room(&mut self, layout: &CellGrid, rooms: &CellGrid, floor: usize, id: i32, shape: i32) {
        let mut min = (GRID_SIZE, GRID_SIZE);
        let mut max = (-1, -1);
        let mut origin = None;
        for gy in 0..GRID_SIZE {
            for gx in 0..GRID_SIZE {
                let cell = rooms.get(gx, gy);
                if cell & ROOM_ID_MASK != id {
                    continue;
                }
                min = (min.0.min(gx), min.1.min(gy));
                max = (max.0.max(gx), max.1.max(gy));
                if cell & ROOM_ORIGIN_FLAG != 0 {
                    origin = Some((gx, gy, cell));
                }
            }
        }

        match shape {
            ROOM_2X2 => self.cell_template("2x2_a", min.0, min.1, floor, Rotation::None),
            ROOM_1X2 if max.0 > min.0 => self.cell_template("1x2_a", min.0, min.1, floor, Rotation::None),
            ROOM_1X2 => {
                let c = self.generator.cell_size;
                self.place_local("1x2_a", (min.0, min.1), (c - 1, 0, 0), floor, Rotation::Clockwise90);
            }
            _ => self.cell_template("1x1_a", min.0, min.1, floor, Rotation::None),
        }

        let Some((ox, oy, cell)) = origin else {
            return;
        };
        if cell & ROOM_STAIRS_FLAG != 0 {
            self.cell_template("stairs", ox, oy, floor, Rotation::None);
        }
        if cell & ROOM_DOOR_FLAG != 0 {
            if let Some(dir) = Direction::HORIZONTAL
                .into_iter()
                .find(|dir| layout.get(ox + dir.step_x(), oy + dir.step_z()) == CORRIDOR)
            {
                self.edge_template("door", ox, oy, floor, dir);
            }
        }
    }

    fn roof(&mut self, gx: i32, gy: i32, floor: usize) {
        let h = self.generator.floor_height;
        self.place_local("roof", (gx, gy), (0, h, 0), floor, Rotation::None);
    }

    fn cell_template(&mut self, name: &str, gx: i32, gy: i32, floor: usize, turn: Rotation) {
        self.place_local(name, (gx, gy), (0, 0, 0), floor, turn);
    }

    /// Wall-like template along the `side` edge of a cell, inside the cell.
    fn edge_template(&mut self, name: &str, gx: i32, gy: i32, floor: usize, side: Direction) {
        let last = self.generator.cell_size - 1;
        let (offset, turn) = match side {
            Direction::South => ((last, 0, last), Rotation::Clockwise180),
            Direction::West => ((0, 0, last), Rotation::CounterClockwise90),
            Direction::East => ((last, 0, 0), Rotation::Clockwise90),
            _ => ((0, 0, 0), Rotation::None),
        };
        self.place_local(name, (gx, gy), offset, floor, turn);
    }

    /// Place `name` at `offset` inside cell `(gx, gy)` of `floor`.
    fn place_local(
        &mut self,
        name: &str,
        (gx, gy): (i32, i32),
        (ox, oy, oz): (i32, i32, i32),
        floor: usize,
        turn: Rotation,
    ) {
        let c = self.generator.cell_size;
        let local = BlockPos::new(
            (gx - ENTRANCE_X) * c + ox,
            floor as i32 * self.generator.floor_height + oy,
            (gy - ENTRANCE_Y) * c + oz,
        );
        let position = self.origin + self.rotation.transform(local, BlockPos::ZERO);
        let template = TemplateRef::new(name, position, self.rotation.rotated(turn));
        let bb = self
            .generator
            .templates
            .get_or_create(name)
            .bounding_box(&template.settings(), position);
        let piece = Piece::new(PieceKind::Mansion { template }, bb, None, 0).with_batch(MANSION_BATCH);
        self.pieces.push(piece);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structure_template::BuiltinTemplates;
    use std::collections::BTreeMap;
    use structgen_core::{BoundingBox, StructureRng};

    fn generator() -> WoodlandMansionGenerator {
        WoodlandMansionGenerator::new(&WoodlandMansionConfig::default(), Arc::new(BuiltinTemplates::new()))
    }

    #[test]
    fn fixed_cells_survive_the_walk() {
        let plan = MansionGrid::new(&mut StructureRng::new(3));
        let base = plan.base();
        assert_eq!(base.get(ENTRANCE_X, ENTRANCE_Y), START_ROOM);
        assert_eq!(base.get(ENTRANCE_X + 1, ENTRANCE_Y + 1), START_ROOM);
        assert_eq!(base.get(ENTRANCE_X + 2, ENTRANCE_Y), BLOCKED);
        for x in 0..GRID_SIZE {
            for y in [0, 1, 9, 10] {
                assert!(!is_house(base, x, y), "row {y} must stay outside");
            }
        }
        assert_eq!(base.get(-1, 3), BLOCKED);
    }

    #[test]
    fn every_room_cell_gets_exactly_one_origin_per_room() {
        for seed in 0..30 {
            let plan = MansionGrid::new(&mut StructureRng::new(seed));
            for floor in 0..FLOORS {
                let layout = plan.layout(floor);
                let rooms = plan.rooms(floor);
                let mut origins: BTreeMap<i32, usize> = BTreeMap::new();
                let mut ids = BTreeSet::new();
                for y in 0..GRID_SIZE {
                    for x in 0..GRID_SIZE {
                        let cell = rooms.get(x, y);
                        if layout.get(x, y) == ROOM {
                            assert_ne!(cell & ROOM_ID_MASK, 0, "seed {seed} floor {floor}");
                            ids.insert(cell & ROOM_ID_MASK);
                        }
                        if cell & ROOM_ORIGIN_FLAG != 0 {
                            *origins.entry(cell & ROOM_ID_MASK).or_default() += 1;
                        }
                    }
                }
                assert!(ids.iter().all(|id| origins.get(id) == Some(&1)), "seed {seed}");
            }
        }
    }

    #[test]
    fn room_shapes_cover_their_cells() {
        let plan = MansionGrid::new(&mut StructureRng::new(21));
        let rooms = plan.rooms(0);
        let mut counts: BTreeMap<i32, (i32, i32)> = BTreeMap::new();
        for y in 0..GRID_SIZE {
            for x in 0..GRID_SIZE {
                let cell = rooms.get(x, y);
                if cell & ROOM_ID_MASK != 0 {
                    let entry = counts.entry(cell & ROOM_ID_MASK).or_insert((cell & ROOM_TYPE_MASK, 0));
                    entry.1 += 1;
                }
            }
        }
        for (shape, cells) in counts.values() {
            let expected = match *shape {
                ROOM_2X2 => 4,
                ROOM_1X2 => 2,
                _ => 1,
            };
            assert_eq!(*cells, expected);
        }
    }

    #[test]
    fn third_floor_sits_on_the_house() {
        for seed in 0..30 {
            let plan = MansionGrid::new(&mut StructureRng::new(seed));
            for y in 0..GRID_SIZE {
                for x in 0..GRID_SIZE {
                    if is_house(plan.third_floor(), x, y) {
                        assert!(is_house(plan.base(), x, y), "seed {seed} cell {x},{y}");
                    }
                }
            }
        }
    }

    #[test]
    fn corridor_walk_respects_length_and_bounds() {
        let mut grid = CellGrid::new(GRID_SIZE, GRID_SIZE, BLOCKED);
        recursive_corridor(&mut grid, &mut StructureRng::new(8), 5, 5, Direction::West, 0);
        assert!((0..GRID_SIZE).all(|y| (0..GRID_SIZE).all(|x| grid.get(x, y) == CLEAR)));
        recursive_corridor(&mut grid, &mut StructureRng::new(8), 5, 5, Direction::West, 1);
        assert_eq!(grid.get(5, 5), CORRIDOR);
        assert_eq!(grid.get(4, 5), CORRIDOR);
        assert_eq!(grid.get(5, 4), ROOM);
        assert_eq!(grid.get(3, 5), ROOM);
    }

    #[test]
    fn mansion_pieces_share_one_batch_and_stay_near_origin() {
        let chunk = ChunkPos::new(4, -6);
        let start = generator()
            .generate(chunk, &mut StructureRng::new(77))
            .expect("entrance cells always exist");
        assert!(start.pieces().iter().all(|p| p.batch() == Some(MANSION_BATCH) && p.gen_depth() == 0));
        let reach = GRID_SIZE * 8;
        let around = BoundingBox::new(
            chunk.block_x(7) - reach,
            64,
            chunk.block_z(7) - reach,
            chunk.block_x(7) + reach,
            64 + 4 * 8,
            chunk.block_z(7) + reach,
        );
        assert!(around.encloses(start.bounding_box()));
        let entrances = start.pieces().iter().filter(|p| match p.kind() {
            PieceKind::Mansion { template } => template.name == "entrance",
            _ => false,
        });
        assert_eq!(entrances.count(), 1);
    }

    #[test]
    fn rotated_cells_keep_their_footprint() {
        let plan = MansionGrid::new(&mut StructureRng::new(5));
        let gen = generator();
        let plain = gen.place(&plan, BlockPos::ZERO, Rotation::None);
        let turned = gen.place(&plan, BlockPos::ZERO, Rotation::Clockwise90);
        assert_eq!(plain.len(), turned.len());
        for (a, b) in plain.pieces().iter().zip(turned.pieces()) {
            let (a, b) = (a.bounding_box(), b.bounding_box());
            assert_eq!((a.x_span(), a.z_span()), (b.z_span(), b.x_span()));
        }
    }
}
