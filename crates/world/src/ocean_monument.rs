//! Ocean monument layout.
//!
//! The monument is not grown as a tree. A fixed lattice of room cells
//! (5 wide, 4 deep on the two lower floors, 3 by 2 on the top floor) is
//! fully connected, a core and an entry room are reserved, and random
//! openings are then closed as long as both sides still reach the entry.
//! Finally a fixed list of fitters claims the remaining cells into rooms of
//! one, two or four cells.

use crate::block::*;
use crate::config::OceanMonumentConfig;
use crate::piece::{Painter, Piece, PieceKind};
use crate::structure_start::{StructurePieces, StructureStart};
use crate::structures::{StructureFamily, StructureGenerator};
use structgen_core::{Axis, BlockPos, BoundingBox, ChunkPos, Direction, RandomSource};

const GRID_WIDTH: i32 = 5;
const GRID_FLOORS: i32 = 3;
const LATTICE_SIZE: usize = 75;
const CELL_WIDTH: i32 = 8;
const CELL_HEIGHT: i32 = 4;

/// Batch of the outer building. Every inner piece gets a batch of its own
/// whose parent is this one, so it may sit inside the building but not
/// inside a sibling.
pub(crate) const BUILDING_BATCH: i32 = 0;

const TOP_CONNECTOR: i32 = 1003;
const LEFT_WING_CONNECTOR: i32 = 1001;
const RIGHT_WING_CONNECTOR: i32 = 1002;

/// Lattice index of cell `(x, floor, z)`.
pub const fn room_index(x: i32, y: i32, z: i32) -> i32 {
    y * GRID_WIDTH * GRID_WIDTH + z * GRID_WIDTH + x
}

const SOURCE_INDEX: i32 = room_index(2, 0, 0);
const TOP_CONNECT_INDEX: i32 = room_index(2, 2, 0);
const LEFT_WING_INDEX: i32 = room_index(0, 1, 0);
const RIGHT_WING_INDEX: i32 = room_index(4, 1, 0);

/// Room footprint in cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MonumentRoomShape {
    Entry,
    Core,
    Simple,
    SimpleTop,
    DoubleX,
    DoubleY,
    DoubleZ,
    DoubleXY,
    DoubleYZ,
}

impl MonumentRoomShape {
    pub const ALL: [MonumentRoomShape; 9] = [
        MonumentRoomShape::Entry,
        MonumentRoomShape::Core,
        MonumentRoomShape::Simple,
        MonumentRoomShape::SimpleTop,
        MonumentRoomShape::DoubleX,
        MonumentRoomShape::DoubleY,
        MonumentRoomShape::DoubleZ,
        MonumentRoomShape::DoubleXY,
        MonumentRoomShape::DoubleYZ,
    ];

    pub const fn id(self) -> &'static str {
        match self {
            MonumentRoomShape::Entry => "OMEntry",
            MonumentRoomShape::Core => "OMCR",
            MonumentRoomShape::Simple => "OMSimple",
            MonumentRoomShape::SimpleTop => "OMSimpleT",
            MonumentRoomShape::DoubleX => "OMDXR",
            MonumentRoomShape::DoubleY => "OMDYR",
            MonumentRoomShape::DoubleZ => "OMDZR",
            MonumentRoomShape::DoubleXY => "OMDXYR",
            MonumentRoomShape::DoubleYZ => "OMDYZR",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|shape| shape.id() == id)
    }

    /// `(x, y, z)` extent in cells.
    pub const fn cells(self) -> (i32, i32, i32) {
        match self {
            MonumentRoomShape::Core => (2, 2, 2),
            MonumentRoomShape::DoubleX => (2, 1, 1),
            MonumentRoomShape::DoubleY => (1, 2, 1),
            MonumentRoomShape::DoubleZ => (1, 1, 2),
            MonumentRoomShape::DoubleXY => (2, 2, 1),
            MonumentRoomShape::DoubleYZ => (1, 2, 2),
            _ => (1, 1, 1),
        }
    }
}

/// One lattice cell or one of the three connectors outside the lattice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomDefinition {
    pub index: i32,
    /// Neighbour slots in 3D direction order.
    pub connections: [Option<usize>; 6],
    pub has_opening: [bool; 6],
    pub claimed: bool,
    pub is_source: bool,
    scan_index: i32,
}

impl RoomDefinition {
    fn new(index: i32) -> Self {
        Self {
            index,
            connections: [None; 6],
            has_opening: [false; 6],
            claimed: false,
            is_source: false,
            scan_index: 0,
        }
    }

    /// Connectors to the wings and the penthouse live outside the lattice.
    pub fn is_special(&self) -> bool {
        self.index >= LATTICE_SIZE as i32
    }

    /// Open faces as a bit set over 3D direction values.
    pub fn opening_bits(&self) -> u8 {
        self.has_opening
            .iter()
            .enumerate()
            .filter(|(_, open)| **open)
            .fold(0, |bits, (i, _)| bits | (1 << i))
    }

    fn open_toward(&self, dir: Direction) -> bool {
        self.has_opening[dir.data_3d()]
    }
}

/// Room lattice of one monument after pruning.
#[derive(Debug, Clone)]
pub struct RoomGraph {
    rooms: Vec<RoomDefinition>,
    source: usize,
    core: usize,
    /// Every room in fitting order: the shuffled lattice, then the connectors.
    order: Vec<usize>,
    next_scan: i32,
}

impl RoomGraph {
    /// Build, connect, reserve and prune the lattice.
    pub fn generate(rng: &mut dyn RandomSource) -> Self {
        let mut rooms = Vec::new();
        let mut lattice: [Option<usize>; LATTICE_SIZE] = [None; LATTICE_SIZE];
        let mut add_cell = |rooms: &mut Vec<RoomDefinition>, x: i32, y: i32, z: i32| {
            let index = room_index(x, y, z);
            lattice[index as usize] = Some(rooms.len());
            rooms.push(RoomDefinition::new(index));
        };
        for x in 0..5 {
            for z in 0..4 {
                add_cell(&mut rooms, x, 0, z);
            }
        }
        for x in 0..5 {
            for z in 0..4 {
                add_cell(&mut rooms, x, 1, z);
            }
        }
        for x in 1..4 {
            for z in 0..2 {
                add_cell(&mut rooms, x, 2, z);
            }
        }

        let mut graph = Self {
            rooms,
            source: 0,
            core: 0,
            order: Vec::new(),
            next_scan: 1,
        };
        let slot = |index: i32| lattice[index as usize];

        for x in 0..GRID_WIDTH {
            for z in 0..GRID_WIDTH {
                for y in 0..GRID_FLOORS {
                    let Some(room) = slot(room_index(x, y, z)) else {
                        continue;
                    };
                    for dir in Direction::ALL {
                        let (nx, ny, nz) = (x + dir.step_x(), y + dir.step_y(), z + dir.step_z());
                        let in_range = (0..GRID_WIDTH).contains(&nx)
                            && (0..GRID_WIDTH).contains(&nz)
                            && (0..GRID_FLOORS).contains(&ny);
                        if !in_range {
                            continue;
                        }
                        if let Some(other) = slot(room_index(nx, ny, nz)) {
                            // Lattice z runs against world z.
                            let link = if nz == z { dir } else { dir.opposite() };
                            graph.connect(room, link, other);
                        }
                    }
                }
            }
        }

        let top = graph.push_room(TOP_CONNECTOR);
        let left = graph.push_room(LEFT_WING_CONNECTOR);
        let right = graph.push_room(RIGHT_WING_CONNECTOR);
        if let Some(room) = slot(TOP_CONNECT_INDEX) {
            graph.connect(room, Direction::Up, top);
        }
        if let Some(room) = slot(LEFT_WING_INDEX) {
            graph.connect(room, Direction::South, left);
        }
        if let Some(room) = slot(RIGHT_WING_INDEX) {
            graph.connect(room, Direction::South, right);
        }
        for connector in [top, left, right] {
            graph.rooms[connector].claimed = true;
        }

        graph.source = slot(SOURCE_INDEX).unwrap_or(0);
        graph.rooms[graph.source].is_source = true;
        graph.core = slot(room_index(rng.next_int(4), 0, 2)).unwrap_or(0);
        graph.claim_core();

        let mut order: Vec<usize> = lattice.iter().flatten().copied().collect();
        for &room in &order {
            graph.update_openings(room);
        }
        graph.update_openings(top);
        for i in (2..=order.len()).rev() {
            let j = rng.next_int(i as i32) as usize;
            order.swap(i - 1, j);
        }

        for &room in &order {
            graph.prune(room, rng);
        }

        order.extend([top, left, right]);
        graph.order = order;
        graph
    }

    fn push_room(&mut self, index: i32) -> usize {
        self.rooms.push(RoomDefinition::new(index));
        self.rooms.len() - 1
    }

    fn connect(&mut self, room: usize, dir: Direction, other: usize) {
        self.rooms[room].connections[dir.data_3d()] = Some(other);
        self.rooms[other].connections[dir.opposite().data_3d()] = Some(room);
    }

    fn update_openings(&mut self, room: usize) {
        let def = &mut self.rooms[room];
        for i in 0..6 {
            def.has_opening[i] = def.connections[i].is_some();
        }
    }

    fn neighbour(&self, room: usize, dir: Direction) -> Option<usize> {
        self.rooms[room].connections[dir.data_3d()]
    }

    fn claim(&mut self, room: Option<usize>) {
        if let Some(room) = room {
            self.rooms[room].claimed = true;
        }
    }

    /// The core spans the 2x2x2 block east, north and up of its anchor.
    fn claim_core(&mut self) {
        let core = self.core;
        let east = self.neighbour(core, Direction::East);
        let north = self.neighbour(core, Direction::North);
        let east_north = east.and_then(|r| self.neighbour(r, Direction::North));
        let up = self.neighbour(core, Direction::Up);
        let east_up = east.and_then(|r| self.neighbour(r, Direction::Up));
        let north_up = north.and_then(|r| self.neighbour(r, Direction::Up));
        let east_north_up = east_north.and_then(|r| self.neighbour(r, Direction::Up));
        for room in [Some(core), east, north, east_north, up, east_up, north_up, east_north_up] {
            self.claim(room);
        }
    }

    /// Close up to two random openings of `room`, keeping both sides reachable.
    fn prune(&mut self, room: usize, rng: &mut dyn RandomSource) {
        let mut closed = 0;
        let mut tries = 0;
        while closed < 2 && tries < 5 {
            tries += 1;
            let face = rng.next_int(6) as usize;
            if !self.rooms[room].has_opening[face] {
                continue;
            }
            let Some(other) = self.rooms[room].connections[face] else {
                continue;
            };
            let back = Direction::from_3d(face).opposite().data_3d();
            self.rooms[room].has_opening[face] = false;
            self.rooms[other].has_opening[back] = false;
            let scan = self.take_scan();
            let kept = self.find_source(room, scan) && {
                let scan = self.take_scan();
                self.find_source(other, scan)
            };
            if kept {
                closed += 1;
            } else {
                self.rooms[room].has_opening[face] = true;
                self.rooms[other].has_opening[back] = true;
            }
        }
    }

    fn take_scan(&mut self) -> i32 {
        let scan = self.next_scan;
        self.next_scan += 1;
        scan
    }

    /// Walk open faces from `room`, stamping visited rooms with `scan`.
    ///
    /// `scan` must not have been used for an earlier walk.
    pub fn find_source(&mut self, room: usize, scan: i32) -> bool {
        let mut stack = vec![room];
        self.rooms[room].scan_index = scan;
        while let Some(current) = stack.pop() {
            if self.rooms[current].is_source {
                return true;
            }
            for face in 0..6 {
                if !self.rooms[current].has_opening[face] {
                    continue;
                }
                if let Some(next) = self.rooms[current].connections[face] {
                    if self.rooms[next].scan_index != scan {
                        self.rooms[next].scan_index = scan;
                        stack.push(next);
                    }
                }
            }
        }
        false
    }

    /// Fresh reachability walk from `room` to the entry.
    pub fn reaches_source(&mut self, room: usize) -> bool {
        let scan = self.take_scan();
        self.find_source(room, scan)
    }

    pub fn rooms(&self) -> &[RoomDefinition] {
        &self.rooms
    }

    pub fn source(&self) -> usize {
        self.source
    }

    pub fn core(&self) -> usize {
        self.core
    }

    /// Slots of lattice rooms, excluding connectors.
    pub fn lattice_rooms(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.rooms.len()).filter(|&i| !self.rooms[i].is_special())
    }

    /// Claim the remaining rooms with the first fitter that accepts each.
    fn fit_rooms(&mut self, rng: &mut dyn RandomSource) -> Vec<(MonumentRoomShape, usize, i32)> {
        let mut fitted = Vec::new();
        for i in 0..self.order.len() {
            let room = self.order[i];
            if self.rooms[room].claimed || self.rooms[room].is_special() {
                continue;
            }
            let shape = FITTERS
                .into_iter()
                .find(|&shape| self.fits(shape, room))
                .unwrap_or(MonumentRoomShape::Simple);
            self.claim_shape(shape, room);
            let design = if shape == MonumentRoomShape::Simple {
                rng.next_int(3)
            } else {
                0
            };
            fitted.push((shape, room, design));
        }
        fitted
    }

    fn free_toward(&self, room: usize, dir: Direction) -> Option<usize> {
        if !self.rooms[room].open_toward(dir) {
            return None;
        }
        self.neighbour(room, dir).filter(|&next| !self.rooms[next].claimed)
    }

    fn fits(&self, shape: MonumentRoomShape, room: usize) -> bool {
        let def = &self.rooms[room];
        match shape {
            MonumentRoomShape::DoubleXY => {
                self.free_toward(room, Direction::Up).is_some()
                    && self
                        .free_toward(room, Direction::East)
                        .is_some_and(|east| self.free_toward(east, Direction::Up).is_some())
            }
            MonumentRoomShape::DoubleYZ => {
                self.free_toward(room, Direction::Up).is_some()
                    && self
                        .free_toward(room, Direction::North)
                        .is_some_and(|north| self.free_toward(north, Direction::Up).is_some())
            }
            MonumentRoomShape::DoubleZ => self.free_toward(room, Direction::North).is_some(),
            MonumentRoomShape::DoubleX => self.free_toward(room, Direction::East).is_some(),
            MonumentRoomShape::DoubleY => self.free_toward(room, Direction::Up).is_some(),
            MonumentRoomShape::SimpleTop => {
                !def.open_toward(Direction::West)
                    && !def.open_toward(Direction::East)
                    && !def.open_toward(Direction::North)
                    && !def.open_toward(Direction::South)
                    && !def.open_toward(Direction::Up)
            }
            _ => true,
        }
    }

    fn claim_shape(&mut self, shape: MonumentRoomShape, room: usize) {
        self.rooms[room].claimed = true;
        let east = self.neighbour(room, Direction::East);
        let north = self.neighbour(room, Direction::North);
        let up = self.neighbour(room, Direction::Up);
        match shape {
            MonumentRoomShape::DoubleXY => {
                self.claim(east);
                self.claim(up);
                self.claim(east.and_then(|r| self.neighbour(r, Direction::Up)));
            }
            MonumentRoomShape::DoubleYZ => {
                self.claim(north);
                self.claim(up);
                self.claim(north.and_then(|r| self.neighbour(r, Direction::Up)));
            }
            MonumentRoomShape::DoubleZ => self.claim(north),
            MonumentRoomShape::DoubleX => self.claim(east),
            MonumentRoomShape::DoubleY => self.claim(up),
            _ => {}
        }
    }
}

/// Fitters in priority order; the simple room always fits.
const FITTERS: [MonumentRoomShape; 7] = [
    MonumentRoomShape::DoubleXY,
    MonumentRoomShape::DoubleYZ,
    MonumentRoomShape::DoubleZ,
    MonumentRoomShape::DoubleX,
    MonumentRoomShape::DoubleY,
    MonumentRoomShape::SimpleTop,
    MonumentRoomShape::Simple,
];

/// World box of a room anchored at lattice `index`.
///
/// `anchor` is the world position of the lattice origin inside the building.
pub fn room_box(shape: MonumentRoomShape, index: i32, dir: Direction, anchor: BlockPos) -> BoundingBox {
    let (cx, cy, cz) = shape.cells();
    let gx = index % GRID_WIDTH;
    let gz = index / GRID_WIDTH % GRID_WIDTH;
    let gy = index / (GRID_WIDTH * GRID_WIDTH);
    let (w, h, d) = (cx * CELL_WIDTH, cy * CELL_HEIGHT, cz * CELL_WIDTH);
    let local = if dir.axis() == Axis::Z {
        BoundingBox::new(0, 0, 0, w - 1, h - 1, d - 1)
    } else {
        BoundingBox::new(0, 0, 0, d - 1, h - 1, w - 1)
    };
    let y = gy * CELL_HEIGHT;
    let moved = match dir {
        Direction::North => local.translated(gx * 8, y, -(gz + cz) * 8 + 1),
        Direction::South => local.translated(gx * 8, y, gz * 8),
        Direction::West => local.translated(-(gz + cz) * 8 + 1, y, gx * 8),
        _ => local.translated(gz * 8, y, gx * 8),
    };
    moved.translated(anchor.x, anchor.y, anchor.z)
}

/// Ocean monument generator.
#[derive(Debug, Clone, Copy)]
pub struct OceanMonumentGenerator {
    base_y: i32,
}

impl OceanMonumentGenerator {
    pub fn new(config: &OceanMonumentConfig) -> Self {
        Self {
            base_y: config.base_y,
        }
    }
}

impl StructureGenerator for OceanMonumentGenerator {
    fn family(&self) -> StructureFamily {
        StructureFamily::OceanMonument
    }

    fn generate(&self, chunk: ChunkPos, rng: &mut dyn RandomSource) -> Option<StructureStart> {
        let dir = Direction::random_horizontal(rng);
        let x = chunk.min_block_x() - 29;
        let z = chunk.min_block_z() - 29;
        let building_box = BoundingBox::new(x, self.base_y, z, x + 57, self.base_y + 22, z + 57);
        let building = Piece::new(PieceKind::MonumentBuilding, building_box, Some(dir), 0)
            .with_batch(BUILDING_BATCH);
        let frame = building.frame();

        let mut graph = RoomGraph::generate(rng);
        let source = graph.source();
        graph.rooms[source].claimed = true;
        let fitted = graph.fit_rooms(rng);

        let anchor = frame.world_pos(9, 1, 22);
        let mut pieces = StructurePieces::new();
        pieces.push(building);
        let mut next_batch = BUILDING_BATCH;
        let mut inner = |piece: Piece| {
            next_batch += 1;
            piece.with_batch(next_batch)
        };
        let mut add_room = |shape: MonumentRoomShape, def: &RoomDefinition, design: i32| {
            let bb = room_box(shape, def.index, dir, anchor);
            let kind = PieceKind::MonumentRoom {
                shape,
                index: def.index,
                openings: def.opening_bits(),
                design,
            };
            pieces.push(inner(Piece::new(kind, bb, Some(dir), 1)));
        };
        add_room(MonumentRoomShape::Entry, &graph.rooms[source], 0);
        add_room(MonumentRoomShape::Core, &graph.rooms[graph.core()], 0);
        for (shape, room, design) in fitted {
            add_room(shape, &graph.rooms[room], design);
        }

        let corners = |a: (i32, i32, i32), b: (i32, i32, i32)| {
            BoundingBox::from_corners(frame.world_pos(a.0, a.1, a.2), frame.world_pos(b.0, b.1, b.2))
        };
        let left_wing = corners((1, 1, 1), (23, 8, 21));
        let right_wing = corners((34, 1, 1), (56, 8, 21));
        let penthouse = corners((22, 13, 22), (35, 20, 35));
        let seed = rng.next_i32();
        for (bb, design) in [(left_wing, seed), (right_wing, seed.wrapping_add(1))] {
            pieces.push(inner(Piece::new(
                PieceKind::MonumentWing { design: design & 1 },
                bb,
                Some(dir),
                1,
            )));
        }
        pieces.push(inner(Piece::new(PieceKind::MonumentPenthouse, penthouse, Some(dir), 1)));
        pieces.build(StructureFamily::OceanMonument, chunk)
    }
}

fn water_box(painter: &mut Painter<'_, '_>, x0: i32, y0: i32, z0: i32, x1: i32, y1: i32, z1: i32) {
    let water = Voxel::new(BLOCK_WATER);
    painter.fill(x0, y0, z0, x1, y1, z1, water, water, false);
}

pub(crate) fn paint(piece: &Piece, painter: &mut Painter<'_, '_>) -> bool {
    let (w, h, d) = painter.local_max();
    let prismarine = Voxel::new(BLOCK_PRISMARINE);
    let bricks = Voxel::new(BLOCK_PRISMARINE_BRICKS);
    let dark = Voxel::new(BLOCK_DARK_PRISMARINE);
    let lantern = Voxel::new(BLOCK_SEA_LANTERN);
    let water = Voxel::new(BLOCK_WATER);

    match piece.kind() {
        PieceKind::MonumentBuilding => {
            painter.fill(0, 0, 0, w, 0, d, prismarine, prismarine, false);
            painter.fill(0, 1, 0, w, 12, d, bricks, water, false);
            water_box(painter, 26, 1, 0, 31, 4, 21);
            for (x, z) in [(0, 0), (w, 0), (0, d), (w, d)] {
                painter.fill(x, 1, z, x, h, z, dark, dark, false);
            }
        }
        PieceKind::MonumentRoom {
            shape,
            openings,
            design,
            ..
        } => {
            painter.fill(0, 0, 0, w, h, d, bricks, water, false);
            let open = |dir: Direction| openings & (1 << dir.data_3d()) != 0;
            if open(Direction::South) {
                water_box(painter, 3, 1, 0, 4, 2, 0);
            }
            if open(Direction::North) {
                water_box(painter, 3, 1, 7, 4, 2, 7);
            }
            if open(Direction::West) {
                water_box(painter, 0, 1, 3, 0, 2, 4);
            }
            if open(Direction::East) {
                water_box(painter, 7, 1, 3, 7, 2, 4);
            }
            if open(Direction::Down) {
                water_box(painter, 3, 0, 3, 4, 0, 4);
            }
            if open(Direction::Up) {
                water_box(painter, 3, 3, 3, 4, 3, 4);
            }
            match shape {
                MonumentRoomShape::Entry => {
                    water_box(painter, 3, 1, 0, 4, 3, 0);
                    painter.fill(1, 1, 1, 1, 2, 1, prismarine, prismarine, false);
                    painter.fill(6, 1, 1, 6, 2, 1, prismarine, prismarine, false);
                }
                MonumentRoomShape::Core => {
                    let gold = Voxel::new(BLOCK_GOLD_BLOCK);
                    painter.fill(6, 1, 6, 9, 1, 9, dark, dark, false);
                    painter.fill(7, 2, 7, 8, 3, 8, gold, gold, false);
                    for (x, z) in [(1, 1), (14, 1), (1, 14), (14, 14)] {
                        painter.fill(x, 1, z, x, h - 1, z, prismarine, prismarine, false);
                        painter.place(lantern, x, h - 1, z);
                    }
                }
                MonumentRoomShape::Simple => match design {
                    0 => {
                        painter.fill(3, 1, 3, 4, 1, 4, dark, dark, false);
                        painter.place(lantern, 3, 2, 3);
                    }
                    1 => {
                        for (x, z) in [(1, 1), (6, 1), (1, 6), (6, 6)] {
                            painter.fill(x, 1, z, x, 2, z, prismarine, prismarine, false);
                        }
                    }
                    _ => painter.fill(2, 1, 2, 5, 1, 5, dark, water, false),
                },
                MonumentRoomShape::SimpleTop => {
                    painter.fill_maybe(0.3, 1, 1, 1, w - 1, 1, d - 1, Voxel::new(BLOCK_SPONGE), water, false);
                }
                _ => {
                    let cx = (w + 1) / 2;
                    let cz = (d + 1) / 2;
                    painter.fill(cx - 1, 1, cz - 1, cx, h - 1, cz, prismarine, lantern, false);
                }
            }
        }
        PieceKind::MonumentWing { design } => {
            painter.fill(0, 0, 0, w, h, d, dark, water, false);
            if *design == 0 {
                painter.fill(w / 2 - 2, 1, d / 2 - 2, w / 2 + 2, 2, d / 2 + 2, Voxel::new(BLOCK_SPONGE), Voxel::new(BLOCK_SPONGE), false);
            } else {
                for x in (2..w).step_by(4) {
                    painter.place(lantern, x, h - 1, 2);
                    painter.place(lantern, x, h - 1, d - 2);
                }
            }
            painter.place(Voxel::new(BLOCK_GOLD_BLOCK), w / 2, 1, d / 2);
        }
        PieceKind::MonumentPenthouse => {
            painter.fill(0, 0, 0, w, h, d, bricks, water, false);
            water_box(painter, w / 2 - 1, 0, 0, w / 2 + 1, 2, 0);
            for (x, z) in [(1, 1), (w - 1, 1), (1, d - 1), (w - 1, d - 1)] {
                painter.place(lantern, x, h - 1, z);
            }
        }
        _ => {}
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::overlapping_pairs;
    use structgen_core::StructureRng;

    #[test]
    fn lattice_has_forty_six_cells_and_three_connectors() {
        let graph = RoomGraph::generate(&mut StructureRng::new(3));
        assert_eq!(graph.lattice_rooms().count(), 46);
        assert_eq!(graph.rooms().len(), 49);
        assert!(graph.rooms()[graph.source()].is_source);
        assert_eq!(graph.rooms()[graph.source()].index, SOURCE_INDEX);
    }

    #[test]
    fn core_claims_two_by_two_by_two() {
        let graph = RoomGraph::generate(&mut StructureRng::new(8));
        let core = &graph.rooms()[graph.core()];
        assert!(core.claimed);
        assert_eq!(core.index / 25, 0);
        assert_eq!(core.index / 5 % 5, 2);
        let claimed = graph.rooms().iter().filter(|r| r.claimed && !r.is_special()).count();
        assert_eq!(claimed, 8);
    }

    #[test]
    fn pruned_lattice_stays_connected() {
        for seed in 0..50 {
            let mut graph = RoomGraph::generate(&mut StructureRng::new(seed));
            let rooms: Vec<usize> = graph.lattice_rooms().collect();
            for room in rooms {
                assert!(graph.reaches_source(room), "seed {seed} room {room}");
            }
        }
    }

    #[test]
    fn shape_ids_resolve() {
        for shape in MonumentRoomShape::ALL {
            assert_eq!(MonumentRoomShape::from_id(shape.id()), Some(shape));
        }
        assert_eq!(MonumentRoomShape::from_id("OMB"), None);
    }

    #[test]
    fn rooms_stay_inside_building_without_overlapping() {
        let generator = OceanMonumentGenerator::new(&OceanMonumentConfig::default());
        for seed in 0..20 {
            let start = generator
                .generate(ChunkPos::new(4, -2), &mut StructureRng::new(seed))
                .expect("monument always generates");
            let building = *start.pieces()[0].bounding_box();
            assert_eq!(building.y_span(), 23);
            let rooms: Vec<&Piece> = start
                .pieces()
                .iter()
                .filter(|p| matches!(p.kind(), PieceKind::MonumentRoom { .. }))
                .collect();
            for room in &rooms {
                assert!(building.encloses(room.bounding_box()), "seed {seed}: {}", room.id());
            }
            for (i, a) in rooms.iter().enumerate() {
                for b in rooms.iter().skip(i + 1) {
                    assert!(!a.bounding_box().intersects(b.bounding_box()), "seed {seed}");
                }
            }
            assert!(overlapping_pairs(start.pieces()).is_empty());
        }
    }

    #[test]
    fn inner_pieces_only_share_space_with_the_building() {
        let generator = OceanMonumentGenerator::new(&OceanMonumentConfig::default());
        let start = generator
            .generate(ChunkPos::new(1, 1), &mut StructureRng::new(12))
            .expect("monument always generates");
        let pieces = start.pieces();
        assert_eq!(pieces[0].batch(), Some(BUILDING_BATCH));
        assert_eq!(pieces[0].parent_batch(), None);

        let mut batches: Vec<i32> = pieces[1..].iter().filter_map(Piece::batch).collect();
        assert_eq!(batches.len(), pieces.len() - 1);
        batches.sort_unstable();
        batches.dedup();
        assert_eq!(batches.len(), pieces.len() - 1);
        assert!(pieces[1..]
            .iter()
            .all(|p| p.parent_batch() == Some(BUILDING_BATCH)));

        // A second copy of a room is no longer hidden behind a shared batch.
        let mut crowded = pieces.to_vec();
        let copy = crowded[1].clone().with_batch(999);
        crowded.push(copy);
        assert_eq!(overlapping_pairs(&crowded), vec![(1, pieces.len())]);
    }

    #[test]
    fn every_lattice_cell_is_covered_once() {
        let generator = OceanMonumentGenerator::new(&OceanMonumentConfig::default());
        let start = generator
            .generate(ChunkPos::new(0, 0), &mut StructureRng::new(77))
            .expect("monument always generates");
        let volume: i32 = start
            .pieces()
            .iter()
            .filter_map(|p| match p.kind() {
                PieceKind::MonumentRoom { shape, .. } => {
                    let (x, y, z) = shape.cells();
                    Some(x * y * z)
                }
                _ => None,
            })
            .sum();
        assert_eq!(volume, 46);
    }
}
