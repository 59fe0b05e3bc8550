//! Stronghold layout: a weighted chain of stone-brick rooms and corridors.
//!
//! Piece selection is driven by a per-instance [`GenerationContext`] holding
//! the weight table, the placement counters and the imposed next piece. Every
//! frontier draws up to `selection_attempts` times from the table before
//! falling back to a short filler corridor that closes the branch.

use crate::block::*;
use crate::config::{GenerationConfig, PieceWeightConfig, StrongholdConfig};
use crate::piece::{Painter, Piece, PieceKind};
use crate::structure_start::{StructurePieces, StructureStart};
use crate::structures::{StructureFamily, StructureGenerator};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use structgen_core::{Axis, BoundingBox, ChunkPos, Direction, ParseEnumError, RandomSource};
use tracing::debug;

const SEA_LEVEL_OFFSET: i32 = 10;

/// Piece classes that can be drawn from the weight table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrongholdPieceType {
    Straight,
    PrisonHall,
    LeftTurn,
    RightTurn,
    RoomCrossing,
    StraightStairsDown,
    StairsDown,
    FiveCrossing,
    ChestCorridor,
    Library,
    PortalRoom,
}

impl StrongholdPieceType {
    /// `(kind, weight, max_place_count)` rows of the stock table.
    pub const DEFAULT_WEIGHTS: [(StrongholdPieceType, i32, i32); 11] = [
        (StrongholdPieceType::Straight, 40, 0),
        (StrongholdPieceType::PrisonHall, 5, 5),
        (StrongholdPieceType::LeftTurn, 20, 0),
        (StrongholdPieceType::RightTurn, 20, 0),
        (StrongholdPieceType::RoomCrossing, 10, 6),
        (StrongholdPieceType::StraightStairsDown, 5, 5),
        (StrongholdPieceType::StairsDown, 5, 5),
        (StrongholdPieceType::FiveCrossing, 5, 4),
        (StrongholdPieceType::ChestCorridor, 5, 4),
        (StrongholdPieceType::Library, 10, 2),
        (StrongholdPieceType::PortalRoom, 20, 1),
    ];

    /// Pieces of this class need a generation depth strictly above this.
    pub const fn depth_gate(self) -> Option<i32> {
        match self {
            StrongholdPieceType::Library => Some(4),
            StrongholdPieceType::PortalRoom => Some(5),
            _ => None,
        }
    }
}

/// Doorway style on a piece's entry side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SmallDoor {
    Opening,
    WoodDoor,
    Grates,
    IronDoor,
}

impl SmallDoor {
    pub fn random(rng: &mut dyn RandomSource) -> Self {
        match rng.next_int(5) {
            2 => SmallDoor::WoodDoor,
            3 => SmallDoor::Grates,
            4 => SmallDoor::IronDoor,
            _ => SmallDoor::Opening,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            SmallDoor::Opening => "OPENING",
            SmallDoor::WoodDoor => "WOOD_DOOR",
            SmallDoor::Grates => "GRATES",
            SmallDoor::IronDoor => "IRON_DOOR",
        }
    }
}

impl fmt::Display for SmallDoor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SmallDoor {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [
            SmallDoor::Opening,
            SmallDoor::WoodDoor,
            SmallDoor::Grates,
            SmallDoor::IronDoor,
        ]
        .into_iter()
        .find(|door| door.name() == s)
        .ok_or_else(|| ParseEnumError::new("small door", s))
    }
}

/// Live row of the weight table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PieceWeight {
    pub kind: StrongholdPieceType,
    pub weight: i32,
    /// `0` means unlimited.
    pub max_place_count: i32,
    pub place_count: i32,
}

impl PieceWeight {
    /// Capacity left; unlimited rows are always valid.
    pub fn is_valid(&self) -> bool {
        self.max_place_count == 0 || self.place_count < self.max_place_count
    }

    pub fn do_place(&self, depth: i32) -> bool {
        self.is_valid() && self.kind.depth_gate().map_or(true, |gate| depth > gate)
    }
}

/// Selection state for one stronghold instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationContext {
    weights: Vec<PieceWeight>,
    total_weight: i32,
    imposed: Option<StrongholdPieceType>,
    previous: Option<StrongholdPieceType>,
}

impl GenerationContext {
    /// Fresh context with every counter at zero.
    pub fn new(table: &[PieceWeightConfig]) -> Self {
        let weights: Vec<PieceWeight> = table
            .iter()
            .map(|row| PieceWeight {
                kind: row.kind,
                weight: row.weight,
                max_place_count: row.max_place_count,
                place_count: 0,
            })
            .collect();
        let total_weight = weights.iter().map(|w| w.weight).sum();
        Self {
            weights,
            total_weight,
            imposed: None,
            previous: None,
        }
    }

    /// Active rows in table order.
    pub fn weights(&self) -> &[PieceWeight] {
        &self.weights
    }

    pub fn weight(&self, kind: StrongholdPieceType) -> Option<&PieceWeight> {
        self.weights.iter().find(|w| w.kind == kind)
    }

    pub fn total_weight(&self) -> i32 {
        self.total_weight
    }

    /// Recompute the total weight; `false` once every capped row is exhausted.
    pub fn update_piece_weight(&mut self) -> bool {
        let mut capped_left = false;
        self.total_weight = 0;
        for w in &self.weights {
            if w.max_place_count > 0 && w.place_count < w.max_place_count {
                capped_left = true;
            }
            self.total_weight += w.weight;
        }
        capped_left
    }

    /// Force the next selection to try `kind` first.
    pub fn impose(&mut self, kind: StrongholdPieceType) {
        self.imposed = Some(kind);
    }

    fn take_imposed(&mut self) -> Option<StrongholdPieceType> {
        self.imposed.take()
    }

    /// Class placed by the last successful weighted draw.
    pub fn previous(&self) -> Option<StrongholdPieceType> {
        self.previous
    }

    /// True when `kind` is still in the table and may go at `depth`.
    pub fn do_place(&self, kind: StrongholdPieceType, depth: i32) -> bool {
        self.weight(kind).is_some_and(|w| w.do_place(depth))
    }

    /// Count one placement; exhausted rows leave the table.
    pub fn record_placement(&mut self, kind: StrongholdPieceType) {
        let Some(index) = self.weights.iter().position(|w| w.kind == kind) else {
            return;
        };
        self.weights[index].place_count += 1;
        self.previous = Some(kind);
        if !self.weights[index].is_valid() {
            self.weights.remove(index);
        }
    }
}

/// Stronghold generator; retries whole layouts until one holds a portal room.
#[derive(Debug, Clone)]
pub struct StrongholdGenerator {
    config: StrongholdConfig,
    sea_level: i32,
    min_y: i32,
}

impl StrongholdGenerator {
    pub fn new(config: &GenerationConfig) -> Self {
        Self {
            config: config.stronghold.clone(),
            sea_level: config.sea_level,
            min_y: config.min_y,
        }
    }

    /// One layout attempt driven by `ctx`, before any vertical adjustment.
    pub fn layout(
        &self,
        chunk: ChunkPos,
        rng: &mut dyn RandomSource,
        ctx: &mut GenerationContext,
    ) -> StructurePieces {
        let dir = Direction::random_horizontal(rng);
        let x = chunk.block_x(2);
        let z = chunk.block_z(2);
        let start_box = BoundingBox::new(x, 64, z, x + 4, 74, z + 4);
        let start = Piece::new(
            PieceKind::StrongholdStairsDown {
                entry_door: SmallDoor::Opening,
                is_source: true,
            },
            start_box,
            Some(dir),
            0,
        );

        let mut expansion = Expansion {
            config: &self.config,
            ctx,
            pieces: StructurePieces::new(),
            rng,
            origin: start_box,
            pending: Vec::new(),
        };
        expansion.pieces.push(start.clone());
        expansion.add_children(&start);
        while !expansion.pending.is_empty() {
            let pick = expansion.rng.next_int(expansion.pending.len() as i32) as usize;
            let index = expansion.pending.remove(pick);
            if let Some(piece) = expansion.pieces.get(index).cloned() {
                expansion.add_children(&piece);
            }
        }
        expansion.pieces
    }
}

impl StructureGenerator for StrongholdGenerator {
    fn family(&self) -> StructureFamily {
        StructureFamily::Stronghold
    }

    fn generate(&self, chunk: ChunkPos, rng: &mut dyn RandomSource) -> Option<StructureStart> {
        for attempt in 0..self.config.start_attempts {
            let mut ctx = GenerationContext::new(&self.config.weights);
            let mut pieces = self.layout(chunk, rng, &mut ctx);
            pieces.move_below_sea_level(self.sea_level, self.min_y, rng, SEA_LEVEL_OFFSET);
            let has_portal = pieces
                .pieces()
                .iter()
                .any(|p| matches!(p.kind(), PieceKind::StrongholdPortalRoom));
            if has_portal {
                return pieces.build(StructureFamily::Stronghold, chunk);
            }
            debug!(attempt, pieces = pieces.len(), "stronghold without portal room, retrying");
        }
        None
    }
}

/// Build a piece of class `kind` entered at `(x, y, z)` facing `dir`.
///
/// `None` when the box dips to `min_box_y` or below, or collides with `pieces`.
#[allow(clippy::too_many_arguments)]
pub fn create_piece(
    kind: StrongholdPieceType,
    pieces: &StructurePieces,
    rng: &mut dyn RandomSource,
    x: i32,
    y: i32,
    z: i32,
    dir: Direction,
    depth: i32,
    min_box_y: i32,
) -> Option<Piece> {
    let fits = |bb: &BoundingBox| bb.min_y() > min_box_y && pieces.find_collision(bb).is_none();
    let boxed = |ox, oy, oz, sx, sy, sz| BoundingBox::oriented(x, y, z, ox, oy, oz, sx, sy, sz, dir);
    let piece = |kind: PieceKind, bb: BoundingBox| Some(Piece::new(kind, bb, Some(dir), depth));

    match kind {
        StrongholdPieceType::Straight => {
            let bb = boxed(-1, -1, 0, 5, 5, 7);
            if !fits(&bb) {
                return None;
            }
            let entry_door = SmallDoor::random(rng);
            let left_child = rng.next_int(2) == 0;
            let right_child = rng.next_int(2) == 0;
            piece(
                PieceKind::StrongholdStraight {
                    entry_door,
                    left_child,
                    right_child,
                },
                bb,
            )
        }
        StrongholdPieceType::PrisonHall => {
            let bb = boxed(-1, -1, 0, 9, 5, 11);
            if !fits(&bb) {
                return None;
            }
            piece(
                PieceKind::StrongholdPrisonHall {
                    entry_door: SmallDoor::random(rng),
                },
                bb,
            )
        }
        StrongholdPieceType::LeftTurn | StrongholdPieceType::RightTurn => {
            let bb = boxed(-1, -1, 0, 5, 5, 5);
            if !fits(&bb) {
                return None;
            }
            let entry_door = SmallDoor::random(rng);
            let kind = if kind == StrongholdPieceType::LeftTurn {
                PieceKind::StrongholdLeftTurn { entry_door }
            } else {
                PieceKind::StrongholdRightTurn { entry_door }
            };
            piece(kind, bb)
        }
        StrongholdPieceType::RoomCrossing => {
            let bb = boxed(-4, -1, 0, 11, 7, 11);
            if !fits(&bb) {
                return None;
            }
            let entry_door = SmallDoor::random(rng);
            let room_type = rng.next_int(5);
            piece(
                PieceKind::StrongholdRoomCrossing {
                    entry_door,
                    room_type,
                },
                bb,
            )
        }
        StrongholdPieceType::StraightStairsDown => {
            let bb = boxed(-1, -7, 0, 5, 11, 8);
            if !fits(&bb) {
                return None;
            }
            piece(
                PieceKind::StrongholdStraightStairsDown {
                    entry_door: SmallDoor::random(rng),
                },
                bb,
            )
        }
        StrongholdPieceType::StairsDown => {
            let bb = boxed(-1, -7, 0, 5, 11, 5);
            if !fits(&bb) {
                return None;
            }
            piece(
                PieceKind::StrongholdStairsDown {
                    entry_door: SmallDoor::random(rng),
                    is_source: false,
                },
                bb,
            )
        }
        StrongholdPieceType::FiveCrossing => {
            let bb = boxed(-4, -3, 0, 10, 9, 11);
            if !fits(&bb) {
                return None;
            }
            let entry_door = SmallDoor::random(rng);
            let left_low = rng.next_bool();
            let left_high = rng.next_bool();
            let right_low = rng.next_bool();
            let right_high = rng.next_int(3) > 0;
            piece(
                PieceKind::StrongholdFiveCrossing {
                    entry_door,
                    left_low,
                    left_high,
                    right_low,
                    right_high,
                },
                bb,
            )
        }
        StrongholdPieceType::ChestCorridor => {
            let bb = boxed(-1, -1, 0, 5, 5, 7);
            if !fits(&bb) {
                return None;
            }
            piece(
                PieceKind::StrongholdChestCorridor {
                    entry_door: SmallDoor::random(rng),
                },
                bb,
            )
        }
        StrongholdPieceType::Library => {
            let mut bb = boxed(-4, -1, 0, 14, 11, 15);
            if !fits(&bb) {
                bb = boxed(-4, -1, 0, 14, 6, 15);
                if !fits(&bb) {
                    return None;
                }
            }
            piece(
                PieceKind::StrongholdLibrary {
                    entry_door: SmallDoor::random(rng),
                    is_tall: bb.y_span() > 6,
                },
                bb,
            )
        }
        StrongholdPieceType::PortalRoom => {
            let bb = boxed(-4, -1, 0, 11, 8, 16);
            if !fits(&bb) {
                return None;
            }
            piece(PieceKind::StrongholdPortalRoom, bb)
        }
    }
}

/// Longest filler corridor (3 down to 1 blocks) that collides with nothing.
///
/// Only offered when a full-length corridor would hit a piece on the same
/// floor level, so the filler closes the branch flush against it.
pub fn find_filler_box(
    pieces: &StructurePieces,
    x: i32,
    y: i32,
    z: i32,
    dir: Direction,
) -> Option<BoundingBox> {
    let full = BoundingBox::oriented(x, y, z, -1, -1, 0, 5, 5, 4, dir);
    let blocker = pieces.find_collision(&full)?;
    if blocker.bounding_box().min_y() != full.min_y() {
        return None;
    }
    (1..=3)
        .rev()
        .map(|len| BoundingBox::oriented(x, y, z, -1, -1, 0, 5, 5, len, dir))
        .find(|bb| pieces.find_collision(bb).is_none())
}

struct Expansion<'c, 'r> {
    config: &'c StrongholdConfig,
    ctx: &'c mut GenerationContext,
    pieces: StructurePieces,
    rng: &'r mut dyn RandomSource,
    origin: BoundingBox,
    /// Indices of committed pieces whose children are not expanded yet.
    pending: Vec<usize>,
}

impl Expansion<'_, '_> {
    fn generate_and_add(&mut self, x: i32, y: i32, z: i32, dir: Direction, depth: i32) {
        if depth > self.config.max_depth {
            return;
        }
        let reach = self.config.max_distance;
        if (x - self.origin.min_x()).abs() > reach || (z - self.origin.min_z()).abs() > reach {
            return;
        }
        if let Some(piece) = self.piece_from_small_door(x, y, z, dir, depth + 1) {
            self.pieces.push(piece);
            self.pending.push(self.pieces.len() - 1);
        }
    }

    fn piece_from_small_door(
        &mut self,
        x: i32,
        y: i32,
        z: i32,
        dir: Direction,
        depth: i32,
    ) -> Option<Piece> {
        if !self.ctx.update_piece_weight() {
            return None;
        }
        let min_box_y = self.config.min_box_y;

        if let Some(kind) = self.ctx.take_imposed() {
            let imposed = create_piece(kind, &self.pieces, self.rng, x, y, z, dir, depth, min_box_y);
            if imposed.is_some() {
                return imposed;
            }
        }

        for _ in 0..self.config.selection_attempts {
            let mut roll = self.rng.next_int(self.ctx.total_weight());
            // A failed factory keeps the roll negative, so later rows get a try too.
            for i in 0..self.ctx.weights.len() {
                let row = self.ctx.weights[i];
                roll -= row.weight;
                if roll < 0 {
                    if !row.do_place(depth) || self.ctx.previous == Some(row.kind) {
                        break;
                    }
                    let candidate =
                        create_piece(row.kind, &self.pieces, self.rng, x, y, z, dir, depth, min_box_y);
                    if let Some(piece) = candidate {
                        self.ctx.record_placement(row.kind);
                        return Some(piece);
                    }
                }
            }
        }

        let bb = find_filler_box(&self.pieces, x, y, z, dir)?;
        if bb.min_y() <= 1 {
            return None;
        }
        let steps = if dir.axis() == Axis::Z {
            bb.z_span()
        } else {
            bb.x_span()
        };
        Some(Piece::new(
            PieceKind::StrongholdFillerCorridor { steps },
            bb,
            Some(dir),
            depth,
        ))
    }

    fn forward(&mut self, piece: &Piece, x_off: i32, y_off: i32) {
        let Some(dir) = piece.orientation() else {
            return;
        };
        let bb = piece.bounding_box();
        let y = bb.min_y() + y_off;
        let (x, z) = match dir {
            Direction::South => (bb.min_x() + x_off, bb.max_z() + 1),
            Direction::West => (bb.min_x() - 1, bb.min_z() + x_off),
            Direction::East => (bb.max_x() + 1, bb.min_z() + x_off),
            _ => (bb.min_x() + x_off, bb.min_z() - 1),
        };
        self.generate_and_add(x, y, z, dir, piece.gen_depth());
    }

    fn left(&mut self, piece: &Piece, y_off: i32, z_off: i32) {
        let Some(dir) = piece.orientation() else {
            return;
        };
        let bb = piece.bounding_box();
        let y = bb.min_y() + y_off;
        let (x, z, next) = match dir {
            Direction::West | Direction::East => (bb.min_x() + z_off, bb.min_z() - 1, Direction::North),
            _ => (bb.min_x() - 1, bb.min_z() + z_off, Direction::West),
        };
        self.generate_and_add(x, y, z, next, piece.gen_depth());
    }

    fn right(&mut self, piece: &Piece, y_off: i32, z_off: i32) {
        let Some(dir) = piece.orientation() else {
            return;
        };
        let bb = piece.bounding_box();
        let y = bb.min_y() + y_off;
        let (x, z, next) = match dir {
            Direction::West | Direction::East => (bb.min_x() + z_off, bb.max_z() + 1, Direction::South),
            _ => (bb.max_x() + 1, bb.min_z() + z_off, Direction::East),
        };
        self.generate_and_add(x, y, z, next, piece.gen_depth());
    }

    fn add_children(&mut self, piece: &Piece) {
        let turns_left = matches!(piece.orientation(), Some(Direction::North | Direction::East));
        match piece.kind() {
            PieceKind::StrongholdStairsDown { is_source, .. } => {
                if *is_source {
                    self.ctx.impose(StrongholdPieceType::FiveCrossing);
                }
                self.forward(piece, 1, 1);
            }
            PieceKind::StrongholdStraight {
                left_child,
                right_child,
                ..
            } => {
                self.forward(piece, 1, 1);
                if *left_child {
                    self.left(piece, 1, 2);
                }
                if *right_child {
                    self.right(piece, 1, 2);
                }
            }
            PieceKind::StrongholdChestCorridor { .. }
            | PieceKind::StrongholdPrisonHall { .. }
            | PieceKind::StrongholdStraightStairsDown { .. } => self.forward(piece, 1, 1),
            PieceKind::StrongholdLeftTurn { .. } => {
                if turns_left {
                    self.left(piece, 1, 1);
                } else {
                    self.right(piece, 1, 1);
                }
            }
            PieceKind::StrongholdRightTurn { .. } => {
                if turns_left {
                    self.right(piece, 1, 1);
                } else {
                    self.left(piece, 1, 1);
                }
            }
            PieceKind::StrongholdRoomCrossing { .. } => {
                self.forward(piece, 4, 1);
                self.left(piece, 1, 4);
                self.right(piece, 1, 4);
            }
            PieceKind::StrongholdFiveCrossing {
                left_low,
                left_high,
                right_low,
                right_high,
                ..
            } => {
                let (low, high) = match piece.orientation() {
                    Some(Direction::West | Direction::North) => (8 - 3, 8 - 5),
                    _ => (3, 5),
                };
                self.forward(piece, 5, 1);
                if *left_low {
                    self.left(piece, low, 1);
                }
                if *left_high {
                    self.left(piece, high, 7);
                }
                if *right_low {
                    self.right(piece, low, 1);
                }
                if *right_high {
                    self.right(piece, high, 7);
                }
            }
            _ => {}
        }
    }
}

fn stone_brick(rng: &mut dyn RandomSource, edge: bool) -> Voxel {
    if !edge {
        return Voxel::AIR;
    }
    let roll = rng.next_float();
    if roll < 0.2 {
        Voxel::new(BLOCK_CRACKED_STONE_BRICKS)
    } else if roll < 0.5 {
        Voxel::new(BLOCK_MOSSY_STONE_BRICKS)
    } else {
        Voxel::new(BLOCK_STONE_BRICKS)
    }
}

fn small_door(painter: &mut Painter<'_, '_>, door: SmallDoor, x: i32, y: i32, z: i32) {
    let bricks = Voxel::new(BLOCK_STONE_BRICKS);
    let frame = [
        (x, y, z),
        (x, y + 1, z),
        (x, y + 2, z),
        (x + 1, y + 2, z),
        (x + 2, y + 2, z),
        (x + 2, y + 1, z),
        (x + 2, y, z),
    ];
    let (frame_block, filling) = match door {
        SmallDoor::Opening => {
            painter.fill_air(x, y, z, x + 2, y + 2, z);
            return;
        }
        SmallDoor::WoodDoor => (bricks, Voxel::facing(BLOCK_OAK_DOOR, Direction::North)),
        SmallDoor::Grates => (Voxel::new(BLOCK_IRON_BARS), Voxel::AIR),
        SmallDoor::IronDoor => (bricks, Voxel::facing(BLOCK_IRON_DOOR, Direction::North)),
    };
    for (fx, fy, fz) in frame {
        painter.place(frame_block, fx, fy, fz);
    }
    painter.place(filling, x + 1, y, z);
    painter.place(filling, x + 1, y + 1, z);
}

/// Stone-brick shell of the piece's full local extent.
fn shell(painter: &mut Painter<'_, '_>, w: i32, h: i32, d: i32) {
    painter.fill_with(0, 0, 0, w, h, d, true, stone_brick);
}

pub(crate) fn paint(piece: &Piece, painter: &mut Painter<'_, '_>) -> bool {
    let (w, h, d) = painter.local_max();
    let bricks = Voxel::new(BLOCK_STONE_BRICKS);
    let torch = Voxel::new(BLOCK_TORCH);

    match piece.kind() {
        PieceKind::StrongholdStairsDown { entry_door, .. } => {
            shell(painter, w, h, d);
            small_door(painter, *entry_door, 1, 7, 0);
            small_door(painter, SmallDoor::Opening, 1, 1, d);
            // Spiral down around a central column.
            for (x, y, z) in [
                (2, 6, 1),
                (1, 5, 1),
                (1, 5, 2),
                (1, 4, 3),
                (2, 4, 3),
                (3, 3, 3),
                (3, 3, 2),
                (3, 2, 1),
                (2, 2, 1),
                (1, 1, 1),
            ] {
                painter.place(bricks, x, y, z);
            }
            painter.fill(2, 1, 2, 2, 6, 2, bricks, bricks, false);
        }
        PieceKind::StrongholdStraight {
            entry_door,
            left_child,
            right_child,
        } => {
            shell(painter, w, h, d);
            small_door(painter, *entry_door, 1, 1, 0);
            small_door(painter, SmallDoor::Opening, 1, 1, d);
            painter.maybe_place(0.1, Voxel::facing(BLOCK_WALL_TORCH, Direction::East), 1, 2, 1);
            painter.maybe_place(0.1, Voxel::facing(BLOCK_WALL_TORCH, Direction::West), 3, 2, 1);
            if *left_child {
                painter.fill_air(0, 1, 2, 0, 3, 4);
            }
            if *right_child {
                painter.fill_air(w, 1, 2, w, 3, 4);
            }
        }
        PieceKind::StrongholdChestCorridor { entry_door } => {
            shell(painter, w, h, d);
            small_door(painter, *entry_door, 1, 1, 0);
            small_door(painter, SmallDoor::Opening, 1, 1, d);
            painter.fill(3, 1, 2, 3, 1, 4, bricks, bricks, false);
            painter.place_chest(3, 2, 3, Direction::West);
        }
        PieceKind::StrongholdLeftTurn { entry_door } | PieceKind::StrongholdRightTurn { entry_door } => {
            shell(painter, w, h, d);
            small_door(painter, *entry_door, 1, 1, 0);
            let opens_left = matches!(piece.orientation(), Some(Direction::North | Direction::East))
                == matches!(piece.kind(), PieceKind::StrongholdLeftTurn { .. });
            if opens_left {
                painter.fill_air(0, 1, 1, 0, 3, 3);
            } else {
                painter.fill_air(w, 1, 1, w, 3, 3);
            }
        }
        PieceKind::StrongholdRoomCrossing {
            entry_door,
            room_type,
        } => {
            shell(painter, w, h, d);
            small_door(painter, *entry_door, 4, 1, 0);
            painter.fill_air(4, 1, d, 6, 3, d);
            painter.fill_air(0, 1, 4, 0, 3, 6);
            painter.fill_air(w, 1, 4, w, 3, 6);
            match room_type {
                0 => {
                    painter.fill(5, 1, 5, 5, 3, 5, bricks, bricks, false);
                    for (x, z) in [(4, 5), (6, 5), (5, 4), (5, 6)] {
                        painter.place(torch, x, 3, z);
                    }
                }
                1 => {
                    let cobble = Voxel::new(BLOCK_COBBLESTONE);
                    painter.fill(3, 1, 3, 7, 1, 7, cobble, Voxel::new(BLOCK_WATER), false);
                }
                2 => {
                    let cobble = Voxel::new(BLOCK_COBBLESTONE);
                    painter.fill(1, 3, 1, 9, 3, 9, cobble, Voxel::AIR, false);
                    painter.fill_air(4, 3, 1, 6, 3, 1);
                    painter.place_chest(3, 4, 8, Direction::South);
                }
                _ => {
                    painter.fill(4, 1, 4, 6, 1, 6, bricks, bricks, false);
                    painter.place(torch, 5, 2, 5);
                }
            }
        }
        PieceKind::StrongholdPrisonHall { entry_door } => {
            shell(painter, w, h, d);
            small_door(painter, *entry_door, 1, 1, 0);
            painter.fill_air(1, 1, d, 3, 3, d);
            painter.fill(4, 1, 1, 4, 3, 1, bricks, bricks, false);
            painter.fill(4, 1, 3, 4, 3, 3, bricks, bricks, false);
            painter.fill(4, 1, 7, 4, 3, 7, bricks, bricks, false);
            painter.fill(4, 1, 9, 4, 3, 9, bricks, bricks, false);
            let bars = Voxel::new(BLOCK_IRON_BARS);
            for z in [2, 4, 5, 6, 8] {
                painter.fill(4, 1, z, 4, 3, z, bars, bars, false);
            }
            painter.fill(5, 1, 5, 7, 3, 5, bars, bars, false);
            painter.place(Voxel::facing(BLOCK_IRON_DOOR, Direction::West), 4, 1, 2);
            painter.place(Voxel::facing(BLOCK_IRON_DOOR, Direction::West), 4, 1, 8);
        }
        PieceKind::StrongholdStraightStairsDown { entry_door } => {
            shell(painter, w, h, d);
            small_door(painter, *entry_door, 1, 7, 0);
            small_door(painter, SmallDoor::Opening, 1, 1, d);
            let stairs = Voxel::facing(BLOCK_STONE_BRICK_STAIRS, Direction::North);
            for step in 0..6 {
                for x in 1..=3 {
                    painter.place(stairs, x, 6 - step, 1 + step);
                    if step < 5 {
                        painter.place(bricks, x, 5 - step, 1 + step);
                    }
                }
            }
        }
        PieceKind::StrongholdFiveCrossing {
            entry_door,
            left_low,
            left_high,
            right_low,
            right_high,
        } => {
            shell(painter, w, h, d);
            small_door(painter, *entry_door, 4, 3, 0);
            if *left_low {
                painter.fill_air(0, 3, 1, 0, 5, 3);
            }
            if *right_low {
                painter.fill_air(w, 3, 1, w, 5, 3);
            }
            if *left_high {
                painter.fill_air(0, 5, 7, 0, 7, 9);
            }
            if *right_high {
                painter.fill_air(w, 5, 7, w, 7, 9);
            }
            painter.fill_air(5, 1, d, 7, 3, d);
            painter.fill_with(1, 2, 1, 8, 2, 6, false, stone_brick);
            painter.fill(5, 1, 7, 7, 1, 9, bricks, bricks, false);
            painter.place(torch, 6, 5, 6);
        }
        PieceKind::StrongholdLibrary {
            entry_door,
            is_tall,
        } => {
            shell(painter, w, h, d);
            small_door(painter, *entry_door, 4, 1, 0);
            let shelf = Voxel::new(BLOCK_BOOKSHELF);
            let planks = Voxel::new(BLOCK_OAK_PLANKS);
            let shelf_top = if *is_tall { 6 } else { 3 };
            for z in 1..d {
                if (z - 1) % 4 == 0 {
                    painter.fill(1, 1, z, 1, shelf_top, z, planks, planks, false);
                    painter.fill(w - 1, 1, z, w - 1, shelf_top, z, planks, planks, false);
                } else {
                    painter.fill(1, 1, z, 1, shelf_top, z, shelf, shelf, false);
                    painter.fill(w - 1, 1, z, w - 1, shelf_top, z, shelf, shelf, false);
                }
            }
            for z in (3..d - 1).step_by(4) {
                painter.fill(3, 1, z, 4, 3, z, shelf, shelf, false);
                painter.fill(w - 4, 1, z, w - 3, 3, z, shelf, shelf, false);
            }
            painter.place_chest(3, 1, 5, Direction::East);
            if *is_tall {
                painter.fill(1, 6, 1, w - 1, 6, d - 1, planks, Voxel::AIR, false);
                painter.place(Voxel::facing(BLOCK_LADDER, Direction::West), w - 2, 6, d - 1);
                painter.place_chest(12, 7, 1, Direction::West);
            }
        }
        PieceKind::StrongholdPortalRoom => {
            shell(painter, w, h, d);
            small_door(painter, SmallDoor::Grates, 4, 1, 0);
            painter.fill(1, h - 1, 1, w - 1, h - 1, d - 1, bricks, Voxel::AIR, false);
            painter.fill(4, 1, 9, 6, 1, 11, bricks, bricks, false);
            painter.fill(4, 2, 9, 6, 2, 11, Voxel::new(BLOCK_LAVA), Voxel::new(BLOCK_LAVA), false);
            let stairs = Voxel::facing(BLOCK_STONE_BRICK_STAIRS, Direction::North);
            for z in 4..=8 {
                painter.place(stairs, 4, (z - 4) / 2 + 1, z);
                painter.place(stairs, 5, (z - 4) / 2 + 1, z);
                painter.place(stairs, 6, (z - 4) / 2 + 1, z);
            }
            let frame = |dir| Voxel::facing(BLOCK_END_PORTAL_FRAME, dir);
            for x in 4..=6 {
                painter.place(frame(Direction::South), x, 3, 8);
                painter.place(frame(Direction::North), x, 3, 12);
            }
            for z in 9..=11 {
                painter.place(frame(Direction::East), 3, 3, z);
                painter.place(frame(Direction::West), 7, 3, z);
            }
            painter.place(Voxel::new(BLOCK_SPAWNER), 5, 3, 6);
        }
        PieceKind::StrongholdFillerCorridor { steps } => {
            let wall = Voxel::new(BLOCK_STONE_BRICKS);
            for z in 0..*steps {
                painter.fill(0, 0, z, 4, 0, z, wall, wall, false);
                for y in 1..=3 {
                    painter.place(wall, 0, y, z);
                    painter.fill_air(1, y, z, 3, y, z);
                    painter.place(wall, 4, y, z);
                }
                painter.fill(0, 4, z, 4, 4, z, wall, wall, false);
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

    fn default_table() -> Vec<PieceWeightConfig> {
        StrongholdConfig::default().weights
    }

    #[test]
    fn fresh_context_sums_default_weights() {
        let ctx = GenerationContext::new(&default_table());
        assert_eq!(ctx.total_weight(), 145);
        assert_eq!(ctx.weights().len(), 11);
        assert!(ctx.previous().is_none());
    }

    #[test]
    fn library_cap_removes_row_after_second_placement() {
        let mut ctx = GenerationContext::new(&default_table());
        assert!(!ctx.do_place(StrongholdPieceType::Library, 4));
        assert!(ctx.do_place(StrongholdPieceType::Library, 5));

        ctx.record_placement(StrongholdPieceType::Library);
        assert_eq!(ctx.weight(StrongholdPieceType::Library).map(|w| w.place_count), Some(1));
        ctx.record_placement(StrongholdPieceType::Library);
        assert!(ctx.weight(StrongholdPieceType::Library).is_none());
        assert!(!ctx.do_place(StrongholdPieceType::Library, 10));
        assert_eq!(ctx.previous(), Some(StrongholdPieceType::Library));
    }

    #[test]
    fn zero_cap_means_unlimited() {
        let mut ctx = GenerationContext::new(&default_table());
        for _ in 0..1000 {
            ctx.record_placement(StrongholdPieceType::Straight);
        }
        assert!(ctx.do_place(StrongholdPieceType::Straight, 1));
        assert_eq!(ctx.weight(StrongholdPieceType::Straight).map(|w| w.place_count), Some(1000));
    }

    #[test]
    fn exhausting_every_capped_row_stops_selection() {
        let table = vec![
            PieceWeightConfig {
                kind: StrongholdPieceType::Straight,
                weight: 40,
                max_place_count: 0,
            },
            PieceWeightConfig {
                kind: StrongholdPieceType::PortalRoom,
                weight: 20,
                max_place_count: 1,
            },
        ];
        let mut ctx = GenerationContext::new(&table);
        assert!(ctx.update_piece_weight());
        ctx.record_placement(StrongholdPieceType::PortalRoom);
        assert!(!ctx.update_piece_weight());
        assert_eq!(ctx.total_weight(), 40);
    }

    #[test]
    fn small_door_names_round_trip() {
        for door in [
            SmallDoor::Opening,
            SmallDoor::WoodDoor,
            SmallDoor::Grates,
            SmallDoor::IronDoor,
        ] {
            assert_eq!(door.name().parse::<SmallDoor>(), Ok(door));
        }
        assert!("TRAPDOOR".parse::<SmallDoor>().is_err());
    }

    #[test]
    fn boxes_at_or_below_floor_are_rejected() {
        let pieces = StructurePieces::new();
        let mut rng = StructureRng::new(1);
        let low = create_piece(
            StrongholdPieceType::StraightStairsDown,
            &pieces,
            &mut rng,
            0,
            17,
            0,
            Direction::North,
            3,
            10,
        );
        assert!(low.is_none());
        let high = create_piece(
            StrongholdPieceType::StraightStairsDown,
            &pieces,
            &mut rng,
            0,
            18,
            0,
            Direction::North,
            3,
            10,
        );
        assert_eq!(high.map(|p| p.bounding_box().min_y()), Some(11));
    }

    #[test]
    fn filler_ends_flush_against_blocker() {
        let mut pieces = StructurePieces::new();
        pieces.push(Piece::new(
            PieceKind::StrongholdPortalRoom,
            BoundingBox::new(-10, 29, -20, 10, 40, -3),
            Some(Direction::North),
            4,
        ));
        let bb = find_filler_box(&pieces, 0, 30, 0, Direction::North).unwrap();
        assert_eq!(bb.to_array(), [-1, 29, -2, 3, 33, 0]);
        assert!(pieces.find_collision(&bb).is_none());
    }

    #[test]
    fn layout_starts_with_source_stairs_and_five_crossing() {
        let generator = StrongholdGenerator::new(&GenerationConfig::default());
        for seed in 0..10 {
            let mut ctx = GenerationContext::new(&default_table());
            let pieces = generator.layout(ChunkPos::new(0, 0), &mut StructureRng::new(seed), &mut ctx);
            assert_eq!(pieces.get(0).map(Piece::id), Some("SHStart"));
            assert_eq!(pieces.get(1).map(Piece::id), Some("SH5C"));
            assert!(overlapping_pairs(pieces.pieces()).is_empty(), "seed {seed}");
        }
    }

    #[test]
    fn generated_strongholds_hold_one_portal_room() {
        let generator = StrongholdGenerator::new(&GenerationConfig::default());
        let mut found = 0;
        for seed in 0..8 {
            if let Some(start) = generator.generate(ChunkPos::new(1, 2), &mut StructureRng::new(seed)) {
                let portals = start
                    .pieces()
                    .iter()
                    .filter(|p| matches!(p.kind(), PieceKind::StrongholdPortalRoom))
                    .count();
                assert_eq!(portals, 1);
                let libraries = start
                    .pieces()
                    .iter()
                    .filter(|p| matches!(p.kind(), PieceKind::StrongholdLibrary { .. }))
                    .count();
                assert!(libraries <= 2);
                found += 1;
            }
        }
        assert!(found > 0);
    }
}
