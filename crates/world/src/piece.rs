//! Placed structural units and the helpers they paint with.
//!
//! A [`Piece`] is plain data: a box, an orientation, a generation depth and a
//! [`PieceKind`] carrying the per-kind fields. Painting goes through
//! [`Piece::post_process`], which never writes outside the clip box of the
//! [`PostProcessContext`] it is handed.

use crate::block::*;
use crate::chunk::{WORLD_MAX_Y, WORLD_MIN_Y};
use crate::grid::{place_structure_block, VoxelGrid};
use crate::ocean_monument::{self, MonumentRoomShape};
use crate::record::{bounding_box_from_ints, DecodeError, Record, Tag};
use crate::stronghold::{self, SmallDoor};
use crate::structure_template::{PlacementSettings, TemplateLibrary};
use crate::structures::StructureFamily;
use crate::mineshaft;
use structgen_core::{
    BlockPos, BoundingBox, ChunkPos, Direction, Mirror, RandomSource, Rotation,
};

/// Placement of a named template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateRef {
    pub name: String,
    /// World position of the template's local origin.
    pub position: BlockPos,
    pub rotation: Rotation,
    pub mirror: Mirror,
    /// Keep existing blocks where the template has air.
    pub ignore_air: bool,
}

impl TemplateRef {
    pub fn new(name: &str, position: BlockPos, rotation: Rotation) -> Self {
        Self {
            name: name.to_string(),
            position,
            rotation,
            mirror: Mirror::None,
            ignore_air: false,
        }
    }

    pub fn with_ignore_air(mut self, ignore_air: bool) -> Self {
        self.ignore_air = ignore_air;
        self
    }

    /// Settings without a clip box.
    pub fn settings(&self) -> PlacementSettings {
        PlacementSettings::default()
            .with_rotation(self.rotation)
            .with_mirror(self.mirror)
            .with_ignore_air(self.ignore_air)
    }

    fn write(&self, record: &mut Record) {
        record.put_string("Template", &self.name);
        record.put_string("Rot", self.rotation.name());
        record.put_string("Mi", self.mirror.name());
        record.put_int("TX", self.position.x);
        record.put_int("TY", self.position.y);
        record.put_int("TZ", self.position.z);
        record.put_bool("OW", !self.ignore_air);
    }

    fn read(record: &Record) -> Result<Self, DecodeError> {
        Ok(Self {
            name: record.get_string("Template")?.to_string(),
            position: BlockPos::new(
                record.get_int("TX")?,
                record.get_int("TY")?,
                record.get_int("TZ")?,
            ),
            rotation: record.get_string("Rot")?.parse()?,
            mirror: record.get_string("Mi")?.parse()?,
            ignore_air: !record.get_bool("OW")?,
        })
    }
}

/// Per-kind state of a piece.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PieceKind {
    MineshaftRoom {
        /// Openings carved towards attached children.
        entrances: Vec<BoundingBox>,
    },
    MineshaftCorridor {
        has_rails: bool,
        has_spiders: bool,
        num_sections: i32,
    },
    MineshaftCrossing {
        direction: Direction,
        two_floors: bool,
    },
    MineshaftStairs,

    StrongholdStairsDown {
        entry_door: SmallDoor,
        is_source: bool,
    },
    StrongholdStraight {
        entry_door: SmallDoor,
        left_child: bool,
        right_child: bool,
    },
    StrongholdChestCorridor {
        entry_door: SmallDoor,
    },
    StrongholdLeftTurn {
        entry_door: SmallDoor,
    },
    StrongholdRightTurn {
        entry_door: SmallDoor,
    },
    StrongholdRoomCrossing {
        entry_door: SmallDoor,
        room_type: i32,
    },
    StrongholdPrisonHall {
        entry_door: SmallDoor,
    },
    StrongholdStraightStairsDown {
        entry_door: SmallDoor,
    },
    StrongholdFiveCrossing {
        entry_door: SmallDoor,
        left_low: bool,
        left_high: bool,
        right_low: bool,
        right_high: bool,
    },
    StrongholdLibrary {
        entry_door: SmallDoor,
        is_tall: bool,
    },
    StrongholdPortalRoom,
    StrongholdFillerCorridor {
        steps: i32,
    },

    MonumentBuilding,
    MonumentRoom {
        shape: MonumentRoomShape,
        /// Lattice index of the room's anchor cell.
        index: i32,
        /// Open faces of the anchor cell, one bit per 3D direction value.
        openings: u8,
        design: i32,
    },
    MonumentWing {
        design: i32,
    },
    MonumentPenthouse,

    EndCity {
        template: TemplateRef,
        /// Batch of the group this piece's group grew out of.
        parent_batch: Option<i32>,
    },
    Mansion {
        template: TemplateRef,
    },
}

impl PieceKind {
    /// Persisted type tag.
    pub fn id(&self) -> &'static str {
        match self {
            PieceKind::MineshaftRoom { .. } => "MSRoom",
            PieceKind::MineshaftCorridor { .. } => "MSCorridor",
            PieceKind::MineshaftCrossing { .. } => "MSCrossing",
            PieceKind::MineshaftStairs => "MSStairs",
            PieceKind::StrongholdStairsDown { is_source: true, .. } => "SHStart",
            PieceKind::StrongholdStairsDown { .. } => "SHSD",
            PieceKind::StrongholdStraight { .. } => "SHS",
            PieceKind::StrongholdChestCorridor { .. } => "SHCC",
            PieceKind::StrongholdLeftTurn { .. } => "SHLT",
            PieceKind::StrongholdRightTurn { .. } => "SHRT",
            PieceKind::StrongholdRoomCrossing { .. } => "SHRC",
            PieceKind::StrongholdPrisonHall { .. } => "SHPH",
            PieceKind::StrongholdStraightStairsDown { .. } => "SHSSD",
            PieceKind::StrongholdFiveCrossing { .. } => "SH5C",
            PieceKind::StrongholdLibrary { .. } => "SHLi",
            PieceKind::StrongholdPortalRoom => "SHPR",
            PieceKind::StrongholdFillerCorridor { .. } => "SHFC",
            PieceKind::MonumentBuilding => "OMB",
            PieceKind::MonumentRoom { shape, .. } => shape.id(),
            PieceKind::MonumentWing { .. } => "OMWR",
            PieceKind::MonumentPenthouse => "OMPenthouse",
            PieceKind::EndCity { .. } => "ECP",
            PieceKind::Mansion { .. } => "WMP",
        }
    }

    /// Structure family this kind belongs to.
    pub fn family(&self) -> StructureFamily {
        match self {
            PieceKind::MineshaftRoom { .. }
            | PieceKind::MineshaftCorridor { .. }
            | PieceKind::MineshaftCrossing { .. }
            | PieceKind::MineshaftStairs => StructureFamily::Mineshaft,
            PieceKind::MonumentBuilding
            | PieceKind::MonumentRoom { .. }
            | PieceKind::MonumentWing { .. }
            | PieceKind::MonumentPenthouse => StructureFamily::OceanMonument,
            PieceKind::EndCity { .. } => StructureFamily::EndCity,
            PieceKind::Mansion { .. } => StructureFamily::WoodlandMansion,
            _ => StructureFamily::Stronghold,
        }
    }

    fn write_fields(&self, record: &mut Record) {
        match self {
            PieceKind::MineshaftRoom { entrances } => {
                let tags = entrances
                    .iter()
                    .map(|bb| Tag::IntArray(bb.to_array().to_vec()))
                    .collect();
                record.put_list("Entrances", tags);
            }
            PieceKind::MineshaftCorridor {
                has_rails,
                has_spiders,
                num_sections,
            } => {
                record.put_bool("hr", *has_rails);
                record.put_bool("sc", *has_spiders);
                record.put_bool("hps", *has_spiders);
                record.put_int("Num", *num_sections);
            }
            PieceKind::MineshaftCrossing {
                direction,
                two_floors,
            } => {
                record.put_int("D", direction.data_2d());
                record.put_bool("tf", *two_floors);
            }
            PieceKind::StrongholdStairsDown {
                entry_door,
                is_source,
            } => {
                record.put_string("EntryDoor", entry_door.name());
                record.put_bool("Source", *is_source);
            }
            PieceKind::StrongholdStraight {
                entry_door,
                left_child,
                right_child,
            } => {
                record.put_string("EntryDoor", entry_door.name());
                record.put_bool("Left", *left_child);
                record.put_bool("Right", *right_child);
            }
            PieceKind::StrongholdChestCorridor { entry_door }
            | PieceKind::StrongholdLeftTurn { entry_door }
            | PieceKind::StrongholdRightTurn { entry_door }
            | PieceKind::StrongholdPrisonHall { entry_door }
            | PieceKind::StrongholdStraightStairsDown { entry_door } => {
                record.put_string("EntryDoor", entry_door.name());
            }
            PieceKind::StrongholdRoomCrossing {
                entry_door,
                room_type,
            } => {
                record.put_string("EntryDoor", entry_door.name());
                record.put_int("Type", *room_type);
            }
            PieceKind::StrongholdFiveCrossing {
                entry_door,
                left_low,
                left_high,
                right_low,
                right_high,
            } => {
                record.put_string("EntryDoor", entry_door.name());
                record.put_bool("leftLow", *left_low);
                record.put_bool("leftHigh", *left_high);
                record.put_bool("rightLow", *right_low);
                record.put_bool("rightHigh", *right_high);
            }
            PieceKind::StrongholdLibrary {
                entry_door,
                is_tall,
            } => {
                record.put_string("EntryDoor", entry_door.name());
                record.put_bool("Tall", *is_tall);
            }
            PieceKind::StrongholdFillerCorridor { steps } => record.put_int("Steps", *steps),
            PieceKind::MonumentRoom {
                index,
                openings,
                design,
                ..
            } => {
                record.put_int("Index", *index);
                record.put_int("Openings", i32::from(*openings));
                record.put_int("Design", *design);
            }
            PieceKind::MonumentWing { design } => record.put_int("Design", *design),
            PieceKind::EndCity {
                template,
                parent_batch,
            } => {
                template.write(record);
                if let Some(parent) = parent_batch {
                    record.put_int("PB", *parent);
                }
            }
            PieceKind::Mansion { template } => template.write(record),
            PieceKind::MineshaftStairs
            | PieceKind::StrongholdPortalRoom
            | PieceKind::MonumentBuilding
            | PieceKind::MonumentPenthouse => {}
        }
    }

    fn read(id: &str, record: &Record) -> Result<Self, DecodeError> {
        let door = || -> Result<SmallDoor, DecodeError> {
            Ok(record.get_string("EntryDoor")?.parse()?)
        };
        let kind = match id {
            "MSRoom" => {
                let entrances = record
                    .get_list("Entrances")?
                    .iter()
                    .map(|tag| match tag {
                        Tag::IntArray(values) => bounding_box_from_ints("Entrances", values),
                        _ => Err(DecodeError::WrongType {
                            key: "Entrances".into(),
                            expected: "list of int arrays",
                        }),
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                PieceKind::MineshaftRoom { entrances }
            }
            "MSCorridor" => PieceKind::MineshaftCorridor {
                has_rails: record.get_bool("hr")?,
                has_spiders: record.get_bool("sc")?,
                num_sections: record.get_int("Num")?,
            },
            "MSCrossing" => PieceKind::MineshaftCrossing {
                direction: horizontal_from_data("D", record.get_int("D")?)?
                    .unwrap_or(Direction::North),
                two_floors: record.get_bool("tf")?,
            },
            "MSStairs" => PieceKind::MineshaftStairs,
            "SHStart" => PieceKind::StrongholdStairsDown {
                entry_door: SmallDoor::Opening,
                is_source: true,
            },
            "SHSD" => PieceKind::StrongholdStairsDown {
                entry_door: door()?,
                is_source: record.get_bool_or_false("Source")?,
            },
            "SHS" => PieceKind::StrongholdStraight {
                entry_door: door()?,
                left_child: record.get_bool("Left")?,
                right_child: record.get_bool("Right")?,
            },
            "SHCC" => PieceKind::StrongholdChestCorridor {
                entry_door: door()?,
            },
            "SHLT" => PieceKind::StrongholdLeftTurn {
                entry_door: door()?,
            },
            "SHRT" => PieceKind::StrongholdRightTurn {
                entry_door: door()?,
            },
            "SHRC" => PieceKind::StrongholdRoomCrossing {
                entry_door: door()?,
                room_type: record.get_int("Type")?,
            },
            "SHPH" => PieceKind::StrongholdPrisonHall {
                entry_door: door()?,
            },
            "SHSSD" => PieceKind::StrongholdStraightStairsDown {
                entry_door: door()?,
            },
            "SH5C" => PieceKind::StrongholdFiveCrossing {
                entry_door: door()?,
                left_low: record.get_bool("leftLow")?,
                left_high: record.get_bool("leftHigh")?,
                right_low: record.get_bool("rightLow")?,
                right_high: record.get_bool("rightHigh")?,
            },
            "SHLi" => PieceKind::StrongholdLibrary {
                entry_door: door()?,
                is_tall: record.get_bool("Tall")?,
            },
            "SHPR" => PieceKind::StrongholdPortalRoom,
            "SHFC" => PieceKind::StrongholdFillerCorridor {
                steps: record.get_int("Steps")?,
            },
            "OMB" => PieceKind::MonumentBuilding,
            "OMWR" => PieceKind::MonumentWing {
                design: record.get_int("Design")?,
            },
            "OMPenthouse" => PieceKind::MonumentPenthouse,
            "ECP" => PieceKind::EndCity {
                template: TemplateRef::read(record)?,
                parent_batch: if record.contains("PB") {
                    Some(record.get_int("PB")?)
                } else {
                    None
                },
            },
            "WMP" => PieceKind::Mansion {
                template: TemplateRef::read(record)?,
            },
            other => match MonumentRoomShape::from_id(other) {
                Some(shape) => {
                    let openings = record.get_int("Openings")?;
                    PieceKind::MonumentRoom {
                        shape,
                        index: record.get_int("Index")?,
                        openings: u8::try_from(openings).map_err(|_| DecodeError::OutOfRange {
                            key: "Openings".into(),
                            value: i64::from(openings),
                        })?,
                        design: record.get_int("Design")?,
                    }
                }
                None => return Err(DecodeError::UnknownPiece(other.to_string())),
            },
        };
        Ok(kind)
    }
}

/// Decode a persisted horizontal direction (`-1` means none).
fn horizontal_from_data(key: &str, value: i32) -> Result<Option<Direction>, DecodeError> {
    match value {
        -1 => Ok(None),
        0..=3 => Ok(Some(Direction::from_2d(value))),
        _ => Err(DecodeError::OutOfRange {
            key: key.to_string(),
            value: i64::from(value),
        }),
    }
}

/// One placed structural unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Piece {
    kind: PieceKind,
    bounding_box: BoundingBox,
    orientation: Option<Direction>,
    gen_depth: i32,
    batch: Option<i32>,
}

impl Piece {
    /// Build a piece. Orientation is fixed for the piece's lifetime.
    pub fn new(
        kind: PieceKind,
        bounding_box: BoundingBox,
        orientation: Option<Direction>,
        gen_depth: i32,
    ) -> Self {
        Self {
            kind,
            bounding_box,
            orientation: orientation.filter(|dir| dir.is_horizontal()),
            gen_depth,
            batch: None,
        }
    }

    /// Stamp the generation batch this piece was added with.
    pub fn with_batch(mut self, batch: i32) -> Self {
        self.batch = Some(batch);
        self
    }

    pub fn kind(&self) -> &PieceKind {
        &self.kind
    }

    pub(crate) fn kind_mut(&mut self) -> &mut PieceKind {
        &mut self.kind
    }

    pub fn id(&self) -> &'static str {
        self.kind.id()
    }

    pub fn bounding_box(&self) -> &BoundingBox {
        &self.bounding_box
    }

    pub fn orientation(&self) -> Option<Direction> {
        self.orientation
    }

    pub fn gen_depth(&self) -> i32 {
        self.gen_depth
    }

    /// Generation batch, for families that add pieces in groups.
    pub fn batch(&self) -> Option<i32> {
        self.batch
    }

    /// Batch of the group this piece's group was attached to.
    pub fn parent_batch(&self) -> Option<i32> {
        match &self.kind {
            PieceKind::EndCity { parent_batch, .. } => *parent_batch,
            PieceKind::MonumentRoom { .. }
            | PieceKind::MonumentWing { .. }
            | PieceKind::MonumentPenthouse => Some(ocean_monument::BUILDING_BATCH),
            _ => None,
        }
    }

    /// Local-to-world transform of this piece.
    pub fn frame(&self) -> PieceFrame {
        PieceFrame::new(self.bounding_box, self.orientation)
    }

    /// Shift the piece and every world position it stores.
    pub fn translate(&mut self, dx: i32, dy: i32, dz: i32) {
        self.bounding_box = self.bounding_box.translated(dx, dy, dz);
        match &mut self.kind {
            PieceKind::MineshaftRoom { entrances } => {
                for entrance in entrances.iter_mut() {
                    *entrance = entrance.translated(dx, dy, dz);
                }
            }
            PieceKind::EndCity { template, .. } | PieceKind::Mansion { template } => {
                template.position = template.position.offset(dx, dy, dz);
            }
            _ => {}
        }
    }

    /// Paint the part of this piece inside `ctx.clip`.
    ///
    /// Returns `false` when the piece refuses to place here (for example a
    /// corridor whose edges touch liquid); the caller treats it as absent for
    /// this chunk.
    pub fn post_process(&self, ctx: &mut PostProcessContext<'_>) -> bool {
        let mut painter = Painter::new(self, ctx);
        match &self.kind {
            PieceKind::EndCity { template, .. } | PieceKind::Mansion { template } => {
                painter.place_template(template)
            }
            kind => match kind.family() {
                StructureFamily::Mineshaft => mineshaft::paint(self, &mut painter),
                StructureFamily::Stronghold => stronghold::paint(self, &mut painter),
                StructureFamily::OceanMonument => ocean_monument::paint(self, &mut painter),
                StructureFamily::EndCity | StructureFamily::WoodlandMansion => true,
            },
        }
    }

    /// Persisted form: `id`, `BB`, `O`, `GD` plus the kind's own fields.
    pub fn to_record(&self) -> Record {
        let mut record = Record::new();
        record.put_string("id", self.kind.id());
        record.put_bounding_box("BB", &self.bounding_box);
        record.put_int("O", self.orientation.map_or(-1, Direction::data_2d));
        record.put_int("GD", self.gen_depth);
        if let Some(batch) = self.batch {
            record.put_int("Batch", batch);
        }
        self.kind.write_fields(&mut record);
        record
    }

    /// Inverse of [`Piece::to_record`].
    pub fn from_record(record: &Record) -> Result<Self, DecodeError> {
        let kind = PieceKind::read(record.get_string("id")?, record)?;
        Ok(Self {
            kind,
            bounding_box: record.get_bounding_box("BB")?,
            orientation: horizontal_from_data("O", record.get_int("O")?)?,
            gen_depth: record.get_int("GD")?,
            batch: if record.contains("Batch") {
                Some(record.get_int("Batch")?)
            } else {
                None
            },
        })
    }
}

/// Piece-local to world coordinate transform.
///
/// Local `x` runs across the piece, `z` runs away from the entrance and `y`
/// is up. South-facing pieces are mirrored, west and east ones are rotated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PieceFrame {
    bounding_box: BoundingBox,
    orientation: Option<Direction>,
    mirror: Mirror,
    rotation: Rotation,
}

impl PieceFrame {
    pub fn new(bounding_box: BoundingBox, orientation: Option<Direction>) -> Self {
        let (mirror, rotation) = match orientation {
            Some(Direction::South) => (Mirror::LeftRight, Rotation::None),
            Some(Direction::West) => (Mirror::LeftRight, Rotation::Clockwise90),
            Some(Direction::East) => (Mirror::None, Rotation::Clockwise90),
            _ => (Mirror::None, Rotation::None),
        };
        Self {
            bounding_box,
            orientation,
            mirror,
            rotation,
        }
    }

    pub fn world_x(&self, x: i32, z: i32) -> i32 {
        let bb = &self.bounding_box;
        match self.orientation {
            Some(Direction::West) => bb.max_x() - z,
            Some(Direction::East) => bb.min_x() + z,
            _ => bb.min_x() + x,
        }
    }

    pub fn world_y(&self, y: i32) -> i32 {
        self.bounding_box.min_y() + y
    }

    pub fn world_z(&self, x: i32, z: i32) -> i32 {
        let bb = &self.bounding_box;
        match self.orientation {
            Some(Direction::North) => bb.max_z() - z,
            Some(Direction::West) | Some(Direction::East) => bb.min_z() + x,
            _ => bb.min_z() + z,
        }
    }

    pub fn world_pos(&self, x: i32, y: i32, z: i32) -> BlockPos {
        BlockPos::new(self.world_x(x, z), self.world_y(y), self.world_z(x, z))
    }

    /// Turn a block authored facing local north into world orientation.
    pub fn orient(&self, voxel: Voxel) -> Voxel {
        voxel.mirrored(self.mirror).rotated(self.rotation)
    }
}

/// Everything a piece needs while painting one chunk.
pub struct PostProcessContext<'a> {
    pub grid: &'a mut dyn VoxelGrid,
    pub rng: &'a mut dyn RandomSource,
    pub templates: &'a dyn TemplateLibrary,
    /// The chunk being realized intersected with the piece's own box.
    /// Writes outside it are dropped.
    pub clip: BoundingBox,
    /// Chunk being realized; bounds the neighbour reads of liquid checks.
    pub chunk: ChunkPos,
}

/// Picks a block for each position of a filled box.
pub type BlockSelector = fn(&mut dyn RandomSource, bool) -> Voxel;

/// Clipped painting in a piece's local frame.
pub struct Painter<'c, 'a> {
    frame: PieceFrame,
    piece_box: BoundingBox,
    ctx: &'c mut PostProcessContext<'a>,
}

impl<'c, 'a> Painter<'c, 'a> {
    pub fn new(piece: &Piece, ctx: &'c mut PostProcessContext<'a>) -> Self {
        Self {
            frame: piece.frame(),
            piece_box: *piece.bounding_box(),
            ctx,
        }
    }

    /// Largest local `(x, y, z)` inside the piece box.
    pub fn local_max(&self) -> (i32, i32, i32) {
        let bb = &self.piece_box;
        match self.frame.orientation {
            Some(Direction::West | Direction::East) => {
                (bb.z_span() - 1, bb.y_span() - 1, bb.x_span() - 1)
            }
            _ => (bb.x_span() - 1, bb.y_span() - 1, bb.z_span() - 1),
        }
    }

    pub fn rng(&mut self) -> &mut dyn RandomSource {
        &mut *self.ctx.rng
    }

    /// Place one block at a local position; silently skipped outside the clip.
    pub fn place(&mut self, voxel: Voxel, x: i32, y: i32, z: i32) {
        let pos = self.frame.world_pos(x, y, z);
        if !self.ctx.clip.contains(pos) {
            return;
        }
        let voxel = self.frame.orient(voxel);
        place_structure_block(&mut *self.ctx.grid, pos, voxel);
    }

    /// Block at a local position; air outside the clip.
    pub fn get(&self, x: i32, y: i32, z: i32) -> Voxel {
        let pos = self.frame.world_pos(x, y, z);
        if self.ctx.clip.contains(pos) {
            self.ctx.grid.get_block(pos)
        } else {
            Voxel::AIR
        }
    }

    /// Fill a local box with `edge` on its surface and `inner` inside.
    #[allow(clippy::too_many_arguments)]
    pub fn fill(
        &mut self,
        x0: i32,
        y0: i32,
        z0: i32,
        x1: i32,
        y1: i32,
        z1: i32,
        edge: Voxel,
        inner: Voxel,
        keep_air: bool,
    ) {
        for y in y0..=y1 {
            for x in x0..=x1 {
                for z in z0..=z1 {
                    if keep_air && self.get(x, y, z).is_air() {
                        continue;
                    }
                    let on_edge = y == y0 || y == y1 || x == x0 || x == x1 || z == z0 || z == z1;
                    self.place(if on_edge { edge } else { inner }, x, y, z);
                }
            }
        }
    }

    pub fn fill_air(&mut self, x0: i32, y0: i32, z0: i32, x1: i32, y1: i32, z1: i32) {
        self.fill(x0, y0, z0, x1, y1, z1, Voxel::AIR, Voxel::AIR, false);
    }

    /// Like [`Painter::fill`] with blocks chosen by `selector`.
    #[allow(clippy::too_many_arguments)]
    pub fn fill_with(
        &mut self,
        x0: i32,
        y0: i32,
        z0: i32,
        x1: i32,
        y1: i32,
        z1: i32,
        keep_air: bool,
        selector: BlockSelector,
    ) {
        for y in y0..=y1 {
            for x in x0..=x1 {
                for z in z0..=z1 {
                    let on_edge = y == y0 || y == y1 || x == x0 || x == x1 || z == z0 || z == z1;
                    // Draw first so the stream does not depend on what is already there.
                    let voxel = selector(self.rng(), on_edge);
                    if keep_air && self.get(x, y, z).is_air() {
                        continue;
                    }
                    self.place(voxel, x, y, z);
                }
            }
        }
    }

    /// Like [`Painter::fill`] but each block is placed with probability `chance`.
    #[allow(clippy::too_many_arguments)]
    pub fn fill_maybe(
        &mut self,
        chance: f32,
        x0: i32,
        y0: i32,
        z0: i32,
        x1: i32,
        y1: i32,
        z1: i32,
        edge: Voxel,
        inner: Voxel,
        keep_air: bool,
    ) {
        for y in y0..=y1 {
            for x in x0..=x1 {
                for z in z0..=z1 {
                    if self.rng().next_float() > chance {
                        continue;
                    }
                    if keep_air && self.get(x, y, z).is_air() {
                        continue;
                    }
                    let on_edge = y == y0 || y == y1 || x == x0 || x == x1 || z == z0 || z == z1;
                    self.place(if on_edge { edge } else { inner }, x, y, z);
                }
            }
        }
    }

    pub fn maybe_place(&mut self, chance: f32, voxel: Voxel, x: i32, y: i32, z: i32) {
        if self.rng().next_float() < chance {
            self.place(voxel, x, y, z);
        }
    }

    /// Chest facing `dir` in local terms, if the position is inside the clip.
    pub fn place_chest(&mut self, x: i32, y: i32, z: i32, dir: Direction) -> bool {
        let pos = self.frame.world_pos(x, y, z);
        if !self.ctx.clip.contains(pos) || self.ctx.grid.get_block(pos).id == BLOCK_CHEST {
            return false;
        }
        self.place(Voxel::facing(BLOCK_CHEST, dir), x, y, z);
        true
    }

    /// True when liquid touches the piece's box grown by one, within the
    /// chunk being realized.
    pub fn edges_liquid(&self) -> bool {
        let bb = &self.piece_box;
        let clip = BoundingBox::for_chunk(self.ctx.chunk, WORLD_MIN_Y, WORLD_MAX_Y);
        let x0 = (bb.min_x() - 1).max(clip.min_x());
        let y0 = (bb.min_y() - 1).max(clip.min_y());
        let z0 = (bb.min_z() - 1).max(clip.min_z());
        let x1 = (bb.max_x() + 1).min(clip.max_x());
        let y1 = (bb.max_y() + 1).min(clip.max_y());
        let z1 = (bb.max_z() + 1).min(clip.max_z());
        let liquid = |x: i32, y: i32, z: i32| {
            !self
                .ctx
                .grid
                .fluid_state(BlockPos::new(x, y, z))
                .is_empty()
        };

        for x in x0..=x1 {
            for z in z0..=z1 {
                if liquid(x, y0, z) || liquid(x, y1, z) {
                    return true;
                }
            }
        }
        for x in x0..=x1 {
            for y in y0..=y1 {
                if liquid(x, y, z0) || liquid(x, y, z1) {
                    return true;
                }
            }
        }
        for z in z0..=z1 {
            for y in y0..=y1 {
                if liquid(x0, y, z) || liquid(x1, y, z) {
                    return true;
                }
            }
        }
        false
    }

    /// Place a template clipped to the current chunk.
    pub fn place_template(&mut self, template: &TemplateRef) -> bool {
        let settings = template.settings().with_clip(self.ctx.clip);
        let pattern = self.ctx.templates.get_or_create(&template.name);
        pattern.place_in_world(
            &mut *self.ctx.grid,
            template.position,
            &settings,
            &mut *self.ctx.rng,
        );
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::{ChunkedGrid, FlatFill};
    use crate::structure_template::BuiltinTemplates;
    use structgen_core::StructureRng;

    fn corridor(orientation: Direction) -> Piece {
        Piece::new(
            PieceKind::MineshaftCorridor {
                has_rails: true,
                has_spiders: false,
                num_sections: 2,
            },
            BoundingBox::new(10, 20, 30, 12, 22, 39),
            Some(orientation),
            3,
        )
    }

    #[test]
    fn frame_maps_local_origin_per_orientation() {
        let bb = BoundingBox::new(0, 0, 0, 4, 4, 9);
        let north = PieceFrame::new(bb, Some(Direction::North));
        assert_eq!(north.world_pos(0, 0, 0), BlockPos::new(0, 0, 9));
        let south = PieceFrame::new(bb, Some(Direction::South));
        assert_eq!(south.world_pos(0, 0, 0), BlockPos::new(0, 0, 0));

        let bb = BoundingBox::new(0, 0, 0, 9, 4, 4);
        let west = PieceFrame::new(bb, Some(Direction::West));
        assert_eq!(west.world_pos(1, 0, 0), BlockPos::new(9, 0, 1));
        let east = PieceFrame::new(bb, Some(Direction::East));
        assert_eq!(east.world_pos(1, 0, 2), BlockPos::new(2, 0, 1));
    }

    #[test]
    fn frame_orients_facing_blocks() {
        let bb = BoundingBox::new(0, 0, 0, 4, 4, 4);
        let ladder = Voxel::facing(BLOCK_LADDER, Direction::North);
        let south = PieceFrame::new(bb, Some(Direction::South));
        assert_eq!(south.orient(ladder).direction(), Some(Direction::South));
        let east = PieceFrame::new(bb, Some(Direction::East));
        assert_eq!(east.orient(ladder).direction(), Some(Direction::East));
    }

    #[test]
    fn record_round_trip_keeps_fields() {
        let piece = corridor(Direction::West).with_batch(17);
        let record = piece.to_record();
        assert_eq!(record.get_string("id"), Ok("MSCorridor"));
        assert_eq!(record.get_int("O"), Ok(1));
        assert_eq!(Piece::from_record(&record), Ok(piece));
    }

    #[test]
    fn vertical_orientation_is_dropped() {
        let piece = Piece::new(
            PieceKind::MineshaftStairs,
            BoundingBox::new(0, 0, 0, 1, 1, 1),
            Some(Direction::Up),
            0,
        );
        assert_eq!(piece.orientation(), None);
        assert_eq!(piece.to_record().get_int("O"), Ok(-1));
    }

    #[test]
    fn unknown_id_and_bad_orientation_are_rejected() {
        let mut record = corridor(Direction::North).to_record();
        record.put_int("O", 7);
        assert_eq!(
            Piece::from_record(&record),
            Err(DecodeError::OutOfRange {
                key: "O".into(),
                value: 7
            })
        );
        record.put_string("id", "Igloo");
        assert_eq!(
            Piece::from_record(&record),
            Err(DecodeError::UnknownPiece("Igloo".into()))
        );
    }

    #[test]
    fn bad_rotation_string_is_rejected() {
        let piece = Piece::new(
            PieceKind::EndCity {
                template: TemplateRef::new("base_floor", BlockPos::new(1, 2, 3), Rotation::None),
                parent_batch: None,
            },
            BoundingBox::new(1, 2, 3, 10, 5, 12),
            None,
            0,
        );
        let mut record = piece.to_record();
        record.put_string("Rot", "sideways");
        assert!(matches!(
            Piece::from_record(&record),
            Err(DecodeError::InvalidEnum(_))
        ));
    }

    #[test]
    fn translate_moves_template_and_entrances() {
        let mut room = Piece::new(
            PieceKind::MineshaftRoom {
                entrances: vec![BoundingBox::new(0, 0, 0, 2, 2, 1)],
            },
            BoundingBox::new(0, 0, 0, 9, 5, 9),
            None,
            0,
        );
        room.translate(0, -7, 3);
        assert_eq!(room.bounding_box().to_array(), [0, -7, 3, 9, -2, 12]);
        match room.kind() {
            PieceKind::MineshaftRoom { entrances } => {
                assert_eq!(entrances[0].to_array(), [0, -7, 3, 2, -5, 4]);
            }
            other => panic!("unexpected kind {other:?}"),
        }
    }

    #[test]
    fn painter_respects_clip_and_marks_side_effects() {
        let piece = corridor(Direction::South);
        let mut grid = ChunkedGrid::new(FlatFill::stone(0));
        let mut rng = StructureRng::new(5);
        let templates = BuiltinTemplates::new();
        let clip = BoundingBox::new(10, 20, 30, 12, 22, 31);
        let mut ctx = PostProcessContext {
            grid: &mut grid,
            rng: &mut rng,
            templates: &templates,
            clip,
            chunk: ChunkPos::new(0, 1),
        };
        let mut painter = Painter::new(&piece, &mut ctx);
        painter.fill(0, 0, 0, 2, 0, 9, Voxel::new(BLOCK_OAK_PLANKS), Voxel::new(BLOCK_OAK_PLANKS), false);
        painter.place(Voxel::new(BLOCK_TORCH), 1, 1, 0);
        painter.place(Voxel::new(BLOCK_WATER), 1, 1, 1);

        assert_eq!(grid.get_block(BlockPos::new(11, 20, 31)).id, BLOCK_OAK_PLANKS);
        assert!(grid.get_block(BlockPos::new(11, 20, 32)).is_air());
        let chunk = grid.chunk(ChunkPos::new(0, 1)).expect("chunk written");
        assert!(chunk.post_processing().contains(&BlockPos::new(11, 21, 30)));
        assert!(chunk.fluid_ticks().contains_key(&BlockPos::new(11, 21, 31)));
    }

    #[test]
    fn edges_liquid_sees_adjacent_water_in_the_same_chunk() {
        // The corridor spans chunks (0, 1) and (0, 2); the water sits in (0, 2).
        let piece = corridor(Direction::South);
        let mut grid = ChunkedGrid::new(FlatFill::stone(0));
        grid.set_block(BlockPos::new(13, 21, 35), Voxel::new(BLOCK_WATER), SetBlockFlags::STRUCTURE);
        let mut rng = StructureRng::new(5);
        let templates = BuiltinTemplates::new();
        let mut ctx = PostProcessContext {
            grid: &mut grid,
            rng: &mut rng,
            templates: &templates,
            clip: BoundingBox::new(10, 20, 32, 12, 22, 39),
            chunk: ChunkPos::new(0, 2),
        };
        assert!(Painter::new(&piece, &mut ctx).edges_liquid());
        ctx.clip = BoundingBox::new(10, 20, 30, 12, 22, 31);
        ctx.chunk = ChunkPos::new(0, 1);
        assert!(!Painter::new(&piece, &mut ctx).edges_liquid());
    }
}
