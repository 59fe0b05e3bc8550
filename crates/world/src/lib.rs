//! Structure layout generation, realization and storage.

pub mod block;
pub mod chunk;
pub mod collision;
pub mod config;
pub mod end_city;
pub mod grid;
pub mod legacy_index;
pub mod mineshaft;
pub mod ocean_monument;
pub mod persist;
pub mod piece;
pub mod post_process;
pub mod record;
pub mod stronghold;
pub mod structure_start;
pub mod structure_template;
pub mod structures;
pub mod woodland_mansion;

pub use block::*;
pub use chunk::{ChunkedGrid, FlatFill, WORLD_MAX_Y, WORLD_MIN_Y};
pub use collision::{find_collision, find_collision_outside_batch, overlapping_pairs};
pub use config::{ConfigError, GenerationConfig};
pub use end_city::EndCityGenerator;
pub use grid::{place_structure_block, HeightmapKind, VoxelGrid};
pub use legacy_index::{LegacyStructureHandler, LegacyStructureIndex};
pub use mineshaft::MineshaftGenerator;
pub use ocean_monument::OceanMonumentGenerator;
pub use persist::{decode_starts_lenient, StructureStore};
pub use piece::{Piece, PieceKind, PostProcessContext, TemplateRef};
pub use post_process::{realize, realize_all, realize_chunk, RealizeReport};
pub use record::{DecodeError, Record, Tag};
pub use stronghold::StrongholdGenerator;
pub use structure_start::{StructurePieces, StructureStart};
pub use structure_template::{
    BuiltinTemplates, PlacementSettings, Template, TemplateError, TemplateLibrary,
};
pub use structures::{generate_structure, generator_for, StructureFamily, StructureGenerator};
pub use woodland_mansion::WoodlandMansionGenerator;
