#![warn(missing_docs)]
//! Core primitives shared across the structure-generation workspace.

pub mod bounding_box;
pub mod coords;
pub mod direction;
pub mod random;

// Re-export commonly used types
pub use bounding_box::BoundingBox;
pub use coords::{BlockPos, ChunkPos, CHUNK_WIDTH};
pub use direction::{Axis, Direction, Mirror, ParseEnumError, Rotation};
pub use random::{chunk_rng, chunk_seed, structure_rng, RandomSource, StructureRng};
