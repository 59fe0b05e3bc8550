//! Per-chunk realization of generated structures.
//!
//! Pieces are painted lazily: when a chunk is finalized, every piece whose
//! box touches it paints the part of itself inside that chunk. A piece that
//! reports failure is skipped for that chunk only.

use crate::chunk::{WORLD_MAX_Y, WORLD_MIN_Y};
use crate::grid::VoxelGrid;
use crate::piece::PostProcessContext;
use crate::structure_start::StructureStart;
use crate::structure_template::TemplateLibrary;
use serde::Serialize;
use structgen_core::{chunk_rng, BlockPos, BoundingBox, ChunkPos, RandomSource};
use tracing::{debug, instrument};

/// Outcome of realizing one structure into one chunk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RealizeReport {
    /// Pieces whose box touched the chunk.
    pub visited: usize,
    /// Pieces that painted successfully.
    pub placed: usize,
    /// Pieces that refused to place in this chunk.
    pub failed: usize,
}

impl RealizeReport {
    fn absorb(&mut self, other: RealizeReport) {
        self.visited += other.visited;
        self.placed += other.placed;
        self.failed += other.failed;
    }
}

/// Column of world space covered by `chunk`.
pub fn chunk_box(chunk: ChunkPos) -> BoundingBox {
    BoundingBox::for_chunk(chunk, WORLD_MIN_Y, WORLD_MAX_Y)
}

/// Paint every piece of `start` touching `chunk`, in generation order.
///
/// Each piece paints with its own box intersected with the chunk column as
/// the clip, so no write leaves the piece or the chunk. `rng` should be
/// seeded per chunk; a stream shared across chunks makes repeated realization
/// non-reproducible.
#[instrument(skip_all, fields(family = %start.family(), chunk = %chunk))]
pub fn realize(
    start: &StructureStart,
    grid: &mut dyn VoxelGrid,
    templates: &dyn TemplateLibrary,
    chunk: ChunkPos,
    rng: &mut dyn RandomSource,
) -> RealizeReport {
    let area = chunk_box(chunk);
    let mut report = RealizeReport::default();
    if !start.bounding_box().intersects(&area) {
        return report;
    }

    for piece in start.pieces() {
        let Some(clip) = area.intersection(piece.bounding_box()) else {
            continue;
        };
        report.visited += 1;
        let mut ctx = PostProcessContext {
            grid: &mut *grid,
            rng: &mut *rng,
            templates,
            clip,
            chunk,
        };
        if piece.post_process(&mut ctx) {
            report.placed += 1;
        } else {
            report.failed += 1;
            debug!(piece = piece.id(), "piece skipped for this chunk");
        }
    }
    debug!(
        visited = report.visited,
        placed = report.placed,
        failed = report.failed,
        "realized chunk"
    );
    report
}

/// [`realize`] with the per-chunk stream derived from `world_seed`.
pub fn realize_chunk(
    start: &StructureStart,
    grid: &mut dyn VoxelGrid,
    templates: &dyn TemplateLibrary,
    world_seed: u64,
    chunk: ChunkPos,
) -> RealizeReport {
    let mut rng = chunk_rng(world_seed, chunk);
    realize(start, grid, templates, chunk, &mut rng)
}

/// Chunks touched by `start`, row by row.
pub fn touched_chunks(start: &StructureStart) -> Vec<ChunkPos> {
    let bb = start.bounding_box();
    let (min, max) = (
        BlockPos::new(bb.min_x(), 0, bb.min_z()).chunk(),
        BlockPos::new(bb.max_x(), 0, bb.max_z()).chunk(),
    );
    (min.z..=max.z)
        .flat_map(|z| (min.x..=max.x).map(move |x| ChunkPos::new(x, z)))
        .collect()
}

/// Realize every chunk `start` touches.
pub fn realize_all(
    start: &StructureStart,
    grid: &mut dyn VoxelGrid,
    templates: &dyn TemplateLibrary,
    world_seed: u64,
) -> RealizeReport {
    let mut total = RealizeReport::default();
    for chunk in touched_chunks(start) {
        total.absorb(realize_chunk(start, grid, templates, world_seed, chunk));
    }
    total
}
