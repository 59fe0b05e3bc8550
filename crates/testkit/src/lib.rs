#![warn(missing_docs)]
//! Deterministic testing surfaces for structure generation.

mod metrics;

use std::collections::VecDeque;
use structgen_core::{BlockPos, BoundingBox, RandomSource};
use structgen_world::{
    ChunkedGrid, Fluid, HeightmapKind, SetBlockFlags, StructureStart, VoxelGrid, Voxel,
};

pub use metrics::*;

/// [`RandomSource`] replaying a fixed list of draws.
///
/// Every call consumes one scripted value; once the script runs out, draws
/// return zero. `next_int(bound)` reduces the value modulo `bound`, so a
/// script can be written in terms of the results a generator should see.
#[derive(Debug, Clone, Default)]
pub struct ScriptedRandom {
    values: VecDeque<i32>,
    draws: usize,
}

impl ScriptedRandom {
    /// Script the given draws in order.
    pub fn new(values: impl IntoIterator<Item = i32>) -> Self {
        Self {
            values: values.into_iter().collect(),
            draws: 0,
        }
    }

    /// Number of draws consumed so far, scripted or not.
    pub fn draws(&self) -> usize {
        self.draws
    }

    /// Scripted values not yet consumed.
    pub fn remaining(&self) -> usize {
        self.values.len()
    }

    fn pop(&mut self) -> i32 {
        self.draws += 1;
        self.values.pop_front().unwrap_or(0)
    }
}

impl RandomSource for ScriptedRandom {
    fn next_int(&mut self, bound: i32) -> i32 {
        let value = self.pop();
        if bound <= 0 {
            0
        } else {
            value.rem_euclid(bound)
        }
    }

    fn next_i32(&mut self) -> i32 {
        self.pop()
    }

    fn next_long(&mut self) -> i64 {
        i64::from(self.pop())
    }

    fn next_float(&mut self) -> f32 {
        self.pop().rem_euclid(1000) as f32 / 1000.0
    }

    fn next_bool(&mut self) -> bool {
        self.pop() != 0
    }
}

/// A write that landed outside the allowed box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipViolation {
    /// `set_block` outside the clip.
    Block(BlockPos),
    /// Fluid tick scheduled outside the clip.
    FluidTick(BlockPos),
    /// Shape post-processing mark outside the clip.
    ShapeMark(BlockPos),
}

/// [`VoxelGrid`] decorator recording every mutation outside `clip`.
///
/// With [`ClipCheckingGrid::within_pieces`] a write must also land inside at
/// least one of the given piece boxes. Reads pass through unchecked. Writes
/// are forwarded either way so the wrapped grid ends up as it would have
/// without the decorator.
pub struct ClipCheckingGrid<'a> {
    inner: &'a mut dyn VoxelGrid,
    clip: BoundingBox,
    pieces: Vec<BoundingBox>,
    violations: Vec<ClipViolation>,
    writes: usize,
}

impl<'a> ClipCheckingGrid<'a> {
    /// Wrap `inner`, allowing writes only inside `clip`.
    pub fn new(inner: &'a mut dyn VoxelGrid, clip: BoundingBox) -> Self {
        Self {
            inner,
            clip,
            pieces: Vec::new(),
            violations: Vec::new(),
            writes: 0,
        }
    }

    /// Also require every write to fall inside one of `boxes`.
    pub fn within_pieces(mut self, boxes: impl IntoIterator<Item = BoundingBox>) -> Self {
        self.pieces.extend(boxes);
        self
    }

    /// Out-of-clip writes seen so far.
    pub fn violations(&self) -> &[ClipViolation] {
        &self.violations
    }

    /// Block writes seen so far, in or out of the clip.
    pub fn writes(&self) -> usize {
        self.writes
    }

    /// Panic listing the first violations, if any.
    pub fn assert_clean(&self) {
        assert!(
            self.violations.is_empty(),
            "{} write(s) outside {}: {:?}",
            self.violations.len(),
            self.clip,
            &self.violations[..self.violations.len().min(8)]
        );
    }

    fn check(&mut self, pos: BlockPos, violation: ClipViolation) {
        let in_piece = self.pieces.is_empty() || self.pieces.iter().any(|bb| bb.contains(pos));
        if !self.clip.contains(pos) || !in_piece {
            self.violations.push(violation);
        }
    }
}

impl VoxelGrid for ClipCheckingGrid<'_> {
    fn get_block(&self, pos: BlockPos) -> Voxel {
        self.inner.get_block(pos)
    }

    fn set_block(&mut self, pos: BlockPos, voxel: Voxel, flags: SetBlockFlags) {
        self.writes += 1;
        self.check(pos, ClipViolation::Block(pos));
        self.inner.set_block(pos, voxel, flags);
    }

    fn get_height(&self, kind: HeightmapKind, x: i32, z: i32) -> i32 {
        self.inner.get_height(kind, x, z)
    }

    fn fluid_state(&self, pos: BlockPos) -> Fluid {
        self.inner.fluid_state(pos)
    }

    fn schedule_fluid_tick(&mut self, pos: BlockPos, fluid: Fluid) {
        self.check(pos, ClipViolation::FluidTick(pos));
        self.inner.schedule_fluid_tick(pos, fluid);
    }

    fn mark_for_post_processing(&mut self, pos: BlockPos) {
        self.check(pos, ClipViolation::ShapeMark(pos));
        self.inner.mark_for_post_processing(pos);
    }
}

/// Hex blake3 of a structure's persisted record.
pub fn fingerprint_structure(start: &StructureStart) -> String {
    match start.fingerprint() {
        Ok(hash) => hash.to_hex().to_string(),
        Err(err) => panic!("structure record is not serializable: {err}"),
    }
}

/// Hex blake3 over every stored chunk: voxels, fluid ticks and shape marks.
pub fn fingerprint_grid(grid: &ChunkedGrid) -> String {
    let mut hasher = blake3::Hasher::new();
    for chunk in grid.chunks() {
        let pos = chunk.position();
        hasher.update(&pos.x.to_le_bytes());
        hasher.update(&pos.z.to_le_bytes());
        for voxel in chunk.voxels() {
            hasher.update(&voxel.id.to_le_bytes());
            hasher.update(&voxel.state.to_le_bytes());
        }
        for (tick, fluid) in chunk.fluid_ticks() {
            hash_pos(&mut hasher, *tick);
            hasher.update(&[*fluid as u8]);
        }
        for mark in chunk.post_processing() {
            hash_pos(&mut hasher, *mark);
        }
    }
    hasher.finalize().to_hex().to_string()
}

fn hash_pos(hasher: &mut blake3::Hasher, pos: BlockPos) {
    hasher.update(&pos.x.to_le_bytes());
    hasher.update(&pos.y.to_le_bytes());
    hasher.update(&pos.z.to_le_bytes());
}
