//! Piece lists for one structure instance.

use crate::collision::{find_collision, find_collision_outside_batch};
use crate::piece::Piece;
use crate::record::{compounds, DecodeError, Record, Tag};
use crate::structures::StructureFamily;
use structgen_core::{BoundingBox, ChunkPos, RandomSource};

/// Append-only accumulator used while a layout generator runs.
#[derive(Debug, Clone, Default)]
pub struct StructurePieces {
    pieces: Vec<Piece>,
}

impl StructurePieces {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, piece: Piece) {
        self.pieces.push(piece);
    }

    pub fn pieces(&self) -> &[Piece] {
        &self.pieces
    }

    pub fn len(&self) -> usize {
        self.pieces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pieces.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Piece> {
        self.pieces.get(index)
    }

    pub(crate) fn get_mut(&mut self, index: usize) -> Option<&mut Piece> {
        self.pieces.get_mut(index)
    }

    pub fn last(&self) -> Option<&Piece> {
        self.pieces.last()
    }

    /// Drop every piece added after the first `len`.
    ///
    /// Only used to roll back a group that has not been committed yet.
    pub fn truncate(&mut self, len: usize) {
        self.pieces.truncate(len);
    }

    pub fn clear(&mut self) {
        self.pieces.clear();
    }

    /// First committed piece intersecting `candidate`.
    pub fn find_collision(&self, candidate: &BoundingBox) -> Option<&Piece> {
        find_collision(&self.pieces, candidate)
    }

    /// First committed piece intersecting `candidate` outside the batch exemption.
    pub fn find_collision_outside_batch(
        &self,
        candidate: &BoundingBox,
        batch: i32,
        parent_batch: Option<i32>,
    ) -> Option<&Piece> {
        find_collision_outside_batch(&self.pieces, candidate, batch, parent_batch)
    }

    /// Union of every piece box.
    pub fn bounding_box(&self) -> Option<BoundingBox> {
        BoundingBox::encapsulating(self.pieces.iter().map(|p| *p.bounding_box()))
    }

    /// Shift every piece vertically.
    pub fn offset_vertically(&mut self, dy: i32) {
        for piece in &mut self.pieces {
            piece.translate(0, dy, 0);
        }
    }

    /// Sink the structure so its top sits at least `offset` below sea level.
    ///
    /// Returns the applied vertical shift.
    pub fn move_below_sea_level(
        &mut self,
        sea_level: i32,
        min_y: i32,
        rng: &mut dyn RandomSource,
        offset: i32,
    ) -> i32 {
        let Some(bb) = self.bounding_box() else {
            return 0;
        };
        let limit = sea_level - offset;
        let mut top = bb.y_span() + min_y + 1;
        if top < limit {
            top += rng.next_int(limit - top);
        }
        let dy = top - bb.max_y();
        self.offset_vertically(dy);
        dy
    }

    /// Finish generation. Empty piece lists produce no start.
    pub fn build(self, family: StructureFamily, chunk: ChunkPos) -> Option<StructureStart> {
        StructureStart::new(family, chunk, self.pieces)
    }
}

/// Ordered pieces of one structure instance plus their union box.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructureStart {
    family: StructureFamily,
    chunk: ChunkPos,
    pieces: Vec<Piece>,
    bounding_box: BoundingBox,
    references: i32,
}

impl StructureStart {
    /// `None` when `pieces` is empty.
    pub fn new(family: StructureFamily, chunk: ChunkPos, pieces: Vec<Piece>) -> Option<Self> {
        let bounding_box = BoundingBox::encapsulating(pieces.iter().map(|p| *p.bounding_box()))?;
        Some(Self {
            family,
            chunk,
            pieces,
            bounding_box,
            references: 0,
        })
    }

    pub fn family(&self) -> StructureFamily {
        self.family
    }

    pub fn chunk(&self) -> ChunkPos {
        self.chunk
    }

    /// Pieces in generation order.
    pub fn pieces(&self) -> &[Piece] {
        &self.pieces
    }

    pub fn bounding_box(&self) -> &BoundingBox {
        &self.bounding_box
    }

    /// Number of chunks that have recorded a reference to this start.
    pub fn references(&self) -> i32 {
        self.references
    }

    pub fn add_reference(&mut self) {
        self.references += 1;
    }

    /// Pieces whose box touches `area`, in generation order.
    pub fn pieces_intersecting<'a>(
        &'a self,
        area: &'a BoundingBox,
    ) -> impl Iterator<Item = &'a Piece> + 'a {
        self.pieces
            .iter()
            .filter(move |piece| piece.bounding_box().intersects(area))
    }

    pub fn to_record(&self) -> Record {
        let mut record = Record::new();
        record.put_string("id", self.family.id());
        record.put_int("ChunkX", self.chunk.x);
        record.put_int("ChunkZ", self.chunk.z);
        record.put_int("references", self.references);
        record.put_bounding_box("BB", &self.bounding_box);
        let children = self
            .pieces
            .iter()
            .map(|piece| Tag::Compound(piece.to_record()))
            .collect();
        record.put_list("Children", children);
        record
    }

    /// Decode a start; any bad child fails the whole start.
    pub fn from_record(record: &Record) -> Result<Self, DecodeError> {
        let id = record.get_string("id")?;
        let family = StructureFamily::from_id(id)
            .ok_or_else(|| DecodeError::UnknownStructure(id.to_string()))?;
        let chunk = ChunkPos::new(record.get_int("ChunkX")?, record.get_int("ChunkZ")?);
        let references = if record.contains("references") {
            record.get_int("references")?
        } else {
            0
        };
        let pieces = compounds("Children", record.get_list("Children")?)?
            .into_iter()
            .map(Piece::from_record)
            .collect::<Result<Vec<_>, _>>()?;
        let mut start = Self::new(family, chunk, pieces)
            .ok_or_else(|| DecodeError::EmptyStart(id.to_string()))?;
        start.references = references;
        Ok(start)
    }

    /// blake3 over the canonical JSON of [`StructureStart::to_record`].
    pub fn fingerprint(&self) -> Result<blake3::Hash, serde_json::Error> {
        let mut hasher = blake3::Hasher::new();
        serde_json::to_writer(&mut hasher, &self.to_record())?;
        Ok(hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::piece::PieceKind;
    use structgen_core::{Direction, StructureRng};

    fn crossing(bb: BoundingBox) -> Piece {
        Piece::new(
            PieceKind::MineshaftCrossing {
                direction: Direction::East,
                two_floors: false,
            },
            bb,
            Some(Direction::East),
            1,
        )
    }

    #[test]
    fn empty_builder_yields_no_start() {
        let pieces = StructurePieces::new();
        assert!(pieces.build(StructureFamily::Mineshaft, ChunkPos::new(0, 0)).is_none());
    }

    #[test]
    fn bounding_box_is_union_of_pieces() {
        let mut pieces = StructurePieces::new();
        pieces.push(crossing(BoundingBox::new(0, 10, 0, 4, 12, 4)));
        pieces.push(crossing(BoundingBox::new(-3, 5, 7, 1, 7, 9)));
        let start = pieces.build(StructureFamily::Mineshaft, ChunkPos::new(0, 0)).unwrap();
        assert_eq!(start.bounding_box().to_array(), [-3, 5, 0, 4, 12, 9]);
    }

    #[test]
    fn sinking_keeps_top_below_sea_level() {
        let mut pieces = StructurePieces::new();
        pieces.push(crossing(BoundingBox::new(0, 40, 0, 4, 49, 4)));
        let mut rng = StructureRng::new(11);
        let dy = pieces.move_below_sea_level(63, 0, &mut rng, 10);
        let bb = pieces.bounding_box().unwrap();
        assert_eq!(bb.max_y(), 49 + dy);
        assert!(bb.max_y() < 63 - 10);
        assert!(bb.min_y() >= 0);
    }

    #[test]
    fn record_round_trip_preserves_order_and_references() {
        let mut pieces = StructurePieces::new();
        pieces.push(crossing(BoundingBox::new(0, 10, 0, 4, 12, 4)));
        pieces.push(crossing(BoundingBox::new(5, 10, 0, 9, 12, 4)));
        let mut start = pieces.build(StructureFamily::Mineshaft, ChunkPos::new(2, -3)).unwrap();
        start.add_reference();

        let decoded = StructureStart::from_record(&start.to_record()).unwrap();
        assert_eq!(decoded, start);
        assert_eq!(decoded.fingerprint().unwrap(), start.fingerprint().unwrap());
    }

    #[test]
    fn unknown_structure_id_is_rejected() {
        let mut record = Record::new();
        record.put_string("id", "Igloo");
        assert_eq!(
            StructureStart::from_record(&record),
            Err(DecodeError::UnknownStructure("Igloo".into()))
        );
    }

    #[test]
    fn empty_children_are_rejected() {
        let mut record = Record::new();
        record.put_string("id", "Mineshaft");
        record.put_int("ChunkX", 0);
        record.put_int("ChunkZ", 0);
        record.put_list("Children", Vec::new());
        assert_eq!(
            StructureStart::from_record(&record),
            Err(DecodeError::EmptyStart("Mineshaft".into()))
        );
    }
}
