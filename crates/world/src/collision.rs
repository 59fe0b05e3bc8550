//! Bounding-box collision queries over a growing piece list.

use crate::piece::Piece;
use structgen_core::BoundingBox;

/// First piece, in list order, whose box intersects `candidate`.
pub fn find_collision<'a>(pieces: &'a [Piece], candidate: &BoundingBox) -> Option<&'a Piece> {
    pieces
        .iter()
        .find(|piece| piece.bounding_box().intersects(candidate))
}

/// True when two batch stamps may share space.
///
/// A group may touch its own members and the group it grew out of, in either
/// direction. Unstamped pieces never get an exemption.
pub fn batches_may_touch(
    batch: Option<i32>,
    parent: Option<i32>,
    other_batch: Option<i32>,
    other_parent: Option<i32>,
) -> bool {
    match (batch, other_batch) {
        (Some(a), Some(b)) => a == b || parent == Some(b) || other_parent == Some(a),
        _ => false,
    }
}

/// First piece intersecting `candidate` that is not exempt by batch.
pub fn find_collision_outside_batch<'a>(
    pieces: &'a [Piece],
    candidate: &BoundingBox,
    batch: i32,
    parent_batch: Option<i32>,
) -> Option<&'a Piece> {
    pieces.iter().find(|piece| {
        piece.bounding_box().intersects(candidate)
            && !batches_may_touch(
                Some(batch),
                parent_batch,
                piece.batch(),
                piece.parent_batch(),
            )
    })
}

/// Pairs of pieces whose boxes intersect without a batch exemption.
pub fn overlapping_pairs(pieces: &[Piece]) -> Vec<(usize, usize)> {
    let mut pairs = Vec::new();
    for (i, a) in pieces.iter().enumerate() {
        for (j, b) in pieces.iter().enumerate().skip(i + 1) {
            if a.bounding_box().intersects(b.bounding_box())
                && !batches_may_touch(a.batch(), a.parent_batch(), b.batch(), b.parent_batch())
            {
                pairs.push((i, j));
            }
        }
    }
    pairs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::piece::PieceKind;

    fn stairs(bb: BoundingBox) -> Piece {
        Piece::new(PieceKind::MineshaftStairs, bb, None, 0)
    }

    #[test]
    fn returns_first_hit_in_list_order() {
        let pieces = vec![
            stairs(BoundingBox::new(0, 0, 0, 4, 4, 4)),
            stairs(BoundingBox::new(5, 0, 0, 9, 4, 4)),
            stairs(BoundingBox::new(3, 0, 0, 6, 4, 4)),
        ];
        let hit = find_collision(&pieces, &BoundingBox::new(6, 1, 1, 7, 1, 1));
        assert_eq!(hit.map(|p| p.bounding_box().min_x()), Some(5));
        assert!(find_collision(&pieces, &BoundingBox::new(10, 0, 0, 12, 4, 4)).is_none());
    }

    #[test]
    fn same_batch_is_exempt_but_unstamped_is_not() {
        let pieces = vec![
            stairs(BoundingBox::new(0, 0, 0, 4, 4, 4)).with_batch(7),
            stairs(BoundingBox::new(0, 5, 0, 4, 9, 4)),
        ];
        let candidate = BoundingBox::new(2, 2, 2, 2, 6, 2);
        let hit = find_collision_outside_batch(&pieces, &candidate, 7, None);
        assert_eq!(hit.map(|p| p.bounding_box().min_y()), Some(5));
        assert!(find_collision_outside_batch(&pieces, &BoundingBox::new(1, 1, 1, 1, 1, 1), 7, None).is_none());
    }

    #[test]
    fn parent_relation_is_symmetric() {
        assert!(batches_may_touch(Some(2), Some(1), Some(1), None));
        assert!(batches_may_touch(Some(1), None, Some(2), Some(1)));
        assert!(!batches_may_touch(Some(3), Some(1), Some(2), Some(1)));
        assert!(!batches_may_touch(None, None, None, None));
    }

    #[test]
    fn overlapping_pairs_skips_exempt_pairs() {
        let pieces = vec![
            stairs(BoundingBox::new(0, 0, 0, 4, 4, 4)).with_batch(1),
            stairs(BoundingBox::new(2, 2, 2, 6, 6, 6)).with_batch(1),
            stairs(BoundingBox::new(3, 3, 3, 8, 8, 8)),
        ];
        assert_eq!(overlapping_pairs(&pieces), vec![(0, 2), (1, 2)]);
    }
}
