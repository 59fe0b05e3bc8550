//! Scripted scenarios for individual generators.
//!
//! Each scenario pins the random draws a generator sees and checks the exact
//! layout decision that follows.

use structgen_core::{BoundingBox, ChunkPos, Direction, StructureRng};
use structgen_testkit::ScriptedRandom;
use structgen_world::config::PieceWeightConfig;
use structgen_world::mineshaft::find_corridor_size;
use structgen_world::ocean_monument::RoomGraph;
use structgen_world::stronghold::{GenerationContext, StrongholdPieceType};
use structgen_world::{
    GenerationConfig, Piece, PieceKind, StrongholdGenerator, StructureGenerator, StructurePieces,
};

const ORIGIN: (i32, i32, i32) = (100, 50, 100);

fn corridor_box(draw: i32, existing: &StructurePieces) -> (Option<BoundingBox>, usize) {
    let mut rng = ScriptedRandom::new([draw]);
    let (x, y, z) = ORIGIN;
    let bb = find_corridor_size(existing, &mut rng, x, y, z, Direction::North);
    (bb, rng.draws())
}

#[test]
fn north_corridor_length_follows_the_recorded_draw() {
    let empty = StructurePieces::new();
    for (draw, sections) in [(0, 1), (1, 2), (2, 3)] {
        let (bb, draws) = corridor_box(draw, &empty);
        let bb = bb.expect("empty list never blocks");
        assert_eq!(draws, 1);
        assert_eq!(bb.max_z() - bb.min_z(), 5 * sections - 1);
        assert_eq!(bb.max_z(), ORIGIN.2);
        assert_eq!((bb.min_x(), bb.max_x()), (ORIGIN.0, ORIGIN.0 + 2));
        assert_eq!((bb.min_y(), bb.max_y()), (ORIGIN.1, ORIGIN.1 + 2));

        let mut pieces = StructurePieces::new();
        pieces.push(Piece::new(
            PieceKind::MineshaftCorridor {
                has_rails: false,
                has_spiders: false,
                num_sections: bb.z_span() / 5,
            },
            bb,
            Some(Direction::North),
            1,
        ));
        assert_eq!(pieces.len(), 1);
        let PieceKind::MineshaftCorridor { num_sections, .. } = pieces.pieces()[0].kind() else {
            panic!("not a corridor");
        };
        assert_eq!(*num_sections, sections);
    }
}

#[test]
fn blocked_corridor_shrinks_one_section_at_a_time() {
    let mut existing = StructurePieces::new();
    existing.push(Piece::new(
        PieceKind::MineshaftStairs,
        BoundingBox::new(100, 50, 93, 102, 52, 93),
        None,
        1,
    ));
    let (bb, draws) = corridor_box(2, &existing);
    assert_eq!(draws, 1);
    assert_eq!(bb, Some(BoundingBox::new(100, 50, 96, 102, 52, 100)));

    existing.push(Piece::new(
        PieceKind::MineshaftStairs,
        BoundingBox::new(101, 51, 100, 101, 51, 100),
        None,
        1,
    ));
    let (bb, _) = corridor_box(2, &existing);
    assert_eq!(bb, None);
}

#[test]
fn library_cap_holds_within_one_stronghold() {
    let config = GenerationConfig::default();
    let generator = StrongholdGenerator::new(&config);
    let mut saw_library = false;

    for seed in 0..60 {
        let mut ctx = GenerationContext::new(&config.stronghold.weights);
        let pieces = generator.layout(ChunkPos::new(0, 0), &mut StructureRng::new(seed), &mut ctx);
        let count = |pred: fn(&PieceKind) -> bool| {
            pieces.pieces().iter().filter(|p| pred(p.kind())).count()
        };
        let libraries = count(|k| matches!(k, PieceKind::StrongholdLibrary { .. }));
        let portals = count(|k| matches!(k, PieceKind::StrongholdPortalRoom));
        assert!(libraries <= 2, "seed {seed}: {libraries} libraries");
        assert!(portals <= 1, "seed {seed}: {portals} portal rooms");

        saw_library |= libraries > 0;
        if libraries == 2 {
            assert!(ctx.weight(StrongholdPieceType::Library).is_none());
            assert!(!ctx.do_place(StrongholdPieceType::Library, 10));
        }
    }
    assert!(saw_library, "no seed placed a library");
}

#[test]
fn uncapped_rows_stay_in_the_table() {
    let table = vec![
        PieceWeightConfig {
            kind: StrongholdPieceType::Straight,
            weight: 40,
            max_place_count: 0,
        },
        PieceWeightConfig {
            kind: StrongholdPieceType::Library,
            weight: 10,
            max_place_count: 2,
        },
    ];
    let mut ctx = GenerationContext::new(&table);
    for _ in 0..3 {
        ctx.record_placement(StrongholdPieceType::Library);
        ctx.record_placement(StrongholdPieceType::Straight);
    }
    assert!(!ctx.update_piece_weight());
    assert_eq!(ctx.total_weight(), 40);
    assert!(ctx.do_place(StrongholdPieceType::Straight, 0));
}

#[test]
fn generated_strongholds_keep_their_portal() {
    let config = GenerationConfig::default();
    let generator = StrongholdGenerator::new(&config);
    for seed in 0..10 {
        if let Some(start) = generator.generate(ChunkPos::new(seed as i32, 0), &mut StructureRng::new(seed)) {
            assert!(start
                .pieces()
                .iter()
                .any(|p| matches!(p.kind(), PieceKind::StrongholdPortalRoom)));
        }
    }
}

#[test]
fn monument_pruning_never_disconnects_a_room() {
    for seed in 0..1000 {
        let mut graph = RoomGraph::generate(&mut StructureRng::new(seed));
        let rooms: Vec<usize> = graph.lattice_rooms().collect();
        for room in rooms {
            assert!(
                graph.reaches_source(room),
                "seed {seed}: room {room} cut off from the entrance"
            );
        }
    }
}
