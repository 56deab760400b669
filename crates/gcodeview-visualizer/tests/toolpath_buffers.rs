use gcodeview_core::{ExtrusionRole, MoveRecord, MoveType, PrintMetadata, ViewerError};
use gcodeview_settings::ViewerSettings;
use gcodeview_visualizer::{PrimitiveKind, ToolpathBuilder, ToolpathViewer};
use glam::Vec3;

fn straight_extrusion(count: usize) -> Vec<MoveRecord> {
    (0..count)
        .map(|i| {
            MoveRecord::extrude(
                i,
                ExtrusionRole::Perimeter,
                Vec3::new(i as f32 * 0.1, 0.0, 0.2),
            )
        })
        .collect()
}

fn mixed_moves() -> Vec<MoveRecord> {
    let mut moves = vec![MoveRecord::new(0, MoveType::Travel, Vec3::ZERO)];
    let mut push = |m: MoveRecord| moves.push(m);
    push(MoveRecord::new(1, MoveType::Travel, Vec3::new(1.0, 1.0, 0.2)));
    push(MoveRecord::new(2, MoveType::Unretract, Vec3::new(1.0, 1.0, 0.2)));
    push(MoveRecord::extrude(3, ExtrusionRole::ExternalPerimeter, Vec3::new(5.0, 1.0, 0.2)));
    push(MoveRecord::extrude(4, ExtrusionRole::ExternalPerimeter, Vec3::new(5.0, 5.0, 0.2)));
    push(MoveRecord::extrude(5, ExtrusionRole::InternalInfill, Vec3::new(1.0, 5.0, 0.2)));
    push(MoveRecord::new(6, MoveType::Retract, Vec3::new(1.0, 5.0, 0.2)));
    push(MoveRecord::new(7, MoveType::Wipe, Vec3::new(2.0, 5.0, 0.2)));
    push(MoveRecord::new(8, MoveType::Travel, Vec3::new(8.0, 8.0, 0.4)));
    push(MoveRecord::new(9, MoveType::Noop, Vec3::new(8.0, 8.0, 0.4)));
    push(MoveRecord::extrude(10, ExtrusionRole::ExternalPerimeter, Vec3::new(9.0, 8.0, 0.4)));
    moves
}

#[test]
fn test_footprints_fill_every_buffer() {
    let moves = mixed_moves();
    let out = ToolpathBuilder::new(&ViewerSettings::default())
        .build(&moves)
        .unwrap();

    let mut segments = 0;
    for buffer in &out.buffers {
        let traits = buffer.traits();
        let chunks = buffer.chunks();
        let footprints = chunks.total_index_count() / traits.indices_per_segment;
        assert_eq!(chunks.total_index_count() % traits.indices_per_segment, 0);
        assert_eq!(
            chunks.total_vertex_count(),
            footprints * traits.vertices_per_segment
        );
        segments += footprints;
    }
    // every move after the first except the noop
    assert_eq!(segments, moves.len() - 2);

    let extrude = &out.buffers[MoveType::Extrude.buffer_id().unwrap()];
    assert_eq!(extrude.kind(), PrimitiveKind::Triangle);
    assert_eq!(extrude.paths().len(), 3);
    let wipe = &out.buffers[MoveType::Wipe.buffer_id().unwrap()];
    assert_eq!(wipe.paths().len(), 1);
    assert_eq!(wipe.paths()[0].first_move_id(), 6);
}

#[test]
fn test_chunks_respect_capacity() {
    let moves = straight_extrusion(200);
    let out = ToolpathBuilder::new(&ViewerSettings::default())
        .with_chunk_capacity(100)
        .build(&moves)
        .unwrap();

    let extrude = &out.buffers[MoveType::Extrude.buffer_id().unwrap()];
    // 12 footprints of 8 vertices per chunk
    assert_eq!(extrude.chunks().chunk_count(), 17);
    for chunk in extrude.chunks().chunks() {
        assert!(chunk.vertex_count() <= 100);
        assert_eq!(chunk.vertex_count() % 8, 0);
    }
    for index_chunk in extrude.chunks().index_chunks() {
        let max = index_chunk.data().iter().copied().max().unwrap();
        assert!(usize::from(max) < 100);
    }
}

#[test]
fn test_long_path_splits_into_contiguous_sub_paths() {
    let moves = straight_extrusion(70_000);
    let out = ToolpathBuilder::new(&ViewerSettings::default())
        .build(&moves)
        .unwrap();
    let extrude = &out.buffers[MoveType::Extrude.buffer_id().unwrap()];

    assert!(extrude.chunks().chunk_count() >= 2);
    assert_eq!(extrude.paths().len(), 1);

    let path = &extrude.paths()[0];
    let subs = path.sub_paths();
    assert_eq!(subs.len(), extrude.chunks().chunk_count());
    assert_eq!(subs[0].first.move_id, 0);
    assert_eq!(subs[subs.len() - 1].last.move_id, 69_999);

    let mut segments = 0;
    for (chunk_id, sub) in subs.iter().enumerate() {
        assert_eq!(sub.chunk_id(), chunk_id);
        assert_eq!(sub.first.index_id, 0);
        segments += sub.last.move_id - sub.first.move_id;
    }
    for pair in subs.windows(2) {
        assert_eq!(pair[1].first.move_id, pair[0].last.move_id);
    }
    assert_eq!(segments, 69_999);
    assert_eq!(path.vertices_count(), 70_000);
    assert_eq!(path.sub_path_containing(8_192), Some(0));
    assert_eq!(path.sub_path_containing(8_193), Some(1));
}

#[test]
fn test_bad_move_order_is_rejected_before_mutation() {
    let moves = straight_extrusion(10);
    let mut viewer = ToolpathViewer::default();
    viewer.load(&moves, &PrintMetadata::default()).unwrap();
    let batches_before = viewer
        .buffer(MoveType::Extrude)
        .unwrap()
        .render_paths()
        .to_vec();

    let mut shuffled = straight_extrusion(12);
    shuffled.swap(4, 5);
    let err = viewer.load(&shuffled, &PrintMetadata::default()).unwrap_err();
    assert_eq!(err, ViewerError::MoveOrder { index: 4, id: 5 });

    assert_eq!(viewer.moves_count(), 10);
    assert_eq!(
        viewer.buffer(MoveType::Extrude).unwrap().render_paths(),
        batches_before.as_slice()
    );
}

#[test]
fn test_empty_sequence_loads_nothing() {
    let mut viewer = ToolpathViewer::default();
    viewer.load(&[], &PrintMetadata::default()).unwrap();
    assert!(!viewer.has_data());
    assert!(!viewer.can_export_toolpaths());
    assert_eq!(viewer.sequential_view().current_position, None);
    assert_eq!(viewer.statistics().render_paths_count, 0);
}
