use gcodeview::{summarize, MoveDump, MoveType, ToolpathViewer, ViewType, ViewerSettings};
use std::io::Write;

const DUMP: &str = r##"{
  "moves": [
    {"id": 0, "type": "travel", "position": [0.0, 0.0, 0.0]},
    {"id": 1, "type": "travel", "position": [5.0, 5.0, 0.2], "feedrate": 120.0},
    {"id": 2, "type": "extrude", "role": "external_perimeter", "position": [15.0, 5.0, 0.2],
     "feedrate": 30.0, "height": 0.2, "width": 0.45, "delta_extruder": 0.4, "volumetric_rate": 2.7},
    {"id": 3, "type": "extrude", "role": "external_perimeter", "position": [15.0, 15.0, 0.2],
     "feedrate": 30.0, "height": 0.2, "width": 0.45, "delta_extruder": 0.4, "volumetric_rate": 2.7},
    {"id": 4, "type": "extrude", "role": "internal_infill", "position": [5.0, 15.0, 0.2],
     "feedrate": 60.0, "height": 0.2, "width": 0.5, "delta_extruder": 0.5, "volumetric_rate": 6.0,
     "extruder_id": 1},
    {"id": 5, "type": "retract", "position": [5.0, 15.0, 0.2], "delta_extruder": -0.8},
    {"id": 6, "type": "travel", "position": [5.0, 5.0, 0.4], "feedrate": 120.0},
    {"id": 7, "type": "unretract", "position": [5.0, 5.0, 0.4], "delta_extruder": 0.8},
    {"id": 8, "type": "extrude", "role": "external_perimeter", "position": [15.0, 5.0, 0.4],
     "feedrate": 30.0, "height": 0.2, "width": 0.45, "delta_extruder": 0.4, "volumetric_rate": 2.7}
  ],
  "metadata": {
    "extruders_count": 2,
    "extruder_colors": ["#FF8000", "#0080FF"]
  }
}"##;

fn load_dump() -> (MoveDump, ToolpathViewer) {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(DUMP.as_bytes()).unwrap();
    let text = std::fs::read_to_string(file.path()).unwrap();
    let dump = MoveDump::from_json(&text).unwrap();

    let mut viewer = ToolpathViewer::new(ViewerSettings::default());
    viewer.load(&dump.moves, &dump.metadata).unwrap();
    (dump, viewer)
}

#[test]
fn test_dump_builds_layers_and_buffers() {
    let (dump, viewer) = load_dump();
    assert_eq!(dump.moves.len(), 9);

    let summary = summarize(&viewer);
    assert_eq!(summary.moves, 9);
    assert_eq!(summary.layers, 2);
    assert_eq!(summary.extruders, vec![0, 1]);
    assert_eq!(
        summary.roles,
        vec!["External perimeter", "Internal infill"]
    );
    assert_eq!(summary.buffers["extrude"].paths, 3);
    assert_eq!(summary.buffers["travel"].paths, 2);
    assert!(summary.buffers.contains_key("retract"));
    assert!(summary.buffers.contains_key("unretract"));

    let json = serde_json::to_value(&summary).unwrap();
    assert_eq!(json["view_type"], "feature_type");
    assert_eq!(json["moves"], 9);
}

#[test]
fn test_tool_view_uses_extruder_colors() {
    let (dump, mut viewer) = load_dump();
    viewer.set_view_type(ViewType::Tool);
    viewer.refresh(&dump.moves, &dump.metadata).unwrap();

    let colors = dump.metadata.decoded_tool_colors();
    let batches = viewer.buffer(MoveType::Extrude).unwrap().render_paths();
    assert_eq!(batches.len(), 2);
    assert!(batches.iter().any(|rp| rp.color == colors[0]));
    assert!(batches.iter().any(|rp| rp.color == colors[1]));
}

#[test]
fn test_second_layer_only() {
    let (_, mut viewer) = load_dump();
    let retention = viewer.set_layers_z_range([1, 1]);
    assert!(retention.keep_first);
    assert!(retention.keep_last);
    viewer.refresh_render_paths();

    let batches = viewer.buffer(MoveType::Extrude).unwrap().render_paths();
    assert_eq!(batches.len(), 1);
    assert_eq!(viewer.sequential_view().endpoints.first, 7);
    assert_eq!(viewer.sequential_view().endpoints.last, 8);
}
