//! # GCodeView
//!
//! Turns decoded 3D-printer moves into chunked, GPU-ready toolpath geometry and keeps
//! a cheap re-coloring and re-batching layer on top of it.
//!
//! ## Architecture
//!
//! GCodeView is organized as a workspace with multiple crates:
//!
//! 1. **gcodeview-core** - Move records, colors, print metadata, error types
//! 2. **gcodeview-settings** - Palette, buffer limits and display defaults (JSON/TOML)
//! 3. **gcodeview-visualizer** - Buffer construction, path index, classification, batching
//! 4. **gcodeview** - Command line front-end that integrates all crates

use serde::Serialize;
use std::collections::BTreeMap;

pub use gcodeview_core::{
    Color, Error, ExtrusionRole, MoveDump, MoveRecord, MoveType, PrintMetadata, Result,
    SettingsError, ViewType, ViewerError, ViewerResult,
};
pub use gcodeview_settings::{
    default_config_path, BufferSettings, DisplaySettings, Palette, ViewerSettings,
};
pub use gcodeview_visualizer::visualizer;
pub use gcodeview_visualizer::{
    BoundingBox, Endpoints, RenderBatches, Statistics, ToolpathBuilder, ToolpathViewer,
    TriangleSoup,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build date (set at compile time)
pub const BUILD_DATE: &str = env!("BUILD_DATE");

/// Per move type counts of a loaded toolpath.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BufferSummary {
    pub paths: usize,
    pub chunks: usize,
    pub vertices: usize,
    pub indices: usize,
    pub render_paths: usize,
}

/// What a viewer holds after a load, in a printable form.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoadSummary {
    pub moves: usize,
    pub layers: usize,
    pub view_type: ViewType,
    pub roles: Vec<&'static str>,
    pub extruders: Vec<u8>,
    pub buffers: BTreeMap<&'static str, BufferSummary>,
    pub window: Endpoints,
    pub bounding_box: Option<BoundingBox>,
    pub statistics: Statistics,
}

/// Summarize the toolpaths currently held by `viewer`. Empty buffers are left out.
pub fn summarize(viewer: &ToolpathViewer) -> LoadSummary {
    let buffers = viewer
        .buffers()
        .iter()
        .filter(|b| b.has_data())
        .map(|b| {
            (
                b.move_type().name(),
                BufferSummary {
                    paths: b.paths().len(),
                    chunks: b.chunks().chunk_count(),
                    vertices: b.chunks().total_vertex_count(),
                    indices: b.chunks().total_index_count(),
                    render_paths: b.render_paths().len(),
                },
            )
        })
        .collect();

    let bbox = viewer.paths_bounding_box();
    LoadSummary {
        moves: viewer.moves_count(),
        layers: viewer.layers().size(),
        view_type: viewer.view_type(),
        roles: viewer.roles().iter().map(|r| r.name()).collect(),
        extruders: viewer.extruder_ids().to_vec(),
        buffers,
        window: viewer.sequential_view().current,
        bounding_box: bbox.is_valid().then_some(*bbox),
        statistics: viewer.statistics().clone(),
    }
}

/// Initialize logging with the default configuration
///
/// Sets up structured logging with:
/// - Console output on stderr, so summaries on stdout stay machine-readable
/// - RUST_LOG environment variable support
pub fn init_logging() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(tracing::Level::INFO.to_string()));

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}
