//! # Toolpath Viewer
//!
//! Owns the buffers built from one move sequence together with the filter state, and
//! turns filter changes into re-batches. Setters never re-batch by themselves: call
//! [`ToolpathViewer::refresh_render_paths`] (or one of its variants) once the filters
//! are in place.

use super::batcher::{rebatch, ClassificationContext, RenderRequest};
use super::bounds::BoundingBox;
use super::builder::ToolpathBuilder;
use super::export::{export_triangles, TriangleSoup};
use super::gpu::{DrawCall, GpuBackend};
use super::layers::Layers;
use super::ranges::Ranges;
use super::sequential::{SequentialChange, SequentialView};
use super::tbuffer::TBuffer;
use gcodeview_core::{
    Color, ExtrusionRole, MoveRecord, MoveType, PrintMetadata, ViewType, ViewerResult,
};
use gcodeview_settings::ViewerSettings;
use serde::Serialize;
use std::time::Instant;
use tracing::{debug, warn};

/// Bit of [`ToolpathViewer::visibility_flags`] holding the marker visibility.
pub const MARKER_VISIBILITY_BIT: u32 = MoveType::BUFFERS_COUNT as u32;

/// Which bounds of the playback window survive the next re-batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WindowRetention {
    pub keep_first: bool,
    pub keep_last: bool,
}

impl WindowRetention {
    pub const NONE: Self = Self {
        keep_first: false,
        keep_last: false,
    };
    pub const BOTH: Self = Self {
        keep_first: true,
        keep_last: true,
    };
}

/// Timings and memory use of the loaded toolpaths.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Statistics {
    pub load_time_ms: f64,
    pub refresh_time_ms: f64,
    pub moves_count: usize,
    pub paths_count: usize,
    pub chunks_count: usize,
    pub vertices_count: usize,
    pub indices_count: usize,
    pub vertices_size_bytes: usize,
    pub indices_size_bytes: usize,
    pub render_paths_count: usize,
}

impl Statistics {
    fn update_buffers(&mut self, buffers: &[TBuffer]) {
        self.paths_count = buffers.iter().map(|b| b.paths().len()).sum();
        self.chunks_count = buffers.iter().map(|b| b.chunks().chunk_count()).sum();
        self.vertices_count = buffers.iter().map(|b| b.chunks().total_vertex_count()).sum();
        self.indices_count = buffers.iter().map(|b| b.chunks().total_index_count()).sum();
        self.vertices_size_bytes = buffers.iter().map(|b| b.chunks().vertices_size_bytes()).sum();
        self.indices_size_bytes = buffers.iter().map(|b| b.chunks().indices_size_bytes()).sum();
    }
}

/// Toolpath buffers plus the classification and batching state layered on top.
#[derive(Debug, Clone)]
pub struct ToolpathViewer {
    settings: ViewerSettings,
    buffers: Vec<TBuffer>,
    visible_buffers: [bool; MoveType::BUFFERS_COUNT],
    layers: Layers,
    layers_z_range: [usize; 2],
    ranges: Ranges,
    tool_colors: Vec<Color>,
    roles: Vec<ExtrusionRole>,
    extruder_ids: Vec<u8>,
    view_type: ViewType,
    role_visibility_flags: u32,
    sequential_view: SequentialView,
    paths_bounding_box: BoundingBox,
    max_bounding_box: BoundingBox,
    moves_count: usize,
    statistics: Statistics,
}

impl Default for ToolpathViewer {
    fn default() -> Self {
        Self::new(ViewerSettings::default())
    }
}

impl ToolpathViewer {
    pub fn new(settings: ViewerSettings) -> Self {
        let display = &settings.display;
        let mut visible_buffers = [false; MoveType::BUFFERS_COUNT];
        for (id, visible) in visible_buffers.iter_mut().enumerate() {
            if let Some(move_type) = MoveType::from_buffer_id(id) {
                *visible = display.is_move_type_visible(move_type);
            }
        }

        let mut sequential_view = SequentialView {
            skip_invisible_moves: display.skip_invisible_moves,
            ..Default::default()
        };
        sequential_view.marker.color = display.marker_color;

        Self {
            view_type: display.view_type,
            role_visibility_flags: display.role_visibility_flags,
            visible_buffers,
            buffers: Vec::new(),
            layers: Layers::default(),
            layers_z_range: [0, 0],
            ranges: Ranges::default(),
            tool_colors: Vec::new(),
            roles: Vec::new(),
            extruder_ids: Vec::new(),
            sequential_view,
            paths_bounding_box: BoundingBox::new(),
            max_bounding_box: BoundingBox::new(),
            moves_count: 0,
            statistics: Statistics::default(),
            settings,
        }
    }

    /// Rebuild everything from `moves`.
    ///
    /// The sequence is validated before any state changes, so a rejected load leaves the
    /// previous toolpaths in place. GPU handles of a previous load must be released with
    /// [`reset`](Self::reset) first.
    pub fn load(&mut self, moves: &[MoveRecord], metadata: &PrintMetadata) -> ViewerResult<()> {
        let start = Instant::now();
        let output = ToolpathBuilder::new(&self.settings).build(moves)?;

        if self.has_gpu_handles() {
            warn!("Loading toolpaths over buffers that still own GPU handles");
        }

        self.buffers = output.buffers;
        for (buffer, &visible) in self.buffers.iter_mut().zip(&self.visible_buffers) {
            buffer.visible = visible;
        }
        self.layers = output.layers;
        self.layers_z_range = [0, self.layers.size().saturating_sub(1)];
        self.roles = output.roles;
        self.extruder_ids = output.extruder_ids;
        self.paths_bounding_box = output.paths_bounding_box;
        self.max_bounding_box = output.max_bounding_box;
        self.moves_count = output.moves_count;

        self.ranges = Ranges::from_moves(
            moves,
            self.is_move_type_visible(MoveType::Travel),
            self.is_move_type_visible(MoveType::Extrude),
        );
        self.tool_colors = metadata.decoded_tool_colors();

        self.sequential_view.reset();
        self.refresh_render_paths();

        self.statistics.moves_count = self.moves_count;
        self.statistics.update_buffers(&self.buffers);
        self.statistics.load_time_ms = start.elapsed().as_secs_f64() * 1000.0;

        debug!(
            "Loaded {} moves into {} paths, {} chunks in {:.2} ms",
            self.moves_count,
            self.statistics.paths_count,
            self.statistics.chunks_count,
            self.statistics.load_time_ms
        );
        Ok(())
    }

    /// Recompute the classification ranges and tool colors, then re-batch.
    pub fn refresh(&mut self, moves: &[MoveRecord], metadata: &PrintMetadata) -> ViewerResult<()> {
        ToolpathBuilder::validate(moves)?;
        self.ranges = Ranges::from_moves(
            moves,
            self.is_move_type_visible(MoveType::Travel),
            self.is_move_type_visible(MoveType::Extrude),
        );
        self.tool_colors = metadata.decoded_tool_colors();
        self.refresh_render_paths();
        Ok(())
    }

    /// Re-batch with the playback window reset to every visible move.
    pub fn refresh_render_paths(&mut self) {
        self.refresh_render_paths_keeping(WindowRetention::NONE);
    }

    /// Re-batch, keeping the window bounds selected by `retention`.
    pub fn refresh_render_paths_keeping(&mut self, retention: WindowRetention) {
        let start = Instant::now();
        let request = RenderRequest {
            view_type: self.view_type,
            visible_buffers: self.visible_buffers,
            role_visibility_flags: self.role_visibility_flags,
            layers_z_range: self.layers_z_range,
            current: self.sequential_view.current,
            keep_first: retention.keep_first,
            keep_last: retention.keep_last,
        };
        let ctx = ClassificationContext {
            palette: &self.settings.palette,
            ranges: &self.ranges,
            tool_colors: &self.tool_colors,
        };

        let batches = rebatch(&self.buffers, &self.layers, &ctx, &request);
        self.sequential_view.apply(&batches);
        self.statistics.render_paths_count = batches.render_path_count();
        for (buffer, render_paths) in self.buffers.iter_mut().zip(batches.render_paths) {
            buffer.set_render_paths(render_paths);
        }
        self.statistics.refresh_time_ms = start.elapsed().as_secs_f64() * 1000.0;

        debug!(
            "Refreshed {} render paths in {:.3} ms",
            self.statistics.render_paths_count, self.statistics.refresh_time_ms
        );
    }

    pub fn set_view_type(&mut self, view_type: ViewType) {
        self.view_type = view_type;
    }

    pub fn set_move_type_visible(&mut self, move_type: MoveType, visible: bool) {
        if let Some(id) = move_type.buffer_id() {
            self.visible_buffers[id] = visible;
            if let Some(buffer) = self.buffers.get_mut(id) {
                buffer.visible = visible;
            }
        }
    }

    pub fn set_role_visibility_flags(&mut self, flags: u32) {
        self.role_visibility_flags = flags;
    }

    /// Select the inclusive layer range to draw.
    ///
    /// Returns the window bounds the next re-batch should keep: a bound is kept when the
    /// range did not grow on its side.
    pub fn set_layers_z_range(&mut self, range: [usize; 2]) -> WindowRetention {
        let retention = WindowRetention {
            keep_first: range[0] >= self.layers_z_range[0],
            keep_last: range[1] <= self.layers_z_range[1],
        };
        self.layers_z_range = range;
        retention
    }

    pub fn set_skip_invisible_moves(&mut self, skip: bool) {
        self.sequential_view.skip_invisible_moves = skip;
    }

    /// One bit per buffer id, plus [`MARKER_VISIBILITY_BIT`].
    pub fn visibility_flags(&self) -> u32 {
        let buffers = self
            .visible_buffers
            .iter()
            .enumerate()
            .filter(|(_, &visible)| visible)
            .fold(0, |flags, (id, _)| flags | (1 << id));
        if self.sequential_view.marker.visible {
            buffers | (1 << MARKER_VISIBILITY_BIT)
        } else {
            buffers
        }
    }

    pub fn set_visibility_flags(&mut self, flags: u32) {
        for id in 0..MoveType::BUFFERS_COUNT {
            if let Some(move_type) = MoveType::from_buffer_id(id) {
                self.set_move_type_visible(move_type, flags & (1 << id) != 0);
            }
        }
        self.sequential_view.marker.visible = flags & (1 << MARKER_VISIBILITY_BIT) != 0;
    }

    /// Move the playback window and re-batch when it changed.
    pub fn update_sequential_view_current(
        &mut self,
        first: usize,
        last: usize,
    ) -> Option<SequentialChange> {
        let buffers = &self.buffers;
        let visible_buffers = &self.visible_buffers;
        let role_flags = self.role_visibility_flags;
        let is_visible = |move_id: usize| {
            buffers
                .iter()
                .zip(visible_buffers)
                .filter(|(_, &visible)| visible)
                .any(|(buffer, _)| {
                    buffer.path_at(move_id).is_some_and(|path_id| {
                        let path = &buffer.paths()[path_id];
                        path.move_type != MoveType::Extrude || path.role.is_visible_in(role_flags)
                    })
                })
        };

        let change = self.sequential_view.update_current(first, last, is_visible)?;
        self.refresh_render_paths_keeping(WindowRetention::BOTH);
        Some(change)
    }

    /// Release GPU handles through `backend` and clear every buffer.
    ///
    /// Without a backend the handles are only forgotten.
    pub fn reset(&mut self, backend: Option<&mut dyn GpuBackend>) {
        match backend {
            Some(backend) => {
                for buffer in &mut self.buffers {
                    for (chunk, index_chunk) in buffer.chunks_mut().pairs_mut() {
                        if let Some(handle) = chunk.gpu.take() {
                            backend.release(handle);
                        }
                        if let Some(handle) = index_chunk.gpu.take() {
                            backend.release(handle);
                        }
                    }
                }
            }
            None if self.has_gpu_handles() => {
                debug!("Reset without a backend, dropping GPU handles");
            }
            None => {}
        }

        self.buffers.clear();
        self.layers.reset();
        self.layers_z_range = [0, 0];
        self.ranges.reset();
        self.tool_colors.clear();
        self.roles.clear();
        self.extruder_ids.clear();
        self.sequential_view.reset();
        self.paths_bounding_box = BoundingBox::new();
        self.max_bounding_box = BoundingBox::new();
        self.moves_count = 0;
        self.statistics = Statistics::default();
    }

    /// Upload every chunk that has no GPU handle yet.
    ///
    /// CPU copies are dropped afterwards when `release_cpu_data` is set.
    pub fn upload(&mut self, backend: &mut dyn GpuBackend) -> ViewerResult<()> {
        let mut uploaded = 0;
        for buffer in &mut self.buffers {
            for (chunk, index_chunk) in buffer.chunks_mut().pairs_mut() {
                if chunk.vertex_count() == 0 {
                    continue;
                }
                if chunk.gpu.is_none() {
                    if !chunk.has_cpu_data() {
                        warn!("Chunk lost its CPU data before upload");
                        continue;
                    }
                    let handle = backend.upload_vertices(chunk.format(), chunk.data())?;
                    chunk.gpu = Some(handle);
                    uploaded += 1;
                }
                if index_chunk.gpu.is_none() && index_chunk.has_cpu_data() {
                    let handle = backend.upload_indices(index_chunk.data())?;
                    index_chunk.gpu = Some(handle);
                    uploaded += 1;
                }
            }
        }

        if self.settings.buffers.release_cpu_data {
            for buffer in &mut self.buffers {
                buffer.release_cpu_data();
            }
        }
        debug!("Uploaded {} GPU buffers", uploaded);
        Ok(())
    }

    /// Submit one draw call per render path. Returns the number of calls made.
    pub fn render(&self, backend: &mut dyn GpuBackend) -> ViewerResult<usize> {
        let mut calls = 0;
        for buffer in &self.buffers {
            let traits = buffer.traits();
            for render_path in buffer.render_paths() {
                let chunks = buffer.chunks();
                let handles = chunks
                    .chunk(render_path.index_chunk_id)
                    .and_then(|c| c.gpu)
                    .zip(
                        chunks
                            .index_chunk(render_path.index_chunk_id)
                            .and_then(|c| c.gpu),
                    );
                let Some((vertices, indices)) = handles else {
                    debug!(
                        "Skipping {} chunk {} without GPU buffers",
                        buffer.move_type(),
                        render_path.index_chunk_id
                    );
                    continue;
                };
                backend.draw(&DrawCall {
                    move_type: buffer.move_type(),
                    kind: traits.kind,
                    format: traits.format,
                    vertices,
                    indices,
                    color: render_path.color,
                    ranges: &render_path.ranges,
                })?;
                calls += 1;
            }
        }
        Ok(calls)
    }

    pub fn has_data(&self) -> bool {
        self.buffers.iter().any(TBuffer::has_data)
    }

    pub fn can_export_toolpaths(&self) -> bool {
        self.buffer(MoveType::Extrude).is_some_and(|buffer| {
            buffer.has_data()
                && buffer.chunks().has_cpu_data()
                && !buffer.render_paths().is_empty()
        })
    }

    /// Append the visible extrusion triangles to `soup`.
    pub fn export_toolpaths(&self, soup: &mut TriangleSoup) -> usize {
        if !self.can_export_toolpaths() {
            return 0;
        }
        self.buffer(MoveType::Extrude)
            .map_or(0, |buffer| export_triangles(buffer, soup))
    }

    /// Buffer and path containing `move_id`.
    pub fn path_at(&self, move_id: usize) -> Option<(MoveType, usize)> {
        self.buffers
            .iter()
            .find_map(|b| b.path_at(move_id).map(|path_id| (b.move_type(), path_id)))
    }

    pub fn is_move_type_visible(&self, move_type: MoveType) -> bool {
        move_type
            .buffer_id()
            .is_some_and(|id| self.visible_buffers[id])
    }

    fn has_gpu_handles(&self) -> bool {
        self.buffers.iter().any(|b| {
            b.chunks().chunks().iter().any(|c| c.gpu.is_some())
                || b.chunks().index_chunks().iter().any(|c| c.gpu.is_some())
        })
    }

    pub fn settings(&self) -> &ViewerSettings {
        &self.settings
    }

    pub fn buffers(&self) -> &[TBuffer] {
        &self.buffers
    }

    pub fn buffer(&self, move_type: MoveType) -> Option<&TBuffer> {
        move_type.buffer_id().and_then(|id| self.buffers.get(id))
    }

    pub fn layers(&self) -> &Layers {
        &self.layers
    }

    pub fn layers_z_range(&self) -> [usize; 2] {
        self.layers_z_range
    }

    pub fn ranges(&self) -> &Ranges {
        &self.ranges
    }

    pub fn tool_colors(&self) -> &[Color] {
        &self.tool_colors
    }

    pub fn roles(&self) -> &[ExtrusionRole] {
        &self.roles
    }

    pub fn extruder_ids(&self) -> &[u8] {
        &self.extruder_ids
    }

    pub fn view_type(&self) -> ViewType {
        self.view_type
    }

    pub fn role_visibility_flags(&self) -> u32 {
        self.role_visibility_flags
    }

    pub fn sequential_view(&self) -> &SequentialView {
        &self.sequential_view
    }

    pub fn paths_bounding_box(&self) -> &BoundingBox {
        &self.paths_bounding_box
    }

    /// Paths box extended upward by the marker height.
    pub fn max_bounding_box(&self) -> &BoundingBox {
        &self.max_bounding_box
    }

    pub fn moves_count(&self) -> usize {
        self.moves_count
    }

    pub fn statistics(&self) -> &Statistics {
        &self.statistics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    fn square_layers() -> Vec<MoveRecord> {
        let mut moves = vec![MoveRecord::new(0, MoveType::Travel, Vec3::ZERO)];
        let corners = [
            Vec3::new(10.0, 0.0, 0.0),
            Vec3::new(10.0, 10.0, 0.0),
            Vec3::new(0.0, 10.0, 0.0),
            Vec3::new(0.0, 0.0, 0.0),
        ];
        for layer in 0..3 {
            let z = 0.2 * (layer + 1) as f32;
            let id = moves.len();
            moves.push(MoveRecord::new(id, MoveType::Travel, Vec3::new(0.0, 0.0, z)));
            for corner in corners {
                let id = moves.len();
                moves.push(MoveRecord::extrude(
                    id,
                    ExtrusionRole::Perimeter,
                    corner + Vec3::Z * z,
                ));
            }
        }
        moves
    }

    #[test]
    fn test_load_sets_window_and_layers() {
        let moves = square_layers();
        let mut viewer = ToolpathViewer::default();
        viewer.load(&moves, &PrintMetadata::default()).unwrap();

        assert_eq!(viewer.moves_count(), 16);
        assert_eq!(viewer.layers().size(), 3);
        assert_eq!(viewer.layers_z_range(), [0, 2]);
        assert_eq!(viewer.sequential_view().endpoints.first, 1);
        assert_eq!(viewer.sequential_view().current.last, 15);
        assert!(viewer.has_data());
        assert!(viewer.can_export_toolpaths());
        assert!(viewer.statistics().render_paths_count > 0);
    }

    #[test]
    fn test_layer_range_retention() {
        let moves = square_layers();
        let mut viewer = ToolpathViewer::default();
        viewer.load(&moves, &PrintMetadata::default()).unwrap();

        let retention = viewer.set_layers_z_range([0, 1]);
        assert_eq!(retention, WindowRetention::BOTH);
        viewer.refresh_render_paths_keeping(retention);
        assert_eq!(viewer.sequential_view().current.last, 10);

        let retention = viewer.set_layers_z_range([1, 2]);
        assert_eq!(
            retention,
            WindowRetention {
                keep_first: true,
                keep_last: false
            }
        );
    }

    #[test]
    fn test_visibility_flags_round_trip() {
        let mut viewer = ToolpathViewer::default();
        let flags = viewer.visibility_flags();
        assert_ne!(flags & (1 << MARKER_VISIBILITY_BIT), 0);
        assert!(viewer.is_move_type_visible(MoveType::Extrude));
        assert!(!viewer.is_move_type_visible(MoveType::Travel));

        let travel_bit = 1 << MoveType::Travel.buffer_id().unwrap();
        viewer.set_visibility_flags(travel_bit);
        assert!(viewer.is_move_type_visible(MoveType::Travel));
        assert!(!viewer.is_move_type_visible(MoveType::Extrude));
        assert!(!viewer.sequential_view().marker.visible);
        assert_eq!(viewer.visibility_flags(), travel_bit);
    }

    #[test]
    fn test_path_at_searches_all_buffers() {
        let moves = square_layers();
        let mut viewer = ToolpathViewer::default();
        viewer.load(&moves, &PrintMetadata::default()).unwrap();

        assert_eq!(viewer.path_at(3), Some((MoveType::Extrude, 0)));
        assert_eq!(viewer.path_at(6).map(|(t, _)| t), Some(MoveType::Travel));
        assert_eq!(viewer.path_at(500), None);
    }

    #[test]
    fn test_reset_clears_state() {
        let moves = square_layers();
        let mut viewer = ToolpathViewer::default();
        viewer.load(&moves, &PrintMetadata::default()).unwrap();
        viewer.reset(None);
        assert!(!viewer.has_data());
        assert_eq!(viewer.moves_count(), 0);
        assert!(viewer.layers().is_empty());
        assert!(!viewer.paths_bounding_box().is_valid());
        assert_eq!(viewer.path_at(3), None);
    }
}
