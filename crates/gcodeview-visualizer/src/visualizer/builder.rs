//! Single-pass construction of the toolpath buffers.

use super::bounds::BoundingBox;
use super::layers::Layers;
use super::tbuffer::TBuffer;
use gcodeview_core::{ExtrusionRole, MoveRecord, MoveType, ViewerError, ViewerResult};
use gcodeview_settings::ViewerSettings;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// Everything derived from one move sequence.
#[derive(Debug, Clone)]
pub struct BuildOutput {
    /// One buffer per move type, indexed by buffer id.
    pub buffers: Vec<TBuffer>,
    pub layers: Layers,
    /// Extrusion roles present, sorted.
    pub roles: Vec<ExtrusionRole>,
    /// Extruders used by extrusions, sorted.
    pub extruder_ids: Vec<u8>,
    pub paths_bounding_box: BoundingBox,
    pub max_bounding_box: BoundingBox,
    pub moves_count: usize,
    pub elapsed: Duration,
}

/// Builds buffers, layers and bounds from a move sequence.
#[derive(Debug, Clone)]
pub struct ToolpathBuilder {
    max_vertices_per_chunk: usize,
    include_all_moves_in_bounds: bool,
    marker_height: f32,
}

impl ToolpathBuilder {
    pub fn new(settings: &ViewerSettings) -> Self {
        Self {
            max_vertices_per_chunk: settings.buffers.max_vertices_per_chunk,
            include_all_moves_in_bounds: settings.display.include_all_moves_in_bounds,
            marker_height: settings.display.marker_height,
        }
    }

    pub fn with_chunk_capacity(mut self, max_vertices_per_chunk: usize) -> Self {
        self.max_vertices_per_chunk = max_vertices_per_chunk;
        self
    }

    /// Reject sequences whose ids are not their positions.
    pub fn validate(moves: &[MoveRecord]) -> ViewerResult<()> {
        match moves.iter().enumerate().find(|(i, m)| m.id != *i) {
            Some((index, m)) => Err(ViewerError::MoveOrder { index, id: m.id }),
            None => Ok(()),
        }
    }

    pub fn build(&self, moves: &[MoveRecord]) -> ViewerResult<BuildOutput> {
        let start = Instant::now();
        Self::validate(moves)?;

        let mut buffers = MoveType::BUFFER_TYPES
            .iter()
            .map(|&t| TBuffer::for_move_type(t, self.max_vertices_per_chunk))
            .collect::<ViewerResult<Vec<_>>>()?;

        let mut paths_bounding_box = BoundingBox::new();
        let mut roles = Vec::new();
        let mut extruder_ids = Vec::new();

        for (i, curr) in moves.iter().enumerate() {
            if self.include_all_moves_in_bounds {
                paths_bounding_box.update(curr.position);
            } else if curr.move_type == MoveType::Extrude
                && curr.role != ExtrusionRole::Custom
                && curr.width != 0.0
                && curr.height != 0.0
            {
                paths_bounding_box.update(curr.position);
            }

            if curr.move_type == MoveType::Extrude {
                extruder_ids.push(curr.extruder_id);
                if i > 0 {
                    roles.push(curr.role);
                }
            }

            if i == 0 {
                continue;
            }
            if let Some(id) = curr.move_type.buffer_id() {
                buffers[id].add_segment(&moves[i - 1], curr);
            }
        }

        roles.sort_unstable();
        roles.dedup();
        extruder_ids.sort_unstable();
        extruder_ids.dedup();

        for buffer in &buffers {
            if buffer.has_data() {
                trace!(
                    "{} buffer: {} paths, {} chunks, {} vertices, {} indices",
                    buffer.move_type(),
                    buffer.paths().len(),
                    buffer.chunks().chunk_count(),
                    buffer.chunks().total_vertex_count(),
                    buffer.chunks().total_index_count()
                );
            }
        }

        let layers = Layers::from_moves(moves);
        let max_bounding_box = paths_bounding_box.extended_up(self.marker_height);
        let elapsed = start.elapsed();

        debug!(
            "Built toolpaths from {} moves: {} layers, {} roles in {:?}",
            moves.len(),
            layers.size(),
            roles.len(),
            elapsed
        );

        Ok(BuildOutput {
            buffers,
            layers,
            roles,
            extruder_ids,
            paths_bounding_box,
            max_bounding_box,
            moves_count: moves.len(),
            elapsed,
        })
    }
}
