//! Per move type toolpath buffer.

use super::batcher::RenderPath;
use super::chunk::ChunkAllocator;
use super::geometry::SegmentContext;
use super::path::{Endpoint, Path};
use super::primitive::{PrimitiveKind, PrimitiveTraits, VertexFormat};
use gcodeview_core::constants::MAX_VERTICES_PER_CHUNK;
use gcodeview_core::{MoveRecord, MoveType, ViewerError, ViewerResult};
use glam::Vec3;

/// Geometry, paths and current draw batches of one move type.
#[derive(Debug, Clone)]
pub struct TBuffer {
    move_type: MoveType,
    traits: &'static PrimitiveTraits,
    chunks: ChunkAllocator,
    paths: Vec<Path>,
    pub visible: bool,
    render_paths: Vec<RenderPath>,
    /// Trailing tool position of every footprint, by move id. Survives CPU release.
    positions: Vec<(usize, Vec3)>,
    scratch_vertices: Vec<f32>,
    scratch_indices: Vec<u16>,
}

impl TBuffer {
    /// Create a buffer storing `format` vertices.
    ///
    /// Fails when `format` is not the format of the move type's primitive, or when
    /// `capacity` cannot hold one footprint or exceeds the 16-bit index limit.
    pub fn new(move_type: MoveType, format: VertexFormat, capacity: usize) -> ViewerResult<Self> {
        let traits = PrimitiveKind::for_move_type(move_type)
            .map(PrimitiveKind::traits)
            .ok_or(ViewerError::FormatMismatch {
                primitive: "none",
                format: format.name(),
            })?;

        if traits.format != format {
            return Err(ViewerError::FormatMismatch {
                primitive: traits.kind.name(),
                format: format.name(),
            });
        }

        if !(traits.vertices_per_segment..=MAX_VERTICES_PER_CHUNK).contains(&capacity) {
            return Err(ViewerError::InvalidCapacity {
                capacity,
                min: traits.vertices_per_segment,
                max: MAX_VERTICES_PER_CHUNK,
            });
        }

        Ok(Self {
            move_type,
            traits,
            chunks: ChunkAllocator::new(format, capacity),
            paths: Vec::new(),
            visible: false,
            render_paths: Vec::new(),
            positions: Vec::new(),
            scratch_vertices: Vec::new(),
            scratch_indices: Vec::new(),
        })
    }

    /// Create a buffer with the format of the move type's primitive.
    pub fn for_move_type(move_type: MoveType, capacity: usize) -> ViewerResult<Self> {
        let format = PrimitiveKind::for_move_type(move_type)
            .map(|kind| kind.traits().format)
            .unwrap_or(VertexFormat::Position);
        Self::new(move_type, format, capacity)
    }

    pub fn move_type(&self) -> MoveType {
        self.move_type
    }

    pub fn traits(&self) -> &'static PrimitiveTraits {
        self.traits
    }

    pub fn kind(&self) -> PrimitiveKind {
        self.traits.kind
    }

    pub fn chunks(&self) -> &ChunkAllocator {
        &self.chunks
    }

    pub fn chunks_mut(&mut self) -> &mut ChunkAllocator {
        &mut self.chunks
    }

    pub fn paths(&self) -> &[Path] {
        &self.paths
    }

    pub fn render_paths(&self) -> &[RenderPath] {
        &self.render_paths
    }

    pub fn set_render_paths(&mut self, render_paths: Vec<RenderPath>) {
        self.render_paths = render_paths;
    }

    /// Append the segment `prev -> curr`, where `curr` has this buffer's move type.
    pub fn add_segment(&mut self, prev: &MoveRecord, curr: &MoveRecord) {
        debug_assert_eq!(curr.move_type, self.move_type);
        let traits = self.traits;

        let continues = prev.move_type == curr.move_type
            && self
                .paths
                .last()
                .is_some_and(|p| p.last_move_id() == prev.id && p.matches(curr));

        let chunk_id = self.chunks.reserve(traits.vertices_per_segment);
        let base = self.chunks.open_vertex_count();
        let index_id = self.chunks.open_index_count();

        let same_chunk = continues
            && self
                .paths
                .last()
                .is_some_and(|p| p.last().chunk_id == chunk_id);

        let joint = (same_chunk && traits.kind == PrimitiveKind::Triangle)
            .then(|| (base - traits.vertices_per_segment) as u16);

        let ctx = SegmentContext::new(prev.position, curr.position, base as u16)
            .with_size(curr.width, curr.height)
            .with_joint(joint);

        self.scratch_vertices.clear();
        self.scratch_indices.clear();
        (traits.expand)(&ctx, &mut self.scratch_vertices, &mut self.scratch_indices);

        for vertex in self
            .scratch_vertices
            .chunks_exact(traits.format.floats_per_vertex())
        {
            self.chunks.append_vertex(vertex);
        }
        self.chunks.append_indices(&self.scratch_indices);
        self.positions.push((curr.id, curr.position));

        let first = if traits.starts_at_previous_move() {
            Endpoint {
                chunk_id,
                index_id,
                move_id: prev.id,
                position: prev.position,
            }
        } else {
            Endpoint {
                chunk_id,
                index_id,
                move_id: curr.id,
                position: curr.position,
            }
        };
        let last = Endpoint {
            chunk_id,
            index_id,
            move_id: curr.id,
            position: curr.position,
        };

        match self.paths.last_mut() {
            Some(path) if continues => {
                if !same_chunk {
                    path.add_sub_path(first);
                }
                path.extend(last);
            }
            _ => {
                let mut path = Path::new(curr, first);
                path.extend(last);
                self.paths.push(path);
            }
        }
    }

    /// Index of the path containing `move_id`.
    pub fn path_at(&self, move_id: usize) -> Option<usize> {
        let idx = self.paths.partition_point(|p| p.last_move_id() < move_id);
        self.paths
            .get(idx)
            .filter(|p| p.contains(move_id))
            .map(|_| idx)
    }

    /// Tool position at the end of the footprint of `move_id`.
    pub fn position_at(&self, move_id: usize) -> Option<Vec3> {
        self.positions
            .binary_search_by_key(&move_id, |&(id, _)| id)
            .ok()
            .map(|i| self.positions[i].1)
    }

    /// Whether any geometry was produced, even if CPU copies were released.
    pub fn has_data(&self) -> bool {
        self.chunks.total_vertex_count() > 0
    }

    pub fn release_cpu_data(&mut self) {
        self.chunks.release_cpu_data();
    }

    /// Drop geometry, paths and batches. GPU handles must be released beforehand.
    pub fn reset(&mut self) {
        self.chunks.clear();
        self.paths.clear();
        self.render_paths.clear();
        self.positions.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gcodeview_core::ExtrusionRole;
    use glam::Vec3;

    fn extrusions(count: usize) -> Vec<MoveRecord> {
        (0..count)
            .map(|i| {
                MoveRecord::extrude(i, ExtrusionRole::Perimeter, Vec3::new(i as f32, 0.0, 0.2))
            })
            .collect()
    }

    #[test]
    fn test_construction_checks() {
        assert!(matches!(
            TBuffer::new(MoveType::Extrude, VertexFormat::Position, 1024),
            Err(ViewerError::FormatMismatch { .. })
        ));
        assert!(matches!(
            TBuffer::new(MoveType::Travel, VertexFormat::PositionNormal1, 1),
            Err(ViewerError::InvalidCapacity { min: 2, .. })
        ));
        assert!(TBuffer::new(MoveType::Travel, VertexFormat::PositionNormal1, 70_000).is_err());
        assert!(TBuffer::for_move_type(MoveType::Noop, 1024).is_err());
        assert!(TBuffer::for_move_type(MoveType::Retract, 1).is_ok());
    }

    #[test]
    fn test_single_path_single_chunk() {
        let moves = extrusions(5);
        let mut buffer = TBuffer::for_move_type(MoveType::Extrude, 1024).unwrap();
        for pair in moves.windows(2) {
            buffer.add_segment(&pair[0], &pair[1]);
        }

        assert_eq!(buffer.paths().len(), 1);
        let path = &buffer.paths()[0];
        assert_eq!(path.sub_paths().len(), 1);
        assert_eq!(path.first_move_id(), 0);
        assert_eq!(path.last_move_id(), 4);
        assert_eq!(path.last().index_id, 3 * 42);
        assert_eq!(buffer.chunks().total_vertex_count(), 4 * 8);
        assert_eq!(buffer.chunks().total_index_count(), 4 * 42);
        assert_eq!(buffer.path_at(2), Some(0));
        assert_eq!(buffer.path_at(9), None);
    }

    #[test]
    fn test_chunk_split_chains_sub_paths() {
        let moves = extrusions(6);
        // two footprints per chunk
        let mut buffer = TBuffer::for_move_type(MoveType::Extrude, 16).unwrap();
        for pair in moves.windows(2) {
            buffer.add_segment(&pair[0], &pair[1]);
        }

        assert_eq!(buffer.chunks().chunk_count(), 3);
        let path = &buffer.paths()[0];
        let subs = path.sub_paths();
        assert_eq!(subs.len(), 3);
        for pair in subs.windows(2) {
            assert_eq!(pair[1].first.move_id, pair[0].last.move_id);
            assert_eq!(pair[1].first.chunk_id, pair[0].first.chunk_id + 1);
            assert_eq!(pair[1].first.index_id, 0);
        }
        assert_eq!(subs[0].first.move_id, 0);
        assert_eq!(subs[2].last.move_id, 5);

        // a new chunk restarts with a start cap
        let indices = buffer.chunks().index_chunk(1).unwrap().data();
        assert_eq!(&indices[0..6], &[0, 2, 1, 0, 3, 2]);
    }

    #[test]
    fn test_attribute_change_starts_new_path() {
        let mut moves = extrusions(5);
        moves[3].role = ExtrusionRole::GapFill;
        moves[4].role = ExtrusionRole::GapFill;
        let mut buffer = TBuffer::for_move_type(MoveType::Extrude, 1024).unwrap();
        for pair in moves.windows(2) {
            buffer.add_segment(&pair[0], &pair[1]);
        }
        assert_eq!(buffer.paths().len(), 2);
        assert_eq!(buffer.paths()[1].first_move_id(), 2);
        assert_eq!(buffer.paths()[1].role, ExtrusionRole::GapFill);
        assert_eq!(buffer.path_at(2), Some(0));
        assert_eq!(buffer.path_at(3), Some(1));
    }

    #[test]
    fn test_points_cover_current_move() {
        let moves: Vec<MoveRecord> = (0..4)
            .map(|i| MoveRecord::new(i, MoveType::Retract, Vec3::new(i as f32, 0.0, 0.0)))
            .collect();
        let mut buffer = TBuffer::for_move_type(MoveType::Retract, 2).unwrap();
        for pair in moves.windows(2) {
            buffer.add_segment(&pair[0], &pair[1]);
        }
        let path = &buffer.paths()[0];
        assert_eq!(path.first_move_id(), 1);
        assert_eq!(path.last_move_id(), 3);
        let subs = path.sub_paths();
        assert_eq!(subs.len(), 2);
        assert_eq!((subs[0].first.move_id, subs[0].last.move_id), (1, 2));
        assert_eq!((subs[1].first.move_id, subs[1].last.move_id), (3, 3));
    }

    #[test]
    fn test_positions_survive_cpu_release() {
        let moves = extrusions(6);
        let mut buffer = TBuffer::for_move_type(MoveType::Extrude, 1024).unwrap();
        for pair in moves.windows(2) {
            buffer.add_segment(&pair[0], &pair[1]);
        }
        buffer.release_cpu_data();

        assert_eq!(buffer.position_at(3), Some(Vec3::new(3.0, 0.0, 0.2)));
        assert_eq!(buffer.position_at(5), Some(Vec3::new(5.0, 0.0, 0.2)));
        assert_eq!(buffer.position_at(0), None);

        buffer.reset();
        assert_eq!(buffer.position_at(3), None);
    }
}
