//! Capacity-bounded vertex and index storage.
//!
//! A buffer owns a list of chunks; only the most recent one accepts appends. Indices
//! are 16 bit and only ever reference vertices of their paired chunk.

use super::gpu::GpuHandle;
use super::primitive::VertexFormat;
use gcodeview_core::constants::MAX_VERTICES_PER_CHUNK;
use glam::Vec3;
use tracing::trace;

/// Vertex storage of one chunk.
#[derive(Debug, Clone)]
pub struct Chunk {
    format: VertexFormat,
    vertices: Vec<f32>,
    vertex_count: usize,
    pub gpu: Option<GpuHandle>,
}

impl Chunk {
    fn new(format: VertexFormat) -> Self {
        Self {
            format,
            vertices: Vec::new(),
            vertex_count: 0,
            gpu: None,
        }
    }

    pub fn format(&self) -> VertexFormat {
        self.format
    }

    /// CPU copy of the vertex data, empty once released.
    pub fn data(&self) -> &[f32] {
        &self.vertices
    }

    pub fn vertex_count(&self) -> usize {
        self.vertex_count
    }

    pub fn size_bytes(&self) -> usize {
        self.vertex_count * self.format.vertex_size_bytes()
    }

    pub fn has_cpu_data(&self) -> bool {
        self.vertices.len() == self.vertex_count * self.format.floats_per_vertex()
    }

    /// Position of a chunk-local vertex, `None` when out of range or released.
    pub fn position(&self, vertex: u16) -> Option<Vec3> {
        let start = usize::from(vertex) * self.format.floats_per_vertex();
        self.vertices
            .get(start..start + 3)
            .map(Vec3::from_slice)
    }
}

/// Index storage paired with the chunk of the same id.
#[derive(Debug, Clone, Default)]
pub struct IndexChunk {
    indices: Vec<u16>,
    index_count: usize,
    pub gpu: Option<GpuHandle>,
}

impl IndexChunk {
    pub fn data(&self) -> &[u16] {
        &self.indices
    }

    pub fn index_count(&self) -> usize {
        self.index_count
    }

    pub fn size_bytes(&self) -> usize {
        self.index_count * std::mem::size_of::<u16>()
    }

    pub fn has_cpu_data(&self) -> bool {
        self.indices.len() == self.index_count
    }
}

/// Append-only chunk list of one buffer.
#[derive(Debug, Clone)]
pub struct ChunkAllocator {
    format: VertexFormat,
    capacity: usize,
    chunks: Vec<Chunk>,
    index_chunks: Vec<IndexChunk>,
}

impl ChunkAllocator {
    /// `capacity` is clamped to the 16-bit index limit.
    pub fn new(format: VertexFormat, capacity: usize) -> Self {
        Self {
            format,
            capacity: capacity.clamp(1, MAX_VERTICES_PER_CHUNK),
            chunks: Vec::new(),
            index_chunks: Vec::new(),
        }
    }

    pub fn format(&self) -> VertexFormat {
        self.format
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Make room for `vertices` in the open chunk, opening a new chunk when needed.
    ///
    /// Returns the id of the chunk the next appends land in.
    pub fn reserve(&mut self, vertices: usize) -> usize {
        let fits = self
            .chunks
            .last()
            .is_some_and(|c| c.vertex_count + vertices <= self.capacity);
        if !fits {
            self.open_chunk();
        }
        self.chunks.len() - 1
    }

    fn open_chunk(&mut self) {
        trace!(
            "Opening {} chunk #{} (capacity {} vertices)",
            self.format,
            self.chunks.len(),
            self.capacity
        );
        self.chunks.push(Chunk::new(self.format));
        self.index_chunks.push(IndexChunk::default());
    }

    /// Append one vertex and return `(chunk_id, index_within_chunk)`.
    pub fn append_vertex(&mut self, attributes: &[f32]) -> (usize, u16) {
        debug_assert_eq!(
            attributes.len(),
            self.format.floats_per_vertex(),
            "vertex width does not match {}",
            self.format
        );
        let id = self.reserve(1);
        let chunk = &mut self.chunks[id];
        chunk.vertices.extend_from_slice(attributes);
        chunk.vertex_count += 1;
        (id, (chunk.vertex_count - 1) as u16)
    }

    /// Append indices to the open chunk. They must reference vertices of that chunk.
    pub fn append_indices(&mut self, indices: &[u16]) {
        if self.index_chunks.is_empty() {
            self.open_chunk();
        }
        let open = self.chunks.len() - 1;
        debug_assert!(indices
            .iter()
            .all(|&i| usize::from(i) < self.chunks[open].vertex_count));
        let chunk = &mut self.index_chunks[open];
        chunk.indices.extend_from_slice(indices);
        chunk.index_count += indices.len();
    }

    pub fn open_chunk_id(&self) -> Option<usize> {
        self.chunks.len().checked_sub(1)
    }

    pub fn open_vertex_count(&self) -> usize {
        self.chunks.last().map_or(0, |c| c.vertex_count)
    }

    pub fn open_index_count(&self) -> usize {
        self.index_chunks.last().map_or(0, |c| c.index_count)
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn index_chunks(&self) -> &[IndexChunk] {
        &self.index_chunks
    }

    pub fn chunk(&self, id: usize) -> Option<&Chunk> {
        self.chunks.get(id)
    }

    pub fn index_chunk(&self, id: usize) -> Option<&IndexChunk> {
        self.index_chunks.get(id)
    }

    /// Chunk pairs for GPU handle assignment.
    pub fn pairs_mut(&mut self) -> impl Iterator<Item = (&mut Chunk, &mut IndexChunk)> {
        self.chunks.iter_mut().zip(self.index_chunks.iter_mut())
    }

    pub fn index_at(&self, chunk_id: usize, offset: usize) -> Option<u16> {
        self.index_chunks
            .get(chunk_id)
            .and_then(|c| c.indices.get(offset))
            .copied()
    }

    pub fn vertex_position(&self, chunk_id: usize, vertex: u16) -> Option<Vec3> {
        self.chunks.get(chunk_id).and_then(|c| c.position(vertex))
    }

    pub fn total_vertex_count(&self) -> usize {
        self.chunks.iter().map(|c| c.vertex_count).sum()
    }

    pub fn total_index_count(&self) -> usize {
        self.index_chunks.iter().map(|c| c.index_count).sum()
    }

    pub fn vertices_size_bytes(&self) -> usize {
        self.chunks.iter().map(Chunk::size_bytes).sum()
    }

    pub fn indices_size_bytes(&self) -> usize {
        self.index_chunks.iter().map(IndexChunk::size_bytes).sum()
    }

    pub fn has_cpu_data(&self) -> bool {
        self.chunks.iter().all(Chunk::has_cpu_data)
            && self.index_chunks.iter().all(IndexChunk::has_cpu_data)
    }

    /// Drop CPU copies, keeping counts and GPU handles.
    pub fn release_cpu_data(&mut self) {
        for (chunk, index_chunk) in self.pairs_mut() {
            chunk.vertices = Vec::new();
            index_chunk.indices = Vec::new();
        }
    }

    /// Remove every chunk. GPU handles must be released beforehand.
    pub fn clear(&mut self) {
        self.chunks.clear();
        self.index_chunks.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserve_opens_chunk_when_full() {
        let mut alloc = ChunkAllocator::new(VertexFormat::Position, 4);
        assert_eq!(alloc.open_chunk_id(), None);

        assert_eq!(alloc.reserve(3), 0);
        for i in 0..3 {
            assert_eq!(alloc.append_vertex(&[i as f32, 0.0, 0.0]), (0, i as u16));
        }
        alloc.append_indices(&[0, 1, 2]);

        // two more do not fit next to three
        assert_eq!(alloc.reserve(2), 1);
        assert_eq!(alloc.append_vertex(&[9.0, 9.0, 9.0]), (1, 0));
        assert_eq!(alloc.chunk_count(), 2);
        assert_eq!(alloc.open_vertex_count(), 1);
        assert_eq!(alloc.open_index_count(), 0);
        assert_eq!(alloc.total_vertex_count(), 4);
    }

    #[test]
    fn test_append_vertex_rolls_over_at_capacity() {
        let mut alloc = ChunkAllocator::new(VertexFormat::Position, 2);
        alloc.append_vertex(&[0.0; 3]);
        alloc.append_vertex(&[0.0; 3]);
        assert_eq!(alloc.append_vertex(&[0.0; 3]), (1, 0));
    }

    #[test]
    fn test_capacity_is_clamped() {
        let alloc = ChunkAllocator::new(VertexFormat::Position, 1_000_000);
        assert_eq!(alloc.capacity(), MAX_VERTICES_PER_CHUNK);
    }

    #[test]
    fn test_lookup_and_sizes() {
        let mut alloc = ChunkAllocator::new(VertexFormat::PositionNormal1, 16);
        alloc.reserve(2);
        alloc.append_vertex(&[1.0, 2.0, 3.0, 0.5]);
        alloc.append_vertex(&[4.0, 5.0, 6.0, 0.5]);
        alloc.append_indices(&[0, 1]);

        assert_eq!(alloc.index_at(0, 1), Some(1));
        assert_eq!(alloc.index_at(0, 2), None);
        assert_eq!(alloc.vertex_position(0, 1), Some(Vec3::new(4.0, 5.0, 6.0)));
        assert_eq!(alloc.vertices_size_bytes(), 2 * 16);
        assert_eq!(alloc.indices_size_bytes(), 4);
        assert!(alloc.has_cpu_data());

        alloc.release_cpu_data();
        assert!(!alloc.has_cpu_data());
        assert_eq!(alloc.total_vertex_count(), 2);
        assert_eq!(alloc.total_index_count(), 2);
        assert_eq!(alloc.vertex_position(0, 1), None);
        assert_eq!(alloc.index_at(0, 0), None);
    }
}
