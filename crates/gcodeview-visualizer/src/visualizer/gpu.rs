//! Seam between the toolpath buffers and a renderer.
//!
//! GPU resources are owned by the backend; buffers only keep the opaque handles it hands
//! out.

use super::batcher::IndexRange;
use super::primitive::{PrimitiveKind, VertexFormat};
use gcodeview_core::{Color, MoveType, ViewerResult};

/// Opaque id of a backend resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GpuHandle(pub u32);

/// One batch to draw: every range shares the chunk pair and the color.
#[derive(Debug, Clone, Copy)]
pub struct DrawCall<'a> {
    pub move_type: MoveType,
    pub kind: PrimitiveKind,
    pub format: VertexFormat,
    pub vertices: GpuHandle,
    pub indices: GpuHandle,
    pub color: Color,
    pub ranges: &'a [IndexRange],
}

/// Resource management and draw submission.
pub trait GpuBackend {
    /// Create a vertex buffer from interleaved `format` vertices.
    fn upload_vertices(&mut self, format: VertexFormat, data: &[f32]) -> ViewerResult<GpuHandle>;

    /// Create an index buffer of 16-bit indices.
    fn upload_indices(&mut self, data: &[u16]) -> ViewerResult<GpuHandle>;

    /// Free a resource created by this backend.
    fn release(&mut self, handle: GpuHandle);

    fn draw(&mut self, call: &DrawCall<'_>) -> ViewerResult<()>;
}
