//! # Toolpath Visualizer
//!
//! Buffer construction ([`builder`], [`tbuffer`], [`chunk`], [`geometry`]), the path
//! index ([`path`]), classification ([`ranges`], [`layers`]) and batching
//! ([`batcher`], [`sequential`]) behind the [`ToolpathViewer`] facade.

pub mod batcher;
pub mod bounds;
pub mod builder;
pub mod chunk;
pub mod export;
pub mod geometry;
pub mod gl_backend;
pub mod gpu;
pub mod layers;
pub mod path;
pub mod primitive;
pub mod ranges;
pub mod sequential;
pub mod tbuffer;
pub mod toolpath_shaders;
pub mod viewer;

pub use batcher::{
    path_color, rebatch, ClassificationContext, IndexRange, RenderBatches, RenderPath,
    RenderRequest,
};
pub use bounds::BoundingBox;
pub use builder::{BuildOutput, ToolpathBuilder};
pub use chunk::{Chunk, ChunkAllocator, IndexChunk};
pub use export::{export_triangles, TriangleSoup};
pub use geometry::SegmentContext;
pub use gl_backend::{GlBackend, GlError};
pub use gpu::{DrawCall, GpuBackend, GpuHandle};
pub use layers::{LayerEndpoints, Layers};
pub use path::{Endpoint, Path, SubPath};
pub use primitive::{PrimitiveKind, PrimitiveTraits, VertexFormat};
pub use ranges::{Range, Ranges};
pub use sequential::{Endpoints, Marker, SequentialChange, SequentialView};
pub use tbuffer::TBuffer;
pub use viewer::{Statistics, ToolpathViewer, WindowRetention, MARKER_VISIBILITY_BIT};
