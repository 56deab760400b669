//! # GCodeView Visualizer
//!
//! Turns decoded toolpath moves into chunked GPU geometry and keeps a cheap
//! color-classification and draw-batching layer on top of it.
//! Filters, color modes and scrubbing re-batch without touching the geometry.

pub mod visualizer;

pub use visualizer::{
    rebatch, BoundingBox, BuildOutput, Chunk, ChunkAllocator, ClassificationContext, DrawCall,
    Endpoint, Endpoints, GlBackend, GpuBackend, GpuHandle, IndexChunk, IndexRange, LayerEndpoints,
    Layers, Marker, Path, PrimitiveKind, PrimitiveTraits, Range, Ranges, RenderBatches,
    RenderPath, RenderRequest, SegmentContext, SequentialChange, SequentialView, Statistics,
    SubPath, TBuffer, ToolpathBuilder, ToolpathViewer, TriangleSoup, VertexFormat,
    WindowRetention,
};
