//! Primitive dispatch table.
//!
//! Every move type maps to one primitive kind. Each kind fixes the vertex format of its
//! buffer, the size of one segment footprint and the function that expands a segment.

use super::geometry::{expand_line, expand_point, expand_solid, SegmentContext};
use gcodeview_core::MoveType;
use serde::Serialize;
use std::fmt;

/// How a segment is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PrimitiveKind {
    Point,
    Line,
    Triangle,
}

/// Layout of one vertex in a chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VertexFormat {
    /// x, y, z
    Position,
    /// x, y, z, normal x
    PositionNormal1,
    /// x, y, z, nx, ny, nz
    PositionNormal3,
}

impl VertexFormat {
    pub const fn floats_per_vertex(self) -> usize {
        match self {
            VertexFormat::Position => 3,
            VertexFormat::PositionNormal1 => 4,
            VertexFormat::PositionNormal3 => 6,
        }
    }

    pub const fn vertex_size_bytes(self) -> usize {
        self.floats_per_vertex() * std::mem::size_of::<f32>()
    }

    /// Float offset of the normal attribute, if any.
    pub const fn normal_offset_floats(self) -> Option<usize> {
        match self {
            VertexFormat::Position => None,
            VertexFormat::PositionNormal1 | VertexFormat::PositionNormal3 => Some(3),
        }
    }

    pub const fn normal_size(self) -> usize {
        match self {
            VertexFormat::Position => 0,
            VertexFormat::PositionNormal1 => 1,
            VertexFormat::PositionNormal3 => 3,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            VertexFormat::Position => "position",
            VertexFormat::PositionNormal1 => "position_normal1",
            VertexFormat::PositionNormal3 => "position_normal3",
        }
    }
}

impl fmt::Display for VertexFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Writes the footprint of one segment: vertices into the first vector, chunk-local
/// indices into the second.
pub type ExpandFn = fn(&SegmentContext, &mut Vec<f32>, &mut Vec<u16>);

/// Per-kind constants and expansion function.
#[derive(Debug, Clone, Copy)]
pub struct PrimitiveTraits {
    pub kind: PrimitiveKind,
    pub format: VertexFormat,
    pub vertices_per_segment: usize,
    pub indices_per_segment: usize,
    /// Offset, within a footprint's indices, of the index addressing the segment start.
    pub start_offset: usize,
    /// Offset, within a footprint's indices, of the index addressing the segment end.
    pub end_offset: usize,
    pub expand: ExpandFn,
}

static POINT: PrimitiveTraits = PrimitiveTraits {
    kind: PrimitiveKind::Point,
    format: VertexFormat::Position,
    vertices_per_segment: 1,
    indices_per_segment: 1,
    start_offset: 0,
    end_offset: 0,
    expand: expand_point,
};

static LINE: PrimitiveTraits = PrimitiveTraits {
    kind: PrimitiveKind::Line,
    format: VertexFormat::PositionNormal1,
    vertices_per_segment: 2,
    indices_per_segment: 2,
    start_offset: 0,
    end_offset: 1,
    expand: expand_line,
};

static TRIANGLE: PrimitiveTraits = PrimitiveTraits {
    kind: PrimitiveKind::Triangle,
    format: VertexFormat::PositionNormal3,
    vertices_per_segment: 8,
    indices_per_segment: 42,
    start_offset: 0,
    end_offset: 36,
    expand: expand_solid,
};

impl PrimitiveKind {
    /// Primitive used to draw a move type, `None` for noops.
    pub fn for_move_type(move_type: MoveType) -> Option<Self> {
        match move_type {
            MoveType::Noop => None,
            MoveType::Travel | MoveType::Wipe => Some(PrimitiveKind::Line),
            MoveType::Extrude => Some(PrimitiveKind::Triangle),
            _ => Some(PrimitiveKind::Point),
        }
    }

    pub fn traits(self) -> &'static PrimitiveTraits {
        match self {
            PrimitiveKind::Point => &POINT,
            PrimitiveKind::Line => &LINE,
            PrimitiveKind::Triangle => &TRIANGLE,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            PrimitiveKind::Point => "point",
            PrimitiveKind::Line => "line",
            PrimitiveKind::Triangle => "triangle",
        }
    }
}

impl PrimitiveTraits {
    /// Whether a footprint's first vertex is the previous move rather than the current one.
    pub fn starts_at_previous_move(&self) -> bool {
        self.kind != PrimitiveKind::Point
    }

    /// Segments covered by the inclusive move id range of a sub-path.
    pub fn segments_between(&self, first_move: usize, last_move: usize) -> usize {
        let span = last_move.saturating_sub(first_move);
        if self.starts_at_previous_move() {
            span
        } else {
            span + 1
        }
    }

    /// Index offset, relative to a sub-path's first footprint, of the footprint drawing `move_id`.
    ///
    /// Returns `None` when no footprint ends at `move_id` (the leading move of a line or
    /// triangle sub-path).
    pub fn footprint_of(&self, first_move: usize, move_id: usize) -> Option<usize> {
        if self.starts_at_previous_move() {
            move_id
                .checked_sub(first_move + 1)
                .map(|n| n * self.indices_per_segment)
        } else {
            move_id
                .checked_sub(first_move)
                .map(|n| n * self.indices_per_segment)
        }
    }
}
