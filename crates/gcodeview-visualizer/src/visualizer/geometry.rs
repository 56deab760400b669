//! Segment geometry expansion.
//!
//! One segment (previous move -> current move) becomes a point, a line or a closed
//! prism of 8 vertices and 14 triangles, depending on its primitive kind.

use glam::{Vec2, Vec3};

/// Input of the expansion functions.
#[derive(Debug, Clone, Copy)]
pub struct SegmentContext {
    pub prev: Vec3,
    pub curr: Vec3,
    pub half_width: f32,
    pub half_height: f32,
    /// Chunk-local index of the first vertex this footprint will occupy.
    pub base: u16,
    /// First vertex of the previous footprint when it belongs to the same sub-path.
    pub joint: Option<u16>,
}

impl SegmentContext {
    pub fn new(prev: Vec3, curr: Vec3, base: u16) -> Self {
        Self {
            prev,
            curr,
            half_width: 0.0,
            half_height: 0.0,
            base,
            joint: None,
        }
    }

    pub fn with_size(mut self, width: f32, height: f32) -> Self {
        self.half_width = 0.5 * width;
        self.half_height = 0.5 * height;
        self
    }

    pub fn with_joint(mut self, joint: Option<u16>) -> Self {
        self.joint = joint;
        self
    }

    /// Unit direction of the segment, +X for zero-length segments.
    pub fn direction(&self) -> Vec3 {
        let dir = (self.curr - self.prev).normalize_or_zero();
        if dir == Vec3::ZERO {
            Vec3::X
        } else {
            dir
        }
    }
}

fn push_vec3(vertices: &mut Vec<f32>, v: Vec3) {
    vertices.extend_from_slice(&[v.x, v.y, v.z]);
}

/// Single vertex at the current position.
pub fn expand_point(ctx: &SegmentContext, vertices: &mut Vec<f32>, indices: &mut Vec<u16>) {
    push_vec3(vertices, ctx.curr);
    indices.push(ctx.base);
}

/// Two vertices, each carrying the x component of the segment's XY normal.
pub fn expand_line(ctx: &SegmentContext, vertices: &mut Vec<f32>, indices: &mut Vec<u16>) {
    let dir = ctx.direction();
    let normal_x = Vec2::new(dir.y, -dir.x).normalize_or_zero().x;

    push_vec3(vertices, ctx.prev);
    vertices.push(normal_x);
    push_vec3(vertices, ctx.curr);
    vertices.push(normal_x);

    indices.extend_from_slice(&[ctx.base, ctx.base + 1]);
}

/// Right and up unit vectors of a segment cross-section.
pub fn cross_section_axes(dir: Vec3) -> (Vec3, Vec3) {
    let right = Vec3::new(dir.y, -dir.x, 0.0).normalize_or_zero();
    let right = if right == Vec3::ZERO { Vec3::X } else { right };
    let up = right.cross(dir).normalize_or_zero();
    let up = if up == Vec3::ZERO { Vec3::Z } else { up };
    (right, up)
}

/// Closed prism around the bead axis.
///
/// Vertices 0..4 are the up, right, down and left corners at the previous position,
/// vertices 4..8 the same corners at the current position. The up corners lie exactly on
/// the move positions; the bead hangs half its height below them.
///
/// Index layout: 6 leading (start cap, or joins to the previous footprint), 24 stem,
/// 6 trailing joins (degenerate without a previous footprint), 6 end cap.
pub fn expand_solid(ctx: &SegmentContext, vertices: &mut Vec<f32>, indices: &mut Vec<u16>) {
    let dir = ctx.direction();
    let (right, up) = cross_section_axes(dir);
    let up_offset = up * ctx.half_height;
    let right_offset = right * ctx.half_width;

    for position in [ctx.prev, ctx.curr] {
        let center = position - up_offset;
        for (corner, normal) in [
            (position, up),
            (center + right_offset, right),
            (center - up_offset, -up),
            (center - right_offset, -right),
        ] {
            push_vec3(vertices, corner);
            push_vec3(vertices, normal);
        }
    }

    let b = ctx.base;
    let v = |i: u16| b + i;

    match ctx.joint {
        Some(j) => indices.extend_from_slice(&[v(0), v(1), j + 5, v(0), j + 7, v(3)]),
        None => indices.extend_from_slice(&[v(0), v(2), v(1), v(0), v(3), v(2)]),
    }

    for k in 0..4u16 {
        let next = (k + 1) % 4;
        indices.extend_from_slice(&[v(k), v(next), v(next + 4), v(k), v(next + 4), v(k + 4)]);
    }

    match ctx.joint {
        Some(j) => indices.extend_from_slice(&[v(2), j + 5, v(1), v(2), v(3), j + 7]),
        None => indices.extend_from_slice(&[v(0); 6]),
    }

    indices.extend_from_slice(&[v(4), v(6), v(7), v(4), v(5), v(6)]);
}
