//! Shared numeric constants.

/// Largest number of vertices a single chunk may hold.
///
/// Indices into a chunk are stored as `u16`, so a chunk can address at most 2^16 vertices.
pub const MAX_VERTICES_PER_CHUNK: usize = 65_536;

/// Tolerance used when comparing layer heights.
pub const LAYER_Z_EPSILON: f64 = 1e-4;

/// Tolerance used when checking whether an extrusion path stays on its starting z.
pub const PATH_Z_EPSILON: f32 = f32::EPSILON;

/// Relative tolerance for volumetric rate when extending an extrusion path.
pub const VOLUMETRIC_RATE_TOLERANCE: f32 = 0.05;

/// Decimal places kept for height and width when grouping and classifying moves.
pub const ATTRIBUTE_DECIMALS: i32 = 2;

/// Height offset of the tool marker above the current position, in mm.
pub const MARKER_Z_OFFSET_MM: f32 = 0.5;

/// Default tool marker height, in mm. Used to size the max bounding box.
pub const DEFAULT_MARKER_HEIGHT_MM: f32 = 3.0;

/// Round `value` to the given number of decimals.
pub fn round_to_nearest(value: f32, decimals: i32) -> f32 {
    let scale = 10f32.powi(decimals);
    (value * scale).round() / scale
}
