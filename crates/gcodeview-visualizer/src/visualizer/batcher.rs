//! Render batching.
//!
//! Batches are derived from the path index and the current classification only; the
//! chunk contents are never touched. [`rebatch`] is a pure function of its inputs, so
//! the caller decides when filters or colors have changed enough to call it again.

use super::layers::{LayerEndpoints, Layers};
use super::path::Path;
use super::ranges::Ranges;
use super::sequential::Endpoints;
use super::tbuffer::TBuffer;
use gcodeview_core::{Color, MoveType, ViewType};
use gcodeview_settings::Palette;
use glam::Vec3;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::trace;

/// Tolerance used to decide that two travel paths touch.
const TRAVEL_ADJACENCY_EPSILON: f32 = 1e-4;

/// A run of indices inside one index chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct IndexRange {
    /// In indices.
    pub offset: usize,
    /// In indices.
    pub count: usize,
}

impl IndexRange {
    pub fn offset_bytes(&self) -> usize {
        self.offset * std::mem::size_of::<u16>()
    }
}

/// Every visible range of one buffer sharing a color and an index chunk.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderPath {
    pub color: Color,
    pub index_chunk_id: usize,
    /// First path contributing to this batch.
    pub path_id: usize,
    /// Ordered by ascending move id.
    pub ranges: Vec<IndexRange>,
}

impl RenderPath {
    pub fn index_count(&self) -> usize {
        self.ranges.iter().map(|r| r.count).sum()
    }
}

/// Filters and color mode of one re-batch.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderRequest {
    pub view_type: ViewType,
    /// Indexed by [`MoveType::buffer_id`].
    pub visible_buffers: [bool; MoveType::BUFFERS_COUNT],
    pub role_visibility_flags: u32,
    /// Inclusive layer index range. Ignored when no layers were detected.
    pub layers_z_range: [usize; 2],
    /// Playback window before the re-batch.
    pub current: Endpoints,
    /// Keep `current.first` (clamped) instead of resetting it to the first visible move.
    pub keep_first: bool,
    /// Keep `current.last` (clamped) instead of resetting it to the last visible move.
    pub keep_last: bool,
}

impl Default for RenderRequest {
    fn default() -> Self {
        Self {
            view_type: ViewType::FeatureType,
            visible_buffers: [true; MoveType::BUFFERS_COUNT],
            role_visibility_flags: gcodeview_core::ExtrusionRole::all_visible_flags(),
            layers_z_range: [0, usize::MAX],
            current: Endpoints::default(),
            keep_first: false,
            keep_last: false,
        }
    }
}

impl RenderRequest {
    pub fn is_visible(&self, move_type: MoveType) -> bool {
        move_type
            .buffer_id()
            .and_then(|id| self.visible_buffers.get(id))
            .copied()
            .unwrap_or(false)
    }
}

/// Color tables the classifiers read from.
#[derive(Debug, Clone, Copy)]
pub struct ClassificationContext<'a> {
    pub palette: &'a Palette,
    pub ranges: &'a Ranges,
    pub tool_colors: &'a [Color],
}

/// Output of a re-batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderBatches {
    /// One batch list per buffer, indexed by buffer id.
    pub render_paths: Vec<Vec<RenderPath>>,
    /// Span of every visible move, `None` when nothing is visible.
    pub endpoints: Option<Endpoints>,
    /// Playback window after clamping.
    pub current: Endpoints,
    /// Tool position at the end of the window.
    pub current_position: Option<Vec3>,
}

impl RenderBatches {
    pub fn for_move_type(&self, move_type: MoveType) -> &[RenderPath] {
        move_type
            .buffer_id()
            .and_then(|id| self.render_paths.get(id))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn render_path_count(&self) -> usize {
        self.render_paths.iter().map(Vec::len).sum()
    }
}

/// Color of a path under `view_type`.
pub fn path_color(path: &Path, view_type: ViewType, ctx: &ClassificationContext<'_>) -> Color {
    let palette = ctx.palette;
    match path.move_type {
        MoveType::Extrude => extrusion_color(path, view_type, ctx),
        MoveType::Travel => match view_type {
            ViewType::Feedrate | ViewType::Tool | ViewType::ColorPrint => {
                extrusion_color(path, view_type, ctx)
            }
            _ => palette.travel_color(path.delta_extruder),
        },
        MoveType::Wipe => palette.wipe,
        MoveType::Noop => palette.neutral,
        option => palette.option_color(option).unwrap_or(palette.neutral),
    }
}

fn extrusion_color(path: &Path, view_type: ViewType, ctx: &ClassificationContext<'_>) -> Color {
    let palette = ctx.palette;
    let ranged = |value: f32| {
        ctx.ranges
            .for_view(view_type)
            .map_or(palette.neutral, |range| range.get_color_at(value, &palette.range))
    };
    let indexed = |id: u8| {
        ctx.tool_colors
            .get(usize::from(id))
            .copied()
            .unwrap_or(palette.neutral)
    };
    match view_type {
        ViewType::FeatureType => palette.role_color(path.role),
        ViewType::Height => ranged(path.height),
        ViewType::Width => ranged(path.width),
        ViewType::Feedrate => ranged(path.feedrate),
        ViewType::FanSpeed => ranged(path.fan_speed),
        ViewType::VolumetricRate => ranged(path.volumetric_rate),
        ViewType::Tool => indexed(path.extruder_id),
        ViewType::ColorPrint => indexed(path.cp_color_id),
    }
}

fn span_contains(span: &LayerEndpoints, move_id: usize) -> bool {
    span.first <= move_id && move_id <= span.last
}

/// Travel test: a travel path is widened through touching neighbours before checking
/// whether either end falls inside the layer span.
fn travel_in_span(paths: &[Path], path_id: usize, span: &LayerEndpoints) -> bool {
    let touches = |a: Vec3, b: Vec3| a.abs_diff_eq(b, TRAVEL_ADJACENCY_EPSILON);

    let mut first = path_id;
    while first > 0 && touches(paths[first].first().position, paths[first - 1].last().position) {
        first -= 1;
    }
    let mut last = path_id;
    while last + 1 < paths.len()
        && touches(paths[last].last().position, paths[last + 1].first().position)
    {
        last += 1;
    }

    span_contains(span, paths[first].first_move_id())
        || span_contains(span, paths[last].last_move_id())
}

/// Derive the draw batches of every buffer.
///
/// Pass 1 selects the visible paths and the span of visible moves, which resets or
/// clamps the playback window. Pass 2 clips every selected sub-path to the window and
/// groups the surviving index ranges by `(color, chunk)`.
pub fn rebatch(
    buffers: &[TBuffer],
    layers: &Layers,
    ctx: &ClassificationContext<'_>,
    request: &RenderRequest,
) -> RenderBatches {
    let span = layers.move_span(request.layers_z_range);

    let mut selected: Vec<(usize, usize)> = Vec::new();
    let mut endpoints: Option<Endpoints> = None;

    for (buffer_id, buffer) in buffers.iter().enumerate() {
        if !request.is_visible(buffer.move_type()) {
            continue;
        }
        let paths = buffer.paths();
        for (path_id, path) in paths.iter().enumerate() {
            if let Some(span) = &span {
                let inside = if path.move_type == MoveType::Travel {
                    travel_in_span(paths, path_id, span)
                } else {
                    span_contains(span, path.first_move_id())
                        && span_contains(span, path.last_move_id())
                };
                if !inside {
                    continue;
                }
            }
            if path.move_type == MoveType::Extrude
                && !path.role.is_visible_in(request.role_visibility_flags)
            {
                continue;
            }

            selected.push((buffer_id, path_id));
            endpoints = Some(match endpoints {
                Some(e) => Endpoints::new(
                    e.first.min(path.first_move_id()),
                    e.last.max(path.last_move_id()),
                ),
                None => Endpoints::new(path.first_move_id(), path.last_move_id()),
            });
        }
    }

    let current = match endpoints {
        Some(span) => {
            let last = if request.keep_last {
                request.current.last.clamp(span.first, span.last)
            } else {
                span.last
            };
            let first = if request.keep_first {
                request.current.first.clamp(span.first, span.last)
            } else {
                span.first
            };
            Endpoints::new(first.min(last), last)
        }
        None => request.current,
    };

    let mut grouped: Vec<BTreeMap<(Color, usize), RenderPath>> =
        buffers.iter().map(|_| BTreeMap::new()).collect();

    for &(buffer_id, path_id) in &selected {
        let buffer = &buffers[buffer_id];
        let traits = buffer.traits();
        let path = &buffer.paths()[path_id];
        let color = path_color(path, request.view_type, ctx);

        for sub_path in path.sub_paths() {
            let lo = sub_path.first.move_id.max(current.first);
            let hi = sub_path.last.move_id.min(current.last);
            if lo > hi {
                continue;
            }
            let segments = if traits.starts_at_previous_move() {
                hi - lo
            } else {
                hi - lo + 1
            };
            if segments == 0 {
                continue;
            }
            let skip = lo - sub_path.first.move_id;
            let range = IndexRange {
                offset: sub_path.first.index_id + skip * traits.indices_per_segment,
                count: segments * traits.indices_per_segment,
            };
            let chunk_id = sub_path.chunk_id();
            grouped[buffer_id]
                .entry((color, chunk_id))
                .or_insert_with(|| RenderPath {
                    color,
                    index_chunk_id: chunk_id,
                    path_id,
                    ranges: Vec::new(),
                })
                .ranges
                .push(range);
        }
    }

    let render_paths: Vec<Vec<RenderPath>> = grouped
        .into_iter()
        .map(|batches| batches.into_values().collect())
        .collect();

    let current_position = endpoints.and_then(|_| {
        position_of(buffers, &selected, current.last)
            .or_else(|| position_of(buffers, &selected, current.first))
    });

    trace!(
        "Rebatched {} paths into {} render paths, window {}..={}",
        selected.len(),
        render_paths.iter().map(Vec::len).sum::<usize>(),
        current.first,
        current.last
    );

    RenderBatches {
        render_paths,
        endpoints,
        current,
        current_position,
    }
}

/// Tool position at `move_id`: the trailing vertex of the footprint ending there, read
/// back from the chunk, or the position kept per footprint when CPU data is gone.
fn position_of(buffers: &[TBuffer], selected: &[(usize, usize)], move_id: usize) -> Option<Vec3> {
    let mut fallback = None;
    for &(buffer_id, path_id) in selected {
        let buffer = &buffers[buffer_id];
        let path = &buffer.paths()[path_id];
        if !path.contains(move_id) {
            continue;
        }
        let traits = buffer.traits();
        for sub_path in path.sub_paths().iter().filter(|s| s.contains(move_id)) {
            let endpoint_position = if move_id == sub_path.last.move_id {
                Some(sub_path.last.position)
            } else if move_id == sub_path.first.move_id {
                Some(sub_path.first.position)
            } else {
                None
            };

            match traits.footprint_of(sub_path.first.move_id, move_id) {
                Some(relative) => {
                    let chunks = buffer.chunks();
                    let chunk_id = sub_path.chunk_id();
                    let from_chunk = chunks
                        .index_at(chunk_id, sub_path.first.index_id + relative + traits.end_offset)
                        .and_then(|vertex| chunks.vertex_position(chunk_id, vertex));
                    let kept = || buffer.position_at(move_id);
                    if let Some(position) = from_chunk.or_else(kept).or(endpoint_position) {
                        return Some(position);
                    }
                }
                None => {
                    fallback = fallback.or(endpoint_position);
                }
            }
        }
    }
    fallback
}

#[cfg(test)]
mod tests {
    use super::*;
    use gcodeview_core::{ExtrusionRole, MoveRecord};

    fn extrude_buffer(moves: &[MoveRecord]) -> Vec<TBuffer> {
        let mut buffers: Vec<TBuffer> = MoveType::BUFFER_TYPES
            .iter()
            .map(|&t| TBuffer::for_move_type(t, 65_536).unwrap())
            .collect();
        for pair in moves.windows(2) {
            if let Some(id) = pair[1].move_type.buffer_id() {
                buffers[id].add_segment(&pair[0], &pair[1]);
            }
        }
        buffers
    }

    fn line(count: usize) -> Vec<MoveRecord> {
        (0..count)
            .map(|i| {
                MoveRecord::extrude(i, ExtrusionRole::Perimeter, Vec3::new(i as f32, 0.0, 0.2))
            })
            .collect()
    }

    #[test]
    fn test_window_clips_ranges() {
        let moves = line(11);
        let buffers = extrude_buffer(&moves);
        let palette = Palette::default();
        let ranges = Ranges::default();
        let ctx = ClassificationContext {
            palette: &palette,
            ranges: &ranges,
            tool_colors: &[],
        };

        let full = rebatch(&buffers, &Layers::default(), &ctx, &RenderRequest::default());
        assert_eq!(full.endpoints, Some(Endpoints::new(0, 10)));
        let extrude = full.for_move_type(MoveType::Extrude);
        assert_eq!(extrude.len(), 1);
        assert_eq!(extrude[0].ranges, vec![IndexRange { offset: 0, count: 420 }]);
        assert_eq!(full.current_position, Some(Vec3::new(10.0, 0.0, 0.2)));

        let request = RenderRequest {
            current: Endpoints::new(3, 7),
            keep_first: true,
            keep_last: true,
            ..Default::default()
        };
        let clipped = rebatch(&buffers, &Layers::default(), &ctx, &request);
        let extrude = clipped.for_move_type(MoveType::Extrude);
        assert_eq!(
            extrude[0].ranges,
            vec![IndexRange {
                offset: 3 * 42,
                count: 4 * 42
            }]
        );
        assert_eq!(clipped.current_position, Some(Vec3::new(7.0, 0.0, 0.2)));
    }

    #[test]
    fn test_ranged_color_uses_palette_ends() {
        let mut moves = line(3);
        moves[2].feedrate = 80.0;
        let buffers = extrude_buffer(&moves);
        let palette = Palette::default();
        let ranges = Ranges::from_moves(&moves, false, true);
        let ctx = ClassificationContext {
            palette: &palette,
            ranges: &ranges,
            tool_colors: &[],
        };
        let request = RenderRequest {
            view_type: ViewType::Feedrate,
            ..Default::default()
        };
        let batches = rebatch(&buffers, &Layers::default(), &ctx, &request);
        let colors: Vec<Color> = batches
            .for_move_type(MoveType::Extrude)
            .iter()
            .map(|rp| rp.color)
            .collect();
        assert_eq!(colors.len(), 2);
        assert!(colors.contains(&palette.range[0]));
        assert!(colors.contains(&palette.range[10]));
    }

    #[test]
    fn test_out_of_range_tool_is_neutral() {
        let moves: Vec<MoveRecord> = line(3).into_iter().map(|m| m.with_extruder(4)).collect();
        let buffers = extrude_buffer(&moves);
        let palette = Palette::default();
        let ranges = Ranges::default();
        let tools = [Color::new(1.0, 0.0, 0.0)];
        let ctx = ClassificationContext {
            palette: &palette,
            ranges: &ranges,
            tool_colors: &tools,
        };
        let path = &buffers[MoveType::Extrude.buffer_id().unwrap()].paths()[0];
        assert_eq!(path_color(path, ViewType::Tool, &ctx), Color::NEUTRAL);
        assert_eq!(path_color(path, ViewType::ColorPrint, &ctx), tools[0]);
    }

    #[test]
    fn test_nothing_visible() {
        let buffers = extrude_buffer(&line(4));
        let palette = Palette::default();
        let ranges = Ranges::default();
        let ctx = ClassificationContext {
            palette: &palette,
            ranges: &ranges,
            tool_colors: &[],
        };
        let request = RenderRequest {
            role_visibility_flags: 0,
            current: Endpoints::new(1, 2),
            ..Default::default()
        };
        let batches = rebatch(&buffers, &Layers::default(), &ctx, &request);
        assert_eq!(batches.endpoints, None);
        assert_eq!(batches.render_path_count(), 0);
        assert_eq!(batches.current, Endpoints::new(1, 2));
        assert_eq!(batches.current_position, None);
    }
}
