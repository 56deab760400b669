//! Playback window and tool marker.

use super::batcher::RenderBatches;
use gcodeview_core::constants::MARKER_Z_OFFSET_MM;
use glam::{Mat4, Vec3};
use serde::Serialize;

/// Inclusive move id window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Endpoints {
    pub first: usize,
    pub last: usize,
}

impl Endpoints {
    pub fn new(first: usize, last: usize) -> Self {
        Self { first, last }
    }

    pub fn contains(&self, move_id: usize) -> bool {
        self.first <= move_id && move_id <= self.last
    }
}

/// Tool marker drawn at the current playback position.
#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    world_position: Vec3,
    pub z_offset: f32,
    pub color: [f32; 4],
    pub visible: bool,
}

impl Default for Marker {
    fn default() -> Self {
        Self {
            world_position: Vec3::ZERO,
            z_offset: MARKER_Z_OFFSET_MM,
            color: [1.0, 1.0, 1.0, 0.5],
            visible: true,
        }
    }
}

impl Marker {
    pub fn world_position(&self) -> Vec3 {
        self.world_position
    }

    pub fn set_world_position(&mut self, position: Vec3) {
        self.world_position = position;
    }

    /// Model transform placing the marker tip above the current position.
    pub fn world_transform(&self) -> Mat4 {
        Mat4::from_translation(self.world_position + Vec3::Z * self.z_offset)
    }
}

/// Which bounds of the window changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequentialChange {
    pub first_moved: bool,
    pub last_moved: bool,
}

/// Playback state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SequentialView {
    pub skip_invisible_moves: bool,
    /// Span of every visible move.
    pub endpoints: Endpoints,
    /// Window being drawn.
    pub current: Endpoints,
    /// Window before the last change.
    pub last_current: Endpoints,
    pub current_position: Option<Vec3>,
    pub marker: Marker,
}

impl SequentialView {
    /// Move the window to `first..=last`, clamped into `endpoints`.
    ///
    /// With `skip_invisible_moves` the bounds walk toward each other until they land on
    /// moves accepted by `is_visible`. Returns `None` when the window did not change.
    pub fn update_current(
        &mut self,
        first: usize,
        last: usize,
        is_visible: impl Fn(usize) -> bool,
    ) -> Option<SequentialChange> {
        if self.endpoints.first > self.endpoints.last {
            return None;
        }
        let mut last = last.clamp(self.endpoints.first, self.endpoints.last);
        let mut first = first.clamp(self.endpoints.first, self.endpoints.last).min(last);

        if self.skip_invisible_moves {
            while first < last && !is_visible(first) {
                first += 1;
            }
            while last > first && !is_visible(last) {
                last -= 1;
            }
        }

        let window = Endpoints::new(first, last);
        if window == self.current {
            return None;
        }

        let change = SequentialChange {
            first_moved: window.first != self.current.first,
            last_moved: window.last != self.current.last,
        };
        self.last_current = self.current;
        self.current = window;
        Some(change)
    }

    /// Take the window and marker position computed by a re-batch.
    pub fn apply(&mut self, batches: &RenderBatches) {
        self.endpoints = batches.endpoints.unwrap_or_default();
        self.current = batches.current;
        self.current_position = batches.current_position;
        if let Some(position) = batches.current_position {
            self.marker.set_world_position(position);
        }
    }

    pub fn reset(&mut self) {
        let skip = self.skip_invisible_moves;
        let marker = Marker {
            world_position: Vec3::ZERO,
            ..self.marker.clone()
        };
        *self = Self {
            skip_invisible_moves: skip,
            marker,
            ..Self::default()
        };
    }
}
