//! Continuous classifiers for the range view types.

use gcodeview_core::constants::{round_to_nearest, ATTRIBUTE_DECIMALS};
use gcodeview_core::{Color, MoveRecord, MoveType, ViewType};
use serde::Serialize;

/// Min, max and sample count of one metric.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Range {
    pub min: f32,
    pub max: f32,
    pub count: usize,
}

impl Default for Range {
    fn default() -> Self {
        Self {
            min: f32::INFINITY,
            max: f32::NEG_INFINITY,
            count: 0,
        }
    }
}

impl Range {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Add a sample. `count` only grows when the sample differs from both bounds.
    pub fn update_from(&mut self, value: f32) {
        if value != self.max && value != self.min {
            self.count += 1;
        }
        self.min = self.min.min(value);
        self.max = self.max.max(value);
    }

    pub fn is_degenerate(&self) -> bool {
        self.max <= self.min
    }

    /// Value span covered by one palette step.
    pub fn step_size(&self, colors: usize) -> f32 {
        if colors < 2 || self.is_degenerate() {
            0.0
        } else {
            (self.max - self.min) / (colors - 1) as f32
        }
    }

    /// Palette index of `value`, clamped to the palette.
    pub fn color_index_at(&self, value: f32, colors: usize) -> usize {
        let step = self.step_size(colors);
        if step <= 0.0 {
            return 0;
        }
        let index = ((value - self.min) / step).round();
        if index.is_nan() || index <= 0.0 {
            0
        } else {
            (index as usize).min(colors - 1)
        }
    }

    pub fn get_color_at(&self, value: f32, palette: &[Color]) -> Color {
        palette
            .get(self.color_index_at(value, palette.len()))
            .copied()
            .unwrap_or(Color::NEUTRAL)
    }
}

/// Ranges of every continuous view type.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Ranges {
    pub height: Range,
    pub width: Range,
    pub feedrate: Range,
    pub fan_speed: Range,
    pub volumetric_rate: Range,
}

impl Ranges {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Feed one move. Feedrate only counts for travel and extrusion when their buffer is visible.
    pub fn update_from_move(&mut self, m: &MoveRecord, travel_visible: bool, extrude_visible: bool) {
        match m.move_type {
            MoveType::Extrude => {
                self.height
                    .update_from(round_to_nearest(m.height, ATTRIBUTE_DECIMALS));
                self.width
                    .update_from(round_to_nearest(m.width, ATTRIBUTE_DECIMALS));
                self.fan_speed.update_from(m.fan_speed);
                self.volumetric_rate
                    .update_from(round_to_nearest(m.volumetric_rate, ATTRIBUTE_DECIMALS));
                if extrude_visible {
                    self.feedrate.update_from(m.feedrate);
                }
            }
            MoveType::Travel if travel_visible => self.feedrate.update_from(m.feedrate),
            _ => {}
        }
    }

    /// Recompute from scratch. Move 0 only seeds the first segment and is skipped.
    pub fn from_moves(moves: &[MoveRecord], travel_visible: bool, extrude_visible: bool) -> Self {
        let mut ranges = Self::default();
        for m in moves.iter().skip(1) {
            ranges.update_from_move(m, travel_visible, extrude_visible);
        }
        ranges
    }

    pub fn for_view(&self, view: ViewType) -> Option<&Range> {
        match view {
            ViewType::Height => Some(&self.height),
            ViewType::Width => Some(&self.width),
            ViewType::Feedrate => Some(&self.feedrate),
            ViewType::FanSpeed => Some(&self.fan_speed),
            ViewType::VolumetricRate => Some(&self.volumetric_rate),
            ViewType::FeatureType | ViewType::Tool | ViewType::ColorPrint => None,
        }
    }
}
