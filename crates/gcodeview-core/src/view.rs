//! Color-by modes of the toolpath view.

use serde::{Deserialize, Serialize};
use std::fmt;

/// What drives the color of extrusion and travel paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewType {
    #[default]
    FeatureType,
    Height,
    Width,
    Feedrate,
    FanSpeed,
    VolumetricRate,
    Tool,
    ColorPrint,
}

impl ViewType {
    pub const ALL: [ViewType; 8] = [
        ViewType::FeatureType,
        ViewType::Height,
        ViewType::Width,
        ViewType::Feedrate,
        ViewType::FanSpeed,
        ViewType::VolumetricRate,
        ViewType::Tool,
        ViewType::ColorPrint,
    ];

    /// True for modes that color by a continuous metric.
    pub fn is_range(&self) -> bool {
        matches!(
            self,
            ViewType::Height
                | ViewType::Width
                | ViewType::Feedrate
                | ViewType::FanSpeed
                | ViewType::VolumetricRate
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            ViewType::FeatureType => "feature_type",
            ViewType::Height => "height",
            ViewType::Width => "width",
            ViewType::Feedrate => "feedrate",
            ViewType::FanSpeed => "fan_speed",
            ViewType::VolumetricRate => "volumetric_rate",
            ViewType::Tool => "tool",
            ViewType::ColorPrint => "color_print",
        }
    }

    /// Parse a mode name as produced by [`ViewType::name`].
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|v| v.name() == name)
    }
}

impl fmt::Display for ViewType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
