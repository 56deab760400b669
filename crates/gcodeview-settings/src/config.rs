//! Configuration and settings management for GCodeView
//!
//! Provides settings file handling and validation.
//! Supports JSON and TOML file formats stored in platform-specific directories.
//!
//! Settings are organized into logical sections:
//! - Palette (feature, option, travel and range colors)
//! - Buffer limits (chunk capacity, CPU data retention)
//! - Display defaults (color mode, visible move types and roles, marker)

use gcodeview_core::constants::{DEFAULT_MARKER_HEIGHT_MM, MAX_VERTICES_PER_CHUNK};
use gcodeview_core::{Color, ExtrusionRole, MoveType, SettingsError, ViewType};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Result type for settings operations
pub type SettingsResult<T> = std::result::Result<T, SettingsError>;

/// Minimum vertices a chunk must hold: one solid extrusion footprint.
const MIN_VERTICES_PER_CHUNK: usize = 8;

/// Colors used by the discrete and continuous classifiers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Palette {
    /// One color per extrusion role, indexed by role.
    pub extrusion_roles: [Color; ExtrusionRole::COUNT],
    /// Retract, unretract, tool change, color change, pause print, custom G-code.
    pub options: [Color; 6],
    /// Travel colors: plain move, extruding move, retracting move.
    pub travel: [Color; 3],
    pub wipe: Color,
    /// Gradient used by the range view types, low to high.
    pub range: Vec<Color>,
    /// Used for ids missing from a table.
    pub neutral: Color,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            extrusion_roles: [
                Color::new(0.75, 0.75, 0.75),
                Color::new(1.00, 0.90, 0.30),
                Color::new(1.00, 0.49, 0.22),
                Color::new(0.12, 0.12, 1.00),
                Color::new(0.69, 0.19, 0.16),
                Color::new(0.59, 0.33, 0.80),
                Color::new(0.94, 0.25, 0.25),
                Color::new(1.00, 0.55, 0.41),
                Color::new(0.30, 0.50, 0.73),
                Color::new(1.00, 1.00, 1.00),
                Color::new(0.00, 0.53, 0.43),
                Color::new(0.00, 1.00, 0.00),
                Color::new(0.00, 0.50, 0.00),
                Color::new(0.70, 0.89, 0.67),
                Color::new(0.37, 0.82, 0.58),
            ],
            options: [
                Color::new(0.803, 0.135, 0.839),
                Color::new(0.287, 0.679, 0.810),
                Color::new(0.758, 0.744, 0.389),
                Color::new(0.856, 0.582, 0.546),
                Color::new(0.322, 0.942, 0.512),
                Color::new(0.886, 0.825, 0.262),
            ],
            travel: [
                Color::new(0.219, 0.282, 0.609),
                Color::new(0.112, 0.422, 0.103),
                Color::new(0.505, 0.064, 0.028),
            ],
            wipe: Color::new(1.0, 1.0, 0.0),
            range: vec![
                Color::new(0.043, 0.173, 0.478),
                Color::new(0.075, 0.349, 0.522),
                Color::new(0.110, 0.533, 0.569),
                Color::new(0.016, 0.839, 0.059),
                Color::new(0.667, 0.949, 0.000),
                Color::new(0.988, 0.975, 0.012),
                Color::new(0.961, 0.808, 0.039),
                Color::new(0.890, 0.533, 0.125),
                Color::new(0.820, 0.408, 0.188),
                Color::new(0.761, 0.322, 0.235),
                Color::new(0.581, 0.149, 0.087),
            ],
            neutral: Color::NEUTRAL,
        }
    }
}

impl Palette {
    pub fn role_color(&self, role: ExtrusionRole) -> Color {
        self.extrusion_roles[role.index()]
    }

    /// Color of an option move type, `None` for non-option types.
    pub fn option_color(&self, move_type: MoveType) -> Option<Color> {
        if !move_type.is_option() {
            return None;
        }
        move_type
            .buffer_id()
            .and_then(|id| self.options.get(id))
            .copied()
    }

    /// Travel color by the sign of the extruder delta.
    pub fn travel_color(&self, delta_extruder: f32) -> Color {
        if delta_extruder > 0.0 {
            self.travel[1]
        } else if delta_extruder < 0.0 {
            self.travel[2]
        } else {
            self.travel[0]
        }
    }

    fn colors(&self) -> impl Iterator<Item = &Color> {
        self.extrusion_roles
            .iter()
            .chain(self.options.iter())
            .chain(self.travel.iter())
            .chain(self.range.iter())
            .chain([&self.wipe, &self.neutral])
    }
}

/// Toolpath buffer limits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BufferSettings {
    /// Vertices per chunk, between one footprint and 65 536.
    pub max_vertices_per_chunk: usize,
    /// Drop CPU copies of vertex and index data once uploaded.
    pub release_cpu_data: bool,
}

impl Default for BufferSettings {
    fn default() -> Self {
        Self {
            max_vertices_per_chunk: MAX_VERTICES_PER_CHUNK,
            release_cpu_data: false,
        }
    }
}

/// Initial display state of the viewer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplaySettings {
    pub view_type: ViewType,
    pub visible_move_types: Vec<MoveType>,
    /// Bit mask, bit `role as u32` set when the role is visible.
    pub role_visibility_flags: u32,
    /// Scrub only across moves that are currently drawn.
    pub skip_invisible_moves: bool,
    /// Grow the paths bounding box with every move, not only extrusions.
    pub include_all_moves_in_bounds: bool,
    /// mm
    pub marker_height: f32,
    pub marker_color: [f32; 4],
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            view_type: ViewType::FeatureType,
            visible_move_types: vec![MoveType::Extrude],
            role_visibility_flags: ExtrusionRole::all_visible_flags(),
            skip_invisible_moves: false,
            include_all_moves_in_bounds: false,
            marker_height: DEFAULT_MARKER_HEIGHT_MM,
            marker_color: [1.0, 1.0, 1.0, 0.5],
        }
    }
}

impl DisplaySettings {
    pub fn is_move_type_visible(&self, move_type: MoveType) -> bool {
        self.visible_move_types.contains(&move_type)
    }
}

/// Complete viewer settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerSettings {
    pub palette: Palette,
    pub buffers: BufferSettings,
    pub display: DisplaySettings,
}

impl ViewerSettings {
    /// Create new settings with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Load settings from file (JSON or TOML)
    pub fn load_from_file(path: &Path) -> SettingsResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.display().to_string(),
            source,
        })?;

        let settings: Self = match Format::of(path)? {
            Format::Json => serde_json::from_str(&content).map_err(|e| SettingsError::Parse {
                reason: format!("invalid JSON: {}", e),
            })?,
            Format::Toml => toml::from_str(&content).map_err(|e| SettingsError::Parse {
                reason: format!("invalid TOML: {}", e),
            })?,
        };

        settings.validate()?;
        Ok(settings)
    }

    /// Save settings to file (JSON or TOML)
    pub fn save_to_file(&self, path: &Path) -> SettingsResult<()> {
        self.validate()?;

        let content = match Format::of(path)? {
            Format::Json => {
                serde_json::to_string_pretty(self).map_err(|e| SettingsError::Serialize {
                    reason: e.to_string(),
                })?
            }
            Format::Toml => toml::to_string_pretty(self).map_err(|e| SettingsError::Serialize {
                reason: e.to_string(),
            })?,
        };

        std::fs::write(path, content).map_err(|source| SettingsError::Write {
            path: path.display().to_string(),
            source,
        })
    }

    /// Validate settings
    pub fn validate(&self) -> SettingsResult<()> {
        let chunk = self.buffers.max_vertices_per_chunk;
        if !(MIN_VERTICES_PER_CHUNK..=MAX_VERTICES_PER_CHUNK).contains(&chunk) {
            return Err(invalid(
                "buffers.max_vertices_per_chunk",
                format!(
                    "{} is outside {}..={}",
                    chunk, MIN_VERTICES_PER_CHUNK, MAX_VERTICES_PER_CHUNK
                ),
            ));
        }

        if self.palette.range.len() < 2 {
            return Err(invalid(
                "palette.range",
                "at least two colors are required".to_string(),
            ));
        }

        if self
            .palette
            .colors()
            .flat_map(|c| c.0)
            .any(|v| !(0.0..=1.0).contains(&v))
        {
            return Err(invalid(
                "palette",
                "color components must be within 0..=1".to_string(),
            ));
        }

        if self.display.role_visibility_flags & !ExtrusionRole::all_visible_flags() != 0 {
            return Err(invalid(
                "display.role_visibility_flags",
                "unknown role bits are set".to_string(),
            ));
        }

        if !self.display.marker_height.is_finite() || self.display.marker_height < 0.0 {
            return Err(invalid(
                "display.marker_height",
                "must be a non-negative number".to_string(),
            ));
        }

        if self.display.visible_move_types.contains(&MoveType::Noop) {
            return Err(invalid(
                "display.visible_move_types",
                "noop moves have no geometry".to_string(),
            ));
        }

        Ok(())
    }
}

/// Default settings file location: `<config dir>/gcodeview/settings.toml`.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join("gcodeview")
        .join("settings.toml")
}

enum Format {
    Json,
    Toml,
}

impl Format {
    fn of(path: &Path) -> SettingsResult<Self> {
        if path.extension().is_some_and(|ext| ext == "json") {
            Ok(Format::Json)
        } else if path.extension().is_some_and(|ext| ext == "toml") {
            Ok(Format::Toml)
        } else {
            Err(SettingsError::UnsupportedFormat {
                extension: path
                    .extension()
                    .map(|ext| ext.to_string_lossy().into_owned())
                    .unwrap_or_default(),
            })
        }
    }
}

fn invalid(setting: &str, reason: String) -> SettingsError {
    SettingsError::Invalid {
        setting: setting.to_string(),
        reason,
    }
}
