//! Decoded toolpath moves.
//!
//! A [`MoveRecord`] is the unit produced by the G-code interpreter and consumed by the
//! toolpath engine. Records are read-only once handed over.

use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of a decoded move.
///
/// Every type except [`MoveType::Noop`] owns one toolpath buffer, indexed by
/// [`MoveType::buffer_id`] in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveType {
    #[default]
    Noop,
    Retract,
    Unretract,
    ToolChange,
    ColorChange,
    PausePrint,
    #[serde(rename = "custom_gcode")]
    CustomGCode,
    Travel,
    Wipe,
    Extrude,
}

impl MoveType {
    /// Number of move types that own a buffer.
    pub const BUFFERS_COUNT: usize = 9;

    /// Buffer-owning types, ordered by buffer id.
    pub const BUFFER_TYPES: [MoveType; Self::BUFFERS_COUNT] = [
        MoveType::Retract,
        MoveType::Unretract,
        MoveType::ToolChange,
        MoveType::ColorChange,
        MoveType::PausePrint,
        MoveType::CustomGCode,
        MoveType::Travel,
        MoveType::Wipe,
        MoveType::Extrude,
    ];

    /// Buffer index of this type, `None` for noops.
    pub fn buffer_id(self) -> Option<usize> {
        match self {
            MoveType::Noop => None,
            other => Some(other as usize - 1),
        }
    }

    pub fn from_buffer_id(id: usize) -> Option<Self> {
        Self::BUFFER_TYPES.get(id).copied()
    }

    /// Option moves are drawn as single points (retractions, tool changes, pauses...).
    pub fn is_option(self) -> bool {
        matches!(
            self,
            MoveType::Retract
                | MoveType::Unretract
                | MoveType::ToolChange
                | MoveType::ColorChange
                | MoveType::PausePrint
                | MoveType::CustomGCode
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            MoveType::Noop => "noop",
            MoveType::Retract => "retract",
            MoveType::Unretract => "unretract",
            MoveType::ToolChange => "tool_change",
            MoveType::ColorChange => "color_change",
            MoveType::PausePrint => "pause_print",
            MoveType::CustomGCode => "custom_gcode",
            MoveType::Travel => "travel",
            MoveType::Wipe => "wipe",
            MoveType::Extrude => "extrude",
        }
    }
}

impl fmt::Display for MoveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Feature an extrusion belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtrusionRole {
    #[default]
    None,
    Perimeter,
    ExternalPerimeter,
    OverhangPerimeter,
    InternalInfill,
    SolidInfill,
    TopSolidInfill,
    Ironing,
    BridgeInfill,
    GapFill,
    Skirt,
    SupportMaterial,
    SupportMaterialInterface,
    WipeTower,
    Custom,
}

impl ExtrusionRole {
    pub const COUNT: usize = 15;

    pub const ALL: [ExtrusionRole; Self::COUNT] = [
        ExtrusionRole::None,
        ExtrusionRole::Perimeter,
        ExtrusionRole::ExternalPerimeter,
        ExtrusionRole::OverhangPerimeter,
        ExtrusionRole::InternalInfill,
        ExtrusionRole::SolidInfill,
        ExtrusionRole::TopSolidInfill,
        ExtrusionRole::Ironing,
        ExtrusionRole::BridgeInfill,
        ExtrusionRole::GapFill,
        ExtrusionRole::Skirt,
        ExtrusionRole::SupportMaterial,
        ExtrusionRole::SupportMaterialInterface,
        ExtrusionRole::WipeTower,
        ExtrusionRole::Custom,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Bit of this role in a role visibility mask.
    pub fn bit(self) -> u32 {
        1 << (self as u32)
    }

    /// Mask with every role visible.
    pub fn all_visible_flags() -> u32 {
        Self::ALL.iter().fold(0, |flags, role| flags | role.bit())
    }

    pub fn is_visible_in(self, flags: u32) -> bool {
        flags & self.bit() != 0
    }

    pub fn name(self) -> &'static str {
        match self {
            ExtrusionRole::None => "None",
            ExtrusionRole::Perimeter => "Perimeter",
            ExtrusionRole::ExternalPerimeter => "External perimeter",
            ExtrusionRole::OverhangPerimeter => "Overhang perimeter",
            ExtrusionRole::InternalInfill => "Internal infill",
            ExtrusionRole::SolidInfill => "Solid infill",
            ExtrusionRole::TopSolidInfill => "Top solid infill",
            ExtrusionRole::Ironing => "Ironing",
            ExtrusionRole::BridgeInfill => "Bridge infill",
            ExtrusionRole::GapFill => "Gap fill",
            ExtrusionRole::Skirt => "Skirt/Brim",
            ExtrusionRole::SupportMaterial => "Support material",
            ExtrusionRole::SupportMaterialInterface => "Support material interface",
            ExtrusionRole::WipeTower => "Wipe tower",
            ExtrusionRole::Custom => "Custom",
        }
    }
}

impl fmt::Display for ExtrusionRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One decoded move.
///
/// `id` must equal the record's position in the sequence handed to the viewer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MoveRecord {
    pub id: usize,
    #[serde(rename = "type")]
    pub move_type: MoveType,
    pub role: ExtrusionRole,
    pub position: Vec3,
    pub extruder_id: u8,
    pub cp_color_id: u8,
    /// mm/s
    pub feedrate: f32,
    /// percentage
    pub fan_speed: f32,
    /// mm^3/s
    pub volumetric_rate: f32,
    /// mm
    pub height: f32,
    /// mm
    pub width: f32,
    pub delta_extruder: f32,
}

impl Default for MoveRecord {
    fn default() -> Self {
        Self {
            id: 0,
            move_type: MoveType::Noop,
            role: ExtrusionRole::None,
            position: Vec3::ZERO,
            extruder_id: 0,
            cp_color_id: 0,
            feedrate: 0.0,
            fan_speed: 0.0,
            volumetric_rate: 0.0,
            height: 0.0,
            width: 0.0,
            delta_extruder: 0.0,
        }
    }
}

impl MoveRecord {
    pub fn new(id: usize, move_type: MoveType, position: Vec3) -> Self {
        Self {
            id,
            move_type,
            position,
            ..Default::default()
        }
    }

    /// Convenience constructor for an extrusion move.
    pub fn extrude(id: usize, role: ExtrusionRole, position: Vec3) -> Self {
        Self {
            id,
            move_type: MoveType::Extrude,
            role,
            position,
            feedrate: 40.0,
            height: 0.2,
            width: 0.45,
            delta_extruder: 0.05,
            volumetric_rate: 3.6,
            ..Default::default()
        }
    }

    pub fn with_role(mut self, role: ExtrusionRole) -> Self {
        self.role = role;
        self
    }

    pub fn with_extruder(mut self, extruder_id: u8) -> Self {
        self.extruder_id = extruder_id;
        self
    }

    pub fn with_cp_color(mut self, cp_color_id: u8) -> Self {
        self.cp_color_id = cp_color_id;
        self
    }

    pub fn with_feedrate(mut self, feedrate: f32) -> Self {
        self.feedrate = feedrate;
        self
    }

    pub fn with_fan_speed(mut self, fan_speed: f32) -> Self {
        self.fan_speed = fan_speed;
        self
    }

    pub fn with_volumetric_rate(mut self, volumetric_rate: f32) -> Self {
        self.volumetric_rate = volumetric_rate;
        self
    }

    pub fn with_dimensions(mut self, height: f32, width: f32) -> Self {
        self.height = height;
        self.width = width;
        self
    }

    pub fn with_delta_extruder(mut self, delta_extruder: f32) -> Self {
        self.delta_extruder = delta_extruder;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_ids_follow_declaration_order() {
        assert_eq!(MoveType::Noop.buffer_id(), None);
        for (i, ty) in MoveType::BUFFER_TYPES.iter().enumerate() {
            assert_eq!(ty.buffer_id(), Some(i));
            assert_eq!(MoveType::from_buffer_id(i), Some(*ty));
        }
        assert_eq!(MoveType::from_buffer_id(9), None);
        assert_eq!(MoveType::Extrude.buffer_id(), Some(8));
    }

    #[test]
    fn test_role_flags() {
        let flags = ExtrusionRole::all_visible_flags();
        assert_eq!(flags, (1 << 15) - 1);
        assert!(ExtrusionRole::Perimeter.is_visible_in(flags));
        let without = flags & !ExtrusionRole::Perimeter.bit();
        assert!(!ExtrusionRole::Perimeter.is_visible_in(without));
        assert!(ExtrusionRole::GapFill.is_visible_in(without));
    }

    #[test]
    fn test_move_record_json() {
        let json = r#"{"id":2,"type":"extrude","role":"perimeter","position":[1.0,2.0,0.2],"width":0.4}"#;
        let record: MoveRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.id, 2);
        assert_eq!(record.move_type, MoveType::Extrude);
        assert_eq!(record.role, ExtrusionRole::Perimeter);
        assert_eq!(record.position, Vec3::new(1.0, 2.0, 0.2));
        assert_eq!(record.width, 0.4);
        assert_eq!(record.feedrate, 0.0);
    }
}
