//! Paths and their chunk-relative sub-paths.

use gcodeview_core::constants::{
    round_to_nearest, ATTRIBUTE_DECIMALS, PATH_Z_EPSILON, VOLUMETRIC_RATE_TOLERANCE,
};
use gcodeview_core::{ExtrusionRole, MoveRecord, MoveType};
use glam::Vec3;

/// A sub-path boundary.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Endpoint {
    /// Chunk holding the footprint.
    pub chunk_id: usize,
    /// Offset, in indices, of the footprint in its index chunk.
    pub index_id: usize,
    pub move_id: usize,
    pub position: Vec3,
}

/// Part of a path that lives in a single chunk.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SubPath {
    pub first: Endpoint,
    pub last: Endpoint,
}

impl SubPath {
    pub fn contains(&self, move_id: usize) -> bool {
        self.first.move_id <= move_id && move_id <= self.last.move_id
    }

    pub fn chunk_id(&self) -> usize {
        self.first.chunk_id
    }
}

/// Maximal run of moves drawn with the same attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct Path {
    pub move_type: MoveType,
    pub role: ExtrusionRole,
    pub extruder_id: u8,
    pub cp_color_id: u8,
    pub feedrate: f32,
    pub fan_speed: f32,
    pub volumetric_rate: f32,
    /// Rounded to 0.01 mm.
    pub height: f32,
    /// Rounded to 0.01 mm.
    pub width: f32,
    pub delta_extruder: f32,
    sub_paths: Vec<SubPath>,
}

impl Path {
    /// Start a path whose attributes are taken from `representative`.
    pub fn new(representative: &MoveRecord, first: Endpoint) -> Self {
        Self {
            move_type: representative.move_type,
            role: representative.role,
            extruder_id: representative.extruder_id,
            cp_color_id: representative.cp_color_id,
            feedrate: representative.feedrate,
            fan_speed: representative.fan_speed,
            volumetric_rate: representative.volumetric_rate,
            height: round_to_nearest(representative.height, ATTRIBUTE_DECIMALS),
            width: round_to_nearest(representative.width, ATTRIBUTE_DECIMALS),
            delta_extruder: representative.delta_extruder,
            sub_paths: vec![SubPath { first, last: first }],
        }
    }

    /// Whether `m` can extend this path.
    pub fn matches(&self, m: &MoveRecord) -> bool {
        if self.move_type != m.move_type {
            return false;
        }
        match m.move_type {
            MoveType::Noop => false,
            MoveType::Travel => {
                self.feedrate == m.feedrate
                    && self.extruder_id == m.extruder_id
                    && self.cp_color_id == m.cp_color_id
            }
            MoveType::Wipe => self.extruder_id == m.extruder_id,
            MoveType::Extrude => {
                self.role == m.role
                    && self.extruder_id == m.extruder_id
                    && self.cp_color_id == m.cp_color_id
                    && self.feedrate == m.feedrate
                    && self.fan_speed == m.fan_speed
                    && self.height == round_to_nearest(m.height, ATTRIBUTE_DECIMALS)
                    && self.width == round_to_nearest(m.width, ATTRIBUTE_DECIMALS)
                    && within_percent(
                        self.volumetric_rate,
                        m.volumetric_rate,
                        VOLUMETRIC_RATE_TOLERANCE,
                    )
                    && m.position.z <= self.first().position.z + PATH_Z_EPSILON
            }
            _ => true,
        }
    }

    pub fn sub_paths(&self) -> &[SubPath] {
        &self.sub_paths
    }

    pub fn first(&self) -> &Endpoint {
        &self.sub_paths[0].first
    }

    pub fn last(&self) -> &Endpoint {
        &self.sub_paths[self.sub_paths.len() - 1].last
    }

    pub fn first_move_id(&self) -> usize {
        self.first().move_id
    }

    pub fn last_move_id(&self) -> usize {
        self.last().move_id
    }

    pub fn vertices_count(&self) -> usize {
        self.last_move_id() - self.first_move_id() + 1
    }

    pub fn contains(&self, move_id: usize) -> bool {
        self.first_move_id() <= move_id && move_id <= self.last_move_id()
    }

    pub fn sub_path_containing(&self, move_id: usize) -> Option<usize> {
        self.sub_paths.iter().position(|s| s.contains(move_id))
    }

    /// Begin a new sub-path, used when the path continues into a new chunk.
    pub fn add_sub_path(&mut self, first: Endpoint) {
        self.sub_paths.push(SubPath { first, last: first });
    }

    /// Move the end of the last sub-path forward.
    pub fn extend(&mut self, last: Endpoint) {
        if let Some(sub_path) = self.sub_paths.last_mut() {
            sub_path.last = last;
        }
    }
}

fn within_percent(a: f32, b: f32, percent: f32) -> bool {
    (a - b).abs() <= percent * a.abs().max(b.abs())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint(chunk_id: usize, index_id: usize, move_id: usize) -> Endpoint {
        Endpoint {
            chunk_id,
            index_id,
            move_id,
            position: Vec3::new(move_id as f32, 0.0, 0.2),
        }
    }

    #[test]
    fn test_sub_path_bookkeeping() {
        let m = MoveRecord::extrude(1, ExtrusionRole::Perimeter, Vec3::new(1.0, 0.0, 0.2));
        let mut path = Path::new(&m, endpoint(0, 0, 0));
        path.extend(endpoint(0, 0, 1));
        path.extend(endpoint(0, 42, 2));
        path.add_sub_path(endpoint(1, 0, 2));
        path.extend(endpoint(1, 0, 3));

        assert_eq!(path.sub_paths().len(), 2);
        assert_eq!(path.vertices_count(), 4);
        assert!(path.contains(3));
        assert!(!path.contains(4));
        assert_eq!(path.sub_path_containing(1), Some(0));
        assert_eq!(path.sub_path_containing(3), Some(1));
        assert_eq!(path.sub_path_containing(7), None);
    }

    #[test]
    fn test_extrusion_matching() {
        let base = MoveRecord::extrude(1, ExtrusionRole::Perimeter, Vec3::new(1.0, 0.0, 0.2));
        let path = Path::new(&base, endpoint(0, 0, 0));

        let same = MoveRecord {
            id: 2,
            width: 0.451,
            ..base.clone()
        };
        assert!(path.matches(&same));
        assert!(path.matches(&base.clone().with_volumetric_rate(3.7)));

        assert!(!path.matches(&base.clone().with_role(ExtrusionRole::GapFill)));
        assert!(!path.matches(&base.clone().with_feedrate(60.0)));
        assert!(!path.matches(&base.clone().with_extruder(1)));
        assert!(!path.matches(&base.clone().with_dimensions(0.3, 0.45)));
        assert!(!path.matches(&base.clone().with_volumetric_rate(4.5)));

        let higher = MoveRecord {
            position: Vec3::new(2.0, 0.0, 0.4),
            ..base.clone()
        };
        assert!(!path.matches(&higher));
    }

    #[test]
    fn test_travel_and_option_matching() {
        let travel = MoveRecord::new(1, MoveType::Travel, Vec3::X).with_feedrate(120.0);
        let path = Path::new(&travel, endpoint(0, 0, 0));
        assert!(path.matches(&travel.clone().with_delta_extruder(-1.0)));
        assert!(!path.matches(&travel.clone().with_feedrate(60.0)));
        assert!(!path.matches(&travel.clone().with_cp_color(2)));
        assert!(!path.matches(&MoveRecord::new(2, MoveType::Wipe, Vec3::X)));

        let retract = MoveRecord::new(3, MoveType::Retract, Vec3::ZERO);
        let path = Path::new(&retract, endpoint(0, 0, 3));
        assert!(path.matches(&retract.clone().with_extruder(1)));
    }
}
