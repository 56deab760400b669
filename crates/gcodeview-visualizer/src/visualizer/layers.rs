//! Layer detection.

use gcodeview_core::constants::LAYER_Z_EPSILON;
use gcodeview_core::{MoveRecord, MoveType};
use serde::Serialize;

/// First and last move id of a layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct LayerEndpoints {
    pub first: usize,
    pub last: usize,
}

/// Layer z values and move id spans, in print order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Layers {
    zs: Vec<f64>,
    endpoints: Vec<LayerEndpoints>,
}

impl Layers {
    /// Detect layers from extrusion heights.
    ///
    /// A layer starts at the travel preceding the first extrusion at a new z and grows with
    /// every extrusion at that z. Travels separated from the previous travel by other moves
    /// also extend the current layer.
    pub fn from_moves(moves: &[MoveRecord]) -> Self {
        let mut layers = Self::default();
        let mut last_travel_id = 0usize;

        for m in moves {
            match m.move_type {
                MoveType::Extrude => {
                    let z = f64::from(m.position.z);
                    let same_layer = layers
                        .zs
                        .last()
                        .is_some_and(|last_z| (z - last_z).abs() <= LAYER_Z_EPSILON);
                    if same_layer {
                        layers.extend_last(m.id);
                    } else {
                        layers.append(
                            z,
                            LayerEndpoints {
                                first: last_travel_id,
                                last: m.id,
                            },
                        );
                    }
                }
                MoveType::Travel => {
                    if m.id.saturating_sub(last_travel_id) > 1 {
                        layers.extend_last(m.id);
                    }
                    last_travel_id = m.id;
                }
                _ => {}
            }
        }
        layers
    }

    pub fn append(&mut self, z: f64, endpoints: LayerEndpoints) {
        self.zs.push(z);
        self.endpoints.push(endpoints);
    }

    fn extend_last(&mut self, move_id: usize) {
        if let Some(last) = self.endpoints.last_mut() {
            last.last = move_id;
        }
    }

    pub fn size(&self) -> usize {
        self.zs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zs.is_empty()
    }

    pub fn zs(&self) -> &[f64] {
        &self.zs
    }

    pub fn endpoints(&self) -> &[LayerEndpoints] {
        &self.endpoints
    }

    pub fn endpoints_at(&self, layer: usize) -> Option<LayerEndpoints> {
        self.endpoints.get(layer).copied()
    }

    /// Move id span of the layers `range[0]..=range[1]`, clamped to the known layers.
    pub fn move_span(&self, range: [usize; 2]) -> Option<LayerEndpoints> {
        let top = self.size().checked_sub(1)?;
        let lo = range[0].min(top);
        let hi = range[1].min(top).max(lo);
        Some(LayerEndpoints {
            first: self.endpoints[lo].first,
            last: self.endpoints[hi].last,
        })
    }

    pub fn reset(&mut self) {
        self.zs.clear();
        self.endpoints.clear();
    }
}
