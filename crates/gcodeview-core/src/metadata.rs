//! Print metadata passed through from the interpreter.

use crate::color::Color;
use crate::moves::MoveRecord;
use serde::{Deserialize, Serialize};

/// Per-print data that is only indexed by id (tools, color-print blocks).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrintMetadata {
    pub extruders_count: usize,
    /// `#RRGGBB` per extruder.
    pub extruder_colors: Vec<String>,
    /// `#RRGGBB` per tool. Falls back to `extruder_colors` when empty.
    pub tool_colors: Vec<String>,
    /// Seconds, if the interpreter produced an estimate.
    pub estimated_print_time_s: Option<f32>,
}

impl PrintMetadata {
    /// Decode the tool color table. Unparsable entries decode to black.
    pub fn decoded_tool_colors(&self) -> Vec<Color> {
        let source = if self.tool_colors.is_empty() {
            &self.extruder_colors
        } else {
            &self.tool_colors
        };
        source
            .iter()
            .map(|hex| Color::from_hex(hex).unwrap_or(Color::BLACK))
            .collect()
    }
}

/// A serialized move sequence as written by the interpreter.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MoveDump {
    pub moves: Vec<MoveRecord>,
    pub metadata: PrintMetadata,
}

impl MoveDump {
    pub fn from_json(text: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_colors_fall_back_to_extruders() {
        let meta = PrintMetadata {
            extruders_count: 2,
            extruder_colors: vec!["#FF0000".into(), "bogus".into()],
            ..Default::default()
        };
        let colors = meta.decoded_tool_colors();
        assert_eq!(colors, vec![Color::new(1.0, 0.0, 0.0), Color::BLACK]);

        let meta = PrintMetadata {
            tool_colors: vec!["#0000FF".into()],
            ..meta
        };
        assert_eq!(meta.decoded_tool_colors(), vec![Color::new(0.0, 0.0, 1.0)]);
    }

    #[test]
    fn test_dump_from_json() {
        let dump = MoveDump::from_json(
            r#"{"moves":[{"id":0,"type":"travel","position":[0,0,0]}],"metadata":{"extruders_count":1}}"#,
        )
        .unwrap();
        assert_eq!(dump.moves.len(), 1);
        assert_eq!(dump.metadata.extruders_count, 1);
        assert!(MoveDump::from_json("{not json").is_err());
    }
}
