//! # GCodeView Core
//!
//! Core types shared by every GCodeView crate.
//! Provides the decoded move model consumed by the toolpath engine,
//! the color type used for classification, and the error types.

pub mod color;
pub mod constants;
pub mod error;
pub mod metadata;
pub mod moves;
pub mod view;

pub use color::Color;
pub use error::{Error, Result, SettingsError, ViewerError, ViewerResult};
pub use metadata::{MoveDump, PrintMetadata};
pub use moves::{ExtrusionRole, MoveRecord, MoveType};
pub use view::ViewType;
