//! GCodeView Settings Crate
//!
//! Handles viewer configuration: color palettes, buffer limits and display defaults.

pub mod config;

pub use config::{
    default_config_path, BufferSettings, DisplaySettings, Palette, SettingsResult, ViewerSettings,
};
