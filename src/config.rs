//! Surface configuration
//!
//! Runtime capability configuration resolved once at surface construction:
//! display geometry for sizing an offscreen target, the byte-order of raw
//! 16-bit image sources, and the monochrome bitmap color pair. Persisted as
//! JSON.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::color::Rgb;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurfaceConfig {
    pub width: i32,
    pub height: i32,
    /// Raw 16-bit image sources carry byte-swapped colors
    pub swap_bytes: bool,
    /// Foreground for monochrome bitmap sources
    pub mono_fg: Rgb,
    /// Background for monochrome bitmap sources
    pub mono_bg: Rgb,
}

impl SurfaceConfig {
    /// Save to a JSON file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), String> {
        let json = serde_json::to_string_pretty(self).map_err(|e| e.to_string())?;
        fs::write(path, json).map_err(|e| e.to_string())
    }

    /// Load from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, String> {
        let json = fs::read_to_string(path).map_err(|e| e.to_string())?;
        serde_json::from_str(&json).map_err(|e| e.to_string())
    }
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            width: 320,
            height: 240,
            swap_bytes: false,
            mono_fg: Rgb::WHITE,
            mono_bg: Rgb::BLACK,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_round_trip() {
        let cfg = SurfaceConfig {
            width: 160,
            height: 128,
            swap_bytes: true,
            mono_fg: Rgb::YELLOW,
            mono_bg: Rgb::NAVY,
        };
        let json = serde_json::to_string(&cfg).expect("serialize");
        let back: SurfaceConfig = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back.width, 160);
        assert_eq!(back.height, 128);
        assert!(back.swap_bytes);
        assert_eq!(back.mono_fg, Rgb::YELLOW);
        assert_eq!(back.mono_bg, Rgb::NAVY);
    }

    #[test]
    fn test_default_geometry() {
        let cfg = SurfaceConfig::default();
        assert_eq!((cfg.width, cfg.height), (320, 240));
        assert!(!cfg.swap_bytes);
    }

    #[test]
    fn test_load_missing_file_is_error() {
        assert!(SurfaceConfig::load("/nonexistent/glaze-config.json").is_err());
    }
}
