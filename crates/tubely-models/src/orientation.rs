//! Orientation labels derived from pixel geometry.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

const LANDSCAPE_RATIO: f64 = 16.0 / 9.0;
const PORTRAIT_RATIO: f64 = 9.0 / 16.0;
const RATIO_EPSILON: f64 = 0.001;

/// Orientation bucket of a video. Used as the object key prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    /// 16:9
    Landscape,
    /// 9:16
    Portrait,
    Other,
}

impl Orientation {
    /// Classify a `width x height` frame.
    ///
    /// Only ratios within a fixed epsilon of exactly 16:9 or 9:16 get a
    /// directional label; everything else (4:3, square, ...) is `Other`.
    /// Returns `None` when the geometry is degenerate.
    pub fn classify(width: u32, height: u32) -> Option<Self> {
        if width == 0 || height == 0 {
            return None;
        }

        let ratio = width as f64 / height as f64;
        let label = if (ratio - LANDSCAPE_RATIO).abs() < RATIO_EPSILON {
            Orientation::Landscape
        } else if (ratio - PORTRAIT_RATIO).abs() < RATIO_EPSILON {
            Orientation::Portrait
        } else {
            Orientation::Other
        };
        Some(label)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Orientation::Landscape => "landscape",
            Orientation::Portrait => "portrait",
            Orientation::Other => "other",
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_common_geometries() {
        assert_eq!(Orientation::classify(1920, 1080), Some(Orientation::Landscape));
        assert_eq!(Orientation::classify(1080, 1920), Some(Orientation::Portrait));
        assert_eq!(Orientation::classify(1000, 1000), Some(Orientation::Other));
        assert_eq!(Orientation::classify(640, 480), Some(Orientation::Other));
    }

    #[test]
    fn test_classify_is_not_a_range_bucket() {
        assert_eq!(Orientation::classify(1777, 1000), Some(Orientation::Landscape));
        assert_eq!(Orientation::classify(1776, 1000), Some(Orientation::Other));
        assert_eq!(Orientation::classify(1280, 720), Some(Orientation::Landscape));
        assert_eq!(Orientation::classify(720, 1280), Some(Orientation::Portrait));
        // 854x480 misses 16:9 by just over the epsilon
        assert_eq!(Orientation::classify(854, 480), Some(Orientation::Other));
    }

    #[test]
    fn test_classify_degenerate() {
        assert_eq!(Orientation::classify(1920, 0), None);
        assert_eq!(Orientation::classify(0, 1080), None);
    }

    #[test]
    fn test_labels() {
        assert_eq!(Orientation::Landscape.to_string(), "landscape");
        assert_eq!(Orientation::Portrait.as_str(), "portrait");
        assert_eq!(
            serde_json::to_string(&Orientation::Other).unwrap(),
            "\"other\""
        );
    }
}
