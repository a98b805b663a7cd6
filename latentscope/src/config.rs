// Copyright 2025 the Latentscope Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use latentscope_imaging::{Color, hsla};
use serde::Deserialize;

/// How latent points are colored.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointColoring {
    /// One faint color for every point.
    #[default]
    Uniform,
    /// Hue derived from the class label, `label / 10` of the color wheel.
    ByLabel,
}

impl PointColoring {
    /// Returns the fill for a point with the given label.
    #[must_use]
    pub fn color(self, label: i64) -> Color {
        match self {
            Self::Uniform => hsla(241.0, 83.0, 24.0, 0.08),
            Self::ByLabel => {
                let hue = (label as f32 / 10.0 * 360.0).floor();
                hsla(hue, 70.0, 50.0, 0.3)
            }
        }
    }
}

/// Settings for one latent-space session.
///
/// Every field has a default, so a JSON document only needs the keys it
/// overrides:
///
/// ```rust
/// use latentscope::{PointColoring, SessionConfig};
///
/// let config = SessionConfig::from_json_str(r#"{ "coloring": "by_label" }"#).unwrap();
/// assert_eq!(config.coloring, PointColoring::ByLabel);
/// assert_eq!(config.latent_scale, 0.25);
/// ```
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Dataset path of the sample images, `[N, width × height]`.
    pub samples_path: String,
    /// Dataset path of the class labels, `[N]`.
    pub labels_path: String,
    /// Normalization scale of the latent surface.
    pub latent_scale: f64,
    /// Width of one sample image in pixels.
    pub image_width: u32,
    /// Height of one sample image in pixels.
    pub image_height: u32,
    /// Radius of each latent point in device pixels.
    pub point_radius: f64,
    /// Radius of the nearest-point highlight in device pixels.
    pub highlight_radius: f64,
    /// Point coloring scheme.
    pub coloring: PointColoring,
    /// Edge length of the loading indicator in logical units.
    pub loading_indicator_size: f64,
    /// Rotation of the loading indicator per frame, in radians.
    pub loading_indicator_step: f64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            samples_path: "data/mnist_X.json".into(),
            labels_path: "data/mnist_Y.json".into(),
            latent_scale: 0.25,
            image_width: 28,
            image_height: 28,
            point_radius: 3.0,
            highlight_radius: 10.0,
            coloring: PointColoring::Uniform,
            loading_indicator_size: 2.5,
            loading_indicator_step: 0.05,
        }
    }
}

impl SessionConfig {
    /// Parses a configuration from JSON, filling missing keys with defaults.
    pub fn from_json_str(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Number of pixels in one sample image.
    #[must_use]
    pub fn pixels_per_image(&self) -> usize {
        self.image_width as usize * self.image_height as usize
    }
}
