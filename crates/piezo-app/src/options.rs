//! User-facing compression options and their sanitation rules.

use bon::Builder;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumIter, EnumString};

/// Default target resolution for downsampled images.
pub const DEFAULT_RESOLUTION_DPI: f64 = 72.0;

/// Default ratio above which images are downsampled.
pub const DEFAULT_DOWNSAMPLE_THRESHOLD: f64 = 1.5;

/// Floor applied to caller-supplied resolutions.
pub const MIN_RESOLUTION_DPI: f64 = 1.0;

/// Floor applied to caller-supplied thresholds.
pub const MIN_DOWNSAMPLE_THRESHOLD: f64 = 0.1;

/// Engine quality preset, selecting a distiller profile via
/// `-dPDFSETTINGS`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, EnumString, AsRefStr, EnumIter, Serialize,
    Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum QualityPreset {
    Screen,
    #[default]
    Ebook,
    Printer,
    Prepress,
}

/// Options for one shrink job.
///
/// Malformed numeric fields are sanitized rather than rejected; availability
/// is preferred over strictness for caller-supplied values.
#[derive(Debug, Clone, PartialEq, Builder, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ShrinkOptions {
    #[builder(default = false)]
    pub grayscale: bool,
    #[builder(default = DEFAULT_RESOLUTION_DPI)]
    pub resolution_dpi: f64,
    #[builder(default = DEFAULT_DOWNSAMPLE_THRESHOLD)]
    pub downsample_threshold: f64,
    #[builder(default)]
    #[serde(rename = "qualityPreset")]
    pub preset: QualityPreset,
}

impl Default for ShrinkOptions {
    fn default() -> Self {
        Self {
            grayscale: false,
            resolution_dpi: DEFAULT_RESOLUTION_DPI,
            downsample_threshold: DEFAULT_DOWNSAMPLE_THRESHOLD,
            preset: QualityPreset::default(),
        }
    }
}

impl ShrinkOptions {
    /// Replace non-finite numeric fields with their defaults and clamp the
    /// rest to the documented floors. Must run before the argument builder,
    /// which assumes sane values.
    pub fn sanitized(mut self) -> Self {
        if !self.resolution_dpi.is_finite() {
            self.resolution_dpi = DEFAULT_RESOLUTION_DPI;
        }
        self.resolution_dpi = self.resolution_dpi.max(MIN_RESOLUTION_DPI);

        if !self.downsample_threshold.is_finite() {
            self.downsample_threshold = DEFAULT_DOWNSAMPLE_THRESHOLD;
        }
        self.downsample_threshold = self.downsample_threshold.max(MIN_DOWNSAMPLE_THRESHOLD);

        self
    }
}
