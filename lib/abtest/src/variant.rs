//! Model variants: one parameter substitution per comparison arm.

use reelforge_activity::AspectRatio;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The kind of template node a variant targets.
///
/// Substitution is keyed by this enum with exhaustive matches, so adding a
/// node kind forces every substitution site to handle it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// Character reference image generation.
    CharacterImage,
    /// Image-to-video generation.
    VideoGeneration,
    /// Post-generation enhancement.
    Enhancement,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CharacterImage => write!(f, "character_image"),
            Self::VideoGeneration => write!(f, "video_generation"),
            Self::Enhancement => write!(f, "enhancement"),
        }
    }
}

/// Optional parameter overrides applied alongside the model substitution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct VariantOverrides {
    /// Sampling temperature (character nodes).
    pub temperature: Option<f64>,
    /// Clip duration in seconds (video nodes).
    pub duration_seconds: Option<u32>,
    /// Aspect ratio (video nodes).
    pub aspect_ratio: Option<AspectRatio>,
}

/// One substitution to apply to a base template for comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelVariant {
    /// Caller-chosen identifier; appears in the comparison report.
    pub id: String,
    /// Which node kind the substitution targets.
    pub target: NodeKind,
    /// The model to substitute in.
    pub model: String,
    /// Additional parameter overrides.
    #[serde(default)]
    pub overrides: VariantOverrides,
}

impl ModelVariant {
    /// Creates a variant with no extra overrides.
    #[must_use]
    pub fn new(id: impl Into<String>, target: NodeKind, model: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            target,
            model: model.into(),
            overrides: VariantOverrides::default(),
        }
    }

    /// Adds a temperature override.
    #[must_use]
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.overrides.temperature = Some(temperature);
        self
    }

    /// Adds a duration override.
    #[must_use]
    pub fn with_duration(mut self, seconds: u32) -> Self {
        self.overrides.duration_seconds = Some(seconds);
        self
    }

    /// Adds an aspect-ratio override.
    #[must_use]
    pub fn with_aspect_ratio(mut self, aspect_ratio: AspectRatio) -> Self {
        self.overrides.aspect_ratio = Some(aspect_ratio);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variant_builder_sets_overrides() {
        let variant = ModelVariant::new("fast", NodeKind::VideoGeneration, "video-turbo")
            .with_duration(5)
            .with_aspect_ratio(AspectRatio::Square);

        assert_eq!(variant.overrides.duration_seconds, Some(5));
        assert_eq!(variant.overrides.aspect_ratio, Some(AspectRatio::Square));
        assert_eq!(variant.overrides.temperature, None);
    }

    #[test]
    fn variant_serde_defaults_overrides() {
        let json = r#"{"id":"a","target":"video_generation","model":"video-pro"}"#;
        let variant: ModelVariant = serde_json::from_str(json).expect("deserialize");
        assert_eq!(variant.target, NodeKind::VideoGeneration);
        assert_eq!(variant.overrides, VariantOverrides::default());
    }
}
