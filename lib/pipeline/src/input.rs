//! Immutable configuration for one pipeline run.

use reelforge_activity::{AspectRatio, Platform};
use serde::{Deserialize, Serialize};

/// Configuration for a single generation run.
///
/// Created once by the caller, recorded in the run's first event, and never
/// mutated afterwards — a resumed run always re-reads its input from the
/// event log rather than trusting the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineInput {
    /// Character description prompt for the reference image.
    pub character_prompt: String,
    /// Motion/scene prompt for the video clip.
    pub video_prompt: String,
    /// Requested clip length in seconds.
    pub duration_seconds: u32,
    /// Output aspect ratio.
    pub aspect_ratio: AspectRatio,
    /// Image model for the character stage.
    pub character_model: String,
    /// Video model for the generation stage.
    pub video_model: String,
    /// Enhancement model; `Some` enables the optional enhancement stage.
    pub enhance_model: Option<String>,
    /// Platform the output is destined for.
    pub platform: Platform,
    /// Sampling temperature for character generation.
    pub temperature: f64,
    /// Number of candidate character images to produce.
    pub num_images: u32,
}

impl PipelineInput {
    /// Creates an input with the standard short-form defaults.
    #[must_use]
    pub fn new(character_prompt: impl Into<String>, video_prompt: impl Into<String>) -> Self {
        Self {
            character_prompt: character_prompt.into(),
            video_prompt: video_prompt.into(),
            duration_seconds: 8,
            aspect_ratio: AspectRatio::Portrait,
            character_model: "image-standard".to_string(),
            video_model: "video-standard".to_string(),
            enhance_model: None,
            platform: Platform::Tiktok,
            temperature: 0.7,
            num_images: 1,
        }
    }

    /// Sets the clip duration.
    #[must_use]
    pub fn with_duration(mut self, seconds: u32) -> Self {
        self.duration_seconds = seconds;
        self
    }

    /// Sets the aspect ratio.
    #[must_use]
    pub fn with_aspect_ratio(mut self, aspect_ratio: AspectRatio) -> Self {
        self.aspect_ratio = aspect_ratio;
        self
    }

    /// Sets the character image model.
    #[must_use]
    pub fn with_character_model(mut self, model: impl Into<String>) -> Self {
        self.character_model = model.into();
        self
    }

    /// Sets the video model.
    #[must_use]
    pub fn with_video_model(mut self, model: impl Into<String>) -> Self {
        self.video_model = model.into();
        self
    }

    /// Enables the enhancement stage with the given model.
    #[must_use]
    pub fn with_enhancement(mut self, model: impl Into<String>) -> Self {
        self.enhance_model = Some(model.into());
        self
    }

    /// Sets the target platform.
    #[must_use]
    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    /// Sets the character sampling temperature.
    #[must_use]
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    /// Returns true if the enhancement stage is enabled.
    #[must_use]
    pub fn enhance(&self) -> bool {
        self.enhance_model.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_short_form() {
        let input = PipelineInput::new("p1", "p2");
        assert_eq!(input.duration_seconds, 8);
        assert_eq!(input.aspect_ratio, AspectRatio::Portrait);
        assert!(!input.enhance());
    }

    #[test]
    fn enhancement_is_opt_in() {
        let input = PipelineInput::new("p1", "p2").with_enhancement("enhance-pro");
        assert!(input.enhance());
        assert_eq!(input.enhance_model.as_deref(), Some("enhance-pro"));
    }

    #[test]
    fn input_serde_roundtrip() {
        let input = PipelineInput::new("p1", "p2")
            .with_duration(12)
            .with_video_model("video-pro");
        let json = serde_json::to_string(&input).expect("serialize");
        let parsed: PipelineInput = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(input, parsed);
    }
}
