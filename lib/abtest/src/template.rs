//! Typed pipeline templates: the node registry variants are applied to.
//!
//! A template is the A/B-testable description of a pipeline run — a tagged
//! list of generation nodes rather than a finished `PipelineInput`, so a
//! variant can overwrite one node's model without knowing the rest of the
//! shape. A variant targeting a node kind the template doesn't contain is
//! logged and skipped, letting one variant list be reused across
//! differently shaped templates.

use crate::variant::{ModelVariant, NodeKind};
use reelforge_activity::{AspectRatio, Platform};
use reelforge_pipeline::PipelineInput;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// One typed node of a pipeline template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TemplateNode {
    /// Character reference image generation.
    CharacterImage {
        /// Character description prompt.
        prompt: String,
        /// Image model.
        model: String,
        /// Sampling temperature.
        temperature: f64,
        /// Candidate images to produce.
        num_images: u32,
    },
    /// Image-to-video generation.
    VideoGeneration {
        /// Motion/scene prompt.
        prompt: String,
        /// Video model.
        model: String,
        /// Clip duration in seconds.
        duration_seconds: u32,
        /// Output aspect ratio.
        aspect_ratio: AspectRatio,
    },
    /// Post-generation enhancement.
    Enhancement {
        /// Enhancement model.
        model: String,
    },
}

impl TemplateNode {
    /// Returns the node's kind for substitution matching.
    #[must_use]
    pub fn kind(&self) -> NodeKind {
        match self {
            Self::CharacterImage { .. } => NodeKind::CharacterImage,
            Self::VideoGeneration { .. } => NodeKind::VideoGeneration,
            Self::Enhancement { .. } => NodeKind::Enhancement,
        }
    }
}

/// A base pipeline configuration for comparison runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineTemplate {
    /// Platform the output is destined for.
    pub platform: Platform,
    nodes: Vec<TemplateNode>,
}

impl PipelineTemplate {
    /// Creates an empty template for a platform.
    #[must_use]
    pub fn new(platform: Platform) -> Self {
        Self {
            platform,
            nodes: Vec::new(),
        }
    }

    /// Appends a node.
    #[must_use]
    pub fn with_node(mut self, node: TemplateNode) -> Self {
        self.nodes.push(node);
        self
    }

    /// Creates the standard two-stage template with default models.
    #[must_use]
    pub fn standard(
        character_prompt: impl Into<String>,
        video_prompt: impl Into<String>,
    ) -> Self {
        Self::new(Platform::Tiktok)
            .with_node(TemplateNode::CharacterImage {
                prompt: character_prompt.into(),
                model: "image-standard".to_string(),
                temperature: 0.7,
                num_images: 1,
            })
            .with_node(TemplateNode::VideoGeneration {
                prompt: video_prompt.into(),
                model: "video-standard".to_string(),
                duration_seconds: 8,
                aspect_ratio: AspectRatio::Portrait,
            })
    }

    /// Returns the template's nodes.
    #[must_use]
    pub fn nodes(&self) -> &[TemplateNode] {
        &self.nodes
    }

    /// Applies a variant: overwrites the model (and explicit overrides) on
    /// every node matching the variant's target kind.
    ///
    /// A variant whose target kind is absent is logged and skipped, not an
    /// error.
    pub fn apply_variant(&mut self, variant: &ModelVariant) {
        let mut applied = false;

        for node in &mut self.nodes {
            if node.kind() != variant.target {
                continue;
            }
            applied = true;

            match node {
                TemplateNode::CharacterImage {
                    model, temperature, ..
                } => {
                    *model = variant.model.clone();
                    if let Some(t) = variant.overrides.temperature {
                        *temperature = t;
                    }
                }
                TemplateNode::VideoGeneration {
                    model,
                    duration_seconds,
                    aspect_ratio,
                    ..
                } => {
                    *model = variant.model.clone();
                    if let Some(d) = variant.overrides.duration_seconds {
                        *duration_seconds = d;
                    }
                    if let Some(a) = variant.overrides.aspect_ratio {
                        *aspect_ratio = a;
                    }
                }
                TemplateNode::Enhancement { model } => {
                    *model = variant.model.clone();
                }
            }
        }

        if !applied {
            warn!(
                variant = %variant.id,
                target = %variant.target,
                "variant target not present in template; override skipped"
            );
        }
    }

    /// Materializes the template into a pipeline input.
    ///
    /// # Errors
    ///
    /// Returns an error if a required node (character image or video
    /// generation) is missing.
    pub fn to_input(&self) -> Result<PipelineInput, TemplateError> {
        let mut character = None;
        let mut video = None;
        let mut enhance = None;

        for node in &self.nodes {
            match node {
                TemplateNode::CharacterImage {
                    prompt,
                    model,
                    temperature,
                    num_images,
                } => character = Some((prompt, model, *temperature, *num_images)),
                TemplateNode::VideoGeneration {
                    prompt,
                    model,
                    duration_seconds,
                    aspect_ratio,
                } => video = Some((prompt, model, *duration_seconds, *aspect_ratio)),
                TemplateNode::Enhancement { model } => enhance = Some(model),
            }
        }

        let (character_prompt, character_model, temperature, num_images) =
            character.ok_or(TemplateError::MissingNode {
                kind: NodeKind::CharacterImage,
            })?;
        let (video_prompt, video_model, duration_seconds, aspect_ratio) =
            video.ok_or(TemplateError::MissingNode {
                kind: NodeKind::VideoGeneration,
            })?;

        let mut input = PipelineInput::new(character_prompt.clone(), video_prompt.clone())
            .with_character_model(character_model.clone())
            .with_video_model(video_model.clone())
            .with_duration(duration_seconds)
            .with_aspect_ratio(aspect_ratio)
            .with_platform(self.platform)
            .with_temperature(temperature);
        input.num_images = num_images;
        if let Some(model) = enhance {
            input = input.with_enhancement(model.clone());
        }

        Ok(input)
    }
}

/// Errors from template materialization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    /// A required node kind is missing from the template.
    MissingNode { kind: NodeKind },
}

impl std::fmt::Display for TemplateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingNode { kind } => write!(f, "template is missing a {kind} node"),
        }
    }
}

impl std::error::Error for TemplateError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variant_overwrites_matching_node_model() {
        let mut template = PipelineTemplate::standard("a presenter", "explains a product");
        let variant = ModelVariant::new("pro", NodeKind::VideoGeneration, "video-pro")
            .with_duration(12);

        template.apply_variant(&variant);
        let input = template.to_input().unwrap();

        assert_eq!(input.video_model, "video-pro");
        assert_eq!(input.duration_seconds, 12);
        // Unrelated nodes untouched.
        assert_eq!(input.character_model, "image-standard");
    }

    #[test]
    fn variant_with_absent_target_is_skipped_silently() {
        let mut template = PipelineTemplate::standard("a presenter", "explains a product");
        let variant = ModelVariant::new("enhanced", NodeKind::Enhancement, "enhance-pro");

        template.apply_variant(&variant);
        let input = template.to_input().unwrap();

        // No enhancement node existed, so the input is unchanged.
        assert!(!input.enhance());
        assert_eq!(input.video_model, "video-standard");
    }

    #[test]
    fn enhancement_node_enables_the_stage() {
        let template = PipelineTemplate::standard("a presenter", "explains a product")
            .with_node(TemplateNode::Enhancement {
                model: "enhance-standard".to_string(),
            });

        let input = template.to_input().unwrap();
        assert_eq!(input.enhance_model.as_deref(), Some("enhance-standard"));
    }

    #[test]
    fn missing_required_node_is_an_error() {
        let template = PipelineTemplate::new(Platform::Tiktok).with_node(
            TemplateNode::VideoGeneration {
                prompt: "p".to_string(),
                model: "video-standard".to_string(),
                duration_seconds: 8,
                aspect_ratio: AspectRatio::Portrait,
            },
        );

        let err = template.to_input().unwrap_err();
        assert_eq!(
            err,
            TemplateError::MissingNode {
                kind: NodeKind::CharacterImage
            }
        );
    }

    #[test]
    fn character_temperature_override_applies() {
        let mut template = PipelineTemplate::standard("a presenter", "explains a product");
        let variant = ModelVariant::new("warm", NodeKind::CharacterImage, "image-pro")
            .with_temperature(1.1);

        template.apply_variant(&variant);
        let input = template.to_input().unwrap();

        assert_eq!(input.character_model, "image-pro");
        assert_eq!(input.temperature, 1.1);
    }
}
