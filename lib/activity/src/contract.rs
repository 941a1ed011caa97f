//! Activity request/result shapes and the activity traits.
//!
//! Every activity takes a plain serializable request and returns a plain
//! serializable result that reports, at minimum, the cost incurred and the
//! time spent. Implementations may write files and call networks, but must
//! be safe to re-invoke with the same request: a retried attempt writes to a
//! fresh, uniquely named target rather than appending to a previous one.

use crate::error::ActivityError;
use crate::heartbeat::HeartbeatHandle;
use async_trait::async_trait;
use reelforge_core::AccountId;
use serde::{Deserialize, Serialize};

/// Target distribution platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Tiktok,
    Instagram,
    Youtube,
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Tiktok => write!(f, "tiktok"),
            Self::Instagram => write!(f, "instagram"),
            Self::Youtube => write!(f, "youtube"),
        }
    }
}

/// Output aspect ratio for generated video.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AspectRatio {
    /// 16:9, long-form placements.
    Landscape,
    /// 9:16, short-form vertical placements.
    Portrait,
    /// 1:1, feed placements.
    Square,
}

impl AspectRatio {
    /// Returns the ratio in the `W:H` form vendor APIs expect.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Landscape => "16:9",
            Self::Portrait => "9:16",
            Self::Square => "1:1",
        }
    }
}

/// Per-attempt execution context handed to an activity implementation.
///
/// Carries the attempt number (1-based) and the heartbeat handle the
/// implementation should beat while doing long-running external work, so the
/// invoker can tell a slow attempt from a hung one.
#[derive(Debug, Clone)]
pub struct ActivityContext {
    attempt: u32,
    heartbeat: HeartbeatHandle,
}

impl ActivityContext {
    /// Creates a context for the given attempt, returning the invoker-side
    /// heartbeat handle alongside it.
    #[must_use]
    pub fn new(attempt: u32) -> (Self, HeartbeatHandle) {
        let heartbeat = HeartbeatHandle::new();
        (
            Self {
                attempt,
                heartbeat: heartbeat.clone(),
            },
            heartbeat,
        )
    }

    /// Returns the 1-based attempt number.
    #[must_use]
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Records liveness for the current attempt, extending its timeout
    /// window.
    pub fn record_heartbeat(&self) {
        self.heartbeat.beat();
    }
}

/// Request for character reference image generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterImageRequest {
    /// Full character description prompt.
    pub prompt: String,
    /// Image model to use.
    pub model: String,
    /// Sampling temperature.
    pub temperature: f64,
    /// Number of candidate images to produce.
    pub num_images: u32,
}

/// Result of character image generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterImageResult {
    /// Paths of the generated candidate images.
    pub images: Vec<String>,
    /// Cost billed by the vendor for this call.
    pub cost: f64,
    /// Wall-clock time the call took.
    pub elapsed_ms: u64,
}

/// Request for image-to-video generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoRequest {
    /// Motion/scene prompt.
    pub prompt: String,
    /// Requested clip length in seconds.
    pub duration_seconds: u32,
    /// Output aspect ratio.
    pub aspect_ratio: AspectRatio,
    /// Video model to use.
    pub model: String,
    /// Path of the first-frame (character) image the clip starts from.
    pub first_frame: String,
}

/// Result of video generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoResult {
    /// Path of the generated clip.
    pub video_path: String,
    /// Cost billed by the vendor for this call.
    pub cost: f64,
    /// Wall-clock time the call took.
    pub elapsed_ms: u64,
}

/// Request for post-generation enhancement (upscale, interpolation).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnhanceRequest {
    /// Path of the clip to enhance.
    pub video_path: String,
    /// Enhancement model to use.
    pub model: String,
}

/// Result of enhancement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnhanceResult {
    /// Path of the enhanced clip.
    pub enhanced_path: String,
    /// Cost billed by the vendor for this call.
    pub cost: f64,
    /// Wall-clock time the call took.
    pub elapsed_ms: u64,
}

/// Request to generate variations of a high-performing clip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariationRequest {
    /// Path of the source clip to vary.
    pub source_path: String,
    /// Number of variations to produce.
    pub count: u32,
}

/// Result of variation generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariationResult {
    /// Paths of the generated variations.
    pub variation_paths: Vec<String>,
    /// Cost billed by the vendor for this call.
    pub cost: f64,
    /// Wall-clock time the call took.
    pub elapsed_ms: u64,
}

/// Request to distribute a finished clip to platforms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributeRequest {
    /// Path of the content to post.
    pub content_path: String,
    /// Platforms to post to.
    pub platforms: Vec<Platform>,
}

/// A single completed platform post.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Distribution {
    /// Platform the content was posted to.
    pub platform: Platform,
    /// Platform-assigned post identifier.
    pub post_id: String,
    /// Public URL of the post.
    pub url: String,
}

/// Result of distributing a piece of content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributionReport {
    /// One entry per successful platform post.
    pub distributions: Vec<Distribution>,
}

/// Measured performance of a distributed piece of content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceReport {
    /// Total views across platforms.
    pub views: u64,
    /// Engagement rate (0.0 - 1.0).
    pub engagement: f64,
    /// Composite virality score (0 - 100).
    pub viral_score: f64,
    /// Platform with the strongest performance.
    pub best_platform: Platform,
    /// URL of the best-performing post.
    pub url: String,
}

/// Health report for an external platform account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountHealth {
    /// True when the account needs its proxy/credential rotated before the
    /// next batch.
    pub needs_rotation: bool,
}

/// Generation activities: the billed, multi-minute model invocations.
///
/// Implemented by vendor glue outside the orchestration core. Simulated
/// implementations live in [`crate::simulation`].
#[async_trait]
pub trait GenerationActivities: Send + Sync {
    /// Generates candidate character reference images from a prompt.
    async fn generate_character_image(
        &self,
        ctx: &ActivityContext,
        request: CharacterImageRequest,
    ) -> Result<CharacterImageResult, ActivityError>;

    /// Generates a video clip from a prompt and a first-frame image.
    async fn generate_video(
        &self,
        ctx: &ActivityContext,
        request: VideoRequest,
    ) -> Result<VideoResult, ActivityError>;

    /// Enhances a generated clip (upscaling, frame interpolation).
    async fn enhance_video(
        &self,
        ctx: &ActivityContext,
        request: EnhanceRequest,
    ) -> Result<EnhanceResult, ActivityError>;
}

/// Operations activities: distribution, measurement, replication, and
/// account-pool maintenance used by the batch supervisor.
///
/// The supervisor never mutates account state directly; rotation happens
/// only through [`OpsActivities::rotate_proxy`], so concurrent chunks cannot
/// race on the same account.
#[async_trait]
pub trait OpsActivities: Send + Sync {
    /// Posts finished content to the given platforms.
    async fn distribute_content(
        &self,
        ctx: &ActivityContext,
        request: DistributeRequest,
    ) -> Result<DistributionReport, ActivityError>;

    /// Measures the performance of previously distributed content.
    async fn analyze_performance(
        &self,
        ctx: &ActivityContext,
        content_id: &str,
        platform: Platform,
    ) -> Result<PerformanceReport, ActivityError>;

    /// Generates variations of a high-performing clip.
    async fn generate_variations(
        &self,
        ctx: &ActivityContext,
        request: VariationRequest,
    ) -> Result<VariationResult, ActivityError>;

    /// Checks whether an account needs rotation before further use.
    async fn check_account_health(
        &self,
        ctx: &ActivityContext,
        platform: Platform,
        account_id: AccountId,
    ) -> Result<AccountHealth, ActivityError>;

    /// Rotates the proxy/credential backing an account.
    async fn rotate_proxy(
        &self,
        ctx: &ActivityContext,
        platform: Platform,
        account_id: AccountId,
    ) -> Result<(), ActivityError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aspect_ratio_vendor_form() {
        assert_eq!(AspectRatio::Landscape.as_str(), "16:9");
        assert_eq!(AspectRatio::Portrait.as_str(), "9:16");
        assert_eq!(AspectRatio::Square.as_str(), "1:1");
    }

    #[test]
    fn platform_display() {
        assert_eq!(Platform::Tiktok.to_string(), "tiktok");
        assert_eq!(Platform::Youtube.to_string(), "youtube");
    }

    #[test]
    fn context_reports_attempt() {
        let (ctx, _handle) = ActivityContext::new(3);
        assert_eq!(ctx.attempt(), 3);
    }

    #[test]
    fn video_request_serde_roundtrip() {
        let request = VideoRequest {
            prompt: "walks through a neon market".to_string(),
            duration_seconds: 8,
            aspect_ratio: AspectRatio::Portrait,
            model: "video-standard".to_string(),
            first_frame: "character_01.png".to_string(),
        };

        let json = serde_json::to_string(&request).expect("serialize");
        let parsed: VideoRequest = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(request, parsed);
    }
}
