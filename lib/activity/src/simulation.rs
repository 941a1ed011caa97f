//! Simulated activity implementations.
//!
//! These run entirely in process with configurable latency, cost, and
//! failure behavior. They back the orchestration tests and the operator's
//! local development mode; vendor-backed implementations live outside this
//! workspace.
//!
//! Simulated artifacts are named with a fresh ULID per call, mirroring the
//! re-invocation safety rule real implementations must follow: a retried
//! attempt never overwrites or appends to a previous attempt's output.

use crate::contract::{
    AccountHealth, ActivityContext, CharacterImageRequest, CharacterImageResult,
    DistributeRequest, Distribution, DistributionReport, EnhanceRequest, EnhanceResult,
    GenerationActivities, OpsActivities, PerformanceReport, Platform, VariationRequest,
    VariationResult, VideoRequest, VideoResult,
};
use crate::error::ActivityError;
use async_trait::async_trait;
use reelforge_core::AccountId;
use std::collections::HashSet;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use ulid::Ulid;

/// Failure behavior for simulated activities.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePlan {
    /// Every call succeeds.
    None,
    /// Every call fails with a transient error.
    Always,
    /// The first N calls fail transiently, later calls succeed.
    TransientFirst(u32),
}

/// Simulated generation activities with configurable costs and latency.
#[derive(Debug)]
pub struct SimulatedGeneration {
    latency: Duration,
    image_cost: f64,
    video_cost: f64,
    enhance_cost: f64,
    plan: FailurePlan,
    calls: AtomicU32,
}

impl SimulatedGeneration {
    /// Creates a simulation with the given per-call latency.
    #[must_use]
    pub fn new(latency: Duration) -> Self {
        Self {
            latency,
            image_cost: 0.08,
            video_cost: 1.25,
            enhance_cost: 0.40,
            plan: FailurePlan::None,
            calls: AtomicU32::new(0),
        }
    }

    /// Creates a zero-latency simulation.
    #[must_use]
    pub fn instant() -> Self {
        Self::new(Duration::ZERO)
    }

    /// Sets the cost reported per character image call.
    #[must_use]
    pub fn with_image_cost(mut self, cost: f64) -> Self {
        self.image_cost = cost;
        self
    }

    /// Sets the cost reported per video generation call.
    #[must_use]
    pub fn with_video_cost(mut self, cost: f64) -> Self {
        self.video_cost = cost;
        self
    }

    /// Sets the cost reported per enhancement call.
    #[must_use]
    pub fn with_enhance_cost(mut self, cost: f64) -> Self {
        self.enhance_cost = cost;
        self
    }

    /// Sets the failure plan.
    #[must_use]
    pub fn with_failure_plan(mut self, plan: FailurePlan) -> Self {
        self.plan = plan;
        self
    }

    /// Returns the number of activity calls made so far.
    #[must_use]
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    /// Simulates the external work: waits out the latency, then applies the
    /// failure plan.
    async fn perform(&self) -> Result<(), ActivityError> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        match self.plan {
            FailurePlan::None => Ok(()),
            FailurePlan::Always => Err(ActivityError::transient("simulated vendor failure")),
            FailurePlan::TransientFirst(n) if call <= n => {
                Err(ActivityError::transient("simulated vendor failure"))
            }
            FailurePlan::TransientFirst(_) => Ok(()),
        }
    }

    fn elapsed_ms(&self) -> u64 {
        self.latency.as_millis() as u64
    }
}

#[async_trait]
impl GenerationActivities for SimulatedGeneration {
    async fn generate_character_image(
        &self,
        _ctx: &ActivityContext,
        request: CharacterImageRequest,
    ) -> Result<CharacterImageResult, ActivityError> {
        self.perform().await?;

        let images = (0..request.num_images.max(1))
            .map(|_| format!("character_{}.png", Ulid::new()))
            .collect();

        Ok(CharacterImageResult {
            images,
            cost: self.image_cost,
            elapsed_ms: self.elapsed_ms(),
        })
    }

    async fn generate_video(
        &self,
        _ctx: &ActivityContext,
        _request: VideoRequest,
    ) -> Result<VideoResult, ActivityError> {
        self.perform().await?;

        Ok(VideoResult {
            video_path: format!("video_{}.mp4", Ulid::new()),
            cost: self.video_cost,
            elapsed_ms: self.elapsed_ms(),
        })
    }

    async fn enhance_video(
        &self,
        _ctx: &ActivityContext,
        _request: EnhanceRequest,
    ) -> Result<EnhanceResult, ActivityError> {
        self.perform().await?;

        Ok(EnhanceResult {
            enhanced_path: format!("enhanced_{}.mp4", Ulid::new()),
            cost: self.enhance_cost,
            elapsed_ms: self.elapsed_ms(),
        })
    }
}

/// Simulated operations activities with configurable performance outcomes
/// and an in-memory unhealthy-account set.
#[derive(Debug)]
pub struct SimulatedOps {
    latency: Duration,
    views: u64,
    engagement: f64,
    viral_score: f64,
    variation_cost: f64,
    unhealthy: Mutex<HashSet<AccountId>>,
    rotations: AtomicU32,
}

impl SimulatedOps {
    /// Creates a zero-latency simulation with modest default performance.
    #[must_use]
    pub fn new() -> Self {
        Self {
            latency: Duration::ZERO,
            views: 1_200,
            engagement: 0.04,
            viral_score: 35.0,
            variation_cost: 0.60,
            unhealthy: Mutex::new(HashSet::new()),
            rotations: AtomicU32::new(0),
        }
    }

    /// Sets the per-call latency.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Sets the views reported for every analyzed item.
    #[must_use]
    pub fn with_views(mut self, views: u64) -> Self {
        self.views = views;
        self
    }

    /// Sets the engagement rate reported for every analyzed item.
    #[must_use]
    pub fn with_engagement(mut self, engagement: f64) -> Self {
        self.engagement = engagement;
        self
    }

    /// Sets the viral score reported for every analyzed item.
    #[must_use]
    pub fn with_viral_score(mut self, viral_score: f64) -> Self {
        self.viral_score = viral_score;
        self
    }

    /// Marks an account as needing rotation until `rotate_proxy` is called
    /// for it.
    pub fn mark_unhealthy(&self, account_id: AccountId) {
        self.unhealthy.lock().unwrap().insert(account_id);
    }

    /// Returns the number of proxy rotations performed.
    #[must_use]
    pub fn rotations(&self) -> u32 {
        self.rotations.load(Ordering::SeqCst)
    }

    async fn perform(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }
}

impl Default for SimulatedOps {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OpsActivities for SimulatedOps {
    async fn distribute_content(
        &self,
        _ctx: &ActivityContext,
        request: DistributeRequest,
    ) -> Result<DistributionReport, ActivityError> {
        self.perform().await;

        let distributions = request
            .platforms
            .iter()
            .map(|platform| {
                let post_id = Ulid::new().to_string();
                Distribution {
                    platform: *platform,
                    url: format!("https://{platform}.example/{post_id}"),
                    post_id,
                }
            })
            .collect();

        Ok(DistributionReport { distributions })
    }

    async fn analyze_performance(
        &self,
        _ctx: &ActivityContext,
        _content_id: &str,
        platform: Platform,
    ) -> Result<PerformanceReport, ActivityError> {
        self.perform().await;

        Ok(PerformanceReport {
            views: self.views,
            engagement: self.engagement,
            viral_score: self.viral_score,
            best_platform: platform,
            url: format!("https://{platform}.example/{}", Ulid::new()),
        })
    }

    async fn generate_variations(
        &self,
        _ctx: &ActivityContext,
        request: VariationRequest,
    ) -> Result<VariationResult, ActivityError> {
        self.perform().await;

        let variation_paths = (0..request.count)
            .map(|_| format!("variation_{}.mp4", Ulid::new()))
            .collect();

        Ok(VariationResult {
            variation_paths,
            cost: self.variation_cost * f64::from(request.count),
            elapsed_ms: self.latency.as_millis() as u64,
        })
    }

    async fn check_account_health(
        &self,
        _ctx: &ActivityContext,
        _platform: Platform,
        account_id: AccountId,
    ) -> Result<AccountHealth, ActivityError> {
        self.perform().await;

        let needs_rotation = self.unhealthy.lock().unwrap().contains(&account_id);
        Ok(AccountHealth { needs_rotation })
    }

    async fn rotate_proxy(
        &self,
        _ctx: &ActivityContext,
        _platform: Platform,
        account_id: AccountId,
    ) -> Result<(), ActivityError> {
        self.perform().await;

        self.unhealthy.lock().unwrap().remove(&account_id);
        self.rotations.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> ActivityContext {
        ActivityContext::new(1).0
    }

    #[tokio::test]
    async fn generation_produces_fresh_artifact_names() {
        let activities = SimulatedGeneration::instant();
        let request = VideoRequest {
            prompt: "test".to_string(),
            duration_seconds: 8,
            aspect_ratio: crate::contract::AspectRatio::Portrait,
            model: "video-standard".to_string(),
            first_frame: "frame.png".to_string(),
        };

        let first = activities.generate_video(&ctx(), request.clone()).await.unwrap();
        let second = activities.generate_video(&ctx(), request).await.unwrap();

        assert_ne!(first.video_path, second.video_path);
    }

    #[tokio::test]
    async fn transient_first_plan_fails_then_recovers() {
        let activities = SimulatedGeneration::instant()
            .with_failure_plan(FailurePlan::TransientFirst(2));
        let request = CharacterImageRequest {
            prompt: "test".to_string(),
            model: "image-standard".to_string(),
            temperature: 0.7,
            num_images: 1,
        };

        assert!(activities
            .generate_character_image(&ctx(), request.clone())
            .await
            .is_err());
        assert!(activities
            .generate_character_image(&ctx(), request.clone())
            .await
            .is_err());
        assert!(activities
            .generate_character_image(&ctx(), request)
            .await
            .is_ok());
        assert_eq!(activities.calls(), 3);
    }

    #[tokio::test]
    async fn configured_costs_are_reported() {
        let activities = SimulatedGeneration::instant()
            .with_image_cost(1.0)
            .with_video_cost(2.0);
        let image = activities
            .generate_character_image(
                &ctx(),
                CharacterImageRequest {
                    prompt: "p".to_string(),
                    model: "image-standard".to_string(),
                    temperature: 0.7,
                    num_images: 1,
                },
            )
            .await
            .unwrap();
        assert_eq!(image.cost, 1.0);
    }

    #[tokio::test]
    async fn distribution_covers_every_requested_platform() {
        let ops = SimulatedOps::new();
        let report = ops
            .distribute_content(
                &ctx(),
                DistributeRequest {
                    content_path: "video.mp4".to_string(),
                    platforms: vec![Platform::Tiktok, Platform::Youtube],
                },
            )
            .await
            .unwrap();

        assert_eq!(report.distributions.len(), 2);
        assert_eq!(report.distributions[0].platform, Platform::Tiktok);
    }

    #[tokio::test]
    async fn rotation_clears_unhealthy_state() {
        let ops = SimulatedOps::new();
        let account = AccountId::new();
        ops.mark_unhealthy(account);

        let health = ops
            .check_account_health(&ctx(), Platform::Tiktok, account)
            .await
            .unwrap();
        assert!(health.needs_rotation);

        ops.rotate_proxy(&ctx(), Platform::Tiktok, account).await.unwrap();
        assert_eq!(ops.rotations(), 1);

        let health = ops
            .check_account_health(&ctx(), Platform::Tiktok, account)
            .await
            .unwrap();
        assert!(!health.needs_rotation);
    }
}
