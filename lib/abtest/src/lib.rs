//! A/B model comparison for the reelforge platform.
//!
//! Takes one base pipeline template and a list of model variants, launches
//! one run per variant concurrently, and derives a ranked comparison:
//!
//! - **Variants**: one (id, target node kind, model, overrides) substitution
//! - **Templates**: the typed node registry variants are applied against
//! - **Runner**: concurrent launches; one variant's failure never cancels
//!   the others
//! - **Comparison**: fastest/cheapest/best-value/weighted winner, derived
//!   purely from the outcome set

pub mod comparison;
pub mod error;
pub mod runner;
pub mod template;
pub mod variant;

pub use comparison::{
    Comparison, ConstantQuality, DerivedMetrics, QualityScorer, ScoreWeights, VariantOutcome,
};
pub use error::AbTestError;
pub use runner::{AbTestReport, AbTestRunner};
pub use template::{PipelineTemplate, TemplateError, TemplateNode};
pub use variant::{ModelVariant, NodeKind, VariantOverrides};
