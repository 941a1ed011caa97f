//! Error types for the A/B comparison crate.

use crate::template::TemplateError;
use std::fmt;

/// Errors from running a comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbTestError {
    /// No variants were supplied.
    NoVariants,
    /// Every variant failed; no meaningful comparison exists.
    AllVariantsFailed { variants: usize },
    /// The base template could not be materialized.
    Template(TemplateError),
}

impl fmt::Display for AbTestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoVariants => write!(f, "no variants supplied"),
            Self::AllVariantsFailed { variants } => {
                write!(f, "all {variants} variants failed; nothing to compare")
            }
            Self::Template(e) => write!(f, "template error: {e}"),
        }
    }
}

impl std::error::Error for AbTestError {}

impl From<TemplateError> for AbTestError {
    fn from(e: TemplateError) -> Self {
        Self::Template(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variant::NodeKind;

    #[test]
    fn display_includes_variant_count() {
        let err = AbTestError::AllVariantsFailed { variants: 3 };
        assert!(err.to_string().contains('3'));
    }

    #[test]
    fn template_error_converts() {
        let err: AbTestError = TemplateError::MissingNode {
            kind: NodeKind::VideoGeneration,
        }
        .into();
        assert!(matches!(err, AbTestError::Template(_)));
    }
}
