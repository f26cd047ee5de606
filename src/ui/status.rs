//! Status classification.
//!
//! The control plane reports an open-ended set of status strings. This
//! module folds them into four display categories. Rules are checked in
//! order and the first match wins, so `DELETE_IN_PROGRESS` and
//! `UPDATE_ROLLBACK_COMPLETE` land in `Failed` even though a later, more
//! generic suffix rule would also match them.

use serde::Serialize;

use super::palette::{Palette, Tone};

/// Display category of a raw status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum StatusCategory {
    /// Not started, or waiting on review.
    Pending,
    /// Transitioning.
    InProgress,
    /// Failed, rolling back, or being deleted.
    Failed,
    /// Done.
    Complete,
}

impl StatusCategory {
    /// Colour used for this category.
    #[must_use]
    pub const fn tone(self) -> Tone {
        match self {
            Self::Pending => Tone::Plain,
            Self::InProgress => Tone::Blue,
            Self::Failed => Tone::Red,
            Self::Complete => Tone::Green,
        }
    }
}

impl std::fmt::Display for StatusCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::InProgress => "in-progress",
            Self::Failed => "failed",
            Self::Complete => "complete",
        };
        write!(f, "{s}")
    }
}

/// Category and symbol for a status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusRep {
    /// Display category.
    pub category: StatusCategory,
    /// One-character marker.
    pub symbol: &'static str,
}

/// Classifies a raw status string.
#[must_use]
pub fn classify(status: &str) -> StatusRep {
    let (category, symbol) = if status == "REVIEW_IN_PROGRESS" {
        (StatusCategory::Pending, ".")
    } else if status.ends_with("_FAILED")
        || status.starts_with("DELETE_")
        || status.contains("ROLLBACK")
    {
        (StatusCategory::Failed, "x")
    } else if status.ends_with("_IN_PROGRESS") {
        (StatusCategory::InProgress, "o")
    } else if status.ends_with("_COMPLETE") {
        (StatusCategory::Complete, "✓")
    } else {
        (StatusCategory::Pending, ".")
    };

    StatusRep { category, symbol }
}

/// Wraps a message in the colour of the accompanying status.
#[must_use]
pub fn colourise(palette: &dyn Palette, message: &str, status: &str) -> String {
    palette.paint(classify(status).category.tone(), message)
}

/// Wraps a status in its own colour.
#[must_use]
pub fn colourise_status(palette: &dyn Palette, status: &str) -> String {
    colourise(palette, status, status)
}

/// Colourised symbol for a status.
#[must_use]
pub fn status_symbol(palette: &dyn Palette, status: &str) -> String {
    let rep = classify(status);
    palette.paint(rep.category.tone(), rep.symbol)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::palette::PlainPalette;

    fn rep(status: &str) -> (StatusCategory, &'static str) {
        let r = classify(status);
        (r.category, r.symbol)
    }

    #[test]
    fn test_review_in_progress_is_pending() {
        assert_eq!(rep("REVIEW_IN_PROGRESS"), (StatusCategory::Pending, "."));
    }

    #[test]
    fn test_rollback_wins_over_complete() {
        assert_eq!(rep("UPDATE_ROLLBACK_COMPLETE"), (StatusCategory::Failed, "x"));
        assert_eq!(rep("ROLLBACK_COMPLETE"), (StatusCategory::Failed, "x"));
    }

    #[test]
    fn test_delete_prefix_wins_over_in_progress() {
        assert_eq!(rep("DELETE_IN_PROGRESS"), (StatusCategory::Failed, "x"));
        assert_eq!(rep("DELETE_COMPLETE"), (StatusCategory::Failed, "x"));
    }

    #[test]
    fn test_suffix_rules() {
        assert_eq!(rep("CREATE_COMPLETE"), (StatusCategory::Complete, "✓"));
        assert_eq!(rep("UPDATE_IN_PROGRESS"), (StatusCategory::InProgress, "o"));
        assert_eq!(rep("CREATE_FAILED"), (StatusCategory::Failed, "x"));
    }

    #[test]
    fn test_unknown_and_empty_default_to_pending() {
        assert_eq!(rep(""), (StatusCategory::Pending, "."));
        assert_eq!(rep("CREATE_PENDING"), (StatusCategory::Pending, "."));
        assert_eq!(rep("DEPLOY_SKIPPED"), (StatusCategory::Pending, "."));
    }

    #[test]
    fn test_classify_is_deterministic() {
        for status in ["UPDATE_COMPLETE", "IMPORT_ROLLBACK_IN_PROGRESS", "weird", "FAILED"] {
            assert_eq!(classify(status), classify(status));
        }
    }

    #[test]
    fn test_colourise_status_with_plain_palette() {
        assert_eq!(colourise_status(&PlainPalette, "CREATE_COMPLETE"), "CREATE_COMPLETE");
        assert_eq!(colourise(&PlainPalette, "msg", "CREATE_FAILED"), "msg");
        assert_eq!(status_symbol(&PlainPalette, "CREATE_FAILED"), "x");
    }

    #[test]
    fn test_category_tones() {
        assert_eq!(StatusCategory::Complete.tone(), Tone::Green);
        assert_eq!(StatusCategory::InProgress.tone(), Tone::Blue);
        assert_eq!(StatusCategory::Failed.tone(), Tone::Red);
        assert_eq!(StatusCategory::Pending.tone(), Tone::Plain);
    }
}
