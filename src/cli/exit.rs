//! Process exit codes.
//!
//! | Code | Meaning                                        |
//! |------|------------------------------------------------|
//! | 0    | Complete, skipped, or deleted                  |
//! | 1    | Failed status or any error                     |
//! | 2    | Operator declined the change set               |
//! | 3    | Settled in a status that is neither of the above |
//! | 130  | Cancelled locally (Ctrl-C or deadline)         |

use crate::cfn::{DELETE_COMPLETE, DEPLOY_SKIPPED};
use crate::error::CloudformError;
use crate::ui::{classify, StatusCategory};

/// Success.
pub const EXIT_OK: u8 = 0;
/// Failed status or error.
pub const EXIT_FAILED: u8 = 1;
/// Operator declined.
pub const EXIT_DECLINED: u8 = 2;
/// Neither complete nor failed.
pub const EXIT_UNSETTLED: u8 = 3;
/// Cancelled locally.
pub const EXIT_CANCELLED: u8 = 130;

/// Exit code for a deployment's final status.
#[must_use]
pub fn deploy_exit_code(status: &str) -> u8 {
    if status == DEPLOY_SKIPPED {
        return EXIT_OK;
    }
    category_exit_code(classify(status).category)
}

/// Exit code for a deletion's final status.
///
/// `DELETE_COMPLETE` classifies as failed for display, but it is the
/// expected outcome of a delete.
#[must_use]
pub fn delete_exit_code(status: &str) -> u8 {
    if status == DELETE_COMPLETE {
        return EXIT_OK;
    }
    category_exit_code(classify(status).category)
}

const fn category_exit_code(category: StatusCategory) -> u8 {
    match category {
        StatusCategory::Complete => EXIT_OK,
        StatusCategory::Failed => EXIT_FAILED,
        StatusCategory::Pending | StatusCategory::InProgress => EXIT_UNSETTLED,
    }
}

/// Exit code for an error.
#[must_use]
pub const fn error_exit_code(error: &CloudformError) -> u8 {
    if error.is_user_cancelled() {
        EXIT_DECLINED
    } else if error.is_cancelled() {
        EXIT_CANCELLED
    } else {
        EXIT_FAILED
    }
}
