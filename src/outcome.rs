//! User-facing result messages for portal pages
use super::error::LeaveError;
use super::leave::{LeaveRequest, LeaveState};
use tracing::error;

pub const GENERIC_ERROR: &str =
    "An unexpected error occurred. Please try again or contact support.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeLevel {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub level: OutcomeLevel,
    pub message: String,
}

impl Outcome {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: OutcomeLevel::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: OutcomeLevel::Error,
            message: message.into(),
        }
    }

    /// Domain errors keep their own message. Storage and internal faults
    /// are logged and replaced by a generic one.
    pub fn from_error(err: &LeaveError) -> Self {
        if err.is_user_facing() {
            return Self::error(err.to_string());
        }
        error!(error = %err, "unexpected failure in leave portal");
        Self::error(GENERIC_ERROR)
    }

    pub fn report<T, F>(result: &Result<T, LeaveError>, on_success: F) -> Self
    where
        F: FnOnce(&T) -> String,
    {
        match result {
            Ok(value) => Self::success(on_success(value)),
            Err(e) => Self::from_error(e),
        }
    }

    pub fn submitted(leave: &LeaveRequest) -> Self {
        let next = if leave.state == LeaveState::TeamLeaderApproval {
            "team leader"
        } else {
            "HR"
        };
        Self::success(format!(
            "Leave request submitted successfully and is pending {next} approval"
        ))
    }

    pub fn is_success(&self) -> bool {
        self.level == OutcomeLevel::Success
    }
}
