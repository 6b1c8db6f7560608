use super::leave::LeaveState;

/// Bad input shape. Raised before anything is persisted.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Please provide both start and end dates")]
    MissingDates,
    #[error("Start date cannot be after end date")]
    InvalidDateRange,
    #[error("Cannot apply for past dates")]
    PastDate,
    #[error("Please provide a reason for leave")]
    MissingReason,
    #[error("Please select a leave type")]
    MissingLeaveType,
    #[error("Invalid leave type selected")]
    UnknownLeaveType(String),
    #[error("You cannot delegate to yourself")]
    SelfDelegation,
    #[error("Delegate employee {0} does not exist")]
    UnknownDelegate(String),
    #[error("An employee cannot be their own team leader")]
    SelfTeamLeader,
    #[error("Team leader {0} does not exist")]
    UnknownTeamLeader(String),
    #[error("File size exceeds {limit} byte limit ({size} bytes)")]
    AttachmentTooLarge { size: u64, limit: u64 },
    #[error("Invalid file type '{0}'. Allowed: {1}")]
    AttachmentType(String, String),
    #[error("Please select at least one user")]
    NoUsersSelected,
}

/// Well-formed input that breaks a business rule.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum RuleViolation {
    #[error("You already have a leave request for overlapping dates")]
    Overlap { existing: String },
    #[error("insufficient balance: remaining {remaining}")]
    InsufficientBalance { remaining: f64, requested: i64 },
    #[error("No leave allocation found for this leave type")]
    NoAllocation,
    #[error("This leave has no team leader assigned")]
    NoTeamLeader,
    #[error("Only the assigned team leader can approve or refuse this request")]
    NotTeamLeader,
    #[error("You are not assigned as a team leader")]
    NotATeamLeader,
    #[error("Only the requester can cancel this leave request")]
    NotRequester,
    #[error("Leave request is {actual}, expected one of {expected:?}")]
    WrongState {
        actual: LeaveState,
        expected: Vec<LeaveState>,
    },
    #[error("Leave request cannot be deleted while {0}")]
    DeleteNotAllowed(LeaveState),
    #[error("This user is not a portal user")]
    NotPortalUser,
    #[error("This user already has an employee record")]
    EmployeeExists,
}

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("storage failure: {0}")]
    Sled(#[from] sled::Error),
    #[error("failed to encode record: {0}")]
    Encode(String),
    #[error("failed to decode record: {0}")]
    Decode(#[from] minicbor::decode::Error),
    #[error("{tree} record {id} already exists")]
    Duplicate { tree: &'static str, id: String },
    #[error("{tree} record {id} not found")]
    Missing { tree: &'static str, id: String },
}

#[derive(thiserror::Error, Debug)]
pub enum LeaveError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Rule(#[from] RuleViolation),
    #[error("Access denied: {0}")]
    AccessDenied(String),
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },
    #[error(transparent)]
    Store(StoreError),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl LeaveError {
    pub fn denied(reason: impl Into<String>) -> Self {
        LeaveError::AccessDenied(reason.into())
    }

    /// Errors the caller can act on, as opposed to storage or internal faults.
    pub fn is_user_facing(&self) -> bool {
        !matches!(self, LeaveError::Store(_) | LeaveError::Internal(_))
    }
}

impl From<sled::transaction::TransactionError<StoreError>> for StoreError {
    fn from(value: sled::transaction::TransactionError<StoreError>) -> Self {
        match value {
            sled::transaction::TransactionError::Abort(e) => e,
            sled::transaction::TransactionError::Storage(e) => StoreError::Sled(e),
        }
    }
}

impl From<StoreError> for LeaveError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Missing { tree, id } => LeaveError::NotFound { entity: tree, id },
            other => LeaveError::Store(other),
        }
    }
}
