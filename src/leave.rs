//! Leave requests, their states, and the draft builder used for submission
use super::error::ValidationError;
use super::store::Record;
use super::types::TimeStamp;
use super::utils;
use chrono::{NaiveDate, Utc};
use std::fmt;
use std::str::FromStr;

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LeaveState {
    #[n(0)]
    Draft,
    #[n(1)]
    TeamLeaderApproval,
    #[n(2)]
    Confirm,
    #[n(3)]
    Validate,
    #[n(4)]
    Refuse,
    #[n(5)]
    Cancel,
}

impl LeaveState {
    pub const ALL: [LeaveState; 6] = [
        LeaveState::Draft,
        LeaveState::TeamLeaderApproval,
        LeaveState::Confirm,
        LeaveState::Validate,
        LeaveState::Refuse,
        LeaveState::Cancel,
    ];

    /// States the requester may still edit or cancel.
    pub const OPEN: [LeaveState; 3] = [
        LeaveState::Draft,
        LeaveState::Confirm,
        LeaveState::TeamLeaderApproval,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LeaveState::Draft => "draft",
            LeaveState::TeamLeaderApproval => "team_leader_approval",
            LeaveState::Confirm => "confirm",
            LeaveState::Validate => "validate",
            LeaveState::Refuse => "refuse",
            LeaveState::Cancel => "cancel",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            LeaveState::Validate | LeaveState::Refuse | LeaveState::Cancel
        )
    }

    pub fn is_open(self) -> bool {
        Self::OPEN.contains(&self)
    }

    /// Awaiting someone's approval.
    pub fn is_pending(self) -> bool {
        matches!(self, LeaveState::Confirm | LeaveState::TeamLeaderApproval)
    }

    /// Whether a request in this state occupies its dates.
    pub fn blocks_dates(self) -> bool {
        !matches!(self, LeaveState::Refuse | LeaveState::Cancel)
    }

    pub fn allows_delete(self) -> bool {
        matches!(self, LeaveState::Draft | LeaveState::Cancel)
    }
}

impl fmt::Display for LeaveState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LeaveState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LeaveState::ALL
            .into_iter()
            .find(|state| state.as_str() == s.to_lowercase())
            .ok_or_else(|| format!("Invalid leave state: {}", s))
    }
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq)]
pub struct LeaveRequest {
    #[n(0)]
    pub id: String,
    #[n(1)]
    pub employee_id: String,
    #[n(2)]
    pub leave_type_id: String,
    #[cbor(n(3), with = "crate::types::cbor_date")]
    pub date_from: NaiveDate,
    #[cbor(n(4), with = "crate::types::cbor_date")]
    pub date_to: NaiveDate,
    #[n(5)]
    pub reason: String,
    #[n(6)]
    pub delegate_id: Option<String>,
    #[n(7)]
    pub state: LeaveState,
    #[n(8)]
    pub team_leader_approved: bool,
    #[n(9)]
    pub approved_by: Option<String>, // user id of the approving team leader
    #[n(10)]
    pub approved_at: Option<TimeStamp<Utc>>,
    #[n(11)]
    pub requires_team_leader_approval: bool,
    #[n(12)]
    pub created_at: TimeStamp<Utc>,
}

impl LeaveRequest {
    pub fn requested_days(&self) -> i64 {
        utils::inclusive_days(self.date_from, self.date_to)
    }

    pub fn overlaps(&self, from: NaiveDate, to: NaiveDate) -> bool {
        utils::ranges_intersect(self.date_from, self.date_to, from, to)
    }

    /// Record-level invariants that hold no matter who writes.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.date_from > self.date_to {
            return Err(ValidationError::InvalidDateRange);
        }
        if self.reason.trim().is_empty() {
            return Err(ValidationError::MissingReason);
        }
        if self.delegate_id.as_deref() == Some(self.employee_id.as_str()) {
            return Err(ValidationError::SelfDelegation);
        }
        Ok(())
    }
}

impl Record for LeaveRequest {
    const TREE: &'static str = "leave_requests";

    fn id(&self) -> &str {
        &self.id
    }
}

/// What a requester fills in before submitting. Nothing here is trusted
/// until [`LeaveRequestDetails::validate`] passes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LeaveRequestDetails {
    date_from: Option<NaiveDate>,
    date_to: Option<NaiveDate>,
    leave_type_id: Option<String>,
    reason: String,
    delegate_id: Option<String>,
}

/// Details that passed shape validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidDetails {
    pub date_from: NaiveDate,
    pub date_to: NaiveDate,
    pub leave_type_id: String,
    pub reason: String,
    pub delegate_id: Option<String>,
}

impl ValidDetails {
    pub fn requested_days(&self) -> i64 {
        utils::inclusive_days(self.date_from, self.date_to)
    }
}

impl LeaveRequestDetails {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn set_date_from(mut self, date: NaiveDate) -> Self {
        self.date_from = Some(date);
        self
    }
    pub fn set_date_to(mut self, date: NaiveDate) -> Self {
        self.date_to = Some(date);
        self
    }
    pub fn set_dates(self, from: NaiveDate, to: NaiveDate) -> Self {
        self.set_date_from(from).set_date_to(to)
    }
    pub fn set_leave_type(mut self, leave_type_id: &str) -> Self {
        self.leave_type_id = Some(leave_type_id.to_string());
        self
    }
    pub fn set_reason(mut self, reason: &str) -> Self {
        self.reason = reason.to_string();
        self
    }
    /// Blank ids are treated as "no delegate".
    pub fn set_delegate(mut self, delegate_id: &str) -> Self {
        let trimmed = delegate_id.trim();
        self.delegate_id = (!trimmed.is_empty()).then(|| trimmed.to_string());
        self
    }

    /// Checks the dates are ordered and not before `today`, and that a
    /// reason and leave type were given.
    pub fn validate(&self, today: NaiveDate) -> Result<ValidDetails, ValidationError> {
        let (Some(date_from), Some(date_to)) = (self.date_from, self.date_to) else {
            return Err(ValidationError::MissingDates);
        };
        let Some(leave_type_id) = self.leave_type_id.as_deref().filter(|id| !id.trim().is_empty())
        else {
            return Err(ValidationError::MissingLeaveType);
        };
        let reason = self.reason.trim();
        if reason.is_empty() {
            return Err(ValidationError::MissingReason);
        }
        if date_from > date_to {
            return Err(ValidationError::InvalidDateRange);
        }
        if date_from < today {
            return Err(ValidationError::PastDate);
        }

        Ok(ValidDetails {
            date_from,
            date_to,
            leave_type_id: leave_type_id.to_string(),
            reason: reason.to_string(),
            delegate_id: self.delegate_id.clone(),
        })
    }
}

/// Individually writable fields of a leave request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LeaveField {
    DateFrom,
    DateTo,
    LeaveType,
    Reason,
    Delegate,
    State,
    TeamLeaderApproved,
    ApprovedBy,
    ApprovedAt,
}

impl LeaveField {
    /// The only fields a team leader may touch on a team member's request.
    pub const TEAM_LEADER: [LeaveField; 4] = [
        LeaveField::State,
        LeaveField::TeamLeaderApproved,
        LeaveField::ApprovedBy,
        LeaveField::ApprovedAt,
    ];

    /// What a requester may still change on an open request: the reason,
    /// and the state for cancelling.
    pub const REQUESTER: [LeaveField; 2] = [LeaveField::Reason, LeaveField::State];

    pub fn is_approval_field(self) -> bool {
        matches!(
            self,
            LeaveField::TeamLeaderApproved | LeaveField::ApprovedBy | LeaveField::ApprovedAt
        )
    }
}

/// A partial write to a leave request. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LeaveUpdate {
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub leave_type_id: Option<String>,
    pub reason: Option<String>,
    pub delegate_id: Option<Option<String>>,
    pub state: Option<LeaveState>,
    pub team_leader_approved: Option<bool>,
    pub approved_by: Option<String>,
    pub approved_at: Option<TimeStamp<Utc>>,
}

impl LeaveUpdate {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn set_dates(mut self, from: NaiveDate, to: NaiveDate) -> Self {
        self.date_from = Some(from);
        self.date_to = Some(to);
        self
    }
    pub fn set_leave_type(mut self, leave_type_id: &str) -> Self {
        self.leave_type_id = Some(leave_type_id.to_string());
        self
    }
    pub fn set_reason(mut self, reason: &str) -> Self {
        self.reason = Some(reason.to_string());
        self
    }
    pub fn set_delegate(mut self, delegate_id: Option<&str>) -> Self {
        self.delegate_id = Some(delegate_id.map(str::to_string));
        self
    }
    pub fn set_state(mut self, state: LeaveState) -> Self {
        self.state = Some(state);
        self
    }
    pub fn set_team_leader_approved(mut self, approved: bool) -> Self {
        self.team_leader_approved = Some(approved);
        self
    }
    pub fn set_approved_by(mut self, user_id: &str) -> Self {
        self.approved_by = Some(user_id.to_string());
        self
    }
    pub fn set_approved_at(mut self, at: TimeStamp<Utc>) -> Self {
        self.approved_at = Some(at);
        self
    }

    pub fn fields(&self) -> Vec<LeaveField> {
        let mut fields = Vec::new();
        if self.date_from.is_some() {
            fields.push(LeaveField::DateFrom);
        }
        if self.date_to.is_some() {
            fields.push(LeaveField::DateTo);
        }
        if self.leave_type_id.is_some() {
            fields.push(LeaveField::LeaveType);
        }
        if self.reason.is_some() {
            fields.push(LeaveField::Reason);
        }
        if self.delegate_id.is_some() {
            fields.push(LeaveField::Delegate);
        }
        if self.state.is_some() {
            fields.push(LeaveField::State);
        }
        if self.team_leader_approved.is_some() {
            fields.push(LeaveField::TeamLeaderApproved);
        }
        if self.approved_by.is_some() {
            fields.push(LeaveField::ApprovedBy);
        }
        if self.approved_at.is_some() {
            fields.push(LeaveField::ApprovedAt);
        }
        fields
    }

    pub fn apply_to(self, leave: &mut LeaveRequest) {
        if let Some(from) = self.date_from {
            leave.date_from = from;
        }
        if let Some(to) = self.date_to {
            leave.date_to = to;
        }
        if let Some(leave_type_id) = self.leave_type_id {
            leave.leave_type_id = leave_type_id;
        }
        if let Some(reason) = self.reason {
            leave.reason = reason;
        }
        if let Some(delegate) = self.delegate_id {
            leave.delegate_id = delegate;
        }
        if let Some(state) = self.state {
            leave.state = state;
        }
        if let Some(approved) = self.team_leader_approved {
            leave.team_leader_approved = approved;
        }
        if let Some(user_id) = self.approved_by {
            leave.approved_by = Some(user_id);
        }
        if let Some(at) = self.approved_at {
            leave.approved_at = Some(at);
        }
    }
}
