//! Leave types, allocations and balance arithmetic
use super::store::Record;
use super::utils::{self, ALLOCATION_HRP, LEAVE_TYPE_HRP};

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocationRequirement {
    #[n(0)]
    No,
    #[n(1)]
    Yes,
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq)]
pub struct LeaveType {
    #[n(0)]
    pub id: String,
    #[n(1)]
    pub name: String,
    #[n(2)]
    pub requires_allocation: AllocationRequirement,
    #[n(3)]
    pub active: bool,
}

impl LeaveType {
    pub fn new(name: &str, requires_allocation: AllocationRequirement) -> anyhow::Result<Self> {
        Ok(Self {
            id: utils::new_uuid_to_bech32(LEAVE_TYPE_HRP)?,
            name: name.to_string(),
            requires_allocation,
            active: true,
        })
    }

    pub fn needs_balance(&self) -> bool {
        self.requires_allocation != AllocationRequirement::No
    }
}

impl Record for LeaveType {
    const TREE: &'static str = "leave_types";

    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocationState {
    #[n(0)]
    Draft,
    #[n(1)]
    Validate,
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq)]
pub struct LeaveAllocation {
    #[n(0)]
    pub id: String,
    #[n(1)]
    pub employee_id: String,
    #[n(2)]
    pub leave_type_id: String,
    #[n(3)]
    pub number_of_days: f64,
    #[n(4)]
    pub leaves_taken: f64,
    #[n(5)]
    pub state: AllocationState,
}

impl LeaveAllocation {
    /// A validated allocation of `days` with nothing taken yet.
    pub fn granted(employee_id: &str, leave_type_id: &str, days: f64) -> anyhow::Result<Self> {
        Ok(Self {
            id: utils::new_uuid_to_bech32(ALLOCATION_HRP)?,
            employee_id: employee_id.to_string(),
            leave_type_id: leave_type_id.to_string(),
            number_of_days: days,
            leaves_taken: 0.0,
            state: AllocationState::Validate,
        })
    }
    pub fn with_taken(mut self, taken: f64) -> Self {
        self.leaves_taken = taken;
        self
    }
    pub fn with_state(mut self, state: AllocationState) -> Self {
        self.state = state;
        self
    }

    pub fn remaining(&self) -> f64 {
        self.number_of_days - self.leaves_taken
    }

    pub fn is_validated(&self) -> bool {
        self.state == AllocationState::Validate
    }

    pub fn counts_toward(&self, employee_id: &str, leave_type_id: &str) -> bool {
        self.is_validated() && self.employee_id == employee_id && self.leave_type_id == leave_type_id
    }
}

impl Record for LeaveAllocation {
    const TREE: &'static str = "allocations";

    fn id(&self) -> &str {
        &self.id
    }
}

/// Totals across every validated allocation of one (employee, leave type).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Balance {
    pub total: f64,
    pub used: f64,
    pub remaining: f64,
}

impl Balance {
    pub fn sum<'a>(allocations: impl IntoIterator<Item = &'a LeaveAllocation>) -> Self {
        let (total, used) = allocations
            .into_iter()
            .fold((0.0, 0.0), |(total, used), a| {
                (total + a.number_of_days, used + a.leaves_taken)
            });
        Self {
            total,
            used,
            remaining: total - used,
        }
    }

    pub fn covers(&self, requested_days: i64) -> bool {
        self.remaining >= requested_days as f64
    }
}
