//! Read models behind the self-service pages: the application form, the
//! request history, the team approval queue and balance lookups.
use super::actor::Actor;
use super::allocation::{Balance, LeaveAllocation, LeaveType};
use super::employee::EmployeeView;
use super::error::{LeaveError, RuleViolation};
use super::guard::{AllocationFilter, LeaveFilter};
use super::leave::{LeaveRequest, LeaveState};
use super::service::LeaveService;
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq)]
pub struct LeaveTypeBalance {
    pub leave_type: LeaveType,
    pub balance: Balance,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApplyForm {
    pub employee: EmployeeView,
    pub leave_types: Vec<LeaveTypeBalance>,
    pub delegates: Vec<EmployeeView>,
    pub is_team_leader: bool,
    pub pending_team_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HistoryStats {
    pub total: usize,
    pub pending: usize,
    pub approved: usize,
    pub refused: usize,
    pub draft: usize,
}

impl HistoryStats {
    pub fn tally(leaves: &[LeaveRequest]) -> Self {
        let count = |f: fn(LeaveState) -> bool| leaves.iter().filter(|l| f(l.state)).count();
        Self {
            total: leaves.len(),
            pending: count(LeaveState::is_pending),
            approved: count(|s| s == LeaveState::Validate),
            refused: count(|s| s == LeaveState::Refuse),
            draft: count(|s| s == LeaveState::Draft),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LeaveHistory {
    pub leaves: Vec<LeaveRequest>,
    pub stats: HistoryStats,
    pub allocations: Vec<LeaveAllocation>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TeamStats {
    pub pending: usize,
    pub total: usize,
    pub approved: usize,
    pub team_members: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TeamApprovals {
    pub pending: Vec<LeaveRequest>,
    pub all: Vec<LeaveRequest>,
    pub members: Vec<EmployeeView>,
    pub stats: TeamStats,
}

impl LeaveService {
    /// Everything needed to fill in a new request: leave types the actor
    /// holds validated allocations for, with balances, and who they could
    /// delegate to.
    pub fn apply_form(&self, actor: &Actor) -> Result<ApplyForm, LeaveError> {
        let guard = self.guard();
        let me = guard.require_employee(actor)?;

        let allocations = guard.search_allocations(
            actor,
            &AllocationFilter::new().for_employee(&me.id).validated(),
        )?;
        let type_ids: BTreeSet<&str> = allocations.iter().map(|a| a.leave_type_id.as_str()).collect();

        let mut leave_types = Vec::new();
        for type_id in type_ids {
            let Some(leave_type) = self.store().leave_types.get(type_id)?.filter(|t| t.active) else {
                continue;
            };
            let balance = Balance::sum(allocations.iter().filter(|a| a.leave_type_id == type_id));
            leave_types.push(LeaveTypeBalance { leave_type, balance });
        }
        leave_types.sort_by(|a, b| a.leave_type.name.cmp(&b.leave_type.name));

        let delegates = guard
            .search_employees(actor)?
            .into_iter()
            .filter(|e| e.id != me.id)
            .collect();

        let members = guard.team_members(actor)?;
        let pending_team_count = if members.is_empty() {
            0
        } else {
            guard
                .search_leaves(
                    actor,
                    &LeaveFilter::new()
                        .led_by(&me.id)
                        .in_state(LeaveState::TeamLeaderApproval),
                )?
                .len()
        };

        Ok(ApplyForm {
            employee: me.view(),
            leave_types,
            delegates,
            is_team_leader: !members.is_empty(),
            pending_team_count,
        })
    }

    /// The actor's own requests, newest first, optionally narrowed to one
    /// state. Statistics always cover every request.
    pub fn history(&self, actor: &Actor, status: Option<LeaveState>) -> Result<LeaveHistory, LeaveError> {
        let guard = self.guard();
        let me = guard.require_employee(actor)?;

        let all = guard.search_leaves(actor, &LeaveFilter::new().for_employee(&me.id))?;
        let stats = HistoryStats::tally(&all);
        let leaves = match status {
            Some(state) => all.into_iter().filter(|l| l.state == state).collect(),
            None => all,
        };
        let allocations = guard.search_allocations(
            actor,
            &AllocationFilter::new().for_employee(&me.id).validated(),
        )?;

        Ok(LeaveHistory {
            leaves,
            stats,
            allocations,
        })
    }

    /// The approval queue of a team leader. Actors leading nobody get
    /// [`RuleViolation::NotATeamLeader`].
    pub fn team_approvals(&self, actor: &Actor) -> Result<TeamApprovals, LeaveError> {
        let guard = self.guard();
        let me = guard.require_employee(actor)?;

        let members = guard.team_members(actor)?;
        if members.is_empty() {
            return Err(RuleViolation::NotATeamLeader.into());
        }

        let all = guard.search_leaves(actor, &LeaveFilter::new().led_by(&me.id))?;
        let pending: Vec<LeaveRequest> = all
            .iter()
            .filter(|l| l.state == LeaveState::TeamLeaderApproval)
            .cloned()
            .collect();
        let stats = TeamStats {
            pending: pending.len(),
            total: all.len(),
            approved: all.iter().filter(|l| l.team_leader_approved).count(),
            team_members: members.len(),
        };

        Ok(TeamApprovals {
            pending,
            all,
            members,
            stats,
        })
    }

    /// Balance across validated allocations of one leave type. Zero when the
    /// actor holds none.
    pub fn balance(&self, actor: &Actor, leave_type_id: &str) -> Result<Balance, LeaveError> {
        let guard = self.guard();
        let me = guard.require_employee(actor)?;
        let allocations = guard.search_allocations(
            actor,
            &AllocationFilter::new()
                .for_employee(&me.id)
                .of_type(leave_type_id)
                .validated(),
        )?;
        Ok(Balance::sum(&allocations))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TimeStamp;
    use chrono::NaiveDate;

    fn leave(state: LeaveState, approved: bool) -> LeaveRequest {
        let day = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        LeaveRequest {
            id: format!("leave_{state}"),
            employee_id: "emp_a".to_string(),
            leave_type_id: "ltype_a".to_string(),
            date_from: day,
            date_to: day,
            reason: "Trip".to_string(),
            delegate_id: None,
            state,
            team_leader_approved: approved,
            approved_by: None,
            approved_at: None,
            requires_team_leader_approval: false,
            created_at: TimeStamp::new(),
        }
    }

    #[test]
    fn history_stats_bucket_by_state() {
        let leaves = vec![
            leave(LeaveState::Draft, false),
            leave(LeaveState::Confirm, false),
            leave(LeaveState::TeamLeaderApproval, false),
            leave(LeaveState::Validate, true),
            leave(LeaveState::Refuse, false),
            leave(LeaveState::Cancel, false),
        ];

        assert_eq!(
            HistoryStats::tally(&leaves),
            HistoryStats {
                total: 6,
                pending: 2,
                approved: 1,
                refused: 1,
                draft: 1,
            }
        );
    }
}
