//! Row-level visibility and mutation rules for leave, allocation and
//! employee records.
//!
//! Every call re-resolves the actor's employee record and re-reads the rows
//! it decides on. Nothing is cached between calls: team assignments and
//! request states can change at any time.
use super::actor::{Actor, Role};
use super::allocation::LeaveAllocation;
use super::employee::{Employee, EmployeeUpdate, EmployeeView};
use super::error::{LeaveError, RuleViolation, ValidationError};
use super::leave::{LeaveField, LeaveRequest, LeaveState, LeaveUpdate};
use super::store::LeaveStore;
use std::collections::HashSet;
use tracing::{info, warn};

/// Which employees' rows an actor may see.
#[derive(Debug, Clone, PartialEq)]
pub enum Visibility {
    All,
    Nothing,
    Employees(HashSet<String>),
}

impl Visibility {
    pub fn admits(&self, employee_id: &str) -> bool {
        match self {
            Visibility::All => true,
            Visibility::Nothing => false,
            Visibility::Employees(ids) => ids.contains(employee_id),
        }
    }
}

/// Query over leave requests. Results are ordered by start date, newest
/// first, then by id descending.
#[derive(Debug, Clone, Default)]
pub struct LeaveFilter {
    pub employee_id: Option<String>,
    /// Only requests of employees whose portal team leader is this employee.
    pub led_by: Option<String>,
    pub state: Option<LeaveState>,
    pub limit: Option<usize>,
    pub offset: usize,
}

impl LeaveFilter {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn for_employee(mut self, employee_id: &str) -> Self {
        self.employee_id = Some(employee_id.to_string());
        self
    }
    pub fn led_by(mut self, leader_id: &str) -> Self {
        self.led_by = Some(leader_id.to_string());
        self
    }
    pub fn in_state(mut self, state: LeaveState) -> Self {
        self.state = Some(state);
        self
    }
    pub fn page(mut self, limit: usize, offset: usize) -> Self {
        self.limit = Some(limit);
        self.offset = offset;
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct AllocationFilter {
    pub employee_id: Option<String>,
    pub leave_type_id: Option<String>,
    pub validated_only: bool,
}

impl AllocationFilter {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn for_employee(mut self, employee_id: &str) -> Self {
        self.employee_id = Some(employee_id.to_string());
        self
    }
    pub fn of_type(mut self, leave_type_id: &str) -> Self {
        self.leave_type_id = Some(leave_type_id.to_string());
        self
    }
    pub fn validated(mut self) -> Self {
        self.validated_only = true;
        self
    }

    fn matches(&self, allocation: &LeaveAllocation) -> bool {
        self.employee_id
            .as_deref()
            .is_none_or(|id| allocation.employee_id == id)
            && self
                .leave_type_id
                .as_deref()
                .is_none_or(|id| allocation.leave_type_id == id)
            && (!self.validated_only || allocation.is_validated())
    }
}

pub struct Guard<'a> {
    store: &'a LeaveStore,
}

impl<'a> Guard<'a> {
    pub fn new(store: &'a LeaveStore) -> Self {
        Self { store }
    }

    fn deny(&self, actor: &Actor, reason: &str) -> LeaveError {
        warn!(user = %actor.user_id, reason, "access denied");
        LeaveError::denied(reason)
    }

    /// The active employee linked to the actor's account, if any.
    pub fn resolve_employee(&self, actor: &Actor) -> Result<Option<Employee>, LeaveError> {
        Ok(self
            .store
            .employees
            .find_one(|e| e.active && e.user_id.as_deref() == Some(actor.user_id.as_str()))?)
    }

    pub fn require_employee(&self, actor: &Actor) -> Result<Employee, LeaveError> {
        self.resolve_employee(actor)?.ok_or_else(|| {
            self.deny(
                actor,
                "No employee record found for your account. Please contact HR.",
            )
        })
    }

    fn team_of(&self, leader_id: &str) -> Result<Vec<Employee>, LeaveError> {
        Ok(self.store.employees.find(|e| e.is_led_by(leader_id))?)
    }

    /// Own rows plus the rows of every employee this actor leads.
    pub fn leave_visibility(&self, actor: &Actor) -> Result<Visibility, LeaveError> {
        if actor.role == Role::Privileged {
            return Ok(Visibility::All);
        }
        let Some(me) = self.resolve_employee(actor)? else {
            return Ok(Visibility::Nothing);
        };
        let mut ids: HashSet<String> = self.team_of(&me.id)?.into_iter().map(|e| e.id).collect();
        ids.insert(me.id);
        Ok(Visibility::Employees(ids))
    }

    /// Own rows only.
    pub fn allocation_visibility(&self, actor: &Actor) -> Result<Visibility, LeaveError> {
        if actor.role == Role::Privileged {
            return Ok(Visibility::All);
        }
        Ok(match self.resolve_employee(actor)? {
            Some(me) => Visibility::Employees(HashSet::from([me.id])),
            None => Visibility::Nothing,
        })
    }

    // ---- leave requests

    pub fn search_leaves(
        &self,
        actor: &Actor,
        filter: &LeaveFilter,
    ) -> Result<Vec<LeaveRequest>, LeaveError> {
        let visibility = self.leave_visibility(actor)?;
        if visibility == Visibility::Nothing {
            return Ok(Vec::new());
        }
        let team: Option<HashSet<String>> = match filter.led_by.as_deref() {
            Some(leader) => Some(self.team_of(leader)?.into_iter().map(|e| e.id).collect()),
            None => None,
        };

        Ok(self.store.leaves.find_ordered(
            |leave| {
                visibility.admits(&leave.employee_id)
                    && filter
                        .employee_id
                        .as_deref()
                        .is_none_or(|id| leave.employee_id == id)
                    && team
                        .as_ref()
                        .is_none_or(|team| team.contains(&leave.employee_id))
                    && filter.state.is_none_or(|state| leave.state == state)
            },
            |a, b| b.date_from.cmp(&a.date_from).then_with(|| b.id.cmp(&a.id)),
            filter.limit,
            filter.offset,
        )?)
    }

    pub fn read_leave(&self, actor: &Actor, leave_id: &str) -> Result<LeaveRequest, LeaveError> {
        let leave = self.store.leaves.read(leave_id)?;
        if !self.leave_visibility(actor)?.admits(&leave.employee_id) {
            return Err(self.deny(
                actor,
                "You can only view your own leave requests or your team members' requests.",
            ));
        }
        Ok(leave)
    }

    pub fn authorize_leave_create(&self, actor: &Actor, employee_id: &str) -> Result<(), LeaveError> {
        if actor.role == Role::Privileged {
            return Ok(());
        }
        let me = self.require_employee(actor)?;
        if me.id != employee_id {
            return Err(self.deny(actor, "You can only request leave for yourself."));
        }
        Ok(())
    }

    /// Decides whether `actor` may apply `update` to `leave` as it is now.
    pub fn authorize_leave_write(
        &self,
        actor: &Actor,
        leave: &LeaveRequest,
        update: &LeaveUpdate,
    ) -> Result<(), LeaveError> {
        if actor.role == Role::Privileged {
            return Ok(());
        }
        let me = self.require_employee(actor)?;
        let fields = update.fields();

        let requester = self.store.employees.get(&leave.employee_id)?;
        if requester.as_ref().is_some_and(|r| r.is_led_by(&me.id)) {
            if !fields.iter().all(|f| LeaveField::TEAM_LEADER.contains(f)) {
                return Err(self.deny(actor, "Team leaders can only approve or refuse leave requests."));
            }
            if leave.state != LeaveState::TeamLeaderApproval {
                return Err(self.deny(actor, "This leave is not pending your approval."));
            }
            // team_leader_approval -> confirm (approved) or refuse, nothing else
            let decided = match update.state {
                Some(LeaveState::Confirm) => update.team_leader_approved == Some(true),
                Some(LeaveState::Refuse) => update.team_leader_approved != Some(true),
                _ => false,
            };
            if !decided {
                return Err(self.deny(actor, "Team leaders can only approve or refuse leave requests."));
            }
            return Ok(());
        }

        if leave.employee_id != me.id {
            return Err(self.deny(actor, "You can only modify your own leave requests."));
        }
        if !leave.state.is_open() {
            return Err(self.deny(actor, "You cannot modify approved or refused leave requests."));
        }
        if fields.iter().any(|f| f.is_approval_field()) {
            return Err(self.deny(actor, "You cannot approve your own leave requests."));
        }
        // dates, type and delegate are fixed once submitted
        if fields.iter().any(|f| !LeaveField::REQUESTER.contains(f)) {
            return Err(self.deny(
                actor,
                "To change dates, leave type or delegate, cancel this request and submit a new one.",
            ));
        }
        if update.state.is_some_and(|s| s != LeaveState::Refuse) {
            return Err(self.deny(actor, "You can only cancel your own leave requests."));
        }
        Ok(())
    }

    /// Re-reads the row, authorizes, applies and persists the update.
    pub fn write_leave(
        &self,
        actor: &Actor,
        leave_id: &str,
        update: LeaveUpdate,
    ) -> Result<LeaveRequest, LeaveError> {
        let mut leave = self.store.leaves.read(leave_id)?;
        self.authorize_leave_write(actor, &leave, &update)?;

        update.apply_to(&mut leave);
        leave.validate()?;
        self.store.leaves.write(&leave)?;
        Ok(leave)
    }

    /// Hard delete. Portal actors must cancel instead; staff may only
    /// remove requests that never left draft or were cancelled.
    pub fn delete_leave(&self, actor: &Actor, leave_id: &str) -> Result<(), LeaveError> {
        if actor.role == Role::Restricted {
            return Err(self.deny(
                actor,
                "Portal users cannot delete leave requests. Please cancel instead.",
            ));
        }
        let leave = self.store.leaves.read(leave_id)?;
        if !leave.state.allows_delete() {
            return Err(RuleViolation::DeleteNotAllowed(leave.state).into());
        }
        self.store.delete_leave(&leave.id)?;
        info!(user = %actor.user_id, leave = %leave.id, "leave request deleted");
        Ok(())
    }

    // ---- allocations

    pub fn search_allocations(
        &self,
        actor: &Actor,
        filter: &AllocationFilter,
    ) -> Result<Vec<LeaveAllocation>, LeaveError> {
        let visibility = self.allocation_visibility(actor)?;
        if visibility == Visibility::Nothing {
            return Ok(Vec::new());
        }
        Ok(self
            .store
            .allocations
            .find(|a| visibility.admits(&a.employee_id) && filter.matches(a))?)
    }

    pub fn read_allocation(
        &self,
        actor: &Actor,
        allocation_id: &str,
    ) -> Result<LeaveAllocation, LeaveError> {
        let allocation = self.store.allocations.read(allocation_id)?;
        if !self.allocation_visibility(actor)?.admits(&allocation.employee_id) {
            return Err(self.deny(actor, "You can only view your own leave allocations."));
        }
        Ok(allocation)
    }

    pub fn create_allocation(
        &self,
        actor: &Actor,
        allocation: &LeaveAllocation,
    ) -> Result<(), LeaveError> {
        if actor.role == Role::Restricted {
            return Err(self.deny(actor, "Portal users cannot create leave allocations."));
        }
        self.store.employees.read(&allocation.employee_id)?;
        self.store.leave_types.read(&allocation.leave_type_id)?;
        self.store.allocations.create(allocation)?;
        Ok(())
    }

    pub fn write_allocation(
        &self,
        actor: &Actor,
        allocation: &LeaveAllocation,
    ) -> Result<(), LeaveError> {
        if actor.role == Role::Restricted {
            return Err(self.deny(actor, "Portal users cannot modify leave allocations."));
        }
        self.store.allocations.write(allocation)?;
        Ok(())
    }

    pub fn delete_allocation(&self, actor: &Actor, allocation_id: &str) -> Result<(), LeaveError> {
        if actor.role == Role::Restricted {
            return Err(self.deny(actor, "Portal users cannot delete leave allocations."));
        }
        if !self.store.allocations.delete(allocation_id)? {
            return Err(LeaveError::NotFound {
                entity: "allocations",
                id: allocation_id.to_string(),
            });
        }
        Ok(())
    }

    // ---- employees

    /// Public views of employees, sorted by name. Portal actors see active
    /// employees only, and only once they have an employee record themselves.
    pub fn search_employees(&self, actor: &Actor) -> Result<Vec<EmployeeView>, LeaveError> {
        let active_only = match actor.role {
            Role::Privileged => false,
            Role::Restricted => {
                if self.resolve_employee(actor)?.is_none() {
                    return Ok(Vec::new());
                }
                true
            }
        };
        let employees = self.store.employees.find_ordered(
            |e| !active_only || e.active,
            |a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)),
            None,
            0,
        )?;
        Ok(employees.iter().map(Employee::view).collect())
    }

    pub fn read_employee_view(
        &self,
        actor: &Actor,
        employee_id: &str,
    ) -> Result<EmployeeView, LeaveError> {
        let employee = self.store.employees.read(employee_id)?;
        if actor.role == Role::Restricted
            && (!employee.active || self.resolve_employee(actor)?.is_none())
        {
            return Err(self.deny(actor, "You cannot view this employee."));
        }
        Ok(employee.view())
    }

    /// The full record, including compensation. Staff only.
    pub fn read_employee(&self, actor: &Actor, employee_id: &str) -> Result<Employee, LeaveError> {
        if actor.role == Role::Restricted {
            return Err(self.deny(actor, "Portal users cannot read full employee records."));
        }
        Ok(self.store.employees.read(employee_id)?)
    }

    /// Active employees led by the actor, as public views.
    pub fn team_members(&self, actor: &Actor) -> Result<Vec<EmployeeView>, LeaveError> {
        let Some(me) = self.resolve_employee(actor)? else {
            return Ok(Vec::new());
        };
        let mut team: Vec<Employee> = self.team_of(&me.id)?.into_iter().filter(|e| e.active).collect();
        team.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(team.iter().map(Employee::view).collect())
    }

    fn check_team_leader(&self, employee: &Employee) -> Result<(), LeaveError> {
        employee.validate()?;
        if let Some(leader_id) = employee.portal_team_leader_id.as_deref() {
            if self.store.employees.get(leader_id)?.is_none() {
                return Err(ValidationError::UnknownTeamLeader(leader_id.to_string()).into());
            }
        }
        Ok(())
    }

    pub fn create_employee(&self, actor: &Actor, employee: &Employee) -> Result<(), LeaveError> {
        if actor.role == Role::Restricted {
            return Err(self.deny(actor, "Portal users cannot create employee records."));
        }
        self.check_team_leader(employee)?;
        self.store.employees.create(employee)?;
        info!(user = %actor.user_id, employee = %employee.id, "employee created");
        Ok(())
    }

    pub fn write_employee(
        &self,
        actor: &Actor,
        employee_id: &str,
        update: EmployeeUpdate,
    ) -> Result<Employee, LeaveError> {
        if actor.role == Role::Restricted {
            return Err(self.deny(actor, "Portal users cannot modify employee records."));
        }
        let mut employee = self.store.employees.read(employee_id)?;
        if update.is_empty() {
            return Ok(employee);
        }
        update.apply_to(&mut employee);
        self.check_team_leader(&employee)?;
        self.store.employees.write(&employee)?;
        Ok(employee)
    }

    pub fn delete_employee(&self, actor: &Actor, employee_id: &str) -> Result<(), LeaveError> {
        if actor.role == Role::Restricted {
            return Err(self.deny(actor, "Portal users cannot delete employee records."));
        }
        if !self.store.employees.delete(employee_id)? {
            return Err(LeaveError::NotFound {
                entity: "employees",
                id: employee_id.to_string(),
            });
        }
        Ok(())
    }
}
