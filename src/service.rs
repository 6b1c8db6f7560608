//! Service layer API for the leave request lifecycle
use super::actor::Actor;
use super::allocation::Balance;
use super::attachment::{Attachment, StoredAttachment};
use super::config::PortalConfig;
use super::error::{LeaveError, RuleViolation, ValidationError};
use super::guard::Guard;
use super::leave::{LeaveRequest, LeaveRequestDetails, LeaveState, LeaveUpdate};
use super::store::LeaveStore;
use super::types::{Clock, SystemClock};
use super::utils::{self, LEAVE_HRP};
use std::sync::{Arc, Mutex};
use tracing::{error, info, warn};

pub struct LeaveService {
    store: LeaveStore,
    config: PortalConfig,
    clock: Box<dyn Clock>,
    // overlap check and insert must not interleave within this process
    submissions: Mutex<()>,
}

impl LeaveService {
    pub fn new(instance: Arc<sled::Db>, config: PortalConfig) -> Result<Self, LeaveError> {
        Ok(Self {
            store: LeaveStore::open(instance)?,
            config,
            clock: Box::new(SystemClock),
            submissions: Mutex::new(()),
        })
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn store(&self) -> &LeaveStore {
        &self.store
    }

    pub fn config(&self) -> &PortalConfig {
        &self.config
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    /// A fresh guard; role and visibility are worked out again on every call.
    pub fn guard(&self) -> Guard<'_> {
        Guard::new(&self.store)
    }

    /// Submit a leave request for the actor's own employee record.
    ///
    /// The request starts in `team_leader_approval` when the requester has a
    /// portal team leader, otherwise in `confirm`. The attachment is checked
    /// before anything is written; request and attachment commit together.
    pub fn submit(
        &self,
        actor: &Actor,
        details: LeaveRequestDetails,
        attachment: Option<Attachment>,
    ) -> Result<LeaveRequest, LeaveError> {
        let guard = self.guard();
        let employee = guard.require_employee(actor)?;
        guard.authorize_leave_create(actor, &employee.id)?;

        let details = details.validate(self.clock.today())?;

        let leave_type = self
            .store
            .leave_types
            .get(&details.leave_type_id)?
            .filter(|t| t.active)
            .ok_or_else(|| ValidationError::UnknownLeaveType(details.leave_type_id.clone()))?;

        if let Some(delegate_id) = details.delegate_id.as_deref() {
            if delegate_id == employee.id {
                return Err(ValidationError::SelfDelegation.into());
            }
            let delegate = self.store.employees.get(delegate_id)?;
            if !delegate.is_some_and(|d| d.active) {
                return Err(ValidationError::UnknownDelegate(delegate_id.to_string()).into());
            }
        }

        let _submission = self
            .submissions
            .lock()
            .map_err(|_| anyhow::anyhow!("submission lock poisoned"))?;

        let overlapping = self.store.leaves.find_one(|l| {
            l.employee_id == employee.id
                && l.state.blocks_dates()
                && l.overlaps(details.date_from, details.date_to)
        })?;
        if let Some(existing) = overlapping {
            return Err(RuleViolation::Overlap {
                existing: existing.id,
            }
            .into());
        }

        let requested_days = details.requested_days();
        if leave_type.needs_balance() {
            let allocations = self
                .store
                .allocations
                .find(|a| a.counts_toward(&employee.id, &leave_type.id))?;
            if allocations.is_empty() {
                return Err(RuleViolation::NoAllocation.into());
            }
            let balance = Balance::sum(&allocations);
            if !balance.covers(requested_days) {
                return Err(RuleViolation::InsufficientBalance {
                    remaining: balance.remaining,
                    requested: requested_days,
                }
                .into());
            }
        }

        let state = if employee.has_team_leader() {
            LeaveState::TeamLeaderApproval
        } else {
            LeaveState::Confirm
        };

        let upload = attachment.filter(Attachment::is_present);
        if let Some(Err(e)) = upload.as_ref().map(|u| u.validate(&self.config)) {
            warn!(employee = %employee.id, error = %e, "attachment rejected");
            return Err(e.into());
        }

        let leave = LeaveRequest {
            id: utils::new_uuid_to_bech32(LEAVE_HRP)?,
            employee_id: employee.id.clone(),
            leave_type_id: leave_type.id.clone(),
            date_from: details.date_from,
            date_to: details.date_to,
            reason: details.reason,
            delegate_id: details.delegate_id,
            state,
            team_leader_approved: false,
            approved_by: None,
            approved_at: None,
            requires_team_leader_approval: employee.has_team_leader(),
            created_at: self.clock.now(),
        };
        let stored = upload
            .map(|upload| StoredAttachment::from_upload(&leave.id, upload, self.clock.now()))
            .transpose()?;
        self.store.create_leave(&leave, stored.as_ref())?;

        info!(
            leave = %leave.id,
            employee = %employee.id,
            state = %leave.state,
            days = requested_days,
            "leave request submitted"
        );
        Ok(leave)
    }

    /// Checks the actor is the requester's team leader and the request is
    /// waiting on them.
    fn check_team_leader(&self, actor: &Actor, leave: &LeaveRequest) -> Result<(), LeaveError> {
        let me = self.guard().require_employee(actor)?;
        let requester = self.store.employees.read(&leave.employee_id)?;

        let Some(leader_id) = requester.portal_team_leader_id.as_deref() else {
            return Err(RuleViolation::NoTeamLeader.into());
        };
        if leader_id != me.id {
            warn!(
                user = %actor.user_id,
                leave = %leave.id,
                "team leader action attempted by someone else"
            );
            return Err(RuleViolation::NotTeamLeader.into());
        }
        if leave.state != LeaveState::TeamLeaderApproval {
            return Err(RuleViolation::WrongState {
                actual: leave.state,
                expected: vec![LeaveState::TeamLeaderApproval],
            }
            .into());
        }
        Ok(())
    }

    /// Team leader approval: `team_leader_approval` -> `confirm`.
    pub fn team_leader_approve(&self, actor: &Actor, leave_id: &str) -> Result<LeaveRequest, LeaveError> {
        let guard = self.guard();
        let leave = guard.read_leave(actor, leave_id)?;
        self.check_team_leader(actor, &leave)?;

        let update = LeaveUpdate::new()
            .set_state(LeaveState::Confirm)
            .set_team_leader_approved(true)
            .set_approved_by(&actor.user_id)
            .set_approved_at(self.clock.now());
        let leave = guard.write_leave(actor, leave_id, update)?;

        info!(leave = %leave.id, user = %actor.user_id, "leave approved by team leader");
        Ok(leave)
    }

    /// Team leader refusal: `team_leader_approval` -> `refuse`.
    pub fn team_leader_refuse(&self, actor: &Actor, leave_id: &str) -> Result<LeaveRequest, LeaveError> {
        let guard = self.guard();
        let leave = guard.read_leave(actor, leave_id)?;
        self.check_team_leader(actor, &leave)?;

        let leave = guard.write_leave(actor, leave_id, LeaveUpdate::new().set_state(LeaveState::Refuse))?;

        info!(leave = %leave.id, user = %actor.user_id, "leave refused by team leader");
        Ok(leave)
    }

    /// Requester withdraws an open request. Cancelling is a soft transition
    /// to `refuse`; the row is kept.
    pub fn cancel(&self, actor: &Actor, leave_id: &str) -> Result<LeaveRequest, LeaveError> {
        let guard = self.guard();
        let me = guard.require_employee(actor)?;
        let leave = guard.read_leave(actor, leave_id)?;

        if leave.employee_id != me.id {
            return Err(RuleViolation::NotRequester.into());
        }
        if !leave.state.is_open() {
            return Err(RuleViolation::WrongState {
                actual: leave.state,
                expected: LeaveState::OPEN.to_vec(),
            }
            .into());
        }

        let leave = guard.write_leave(actor, leave_id, LeaveUpdate::new().set_state(LeaveState::Refuse))?;

        info!(leave = %leave.id, user = %actor.user_id, "leave cancelled by requester");
        Ok(leave)
    }

    /// Final HR validation: `confirm` -> `validate`. Staff only. Balance
    /// consumption belongs to the HR workflow and is not touched here.
    pub fn hr_approve(&self, actor: &Actor, leave_id: &str) -> Result<LeaveRequest, LeaveError> {
        if !actor.is_privileged() {
            warn!(user = %actor.user_id, leave = leave_id, "hr approval attempted by portal user");
            return Err(LeaveError::denied("Only HR staff can validate leave requests."));
        }
        let leave = self.store.leaves.read(leave_id)?;
        if leave.state != LeaveState::Confirm {
            return Err(RuleViolation::WrongState {
                actual: leave.state,
                expected: vec![LeaveState::Confirm],
            }
            .into());
        }

        let leave = self
            .guard()
            .write_leave(actor, leave_id, LeaveUpdate::new().set_state(LeaveState::Validate))?;

        info!(leave = %leave.id, user = %actor.user_id, "leave validated by hr");
        Ok(leave)
    }

    pub fn delete(&self, actor: &Actor, leave_id: &str) -> Result<(), LeaveError> {
        self.guard().delete_leave(actor, leave_id)
    }

    /// Attachments of a request the actor is allowed to see.
    pub fn attachments(&self, actor: &Actor, leave_id: &str) -> Result<Vec<StoredAttachment>, LeaveError> {
        let leave = self.guard().read_leave(actor, leave_id)?;
        let attachments = self.store.attachments.find(|a| a.leave_id == leave.id)?;
        for attachment in attachments.iter().filter(|a| !a.verify()) {
            error!(attachment = %attachment.id, leave = %leave.id, "attachment checksum mismatch");
        }
        Ok(attachments)
    }
}
