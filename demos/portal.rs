//! Walks one leave request through the portal: provisioning, submission,
//! team leader approval and HR validation.
//!
//! Uses `LEAVE_DB_PATH` when set, otherwise a throwaway database.

use anyhow::Context;
use chrono::Duration;
use leave_approval::allocation::{AllocationRequirement, LeaveAllocation, LeaveType};
use leave_approval::attachment::Attachment;
use leave_approval::config::PortalConfig;
use leave_approval::employee::EmployeeUpdate;
use leave_approval::leave::LeaveRequestDetails;
use leave_approval::outcome::Outcome;
use leave_approval::provisioning::PortalUser;
use leave_approval::types::{Clock, SystemClock};
use leave_approval::{Actor, LeaveService};
use std::sync::Arc;
use tempfile::tempdir;
use tracing::info;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_target(false)
        .init();

    let config = PortalConfig::from_env()?;
    let temp_dir = tempdir()?;
    let db = if std::env::var_os("LEAVE_DB_PATH").is_some() {
        config.open_db()?
    } else {
        Arc::new(sled::open(temp_dir.path().join("portal_demo.db"))?)
    };
    let service = LeaveService::new(db, config)?;
    let hr = Actor::staff("user_hr_admin");

    // accounts arrive from the identity system
    let provisioner = service.provisioner();
    let grace = PortalUser::new("Grace Hopper", "grace@example.com")?;
    let alan = PortalUser::new("Alan Turing", "alan@example.com")?;
    let report = provisioner.link_portal_users(&hr, &[grace.clone(), alan.clone()])?;
    info!("{}", report.message());

    let guard = service.guard();
    let lead = guard
        .resolve_employee(&Actor::portal(&grace.id))?
        .context("grace has no employee record")?;
    let member = guard
        .resolve_employee(&Actor::portal(&alan.id))?
        .context("alan has no employee record")?;
    guard.write_employee(&hr, &member.id, EmployeeUpdate::new().set_team_leader(Some(lead.id.as_str())))?;

    let annual = LeaveType::new("Annual Leave", AllocationRequirement::Yes)?;
    service.store().leave_types.create(&annual)?;
    guard.create_allocation(&hr, &LeaveAllocation::granted(&member.id, &annual.id, 10.0)?)?;

    let alan_actor = Actor::portal(&alan.id);
    let grace_actor = Actor::portal(&grace.id);

    let form = service.apply_form(&alan_actor)?;
    for entry in &form.leave_types {
        info!(
            leave_type = %entry.leave_type.name,
            remaining = entry.balance.remaining,
            "available leave"
        );
    }

    let start = SystemClock.today() + Duration::days(14);
    let details = LeaveRequestDetails::new()
        .set_dates(start, start + Duration::days(2))
        .set_leave_type(&annual.id)
        .set_reason("Family trip")
        .set_delegate(&lead.id);
    let result = service.submit(
        &alan_actor,
        details,
        Some(Attachment::new("itinerary.pdf", b"%PDF-1.7".to_vec())),
    );
    let outcome = match &result {
        Ok(leave) => Outcome::submitted(leave),
        Err(e) => Outcome::from_error(e),
    };
    info!(success = outcome.is_success(), "{}", outcome.message);
    let leave = result?;

    // too many days for the remaining balance
    let greedy = LeaveRequestDetails::new()
        .set_dates(start + Duration::days(30), start + Duration::days(45))
        .set_leave_type(&annual.id)
        .set_reason("Sabbatical");
    let refused = service.submit(&alan_actor, greedy, None);
    info!("{}", Outcome::report(&refused, |l| l.id.clone()).message);

    let queue = service.team_approvals(&grace_actor)?;
    info!(pending = queue.stats.pending, "team queue");

    let leave = service.team_leader_approve(&grace_actor, &leave.id)?;
    info!(state = %leave.state, "after team leader");

    let leave = service.hr_approve(&hr, &leave.id)?;
    info!(state = %leave.state, "after hr");

    let history = service.history(&alan_actor, None)?;
    info!(
        total = history.stats.total,
        approved = history.stats.approved,
        "history"
    );

    service.store().flush()?;
    Ok(())
}
