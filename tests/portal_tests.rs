mod common;

use common::{Portal, day, details};
use leave_approval::allocation::{AllocationRequirement, AllocationState, LeaveAllocation};
use leave_approval::error::{LeaveError, RuleViolation, ValidationError};
use leave_approval::leave::LeaveState;
use leave_approval::outcome::{GENERIC_ERROR, Outcome, OutcomeLevel};
use leave_approval::provisioning::{PortalUser, UserChanges};
use leave_approval::Actor;

/// The form lists only types the employee holds validated allocations for.
#[test]
fn apply_form_lists_allocated_types_and_delegates() -> anyhow::Result<()> {
    let portal = Portal::open("apply_form")?;
    let sick = portal.leave_type("Sick", AllocationRequirement::Yes)?;
    let annual = portal.leave_type("Annual", AllocationRequirement::Yes)?;
    let unpaid = portal.leave_type("Unpaid", AllocationRequirement::No)?;
    let (lead, lead_record) = portal.enroll("Grace", None)?;
    let (member, _) = portal.enroll("Alan", Some(&lead_record))?;

    portal.grant(&lead_record, &annual, 10.0, 2.0)?;
    portal.grant(&lead_record, &annual, 5.0, 0.0)?;
    portal.grant(&lead_record, &sick, 7.0, 0.0)?;
    let pending = LeaveAllocation::granted(&lead_record.id, &unpaid.id, 3.0)?
        .with_state(AllocationState::Draft);
    portal.service.guard().create_allocation(&portal.hr, &pending)?;

    portal
        .service
        .submit(&member, details(&unpaid, day(2025, 6, 1), day(2025, 6, 1)), None)?;

    let form = portal.service.apply_form(&lead)?;

    let names: Vec<&str> = form.leave_types.iter().map(|t| t.leave_type.name.as_str()).collect();
    assert_eq!(names, vec!["Annual", "Sick"]);
    assert_eq!(form.leave_types[0].balance.total, 15.0);
    assert_eq!(form.leave_types[0].balance.used, 2.0);
    assert_eq!(form.leave_types[0].balance.remaining, 13.0);

    let delegates: Vec<&str> = form.delegates.iter().map(|d| d.name.as_str()).collect();
    assert_eq!(delegates, vec!["Alan"]);
    assert!(form.is_team_leader);
    assert_eq!(form.pending_team_count, 1);
    assert_eq!(form.employee.name, "Grace");

    let member_form = portal.service.apply_form(&member)?;
    assert!(!member_form.is_team_leader);
    assert!(member_form.leave_types.is_empty());

    Ok(())
}

#[test]
fn history_filters_but_counts_everything() -> anyhow::Result<()> {
    let portal = Portal::open("history")?;
    let casual = portal.leave_type("Casual", AllocationRequirement::No)?;
    let (actor, employee) = portal.enroll("Ada", None)?;
    portal.grant(&employee, &casual, 4.0, 1.0)?;

    let approved = portal
        .service
        .submit(&actor, details(&casual, day(2025, 6, 1), day(2025, 6, 1)), None)?;
    portal.service.hr_approve(&portal.hr, &approved.id)?;
    let cancelled = portal
        .service
        .submit(&actor, details(&casual, day(2025, 6, 2), day(2025, 6, 2)), None)?;
    portal.service.cancel(&actor, &cancelled.id)?;
    portal
        .service
        .submit(&actor, details(&casual, day(2025, 6, 3), day(2025, 6, 3)), None)?;

    let history = portal.service.history(&actor, Some(LeaveState::Validate))?;

    assert_eq!(history.leaves.len(), 1);
    assert_eq!(history.leaves[0].id, approved.id);
    assert_eq!(history.stats.total, 3);
    assert_eq!(history.stats.pending, 1);
    assert_eq!(history.stats.approved, 1);
    assert_eq!(history.stats.refused, 1);
    assert_eq!(history.stats.draft, 0);
    assert_eq!(history.allocations.len(), 1);

    let everything = portal.service.history(&actor, None)?;
    let starts: Vec<_> = everything.leaves.iter().map(|l| l.date_from).collect();
    assert_eq!(starts, vec![day(2025, 6, 3), day(2025, 6, 2), day(2025, 6, 1)]);

    Ok(())
}

#[test]
fn team_approvals_only_for_team_leaders() -> anyhow::Result<()> {
    let portal = Portal::open("team_approvals")?;
    let casual = portal.leave_type("Casual", AllocationRequirement::No)?;
    let (lead, lead_record) = portal.enroll("Grace", None)?;
    let (alan, _) = portal.enroll("Alan", Some(&lead_record))?;
    let (barbara, _) = portal.enroll("Barbara", Some(&lead_record))?;

    let first = portal
        .service
        .submit(&alan, details(&casual, day(2025, 6, 1), day(2025, 6, 2)), None)?;
    portal
        .service
        .submit(&barbara, details(&casual, day(2025, 6, 4), day(2025, 6, 4)), None)?;
    portal.service.team_leader_approve(&lead, &first.id)?;

    let queue = portal.service.team_approvals(&lead)?;
    assert_eq!(queue.pending.len(), 1);
    assert_eq!(queue.all.len(), 2);
    assert_eq!(queue.stats.pending, 1);
    assert_eq!(queue.stats.approved, 1);
    assert_eq!(queue.stats.team_members, 2);
    let members: Vec<&str> = queue.members.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(members, vec!["Alan", "Barbara"]);

    assert!(matches!(
        portal.service.team_approvals(&alan),
        Err(LeaveError::Rule(RuleViolation::NotATeamLeader))
    ));

    Ok(())
}

#[test]
fn balance_sums_validated_allocations() -> anyhow::Result<()> {
    let portal = Portal::open("balance")?;
    let annual = portal.leave_type("Annual", AllocationRequirement::Yes)?;
    let sick = portal.leave_type("Sick", AllocationRequirement::Yes)?;
    let (actor, employee) = portal.enroll("Ada", None)?;
    portal.grant(&employee, &annual, 12.0, 4.5)?;
    portal.grant(&employee, &annual, 3.0, 0.0)?;

    let balance = portal.service.balance(&actor, &annual.id)?;
    assert_eq!(balance.total, 15.0);
    assert_eq!(balance.used, 4.5);
    assert_eq!(balance.remaining, 10.5);

    let none = portal.service.balance(&actor, &sick.id)?;
    assert_eq!(none.total, 0.0);
    assert_eq!(none.remaining, 0.0);

    Ok(())
}

#[test]
fn portal_account_gets_employee_on_creation() -> anyhow::Result<()> {
    let portal = Portal::open("user_created")?;
    let provisioner = portal.service.provisioner();
    let user = PortalUser::new("Ada Lovelace", "ada@example.com")?.with_phone("+44 20 7946 0000");

    let employee = provisioner
        .on_user_created(&user)
        .expect("portal user gets an employee");
    assert_eq!(employee.user_id.as_deref(), Some(user.id.as_str()));
    assert_eq!(employee.work_email.as_deref(), Some("ada@example.com"));
    assert_eq!(employee.work_phone.as_deref(), Some("+44 20 7946 0000"));
    assert!(employee.active);

    // second call is a no-op
    assert!(provisioner.on_user_created(&user).is_none());
    // internal accounts are ignored
    let internal = PortalUser::new("Staff", "staff@example.com")?.internal();
    assert!(provisioner.on_user_created(&internal).is_none());
    assert_eq!(portal.service.store().employees.count(|_| true)?, 1);

    // the new employee can use the portal straight away
    let actor = Actor::portal(&user.id);
    assert_eq!(portal.service.guard().require_employee(&actor)?.id, employee.id);

    Ok(())
}

#[test]
fn account_changes_sync_to_employee() -> anyhow::Result<()> {
    let portal = Portal::open("user_updated")?;
    let provisioner = portal.service.provisioner();
    let user = PortalUser::new("Ada", "ada@example.com")?.with_email("ada@work.example.com");
    let employee = provisioner.on_user_created(&user).expect("created");
    assert_eq!(employee.work_email.as_deref(), Some("ada@work.example.com"));

    let changes = UserChanges {
        name: Some("Ada King".to_string()),
        login: Some("ada.king@example.com".to_string()),
        ..UserChanges::default()
    };
    let synced = provisioner.on_user_updated(&user, &changes).expect("synced");

    assert_eq!(synced.name, "Ada King");
    assert_eq!(synced.work_email.as_deref(), Some("ada.king@example.com"));
    assert_eq!(portal.service.store().employees.read(&employee.id)?, synced);

    assert!(provisioner.on_user_updated(&user, &UserChanges::default()).is_none());

    Ok(())
}

#[test]
fn staff_create_employee_for_portal_user() -> anyhow::Result<()> {
    let portal = Portal::open("create_employee_for")?;
    let provisioner = portal.service.provisioner();
    let user = PortalUser::new("Grace", "grace@example.com")?;

    assert!(matches!(
        provisioner.create_employee_for(&Actor::portal(&user.id), &user),
        Err(LeaveError::AccessDenied(_))
    ));

    let employee = provisioner.create_employee_for(&portal.hr, &user)?;
    assert_eq!(employee.name, "Grace");

    assert!(matches!(
        provisioner.create_employee_for(&portal.hr, &user),
        Err(LeaveError::Rule(RuleViolation::EmployeeExists))
    ));
    let internal = PortalUser::new("Staff", "staff@example.com")?.internal();
    assert!(matches!(
        provisioner.create_employee_for(&portal.hr, &internal),
        Err(LeaveError::Rule(RuleViolation::NotPortalUser))
    ));

    Ok(())
}

#[test]
fn bulk_link_reports_created_and_errors() -> anyhow::Result<()> {
    let portal = Portal::open("bulk_link")?;
    let provisioner = portal.service.provisioner();
    let linked = PortalUser::new("Alan", "alan@example.com")?;
    provisioner.on_user_created(&linked).expect("created");
    let fresh = PortalUser::new("Barbara", "barbara@example.com")?;

    assert!(matches!(
        provisioner.link_portal_users(&portal.hr, &[]),
        Err(LeaveError::Validation(ValidationError::NoUsersSelected))
    ));

    let report = provisioner.link_portal_users(&portal.hr, &[linked, fresh])?;

    assert!(report.is_success());
    assert_eq!(report.created.len(), 1);
    assert_eq!(report.created[0].name, "Barbara");
    assert_eq!(report.errors, vec!["Alan already has an employee record".to_string()]);
    assert_eq!(
        report.message(),
        "Successfully created 1 employee record(s).\n\nErrors (1):\nAlan already has an employee record"
    );

    Ok(())
}

#[test]
fn outcomes_for_portal_pages() -> anyhow::Result<()> {
    let portal = Portal::open("outcomes")?;
    let casual = portal.leave_type("Casual", AllocationRequirement::No)?;
    let (actor, _) = portal.enroll("Ada", None)?;

    let result = portal
        .service
        .submit(&actor, details(&casual, day(2025, 6, 5), day(2025, 6, 1)), None);
    let outcome = Outcome::report(&result, |_| unreachable!());
    assert_eq!(outcome.level, OutcomeLevel::Error);
    assert_eq!(outcome.message, "Start date cannot be after end date");

    let stranger = Actor::portal("user_nobody");
    let denied = Outcome::from_error(&portal.service.apply_form(&stranger).unwrap_err());
    assert_eq!(
        denied.message,
        "Access denied: No employee record found for your account. Please contact HR."
    );
    assert_ne!(denied.message, GENERIC_ERROR);

    Ok(())
}
