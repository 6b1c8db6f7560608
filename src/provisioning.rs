//! Keeps portal user accounts and employee records linked.
//!
//! Writes issued here are system writes: they go straight to the store and
//! are not subject to the portal guard.
use super::actor::Actor;
use super::employee::Employee;
use super::error::{LeaveError, RuleViolation};
use super::service::LeaveService;
use super::store::LeaveStore;
use super::utils::{self, USER_HRP};
use tracing::{error, info, warn};

/// A user account as the surrounding application knows it.
#[derive(Debug, Clone, PartialEq)]
pub struct PortalUser {
    pub id: String,
    pub name: String,
    pub login: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub portal: bool,
    pub active: bool,
}

impl PortalUser {
    pub fn new(name: &str, login: &str) -> anyhow::Result<Self> {
        Ok(Self {
            id: utils::new_uuid_to_bech32(USER_HRP)?,
            name: name.to_string(),
            login: login.to_string(),
            email: None,
            phone: None,
            portal: true,
            active: true,
        })
    }
    pub fn with_email(mut self, email: &str) -> Self {
        self.email = Some(email.to_string());
        self
    }
    pub fn with_phone(mut self, phone: &str) -> Self {
        self.phone = Some(phone.to_string());
        self
    }
    /// An internal (non-portal) account.
    pub fn internal(mut self) -> Self {
        self.portal = false;
        self
    }

    fn contact_email(&self) -> String {
        self.email.clone().unwrap_or_else(|| self.login.clone())
    }
}

/// Account fields that changed in an update.
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub name: Option<String>,
    pub login: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

/// Result of a bulk link run.
#[derive(Debug, Default)]
pub struct LinkReport {
    pub created: Vec<Employee>,
    pub errors: Vec<String>,
}

impl LinkReport {
    pub fn is_success(&self) -> bool {
        !self.created.is_empty()
    }

    pub fn message(&self) -> String {
        let mut message = format!(
            "Successfully created {} employee record(s).",
            self.created.len()
        );
        if !self.errors.is_empty() {
            message.push_str(&format!(
                "\n\nErrors ({}):\n{}",
                self.errors.len(),
                self.errors.join("\n")
            ));
        }
        message
    }
}

pub struct Provisioner<'a> {
    store: &'a LeaveStore,
}

impl LeaveService {
    pub fn provisioner(&self) -> Provisioner<'_> {
        Provisioner {
            store: self.store(),
        }
    }
}

impl<'a> Provisioner<'a> {
    fn employee_for(&self, user_id: &str) -> Result<Option<Employee>, LeaveError> {
        Ok(self
            .store
            .employees
            .find_one(|e| e.user_id.as_deref() == Some(user_id))?)
    }

    fn create_linked(&self, user: &PortalUser) -> Result<Employee, LeaveError> {
        let mut employee = Employee::new(&user.name)?
            .with_user(&user.id)
            .with_work_email(&user.contact_email());
        employee.work_phone = user.phone.clone();
        self.store.employees.create(&employee)?;
        Ok(employee)
    }

    /// Called after an account is created. Portal users get an employee
    /// record if they have none; failures are logged, never raised.
    pub fn on_user_created(&self, user: &PortalUser) -> Option<Employee> {
        if !user.portal {
            return None;
        }
        let created = match self.employee_for(&user.id) {
            Ok(Some(_)) => return None,
            Ok(None) => self.create_linked(user),
            Err(e) => Err(e),
        };
        match created {
            Ok(employee) => {
                info!(employee = %employee.id, login = %user.login, "auto-created employee for portal user");
                Some(employee)
            }
            Err(e) => {
                error!(login = %user.login, error = %e, "failed to auto-create employee for portal user");
                None
            }
        }
    }

    /// Mirrors name, email and phone changes onto the linked employee.
    pub fn on_user_updated(&self, user: &PortalUser, changes: &UserChanges) -> Option<Employee> {
        if !user.portal {
            return None;
        }
        match self.sync(user, changes) {
            Ok(synced) => synced,
            Err(e) => {
                error!(login = %user.login, error = %e, "failed to sync user changes to employee");
                None
            }
        }
    }

    fn sync(&self, user: &PortalUser, changes: &UserChanges) -> Result<Option<Employee>, LeaveError> {
        let Some(mut employee) = self.employee_for(&user.id)? else {
            return Ok(None);
        };
        let mut touched = false;
        if let Some(name) = &changes.name {
            employee.name = name.clone();
            touched = true;
        }
        if let Some(email) = changes.email.as_ref().or(changes.login.as_ref()) {
            employee.work_email = Some(email.clone());
            touched = true;
        }
        if let Some(phone) = &changes.phone {
            employee.work_phone = Some(phone.clone());
            touched = true;
        }
        if !touched {
            return Ok(None);
        }
        self.store.employees.write(&employee)?;
        Ok(Some(employee))
    }

    /// Staff action: create the employee record for one portal user.
    pub fn create_employee_for(&self, actor: &Actor, user: &PortalUser) -> Result<Employee, LeaveError> {
        if !actor.is_privileged() {
            warn!(user = %actor.user_id, "portal user attempted employee provisioning");
            return Err(LeaveError::denied("Only HR staff can create employee records."));
        }
        if !user.portal {
            return Err(RuleViolation::NotPortalUser.into());
        }
        if self.employee_for(&user.id)?.is_some() {
            return Err(RuleViolation::EmployeeExists.into());
        }
        let employee = self.create_linked(user)?;
        info!(employee = %employee.id, login = %user.login, "employee created for portal user");
        Ok(employee)
    }

    /// Staff action: create employee records for many portal users at once.
    /// Per-user failures are collected instead of aborting the run.
    pub fn link_portal_users(&self, actor: &Actor, users: &[PortalUser]) -> Result<LinkReport, LeaveError> {
        if !actor.is_privileged() {
            return Err(LeaveError::denied("Only HR staff can link portal users."));
        }
        if users.is_empty() {
            return Err(LeaveError::Validation(
                super::error::ValidationError::NoUsersSelected,
            ));
        }

        let mut report = LinkReport::default();
        for user in users {
            match self.employee_for(&user.id) {
                Ok(Some(_)) => {
                    report
                        .errors
                        .push(format!("{} already has an employee record", user.name));
                }
                Ok(None) => match self.create_linked(user) {
                    Ok(employee) => {
                        info!(employee = %employee.id, login = %user.login, "bulk created employee");
                        report.created.push(employee);
                    }
                    Err(e) => {
                        error!(login = %user.login, error = %e, "bulk employee creation failed");
                        report.errors.push(format!("{}: {}", user.name, e));
                    }
                },
                Err(e) => report.errors.push(format!("{}: {}", user.name, e)),
            }
        }
        Ok(report)
    }
}
