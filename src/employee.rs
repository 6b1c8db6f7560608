//! Employee records and the public subset exposed to portal actors
use super::error::ValidationError;
use super::store::Record;
use super::utils::{self, EMPLOYEE_HRP};

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq, Default)]
pub struct Employee {
    #[n(0)]
    pub id: String,
    #[n(1)]
    pub name: String,
    #[n(2)]
    pub user_id: Option<String>, // None for staff without a portal account
    #[n(3)]
    pub work_email: Option<String>,
    #[n(4)]
    pub work_phone: Option<String>,
    #[n(5)]
    pub barcode: Option<String>, // badge id
    #[n(6)]
    pub active: bool,
    #[n(7)]
    pub portal_team_leader_id: Option<String>,
    #[n(8)]
    pub wage: Option<f64>,
    #[n(9)]
    pub private_phone: Option<String>,
}

/// The fields any portal actor may read, e.g. to pick a delegate.
#[derive(Debug, Clone, PartialEq)]
pub struct EmployeeView {
    pub id: String,
    pub name: String,
    pub work_email: Option<String>,
    pub work_phone: Option<String>,
    pub barcode: Option<String>,
}

impl Employee {
    /// A fresh active employee with a generated id.
    pub fn new(name: &str) -> anyhow::Result<Self> {
        Ok(Self {
            id: utils::new_uuid_to_bech32(EMPLOYEE_HRP)?,
            name: name.to_string(),
            active: true,
            ..Self::default()
        })
    }
    pub fn with_user(mut self, user_id: &str) -> Self {
        self.user_id = Some(user_id.to_string());
        self
    }
    pub fn with_team_leader(mut self, leader_id: &str) -> Self {
        self.portal_team_leader_id = Some(leader_id.to_string());
        self
    }
    pub fn with_work_email(mut self, email: &str) -> Self {
        self.work_email = Some(email.to_string());
        self
    }
    pub fn with_wage(mut self, wage: f64) -> Self {
        self.wage = Some(wage);
        self
    }

    pub fn has_team_leader(&self) -> bool {
        self.portal_team_leader_id.is_some()
    }

    pub fn is_led_by(&self, leader_id: &str) -> bool {
        self.portal_team_leader_id.as_deref() == Some(leader_id)
    }

    /// Single-hop self reference check; longer cycles are allowed.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.is_led_by(&self.id) {
            return Err(ValidationError::SelfTeamLeader);
        }
        Ok(())
    }

    pub fn view(&self) -> EmployeeView {
        EmployeeView {
            id: self.id.clone(),
            name: self.name.clone(),
            work_email: self.work_email.clone(),
            work_phone: self.work_phone.clone(),
            barcode: self.barcode.clone(),
        }
    }
}

impl Record for Employee {
    const TREE: &'static str = "employees";

    fn id(&self) -> &str {
        &self.id
    }
}

/// Field changes for an employee. `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub struct EmployeeUpdate {
    pub name: Option<String>,
    pub work_email: Option<String>,
    pub work_phone: Option<String>,
    pub barcode: Option<String>,
    pub active: Option<bool>,
    pub portal_team_leader_id: Option<Option<String>>,
    pub wage: Option<f64>,
}

impl EmployeeUpdate {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn set_name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }
    pub fn set_work_email(mut self, email: &str) -> Self {
        self.work_email = Some(email.to_string());
        self
    }
    pub fn set_work_phone(mut self, phone: &str) -> Self {
        self.work_phone = Some(phone.to_string());
        self
    }
    pub fn set_active(mut self, active: bool) -> Self {
        self.active = Some(active);
        self
    }
    pub fn set_team_leader(mut self, leader_id: Option<&str>) -> Self {
        self.portal_team_leader_id = Some(leader_id.map(str::to_string));
        self
    }
    pub fn set_wage(mut self, wage: f64) -> Self {
        self.wage = Some(wage);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.work_email.is_none()
            && self.work_phone.is_none()
            && self.barcode.is_none()
            && self.active.is_none()
            && self.portal_team_leader_id.is_none()
            && self.wage.is_none()
    }

    pub fn apply_to(self, employee: &mut Employee) {
        if let Some(name) = self.name {
            employee.name = name;
        }
        if let Some(email) = self.work_email {
            employee.work_email = Some(email);
        }
        if let Some(phone) = self.work_phone {
            employee.work_phone = Some(phone);
        }
        if let Some(barcode) = self.barcode {
            employee.barcode = Some(barcode);
        }
        if let Some(active) = self.active {
            employee.active = active;
        }
        if let Some(leader) = self.portal_team_leader_id {
            employee.portal_team_leader_id = leader;
        }
        if let Some(wage) = self.wage {
            employee.wage = Some(wage);
        }
    }
}
