#![allow(dead_code)]

use chrono::NaiveDate;
use leave_approval::allocation::{AllocationRequirement, LeaveAllocation, LeaveType};
use leave_approval::config::PortalConfig;
use leave_approval::employee::Employee;
use leave_approval::leave::LeaveRequestDetails;
use leave_approval::types::FixedClock;
use leave_approval::utils::{self, USER_HRP};
use leave_approval::{Actor, LeaveService};
use std::sync::Arc;
use tempfile::{TempDir, tempdir};

/// Every test runs on 2025-05-20.
pub fn today() -> NaiveDate {
    day(2025, 5, 20)
}

pub fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// A service over a throwaway database. Keep the `TempDir` alive for the
/// length of the test; sled holds a file lock on the directory.
pub struct Portal {
    _temp_dir: TempDir,
    pub service: LeaveService,
    pub hr: Actor,
}

impl Portal {
    pub fn open(name: &str) -> anyhow::Result<Self> {
        let temp_dir = tempdir()?;
        let db = Arc::new(sled::open(temp_dir.path().join(format!("{name}.db")))?);
        let service = LeaveService::new(db, PortalConfig::default())?.with_clock(FixedClock(today()));
        Ok(Self {
            _temp_dir: temp_dir,
            service,
            hr: Actor::staff(&utils::new_uuid_to_bech32(USER_HRP)?),
        })
    }

    /// An active employee with a linked portal account.
    pub fn enroll(&self, name: &str, team_leader: Option<&Employee>) -> anyhow::Result<(Actor, Employee)> {
        let user_id = utils::new_uuid_to_bech32(USER_HRP)?;
        let mut employee = Employee::new(name)?
            .with_user(&user_id)
            .with_work_email(&format!("{}@example.com", name.to_lowercase()))
            .with_wage(4200.0);
        if let Some(leader) = team_leader {
            employee = employee.with_team_leader(&leader.id);
        }
        self.service.store().employees.create(&employee)?;
        Ok((Actor::portal(&user_id), employee))
    }

    pub fn leave_type(&self, name: &str, requirement: AllocationRequirement) -> anyhow::Result<LeaveType> {
        let leave_type = LeaveType::new(name, requirement)?;
        self.service.store().leave_types.create(&leave_type)?;
        Ok(leave_type)
    }

    pub fn grant(&self, employee: &Employee, leave_type: &LeaveType, days: f64, taken: f64) -> anyhow::Result<LeaveAllocation> {
        let allocation = LeaveAllocation::granted(&employee.id, &leave_type.id, days)?.with_taken(taken);
        self.service.guard().create_allocation(&self.hr, &allocation)?;
        Ok(allocation)
    }
}

pub fn details(leave_type: &LeaveType, from: NaiveDate, to: NaiveDate) -> LeaveRequestDetails {
    LeaveRequestDetails::new()
        .set_dates(from, to)
        .set_leave_type(&leave_type.id)
        .set_reason("Trip")
}
