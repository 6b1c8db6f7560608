//! Utility functions for identifiers and date arithmetic

use bech32::Bech32m;
use chrono::NaiveDate;
use uuid7::uuid7;

pub const EMPLOYEE_HRP: &str = "emp_";
pub const USER_HRP: &str = "user_";
pub const LEAVE_TYPE_HRP: &str = "ltype_";
pub const ALLOCATION_HRP: &str = "alloc_";
pub const LEAVE_HRP: &str = "leave_";
pub const ATTACHMENT_HRP: &str = "att_";

// construct a unique id then encode using bech32
pub fn new_uuid_to_bech32(hrp: &str) -> anyhow::Result<String> {
    let hrp = bech32::Hrp::parse(hrp)?;
    let encode = bech32::encode::<Bech32m>(hrp, uuid7().as_bytes())?;
    Ok(encode)
}

/// Number of calendar days covered by `from..=to`.
pub fn inclusive_days(from: NaiveDate, to: NaiveDate) -> i64 {
    (to - from).num_days() + 1
}

/// `true` when `[a_from, a_to]` and `[b_from, b_to]` share at least one day.
pub fn ranges_intersect(
    a_from: NaiveDate,
    a_to: NaiveDate,
    b_from: NaiveDate,
    b_to: NaiveDate,
) -> bool {
    a_from <= b_to && a_to >= b_from
}
