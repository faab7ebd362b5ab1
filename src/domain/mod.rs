//! Leave-management rules, independent of actix-web and the database.

pub mod adjustment;
pub mod analytics;
pub mod approval;
pub mod audit;
pub mod balance;
pub mod hierarchy;
pub mod holidays;

use crate::model::role::Role;

/// The authenticated caller as the domain sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub user_id: u64,
    pub role: Role,
    /// Present only if the user is linked to an employee record
    pub employee_id: Option<u64>,
}
