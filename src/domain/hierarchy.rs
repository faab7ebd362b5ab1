//! Reporting lines.
//!
//! Teams are one level deep: the active employees whose
//! `reporting_manager_id` is the manager's employee id. There is no
//! roll-up through several levels.

use std::collections::{HashMap, HashSet};

use derive_more::Display;

use super::Actor;

/// One employee in the reporting tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrgNode {
    pub id: u64,
    pub reporting_manager_id: Option<u64>,
    pub is_active: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeamScope {
    /// Every active employee (HR/Admin asking for the whole organization).
    Organization,
    /// Active direct reports of the given employee.
    DirectReportsOf(u64),
}

/// Scope of the caller's team view, `None` when there is nothing to show
/// (no linked employee record and no organization-wide access).
pub fn team_scope(actor: &Actor, show_all: bool) -> Option<TeamScope> {
    if show_all && actor.role.is_hr_or_admin() {
        return Some(TeamScope::Organization);
    }
    actor.employee_id.map(TeamScope::DirectReportsOf)
}

pub fn resolve_team(scope: TeamScope, nodes: &[OrgNode]) -> Vec<u64> {
    nodes
        .iter()
        .filter(|n| n.is_active)
        .filter(|n| match scope {
            TeamScope::Organization => true,
            TeamScope::DirectReportsOf(manager) => n.reporting_manager_id == Some(manager),
        })
        .map(|n| n.id)
        .collect()
}

/// HR/Admin always have team access; anybody else needs at least one
/// active direct report.
pub fn is_reporting_manager(actor: &Actor, nodes: &[OrgNode]) -> bool {
    if actor.role.is_hr_or_admin() {
        return true;
    }
    match actor.employee_id {
        Some(id) => !resolve_team(TeamScope::DirectReportsOf(id), nodes).is_empty(),
        None => false,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum AssignmentError {
    #[display(fmt = "Employee not found")]
    UnknownEmployee,
    #[display(fmt = "Manager not found or inactive")]
    UnknownManager,
    #[display(fmt = "An employee cannot report to themselves")]
    SelfAssignment,
    #[display(fmt = "Assignment would create a reporting cycle")]
    Cycle,
}

/// Validates making `manager_id` the reporting manager of `employee_id`.
/// Clearing the manager (`None`) only requires the employee to exist.
pub fn validate_assignment(
    nodes: &[OrgNode],
    employee_id: u64,
    manager_id: Option<u64>,
) -> Result<(), AssignmentError> {
    let parents: HashMap<u64, OrgNode> = nodes.iter().map(|n| (n.id, *n)).collect();

    if !parents.contains_key(&employee_id) {
        return Err(AssignmentError::UnknownEmployee);
    }
    let Some(manager_id) = manager_id else {
        return Ok(());
    };
    if manager_id == employee_id {
        return Err(AssignmentError::SelfAssignment);
    }
    match parents.get(&manager_id) {
        Some(manager) if manager.is_active => {}
        _ => return Err(AssignmentError::UnknownManager),
    }

    // Walk up from the new manager; meeting the employee means a cycle.
    let mut visited = HashSet::new();
    let mut current = Some(manager_id);
    while let Some(id) = current {
        if id == employee_id {
            return Err(AssignmentError::Cycle);
        }
        if !visited.insert(id) {
            // an existing loop above the manager that does not involve the employee
            break;
        }
        current = parents.get(&id).and_then(|n| n.reporting_manager_id);
    }

    Ok(())
}
