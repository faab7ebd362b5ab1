use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::adjustment::BalanceRecord;
use crate::domain::balance::BalanceFigures;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct LeaveBalanceRow {
    pub id: u64,
    pub employee_id: u64,
    pub leave_type_id: u64,
    pub year: i32,
    pub entitled_days: f64,
    pub used_days: f64,
    pub carried_forward_days: f64,
    pub adjusted_days: f64,
}

impl LeaveBalanceRow {
    pub fn figures(&self) -> BalanceFigures {
        BalanceFigures {
            entitled_days: self.entitled_days,
            used_days: self.used_days,
            carried_forward_days: self.carried_forward_days,
            adjusted_days: self.adjusted_days,
        }
    }
}

impl From<LeaveBalanceRow> for BalanceRecord {
    fn from(row: LeaveBalanceRow) -> Self {
        BalanceRecord {
            figures: row.figures(),
            id: row.id,
            employee_id: row.employee_id,
            leave_type_id: row.leave_type_id,
            year: row.year,
        }
    }
}

/// Balance row joined with its leave type (LEFT JOIN, so the type may be gone).
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct BalanceWithTypeRow {
    #[sqlx(flatten)]
    pub balance: LeaveBalanceRow,
    pub leave_type_name: Option<String>,
    pub leave_type_code: Option<String>,
}

/// One leave type's balance as an employee sees it. `available_days` is not
/// clamped and goes negative when more was used than granted.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct EmployeeLeaveBalance {
    #[schema(example = 11)]
    pub id: u64,
    #[schema(example = 1)]
    pub leave_type_id: u64,
    #[schema(example = "Casual Leave")]
    pub leave_type_name: String,
    #[schema(example = "CL")]
    pub leave_type_code: String,
    #[schema(example = 2026)]
    pub year: i32,
    #[serde(flatten)]
    pub figures: BalanceFigures,
    #[schema(example = 10.5)]
    pub total_entitlement: f64,
    #[schema(example = 6.0)]
    pub available_days: f64,
}

impl From<BalanceWithTypeRow> for EmployeeLeaveBalance {
    fn from(row: BalanceWithTypeRow) -> Self {
        let figures = row.balance.figures();
        EmployeeLeaveBalance {
            id: row.balance.id,
            leave_type_id: row.balance.leave_type_id,
            leave_type_name: row.leave_type_name.unwrap_or_else(|| "Unknown".to_string()),
            leave_type_code: row.leave_type_code.unwrap_or_else(|| "??".to_string()),
            year: row.balance.year,
            total_entitlement: figures.total_entitlement(),
            available_days: figures.available(),
            figures,
        }
    }
}

/// Per-type balance in the team overview, floored at zero.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TeamTypeBalance {
    #[schema(example = "CL")]
    pub leave_type_code: String,
    #[schema(example = 4.0)]
    pub available_days: f64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TeamMemberBalances {
    #[schema(example = 7)]
    pub employee_id: u64,
    #[schema(example = "Asha Rao")]
    pub employee_name: String,
    pub balances: Vec<TeamTypeBalance>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(name: Option<&str>, code: Option<&str>) -> BalanceWithTypeRow {
        BalanceWithTypeRow {
            balance: LeaveBalanceRow {
                id: 1,
                employee_id: 2,
                leave_type_id: 3,
                year: 2026,
                entitled_days: 2.0,
                used_days: 5.0,
                carried_forward_days: 0.5,
                adjusted_days: 0.0,
            },
            leave_type_name: name.map(str::to_string),
            leave_type_code: code.map(str::to_string),
        }
    }

    #[test]
    fn employee_view_keeps_negative_availability() {
        let view = EmployeeLeaveBalance::from(row(Some("Sick Leave"), Some("SL")));
        assert_eq!(view.available_days, -2.5);
        assert_eq!(view.total_entitlement, 2.5);
        assert_eq!(view.leave_type_code, "SL");
    }

    #[test]
    fn missing_leave_type_falls_back_to_placeholders() {
        let view = EmployeeLeaveBalance::from(row(None, None));
        assert_eq!(view.leave_type_name, "Unknown");
        assert_eq!(view.leave_type_code, "??");
    }
}
