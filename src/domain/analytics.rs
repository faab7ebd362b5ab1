//! Leave analytics: single-pass folds over the year's applications and
//! balances, plus the date windows the dashboards count in.

use std::collections::{HashMap, HashSet};

use chrono::{Datelike, Duration, NaiveDate};
use serde::Serialize;
use utoipa::ToSchema;

use super::approval::LeaveStatus;
use super::balance::BalanceFigures;

pub const MONTH_LABELS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

pub const UNASSIGNED_DEPARTMENT: &str = "Unassigned";

#[derive(Debug, Clone, PartialEq)]
pub struct LeaveTypeRef {
    pub id: u64,
    pub name: String,
    pub code: String,
}

/// One leave application as seen by the aggregations.
#[derive(Debug, Clone, PartialEq)]
pub struct ApplicationFact {
    pub days_count: f64,
    pub start_date: NaiveDate,
    pub status: LeaveStatus,
    pub employee_id: Option<u64>,
    pub department_name: Option<String>,
    pub leave_type: Option<LeaveTypeRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct MonthlyLeaveTrend {
    #[schema(example = "Jan")]
    pub month: String,
    pub approved: f64,
    pub pending: f64,
    pub rejected: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct DepartmentUsage {
    #[schema(example = "Engineering")]
    pub department: String,
    pub total_days: i64,
    pub employee_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct LeaveTypeDistribution {
    #[schema(example = "Casual Leave")]
    pub name: String,
    #[schema(example = "CL")]
    pub code: String,
    pub total_days: i64,
    pub percentage: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct BalanceSummary {
    pub total_entitled: i64,
    pub total_used: i64,
    pub total_available: i64,
    pub utilization_rate: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct LeaveAnalytics {
    pub monthly_trends: Vec<MonthlyLeaveTrend>,
    pub department_usage: Vec<DepartmentUsage>,
    pub leave_type_distribution: Vec<LeaveTypeDistribution>,
    pub balance_summary: BalanceSummary,
    pub total_applications: usize,
    pub approved_applications: usize,
}

/// Rounds halves up (`2.5 -> 3`, `-2.5 -> -2`).
pub fn round_half_up(x: f64) -> i64 {
    (x + 0.5).floor() as i64
}

/// Days per status, bucketed by the month of `start_date` only. A leave
/// spanning two months counts entirely in the first one.
pub fn monthly_trends(applications: &[ApplicationFact]) -> Vec<MonthlyLeaveTrend> {
    let mut buckets = [(0.0_f64, 0.0_f64, 0.0_f64); 12];

    for app in applications {
        let bucket = &mut buckets[app.start_date.month0() as usize];
        match app.status {
            LeaveStatus::Approved => bucket.0 += app.days_count,
            LeaveStatus::Pending => bucket.1 += app.days_count,
            LeaveStatus::Rejected => bucket.2 += app.days_count,
            LeaveStatus::Cancelled => {}
        }
    }

    MONTH_LABELS
        .iter()
        .zip(buckets)
        .map(|(month, (approved, pending, rejected))| MonthlyLeaveTrend {
            month: (*month).to_string(),
            approved,
            pending,
            rejected,
        })
        .collect()
}

/// Approved days per department, each employee counted once per department.
pub fn department_usage(applications: &[ApplicationFact]) -> Vec<DepartmentUsage> {
    let mut order: Vec<(String, f64, HashSet<u64>)> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for app in applications.iter().filter(|a| a.status == LeaveStatus::Approved) {
        let name = app
            .department_name
            .clone()
            .unwrap_or_else(|| UNASSIGNED_DEPARTMENT.to_string());

        let slot = *index.entry(name.clone()).or_insert_with(|| {
            order.push((name, 0.0, HashSet::new()));
            order.len() - 1
        });

        let entry = &mut order[slot];
        entry.1 += app.days_count;
        if let Some(employee_id) = app.employee_id {
            entry.2.insert(employee_id);
        }
    }

    let mut usage: Vec<DepartmentUsage> = order
        .into_iter()
        .map(|(department, days, employees)| DepartmentUsage {
            department,
            total_days: round_half_up(days),
            employee_count: employees.len(),
        })
        .collect();
    usage.sort_by(|a, b| b.total_days.cmp(&a.total_days));
    usage
}

/// Shares of `total` in whole percent.
///
/// Each share is `round(value / total * 100)`. When rounding pushes the sum
/// past 100, the rounded-up shares with the smallest fractional part give
/// back one point each until the sum is 100.
pub fn capped_percentages(values: &[f64], total: f64) -> Vec<i64> {
    if total <= 0.0 {
        return vec![0; values.len()];
    }

    let exact: Vec<f64> = values.iter().map(|v| v / total * 100.0).collect();
    let mut rounded: Vec<i64> = exact.iter().map(|x| round_half_up(*x)).collect();

    let mut overshoot = rounded.iter().sum::<i64>() - 100;
    let mut candidates: Vec<usize> = (0..exact.len())
        .filter(|&i| rounded[i] as f64 > exact[i])
        .collect();
    candidates.sort_by(|&a, &b| exact[a].fract().total_cmp(&exact[b].fract()));

    for i in candidates {
        if overshoot <= 0 {
            break;
        }
        rounded[i] -= 1;
        overshoot -= 1;
    }

    rounded
}

/// Approved days per leave type with their share of all approved days.
pub fn leave_type_distribution(applications: &[ApplicationFact]) -> Vec<LeaveTypeDistribution> {
    let mut order: Vec<(String, String, f64)> = Vec::new();
    let mut index: HashMap<Option<u64>, usize> = HashMap::new();

    for app in applications.iter().filter(|a| a.status == LeaveStatus::Approved) {
        let key = app.leave_type.as_ref().map(|t| t.id);
        let slot = *index.entry(key).or_insert_with(|| {
            let (name, code) = match &app.leave_type {
                Some(t) => (t.name.clone(), t.code.clone()),
                None => ("Unknown".to_string(), "??".to_string()),
            };
            order.push((name, code, 0.0));
            order.len() - 1
        });
        order[slot].2 += app.days_count;
    }

    let days: Vec<f64> = order.iter().map(|t| t.2).collect();
    let total: f64 = days.iter().sum();
    let percentages = capped_percentages(&days, total);

    let mut distribution: Vec<LeaveTypeDistribution> = order
        .into_iter()
        .zip(percentages)
        .map(|((name, code, days), percentage)| LeaveTypeDistribution {
            name,
            code,
            total_days: round_half_up(days),
            percentage,
        })
        .collect();
    distribution.sort_by(|a, b| b.total_days.cmp(&a.total_days));
    distribution
}

pub fn balance_summary(balances: &[BalanceFigures]) -> BalanceSummary {
    let entitled: f64 = balances.iter().map(BalanceFigures::total_entitlement).sum();
    let used: f64 = balances.iter().map(|b| b.used_days).sum();

    BalanceSummary {
        total_entitled: round_half_up(entitled),
        total_used: round_half_up(used),
        total_available: round_half_up(entitled - used),
        utilization_rate: if entitled > 0.0 {
            round_half_up(used / entitled * 100.0)
        } else {
            0
        },
    }
}

pub fn aggregate(applications: &[ApplicationFact], balances: &[BalanceFigures]) -> LeaveAnalytics {
    LeaveAnalytics {
        monthly_trends: monthly_trends(applications),
        department_usage: department_usage(applications),
        leave_type_distribution: leave_type_distribution(applications),
        balance_summary: balance_summary(balances),
        total_applications: applications.len(),
        approved_applications: applications
            .iter()
            .filter(|a| a.status == LeaveStatus::Approved)
            .count(),
    }
}

/// Monday..Sunday of the week containing `today`.
pub fn week_bounds(today: NaiveDate) -> (NaiveDate, NaiveDate) {
    let monday = today - Duration::days(today.weekday().num_days_from_monday() as i64);
    (monday, monday + Duration::days(6))
}

/// First and last day of the month containing `today`.
pub fn month_bounds(today: NaiveDate) -> (NaiveDate, NaiveDate) {
    let first = today.with_day(1).unwrap_or(today);
    let next_first = if first.month() == 12 {
        NaiveDate::from_ymd_opt(first.year() + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(first.year(), first.month() + 1, 1)
    };
    let last = next_first.map(|d| d - Duration::days(1)).unwrap_or(first);
    (first, last)
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct DepartmentOverview {
    pub department_id: u64,
    pub department_name: String,
    pub total_employees: usize,
    pub on_leave_today: usize,
    pub pending_requests: usize,
}

/// Per-department head count, absences today and pending requests.
/// `pending` and `on_leave` hold one employee id per application, so an
/// employee with two pending requests counts twice. Departments without
/// active employees are left out.
pub fn department_overview(
    departments: &[(u64, String)],
    active_employees: &[(u64, Option<u64>)],
    pending: &[u64],
    on_leave: &[u64],
) -> Vec<DepartmentOverview> {
    departments
        .iter()
        .filter_map(|(department_id, name)| {
            let members: HashSet<u64> = active_employees
                .iter()
                .filter(|(_, dept)| *dept == Some(*department_id))
                .map(|(id, _)| *id)
                .collect();
            if members.is_empty() {
                return None;
            }
            Some(DepartmentOverview {
                department_id: *department_id,
                department_name: name.clone(),
                total_employees: members.len(),
                on_leave_today: on_leave.iter().filter(|id| members.contains(id)).count(),
                pending_requests: pending.iter().filter(|id| members.contains(id)).count(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn casual() -> Option<LeaveTypeRef> {
        Some(LeaveTypeRef {
            id: 1,
            name: "Casual Leave".into(),
            code: "CL".into(),
        })
    }

    fn sick() -> Option<LeaveTypeRef> {
        Some(LeaveTypeRef {
            id: 2,
            name: "Sick Leave".into(),
            code: "SL".into(),
        })
    }

    fn fact(
        days: f64,
        start: NaiveDate,
        status: LeaveStatus,
        employee: u64,
        dept: Option<&str>,
        leave_type: Option<LeaveTypeRef>,
    ) -> ApplicationFact {
        ApplicationFact {
            days_count: days,
            start_date: start,
            status,
            employee_id: Some(employee),
            department_name: dept.map(str::to_string),
            leave_type,
        }
    }

    #[test]
    fn months_use_start_date_only() {
        let apps = vec![
            // Jan 30 .. Feb 3 lands in January
            fact(5.0, date(2026, 1, 30), LeaveStatus::Approved, 1, None, casual()),
            fact(1.5, date(2026, 2, 10), LeaveStatus::Pending, 1, None, casual()),
            fact(2.0, date(2026, 2, 11), LeaveStatus::Rejected, 2, None, casual()),
            fact(3.0, date(2026, 2, 12), LeaveStatus::Cancelled, 2, None, casual()),
        ];

        let trends = monthly_trends(&apps);
        assert_eq!(trends.len(), 12);
        assert_eq!(trends[0].month, "Jan");
        assert_eq!(trends[0].approved, 5.0);
        assert_eq!(trends[1].approved, 0.0);
        assert_eq!(trends[1].pending, 1.5);
        assert_eq!(trends[1].rejected, 2.0);
        assert!(trends[2..].iter().all(|t| t.approved + t.pending + t.rejected == 0.0));
    }

    #[test]
    fn department_usage_counts_each_employee_once() {
        let apps = vec![
            fact(2.0, date(2026, 3, 1), LeaveStatus::Approved, 7, Some("Ops"), casual()),
            fact(1.0, date(2026, 4, 1), LeaveStatus::Approved, 7, Some("Ops"), casual()),
            fact(4.0, date(2026, 5, 1), LeaveStatus::Approved, 8, Some("Ops"), sick()),
            fact(9.0, date(2026, 5, 1), LeaveStatus::Pending, 9, Some("Ops"), sick()),
            fact(1.5, date(2026, 6, 1), LeaveStatus::Approved, 10, None, sick()),
        ];

        let usage = department_usage(&apps);
        assert_eq!(
            usage,
            vec![
                DepartmentUsage {
                    department: "Ops".into(),
                    total_days: 7,
                    employee_count: 2,
                },
                DepartmentUsage {
                    department: UNASSIGNED_DEPARTMENT.into(),
                    total_days: 2,
                    employee_count: 1,
                },
            ]
        );
    }

    #[test]
    fn distribution_percentages() {
        let apps = vec![
            fact(6.0, date(2026, 1, 5), LeaveStatus::Approved, 1, None, casual()),
            fact(2.0, date(2026, 1, 6), LeaveStatus::Approved, 2, None, sick()),
            fact(2.0, date(2026, 1, 7), LeaveStatus::Approved, 3, None, None),
            fact(50.0, date(2026, 1, 8), LeaveStatus::Rejected, 3, None, sick()),
        ];

        let dist = leave_type_distribution(&apps);
        assert_eq!(dist[0].code, "CL");
        assert_eq!(dist[0].percentage, 60);
        assert_eq!(dist[1].percentage, 20);
        assert_eq!(dist[2].name, "Unknown");
        assert_eq!(dist[2].code, "??");
        assert_eq!(dist.iter().map(|d| d.percentage).sum::<i64>(), 100);
    }

    #[test]
    fn percentages_are_zero_without_approved_days() {
        assert_eq!(capped_percentages(&[0.0, 0.0], 0.0), vec![0, 0]);
        let apps = vec![fact(3.0, date(2026, 1, 5), LeaveStatus::Pending, 1, None, casual())];
        assert!(leave_type_distribution(&apps).is_empty());
    }

    #[test]
    fn percentages_never_exceed_one_hundred() {
        // plain rounding would give 38 + 38 + 25 = 101
        let shares = capped_percentages(&[1.5, 1.5, 1.0], 4.0);
        assert_eq!(shares.iter().sum::<i64>(), 100);
        assert_eq!(shares[2], 25);

        let thirds = capped_percentages(&[1.0, 1.0, 1.0], 3.0);
        assert_eq!(thirds, vec![33, 33, 33]);

        let sevenths = capped_percentages(&[1.0; 7], 7.0);
        assert!(sevenths.iter().sum::<i64>() <= 100);
    }

    #[test]
    fn balance_summary_totals() {
        let balances = [
            BalanceFigures {
                entitled_days: 12.0,
                used_days: 3.0,
                carried_forward_days: 2.0,
                adjusted_days: 1.0,
            },
            BalanceFigures {
                entitled_days: 6.0,
                used_days: 1.0,
                carried_forward_days: 0.0,
                adjusted_days: 0.0,
            },
        ];
        let summary = balance_summary(&balances);
        assert_eq!(summary.total_entitled, 21);
        assert_eq!(summary.total_used, 4);
        assert_eq!(summary.total_available, 17);
        assert_eq!(summary.utilization_rate, 19);
        assert_eq!(balance_summary(&[]).utilization_rate, 0);
    }

    #[test]
    fn aggregate_counts_applications() {
        let apps = vec![
            fact(1.0, date(2026, 1, 5), LeaveStatus::Approved, 1, None, casual()),
            fact(1.0, date(2026, 1, 6), LeaveStatus::Rejected, 1, None, casual()),
        ];
        let analytics = aggregate(&apps, &[]);
        assert_eq!(analytics.total_applications, 2);
        assert_eq!(analytics.approved_applications, 1);
    }

    #[test]
    fn half_up_rounding() {
        assert_eq!(round_half_up(2.5), 3);
        assert_eq!(round_half_up(2.49), 2);
        assert_eq!(round_half_up(-2.5), -2);
        assert_eq!(round_half_up(-2.6), -3);
    }

    #[test]
    fn calendar_windows() {
        // 2026-10-21 is a Wednesday
        assert_eq!(
            week_bounds(date(2026, 10, 21)),
            (date(2026, 10, 19), date(2026, 10, 25))
        );
        assert_eq!(
            week_bounds(date(2026, 10, 25)),
            (date(2026, 10, 19), date(2026, 10, 25))
        );
        assert_eq!(
            month_bounds(date(2026, 2, 14)),
            (date(2026, 2, 1), date(2026, 2, 28))
        );
        assert_eq!(
            month_bounds(date(2026, 12, 3)),
            (date(2026, 12, 1), date(2026, 12, 31))
        );
    }

    #[test]
    fn overview_skips_empty_departments() {
        let departments = vec![(1, "Ops".to_string()), (2, "Legal".to_string())];
        let employees = vec![(10, Some(1)), (11, Some(1)), (12, None)];
        let overview = department_overview(&departments, &employees, &[10, 10, 12], &[11]);

        assert_eq!(
            overview,
            vec![DepartmentOverview {
                department_id: 1,
                department_name: "Ops".into(),
                total_employees: 2,
                on_leave_today: 1,
                pending_requests: 2,
            }]
        );
    }
}
