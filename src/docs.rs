use crate::api::analytics::OrgDashboard;
use crate::api::employee::{
    AssignManager, EmployeeListResponse, ProvisionEmployee, ProvisionResponse, SetRole,
};
use crate::api::holiday::{HolidayPayload, ImportSummary};
use crate::api::department::DepartmentPayload;
use crate::api::leave_application::{
    ApplyLeave, DecisionPayload, DecisionResponse, LeaveHistoryResponse,
};
use crate::api::leave_balance::{AdjustBalance, AdjustmentResponse};
use crate::api::settings::UpsertBanner;
use crate::api::team::TeamStats;
use crate::domain::analytics::{
    BalanceSummary, DepartmentOverview, DepartmentUsage, LeaveAnalytics, LeaveTypeDistribution,
    MonthlyLeaveTrend,
};
use crate::domain::approval::{ApprovalAction, LeaveStatus};
use crate::domain::balance::BalanceFigures;
use crate::domain::holidays::HolidayType;
use crate::model::audit_log::AuditLog;
use crate::model::department::{Department, DepartmentWithCount};
use crate::model::employee::{Employee, EmploymentType, Gender};
use crate::model::holiday::Holiday;
use crate::model::leave_application::{LeaveApplication, LeaveApplicationView};
use crate::model::leave_balance::{EmployeeLeaveBalance, TeamMemberBalances, TeamTypeBalance};
use crate::model::leave_type::LeaveType;
use crate::model::notification::Notification;
use crate::model::role::Role;
use crate::model::settings::{AnnouncementBanner, NotificationPreferences, OrganizationSettings};
use utoipa::Modify;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "HR Leave Management API",
        version = "1.0.0",
        description = r#"
## HR Leave Management

Backend for employee records, leave applications and approvals, leave
balances, holiday calendars, notifications and organization settings.

### Key Features
- **Employees**: provisioning with a temporary password, reporting lines, roles
- **Leave**: apply, approve/reject, cancel, history; loss-of-pay split
- **Balances**: per-type availability, manual adjustments with audit trail
- **Team**: direct reports, team stats and balances
- **Analytics**: monthly trends, department usage, leave-type distribution
- **Holidays**: national/regional/company calendar, regional opt-ins

### Security
Every endpoint expects a **JWT Bearer** access token. HR and Admin see the
whole organization; managers see their direct reports.

### Response Format
- JSON responses; errors as `{"message": ...}`
- Pagination on employee and leave-history listings
"#,
    ),
    paths(
        crate::api::employee::provision_employee,
        crate::api::employee::list_employees,
        crate::api::employee::get_employee,
        crate::api::employee::update_employee,
        crate::api::employee::assign_manager,
        crate::api::employee::set_role,

        crate::api::department::list_departments,
        crate::api::department::create_department,
        crate::api::department::update_department,
        crate::api::department::delete_department,

        crate::api::leave_balance::list_leave_types,
        crate::api::leave_balance::get_balances,
        crate::api::leave_balance::adjust,

        crate::api::leave_application::apply_leave,
        crate::api::leave_application::leave_history,
        crate::api::leave_application::pending_for_action,
        crate::api::leave_application::get_leave,
        crate::api::leave_application::decide_leave,
        crate::api::leave_application::cancel_leave,

        crate::api::team::members,
        crate::api::team::member_ids,
        crate::api::team::stats,
        crate::api::team::balances,
        crate::api::team::is_manager,

        crate::api::analytics::leave_analytics,
        crate::api::analytics::org_dashboard,

        crate::api::holiday::list_holidays,
        crate::api::holiday::create_holiday,
        crate::api::holiday::update_holiday,
        crate::api::holiday::delete_holiday,
        crate::api::holiday::import_holidays,
        crate::api::holiday::opt_in,
        crate::api::holiday::opt_out,
        crate::api::holiday::my_opt_ins,

        crate::api::notification::list_notifications,
        crate::api::notification::unread_count,
        crate::api::notification::mark_read,
        crate::api::notification::mark_all_read,

        crate::api::settings::get_organization,
        crate::api::settings::update_organization,
        crate::api::settings::get_preferences,
        crate::api::settings::update_preferences,
        crate::api::settings::list_banners,
        crate::api::settings::active_banners,
        crate::api::settings::upsert_banner,

        crate::api::audit_log::list_audit_logs
    ),
    components(
        schemas(
            Employee,
            EmploymentType,
            Gender,
            Role,
            ProvisionEmployee,
            ProvisionResponse,
            EmployeeListResponse,
            AssignManager,
            SetRole,
            Department,
            DepartmentWithCount,
            DepartmentPayload,
            LeaveType,
            BalanceFigures,
            EmployeeLeaveBalance,
            AdjustBalance,
            AdjustmentResponse,
            LeaveStatus,
            ApprovalAction,
            LeaveApplication,
            LeaveApplicationView,
            ApplyLeave,
            DecisionPayload,
            DecisionResponse,
            LeaveHistoryResponse,
            TeamStats,
            TeamTypeBalance,
            TeamMemberBalances,
            MonthlyLeaveTrend,
            DepartmentUsage,
            LeaveTypeDistribution,
            BalanceSummary,
            LeaveAnalytics,
            DepartmentOverview,
            OrgDashboard,
            HolidayType,
            Holiday,
            HolidayPayload,
            ImportSummary,
            Notification,
            OrganizationSettings,
            NotificationPreferences,
            AnnouncementBanner,
            UpsertBanner,
            AuditLog
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Employee", description = "Employee records and provisioning"),
        (name = "Department", description = "Department management"),
        (name = "Leave", description = "Leave applications and approvals"),
        (name = "Leave Balance", description = "Leave types, balances and adjustments"),
        (name = "Team", description = "Reporting-line views for managers"),
        (name = "Analytics", description = "Leave analytics and organization dashboard"),
        (name = "Holiday", description = "Holiday calendar and regional opt-ins"),
        (name = "Notification", description = "In-app notifications"),
        (name = "Settings", description = "Organization settings and banners"),
        (name = "Audit", description = "Audit trail"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_paths_and_bearer_scheme() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/api/employee/provision"));
        assert!(doc.paths.paths.contains_key("/api/leave/{leave_id}/decision"));
        assert!(doc.paths.paths.contains_key("/api/holidays/import"));

        let components = doc.components.unwrap();
        assert!(components.security_schemes.contains_key("bearer_auth"));
        assert!(components.schemas.contains_key("LeaveAnalytics"));
    }
}
