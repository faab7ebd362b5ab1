pub mod analytics;
pub mod audit_log;
pub mod department;
pub mod employee;
pub mod holiday;
pub mod leave_application;
pub mod leave_balance;
pub mod notification;
pub mod settings;
pub mod team;
