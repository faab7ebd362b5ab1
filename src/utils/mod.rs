pub mod db_utils;
pub mod employee_code_filter;
pub mod query_cache;
