use async_trait::async_trait;
use serde_json::Value;

/// One row of the audit trail.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditEntry {
    pub user_id: Option<u64>,
    pub table_name: &'static str,
    pub action: &'static str,
    pub record_id: Option<u64>,
    pub old_values: Option<Value>,
    pub new_values: Option<Value>,
}

#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn append(&self, entry: &AuditEntry) -> anyhow::Result<()>;
}

/// Appends `entry`, logging instead of failing when the write does not go
/// through. Returns whether the entry was stored.
pub async fn record_best_effort<A: AuditSink + ?Sized>(sink: &A, entry: &AuditEntry) -> bool {
    match sink.append(entry).await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(
                error = %e,
                table = entry.table_name,
                action = entry.action,
                record_id = ?entry.record_id,
                "Failed to write audit log entry"
            );
            false
        }
    }
}
