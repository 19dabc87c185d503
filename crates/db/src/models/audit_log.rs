//! Audit trail types.

use std::fmt;

use runforge_core::types::DbId;

/// Who performed an audited operation.
///
/// Rendered into the `actor` column: `user:{id}` for authenticated callers,
/// `webhook` for runs fired through the trigger gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditActor {
    User(DbId),
    Webhook,
}

impl fmt::Display for AuditActor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuditActor::User(id) => write!(f, "user:{id}"),
            AuditActor::Webhook => f.write_str("webhook"),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn actors_render_their_column_value() {
        assert_eq!(AuditActor::User(42).to_string(), "user:42");
        assert_eq!(AuditActor::Webhook.to_string(), "webhook");
    }
}
