//! Tenant-scoped transactions.
//!
//! Every mutating or reading path runs inside [`with_tenant`], which opens a
//! transaction and binds the caller's tenant to the `app.tenant_id` setting
//! for its duration. Row-level-security policies (see the migrations) key on
//! that setting, so visibility is enforced inside the storage boundary even
//! if an application query forgets its tenant predicate. Queries still carry
//! explicit `tenant_id` filters as a second fence.

use diesel::prelude::*;
use diesel::sql_types::Text;
use uuid::Uuid;

/// Identity of the authenticated caller, carried explicitly into every
/// engine operation.
#[derive(Debug, Clone)]
pub struct TenantContext {
    pub tenant_id: Uuid,
    pub user_id: Option<Uuid>,
    pub role: Option<String>,
}

impl TenantContext {
    pub fn new(tenant_id: Uuid) -> Self {
        Self {
            tenant_id,
            user_id: None,
            role: None,
        }
    }

    pub fn with_user(mut self, user_id: Uuid) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }
}

/// Runs `f` in a transaction with the tenant identity bound for its
/// duration. Commits on `Ok`, rolls back on `Err` (and on panic, via
/// diesel's transaction guard).
pub fn with_tenant<T, E, F>(conn: &mut PgConnection, tenant_id: Uuid, f: F) -> Result<T, E>
where
    F: FnOnce(&mut PgConnection) -> Result<T, E>,
    E: From<diesel::result::Error>,
{
    conn.transaction(|conn| {
        set_current_tenant(conn, tenant_id).map_err(E::from)?;
        f(conn)
    })
}

/// Binds `app.tenant_id` for the current transaction only
/// (`set_config(..., is_local := true)` has `SET LOCAL` semantics).
fn set_current_tenant(conn: &mut PgConnection, tenant_id: Uuid) -> QueryResult<()> {
    diesel::sql_query("SELECT set_config('app.tenant_id', $1, true)")
        .bind::<Text, _>(tenant_id.to_string())
        .execute(conn)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tenant_context_builder() {
        let tenant = Uuid::new_v4();
        let user = Uuid::new_v4();

        let ctx = TenantContext::new(tenant).with_user(user).with_role("admin");

        assert_eq!(ctx.tenant_id, tenant);
        assert_eq!(ctx.user_id, Some(user));
        assert_eq!(ctx.role.as_deref(), Some("admin"));
    }

    #[test]
    fn test_tenant_context_defaults() {
        let ctx = TenantContext::new(Uuid::new_v4());
        assert!(ctx.user_id.is_none());
        assert!(ctx.role.is_none());
    }
}
