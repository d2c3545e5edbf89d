//! Role-precedence authorization.
//!
//! The mutation-endpoint policy is "ownership OR sufficient rank": the
//! resource owner is always allowed without consulting role precedence;
//! only non-owners fall back to the rank comparison.

use rookery_core::{RoleStore, User};

use crate::error::AuthError;

/// Compares the user's role rank against the named required role.
///
/// Resolves `required_role` via the role store; an unknown name fails with
/// `RoleNotFound`. Otherwise allowed iff `user.role.level >= required.level`.
pub async fn has_precedence(
    user: &User,
    required_role: &str,
    roles: &dyn RoleStore,
) -> Result<bool, AuthError> {
    let required = roles
        .get_by_name(required_role)
        .await?
        .ok_or_else(|| AuthError::role_not_found(required_role))?;

    Ok(user.role.level >= required.level)
}

/// Ownership short-circuit, then role precedence.
pub async fn owner_or_precedence(
    user: &User,
    owner_id: i64,
    required_role: &str,
    roles: &dyn RoleStore,
) -> Result<bool, AuthError> {
    if user.owns(owner_id) {
        return Ok(true);
    }
    has_precedence(user, required_role, roles).await
}

#[cfg(test)]
mod tests {
    use rookery_core::{MemoryStorage, Role, User};

    use super::*;

    fn user_with_role(id: i64, role: Role) -> User {
        User::new(id, "tester", "tester@rookery.dev", role)
    }

    #[tokio::test]
    async fn owner_is_allowed_regardless_of_rank() {
        let storage = MemoryStorage::with_default_roles();
        let lowly = user_with_role(3, Role::new("user", 1));

        let allowed = owner_or_precedence(&lowly, 3, "admin", &storage).await.unwrap();
        assert!(allowed);
    }

    #[tokio::test]
    async fn non_owner_needs_sufficient_rank() {
        let storage = MemoryStorage::with_default_roles();

        let moderator = user_with_role(5, Role::new("moderator", 2));
        assert!(
            owner_or_precedence(&moderator, 3, "moderator", &storage)
                .await
                .unwrap()
        );

        let plain = user_with_role(6, Role::new("user", 1));
        assert!(
            !owner_or_precedence(&plain, 3, "moderator", &storage)
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn equal_rank_is_sufficient() {
        let storage = MemoryStorage::with_default_roles();
        let moderator = user_with_role(5, Role::new("moderator", 2));

        assert!(has_precedence(&moderator, "moderator", &storage).await.unwrap());
    }

    #[tokio::test]
    async fn unknown_role_fails_with_role_not_found() {
        let storage = MemoryStorage::with_default_roles();
        let user = user_with_role(1, Role::new("user", 1));

        let err = has_precedence(&user, "archon", &storage).await.unwrap_err();
        assert!(matches!(err, AuthError::RoleNotFound { .. }));
    }
}
