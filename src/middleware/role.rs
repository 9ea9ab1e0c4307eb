use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
    Extension,
};

use super::auth::AuthUser;
use crate::database::models::{Role, User};
use crate::database::Store;
use crate::error::ApiError;
use crate::state::AppState;

/// RoleGuard: loads the stored account for an already verified identity and
/// requires it to hold `required`.
pub async fn require_role(store: &dyn Store, identity: &AuthUser, required: Role) -> Result<User, ApiError> {
    let user = store.find_user_by_email(&identity.email).await?;

    match user {
        Some(user) if user.role == required => Ok(user),
        Some(user) => {
            tracing::warn!("{} has role {:?}, {:?} required", identity.email, user.role, required);
            Err(ApiError::forbidden("forbidden message"))
        }
        None => {
            tracing::warn!("{} has no account, {:?} required", identity.email, required);
            Err(ApiError::forbidden("forbidden message"))
        }
    }
}

/// Layer form of [`require_role`] for administrator routes. Takes the
/// identity as an extractor, so it only composes inside `require_identity`;
/// without it the request fails with a server error.
pub async fn require_admin(
    State(state): State<AppState>,
    Extension(identity): Extension<AuthUser>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    require_role(state.store.as_ref(), &identity, Role::Admin).await?;
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryStore;

    fn user(email: &str, role: Role) -> User {
        User {
            id: None,
            name: None,
            email: email.to_string(),
            photo_url: None,
            role,
        }
    }

    fn identity(email: &str) -> AuthUser {
        AuthUser {
            email: email.to_string(),
        }
    }

    #[tokio::test]
    async fn admin_passes() {
        let store = MemoryStore::new();
        store.insert_user(user("boss@x.com", Role::Admin)).await.unwrap();

        let found = require_role(&store, &identity("boss@x.com"), Role::Admin).await.unwrap();
        assert_eq!(found.email, "boss@x.com");
    }

    #[tokio::test]
    async fn member_and_unknown_are_forbidden() {
        let store = MemoryStore::new();
        store.insert_user(user("u1@test.com", Role::Member)).await.unwrap();

        let err = require_role(&store, &identity("u1@test.com"), Role::Admin).await.unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));

        let err = require_role(&store, &identity("ghost@x.com"), Role::Admin).await.unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));
    }
}
