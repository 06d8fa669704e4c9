//! Credential verification against stored password hashes.

use super::{AuthError, AuthUser, password::verify_password};
use crate::repositories::UserRepository;
use crate::store::Store;

/// Look up `email` (joined with its tenant) and check `password` against the stored hash.
///
/// Returns `Ok(None)` when the user does not exist, the password does not match,
/// or the stored hash cannot be read.
pub async fn authenticate(
    store: &Store,
    email: &str,
    password: &str,
) -> Result<Option<AuthUser>, AuthError> {
    let Some((user, tenant)) = UserRepository::new(store)
        .find_with_tenant_by_email(email)
        .await
    else {
        return Ok(None);
    };

    let hash = user.password_hash.clone();
    let candidate = password.to_string();
    let verified = tokio::task::spawn_blocking(move || verify_password(&candidate, &hash))
        .await
        .map_err(|e| AuthError::Crypto(format!("password verification task failed: {e}")))?;

    // An unreadable stored hash never matches.
    let matches = verified.unwrap_or_else(|err| {
        tracing::warn!(user_id = user.id, error = %err, "Stored password hash is unusable");
        false
    });
    if !matches {
        return Ok(None);
    }

    Ok(Some(AuthUser {
        id: user.id,
        email: user.email,
        role: user.role,
        tenant_id: user.tenant_id,
        tenant_slug: tenant.slug,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;
    use crate::seeds::SEED_PASSWORD;

    #[tokio::test]
    async fn seeded_admin_authenticates() {
        let store = Store::in_memory().unwrap();

        let user = authenticate(&store, "admin@acme.test", SEED_PASSWORD)
            .await
            .unwrap()
            .expect("credentials should match");

        assert_eq!(user.email, "admin@acme.test");
        assert_eq!(user.role, Role::Admin);
        assert_eq!(user.tenant_slug, "acme");
    }

    #[tokio::test]
    async fn wrong_password_or_unknown_email_is_no_match() {
        let store = Store::in_memory().unwrap();

        assert!(
            authenticate(&store, "admin@acme.test", "wrong")
                .await
                .unwrap()
                .is_none()
        );
        assert!(
            authenticate(&store, "nobody@acme.test", SEED_PASSWORD)
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn unusable_stored_hash_is_no_match() {
        let store = Store::in_memory().unwrap();
        store
            .mutate(|data| {
                let user = data
                    .users
                    .iter_mut()
                    .find(|u| u.email == "user@acme.test")
                    .unwrap();
                user.password_hash = "not-a-hash".to_string();
                Ok::<_, AuthError>(())
            })
            .await
            .unwrap();

        assert!(
            authenticate(&store, "user@acme.test", SEED_PASSWORD)
                .await
                .unwrap()
                .is_none()
        );
    }
}
