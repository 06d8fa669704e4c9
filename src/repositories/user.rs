//! # User Repository

use chrono::Utc;

use crate::error::RepositoryError;
use crate::models::{Role, Tenant, User};
use crate::store::{Collection, Store};

/// Request data for creating a new user
#[derive(Debug, Clone)]
pub struct CreateUserRequest {
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub tenant_id: i64,
}

/// Repository for User records
pub struct UserRepository<'a> {
    store: &'a Store,
}

impl<'a> UserRepository<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self { store }
    }

    /// Get user by ID
    pub async fn get_by_id(&self, user_id: i64) -> Option<User> {
        self.store
            .read(|data| data.users.iter().find(|u| u.id == user_id).cloned())
            .await
    }

    /// Get user by email. Emails compare case-insensitively.
    pub async fn get_by_email(&self, email: &str) -> Option<User> {
        self.store
            .read(|data| {
                data.users
                    .iter()
                    .find(|u| u.email.eq_ignore_ascii_case(email))
                    .cloned()
            })
            .await
    }

    /// Get a user together with the tenant it belongs to.
    pub async fn find_with_tenant_by_email(&self, email: &str) -> Option<(User, Tenant)> {
        self.store
            .read(|data| {
                let user = data
                    .users
                    .iter()
                    .find(|u| u.email.eq_ignore_ascii_case(email))?;
                let tenant = data.tenants.iter().find(|t| t.id == user.tenant_id)?;
                Some((user.clone(), tenant.clone()))
            })
            .await
    }

    /// List the users of one tenant
    pub async fn list_by_tenant(&self, tenant_id: i64) -> Vec<User> {
        self.store
            .read(|data| {
                data.users
                    .iter()
                    .filter(|u| u.tenant_id == tenant_id)
                    .cloned()
                    .collect()
            })
            .await
    }

    /// Create a user. Fails with `Conflict` when the email is already taken in any tenant.
    pub async fn create_user(&self, request: CreateUserRequest) -> Result<User, RepositoryError> {
        self.store
            .mutate(|data| {
                if data
                    .users
                    .iter()
                    .any(|u| u.email.eq_ignore_ascii_case(&request.email))
                {
                    return Err(RepositoryError::Conflict(
                        "User with this email already exists".to_string(),
                    ));
                }

                if !data.tenants.iter().any(|t| t.id == request.tenant_id) {
                    return Err(RepositoryError::not_found("Tenant not found"));
                }

                let user = User {
                    id: data.next_id(Collection::Users),
                    email: request.email,
                    password_hash: request.password_hash,
                    role: request.role,
                    tenant_id: request.tenant_id,
                    created_at: Utc::now(),
                };
                data.users.push(user.clone());
                Ok(user)
            })
            .await
    }
}
