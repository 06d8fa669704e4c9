//! Default tenants and users.

use std::sync::OnceLock;

use chrono::Utc;

use crate::auth::password::hash_password;
use crate::error::RepositoryError;
use crate::models::{Role, SubscriptionPlan, Tenant, User};
use crate::store::{Collection, Snapshot};

/// Password shared by every seeded account.
pub const SEED_PASSWORD: &str = "password";

struct TenantSeed {
    slug: &'static str,
    name: &'static str,
}

struct UserSeed {
    email: &'static str,
    role: Role,
    tenant_slug: &'static str,
}

const TENANTS: &[TenantSeed] = &[
    TenantSeed {
        slug: "acme",
        name: "Acme Corp",
    },
    TenantSeed {
        slug: "globex",
        name: "Globex Corp",
    },
];

const USERS: &[UserSeed] = &[
    UserSeed {
        email: "admin@acme.test",
        role: Role::Admin,
        tenant_slug: "acme",
    },
    UserSeed {
        email: "user@acme.test",
        role: Role::Member,
        tenant_slug: "acme",
    },
    UserSeed {
        email: "admin@globex.test",
        role: Role::Admin,
        tenant_slug: "globex",
    },
    UserSeed {
        email: "user@globex.test",
        role: Role::Member,
        tenant_slug: "globex",
    },
];

/// Seeds tenants when none exist and users when none exist. Notes are left alone.
///
/// Returns `true` when anything was added.
pub fn seed_defaults(snapshot: &mut Snapshot) -> Result<bool, RepositoryError> {
    let mut changed = false;
    let now = Utc::now();

    if snapshot.tenants.is_empty() {
        for seed in TENANTS {
            let id = snapshot.next_id(Collection::Tenants);
            snapshot.tenants.push(Tenant {
                id,
                slug: seed.slug.to_string(),
                name: seed.name.to_string(),
                subscription_plan: SubscriptionPlan::Free,
                created_at: now,
            });
        }
        tracing::info!(count = TENANTS.len(), "Seeded default tenants");
        changed = true;
    }

    if snapshot.users.is_empty() {
        let password_hash = seed_password_hash()?;
        for seed in USERS {
            let Some(tenant_id) = snapshot
                .tenants
                .iter()
                .find(|t| t.slug == seed.tenant_slug)
                .map(|t| t.id)
            else {
                tracing::warn!(
                    email = seed.email,
                    tenant = seed.tenant_slug,
                    "Skipping seed user; tenant does not exist"
                );
                continue;
            };

            let id = snapshot.next_id(Collection::Users);
            snapshot.users.push(User {
                id,
                email: seed.email.to_string(),
                password_hash: password_hash.clone(),
                role: seed.role,
                tenant_id,
                created_at: now,
            });
        }
        tracing::info!(count = snapshot.users.len(), "Seeded default users");
        changed = true;
    }

    Ok(changed)
}

/// Hashes [`SEED_PASSWORD`] once per process; every seeded account shares the hash.
fn seed_password_hash() -> Result<String, RepositoryError> {
    static HASH: OnceLock<String> = OnceLock::new();

    if let Some(hash) = HASH.get() {
        return Ok(hash.clone());
    }

    let hash = hash_password(SEED_PASSWORD).map_err(|e| RepositoryError::Password(e.to_string()))?;
    Ok(HASH.get_or_init(|| hash).clone())
}
