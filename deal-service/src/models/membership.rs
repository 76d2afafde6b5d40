//! Membership model - the authorization link between a principal and an
//! organization. At most one row exists per (organization, user) pair.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Role within an organization. Variant order is the privilege order, so
/// the derived `Ord` gives member < admin < owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Member,
    Admin,
    Owner,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Member => "member",
            Role::Admin => "admin",
            Role::Owner => "owner",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "member" => Some(Role::Member),
            "admin" => Some(Role::Admin),
            "owner" => Some(Role::Owner),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Membership {
    pub membership_id: Uuid,
    pub organization_id: Uuid,
    pub user_id: Uuid,
    pub role_code: String,
    pub created_utc: DateTime<Utc>,
}

impl Membership {
    pub fn new(organization_id: Uuid, user_id: Uuid, role: Role) -> Self {
        Self {
            membership_id: Uuid::new_v4(),
            organization_id,
            user_id,
            role_code: role.as_str().to_string(),
            created_utc: Utc::now(),
        }
    }

    /// True when the stored role grants at least `min` privileges. An
    /// unrecognized role code (schema drift) grants nothing.
    pub fn has_role_at_least(&self, min: Role) -> bool {
        Role::parse(&self.role_code).is_some_and(|role| role >= min)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_order_is_member_admin_owner() {
        assert!(Role::Member < Role::Admin);
        assert!(Role::Admin < Role::Owner);
    }

    #[test]
    fn unknown_role_code_grants_nothing() {
        let mut m = Membership::new(Uuid::new_v4(), Uuid::new_v4(), Role::Owner);
        m.role_code = "superuser".to_string();
        assert!(!m.has_role_at_least(Role::Member));
    }

    #[test]
    fn admin_satisfies_member_requirement() {
        let m = Membership::new(Uuid::new_v4(), Uuid::new_v4(), Role::Admin);
        assert!(m.has_role_at_least(Role::Member));
        assert!(m.has_role_at_least(Role::Admin));
        assert!(!m.has_role_at_least(Role::Owner));
    }
}
