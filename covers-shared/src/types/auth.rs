use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Diner,
    Staff,
    Admin,
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UserRole::Diner => write!(f, "diner"),
            UserRole::Staff => write!(f, "staff"),
            UserRole::Admin => write!(f, "admin"),
        }
    }
}

impl std::str::FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "diner" => Ok(UserRole::Diner),
            "staff" => Ok(UserRole::Staff),
            "admin" => Ok(UserRole::Admin),
            _ => Err(format!("unknown role: {s}")),
        }
    }
}

/// JWT claims issued by the auth service. Staff tokens carry the
/// restaurant they are scoped to; diner and admin tokens do not.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub role: UserRole,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub restaurant_id: Option<Uuid>,
    pub iat: i64,
    pub exp: i64,
    pub jti: Uuid,
}

impl Claims {
    pub fn new(user_id: Uuid, role: UserRole, duration_secs: i64) -> Self {
        let now = Utc::now().timestamp();
        Self {
            sub: user_id,
            role,
            restaurant_id: None,
            iat: now,
            exp: now + duration_secs,
            jti: Uuid::now_v7(),
        }
    }

    pub fn for_restaurant(mut self, restaurant_id: Uuid) -> Self {
        self.restaurant_id = Some(restaurant_id);
        self
    }

    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() > self.exp
    }

    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    pub fn is_staff(&self) -> bool {
        matches!(self.role, UserRole::Staff | UserRole::Admin)
    }
}

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub role: UserRole,
    pub restaurant_id: Option<Uuid>,
    pub token_id: Uuid,
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self {
            id: claims.sub,
            role: claims.role,
            restaurant_id: claims.restaurant_id,
            token_id: claims.jti,
        }
    }
}

impl AuthUser {
    /// Staff may only act on the restaurant their token is scoped to;
    /// admins may act on any.
    pub fn can_manage_restaurant(&self, restaurant_id: Uuid) -> bool {
        match self.role {
            UserRole::Admin => true,
            UserRole::Staff => self.restaurant_id == Some(restaurant_id),
            UserRole::Diner => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn staff_scoped_to_own_restaurant() {
        let restaurant = Uuid::new_v4();
        let other = Uuid::new_v4();
        let user = AuthUser {
            id: Uuid::new_v4(),
            role: UserRole::Staff,
            restaurant_id: Some(restaurant),
            token_id: Uuid::now_v7(),
        };
        assert!(user.can_manage_restaurant(restaurant));
        assert!(!user.can_manage_restaurant(other));
    }

    #[test]
    fn admin_manages_any_restaurant() {
        let user = AuthUser {
            id: Uuid::new_v4(),
            role: UserRole::Admin,
            restaurant_id: None,
            token_id: Uuid::now_v7(),
        };
        assert!(user.can_manage_restaurant(Uuid::new_v4()));
    }

    #[test]
    fn role_round_trips_through_str() {
        for role in [UserRole::Diner, UserRole::Staff, UserRole::Admin] {
            let parsed: UserRole = role.to_string().parse().unwrap();
            assert_eq!(parsed, role);
        }
        assert!("manager".parse::<UserRole>().is_err());
    }
}
