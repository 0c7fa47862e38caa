use crate::{JwtClaims, Role, UserId};

/// The user on whose behalf an operation runs.
///
/// Passed explicitly into services instead of being read from ambient session state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser {
    user_id: UserId,
    roles: Vec<Role>,
}

impl CurrentUser {
    pub fn new(user_id: UserId, roles: Vec<Role>) -> Self {
        Self { user_id, roles }
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn roles(&self) -> &[Role] {
        &self.roles
    }
}

impl From<JwtClaims> for CurrentUser {
    fn from(claims: JwtClaims) -> Self {
        Self::new(claims.sub, claims.roles)
    }
}
