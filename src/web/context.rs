//! Request context, e.g. user id, its role, etc.
//!

use axum::{extract::FromRequestParts, http::request::Parts};
use serde::{Deserialize, Serialize};

use crate::web::{WebResult, error::WebError};

#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    user_id: uuid::Uuid,
    user_role: UserRole,
}

impl AuthenticatedUser {
    pub fn new(user_id: uuid::Uuid, user_role: UserRole) -> Self {
        Self { user_id, user_role }
    }

    /// System actor used for internal lookups (sign-in, bootstrap, CLI).
    pub fn admin() -> Self {
        Self {
            user_role: UserRole::Admin,
            user_id: uuid::Uuid::max(), // admin ID
        }
    }

    pub fn user_id(&self) -> uuid::Uuid {
        self.user_id
    }

    pub fn user_role(&self) -> UserRole {
        self.user_role
    }

    pub fn is_admin(&self) -> bool {
        self.user_role == UserRole::Admin
    }

    /// Trainers and admins may author courses, groups and assessments.
    pub fn can_author(&self) -> bool {
        matches!(self.user_role, UserRole::Admin | UserRole::Trainer)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    Trainer,
    Trainee,
}

impl From<&str> for UserRole {
    fn from(value: &str) -> Self {
        match value {
            "admin" => Self::Admin,
            "trainer" => Self::Trainer,
            _ => Self::Trainee,
        }
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Admin => write!(f, "admin"),
            Self::Trainer => write!(f, "trainer"),
            Self::Trainee => write!(f, "trainee"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RequestContext {
    maybe_user: Option<AuthenticatedUser>,
}

impl RequestContext {
    pub fn new(maybe_user: Option<AuthenticatedUser>) -> Self {
        Self { maybe_user }
    }

    pub fn admin() -> Self {
        Self::new(Some(AuthenticatedUser::admin()))
    }

    pub fn maybe_user(&self) -> Option<&AuthenticatedUser> {
        self.maybe_user.as_ref()
    }

    pub fn user(&self) -> WebResult<&AuthenticatedUser> {
        self.maybe_user.as_ref().ok_or(WebError::auth_required())
    }

    /// Signed-in admin or trainer.
    pub fn author(&self) -> WebResult<&AuthenticatedUser> {
        let user = self.user()?;
        if user.can_author() {
            Ok(user)
        } else {
            Err(WebError::role_forbidden())
        }
    }

    pub fn admin_user(&self) -> WebResult<&AuthenticatedUser> {
        let user = self.user()?;
        if user.is_admin() {
            Ok(user)
        } else {
            Err(WebError::role_forbidden())
        }
    }
}

impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = WebError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let ctx = parts.extensions.get::<RequestContext>();
        if let Some(ctx) = ctx {
            Ok(ctx.clone())
        } else {
            Ok(RequestContext::new(None))
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn role_parsing_defaults_to_trainee() {
        assert_eq!(UserRole::from("admin"), UserRole::Admin);
        assert_eq!(UserRole::from("trainer"), UserRole::Trainer);
        assert_eq!(UserRole::from("trainee"), UserRole::Trainee);
        assert_eq!(UserRole::from("superuser"), UserRole::Trainee);
        assert_eq!(UserRole::from(UserRole::Trainer.to_string().as_str()), UserRole::Trainer);
    }

    #[test]
    fn author_gate() {
        let trainee = RequestContext::new(Some(AuthenticatedUser::new(
            uuid::Uuid::new_v4(),
            UserRole::Trainee,
        )));
        assert!(trainee.user().is_ok());
        assert!(trainee.author().is_err());
        assert!(trainee.admin_user().is_err());

        let trainer = RequestContext::new(Some(AuthenticatedUser::new(
            uuid::Uuid::new_v4(),
            UserRole::Trainer,
        )));
        assert!(trainer.author().is_ok());
        assert!(trainer.admin_user().is_err());

        assert!(RequestContext::admin().admin_user().is_ok());
        assert!(RequestContext::new(None).user().is_err());
    }
}
