use serde::Deserialize;
use uuid::Uuid;

use crate::web::UserRole;

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct SignupBody {
    pub username: String,
    pub password: String,
    pub email: Option<String>,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct SigninBody {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct AccountUpdateBody {
    pub username: String,
    pub email: Option<String>,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct RoleAssignBody {
    pub role: UserRole,
    pub department_id: Option<Uuid>,
}

impl SignupBody {
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.username.trim().is_empty() {
            return Err("username must not be empty");
        }
        if self.password.len() < 4 {
            return Err("password must have at least 4 characters");
        }
        if let Some(email) = &self.email {
            if !email.contains('@') {
                return Err("email is invalid");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn body(username: &str, password: &str, email: Option<&str>) -> SignupBody {
        SignupBody {
            username: username.to_string(),
            password: password.to_string(),
            email: email.map(String::from),
        }
    }

    #[test]
    fn signup_body_validation() {
        assert!(body("alice", "secret", None).validate().is_ok());
        assert!(body("alice", "secret", Some("alice@example.com")).validate().is_ok());
        assert!(body("  ", "secret", None).validate().is_err());
        assert!(body("alice", "abc", None).validate().is_err());
        assert!(body("alice", "secret", Some("nope")).validate().is_err());
    }
}
