use axum::{Json, http::StatusCode, response::IntoResponse};
use thiserror::Error;

use crate::{
    auth::CryptError,
    error::log_error,
    model::{DatabaseError, ResourceType},
    services::MeetingError,
};

pub type WebResult<T> = std::result::Result<T, WebError>;

#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error("RegistrationUserConflict")]
    RegistrationUserConflict,
}

#[derive(Debug, Error)]
pub enum AuthenticationError {
    #[error("AuthenticationCookieNotFound, cookie: {cookie}")]
    AuthenticationCookieNotFound { cookie: String },

    #[error("AuthenticationCookieInvalid, cookie: {cookie}. Error: {error}")]
    AuthenticationCookieInvalid {
        cookie: String,
        error: CryptError,
    },

    #[error("AuthenticationRequired")]
    AuthenticationRequired,

    #[error("AuthenticationInvalidCredentials")]
    AuthenticationInvalidCredentials,

    #[error("AuthenticationRoleForbidden")]
    AuthenticationRoleForbidden,
}

#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("ResourceNotFound: {resource_type:?}")]
    ResourceNotFound { resource_type: ResourceType },

    #[error("ResourceForbidden: {resource_type:?}")]
    ResourceForbidden { resource_type: ResourceType },

    #[error("ResourceConflict: {resource_type:?}, {what}")]
    ResourceConflict {
        resource_type: ResourceType,
        what: &'static str,
    },

    #[error("ResourceFetchError: {resource_type:?}. Error: {error}")]
    ResourceFetchError {
        resource_type: ResourceType,
        error: DatabaseError,
    },

    #[error("ResourceBadRequest: {resource_type:?}, {details}")]
    ResourceBadRequest {
        resource_type: ResourceType,
        details: String,
    },
}

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("ServerCryptError: {0}")]
    ServerCryptError(#[from] CryptError),
    #[error("ServerMeetingError: {0}")]
    ServerMeetingError(#[from] MeetingError),
}

impl ServerError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::ServerCryptError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ServerMeetingError(MeetingError::NotConfigured) => StatusCode::CONFLICT,
            Self::ServerMeetingError(_) => StatusCode::BAD_GATEWAY,
        }
    }

    pub fn client_display(&self) -> String {
        match self {
            Self::ServerCryptError(_) => String::from("Internal server error."),
            Self::ServerMeetingError(MeetingError::NotConfigured) => {
                String::from("Meeting provider is not configured.")
            }
            Self::ServerMeetingError(_) => String::from("Meeting provider request failed."),
        }
    }
}

impl RegistrationError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::RegistrationUserConflict => StatusCode::CONFLICT,
        }
    }

    pub fn client_display(&self) -> String {
        match self {
            Self::RegistrationUserConflict => {
                String::from("Registration error, user already exists.")
            }
        }
    }
}

impl AuthenticationError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::AuthenticationRequired => StatusCode::UNAUTHORIZED,
            Self::AuthenticationCookieNotFound { .. } => StatusCode::NOT_FOUND,
            Self::AuthenticationInvalidCredentials => StatusCode::UNAUTHORIZED,
            Self::AuthenticationCookieInvalid { .. } => StatusCode::BAD_REQUEST,
            Self::AuthenticationRoleForbidden => StatusCode::FORBIDDEN,
        }
    }

    pub fn client_display(&self) -> String {
        match self {
            Self::AuthenticationCookieInvalid { .. } => {
                String::from("Authentication error, cookie invalid.")
            }
            Self::AuthenticationCookieNotFound { .. } => {
                String::from("Authentication error, cookie not found.")
            }
            Self::AuthenticationRequired => String::from("Authentication required."),
            Self::AuthenticationInvalidCredentials => {
                String::from("Authentication error, user not found or password is invalid.")
            }
            Self::AuthenticationRoleForbidden => {
                String::from("Authentication error, your role does not allow this.")
            }
        }
    }
}

impl ResourceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::ResourceNotFound { .. } => StatusCode::NOT_FOUND,
            Self::ResourceForbidden { .. } => StatusCode::FORBIDDEN,
            Self::ResourceConflict { .. } => StatusCode::CONFLICT,
            Self::ResourceFetchError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ResourceBadRequest { .. } => StatusCode::BAD_REQUEST,
        }
    }

    pub fn client_display(&self) -> String {
        match self {
            Self::ResourceNotFound { .. } => String::from("Resource error, resource not found."),
            Self::ResourceForbidden { .. } => String::from("Resource error, resource forbidden."),
            Self::ResourceConflict { what, .. } => {
                format!("Resource error, conflict on {what}.")
            }
            Self::ResourceFetchError { .. } => {
                String::from("Resource error, unable to fetch resource.")
            }
            Self::ResourceBadRequest { details, .. } => {
                format!("Resource error, bad request: {details}")
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum WebError {
    #[error("ResourceError - {0}")]
    ResourceError(#[from] ResourceError),
    #[error("AuthenticationError - {0}")]
    AuthenticationError(#[from] AuthenticationError),
    #[error("RegistrationError - {0}")]
    RegistrationError(#[from] RegistrationError),
    #[error("ServerError - {0}")]
    ServerError(#[from] ServerError),
}

impl WebError {
    pub fn resource_not_found(r#type: ResourceType) -> Self {
        Self::ResourceError(ResourceError::ResourceNotFound {
            resource_type: r#type,
        })
    }

    pub fn resource_forbidden(r#type: ResourceType) -> Self {
        Self::ResourceError(ResourceError::ResourceForbidden {
            resource_type: r#type,
        })
    }

    pub fn resource_conflict(r#type: ResourceType, what: &'static str) -> Self {
        Self::ResourceError(ResourceError::ResourceConflict {
            resource_type: r#type,
            what,
        })
    }

    pub fn resource_fetch_error(r#type: ResourceType, error: DatabaseError) -> Self {
        Self::ResourceError(ResourceError::ResourceFetchError {
            resource_type: r#type,
            error,
        })
    }

    pub fn resource_bad_request<S: Into<String>>(r#type: ResourceType, details: S) -> Self {
        Self::ResourceError(ResourceError::ResourceBadRequest {
            resource_type: r#type,
            details: details.into(),
        })
    }

    /// Maps repository failures onto the matching client-facing error.
    pub fn from_db(r#type: ResourceType, error: DatabaseError) -> Self {
        match error {
            DatabaseError::Forbidden => Self::resource_forbidden(r#type),
            DatabaseError::Conflict(what) => Self::resource_conflict(r#type, what),
            DatabaseError::Validation(details) => Self::resource_bad_request(r#type, details),
            e => Self::resource_fetch_error(r#type, e),
        }
    }

    pub fn auth_cookie_not_found<S: Into<String>>(cookie: S) -> Self {
        Self::AuthenticationError(AuthenticationError::AuthenticationCookieNotFound {
            cookie: cookie.into(),
        })
    }

    pub fn auth_cookie_invalid<S: Into<String>>(cookie: S, error: CryptError) -> Self {
        Self::AuthenticationError(AuthenticationError::AuthenticationCookieInvalid {
            cookie: cookie.into(),
            error,
        })
    }

    pub fn auth_required() -> Self {
        Self::AuthenticationError(AuthenticationError::AuthenticationRequired)
    }

    pub fn auth_invalid_credentials() -> Self {
        Self::AuthenticationError(AuthenticationError::AuthenticationInvalidCredentials)
    }

    pub fn role_forbidden() -> Self {
        Self::AuthenticationError(AuthenticationError::AuthenticationRoleForbidden)
    }

    pub fn registration_conflict() -> Self {
        Self::RegistrationError(RegistrationError::RegistrationUserConflict)
    }

    pub fn server_crypt_error(e: CryptError) -> Self {
        Self::ServerError(ServerError::ServerCryptError(e))
    }

    pub fn server_meeting_error(e: MeetingError) -> Self {
        Self::ServerError(ServerError::ServerMeetingError(e))
    }

    pub fn status_code(&self) -> axum::http::StatusCode {
        match self {
            Self::ResourceError(e) => e.status_code(),
            Self::RegistrationError(e) => e.status_code(),
            Self::AuthenticationError(e) => e.status_code(),
            Self::ServerError(e) => e.status_code(),
        }
    }

    pub fn client_display(&self) -> String {
        match self {
            Self::ResourceError(e) => e.client_display(),
            Self::RegistrationError(e) => e.client_display(),
            Self::AuthenticationError(e) => e.client_display(),
            Self::ServerError(e) => e.client_display(),
        }
    }
}

#[derive(serde::Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    /// Human-readable message for the client
    pub message: String,
    /// HTTP status code (stringified)
    pub status_code: String,
    /// Optional debug details (only in debug mode)
    pub details: Option<String>,
}

impl IntoResponse for WebError {
    fn into_response(self) -> axum::response::Response {
        log_error(&self);

        let status_code = self.status_code();
        let display = self.client_display();

        let body = ErrorResponse {
            message: display,
            status_code: status_code.as_str().to_string(),
            details: if cfg!(debug_assertions) {
                Some(self.to_string())
            } else {
                None
            },
        };

        (status_code, Json(body)).into_response()
    }
}
