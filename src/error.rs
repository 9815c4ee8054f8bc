use thiserror::Error;

/// Validation failures raised by the ACL core.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AclError {
    #[error("Invalid address '{input}': {reason}")]
    InvalidAddress { input: String, reason: String },
}

impl AclError {
    pub fn invalid(input: &str, reason: impl Into<String>) -> Self {
        AclError::InvalidAddress {
            input: input.to_string(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Authentication failed")]
    AuthFailed,

    #[error(transparent)]
    Acl(#[from] AclError),
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        use axum::http::StatusCode;
        use axum::Json;
        use serde_json::json;

        let status = match &self {
            AppError::AuthFailed => StatusCode::UNAUTHORIZED,
            AppError::Acl(_) => StatusCode::BAD_REQUEST,
        };

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
