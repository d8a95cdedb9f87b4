use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use sitedesk_services::auth::AuthError;
use sitedesk_services::dao::base::DaoError;

/// Every failure leaving this API carries a stable machine code; clients
/// branch on `code`, never on the human-readable message.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "BAD_REQUEST", message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "NOT_FOUND", message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::UNPROCESSABLE_ENTITY,
            "VALIDATION_FAILED",
            message,
        )
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL", message)
    }
}

#[derive(Serialize)]
struct ErrorBody {
    ok: bool,
    code: &'static str,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            ok: false,
            code: self.code,
            message: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<DaoError> for ApiError {
    fn from(err: DaoError) -> Self {
        use StatusCode as S;

        let message = err.to_string();
        let (status, code) = match err {
            DaoError::NotFound => (S::NOT_FOUND, "NOT_FOUND"),
            DaoError::DuplicateKey(_) => (S::CONFLICT, "CONFLICT"),
            DaoError::Validation(_) => (S::UNPROCESSABLE_ENTITY, "VALIDATION_FAILED"),

            DaoError::PermissionDenied { .. } => (S::FORBIDDEN, "TENANT_PERMISSION_DENIED"),
            DaoError::OwnerOnly => (S::FORBIDDEN, "FORBIDDEN"),

            DaoError::LastOwnerProtected => {
                (S::UNPROCESSABLE_ENTITY, "TENANT_LAST_OWNER_PROTECTED")
            }
            DaoError::AlreadyOwner => (S::UNPROCESSABLE_ENTITY, "TENANT_MEMBER_ALREADY_OWNER"),
            DaoError::InvalidRole(_) => (S::UNPROCESSABLE_ENTITY, "TENANT_INVALID_ROLE"),

            DaoError::InviteInvalidToken => (S::NOT_FOUND, "TENANT_INVITE_INVALID_TOKEN"),
            DaoError::InviteAlreadyMember => {
                (S::UNPROCESSABLE_ENTITY, "TENANT_INVITE_ALREADY_MEMBER")
            }
            DaoError::InviteAlreadyPending => {
                (S::UNPROCESSABLE_ENTITY, "TENANT_INVITE_ALREADY_PENDING")
            }
            DaoError::InviteEmailMismatch => {
                (S::UNPROCESSABLE_ENTITY, "TENANT_INVITE_EMAIL_MISMATCH")
            }
            DaoError::InviteExpired => (S::UNPROCESSABLE_ENTITY, "TENANT_INVITE_EXPIRED"),
            DaoError::InviteAlreadyAccepted => {
                (S::UNPROCESSABLE_ENTITY, "TENANT_INVITE_ALREADY_ACCEPTED")
            }
            DaoError::InviteAlreadyDeclined => {
                (S::UNPROCESSABLE_ENTITY, "TENANT_INVITE_ALREADY_DECLINED")
            }
            DaoError::InviteAlreadyRevoked => {
                (S::UNPROCESSABLE_ENTITY, "TENANT_INVITE_ALREADY_REVOKED")
            }

            DaoError::Mongo(_) | DaoError::BsonSer(_) | DaoError::BsonDe(_) => {
                (S::INTERNAL_SERVER_ERROR, "INTERNAL")
            }
        };

        Self::new(status, code, message)
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials => Self::unauthorized("Invalid credentials"),
            AuthError::TokenExpired => Self::unauthorized("Token expired"),
            AuthError::InvalidToken(msg) => Self::unauthorized(msg),
            AuthError::HashError(msg) => Self::internal(msg),
        }
    }
}
