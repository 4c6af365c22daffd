use crate::auth::header::AuthenticationError;
use crate::config::RegexType;
use crate::error::ErrorKind;
use crate::model::enums::{ResourceProperty, ResourceType, TagType};
use crate::string::SmallString;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use diesel::QueryResult;
use serde::Serialize;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub enum ApiError {
    #[error("{0} already exists")]
    AlreadyExists(ResourceProperty),
    #[error("{0} cannot be empty")]
    EmptyField(&'static str),
    #[error("'{0}' does not match on {1} regex")]
    ExpressionFailsRegex(SmallString, RegexType),
    FailedAuthentication(#[from] AuthenticationError),
    FailedConnection(#[from] diesel::r2d2::PoolError),
    FailedEmailTransport(#[from] lettre::transport::smtp::Error),
    FailedQuery(#[from] diesel::result::Error),
    FromStr(#[from] Box<dyn std::error::Error + Send + Sync>),
    HeaderDeserialization(#[from] axum::http::header::ToStrError),
    #[error("Insufficient privileges")]
    InsufficientPrivileges,
    InvalidEmail(#[from] lettre::error::Error),
    InvalidEmailAddress(#[from] lettre::address::AddressError),
    #[error("{0} is not a valid vote. Votes must be -1 or 1")]
    InvalidVote(i16),
    #[error("{0} is not a valid model year")]
    InvalidYear(i32),
    JsonRejection(#[from] axum::extract::rejection::JsonRejection),
    #[error("Make is required if both Year and Model are specified")]
    MissingMake,
    #[error("Missing smtp info")]
    MissingSmtpInfo,
    #[error("User has no email")]
    NoEmail,
    #[error("{0} not found")]
    NotFound(ResourceType),
    #[error("This action requires you to be logged in")]
    NotLoggedIn,
    #[error("Parent comment belongs to a different post")]
    ParentNotOnPost,
    Password(#[from] argon2::password_hash::Error),
    PathRejection(#[from] axum::extract::rejection::PathRejection),
    QueryRejection(#[from] axum::extract::rejection::QueryRejection),
    #[error("Someone else modified this in the meantime. Please try again.")]
    ResourceModified,
    Search(#[from] crate::search::Error),
    #[error("Password reset token is invalid")]
    UnauthorizedPasswordReset,
    #[error("'{1}' is not a known {0}")]
    UnknownReference(TagType, SmallString),
    Utf8Conversion(#[from] std::str::Utf8Error),
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        type QueryError = diesel::result::Error;

        let query_error_status_code = |err: &QueryError| match err {
            QueryError::NotFound => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        match self {
            Self::JsonRejection(err) => err.status(),
            Self::PathRejection(err) => err.status(),
            Self::QueryRejection(err) => err.status(),
            Self::EmptyField(_)
            | Self::ExpressionFailsRegex(..)
            | Self::FromStr(_)
            | Self::HeaderDeserialization(_)
            | Self::InvalidEmail(_)
            | Self::InvalidEmailAddress(_)
            | Self::InvalidVote(_)
            | Self::InvalidYear(_)
            | Self::MissingMake
            | Self::NoEmail
            | Self::ParentNotOnPost
            | Self::Search(_)
            | Self::UnknownReference(..)
            | Self::Utf8Conversion(_) => StatusCode::BAD_REQUEST,
            Self::NotLoggedIn | Self::Password(_) | Self::UnauthorizedPasswordReset => StatusCode::UNAUTHORIZED,
            Self::InsufficientPrivileges => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::AlreadyExists(_) | Self::ResourceModified => StatusCode::CONFLICT,
            Self::FailedEmailTransport(_) | Self::MissingSmtpInfo => StatusCode::INTERNAL_SERVER_ERROR,
            Self::FailedConnection(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::FailedAuthentication(err) => match err {
                AuthenticationError::FailedConnection(_) => StatusCode::SERVICE_UNAVAILABLE,
                AuthenticationError::FailedQuery(err) => query_error_status_code(err),
                _ => StatusCode::UNAUTHORIZED,
            },
            Self::FailedQuery(err) => query_error_status_code(err),
        }
    }

    fn category(&self) -> &'static str {
        match self {
            Self::AlreadyExists(_) => "Already Exists",
            Self::EmptyField(_) => "Empty Field",
            Self::ExpressionFailsRegex(..) => "Expression Fails Regex",
            Self::FailedAuthentication(_) => "Failed Authentication",
            Self::FailedConnection(_) => "Failed Connection",
            Self::FailedEmailTransport(_) => "Failed Email Transport",
            Self::FailedQuery(_) => "Failed Query",
            Self::FromStr(_) => "FromStr Error",
            Self::HeaderDeserialization(_) => "Header Deserialization",
            Self::InsufficientPrivileges => "Insufficient Privileges",
            Self::InvalidEmail(_) => "Invalid Email",
            Self::InvalidEmailAddress(_) => "Invalid Email Address",
            Self::InvalidVote(_) => "Invalid Vote",
            Self::InvalidYear(_) => "Invalid Year",
            Self::JsonRejection(_) => "JSON Rejection",
            Self::MissingMake => "Missing Make",
            Self::MissingSmtpInfo => "Missing SMTP Info",
            Self::NoEmail => "No Email",
            Self::NotFound(_) => "Resource Not Found",
            Self::NotLoggedIn => "Not Logged In",
            Self::ParentNotOnPost => "Parent Not On Post",
            Self::Password(_) => "Password Error",
            Self::PathRejection(_) => "Path Rejection",
            Self::QueryRejection(_) => "Query Rejection",
            Self::ResourceModified => "Resource Modified",
            Self::Search(_) => "Search Error",
            Self::UnauthorizedPasswordReset => "Unauthorized Password Reset",
            Self::UnknownReference(..) => "Unknown Reference",
            Self::Utf8Conversion(_) => "UTF-8 Conversion Error",
        }
    }

    fn response(&self) -> ErrorResponse {
        ErrorResponse {
            name: self.kind(),
            title: self.category(),
            description: self.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::warn!("{status}: {self}");
        } else {
            tracing::debug!("{status}: {self}");
        }
        (status, Json(self.response())).into_response()
    }
}

pub fn map_unique_violation<T>(result: QueryResult<T>, property: ResourceProperty) -> ApiResult<T> {
    use diesel::result::DatabaseErrorKind;
    use diesel::result::Error as DieselError;

    match result {
        Ok(value) => Ok(value),
        Err(DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _)) => {
            Err(ApiError::AlreadyExists(property))
        }
        Err(err) => Err(err.into()),
    }
}

/// Represents a response if an error occured.
#[derive(Serialize)]
struct ErrorResponse {
    title: &'static str,
    name: &'static str,
    description: String,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn status_codes() {
        assert_eq!(ApiError::NotFound(ResourceType::Comment).status_code(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::AlreadyExists(ResourceProperty::Vote).status_code(), StatusCode::CONFLICT);
        assert_eq!(ApiError::ResourceModified.status_code(), StatusCode::CONFLICT);
        assert_eq!(ApiError::InvalidVote(0).status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::NotLoggedIn.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::InsufficientPrivileges.status_code(), StatusCode::FORBIDDEN);
        let bad_encoding = percent_encoding::percent_decode_str("%C3%28").decode_utf8().unwrap_err();
        assert_eq!(ApiError::from(bad_encoding).status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::FailedQuery(diesel::result::Error::NotFound).status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::FailedAuthentication(AuthenticationError::InvalidToken).status_code(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn descriptions() {
        assert_eq!(ApiError::MissingMake.to_string(), "Make is required if both Year and Model are specified");
        assert_eq!(ApiError::NotFound(ResourceType::ParentComment).to_string(), "parent comment not found");
        assert_eq!(
            ApiError::UnknownReference(TagType::Make, SmallString::new("Yugo")).to_string(),
            "'Yugo' is not a known make"
        );
    }

    #[test]
    fn unique_violation() {
        let result: QueryResult<()> = Err(diesel::result::Error::NotFound);
        let mapped = map_unique_violation(result, ResourceProperty::Vote);
        assert!(matches!(mapped, Err(ApiError::FailedQuery(diesel::result::Error::NotFound))));
        assert!(matches!(map_unique_violation(Ok(5), ResourceProperty::Vote), Ok(5)));
    }
}
