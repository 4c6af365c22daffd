/// A short machine-readable name for an error, sent to clients alongside the human-readable description.
pub trait ErrorKind {
    fn kind(&self) -> &'static str;
}

impl ErrorKind for argon2::password_hash::errors::B64Error {
    fn kind(&self) -> &'static str {
        match self {
            Self::InvalidEncoding => "InvalidEncoding",
            Self::InvalidLength => "InvalidLength",
        }
    }
}

impl ErrorKind for argon2::password_hash::errors::InvalidValue {
    fn kind(&self) -> &'static str {
        match self {
            Self::InvalidChar(_) => "InvalidChar",
            Self::InvalidFormat => "InvalidFormat",
            Self::Malformed => "MalformedValue",
            Self::TooLong => "ValueTooLong",
            Self::TooShort => "ValueTooShort",
            _ => "UnknownArgonInvalidValue",
        }
    }
}

impl ErrorKind for argon2::password_hash::Error {
    fn kind(&self) -> &'static str {
        match self {
            Self::Algorithm => "UnsupportedAlgorithm",
            Self::B64Encoding(err) => err.kind(),
            Self::Crypto => "CryptoError",
            Self::OutputSize { .. } => "UnexpectedOutputSize",
            Self::ParamNameDuplicated => "ParamNameDuplicated",
            Self::ParamNameInvalid => "ParamNameInvalid",
            Self::ParamValueInvalid(err) => err.kind(),
            Self::ParamsMaxExceeded => "ParamsMaxExceeded",
            Self::Password => "InvalidPassword",
            Self::PhcStringField => "InvalidPhcStringField",
            Self::PhcStringTrailingData => "PhcStringTrailingData",
            Self::SaltInvalid(err) => err.kind(),
            Self::Version => "InvalidVersion",
            _ => "UnknownArgonError",
        }
    }
}

impl ErrorKind for diesel::result::DatabaseErrorKind {
    fn kind(&self) -> &'static str {
        match self {
            Self::CheckViolation => "CheckViolation",
            Self::ClosedConnection => "ClosedConnection",
            Self::ForeignKeyViolation => "ForeignKeyViolation",
            Self::NotNullViolation => "NotNullViolation",
            Self::ReadOnlyTransaction => "ReadOnlyTransaction",
            Self::SerializationFailure => "SerializationFailure",
            Self::UnableToSendCommand => "UnableToSendCommand",
            Self::UniqueViolation => "UniqueViolation",
            _ => "UnknownDatabaseError",
        }
    }
}

impl ErrorKind for diesel::result::Error {
    fn kind(&self) -> &'static str {
        match self {
            Self::AlreadyInTransaction => "AlreadyInTransaction",
            Self::BrokenTransactionManager => "BrokenTransactionManager",
            Self::DatabaseError(err, _) => err.kind(),
            Self::DeserializationError(_) => "DeserializationError",
            Self::InvalidCString(_) => "InvalidCString",
            Self::NotFound => "NotFound",
            Self::NotInTransaction => "NotInTransaction",
            Self::QueryBuilderError(_) => "QueryBuilderError",
            Self::RollbackErrorOnCommit { rollback_error, .. } => rollback_error.kind(),
            Self::RollbackTransaction => "RollbackTransaction",
            Self::SerializationError(_) => "SerializationError",
            _ => "UnknownQueryError",
        }
    }
}

impl ErrorKind for base64::DecodeError {
    fn kind(&self) -> &'static str {
        match self {
            Self::InvalidByte(..) => "InvalidByte",
            Self::InvalidLastSymbol(..) => "InvalidLastSymbol",
            Self::InvalidLength(_) => "InvalidLength",
            Self::InvalidPadding => "InvalidPadding",
        }
    }
}

impl ErrorKind for crate::auth::header::AuthenticationError {
    fn kind(&self) -> &'static str {
        match self {
            Self::FailedConnection(_) => "FailedConnection",
            Self::FailedQuery(err) => err.kind(),
            Self::InvalidAuthType => "InvalidAuthType",
            Self::InvalidEncoding(err) => err.kind(),
            Self::InvalidToken => "InvalidToken",
            Self::MalformedCredentials => "MalformedCredentials",
            Self::MalformedToken(_) => "MalformedToken",
            Self::UsernamePasswordMismatch => "UsernamePasswordMismatch",
            Self::Utf8Conversion(_) => "Utf8ConversionError",
        }
    }
}

impl ErrorKind for crate::search::Error {
    fn kind(&self) -> &'static str {
        match self {
            Self::EmptyCondition(_) => "EmptyCondition",
            Self::UnknownTagType(_) => "UnknownTagType",
        }
    }
}

impl ErrorKind for crate::api::ApiError {
    fn kind(&self) -> &'static str {
        match self {
            Self::AlreadyExists(_) => "AlreadyExists",
            Self::EmptyField(_) => "EmptyField",
            Self::ExpressionFailsRegex(..) => "ExpressionFailsRegex",
            Self::FailedAuthentication(err) => err.kind(),
            Self::FailedConnection(_) => "FailedConnection",
            Self::FailedEmailTransport(_) => "FailedEmailTransport",
            Self::FailedQuery(err) => err.kind(),
            Self::FromStr(_) => "FromStrError",
            Self::HeaderDeserialization(_) => "HeaderDeserialization",
            Self::InsufficientPrivileges => "InsufficientPrivileges",
            Self::InvalidEmail(_) => "InvalidEmail",
            Self::InvalidEmailAddress(_) => "InvalidEmailAddress",
            Self::InvalidVote(_) => "InvalidVote",
            Self::InvalidYear(_) => "InvalidYear",
            Self::JsonRejection(_) => "JsonRejection",
            Self::MissingMake => "MissingMake",
            Self::MissingSmtpInfo => "MissingSmtpInfo",
            Self::NoEmail => "NoEmail",
            Self::NotFound(_) => "NotFound",
            Self::NotLoggedIn => "NotLoggedIn",
            Self::ParentNotOnPost => "ParentNotOnPost",
            Self::Password(err) => err.kind(),
            Self::PathRejection(_) => "PathRejection",
            Self::QueryRejection(_) => "QueryRejection",
            Self::ResourceModified => "ResourceModified",
            Self::Search(err) => err.kind(),
            Self::UnauthorizedPasswordReset => "UnauthorizedPasswordReset",
            Self::UnknownReference(..) => "UnknownReference",
            Self::Utf8Conversion(_) => "Utf8ConversionError",
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::api::ApiError;
    use crate::model::enums::ResourceType;

    #[test]
    fn nested_kinds() {
        let not_found = ApiError::FailedQuery(diesel::result::Error::NotFound);
        assert_eq!(not_found.kind(), "NotFound");

        let bad_encoding = percent_encoding::percent_decode_str("%FF%FE").decode_utf8().unwrap_err();
        assert_eq!(ApiError::from(bad_encoding).kind(), "Utf8ConversionError");

        assert_eq!(ApiError::NotFound(ResourceType::Post).kind(), "NotFound");
        assert_eq!(ApiError::MissingMake.kind(), "MissingMake");
    }
}
