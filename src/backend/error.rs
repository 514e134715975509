use std::fmt;

use serde::Deserialize;

/// Structured error code reported by the backend.
///
/// Database errors carry their SQLSTATE; REST-layer errors carry a `PGRST`
/// code. Parsed once when the response arrives so callers match on variants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorCode {
    UniqueViolation,
    ForeignKeyViolation,
    NotNullViolation,
    CheckViolation,
    InsufficientPrivilege,
    NoRows,
    UnknownRelationship,
    Other(String),
}

impl ErrorCode {
    pub fn parse(code: &str) -> Self {
        match code {
            "23505" => Self::UniqueViolation,
            "23503" => Self::ForeignKeyViolation,
            "23502" => Self::NotNullViolation,
            "23514" => Self::CheckViolation,
            "42501" => Self::InsufficientPrivilege,
            "PGRST116" => Self::NoRows,
            "PGRST200" => Self::UnknownRelationship,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::UniqueViolation => "23505",
            Self::ForeignKeyViolation => "23503",
            Self::NotNullViolation => "23502",
            Self::CheckViolation => "23514",
            Self::InsufficientPrivilege => "42501",
            Self::NoRows => "PGRST116",
            Self::UnknownRelationship => "PGRST200",
            Self::Other(code) => code,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("request to backend failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("backend rejected request with status {status} ({code}): {message}")]
    Api {
        status: u16,
        code: ErrorCode,
        message: String,
        details: Option<String>,
        hint: Option<String>,
    },
    #[error("unexpected backend payload: {0}")]
    Payload(#[from] serde_json::Error),
}

#[derive(Deserialize)]
struct ErrorBody {
    code: Option<String>,
    message: Option<String>,
    details: Option<String>,
    hint: Option<String>,
}

impl BackendError {
    pub fn api(status: u16, code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            code,
            message: message.into(),
            details: None,
            hint: None,
        }
    }

    /// Builds an [`BackendError::Api`] from a non-success response body.
    pub fn from_response(status: u16, body: &str) -> Self {
        match serde_json::from_str::<ErrorBody>(body) {
            Ok(parsed) => Self::Api {
                status,
                code: ErrorCode::parse(parsed.code.as_deref().unwrap_or_default()),
                message: parsed.message.unwrap_or_else(|| body.to_string()),
                details: parsed.details,
                hint: parsed.hint,
            },
            Err(_) => Self::api(status, ErrorCode::Other(String::new()), body.trim()),
        }
    }

    pub fn code(&self) -> Option<&ErrorCode> {
        match self {
            Self::Api { code, .. } => Some(code),
            _ => None,
        }
    }

    pub fn is_unique_violation(&self) -> bool {
        self.code() == Some(&ErrorCode::UniqueViolation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_duplicate_key_response() {
        let body = r#"{"code":"23505","details":"Key (user_id, property_id)=(a, b) already exists.","hint":null,"message":"duplicate key value violates unique constraint \"saved_properties_user_id_property_id_key\""}"#;
        let err = BackendError::from_response(409, body);

        assert!(err.is_unique_violation());
        match err {
            BackendError::Api {
                status, details, ..
            } => {
                assert_eq!(status, 409);
                assert!(details.expect("details").contains("already exists"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn keeps_raw_body_when_not_json() {
        let err = BackendError::from_response(502, "Bad Gateway\n");
        assert_eq!(err.code(), Some(&ErrorCode::Other(String::new())));
        assert!(err.to_string().contains("Bad Gateway"));
        assert!(!err.is_unique_violation());
    }

    #[test]
    fn unknown_codes_round_trip_through_other() {
        assert_eq!(ErrorCode::parse("42P01"), ErrorCode::Other("42P01".to_string()));
        assert_eq!(ErrorCode::parse("42501"), ErrorCode::InsufficientPrivilege);
        assert_eq!(ErrorCode::InsufficientPrivilege.as_str(), "42501");
    }
}
