use serde::Serialize;

/// Reasons a submitted form is rejected.
///
/// These travel back to the client as an error flag on the next action;
/// they are never raised as failures of the request itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "code", content = "field", rename_all = "snake_case")]
pub enum ValidationError {
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("Password and confirmation do not match")]
    PasswordMismatch,
    #[error("Missing required field: {0}")]
    MissingField(&'static str),
    #[error("Email address is not valid")]
    InvalidEmail,
    #[error("Age must be a whole number between 0 and 150")]
    InvalidAge,
    #[error("Unknown gender value")]
    InvalidGender,
    #[error("Date must use the YYYY-MM-DD format")]
    InvalidDate,
    #[error("An account with this email already exists")]
    EmailTaken,
}

impl ValidationError {
    /// Stable short code, used in redirect query strings.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidCredentials => "invalid_credentials",
            Self::PasswordMismatch => "password_mismatch",
            Self::MissingField(_) => "missing_field",
            Self::InvalidEmail => "invalid_email",
            Self::InvalidAge => "invalid_age",
            Self::InvalidGender => "invalid_gender",
            Self::InvalidDate => "invalid_date",
            Self::EmailTaken => "email_taken",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_snake_case() {
        assert_eq!(ValidationError::PasswordMismatch.code(), "password_mismatch");
        assert_eq!(ValidationError::MissingField("email").code(), "missing_field");
        assert_eq!(ValidationError::EmailTaken.code(), "email_taken");
    }

    #[test]
    fn missing_field_names_the_field() {
        let err = ValidationError::MissingField("fullName");
        assert_eq!(err.to_string(), "Missing required field: fullName");
    }
}
