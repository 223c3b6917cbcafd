use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::enums::{Gender, GenderLabel};
use super::validation::ValidationError;

/// Oldest age the portal accepts.
pub const MAX_AGE: u8 = 150;

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern compiles")
});

/// Validated age in whole years.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Age(u8);

impl Age {
    pub fn new(years: u8) -> Result<Self, ValidationError> {
        if years > MAX_AGE {
            return Err(ValidationError::InvalidAge);
        }
        Ok(Self(years))
    }

    pub fn years(self) -> u8 {
        self.0
    }
}

impl std::str::FromStr for Age {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let years: u8 = s.trim().parse().map_err(|_| ValidationError::InvalidAge)?;
        Self::new(years)
    }
}

impl TryFrom<u8> for Age {
    type Error = ValidationError;

    fn try_from(years: u8) -> Result<Self, Self::Error> {
        Self::new(years)
    }
}

impl From<Age> for u8 {
    fn from(age: Age) -> Self {
        age.0
    }
}

impl std::fmt::Display for Age {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Trim and check an email address. Case is kept as written.
pub fn parse_email(raw: &str) -> Result<String, ValidationError> {
    let email = raw.trim();
    if !EMAIL_PATTERN.is_match(email) {
        return Err(ValidationError::InvalidEmail);
    }
    Ok(email.to_string())
}

/// Case-folded form of an address, for lookups only.
pub fn email_key(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

/// Display attributes of a signed-in user.
///
/// Fields are private: once built, a record only changes through
/// [`ProfileUpdate::apply`], which returns a whole new record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityRecord {
    full_name: String,
    email: String,
    gender: Option<GenderLabel>,
    age: Option<Age>,
}

impl IdentityRecord {
    pub fn new(
        full_name: &str,
        email: &str,
        gender: Option<GenderLabel>,
        age: Option<Age>,
    ) -> Result<Self, ValidationError> {
        let full_name = full_name.trim();
        if full_name.is_empty() {
            return Err(ValidationError::MissingField("fullName"));
        }
        Ok(Self {
            full_name: full_name.to_string(),
            email: parse_email(email)?,
            gender,
            age,
        })
    }

    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn gender(&self) -> Option<Gender> {
        self.gender.as_ref().map(GenderLabel::kind)
    }

    /// Gender as it was written when the record was built.
    pub fn gender_label(&self) -> Option<&str> {
        self.gender.as_ref().map(GenderLabel::as_str)
    }

    pub fn age(&self) -> Option<Age> {
        self.age
    }
}

/// Replacement values for an existing record. `None` leaves a field as is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileUpdate {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub gender: Option<GenderLabel>,
    pub age: Option<Age>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.full_name.is_none()
            && self.email.is_none()
            && self.gender.is_none()
            && self.age.is_none()
    }

    /// Build the replacement record. Every supplied field is revalidated;
    /// on error the current record is left as it was.
    pub fn apply(&self, current: &IdentityRecord) -> Result<IdentityRecord, ValidationError> {
        IdentityRecord::new(
            self.full_name.as_deref().unwrap_or(&current.full_name),
            self.email.as_deref().unwrap_or(&current.email),
            self.gender.clone().or_else(|| current.gender.clone()),
            self.age.or(current.age),
        )
    }
}
