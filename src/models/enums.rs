use serde::{Deserialize, Serialize};

use super::validation::ValidationError;

/// Macro to generate enum with as_str + std::str::FromStr pattern.
/// Parsing is case-insensitive so form values like "male" are accepted.
macro_rules! str_enum {
    ($name:ident, $err:expr, { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let s = s.trim();
                $(
                    if s.eq_ignore_ascii_case($s) {
                        return Ok(Self::$variant);
                    }
                )+
                Err($err)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

str_enum!(Gender, ValidationError::InvalidGender, {
    Male => "Male",
    Female => "Female",
    Other => "Other",
});

/// A gender as it was written on the form, checked against [`Gender`].
///
/// The label is echoed back unchanged; `kind()` gives the parsed value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct GenderLabel {
    kind: Gender,
    label: String,
}

impl GenderLabel {
    pub fn kind(&self) -> Gender {
        self.kind
    }

    pub fn as_str(&self) -> &str {
        &self.label
    }
}

impl std::str::FromStr for GenderLabel {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let label = s.trim();
        Ok(Self {
            kind: label.parse()?,
            label: label.to_string(),
        })
    }
}

impl From<Gender> for GenderLabel {
    fn from(kind: Gender) -> Self {
        Self {
            kind,
            label: kind.as_str().to_string(),
        }
    }
}

impl TryFrom<String> for GenderLabel {
    type Error = ValidationError;

    fn try_from(label: String) -> Result<Self, Self::Error> {
        label.parse()
    }
}

impl From<GenderLabel> for String {
    fn from(gender: GenderLabel) -> Self {
        gender.label
    }
}
