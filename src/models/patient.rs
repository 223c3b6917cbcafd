use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::identity::Age;
use super::validation::ValidationError;

/// A patient record kept by the clinic staff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patient {
    pub id: Uuid,
    pub name: String,
    pub age: Age,
    pub disease: String,
}

/// Validated field values for creating or replacing a patient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatientDetails {
    pub name: String,
    pub age: Age,
    pub disease: String,
}

impl PatientDetails {
    pub fn new(name: &str, age: Age, disease: &str) -> Result<Self, ValidationError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationError::MissingField("name"));
        }
        let disease = disease.trim();
        if disease.is_empty() {
            return Err(ValidationError::MissingField("disease"));
        }
        Ok(Self {
            name: name.to_string(),
            age,
            disease: disease.to_string(),
        })
    }

    pub fn into_patient(self, id: Uuid) -> Patient {
        Patient {
            id,
            name: self.name,
            age: self.age,
            disease: self.disease,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn details_trim_values() {
        let d = PatientDetails::new(" John Doe ", Age::new(45).unwrap(), " Hypertension ").unwrap();
        assert_eq!(d.name, "John Doe");
        assert_eq!(d.disease, "Hypertension");
    }

    #[test]
    fn blank_disease_rejected() {
        let err = PatientDetails::new("John", Age::new(45).unwrap(), "  ").unwrap_err();
        assert_eq!(err, ValidationError::MissingField("disease"));
    }

    #[test]
    fn into_patient_keeps_id() {
        let id = Uuid::new_v4();
        let p = PatientDetails::new("John", Age::new(45).unwrap(), "Flu")
            .unwrap()
            .into_patient(id);
        assert_eq!(p.id, id);
        assert_eq!(p.age.years(), 45);
    }
}
