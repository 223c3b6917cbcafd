//! In-memory patient registry used by the staff screens.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use uuid::Uuid;

use crate::models::{Patient, PatientDetails};

#[derive(Default)]
pub struct PatientRegistry {
    patients: RwLock<HashMap<Uuid, Patient>>,
}

impl PatientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a patient and return the stored record.
    pub fn register(&self, details: PatientDetails) -> Patient {
        let patient = details.into_patient(Uuid::new_v4());
        self.patients
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(patient.id, patient.clone());
        patient
    }

    pub fn get(&self, id: &Uuid) -> Option<Patient> {
        self.patients
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    /// Replace every field of an existing patient. Returns the new record,
    /// or `None` if no patient has this id.
    pub fn replace(&self, id: &Uuid, details: PatientDetails) -> Option<Patient> {
        let mut patients = self.patients.write().unwrap_or_else(PoisonError::into_inner);
        let slot = patients.get_mut(id)?;
        *slot = details.into_patient(*id);
        Some(slot.clone())
    }

    /// Drop a patient. Returns the removed record, or `None` if no patient
    /// has this id.
    pub fn remove(&self, id: &Uuid) -> Option<Patient> {
        self.patients.write().unwrap_or_else(PoisonError::into_inner).remove(id)
    }

    /// All patients ordered by name, then id.
    pub fn list(&self) -> Vec<Patient> {
        let mut patients: Vec<Patient> = self
            .patients
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();
        patients.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        patients
    }

    pub fn len(&self) -> usize {
        self.patients.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
