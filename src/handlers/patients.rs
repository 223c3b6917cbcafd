//! Staff screens over the patient registry. Every handler requires a
//! signed-in session.

use uuid::Uuid;

use super::{
    form_attributes, Attributes, ErrorFlag, FormFields, Method, NextAction, Portal, View,
};
use crate::models::{Age, Patient, PatientDetails, ValidationError};
use crate::session_context::SessionContext;

impl Portal {
    pub fn list_patients(&self, session: &SessionContext) -> NextAction {
        if let Some(redirect) = require_identity(Method::Read, session) {
            return redirect;
        }
        let attributes = Attributes::new().with("patients", self.patients.list());
        NextAction::render(View::PatientList, attributes)
    }

    pub fn show_patient_form(&self, fields: &FormFields, session: &SessionContext) -> NextAction {
        if let Some(redirect) = require_identity(Method::Read, session) {
            return redirect;
        }
        NextAction::render(View::PatientForm, form_attributes(fields))
    }

    pub fn register_patient(&self, fields: &FormFields, session: &SessionContext) -> NextAction {
        if let Some(redirect) = require_identity(Method::Write, session) {
            return redirect;
        }
        match parse_patient(fields) {
            Ok(details) => {
                let patient = self.patients.register(details);
                tracing::info!(patient_id = %patient.id, "Patient registered");
                NextAction::redirect(Method::Write, View::PatientList)
            }
            Err(err) => NextAction::redirect_with_error(Method::Write, View::PatientForm, err),
        }
    }

    /// Render one patient. An unknown or malformed id renders no attributes.
    pub fn view_patient(&self, id: &str, session: &SessionContext) -> NextAction {
        if let Some(redirect) = require_identity(Method::Read, session) {
            return redirect;
        }
        let attributes = self
            .find_patient(id)
            .map(|patient| patient_attributes(&patient))
            .unwrap_or_default();
        NextAction::render(View::PatientDetail { id: id.to_string() }, attributes)
    }

    /// Render the edit form pre-filled with the stored values.
    pub fn show_patient_edit(
        &self,
        id: &str,
        fields: &FormFields,
        session: &SessionContext,
    ) -> NextAction {
        if let Some(redirect) = require_identity(Method::Read, session) {
            return redirect;
        }
        let Some(patient) = self.find_patient(id) else {
            return NextAction::redirect(Method::Read, View::PatientList);
        };
        let mut attributes = form_attributes(fields);
        for (key, value) in patient_fields(&patient) {
            attributes.insert(key, value);
        }
        NextAction::render(View::PatientEdit { id: id.to_string() }, attributes)
    }

    /// Replace every field of a stored patient.
    pub fn update_patient(
        &self,
        id: &str,
        fields: &FormFields,
        session: &SessionContext,
    ) -> NextAction {
        if let Some(redirect) = require_identity(Method::Write, session) {
            return redirect;
        }
        let Ok(uuid) = Uuid::parse_str(id) else {
            return NextAction::redirect(Method::Write, View::PatientList);
        };
        let details = match parse_patient(fields) {
            Ok(details) => details,
            Err(err) => {
                return NextAction::redirect_with_error(
                    Method::Write,
                    View::PatientEdit { id: id.to_string() },
                    err,
                )
            }
        };
        match self.patients.replace(&uuid, details) {
            Some(_) => tracing::info!(patient_id = %uuid, "Patient updated"),
            None => tracing::debug!(patient_id = %uuid, "Update for unknown patient ignored"),
        }
        NextAction::redirect(Method::Write, View::PatientList)
    }

    /// Remove a stored patient. Unknown or malformed ids are ignored.
    pub fn delete_patient(&self, id: &str, session: &SessionContext) -> NextAction {
        if let Some(redirect) = require_identity(Method::Write, session) {
            return redirect;
        }
        match Uuid::parse_str(id).ok().and_then(|uuid| self.patients.remove(&uuid)) {
            Some(patient) => tracing::info!(patient_id = %patient.id, "Patient deleted"),
            None => tracing::debug!("Delete for unknown patient ignored"),
        }
        NextAction::redirect(Method::Write, View::PatientList)
    }

    fn find_patient(&self, id: &str) -> Option<Patient> {
        Uuid::parse_str(id).ok().and_then(|id| self.patients.get(&id))
    }
}

fn require_identity(method: Method, session: &SessionContext) -> Option<NextAction> {
    (!session.is_authenticated()).then(|| {
        NextAction::redirect_with_error(method, View::Login, ErrorFlag::NotAuthenticated)
    })
}

fn parse_patient(fields: &FormFields) -> Result<PatientDetails, ValidationError> {
    let name = fields.required("name")?;
    let age: Age = fields.required("age")?.parse()?;
    let disease = fields.required("disease")?;
    PatientDetails::new(name, age, disease)
}

fn patient_fields(patient: &Patient) -> [(&'static str, String); 4] {
    [
        ("patientId", patient.id.to_string()),
        ("patientName", patient.name.clone()),
        ("patientAge", patient.age.to_string()),
        ("patientDisease", patient.disease.clone()),
    ]
}

fn patient_attributes(patient: &Patient) -> Attributes {
    patient_fields(patient)
        .into_iter()
        .fold(Attributes::new(), |attributes, (key, value)| attributes.with(key, value))
}
