//! Request handlers.
//!
//! A handler maps (method, submitted fields, session) to a session
//! mutation plus a [`NextAction`]. Handlers never fail: bad input and
//! missing sign-in come back as error flags on the next action.

pub mod auth;
pub mod patients;
pub mod profile;

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde::Serialize;

use crate::credentials::AccountDirectory;
use crate::models::{IdentityRecord, Patient, ValidationError};
use crate::patients::PatientRegistry;
use crate::session_context::SessionContext;

// ═══════════════════════════════════════════════════════════
// Inbound
// ═══════════════════════════════════════════════════════════

/// Read vs. write intent of a request (GET vs. POST).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Read,
    Write,
}

/// Submitted form or query fields.
#[derive(Clone, Default)]
pub struct FormFields(HashMap<String, String>);

impl FormFields {
    pub fn new(fields: HashMap<String, String>) -> Self {
        Self(fields)
    }

    /// Trimmed value, or `None` if absent or blank.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    /// Like [`get`](Self::get) but a missing value is a validation error.
    pub fn required(&self, name: &'static str) -> Result<&str, ValidationError> {
        self.get(name).ok_or(ValidationError::MissingField(name))
    }

    /// Untrimmed value for secrets, or `None` if absent or empty.
    pub fn secret(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str).filter(|v| !v.is_empty())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FormFields {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

// Values may hold passwords: only field names are printed.
impl std::fmt::Debug for FormFields {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&str> = self.0.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_tuple("FormFields").field(&names).finish()
    }
}

/// One inbound request as seen by the handlers.
#[derive(Debug, Clone)]
pub struct PortalRequest {
    pub method: Method,
    pub fields: FormFields,
}

impl PortalRequest {
    pub fn read(fields: FormFields) -> Self {
        Self {
            method: Method::Read,
            fields,
        }
    }

    pub fn write(fields: FormFields) -> Self {
        Self {
            method: Method::Write,
            fields,
        }
    }
}

/// Logical destination of a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Login,
    Register,
    Profile,
    ProfileUpdate,
    Appointments,
    MedicalHistory,
    Logout,
    Patients,
    NewPatient,
    Patient(String),
    EditPatient(String),
    DeletePatient(String),
}

// ═══════════════════════════════════════════════════════════
// Outbound
// ═══════════════════════════════════════════════════════════

/// Views the renderer knows how to draw, doubling as redirect targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum View {
    Login,
    Register,
    Profile,
    UpdateProfile,
    PatientList,
    PatientForm,
    PatientDetail { id: String },
    PatientEdit { id: String },
}

impl View {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Login => "login",
            Self::Register => "register",
            Self::Profile => "profile",
            Self::UpdateProfile => "update_profile",
            Self::PatientList => "patient_list",
            Self::PatientForm => "patient_form",
            Self::PatientDetail { .. } => "patient_detail",
            Self::PatientEdit { .. } => "patient_edit",
        }
    }

    /// URL path serving this view.
    pub fn path(&self) -> String {
        match self {
            Self::Login => "/login".into(),
            Self::Register => "/register".into(),
            Self::Profile => "/profile".into(),
            Self::UpdateProfile => "/profile/update".into(),
            Self::PatientList => "/patients".into(),
            Self::PatientForm => "/patients/new".into(),
            Self::PatientDetail { id } => format!("/patients/{id}"),
            Self::PatientEdit { id } => format!("/patients/{id}/edit"),
        }
    }
}

/// Redirect status hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectStatus {
    /// 302, for redirects answering a read.
    Found,
    /// 303, for redirects answering a write.
    SeeOther,
}

impl RedirectStatus {
    pub fn code(self) -> u16 {
        match self {
            Self::Found => 302,
            Self::SeeOther => 303,
        }
    }

    fn for_method(method: Method) -> Self {
        match method {
            Method::Read => Self::Found,
            Method::Write => Self::SeeOther,
        }
    }
}

/// Why a handler did not complete the requested action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorFlag {
    /// Submitted input was malformed or inconsistent.
    Validation(ValidationError),
    /// No identity is bound to the session.
    NotAuthenticated,
}

impl ErrorFlag {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(err) => err.code(),
            Self::NotAuthenticated => "not_authenticated",
        }
    }
}

impl From<ValidationError> for ErrorFlag {
    fn from(err: ValidationError) -> Self {
        Self::Validation(err)
    }
}

/// Error codes that may be echoed back into a form view.
pub const KNOWN_ERROR_CODES: [&str; 9] = [
    "invalid_credentials",
    "password_mismatch",
    "missing_field",
    "invalid_email",
    "invalid_age",
    "invalid_gender",
    "invalid_date",
    "email_taken",
    "not_authenticated",
];

/// A value attached to a rendered view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Text(String),
    List(Vec<String>),
    Identity(IdentityRecord),
    Patient(Patient),
    Patients(Vec<Patient>),
}

impl From<String> for AttributeValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<&str> for AttributeValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<Vec<String>> for AttributeValue {
    fn from(v: Vec<String>) -> Self {
        Self::List(v)
    }
}

impl From<IdentityRecord> for AttributeValue {
    fn from(v: IdentityRecord) -> Self {
        Self::Identity(v)
    }
}

impl From<Vec<Patient>> for AttributeValue {
    fn from(v: Vec<Patient>) -> Self {
        Self::Patients(v)
    }
}

/// Request-scoped values attached to a rendered view.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Attributes(BTreeMap<String, AttributeValue>);

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, value: impl Into<AttributeValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: &str, value: impl Into<AttributeValue>) {
        self.0.insert(key.to_string(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&AttributeValue> {
        self.0.get(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// What the transport should do after a handler ran.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NextAction {
    Render {
        view: View,
        attributes: Attributes,
    },
    Redirect {
        target: View,
        status: RedirectStatus,
        error: Option<ErrorFlag>,
    },
}

impl NextAction {
    pub fn render(view: View, attributes: Attributes) -> Self {
        Self::Render { view, attributes }
    }

    pub fn redirect(method: Method, target: View) -> Self {
        Self::Redirect {
            target,
            status: RedirectStatus::for_method(method),
            error: None,
        }
    }

    pub fn redirect_with_error(method: Method, target: View, error: impl Into<ErrorFlag>) -> Self {
        Self::Redirect {
            target,
            status: RedirectStatus::for_method(method),
            error: Some(error.into()),
        }
    }

    /// The view rendered or redirected to.
    pub fn view(&self) -> &View {
        match self {
            Self::Render { view, .. } => view,
            Self::Redirect { target, .. } => target,
        }
    }

    pub fn error(&self) -> Option<&ErrorFlag> {
        match self {
            Self::Render { .. } => None,
            Self::Redirect { error, .. } => error.as_ref(),
        }
    }

    pub fn is_not_authenticated(&self) -> bool {
        matches!(self.error(), Some(ErrorFlag::NotAuthenticated))
    }
}

// ═══════════════════════════════════════════════════════════
// Portal dispatch
// ═══════════════════════════════════════════════════════════

/// Shared collaborators for all handlers.
#[derive(Clone)]
pub struct Portal {
    accounts: Arc<dyn AccountDirectory>,
    patients: Arc<PatientRegistry>,
}

impl Portal {
    pub fn new(accounts: Arc<dyn AccountDirectory>, patients: Arc<PatientRegistry>) -> Self {
        Self { accounts, patients }
    }

    /// Route a request to its handler.
    pub fn dispatch(
        &self,
        route: Route,
        request: &PortalRequest,
        session: &mut SessionContext,
    ) -> NextAction {
        let fields = &request.fields;
        match (route, request.method) {
            (Route::Login, Method::Read) => self.show_login(fields),
            (Route::Login, Method::Write) => self.authenticate(fields, session),
            (Route::Register, Method::Read) => self.show_register(fields),
            (Route::Register, Method::Write) => self.register(fields, session),
            (Route::Profile, _) => self.view_profile(session),
            (Route::ProfileUpdate, Method::Read) => self.show_update_form(fields, session),
            (Route::ProfileUpdate, Method::Write) => self.update_profile(fields, session),
            (Route::Appointments, Method::Write) => self.book_appointment(fields, session),
            (Route::MedicalHistory, Method::Write) => self.record_history(fields, session),
            (Route::Appointments | Route::MedicalHistory, Method::Read) => {
                self.view_profile(session)
            }
            (Route::Logout, _) => self.logout(session),
            (Route::Patients, Method::Read) => self.list_patients(session),
            (Route::Patients, Method::Write) => self.register_patient(fields, session),
            (Route::NewPatient, _) => self.show_patient_form(fields, session),
            (Route::Patient(id), _) => self.view_patient(&id, session),
            (Route::EditPatient(id), Method::Read) => self.show_patient_edit(&id, fields, session),
            (Route::EditPatient(id), Method::Write) => self.update_patient(&id, fields, session),
            (Route::DeletePatient(id), Method::Read) => self.view_patient(&id, session),
            (Route::DeletePatient(id), Method::Write) => self.delete_patient(&id, session),
        }
    }
}

/// Attributes for a form view: echoes a known `error` code from the query.
fn form_attributes(fields: &FormFields) -> Attributes {
    let mut attributes = Attributes::new();
    if let Some(code) = fields
        .get("error")
        .and_then(|code| KNOWN_ERROR_CODES.iter().find(|known| **known == code))
    {
        attributes.insert("error", *code);
    }
    attributes
}
