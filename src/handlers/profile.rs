//! Registration, the profile page and the profile's own records.

use chrono::NaiveDate;

use super::{
    form_attributes, Attributes, ErrorFlag, FormFields, Method, NextAction, Portal, View,
};
use crate::credentials::CredentialError;
use crate::models::{Age, GenderLabel, IdentityRecord, ProfileUpdate, ValidationError};
use crate::session_context::{
    SessionContext, APPOINTMENTS_KEY, IDENTITY_KEY, MEDICAL_HISTORY_KEY,
};

/// Date format accepted for appointments.
pub const APPOINTMENT_DATE_FORMAT: &str = "%Y-%m-%d";

impl Portal {
    pub fn show_register(&self, fields: &FormFields) -> NextAction {
        NextAction::render(View::Register, form_attributes(fields))
    }

    /// Enrol a new account and sign the session in as it.
    pub fn register(&self, fields: &FormFields, session: &mut SessionContext) -> NextAction {
        let reject = |err: ValidationError| {
            NextAction::redirect_with_error(Method::Write, View::Register, err)
        };

        let password = match (fields.secret("password"), fields.secret("confirmPassword")) {
            (Some(password), Some(confirm)) if password == confirm => password,
            (Some(_), Some(_)) => return reject(ValidationError::PasswordMismatch),
            (None, _) => return reject(ValidationError::MissingField("password")),
            (_, None) => return reject(ValidationError::MissingField("confirmPassword")),
        };

        let identity = match parse_registration(fields) {
            Ok(identity) => identity,
            Err(err) => return reject(err),
        };

        let account_id = match self.accounts.enroll(&identity, password) {
            Ok(id) => id,
            Err(err) => {
                tracing::info!(error = %err, "Registration refused");
                return reject(ValidationError::EmailTaken);
            }
        };

        session.bind_account(account_id, identity);
        session.set_medical_history(Vec::new());
        session.set_appointments(Vec::new());
        tracing::info!("Account registered");
        NextAction::redirect(Method::Write, View::Profile)
    }

    /// Render the signed-in user's profile.
    pub fn view_profile(&self, session: &SessionContext) -> NextAction {
        let Some(identity) = session.identity() else {
            return NextAction::redirect_with_error(
                Method::Read,
                View::Login,
                ErrorFlag::NotAuthenticated,
            );
        };
        let attributes = Attributes::new()
            .with(IDENTITY_KEY, identity.clone())
            .with(MEDICAL_HISTORY_KEY, session.medical_history().to_vec())
            .with(APPOINTMENTS_KEY, session.appointments().to_vec());
        NextAction::render(View::Profile, attributes)
    }

    /// Render the update form pre-filled from the bound identity.
    pub fn show_update_form(&self, fields: &FormFields, session: &SessionContext) -> NextAction {
        let Some(identity) = session.identity() else {
            return NextAction::redirect_with_error(
                Method::Read,
                View::Login,
                ErrorFlag::NotAuthenticated,
            );
        };
        let attributes = form_attributes(fields).with(IDENTITY_KEY, identity.clone());
        NextAction::render(View::UpdateProfile, attributes)
    }

    /// Replace the supplied fields of the bound identity.
    ///
    /// Never creates an identity. The record is replaced whole or not at all.
    pub fn update_profile(&self, fields: &FormFields, session: &mut SessionContext) -> NextAction {
        let Some(current) = session.identity().cloned() else {
            return NextAction::redirect_with_error(
                Method::Write,
                View::Register,
                ErrorFlag::NotAuthenticated,
            );
        };
        let reject = |err: ValidationError| {
            NextAction::redirect_with_error(Method::Write, View::UpdateProfile, err)
        };

        let update = match parse_update(fields) {
            Ok(update) => update,
            Err(err) => return reject(err),
        };
        if update.is_empty() {
            return NextAction::redirect(Method::Write, View::Profile);
        }
        let updated = match update.apply(&current) {
            Ok(updated) => updated,
            Err(err) => return reject(err),
        };

        let synced = match session.account_id() {
            Some(id) => self.accounts.update_identity(id, &updated),
            None => Err(CredentialError::UnknownAccount),
        };
        match synced {
            Ok(()) => {}
            Err(CredentialError::EmailTaken) => return reject(ValidationError::EmailTaken),
            Err(CredentialError::UnknownAccount) => {
                tracing::warn!("Session identity has no directory account, updating session only");
            }
        }

        session.bind_identity(updated);
        tracing::info!("Profile updated");
        NextAction::redirect(Method::Write, View::Profile)
    }

    /// Append `"<date> - <doctor>"` to the session's appointments.
    pub fn book_appointment(
        &self,
        fields: &FormFields,
        session: &mut SessionContext,
    ) -> NextAction {
        if !session.is_authenticated() {
            return NextAction::redirect_with_error(
                Method::Write,
                View::Login,
                ErrorFlag::NotAuthenticated,
            );
        }
        let entry = fields.required("date").and_then(|date| {
            let date = NaiveDate::parse_from_str(date, APPOINTMENT_DATE_FORMAT)
                .map_err(|_| ValidationError::InvalidDate)?;
            let doctor = fields.required("doctor")?;
            Ok(format!("{} - {doctor}", date.format(APPOINTMENT_DATE_FORMAT)))
        });
        match entry {
            Ok(entry) => {
                session.push_entry(APPOINTMENTS_KEY, entry);
                NextAction::redirect(Method::Write, View::Profile)
            }
            Err(err) => NextAction::redirect_with_error(Method::Write, View::Profile, err),
        }
    }

    /// Append a condition to the session's medical history.
    pub fn record_history(&self, fields: &FormFields, session: &mut SessionContext) -> NextAction {
        if !session.is_authenticated() {
            return NextAction::redirect_with_error(
                Method::Write,
                View::Login,
                ErrorFlag::NotAuthenticated,
            );
        }
        match fields.required("condition") {
            Ok(condition) => {
                session.push_entry(MEDICAL_HISTORY_KEY, condition.to_string());
                NextAction::redirect(Method::Write, View::Profile)
            }
            Err(err) => NextAction::redirect_with_error(Method::Write, View::Profile, err),
        }
    }
}

fn parse_registration(fields: &FormFields) -> Result<IdentityRecord, ValidationError> {
    let full_name = fields.required("fullName")?;
    let email = fields.required("email")?;
    let gender = fields.get("gender").map(str::parse::<GenderLabel>).transpose()?;
    let age = fields.get("age").map(str::parse::<Age>).transpose()?;
    IdentityRecord::new(full_name, email, gender, age)
}

fn parse_update(fields: &FormFields) -> Result<ProfileUpdate, ValidationError> {
    Ok(ProfileUpdate {
        full_name: fields.get("fullName").map(str::to_string),
        email: fields.get("email").map(str::to_string),
        gender: fields.get("gender").map(str::parse::<GenderLabel>).transpose()?,
        age: fields.get("age").map(str::parse::<Age>).transpose()?,
    })
}
