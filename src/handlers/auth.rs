//! Login, logout and the login form.

use super::{form_attributes, FormFields, Method, NextAction, Portal, View};
use crate::models::ValidationError;
use crate::session_context::SessionContext;

impl Portal {
    /// Render the empty login form.
    pub fn show_login(&self, fields: &FormFields) -> NextAction {
        NextAction::render(View::Login, form_attributes(fields))
    }

    /// Check the submitted pair and bind the account to the session.
    ///
    /// Any failure, including missing fields, leaves the session untouched.
    pub fn authenticate(&self, fields: &FormFields, session: &mut SessionContext) -> NextAction {
        let verified = match (fields.get("email"), fields.secret("password")) {
            (Some(email), Some(password)) => self.accounts.verify(email, password),
            _ => None,
        };

        let Some(account) = verified else {
            tracing::info!("Login rejected");
            return NextAction::redirect_with_error(
                Method::Write,
                View::Login,
                ValidationError::InvalidCredentials,
            );
        };

        session.bind_account(account.id, account.identity);
        session.set_medical_history(account.medical_history);
        session.set_appointments(account.appointments);
        tracing::info!("Login accepted");
        NextAction::redirect(Method::Write, View::Profile)
    }

    /// Drop everything bound to the session.
    pub fn logout(&self, session: &mut SessionContext) -> NextAction {
        session.clear();
        NextAction::redirect(Method::Write, View::Login)
    }
}
