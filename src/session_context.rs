//! Per-client session state.
//!
//! A `SessionContext` is the explicit value every handler receives. Values
//! are stored under string keys, but the well-known keys have typed
//! accessors so callers never cast a generic value to a concrete type.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::models::IdentityRecord;

/// Key holding the signed-in user's [`IdentityRecord`].
pub const IDENTITY_KEY: &str = "identity";
/// Key holding the directory id of the signed-in account.
pub const ACCOUNT_KEY: &str = "accountId";
/// Key holding the ordered medical history entries.
pub const MEDICAL_HISTORY_KEY: &str = "medicalHistory";
/// Key holding the ordered appointment entries.
pub const APPOINTMENTS_KEY: &str = "appointments";

/// A value bound in a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum SessionValue {
    Identity(IdentityRecord),
    Account(Uuid),
    Entries(Vec<String>),
    Text(String),
}

/// Session state for one client.
#[derive(Debug, Clone)]
pub struct SessionContext {
    created_at: DateTime<Utc>,
    values: HashMap<String, SessionValue>,
}

impl SessionContext {
    pub fn new() -> Self {
        Self {
            created_at: Utc::now(),
            values: HashMap::new(),
        }
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    // ── Generic key access ───────────────────────────────

    pub fn get(&self, key: &str) -> Option<&SessionValue> {
        self.values.get(key)
    }

    /// Bind `value` under `key`, replacing any previous value.
    pub fn set(&mut self, key: impl Into<String>, value: SessionValue) {
        self.values.insert(key.into(), value);
    }

    /// Remove `key`. No-op if absent.
    pub fn delete(&mut self, key: &str) {
        self.values.remove(key);
    }

    /// Drop every bound key.
    pub fn clear(&mut self) {
        self.values.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Bound keys in sorted order.
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.values.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }

    // ── Typed accessors ──────────────────────────────────

    /// The signed-in identity, if any.
    pub fn identity(&self) -> Option<&IdentityRecord> {
        match self.values.get(IDENTITY_KEY) {
            Some(SessionValue::Identity(record)) => Some(record),
            _ => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.identity().is_some()
    }

    /// Replace the bound identity wholesale.
    pub fn bind_identity(&mut self, record: IdentityRecord) {
        self.set(IDENTITY_KEY, SessionValue::Identity(record));
    }

    /// Directory account the identity belongs to.
    pub fn account_id(&self) -> Option<Uuid> {
        match self.values.get(ACCOUNT_KEY) {
            Some(SessionValue::Account(id)) => Some(*id),
            _ => None,
        }
    }

    /// Bind `record` as the signed-in identity of account `id`.
    pub fn bind_account(&mut self, id: Uuid, record: IdentityRecord) {
        self.set(ACCOUNT_KEY, SessionValue::Account(id));
        self.bind_identity(record);
    }

    pub fn medical_history(&self) -> &[String] {
        self.entries(MEDICAL_HISTORY_KEY)
    }

    pub fn appointments(&self) -> &[String] {
        self.entries(APPOINTMENTS_KEY)
    }

    pub fn set_medical_history(&mut self, entries: Vec<String>) {
        self.set(MEDICAL_HISTORY_KEY, SessionValue::Entries(entries));
    }

    pub fn set_appointments(&mut self, entries: Vec<String>) {
        self.set(APPOINTMENTS_KEY, SessionValue::Entries(entries));
    }

    /// Append to an entry list, creating it if absent or of another shape.
    pub fn push_entry(&mut self, key: &str, entry: String) {
        match self.values.get_mut(key) {
            Some(SessionValue::Entries(entries)) => entries.push(entry),
            _ => self.set(key, SessionValue::Entries(vec![entry])),
        }
    }

    fn entries(&self, key: &str) -> &[String] {
        match self.values.get(key) {
            Some(SessionValue::Entries(entries)) => entries,
            _ => &[],
        }
    }
}

impl Default for SessionContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Read-only view of a session handed to the view renderer.
#[derive(Debug, Clone, Copy)]
pub struct SessionView<'a> {
    context: &'a SessionContext,
}

impl<'a> SessionView<'a> {
    pub fn new(context: &'a SessionContext) -> Self {
        Self { context }
    }

    pub fn get(&self, key: &str) -> Option<&'a SessionValue> {
        self.context.get(key)
    }

    pub fn keys(&self) -> Vec<&'a str> {
        self.context.keys()
    }

    pub fn identity(&self) -> Option<&'a IdentityRecord> {
        self.context.identity()
    }

    pub fn medical_history(&self) -> &'a [String] {
        self.context.medical_history()
    }

    pub fn appointments(&self) -> &'a [String] {
        self.context.appointments()
    }
}
