//! Account directory: the credential check behind login and registration.
//!
//! Passwords never leave this module in clear. Each account stores a
//! PBKDF2-HMAC-SHA256 digest with a per-account random salt, and
//! verification compares digests in constant time.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use uuid::Uuid;
use zeroize::Zeroize;

use crate::models::identity::parse_email;
use crate::models::{email_key, Age, Gender, IdentityRecord};

pub const DEFAULT_PBKDF2_ITERATIONS: u32 = 600_000;
pub const DIGEST_LENGTH: usize = 32;
pub const SALT_LENGTH: usize = 32;

/// Demo login seeded at startup unless disabled in config.
pub const DEMO_EMAIL: &str = "user@example.com";
pub const DEMO_PASSWORD: &str = "password123";

// ═══════════════════════════════════════════════════════════
// PasswordHash, zeroed on drop
// ═══════════════════════════════════════════════════════════

/// Salted one-way password digest.
#[derive(Zeroize)]
#[zeroize(drop)]
pub struct PasswordHash {
    salt: [u8; SALT_LENGTH],
    digest: [u8; DIGEST_LENGTH],
    iterations: u32,
}

impl PasswordHash {
    /// Hash `password` with a fresh random salt.
    pub fn create(password: &str, iterations: u32) -> Self {
        let salt = generate_salt();
        Self::with_salt(password, salt, iterations)
    }

    fn with_salt(password: &str, salt: [u8; SALT_LENGTH], iterations: u32) -> Self {
        let mut digest = [0u8; DIGEST_LENGTH];
        pbkdf2_hmac::<Sha256>(password.as_bytes(), &salt, iterations, &mut digest);
        Self {
            salt,
            digest,
            iterations,
        }
    }

    /// Check `password` against the stored digest in constant time.
    pub fn verify(&self, password: &str) -> bool {
        let candidate = Self::with_salt(password, self.salt, self.iterations);
        self.digest.ct_eq(&candidate.digest).into()
    }
}

impl std::fmt::Debug for PasswordHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordHash")
            .field("iterations", &self.iterations)
            .finish_non_exhaustive()
    }
}

/// Generate a cryptographically random salt
pub fn generate_salt() -> [u8; SALT_LENGTH] {
    use rand::RngCore;
    let mut salt = [0u8; SALT_LENGTH];
    rand::thread_rng().fill_bytes(&mut salt);
    salt
}

// ═══════════════════════════════════════════════════════════
// Accounts
// ═══════════════════════════════════════════════════════════

/// What a successful login hands to the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedAccount {
    pub id: Uuid,
    pub identity: IdentityRecord,
    pub medical_history: Vec<String>,
    pub appointments: Vec<String>,
}

#[derive(Debug)]
struct Account {
    password: PasswordHash,
    identity: IdentityRecord,
    medical_history: Vec<String>,
    appointments: Vec<String>,
}

/// Accounts by id, plus a case-folded email index.
#[derive(Debug, Default)]
struct Directory {
    accounts: HashMap<Uuid, Account>,
    by_email: HashMap<String, Uuid>,
}

impl Directory {
    fn owner_of(&self, email: &str) -> Option<Uuid> {
        self.by_email.get(&email_key(email)).copied()
    }

    fn insert(&mut self, account: Account) -> Uuid {
        let id = Uuid::new_v4();
        self.by_email.insert(email_key(account.identity.email()), id);
        self.accounts.insert(id, account);
        id
    }
}

/// Errors from account directory changes.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CredentialError {
    #[error("An account already exists for this email")]
    EmailTaken,
    #[error("No such account")]
    UnknownAccount,
}

/// Credential check used by the login and registration handlers.
///
/// Accounts are addressed by an id fixed at enrolment. Email is only a
/// login name and may move between accounts over time.
pub trait AccountDirectory: Send + Sync {
    /// Return the account for `email` if `password` matches.
    fn verify(&self, email: &str, password: &str) -> Option<VerifiedAccount>;

    /// Create an account for `identity`, hashing `password`.
    fn enroll(&self, identity: &IdentityRecord, password: &str) -> Result<Uuid, CredentialError>;

    /// Store the latest profile for account `id`, moving its login name
    /// if the email changed.
    fn update_identity(&self, id: Uuid, identity: &IdentityRecord) -> Result<(), CredentialError>;
}

/// In-memory account directory.
pub struct CredentialStore {
    directory: RwLock<Directory>,
    iterations: u32,
}

impl CredentialStore {
    pub fn new(iterations: u32) -> Self {
        Self {
            directory: RwLock::new(Directory::default()),
            iterations,
        }
    }

    /// Directory holding only the demo patient account.
    pub fn with_demo_account(iterations: u32) -> Self {
        let store = Self::new(iterations);
        store.seed_demo_account();
        store
    }

    /// Number of enrolled accounts.
    pub fn len(&self) -> usize {
        self.read().accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read(&self) -> RwLockReadGuard<'_, Directory> {
        self.directory.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Directory> {
        self.directory.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn seed_demo_account(&self) {
        let identity = IdentityRecord::new(
            "John Doe",
            DEMO_EMAIL,
            Some(Gender::Male.into()),
            Age::new(30).ok(),
        );
        let Ok(identity) = identity else {
            tracing::error!("Demo identity failed validation; not seeding");
            return;
        };
        self.write().insert(Account {
            password: PasswordHash::create(DEMO_PASSWORD, self.iterations),
            identity,
            medical_history: vec!["High blood pressure".into(), "Asthma".into()],
            appointments: vec![
                "2025-02-10 - Dr. Smith".into(),
                "2025-03-15 - Dr. Lee".into(),
            ],
        });
        tracing::info!("Demo account seeded");
    }
}

impl AccountDirectory for CredentialStore {
    fn verify(&self, email: &str, password: &str) -> Option<VerifiedAccount> {
        let email = parse_email(email).ok()?;
        let directory = self.read();
        let id = directory.owner_of(&email)?;
        let account = directory.accounts.get(&id)?;
        if !account.password.verify(password) {
            return None;
        }
        Some(VerifiedAccount {
            id,
            identity: account.identity.clone(),
            medical_history: account.medical_history.clone(),
            appointments: account.appointments.clone(),
        })
    }

    fn enroll(&self, identity: &IdentityRecord, password: &str) -> Result<Uuid, CredentialError> {
        // Hash outside the write lock.
        let password = PasswordHash::create(password, self.iterations);
        let mut directory = self.write();
        if directory.owner_of(identity.email()).is_some() {
            return Err(CredentialError::EmailTaken);
        }
        Ok(directory.insert(Account {
            password,
            identity: identity.clone(),
            medical_history: Vec::new(),
            appointments: Vec::new(),
        }))
    }

    fn update_identity(&self, id: Uuid, identity: &IdentityRecord) -> Result<(), CredentialError> {
        let mut directory = self.write();
        let Directory { accounts, by_email } = &mut *directory;
        let account = accounts.get_mut(&id).ok_or(CredentialError::UnknownAccount)?;

        let new_key = email_key(identity.email());
        match by_email.get(&new_key) {
            Some(owner) if *owner != id => return Err(CredentialError::EmailTaken),
            _ => {}
        }
        by_email.remove(&email_key(account.identity.email()));
        by_email.insert(new_key, id);
        account.identity = identity.clone();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FAST: u32 = 1_000;

    fn jane() -> IdentityRecord {
        let gender = Some(Gender::Female.into());
        IdentityRecord::new("Jane Roe", "jane@example.com", gender, None).unwrap()
    }

    #[test]
    fn hash_verifies_only_original_password() {
        let hash = PasswordHash::create("s3cret", FAST);
        assert!(hash.verify("s3cret"));
        assert!(!hash.verify("s3cret "));
        assert!(!hash.verify(""));
    }

    #[test]
    fn same_password_different_salts_differ() {
        let h1 = PasswordHash::create("s3cret", FAST);
        let h2 = PasswordHash::create("s3cret", FAST);
        assert_ne!(h1.salt, h2.salt);
        assert_ne!(h1.digest, h2.digest);
    }

    #[test]
    fn with_salt_is_deterministic() {
        let salt = [42u8; SALT_LENGTH];
        let h1 = PasswordHash::with_salt("password", salt, FAST);
        let h2 = PasswordHash::with_salt("password", salt, FAST);
        assert_eq!(h1.digest, h2.digest);
    }

    #[test]
    fn debug_hides_digest_and_salt() {
        let hash = PasswordHash::create("s3cret", FAST);
        let debug = format!("{hash:?}");
        assert!(!debug.contains("digest"));
        assert!(!debug.contains("salt"));
    }

    #[test]
    fn generate_salt_is_random() {
        assert_ne!(generate_salt(), generate_salt());
    }

    #[test]
    fn demo_account_verifies_with_seeded_pair() {
        let store = CredentialStore::with_demo_account(FAST);
        let account = store.verify(DEMO_EMAIL, DEMO_PASSWORD).unwrap();
        assert_eq!(account.identity.full_name(), "John Doe");
        assert_eq!(account.medical_history, vec!["High blood pressure", "Asthma"]);
        assert_eq!(account.appointments.len(), 2);
    }

    #[test]
    fn demo_account_rejects_other_pairs() {
        let store = CredentialStore::with_demo_account(FAST);
        assert!(store.verify(DEMO_EMAIL, "password124").is_none());
        assert!(store.verify("admin@example.com", DEMO_PASSWORD).is_none());
        assert!(store.verify("", "").is_none());
    }

    #[test]
    fn email_lookup_is_case_insensitive() {
        let store = CredentialStore::with_demo_account(FAST);
        assert!(store.verify("USER@example.com", DEMO_PASSWORD).is_some());
    }

    #[test]
    fn lookup_ignores_case_but_identity_keeps_it() {
        let store = CredentialStore::new(FAST);
        let mixed = IdentityRecord::new("Jane Roe", "Jane.Roe@Example.com", None, None).unwrap();
        store.enroll(&mixed, "pw").unwrap();

        let account = store.verify("jane.roe@example.com", "pw").unwrap();
        assert_eq!(account.identity.email(), "Jane.Roe@Example.com");

        let clash = IdentityRecord::new("Other", "JANE.ROE@example.com", None, None).unwrap();
        assert_eq!(store.enroll(&clash, "x"), Err(CredentialError::EmailTaken));
    }

    #[test]
    fn enrolled_account_can_verify() {
        let store = CredentialStore::new(FAST);
        let id = store.enroll(&jane(), "pw-jane").unwrap();
        let account = store.verify("jane@example.com", "pw-jane").unwrap();
        assert_eq!(account.id, id);
        assert_eq!(account.identity, jane());
        assert!(account.appointments.is_empty());
    }

    #[test]
    fn duplicate_enrollment_rejected() {
        let store = CredentialStore::new(FAST);
        store.enroll(&jane(), "first").unwrap();
        assert_eq!(store.enroll(&jane(), "second"), Err(CredentialError::EmailTaken));
        assert!(store.verify("jane@example.com", "first").is_some());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn update_identity_moves_login_name() {
        let store = CredentialStore::new(FAST);
        let id = store.enroll(&jane(), "pw").unwrap();
        let moved = IdentityRecord::new("Jane Roe", "roe@example.com", None, None).unwrap();

        store.update_identity(id, &moved).unwrap();

        assert!(store.verify("jane@example.com", "pw").is_none());
        assert_eq!(store.verify("roe@example.com", "pw").unwrap().identity, moved);
    }

    #[test]
    fn update_identity_allows_case_change_of_own_email() {
        let store = CredentialStore::new(FAST);
        let id = store.enroll(&jane(), "pw").unwrap();
        let recased = IdentityRecord::new("Jane Roe", "JANE@example.com", None, None).unwrap();

        store.update_identity(id, &recased).unwrap();

        let account = store.verify("jane@example.com", "pw").unwrap();
        assert_eq!(account.identity.email(), "JANE@example.com");
    }

    #[test]
    fn update_identity_refuses_taken_email() {
        let store = CredentialStore::with_demo_account(FAST);
        let id = store.enroll(&jane(), "pw").unwrap();
        let clash = IdentityRecord::new("Jane Roe", DEMO_EMAIL, None, None).unwrap();
        assert_eq!(store.update_identity(id, &clash), Err(CredentialError::EmailTaken));
        assert!(store.verify("jane@example.com", "pw").is_some());
    }

    #[test]
    fn update_identity_never_touches_the_new_owner_of_a_freed_email() {
        let store = CredentialStore::with_demo_account(FAST);
        let demo = store.verify(DEMO_EMAIL, DEMO_PASSWORD).unwrap();
        let moved = IdentityRecord::new("John Doe", "moved@example.com", None, None).unwrap();
        store.update_identity(demo.id, &moved).unwrap();

        let carol = IdentityRecord::new("Carol Stranger", DEMO_EMAIL, None, None).unwrap();
        let carol_id = store.enroll(&carol, "pw-carol").unwrap();
        assert_ne!(carol_id, demo.id);

        // Stale data for the demo account cannot reclaim the address.
        let stale = IdentityRecord::new("John Hijack", DEMO_EMAIL, None, None).unwrap();
        assert_eq!(store.update_identity(demo.id, &stale), Err(CredentialError::EmailTaken));
        let carol_view = store.verify(DEMO_EMAIL, "pw-carol").unwrap();
        assert_eq!(carol_view.identity.full_name(), "Carol Stranger");
    }

    #[test]
    fn update_identity_for_unknown_account_errors() {
        let store = CredentialStore::new(FAST);
        assert_eq!(
            store.update_identity(Uuid::new_v4(), &jane()),
            Err(CredentialError::UnknownAccount)
        );
    }
}
