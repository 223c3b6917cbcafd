pub mod enums;
pub mod identity;
pub mod patient;
pub mod validation;

pub use enums::{Gender, GenderLabel};
pub use identity::{email_key, Age, IdentityRecord, ProfileUpdate};
pub use patient::{Patient, PatientDetails};
pub use validation::ValidationError;
