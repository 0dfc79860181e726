pub mod canonical_field;
pub mod delimiter;
pub mod import_status;
pub mod phone_key;

pub use canonical_field::CanonicalField;
pub use delimiter::Delimiter;
pub use import_status::ImportStatus;
pub use phone_key::{PhoneError, PhoneKey, PhonePolicy};
