mod challenge;
pub mod phone;
mod user;
pub mod verification_id;

pub use challenge::Challenge;
pub use phone::{hash_phone_number, normalize_phone_key};
pub use user::UserRecord;
