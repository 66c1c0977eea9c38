pub mod keygen;
pub mod url_validator;

pub use keygen::{KEY_LEN, derive_key, is_valid_key};
pub use url_validator::validate_url;
