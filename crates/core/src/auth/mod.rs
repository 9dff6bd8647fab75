//! Password hashing.
//!
//! Users are stored with an Argon2id PHC string, never the plaintext.

mod password;

pub use password::{PasswordError, hash_password, verify_password};
