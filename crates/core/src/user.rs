//! Input rules for registering a user.

use thiserror::Error;

/// Username length bounds.
pub const USERNAME_LEN: std::ops::RangeInclusive<usize> = 3..=100;
/// Password length bounds, in characters.
pub const PASSWORD_LEN: std::ops::RangeInclusive<usize> = 6..=100;
/// Maximum email length.
pub const MAX_EMAIL_LEN: usize = 200;

/// A field of a registration request that failed validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UserInputError {
    /// Username length or charset is invalid.
    #[error("username must be 3-100 characters of lowercase letters, digits or underscore")]
    InvalidUsername,

    /// Password length is invalid.
    #[error("password must be 6-100 characters")]
    InvalidPassword,

    /// Full name is empty or contains something other than letters and spaces.
    #[error("full name must contain only letters or spaces")]
    InvalidFullName,

    /// Email is not a plausible address.
    #[error("invalid email address: {0}")]
    InvalidEmail(String),
}

/// Checks `username` against `[a-z0-9_]{3,100}`.
pub fn validate_username(username: &str) -> Result<(), UserInputError> {
    let valid_chars = username
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');

    if valid_chars && USERNAME_LEN.contains(&username.len()) {
        Ok(())
    } else {
        Err(UserInputError::InvalidUsername)
    }
}

/// Checks the password length.
pub fn validate_password(password: &str) -> Result<(), UserInputError> {
    if PASSWORD_LEN.contains(&password.chars().count()) {
        Ok(())
    } else {
        Err(UserInputError::InvalidPassword)
    }
}

/// Checks that a full name holds only letters and spaces.
pub fn validate_full_name(full_name: &str) -> Result<(), UserInputError> {
    let trimmed = full_name.trim();
    if !trimmed.is_empty() && trimmed.chars().all(|c| c.is_alphabetic() || c == ' ') {
        Ok(())
    } else {
        Err(UserInputError::InvalidFullName)
    }
}

/// Checks that `email` looks like `local@domain.tld`.
pub fn validate_email(email: &str) -> Result<(), UserInputError> {
    let invalid = || UserInputError::InvalidEmail(email.to_string());

    if email.len() < 3 || email.len() > MAX_EMAIL_LEN || email.chars().any(char::is_whitespace) {
        return Err(invalid());
    }

    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    if local.is_empty() || domain.contains('@') {
        return Err(invalid());
    }

    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 || labels.iter().any(|label| label.is_empty()) {
        return Err(invalid());
    }

    Ok(())
}

/// Validates every field of a registration request.
pub fn validate_new_user(
    username: &str,
    password: &str,
    full_name: &str,
    email: &str,
) -> Result<(), UserInputError> {
    validate_username(username)?;
    validate_password(password)?;
    validate_full_name(full_name)?;
    validate_email(email)
}
