use crate::error::AppError;
use bcrypt::{hash, verify};

const PASSWORD_COST: u32 = 12;

pub fn hash_password(password: &str) -> Result<String, AppError> {
    hash(password, PASSWORD_COST)
        .map_err(|e| AppError::InternalServerError(format!("Failed to hash password: {}", e)))
}

/// Returns `Ok(false)` on mismatch; a stored hash bcrypt cannot parse is an error.
pub fn verify_password(password: &str, password_hash: &str) -> Result<bool, AppError> {
    verify(password, password_hash)
        .map_err(|e| AppError::InternalServerError(format!("Failed to verify password: {}", e)))
}
