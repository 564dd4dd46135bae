use crate::DbResult;

/// Hash a password using bcrypt
pub fn hash_password(password: &str, cost: u32) -> DbResult<String> {
    Ok(bcrypt::hash(password, cost)?)
}

/// Verify a password against a hash. A malformed hash never verifies.
pub fn verify_password(password: &str, hash: &str) -> bool {
    bcrypt::verify(password, hash).unwrap_or(false)
}
