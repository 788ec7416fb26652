use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

use crate::auth::error::CryptResult;

pub fn hash_password(password: &str) -> CryptResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// `Ok(false)` on mismatch, `Err` only when `hash` is not a valid PHC string.
pub fn verify_password(hash: &str, password: &str) -> CryptResult<bool> {
    let parsed = PasswordHash::new(hash)?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn hash_and_verify() {
        let hash = hash_password("hunter2").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password(&hash, "hunter2").unwrap());
        assert!(!verify_password(&hash, "hunter3").unwrap());
    }

    #[test]
    fn same_password_gets_different_salts() {
        let a = hash_password("secret").unwrap();
        let b = hash_password("secret").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn garbage_hash_is_an_error() {
        assert!(verify_password("not a phc string", "secret").is_err());
    }
}
