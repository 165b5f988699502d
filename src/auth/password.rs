use crate::error::AppError;
use bcrypt::{hash, verify};

pub fn hash_password(password: &str, cost: u32) -> Result<String, AppError> {
    Ok(hash(password, cost)?)
}

pub fn verify_password(password: &str, hashed_password: &str) -> Result<bool, AppError> {
    Ok(verify(password, hashed_password)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::StatusCode;

    #[test]
    fn test_password_hashing_and_verification() {
        let password = "test_password123";
        let hashed = hash_password(password, 4).unwrap();

        assert_ne!(hashed, password);
        assert!(verify_password(password, &hashed).unwrap());
        assert!(!verify_password("wrong_password", &hashed).unwrap());
    }

    #[test]
    fn test_verify_with_invalid_hash() {
        match verify_password("test_password123", "invalidhashformat") {
            Err(AppError::Unclassified(err)) => {
                assert_eq!(err.name, "PasswordHashError");
                assert_eq!(
                    AppError::Unclassified(err).status(),
                    StatusCode::INTERNAL_SERVER_ERROR
                );
            }
            Ok(valid) => assert!(!valid),
            Err(e) => panic!("Unexpected error: {:?}", e),
        }
    }

    #[test]
    fn test_invalid_cost_is_rejected() {
        assert!(hash_password("test_password123", 1).is_err());
    }
}
