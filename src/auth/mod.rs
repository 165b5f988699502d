//! Token issuing and verification, password hashing and the auth gate.

pub mod extractors;
pub mod middleware;
pub mod password;
pub mod token;

pub use extractors::AuthenticatedUser;
pub use middleware::AuthMiddleware;
pub use password::{hash_password, verify_password};
pub use token::{Claims, Role, TokenIssuer};
