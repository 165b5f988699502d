use actix_web::dev::Payload;
use actix_web::{Error as ActixError, FromRequest, HttpMessage, HttpRequest};
use std::future::{ready, Ready};
use uuid::Uuid;

use crate::auth::token::{Claims, Role};
use crate::error::{AppError, DomainError};

/// The account behind a request that passed [`AuthMiddleware`](super::AuthMiddleware).
///
/// Fails with 401 when no verified claims are present, which means the route
/// is not wrapped by the middleware.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub id: Uuid,
    pub role: Role,
}

impl FromRequest for AuthenticatedUser {
    type Error = ActixError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        match req.extensions().get::<Claims>() {
            Some(claims) => ready(Ok(AuthenticatedUser {
                id: claims.sub,
                role: claims.role,
            })),
            None => {
                let err = AppError::from(DomainError::unauthorized("No token provided"));
                ready(Err(err.into()))
            }
        }
    }
}
