use std::collections::HashMap;
use std::rc::Rc;

use actix_web::{
    body::{EitherBody, MessageBody},
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    web, Error, HttpMessage,
};
use futures::future::{ready, LocalBoxFuture, Ready};

use crate::auth::token::{Claims, Role};
use crate::error::{AppError, DomainError, UnclassifiedError};
use crate::state::AppState;

/// Header carrying a raw token, as an alternative to `Authorization: Bearer`.
pub const TOKEN_HEADER: &str = "x-access-token";

/// Rejects requests without a valid token issued to `role`.
///
/// The token is looked up in the `Authorization: Bearer` header, then the
/// `x-access-token` header, then the `token` query parameter. Verified claims
/// are inserted into the request extensions. Rejections are answered with an
/// error response carrying the [`AppError`], left for the error classifier to
/// render.
#[derive(Debug, Clone, Copy)]
pub struct AuthMiddleware {
    role: Role,
}

impl AuthMiddleware {
    pub fn new(role: Role) -> Self {
        Self { role }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = AuthMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthMiddlewareService {
            service: Rc::new(service),
            role: self.role,
        }))
    }
}

pub struct AuthMiddlewareService<S> {
    service: Rc<S>,
    role: Role,
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        match authenticate(&req, self.role) {
            Ok(claims) => {
                req.extensions_mut().insert(claims);
                let fut = self.service.call(req);
                Box::pin(async move { Ok(fut.await?.map_into_left_body()) })
            }
            Err(app_err) => {
                let res = req.error_response(app_err).map_into_right_body();
                Box::pin(async move { Ok(res) })
            }
        }
    }
}

fn authenticate(req: &ServiceRequest, role: Role) -> Result<Claims, AppError> {
    let token = token_from(req).ok_or_else(|| DomainError::unauthorized("No token provided"))?;

    let state = req.app_data::<web::Data<AppState>>().ok_or_else(|| {
        UnclassifiedError::new("MissingState", "Application state is not registered")
    })?;

    let claims = state.tokens.verify(&token)?;
    if claims.role != role {
        return Err(DomainError::forbidden("Token does not grant access to this resource")
            .with_metadata("role", format!("{:?}", claims.role))
            .into());
    }
    Ok(claims)
}

fn token_from(req: &ServiceRequest) -> Option<String> {
    let headers = req.headers();

    let bearer = headers
        .get("Authorization")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));
    let raw = headers
        .get(TOKEN_HEADER)
        .and_then(|value| value.to_str().ok());

    bearer
        .or(raw)
        .map(str::to_owned)
        .or_else(|| {
            web::Query::<HashMap<String, String>>::from_query(req.query_string())
                .ok()
                .and_then(|query| query.into_inner().remove("token"))
        })
        .filter(|token| !token.is_empty())
}
