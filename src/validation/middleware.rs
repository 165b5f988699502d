use std::collections::BTreeMap;
use std::future::{ready as ready_future, Ready as ReadyFuture};
use std::rc::Rc;
use std::sync::Arc;

use actix_web::{
    body::{EitherBody, MessageBody},
    dev::{forward_ready, Payload, Service, ServiceRequest, ServiceResponse, Transform},
    web::{self, Bytes},
    Error, FromRequest, HttpMessage, HttpRequest,
};
use futures::future::{ready, LocalBoxFuture, Ready};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use super::{RequestPart, RequestParts, ValidationConfig, ValidationGate};
use crate::error::{AppError, UnclassifiedError};
use crate::schema::{SchemaError, SchemaRegistry};

/// Middleware factory validating requests against a [`ValidationGate`].
///
/// Register it on a single resource so path parameters are already matched
/// when it runs:
///
/// ```ignore
/// web::resource("/cars/{id}")
///     .wrap(Validate::new(&registry, ValidationConfig::new().params("ParamsID"))?)
///     .route(web::delete().to(delete_car))
/// ```
#[derive(Debug, Clone)]
pub struct Validate {
    gate: Arc<ValidationGate>,
}

impl Validate {
    pub fn new(registry: &SchemaRegistry, config: ValidationConfig) -> Result<Self, SchemaError> {
        Ok(Self {
            gate: Arc::new(ValidationGate::new(registry, &config)?),
        })
    }
}

impl<S, B> Transform<S, ServiceRequest> for Validate
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = ValidateMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(ValidateMiddleware {
            service: Rc::new(service),
            gate: Arc::clone(&self.gate),
        }))
    }
}

pub struct ValidateMiddleware<S> {
    service: Rc<S>,
    gate: Arc<ValidationGate>,
}

impl<S, B> Service<ServiceRequest> for ValidateMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, mut req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let gate = Arc::clone(&self.gate);

        Box::pin(async move {
            if gate.is_empty() {
                return Ok(service.call(req).await?.map_into_left_body());
            }

            match validate(&mut req, &gate).await {
                Ok(()) => Ok(service.call(req).await?.map_into_left_body()),
                Err(err) => Ok(req.error_response(err).map_into_right_body()),
            }
        })
    }
}

/// Runs the gate over `req`. On success the coerced parts are stored in the
/// request extensions and a validated body replaces the original payload.
async fn validate(req: &mut ServiceRequest, gate: &ValidationGate) -> Result<(), AppError> {
    let parts = read_parts(req, gate).await;
    let validated = gate.check(&parts)?;

    if gate.validates(RequestPart::Body) {
        // Hand the coerced body on to `web::Json` extractors.
        let body = serde_json::to_vec(&validated.body)
            .map_err(|err| UnclassifiedError::from_error("SerializationError", &err))?;
        let (_, mut payload) = actix_http::h1::Payload::create(true);
        payload.unread_data(Bytes::from(body));
        req.set_payload(payload.into());
    }
    req.extensions_mut().insert(ValidatedParts(validated));
    Ok(())
}

async fn read_parts(req: &mut ServiceRequest, gate: &ValidationGate) -> RequestParts {
    let mut parts = RequestParts::default();

    if gate.validates(RequestPart::Body) {
        match req.extract::<Bytes>().await {
            Ok(bytes) if bytes.is_empty() => {}
            Ok(bytes) => match serde_json::from_slice(&bytes) {
                Ok(body) => parts.body = body,
                Err(err) => parts.mark_unreadable(RequestPart::Body, format!("invalid JSON: {err}")),
            },
            Err(err) => parts.mark_unreadable(RequestPart::Body, err.to_string()),
        }
    }

    parts.params = Value::Object(
        req.match_info()
            .iter()
            .map(|(name, value)| (name.to_owned(), Value::String(value.to_owned())))
            .collect::<Map<String, Value>>(),
    );

    match web::Query::<BTreeMap<String, String>>::from_query(req.query_string()) {
        Ok(query) => {
            parts.query = Value::Object(
                query
                    .into_inner()
                    .into_iter()
                    .map(|(name, value)| (name, Value::String(value)))
                    .collect(),
            );
        }
        Err(err) => parts.mark_unreadable(RequestPart::Query, err.to_string()),
    }

    parts
}

/// The coerced request parts of a request that passed its validation gate.
#[derive(Debug, Clone)]
pub struct ValidatedParts(pub RequestParts);

impl ValidatedParts {
    pub fn body<T: DeserializeOwned>(&self) -> Result<T, AppError> {
        self.decode(RequestPart::Body)
    }

    pub fn params<T: DeserializeOwned>(&self) -> Result<T, AppError> {
        self.decode(RequestPart::Params)
    }

    pub fn query<T: DeserializeOwned>(&self) -> Result<T, AppError> {
        self.decode(RequestPart::Query)
    }

    fn decode<T: DeserializeOwned>(&self, part: RequestPart) -> Result<T, AppError> {
        serde_json::from_value(self.0.get(part).clone()).map_err(|err| {
            UnclassifiedError::from_error("DeserializationError", &err)
                .with_status(actix_web::http::StatusCode::BAD_REQUEST)
                .into()
        })
    }
}

impl FromRequest for ValidatedParts {
    type Error = Error;
    type Future = ReadyFuture<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        match req.extensions().get::<ValidatedParts>().cloned() {
            Some(parts) => ready_future(Ok(parts)),
            None => {
                let err = AppError::from(UnclassifiedError::new(
                    "MissingValidation",
                    "Route has no validation gate",
                ));
                ready_future(Err(err.into()))
            }
        }
    }
}
