use std::rc::Rc;

use actix_web::{
    body::{EitherBody, MessageBody},
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    error::InternalError,
    Error, HttpRequest,
};
use futures::future::{ready, LocalBoxFuture, Ready};

use super::{AppError, UnclassifiedError};
use crate::config::Mode;

/// Terminal error handler. Registered outermost, it turns every error raised
/// further in (by middleware or by handlers) into the envelope for its mode.
#[derive(Debug, Clone, Copy)]
pub struct ErrorClassifier {
    mode: Mode,
}

impl ErrorClassifier {
    pub fn new(mode: Mode) -> Self {
        Self { mode }
    }
}

impl<S, B> Transform<S, ServiceRequest> for ErrorClassifier
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = ErrorClassifierMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(ErrorClassifierMiddleware {
            service: Rc::new(service),
            mode: self.mode,
        }))
    }
}

pub struct ErrorClassifierMiddleware<S> {
    service: Rc<S>,
    mode: Mode,
}

impl<S, B> Service<ServiceRequest> for ErrorClassifierMiddleware<S>
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
        let service = Rc::clone(&self.service);
        let mode = self.mode;

        Box::pin(async move {
            match service.call(req).await {
                Ok(res) => {
                    let classified = res.response().error().map(classify);
                    match classified {
                        Some(error) => {
                            log_error(Some(res.request()), &error);
                            Ok(res.into_response(error.render(mode)).map_into_right_body())
                        }
                        None => Ok(res.map_into_left_body()),
                    }
                }
                // The request was consumed further in, so the rendered response
                // travels inside the error.
                Err(err) => {
                    let error = classify(&err);
                    log_error(None, &error);
                    let response = error.render(mode);
                    Err(InternalError::from_response(error, response).into())
                }
            }
        })
    }
}

/// Maps any actix error onto the taxonomy. Errors that did not start out as
/// an [`AppError`] keep the status actix assigned to them.
pub fn classify(error: &Error) -> AppError {
    match error.as_error::<AppError>() {
        Some(app_error) => app_error.clone(),
        None => UnclassifiedError::new("HttpError", error.to_string())
            .with_status(error.as_response_error().status_code())
            .into(),
    }
}

fn log_error(req: Option<&HttpRequest>, error: &AppError) {
    let route = req
        .map(|req| format!("{} {}", req.method(), req.path()))
        .unwrap_or_else(|| "<request>".to_owned());
    let status = error.status();
    if status.is_server_error() {
        log::error!("{} -> {} {}: {}", route, status.as_u16(), error.name(), error);
    } else {
        log::warn!("{} -> {} {}: {}", route, status.as_u16(), error.name(), error);
    }
}
