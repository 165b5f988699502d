#![allow(dead_code)]

use actix_cors::Cors;
use actix_http::Request;
use actix_web::body::MessageBody;
use actix_web::dev::{Service, ServiceResponse};
use actix_web::http::StatusCode;
use actix_web::middleware::Logger;
use actix_web::{test, web, App, Error};
use serde_json::{json, Value};

use servicebook::auth::TokenIssuer;
use servicebook::schema::{catalog, SchemaRegistry};
use servicebook::store::Store;
use servicebook::{Api, AppState, ErrorClassifier, Mode};

pub const USER_EMAIL: &str = "test@test.com";
pub const VENDOR_EMAIL: &str = "garage@test.com";
pub const PASSWORD: &str = "testpass";
pub const SPZ: &str = "1AB2345";

pub fn registry() -> SchemaRegistry {
    catalog::registry().expect("catalogue builds")
}

/// Builds the full application on an in-memory store, set up the way `main` does.
pub async fn app(
    mode: Mode,
) -> impl Service<Request, Response = ServiceResponse<impl MessageBody>, Error = Error> {
    let _ = env_logger::builder().is_test(true).try_init();

    let api = Api::new(&registry()).expect("every gate resolves");
    let state = web::Data::new(AppState::new(
        Store::memory(),
        TokenIssuer::new("integration-secret", 1),
        4,
    ));

    test::init_service(
        App::new()
            .app_data(state)
            .wrap(Logger::default())
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allow_any_method()
                    .allow_any_header()
                    .max_age(3600),
            )
            .wrap(ErrorClassifier::new(mode))
            .configure(|cfg| api.config(cfg)),
    )
    .await
}

/// Sends `req` and returns the status with the JSON body (`null` when empty).
pub async fn send<S, B>(app: &S, req: test::TestRequest) -> (StatusCode, Value)
where
    S: Service<Request, Response = ServiceResponse<B>, Error = Error>,
    B: MessageBody,
{
    let resp = test::call_service(app, req.to_request()).await;
    let status = resp.status();
    let bytes = test::read_body(resp).await;
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| {
            panic!("non-JSON body: {:?}", String::from_utf8_lossy(&bytes))
        })
    };
    (status, body)
}

pub fn user_payload() -> Value {
    json!({
        "email": USER_EMAIL,
        "password": PASSWORD,
        "name": "Test Testingson",
        "telephone": "420420420"
    })
}

pub fn vendor_payload() -> Value {
    json!({
        "email": VENDOR_EMAIL,
        "password": PASSWORD,
        "name": "Garage Novak",
        "address": "Hlavni 12, Praha"
    })
}

pub fn car_payload() -> Value {
    json!({ "model": "Skoda Fabia", "year": "2008", "SPZ": SPZ })
}

pub fn service_payload() -> Value {
    json!({
        "date": "2024-05-01T10:00:00Z",
        "cost": "120 EUR",
        "description": "Oil change",
        "receipt": { "data": "aGVsbG8=", "contentType": "image/png" }
    })
}

/// Registers and authenticates an account under `/api/{kind}`, returning its token.
pub async fn sign_up<S, B>(app: &S, kind: &str, payload: Value) -> String
where
    S: Service<Request, Response = ServiceResponse<B>, Error = Error>,
    B: MessageBody,
{
    let (status, body) = send(
        app,
        test::TestRequest::post()
            .uri(&format!("/api/{kind}/register"))
            .set_json(&payload),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "Registration failed. Body: {body}");

    let (status, body) = send(
        app,
        test::TestRequest::post()
            .uri(&format!("/api/{kind}/authenticate"))
            .set_json(json!({ "email": payload["email"], "password": payload["password"] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "Authentication failed. Body: {body}");

    body["token"]
        .as_str()
        .expect("token in authentication response")
        .to_string()
}
